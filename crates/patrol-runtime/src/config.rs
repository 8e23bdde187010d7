//! # Runtime Configuration
//!
//! Engine settings plus what the replay needs to find and feed a fixture.
//!
//! | Variable | Default | Description |
//! |----------|---------|-------------|
//! | `RONDA_FIXTURE` | `demos/patrol_round.json` | Fixture to replay when no path argument is given |
//! | `RONDA_EVENT_CAPACITY` | `256` | Events buffered per bus subscriber |
//! | `RONDA_STOP_ON_REJECTION` | `false` | Abort the replay at the first rejected step |

use rd_01_round_execution::RoundExecutionConfig;
use ronda_telemetry::TelemetryConfig;
use shared_bus::DEFAULT_CHANNEL_CAPACITY;
use std::path::PathBuf;

pub const DEFAULT_FIXTURE_PATH: &str = "demos/patrol_round.json";

/// Component name on the runtime's log lines.
pub const COMPONENT: &str = "replay";

/// Complete runtime configuration.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    /// Round engine settings.
    pub engine: RoundExecutionConfig,
    pub telemetry: TelemetryConfig,
    pub fixture_path: PathBuf,
    pub event_capacity: usize,
    /// Rejected steps are logged and skipped unless this is set.
    pub stop_on_rejection: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            engine: RoundExecutionConfig::default(),
            telemetry: TelemetryConfig::default(),
            fixture_path: PathBuf::from(DEFAULT_FIXTURE_PATH),
            event_capacity: DEFAULT_CHANNEL_CAPACITY,
            stop_on_rejection: false,
        }
    }
}

impl RuntimeConfig {
    /// Load from the environment. Unparseable values keep their defaults.
    pub fn from_env() -> Self {
        let mut config = Self {
            engine: RoundExecutionConfig::from_env(),
            telemetry: TelemetryConfig::for_component(COMPONENT),
            ..Self::default()
        };

        if let Ok(path) = std::env::var("RONDA_FIXTURE") {
            if !path.trim().is_empty() {
                config.fixture_path = PathBuf::from(path);
            }
        }
        if let Ok(capacity) = std::env::var("RONDA_EVENT_CAPACITY") {
            if let Ok(c) = capacity.parse::<usize>() {
                if c > 0 {
                    config.event_capacity = c;
                }
            }
        }
        if let Ok(stop) = std::env::var("RONDA_STOP_ON_REJECTION") {
            config.stop_on_rejection = stop.eq_ignore_ascii_case("true") || stop == "1";
        }

        config
    }

    /// A path given on the command line wins over `RONDA_FIXTURE`.
    pub fn with_fixture_arg(mut self, arg: Option<String>) -> Self {
        if let Some(path) = arg {
            self.fixture_path = PathBuf::from(path);
        }
        self
    }
}
