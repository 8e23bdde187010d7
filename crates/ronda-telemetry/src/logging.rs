//! Structured logging macros.
//!
//! Every line carries a `component` field so JSON output can be filtered per
//! component by whatever ships the logs.

/// Helper to create structured log entries with consistent formatting.
#[macro_export]
macro_rules! log_event {
    // Info level with component
    (info, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::info!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Warn level with component
    (warn, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::warn!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Error level with component
    (error, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::error!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };

    // Debug level with component
    (debug, $component:expr, $msg:expr $(, $($field:tt)*)?) => {
        tracing::debug!(
            component = $component,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a round-related event with standard fields.
#[macro_export]
macro_rules! log_round_event {
    ($level:ident, $component:expr, $msg:expr, $round_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            round_id = %$round_id,
            $($($field)*,)?
            $msg
        )
    };
}

/// Log a checkpoint-related event with standard fields.
#[macro_export]
macro_rules! log_checkpoint_event {
    ($level:ident, $component:expr, $msg:expr, $round_id:expr, $checkpoint_id:expr $(, $($field:tt)*)?) => {
        tracing::$level!(
            component = $component,
            round_id = %$round_id,
            checkpoint_id = %$checkpoint_id,
            $($($field)*,)?
            $msg
        )
    };
}
