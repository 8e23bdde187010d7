use super::session::RoundSession;
use crate::config::RoundExecutionConfig;
use crate::domain::GeofenceEvaluator;
use crate::error::{RoundError, RoundResult};
use crate::metrics;
use crate::ports::{BaseControlStore, PatrolNotifier, RoundStore, SystemTimeSource, TimeSource};
use parking_lot::{Mutex, RwLock};
use shared_types::{RoundId, Timestamp};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, warn};

/// Round execution service implementing the driving port.
///
/// Holds one session per open round. Each session is guarded by its own
/// mutex, so operations on different rounds never contend.
///
/// # Example
///
/// ```rust,ignore
/// let service = RoundExecutionService::with_system_time(
///     RoundExecutionConfig::default(),
///     Arc::new(InMemoryRoundStore::new()),
///     Arc::new(InMemoryBaseControlStore::new()),
///     Arc::new(EventBusNotifier::new(bus)),
/// );
/// service.open_round(&round_id).await?;
/// service.record_departure(&round_id, 12_400.0).await?;
/// ```
pub struct RoundExecutionService<S, B, N>
where
    S: RoundStore,
    B: BaseControlStore,
    N: PatrolNotifier,
{
    pub(crate) config: RoundExecutionConfig,
    pub(crate) geofence: GeofenceEvaluator,
    pub(crate) sessions: RwLock<HashMap<RoundId, Arc<Mutex<RoundSession>>>>,
    pub(crate) round_store: Arc<S>,
    pub(crate) base_control: Arc<B>,
    pub(crate) notifier: Arc<N>,
    pub(crate) time_source: Arc<dyn TimeSource>,
}

impl<S, B, N> RoundExecutionService<S, B, N>
where
    S: RoundStore,
    B: BaseControlStore,
    N: PatrolNotifier,
{
    pub fn new(
        config: RoundExecutionConfig,
        round_store: Arc<S>,
        base_control: Arc<B>,
        notifier: Arc<N>,
        time_source: Arc<dyn TimeSource>,
    ) -> Self {
        Self {
            geofence: GeofenceEvaluator::new(config.default_geofence_radius_m),
            config,
            sessions: RwLock::new(HashMap::new()),
            round_store,
            base_control,
            notifier,
            time_source,
        }
    }

    /// Service on the wall clock.
    pub fn with_system_time(
        config: RoundExecutionConfig,
        round_store: Arc<S>,
        base_control: Arc<B>,
        notifier: Arc<N>,
    ) -> Self {
        Self::new(
            config,
            round_store,
            base_control,
            notifier,
            Arc::new(SystemTimeSource),
        )
    }

    pub fn config(&self) -> &RoundExecutionConfig {
        &self.config
    }

    pub fn open_sessions(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_open(&self, round_id: &RoundId) -> bool {
        self.sessions.read().contains_key(round_id)
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.time_source.now()
    }

    pub(crate) fn session(&self, round_id: &RoundId) -> RoundResult<Arc<Mutex<RoundSession>>> {
        self.sessions
            .read()
            .get(round_id)
            .cloned()
            .ok_or_else(|| RoundError::RoundNotOpen(round_id.clone()))
    }

    /// Build a session from durable state.
    pub(crate) async fn load_session(&self, round_id: &RoundId) -> RoundResult<RoundSession> {
        let snapshot = self.round_store.load_round(round_id).await?;
        let departure = self.base_control.departure(round_id).await?;
        let arrival = self.base_control.arrival(round_id).await?;
        RoundSession::from_snapshot(snapshot, departure, arrival)
    }

    pub(crate) fn install_session(&self, session: RoundSession) -> Arc<Mutex<RoundSession>> {
        let round_id = session.round.id.clone();
        let session = Arc::new(Mutex::new(session));
        let count = {
            let mut sessions = self.sessions.write();
            sessions.insert(round_id, Arc::clone(&session));
            sessions.len()
        };
        metrics::set_open_sessions(count);
        session
    }

    pub(crate) fn remove_session(&self, round_id: &RoundId) -> bool {
        let (removed, count) = {
            let mut sessions = self.sessions.write();
            let removed = sessions.remove(round_id).is_some();
            (removed, sessions.len())
        };
        metrics::set_open_sessions(count);
        removed
    }

    /// Log and count a rejected operation, handing the error back.
    pub(crate) fn rejected(
        &self,
        round_id: &RoundId,
        operation: &'static str,
        err: RoundError,
    ) -> RoundError {
        metrics::record_rejection(err.kind());
        match &err {
            RoundError::PersistenceFailure(source) => {
                metrics::record_persistence_failure(operation);
                warn!(
                    round_id = %round_id,
                    operation,
                    error = %source,
                    "Store write failed; round state unchanged"
                );
            }
            _ => debug!(
                round_id = %round_id,
                operation,
                reason = err.kind(),
                error = %err,
                "Operation rejected"
            ),
        }
        err
    }
}
