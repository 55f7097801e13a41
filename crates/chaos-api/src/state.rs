use std::sync::Arc;

use chaos_core::emergency_stop::EmergencyStop;
use chaos_core::runner::ExperimentRunner;
use chaos_core::topology::TopologyProvider;
use chaos_store::SqliteStore;

/// Shared application state handed to every axum handler via `State<Arc<AppState>>`.
///
/// Two `ExperimentRunner`s share the same `EmergencyStop`/`RollbackStack`/
/// `SnapshotStore`/`ActuatorRegistry`: `runner` persists and dispatches
/// analysis, `dry_run_runner` does neither, matching `POST /api/chaos/dry-run`'s
/// "does not persist state" contract without threading a persist-or-not flag
/// through the shared runner.
pub struct AppState {
    pub emergency_stop: Arc<EmergencyStop>,
    pub runner: Arc<ExperimentRunner>,
    pub dry_run_runner: Arc<ExperimentRunner>,
    pub store: Arc<SqliteStore>,
    pub k8s_topology: Option<Arc<dyn TopologyProvider>>,
    pub aws_topology: Option<Arc<dyn TopologyProvider>>,
}

#[cfg(test)]
pub mod tests {
    use super::*;
    use chaos_core::actuator::ActuatorRegistry;
    use chaos_core::rollback::RollbackStack;
    use chaos_core::snapshot::SnapshotStore;

    pub async fn test_state() -> AppState {
        let emergency_stop = Arc::new(EmergencyStop::new());
        let actuators = Arc::new(ActuatorRegistry::new());
        let rollback = Arc::new(RollbackStack::new(actuators.clone()));
        let snapshots = Arc::new(SnapshotStore::new(None, None));
        let runner = Arc::new(ExperimentRunner::new(
            emergency_stop.clone(),
            rollback.clone(),
            snapshots.clone(),
            actuators.clone(),
        ));
        let dry_run_runner = Arc::new(ExperimentRunner::new(
            emergency_stop.clone(),
            rollback,
            snapshots,
            actuators,
        ));

        let pool = chaos_store::create_pool("sqlite::memory:").await.unwrap();
        chaos_store::run_migrations(&pool).await.unwrap();
        let store = Arc::new(SqliteStore::new(pool));

        AppState {
            emergency_stop,
            runner,
            dry_run_runner,
            store,
            k8s_topology: None,
            aws_topology: None,
        }
    }
}
