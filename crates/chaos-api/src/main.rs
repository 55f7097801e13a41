use std::sync::Arc;

use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;

use chaos_core::actuator::ActuatorRegistry;
use chaos_core::emergency_stop::EmergencyStop;
use chaos_core::event::TracingEventSink;
use chaos_core::rollback::RollbackStack;
use chaos_core::runner::ExperimentRunner;
use chaos_core::snapshot::SnapshotStore;
use chaos_k8s::config::K8sTargetConfig;

use chaos_api::config::ApiConfig;
use chaos_api::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = ApiConfig::load()?;
    config.validate()?;
    init_tracing(&config.logging.level, &config.logging.format);

    let pool = chaos_store::create_pool(&config.database.path).await?;
    chaos_store::run_migrations(&pool).await?;
    let store = Arc::new(chaos_store::SqliteStore::new(pool));

    let mut actuators = ActuatorRegistry::new();
    let mut k8s_client: Option<kube::Client> = None;

    if config.k8s.enabled {
        let client = chaos_k8s::client::create_client(&K8sTargetConfig {
            kubeconfig: config.k8s.kubeconfig.clone(),
            namespace: "default".to_string(),
            label_selector: None,
        })
        .await?;
        chaos_k8s::actuator::register_all(&mut actuators, client.clone());
        k8s_client = Some(client);
    } else {
        tracing::info!("kubernetes chaos disabled, no k8s actuators registered");
    }

    let aws_clients = if config.aws.enabled {
        Some(chaos_aws::client::load_clients().await)
    } else {
        tracing::info!("aws chaos disabled, no aws actuators registered");
        None
    };
    if let Some((ec2, rds)) = aws_clients.clone() {
        chaos_aws::actuator::register_all(&mut actuators, ec2, rds);
    }
    let actuators = Arc::new(actuators);

    let k8s_inspector: Option<Arc<dyn chaos_core::snapshot::K8sInspector>> = k8s_client
        .clone()
        .map(|client| Arc::new(chaos_k8s::snapshot::KubeInspector::new(client)) as _);
    let aws_inspector: Option<Arc<dyn chaos_core::snapshot::AwsInspector>> = aws_clients
        .clone()
        .map(|(ec2, rds)| Arc::new(chaos_aws::snapshot::Ec2RdsInspector::new(ec2, rds)) as _);

    let mut snapshots = SnapshotStore::new(k8s_inspector, aws_inspector);
    snapshots.set_sink(store.clone());
    let snapshots = Arc::new(snapshots);

    let emergency_stop = Arc::new(EmergencyStop::new());
    let rollback = Arc::new(RollbackStack::new(actuators.clone()));

    let runner = Arc::new(build_runner(
        &config,
        emergency_stop.clone(),
        rollback.clone(),
        snapshots.clone(),
        actuators.clone(),
        store.clone(),
        k8s_client.clone(),
        true,
    ));
    let dry_run_runner = Arc::new(build_runner(
        &config,
        emergency_stop.clone(),
        rollback.clone(),
        snapshots.clone(),
        actuators.clone(),
        store.clone(),
        k8s_client.clone(),
        false,
    ));

    let k8s_topology: Option<Arc<dyn chaos_core::topology::TopologyProvider>> = k8s_client
        .clone()
        .map(|client| Arc::new(chaos_k8s::topology::KubeTopologyProvider::new(client, "default".to_string())) as _);
    let aws_topology: Option<Arc<dyn chaos_core::topology::TopologyProvider>> = aws_clients
        .map(|(ec2, rds)| Arc::new(chaos_aws::topology::AwsTopologyProvider::new(ec2, rds)) as _);

    let state = Arc::new(AppState {
        emergency_stop,
        runner,
        dry_run_runner,
        store,
        k8s_topology,
        aws_topology,
    });

    let app = chaos_api::build_router(state);
    let addr = format!("{}:{}", config.server.host, config.server.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "chaos-api listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("chaos-api shutdown complete");
    Ok(())
}

/// Assembles one `ExperimentRunner` sharing the process's emergency-stop,
/// rollback stack and snapshot store. `persist` is false for the dry-run
/// variant so `POST /api/chaos/dry-run` never writes a record or triggers
/// AI analysis.
fn build_runner(
    config: &ApiConfig,
    emergency_stop: Arc<EmergencyStop>,
    rollback: Arc<RollbackStack>,
    snapshots: Arc<SnapshotStore>,
    actuators: Arc<ActuatorRegistry>,
    store: Arc<chaos_store::SqliteStore>,
    k8s_client: Option<kube::Client>,
    persist: bool,
) -> ExperimentRunner {
    let mut runner = ExperimentRunner::new(emergency_stop, rollback, snapshots, actuators);
    runner.add_event_sink(Arc::new(TracingEventSink));
    runner.set_probe_factory(move |experiment_config| {
        experiment_config
            .probes
            .iter()
            .filter_map(|probe_config| chaos_probes::build_probe(probe_config, k8s_client.clone()).ok())
            .collect()
    });

    if persist {
        runner.set_persistence(store.clone());
        let client = chaos_llm::AnalysisClient::new(config.llm.endpoint.clone(), config.llm.api_key.clone());
        let dispatcher = chaos_llm::RemoteAnalysisDispatcher::with_sink(client, store);
        runner.set_analysis(Arc::new(dispatcher));
    }

    runner
}

fn init_tracing(level: &str, format: &str) {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let subscriber = tracing_subscriber::fmt().with_env_filter(env_filter);
    if format == "json" {
        subscriber.json().init();
    } else {
        subscriber.init();
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C signal handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => tracing::info!("received ctrl-c, shutting down"),
        _ = terminate => tracing::info!("received sigterm, shutting down"),
    }
}
