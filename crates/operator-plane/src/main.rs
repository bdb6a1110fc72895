//! Operator Plane Server Binary

use operator_core::PrefixedBase64Codec;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::FmtSubscriber;

use operator_plane::attestation::{select_validators, Validators};
use operator_plane::{
    create_router, spawn_refresh_task, AppState, AttestationPipeline, AttestationSettings,
    InMemoryOperatorKeys, LocalDirSource, OperatorKeyProvider, PlaneConfig, RotatingKeypairStore,
};

#[tokio::main]
async fn main() {
    let config = match PlaneConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Invalid configuration: {e}");
            std::process::exit(2);
        }
    };

    let subscriber = FmtSubscriber::builder()
        .with_max_level(config.log_level)
        .with_target(true)
        .with_thread_ids(true)
        .finish();

    tracing::subscriber::set_global_default(subscriber)
        .expect("Failed to set tracing subscriber");

    // Key pair store
    let source = Arc::new(LocalDirSource::new(&config.content_root));
    let store = Arc::new(RotatingKeypairStore::new(
        source.clone(),
        Arc::new(PrefixedBase64Codec::default()),
        config.metadata_path.clone(),
    ));
    spawn_refresh_task(store.clone(), config.refresh_interval);

    // Operator identities
    let operators: Arc<dyn OperatorKeyProvider> = match &config.operators_path {
        Some(path) => Arc::new(
            InMemoryOperatorKeys::load_file(path)
                .await
                .expect("Failed to load operator keys"),
        ),
        None => {
            warn!("OPERATOR_PLANE_OPERATORS_PATH not set, no operator can authenticate");
            Arc::new(InMemoryOperatorKeys::new())
        }
    };

    let Validators { attestor, jwt } = select_validators(&config);
    let attestation = Arc::new(AttestationPipeline::new(
        attestor.clone(),
        jwt.clone(),
        AttestationSettings::from(&config),
    ));

    let settings = attestation.settings();
    info!(
        port = config.port,
        enforce_jwt = settings.enforce_jwt,
        jwt_audience = %settings.jwt_audience,
        jwt_issuer = %settings.jwt_issuer,
        jwt_validator = jwt.description(),
        attestor = attestor.description(),
        operators = operators.description(),
        content_root = %source.root().display(),
        metadata_path = %store.metadata_path(),
        refresh_secs = config.refresh_interval.as_secs(),
        "Starting operator plane"
    );

    let state = Arc::new(AppState {
        store,
        operators,
        attestation,
    });
    let app = create_router(state);

    let addr = format!("0.0.0.0:{}", config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    info!(addr = %addr, "Operator plane listening");

    axum::serve(listener, app)
        .await
        .expect("Server error");
}
