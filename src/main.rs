use auth_service::auth::{spawn_sweeper, InMemoryRefreshTokenRegistry, RefreshTokenRegistry};
use auth_service::configuration::get_configuration;
use auth_service::credentials::{CredentialStore, InMemoryCredentialStore, PgCredentialStore};
use auth_service::gateway::AuthGateway;
use auth_service::startup::run;
use auth_service::telemetry::init_telemetry;
use sqlx::postgres::PgPoolOptions;
use std::net::TcpListener;
use std::sync::Arc;
use std::time::Duration;

#[tokio::main]
async fn main() -> std::io::Result<()> {
    init_telemetry();

    tracing::info!("Starting auth service");

    let configuration = match get_configuration() {
        Ok(config) => {
            tracing::info!("Configuration loaded successfully");
            config
        }
        Err(e) => {
            tracing::error!("Failed to read configuration: {}", e);
            return Err(std::io::Error::new(
                std::io::ErrorKind::InvalidInput,
                "Configuration error",
            ));
        }
    };

    let bcrypt_cost = configuration.credentials.bcrypt_cost;
    let credentials: Arc<dyn CredentialStore> = match &configuration.database {
        Some(database) => {
            tracing::info!("Attempting to connect to database");
            let pool = PgPoolOptions::new()
                .max_connections(10)
                .connect(&database.connection_string())
                .await
                .map_err(|e| {
                    tracing::error!("Failed to create connection pool: {}", e);
                    std::io::Error::new(
                        std::io::ErrorKind::ConnectionRefused,
                        "Database connection error",
                    )
                })?;
            tracing::info!("Database connection pool created successfully");
            Arc::new(PgCredentialStore::new(pool, bcrypt_cost))
        }
        None => {
            tracing::warn!("No database configured; users are kept in memory");
            Arc::new(InMemoryCredentialStore::new(bcrypt_cost))
        }
    };

    let registry: Arc<dyn RefreshTokenRegistry> = Arc::new(InMemoryRefreshTokenRegistry::new());

    // A missing signing secret stops the process here, never per request.
    let gateway = AuthGateway::from_settings(&configuration.jwt, credentials, registry.clone())
        .map_err(|e| {
            tracing::error!("Refusing to start: {}", e);
            std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string())
        })?;

    let sweeper = spawn_sweeper(
        registry,
        Duration::from_secs(configuration.registry.sweep_interval_secs.max(1)),
    );

    let address = format!(
        "{}:{}",
        configuration.application.host, configuration.application.port
    );
    let listener = TcpListener::bind(&address)?;
    tracing::info!("Server listening on: {}", address);

    let server = run(listener, gateway)?;
    let result = server.await;

    sweeper.abort();
    result
}
