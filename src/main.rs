use library_lending::{
    adapters::mock::{CatalogService as MockCatalogService, UserDirectory as MockUserDirectory},
    adapters::postgres::{self, PostgresLoanRepository, PostgresPolicyRepository},
    api::{handlers::AppState, router::create_router},
    application::{loan::ServiceDependencies, settings::load_policy},
    config::AppConfig,
};
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() {
    let config = AppConfig::from_env().expect("Failed to load configuration");

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.log_filter.clone().into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Initialize database connection pool
    let pool = sqlx::postgres::PgPoolOptions::new()
        .max_connections(config.max_connections)
        .connect(&config.database_url)
        .await
        .expect("Failed to connect to database");

    postgres::run_migrations(&pool)
        .await
        .expect("Failed to run migrations");

    // Policy is read once; a missing active row stops startup
    let policy = load_policy(&PostgresPolicyRepository::new(pool.clone()))
        .await
        .expect("Failed to load lending policy");

    // Initialize adapters
    let loan_repository = Arc::new(PostgresLoanRepository::new(pool.clone()));
    let user_directory = Arc::new(MockUserDirectory::new());
    let catalog_service = Arc::new(MockCatalogService::new());

    // Create service dependencies
    let service_deps = ServiceDependencies {
        loan_repository,
        user_directory,
        catalog_service,
        policy,
    };

    // Create application state
    let app_state = Arc::new(AppState { service_deps });

    // Create router
    let app = create_router(app_state);

    let addr = config.server_addr();
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind to address");

    tracing::info!("Server listening on {}", addr);

    // Start server
    axum::serve(listener, app)
        .await
        .expect("Failed to start server");
}
