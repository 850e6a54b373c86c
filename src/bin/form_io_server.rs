//! Form-io REST API Server
//!
//! ## Usage
//!
//! ```bash
//! OPENAI_API_KEY=sk-... FORM_IO_COMPUTE_URL=http://localhost:6001 \
//!   cargo run --bin form_io_server
//!
//! curl -X POST http://localhost:8000/api/chat/ \
//!   -H "Content-Type: application/json" \
//!   -d '{"prompt": "increase block2 width", "inputs": {"block2_width": 15000}}'
//!
//! curl -X POST http://localhost:8000/api/rhino/solve/ \
//!   -d grasshopper_file_name=form_io_main_002.gh \
//!   --data-urlencode 'input_data={"podium_length": 30000}'
//! ```
//!
//! With the `database` feature and `DATABASE_URL` set, projects are stored in
//! PostgreSQL; otherwise they live in memory for the life of the process.

use std::sync::Arc;

use anyhow::Context;
use tower_http::services::ServeDir;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use form_io::api::{create_router, AppState};
use form_io::compute::{ComputeClient, ComputePayloadBuilder, ComputeService, DefinitionStore};
use form_io::config::AppConfig;
use form_io::llm::create_llm_client;
use form_io::parameters::ParameterCatalog;
use form_io::project::{InMemoryProjectStore, ProjectStore};
use form_io::ChatPipeline;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("form_io=info,tower_http=debug")),
        )
        .init();

    let config = AppConfig::from_env().context("Invalid configuration")?;

    let catalog = match &config.catalog_path {
        Some(path) => ParameterCatalog::load_from_file(path)
            .with_context(|| format!("Failed to load catalog {}", path.display()))?,
        None => ParameterCatalog::load_default()?,
    };
    let catalog = Arc::new(catalog);
    info!(
        version = catalog.version(),
        parameters = catalog.len(),
        "Parameter catalog loaded"
    );

    let llm = create_llm_client(&config.llm, config.http)?;
    let pipeline = Arc::new(ChatPipeline::new(llm, catalog.clone()));

    if !config.definitions_dir.is_dir() {
        warn!(
            dir = %config.definitions_dir.display(),
            "Definitions directory does not exist; every solve will return 404"
        );
    }
    let compute = Arc::new(ComputeService::new(
        ComputePayloadBuilder::new(
            catalog.clone(),
            DefinitionStore::new(config.definitions_dir.clone()),
        ),
        ComputeClient::new(config.compute_url.clone(), config.http)?,
    ));
    info!(compute_url = %config.compute_url, "Rhino Compute client ready");

    let projects = project_store(&config).await?;

    let state = AppState {
        catalog,
        pipeline,
        compute,
        projects,
    };

    let mut app = create_router(state);
    if let Some(dir) = &config.static_dir {
        info!(dir = %dir.display(), "Serving static files");
        app = app.fallback_service(ServeDir::new(dir));
    }

    let listener = tokio::net::TcpListener::bind(config.bind_addr)
        .await
        .with_context(|| format!("Failed to bind {}", config.bind_addr))?;
    info!("Form-io server listening on http://{}", config.bind_addr);

    axum::serve(listener, app).await?;
    Ok(())
}

#[cfg(feature = "database")]
async fn project_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ProjectStore>> {
    use form_io::project::PgProjectStore;
    use sqlx::postgres::PgPoolOptions;

    let Some(database_url) = &config.database_url else {
        warn!("DATABASE_URL not set; projects are kept in memory");
        return Ok(Arc::new(InMemoryProjectStore::new()));
    };

    let pool = PgPoolOptions::new()
        .max_connections(10)
        .connect(database_url)
        .await
        .context("Failed to connect to database")?;
    let store = PgProjectStore::new(pool);
    store.ensure_schema().await?;
    info!("Project store: PostgreSQL");
    Ok(Arc::new(store))
}

#[cfg(not(feature = "database"))]
async fn project_store(config: &AppConfig) -> anyhow::Result<Arc<dyn ProjectStore>> {
    if config.database_url.is_some() {
        warn!("DATABASE_URL is set but the database feature is off; projects are kept in memory");
    }
    Ok(Arc::new(InMemoryProjectStore::new()))
}
