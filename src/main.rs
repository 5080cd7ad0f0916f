//! modelql server
//!
//! Introspects the configured SQLite database and serves the derived
//! GraphQL API at /graphql.

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Context;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use modelql::config::Config;
use modelql::runtime::{SharedRuntime, SqliteRuntime, introspect};
use modelql::server::{self, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    let config = Config::from_env()?;

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "modelql=debug,tower_http=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer().json())
        .init();

    tracing::info!("Starting modelql");

    let runtime = SqliteRuntime::connect(&config.database_url, config.database_max_connections)
        .await
        .with_context(|| format!("Failed to open database {}", config.database_url))?;
    tracing::info!(url = %config.database_url, "Database connected");

    let registry = introspect(runtime.pool(), &config.introspect_options())
        .await
        .context("Failed to introspect database")?;
    if registry.is_empty() {
        tracing::warn!("Database has no tables; the schema will not build");
    }

    let type_options = config.type_options()?;
    let pool = runtime.pool().clone();
    let shared: SharedRuntime = Arc::new(runtime);
    let schema = modelql::build_schema(&registry, shared, &type_options)
        .context("Failed to build GraphQL schema")?;
    tracing::info!("GraphQL schema built");

    let app = server::router(AppState { schema, pool });

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let public_host = config.host.as_deref().unwrap_or("localhost");
    tracing::info!("Listening on {}", addr);
    tracing::info!("GraphQL playground: http://{}:{}/graphql", public_host, config.port);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
