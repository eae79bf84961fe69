//! Address book service: one `addressbook_entry` kind served over CRUD routes.
//!
//! Run from repo root: `cargo run -p addressbook`
//! Set `APIKIT_SCHEMA_PATH` to serve the kinds from a schema file instead.

use apikit::{
    api_routes, build_registry, common_routes, connect_backend, load_schemas, register_all, resolve, AppState,
    ConfigError, Dispatcher, EntitySchema, Property, Settings,
};
use std::sync::Arc;
use tokio::net::TcpListener;

fn addressbook_entry() -> Result<EntitySchema, ConfigError> {
    EntitySchema::builder("addressbook_entry")
        .property("name", Property::string().not_null().max_length(100))
        .property("email", Property::string().max_length(100))
        .build()
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::load()?;
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("apikit=info,addressbook=info")),
        )
        .init();

    let backend = connect_backend(&settings).await?;
    let registry = match &settings.schema_path {
        Some(path) => {
            tracing::info!(path = %path.display(), "loading schemas");
            resolve(&load_schemas(path).await?, &backend).await?
        }
        None => build_registry(vec![addressbook_entry()?], &backend).await?,
    };
    let registry = Arc::new(registry);
    let dispatcher = register_all(Dispatcher::builder(Arc::clone(&registry)), &registry).build()?;
    for route in dispatcher.routes() {
        tracing::debug!(method = %route.method(), pattern = route.pattern(), "route");
    }

    let state = AppState::new(dispatcher, settings.max_body_bytes);
    let app = common_routes().nest(&settings.api_prefix, api_routes(state));

    let listener = TcpListener::bind(settings.bind_addr).await?;
    tracing::info!(
        "addressbook listening on http://{}{} ({} storage, {} kinds)",
        listener.local_addr()?,
        settings.api_prefix,
        backend.name(),
        registry.len()
    );
    axum::serve(listener, app).await?;
    Ok(())
}
