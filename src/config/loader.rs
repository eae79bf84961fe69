//! Load schema configs from JSON and resolve them into a model registry.

use crate::config::{validate, PropertyConfig, PropertyType, SchemaConfig, Settings, StorageKind};
use crate::error::ConfigError;
use crate::model::{Model, ModelRegistry};
use crate::schema::{EntitySchema, Property, PropertyKind};
use crate::store::{PostgresBackend, StorageBackend};
use std::path::Path;

pub fn parse_schemas(json: &str) -> Result<Vec<SchemaConfig>, ConfigError> {
    serde_json::from_str(json).map_err(|e| ConfigError::Load(format!("schema config: {}", e)))
}

pub async fn load_schemas(path: &Path) -> Result<Vec<SchemaConfig>, ConfigError> {
    let json = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| ConfigError::Load(format!("{}: {}", path.display(), e)))?;
    parse_schemas(&json)
}

/// Build one schema (call after validate).
pub fn schema_from_config(config: &SchemaConfig) -> Result<EntitySchema, ConfigError> {
    config
        .properties
        .iter()
        .fold(EntitySchema::builder(config.kind.clone()), |builder, prop| {
            builder.property(prop.name.clone(), property_from_config(prop))
        })
        .build()
}

fn property_from_config(config: &PropertyConfig) -> Property {
    let kind = match config.type_ {
        PropertyType::String => PropertyKind::String {
            min_length: config.min_length,
            max_length: config.max_length,
        },
        PropertyType::Integer => PropertyKind::Integer {
            min_value: config.min_value,
            max_value: config.max_value,
        },
        PropertyType::Key => PropertyKind::Key,
    };
    let property = Property::new(kind);
    if config.not_null {
        property.not_null()
    } else {
        property
    }
}

/// Validate and build every schema, then bind each to an adapter from `backend`.
pub async fn resolve(configs: &[SchemaConfig], backend: &StorageBackend) -> Result<ModelRegistry, ConfigError> {
    validate(configs)?;
    let schemas = configs.iter().map(schema_from_config).collect::<Result<Vec<_>, _>>()?;
    build_registry(schemas, backend).await
}

pub async fn build_registry(
    schemas: Vec<EntitySchema>,
    backend: &StorageBackend,
) -> Result<ModelRegistry, ConfigError> {
    let mut registry = ModelRegistry::builder();
    for schema in schemas {
        let adapter = backend.adapter(schema.kind()).await?;
        tracing::debug!(kind = %schema.kind(), backend = backend.name(), "registered model");
        registry = registry.register(Model::new(schema, adapter)?);
    }
    registry.build()
}

pub async fn connect_backend(settings: &Settings) -> Result<StorageBackend, ConfigError> {
    match &settings.storage {
        StorageKind::Memory => Ok(StorageBackend::memory()),
        StorageKind::Postgres {
            database_url,
            schema,
            max_connections,
        } => {
            let backend = PostgresBackend::connect(database_url, schema.clone(), *max_connections).await?;
            tracing::info!(schema = %schema, "connected to postgres");
            Ok(StorageBackend::Postgres(backend))
        }
    }
}
