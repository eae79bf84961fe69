//! Route handlers bound into a dispatcher.

mod entity;

pub use entity::register_crud;

use crate::dispatch::DispatcherBuilder;
use crate::model::ModelRegistry;

/// CRUD routes for every registered kind, in registration order.
pub fn register_all(builder: DispatcherBuilder, registry: &ModelRegistry) -> DispatcherBuilder {
    registry
        .models()
        .iter()
        .fold(builder, |builder, model| register_crud(builder, model.kind()))
}
