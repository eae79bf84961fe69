//! Entity CRUD handlers: list, read, create, update, delete.

use crate::dispatch::{Body, DispatcherBuilder, RequestContext, RouteArgs};
use crate::entity::Entity;
use crate::error::ApiError;
use crate::model::Model;
use crate::query::Feed;
use crate::schema::{json_type_name, KEY_FIELD};
use crate::store::Key;
use serde_json::{Map, Value};
use std::sync::Arc;

/// Register the five CRUD routes for `kind`:
///
/// | method | path           | result          |
/// |--------|----------------|-----------------|
/// | GET    | `/kind`        | feed            |
/// | POST   | `/kind`        | created entity  |
/// | GET    | `/kind/<key>`  | entity          |
/// | PUT    | `/kind/<key>`  | updated entity  |
/// | DELETE | `/kind/<key>`  | `true`          |
pub fn register_crud(builder: DispatcherBuilder, kind: &str) -> DispatcherBuilder {
    let collection = format!(r"/{}/?", regex::escape(kind));
    let member = format!(r"/{}/(\d+)/?", regex::escape(kind));
    let kind: Arc<str> = Arc::from(kind);
    builder
        .get(collection.clone(), bound(&kind, list))
        .post(collection, bound(&kind, create))
        .get(member.clone(), bound(&kind, read))
        .put(member.clone(), bound(&kind, update))
        .delete(member, bound(&kind, delete))
}

fn bound<F, Fut>(kind: &Arc<str>, handler: F) -> impl Fn(RequestContext, RouteArgs) -> Fut + Send + Sync + 'static
where
    F: Fn(Arc<str>, RequestContext, RouteArgs) -> Fut + Send + Sync + 'static,
{
    let kind = Arc::clone(kind);
    move |ctx: RequestContext, args: RouteArgs| handler(Arc::clone(&kind), ctx, args)
}

async fn list(kind: Arc<str>, ctx: RequestContext, _args: RouteArgs) -> Result<Feed, ApiError> {
    let model = ctx.model(&kind)?;
    let limit = ctx.limit()?;
    model.query().execute(limit).await
}

async fn read(kind: Arc<str>, ctx: RequestContext, args: RouteArgs) -> Result<Entity, ApiError> {
    let model = ctx.model(&kind)?;
    let key = args.key(0)?;
    fetch(&model, key).await
}

async fn create(kind: Arc<str>, ctx: RequestContext, mut args: RouteArgs) -> Result<Entity, ApiError> {
    let model = ctx.model(&kind)?;
    let mut entity = match args.take_body() {
        Some(Body::Entity(entity)) => {
            expect_kind(&entity, &kind)?;
            entity
        }
        Some(Body::Json(raw)) => model.decode(raw)?,
        Some(Body::Partial { kind: tagged, values }) => {
            expect_tag(&tagged, &kind)?;
            model.create(values)?
        }
        None => return Err(ApiError::Decode(format!("missing {} body", kind))),
    };
    let key = entity.persist().await?;
    tracing::debug!(kind = %kind, %key, "created");
    Ok(entity)
}

/// Partial update: only the supplied fields are validated and changed. The
/// payload is checked before the lookup so invalid data is a 400 even for a
/// missing key.
async fn update(kind: Arc<str>, ctx: RequestContext, mut args: RouteArgs) -> Result<Entity, ApiError> {
    let model = ctx.model(&kind)?;
    let key = args.key(0)?;
    let values = match args.take_body() {
        Some(Body::Partial { kind: tagged, values }) => {
            expect_tag(&tagged, &kind)?;
            values
        }
        Some(Body::Entity(entity)) => {
            expect_kind(&entity, &kind)?;
            entity.values()
        }
        Some(Body::Json(Value::Object(mut values))) => {
            values.remove(KEY_FIELD);
            values
        }
        Some(Body::Json(other)) => {
            return Err(ApiError::Decode(format!(
                "{} body must be a JSON object, got {}",
                kind,
                json_type_name(&other)
            )))
        }
        None => Map::new(),
    };
    let values = model.schema().validate_partial(values)?;
    let mut entity = fetch(&model, key).await?;
    entity.update(values).await?;
    Ok(entity)
}

async fn delete(kind: Arc<str>, ctx: RequestContext, args: RouteArgs) -> Result<bool, ApiError> {
    let model = ctx.model(&kind)?;
    let key = args.key(0)?;
    let mut entity = fetch(&model, key).await?;
    entity.delete().await?;
    tracing::debug!(kind = %kind, %key, "deleted");
    Ok(true)
}

async fn fetch(model: &Arc<Model>, key: Key) -> Result<Entity, ApiError> {
    model
        .get_by_key(key)
        .await?
        .ok_or_else(|| ApiError::EntityNotFound {
            kind: model.kind().to_string(),
            key,
        })
}

fn expect_kind(entity: &Entity, kind: &str) -> Result<(), ApiError> {
    expect_tag(entity.kind(), kind)
}

fn expect_tag(tagged: &str, kind: &str) -> Result<(), ApiError> {
    if tagged != kind {
        return Err(ApiError::BadRequest(format!("expected {} entity, got {}", kind, tagged)));
    }
    Ok(())
}
