//! The generic record CRUD protocol.
//!
//! One set of handlers serves every resource type. Each mounted route group
//! carries its `RecordSchema` descriptor in an `Extension` layer; handlers
//! read the descriptor for field validation, attachment routing, parent
//! checks, and pagination. Mutations pass through the `AdminUser` gate,
//! reads are anonymous.

use axum::{
    Extension, Json, Router,
    extract::{FromRequest, Multipart, Query, RawPathParams, Request, State},
    http::{StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, put},
};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::{
    AppState,
    auth::AdminUser,
    error::ApiError,
    records::RecordSchema,
    repository::RecordValues,
    storage::StorageState,
};

/// Default page size for paginated list endpoints when the client does not
/// ask for one.
pub const DEFAULT_PAGE_SIZE: i64 = 50;

/// Query parameters accepted by paginated list endpoints.
#[derive(Debug, Deserialize)]
pub struct PageParams {
    pub page: Option<i64>,
    pub size: Option<i64>,
}

/// Page
///
/// Container for one page of a paginated listing: the requested slice plus
/// the total row count and derived page count.
#[derive(Debug, Serialize)]
pub struct Page {
    pub items: Vec<Value>,
    pub total: i64,
    pub page: i64,
    pub size: i64,
    pub pages: i64,
}

// --- Path parameter helpers ---

fn path_param(params: &RawPathParams, name: &str) -> Result<i64, ApiError> {
    params
        .iter()
        .find(|(key, _)| *key == name)
        .ok_or_else(|| ApiError::Validation(format!("missing path parameter '{name}'")))?
        .1
        .parse::<i64>()
        .map_err(|_| ApiError::Validation(format!("path parameter '{name}' must be an integer")))
}

/// Resolves the hierarchy ids named by the route, in descriptor order.
fn parent_ids(schema: &RecordSchema, params: &RawPathParams) -> Result<Vec<i64>, ApiError> {
    schema
        .parents
        .iter()
        .map(|parent| path_param(params, parent.param))
        .collect()
}

// --- Payload extraction ---

/// Builds the aligned value list for a create or update from either a JSON
/// body or a multipart form, routing uploaded files through the attachment
/// store. On update (`create == false`) file fields may be omitted: the
/// absent value later coalesces to the stored reference.
pub async fn extract_values(
    schema: &'static RecordSchema,
    storage: &StorageState,
    req: Request,
    create: bool,
) -> Result<RecordValues, ApiError> {
    let content_type = req
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("")
        .to_string();

    let mut collected: Vec<(&'static str, String)> = Vec::new();

    if content_type.starts_with("multipart/form-data") {
        let mut multipart = Multipart::from_request(req, &())
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;

        while let Some(field) = multipart
            .next_field()
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?
        {
            let Some(name) = field.name().map(str::to_string) else {
                continue;
            };
            // Unknown form parts are ignored rather than rejected.
            let Some(def) = schema.fields.iter().find(|f| f.name == name.as_str()) else {
                continue;
            };
            let def = *def;

            if let Some((allowed, subdir)) = def.file_target() {
                let filename = field.file_name().unwrap_or("").to_string();
                let data = field
                    .bytes()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                // Browsers submit an empty part for an untouched file input.
                if filename.is_empty() && data.is_empty() {
                    continue;
                }
                let path = storage.save(&filename, &data, allowed, subdir).await?;
                collected.push((def.name, path));
            } else {
                let text = field
                    .text()
                    .await
                    .map_err(|e| ApiError::Validation(e.to_string()))?;
                collected.push((def.name, text));
            }
        }
    } else {
        let Json(payload) = Json::<Value>::from_request(req, &())
            .await
            .map_err(|e| ApiError::Validation(e.to_string()))?;
        let object = payload
            .as_object()
            .ok_or_else(|| ApiError::Validation("request body must be a JSON object".to_string()))?;

        for field in schema.fields {
            match object.get(field.name) {
                None | Some(Value::Null) => {}
                // File fields submitted as JSON carry an already-stored
                // reference path, kept verbatim.
                Some(Value::String(s)) => collected.push((field.name, s.clone())),
                Some(_) => {
                    return Err(ApiError::Validation(format!(
                        "field '{}' must be a string",
                        field.name
                    )));
                }
            }
        }
    }

    let mut values = RecordValues::with_capacity(schema.fields.len());
    for field in schema.fields {
        let value = collected
            .iter()
            .rev()
            .find(|(name, _)| *name == field.name)
            .map(|(_, v)| v.clone());
        if value.is_none() && field.is_required() && (create || !field.is_file()) {
            return Err(ApiError::Validation(format!(
                "field '{}' is required",
                field.name
            )));
        }
        values.push((field.name, value));
    }
    Ok(values)
}

// --- Generic handlers ---

/// Unauthenticated listing; wrapped in a page container for paginated
/// schemas, a bare array otherwise.
pub async fn list_records(
    Extension(schema): Extension<&'static RecordSchema>,
    State(state): State<AppState>,
    params: RawPathParams,
    Query(page_params): Query<PageParams>,
) -> Result<Response, ApiError> {
    let parents = parent_ids(schema, &params)?;

    if schema.paginated {
        let page = page_params.page.unwrap_or(1).max(1);
        let size = page_params
            .size
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, DEFAULT_PAGE_SIZE);
        let (items, total) = state.repo.list_page(schema, &parents, page, size).await?;
        let pages = if total == 0 { 0 } else { (total + size - 1) / size };
        Ok(Json(Page {
            items,
            total,
            page,
            size,
            pages,
        })
        .into_response())
    } else {
        let items = state.repo.list_records(schema, &parents).await?;
        Ok(Json(items).into_response())
    }
}

/// Unauthenticated single-record detail, mounted only for schemas that opt
/// in via `has_detail`.
pub async fn get_record(
    Extension(schema): Extension<&'static RecordSchema>,
    State(state): State<AppState>,
    params: RawPathParams,
) -> Result<Json<Value>, ApiError> {
    let parents = parent_ids(schema, &params)?;
    let id = path_param(&params, "id")?;
    let record = state
        .repo
        .get_record(schema, &parents, id)
        .await?
        .ok_or(ApiError::NotFound(schema.display))?;
    Ok(Json(record))
}

/// Admin-gated create. 201 with the full record including its assigned id.
pub async fn create_record(
    _admin: AdminUser,
    Extension(schema): Extension<&'static RecordSchema>,
    State(state): State<AppState>,
    params: RawPathParams,
    req: Request,
) -> Result<Response, ApiError> {
    let parents = parent_ids(schema, &params)?;
    let values = extract_values(schema, &state.storage, req, true).await?;
    let record = state.repo.insert_record(schema, &parents, &values).await?;
    Ok((StatusCode::CREATED, Json(record)).into_response())
}

/// Admin-gated full update: 404 before any write when the id does not
/// resolve, coalesce semantics for file fields.
pub async fn update_record(
    _admin: AdminUser,
    Extension(schema): Extension<&'static RecordSchema>,
    State(state): State<AppState>,
    params: RawPathParams,
    req: Request,
) -> Result<Json<Value>, ApiError> {
    let parents = parent_ids(schema, &params)?;
    let id = path_param(&params, "id")?;
    let values = extract_values(schema, &state.storage, req, false).await?;
    let record = state
        .repo
        .update_record(schema, &parents, id, &values)
        .await?
        .ok_or(ApiError::NotFound(schema.display))?;
    Ok(Json(record))
}

/// Admin-gated delete. Does not cascade into the norm hierarchy.
pub async fn delete_record(
    _admin: AdminUser,
    Extension(schema): Extension<&'static RecordSchema>,
    State(state): State<AppState>,
    params: RawPathParams,
) -> Result<Json<Value>, ApiError> {
    let parents = parent_ids(schema, &params)?;
    let id = path_param(&params, "id")?;
    if !state.repo.delete_record(schema, &parents, id).await? {
        return Err(ApiError::NotFound(schema.display));
    }
    Ok(Json(json!({
        "message": format!("{} deleted", schema.display)
    })))
}

// --- Router assembly ---

/// Mounts the uniform protocol for one schema: collection route (list +
/// create), item route (update + delete, plus detail when flagged), with the
/// descriptor attached as an extension.
pub fn record_routes(schema: &'static RecordSchema) -> Router<AppState> {
    let item_path = format!("{}/{{id}}", schema.path);

    let item_routes = if schema.has_detail {
        get(get_record).put(update_record).delete(delete_record)
    } else {
        put(update_record).delete(delete_record)
    };

    Router::new()
        .route(schema.path, get(list_records).post(create_record))
        .route(&item_path, item_routes)
        .layer(Extension(schema))
}
