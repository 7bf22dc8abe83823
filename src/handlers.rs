use crate::{
    AppState,
    auth::{self, AdminUser},
    crud, i18n,
    error::ApiError,
    models::{LoginForm, MessageResponse, RegisterRequest, TokenResponse, UserOut},
    records,
};
use axum::{
    Form, Json,
    extract::{Query, Request, State},
};
use serde::Deserialize;
use serde_json::Value;

// --- Query structs ---

/// LangQuery
///
/// Optional `lang` query parameter on the public contact endpoint, selecting
/// which locale the confirmation message is rendered in.
#[derive(Deserialize, utoipa::IntoParams)]
pub struct LangQuery {
    /// Locale code (uz, ru, en). Unknown or missing values fall back to uz.
    pub lang: Option<String>,
}

// --- Auth Handlers ---

/// Exchanges form credentials for a bearer token.
///
/// Verification failures and unknown usernames produce the same 401 so the
/// response does not reveal which part was wrong.
#[utoipa::path(
    post,
    path = "/auth/token",
    tag = "auth",
    responses(
        (status = 200, description = "Token issued", body = TokenResponse),
        (status = 401, description = "Incorrect username or password")
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Form(form): Form<LoginForm>,
) -> Result<Json<TokenResponse>, ApiError> {
    let user = state
        .repo
        .find_user(&form.username)
        .await?
        .filter(|user| auth::verify_password(&form.password, &user.password))
        .ok_or(ApiError::Unauthenticated("Incorrect username or password"))?;

    let token = auth::issue_token(&user.username, &user.role, &state.config.jwt_secret)?;
    tracing::info!(username = %user.username, "issued access token");

    Ok(Json(TokenResponse {
        access_token: token,
        token_type: "bearer".to_string(),
    }))
}

/// Creates a new credential. Only reachable with an admin token.
#[utoipa::path(
    post,
    path = "/auth/register",
    tag = "auth",
    request_body = RegisterRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "User created", body = MessageResponse),
        (status = 400, description = "Username already exists"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn register(
    _admin: AdminUser,
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let hash = auth::hash_password(&payload.password)?;
    state
        .repo
        .create_user(&payload.username, &hash, &payload.role)
        .await?;
    tracing::info!(username = %payload.username, role = %payload.role, "registered user");

    Ok(Json(MessageResponse {
        message: format!("User {} created successfully", payload.username),
    }))
}

/// Lists every credential without password material.
#[utoipa::path(
    get,
    path = "/auth/users",
    tag = "auth",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All users", body = [UserOut]),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_users(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<UserOut>>, ApiError> {
    let users = state.repo.list_users().await?;
    Ok(Json(users))
}

// --- News Handlers ---

/// The five most recent news posts, newest first.
#[utoipa::path(
    get,
    path = "/news/related-news",
    tag = "news",
    responses((status = 200, description = "Recent news posts"))
)]
pub async fn get_related_news(
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let items = state.repo.list_recent(&records::NEWS, "date", 5).await?;
    Ok(Json(items))
}

// --- Contact Handlers ---

/// Accepts a public contact message, stores it, and forwards a notification.
///
/// The stored row survives a notifier failure; the client then receives 502
/// and may retry, at the cost of a duplicate row.
#[utoipa::path(
    post,
    path = "/contact/send",
    tag = "contact",
    params(LangQuery),
    responses(
        (status = 200, description = "Message accepted", body = MessageResponse),
        (status = 422, description = "Missing required fields"),
        (status = 502, description = "Notification delivery failed")
    )
)]
pub async fn send_contact(
    State(state): State<AppState>,
    Query(query): Query<LangQuery>,
    req: Request,
) -> Result<Json<MessageResponse>, ApiError> {
    let values = crud::extract_values(&records::CONTACTS, &state.storage, req, true).await?;
    let record = state
        .repo
        .insert_record(&records::CONTACTS, &[], &values)
        .await?;
    tracing::info!(id = ?record.get("id"), "stored contact message");

    let sender = values
        .iter()
        .find(|(name, _)| *name == "name")
        .and_then(|(_, value)| value.clone())
        .unwrap_or_default();
    let body = values
        .iter()
        .filter_map(|(name, value)| value.as_ref().map(|v| format!("{name}: {v}")))
        .collect::<Vec<_>>()
        .join("\n");

    state
        .notifier
        .notify(&format!("New contact message from {sender}"), &body)
        .await?;

    let lang = query.lang.as_deref().unwrap_or(i18n::DEFAULT_LANG);
    Ok(Json(MessageResponse {
        message: i18n::message(lang, "message_sent"),
    }))
}

/// Lists stored contact messages for administrators.
#[utoipa::path(
    get,
    path = "/contact/messages",
    tag = "contact",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "All contact messages"),
        (status = 403, description = "Caller is not an admin")
    )
)]
pub async fn list_contact_messages(
    _admin: AdminUser,
    State(state): State<AppState>,
) -> Result<Json<Vec<Value>>, ApiError> {
    let items = state.repo.list_records(&records::CONTACTS, &[]).await?;
    Ok(Json(items))
}
