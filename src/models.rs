use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

// --- Credential schemas ---

/// Credential
///
/// A row of the `users` table: the canonical identity record. The password
/// field holds a salted PHC-format hash, never a plaintext, and is never
/// serialized into a response.
#[derive(Debug, Clone, FromRow)]
pub struct Credential {
    pub id: i64,
    pub username: String,
    pub password: String,
    pub role: String,
}

/// UserOut
///
/// The public projection of a credential: username and role only. Returned
/// by the admin user listing; the hash never leaves the repository layer.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema, FromRow)]
pub struct UserOut {
    pub username: String,
    pub role: String,
}

// --- Auth payloads ---

/// LoginForm
///
/// Form-encoded credentials accepted by the token endpoint.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct LoginForm {
    pub username: String,
    pub password: String,
}

/// TokenResponse
///
/// Successful login result: the signed bearer token plus its scheme label.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: String,
}

/// RegisterRequest
///
/// Admin-only registration payload. The role defaults to "admin" when the
/// caller omits it, matching the established client contract.
#[derive(Debug, Clone, Deserialize, ToSchema)]
pub struct RegisterRequest {
    pub username: String,
    pub password: String,
    #[serde(default = "default_role")]
    pub role: String,
}

fn default_role() -> String {
    "admin".to_string()
}

/// MessageResponse
///
/// Generic `{"message": ...}` acknowledgement body used by registration,
/// deletes, and the contact flow.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct MessageResponse {
    pub message: String,
}
