use crate::{AppState, handlers};
use axum::{
    Router,
    routing::{get, post},
};

/// Contact Router Module
///
/// Mounted under `/contact`. The send endpoint is the one public write in
/// the whole service; the message archive stays behind the admin gate.
pub fn contact_routes() -> Router<AppState> {
    Router::new()
        // POST /contact/send?lang=...
        // Stores the message and forwards a notification. The localized
        // confirmation follows the lang query parameter.
        .route("/send", post(handlers::send_contact))
        // GET /contact/messages
        // Admin-only archive of everything submitted through the form.
        .route("/messages", get(handlers::list_contact_messages))
}
