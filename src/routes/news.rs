use crate::{AppState, crud::record_routes, handlers, records};
use axum::{Router, routing::get};

/// News Router Module
///
/// Mounted under `/news`. News posts are paginated and expose a detail
/// endpoint; the related-news route serves the five most recent posts for
/// the sidebar.
pub fn news_routes() -> Router<AppState> {
    Router::new()
        // GET /news/related-news
        // The five most recent news posts, newest first.
        .route("/related-news", get(handlers::get_related_news))
        .merge(record_routes(&records::ANNOUNCEMENTS))
        .merge(record_routes(&records::NEWS))
        .merge(record_routes(&records::ANTICORRUPTION))
}
