use crate::{AppState, crud::record_routes, records};
use axum::Router;

/// Documents Router Module
///
/// Mounted under `/documents`. Covers the flat document collections plus the
/// urban norm hierarchy: norms own groups, groups own norm documents, and
/// the nested paths carry the parent ids that scope each listing. Standards
/// are the one paginated collection here.
pub fn document_routes() -> Router<AppState> {
    Router::new()
        .merge(record_routes(&records::LAWS))
        .merge(record_routes(&records::URBAN_NORMS))
        .merge(record_routes(&records::NORM_GROUPS))
        .merge(record_routes(&records::NORM_DOCUMENTS))
        .merge(record_routes(&records::STANDARDS))
        .merge(record_routes(&records::REGULATIONS))
        .merge(record_routes(&records::RESOURCE_NORMS))
        .merge(record_routes(&records::REFERENCE_DOCS))
}
