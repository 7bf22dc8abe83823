use crate::{AppState, crud::record_routes, records};
use axum::Router;

/// Institute Router Module
///
/// Mounted under `/institute`. All five resources are flat (no parents) and
/// unpaginated; each follows the generic CRUD protocol.
pub fn institute_routes() -> Router<AppState> {
    Router::new()
        .merge(record_routes(&records::INSTITUTE_INFO))
        .merge(record_routes(&records::MANAGEMENT))
        .merge(record_routes(&records::STRUCTURE))
        .merge(record_routes(&records::DEPARTMENTS))
        .merge(record_routes(&records::VACANCIES))
}
