/// Router Module Index
///
/// Organizes the application's routing logic by domain area, mirroring the
/// URL prefixes the service mounts. Record resources share the generic CRUD
/// protocol; each module lists which descriptors it mounts plus any
/// endpoints specific to that area.

/// Credential endpoints: token issuance, registration, user listing.
pub mod auth;

/// Institute pages: general info, management, structure, departments, vacancies.
pub mod institute;

/// The document library, including the three-level urban norm hierarchy.
pub mod documents;

/// Announcements, news posts, and anti-corruption notices.
pub mod news;

/// Public contact form and the admin-only message archive.
pub mod contact;
