//! Record-schema descriptors.
//!
//! Every resource the portal serves follows the exact same CRUD protocol, so
//! instead of hand-writing one handler set per table the protocol is
//! implemented once (in `crud`) and parametrized by the descriptors below:
//! table name, field list with required/optional/file kinds, parent
//! references for the norm hierarchy, and pagination/detail flags. Adding a
//! resource means adding one static here and mounting it in `routes`.

/// FieldKind
///
/// How a record field is supplied and stored. File kinds are routed through
/// the attachment store on the way in and persisted as reference paths.
#[derive(Debug, Clone, Copy)]
pub enum FieldKind {
    /// Required text column.
    Text,
    /// Nullable text column.
    OptionalText,
    /// Required attachment: the create payload must carry the file.
    File {
        allowed: &'static [&'static str],
        subdir: &'static str,
    },
    /// Nullable attachment.
    OptionalFile {
        allowed: &'static [&'static str],
        subdir: &'static str,
    },
}

/// One typed field of a record schema.
#[derive(Debug, Clone, Copy)]
pub struct FieldDef {
    pub name: &'static str,
    pub kind: FieldKind,
}

impl FieldDef {
    pub const fn text(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Text,
        }
    }

    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::OptionalText,
        }
    }

    pub const fn file(
        name: &'static str,
        allowed: &'static [&'static str],
        subdir: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::File { allowed, subdir },
        }
    }

    pub const fn optional_file(
        name: &'static str,
        allowed: &'static [&'static str],
        subdir: &'static str,
    ) -> Self {
        Self {
            name,
            kind: FieldKind::OptionalFile { allowed, subdir },
        }
    }

    pub fn is_file(&self) -> bool {
        matches!(
            self.kind,
            FieldKind::File { .. } | FieldKind::OptionalFile { .. }
        )
    }

    pub fn is_required(&self) -> bool {
        matches!(self.kind, FieldKind::Text | FieldKind::File { .. })
    }

    /// Allow-list and destination subdirectory for file kinds.
    pub fn file_target(&self) -> Option<(&'static [&'static str], &'static str)> {
        match self.kind {
            FieldKind::File { allowed, subdir } | FieldKind::OptionalFile { allowed, subdir } => {
                Some((allowed, subdir))
            }
            FieldKind::Text | FieldKind::OptionalText => None,
        }
    }
}

/// ParentRef
///
/// One level of the norm containment hierarchy. The path parameter doubles
/// as the foreign-key column on the child table. `scoped_by` names a column
/// on the parent table that must equal an earlier path parameter (a group
/// must belong to the norm named in the same URL).
#[derive(Debug, Clone, Copy)]
pub struct ParentRef {
    pub param: &'static str,
    pub table: &'static str,
    pub display: &'static str,
    pub scoped_by: Option<&'static str>,
}

/// RecordSchema
///
/// The full descriptor for one resource type. `path` is relative to the
/// route group it is mounted under ("/laws" under "/documents").
#[derive(Debug, Clone, Copy)]
pub struct RecordSchema {
    /// Human-readable singular name, used in "{display} not found" details.
    pub display: &'static str,
    pub table: &'static str,
    pub path: &'static str,
    pub fields: &'static [FieldDef],
    pub parents: &'static [ParentRef],
    /// List responses are wrapped in a page container.
    pub paginated: bool,
    /// An unauthenticated GET /{id} detail route is mounted.
    pub has_detail: bool,
}

const PDF: &[&str] = &["pdf"];
const IMAGE: &[&str] = &["jpg", "jpeg", "png"];
const DOCUMENT: &[&str] = &["pdf", "jpg", "jpeg", "png", "doc", "docx"];

// --- /institute ---

pub static INSTITUTE_INFO: RecordSchema = RecordSchema {
    display: "Institute info",
    table: "institute_info",
    path: "/about",
    fields: &[
        FieldDef::text("content"),
        FieldDef::optional("charter_pdf"),
        FieldDef::optional("statute_pdf"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static MANAGEMENT: RecordSchema = RecordSchema {
    display: "Management",
    table: "management",
    path: "/management",
    fields: &[
        FieldDef::optional("image"),
        FieldDef::text("position"),
        FieldDef::text("full_name"),
        FieldDef::optional("phone"),
        FieldDef::optional("email"),
        FieldDef::optional("specialty"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static STRUCTURE: RecordSchema = RecordSchema {
    display: "Structure",
    table: "structure",
    path: "/structure",
    fields: &[FieldDef::text("image")],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static DEPARTMENTS: RecordSchema = RecordSchema {
    display: "Department",
    table: "departments",
    path: "/departments",
    fields: &[
        FieldDef::optional("image"),
        FieldDef::text("name"),
        FieldDef::text("head"),
        FieldDef::optional("head_phone"),
        FieldDef::optional("head_email"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static VACANCIES: RecordSchema = RecordSchema {
    display: "Vacancy",
    table: "vacancies",
    path: "/vacancies",
    fields: &[
        FieldDef::text("title"),
        FieldDef::text("position"),
        FieldDef::text("department"),
        FieldDef::optional("requirements"),
        FieldDef::text("status"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

// --- /documents ---

pub static LAWS: RecordSchema = RecordSchema {
    display: "Law",
    table: "laws",
    path: "/laws",
    fields: &[
        FieldDef::text("name"),
        FieldDef::text("order_number"),
        FieldDef::text("adopted_date"),
        FieldDef::text("effective_date"),
        FieldDef::text("issuing_authority"),
        FieldDef::file("link", PDF, "laws"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static URBAN_NORMS: RecordSchema = RecordSchema {
    display: "Norm",
    table: "urban_norms",
    path: "/urban-norms",
    fields: &[FieldDef::text("norm_name")],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static NORM_GROUPS: RecordSchema = RecordSchema {
    display: "Group",
    table: "norm_groups",
    path: "/urban-norms/{norm_id}/groups",
    fields: &[FieldDef::text("group_name")],
    parents: &[ParentRef {
        param: "norm_id",
        table: "urban_norms",
        display: "Norm",
        scoped_by: None,
    }],
    paginated: false,
    has_detail: false,
};

pub static NORM_DOCUMENTS: RecordSchema = RecordSchema {
    display: "Document",
    table: "norm_documents",
    path: "/urban-norms/{norm_id}/groups/{group_id}/documents",
    fields: &[
        FieldDef::text("code"),
        FieldDef::text("name"),
        FieldDef::file("link", PDF, "norm-documents"),
    ],
    parents: &[
        ParentRef {
            param: "norm_id",
            table: "urban_norms",
            display: "Norm",
            scoped_by: None,
        },
        // The group must belong to the norm named in the same URL.
        ParentRef {
            param: "group_id",
            table: "norm_groups",
            display: "Group",
            scoped_by: Some("norm_id"),
        },
    ],
    paginated: false,
    has_detail: false,
};

pub static STANDARDS: RecordSchema = RecordSchema {
    display: "Standard",
    table: "standards",
    path: "/standards",
    fields: &[
        FieldDef::text("code"),
        FieldDef::text("name"),
        FieldDef::file("pdf_link", PDF, "standards"),
    ],
    parents: &[],
    paginated: true,
    has_detail: false,
};

pub static REGULATIONS: RecordSchema = RecordSchema {
    display: "Regulation",
    table: "regulations",
    path: "/regulations",
    fields: &[
        FieldDef::text("code"),
        FieldDef::text("name"),
        FieldDef::file("pdf_link", PDF, "regulations"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static RESOURCE_NORMS: RecordSchema = RecordSchema {
    display: "Resource norm",
    table: "resource_norms",
    path: "/resource-norms",
    fields: &[
        FieldDef::text("code"),
        FieldDef::text("name"),
        FieldDef::optional_file("pdf_link", PDF, "resource-norms"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static REFERENCE_DOCS: RecordSchema = RecordSchema {
    display: "Reference",
    table: "reference_docs",
    path: "/reference-docs",
    fields: &[
        FieldDef::text("name"),
        FieldDef::file("pdf_link", PDF, "reference-docs"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

// --- /news ---

pub static ANNOUNCEMENTS: RecordSchema = RecordSchema {
    display: "Announcement",
    table: "announcements",
    path: "/announcements",
    fields: &[
        FieldDef::text("title"),
        FieldDef::text("content"),
        FieldDef::text("date"),
        FieldDef::optional_file("image", IMAGE, "announcements"),
        FieldDef::optional("link"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

pub static NEWS: RecordSchema = RecordSchema {
    display: "News",
    table: "news",
    path: "/news",
    fields: &[
        FieldDef::text("title"),
        FieldDef::text("content"),
        FieldDef::text("date"),
        FieldDef::optional_file("image", IMAGE, "news"),
    ],
    parents: &[],
    paginated: true,
    has_detail: true,
};

pub static ANTICORRUPTION: RecordSchema = RecordSchema {
    display: "Anticorruption",
    table: "anticorruption",
    path: "/anticorruption",
    fields: &[
        FieldDef::text("title"),
        FieldDef::text("content"),
        FieldDef::optional("minister_message"),
        FieldDef::text("date"),
        FieldDef::optional_file("image", IMAGE, "anticorruption"),
        FieldDef::optional_file("document_link", PDF, "anticorruption"),
        FieldDef::optional("telegram_link"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

// --- /contact ---

/// Contact messages reuse the generic engine on the repository side but are
/// mounted through dedicated handlers: submission is anonymous and triggers
/// the notification relay, listing is admin-only.
pub static CONTACTS: RecordSchema = RecordSchema {
    display: "Contact message",
    table: "contacts",
    path: "/messages",
    fields: &[
        FieldDef::text("name"),
        FieldDef::text("email"),
        FieldDef::text("subject"),
        FieldDef::text("message"),
        FieldDef::optional_file("file", DOCUMENT, "contact"),
    ],
    parents: &[],
    paginated: false,
    has_detail: false,
};

/// Every schema with a backing table, in bootstrap/DDL order (parents before
/// children).
pub static ALL: &[&RecordSchema] = &[
    &INSTITUTE_INFO,
    &MANAGEMENT,
    &STRUCTURE,
    &DEPARTMENTS,
    &VACANCIES,
    &LAWS,
    &URBAN_NORMS,
    &NORM_GROUPS,
    &NORM_DOCUMENTS,
    &STANDARDS,
    &REGULATIONS,
    &RESOURCE_NORMS,
    &REFERENCE_DOCS,
    &ANNOUNCEMENTS,
    &NEWS,
    &ANTICORRUPTION,
    &CONTACTS,
];
