use crate::{
    auth::hash_password,
    error::ApiError,
    models::{Credential, UserOut},
    records::{RecordSchema, self},
};
use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{Row, SqliteConnection, SqlitePool, sqlite::SqliteRow};
use std::sync::Arc;

/// Field values for a create or update, aligned one-to-one with
/// `schema.fields`. `None` means "absent": for optional text that stores
/// NULL, for file fields on update it means "keep the existing reference".
pub type RecordValues = Vec<(&'static str, Option<String>)>;

/// Repository
///
/// The abstract persistence contract. One generic set of record operations
/// serves every resource type (the schema descriptor carries the table and
/// column knowledge), plus the credential operations backing the auth gate.
///
/// **Send + Sync + async_trait** make the trait object (`Arc<dyn Repository>`)
/// shareable across axum's task boundaries.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Generic record operations ---

    /// Inserts a row after verifying every parent id resolves (and, for
    /// scoped parents, belongs to the right owner). The checks and the
    /// insert share one transaction, so a parent deleted mid-request cannot
    /// leave an orphan. Returns the full record including its assigned id.
    async fn insert_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        values: &RecordValues,
    ) -> Result<Value, ApiError>;

    /// All rows (optionally filtered by parent ids) in storage order.
    async fn list_records(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
    ) -> Result<Vec<Value>, ApiError>;

    /// One page of rows plus the unfiltered total count.
    async fn list_page(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        page: i64,
        size: i64,
    ) -> Result<(Vec<Value>, i64), ApiError>;

    /// Single row by id, None when absent.
    async fn get_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        id: i64,
    ) -> Result<Option<Value>, ApiError>;

    /// Read-before-write update: None when the id does not resolve, in which
    /// case nothing is written. Non-file columns are overwritten
    /// unconditionally; file columns use COALESCE so an absent upload keeps
    /// the stored reference.
    async fn update_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        id: i64,
        values: &RecordValues,
    ) -> Result<Option<Value>, ApiError>;

    /// Removes the row; false when the id does not resolve. Does not cascade
    /// into the norm hierarchy.
    async fn delete_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        id: i64,
    ) -> Result<bool, ApiError>;

    /// The `limit` most recent rows ordered by `order_col` descending.
    async fn list_recent(
        &self,
        schema: &'static RecordSchema,
        order_col: &str,
        limit: i64,
    ) -> Result<Vec<Value>, ApiError>;

    // --- Credential store ---

    async fn find_user(&self, username: &str) -> Result<Option<Credential>, ApiError>;

    /// Fails with Conflict when the username is taken; the existing row is
    /// left untouched.
    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64, ApiError>;

    async fn list_users(&self) -> Result<Vec<UserOut>, ApiError>;
}

/// The concrete type used to share the persistence layer across the
/// application state.
pub type RepositoryState = Arc<dyn Repository>;

/// SqliteRepository
///
/// The concrete `Repository` backed by the SQLite store. All SQL is built at
/// runtime from the static schema descriptors; only values are ever bound,
/// never identifiers from request input.
pub struct SqliteRepository {
    pool: SqlitePool,
}

impl SqliteRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

// --- SQL assembly helpers ---

fn select_columns(schema: &RecordSchema) -> String {
    let mut cols = vec!["id"];
    cols.extend(schema.parents.iter().map(|p| p.param));
    cols.extend(schema.fields.iter().map(|f| f.name));
    cols.join(", ")
}

/// WHERE fragment filtering by the hierarchy parents, e.g.
/// " AND norm_id = ? AND group_id = ?". Empty for flat schemas.
fn parent_filter(schema: &RecordSchema) -> String {
    schema
        .parents
        .iter()
        .map(|p| format!(" AND {} = ?", p.param))
        .collect()
}

fn row_to_json(schema: &RecordSchema, row: &SqliteRow) -> Result<Value, ApiError> {
    let mut object = Map::new();
    object.insert("id".to_string(), Value::from(row.try_get::<i64, _>("id")?));
    for parent in schema.parents {
        object.insert(
            parent.param.to_string(),
            Value::from(row.try_get::<i64, _>(parent.param)?),
        );
    }
    for field in schema.fields {
        let value: Option<String> = row.try_get(field.name)?;
        object.insert(field.name.to_string(), value.map_or(Value::Null, Value::from));
    }
    Ok(Value::Object(object))
}

/// Verifies each parent id resolves, inside the caller's transaction. A
/// scoped parent is additionally constrained to the earlier path parameter
/// it belongs to (`norm_groups.norm_id` must match the URL's norm).
async fn ensure_parents(
    conn: &mut SqliteConnection,
    schema: &RecordSchema,
    parents: &[i64],
) -> Result<(), ApiError> {
    for (idx, parent) in schema.parents.iter().enumerate() {
        let mut sql = format!("SELECT id FROM {} WHERE id = ?", parent.table);
        if parent.scoped_by.is_some() {
            sql.push_str(&format!(" AND {} = ?", parent.scoped_by.unwrap()));
        }
        let mut query = sqlx::query(&sql).bind(parents[idx]);
        if let Some(scope_col) = parent.scoped_by {
            let scope_idx = schema
                .parents
                .iter()
                .position(|p| p.param == scope_col)
                .ok_or_else(|| {
                    ApiError::Validation(format!("unknown parent scope column {scope_col}"))
                })?;
            query = query.bind(parents[scope_idx]);
        }
        if query.fetch_optional(&mut *conn).await?.is_none() {
            return Err(ApiError::NotFound(parent.display));
        }
    }
    Ok(())
}

async fn fetch_record(
    conn: &mut SqliteConnection,
    schema: &RecordSchema,
    id: i64,
) -> Result<Option<Value>, ApiError> {
    let sql = format!(
        "SELECT {} FROM {} WHERE id = ?",
        select_columns(schema),
        schema.table
    );
    let row = sqlx::query(&sql).bind(id).fetch_optional(conn).await?;
    row.map(|r| row_to_json(schema, &r)).transpose()
}

/// Read-before-write existence check scoped by the parent filter, so a
/// document id under the wrong norm/group answers "absent".
async fn record_exists(
    conn: &mut SqliteConnection,
    schema: &RecordSchema,
    parents: &[i64],
    id: i64,
) -> Result<bool, ApiError> {
    let sql = format!(
        "SELECT id FROM {} WHERE id = ?{}",
        schema.table,
        parent_filter(schema)
    );
    let mut query = sqlx::query(&sql).bind(id);
    for parent_id in parents {
        query = query.bind(parent_id);
    }
    Ok(query.fetch_optional(conn).await?.is_some())
}

#[async_trait]
impl Repository for SqliteRepository {
    async fn insert_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        values: &RecordValues,
    ) -> Result<Value, ApiError> {
        let mut tx = self.pool.begin().await?;

        ensure_parents(&mut tx, schema, parents).await?;

        let mut cols: Vec<&str> = schema.parents.iter().map(|p| p.param).collect();
        cols.extend(values.iter().map(|(name, _)| *name));
        let placeholders = vec!["?"; cols.len()].join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({})",
            schema.table,
            cols.join(", "),
            placeholders
        );

        let mut query = sqlx::query(&sql);
        for parent_id in parents {
            query = query.bind(parent_id);
        }
        for (_, value) in values {
            query = query.bind(value.as_deref());
        }
        let result = query.execute(&mut *tx).await?;
        let id = result.last_insert_rowid();

        let record = fetch_record(&mut tx, schema, id)
            .await?
            .ok_or(ApiError::NotFound(schema.display))?;

        tx.commit().await?;
        Ok(record)
    }

    async fn list_records(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
    ) -> Result<Vec<Value>, ApiError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE 1 = 1{}",
            select_columns(schema),
            schema.table,
            parent_filter(schema)
        );
        let mut query = sqlx::query(&sql);
        for parent_id in parents {
            query = query.bind(parent_id);
        }
        let rows = query.fetch_all(&self.pool).await?;
        rows.iter().map(|row| row_to_json(schema, row)).collect()
    }

    async fn list_page(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        page: i64,
        size: i64,
    ) -> Result<(Vec<Value>, i64), ApiError> {
        let count_sql = format!(
            "SELECT COUNT(*) FROM {} WHERE 1 = 1{}",
            schema.table,
            parent_filter(schema)
        );
        let mut count_query = sqlx::query_scalar::<_, i64>(&count_sql);
        for parent_id in parents {
            count_query = count_query.bind(parent_id);
        }
        let total = count_query.fetch_one(&self.pool).await?;

        let sql = format!(
            "SELECT {} FROM {} WHERE 1 = 1{} LIMIT ? OFFSET ?",
            select_columns(schema),
            schema.table,
            parent_filter(schema)
        );
        let mut query = sqlx::query(&sql);
        for parent_id in parents {
            query = query.bind(parent_id);
        }
        query = query.bind(size).bind((page - 1) * size);
        let rows = query.fetch_all(&self.pool).await?;

        let items: Result<Vec<Value>, ApiError> =
            rows.iter().map(|row| row_to_json(schema, row)).collect();
        Ok((items?, total))
    }

    async fn get_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        id: i64,
    ) -> Result<Option<Value>, ApiError> {
        let sql = format!(
            "SELECT {} FROM {} WHERE id = ?{}",
            select_columns(schema),
            schema.table,
            parent_filter(schema)
        );
        let mut query = sqlx::query(&sql).bind(id);
        for parent_id in parents {
            query = query.bind(parent_id);
        }
        let row = query.fetch_optional(&self.pool).await?;
        row.map(|r| row_to_json(schema, &r)).transpose()
    }

    async fn update_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        id: i64,
        values: &RecordValues,
    ) -> Result<Option<Value>, ApiError> {
        let mut tx = self.pool.begin().await?;

        if !record_exists(&mut tx, schema, parents, id).await? {
            return Ok(None);
        }

        let sets: Vec<String> = schema
            .fields
            .iter()
            .map(|field| {
                if field.is_file() {
                    // Coalesce semantics: an absent upload keeps the stored
                    // reference path.
                    format!("{0} = COALESCE(?, {0})", field.name)
                } else {
                    format!("{} = ?", field.name)
                }
            })
            .collect();
        let sql = format!(
            "UPDATE {} SET {} WHERE id = ?",
            schema.table,
            sets.join(", ")
        );

        let mut query = sqlx::query(&sql);
        for (_, value) in values {
            query = query.bind(value.as_deref());
        }
        query = query.bind(id);
        query.execute(&mut *tx).await?;

        let record = fetch_record(&mut tx, schema, id).await?;
        tx.commit().await?;
        Ok(record)
    }

    async fn delete_record(
        &self,
        schema: &'static RecordSchema,
        parents: &[i64],
        id: i64,
    ) -> Result<bool, ApiError> {
        let mut tx = self.pool.begin().await?;

        if !record_exists(&mut tx, schema, parents, id).await? {
            return Ok(false);
        }

        let sql = format!("DELETE FROM {} WHERE id = ?", schema.table);
        sqlx::query(&sql).bind(id).execute(&mut *tx).await?;

        tx.commit().await?;
        Ok(true)
    }

    async fn list_recent(
        &self,
        schema: &'static RecordSchema,
        order_col: &str,
        limit: i64,
    ) -> Result<Vec<Value>, ApiError> {
        // order_col comes from code, never from request input.
        let sql = format!(
            "SELECT {} FROM {} ORDER BY {} DESC LIMIT ?",
            select_columns(schema),
            schema.table,
            order_col
        );
        let rows = sqlx::query(&sql).bind(limit).fetch_all(&self.pool).await?;
        rows.iter().map(|row| row_to_json(schema, row)).collect()
    }

    async fn find_user(&self, username: &str) -> Result<Option<Credential>, ApiError> {
        let user = sqlx::query_as::<_, Credential>(
            "SELECT id, username, password, role FROM users WHERE username = ?",
        )
        .bind(username)
        .fetch_optional(&self.pool)
        .await?;
        Ok(user)
    }

    async fn create_user(
        &self,
        username: &str,
        password_hash: &str,
        role: &str,
    ) -> Result<i64, ApiError> {
        let mut tx = self.pool.begin().await?;

        let existing = sqlx::query("SELECT id FROM users WHERE username = ?")
            .bind(username)
            .fetch_optional(&mut *tx)
            .await?;
        if existing.is_some() {
            return Err(ApiError::Conflict("Username already exists".to_string()));
        }

        let result = sqlx::query("INSERT INTO users (username, password, role) VALUES (?, ?, ?)")
            .bind(username)
            .bind(password_hash)
            .bind(role)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(result.last_insert_rowid())
    }

    async fn list_users(&self) -> Result<Vec<UserOut>, ApiError> {
        let users = sqlx::query_as::<_, UserOut>("SELECT username, role FROM users")
            .fetch_all(&self.pool)
            .await?;
        Ok(users)
    }
}

// --- Bootstrap ---

fn create_table_sql(schema: &RecordSchema) -> String {
    let mut cols = vec!["id INTEGER PRIMARY KEY AUTOINCREMENT".to_string()];
    for parent in schema.parents {
        cols.push(format!("{} INTEGER NOT NULL", parent.param));
    }
    for field in schema.fields {
        let constraint = if field.is_required() { " NOT NULL" } else { "" };
        cols.push(format!("{} TEXT{}", field.name, constraint));
    }
    format!(
        "CREATE TABLE IF NOT EXISTS {} ({})",
        schema.table,
        cols.join(", ")
    )
}

/// Creates every table derived from the schema registry plus the credential
/// table, then seeds the single default admin. Idempotent: running it again
/// neither duplicates nor resets the seeded row, and the password hash is
/// only computed when the row is actually created.
pub async fn init_db(pool: &SqlitePool, default_admin_password: &str) -> Result<(), ApiError> {
    sqlx::query(
        "CREATE TABLE IF NOT EXISTS users (
            id INTEGER PRIMARY KEY AUTOINCREMENT,
            username TEXT NOT NULL UNIQUE,
            password TEXT NOT NULL,
            role TEXT NOT NULL
        )",
    )
    .execute(pool)
    .await?;

    for schema in records::ALL {
        sqlx::query(&create_table_sql(schema)).execute(pool).await?;
    }

    let seeded = sqlx::query("SELECT id FROM users WHERE username = 'admin'")
        .fetch_optional(pool)
        .await?;
    if seeded.is_none() {
        let hash = hash_password(default_admin_password)?;
        sqlx::query("INSERT OR IGNORE INTO users (username, password, role) VALUES ('admin', ?, 'admin')")
            .bind(hash)
            .execute(pool)
            .await?;
    }

    Ok(())
}
