//! Data access: one module per entity family, all SQL bound through parameters.
//!
//! Functions take a borrowed `rusqlite::Connection` and are run through
//! [`crate::db::Db::run`] by the HTTP handlers, so they stay synchronous and are
//! straightforward to test against a temp database.

pub mod academics;
pub mod courses;
pub mod rewards;
pub mod scores;
pub mod students;

use rusqlite::{params_from_iter, types::Value, Connection, Row};
use serde::{Deserialize, Serialize};

use crate::error::StoreError;

pub const DEFAULT_LIMIT: u32 = 10;
pub const MAX_LIMIT: u32 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub limit: u32,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_LIMIT,
        }
    }
}

impl Pagination {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, StoreError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_LIMIT);
        if page == 0 {
            return Err(StoreError::validation("page", "page must be at least 1"));
        }
        if limit == 0 || limit > MAX_LIMIT {
            return Err(StoreError::validation(
                "limit",
                format!("limit must be between 1 and {MAX_LIMIT}"),
            ));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (i64::from(self.page) - 1) * i64::from(self.limit)
    }
}

/// Query-string shape shared by every list endpoint.
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageParams {
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

impl PageParams {
    /// Always paged; absent values fall back to page 1 of 10.
    pub fn pagination(&self) -> Result<Pagination, StoreError> {
        Pagination::new(self.page, self.limit)
    }

    /// Paged only when the client asked for it. With neither `page` nor
    /// `limit` the whole filtered list is returned.
    pub fn pagination_or_all(&self) -> Result<Option<Pagination>, StoreError> {
        if self.page.is_none() && self.limit.is_none() {
            return Ok(None);
        }
        self.pagination().map(Some)
    }
}

/// WHERE-clause builder. Column names are compile-time constants; values are
/// always bound.
#[derive(Debug, Default)]
pub struct Filter {
    clauses: Vec<String>,
    params: Vec<Value>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq<V: Into<Value>>(mut self, column: &'static str, value: Option<V>) -> Self {
        if let Some(v) = value {
            self.clauses.push(format!("{column} = ?"));
            self.params.push(v.into());
        }
        self
    }

    /// Substring match; blank needles are ignored.
    pub fn contains(mut self, column: &'static str, needle: Option<&str>) -> Self {
        if let Some(n) = needle.map(str::trim).filter(|n| !n.is_empty()) {
            self.clauses.push(format!("{column} LIKE ? ESCAPE '\\'"));
            self.params.push(Value::Text(format!("%{}%", escape_like(n))));
        }
        self
    }

    pub fn where_sql(&self) -> String {
        if self.clauses.is_empty() {
            String::new()
        } else {
            format!(" WHERE {}", self.clauses.join(" AND "))
        }
    }

    pub fn params(&self) -> &[Value] {
        &self.params
    }
}

fn escape_like(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for ch in s.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            out.push('\\');
        }
        out.push(ch);
    }
    out
}

#[derive(Debug, Clone, Serialize)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub total: i64,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

/// Shape of a paged list query. Every string is a constant owned by the
/// calling module.
pub struct ListQuery {
    pub columns: &'static str,
    pub from: &'static str,
    pub order_by: &'static str,
}

pub fn fetch_page<T, F>(
    conn: &Connection,
    query: &ListQuery,
    filter: &Filter,
    pagination: Option<Pagination>,
    map: F,
) -> Result<Page<T>, StoreError>
where
    F: FnMut(&Row<'_>) -> rusqlite::Result<T>,
{
    let where_sql = filter.where_sql();

    let total: i64 = conn.query_row(
        &format!("SELECT COUNT(*) FROM {}{}", query.from, where_sql),
        params_from_iter(filter.params().iter()),
        |r| r.get(0),
    )?;

    let mut sql = format!(
        "SELECT {} FROM {}{} ORDER BY {}",
        query.columns, query.from, where_sql, query.order_by
    );
    let mut bind: Vec<Value> = filter.params().to_vec();
    if let Some(p) = pagination {
        sql.push_str(" LIMIT ? OFFSET ?");
        bind.push(Value::Integer(i64::from(p.limit)));
        bind.push(Value::Integer(p.offset()));
    }

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(bind.iter()), map)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page {
        items,
        total,
        page: pagination.map(|p| p.page),
        limit: pagination.map(|p| p.limit),
    })
}

/// Trimmed, non-empty text field.
pub(crate) fn required_text(field: &'static str, value: &str) -> Result<String, StoreError> {
    let v = value.trim();
    if v.is_empty() {
        return Err(StoreError::validation(
            field,
            format!("{field} must not be empty"),
        ));
    }
    Ok(v.to_string())
}

pub(crate) fn optional_text(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}
