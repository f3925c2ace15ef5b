//! Query sessions
//!
//! A session is a read query that has been described but not run yet: an
//! optional page window, owner scoping, one free-text filter and a sort
//! column. Repositories build one per request and hand it to
//! [`Adapter::find`](crate::database::Adapter::find) or render it
//! themselves.
//!
//! # Usage
//!
//! ```rust
//! use iam_store::database::{build_session, DriverKind};
//!
//! let session = build_session("acme", 0, 10, "displayName", "ali", "", "");
//! let query = session.render(DriverKind::Sqlite, "user");
//!
//! assert_eq!(
//!     query.sql,
//!     "SELECT * FROM \"user\" WHERE \"owner\" = ? AND \"display_name\" LIKE ? \
//!      ORDER BY \"created_time\" DESC LIMIT 10 OFFSET 0"
//! );
//! assert_eq!(query.params.len(), 2);
//! ```

mod allow_list;

pub use allow_list::{default_allow_list, filter_field, FieldAllowList};

use serde::Serialize;

use crate::database::core::{
    is_plain_identifier, snake_string, DriverKind, EntityDescriptor, SqlValue,
};

/// Sort column used when no usable sort is requested
pub const DEFAULT_SORT_FIELD: &str = "created_time";

/// Offset/limit value meaning "no pagination"
pub const UNBOUNDED: i64 = -1;

/// The only sort order value that sorts ascending
pub const ASCEND: &str = "ascend";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Ascending,
    Descending,
}

impl SortDirection {
    /// `ascend` sorts ascending; every other value, including garbage,
    /// sorts descending.
    pub fn from_order(order: &str) -> Self {
        if order == ASCEND {
            SortDirection::Ascending
        } else {
            SortDirection::Descending
        }
    }

    pub fn as_sql(&self) -> &'static str {
        match self {
            SortDirection::Ascending => "ASC",
            SortDirection::Descending => "DESC",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub limit: i64,
    pub offset: i64,
}

/// A WHERE condition; values are always bound, never inlined
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "op", rename_all = "lowercase")]
pub enum Condition {
    Equals { column: String, value: SqlValue },
    Like { column: String, pattern: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OrderBy {
    pub column: String,
    pub direction: SortDirection,
}

/// A described, not yet executed read query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuerySession {
    pub pagination: Option<Pagination>,
    pub conditions: Vec<Condition>,
    pub order_by: OrderBy,
}

/// SQL text plus the parameters to bind, in placeholder order
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RenderedQuery {
    pub sql: String,
    pub params: Vec<SqlValue>,
}

impl QuerySession {
    /// Narrow the session to the columns of one entity
    ///
    /// The builder checks filter fields against every catalog column, so a
    /// field can be valid for some entity but absent from the table being
    /// queried. Such filters are dropped, as are filters on columns the
    /// entity keeps secret, and a sort column the entity lacks falls back to
    /// `created_time`.
    pub fn for_entity(&self, entity: &EntityDescriptor) -> QuerySession {
        let allow_list = FieldAllowList::for_entity(entity);
        let conditions = self
            .conditions
            .iter()
            .filter(|condition| match condition {
                Condition::Equals { column, .. } => entity.column(column).is_some(),
                Condition::Like { column, .. } => allow_list.allows(column),
            })
            .cloned()
            .collect();

        let mut order_by = self.order_by.clone();
        if entity.column(&order_by.column).is_none() {
            order_by.column = DEFAULT_SORT_FIELD.to_string();
        }

        QuerySession {
            pagination: self.pagination,
            conditions,
            order_by,
        }
    }

    /// Render a `SELECT *` over `table`
    pub fn render(&self, driver: DriverKind, table: &str) -> RenderedQuery {
        let mut sql = format!("SELECT * FROM {}", driver.quote(table));
        let mut params = Vec::new();
        self.push_where(driver, &mut sql, &mut params);

        sql.push_str(&format!(
            " ORDER BY {} {}",
            driver.quote(&self.order_by.column),
            self.order_by.direction.as_sql()
        ));

        if let Some(page) = self.pagination {
            match driver {
                DriverKind::Mssql => sql.push_str(&format!(
                    " OFFSET {} ROWS FETCH NEXT {} ROWS ONLY",
                    page.offset, page.limit
                )),
                _ => sql.push_str(&format!(" LIMIT {} OFFSET {}", page.limit, page.offset)),
            }
        }

        RenderedQuery { sql, params }
    }

    /// Render a row count over `table`, ignoring sort and pagination
    pub fn render_count(&self, driver: DriverKind, table: &str) -> RenderedQuery {
        let mut sql = format!("SELECT COUNT(*) AS count FROM {}", driver.quote(table));
        let mut params = Vec::new();
        self.push_where(driver, &mut sql, &mut params);
        RenderedQuery { sql, params }
    }

    fn push_where(&self, driver: DriverKind, sql: &mut String, params: &mut Vec<SqlValue>) {
        if self.conditions.is_empty() {
            return;
        }

        let mut clauses = Vec::with_capacity(self.conditions.len());
        for condition in &self.conditions {
            match condition {
                Condition::Equals { column, value } => {
                    params.push(value.clone());
                    clauses.push(format!(
                        "{} = {}",
                        driver.quote(column),
                        driver.placeholder(params.len())
                    ));
                }
                Condition::Like { column, pattern } => {
                    params.push(SqlValue::Text(pattern.clone()));
                    clauses.push(format!(
                        "{} LIKE {}",
                        driver.quote(column),
                        driver.placeholder(params.len())
                    ));
                }
            }
        }

        sql.push_str(" WHERE ");
        sql.push_str(&clauses.join(" AND "));
    }
}

/// Builder for [`QuerySession`]
///
/// Empty strings mean "not set" and an offset or limit of `-1` means "no
/// pagination", matching what the web layer passes through.
#[derive(Debug, Clone)]
pub struct SessionBuilder<'a> {
    owner: String,
    offset: i64,
    limit: i64,
    filter_field: String,
    filter_value: String,
    sort_field: String,
    sort_order: String,
    allow_list: Option<&'a FieldAllowList>,
}

impl Default for SessionBuilder<'_> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'a> SessionBuilder<'a> {
    pub fn new() -> Self {
        Self {
            owner: String::new(),
            offset: UNBOUNDED,
            limit: UNBOUNDED,
            filter_field: String::new(),
            filter_value: String::new(),
            sort_field: String::new(),
            sort_order: String::new(),
            allow_list: None,
        }
    }

    /// Scope rows to one owner (tenant)
    pub fn with_owner(mut self, owner: &str) -> Self {
        self.owner = owner.to_string();
        self
    }

    pub fn with_page(mut self, offset: i64, limit: i64) -> Self {
        self.offset = offset;
        self.limit = limit;
        self
    }

    /// Substring filter on one field
    pub fn with_filter(mut self, field: &str, value: &str) -> Self {
        self.filter_field = field.to_string();
        self.filter_value = value.to_string();
        self
    }

    pub fn with_sort(mut self, field: &str, order: &str) -> Self {
        self.sort_field = field.to_string();
        self.sort_order = order.to_string();
        self
    }

    /// Check filter fields against `allow_list` instead of the catalog-wide one
    pub fn with_allow_list(mut self, allow_list: &'a FieldAllowList) -> Self {
        self.allow_list = Some(allow_list);
        self
    }

    pub fn build(&self) -> QuerySession {
        let allow_list = match self.allow_list {
            Some(allow_list) => allow_list,
            None => default_allow_list(),
        };

        // 1. pagination
        let pagination = if self.offset != UNBOUNDED && self.limit != UNBOUNDED {
            Some(Pagination {
                limit: self.limit,
                offset: self.offset,
            })
        } else {
            None
        };

        // 2. owner scoping
        let mut conditions = Vec::new();
        if !self.owner.is_empty() {
            conditions.push(Condition::Equals {
                column: "owner".to_string(),
                value: SqlValue::Text(self.owner.clone()),
            });
        }

        // 3. free-text filter, dropped silently when the field is not allowed
        if !self.filter_field.is_empty()
            && !self.filter_value.is_empty()
            && allow_list.allows(&self.filter_field)
        {
            conditions.push(Condition::Like {
                column: snake_string(&self.filter_field),
                pattern: format!("%{}%", self.filter_value),
            });
        }

        // 4. sort
        let sort_field = if self.sort_field.is_empty() || self.sort_order.is_empty() {
            DEFAULT_SORT_FIELD
        } else {
            self.sort_field.as_str()
        };
        let mut column = snake_string(sort_field);
        if !is_plain_identifier(&column) {
            column = DEFAULT_SORT_FIELD.to_string();
        }

        QuerySession {
            pagination,
            conditions,
            order_by: OrderBy {
                column,
                direction: SortDirection::from_order(&self.sort_order),
            },
        }
    }
}

/// Build a session from the raw request parameters
///
/// `offset`/`limit` of `-1` disable pagination, empty strings disable the
/// owner scope and the filter, and select the default sort. A filter field
/// outside the allow-list is ignored; a sort order other than `ascend`
/// sorts descending.
pub fn build_session(
    owner: &str,
    offset: i64,
    limit: i64,
    filter_field: &str,
    filter_value: &str,
    sort_field: &str,
    sort_order: &str,
) -> QuerySession {
    SessionBuilder::new()
        .with_owner(owner)
        .with_page(offset, limit)
        .with_filter(filter_field, filter_value)
        .with_sort(sort_field, sort_order)
        .build()
}
