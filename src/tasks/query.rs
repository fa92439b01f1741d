//! Filter, sort and pagination options for listing a user's tasks.

use serde::Deserialize;
use sqlx::{Postgres, QueryBuilder};

use crate::error::ApiError;

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PAGE_SIZE: i64 = 10;
pub const MAX_PAGE_SIZE: i64 = 100;

/// Raw query-string parameters. Everything arrives as text so that
/// unparsable numbers fall back to defaults instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TaskListParams {
    pub page: Option<String>,
    pub page_size: Option<String>,
    pub name: Option<String>,
    pub details: Option<String>,
    pub star: Option<String>,
    pub sort_field: Option<String>,
    pub sort_order: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortField {
    #[default]
    Id,
    Name,
    Details,
    CreatedDate,
    Starred,
    LastUpdated,
}

impl SortField {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "id" => Some(Self::Id),
            "name" => Some(Self::Name),
            "details" => Some(Self::Details),
            "createddate" | "created_date" => Some(Self::CreatedDate),
            "star" | "starred" | "havestar" | "have_star" => Some(Self::Starred),
            "lastupdated" | "last_updated" => Some(Self::LastUpdated),
            _ => None,
        }
    }

    pub fn column(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Details => "details",
            Self::CreatedDate => "created_date",
            Self::Starred => "starred",
            Self::LastUpdated => "last_updated",
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum SortOrder {
    #[default]
    Asc,
    Desc,
}

impl SortOrder {
    fn parse(raw: &str) -> Option<Self> {
        match raw.to_ascii_lowercase().as_str() {
            "asc" => Some(Self::Asc),
            "desc" => Some(Self::Desc),
            _ => None,
        }
    }

    pub fn keyword(self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

/// Validated listing options.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskQuery {
    pub page: i64,
    pub page_size: i64,
    pub name: Option<String>,
    pub details: Option<String>,
    pub starred_only: bool,
    pub sort_field: SortField,
    pub sort_order: SortOrder,
}

impl Default for TaskQuery {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            page_size: DEFAULT_PAGE_SIZE,
            name: None,
            details: None,
            starred_only: false,
            sort_field: SortField::default(),
            sort_order: SortOrder::default(),
        }
    }
}

impl TryFrom<TaskListParams> for TaskQuery {
    type Error = ApiError;

    fn try_from(p: TaskListParams) -> Result<Self, Self::Error> {
        let sort_field = match non_empty(p.sort_field) {
            None => SortField::default(),
            Some(raw) => SortField::parse(&raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unsupported sortField `{raw}`")))?,
        };
        let sort_order = match non_empty(p.sort_order) {
            None => SortOrder::default(),
            Some(raw) => SortOrder::parse(&raw)
                .ok_or_else(|| ApiError::BadRequest(format!("Unsupported sortOrder `{raw}`")))?,
        };

        Ok(Self {
            page: positive(p.page.as_deref()).unwrap_or(DEFAULT_PAGE),
            page_size: positive(p.page_size.as_deref())
                .map(|v| v.min(MAX_PAGE_SIZE))
                .unwrap_or(DEFAULT_PAGE_SIZE),
            name: non_empty(p.name),
            details: non_empty(p.details),
            starred_only: p.star.as_deref().map(parse_flag).unwrap_or(false),
            sort_field,
            sort_order,
        })
    }
}

impl TaskQuery {
    pub fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.page_size)
    }

    pub fn limit(&self) -> i64 {
        self.page_size
    }

    /// Build the `SELECT` for `owner`'s tasks matching these options.
    pub fn to_sql(&self, owner: i64) -> QueryBuilder<'static, Postgres> {
        let mut qb = QueryBuilder::new(
            "SELECT id, name, details, created_date, starred, last_updated, user_id \
             FROM tasks WHERE user_id = ",
        );
        qb.push_bind(owner);

        if let Some(name) = &self.name {
            qb.push(" AND name LIKE ")
                .push_bind(contains_pattern(name))
                .push(r" ESCAPE '\'");
        }
        if let Some(details) = &self.details {
            qb.push(" AND details LIKE ")
                .push_bind(contains_pattern(details))
                .push(r" ESCAPE '\'");
        }
        if self.starred_only {
            qb.push(" AND starred = TRUE");
        }

        qb.push(" ORDER BY ")
            .push(self.sort_field.column())
            .push(" ")
            .push(self.sort_order.keyword());
        if self.sort_field != SortField::Id {
            qb.push(", id ASC");
        }

        qb.push(" LIMIT ")
            .push_bind(self.limit())
            .push(" OFFSET ")
            .push_bind(self.offset());
        qb
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.is_empty())
}

fn positive(raw: Option<&str>) -> Option<i64> {
    raw.and_then(|v| v.trim().parse::<i64>().ok())
        .filter(|v| *v >= 1)
}

/// Truthy spellings: `1`, `t`, `true` in any case.
fn parse_flag(raw: &str) -> bool {
    matches!(raw.trim().to_ascii_lowercase().as_str(), "1" | "t" | "true")
}

/// `%needle%` with LIKE wildcards in `needle` escaped.
fn contains_pattern(needle: &str) -> String {
    let mut pattern = String::with_capacity(needle.len() + 2);
    pattern.push('%');
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            pattern.push('\\');
        }
        pattern.push(c);
    }
    pattern.push('%');
    pattern
}
