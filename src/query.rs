//! Query parameter translation: filter, sort, field projection and
//! pagination for list endpoints.
//!
//! Raw query parameters arrive as a flat key/value map. Reserved keys
//! (`page`, `limit`, `sort`, `fields`) control the page window, ordering
//! and projection; everything else becomes a filter. Range comparisons
//! use the bracket form `price[gte]=10`. Field names are only checked
//! for identifier safety, not against a schema: unknown columns are
//! rejected by the database itself.

use serde::Serialize;
use std::collections::HashMap;

use crate::error::{AppError, AppResult};

const RESERVED_KEYS: [&str; 4] = ["page", "limit", "sort", "fields"];

const DEFAULT_PAGE: i64 = 1;
const DEFAULT_LIMIT: i64 = 10;
const MAX_LIMIT: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Gt,
    Lte,
    Lt,
}

impl FilterOp {
    fn from_key(key: &str) -> Option<Self> {
        match key {
            "gte" => Some(FilterOp::Gte),
            "gt" => Some(FilterOp::Gt),
            "lte" => Some(FilterOp::Lte),
            "lt" => Some(FilterOp::Lt),
            _ => None,
        }
    }

    pub fn sql(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Gte => ">=",
            FilterOp::Gt => ">",
            FilterOp::Lte => "<=",
            FilterOp::Lt => "<",
        }
    }
}

#[derive(Debug, Clone)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: String,
}

#[derive(Debug, Clone)]
pub struct SortField {
    pub field: String,
    pub descending: bool,
}

#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub filters: Vec<Filter>,
    pub sort: Vec<SortField>,
    pub fields: Option<Vec<String>>,
    pub page: i64,
    pub limit: i64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            filters: Vec::new(),
            sort: Vec::new(),
            fields: None,
            page: DEFAULT_PAGE,
            limit: DEFAULT_LIMIT,
        }
    }
}

/// `created_at` -> `createdAt`: serialized rows carry camelCase keys
/// while the query grammar speaks in column names.
fn wire_name(field: &str) -> String {
    let mut out = String::with_capacity(field.len());
    let mut upper_next = false;
    for c in field.chars() {
        if c == '_' {
            upper_next = true;
        } else if upper_next {
            out.extend(c.to_uppercase());
            upper_next = false;
        } else {
            out.push(c);
        }
    }
    out
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty()
        && s.chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_')
        && !s.starts_with(|c: char| c.is_ascii_digit())
}

impl QueryOptions {
    pub fn from_params(params: &HashMap<String, String>) -> AppResult<Self> {
        let mut opts = QueryOptions::default();

        for (key, value) in params {
            // Reserved control keys are handled below, whatever their shape
            if RESERVED_KEYS.contains(&key.as_str()) {
                continue;
            }

            // `field[op]=value` range comparison, plain key is equality
            let (field, op) = match key.find('[') {
                Some(open) if key.ends_with(']') => {
                    let field = &key[..open];
                    let op_key = &key[open + 1..key.len() - 1];
                    let op = FilterOp::from_key(op_key).ok_or_else(|| {
                        AppError::validation(format!("Unknown filter operator: {}", op_key))
                    })?;
                    (field, op)
                }
                _ => (key.as_str(), FilterOp::Eq),
            };

            if !is_identifier(field) {
                return Err(AppError::validation(format!(
                    "Invalid filter field: {}",
                    field
                )));
            }

            opts.filters.push(Filter {
                field: field.to_string(),
                op,
                value: value.clone(),
            });
        }

        if let Some(sort) = params.get("sort") {
            for part in sort.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                let (field, descending) = match part.strip_prefix('-') {
                    Some(rest) => (rest, true),
                    None => (part, false),
                };
                if !is_identifier(field) {
                    return Err(AppError::validation(format!(
                        "Invalid sort field: {}",
                        field
                    )));
                }
                opts.sort.push(SortField {
                    field: field.to_string(),
                    descending,
                });
            }
        }

        if let Some(fields) = params.get("fields") {
            let mut list = Vec::new();
            for part in fields.split(',') {
                let part = part.trim();
                if part.is_empty() {
                    continue;
                }
                if !is_identifier(part) {
                    return Err(AppError::validation(format!(
                        "Invalid projection field: {}",
                        part
                    )));
                }
                list.push(part.to_string());
            }
            if !list.is_empty() {
                opts.fields = Some(list);
            }
        }

        if let Some(page) = params.get("page") {
            // Tolerated whatever the shape: anything unparseable or
            // below 1 falls back to the first page
            opts.page = page.parse::<i64>().unwrap_or(DEFAULT_PAGE).max(DEFAULT_PAGE);
        }

        if let Some(limit) = params.get("limit") {
            let limit: i64 = limit
                .parse()
                .map_err(|_| AppError::validation("limit must be a positive integer"))?;
            if limit < 1 || limit > MAX_LIMIT {
                return Err(AppError::validation(format!(
                    "limit must be between 1 and {}",
                    MAX_LIMIT
                )));
            }
            opts.limit = limit;
        }

        Ok(opts)
    }

    pub fn offset(&self) -> i64 {
        (self.page - 1) * self.limit
    }

    /// Builds a `WHERE` clause with `$n` placeholders starting at
    /// `start_idx`, and the values to bind in order. Numeric values are
    /// inlined (after parsing) so comparisons against numeric columns
    /// stay numeric; everything else is bound as text.
    pub fn where_clause(&self, start_idx: usize) -> (String, Vec<String>) {
        if self.filters.is_empty() {
            return (String::new(), Vec::new());
        }

        let mut conditions = Vec::new();
        let mut binds = Vec::new();
        let mut idx = start_idx;

        for filter in &self.filters {
            if let Ok(num) = filter.value.parse::<f64>() {
                conditions.push(format!("{} {} {}", filter.field, filter.op.sql(), num));
            } else {
                conditions.push(format!("{} {} ${}", filter.field, filter.op.sql(), idx));
                binds.push(filter.value.clone());
                idx += 1;
            }
        }

        (format!("WHERE {}", conditions.join(" AND ")), binds)
    }

    /// `ORDER BY` clause; absent sort parameters fall back to
    /// newest-first by creation time.
    pub fn order_clause(&self) -> String {
        if self.sort.is_empty() {
            return "ORDER BY created_at DESC".to_string();
        }

        let parts: Vec<String> = self
            .sort
            .iter()
            .map(|s| {
                format!(
                    "{} {}",
                    s.field,
                    if s.descending { "DESC" } else { "ASC" }
                )
            })
            .collect();

        format!("ORDER BY {}", parts.join(", "))
    }

    /// Applies the `fields` projection to an already-serialized row,
    /// removing keys the caller did not ask for. Projection names use
    /// the column form like the filter and sort grammars, so they are
    /// matched against the camelCase wire keys as well (`created_at`
    /// keeps `createdAt`).
    pub fn project(&self, value: &mut serde_json::Value) {
        let Some(fields) = &self.fields else {
            return;
        };
        let wire_names: Vec<String> = fields.iter().map(|f| wire_name(f)).collect();
        if let serde_json::Value::Object(map) = value {
            map.retain(|key, _| {
                fields.iter().any(|f| f == key) || wire_names.iter().any(|f| f == key)
            });
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct PaginationMeta {
    pub total: i64,
    pub page: i64,
    pub limit: i64,
    pub total_pages: i64,
    pub has_next_page: bool,
    pub has_prev_page: bool,
}

impl PaginationMeta {
    pub fn new(total: i64, page: i64, limit: i64) -> Self {
        // total = 0 yields zero pages and no navigation either way
        let total_pages = if limit > 0 {
            (total + limit - 1) / limit
        } else {
            0
        };

        PaginationMeta {
            total,
            page,
            limit,
            total_pages,
            has_next_page: page < total_pages,
            has_prev_page: total > 0 && page > 1,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(pairs: &[(&str, &str)]) -> HashMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_defaults_when_no_params() {
        let opts = QueryOptions::from_params(&HashMap::new()).unwrap();
        assert!(opts.filters.is_empty());
        assert!(opts.sort.is_empty());
        assert!(opts.fields.is_none());
        assert_eq!(opts.page, 1);
        assert_eq!(opts.limit, 10);
        assert_eq!(opts.offset(), 0);
        assert_eq!(opts.order_clause(), "ORDER BY created_at DESC");
    }

    #[test]
    fn test_range_filter_translation() {
        let opts = QueryOptions::from_params(&params(&[("price[gte]", "10")])).unwrap();
        assert_eq!(opts.filters.len(), 1);
        assert_eq!(opts.filters[0].field, "price");
        assert_eq!(opts.filters[0].op, FilterOp::Gte);

        let (clause, binds) = opts.where_clause(1);
        assert_eq!(clause, "WHERE price >= 10");
        assert!(binds.is_empty());
    }

    #[test]
    fn test_text_filter_binds_placeholder() {
        let opts = QueryOptions::from_params(&params(&[("name", "alice")])).unwrap();
        let (clause, binds) = opts.where_clause(3);
        assert_eq!(clause, "WHERE name = $3");
        assert_eq!(binds, vec!["alice".to_string()]);
    }

    #[test]
    fn test_reserved_keys_never_filter() {
        let opts =
            QueryOptions::from_params(&params(&[("page", "2"), ("limit", "5"), ("sort", "name")]))
                .unwrap();
        assert!(opts.filters.is_empty());
        assert_eq!(opts.page, 2);
        assert_eq!(opts.limit, 5);
        assert_eq!(opts.offset(), 5);
    }

    #[test]
    fn test_unparseable_page_falls_back_to_first() {
        // `page` is a reserved key: a junk value never becomes a filter
        // and never fails the request, it just means page 1
        let opts = QueryOptions::from_params(&params(&[("page", "x")])).unwrap();
        assert!(opts.filters.is_empty());
        assert_eq!(opts.page, 1);

        let opts = QueryOptions::from_params(&params(&[("page", "-3")])).unwrap();
        assert_eq!(opts.page, 1);
    }

    #[test]
    fn test_unknown_operator_rejected() {
        let result = QueryOptions::from_params(&params(&[("price[like]", "10")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_injection_shaped_field_rejected() {
        let result = QueryOptions::from_params(&params(&[("name; DROP TABLE x", "1")]));
        assert!(result.is_err());
    }

    #[test]
    fn test_sort_parsing() {
        let opts =
            QueryOptions::from_params(&params(&[("sort", "-created_at,name")])).unwrap();
        assert_eq!(opts.sort.len(), 2);
        assert!(opts.sort[0].descending);
        assert_eq!(opts.sort[0].field, "created_at");
        assert!(!opts.sort[1].descending);
        assert_eq!(opts.order_clause(), "ORDER BY created_at DESC, name ASC");
    }

    #[test]
    fn test_fields_projection() {
        let opts = QueryOptions::from_params(&params(&[("fields", "id,name")])).unwrap();
        let mut row = serde_json::json!({"id": "1", "name": "a", "email": "a@b.c"});
        opts.project(&mut row);
        assert_eq!(row, serde_json::json!({"id": "1", "name": "a"}));
    }

    #[test]
    fn test_projection_matches_wire_names() {
        let opts = QueryOptions::from_params(&params(&[("fields", "id,created_at")])).unwrap();
        let mut row = serde_json::json!({"id": "1", "createdAt": 99, "updatedAt": 100});
        opts.project(&mut row);
        assert_eq!(row, serde_json::json!({"id": "1", "createdAt": 99}));
    }

    #[test]
    fn test_limit_zero_rejected() {
        assert!(QueryOptions::from_params(&params(&[("limit", "0")])).is_err());
        assert!(QueryOptions::from_params(&params(&[("limit", "101")])).is_err());
    }

    #[test]
    fn test_pagination_meta() {
        let meta = PaginationMeta::new(25, 2, 10);
        assert_eq!(meta.total_pages, 3);
        assert!(meta.has_next_page);
        assert!(meta.has_prev_page);

        let meta = PaginationMeta::new(25, 3, 10);
        assert!(!meta.has_next_page);
        assert!(meta.has_prev_page);

        let meta = PaginationMeta::new(10, 1, 10);
        assert_eq!(meta.total_pages, 1);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }

    #[test]
    fn test_pagination_meta_empty_total() {
        // No rows: no pages and no navigation, whatever the page number
        let meta = PaginationMeta::new(0, 5, 10);
        assert_eq!(meta.total_pages, 0);
        assert!(!meta.has_next_page);
        assert!(!meta.has_prev_page);
    }
}
