//! Alias-tolerant pagination metadata.
//!
//! Backends disagree on key names (`page` vs `current_page` vs `Index`, ...).
//! Each field has an ordered list of candidate keys; the first key present in
//! the object wins.

use serde::Serialize;
use serde_json::Value;

use crate::envelope::Envelope;

pub const CURRENT_PAGE_KEYS: &[&str] = &["current_page", "page", "Index"];
pub const TOTAL_PAGES_KEYS: &[&str] = &["total_pages", "last_page"];
pub const TOTAL_ITEMS_KEYS: &[&str] = &["total_items", "total", "TotalCount"];
pub const ITEMS_PER_PAGE_KEYS: &[&str] = &["items_per_page", "per_page", "PageSize"];
pub const HAS_NEXT_KEYS: &[&str] = &["has_next_page", "has_next"];
pub const HAS_PREVIOUS_KEYS: &[&str] = &["has_previous_page", "has_prev"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Pagination {
    pub current_page: i64,
    pub total_pages: i64,
    pub total_items: i64,
    pub items_per_page: i64,
    pub has_next_page: bool,
    pub has_previous_page: bool,
}

impl Default for Pagination {
    fn default() -> Self {
        Self {
            current_page: 1,
            total_pages: 1,
            total_items: 0,
            items_per_page: 10,
            has_next_page: false,
            has_previous_page: false,
        }
    }
}

impl Pagination {
    pub fn from_json(json: &Value) -> Self {
        let defaults = Self::default();
        Self {
            current_page: first_int(json, CURRENT_PAGE_KEYS).unwrap_or(defaults.current_page),
            total_pages: first_int(json, TOTAL_PAGES_KEYS).unwrap_or(defaults.total_pages),
            total_items: first_int(json, TOTAL_ITEMS_KEYS).unwrap_or(defaults.total_items),
            items_per_page: first_int(json, ITEMS_PER_PAGE_KEYS)
                .unwrap_or(defaults.items_per_page),
            has_next_page: first_bool(json, HAS_NEXT_KEYS).unwrap_or(defaults.has_next_page),
            has_previous_page: first_bool(json, HAS_PREVIOUS_KEYS)
                .unwrap_or(defaults.has_previous_page),
        }
    }

    /// Derives pagination from an envelope's `Index / TotalCount / PageSize`.
    ///
    /// A zero page size falls back to the default so page counts stay defined.
    pub fn from_envelope<T>(envelope: &Envelope<T>) -> Self {
        let defaults = Self::default();
        let items_per_page = if envelope.page_size > 0 {
            envelope.page_size
        } else {
            defaults.items_per_page
        };
        let total_items = envelope.total_count.max(0);
        let total_pages =
            (total_items / items_per_page + i64::from(total_items % items_per_page != 0)).max(1);
        let current_page = envelope.index;
        Self {
            current_page,
            total_pages,
            total_items,
            items_per_page,
            has_next_page: current_page < total_pages,
            has_previous_page: current_page > 1,
        }
    }
}

/// A page of decoded items plus its pagination metadata.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

impl<T> Paginated<T> {
    /// Reads `items_key` as an array and decodes each element; pagination is
    /// read from the same object.
    pub fn from_json<F>(json: &Value, items_key: &str, mut decode: F) -> anyhow::Result<Self>
    where
        F: FnMut(Value) -> anyhow::Result<T>,
    {
        let items = match json.get(items_key) {
            Some(Value::Array(items)) => items
                .iter()
                .cloned()
                .map(&mut decode)
                .collect::<anyhow::Result<Vec<T>>>()?,
            None | Some(Value::Null) => Vec::new(),
            Some(other) => anyhow::bail!("expected `{items_key}` to be an array, got {other}"),
        };
        Ok(Self {
            items,
            pagination: Pagination::from_json(json),
        })
    }
}

fn first_present<'a>(json: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    keys.iter()
        .find_map(|key| json.get(*key).filter(|v| !v.is_null()))
}

fn first_int(json: &Value, keys: &[&str]) -> Option<i64> {
    first_present(json, keys).and_then(|v| {
        v.as_i64()
            .or_else(|| v.as_str().and_then(|s| s.trim().parse().ok()))
    })
}

fn first_bool(json: &Value, keys: &[&str]) -> Option<bool> {
    first_present(json, keys).and_then(Value::as_bool)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_alias_keys() {
        let p = Pagination::from_json(&json!({
            "page": 2,
            "per_page": 5,
            "total": 12,
            "last_page": 3
        }));
        assert_eq!(p.current_page, 2);
        assert_eq!(p.items_per_page, 5);
        assert_eq!(p.total_items, 12);
        assert_eq!(p.total_pages, 3);
        assert!(!p.has_next_page);
        assert!(!p.has_previous_page);
    }

    #[test]
    fn test_defaults_when_empty() {
        assert_eq!(Pagination::from_json(&json!({})), Pagination::default());
        let p = Pagination::default();
        assert_eq!(p.current_page, 1);
        assert_eq!(p.total_pages, 1);
        assert_eq!(p.total_items, 0);
        assert_eq!(p.items_per_page, 10);
    }

    #[test]
    fn test_first_key_wins() {
        let p = Pagination::from_json(&json!({
            "current_page": 4,
            "page": 9,
            "Index": 7,
            "total_items": 100,
            "TotalCount": 1,
            "has_next_page": true,
            "has_next": false
        }));
        assert_eq!(p.current_page, 4);
        assert_eq!(p.total_items, 100);
        assert!(p.has_next_page);
    }

    #[test]
    fn test_envelope_style_keys() {
        let p = Pagination::from_json(&json!({"Index": 3, "TotalCount": 40, "PageSize": 20}));
        assert_eq!(p.current_page, 3);
        assert_eq!(p.total_items, 40);
        assert_eq!(p.items_per_page, 20);
        assert_eq!(p.total_pages, 1);
    }

    #[test]
    fn test_flags_aliases() {
        let p = Pagination::from_json(&json!({"has_next": true, "has_prev": true}));
        assert!(p.has_next_page);
        assert!(p.has_previous_page);
    }

    #[test]
    fn test_null_value_falls_through_to_next_alias() {
        let p = Pagination::from_json(&json!({"current_page": null, "page": 5}));
        assert_eq!(p.current_page, 5);
    }

    #[test]
    fn test_numeric_strings_accepted() {
        let p = Pagination::from_json(&json!({"page": "6", "per_page": "25"}));
        assert_eq!(p.current_page, 6);
        assert_eq!(p.items_per_page, 25);
    }

    #[test]
    fn test_from_envelope() {
        let json = json!({
            "ResponseStatus": {"Statuscode": 200},
            "TotalCount": 45,
            "Index": 2,
            "PageSize": 10
        });
        let envelope = Envelope::<Value>::from_json_without_result(&json);
        let p = Pagination::from_envelope(&envelope);
        assert_eq!(p.total_pages, 5);
        assert_eq!(p.current_page, 2);
        assert!(p.has_next_page);
        assert!(p.has_previous_page);
    }

    #[test]
    fn test_from_envelope_zero_page_size() {
        let envelope = Envelope::<Value>::from_json_without_result(&json!({}));
        let p = Pagination::from_envelope(&envelope);
        assert_eq!(p.items_per_page, 10);
        assert_eq!(p.total_pages, 1);
    }

    #[test]
    fn test_from_envelope_huge_total_count() {
        let json = json!({"TotalCount": i64::MAX, "PageSize": 10, "Index": 1});
        let envelope = Envelope::<Value>::from_json_without_result(&json);
        let p = Pagination::from_envelope(&envelope);
        assert_eq!(p.total_items, i64::MAX);
        assert_eq!(p.total_pages, i64::MAX / 10 + 1);
        assert!(p.has_next_page);

        let json = json!({"TotalCount": i64::MAX, "PageSize": i64::MAX});
        let envelope = Envelope::<Value>::from_json_without_result(&json);
        assert_eq!(Pagination::from_envelope(&envelope).total_pages, 1);
    }

    #[test]
    fn test_paginated_from_json() {
        let json = json!({"data": [1, 2, 3], "page": 1, "last_page": 2, "has_next": true});
        let page = Paginated::from_json(&json, "data", |v| {
            v.as_i64().ok_or_else(|| anyhow::anyhow!("not a number"))
        })
        .unwrap();
        assert_eq!(page.items, vec![1, 2, 3]);
        assert_eq!(page.pagination.total_pages, 2);
        assert!(page.pagination.has_next_page);
    }

    #[test]
    fn test_paginated_rejects_non_array() {
        let json = json!({"data": {"a": 1}});
        let result = Paginated::<Value>::from_json(&json, "data", Ok);
        assert!(result.is_err());
    }
}
