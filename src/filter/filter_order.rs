use std::cmp::Ordering;

use serde_json::Value;

use super::error::FilterError;
use super::filter_where::{compare_values, validate_column};
use super::types::{FilterOrderInfo, SortDirection};

pub struct FilterOrder;

impl FilterOrder {
    pub fn validate_and_parse(order: &Value) -> Result<Vec<FilterOrderInfo>, FilterError> {
        let infos = match order {
            Value::String(s) => Self::parse_order_string(s)?,
            Value::Array(arr) => {
                // Expect array of strings like ["created_at desc", "property_name asc"]
                let mut out = Vec::new();
                for v in arr {
                    if let Value::String(s) = v { out.extend(Self::parse_order_string(s)?); }
                }
                out
            }
            Value::Object(obj) => {
                // { "created_at": "desc" }
                let mut out = Vec::new();
                for (k, v) in obj {
                    let sort = match v.as_str().unwrap_or("asc").to_ascii_lowercase().as_str() {
                        "desc" => SortDirection::Desc,
                        _ => SortDirection::Asc,
                    };
                    out.push(FilterOrderInfo { column: k.clone(), sort });
                }
                out
            }
            _ => vec![],
        };
        for info in &infos {
            validate_column(&info.column)?;
        }
        Ok(infos)
    }

    fn parse_order_string(s: &str) -> Result<Vec<FilterOrderInfo>, FilterError> {
        // split on commas, then each token into column and direction
        let mut out = Vec::new();
        for part in s.split(',') {
            let trimmed = part.trim();
            if trimmed.is_empty() { continue; }
            let mut it = trimmed.split_whitespace();
            if let Some(col) = it.next() {
                let dir = it.next().unwrap_or("asc");
                let sort = if dir.eq_ignore_ascii_case("desc") { SortDirection::Desc } else { SortDirection::Asc };
                out.push(FilterOrderInfo { column: col.to_string(), sort });
            }
        }
        Ok(out)
    }

    /// PostgREST `order` parameter value, e.g. `created_at.desc`
    pub fn to_query_value(infos: &[FilterOrderInfo]) -> Option<String> {
        if infos.is_empty() { return None; }
        let parts: Vec<String> = infos
            .iter()
            .map(|i| format!("{}.{}", i.column, i.sort.to_rest()))
            .collect();
        Some(parts.join(","))
    }

    /// Stable in-memory sort; values that cannot be compared keep their relative order
    pub fn sort(rows: &mut [Value], infos: &[FilterOrderInfo]) {
        if infos.is_empty() { return; }
        rows.sort_by(|a, b| {
            for info in infos {
                let left = a.get(&info.column).unwrap_or(&Value::Null);
                let right = b.get(&info.column).unwrap_or(&Value::Null);
                let ord = compare_values(left, right).unwrap_or(Ordering::Equal);
                let ord = match info.sort {
                    SortDirection::Asc => ord,
                    SortDirection::Desc => ord.reverse(),
                };
                if ord != Ordering::Equal {
                    return ord;
                }
            }
            Ordering::Equal
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_string_and_object_forms() {
        let infos = FilterOrder::validate_and_parse(&json!("created_at desc, property_name")).unwrap();
        assert_eq!(FilterOrder::to_query_value(&infos).as_deref(), Some("created_at.desc,property_name.asc"));

        let infos = FilterOrder::validate_and_parse(&json!({ "uploaded_at": "DESC" })).unwrap();
        assert_eq!(infos[0].sort, SortDirection::Desc);
    }

    #[test]
    fn rejects_injected_columns() {
        assert!(FilterOrder::validate_and_parse(&json!("created_at;drop desc")).is_err());
    }

    #[test]
    fn sorts_descending_by_timestamp() {
        let mut rows = vec![
            json!({ "id": 1, "created_at": "2024-01-01T00:00:00.000001Z" }),
            json!({ "id": 2, "created_at": "2024-01-01T00:00:00.000003Z" }),
            json!({ "id": 3, "created_at": "2024-01-01T00:00:00.000002Z" }),
        ];
        let infos = FilterOrder::validate_and_parse(&json!("created_at desc")).unwrap();
        FilterOrder::sort(&mut rows, &infos);
        let ids: Vec<i64> = rows.iter().map(|r| r["id"].as_i64().unwrap()).collect();
        assert_eq!(ids, vec![2, 3, 1]);
    }
}
