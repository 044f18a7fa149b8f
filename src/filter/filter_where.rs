use std::cmp::Ordering;

use chrono::{DateTime, FixedOffset};
use serde_json::Value;

use super::error::FilterError;
use super::types::{FilterOp, FilterWhereInfo, QueryPairs};

pub struct FilterWhere {
    conditions: Vec<FilterWhereInfo>,
}

impl FilterWhere {
    pub fn parse(where_data: &Value) -> Result<Self, FilterError> {
        let mut filter_where = Self { conditions: vec![] };
        filter_where.parse_where_data(where_data)?;
        Ok(filter_where)
    }

    pub fn validate(where_data: &Value) -> Result<(), FilterError> {
        if where_data.is_null() { return Ok(()); }
        match where_data {
            Value::Object(_) => Self::parse(where_data).map(|_| ()),
            _ => Err(FilterError::InvalidWhereClause("WHERE must be an object".to_string())),
        }
    }

    fn parse_where_data(&mut self, where_data: &Value) -> Result<(), FilterError> {
        match where_data {
            Value::Null => Ok(()),
            Value::Object(obj) => {
                for (key, value) in obj {
                    if key.starts_with('$') {
                        // Logical operators are not part of the backend query surface
                        return Err(FilterError::UnsupportedOperator(key.clone()));
                    }
                    self.parse_field_condition(key, value)?;
                }
                Ok(())
            }
            _ => Err(FilterError::InvalidWhereClause("Unsupported WHERE format".to_string())),
        }
    }

    fn parse_field_condition(&mut self, field: &str, value: &Value) -> Result<(), FilterError> {
        validate_column(field)?;

        match value {
            Value::Object(ops) if ops.keys().all(|k| k.starts_with('$')) => {
                for (op, data) in ops {
                    let operator = FilterOp::parse(op)
                        .ok_or_else(|| FilterError::UnsupportedOperator(op.clone()))?;
                    Self::validate_operator_data(field, data)?;
                    self.push(field, operator, data.clone());
                }
            }
            Value::Null | Value::Object(_) | Value::Array(_) => {
                return Err(FilterError::InvalidOperatorData(format!(
                    "Field '{}' requires a scalar or operator object",
                    field
                )));
            }
            scalar => {
                self.push(field, FilterOp::Eq, scalar.clone());
            }
        }
        Ok(())
    }

    fn validate_operator_data(field: &str, data: &Value) -> Result<(), FilterError> {
        if data.is_null() || data.is_object() || data.is_array() {
            return Err(FilterError::InvalidOperatorData(format!(
                "Field '{}' requires a scalar value",
                field
            )));
        }
        Ok(())
    }

    fn push(&mut self, column: &str, operator: FilterOp, data: Value) {
        self.conditions.push(FilterWhereInfo { column: column.to_string(), operator, data });
    }

    /// Render as PostgREST horizontal filters (`column=op.value`)
    pub fn to_query_pairs(&self) -> QueryPairs {
        self.conditions
            .iter()
            .map(|c| (c.column.clone(), format!("{}.{}", c.operator.to_rest(), render_scalar(&c.data))))
            .collect()
    }

    /// Evaluate every condition against a JSON row
    pub fn matches(&self, row: &Value) -> bool {
        self.conditions.iter().all(|c| {
            let field = row.get(&c.column).unwrap_or(&Value::Null);
            match c.operator {
                FilterOp::Eq => values_equal(field, &c.data),
            }
        })
    }
}

pub(crate) fn validate_column(column: &str) -> Result<(), FilterError> {
    let mut chars = column.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {}
        _ => return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column))),
    }
    if !column.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(FilterError::InvalidColumn(format!("Invalid column name format: {}", column)));
    }
    Ok(())
}

fn render_scalar(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn values_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64() == y.as_f64(),
        (Value::String(x), Value::String(y)) => {
            x == y || matches!((parse_timestamp(x), parse_timestamp(y)), (Some(l), Some(r)) if l == r)
        }
        _ => a == b,
    }
}

/// Ordering used for sorting. Timestamps compare as instants.
pub(crate) fn compare_values(a: &Value, b: &Value) -> Option<Ordering> {
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
        (Value::String(x), Value::String(y)) => match (parse_timestamp(x), parse_timestamp(y)) {
            (Some(l), Some(r)) => Some(l.cmp(&r)),
            _ => Some(x.cmp(y)),
        },
        (Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
        (Value::Null, Value::Null) => Some(Ordering::Equal),
        _ => None,
    }
}

fn parse_timestamp(s: &str) -> Option<DateTime<FixedOffset>> {
    // Cheap pre-check so plain strings skip the parser
    if s.len() < 20 || s.as_bytes().get(4) != Some(&b'-') {
        return None;
    }
    DateTime::parse_from_rfc3339(s).ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scalar_values_become_equality() {
        let w = FilterWhere::parse(&json!({ "owner_id": "abc" })).unwrap();
        assert_eq!(w.to_query_pairs(), vec![("owner_id".to_string(), "eq.abc".to_string())]);
    }

    #[test]
    fn operator_objects_render_like_scalars() {
        let w = FilterWhere::parse(&json!({ "property_id": { "$eq": "p1" } })).unwrap();
        assert_eq!(w.to_query_pairs(), vec![("property_id".to_string(), "eq.p1".to_string())]);
    }

    #[test]
    fn rejects_logical_operators_and_bad_columns() {
        assert!(matches!(
            FilterWhere::parse(&json!({ "$or": [] })),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::parse(&json!({ "owner id": 1 })),
            Err(FilterError::InvalidColumn(_))
        ));
        assert!(matches!(
            FilterWhere::parse(&json!({ "size": { "$gt": 3 } })),
            Err(FilterError::UnsupportedOperator(_))
        ));
        assert!(matches!(
            FilterWhere::parse(&json!({ "property_id": null })),
            Err(FilterError::InvalidOperatorData(_))
        ));
    }

    #[test]
    fn matches_rows_in_memory() {
        let w = FilterWhere::parse(&json!({ "owner_id": "u1", "file_size": 2048 })).unwrap();
        assert!(w.matches(&json!({ "owner_id": "u1", "file_size": 2048.0 })));
        assert!(!w.matches(&json!({ "owner_id": "u2", "file_size": 2048 })));
        assert!(!w.matches(&json!({ "owner_id": "u1" })));
    }

    #[test]
    fn equal_timestamps_match_across_precision() {
        let w = FilterWhere::parse(&json!({ "uploaded_at": "2024-01-01T00:00:00Z" })).unwrap();
        assert!(w.matches(&json!({ "uploaded_at": "2024-01-01T00:00:00.000000+00:00" })));
    }

    #[test]
    fn timestamps_compare_as_instants() {
        let earlier = json!("2024-01-01T00:00:00.123Z");
        let later = json!("2024-01-01T00:00:00.123456Z");
        assert_eq!(compare_values(&earlier, &later), Some(Ordering::Less));
    }
}
