use serde::{Deserialize, Serialize};

/// Row conditions are equality only; a bare scalar is shorthand for `$eq`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FilterOp {
    #[serde(rename = "$eq")] Eq,
}

impl FilterOp {
    pub fn parse(op: &str) -> Option<Self> {
        match op {
            "$eq" => Some(FilterOp::Eq),
            _ => None,
        }
    }

    /// PostgREST operator keyword
    pub fn to_rest(&self) -> &'static str {
        match self {
            FilterOp::Eq => "eq",
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FilterData {
    #[serde(rename = "where")]
    pub where_clause: Option<serde_json::Value>,
    pub order: Option<serde_json::Value>,
    pub limit: Option<i32>,
    pub offset: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct FilterWhereInfo {
    pub column: String,
    pub operator: FilterOp,
    pub data: serde_json::Value,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn to_rest(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

#[derive(Debug, Clone)]
pub struct FilterOrderInfo {
    pub column: String,
    pub sort: SortDirection,
}

/// Rendered query string pairs, e.g. `("owner_id", "eq.4f…")`
pub type QueryPairs = Vec<(String, String)>;
