use serde_json::Value;

use super::error::FilterError;
use super::filter_order::FilterOrder;
use super::filter_where::FilterWhere;
use super::types::{FilterData, FilterOrderInfo, QueryPairs};

/// Upper bound on rows a single read may request
pub const MAX_LIMIT: i32 = 1000;

#[derive(Default)]
pub struct Filter {
    where_data: Option<FilterWhere>,
    order_data: Vec<FilterOrderInfo>,
    limit: Option<i32>,
    offset: Option<i32>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build and validate a filter from its JSON description
    pub fn from_data(data: FilterData) -> Result<Self, FilterError> {
        let mut filter = Self::new();
        filter.assign(data)?;
        Ok(filter)
    }

    pub fn assign(&mut self, data: FilterData) -> Result<&mut Self, FilterError> {
        if let Some(where_clause) = data.where_clause { self.where_clause(where_clause)?; }
        if let Some(order) = data.order { self.order(order)?; }
        match data.limit {
            Some(limit) => { self.limit(limit, data.offset)?; }
            None => {
                if let Some(offset) = data.offset { self.offset(offset)?; }
            }
        }
        Ok(self)
    }

    pub fn where_clause(&mut self, conditions: Value) -> Result<&mut Self, FilterError> {
        FilterWhere::validate(&conditions)?;
        self.where_data = Some(FilterWhere::parse(&conditions)?);
        Ok(self)
    }

    pub fn order(&mut self, order_spec: Value) -> Result<&mut Self, FilterError> {
        self.order_data = FilterOrder::validate_and_parse(&order_spec)?;
        Ok(self)
    }

    pub fn limit(&mut self, limit: i32, offset: Option<i32>) -> Result<&mut Self, FilterError> {
        if limit < 0 { return Err(FilterError::InvalidLimit("Limit must be non-negative".to_string())); }
        if let Some(off) = offset { if off < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); } }

        let applied_limit = if limit > MAX_LIMIT {
            tracing::warn!("Limit {} exceeds max {}, capping to max", limit, MAX_LIMIT);
            MAX_LIMIT
        } else {
            limit
        };

        self.limit = Some(applied_limit);
        self.offset = offset;
        Ok(self)
    }

    pub fn offset(&mut self, offset: i32) -> Result<&mut Self, FilterError> {
        if offset < 0 { return Err(FilterError::InvalidOffset("Offset must be non-negative".to_string())); }
        self.offset = Some(offset);
        Ok(self)
    }

    /// Render as PostgREST query pairs: `select=*`, horizontal filters, `order`, `limit`, `offset`
    pub fn to_query_pairs(&self) -> QueryPairs {
        let mut pairs: QueryPairs = vec![("select".to_string(), "*".to_string())];
        if let Some(ref w) = self.where_data {
            pairs.extend(w.to_query_pairs());
        }
        if let Some(order) = FilterOrder::to_query_value(&self.order_data) {
            pairs.push(("order".to_string(), order));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit".to_string(), limit.to_string()));
        }
        if let Some(offset) = self.offset {
            pairs.push(("offset".to_string(), offset.to_string()));
        }
        tracing::debug!(?pairs, "rendered filter");
        pairs
    }

    pub fn matches(&self, row: &Value) -> bool {
        self.where_data.as_ref().map(|w| w.matches(row)).unwrap_or(true)
    }

    /// Apply where, order and offset/limit to in-memory rows
    pub fn apply(&self, rows: impl IntoIterator<Item = Value>) -> Vec<Value> {
        let mut out: Vec<Value> = rows.into_iter().filter(|r| self.matches(r)).collect();
        FilterOrder::sort(&mut out, &self.order_data);

        let offset = self.offset.unwrap_or(0).max(0) as usize;
        let limit = self.limit.map(|l| l.max(0) as usize).unwrap_or(usize::MAX);
        out.into_iter().skip(offset).take(limit).collect()
    }
}
