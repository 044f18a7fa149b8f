use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::json;
use thiserror::Error;
use uuid::Uuid;

use super::{BackendError, SharedBackend};
use crate::filter::{Filter, FilterData, FilterError, MAX_LIMIT};
use crate::models::Table;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error(transparent)]
    Backend(#[from] BackendError),

    #[error(transparent)]
    Filter(#[from] FilterError),

    #[error("Unexpected row shape from {table}: {message}")]
    Decode { table: Table, message: String },

    #[error("Record not found")]
    NotFound,
}

/// Typed access to one backend table on behalf of one signed-in user
pub struct Repository<T> {
    table: Table,
    backend: SharedBackend,
    access_token: String,
    _phantom: std::marker::PhantomData<T>,
}

impl<T> Repository<T>
where
    T: DeserializeOwned + Send,
{
    pub fn new(table: Table, backend: SharedBackend, access_token: impl Into<String>) -> Self {
        Self {
            table,
            backend,
            access_token: access_token.into(),
            _phantom: std::marker::PhantomData,
        }
    }

    pub async fn select_any(&self, filter_data: FilterData) -> Result<Vec<T>, RepositoryError> {
        let filter = Filter::from_data(filter_data)?;
        let rows = self.backend.select(&self.access_token, self.table, &filter).await?;
        rows.into_iter().map(|row| self.decode(row)).collect()
    }

    /// Every matching row, read in pages so a server-side row cap cannot truncate the result.
    /// Without an explicit order, pages are ordered by `id` to keep them stable.
    pub async fn select_all(&self, filter_data: FilterData) -> Result<Vec<T>, RepositoryError> {
        let order = filter_data.order.clone().or_else(|| Some(json!("id asc")));
        let mut rows = Vec::new();
        let mut offset = 0;
        loop {
            let page = self
                .select_any(FilterData {
                    order: order.clone(),
                    limit: Some(MAX_LIMIT),
                    offset: Some(offset),
                    ..filter_data.clone()
                })
                .await?;
            let page_len = page.len();
            rows.extend(page);
            if page_len < MAX_LIMIT as usize {
                break;
            }
            offset += MAX_LIMIT;
        }
        Ok(rows)
    }

    pub async fn select_one(&self, mut filter_data: FilterData) -> Result<Option<T>, RepositoryError> {
        filter_data.limit = Some(1);
        Ok(self.select_any(filter_data).await?.into_iter().next())
    }

    pub async fn select_404(&self, filter_data: FilterData) -> Result<T, RepositoryError> {
        self.select_one(filter_data).await?.ok_or(RepositoryError::NotFound)
    }

    pub async fn select_id(&self, id: Uuid) -> Result<T, RepositoryError> {
        self.select_404(FilterData {
            where_clause: Some(json!({ "id": id })),
            ..Default::default()
        })
        .await
    }

    pub async fn insert<N: Serialize>(&self, new_row: &N) -> Result<T, RepositoryError> {
        let payload = serde_json::to_value(new_row).map_err(|e| RepositoryError::Decode {
            table: self.table,
            message: e.to_string(),
        })?;
        let stored = self.backend.insert(&self.access_token, self.table, payload).await?;
        self.decode(stored)
    }

    pub async fn delete(&self, id: Uuid) -> Result<(), RepositoryError> {
        self.backend.delete(&self.access_token, self.table, id).await?;
        Ok(())
    }

    fn decode(&self, row: serde_json::Value) -> Result<T, RepositoryError> {
        serde_json::from_value(row).map_err(|e| RepositoryError::Decode {
            table: self.table,
            message: e.to_string(),
        })
    }
}
