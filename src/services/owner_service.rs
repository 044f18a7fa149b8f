use serde_json::json;
use uuid::Uuid;

use crate::backend::{Repository, RepositoryError};
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{HouseOwner, Table};
use crate::state::AppState;

/// Read-only access to the owner profile created at sign-up
pub struct OwnerService {
    owners: Repository<HouseOwner>,
    owner_id: Uuid,
}

impl OwnerService {
    pub fn new(state: &AppState, user: &AuthUser) -> Self {
        Self {
            owners: state.repository(Table::HouseOwners, user),
            owner_id: user.user_id,
        }
    }

    /// `None` when the profile row has not been created yet
    pub async fn profile(&self) -> Result<Option<HouseOwner>, RepositoryError> {
        self.owners
            .select_one(FilterData {
                where_clause: Some(json!({ "id": self.owner_id })),
                ..Default::default()
            })
            .await
    }
}
