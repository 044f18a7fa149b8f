use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::json;
use uuid::Uuid;

use crate::backend::{Repository, RepositoryError};
use crate::error::ApiError;
use crate::events::{Event, EventBus};
use crate::filter::FilterData;
use crate::middleware::AuthUser;
use crate::models::{NewProperty, Property, PropertyType, Table};
use crate::state::AppState;

/// Property form submission
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PropertyInput {
    #[serde(default)]
    pub property_name: String,
    #[serde(default)]
    pub address: String,
    #[serde(default)]
    pub property_type: PropertyType,
}

impl PropertyInput {
    /// Required fields, checked before any backend call
    pub fn validate(&self) -> Result<(), PropertyError> {
        let mut field_errors = HashMap::new();
        if self.property_name.trim().is_empty() {
            field_errors.insert("property_name".to_string(), "Property name is required".to_string());
        }
        if self.address.trim().is_empty() {
            field_errors.insert("address".to_string(), "Address is required".to_string());
        }
        if field_errors.is_empty() {
            Ok(())
        } else {
            Err(PropertyError::Validation(field_errors))
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PropertyError {
    #[error("Missing required fields")]
    Validation(HashMap<String, String>),
    #[error("Property not found: {0}")]
    NotFound(Uuid),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<PropertyError> for ApiError {
    fn from(err: PropertyError) -> Self {
        match err {
            PropertyError::Validation(field_errors) => {
                ApiError::validation_error("Missing required fields", Some(field_errors))
            }
            PropertyError::NotFound(id) => ApiError::not_found(format!("Property not found: {}", id)),
            PropertyError::Repository(e) => e.into(),
        }
    }
}

pub struct PropertyService {
    properties: Repository<Property>,
    owner_id: Uuid,
    events: EventBus,
}

impl PropertyService {
    pub fn new(state: &AppState, user: &AuthUser) -> Self {
        Self {
            properties: state.repository(Table::Properties, user),
            owner_id: user.user_id,
            events: state.events.clone(),
        }
    }

    /// The owner's properties, newest first
    pub async fn list(&self) -> Result<Vec<Property>, PropertyError> {
        let filter = FilterData {
            where_clause: Some(json!({ "owner_id": self.owner_id })),
            order: Some(json!("created_at desc")),
            ..Default::default()
        };
        Ok(self.properties.select_all(filter).await?)
    }

    /// Other owners' rows are hidden by the access policy and read as missing
    pub async fn find(&self, property_id: Uuid) -> Result<Property, PropertyError> {
        match self.properties.select_id(property_id).await {
            Err(RepositoryError::NotFound) => Err(PropertyError::NotFound(property_id)),
            other => Ok(other?),
        }
    }

    pub async fn create(&self, input: PropertyInput) -> Result<Property, PropertyError> {
        input.validate()?;

        let new_property = NewProperty {
            owner_id: self.owner_id,
            property_name: input.property_name.trim().to_string(),
            address: input.address.trim().to_string(),
            property_type: input.property_type,
        };
        let property = self.properties.insert(&new_property).await?;

        tracing::info!(owner_id = %self.owner_id, property_id = %property.id, "property created");
        self.events.emit(Event::PropertyCreated {
            owner_id: self.owner_id,
            property_id: property.id,
        });
        Ok(property)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_fields_are_rejected() {
        let input = PropertyInput {
            property_name: "  ".into(),
            address: String::new(),
            property_type: PropertyType::Land,
        };
        match input.validate() {
            Err(PropertyError::Validation(fields)) => {
                assert!(fields.contains_key("property_name"));
                assert!(fields.contains_key("address"));
            }
            other => panic!("unexpected: {:?}", other),
        }
    }

    #[test]
    fn property_type_defaults_to_house() {
        let input: PropertyInput = serde_json::from_value(json!({
            "property_name": "Sunset Villa",
            "address": "1 Ocean Dr"
        }))
        .unwrap();
        assert_eq!(input.property_type, PropertyType::House);
        assert!(input.validate().is_ok());
    }
}
