//! Per-owner dashboard state: selection, panel visibility and the revision
//! counters readers compare against to decide when to re-fetch.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use serde::Serialize;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;
use uuid::Uuid;

use crate::events::{Event, EventBus};

/// Bumped by mutations; a reader holding an older revision re-fetches
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct Revisions {
    pub properties: u64,
    pub documents: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DashboardState {
    /// `None` shows documents across every property
    pub selected_property_id: Option<Uuid>,
    pub property_form_open: bool,
    pub revisions: Revisions,
}

#[derive(Clone, Default)]
pub struct DashboardRegistry {
    states: Arc<RwLock<HashMap<Uuid, DashboardState>>>,
}

impl DashboardRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, owner_id: Uuid) -> DashboardState {
        self.states
            .read()
            .ok()
            .and_then(|states| states.get(&owner_id).cloned())
            .unwrap_or_default()
    }

    pub fn selected_property(&self, owner_id: Uuid) -> Option<Uuid> {
        self.get(owner_id).selected_property_id
    }

    /// Mark one property as selected; any previous selection is replaced
    pub fn select_property(&self, owner_id: Uuid, property_id: Uuid) -> DashboardState {
        self.update(owner_id, |state| state.selected_property_id = Some(property_id))
    }

    pub fn toggle_property_form(&self, owner_id: Uuid) -> DashboardState {
        self.update(owner_id, |state| state.property_form_open = !state.property_form_open)
    }

    pub fn apply(&self, event: &Event) {
        match event {
            Event::SignedIn { .. } | Event::SignedOut { last_session: false, .. } => {}
            Event::SignedOut { owner_id, last_session: true } => {
                if let Ok(mut states) = self.states.write() {
                    states.remove(owner_id);
                }
            }
            Event::PropertyCreated { owner_id, .. } => {
                self.update(*owner_id, |state| {
                    state.revisions.properties += 1;
                    state.property_form_open = false;
                });
            }
            Event::DocumentUploaded { owner_id, .. } | Event::DocumentDeleted { owner_id, .. } => {
                self.update(*owner_id, |state| state.revisions.documents += 1);
            }
        }
    }

    /// Keep the registry in step with the bus until the bus closes
    pub fn spawn_listener(&self, events: &EventBus) -> JoinHandle<()> {
        let registry = self.clone();
        let mut rx = events.subscribe();
        tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(event) => registry.apply(&event),
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!("dashboard listener lagged, skipped {} events", skipped);
                    }
                    Err(RecvError::Closed) => break,
                }
            }
        })
    }

    fn update(&self, owner_id: Uuid, f: impl FnOnce(&mut DashboardState)) -> DashboardState {
        match self.states.write() {
            Ok(mut states) => {
                let state = states.entry(owner_id).or_default();
                f(state);
                state.clone()
            }
            Err(_) => DashboardState::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selection_is_exclusive() {
        let registry = DashboardRegistry::new();
        let owner = Uuid::new_v4();
        let (a, b) = (Uuid::new_v4(), Uuid::new_v4());

        registry.select_property(owner, a);
        let state = registry.select_property(owner, b);
        assert_eq!(state.selected_property_id, Some(b));
        assert_eq!(registry.selected_property(Uuid::new_v4()), None);
    }

    #[test]
    fn property_created_bumps_revision_and_closes_form() {
        let registry = DashboardRegistry::new();
        let owner = Uuid::new_v4();
        assert!(registry.toggle_property_form(owner).property_form_open);

        registry.apply(&Event::PropertyCreated { owner_id: owner, property_id: Uuid::new_v4() });
        let state = registry.get(owner);
        assert!(!state.property_form_open);
        assert_eq!(state.revisions, Revisions { properties: 1, documents: 0 });
    }

    #[test]
    fn document_events_only_touch_document_revision() {
        let registry = DashboardRegistry::new();
        let owner = Uuid::new_v4();
        let document_id = Uuid::new_v4();
        registry.apply(&Event::DocumentUploaded { owner_id: owner, document_id, property_id: None });
        registry.apply(&Event::DocumentDeleted { owner_id: owner, document_id });
        assert_eq!(registry.get(owner).revisions, Revisions { properties: 0, documents: 2 });
    }

    #[test]
    fn last_sign_out_drops_state() {
        let registry = DashboardRegistry::new();
        let owner = Uuid::new_v4();
        let villa = Uuid::new_v4();
        registry.select_property(owner, villa);

        registry.apply(&Event::SignedOut { owner_id: owner, last_session: false });
        assert_eq!(registry.selected_property(owner), Some(villa));

        registry.apply(&Event::SignedOut { owner_id: owner, last_session: true });
        assert_eq!(registry.get(owner), DashboardState::default());
    }

    #[tokio::test]
    async fn listener_follows_the_bus() {
        let bus = EventBus::default();
        let registry = DashboardRegistry::new();
        let _listener = registry.spawn_listener(&bus);
        let owner = Uuid::new_v4();

        bus.emit(Event::PropertyCreated { owner_id: owner, property_id: Uuid::new_v4() });
        for _ in 0..50 {
            if registry.get(owner).revisions.properties == 1 {
                return;
            }
            tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        }
        panic!("listener never applied the event");
    }
}
