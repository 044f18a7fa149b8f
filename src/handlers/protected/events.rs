// handlers/protected/events.rs - GET /api/events (server-sent events)

use std::convert::Infallible;
use std::time::Duration;

use axum::{
    extract::State,
    response::sse::{Event as SseEvent, KeepAlive, Sse},
    Extension,
};
use futures::stream::{self, Stream};
use tokio::sync::broadcast::{error::RecvError, Receiver};
use uuid::Uuid;

use crate::auth::AuthContext;
use crate::events::Event;
use crate::middleware::AuthUser;
use crate::state::AppState;

/// Stream this owner's mutation events so readers know when to re-fetch.
/// The stream ends after the `signed_out` event of the session that opened it.
pub async fn events_get(
    State(state): State<AppState>,
    Extension(user): Extension<AuthUser>,
) -> Sse<impl Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = state.events.subscribe();
    tracing::debug!(owner_id = %user.user_id, "event stream opened");

    let stream = owner_events(rx, user.user_id, state.auth.clone(), user.access_token);
    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}

fn owner_events(
    rx: Receiver<Event>,
    owner_id: Uuid,
    auth: AuthContext,
    access_token: String,
) -> impl Stream<Item = Result<SseEvent, Infallible>> {
    stream::unfold(Some(rx), move |rx| {
        let auth = auth.clone();
        let access_token = access_token.clone();
        async move {
            let mut rx = rx?;
            loop {
                match rx.recv().await {
                    Ok(event) if event.owner_id() == owner_id => {
                        // Another session of the same owner signing out leaves this one open
                        let ended = matches!(event, Event::SignedOut { .. }) && auth.resolve(&access_token).is_err();
                        let sse = SseEvent::default()
                            .event(event.name())
                            .json_data(&event)
                            .unwrap_or_else(|_| SseEvent::default().event(event.name()));
                        return Some((Ok(sse), (!ended).then_some(rx)));
                    }
                    Ok(_) => continue,
                    Err(RecvError::Lagged(skipped)) => {
                        tracing::warn!(%owner_id, "event stream lagged, skipped {} events", skipped);
                        continue;
                    }
                    Err(RecvError::Closed) => return None,
                }
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::{generate_jwt, Claims};
    use crate::backend::{Session, User};
    use crate::events::EventBus;
    use futures::StreamExt;

    fn begin_session(auth: &AuthContext, owner_id: Uuid) -> String {
        let token = generate_jwt(&Claims::new(owner_id, None, 1), "secret").unwrap();
        auth.begin(Session {
            access_token: token.clone(),
            refresh_token: None,
            expires_at: chrono::Utc::now() + chrono::Duration::hours(1),
            user: User { id: owner_id, email: None },
        });
        token
    }

    #[tokio::test]
    async fn stream_filters_by_owner_and_ends_on_sign_out() {
        let bus = EventBus::default();
        let auth = AuthContext::new("secret", bus.clone());
        let owner_id = Uuid::new_v4();
        let token = begin_session(&auth, owner_id);
        let stream = owner_events(bus.subscribe(), owner_id, auth.clone(), token.clone());

        bus.emit(Event::SignedIn { owner_id: Uuid::new_v4() });
        bus.emit(Event::PropertyCreated { owner_id, property_id: Uuid::new_v4() });
        auth.end(&token);
        bus.emit(Event::DocumentDeleted { owner_id, document_id: Uuid::new_v4() });

        let items: Vec<_> = stream.collect().await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn sibling_sign_out_keeps_stream_open() {
        let bus = EventBus::default();
        let auth = AuthContext::new("secret", bus.clone());
        let owner_id = Uuid::new_v4();
        let kept = begin_session(&auth, owner_id);
        let other = begin_session(&auth, owner_id);
        let mut stream = Box::pin(owner_events(bus.subscribe(), owner_id, auth.clone(), kept.clone()));

        auth.end(&other);
        bus.emit(Event::PropertyCreated { owner_id, property_id: Uuid::new_v4() });
        assert!(stream.next().await.is_some(), "sibling signed_out");
        assert!(stream.next().await.is_some(), "property_created");

        auth.end(&kept);
        bus.emit(Event::DocumentDeleted { owner_id, document_id: Uuid::new_v4() });
        assert!(stream.next().await.is_some(), "own signed_out");
        assert!(stream.next().await.is_none());
    }
}
