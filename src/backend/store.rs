//! Shared backend update state cell.

use std::sync::Arc;

use async_trait::async_trait;
use log::{debug, warn};
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;

use crate::backend::state::{BackendUpdatePatch, BackendUpdateState};
use crate::notifications::{
    AsyncNotificationManager, EventFilter, ExtensionEvent, NotificationManager, NotificationResult,
    Publisher, Subscriber,
};

/// Single source of truth for [`BackendUpdateState`].
///
/// Clones share the same cell. Every applied patch is also published as
/// [`ExtensionEvent::BackendUpdateStateSync`] when an event bus is attached,
/// so out-of-process observers can merge the same change.
#[derive(Clone)]
pub struct BackendUpdateStore {
    state: Arc<watch::Sender<BackendUpdateState>>,
    events: Option<AsyncNotificationManager<ExtensionEvent>>,
}

impl BackendUpdateStore {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(BackendUpdateState::default());
        Self {
            state: Arc::new(tx),
            events: None,
        }
    }

    pub fn with_events(mut self, events: AsyncNotificationManager<ExtensionEvent>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn snapshot(&self) -> BackendUpdateState {
        self.state.borrow().clone()
    }

    /// Merge `patch` into the shared state and broadcast it.
    pub async fn apply(&self, patch: BackendUpdatePatch) {
        if patch.is_empty() {
            return;
        }
        self.state.send_modify(|state| state.merge(&patch));
        debug!("Backend update state patched: {:?}", patch);

        if let Some(events) = &self.events {
            if let Err(e) = events.publish(ExtensionEvent::backend_state_sync(patch)).await {
                warn!("Failed to broadcast backend update state: {}", e);
            }
        }
    }

    /// Merge a patch received from elsewhere without re-broadcasting it.
    pub fn merge_remote(&self, patch: &BackendUpdatePatch) {
        self.state.send_modify(|state| state.merge(patch));
    }

    pub fn subscribe(&self) -> watch::Receiver<BackendUpdateState> {
        self.state.subscribe()
    }

    /// Stream of states, starting with the current one.
    pub fn stream(&self) -> WatchStream<BackendUpdateState> {
        WatchStream::new(self.subscribe())
    }
}

impl Default for BackendUpdateStore {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for BackendUpdateStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BackendUpdateStore")
            .field("state", &*self.state.borrow())
            .field("broadcasting", &self.events.is_some())
            .finish()
    }
}

#[async_trait]
impl Publisher<ExtensionEvent> for BackendUpdateStore {
    /// Sync events are merged locally; anything else is forwarded untouched.
    async fn publish(&self, event: ExtensionEvent) -> NotificationResult<()> {
        match event {
            ExtensionEvent::BackendUpdateStateSync { patch } => {
                self.apply(patch).await;
                Ok(())
            }
            other => match &self.events {
                Some(events) => events.publish(other).await,
                None => Ok(()),
            },
        }
    }

    fn publisher_id(&self) -> &str {
        "backend-update-store"
    }
}

/// Bus subscriber that merges sync events into a store without re-broadcasting.
///
/// Lets a store living in another component follow the patches another store applies.
pub struct StoreSync {
    id: String,
    store: BackendUpdateStore,
}

impl StoreSync {
    pub fn new(id: impl Into<String>, store: BackendUpdateStore) -> Self {
        Self { id: id.into(), store }
    }
}

#[async_trait]
impl Subscriber<ExtensionEvent> for StoreSync {
    async fn handle_event(&self, event: ExtensionEvent) -> NotificationResult<()> {
        if let ExtensionEvent::BackendUpdateStateSync { patch } = event {
            self.store.merge_remote(&patch);
        }
        Ok(())
    }

    fn subscriber_id(&self) -> &str {
        &self.id
    }

    fn event_filter(&self) -> EventFilter {
        EventFilter::Named(vec![ExtensionEvent::BACKEND_UPDATE_STATE_SYNC])
    }

    fn rate_limit(&self) -> Option<crate::notifications::RateLimit> {
        None
    }
}
