//! Typed broadcast channels with handle-based unsubscription.
//!
//! Components subscribe to an [`EventChannel`] and keep the returned
//! [`SubscriptionHandle`]. Firing a channel yields the live handles in
//! subscription order; the owner of the bus routes the event to whichever
//! component holds each handle. Unsubscribing through a handle is
//! idempotent.

use rustc_hash::FxHashMap;

/// Broadcast channels the session emits.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EventChannel {
    /// The host is about to draw a frame; the viewpoint may have moved.
    NewFrame,
    /// An atomic model's coordinates changed.
    ModelChanged,
}

/// Proof of a subscription. Pass back to [`EventBus::unsubscribe`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriptionHandle {
    channel: EventChannel,
    id: u64,
}

impl SubscriptionHandle {
    /// Channel this handle subscribes to.
    #[must_use]
    pub fn channel(&self) -> EventChannel {
        self.channel
    }
}

/// Registry of live subscriptions.
#[derive(Debug, Default)]
pub struct EventBus {
    next_id: u64,
    subscribers: FxHashMap<EventChannel, Vec<u64>>,
}

impl EventBus {
    /// Empty bus.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to `channel`.
    pub fn subscribe(&mut self, channel: EventChannel) -> SubscriptionHandle {
        let id = self.next_id;
        self.next_id += 1;
        self.subscribers.entry(channel).or_default().push(id);
        log::debug!("subscribed #{id} to {channel:?}");
        SubscriptionHandle { channel, id }
    }

    /// Remove a subscription. Returns `false` if it was already gone.
    pub fn unsubscribe(&mut self, handle: SubscriptionHandle) -> bool {
        let Some(ids) = self.subscribers.get_mut(&handle.channel) else {
            return false;
        };
        let before = ids.len();
        ids.retain(|&id| id != handle.id);
        let removed = ids.len() != before;
        if removed {
            log::debug!("unsubscribed #{} from {:?}", handle.id, handle.channel);
        }
        removed
    }

    /// Whether `handle` is still subscribed.
    #[must_use]
    pub fn is_subscribed(&self, handle: SubscriptionHandle) -> bool {
        self.subscribers
            .get(&handle.channel)
            .is_some_and(|ids| ids.contains(&handle.id))
    }

    /// Number of live subscriptions on `channel`.
    #[must_use]
    pub fn subscriber_count(&self, channel: EventChannel) -> usize {
        self.subscribers.get(&channel).map_or(0, Vec::len)
    }

    /// Live handles on `channel`, in subscription order.
    #[must_use]
    pub fn fire(&self, channel: EventChannel) -> Vec<SubscriptionHandle> {
        self.subscribers
            .get(&channel)
            .map(|ids| {
                ids.iter()
                    .map(|&id| SubscriptionHandle { channel, id })
                    .collect()
            })
            .unwrap_or_default()
    }
}
