//! In-process group hub
//!
//! Components that share a group name see each other's selection and
//! filter changes. Both kinds of change travel on one ordered stream per
//! group, so subscribers observe them in exactly the order they were
//! published.

use std::cell::RefCell;
use std::collections::{BTreeSet, HashMap};
use std::rc::Rc;

use tokio::sync::broadcast;
use tokio::sync::broadcast::error::{RecvError, TryRecvError};

use crate::config::RenderConfig;

/// A change published to a group
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// Point selection; `None` clears it
    Selection { value: Option<String> },
    /// Filter key-set; `None` means no filter is set
    Filter { keys: Option<BTreeSet<String>> },
}

/// Registry of group streams, shared by every component on the page
#[derive(Debug, Clone)]
pub struct GroupHub {
    groups: Rc<RefCell<HashMap<String, broadcast::Sender<SyncEvent>>>>,
    capacity: usize,
}

impl GroupHub {
    /// Create a hub whose group streams buffer up to `capacity` events
    pub fn new(capacity: usize) -> Self {
        Self {
            groups: Rc::new(RefCell::new(HashMap::new())),
            capacity: capacity.max(1),
        }
    }

    /// Hub sized by `RenderConfig::channel_capacity`
    pub fn from_config(config: &RenderConfig) -> Self {
        Self::new(config.channel_capacity)
    }

    fn sender(&self, group: &str) -> broadcast::Sender<SyncEvent> {
        self.groups
            .borrow_mut()
            .entry(group.to_string())
            .or_insert_with(|| broadcast::channel(self.capacity).0)
            .clone()
    }

    /// Start receiving a group's events
    pub fn subscribe(&self, group: &str) -> GroupSubscription {
        GroupSubscription {
            group: group.to_string(),
            receiver: self.sender(group).subscribe(),
        }
    }

    /// Publish to a group; returns how many subscribers received it
    pub fn publish(&self, group: &str, event: SyncEvent) -> usize {
        match self.sender(group).send(event) {
            Ok(receivers) => receivers,
            Err(_) => {
                tracing::debug!("No subscribers in group {:?}", group);
                0
            }
        }
    }

    pub fn selection_handle(&self) -> SelectionHandle {
        SelectionHandle {
            hub: self.clone(),
            group: None,
        }
    }

    pub fn filter_handle(&self) -> FilterHandle {
        FilterHandle {
            hub: self.clone(),
            group: None,
        }
    }
}

/// Publisher side of point selection for one group
#[derive(Debug, Clone)]
pub struct SelectionHandle {
    hub: GroupHub,
    group: Option<String>,
}

impl SelectionHandle {
    pub fn set_group(&mut self, group: &str) {
        self.group = Some(group.to_string());
    }

    /// Select a group key
    pub fn set(&self, value: &str) -> usize {
        self.send(Some(value.to_string()))
    }

    /// Clear the selection
    pub fn clear(&self) -> usize {
        self.send(None)
    }

    fn send(&self, value: Option<String>) -> usize {
        match &self.group {
            Some(group) => self.hub.publish(group, SyncEvent::Selection { value }),
            None => {
                tracing::debug!("Selection handle has no group, dropping change");
                0
            }
        }
    }
}

/// Publisher side of filtering for one group
#[derive(Debug, Clone)]
pub struct FilterHandle {
    hub: GroupHub,
    group: Option<String>,
}

impl FilterHandle {
    pub fn set_group(&mut self, group: &str) {
        self.group = Some(group.to_string());
    }

    /// Replace the filter's key-set
    pub fn set<I, S>(&self, keys: I) -> usize
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.send(Some(keys.into_iter().map(Into::into).collect()))
    }

    /// Remove the filter
    pub fn clear(&self) -> usize {
        self.send(None)
    }

    fn send(&self, keys: Option<BTreeSet<String>>) -> usize {
        match &self.group {
            Some(group) => self.hub.publish(group, SyncEvent::Filter { keys }),
            None => {
                tracing::debug!("Filter handle has no group, dropping change");
                0
            }
        }
    }
}

/// Receiving end of a group stream
#[derive(Debug)]
pub struct GroupSubscription {
    group: String,
    receiver: broadcast::Receiver<SyncEvent>,
}

impl GroupSubscription {
    pub fn group(&self) -> &str {
        &self.group
    }

    /// Next buffered event, if any. Skips over lag with a warning.
    pub fn try_next(&mut self) -> Option<SyncEvent> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => return Some(event),
                Err(TryRecvError::Lagged(missed)) => {
                    tracing::warn!("Group {:?} lagged, {} events dropped", self.group, missed);
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => return None,
            }
        }
    }

    /// Wait for the next event; `None` once the group stream closes
    pub async fn next(&mut self) -> Option<SyncEvent> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => return Some(event),
                Err(RecvError::Lagged(missed)) => {
                    tracing::warn!("Group {:?} lagged, {} events dropped", self.group, missed);
                }
                Err(RecvError::Closed) => return None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_arrive_in_publish_order() {
        let hub = GroupHub::new(16);
        let mut subscription = hub.subscribe("speeches");

        let mut selection = hub.selection_handle();
        selection.set_group("speeches");
        let mut filter = hub.filter_handle();
        filter.set_group("speeches");

        selection.set("A");
        filter.set(["B", "C"]);
        selection.clear();

        assert_eq!(
            subscription.try_next(),
            Some(SyncEvent::Selection {
                value: Some("A".to_string())
            })
        );
        assert_eq!(
            subscription.try_next(),
            Some(SyncEvent::Filter {
                keys: Some(["B".to_string(), "C".to_string()].into_iter().collect())
            })
        );
        assert_eq!(
            subscription.try_next(),
            Some(SyncEvent::Selection { value: None })
        );
        assert_eq!(subscription.try_next(), None);
    }

    #[test]
    fn test_groups_are_isolated() {
        let hub = GroupHub::new(16);
        let mut other = hub.subscribe("other");

        let mut selection = hub.selection_handle();
        selection.set_group("speeches");
        selection.set("A");

        assert_eq!(other.try_next(), None);
    }

    #[test]
    fn test_handle_without_group_drops() {
        let hub = GroupHub::new(16);
        let _subscription = hub.subscribe("speeches");

        assert_eq!(hub.selection_handle().set("A"), 0);
        assert_eq!(hub.filter_handle().clear(), 0);
    }

    #[test]
    fn test_lagged_subscriber_keeps_latest() {
        let hub = GroupHub::new(2);
        let mut subscription = hub.subscribe("g");

        let mut selection = hub.selection_handle();
        selection.set_group("g");
        for key in ["A", "B", "C", "D"] {
            selection.set(key);
        }

        let mut seen = Vec::new();
        while let Some(SyncEvent::Selection { value }) = subscription.try_next() {
            seen.extend(value);
        }
        assert_eq!(seen, vec!["C".to_string(), "D".to_string()]);
    }

    #[tokio::test]
    async fn test_async_next() {
        let hub = GroupHub::new(4);
        let mut subscription = hub.subscribe("g");
        hub.publish("g", SyncEvent::Filter { keys: None });

        assert_eq!(
            subscription.next().await,
            Some(SyncEvent::Filter { keys: None })
        );
    }
}
