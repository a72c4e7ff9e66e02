//! Selection sync state machine
//!
//! One visibility cursor driven by two triggers. A selection change and a
//! filter change run the same protocol: hide whatever was active, show the
//! new key-set, remember it. Whichever event is delivered last wins.

use std::collections::BTreeSet;

use crate::registry::{Display, TokenId, TokenRegistry};

use super::hub::{GroupHub, GroupSubscription, SyncEvent};

/// Which group keys are currently shown
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum SyncState {
    /// Nothing active; every managed token is hidden
    #[default]
    Idle,
    GroupActive(BTreeSet<String>),
}

impl SyncState {
    fn from_keys(keys: BTreeSet<String>) -> Self {
        if keys.is_empty() {
            SyncState::Idle
        } else {
            SyncState::GroupActive(keys)
        }
    }

    fn keys(&self) -> Option<&BTreeSet<String>> {
        match self {
            SyncState::Idle => None,
            SyncState::GroupActive(keys) => Some(keys),
        }
    }
}

/// Effect of one event on the managed tokens
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    pub hidden: usize,
    pub shown: usize,
    pub state: SyncState,
}

/// Group-driven visibility for one widget
#[derive(Debug, Default)]
pub struct SelectionSyncBus {
    state: SyncState,
    subscription: Option<GroupSubscription>,
}

impl SelectionSyncBus {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> &SyncState {
        &self.state
    }

    /// Group currently joined, if any
    pub fn group(&self) -> Option<&str> {
        self.subscription.as_ref().map(|s| s.group())
    }

    /// Join `group` on the hub. Rejoining the same group keeps the
    /// existing subscription and its buffered events.
    pub fn join(&mut self, hub: &GroupHub, group: &str) {
        if self.group() == Some(group) {
            return;
        }
        tracing::debug!("Joining sync group {:?}", group);
        self.subscription = Some(hub.subscribe(group));
    }

    pub fn leave(&mut self) {
        if let Some(subscription) = self.subscription.take() {
            tracing::debug!("Leaving sync group {:?}", subscription.group());
        }
    }

    /// Bring every managed token in line with the current state: active
    /// keys shown, everything else hidden
    pub fn attach(&self, registry: &mut TokenRegistry) {
        let active = self.state.keys();
        for id in registry.managed_ids() {
            if let Ok(element) = registry.resolve_mut(id) {
                let shown = match (active, element.group()) {
                    (Some(keys), Some(group)) => keys.contains(group),
                    _ => false,
                };
                element.style.display = if shown { Display::Block } else { Display::None };
            }
        }
    }

    /// Apply one event
    pub fn handle(&mut self, event: SyncEvent, registry: &mut TokenRegistry) -> Transition {
        match event {
            SyncEvent::Selection { value } => self.on_selection(value, registry),
            SyncEvent::Filter { keys } => self.on_filter(keys, registry),
        }
    }

    /// Selection change: show exactly the tokens of `value`
    pub fn on_selection(
        &mut self,
        value: Option<String>,
        registry: &mut TokenRegistry,
    ) -> Transition {
        let keys = value.into_iter().filter(|v| !v.is_empty()).collect();
        self.transition(keys, registry)
    }

    /// Filter change: show exactly the tokens whose group is in `keys`.
    /// An empty or absent key-set matches nothing.
    pub fn on_filter(
        &mut self,
        keys: Option<BTreeSet<String>>,
        registry: &mut TokenRegistry,
    ) -> Transition {
        self.transition(keys.unwrap_or_default(), registry)
    }

    /// Apply every event buffered on the joined group, in delivery order
    pub fn drain(&mut self, registry: &mut TokenRegistry) -> Vec<Transition> {
        let mut transitions = Vec::new();
        while let Some(event) = self.subscription.as_mut().and_then(|s| s.try_next()) {
            transitions.push(self.handle(event, registry));
        }
        transitions
    }

    /// Wait for the next event on the joined group and apply it
    pub async fn next(&mut self, registry: &mut TokenRegistry) -> Option<Transition> {
        let event = self.subscription.as_mut()?.next().await?;
        Some(self.handle(event, registry))
    }

    fn transition(&mut self, next: BTreeSet<String>, registry: &mut TokenRegistry) -> Transition {
        let previous = self
            .state
            .keys()
            .map(|keys| registry.ids_in_groups(keys))
            .unwrap_or_default();
        let hidden = set_display(registry, &previous, Display::None);

        let current = registry.ids_in_groups(&next);
        let shown = set_display(registry, &current, Display::Block);
        if shown == 0 && !next.is_empty() {
            tracing::debug!("No tokens in groups {:?}", next);
        }

        self.state = SyncState::from_keys(next);
        Transition {
            hidden,
            shown,
            state: self.state.clone(),
        }
    }
}

fn set_display(registry: &mut TokenRegistry, ids: &[TokenId], display: Display) -> usize {
    let mut count = 0;
    for id in ids {
        if let Ok(element) = registry.resolve_mut(*id) {
            element.style.display = display;
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::Token;

    fn grouped_registry() -> TokenRegistry {
        let mut registry = TokenRegistry::new();
        registry.register(Token::new(0, "a0").in_group("A")).unwrap();
        registry.register(Token::new(1, "a1").in_group("A")).unwrap();
        registry.register(Token::new(2, "b0").in_group("B")).unwrap();
        registry.register(Token::new(3, "free")).unwrap();
        registry
    }

    fn visible(registry: &TokenRegistry) -> Vec<TokenId> {
        registry
            .iter()
            .filter(|e| e.group().is_some() && e.is_visible())
            .map(|e| e.id())
            .collect()
    }

    fn keys(values: &[&str]) -> BTreeSet<String> {
        values.iter().map(|v| v.to_string()).collect()
    }

    #[test]
    fn test_attach_hides_managed_tokens() {
        let mut registry = grouped_registry();
        let bus = SelectionSyncBus::new();
        bus.attach(&mut registry);

        assert!(visible(&registry).is_empty());
        assert_eq!(registry.resolve(3).unwrap().style.display, Display::Inherit);
    }

    #[test]
    fn test_selection_last_writer_wins() {
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.attach(&mut registry);

        bus.on_selection(Some("A".to_string()), &mut registry);
        assert_eq!(visible(&registry), vec![0, 1]);

        let transition = bus.on_selection(Some("B".to_string()), &mut registry);
        assert_eq!(transition.hidden, 2);
        assert_eq!(transition.shown, 1);
        assert_eq!(visible(&registry), vec![2]);
        assert_eq!(registry.resolve(0).unwrap().style.display, Display::None);
        assert_eq!(registry.resolve(2).unwrap().style.display, Display::Block);
        assert_eq!(bus.state(), &SyncState::GroupActive(keys(&["B"])));
    }

    #[test]
    fn test_empty_filter_is_idle() {
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.attach(&mut registry);
        bus.on_selection(Some("A".to_string()), &mut registry);

        let transition = bus.on_filter(Some(BTreeSet::new()), &mut registry);

        assert_eq!(transition.state, SyncState::Idle);
        assert!(visible(&registry).is_empty());
    }

    #[test]
    fn test_filter_then_selection_share_cursor() {
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.attach(&mut registry);

        bus.on_filter(Some(keys(&["A", "B"])), &mut registry);
        assert_eq!(visible(&registry), vec![0, 1, 2]);

        bus.on_selection(Some("B".to_string()), &mut registry);
        assert_eq!(visible(&registry), vec![2]);

        bus.on_selection(None, &mut registry);
        assert_eq!(bus.state(), &SyncState::Idle);
        assert!(visible(&registry).is_empty());
    }

    #[test]
    fn test_unknown_group_shows_nothing() {
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.attach(&mut registry);

        let transition = bus.on_selection(Some("Z".to_string()), &mut registry);
        assert_eq!(transition.shown, 0);
        assert!(visible(&registry).is_empty());
    }

    #[test]
    fn test_hidden_tokens_stay_addressable() {
        let mut registry = grouped_registry();
        let bus = SelectionSyncBus::new();
        bus.attach(&mut registry);

        assert!(registry.resolve(0).is_ok());
        assert_eq!(registry.len(), 4);
    }

    #[test]
    fn test_drain_applies_hub_events_in_order() {
        let hub = GroupHub::new(8);
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.join(&hub, "speeches");
        bus.attach(&mut registry);

        let mut selection = hub.selection_handle();
        selection.set_group("speeches");
        let mut filter = hub.filter_handle();
        filter.set_group("speeches");

        filter.set(["A"]);
        selection.set("B");

        let transitions = bus.drain(&mut registry);
        assert_eq!(transitions.len(), 2);
        assert_eq!(visible(&registry), vec![2]);
    }

    #[test]
    fn test_leave_stops_delivery() {
        let hub = GroupHub::new(8);
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.join(&hub, "g");
        bus.leave();

        assert_eq!(hub.publish("g", SyncEvent::Filter { keys: None }), 0);
        assert!(bus.drain(&mut registry).is_empty());
        assert_eq!(bus.group(), None);
    }

    #[tokio::test]
    async fn test_next_awaits_group_event() {
        let hub = GroupHub::new(8);
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.join(&hub, "g");
        bus.attach(&mut registry);

        hub.publish(
            "g",
            SyncEvent::Selection {
                value: Some("B".to_string()),
            },
        );

        let transition = bus.next(&mut registry).await.unwrap();
        assert_eq!(transition.state, SyncState::GroupActive(keys(&["B"])));
        assert_eq!(visible(&registry), vec![2]);
    }

    #[test]
    fn test_rejoin_same_group_keeps_buffer() {
        let hub = GroupHub::new(8);
        let mut registry = grouped_registry();
        let mut bus = SelectionSyncBus::new();
        bus.join(&hub, "g");
        hub.publish(
            "g",
            SyncEvent::Selection {
                value: Some("A".to_string()),
            },
        );
        bus.join(&hub, "g");

        assert_eq!(bus.drain(&mut registry).len(), 1);
        assert_eq!(bus.group(), Some("g"));
    }
}
