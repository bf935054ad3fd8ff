//! Consecutive-run grouping.
//!
//! A single forward pass over a descending-timestamp event list merges
//! adjacent same-shape events into one display record. Pure function of
//! its input: recomputed whenever the input changes, never persisted.

use serde::Serialize;

use super::{Action, EntityRef, LogEvent, Subject};

/// One run of adjacent same-shape events, collapsed.
///
/// Keeps the representative's descriptive fields, sums quantities across
/// members, and retains the full ordered member list for on-demand
/// expansion.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GroupedEvent {
    pub actor: EntityRef,
    pub action: Action,
    pub subject: Subject,
    pub counterpart: Option<EntityRef>,
    /// Representative (newest member) timestamp.
    pub timestamp: u64,
    pub count: usize,
    /// Members in input order, newest first.
    pub events: Vec<LogEvent>,
}

impl GroupedEvent {
    fn open(event: &LogEvent) -> Self {
        Self {
            actor: event.actor.clone(),
            action: event.action.clone(),
            subject: event.subject.clone(),
            counterpart: event.counterpart.clone(),
            timestamp: event.timestamp,
            count: 1,
            events: vec![event.clone()],
        }
    }

    /// An event joins the run iff actor id, action label, subject name,
    /// and counterpart id (or both absent) match the representative.
    fn accepts(&self, event: &LogEvent) -> bool {
        self.actor.id == event.actor.id
            && self.action.label() == event.action.label()
            && self.subject.name == event.subject.name
            && self.counterpart.as_ref().map(|c| c.id)
                == event.counterpart.as_ref().map(|c| c.id)
    }

    fn absorb(&mut self, event: &LogEvent) {
        self.subject.quantity += event.subject.quantity;
        self.count += 1;
        self.events.push(event.clone());
    }
}

/// Compress an ordered (descending timestamp) event list into grouped
/// records without losing information.
#[must_use]
pub fn group_consecutive(events: &[LogEvent]) -> Vec<GroupedEvent> {
    let mut grouped: Vec<GroupedEvent> = Vec::new();

    for event in events {
        match grouped.last_mut() {
            Some(run) if run.accepts(event) => run.absorb(event),
            _ => grouped.push(GroupedEvent::open(event)),
        }
    }

    grouped
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(id: &str, timestamp: u64, actor_id: u64, action: Action, item: &str, qty: i64) -> LogEvent {
        LogEvent {
            id: id.to_string(),
            timestamp,
            actor: EntityRef {
                id: actor_id,
                name: format!("user{actor_id}"),
            },
            action,
            subject: Subject {
                name: item.to_string(),
                quantity: qty,
            },
            counterpart: None,
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(group_consecutive(&[]).is_empty());
    }

    #[test]
    fn test_three_consecutive_same_shape_events_group() {
        let events = vec![
            event("a", 300, 1, Action::Deposited, "Body Armor", 1),
            event("b", 200, 1, Action::Deposited, "Body Armor", 1),
            event("c", 100, 1, Action::Deposited, "Body Armor", 1),
        ];

        let grouped = group_consecutive(&events);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].count, 3);
        assert_eq!(grouped[0].subject.quantity, 3);
        assert_eq!(grouped[0].timestamp, 300);
        assert_eq!(
            grouped[0].events.iter().map(|e| e.id.as_str()).collect::<Vec<_>>(),
            vec!["a", "b", "c"]
        );
    }

    #[test]
    fn test_different_actor_breaks_the_run() {
        let events = vec![
            event("a", 400, 1, Action::Deposited, "Body Armor", 1),
            event("b", 300, 1, Action::Deposited, "Body Armor", 1),
            event("c", 200, 2, Action::Deposited, "Body Armor", 1),
            event("d", 100, 1, Action::Deposited, "Body Armor", 1),
        ];

        let grouped = group_consecutive(&events);
        // Runs are maximal but only over adjacent events: the fourth
        // event does not rejoin the first run.
        assert_eq!(grouped.len(), 3);
        assert_eq!(grouped[0].count, 2);
        assert_eq!(grouped[1].actor.id, 2);
        assert_eq!(grouped[2].count, 1);
    }

    #[test]
    fn test_different_action_breaks_the_run() {
        let events = vec![
            event("a", 300, 1, Action::Deposited, "Morphine", 2),
            event("b", 200, 1, Action::Retrieved, "Morphine", 1),
        ];

        let grouped = group_consecutive(&events);
        assert_eq!(grouped.len(), 2);
    }

    #[test]
    fn test_different_item_breaks_the_run() {
        let events = vec![
            event("a", 300, 1, Action::Deposited, "Morphine", 2),
            event("b", 200, 1, Action::Deposited, "Body Armor", 1),
        ];

        assert_eq!(group_consecutive(&events).len(), 2);
    }

    #[test]
    fn test_counterpart_must_match_or_both_be_absent() {
        let to_bob = LogEvent {
            counterpart: Some(EntityRef { id: 9, name: "Bob".to_string() }),
            ..event("a", 300, 1, Action::Gave, "Morphine", 1)
        };
        let to_carol = LogEvent {
            counterpart: Some(EntityRef { id: 10, name: "Carol".to_string() }),
            ..event("b", 200, 1, Action::Gave, "Morphine", 1)
        };
        let to_bob_again = LogEvent {
            counterpart: Some(EntityRef { id: 9, name: "Bob".to_string() }),
            ..event("c", 100, 1, Action::Gave, "Morphine", 1)
        };

        let grouped = group_consecutive(&[to_bob.clone(), to_bob_again.clone()]);
        assert_eq!(grouped.len(), 1);
        assert_eq!(grouped[0].count, 2);

        let grouped = group_consecutive(&[to_bob, to_carol, to_bob_again]);
        assert_eq!(grouped.len(), 3);
    }

    #[test]
    fn test_quantities_sum_across_members() {
        let events = vec![
            event("a", 300, 1, Action::Deposited, "Body Armor", 5),
            event("b", 200, 1, Action::Deposited, "Body Armor", 3),
        ];

        let grouped = group_consecutive(&events);
        assert_eq!(grouped[0].subject.quantity, 8);
        // Members keep their own quantities.
        assert_eq!(grouped[0].events[0].subject.quantity, 5);
        assert_eq!(grouped[0].events[1].subject.quantity, 3);
    }

    #[test]
    fn test_grouping_is_lossless() {
        let events = vec![
            event("a", 500, 1, Action::Deposited, "Body Armor", 1),
            event("b", 400, 2, Action::Used, "Morphine", 1),
            event("c", 300, 2, Action::Used, "Morphine", 1),
            event("d", 200, 1, Action::Deposited, "Body Armor", 1),
        ];

        let grouped = group_consecutive(&events);
        let total_members: usize = grouped.iter().map(|g| g.count).sum();
        assert_eq!(total_members, events.len());

        let flattened: Vec<&LogEvent> = grouped.iter().flat_map(|g| &g.events).collect();
        assert_eq!(flattened.len(), events.len());
    }
}
