//! Append-only action log.

use crate::transaction::Action;

/// Ordered record of the commands issued through a service, newest last.
#[derive(Debug, Clone, Default)]
pub struct TransactionLog {
    actions: Vec<Action>,
}

impl TransactionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an action.
    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    /// Removes and returns the most recent action.
    pub fn pop(&mut self) -> Option<Action> {
        self.actions.pop()
    }

    /// The most recent action, if any.
    #[must_use]
    pub fn last(&self) -> Option<&Action> {
        self.actions.last()
    }

    /// Number of recorded actions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    /// Returns true if nothing is recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Iterates actions oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &Action> {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entity::{BookId, UserId};
    use crate::transaction::ActionKind;

    #[test]
    fn lifo_order() {
        let mut log = TransactionLog::new();
        assert!(log.pop().is_none());

        log.push(Action::AddBook {
            book_id: BookId::new("b"),
        });
        log.push(Action::AddUser {
            user_id: UserId::new("u"),
        });
        assert_eq!(log.len(), 2);
        assert_eq!(log.last().map(Action::kind), Some(ActionKind::AddUser));
        assert_eq!(log.iter().next().map(Action::kind), Some(ActionKind::AddBook));

        assert_eq!(log.pop().map(|a| a.kind()), Some(ActionKind::AddUser));
        assert_eq!(log.pop().map(|a| a.kind()), Some(ActionKind::AddBook));
        assert!(log.is_empty());
    }
}
