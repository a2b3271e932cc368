//! Latest-request-wins bookkeeping for results that arrive out of order.

/// Proof that a request was issued. Only the most recent ticket may apply a result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

impl Ticket {
    pub fn id(&self) -> u64 {
        self.0
    }
}

#[derive(Debug, Clone)]
pub struct Sequenced<T> {
    current: u64,
    value: T,
}

impl<T> Sequenced<T> {
    pub fn new(value: T) -> Self {
        Self { current: 0, value }
    }

    /// Continue numbering after `last`, so tickets of a discarded predecessor
    /// can never match.
    pub fn resume_after(last: u64, value: T) -> Self {
        Self {
            current: last,
            value,
        }
    }

    /// Issue a new ticket, superseding every earlier one.
    pub fn issue(&mut self) -> Ticket {
        self.current += 1;
        Ticket(self.current)
    }

    /// Issue a ticket and show `pending` until its result lands.
    pub fn issue_with(&mut self, pending: T) -> Ticket {
        self.value = pending;
        self.issue()
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.current
    }

    /// Store `value` if `ticket` is still current. Returns whether it was stored.
    pub fn apply(&mut self, ticket: Ticket, value: T) -> bool {
        if !self.is_current(ticket) {
            return false;
        }
        self.value = value;
        true
    }

    pub fn value(&self) -> &T {
        &self.value
    }

    pub fn current_id(&self) -> u64 {
        self.current
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_late_result_is_discarded() {
        let mut slot = Sequenced::new("idle");
        let first = slot.issue_with("checking");
        let second = slot.issue_with("checking");

        assert!(slot.apply(second, "second"));
        assert!(!slot.apply(first, "first"));
        assert_eq!(*slot.value(), "second");
    }

    #[test]
    fn test_ids_increase() {
        let mut slot = Sequenced::new(());
        let a = slot.issue();
        let b = slot.issue();
        assert!(b.id() > a.id());
        assert_eq!(slot.current_id(), b.id());
        assert!(!slot.is_current(a));
    }

    #[test]
    fn test_resumed_slot_rejects_old_tickets() {
        let mut old = Sequenced::new("idle");
        let stale = old.issue();

        let mut fresh = Sequenced::resume_after(old.current_id(), "idle");
        let ticket = fresh.issue();
        assert!(ticket.id() > stale.id());
        assert!(!fresh.apply(stale, "stale"));
        assert!(fresh.apply(ticket, "fresh"));
    }
}
