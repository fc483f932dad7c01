use std::collections::{BTreeMap, BTreeSet};

use tmbft_types::{Address, Height, Message, Round};

struct Entry {
    message: Message,
    arrival_order: u64,
}

/// Holds messages for a future `(height, round)`, per §4.F. Drained, in
/// arrival order, once the driver reaches the key they were filed under.
///
/// Also tracks distinct senders per future round of the *current* height,
/// for the f+1 catch-up rule: `clear_up_to` must be called whenever the
/// driver advances past a round so stale counters don't linger.
#[derive(Default)]
pub struct Backlog {
    entries: BTreeMap<(Height, Round), Vec<Entry>>,
    future_round_senders: BTreeMap<Round, BTreeSet<Address>>,
    next_arrival_order: u64,
}

impl Backlog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Files `message` under its `(height, round)` for a future round of
    /// the *current* height, and counts its sender towards that round's
    /// f+1 catch-up threshold.
    pub fn offer(&mut self, message: Message) {
        let key = (message.height(), message.round());
        let sender = message.sender();
        self.file(message);
        self.future_round_senders.entry(key.1).or_default().insert(sender);
    }

    /// Files `message` under its `(height, round)` for a future height.
    /// Does not count towards any current-height round's f+1 catch-up
    /// threshold — that counter is scoped to the current height only.
    pub fn offer_future_height(&mut self, message: Message) {
        self.file(message);
    }

    fn file(&mut self, message: Message) {
        let key = (message.height(), message.round());
        let order = self.next_arrival_order;
        self.next_arrival_order += 1;

        self.entries.entry(key).or_default().push(Entry {
            message,
            arrival_order: order,
        });
    }

    /// Distinct senders recorded for `round`, regardless of height — used
    /// by the driver to test the f+1 catch-up threshold for the current
    /// height's future rounds.
    pub fn distinct_senders(&self, round: Round) -> usize {
        self.future_round_senders.get(&round).map_or(0, |s| s.len())
    }

    /// Removes and returns every message filed under `(height, round)`, in
    /// arrival order.
    pub fn drain(&mut self, height: Height, round: Round) -> Vec<Message> {
        let mut entries = self.entries.remove(&(height, round)).unwrap_or_default();
        entries.sort_by_key(|e| e.arrival_order);
        entries.into_iter().map(|e| e.message).collect()
    }

    /// Drops the future-round sender counters for rounds at or below
    /// `round`, since the driver has now caught up to them.
    pub fn clear_up_to(&mut self, round: Round) {
        self.future_round_senders.retain(|r, _| *r > round);
    }

    /// Drops everything filed for `height`, called on commit.
    pub fn clear_height(&mut self, height: Height) {
        self.entries.retain(|(h, _), _| *h != height);
        self.future_round_senders.clear();
    }
}
