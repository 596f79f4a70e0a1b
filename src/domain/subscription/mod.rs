//! Subscription Topic Tracking
//!
//! Holds the desired set of feed topics for the lifetime of the process.
//! The set is ordered, de-duplicated, and never cleared on disconnect: the
//! supervisor replays it in full after every successful (re)connection, so
//! a topic added before or during any session survives every reconnect
//! cycle.
//!
//! Reads (by the supervisor, on connect) and writes (by external callers
//! adding topics) may happen concurrently; a lock around the sequence
//! suffices.

use parking_lot::RwLock;

use crate::infrastructure::feed::messages::SubscribeRequest;

/// A feed topic identifier, e.g. `NSE:SBIN-EQ`.
pub type Topic = String;

/// Ordered, unique set of subscribed topics shared between the supervisor
/// and external callers.
#[derive(Debug, Default)]
pub struct TopicSet {
    topics: RwLock<Vec<Topic>>,
}

impl TopicSet {
    /// Create an empty topic set.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a topic set seeded with initial topics.
    #[must_use]
    pub fn with_topics(topics: impl IntoIterator<Item = Topic>) -> Self {
        let set = Self::new();
        set.add_topics(topics);
        set
    }

    /// Add topics, preserving insertion order and skipping duplicates.
    ///
    /// Returns the number of topics actually added.
    pub fn add_topics(&self, topics: impl IntoIterator<Item = Topic>) -> usize {
        let mut guard = self.topics.write();
        let mut added = 0;
        for topic in topics {
            if !guard.contains(&topic) {
                guard.push(topic);
                added += 1;
            }
        }
        added
    }

    /// Current topics in insertion order.
    #[must_use]
    pub fn topics(&self) -> Vec<Topic> {
        self.topics.read().clone()
    }

    /// Number of tracked topics.
    #[must_use]
    pub fn len(&self) -> usize {
        self.topics.read().len()
    }

    /// Check whether no topics are tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.topics.read().is_empty()
    }

    /// Build the subscribe request covering the full current set.
    ///
    /// Returns `None` when the set is empty (nothing to replay).
    #[must_use]
    pub fn subscribe_request(&self) -> Option<SubscribeRequest> {
        let guard = self.topics.read();
        if guard.is_empty() {
            None
        } else {
            Some(SubscribeRequest::symbol_update(guard.clone()))
        }
    }
}
