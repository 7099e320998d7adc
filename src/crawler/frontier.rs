//! Crawl frontier with two FIFO lanes

use std::collections::{HashSet, VecDeque};

/// A URL waiting to be fetched
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct QueuedUrl {
    pub url: String,
    pub depth: u32,
}

/// Queue of pending URLs where priority links always leave first
///
/// A URL is accepted at most once over the lifetime of the frontier, so a page
/// that has been dequeued is never queued again.
#[derive(Debug, Default)]
pub(crate) struct Frontier {
    priority: VecDeque<QueuedUrl>,
    regular: VecDeque<QueuedUrl>,
    seen: HashSet<String>,
}

impl Frontier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a URL unless it has been seen before; returns whether it was added
    pub fn push(&mut self, url: String, depth: u32, is_priority: bool) -> bool {
        if !self.seen.insert(url.clone()) {
            return false;
        }
        let entry = QueuedUrl { url, depth };
        if is_priority {
            self.priority.push_back(entry);
        } else {
            self.regular.push_back(entry);
        }
        true
    }

    /// Mark a URL as seen without queueing it
    pub fn mark_seen(&mut self, url: impl Into<String>) {
        self.seen.insert(url.into());
    }

    pub fn pop(&mut self) -> Option<QueuedUrl> {
        self.priority
            .pop_front()
            .or_else(|| self.regular.pop_front())
    }

    pub fn len(&self) -> usize {
        self.priority.len() + self.regular.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
