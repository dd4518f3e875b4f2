//! Reference counting for sessions shared across panes and tabs.
//!
//! Teardown must only run when the last view of a session goes away;
//! every mutation funnels through this one registry.

use std::collections::HashMap;

use super::SessionId;

/// Tracks how many live views reference each session id.
#[derive(Debug, Default)]
pub struct SessionRegistry {
    refs: HashMap<SessionId, usize>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Note a new view of `id`.
    pub fn register(&mut self, id: &SessionId) {
        *self.refs.entry(id.clone()).or_insert(0) += 1;
    }

    /// Release one view of `id`. Returns `true` when this was the last
    /// reference, i.e. the caller should tear the session down.
    pub fn unregister(&mut self, id: &SessionId) -> bool {
        match self.refs.get_mut(id) {
            Some(count) if *count > 1 => {
                *count -= 1;
                false
            }
            Some(_) => {
                self.refs.remove(id);
                true
            }
            None => false,
        }
    }

    #[cfg(test)]
    pub fn is_referenced(&self, id: &SessionId) -> bool {
        self.refs.contains_key(id)
    }

    #[cfg(test)]
    pub fn reference_count(&self, id: &SessionId) -> usize {
        self.refs.get(id).copied().unwrap_or(0)
    }
}
