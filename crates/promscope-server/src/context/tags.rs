use std::sync::{Arc, Mutex, PoisonError};

/// Mutable tag collection carried in the request extensions.
///
/// Cloning shares the same collection, so a handler writing through its
/// clone is seen by the middleware that inserted the original.
#[derive(Debug, Clone, Default)]
pub struct RequestTags {
    inner: Arc<Mutex<Vec<(String, String)>>>,
}

impl RequestTags {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set `key` (last write wins).
    pub fn insert(&self, key: impl Into<String>, value: impl Into<String>) {
        let key = key.into();
        let value = value.into();
        let mut tags = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        match tags.iter_mut().find(|(k, _)| *k == key) {
            Some(slot) => slot.1 = value,
            None => tags.push((key, value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<String> {
        let tags = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        tags.iter().find(|(k, _)| k == key).map(|(_, v)| v.clone())
    }

    pub fn pairs(&self) -> Vec<(String, String)> {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}
