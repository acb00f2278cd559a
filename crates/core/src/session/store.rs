use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

/// Key under which the job pipeline hands the result image to the next screen.
pub const RESULT_IMAGE_URL_KEY: &str = "image_url";

/// Transient key/value store for the current visitor session.
///
/// Values are scoped to the screen that consumes them; the screen controller
/// clears a scope when its screen is exited.
#[derive(Debug, Clone, Default)]
pub struct SessionStore {
    scopes: Arc<Mutex<HashMap<String, HashMap<String, String>>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, scope: &str, key: &str, value: impl Into<String>) {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        scopes
            .entry(scope.to_string())
            .or_default()
            .insert(key.to_string(), value.into());
    }

    pub fn get(&self, scope: &str, key: &str) -> Option<String> {
        let scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        scopes.get(scope).and_then(|values| values.get(key)).cloned()
    }

    /// Drop every value in `scope`, returning how many were removed.
    pub fn clear_scope(&self, scope: &str) -> usize {
        let mut scopes = self.scopes.lock().unwrap_or_else(PoisonError::into_inner);
        scopes.remove(scope).map(|values| values.len()).unwrap_or(0)
    }

    pub fn clear(&self) {
        self.scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    pub fn is_empty(&self) -> bool {
        self.scopes
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .all(HashMap::is_empty)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_get_scoped() {
        let store = SessionStore::new();
        store.set("thank-you", RESULT_IMAGE_URL_KEY, "http://x/y.png");

        assert_eq!(
            store.get("thank-you", RESULT_IMAGE_URL_KEY).as_deref(),
            Some("http://x/y.png")
        );
        assert_eq!(store.get("capture", RESULT_IMAGE_URL_KEY), None);
    }

    #[test]
    fn test_clear_scope_only_touches_that_scope() {
        let store = SessionStore::new();
        store.set("thank-you", "image_url", "a");
        store.set("thank-you", "other", "b");
        store.set("validation", "image_url", "c");

        assert_eq!(store.clear_scope("thank-you"), 2);
        assert_eq!(store.clear_scope("thank-you"), 0);
        assert_eq!(store.get("validation", "image_url").as_deref(), Some("c"));
    }

    #[test]
    fn test_clones_share_state() {
        let store = SessionStore::new();
        let clone = store.clone();
        clone.set("s", "k", "v");
        assert!(!store.is_empty());

        store.clear();
        assert!(clone.is_empty());
    }
}
