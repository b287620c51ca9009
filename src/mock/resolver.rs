//! Mock name resolver backed by a label map.

use std::collections::HashMap;

use crate::identity::Identity;
use crate::provider::{NameResolver, ResolveError};

/// Mock resolver mapping labels to identities.
#[derive(Debug, Default)]
pub struct MockResolver {
    labels: HashMap<String, Identity>,
}

impl MockResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a label.
    pub fn with_label(mut self, label: impl Into<String>, identity: Identity) -> Self {
        self.labels.insert(label.into(), identity);
        self
    }
}

impl NameResolver for MockResolver {
    fn resolve(&self, label: &str) -> Result<Identity, ResolveError> {
        self.labels
            .get(label)
            .copied()
            .ok_or_else(|| ResolveError::NotFound(label.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve() {
        let identity = Identity::from_bytes([4u8; 32]);
        let resolver = MockResolver::new().with_label("alice.eth", identity);

        assert_eq!(resolver.resolve("alice.eth").unwrap(), identity);
        assert!(matches!(
            resolver.resolve("bob.eth"),
            Err(ResolveError::NotFound(label)) if label == "bob.eth"
        ));
    }
}
