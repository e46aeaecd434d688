//! Startup-time registry of inbound references between tables.
//!
//! The original design enumerated "every relation pointing at me" through
//! runtime schema reflection. Here the application registers each
//! referencing column explicitly when it builds its store, once, and the
//! rewriter walks the registered list. Registration order is preserved per
//! target so bulk rewrites run in a deterministic order.

use std::collections::BTreeMap;

/// One column in the schema that references a versioned table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InboundRef {
    /// Table holding the referencing column.
    pub table: &'static str,
    /// The referencing column itself.
    pub column: &'static str,
}

/// Explicit table of inbound references, keyed by target table.
#[derive(Debug, Default, Clone)]
pub struct RelationRegistry {
    by_target: BTreeMap<&'static str, Vec<InboundRef>>,
}

impl RelationRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `reference` as pointing at rows of `target_table`.
    ///
    /// Duplicate registrations are ignored.
    pub fn register(&mut self, target_table: &'static str, reference: InboundRef) {
        let refs = self.by_target.entry(target_table).or_default();
        if !refs.contains(&reference) {
            refs.push(reference);
        }
    }

    /// Every registered column referencing `target_table`.
    #[must_use]
    pub fn related_fields(&self, target_table: &str) -> &[InboundRef] {
        self.by_target
            .get(target_table)
            .map_or(&[], Vec::as_slice)
    }
}
