// crates/sqlserial-core/src/core/identifiers.rs
// ============================================================================
// Module: SQL Serial Identifiers
// Description: Operation identifiers issued by the serialized engine.
// Purpose: Provide a strongly typed, never-reused correlation key per operation.
// Dependencies: serde
// ============================================================================

//! ## Overview
//! Every submitted operation receives an [`OperationId`] from a strictly
//! increasing counter. Identifiers are 1-based and serialize as plain numbers.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fmt;
use std::num::NonZeroU64;

use serde::Deserialize;
use serde::Serialize;

// ============================================================================
// SECTION: Identifier Types
// ============================================================================

/// Identifier correlating a submitted operation with its result.
///
/// # Invariants
/// - Always >= 1 (non-zero, 1-based).
/// - Issued by one engine in strictly increasing order; never reused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OperationId(NonZeroU64);

impl OperationId {
    /// The first identifier issued by a fresh engine.
    pub const FIRST: Self = Self(NonZeroU64::MIN);

    /// Creates a new operation identifier from a non-zero value.
    #[must_use]
    pub const fn new(id: NonZeroU64) -> Self {
        Self(id)
    }

    /// Creates an operation identifier from a raw value (returns `None` if zero).
    #[must_use]
    pub fn from_raw(raw: u64) -> Option<Self> {
        NonZeroU64::new(raw).map(Self)
    }

    /// Returns the raw identifier value (always >= 1).
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0.get()
    }

    /// Returns the identifier that follows this one, or `None` on overflow.
    #[must_use]
    pub const fn next(self) -> Option<Self> {
        match self.0.checked_add(1) {
            Some(value) => Some(Self(value)),
            None => None,
        }
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.get().fmt(f)
    }
}

// ============================================================================
// SECTION: Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::OperationId;

    #[test]
    fn zero_is_rejected() {
        assert!(OperationId::from_raw(0).is_none());
    }

    #[test]
    fn next_is_strictly_increasing() {
        let first = OperationId::FIRST;
        let second = first.next();
        assert_eq!(first.get(), 1);
        assert_eq!(second.map(OperationId::get), Some(2));
    }

    #[test]
    fn next_saturates_to_none_at_max() {
        let last = OperationId::from_raw(u64::MAX);
        assert_eq!(last.and_then(OperationId::next), None);
    }

    #[test]
    fn serializes_as_plain_number() {
        let id = OperationId::from_raw(42);
        let json = serde_json::to_string(&id).ok();
        assert_eq!(json.as_deref(), Some("42"));
    }
}
