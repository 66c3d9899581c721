//! Keyed guard allowing at most one in-flight operation per key.

use std::collections::HashSet;
use std::fmt;
use std::sync::{Mutex, PoisonError};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Create,
    Update,
    Delete,
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Create => "create",
            Self::Update => "update",
            Self::Delete => "delete",
        })
    }
}

/// `(operation, target)`. Creates are keyed by service name since no id
/// exists yet; updates and deletes by service id.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OperationKey {
    pub operation: Operation,
    pub target: String,
}

impl OperationKey {
    #[must_use]
    pub fn new(operation: Operation, target: impl Into<String>) -> Self {
        Self {
            operation,
            target: target.into(),
        }
    }
}

#[derive(Debug, Default)]
pub struct SingleFlight {
    active: Mutex<HashSet<OperationKey>>,
}

impl SingleFlight {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks `key` as in flight. Returns `false` if it already was.
    pub fn try_acquire(&self, key: &OperationKey) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(key.clone())
    }

    pub fn release(&self, key: &OperationKey) {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(key);
    }

    /// Scoped acquisition. The key is released when the guard drops.
    #[must_use]
    pub fn acquire(&self, key: OperationKey) -> Option<FlightGuard<'_>> {
        self.try_acquire(&key).then_some(FlightGuard { owner: self, key })
    }

    #[must_use]
    pub fn is_active(&self, key: &OperationKey) -> bool {
        self.active
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(key)
    }
}

pub struct FlightGuard<'a> {
    owner: &'a SingleFlight,
    key: OperationKey,
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.owner.release(&self.key);
    }
}
