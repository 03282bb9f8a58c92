//! Execution journal for round diagnostics.
//!
//! The journal remembers what the last rounds attempted within this
//! process's lifetime. It is advisory only: it is never consulted to
//! suppress a resubmission, and a fresh process starts empty.
//!
//! # Flow
//!
//! 1. `begin_round` (entry written with `completed = false`)
//! 2. Submit and classify
//! 3. `complete_round` (entry resolved)
//!
//! An entry left unresolved means the process died mid-round.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::VecDeque;
use std::fmt;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};
use uuid::Uuid;

/// Entries retained by default.
pub const DEFAULT_HISTORY: usize = 16;

// =============================================================================
// Journal Types
// =============================================================================

/// Opaque handle identifying one round's entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoundHandle(Uuid);

impl RoundHandle {
    fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl fmt::Display for RoundHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// What one round attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JournalEntry {
    /// Round this entry belongs to
    pub round: RoundHandle,
    /// When the round began
    pub written_at: DateTime<Utc>,
    /// Price the round tried to attest
    pub price: Decimal,
    /// No further action needed (not the same as ledger-confirmed)
    pub completed: bool,
    /// When the round was resolved, if it was
    pub resolved_at: Option<DateTime<Utc>>,
}

impl JournalEntry {
    /// Round began but never reached a classification.
    pub fn is_unresolved(&self) -> bool {
        self.resolved_at.is_none()
    }
}

// =============================================================================
// Execution Journal
// =============================================================================

/// Bounded in-process journal of recent rounds.
///
/// Constructed explicitly and passed to whoever runs rounds; there is no
/// global instance. Each round is addressed by its own handle, so
/// overlapping rounds cannot resolve each other's entries.
pub struct ExecutionJournal {
    entries: RwLock<VecDeque<JournalEntry>>,
    capacity: usize,
}

impl ExecutionJournal {
    /// Create a journal with the default history length.
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_HISTORY)
    }

    /// Create a journal retaining up to `capacity` entries (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            entries: RwLock::new(VecDeque::with_capacity(capacity)),
            capacity,
        }
    }

    /// Most recent entry, if any. Never blocks on a poisoned lock.
    pub fn read_last(&self) -> Option<JournalEntry> {
        self.read().back().cloned()
    }

    /// Record a new unresolved entry and return its handle.
    pub fn begin_round(&self, price: Decimal) -> RoundHandle {
        let handle = RoundHandle::new();
        let mut entries = self.write();

        if entries.len() == self.capacity {
            entries.pop_front();
        }
        entries.push_back(JournalEntry {
            round: handle,
            written_at: Utc::now(),
            price,
            completed: false,
            resolved_at: None,
        });

        handle
    }

    /// Resolve a round's entry.
    ///
    /// Idempotent: only the first call for a handle takes effect. Returns
    /// whether this call changed the entry. Handles that were evicted or
    /// never issued are ignored.
    pub fn complete_round(&self, handle: RoundHandle, completed: bool) -> bool {
        let mut entries = self.write();

        match entries.iter_mut().rev().find(|e| e.round == handle) {
            Some(entry) if entry.is_unresolved() => {
                entry.completed = completed;
                entry.resolved_at = Some(Utc::now());
                true
            },
            _ => false,
        }
    }

    /// Entry for a specific round, if still retained.
    pub fn get(&self, handle: RoundHandle) -> Option<JournalEntry> {
        self.read().iter().find(|e| e.round == handle).cloned()
    }

    /// All retained entries, oldest first.
    pub fn history(&self) -> Vec<JournalEntry> {
        self.read().iter().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, VecDeque<JournalEntry>> {
        self.entries.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, VecDeque<JournalEntry>> {
        self.entries.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Default for ExecutionJournal {
    fn default() -> Self {
        Self::new()
    }
}

// =============================================================================
// Tests
// =============================================================================
