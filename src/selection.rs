//! Availability editing as an explicit state machine.
//!
//! A participant paints one status at a time ("mode") over a scope: the whole
//! calendar for day events, a single date for hour events. Saving merges the
//! painted keys back into the full availability map.
//!
//! ```text
//! Idle ──begin──▶ Selecting ──toggle──▶ Dirty ──save──▶ Saving ──complete──▶ Idle
//!                     ▲                   │                │
//!                     └──────reset────────┘                └──fail──▶ Error ──save/begin──▶ …
//! ```

use std::collections::BTreeSet;

use chrono::NaiveDate;
use thiserror::Error;

use crate::error::ValidationError;
use crate::models::{Availability, AvailabilityStatus, TimeUnit};
use crate::timekey::TimeKey;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Phase {
    Idle,
    Selecting,
    Dirty,
    Saving,
    Error(String),
}

impl Phase {
    fn name(&self) -> &'static str {
        match self {
            Phase::Idle => "idle",
            Phase::Selecting => "selecting",
            Phase::Dirty => "dirty",
            Phase::Saving => "saving",
            Phase::Error(_) => "error",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Every key (day events).
    All,
    /// Keys on one date (hour events).
    Date(NaiveDate),
}

impl Scope {
    pub fn for_unit(unit: TimeUnit, date: Option<NaiveDate>) -> Option<Self> {
        match unit {
            TimeUnit::Day => Some(Scope::All),
            TimeUnit::Hour => date.map(Scope::Date),
        }
    }

    pub fn contains(&self, key: &str) -> bool {
        match self {
            Scope::All => true,
            Scope::Date(date) => TimeKey::parse(key).is_ok_and(|k| k.date() == *date),
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SelectionError {
    #[error("cannot {action} while {from}")]
    InvalidTransition {
        from: &'static str,
        action: &'static str,
    },

    #[error("time-key '{0}' is outside the current selection scope")]
    OutOfScope(String),

    #[error(transparent)]
    Invalid(#[from] ValidationError),
}

/// Replace the `mode` keys inside `scope` with `selected`, keeping every other entry.
pub fn apply_selection(
    base: &Availability,
    mode: AvailabilityStatus,
    scope: Scope,
    selected: &BTreeSet<String>,
) -> Availability {
    let mut merged: Availability = base
        .iter()
        .filter(|(key, status)| !(**status == mode && scope.contains(key)))
        .map(|(key, status)| (key.clone(), *status))
        .collect();
    for key in selected {
        merged.insert(key.clone(), mode);
    }
    merged
}

#[derive(Debug, Clone)]
pub struct SelectionDraft {
    base: Availability,
    phase: Phase,
    mode: AvailabilityStatus,
    scope: Scope,
    original: BTreeSet<String>,
    selected: BTreeSet<String>,
}

impl SelectionDraft {
    pub fn new(base: Availability) -> Self {
        Self {
            base,
            phase: Phase::Idle,
            mode: AvailabilityStatus::Available,
            scope: Scope::All,
            original: BTreeSet::new(),
            selected: BTreeSet::new(),
        }
    }

    pub fn phase(&self) -> &Phase {
        &self.phase
    }

    pub fn mode(&self) -> AvailabilityStatus {
        self.mode
    }

    pub fn selected(&self) -> &BTreeSet<String> {
        &self.selected
    }

    pub fn is_dirty(&self) -> bool {
        self.phase == Phase::Dirty
    }

    fn invalid(&self, action: &'static str) -> SelectionError {
        SelectionError::InvalidTransition {
            from: self.phase.name(),
            action,
        }
    }

    /// Start painting `mode` over `scope`, preloaded with what is already marked.
    /// Switching mode or scope is allowed as long as nothing is unsaved.
    pub fn begin(&mut self, mode: AvailabilityStatus, scope: Scope) -> Result<(), SelectionError> {
        match self.phase {
            Phase::Idle | Phase::Selecting | Phase::Error(_) => {}
            Phase::Dirty | Phase::Saving => return Err(self.invalid("begin")),
        }
        self.mode = mode;
        self.scope = scope;
        self.original = self
            .base
            .iter()
            .filter(|(key, status)| **status == mode && scope.contains(key))
            .map(|(key, _)| key.clone())
            .collect();
        self.selected = self.original.clone();
        self.phase = Phase::Selecting;
        Ok(())
    }

    /// Flip one key; returns whether it is now selected. The draft is dirty only
    /// while the selection differs from what was stored.
    pub fn toggle(&mut self, key: &str) -> Result<bool, SelectionError> {
        if !matches!(self.phase, Phase::Selecting | Phase::Dirty) {
            return Err(self.invalid("toggle"));
        }
        TimeKey::parse(key)?;
        if !self.scope.contains(key) {
            return Err(SelectionError::OutOfScope(key.to_string()));
        }
        let now_selected = if self.selected.remove(key) {
            false
        } else {
            self.selected.insert(key.to_string());
            true
        };
        self.phase = if self.selected == self.original {
            Phase::Selecting
        } else {
            Phase::Dirty
        };
        Ok(now_selected)
    }

    pub fn reset(&mut self) -> Result<(), SelectionError> {
        if self.phase != Phase::Dirty {
            return Err(self.invalid("reset"));
        }
        self.selected = self.original.clone();
        self.phase = Phase::Selecting;
        Ok(())
    }

    /// The map `save` would hand out, without leaving the current phase.
    pub fn preview(&self) -> Availability {
        apply_selection(&self.base, self.mode, self.scope, &self.selected)
    }

    /// Enter `Saving` and hand out the merged map to persist.
    pub fn save(&mut self) -> Result<Availability, SelectionError> {
        if !matches!(self.phase, Phase::Dirty | Phase::Error(_)) {
            return Err(self.invalid("save"));
        }
        self.phase = Phase::Saving;
        Ok(self.preview())
    }

    /// The store accepted `saved`; it becomes the new baseline.
    pub fn complete(&mut self, saved: Availability) -> Result<(), SelectionError> {
        if self.phase != Phase::Saving {
            return Err(self.invalid("complete"));
        }
        self.base = saved;
        self.original.clear();
        self.selected.clear();
        self.phase = Phase::Idle;
        Ok(())
    }

    pub fn fail(&mut self, message: impl Into<String>) -> Result<(), SelectionError> {
        if self.phase != Phase::Saving {
            return Err(self.invalid("fail"));
        }
        self.phase = Phase::Error(message.into());
        Ok(())
    }
}
