//! Per-fact lifecycle tracking.
//!
//! Every tracked fact carries a [`MutationPhase`]. A `before_*` notification
//! opens a phase and the matching `after_*` closes it; anything else that
//! arrives while a phase is open is rejected.

use std::collections::HashMap;
use std::fmt;

use super::{FactId, FactKind, FactRef};
use crate::error::ProtocolViolation;

/// Open mutation on a fact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MutationPhase {
    Stable,
    Adding,
    Removing,
    VariableChanging(String),
    PropertyChanging,
}

impl fmt::Display for MutationPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MutationPhase::Stable => f.write_str("stable"),
            MutationPhase::Adding => f.write_str("add"),
            MutationPhase::Removing => f.write_str("remove"),
            MutationPhase::VariableChanging(name) => write!(f, "variable change of {name}"),
            MutationPhase::PropertyChanging => f.write_str("property change"),
        }
    }
}

struct TrackedFact {
    fact: FactRef,
    kind: FactKind,
    phase: MutationPhase,
}

/// Facts currently inserted into a session, plus facts announced for
/// insertion but not yet added.
#[derive(Default)]
pub struct FactRegistry {
    tracked: HashMap<FactId, TrackedFact>,
    pending: HashMap<FactId, TrackedFact>,
}

impl FactRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_tracked(&self, fact: &FactRef) -> bool {
        self.tracked.contains_key(&fact.id())
    }

    pub fn len(&self) -> usize {
        self.tracked.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tracked.is_empty()
    }

    /// Tracked facts, in no particular order.
    pub fn facts(&self) -> impl Iterator<Item = &FactRef> {
        self.tracked.values().map(|tracked| &tracked.fact)
    }

    pub fn phase(&self, fact: &FactRef) -> Option<&MutationPhase> {
        let id = fact.id();
        self.tracked
            .get(&id)
            .or_else(|| self.pending.get(&id))
            .map(|tracked| &tracked.phase)
    }

    /// Number of facts with an open `before_*` notification.
    pub fn open_mutations(&self) -> usize {
        self.pending.len()
            + self
                .tracked
                .values()
                .filter(|tracked| tracked.phase != MutationPhase::Stable)
                .count()
    }

    pub fn clear(&mut self) {
        self.tracked.clear();
        self.pending.clear();
    }

    /// Checks that a fact is neither tracked nor announced.
    pub fn ensure_untracked(&self, fact: &FactRef) -> Result<(), ProtocolViolation> {
        let id = fact.id();
        if self.tracked.contains_key(&id) || self.pending.contains_key(&id) {
            return Err(ProtocolViolation::AlreadyTracked {
                fact: fact.to_string(),
            });
        }
        Ok(())
    }

    /// Starts tracking a fact immediately.
    pub fn track(&mut self, fact: &FactRef, kind: FactKind) -> Result<(), ProtocolViolation> {
        self.ensure_untracked(fact)?;
        self.tracked.insert(
            fact.id(),
            TrackedFact {
                fact: fact.clone(),
                kind,
                phase: MutationPhase::Stable,
            },
        );
        Ok(())
    }

    /// Stops tracking a stable fact.
    pub fn untrack(&mut self, fact: &FactRef, call: &'static str) -> Result<FactKind, ProtocolViolation> {
        self.ensure_stable(fact, call)?;
        let tracked = self
            .tracked
            .remove(&fact.id())
            .ok_or_else(|| not_tracked(fact, call))?;
        Ok(tracked.kind)
    }

    /// Checks that a fact is tracked and has no open mutation.
    pub fn ensure_stable(&self, fact: &FactRef, call: &'static str) -> Result<FactKind, ProtocolViolation> {
        let tracked = self
            .tracked
            .get(&fact.id())
            .ok_or_else(|| not_tracked(fact, call))?;
        if tracked.phase != MutationPhase::Stable {
            return Err(ProtocolViolation::MutationInProgress {
                fact: fact.to_string(),
                pending: tracked.phase.to_string(),
                call,
            });
        }
        Ok(tracked.kind)
    }

    /// Opens a mutation phase for a fact.
    pub fn begin(
        &mut self,
        fact: &FactRef,
        kind: FactKind,
        phase: MutationPhase,
        call: &'static str,
    ) -> Result<(), ProtocolViolation> {
        let id = fact.id();
        if phase == MutationPhase::Adding {
            if let Some(pending) = self.pending.get(&id) {
                return Err(ProtocolViolation::MutationInProgress {
                    fact: fact.to_string(),
                    pending: pending.phase.to_string(),
                    call,
                });
            }
            if self.tracked.contains_key(&id) {
                return Err(ProtocolViolation::AlreadyTracked {
                    fact: fact.to_string(),
                });
            }
            self.pending.insert(
                id,
                TrackedFact {
                    fact: fact.clone(),
                    kind,
                    phase,
                },
            );
            return Ok(());
        }
        self.ensure_stable(fact, call)?;
        if let Some(tracked) = self.tracked.get_mut(&id) {
            tracked.phase = phase;
        }
        Ok(())
    }

    /// Closes the mutation phase opened by the matching `before_*` call.
    pub fn finish(
        &mut self,
        fact: &FactRef,
        expected: &MutationPhase,
        call: &'static str,
    ) -> Result<(), ProtocolViolation> {
        let id = fact.id();
        if *expected == MutationPhase::Adding {
            let Some(mut pending) = self.pending.remove(&id) else {
                return Err(ProtocolViolation::UnpairedAfter {
                    fact: fact.to_string(),
                    call,
                });
            };
            pending.phase = MutationPhase::Stable;
            self.tracked.insert(id, pending);
            return Ok(());
        }

        let tracked = self
            .tracked
            .get_mut(&id)
            .ok_or_else(|| not_tracked(fact, call))?;
        match (&tracked.phase, expected) {
            (MutationPhase::VariableChanging(open), MutationPhase::VariableChanging(closing))
                if open != closing =>
            {
                return Err(ProtocolViolation::VariableMismatch {
                    fact: fact.to_string(),
                    call,
                    expected: open.clone(),
                    actual: closing.clone(),
                });
            }
            (open, closing) if open == closing => {}
            (MutationPhase::Stable, _) => {
                return Err(ProtocolViolation::UnpairedAfter {
                    fact: fact.to_string(),
                    call,
                });
            }
            (open, _) => {
                return Err(ProtocolViolation::MutationInProgress {
                    fact: fact.to_string(),
                    pending: open.to_string(),
                    call,
                });
            }
        }

        if *expected == MutationPhase::Removing {
            self.tracked.remove(&id);
        } else {
            tracked.phase = MutationPhase::Stable;
        }
        Ok(())
    }
}

fn not_tracked(fact: &FactRef, call: &'static str) -> ProtocolViolation {
    ProtocolViolation::NotTracked {
        fact: fact.to_string(),
        call,
    }
}
