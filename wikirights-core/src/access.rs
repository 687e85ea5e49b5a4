// SPDX-License-Identifier: MIT OR Apache-2.0

//! The resolved outcome of a rights check: a tri-state per right.

use std::fmt;

use crate::right::Right;

/// State of a single right for one subject at one entity level.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum RightState {
    Allow,
    Deny,
    #[default]
    Unset,
}

/// The resolved access of one user at one entity: a [`RightState`] for
/// every assignable [`Right`].
///
/// Levels are produced by the loader and read-only afterwards. The default
/// level leaves every right unset, which readers interpret as denial.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccessLevel {
    states: [RightState; Right::COUNT],
}

impl AccessLevel {
    pub fn get(&self, right: Right) -> RightState {
        match right.index() {
            Some(slot) => self.states[slot],
            None => RightState::Unset,
        }
    }

    /// Set the state for a right. Setting the illegal sentinel is a no-op.
    pub fn set(&mut self, right: Right, state: RightState) {
        if let Some(slot) = right.index() {
            self.states[slot] = state;
        }
    }

    pub fn allows(&self, right: Right) -> bool {
        self.get(right) == RightState::Allow
    }

    /// Override every right which `other` sets explicitly, inheriting the
    /// current state where `other` is unset. This is the level-merge step:
    /// deeper entity levels override, unset inherits.
    pub fn override_with(&mut self, other: &AccessLevel) {
        for (slot, state) in other.states.iter().enumerate() {
            if *state != RightState::Unset {
                self.states[slot] = *state;
            }
        }
    }

    pub fn is_default(&self) -> bool {
        self.states.iter().all(|state| *state == RightState::Unset)
    }
}

impl Default for AccessLevel {
    fn default() -> Self {
        Self {
            states: [RightState::Unset; Right::COUNT],
        }
    }
}

impl fmt::Display for AccessLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        write!(f, "{{")?;
        for right in Right::all() {
            let state = self.get(right);
            if state == RightState::Unset {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            let tag = if state == RightState::Allow {
                "allow"
            } else {
                "deny"
            };
            write!(f, "{right}={tag}")?;
        }
        write!(f, "}}")
    }
}
