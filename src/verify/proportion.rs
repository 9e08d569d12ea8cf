//! Diff proportionality check (Phase 0)
//!
//! Total changed lines (insertions + deletions) must not exceed the
//! ceiling for the task's declared complexity class. The boundary is
//! inclusive: a diff exactly at the ceiling passes.

use crate::models::ComplexityClass;
use serde::{Deserialize, Serialize};

/// Changed-line ceilings per complexity class, monotonically increasing
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct ProportionCeilings {
    pub small: usize,
    pub medium: usize,
    pub large: usize,
}

impl ProportionCeilings {
    /// Phase-0 rejection ceilings
    pub fn phase0_default() -> Self {
        Self {
            small: 100,
            medium: 300,
            large: 1000,
        }
    }

    /// Stricter ceilings used by the quality gate for a -2 deduction
    pub fn quality_default() -> Self {
        Self {
            small: 75,
            medium: 200,
            large: 750,
        }
    }

    pub fn ceiling_for(&self, class: ComplexityClass) -> usize {
        match class {
            ComplexityClass::Small => self.small,
            ComplexityClass::Medium => self.medium,
            ComplexityClass::Large => self.large,
        }
    }
}

/// Inclusive-pass bounds check
pub fn within_bounds(
    changed_lines: usize,
    class: ComplexityClass,
    ceilings: &ProportionCeilings,
) -> bool {
    changed_lines <= ceilings.ceiling_for(class)
}
