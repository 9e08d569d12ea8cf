//! Rogue-edit detection (Phase 0)
//!
//! Compares the paths a worker actually touched against the task's
//! declared write-set. Any path outside the declaration is a rogue edit
//! and rejects the attempt. Declared-but-untouched paths are a separate
//! "missing" signal consumed only by the quality gate.

use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Result of comparing actual vs. declared file scope
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScopeCheck {
    /// Modified paths outside the declared write-set (rejecting)
    pub rogue_edits: Vec<String>,
    /// Declared paths the worker never touched (quality-gate signal only)
    pub missing_declared: Vec<String>,
}

impl ScopeCheck {
    /// Whether any unexpected or missing declared file was observed
    pub fn has_violation(&self) -> bool {
        !self.rogue_edits.is_empty() || !self.missing_declared.is_empty()
    }
}

/// Compare the actually changed paths against the declared write-set
pub fn check_scope(changed: &BTreeSet<String>, declared: &BTreeSet<String>) -> ScopeCheck {
    ScopeCheck {
        rogue_edits: changed.difference(declared).cloned().collect(),
        missing_declared: declared.difference(changed).cloned().collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn set(paths: &[&str]) -> BTreeSet<String> {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_exact_match_is_clean() {
        let check = check_scope(&set(&["src/auth.ts"]), &set(&["src/auth.ts"]));
        assert!(check.rogue_edits.is_empty());
        assert!(check.missing_declared.is_empty());
        assert!(!check.has_violation());
    }

    #[test]
    fn test_undeclared_modification_is_rogue() {
        let check = check_scope(
            &set(&["src/auth.ts", "src/extra.ts"]),
            &set(&["src/auth.ts"]),
        );
        assert_eq!(check.rogue_edits, vec!["src/extra.ts".to_string()]);
        assert!(check.missing_declared.is_empty());
    }

    #[test]
    fn test_untouched_declared_is_missing_not_rogue() {
        let check = check_scope(&set(&["src/auth.ts"]), &set(&["src/auth.ts", "src/db.ts"]));
        assert!(check.rogue_edits.is_empty());
        assert_eq!(check.missing_declared, vec!["src/db.ts".to_string()]);
        assert!(check.has_violation());
    }

    #[test]
    fn test_empty_change_set_reports_all_declared_missing() {
        let check = check_scope(&set(&[]), &set(&["a.rs", "b.rs"]));
        assert!(check.rogue_edits.is_empty());
        assert_eq!(check.missing_declared.len(), 2);
    }
}
