//! Quality gate (Phase 1)
//!
//! Composite 0-10 scoring over file-scope correctness, external
//! validation signals, and diff size. Runs only after Phase 0 passes.
//! Validation tools are the surrounding project's own tooling, invoked
//! as black-box pass/fail commands; flaky output is accepted as given
//! and never retried here.

use crate::models::ComplexityClass;
use crate::verify::proportion::{within_bounds, ProportionCeilings};
use crate::verify::scope::ScopeCheck;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;

/// Maximum score before deductions
pub const MAX_SCORE: u8 = 10;

/// Points deducted for any unexpected or missing declared file
pub const FILE_SCOPE_DEDUCTION: u32 = 4;

/// Points deducted when the diff exceeds the stricter quality ceiling
pub const DIFF_SIZE_DEDUCTION: u32 = 2;

/// External validation signal kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationSignal {
    TypeCheck,
    Lint,
    Tests,
}

impl ValidationSignal {
    pub fn label(&self) -> &'static str {
        match self {
            Self::TypeCheck => "type-check",
            Self::Lint => "lint",
            Self::Tests => "tests",
        }
    }
}

/// Per-signal deduction weights; configuration values, not constants
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct SignalWeights {
    #[serde(default = "default_type_check_weight")]
    pub type_check: u32,
    #[serde(default = "default_lint_weight")]
    pub lint: u32,
    #[serde(default = "default_tests_weight")]
    pub tests: u32,
}

fn default_type_check_weight() -> u32 {
    2
}

fn default_lint_weight() -> u32 {
    1
}

fn default_tests_weight() -> u32 {
    2
}

impl Default for SignalWeights {
    fn default() -> Self {
        Self {
            type_check: default_type_check_weight(),
            lint: default_lint_weight(),
            tests: default_tests_weight(),
        }
    }
}

impl SignalWeights {
    pub fn weight_for(&self, signal: ValidationSignal) -> u32 {
        match signal {
            ValidationSignal::TypeCheck => self.type_check,
            ValidationSignal::Lint => self.lint,
            ValidationSignal::Tests => self.tests,
        }
    }
}

/// Black-box validation commands; unconfigured signals are skipped
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationCommands {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub type_check: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lint: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tests: Option<Vec<String>>,
}

impl ValidationCommands {
    fn configured(&self) -> Vec<(ValidationSignal, &Vec<String>)> {
        let mut out = Vec::new();
        if let Some(cmd) = &self.type_check {
            out.push((ValidationSignal::TypeCheck, cmd));
        }
        if let Some(cmd) = &self.lint {
            out.push((ValidationSignal::Lint, cmd));
        }
        if let Some(cmd) = &self.tests {
            out.push((ValidationSignal::Tests, cmd));
        }
        out
    }
}

/// One itemized deduction applied to the score
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Deduction {
    pub reason: String,
    pub points: u32,
}

/// Composite quality score with verdict
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QualityScore {
    /// Final score, clamped to [0, 10]
    pub score: u8,
    /// Itemized deductions in evaluation order
    pub deductions: Vec<Deduction>,
    /// Accept iff score >= threshold
    pub accepted: bool,
    /// The threshold the verdict was taken against
    pub threshold: u8,
}

/// Run the configured validation commands in the workspace directory and
/// return the failing signals. Each command is pass/fail on exit status;
/// a command that cannot be launched counts as failing.
pub fn run_validation(commands: &ValidationCommands, workdir: &Path) -> Vec<ValidationSignal> {
    let mut failing = Vec::new();

    for (signal, cmd) in commands.configured() {
        let Some(program) = cmd.first() else {
            continue;
        };

        log::debug!(
            "[QualityGate] Running {} validation: {:?}",
            signal.label(),
            cmd
        );

        let passed = Command::new(program)
            .args(&cmd[1..])
            .current_dir(workdir)
            .status()
            .map(|status| status.success())
            .unwrap_or(false);

        if !passed {
            log::info!("[QualityGate] {} validation failed", signal.label());
            failing.push(signal);
        }
    }

    failing
}

/// Compute the composite score from independent deductions
pub fn score(
    scope: &ScopeCheck,
    failing_signals: &[ValidationSignal],
    changed_lines: usize,
    complexity: ComplexityClass,
    strict_ceilings: &ProportionCeilings,
    weights: &SignalWeights,
    threshold: u8,
) -> QualityScore {
    let mut deductions = Vec::new();

    if scope.has_violation() {
        deductions.push(Deduction {
            reason: format!(
                "File-scope violation: {} rogue, {} missing declared",
                scope.rogue_edits.len(),
                scope.missing_declared.len()
            ),
            points: FILE_SCOPE_DEDUCTION,
        });
    }

    for signal in failing_signals {
        deductions.push(Deduction {
            reason: format!("Validation failed: {}", signal.label()),
            points: weights.weight_for(*signal),
        });
    }

    if !within_bounds(changed_lines, complexity, strict_ceilings) {
        deductions.push(Deduction {
            reason: format!(
                "Diff size {} exceeds strict ceiling {} for {} tasks",
                changed_lines,
                strict_ceilings.ceiling_for(complexity),
                complexity
            ),
            points: DIFF_SIZE_DEDUCTION,
        });
    }

    let total: u32 = deductions.iter().map(|d| d.points).sum();
    let score = (MAX_SCORE as u32).saturating_sub(total).min(10) as u8;

    QualityScore {
        score,
        deductions,
        accepted: score >= threshold,
        threshold,
    }
}
