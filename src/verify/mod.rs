//! Verification pipeline
//!
//! Phase 0 inspects a worker's change set for secrets, rogue edits, and
//! disproportionate size; Phase 1 scores the surviving change set 0-10
//! and takes the accept/reject verdict. Any non-accepted outcome is
//! followed by a deterministic workspace revert. Phase 0 failures
//! short-circuit Phase 1 so expensive validation never runs on a diff
//! already known to be unsafe or out-of-scope.

pub mod proportion;
pub mod quality;
pub mod report;
pub mod scope;
pub mod secrets;

pub use proportion::ProportionCeilings;
pub use quality::{QualityScore, SignalWeights, ValidationCommands, ValidationSignal};
pub use report::VerificationReport;
pub use scope::ScopeCheck;
pub use secrets::{PatternTable, SecretFinding, SecretScanner};

use crate::models::ComplexityClass;
use crate::workspace::{Workspace, WorkspaceError};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum VerifyError {
    #[error("Workspace error: {0}")]
    Workspace(#[from] WorkspaceError),

    #[error("Invalid secret pattern: {0}")]
    Pattern(#[from] regex::Error),
}

/// Why an attempt was rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RejectReason {
    RogueEdit,
    OversizedDiff,
    QualityBelowThreshold,
}

/// Tagged verification verdict handed to callers, replacing multiplexed
/// exit codes at the API boundary
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "decision", rename_all = "snake_case")]
pub enum VerifyDecision {
    Accepted,
    Rejected {
        reason: RejectReason,
        details: String,
    },
    SecretsBlocked {
        findings: Vec<SecretFinding>,
    },
}

impl VerifyDecision {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Terminal status token written alongside the artifacts
    pub fn status_token(&self) -> &'static str {
        match self {
            Self::Accepted => "PASSED",
            Self::Rejected { .. } => "FAILED",
            Self::SecretsBlocked { .. } => "SECRETS_FOUND",
        }
    }

    /// Process exit code for the command-line surface
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::Accepted => 0,
            Self::Rejected { .. } => 1,
            Self::SecretsBlocked { .. } => 2,
        }
    }
}

/// Verification pipeline configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GateConfig {
    /// Phase-0 rejection ceilings per complexity class
    #[serde(default = "ProportionCeilings::phase0_default")]
    pub phase0_ceilings: ProportionCeilings,

    /// Stricter quality-gate ceilings per complexity class
    #[serde(default = "ProportionCeilings::quality_default")]
    pub quality_ceilings: ProportionCeilings,

    /// Per-signal validation deduction weights
    #[serde(default)]
    pub weights: SignalWeights,

    /// Accept iff score >= threshold
    #[serde(default = "default_score_threshold")]
    pub score_threshold: u8,

    /// Black-box validation commands (type-check, lint, tests)
    #[serde(default)]
    pub validation: ValidationCommands,

    /// Secret pattern/allowlist table
    #[serde(default)]
    pub patterns: PatternTable,
}

fn default_score_threshold() -> u8 {
    6
}

impl Default for GateConfig {
    fn default() -> Self {
        Self {
            phase0_ceilings: ProportionCeilings::phase0_default(),
            quality_ceilings: ProportionCeilings::quality_default(),
            weights: SignalWeights::default(),
            score_threshold: default_score_threshold(),
            validation: ValidationCommands::default(),
            patterns: PatternTable::default(),
        }
    }
}

/// Run the full verification pipeline against the workspace's current
/// change set. Does not revert; see [`enforce`].
pub fn evaluate(
    workspace: &Workspace,
    declared: &BTreeSet<String>,
    complexity: ComplexityClass,
    config: &GateConfig,
) -> Result<VerificationReport, VerifyError> {
    let change = workspace.change_set()?;

    // Secret scan first, independent of the other checks; a hit is a hard
    // stop with no path back to Pass in this attempt.
    let scanner = SecretScanner::new(&config.patterns)?;
    let findings = scanner.scan(change.added_lines.iter().map(|l| l.as_str()));
    if !findings.is_empty() {
        log::warn!(
            "[Verifier] {} secret finding(s) in added lines, blocking",
            findings.len()
        );
        let decision = VerifyDecision::SecretsBlocked {
            findings: findings.clone(),
        };
        return Ok(VerificationReport::new(
            decision,
            &change,
            findings,
            ScopeCheck::default(),
            None,
            complexity,
        ));
    }

    let scope = scope::check_scope(&change.files, declared);
    if !scope.rogue_edits.is_empty() {
        log::warn!(
            "[Verifier] Rogue edits outside declared write-set: {:?}",
            scope.rogue_edits
        );
        let decision = VerifyDecision::Rejected {
            reason: RejectReason::RogueEdit,
            details: format!("Modified outside write-set: {}", scope.rogue_edits.join(", ")),
        };
        return Ok(VerificationReport::new(
            decision,
            &change,
            Vec::new(),
            scope,
            None,
            complexity,
        ));
    }

    let changed_lines = change.changed_lines();
    if !proportion::within_bounds(changed_lines, complexity, &config.phase0_ceilings) {
        log::warn!(
            "[Verifier] Diff of {} lines exceeds {} ceiling of {}",
            changed_lines,
            complexity,
            config.phase0_ceilings.ceiling_for(complexity)
        );
        let decision = VerifyDecision::Rejected {
            reason: RejectReason::OversizedDiff,
            details: format!(
                "{} changed lines > ceiling {} for class {}",
                changed_lines,
                config.phase0_ceilings.ceiling_for(complexity),
                complexity
            ),
        };
        return Ok(VerificationReport::new(
            decision,
            &change,
            Vec::new(),
            scope,
            None,
            complexity,
        ));
    }

    // Phase 0 passed; run the quality gate.
    let failing = quality::run_validation(&config.validation, workspace.root());
    let quality_score = quality::score(
        &scope,
        &failing,
        changed_lines,
        complexity,
        &config.quality_ceilings,
        &config.weights,
        config.score_threshold,
    );

    log::info!(
        "[Verifier] Quality score {}/10 (threshold {}): {}",
        quality_score.score,
        quality_score.threshold,
        if quality_score.accepted {
            "accept"
        } else {
            "reject"
        }
    );

    let decision = if quality_score.accepted {
        VerifyDecision::Accepted
    } else {
        VerifyDecision::Rejected {
            reason: RejectReason::QualityBelowThreshold,
            details: format!(
                "Score {} below threshold {}",
                quality_score.score, quality_score.threshold
            ),
        }
    };

    Ok(VerificationReport::new(
        decision,
        &change,
        Vec::new(),
        scope,
        Some(quality_score),
        complexity,
    ))
}

/// Apply the report's verdict to the workspace: every non-accepted
/// outcome reverts to the last known-good state.
pub fn enforce(workspace: &Workspace, report: &VerificationReport) -> Result<(), VerifyError> {
    if !report.decision.is_accepted() {
        workspace.revert()?;
    }
    Ok(())
}
