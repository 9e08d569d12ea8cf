//! Verification report and result artifacts
//!
//! Every verification pass produces one report, serialized into a fixed
//! artifact set under the task's results directory. Reruns overwrite the
//! previous artifacts so the directory always reflects the latest pass.

use crate::models::ComplexityClass;
use crate::verify::quality::QualityScore;
use crate::verify::scope::ScopeCheck;
use crate::verify::secrets::SecretFinding;
use crate::verify::VerifyDecision;
use crate::workspace::ChangeSet;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ReportError {
    #[error("Failed to write artifact: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize report: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Full machine-readable record of one verification pass
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerificationReport {
    pub decision: VerifyDecision,
    /// Quality gate result; absent when Phase 0 short-circuited
    #[serde(skip_serializing_if = "Option::is_none")]
    pub quality: Option<QualityScore>,
    pub secret_findings: Vec<SecretFinding>,
    pub rogue_edits: Vec<String>,
    pub missing_declared: Vec<String>,
    pub changed_files: Vec<String>,
    pub changed_lines: usize,
    pub insertions: usize,
    pub deletions: usize,
    pub complexity: ComplexityClass,
    pub generated_at: String,
}

impl VerificationReport {
    pub fn new(
        decision: VerifyDecision,
        change: &ChangeSet,
        secret_findings: Vec<SecretFinding>,
        scope: ScopeCheck,
        quality: Option<QualityScore>,
        complexity: ComplexityClass,
    ) -> Self {
        Self {
            decision,
            quality,
            secret_findings,
            rogue_edits: scope.rogue_edits,
            missing_declared: scope.missing_declared,
            changed_files: change.files.iter().cloned().collect(),
            changed_lines: change.changed_lines(),
            insertions: change.insertions,
            deletions: change.deletions,
            complexity,
            generated_at: chrono::Utc::now().to_rfc3339(),
        }
    }

    /// Score shown in score.txt; 0 when the quality gate never ran
    pub fn numeric_score(&self) -> u8 {
        self.quality.as_ref().map(|q| q.score).unwrap_or(0)
    }

    /// Write the artifact set into the results directory, creating it if
    /// needed and overwriting any previous pass
    pub fn write_artifacts(&self, results_dir: &Path) -> Result<(), ReportError> {
        fs::create_dir_all(results_dir)?;

        fs::write(
            results_dir.join("score.txt"),
            format!("{}\n", self.numeric_score()),
        )?;
        fs::write(
            results_dir.join("report.json"),
            serde_json::to_string_pretty(self)?,
        )?;
        fs::write(
            results_dir.join("findings.json"),
            serde_json::to_string_pretty(&self.secret_findings)?,
        )?;
        fs::write(
            results_dir.join("rogue-edits.json"),
            serde_json::to_string_pretty(&self.rogue_edits)?,
        )?;
        fs::write(
            results_dir.join("status.txt"),
            format!("{}\n", self.decision.status_token()),
        )?;

        log::info!(
            "[Verifier] Wrote artifacts to {} (status {})",
            results_dir.display(),
            self.decision.status_token()
        );

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::verify::RejectReason;
    use std::collections::BTreeSet;

    fn sample_change() -> ChangeSet {
        let mut files = BTreeSet::new();
        files.insert("src/auth.ts".to_string());
        ChangeSet {
            files,
            added_lines: vec!["let x = 1;".to_string()],
            insertions: 1,
            deletions: 0,
            per_file: Default::default(),
        }
    }

    #[test]
    fn test_artifact_set_is_complete() {
        let temp = tempfile::TempDir::new().unwrap();
        let report = VerificationReport::new(
            VerifyDecision::Accepted,
            &sample_change(),
            Vec::new(),
            ScopeCheck::default(),
            None,
            ComplexityClass::Medium,
        );

        report.write_artifacts(temp.path()).unwrap();

        for name in [
            "score.txt",
            "report.json",
            "findings.json",
            "rogue-edits.json",
            "status.txt",
        ] {
            assert!(temp.path().join(name).exists(), "missing {}", name);
        }

        let status = fs::read_to_string(temp.path().join("status.txt")).unwrap();
        assert_eq!(status.trim(), "PASSED");
    }

    #[test]
    fn test_rerun_overwrites_previous_artifacts() {
        let temp = tempfile::TempDir::new().unwrap();

        let first = VerificationReport::new(
            VerifyDecision::Rejected {
                reason: RejectReason::RogueEdit,
                details: "out of scope".to_string(),
            },
            &sample_change(),
            Vec::new(),
            ScopeCheck {
                rogue_edits: vec!["src/extra.ts".to_string()],
                missing_declared: Vec::new(),
            },
            None,
            ComplexityClass::Small,
        );
        first.write_artifacts(temp.path()).unwrap();

        let second = VerificationReport::new(
            VerifyDecision::Accepted,
            &sample_change(),
            Vec::new(),
            ScopeCheck::default(),
            None,
            ComplexityClass::Small,
        );
        second.write_artifacts(temp.path()).unwrap();

        let status = fs::read_to_string(temp.path().join("status.txt")).unwrap();
        assert_eq!(status.trim(), "PASSED");
        let rogue = fs::read_to_string(temp.path().join("rogue-edits.json")).unwrap();
        let parsed: Vec<String> = serde_json::from_str(&rogue).unwrap();
        assert!(parsed.is_empty());
    }

    #[test]
    fn test_report_json_uses_camel_case() {
        let report = VerificationReport::new(
            VerifyDecision::SecretsBlocked {
                findings: Vec::new(),
            },
            &sample_change(),
            Vec::new(),
            ScopeCheck::default(),
            None,
            ComplexityClass::Large,
        );

        let json = serde_json::to_string(&report).unwrap();
        assert!(json.contains("\"changedLines\""));
        assert!(json.contains("\"secretFindings\""));
        assert!(json.contains("\"generatedAt\""));
    }

    #[test]
    fn test_score_defaults_to_zero_without_quality_gate() {
        let report = VerificationReport::new(
            VerifyDecision::SecretsBlocked {
                findings: Vec::new(),
            },
            &sample_change(),
            Vec::new(),
            ScopeCheck::default(),
            None,
            ComplexityClass::Medium,
        );
        assert_eq!(report.numeric_score(), 0);
    }
}
