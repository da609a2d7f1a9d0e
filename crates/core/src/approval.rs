//! Approval policy for publishing versions.
//!
//! Each integration carries a single [`ApprovalWorkflow`]. When enabled, a
//! draft needs approvals from at least `required_approvers` distinct
//! identities drawn from `approvers` before it may be published.

use serde::{Deserialize, Serialize};

use crate::types::{DbId, Timestamp};
use crate::versioning::normalize_identity;

/// Upper bound on the size of an approver set.
pub const MAX_APPROVERS: usize = 50;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApprovalWorkflow {
    pub enabled: bool,
    pub required_approvers: u32,
    pub approvers: Vec<String>,
    pub auto_publish_on_approval: bool,
    /// When set (and the workflow is enabled), rollbacks produce a draft
    /// that must be approved like any other version.
    #[serde(default)]
    pub rollback_requires_approval: bool,
}

impl Default for ApprovalWorkflow {
    fn default() -> Self {
        Self {
            enabled: false,
            required_approvers: 1,
            approvers: Vec::new(),
            auto_publish_on_approval: false,
            rollback_requires_approval: false,
        }
    }
}

impl ApprovalWorkflow {
    /// Validate and normalize the workflow, returning the stored form.
    ///
    /// Approver identities are trimmed and de-duplicated. An enabled
    /// workflow must be satisfiable by its own approver set.
    pub fn normalized(&self) -> Result<Self, String> {
        if self.required_approvers < 1 {
            return Err("required_approvers must be at least 1".into());
        }

        let mut approvers: Vec<String> = Vec::with_capacity(self.approvers.len());
        for approver in &self.approvers {
            let approver = normalize_identity(approver).map_err(|e| format!("approvers: {e}"))?;
            if !approvers.contains(&approver) {
                approvers.push(approver);
            }
        }
        if approvers.len() > MAX_APPROVERS {
            return Err(format!("At most {MAX_APPROVERS} approvers are allowed"));
        }

        if self.enabled && (approvers.len() as u32) < self.required_approvers {
            return Err(format!(
                "required_approvers ({}) exceeds the number of approvers ({})",
                self.required_approvers,
                approvers.len()
            ));
        }

        Ok(Self {
            approvers,
            ..self.clone()
        })
    }

    pub fn is_approver(&self, identity: &str) -> bool {
        self.approvers.iter().any(|a| a == identity)
    }

    /// Approvals that count toward the threshold: those given by identities
    /// that are still in the approver set.
    pub fn counted<'a>(&'a self, approvals: &'a [Approval]) -> impl Iterator<Item = &'a Approval> {
        approvals.iter().filter(|a| self.is_approver(&a.approver))
    }

    /// The approver whose counted approval completed the threshold, taking
    /// approvals in recorded order. `None` while unmet or when disabled.
    pub fn completing_approver<'a>(&self, approvals: &'a [Approval]) -> Option<&'a str> {
        let required = self.approval_threshold()?;
        let index = usize::try_from(required).ok()?.checked_sub(1)?;
        approvals
            .iter()
            .filter(|a| self.is_approver(&a.approver))
            .nth(index)
            .map(|a| a.approver.as_str())
    }

    /// Whether `approval_count` distinct approvals satisfy the policy.
    pub fn is_satisfied_by(&self, approval_count: usize) -> bool {
        !self.enabled || approval_count >= self.required_approvers as usize
    }

    /// Threshold at which the store stamps `approved_by`, or `None` when the
    /// workflow is disabled and approvals carry no weight.
    pub fn approval_threshold(&self) -> Option<u32> {
        self.enabled.then_some(self.required_approvers)
    }

    /// Whether a rollback must go through approval instead of publishing
    /// immediately.
    pub fn gates_rollback(&self) -> bool {
        self.enabled && self.rollback_requires_approval
    }
}

/// A recorded approval of a draft version.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Approval {
    pub version_id: DbId,
    pub approver: String,
    pub approved_at: Timestamp,
}

/// Result of recording an approval in the store.
#[derive(Debug, Clone)]
pub struct ApprovalRecord {
    /// `false` when the approver had already approved this version.
    pub inserted: bool,
    /// Distinct approvals from current approvers after this call.
    pub approval_count: usize,
    /// `true` when this call stamped `approved_by`.
    pub stamped: bool,
    /// The version after the approval (with `approved_by` stamped if the
    /// threshold was reached).
    pub version: crate::versioning::Version,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn workflow(enabled: bool, required: u32, approvers: &[&str]) -> ApprovalWorkflow {
        ApprovalWorkflow {
            enabled,
            required_approvers: required,
            approvers: approvers.iter().map(|s| s.to_string()).collect(),
            auto_publish_on_approval: false,
            rollback_requires_approval: false,
        }
    }

    #[test]
    fn disabled_workflow_is_always_satisfied() {
        let wf = workflow(false, 3, &[]);
        assert!(wf.is_satisfied_by(0));
        assert_eq!(wf.approval_threshold(), None);
    }

    #[test]
    fn enabled_workflow_needs_threshold() {
        let wf = workflow(true, 2, &["a", "b", "c"]);
        assert!(!wf.is_satisfied_by(1));
        assert!(wf.is_satisfied_by(2));
        assert_eq!(wf.approval_threshold(), Some(2));
    }

    #[test]
    fn normalization_dedupes_and_trims() {
        let wf = workflow(true, 2, &[" a ", "a", "b"]).normalized().unwrap();
        assert_eq!(wf.approvers, vec!["a", "b"]);
    }

    #[test]
    fn unsatisfiable_enabled_workflow_is_rejected() {
        let err = workflow(true, 3, &["a", "b"]).normalized().unwrap_err();
        assert!(err.contains("exceeds"));
    }

    #[test]
    fn unsatisfiable_disabled_workflow_is_allowed() {
        assert!(workflow(false, 3, &[]).normalized().is_ok());
    }

    #[test]
    fn zero_required_approvers_is_rejected() {
        assert!(workflow(false, 0, &[]).normalized().is_err());
    }

    #[test]
    fn blank_approver_is_rejected() {
        assert!(workflow(true, 1, &["  "]).normalized().is_err());
    }

    fn approval(approver: &str) -> Approval {
        Approval {
            version_id: 1,
            approver: approver.into(),
            approved_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn removed_approvers_do_not_count() {
        let wf = workflow(true, 2, &["a", "c"]);
        let approvals = [approval("a"), approval("b"), approval("c")];
        assert_eq!(wf.counted(&approvals).count(), 2);
        assert_eq!(wf.completing_approver(&approvals), Some("c"));
    }

    #[test]
    fn completing_approver_follows_threshold() {
        let approvals = [approval("a"), approval("b"), approval("c")];
        assert_eq!(workflow(true, 3, &["a", "b", "c"]).completing_approver(&approvals[..2]), None);
        assert_eq!(workflow(true, 2, &["a", "b", "c"]).completing_approver(&approvals), Some("b"));
        assert_eq!(workflow(false, 1, &["a"]).completing_approver(&approvals), None);
    }

    #[test]
    fn rollback_gating_needs_enabled_workflow() {
        let mut wf = workflow(false, 1, &["a"]);
        wf.rollback_requires_approval = true;
        assert!(!wf.gates_rollback());
        wf.enabled = true;
        assert!(wf.gates_rollback());
    }
}
