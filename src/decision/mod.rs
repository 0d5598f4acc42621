// src/decision/mod.rs

use serde::{Deserialize, Serialize};

use crate::metrics::Metrics;

/// Thresholds the final metrics must meet.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Constraints {
    pub wns_min: f64,
    pub max_congestion: u32,
    pub drc_violations: u32,
}

impl Default for Constraints {
    fn default() -> Self {
        Self {
            wns_min: 0.0,
            max_congestion: 90,
            drc_violations: 0,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DecisionStatus {
    Success,
    Retry,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NextAction {
    Complete,
    Replan,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IssueKind {
    Timing,
    Congestion,
    Drc,
}

/// One violated constraint, with the observed value and the threshold it
/// was compared against.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Issue {
    #[serde(rename = "type")]
    pub kind: IssueKind,
    pub metric: String,
    pub value: f64,
    pub threshold: f64,
    pub message: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Decision {
    pub status: DecisionStatus,
    pub next_action: NextAction,
    pub issues: Vec<Issue>,
    pub message: String,
}

/// Compares extracted metrics against the constraint set. Pure and
/// stateless: same metrics and constraints, same decision.
pub struct DecisionEngine {
    constraints: Constraints,
}

impl DecisionEngine {
    pub fn new(constraints: Constraints) -> Self {
        Self { constraints }
    }

    pub fn evaluate(&self, metrics: &Metrics) -> Decision {
        let mut issues = Vec::new();

        // Timing: only judged when the report actually carried a WNS.
        if let Some(wns) = metrics.wns {
            if wns < self.constraints.wns_min {
                issues.push(Issue {
                    kind: IssueKind::Timing,
                    metric: "wns".to_string(),
                    value: wns,
                    threshold: self.constraints.wns_min,
                    message: format!(
                        "Timing violation: WNS={wns}ns (need >={})",
                        self.constraints.wns_min
                    ),
                });
            }
        }

        if let Some(congestion) = metrics.max_congestion {
            if congestion > self.constraints.max_congestion {
                issues.push(Issue {
                    kind: IssueKind::Congestion,
                    metric: "max_congestion".to_string(),
                    value: congestion as f64,
                    threshold: self.constraints.max_congestion as f64,
                    message: format!(
                        "High congestion: {congestion}% (limit: {}%)",
                        self.constraints.max_congestion
                    ),
                });
            }
        }

        // DRC counts as zero when unreported.
        let drc = metrics.drc_violations.unwrap_or(0);
        if drc > self.constraints.drc_violations {
            issues.push(Issue {
                kind: IssueKind::Drc,
                metric: "drc_violations".to_string(),
                value: drc as f64,
                threshold: self.constraints.drc_violations as f64,
                message: format!(
                    "DRC violations: {drc} (need: {})",
                    self.constraints.drc_violations
                ),
            });
        }

        let decision = if issues.is_empty() {
            Decision {
                status: DecisionStatus::Success,
                next_action: NextAction::Complete,
                issues,
                message: "All constraints satisfied".to_string(),
            }
        } else {
            let message = format!("{} constraint(s) violated", issues.len());
            Decision {
                status: DecisionStatus::Retry,
                next_action: NextAction::Replan,
                issues,
                message,
            }
        };

        tracing::info!(status = ?decision.status, issues = decision.issues.len(), "decision evaluated");
        for issue in &decision.issues {
            tracing::warn!(metric = %issue.metric, "{}", issue.message);
        }

        decision
    }
}

impl Default for DecisionEngine {
    fn default() -> Self {
        Self::new(Constraints::default())
    }
}
