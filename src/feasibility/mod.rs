//! Feasibility assessor
//!
//! Rules-based scoring of a finished milestone list.
//! Every rule that fires subtracts its penalty and adds a risk factor.

use crate::config::RetroplanConfig;
use crate::models::{ConfidenceInterval, Difficulty, DynamicMilestone};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

pub const MIN_FEASIBILITY_SCORE: f64 = 0.1;
pub const MAX_FEASIBILITY_SCORE: f64 = 1.0;
/// Upper bound of the confidence interval, as a multiple of the goal
const MAX_CONFIDENCE_MULTIPLE: f64 = 1.2;

/// Trait for feasibility rules
pub trait FeasibilityRule: Send + Sync {
    fn name(&self) -> &'static str;

    /// Amount subtracted from the score when the rule fires
    fn penalty(&self) -> f64;

    fn evaluate(
        &self,
        milestones: &[DynamicMilestone],
        config: &RetroplanConfig,
    ) -> RuleCheckResult;
}

pub struct RuleCheckResult {
    pub triggered: bool,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeasibilityCheck {
    pub rule_name: String,
    pub triggered: bool,
    pub penalty: f64,
    pub details: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FeasibilityAssessment {
    pub score: f64,
    pub confidence_interval: ConfidenceInterval,
    pub risk_factors: Vec<String>,
    pub checks: Vec<FeasibilityCheck>,
    pub std_dev: f64,
}

/// Scores plans against a list of rules
pub struct FeasibilityEngine {
    rules: Vec<Box<dyn FeasibilityRule>>,
}

impl FeasibilityEngine {
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    pub fn add_rule(&mut self, rule: Box<dyn FeasibilityRule>) {
        self.rules.push(rule);
    }

    pub fn assess(
        &self,
        milestones: &[DynamicMilestone],
        config: &RetroplanConfig,
    ) -> FeasibilityAssessment {
        let mut score = MAX_FEASIBILITY_SCORE;
        let mut risk_factors = Vec::new();
        let mut checks = Vec::with_capacity(self.rules.len());

        for rule in &self.rules {
            let result = rule.evaluate(milestones, config);

            if result.triggered {
                score -= rule.penalty();
                risk_factors.push(result.details.clone());

                warn!(
                    rule = rule.name(),
                    penalty = rule.penalty(),
                    details = %result.details,
                    "Feasibility rule triggered"
                );
            }

            checks.push(FeasibilityCheck {
                rule_name: rule.name().to_string(),
                triggered: result.triggered,
                penalty: rule.penalty(),
                details: result.details,
            });
        }

        let score = score.clamp(MIN_FEASIBILITY_SCORE, MAX_FEASIBILITY_SCORE);
        let std_dev = target_std_dev(milestones);
        let goal = config.goal_amount;

        let confidence_interval = ConfidenceInterval {
            low: (goal * (score - std_dev / 100.0)).max(0.0),
            high: goal * (score + std_dev / 100.0).min(MAX_CONFIDENCE_MULTIPLE),
        };

        info!(
            rule_count = self.rules.len(),
            score,
            std_dev,
            risk_factors = risk_factors.len(),
            "Feasibility assessed"
        );

        FeasibilityAssessment {
            score,
            confidence_interval,
            risk_factors,
            checks,
            std_dev,
        }
    }
}

impl Default for FeasibilityEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Population standard deviation of weekly targets
pub fn target_std_dev(milestones: &[DynamicMilestone]) -> f64 {
    if milestones.is_empty() {
        return 0.0;
    }

    let n = milestones.len() as f64;
    let mean = milestones.iter().map(|m| m.adjusted_target).sum::<f64>() / n;
    let variance = milestones
        .iter()
        .map(|m| (m.adjusted_target - mean).powi(2))
        .sum::<f64>()
        / n;

    variance.sqrt()
}

fn ratio(count: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        count as f64 / total as f64
    }
}

//
// ========== Default Rules ==========
//

/// Rule: too many weeks are protected
pub struct ProtectedWeekRatioRule;

impl FeasibilityRule for ProtectedWeekRatioRule {
    fn name(&self) -> &'static str {
        "protected_week_ratio"
    }

    fn penalty(&self) -> f64 {
        0.2
    }

    fn evaluate(
        &self,
        milestones: &[DynamicMilestone],
        _config: &RetroplanConfig,
    ) -> RuleCheckResult {
        let protected = milestones.iter().filter(|m| m.is_protected()).count();
        let share = ratio(protected, milestones.len());

        RuleCheckResult {
            triggered: share > 0.3,
            details: format!(
                "{} of {} weeks are protected by exams or critical deadlines ({:.0}%)",
                protected,
                milestones.len(),
                share * 100.0
            ),
        }
    }
}

/// Rule: too many weeks sit near the recommended ceiling
pub struct ChallengingWeekRatioRule;

impl FeasibilityRule for ChallengingWeekRatioRule {
    fn name(&self) -> &'static str {
        "challenging_week_ratio"
    }

    fn penalty(&self) -> f64 {
        0.15
    }

    fn evaluate(
        &self,
        milestones: &[DynamicMilestone],
        _config: &RetroplanConfig,
    ) -> RuleCheckResult {
        let challenging = milestones
            .iter()
            .filter(|m| m.difficulty == Difficulty::Challenging)
            .count();
        let share = ratio(challenging, milestones.len());

        RuleCheckResult {
            triggered: share > 0.4,
            details: format!(
                "{} of {} weeks have challenging targets ({:.0}%)",
                challenging,
                milestones.len(),
                share * 100.0
            ),
        }
    }
}

/// Rule: the average weekly target exceeds the average recommended capacity
pub struct CapacityOverloadRule;

impl FeasibilityRule for CapacityOverloadRule {
    fn name(&self) -> &'static str {
        "capacity_overload"
    }

    fn penalty(&self) -> f64 {
        0.2
    }

    fn evaluate(
        &self,
        milestones: &[DynamicMilestone],
        _config: &RetroplanConfig,
    ) -> RuleCheckResult {
        if milestones.is_empty() {
            return RuleCheckResult {
                triggered: false,
                details: "No weeks to compare".to_string(),
            };
        }

        let n = milestones.len() as f64;
        let avg_target = milestones.iter().map(|m| m.adjusted_target).sum::<f64>() / n;
        let avg_capacity = milestones
            .iter()
            .map(|m| m.capacity.recommended_target)
            .sum::<f64>()
            / n;

        RuleCheckResult {
            triggered: avg_target > avg_capacity,
            details: format!(
                "Average weekly target {:.0} vs recommended capacity {:.0}",
                avg_target, avg_capacity
            ),
        }
    }
}

/// Rule: less than four weeks to reach the goal
pub struct ShortHorizonRule;

const SHORT_HORIZON_WEEKS: usize = 4;

impl FeasibilityRule for ShortHorizonRule {
    fn name(&self) -> &'static str {
        "short_horizon"
    }

    fn penalty(&self) -> f64 {
        0.15
    }

    fn evaluate(
        &self,
        milestones: &[DynamicMilestone],
        _config: &RetroplanConfig,
    ) -> RuleCheckResult {
        RuleCheckResult {
            triggered: milestones.len() < SHORT_HORIZON_WEEKS,
            details: format!(
                "Only {} week(s) until the deadline",
                milestones.len()
            ),
        }
    }
}

/// Create a feasibility engine with the standard rules
pub fn create_default_feasibility_engine() -> FeasibilityEngine {
    let mut engine = FeasibilityEngine::new();
    engine.add_rule(Box::new(ProtectedWeekRatioRule));
    engine.add_rule(Box::new(ChallengingWeekRatioRule));
    engine.add_rule(Box::new(CapacityOverloadRule));
    engine.add_rule(Box::new(ShortHorizonRule));
    engine
}

//
// ================= Tests =================
//
