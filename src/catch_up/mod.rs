//! Catch-up engine
//!
//! Invoked when weekly progress is recorded. A shortfall against the plan
//! is spread over upcoming weeks that still have room; anything that does
//! not fit stays visible as an unresolved deficit.

use crate::config::RetroplanConfig;
use crate::error::RetroplanError;
use crate::milestones::recompute_cumulative;
use crate::models::{CapacityCategory, Difficulty, DynamicMilestone, MilestoneStatus};
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Share of `recommended_target` above which a catch-up week becomes challenging
const CHALLENGING_AFTER_CATCH_UP: f64 = 0.9;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatchUpRequest {
    pub milestones: Vec<DynamicMilestone>,
    pub current_week: u32,
    pub actual_progress: f64,
    pub config: RetroplanConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CatchUpOutcome {
    pub milestones: Vec<DynamicMilestone>,
    /// Shortfall at the checkpoint; zero when on or ahead of schedule
    pub deficit: f64,
    pub absorbed: f64,
    pub unresolved: f64,
    pub catch_up_weeks: Vec<u32>,
}

impl CatchUpOutcome {
    /// Deficit could not be fully placed on upcoming weeks
    pub fn is_at_risk(&self) -> bool {
        self.unresolved > 0.0
    }
}

fn is_eligible(milestone: &DynamicMilestone) -> bool {
    !milestone.is_protected() && milestone.capacity.capacity_category != CapacityCategory::Low
}

/// Redistribute the shortfall at `current_week` over upcoming weeks.
///
/// Returns a new milestone list; the input is never modified.
pub fn apply_catch_up(
    milestones: &[DynamicMilestone],
    current_week: u32,
    actual_progress: f64,
    config: &RetroplanConfig,
) -> Result<CatchUpOutcome> {
    if !actual_progress.is_finite() || actual_progress < 0.0 {
        return Err(RetroplanError::InvalidInput(format!(
            "actual progress must be a non-negative amount, got {}",
            actual_progress
        )));
    }

    let checkpoint = milestones
        .iter()
        .position(|m| m.week_number == current_week)
        .ok_or_else(|| {
            RetroplanError::InvalidInput(format!("week {} is not part of the plan", current_week))
        })?;

    let deficit = milestones[checkpoint].cumulative_target - actual_progress;
    if deficit <= 0.0 {
        debug!(current_week, actual_progress, "On or ahead of schedule, plan unchanged");
        return Ok(CatchUpOutcome {
            milestones: milestones.to_vec(),
            deficit: 0.0,
            absorbed: 0.0,
            unresolved: 0.0,
            catch_up_weeks: vec![],
        });
    }

    let mut plan = milestones.to_vec();
    plan[checkpoint].status = MilestoneStatus::Behind;

    let selected: Vec<usize> = plan
        .iter()
        .enumerate()
        .skip(checkpoint + 1)
        .filter(|(_, m)| is_eligible(m))
        .map(|(i, _)| i)
        .take(config.catch_up_spread_weeks as usize)
        .collect();

    let mut remaining = deficit;
    let mut catch_up_weeks = Vec::with_capacity(selected.len());

    if !selected.is_empty() {
        let per_week = (deficit / selected.len() as f64).ceil();

        for index in selected {
            let milestone = &mut plan[index];
            let max_additional =
                (milestone.adjusted_target * (config.catch_up_multiplier - 1.0)).round();
            let addition = per_week.min(max_additional).min(remaining);
            if addition <= 0.0 {
                continue;
            }

            milestone.adjusted_target += addition;
            milestone.catch_up_amount += addition;
            milestone.is_catch_up_week = true;
            if milestone.adjusted_target
                > milestone.capacity.recommended_target * CHALLENGING_AFTER_CATCH_UP
            {
                milestone.difficulty = Difficulty::Challenging;
            }

            remaining -= addition;
            catch_up_weeks.push(milestone.week_number);
        }
    }

    recompute_cumulative(&mut plan, checkpoint + 1, actual_progress);

    let absorbed = deficit - remaining;
    if remaining > 0.0 {
        warn!(
            current_week,
            deficit,
            unresolved = remaining,
            "Catch-up could not absorb the full deficit"
        );
    }

    info!(
        current_week,
        deficit,
        absorbed,
        weeks = catch_up_weeks.len(),
        "Catch-up applied"
    );

    Ok(CatchUpOutcome {
        milestones: plan,
        deficit,
        absorbed,
        unresolved: remaining,
        catch_up_weeks,
    })
}
