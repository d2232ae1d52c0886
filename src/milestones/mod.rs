//! Milestone generator
//!
//! Spreads the (buffered) goal across weeks in proportion to capacity,
//! clamps each week into its target band, then renormalizes so the plan
//! sums to the goal exactly.

use crate::config::RetroplanConfig;
use crate::error::RetroplanError;
use crate::models::{Difficulty, DynamicMilestone, MilestoneStatus, WeekCapacity};
use crate::Result;
use tracing::debug;

const EASY_RATIO: f64 = 0.5;
const MODERATE_RATIO: f64 = 0.8;

/// Difficulty of carrying `target` in a week with the given capacity
pub fn classify_difficulty(target: f64, capacity: &WeekCapacity) -> Difficulty {
    if capacity.is_protected_week {
        return Difficulty::Protected;
    }
    if capacity.recommended_target <= 0.0 {
        return Difficulty::Challenging;
    }

    let ratio = target / capacity.recommended_target;
    if ratio < EASY_RATIO {
        Difficulty::Easy
    } else if ratio < MODERATE_RATIO {
        Difficulty::Moderate
    } else {
        Difficulty::Challenging
    }
}

/// Rewrite cumulative totals from `from_index` onward, starting at `opening`
pub fn recompute_cumulative(milestones: &mut [DynamicMilestone], from_index: usize, opening: f64) {
    let mut running = opening;
    for milestone in milestones.iter_mut().skip(from_index) {
        running += milestone.adjusted_target;
        milestone.cumulative_target = running;
    }
}

/// Largest whole amount a week may hold under protection
fn protected_ceiling(capacity: &WeekCapacity) -> Option<f64> {
    capacity.protection_cap().map(f64::floor)
}

/// Remove `overshoot` one unit at a time from the largest weeks, open weeks
/// first. No week drops below zero.
fn trim_overshoot(milestones: &mut [DynamicMilestone], mut overshoot: f64) {
    while overshoot > 0.0 {
        let largest = |protected: bool| {
            milestones
                .iter()
                .enumerate()
                .filter(|(_, m)| m.is_protected() == protected && m.adjusted_target > 0.0)
                .max_by(|(_, a), (_, b)| a.adjusted_target.total_cmp(&b.adjusted_target))
                .map(|(i, _)| i)
        };
        let Some(index) = largest(false).or_else(|| largest(true)) else {
            break;
        };

        let take = overshoot.min(1.0).min(milestones[index].adjusted_target);
        milestones[index].adjusted_target -= take;
        overshoot -= take;
    }
}

pub struct MilestoneGenerator<'a> {
    config: &'a RetroplanConfig,
}

impl<'a> MilestoneGenerator<'a> {
    pub fn new(config: &'a RetroplanConfig) -> Self {
        Self { config }
    }

    pub fn generate(&self, weeks: Vec<WeekCapacity>) -> Result<Vec<DynamicMilestone>> {
        let total_capacity_score: u32 = weeks.iter().map(|w| w.capacity_score).sum();
        if total_capacity_score == 0 {
            return Err(RetroplanError::ZeroCapacity { weeks: weeks.len() });
        }

        let goal = self.config.goal_amount;
        let buffered_goal = goal * (1.0 + self.config.buffer_percentage);
        let target_per_point = buffered_goal / f64::from(total_capacity_score);
        let base_target = (goal / weeks.len() as f64).round();

        debug!(
            weeks = weeks.len(),
            total_capacity_score,
            buffered_goal,
            target_per_point,
            "Distributing goal across weeks"
        );

        let mut running = 0.0;
        let milestones: Vec<DynamicMilestone> = weeks
            .into_iter()
            .map(|capacity| {
                let mut target = (f64::from(capacity.capacity_score) * target_per_point).round();
                if let Some(cap) = capacity.protection_cap() {
                    target = target.min(cap);
                }
                let target = target
                    .min(capacity.recommended_target)
                    .max(capacity.minimum_target);

                running += target;

                DynamicMilestone {
                    week_number: capacity.week_number,
                    base_target,
                    adjusted_target: target,
                    cumulative_target: running,
                    difficulty: classify_difficulty(target, &capacity),
                    capacity,
                    is_catch_up_week: false,
                    catch_up_amount: 0.0,
                    status: MilestoneStatus::Pending,
                }
            })
            .collect();

        normalize(milestones, goal)
    }
}

/// Scale whole-unit targets so they sum to `goal` exactly.
///
/// Protected weeks that scaling pushes past their ceiling are held at it and
/// the excess moves to unprotected weeks. A positive rounding remainder lands
/// on the last unprotected week (the last week if every week is protected);
/// an overshoot is trimmed from the largest weeks.
pub fn normalize(
    mut milestones: Vec<DynamicMilestone>,
    goal: f64,
) -> Result<Vec<DynamicMilestone>> {
    let total_distributed: f64 = milestones.iter().map(|m| m.adjusted_target).sum();
    if total_distributed <= 0.0 {
        return Err(RetroplanError::ZeroCapacity {
            weeks: milestones.len(),
        });
    }

    let factor = goal / total_distributed;
    let mut excess = 0.0;

    for milestone in milestones.iter_mut() {
        let mut scaled = (milestone.adjusted_target * factor).round();
        if let Some(ceiling) = protected_ceiling(&milestone.capacity) {
            if scaled > ceiling {
                excess += scaled - ceiling;
                scaled = ceiling;
            }
        }
        milestone.adjusted_target = scaled;
    }

    if excess > 0.0 {
        let open_total: f64 = milestones
            .iter()
            .filter(|m| !m.is_protected())
            .map(|m| m.adjusted_target)
            .sum();

        if open_total > 0.0 {
            for milestone in milestones.iter_mut().filter(|m| !m.is_protected()) {
                milestone.adjusted_target +=
                    (excess * milestone.adjusted_target / open_total).round();
            }
        }
    }

    let distributed: f64 = milestones.iter().map(|m| m.adjusted_target).sum();
    let remainder = goal - distributed;
    if remainder > 0.0 {
        let sink = milestones
            .iter()
            .rposition(|m| !m.is_protected())
            .or_else(|| milestones.len().checked_sub(1));
        if let Some(index) = sink {
            milestones[index].adjusted_target += remainder;
        }
    } else if remainder < 0.0 {
        trim_overshoot(&mut milestones, -remainder);
    }

    for milestone in milestones.iter_mut() {
        milestone.difficulty = classify_difficulty(milestone.adjusted_target, &milestone.capacity);
    }
    recompute_cumulative(&mut milestones, 0, 0.0);

    debug!(
        goal,
        factor,
        excess,
        remainder,
        "Milestones normalized"
    );

    Ok(milestones)
}
