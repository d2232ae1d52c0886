//! Front-load optimizer
//!
//! Moves money out of later weeks into early high-capacity weeks that still
//! have headroom. Totals never change and protected weeks are never touched.

use crate::config::MAX_TRANSFER_PER_WEEK;
use crate::milestones::{classify_difficulty, recompute_cumulative};
use crate::models::{CapacityCategory, DynamicMilestone};
use tracing::debug;

/// Early week able to absorb more money
fn can_receive(milestone: &DynamicMilestone) -> bool {
    !milestone.is_protected()
        && !milestone.capacity.is_pre_exam
        && milestone.capacity.capacity_category == CapacityCategory::High
        && milestone.capacity.recommended_target - milestone.adjusted_target >= 1.0
}

/// Returns a new milestone list with work shifted towards the start.
///
/// Each later week (walked from the deadline backwards) gives at most one
/// transfer, bounded by its room above `minimum_target`, the receiver's
/// headroom below `recommended_target`, and `MAX_TRANSFER_PER_WEEK`.
pub fn front_load(milestones: &[DynamicMilestone]) -> Vec<DynamicMilestone> {
    let mut plan = milestones.to_vec();
    let midpoint = plan.len() / 2;
    if midpoint == 0 {
        return plan;
    }

    let mut transfers = 0;
    let mut moved = 0.0;

    for later_index in (midpoint..plan.len()).rev() {
        let later = &plan[later_index];
        if later.is_protected() {
            continue;
        }

        let room = later.adjusted_target - later.capacity.minimum_target;
        if room < 1.0 {
            continue;
        }

        let Some(early_index) = plan[..midpoint].iter().position(can_receive) else {
            continue;
        };

        let headroom =
            plan[early_index].capacity.recommended_target - plan[early_index].adjusted_target;
        let amount = room.min(headroom).min(MAX_TRANSFER_PER_WEEK).floor();
        if amount <= 0.0 {
            continue;
        }

        plan[later_index].adjusted_target -= amount;
        plan[early_index].adjusted_target += amount;

        for index in [later_index, early_index] {
            let milestone = &mut plan[index];
            milestone.difficulty =
                classify_difficulty(milestone.adjusted_target, &milestone.capacity);
        }

        transfers += 1;
        moved += amount;
    }

    recompute_cumulative(&mut plan, 0, 0.0);

    debug!(transfers, moved, "Front-loading complete");

    plan
}

/// Share (0-100, one decimal) of the total planned in the first half
pub fn front_loaded_percentage(milestones: &[DynamicMilestone]) -> f64 {
    let total: f64 = milestones.iter().map(|m| m.adjusted_target).sum();
    if total <= 0.0 {
        return 0.0;
    }

    let midpoint = milestones.len() / 2;
    let early: f64 = milestones[..midpoint].iter().map(|m| m.adjusted_target).sum();

    (early / total * 1000.0).round() / 10.0
}
