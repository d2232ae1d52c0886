//! Test utilities shared by the module test suites
//!
//! Factories for capacity weeks, milestones and generation requests.

use crate::capacity::categorize;
use crate::config::{MINIMUM_TARGET_RATIO, RECOMMENDED_TARGET_RATIO};
use crate::models::{
    AcademicEvent, AcademicEventType, DynamicMilestone, GenerateRetroplanRequest,
    HoursBreakdown, MilestoneStatus, Priority, UserProfile, WeekCapacity,
};
use crate::milestones::classify_difficulty;
use chrono::{Duration, NaiveDate};
use uuid::Uuid;

pub fn day(y: i32, m: u32, d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(y, m, d).unwrap()
}

/// Monday used as the first day of every fixture horizon
pub fn plan_start() -> NaiveDate {
    day(2026, 1, 5)
}

/// Non-protected week with the given score and earning potential
pub fn week_capacity(week_number: u32, score: u32, potential: f64) -> WeekCapacity {
    let start_date = plan_start() + Duration::weeks(i64::from(week_number) - 1);
    WeekCapacity {
        week_number,
        start_date,
        end_date: start_date + Duration::days(6),
        hours: HoursBreakdown {
            total_available: 168.0,
            sleep: 56.0,
            class_hours: 0.0,
            other_commitments: 0.0,
            personal_buffer: 21.0,
            base_workable: 91.0,
        },
        academic_multiplier: 1.0,
        predicted_energy_multiplier: 1.0,
        max_workable_hours: potential / 15.0,
        capacity_score: score,
        capacity_category: categorize(score, false),
        is_exam_period: false,
        is_protected_week: false,
        has_critical_event: false,
        is_pre_exam: false,
        events: vec![],
        max_earning_potential: potential,
        recommended_target: potential * RECOMMENDED_TARGET_RATIO,
        minimum_target: potential * MINIMUM_TARGET_RATIO,
    }
}

/// Exam week without a critical event
pub fn exam_week(week_number: u32, score: u32, potential: f64) -> WeekCapacity {
    let mut week = week_capacity(week_number, score, potential);
    week.is_exam_period = true;
    week.is_protected_week = true;
    week.capacity_category = categorize(score, true);
    week.events = vec![exam_event(week.start_date)];
    week
}

pub fn uniform_weeks(count: u32, score: u32, potential: f64) -> Vec<WeekCapacity> {
    (1..=count)
        .map(|n| week_capacity(n, score, potential))
        .collect()
}

pub fn exam_event(start: NaiveDate) -> AcademicEvent {
    AcademicEvent {
        event_type: AcademicEventType::ExamPeriod,
        name: "Midterms".to_string(),
        start_date: start,
        end_date: start + Duration::days(4),
        capacity_impact: None,
        priority: Priority::Normal,
        recurring: false,
    }
}

/// Milestones with explicit targets; cumulative totals are filled in
pub fn milestones_with_targets(weeks: Vec<WeekCapacity>, targets: &[f64]) -> Vec<DynamicMilestone> {
    let base = targets.iter().sum::<f64>() / targets.len() as f64;
    let mut running = 0.0;
    weeks
        .into_iter()
        .zip(targets.iter())
        .map(|(capacity, target)| {
            running += target;
            DynamicMilestone {
                week_number: capacity.week_number,
                base_target: base,
                adjusted_target: *target,
                cumulative_target: running,
                difficulty: classify_difficulty(*target, &capacity),
                capacity,
                is_catch_up_week: false,
                catch_up_amount: 0.0,
                status: MilestoneStatus::Pending,
            }
        })
        .collect()
}

/// Free student, default profile, `weeks` weeks from `plan_start`
pub fn sample_request(goal_amount: f64, weeks: i64) -> GenerateRetroplanRequest {
    GenerateRetroplanRequest {
        user_id: Uuid::new_v4(),
        goal_id: Uuid::new_v4(),
        goal_amount,
        deadline: plan_start() + Duration::weeks(weeks),
        start_date: Some(plan_start()),
        user_profile: UserProfile {
            default_hourly_rate: Some(15.0),
            available_hours: None,
        },
        academic_events: vec![],
        commitments: vec![],
        energy_history: vec![],
        config_overrides: None,
    }
}
