//! Calendar projection
//!
//! Read-only month/week/day view over a finished retroplan for rendering.

use crate::models::{
    AcademicEventType, CapacityCategory, Difficulty, DynamicMilestone, Retroplan,
};
use chrono::{Datelike, Duration, NaiveDate};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DayCapacity {
    Full,
    Partial,
    Blocked,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarDay {
    pub date: NaiveDate,
    pub capacity: DayCapacity,
    pub events: Vec<String>,
    /// False for trailing days past the deadline
    pub in_horizon: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarWeek {
    pub week_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub target: f64,
    pub cumulative_target: f64,
    pub difficulty: Difficulty,
    pub capacity_category: CapacityCategory,
    pub is_catch_up_week: bool,
    pub days: Vec<CalendarDay>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CalendarViewData {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub total_target: f64,
    pub weeks: Vec<CalendarWeek>,
}

/// Indicator for one day, from the events of its week that cover it
fn day_capacity(milestone: &DynamicMilestone, day: NaiveDate) -> (DayCapacity, Vec<String>) {
    let covering: Vec<_> = milestone
        .capacity
        .events
        .iter()
        .filter(|e| e.covers(day))
        .collect();

    let blocked = covering
        .iter()
        .any(|e| e.event_type == AcademicEventType::ExamPeriod || e.is_critical());
    let partial = covering
        .iter()
        .any(|e| e.event_type != AcademicEventType::Vacation);

    let capacity = if blocked {
        DayCapacity::Blocked
    } else if partial {
        DayCapacity::Partial
    } else {
        DayCapacity::Full
    };

    (capacity, covering.iter().map(|e| e.name.clone()).collect())
}

fn project_week(milestone: &DynamicMilestone, deadline: NaiveDate) -> CalendarWeek {
    let capacity = &milestone.capacity;
    let days = (0..7)
        .map(|offset| {
            let date = capacity.start_date + Duration::days(offset);
            let (indicator, events) = day_capacity(milestone, date);
            CalendarDay {
                date,
                capacity: indicator,
                events,
                in_horizon: date < deadline,
            }
        })
        .collect();

    CalendarWeek {
        week_number: milestone.week_number,
        start_date: capacity.start_date,
        end_date: capacity.end_date,
        target: milestone.adjusted_target,
        cumulative_target: milestone.cumulative_target,
        difficulty: milestone.difficulty,
        capacity_category: capacity.capacity_category,
        is_catch_up_week: milestone.is_catch_up_week,
        days,
    }
}

/// Group the plan's weeks by the month each week starts in
pub fn project(plan: &Retroplan) -> Vec<CalendarViewData> {
    let mut months: Vec<CalendarViewData> = Vec::new();

    for milestone in &plan.milestones {
        let start = milestone.capacity.start_date;
        let week = project_week(milestone, plan.config.deadline);

        match months.last_mut() {
            Some(month) if month.year == start.year() && month.month == start.month() => {
                month.total_target += week.target;
                month.weeks.push(week);
            }
            _ => months.push(CalendarViewData {
                year: start.year(),
                month: start.month(),
                label: start.format("%B %Y").to_string(),
                total_target: week.target,
                weeks: vec![week],
            }),
        }
    }

    months
}
