//! Capacity model
//!
//! Converts calendar events, commitments and energy history into a
//! per-week estimate of how much a student can realistically earn.
//! Every quantity is clamped; nothing here fails except an empty horizon.

use crate::config::{
    RetroplanConfig, EXAM_ENERGY_FACTOR, HOURS_PER_WEEK, MAX_ENERGY_MULTIPLIER,
    MINIMUM_TARGET_RATIO, MIN_ENERGY_MULTIPLIER, PERSONAL_BUFFER_HOURS_PER_WEEK,
    RECOMMENDED_TARGET_RATIO, SLEEP_HOURS_PER_WEEK,
};
use crate::error::RetroplanError;
use crate::models::{
    AcademicEvent, AcademicEventType, CapacityCategory, Commitment, CommitmentType,
    EnergyLogEntry, HoursBreakdown, WeekCapacity,
};
use crate::Result;
use chrono::{Duration, NaiveDate};
use tracing::debug;

pub mod energy;
pub use energy::{EnergyPredictor, NeutralEnergyPredictor, TrendEnergyPredictor};

const HIGH_CAPACITY_THRESHOLD: u32 = 70;
const MEDIUM_CAPACITY_THRESHOLD: u32 = 40;
const MAX_EVENT_IMPACT: f64 = 2.0;

/// Number of (possibly partial) weeks in `[start, deadline)`
pub fn horizon_weeks(start: NaiveDate, deadline: NaiveDate) -> Result<u32> {
    let days = (deadline - start).num_days();
    if days <= 0 {
        return Err(RetroplanError::EmptyHorizon { start, deadline });
    }
    Ok(((days + 6) / 7) as u32)
}

/// Default multiplier for an event type; exams use the configured value
pub fn event_type_multiplier(event_type: AcademicEventType, config: &RetroplanConfig) -> f64 {
    match event_type {
        AcademicEventType::ExamPeriod => config.exam_capacity_multiplier,
        AcademicEventType::ClassIntensive => 0.5,
        AcademicEventType::ProjectDeadline => 0.6,
        AcademicEventType::Internship => 0.3,
        AcademicEventType::Vacation => 1.5,
    }
}

/// Lowest multiplier among the overlapping events, 1.0 when there are none
pub fn academic_multiplier(events: &[AcademicEvent], config: &RetroplanConfig) -> f64 {
    events
        .iter()
        .map(|event| {
            event
                .capacity_impact
                .unwrap_or_else(|| event_type_multiplier(event.event_type, config))
                .clamp(0.0, MAX_EVENT_IMPACT)
        })
        .reduce(f64::min)
        .unwrap_or(1.0)
}

pub fn categorize(score: u32, is_protected: bool) -> CapacityCategory {
    if is_protected {
        CapacityCategory::Protected
    } else if score >= HIGH_CAPACITY_THRESHOLD {
        CapacityCategory::High
    } else if score >= MEDIUM_CAPACITY_THRESHOLD {
        CapacityCategory::Medium
    } else {
        CapacityCategory::Low
    }
}

/// Builds `WeekCapacity` values for a planning horizon
pub struct CapacityModel<'a> {
    config: &'a RetroplanConfig,
    predictor: &'a dyn EnergyPredictor,
}

impl<'a> CapacityModel<'a> {
    pub fn new(config: &'a RetroplanConfig, predictor: &'a dyn EnergyPredictor) -> Self {
        Self { config, predictor }
    }

    /// One entry per week from `start` up to the configured deadline
    pub fn weeks(
        &self,
        start: NaiveDate,
        events: &[AcademicEvent],
        commitments: &[Commitment],
        history: &[EnergyLogEntry],
    ) -> Result<Vec<WeekCapacity>> {
        let total = horizon_weeks(start, self.config.deadline)?;

        let mut weeks: Vec<WeekCapacity> = (0..total)
            .map(|index| {
                let week_start = start + Duration::weeks(i64::from(index));
                self.week(index + 1, week_start, events, commitments, history)
            })
            .collect();

        mark_pre_exam_weeks(&mut weeks, self.config.pre_exam_protected_weeks as usize);

        debug!(
            weeks = weeks.len(),
            predictor = self.predictor.name(),
            protected = weeks.iter().filter(|w| w.is_protected_week).count(),
            "Capacity model computed"
        );

        Ok(weeks)
    }

    fn week(
        &self,
        week_number: u32,
        start_date: NaiveDate,
        events: &[AcademicEvent],
        commitments: &[Commitment],
        history: &[EnergyLogEntry],
    ) -> WeekCapacity {
        let config = self.config;
        let end_date = start_date + Duration::days(6);

        // === Hours ===
        let active = commitments
            .iter()
            .filter(|c| c.is_active_during(start_date, end_date));
        let (class_hours, other_commitments) =
            active.fold((0.0, 0.0), |(class, other), c| {
                let hours = c.hours_per_week.max(0.0);
                match c.commitment_type {
                    CommitmentType::Class => (class + hours, other),
                    CommitmentType::Other => (class, other + hours),
                }
            });

        let base_workable = (HOURS_PER_WEEK
            - SLEEP_HOURS_PER_WEEK
            - class_hours
            - other_commitments
            - PERSONAL_BUFFER_HOURS_PER_WEEK)
            .max(0.0);

        // === Academic load ===
        let overlapping: Vec<AcademicEvent> = events
            .iter()
            .filter(|e| e.overlaps(start_date, end_date))
            .cloned()
            .collect();

        let is_exam_period = overlapping
            .iter()
            .any(|e| e.event_type == AcademicEventType::ExamPeriod);
        let has_critical_event = overlapping.iter().any(AcademicEvent::is_critical);
        let is_protected_week = is_exam_period || has_critical_event;
        let academic = academic_multiplier(&overlapping, config);

        // === Energy ===
        let mut energy = 1.0;
        if is_exam_period {
            energy *= EXAM_ENERGY_FACTOR;
        }
        if let Some(factor) = self.predictor.history_factor(history, start_date) {
            energy *= factor;
        }
        let energy = energy.clamp(MIN_ENERGY_MULTIPLIER, MAX_ENERGY_MULTIPLIER);

        // === Capacity ===
        let max_workable_hours = (base_workable * academic * energy)
            .round()
            .clamp(config.min_hours_per_week, config.max_hours_per_week);

        let capacity_score = ((max_workable_hours / config.max_hours_per_week)
            * 100.0
            * academic
            * energy)
            .round()
            .clamp(0.0, 100.0) as u32;

        let max_earning_potential = max_workable_hours * config.default_hourly_rate;

        WeekCapacity {
            week_number,
            start_date,
            end_date,
            hours: HoursBreakdown {
                total_available: HOURS_PER_WEEK,
                sleep: SLEEP_HOURS_PER_WEEK,
                class_hours,
                other_commitments,
                personal_buffer: PERSONAL_BUFFER_HOURS_PER_WEEK,
                base_workable,
            },
            academic_multiplier: academic,
            predicted_energy_multiplier: energy,
            max_workable_hours,
            capacity_score,
            capacity_category: categorize(capacity_score, is_protected_week),
            is_exam_period,
            is_protected_week,
            has_critical_event,
            is_pre_exam: false,
            events: overlapping,
            max_earning_potential,
            recommended_target: max_earning_potential * RECOMMENDED_TARGET_RATIO,
            minimum_target: max_earning_potential * MINIMUM_TARGET_RATIO,
        }
    }
}

/// Flag the `run_up` weeks immediately preceding each exam week
fn mark_pre_exam_weeks(weeks: &mut [WeekCapacity], run_up: usize) {
    if run_up == 0 {
        return;
    }

    let exam_indices: Vec<usize> = weeks
        .iter()
        .enumerate()
        .filter(|(_, w)| w.is_exam_period)
        .map(|(i, _)| i)
        .collect();

    for exam in exam_indices {
        for index in exam.saturating_sub(run_up)..exam {
            if !weeks[index].is_exam_period {
                weeks[index].is_pre_exam = true;
            }
        }
    }
}
