//! Retroplan generator
//!
//! Runs the generation pipeline once for a goal:
//! CAPACITY → MILESTONES → FRONT-LOAD → FEASIBILITY → RETROPLAN
//!
//! Pure and synchronous. Every stage returns a fresh list.

use crate::capacity::{CapacityModel, EnergyPredictor, TrendEnergyPredictor};
use crate::config::RetroplanConfig;
use crate::feasibility::{create_default_feasibility_engine, FeasibilityEngine};
use crate::milestones::MilestoneGenerator;
use crate::models::{CapacityCounts, DynamicMilestone, GenerateRetroplanRequest, Retroplan};
use crate::optimizer::{front_load, front_loaded_percentage};
use crate::Result;
use chrono::{NaiveDate, Utc};
use std::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// Merge defaults, profile and overrides for one request
pub fn build_config(request: &GenerateRetroplanRequest) -> RetroplanConfig {
    let config = RetroplanConfig::new(request.goal_amount, request.deadline)
        .with_profile(&request.user_profile);

    match &request.config_overrides {
        Some(overrides) => config.with_overrides(overrides),
        None => config,
    }
}

/// How much of the trailing buffer weeks' recommended capacity is already planned
pub fn buffer_utilization(milestones: &[DynamicMilestone], buffer_weeks: u32) -> f64 {
    let take = (buffer_weeks as usize).min(milestones.len());
    if take == 0 {
        return 0.0;
    }

    let tail = &milestones[milestones.len() - take..];
    let planned: f64 = tail.iter().map(|m| m.adjusted_target).sum();
    let capacity: f64 = tail.iter().map(|m| m.capacity.recommended_target).sum();

    if capacity <= 0.0 {
        return 1.0;
    }
    ((planned / capacity) * 1000.0).round().clamp(0.0, 1000.0) / 1000.0
}

/// New active plan replacing `previous` with updated milestones.
///
/// Feasibility is carried over; only derived figures are refreshed.
pub fn supersede(previous: &Retroplan, milestones: Vec<DynamicMilestone>) -> Retroplan {
    Retroplan {
        id: Uuid::new_v4(),
        capacity_counts: CapacityCounts::from_milestones(&milestones),
        front_loaded_percentage: front_loaded_percentage(&milestones),
        buffer_utilization: buffer_utilization(&milestones, previous.config.buffer_weeks),
        milestones,
        is_active: true,
        created_at: Utc::now(),
        supersedes: Some(previous.id),
        ..previous.clone()
    }
}

/// Builds complete retroplans from structured inputs
pub struct RetroplanGenerator {
    predictor: Box<dyn EnergyPredictor>,
    feasibility: FeasibilityEngine,
}

impl RetroplanGenerator {
    pub fn new(predictor: Box<dyn EnergyPredictor>, feasibility: FeasibilityEngine) -> Self {
        Self {
            predictor,
            feasibility,
        }
    }

    /// Generate a plan; `today` is used when the request has no start date
    pub fn generate(
        &self,
        request: &GenerateRetroplanRequest,
        today: NaiveDate,
    ) -> Result<Retroplan> {
        let start_time = Instant::now();
        let start = request.start_date.unwrap_or(today);

        let config = build_config(request);
        config.validate()?;

        debug!(
            goal_id = ?request.goal_id,
            start = %start,
            deadline = %config.deadline,
            goal_amount = config.goal_amount,
            "Generating retroplan"
        );

        // === CAPACITY ===
        let weeks = CapacityModel::new(&config, self.predictor.as_ref()).weeks(
            start,
            &request.academic_events,
            &request.commitments,
            &request.energy_history,
        )?;

        // === MILESTONES ===
        let milestones = MilestoneGenerator::new(&config).generate(weeks)?;

        // === FRONT-LOAD ===
        let milestones = front_load(&milestones);

        // === FEASIBILITY ===
        let assessment = self.feasibility.assess(&milestones, &config);

        let plan = Retroplan {
            id: Uuid::new_v4(),
            goal_id: request.goal_id,
            user_id: request.user_id,
            start_date: start,
            capacity_counts: CapacityCounts::from_milestones(&milestones),
            feasibility_score: assessment.score,
            confidence_interval: assessment.confidence_interval,
            risk_factors: assessment.risk_factors,
            front_loaded_percentage: front_loaded_percentage(&milestones),
            buffer_utilization: buffer_utilization(&milestones, config.buffer_weeks),
            milestones,
            config,
            is_active: true,
            created_at: Utc::now(),
            supersedes: None,
        };

        info!(
            plan_id = ?plan.id,
            goal_id = ?plan.goal_id,
            weeks = plan.total_weeks(),
            feasibility_score = plan.feasibility_score,
            duration_ms = start_time.elapsed().as_millis() as u64,
            "Retroplan generated"
        );

        Ok(plan)
    }
}

impl Default for RetroplanGenerator {
    fn default() -> Self {
        Self::new(
            Box::new(TrendEnergyPredictor),
            create_default_feasibility_engine(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::RetroplanError;
    use crate::models::{
        AcademicEvent, AcademicEventType, CapacityCategory, EnergyLogEntry, Priority,
    };
    use crate::test_utils::{exam_event, plan_start, sample_request};
    use chrono::Duration;

    fn whole_term(event_type: AcademicEventType) -> AcademicEvent {
        AcademicEvent {
            event_type,
            name: "Lab rotation".to_string(),
            start_date: plan_start(),
            end_date: plan_start() + Duration::weeks(20),
            capacity_impact: None,
            priority: Priority::Normal,
            recurring: true,
        }
    }

    fn total(plan: &Retroplan) -> f64 {
        plan.milestones.iter().map(|m| m.adjusted_target).sum()
    }

    #[test]
    fn test_even_capacity_plan() {
        // A term-long intensive halves every week => capacity score 50
        let mut request = sample_request(800.0, 8);
        request.academic_events = vec![whole_term(AcademicEventType::ClassIntensive)];

        let plan = RetroplanGenerator::default()
            .generate(&request, plan_start())
            .unwrap();

        assert_eq!(plan.total_weeks(), 8);
        for m in &plan.milestones {
            assert_eq!(m.capacity.capacity_score, 50);
            assert_eq!(m.adjusted_target, 100.0);
        }
        assert_eq!(plan.capacity_counts.medium, 8);
        assert_eq!(plan.feasibility_score, 1.0);
        assert!(plan.risk_factors.is_empty());
        assert_eq!(plan.front_loaded_percentage, 50.0);
        assert!((plan.buffer_utilization - 0.476).abs() < 1e-9);
        assert_eq!(total(&plan), 800.0);
    }

    #[test]
    fn test_exam_week_is_capped_and_front_loaded() {
        let mut request = sample_request(800.0, 8);
        request.academic_events = vec![exam_event(plan_start() + Duration::weeks(3))];

        let plan = RetroplanGenerator::default()
            .generate(&request, plan_start())
            .unwrap();

        let exam = &plan.milestones[3];
        assert!(exam.capacity.is_protected_week);
        assert!(exam.adjusted_target <= exam.capacity.minimum_target * 1.5);
        assert_eq!(exam.adjusted_target, 58.0);

        // Later weeks fed the first high-capacity week
        assert_eq!(plan.milestones[0].capacity.capacity_category, CapacityCategory::High);
        assert_eq!(plan.milestones[0].adjusted_target, 170.0);
        for later in &plan.milestones[4..] {
            assert_eq!(later.adjusted_target, 90.0);
            assert!(later.adjusted_target >= later.capacity.minimum_target);
        }

        assert_eq!(total(&plan), 800.0);
        assert_eq!(plan.milestones.last().unwrap().cumulative_target, 800.0);
        assert_eq!(plan.capacity_counts.protected, 1);
        assert_eq!(plan.feasibility_score, 1.0);
    }

    #[test]
    fn test_empty_horizon_is_rejected() {
        let mut request = sample_request(800.0, 0);
        request.deadline = plan_start();

        let result = RetroplanGenerator::default().generate(&request, plan_start());
        assert!(matches!(result, Err(RetroplanError::EmptyHorizon { .. })));
    }

    #[test]
    fn test_invalid_goal_is_rejected() {
        let request = sample_request(-20.0, 4);
        let result = RetroplanGenerator::default().generate(&request, plan_start());
        assert!(matches!(result, Err(RetroplanError::InvalidInput(_))));
    }

    #[test]
    fn test_start_defaults_to_today() {
        let mut request = sample_request(600.0, 6);
        request.start_date = None;
        let today = plan_start() + Duration::weeks(2);

        let plan = RetroplanGenerator::default().generate(&request, today).unwrap();
        assert_eq!(plan.start_date, today);
        assert_eq!(plan.total_weeks(), 4);
    }

    #[test]
    fn test_conservation_across_varied_inputs() {
        let generator = RetroplanGenerator::default();

        for (goal, weeks) in [(350.0, 3), (1234.0, 7), (5000.0, 12), (99.0, 5), (2600.0, 26)] {
            let mut request = sample_request(goal, weeks);
            request.academic_events = vec![
                exam_event(plan_start() + Duration::weeks(1)),
                AcademicEvent {
                    event_type: AcademicEventType::ProjectDeadline,
                    name: "Capstone".to_string(),
                    start_date: plan_start() + Duration::days(17),
                    end_date: plan_start() + Duration::days(19),
                    capacity_impact: None,
                    priority: Priority::Critical,
                    recurring: false,
                },
            ];
            request.energy_history = (1..=10)
                .map(|i| EnergyLogEntry {
                    date: plan_start() - Duration::days(i),
                    energy_level: 2,
                    mood_score: 3,
                    stress_level: 4,
                    hours_slept: Some(6.5),
                })
                .collect();

            let plan = generator.generate(&request, plan_start()).unwrap();

            assert_eq!(total(&plan), goal, "goal {} over {} weeks", goal, weeks);
            let mut previous = 0.0;
            for m in &plan.milestones {
                assert!(m.cumulative_target >= previous);
                assert!(m.capacity.capacity_score <= 100);
                if let Some(cap) = m.capacity.protection_cap() {
                    assert!(m.adjusted_target <= cap, "week {} over cap", m.week_number);
                }
                previous = m.cumulative_target;
            }
            assert_eq!(previous, goal);
            assert!(plan.feasibility_score >= 0.1 && plan.feasibility_score <= 1.0);
        }
    }

    #[test]
    fn test_small_goal_over_long_horizon_stays_non_negative() {
        let generator = RetroplanGenerator::default();

        for (goal, weeks) in [(100.0, 52), (20.0, 40), (7.0, 30)] {
            let plan = generator
                .generate(&sample_request(goal, weeks), plan_start())
                .unwrap();

            assert_eq!(total(&plan), goal, "goal {} over {} weeks", goal, weeks);
            let mut previous = 0.0;
            for m in &plan.milestones {
                assert!(m.adjusted_target >= 0.0, "week {} negative", m.week_number);
                assert!(m.cumulative_target >= previous);
                previous = m.cumulative_target;
            }
            assert_eq!(previous, goal);
        }
    }

    #[test]
    fn test_non_finite_available_hours_is_rejected() {
        let mut request = sample_request(800.0, 8);
        request.user_profile.available_hours = Some(f64::NAN);

        let result = RetroplanGenerator::default().generate(&request, plan_start());
        assert!(matches!(result, Err(RetroplanError::InvalidInput(_))));
    }

    #[test]
    fn test_supersede_keeps_feasibility_and_links_previous() {
        let request = sample_request(800.0, 8);
        let plan = RetroplanGenerator::default()
            .generate(&request, plan_start())
            .unwrap();

        let mut milestones = plan.milestones.clone();
        milestones[5].adjusted_target += 20.0;
        let next = supersede(&plan, milestones);

        assert_ne!(next.id, plan.id);
        assert_eq!(next.supersedes, Some(plan.id));
        assert_eq!(next.goal_id, plan.goal_id);
        assert_eq!(next.feasibility_score, plan.feasibility_score);
        assert_eq!(next.milestones[5].adjusted_target, plan.milestones[5].adjusted_target + 20.0);
    }
}
