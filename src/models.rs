//! Core data models for the retroplanning engine

use crate::config::{ConfigOverrides, RetroplanConfig};
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

//
// ================= Enums =================
//

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AcademicEventType {
    ExamPeriod,
    ClassIntensive,
    ProjectDeadline,
    Internship,
    Vacation,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    #[default]
    Normal,
    Critical,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CommitmentType {
    Class,
    Other,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum CapacityCategory {
    High,
    Medium,
    Low,
    Protected,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Moderate,
    Challenging,
    Protected,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MilestoneStatus {
    #[default]
    Pending,
    Behind,
}

//
// ================= Caller Inputs =================
//

/// Calendar event that changes how much a student can work
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AcademicEvent {
    #[serde(rename = "type")]
    pub event_type: AcademicEventType,
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    /// Explicit multiplier (0..2) replacing the per-type default
    #[serde(default)]
    pub capacity_impact: Option<f64>,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub recurring: bool,
}

impl AcademicEvent {
    /// Inclusive date-range overlap
    pub fn overlaps(&self, start: NaiveDate, end: NaiveDate) -> bool {
        self.start_date <= end && self.end_date >= start
    }

    pub fn covers(&self, day: NaiveDate) -> bool {
        self.overlaps(day, day)
    }

    pub fn is_critical(&self) -> bool {
        self.priority == Priority::Critical
    }
}

/// Recurring weekly time obligation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Commitment {
    #[serde(rename = "type")]
    pub commitment_type: CommitmentType,
    pub hours_per_week: f64,
    #[serde(default)]
    pub active_from: Option<NaiveDate>,
    #[serde(default)]
    pub active_to: Option<NaiveDate>,
    #[serde(default)]
    pub priority: Priority,
}

impl Commitment {
    /// Open-ended bounds count as always active
    pub fn is_active_during(&self, start: NaiveDate, end: NaiveDate) -> bool {
        let started = self.active_from.map_or(true, |from| from <= end);
        let not_ended = self.active_to.map_or(true, |to| to >= start);
        started && not_ended
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EnergyLogEntry {
    pub date: NaiveDate,
    /// 1..5
    pub energy_level: u8,
    /// 1..5
    pub mood_score: u8,
    /// 1..5
    pub stress_level: u8,
    #[serde(default)]
    pub hours_slept: Option<f64>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UserProfile {
    #[serde(default)]
    pub default_hourly_rate: Option<f64>,
    /// Hours per week the student says they can work
    #[serde(default)]
    pub available_hours: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRetroplanRequest {
    pub user_id: Uuid,
    pub goal_id: Uuid,
    pub goal_amount: f64,
    pub deadline: NaiveDate,
    /// First day of the horizon; today (UTC) when absent
    #[serde(default)]
    pub start_date: Option<NaiveDate>,
    #[serde(default)]
    pub user_profile: UserProfile,
    #[serde(default)]
    pub academic_events: Vec<AcademicEvent>,
    #[serde(default)]
    pub commitments: Vec<Commitment>,
    #[serde(default)]
    pub energy_history: Vec<EnergyLogEntry>,
    #[serde(default)]
    pub config_overrides: Option<ConfigOverrides>,
}

//
// ================= Computed Capacity =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HoursBreakdown {
    pub total_available: f64,
    pub sleep: f64,
    pub class_hours: f64,
    pub other_commitments: f64,
    pub personal_buffer: f64,
    pub base_workable: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WeekCapacity {
    /// 1-based position in the horizon
    pub week_number: u32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub hours: HoursBreakdown,
    pub academic_multiplier: f64,
    pub predicted_energy_multiplier: f64,
    pub max_workable_hours: f64,
    pub capacity_score: u32,
    pub capacity_category: CapacityCategory,
    pub is_exam_period: bool,
    pub is_protected_week: bool,
    pub has_critical_event: bool,
    /// Falls within the configured run-up to an exam week
    pub is_pre_exam: bool,
    /// Events overlapping this week, kept for the calendar view
    pub events: Vec<AcademicEvent>,
    pub max_earning_potential: f64,
    pub recommended_target: f64,
    pub minimum_target: f64,
}

impl WeekCapacity {
    /// Highest target a protected week may carry
    pub fn protection_cap(&self) -> Option<f64> {
        if !self.is_protected_week {
            return None;
        }

        if self.is_exam_period && !self.has_critical_event {
            Some(self.minimum_target * crate::config::EXAM_ONLY_CAP_RATIO)
        } else {
            Some(self.minimum_target)
        }
    }
}

//
// ================= Milestones =================
//

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct DynamicMilestone {
    pub week_number: u32,
    /// Naive even split of the goal
    pub base_target: f64,
    pub adjusted_target: f64,
    pub cumulative_target: f64,
    pub capacity: WeekCapacity,
    pub difficulty: Difficulty,
    #[serde(default)]
    pub is_catch_up_week: bool,
    #[serde(default)]
    pub catch_up_amount: f64,
    #[serde(default)]
    pub status: MilestoneStatus,
}

impl DynamicMilestone {
    pub fn is_protected(&self) -> bool {
        self.capacity.is_protected_week
    }
}

//
// ================= Retroplan =================
//

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct CapacityCounts {
    pub high: usize,
    pub medium: usize,
    pub low: usize,
    pub protected: usize,
}

impl CapacityCounts {
    pub fn from_milestones(milestones: &[DynamicMilestone]) -> Self {
        let mut counts = Self::default();
        for milestone in milestones {
            match milestone.capacity.capacity_category {
                CapacityCategory::High => counts.high += 1,
                CapacityCategory::Medium => counts.medium += 1,
                CapacityCategory::Low => counts.low += 1,
                CapacityCategory::Protected => counts.protected += 1,
            }
        }
        counts
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
pub struct ConfidenceInterval {
    pub low: f64,
    pub high: f64,
}

/// One immutable plan per goal; regeneration and catch-up supersede it
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Retroplan {
    pub id: Uuid,
    pub goal_id: Uuid,
    pub user_id: Uuid,
    pub start_date: NaiveDate,
    pub config: RetroplanConfig,
    pub milestones: Vec<DynamicMilestone>,
    pub capacity_counts: CapacityCounts,
    pub feasibility_score: f64,
    pub confidence_interval: ConfidenceInterval,
    pub risk_factors: Vec<String>,
    pub front_loaded_percentage: f64,
    pub buffer_utilization: f64,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    /// Plan this one replaced, if any
    #[serde(default)]
    pub supersedes: Option<Uuid>,
}

impl Retroplan {
    pub fn total_weeks(&self) -> usize {
        self.milestones.len()
    }

    pub fn milestone(&self, week_number: u32) -> Option<&DynamicMilestone> {
        self.milestones.iter().find(|m| m.week_number == week_number)
    }
}

impl fmt::Display for CapacityCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            CapacityCategory::High => "high",
            CapacityCategory::Medium => "medium",
            CapacityCategory::Low => "low",
            CapacityCategory::Protected => "protected",
        };
        write!(f, "{}", s)
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Difficulty::Easy => "easy",
            Difficulty::Moderate => "moderate",
            Difficulty::Challenging => "challenging",
            Difficulty::Protected => "protected",
        };
        write!(f, "{}", s)
    }
}
