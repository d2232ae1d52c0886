//! Retroplan coordinator
//!
//! GENERATE → PERSIST → AUDIT
//! PROGRESS → CATCH-UP → SUPERSEDE → PERSIST → AUDIT
//!
//! Async service in front of the pure engine. Each goal has exactly one
//! active plan in the store; every write produces a new plan version.

use crate::audit::{compute_fingerprint, AuditKind, AuditLog, AuditRecord};
use crate::calendar::{project, CalendarViewData};
use crate::catch_up::apply_catch_up;
use crate::error::RetroplanError;
use crate::models::{GenerateRetroplanRequest, Retroplan};
use crate::planner::{supersede, RetroplanGenerator};
use crate::state::RetroplanStore;
use crate::Result;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressReport {
    pub current_week: u32,
    pub actual_progress: f64,
}

/// Result of recording progress against the active plan
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProgressResult {
    pub plan: Retroplan,
    pub deficit: f64,
    pub absorbed: f64,
    pub unresolved: f64,
    pub catch_up_weeks: Vec<u32>,
    pub audit_id: Uuid,
}

/// Coordinates generation, catch-up, persistence and auditing
pub struct RetroplanCoordinator {
    generator: RetroplanGenerator,
    store: Box<dyn RetroplanStore>,
    audit_log: AuditLog,
}

impl RetroplanCoordinator {
    pub fn new(
        generator: RetroplanGenerator,
        store: Box<dyn RetroplanStore>,
        audit_log: AuditLog,
    ) -> Self {
        Self {
            generator,
            store,
            audit_log,
        }
    }

    pub fn audit_log(&self) -> &AuditLog {
        &self.audit_log
    }

    /// Generate a plan and make it the goal's active plan
    pub async fn generate(&self, request: GenerateRetroplanRequest) -> Result<Retroplan> {
        let start_time = Instant::now();
        let today = Utc::now().date_naive();

        let mut plan = self.generator.generate(&request, today)?;

        if let Some(previous) = self.store.load_active(request.goal_id).await? {
            debug!(
                goal_id = ?request.goal_id,
                previous_plan = ?previous.id,
                "Regenerating: previous plan will be superseded"
            );
            plan.supersedes = Some(previous.id);
        }

        let record = audit_record(
            &plan,
            AuditKind::Generated,
            compute_fingerprint(&request)?,
            start_time,
        )?;
        self.store.save_active(&plan).await?;
        self.audit(&plan, record).await?;

        Ok(plan)
    }

    /// Apply a weekly checkpoint to the active plan and store the result
    pub async fn record_progress(
        &self,
        goal_id: Uuid,
        report: ProgressReport,
    ) -> Result<ProgressResult> {
        let start_time = Instant::now();

        let current = self
            .store
            .load_active(goal_id)
            .await?
            .ok_or(RetroplanError::PlanNotFound(goal_id))?;

        let outcome = apply_catch_up(
            &current.milestones,
            report.current_week,
            report.actual_progress,
            &current.config,
        )?;

        let mut plan = supersede(&current, outcome.milestones.clone());
        if outcome.is_at_risk() {
            warn!(
                goal_id = ?goal_id,
                unresolved = outcome.unresolved,
                "Goal at risk after catch-up"
            );
            plan.risk_factors.push(format!(
                "Catch-up at week {} left {:.0} unplanned",
                report.current_week, outcome.unresolved
            ));
        }

        let record = audit_record(
            &plan,
            AuditKind::CatchUp,
            compute_fingerprint(&(current.id, &report))?,
            start_time,
        )?;
        self.store.save_active(&plan).await?;
        let audit_id = self.audit(&plan, record).await?;

        Ok(ProgressResult {
            plan,
            deficit: outcome.deficit,
            absorbed: outcome.absorbed,
            unresolved: outcome.unresolved,
            catch_up_weeks: outcome.catch_up_weeks,
            audit_id,
        })
    }

    pub async fn active_plan(&self, goal_id: Uuid) -> Result<Retroplan> {
        self.store
            .load_active(goal_id)
            .await?
            .ok_or(RetroplanError::PlanNotFound(goal_id))
    }

    pub async fn calendar(&self, goal_id: Uuid) -> Result<Vec<CalendarViewData>> {
        let plan = self.active_plan(goal_id).await?;
        Ok(project(&plan))
    }

    async fn audit(&self, plan: &Retroplan, record: AuditRecord) -> Result<Uuid> {
        let kind = record.kind;
        let audit_id = self.audit_log.record(record).await?;

        info!(
            audit_id = ?audit_id,
            plan_id = ?plan.id,
            goal_id = ?plan.goal_id,
            kind = %kind,
            "Plan version recorded"
        );

        Ok(audit_id)
    }
}

/// Built before the plan is stored so a fingerprint failure leaves the store untouched
fn audit_record(
    plan: &Retroplan,
    kind: AuditKind,
    input_fingerprint: String,
    start_time: Instant,
) -> Result<AuditRecord> {
    Ok(AuditRecord {
        audit_id: Uuid::new_v4(),
        plan_id: plan.id,
        goal_id: plan.goal_id,
        user_id: plan.user_id,
        kind,
        input_fingerprint,
        milestones_fingerprint: compute_fingerprint(&plan.milestones)?,
        milestones: Arc::new(plan.milestones.clone()),
        feasibility_score: plan.feasibility_score,
        duration_ms: start_time.elapsed().as_millis() as u64,
        created_at: Utc::now(),
    })
}

impl Default for RetroplanCoordinator {
    fn default() -> Self {
        Self::new(
            RetroplanGenerator::default(),
            Box::new(crate::state::InMemoryRetroplanStore::new()),
            AuditLog::new(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::MilestoneStatus;
    use crate::test_utils::sample_request;
    use tokio_test::{assert_err, assert_ok};

    /// Plan starting today so the coordinator's clock does not matter
    fn request(goal: f64, weeks: i64) -> GenerateRetroplanRequest {
        let mut request = sample_request(goal, weeks);
        let today = Utc::now().date_naive();
        request.start_date = Some(today);
        request.deadline = today + chrono::Duration::weeks(weeks);
        request
    }

    #[tokio::test]
    async fn test_generate_persists_and_audits() {
        let coordinator = RetroplanCoordinator::default();
        let req = request(800.0, 8);
        let goal_id = req.goal_id;

        let plan = assert_ok!(coordinator.generate(req).await);

        let active = assert_ok!(coordinator.active_plan(goal_id).await);
        assert_eq!(active.id, plan.id);

        let audits = coordinator.audit_log().list_for_goal(goal_id).await.unwrap();
        assert_eq!(audits.len(), 1);
        let record = coordinator.audit_log().get(audits[0]).await.unwrap().unwrap();
        assert_eq!(record.kind, AuditKind::Generated);
        assert_eq!(record.plan_id, plan.id);
        assert!(coordinator.audit_log().verify_integrity(audits[0]).await.unwrap());
    }

    #[tokio::test]
    async fn test_every_stored_version_has_an_audit_record() {
        let coordinator = RetroplanCoordinator::default();
        let req = request(800.0, 8);
        let goal_id = req.goal_id;

        let mut rejected = req.clone();
        rejected.goal_amount = -5.0;
        assert_err!(coordinator.generate(rejected).await);
        assert_err!(coordinator.active_plan(goal_id).await);
        assert!(coordinator.audit_log().list_for_goal(goal_id).await.unwrap().is_empty());

        let plan = coordinator.generate(req).await.unwrap();
        let audits = coordinator.audit_log().list_for_goal(goal_id).await.unwrap();
        let record = coordinator.audit_log().get(audits[0]).await.unwrap().unwrap();
        assert_eq!(record.plan_id, plan.id);
        assert_eq!(
            record.milestones_fingerprint,
            compute_fingerprint(&plan.milestones).unwrap()
        );
        assert_eq!(record.input_fingerprint.len(), 64);
    }

    #[tokio::test]
    async fn test_regeneration_supersedes_active_plan() {
        let coordinator = RetroplanCoordinator::default();
        let req = request(800.0, 8);
        let goal_id = req.goal_id;

        let first = coordinator.generate(req.clone()).await.unwrap();
        let second = coordinator.generate(req).await.unwrap();

        assert_eq!(second.supersedes, Some(first.id));
        let active = coordinator.active_plan(goal_id).await.unwrap();
        assert_eq!(active.id, second.id);
    }

    #[tokio::test]
    async fn test_record_progress_applies_catch_up() {
        let coordinator = RetroplanCoordinator::default();
        let req = request(800.0, 8);
        let goal_id = req.goal_id;
        let plan = coordinator.generate(req).await.unwrap();

        let planned = plan.milestones[2].cumulative_target;
        let result = coordinator
            .record_progress(
                goal_id,
                ProgressReport {
                    current_week: 3,
                    actual_progress: planned - 60.0,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.deficit, 60.0);
        assert_eq!(result.plan.supersedes, Some(plan.id));
        assert_eq!(result.plan.milestones[2].status, MilestoneStatus::Behind);
        assert!(!result.catch_up_weeks.is_empty());

        let active = coordinator.active_plan(goal_id).await.unwrap();
        assert_eq!(active.id, result.plan.id);

        let audits = coordinator.audit_log().list_for_goal(goal_id).await.unwrap();
        assert_eq!(audits.len(), 2);
        assert_eq!(*audits.last().unwrap(), result.audit_id);
    }

    #[tokio::test]
    async fn test_unresolved_deficit_adds_risk_factor() {
        let coordinator = RetroplanCoordinator::default();
        let req = request(800.0, 8);
        let goal_id = req.goal_id;
        coordinator.generate(req).await.unwrap();

        let result = coordinator
            .record_progress(
                goal_id,
                ProgressReport {
                    current_week: 8,
                    actual_progress: 500.0,
                },
            )
            .await
            .unwrap();

        assert_eq!(result.unresolved, 300.0);
        assert!(result
            .plan
            .risk_factors
            .iter()
            .any(|r| r.contains("week 8")));
    }

    #[tokio::test]
    async fn test_unknown_goal_is_not_found() {
        let coordinator = RetroplanCoordinator::default();
        let goal_id = Uuid::new_v4();

        let err = assert_err!(coordinator.active_plan(goal_id).await);
        assert!(matches!(err, RetroplanError::PlanNotFound(id) if id == goal_id));

        let err = assert_err!(
            coordinator
                .record_progress(
                    goal_id,
                    ProgressReport {
                        current_week: 1,
                        actual_progress: 0.0
                    }
                )
                .await
        );
        assert!(matches!(err, RetroplanError::PlanNotFound(_)));
    }

    #[tokio::test]
    async fn test_calendar_of_active_plan() {
        let coordinator = RetroplanCoordinator::default();
        let req = request(800.0, 8);
        let goal_id = req.goal_id;
        coordinator.generate(req).await.unwrap();

        let months = coordinator.calendar(goal_id).await.unwrap();
        let weeks: usize = months.iter().map(|m| m.weeks.len()).sum();
        assert_eq!(weeks, 8);
    }
}
