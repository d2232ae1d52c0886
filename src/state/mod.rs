//! Retroplan persistence layer
//!
//! Stores every generated plan version; at most one is active per goal.
//! Currently in-memory; the trait is the seam for a database-backed store.

use crate::models::Retroplan;
use crate::Result;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;
use uuid::Uuid;

/// Trait for retroplan persistence
#[async_trait::async_trait]
pub trait RetroplanStore: Send + Sync {
    /// Store `plan` as the active plan of its goal; earlier versions are deactivated
    async fn save_active(&self, plan: &Retroplan) -> Result<()>;
    async fn load_active(&self, goal_id: Uuid) -> Result<Option<Retroplan>>;
    async fn load(&self, plan_id: Uuid) -> Result<Option<Retroplan>>;
    /// All versions for a user, oldest first
    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Retroplan>>;
}

/// In-memory store for development and tests
pub struct InMemoryRetroplanStore {
    plans: Arc<RwLock<HashMap<Uuid, Retroplan>>>,
    active_by_goal: Arc<RwLock<HashMap<Uuid, Uuid>>>, // goal_id → plan_id
}

impl InMemoryRetroplanStore {
    pub fn new() -> Self {
        Self {
            plans: Arc::new(RwLock::new(HashMap::new())),
            active_by_goal: Arc::new(RwLock::new(HashMap::new())),
        }
    }
}

impl Default for InMemoryRetroplanStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait::async_trait]
impl RetroplanStore for InMemoryRetroplanStore {
    async fn save_active(&self, plan: &Retroplan) -> Result<()> {
        // Lock order: plans, then active_by_goal
        let mut plans = self.plans.write().await;
        let mut active = self.active_by_goal.write().await;

        if let Some(previous_id) = active.insert(plan.goal_id, plan.id) {
            if previous_id != plan.id {
                if let Some(previous) = plans.get_mut(&previous_id) {
                    previous.is_active = false;
                }
            }
        }

        let mut stored = plan.clone();
        stored.is_active = true;
        plans.insert(stored.id, stored);

        Ok(())
    }

    async fn load_active(&self, goal_id: Uuid) -> Result<Option<Retroplan>> {
        let plans = self.plans.read().await;
        let active = self.active_by_goal.read().await;

        Ok(active
            .get(&goal_id)
            .and_then(|plan_id| plans.get(plan_id))
            .cloned())
    }

    async fn load(&self, plan_id: Uuid) -> Result<Option<Retroplan>> {
        let plans = self.plans.read().await;
        Ok(plans.get(&plan_id).cloned())
    }

    async fn list_for_user(&self, user_id: Uuid) -> Result<Vec<Retroplan>> {
        let plans = self.plans.read().await;

        let mut items: Vec<Retroplan> = plans
            .values()
            .filter(|plan| plan.user_id == user_id)
            .cloned()
            .collect();
        items.sort_by_key(|plan| plan.created_at);

        Ok(items)
    }
}
