//! PlanPersistenceAdapter
//!
//! The pipeline hands accepted plans to a [`PlanStore`] and keeps only the
//! returned id. [`SqlitePlanStore`] is the durable implementation.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Mutex;

use async_trait::async_trait;
use planstore::{Store, StoreError};
use thiserror::Error;
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::StudyPlan;

/// Collection holding persisted study plans
pub const PLAN_COLLECTION: &str = "study_plans";

/// Errors from plan persistence
#[derive(Debug, Error)]
pub enum PlanStoreError {
    #[error("Plan not found: {0}")]
    NotFound(String),

    #[error("Storage error: {0}")]
    Backend(#[from] StoreError),
}

/// Durable plan storage
#[async_trait]
pub trait PlanStore: Send + Sync {
    /// Persist a plan under its owning request, returning the plan id
    async fn save(&self, owner: &str, plan: &StudyPlan) -> Result<String, PlanStoreError>;

    async fn load(&self, plan_id: &str) -> Result<StudyPlan, PlanStoreError>;
}

/// SQLite-backed plan store
pub struct SqlitePlanStore {
    store: Mutex<Store>,
}

impl SqlitePlanStore {
    pub fn open(path: impl AsRef<Path>) -> Result<Self, PlanStoreError> {
        debug!(path = %path.as_ref().display(), "SqlitePlanStore::open: called");
        Ok(Self {
            store: Mutex::new(Store::open(path)?),
        })
    }

    pub fn open_in_memory() -> Result<Self, PlanStoreError> {
        Ok(Self {
            store: Mutex::new(Store::open_in_memory()?),
        })
    }
}

#[async_trait]
impl PlanStore for SqlitePlanStore {
    async fn save(&self, owner: &str, plan: &StudyPlan) -> Result<String, PlanStoreError> {
        debug!(%owner, phases = plan.phases.len(), "SqlitePlanStore::save: called");
        let store = self.store.lock().unwrap_or_else(|p| p.into_inner());
        let id = store.insert(PLAN_COLLECTION, Some(owner), plan)?;
        info!(plan_id = %id, %owner, "Persisted study plan");
        Ok(id)
    }

    async fn load(&self, plan_id: &str) -> Result<StudyPlan, PlanStoreError> {
        debug!(%plan_id, "SqlitePlanStore::load: called");
        let store = self.store.lock().unwrap_or_else(|p| p.into_inner());
        store
            .get::<StudyPlan>(PLAN_COLLECTION, plan_id)?
            .map(|record| record.body)
            .ok_or_else(|| PlanStoreError::NotFound(plan_id.to_string()))
    }
}

/// In-memory plan store, for tests
#[derive(Default)]
pub struct MemoryPlanStore {
    plans: Mutex<HashMap<String, (String, StudyPlan)>>,
}

impl MemoryPlanStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.plans.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Owner recorded for a plan
    pub fn owner_of(&self, plan_id: &str) -> Option<String> {
        self.plans
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(plan_id)
            .map(|(owner, _)| owner.clone())
    }
}

#[async_trait]
impl PlanStore for MemoryPlanStore {
    async fn save(&self, owner: &str, plan: &StudyPlan) -> Result<String, PlanStoreError> {
        let id = Uuid::now_v7().to_string();
        self.plans
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .insert(id.clone(), (owner.to_string(), plan.clone()));
        Ok(id)
    }

    async fn load(&self, plan_id: &str) -> Result<StudyPlan, PlanStoreError> {
        self.plans
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .get(plan_id)
            .map(|(_, plan)| plan.clone())
            .ok_or_else(|| PlanStoreError::NotFound(plan_id.to_string()))
    }
}
