//! In-process analysis store.
//!
//! Backs tests and local runs without a database. Follows the same
//! owner-scoping rules as the relational store.

use crate::model::{Analysis, AnalysisDraft, AnalysisSummary};
use crate::store::AnalysisStore;
use async_trait::async_trait;
use chrono::{DateTime, TimeDelta, Utc};
use greek_study_core::{AnalysisId, StoreError, UserId};
use rootcause::prelude::Report;
use std::collections::BTreeMap;
use tokio::sync::RwLock;

const ENTITY: &str = "analysis";

#[derive(Debug, Default)]
struct Inner {
    rows: BTreeMap<AnalysisId, Analysis>,
    last_id: i64,
    last_stamp: Option<DateTime<Utc>>,
}

impl Inner {
    /// Returns a timestamp strictly after every previous one.
    fn stamp(&mut self) -> DateTime<Utc> {
        let now = Utc::now();
        let stamp = match self.last_stamp {
            Some(last) if now <= last => last + TimeDelta::microseconds(1),
            _ => now,
        };
        self.last_stamp = Some(stamp);
        stamp
    }

    fn owned_mut(&mut self, user_id: UserId, id: AnalysisId) -> Option<&mut Analysis> {
        self.rows.get_mut(&id).filter(|a| a.user_id == user_id)
    }
}

/// Analysis store held in memory.
#[derive(Debug, Default)]
pub struct MemoryAnalysisStore {
    inner: RwLock<Inner>,
}

impl MemoryAnalysisStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl AnalysisStore for MemoryAnalysisStore {
    async fn insert(
        &self,
        user_id: UserId,
        draft: &AnalysisDraft,
    ) -> Result<AnalysisId, Report<StoreError>> {
        let mut inner = self.inner.write().await;
        inner.last_id += 1;
        let id = AnalysisId::new(inner.last_id);
        let now = inner.stamp();
        inner.rows.insert(
            id,
            Analysis {
                id,
                user_id,
                title: draft.title.clone(),
                description: draft.description.clone(),
                details: draft.details.clone(),
                created_at: now,
                updated_at: now,
            },
        );
        Ok(id)
    }

    async fn update(
        &self,
        user_id: UserId,
        id: AnalysisId,
        draft: &AnalysisDraft,
    ) -> Result<(), Report<StoreError>> {
        let mut inner = self.inner.write().await;
        let now = inner.stamp();
        let row = inner
            .owned_mut(user_id, id)
            .ok_or_else(|| StoreError::not_found(ENTITY, id))?;
        row.title.clone_from(&draft.title);
        row.description.clone_from(&draft.description);
        row.details = draft.details.clone();
        row.updated_at = now;
        Ok(())
    }

    async fn get(&self, user_id: UserId, id: AnalysisId) -> Result<Analysis, Report<StoreError>> {
        let inner = self.inner.read().await;
        inner
            .rows
            .get(&id)
            .filter(|a| a.user_id == user_id)
            .cloned()
            .ok_or_else(|| StoreError::not_found(ENTITY, id).into())
    }

    async fn most_recent(&self, user_id: UserId) -> Result<Analysis, Report<StoreError>> {
        let inner = self.inner.read().await;
        inner
            .rows
            .values()
            .filter(|a| a.user_id == user_id)
            .max_by_key(|a| (a.updated_at, a.id))
            .cloned()
            .ok_or_else(|| StoreError::not_found(ENTITY, "most recent").into())
    }

    async fn list(&self, user_id: UserId) -> Result<Vec<AnalysisSummary>, Report<StoreError>> {
        let inner = self.inner.read().await;
        let mut owned: Vec<&Analysis> = inner
            .rows
            .values()
            .filter(|a| a.user_id == user_id)
            .collect();
        owned.sort_by(|a, b| (b.updated_at, b.id).cmp(&(a.updated_at, a.id)));
        Ok(owned.into_iter().map(Analysis::summary).collect())
    }

    async fn delete(&self, user_id: UserId, id: AnalysisId) -> Result<(), Report<StoreError>> {
        let mut inner = self.inner.write().await;
        if inner.owned_mut(user_id, id).is_none() {
            return Err(StoreError::not_found(ENTITY, id).into());
        }
        inner.rows.remove(&id);
        Ok(())
    }
}
