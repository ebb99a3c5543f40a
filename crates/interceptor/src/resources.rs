use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use swarmgate_core::{Error, ResourceLimits, Result};
use tokio::sync::Mutex;
use tracing::{debug, warn};

/// Who consumes an allocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConsumerType {
    /// A routine run started by a bot.
    Run,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceRequest {
    pub consumer_type: ConsumerType,
    pub limits: ResourceLimits,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceAllocation {
    pub id: String,
    pub chat_id: String,
    pub consumer_type: ConsumerType,
    pub limits: ResourceLimits,
    pub allocated_at: DateTime<Utc>,
}

/// Owner of the per-conversation resource budget.
#[async_trait]
pub trait SwarmContextManager: Send + Sync {
    async fn allocate_resources(
        &self,
        chat_id: &str,
        request: ResourceRequest,
    ) -> Result<ResourceAllocation>;

    async fn release_resources(&self, allocation_id: &str) -> Result<()>;
}

/// Tracks live allocations in memory and caps the credits reserved per chat.
#[derive(Clone)]
pub struct InMemoryContextManager {
    credit_budget: u64,
    allocations: Arc<Mutex<HashMap<String, ResourceAllocation>>>,
}

impl InMemoryContextManager {
    /// `credit_budget` caps the credits reserved at once by one chat.
    pub fn new(credit_budget: u64) -> Self {
        Self {
            credit_budget,
            allocations: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub async fn live_allocations(&self) -> usize {
        self.allocations.lock().await.len()
    }

    pub async fn reserved_credits(&self, chat_id: &str) -> u64 {
        let allocations = self.allocations.lock().await;
        allocations
            .values()
            .filter(|a| a.chat_id == chat_id)
            .map(|a| a.limits.max_credits)
            .sum()
    }
}

impl Default for InMemoryContextManager {
    fn default() -> Self {
        Self::new(10_000)
    }
}

#[async_trait]
impl SwarmContextManager for InMemoryContextManager {
    async fn allocate_resources(
        &self,
        chat_id: &str,
        request: ResourceRequest,
    ) -> Result<ResourceAllocation> {
        let mut allocations = self.allocations.lock().await;
        let reserved: u64 = allocations
            .values()
            .filter(|a| a.chat_id == chat_id)
            .map(|a| a.limits.max_credits)
            .sum();

        if reserved + request.limits.max_credits > self.credit_budget {
            warn!(
                chat_id = %chat_id,
                reserved,
                requested = request.limits.max_credits,
                budget = self.credit_budget,
                "Credit budget exhausted"
            );
            return Err(Error::ResourceAllocation(format!(
                "chat '{}' would exceed its credit budget ({} + {} > {})",
                chat_id, reserved, request.limits.max_credits, self.credit_budget
            )));
        }

        let allocation = ResourceAllocation {
            id: uuid::Uuid::new_v4().to_string(),
            chat_id: chat_id.to_string(),
            consumer_type: request.consumer_type,
            limits: request.limits,
            allocated_at: Utc::now(),
        };
        allocations.insert(allocation.id.clone(), allocation.clone());
        debug!(allocation_id = %allocation.id, chat_id = %chat_id, "Resources allocated");
        Ok(allocation)
    }

    async fn release_resources(&self, allocation_id: &str) -> Result<()> {
        let mut allocations = self.allocations.lock().await;
        match allocations.remove(allocation_id) {
            Some(_) => {
                debug!(allocation_id = %allocation_id, "Resources released");
                Ok(())
            }
            None => Err(Error::ResourceRelease(format!(
                "unknown allocation '{}'",
                allocation_id
            ))),
        }
    }
}
