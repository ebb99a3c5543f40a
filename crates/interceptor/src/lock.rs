//! Mutual exclusion keyed by string.
//!
//! The interceptor serializes work on one event id through a [`LockService`].
//! [`InMemoryLockService`] covers single-process deployments; a distributed
//! implementation only has to honor the same acquire/release contract.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use swarmgate_core::{Error, Result};
use tokio::sync::OwnedMutexGuard;
use tracing::debug;

#[derive(Debug, Clone, Copy)]
pub struct LockOptions {
    /// How long to wait for a contended key before giving up.
    pub timeout: Duration,
}

/// A held lock. `release` is idempotent.
#[async_trait]
pub trait Lock: Send + Sync {
    fn key(&self) -> &str;
    async fn release(&mut self) -> Result<()>;
}

#[async_trait]
pub trait LockService: Send + Sync {
    async fn acquire(&self, key: &str, options: LockOptions) -> Result<Box<dyn Lock>>;
}

type LockTable = Arc<Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>>;

#[derive(Clone, Default)]
pub struct InMemoryLockService {
    locks: LockTable,
}

impl InMemoryLockService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently tracked (held or awaited).
    pub fn tracked_keys(&self) -> usize {
        self.locks
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    pub fn is_held(&self, key: &str) -> bool {
        let table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        table
            .get(key)
            .map(|m| m.try_lock().is_err())
            .unwrap_or(false)
    }
}

#[async_trait]
impl LockService for InMemoryLockService {
    async fn acquire(&self, key: &str, options: LockOptions) -> Result<Box<dyn Lock>> {
        let entry = {
            let mut table = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            table
                .entry(key.to_string())
                .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
                .clone()
        };

        match tokio::time::timeout(options.timeout, entry.clone().lock_owned()).await {
            Ok(guard) => {
                debug!(key = %key, "Lock acquired");
                Ok(Box::new(InMemoryLock {
                    key: key.to_string(),
                    guard: Some(guard),
                    entry,
                    table: self.locks.clone(),
                }))
            }
            Err(_) => Err(Error::Lock(format!(
                "timed out after {}ms waiting for '{}'",
                options.timeout.as_millis(),
                key
            ))),
        }
    }
}

struct InMemoryLock {
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
    entry: Arc<tokio::sync::Mutex<()>>,
    table: LockTable,
}

#[async_trait]
impl Lock for InMemoryLock {
    fn key(&self) -> &str {
        &self.key
    }

    async fn release(&mut self) -> Result<()> {
        let Some(guard) = self.guard.take() else {
            return Ok(());
        };
        drop(guard);

        // Forget the key once nobody else holds or waits on it.
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        if Arc::strong_count(&self.entry) == 2 {
            table.remove(&self.key);
        }
        debug!(key = %self.key, "Lock released");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opts(ms: u64) -> LockOptions {
        LockOptions {
            timeout: Duration::from_millis(ms),
        }
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let service = InMemoryLockService::new();
        let mut lock = service.acquire("event_interception:e1", opts(50)).await.unwrap();
        assert_eq!(lock.key(), "event_interception:e1");
        assert!(service.is_held("event_interception:e1"));

        lock.release().await.unwrap();
        lock.release().await.unwrap();
        assert!(!service.is_held("event_interception:e1"));
        assert_eq!(service.tracked_keys(), 0);
    }

    #[tokio::test]
    async fn test_contended_key_times_out() {
        let service = InMemoryLockService::new();
        let _held = service.acquire("k", opts(50)).await.unwrap();
        let err = service.acquire("k", opts(20)).await.err().unwrap();
        assert!(matches!(err, Error::Lock(_)));
    }

    #[tokio::test]
    async fn test_distinct_keys_do_not_contend() {
        let service = InMemoryLockService::new();
        let _a = service.acquire("a", opts(20)).await.unwrap();
        assert!(service.acquire("b", opts(20)).await.is_ok());
    }

    #[tokio::test]
    async fn test_waiter_gets_lock_after_release() {
        let service = InMemoryLockService::new();
        let mut first = service.acquire("k", opts(50)).await.unwrap();

        let waiter = {
            let service = service.clone();
            tokio::spawn(async move { service.acquire("k", opts(1000)).await.map(|_| ()) })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;
        first.release().await.unwrap();

        assert!(waiter.await.unwrap().is_ok());
    }
}
