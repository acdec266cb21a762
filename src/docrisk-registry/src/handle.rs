//! Replace-then-publish registry handle.
//!
//! Readers take an `Arc` snapshot and query it without holding any lock.
//! Reloads build a complete new snapshot off to the side and swap it in
//! under a short write lock, so no reader ever observes a half-built
//! registry.

use std::path::Path;
use std::sync::{Arc, RwLock};

use tracing::{info, warn};

use crate::error::RegistryError;
use crate::snapshot::{BrokerRegistry, MatchPolicy};
use crate::store::load_registry;

#[derive(Debug, Clone)]
enum RegistryState {
    Ready(Arc<BrokerRegistry>),
    Unavailable(String),
}

/// Shared handle to the current registry snapshot.
#[derive(Debug)]
pub struct RegistryHandle {
    state: RwLock<RegistryState>,
}

impl RegistryHandle {
    /// Create a handle serving the given snapshot.
    pub fn new(registry: BrokerRegistry) -> Self {
        Self {
            state: RwLock::new(RegistryState::Ready(Arc::new(registry))),
        }
    }

    /// Create a handle with no snapshot. Every read fails with
    /// [`RegistryError::Unavailable`] until something is published.
    pub fn unavailable(reason: impl Into<String>) -> Self {
        Self {
            state: RwLock::new(RegistryState::Unavailable(reason.into())),
        }
    }

    /// Load a snapshot from disk. A failed load yields an unavailable
    /// handle instead of an error, so callers can still serve degraded
    /// assessments.
    pub fn load_or_unavailable(path: &Path, policy: MatchPolicy) -> Self {
        match load_registry(path, policy) {
            Ok(registry) => Self::new(registry),
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Broker registry unavailable");
                Self::unavailable(e.to_string())
            },
        }
    }

    /// Current snapshot.
    pub fn snapshot(&self) -> Result<Arc<BrokerRegistry>, RegistryError> {
        let state = self
            .state
            .read()
            .map_err(|_| RegistryError::Unavailable {
                reason: "registry lock poisoned".to_string(),
            })?;
        match &*state {
            RegistryState::Ready(registry) => Ok(Arc::clone(registry)),
            RegistryState::Unavailable(reason) => Err(RegistryError::Unavailable {
                reason: reason.clone(),
            }),
        }
    }

    /// Atomically replace the served snapshot.
    pub fn publish(&self, registry: BrokerRegistry) {
        let next = RegistryState::Ready(Arc::new(registry));
        match self.state.write() {
            Ok(mut state) => *state = next,
            Err(poisoned) => *poisoned.into_inner() = next,
        }
    }

    /// Build a new snapshot from disk and publish it.
    ///
    /// On failure the previously published snapshot keeps serving.
    pub fn reload(&self, path: &Path, policy: MatchPolicy) -> Result<usize, RegistryError> {
        let registry = load_registry(path, policy)?;
        let count = registry.len();
        self.publish(registry);
        info!(path = %path.display(), brokers = count, "Published new registry snapshot");
        Ok(count)
    }

    /// True if a snapshot is being served.
    pub fn is_available(&self) -> bool {
        self.snapshot().is_ok()
    }
}
