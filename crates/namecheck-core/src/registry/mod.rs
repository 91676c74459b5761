//! Plugin-based checker registry
//!
//! The registry maps each [`CheckType`] to the [`Checker`] that answers it,
//! so the orchestrator never branches on provider names.
//!
//! ## Usage
//!
//! ```rust,ignore
//! use namecheck_core::registry::CheckerRegistry;
//!
//! let registry = CheckerRegistry::new();
//! registry.register(Arc::new(npm_checker));
//! registry.register(Arc::new(domain_checker));
//!
//! let checker = registry.get(CheckType::Npm);
//! ```
//!
//! ## Registration
//!
//! Checker crates expose a helper that fills a registry:
//!
//! ```rust,ignore
//! // In namecheck-http
//! pub fn register_defaults(
//!     registry: &CheckerRegistry,
//!     options: &HttpOptions,
//! ) -> Result<Vec<CheckType>> {
//!     let checker = HttpChecker::public(CheckType::Npm)?;
//!     registry.register(Arc::new(checker));
//!     // ...
//! }
//! ```

use crate::traits::Checker;
use crate::types::CheckType;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

/// Checker registry keyed by check type
///
/// ## Thread Safety
///
/// The registry uses interior mutability with RwLock, allowing concurrent
/// reads and exclusive writes.
#[derive(Default)]
pub struct CheckerRegistry {
    checkers: RwLock<HashMap<CheckType, Arc<dyn Checker>>>,
}

impl CheckerRegistry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a checker under its own [`Checker::check_type`]
    ///
    /// A checker already registered for the same type is replaced and
    /// returned.
    pub fn register(&self, checker: Arc<dyn Checker>) -> Option<Arc<dyn Checker>> {
        let check_type = checker.check_type();
        let mut checkers = self.checkers.write().unwrap_or_else(|e| e.into_inner());
        let previous = checkers.insert(check_type, checker);
        if previous.is_some() {
            tracing::debug!("Replaced checker for {}", check_type);
        }
        previous
    }

    /// Remove the checker for a type
    pub fn unregister(&self, check_type: CheckType) -> Option<Arc<dyn Checker>> {
        let mut checkers = self.checkers.write().unwrap_or_else(|e| e.into_inner());
        checkers.remove(&check_type)
    }

    /// Look up the checker for a type
    ///
    /// # Returns
    ///
    /// - `Some(checker)`: A checker is configured for this type
    /// - `None`: No checker; the orchestrator treats the target as unsupported
    pub fn get(&self, check_type: CheckType) -> Option<Arc<dyn Checker>> {
        let checkers = self.checkers.read().unwrap_or_else(|e| e.into_inner());
        checkers.get(&check_type).cloned()
    }

    /// Check if a checker is registered for a type
    pub fn has(&self, check_type: CheckType) -> bool {
        let checkers = self.checkers.read().unwrap_or_else(|e| e.into_inner());
        checkers.contains_key(&check_type)
    }

    /// List registered check types, sorted
    pub fn list(&self) -> Vec<CheckType> {
        let checkers = self.checkers.read().unwrap_or_else(|e| e.into_inner());
        let mut types: Vec<CheckType> = checkers.keys().copied().collect();
        types.sort();
        types
    }
}

impl std::fmt::Debug for CheckerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CheckerRegistry")
            .field("checkers", &self.list())
            .finish()
    }
}
