// Copyright (c) 2025 - Hotswap Core Contributors
//! Capability Registry
//!
//! Resolution boundary between the decision core and its infrastructure
//! adapters. The registry is explicitly constructed and passed by reference
//! (usually behind an `Arc`) - there is no process-global singleton.
//!
//! # Usage
//!
//! ```rust
//! use std::sync::Arc;
//! use hotswap_core::registry::CapabilityRegistry;
//! use hotswap_core::event_store::{EventStore, InMemoryEventStore};
//!
//! let registry = CapabilityRegistry::new();
//! let store: Arc<dyn EventStore> = Arc::new(InMemoryEventStore::new());
//! registry.register::<dyn EventStore>(store);
//!
//! let resolved = registry.resolve::<dyn EventStore>().expect("store registered");
//! ```
//!
//! # Semantics
//!
//! - All registrations for a capability are retained in order; the first is
//!   the default. `resolve_all` supports composition and fallback.
//! - Re-registering the identical adapter instance (pointer-equal `Arc`) is
//!   a no-op.
//! - Resolution failure is a loud
//!   [`HotswapError::MissingCapability`](crate::HotswapError::MissingCapability);
//!   a missing capability must never be silently skipped.
//! - The default adapter is cached after first lookup; resolution takes a
//!   read lock only. Registration (writes) is expected during
//!   initialization and test setup.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::errors::{HotswapError, HotswapResult};

type AnyAdapter = Box<dyn Any + Send + Sync>;

/// Explicitly constructed capability registry
#[derive(Default)]
pub struct CapabilityRegistry {
    registrations: RwLock<HashMap<TypeId, Vec<AnyAdapter>>>,
    cache: RwLock<HashMap<TypeId, AnyAdapter>>,
}

fn read_lock<T>(lock: &RwLock<T>) -> RwLockReadGuard<'_, T> {
    lock.read().unwrap_or_else(|poisoned| poisoned.into_inner())
}

fn write_lock<T>(lock: &RwLock<T>) -> RwLockWriteGuard<'_, T> {
    lock.write().unwrap_or_else(|poisoned| poisoned.into_inner())
}

impl CapabilityRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an adapter under the capability type `C`
    ///
    /// `C` is usually a trait object type, e.g.
    /// `register::<dyn EventStore>(store)`. Registering the identical `Arc`
    /// twice is a no-op.
    pub fn register<C>(&self, adapter: Arc<C>)
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let mut registrations = write_lock(&self.registrations);
        let entries = registrations.entry(TypeId::of::<C>()).or_default();

        let already_registered = entries.iter().any(|entry| {
            entry
                .downcast_ref::<Arc<C>>()
                .is_some_and(|existing| Arc::ptr_eq(existing, &adapter))
        });
        if already_registered {
            return;
        }

        entries.push(Box::new(adapter));
    }

    /// Resolve the default adapter for capability `C`
    ///
    /// The first registered adapter wins and is cached for later lookups.
    ///
    /// # Errors
    ///
    /// [`HotswapError::MissingCapability`](crate::HotswapError::MissingCapability)
    /// when nothing is registered for `C`.
    pub fn resolve<C>(&self) -> HotswapResult<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let type_id = TypeId::of::<C>();

        {
            let cache = read_lock(&self.cache);
            if let Some(entry) = cache.get(&type_id) {
                if let Some(adapter) = entry.downcast_ref::<Arc<C>>() {
                    return Ok(Arc::clone(adapter));
                }
            }
        }

        let adapter = {
            let registrations = read_lock(&self.registrations);
            registrations
                .get(&type_id)
                .and_then(|entries| entries.first())
                .and_then(|entry| entry.downcast_ref::<Arc<C>>())
                .map(Arc::clone)
                .ok_or(HotswapError::MissingCapability(std::any::type_name::<C>()))?
        };

        write_lock(&self.cache).insert(type_id, Box::new(Arc::clone(&adapter)));
        Ok(adapter)
    }

    /// All adapters registered for capability `C`, in registration order
    pub fn resolve_all<C>(&self) -> Vec<Arc<C>>
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let registrations = read_lock(&self.registrations);
        registrations
            .get(&TypeId::of::<C>())
            .map(|entries| {
                entries
                    .iter()
                    .filter_map(|entry| entry.downcast_ref::<Arc<C>>())
                    .map(Arc::clone)
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Whether any adapter is registered for capability `C`
    pub fn is_registered<C>(&self) -> bool
    where
        C: ?Sized + Send + Sync + 'static,
    {
        let registrations = read_lock(&self.registrations);
        registrations
            .get(&TypeId::of::<C>())
            .is_some_and(|entries| !entries.is_empty())
    }
}
