//! Transient resource pooling.
//!
//! The [`TransientPool`] hands out backing allocations for transient
//! resources during one frame. Allocations are grouped by descriptor
//! equivalence class (the descriptor without its label): once a resource's
//! last user has run, its allocation goes back on the free list of its class
//! and the next resource of the same class reuses it.
//!
//! # Example
//!
//! ```ignore
//! let mut pool = TransientPool::new(&GraphConfig::default());
//!
//! let a = pool.acquire("bloom_a", &desc)?;
//! pool.release(a);
//!
//! // Same class, previous user finished: storage is reused
//! let b = pool.acquire("bloom_b", &desc)?;
//! assert_eq!(a, b);
//! ```

use std::collections::HashMap;

use crate::error::{GraphError, Result};
use crate::types::ResourceDescriptor;
use crate::GraphConfig;

/// Identifier of a physical transient allocation within one frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct AllocationId(u32);

impl AllocationId {
    /// Index of the allocation in creation order.
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

/// Pool statistics for one frame.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PoolStats {
    /// Number of distinct allocations created.
    pub allocations_created: usize,
    /// Highest number of allocations in use at the same time.
    pub peak_live: usize,
    /// Highest number of bytes in use at the same time.
    pub peak_bytes: u64,
    /// Bytes held by all created allocations (the pool's footprint).
    pub total_bytes: u64,
}

#[derive(Debug)]
struct Allocation {
    key: ResourceDescriptor,
    bytes: u64,
    in_use: bool,
}

/// Descriptor-keyed pool of transient allocations.
#[derive(Debug)]
pub struct TransientPool {
    aliasing: bool,
    max_allocations: Option<usize>,
    memory_budget: Option<u64>,
    allocations: Vec<Allocation>,
    /// Released allocations by equivalence class, most recent last.
    free: HashMap<ResourceDescriptor, Vec<AllocationId>>,
    live: usize,
    live_bytes: u64,
    stats: PoolStats,
}

impl TransientPool {
    /// Create an empty pool configured from `config`.
    pub fn new(config: &GraphConfig) -> Self {
        Self {
            aliasing: config.enable_aliasing,
            max_allocations: config.max_transient_allocations,
            memory_budget: config.transient_memory_budget,
            allocations: Vec::new(),
            free: HashMap::new(),
            live: 0,
            live_bytes: 0,
            stats: PoolStats::default(),
        }
    }

    /// Acquire backing storage for a transient resource.
    ///
    /// Reuses a free allocation of the same equivalence class when aliasing is
    /// enabled, otherwise creates one.
    ///
    /// # Errors
    ///
    /// [`GraphError::AllocationExhausted`] when creating an allocation would
    /// exceed the allocation count limit or the memory budget.
    pub fn acquire(&mut self, name: &str, desc: &ResourceDescriptor) -> Result<AllocationId> {
        let key = desc.alias_key();

        let reused = if self.aliasing {
            self.free.get_mut(&key).and_then(Vec::pop)
        } else {
            None
        };

        let id = match reused {
            Some(id) => {
                log::trace!("'{}' reuses allocation {}", name, id.index());
                id
            }
            None => self.create(name, key)?,
        };

        let allocation = &mut self.allocations[id.index()];
        allocation.in_use = true;
        self.live += 1;
        self.live_bytes = self.live_bytes.saturating_add(allocation.bytes);
        self.stats.peak_live = self.stats.peak_live.max(self.live);
        self.stats.peak_bytes = self.stats.peak_bytes.max(self.live_bytes);
        Ok(id)
    }

    fn create(&mut self, name: &str, key: ResourceDescriptor) -> Result<AllocationId> {
        if let Some(max) = self.max_allocations {
            if self.allocations.len() >= max {
                return Err(GraphError::AllocationExhausted {
                    resource: name.to_string(),
                    reason: format!("transient allocation limit of {} reached", max),
                });
            }
        }

        let bytes = key.byte_size();
        if let Some(budget) = self.memory_budget {
            let footprint = self.stats.total_bytes.checked_add(bytes);
            if footprint.map_or(true, |total| total > budget) {
                return Err(GraphError::AllocationExhausted {
                    resource: name.to_string(),
                    reason: format!(
                        "{} bytes would exceed the transient memory budget of {} bytes ({} already allocated)",
                        bytes, budget, self.stats.total_bytes
                    ),
                });
            }
        }

        let id = AllocationId(self.allocations.len() as u32);
        log::trace!("'{}' gets new allocation {} ({} bytes)", name, id.index(), bytes);
        self.allocations.push(Allocation {
            key,
            bytes,
            in_use: false,
        });
        self.stats.allocations_created += 1;
        self.stats.total_bytes = self.stats.total_bytes.saturating_add(bytes);
        Ok(id)
    }

    /// Return an allocation to the pool.
    ///
    /// Releasing an allocation that is not in use does nothing.
    pub fn release(&mut self, id: AllocationId) {
        let Some(allocation) = self.allocations.get_mut(id.index()) else {
            return;
        };
        if !allocation.in_use {
            return;
        }
        allocation.in_use = false;
        self.live -= 1;
        self.live_bytes = self.live_bytes.saturating_sub(allocation.bytes);

        if self.aliasing {
            self.free.entry(allocation.key.clone()).or_default().push(id);
        }
    }

    /// Check if an allocation is currently handed out.
    pub fn is_in_use(&self, id: AllocationId) -> bool {
        self.allocations
            .get(id.index())
            .is_some_and(|allocation| allocation.in_use)
    }

    /// Number of allocations currently in use.
    pub fn live_count(&self) -> usize {
        self.live
    }

    /// Get the pool statistics.
    pub fn stats(&self) -> PoolStats {
        self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{BufferDescriptor, BufferUsage, TextureDescriptor, TextureFormat, TextureUsage};

    fn hdr(label: &str) -> ResourceDescriptor {
        TextureDescriptor::new_2d(
            1920,
            1080,
            TextureFormat::Rgba16Float,
            TextureUsage::RENDER_ATTACHMENT | TextureUsage::TEXTURE_BINDING,
        )
        .with_label(label)
        .into()
    }

    #[test]
    fn test_reuse_same_class() {
        let mut pool = TransientPool::new(&GraphConfig::default());
        let a = pool.acquire("a", &hdr("a")).unwrap();
        pool.release(a);
        let b = pool.acquire("b", &hdr("b")).unwrap();

        assert_eq!(a, b);
        assert_eq!(pool.stats().allocations_created, 1);
        assert_eq!(pool.stats().peak_live, 1);
    }

    #[test]
    fn test_no_reuse_while_in_use() {
        let mut pool = TransientPool::new(&GraphConfig::default());
        let a = pool.acquire("a", &hdr("a")).unwrap();
        let b = pool.acquire("b", &hdr("b")).unwrap();

        assert_ne!(a, b);
        assert_eq!(pool.live_count(), 2);
        assert_eq!(pool.stats().peak_bytes, 2 * hdr("a").byte_size());
    }

    #[test]
    fn test_no_reuse_across_classes() {
        let mut pool = TransientPool::new(&GraphConfig::default());
        let a = pool
            .acquire("a", &BufferDescriptor::new(64, BufferUsage::STORAGE).into())
            .unwrap();
        pool.release(a);
        let b = pool
            .acquire("b", &BufferDescriptor::new(128, BufferUsage::STORAGE).into())
            .unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn test_aliasing_disabled() {
        let mut pool = TransientPool::new(&GraphConfig::default().with_aliasing(false));
        let a = pool.acquire("a", &hdr("a")).unwrap();
        pool.release(a);
        let b = pool.acquire("b", &hdr("b")).unwrap();
        assert_ne!(a, b);
        assert!(!pool.is_in_use(a));
        assert!(pool.is_in_use(b));
    }

    #[test]
    fn test_allocation_limit() {
        let mut pool =
            TransientPool::new(&GraphConfig::default().with_max_transient_allocations(1));
        pool.acquire("a", &hdr("a")).unwrap();
        let err = pool.acquire("b", &hdr("b")).unwrap_err();
        assert!(matches!(err, GraphError::AllocationExhausted { ref resource, .. } if resource == "b"));
    }

    #[test]
    fn test_memory_budget() {
        let mut pool = TransientPool::new(&GraphConfig::default().with_transient_memory_budget(100));
        let small: ResourceDescriptor = BufferDescriptor::new(64, BufferUsage::UNIFORM).into();
        pool.acquire("small", &small).unwrap();
        assert!(pool.acquire("again", &small).is_err());
    }

    #[test]
    fn test_memory_budget_overflow() {
        let mut pool =
            TransientPool::new(&GraphConfig::default().with_transient_memory_budget(u64::MAX));
        let huge: ResourceDescriptor = BufferDescriptor::new(u64::MAX, BufferUsage::STORAGE).into();
        let small: ResourceDescriptor = BufferDescriptor::new(64, BufferUsage::STORAGE).into();
        pool.acquire("huge", &huge).unwrap();

        let err = pool.acquire("small", &small).unwrap_err();
        assert!(matches!(err, GraphError::AllocationExhausted { ref resource, .. } if resource == "small"));
        assert_eq!(pool.stats().total_bytes, u64::MAX);
    }
}
