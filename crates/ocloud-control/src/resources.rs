//! Capacity-accounted resource pool allocator.
//!
//! The [`ResourceManager`] keeps one managed entry per pool name with declared
//! totals, allocated counters and the allocations that make them up. A second
//! index maps every allocation ID to its pool so release is a single lookup.
//!
//! Both maps live behind one `RwLock`: allocate, release and ensure take the
//! write half, every query takes the read half. For every pool and dimension
//! `0 <= allocated <= total` and `allocated` equals the sum of the pool's
//! allocations.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};
use ocloud_core::{parse_resource_value, AllocationId};
use ocloud_store::{ResourceInventory, ResourcePoolSpec};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ControlError, Dimension, Result};
use crate::types::{
    PoolStatus, PoolUtilization, ResourceAllocation, ResourceRequest, UtilizationWarning,
};

/// Status reported for allocations and ensured pools.
pub const STATUS_ACTIVE: &str = "active";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
struct Capacity {
    cpu: i64,
    memory: i64,
    storage: i64,
}

impl Capacity {
    fn parse(pool: &ResourcePoolSpec) -> Result<Self> {
        let parse = |dimension: Dimension, value: &str| {
            parse_resource_value(value)
                .map_err(|source| ControlError::InvalidQuantity { dimension, source })
        };
        Ok(Self {
            cpu: parse(Dimension::Cpu, &pool.capacity.cpu)?,
            memory: parse(Dimension::Memory, &pool.capacity.memory)?,
            storage: parse(Dimension::Storage, &pool.capacity.storage)?,
        })
    }

    fn dimensions(self) -> [(Dimension, i64); 3] {
        [
            (Dimension::Cpu, self.cpu),
            (Dimension::Memory, self.memory),
            (Dimension::Storage, self.storage),
        ]
    }
}

#[derive(Debug)]
struct ManagedPool {
    spec: ResourcePoolSpec,
    total: Capacity,
    allocated: Capacity,
    allocations: HashMap<AllocationId, ResourceAllocation>,
    last_updated: DateTime<Utc>,
}

impl ManagedPool {
    fn available(&self) -> Capacity {
        Capacity {
            cpu: self.total.cpu - self.allocated.cpu,
            memory: self.total.memory - self.allocated.memory,
            storage: self.total.storage - self.allocated.storage,
        }
    }

    fn utilization(&self) -> (f64, f64, f64) {
        (
            percent(self.allocated.cpu, self.total.cpu),
            percent(self.allocated.memory, self.total.memory),
            percent(self.allocated.storage, self.total.storage),
        )
    }

    fn status(&self) -> PoolStatus {
        let available = self.available();
        PoolStatus {
            name: self.spec.name.clone(),
            pool_type: self.spec.pool_type.clone(),
            location: self.spec.location.clone(),
            status: STATUS_ACTIVE.to_string(),
            total_cpu: self.total.cpu,
            available_cpu: available.cpu,
            total_memory: self.total.memory,
            available_memory: available.memory,
            total_storage: self.total.storage,
            available_storage: available.storage,
            network: self.spec.capacity.network.clone(),
            allocation_count: self.allocations.len(),
            last_updated: self.last_updated,
        }
    }
}

#[allow(clippy::cast_precision_loss)]
fn percent(allocated: i64, total: i64) -> f64 {
    if total <= 0 {
        0.0
    } else {
        allocated as f64 / total as f64 * 100.0
    }
}

#[derive(Debug, Default)]
struct Pools {
    by_name: HashMap<String, ManagedPool>,
    allocation_index: HashMap<AllocationId, String>,
}

/// In-memory allocator over declared resource pools.
#[derive(Debug)]
pub struct ResourceManager {
    pools: RwLock<Pools>,
    warning_threshold: f64,
}

impl Default for ResourceManager {
    fn default() -> Self {
        Self::new(80.0)
    }
}

impl ResourceManager {
    /// Create an empty manager that flags pools above `warning_threshold` percent.
    #[must_use]
    pub fn new(warning_threshold: f64) -> Self {
        Self {
            pools: RwLock::new(Pools::default()),
            warning_threshold,
        }
    }

    /// Create or update the managed entry for a pool.
    ///
    /// A new pool starts with nothing allocated. Re-applying a pool keeps its
    /// allocations and takes the new totals, as long as they still cover what
    /// is allocated.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::InvalidQuantity` if a capacity string does not
    /// parse, or `ControlError::CapacityShrink` if the new totals are below the
    /// outstanding allocations. The pool is unchanged on error.
    pub fn ensure_resource_pool(&self, pool: &ResourcePoolSpec) -> Result<()> {
        info!(pool_name = %pool.name, pool_type = %pool.pool_type, "Ensuring resource pool");

        if pool.name.is_empty() {
            return Err(ControlError::InvalidRequest("pool name is required".into()));
        }
        let total = Capacity::parse(pool)?;

        let mut pools = self.pools.write();
        let now = Utc::now();
        match pools.by_name.get_mut(&pool.name) {
            Some(existing) => {
                for ((dimension, new_total), (_, allocated)) in
                    total.dimensions().into_iter().zip(existing.allocated.dimensions())
                {
                    if new_total < allocated {
                        return Err(ControlError::CapacityShrink {
                            pool: pool.name.clone(),
                            dimension,
                            total: new_total,
                            allocated,
                        });
                    }
                }
                if existing.total != total || existing.spec != *pool {
                    existing.last_updated = now;
                }
                existing.spec = pool.clone();
                existing.total = total;
            }
            None => {
                pools.by_name.insert(
                    pool.name.clone(),
                    ManagedPool {
                        spec: pool.clone(),
                        total,
                        allocated: Capacity::default(),
                        allocations: HashMap::new(),
                        last_updated: now,
                    },
                );
            }
        }

        info!(
            pool_name = %pool.name,
            total_cpu = total.cpu,
            total_memory = total.memory,
            total_storage = total.storage,
            "Resource pool configured"
        );
        Ok(())
    }

    /// Create a pool that must not exist yet.
    ///
    /// The existence check and the insert happen under one write lock, so of
    /// two concurrent creates with the same name exactly one succeeds.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::PoolAlreadyExists` if the name is taken, or
    /// `ControlError::InvalidQuantity` if a capacity string does not parse.
    pub fn create_resource_pool(&self, pool: &ResourcePoolSpec) -> Result<()> {
        if pool.name.is_empty() {
            return Err(ControlError::InvalidRequest("pool name is required".into()));
        }
        let total = Capacity::parse(pool)?;

        let mut pools = self.pools.write();
        if pools.by_name.contains_key(&pool.name) {
            return Err(ControlError::PoolAlreadyExists(pool.name.clone()));
        }
        pools.by_name.insert(
            pool.name.clone(),
            ManagedPool {
                spec: pool.clone(),
                total,
                allocated: Capacity::default(),
                allocations: HashMap::new(),
                last_updated: Utc::now(),
            },
        );

        info!(pool_name = %pool.name, total_cpu = total.cpu, "Resource pool created");
        Ok(())
    }

    /// Allocate capacity from a pool.
    ///
    /// The availability check and the commit happen under one write lock.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::PoolNotFound` for an unknown pool,
    /// `ControlError::InsufficientCapacity` naming the first dimension that
    /// does not fit, or `ControlError::InvalidRequest` for negative quantities.
    pub fn allocate_resources(&self, request: &ResourceRequest) -> Result<ResourceAllocation> {
        info!(request_id = %request.id, pool_name = %request.pool_name, "Allocating resources");
        request.validate()?;

        let mut guard = self.pools.write();
        let pools = &mut *guard;
        let pool = pools
            .by_name
            .get_mut(&request.pool_name)
            .ok_or_else(|| ControlError::PoolNotFound(request.pool_name.clone()))?;

        let requested = Capacity {
            cpu: request.cpu,
            memory: request.memory,
            storage: request.storage,
        };
        for ((dimension, wanted), (_, available)) in requested
            .dimensions()
            .into_iter()
            .zip(pool.available().dimensions())
        {
            if wanted > available {
                return Err(ControlError::InsufficientCapacity {
                    dimension,
                    requested: wanted,
                    available,
                });
            }
        }

        let allocation = ResourceAllocation {
            id: AllocationId::generate(),
            request_id: request.id.clone(),
            pool_name: request.pool_name.clone(),
            cpu: request.cpu,
            memory: request.memory,
            storage: request.storage,
            network_bw: request.network_bw,
            allocated_at: Utc::now(),
            status: STATUS_ACTIVE.to_string(),
        };

        pool.allocated.cpu += requested.cpu;
        pool.allocated.memory += requested.memory;
        pool.allocated.storage += requested.storage;
        pool.last_updated = allocation.allocated_at;
        pool.allocations.insert(allocation.id, allocation.clone());
        pools
            .allocation_index
            .insert(allocation.id, request.pool_name.clone());

        info!(
            allocation_id = %allocation.id,
            cpu = allocation.cpu,
            memory = allocation.memory,
            storage = allocation.storage,
            "Resources allocated"
        );
        Ok(allocation)
    }

    /// Release an allocation and return it.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::AllocationNotFound` if the ID is unknown or was
    /// already released. Counters are untouched in that case.
    pub fn release_resources(&self, allocation_id: &AllocationId) -> Result<ResourceAllocation> {
        info!(allocation_id = %allocation_id, "Releasing resources");

        let mut guard = self.pools.write();
        let pools = &mut *guard;
        let pool_name = pools
            .allocation_index
            .get(allocation_id)
            .ok_or(ControlError::AllocationNotFound(*allocation_id))?;
        let pool = pools
            .by_name
            .get_mut(pool_name)
            .ok_or_else(|| ControlError::PoolNotFound(pool_name.clone()))?;
        let allocation = pool
            .allocations
            .remove(allocation_id)
            .ok_or(ControlError::AllocationNotFound(*allocation_id))?;

        pool.allocated.cpu -= allocation.cpu;
        pool.allocated.memory -= allocation.memory;
        pool.allocated.storage -= allocation.storage;
        pool.last_updated = Utc::now();
        pools.allocation_index.remove(allocation_id);

        info!(
            allocation_id = %allocation_id,
            cpu = allocation.cpu,
            memory = allocation.memory,
            storage = allocation.storage,
            "Resources released"
        );
        Ok(allocation)
    }

    /// Look up a live allocation.
    #[must_use]
    pub fn get_allocation(&self, allocation_id: &AllocationId) -> Option<ResourceAllocation> {
        let pools = self.pools.read();
        let pool_name = pools.allocation_index.get(allocation_id)?;
        pools
            .by_name
            .get(pool_name)?
            .allocations
            .get(allocation_id)
            .cloned()
    }

    /// Sum totals and availability across the given pools.
    ///
    /// Pools that were never ensured are skipped.
    #[must_use]
    pub fn get_resource_inventory(&self, pools: &[ResourcePoolSpec]) -> ResourceInventory {
        let managed = self.pools.read();
        let mut inventory = ResourceInventory::default();

        for spec in pools {
            let Some(pool) = managed.by_name.get(&spec.name) else {
                continue;
            };
            let available = pool.available();
            inventory.total_cpu += pool.total.cpu;
            inventory.available_cpu += available.cpu;
            inventory.total_memory += pool.total.memory;
            inventory.available_memory += available.memory;
            inventory.total_storage += pool.total.storage;
            inventory.available_storage += available.storage;
            *inventory
                .resource_types
                .entry(spec.pool_type.clone())
                .or_insert(0) += 1;
        }

        debug!(
            total_cpu = inventory.total_cpu,
            available_cpu = inventory.available_cpu,
            "Resource inventory calculated"
        );
        inventory
    }

    /// Utilization percentages of one pool.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::PoolNotFound` for an unknown pool.
    pub fn get_pool_utilization(&self, pool_name: &str) -> Result<PoolUtilization> {
        let pools = self.pools.read();
        let pool = pools
            .by_name
            .get(pool_name)
            .ok_or_else(|| ControlError::PoolNotFound(pool_name.to_string()))?;
        let (cpu, memory, storage) = pool.utilization();

        Ok(PoolUtilization {
            pool_name: pool_name.to_string(),
            cpu_utilization: cpu,
            memory_utilization: memory,
            storage_utilization: storage,
            allocation_count: pool.allocations.len(),
            timestamp: Utc::now(),
        })
    }

    /// Snapshot of one pool.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::PoolNotFound` for an unknown pool.
    pub fn get_pool_status(&self, pool_name: &str) -> Result<PoolStatus> {
        self.pools
            .read()
            .by_name
            .get(pool_name)
            .map(ManagedPool::status)
            .ok_or_else(|| ControlError::PoolNotFound(pool_name.to_string()))
    }

    /// Snapshot of every pool, ordered by name.
    #[must_use]
    pub fn get_all_pool_status(&self) -> Vec<PoolStatus> {
        let mut statuses: Vec<_> = self
            .pools
            .read()
            .by_name
            .values()
            .map(ManagedPool::status)
            .collect();
        statuses.sort_by(|a, b| a.name.cmp(&b.name));
        statuses
    }

    /// Flag pools whose CPU or memory utilization exceeds the threshold.
    ///
    /// Only reports; nothing is moved.
    #[must_use]
    pub fn optimize_resource_allocation(&self) -> Vec<UtilizationWarning> {
        let pools = self.pools.read();
        let mut warnings: Vec<UtilizationWarning> = pools
            .by_name
            .iter()
            .filter_map(|(name, pool)| {
                let (cpu, memory, _) = pool.utilization();
                (cpu > self.warning_threshold || memory > self.warning_threshold).then(|| {
                    warn!(
                        pool_name = %name,
                        cpu_utilization = cpu,
                        memory_utilization = memory,
                        "Pool utilization high, consider rebalancing"
                    );
                    UtilizationWarning {
                        pool_name: name.clone(),
                        cpu_utilization: cpu,
                        memory_utilization: memory,
                        threshold: self.warning_threshold,
                    }
                })
            })
            .collect();
        warnings.sort_by(|a, b| a.pool_name.cmp(&b.pool_name));
        warnings
    }

    /// Forget a pool. Returns whether it existed.
    ///
    /// # Errors
    ///
    /// Returns `ControlError::PoolInUse` while allocations are outstanding.
    pub fn remove_resource_pool(&self, pool_name: &str) -> Result<bool> {
        let mut pools = self.pools.write();
        match pools.by_name.get(pool_name) {
            None => Ok(false),
            Some(pool) if !pool.allocations.is_empty() => Err(ControlError::PoolInUse {
                pool: pool_name.to_string(),
                allocations: pool.allocations.len(),
            }),
            Some(_) => {
                pools.by_name.remove(pool_name);
                info!(pool_name = %pool_name, "Resource pool removed");
                Ok(true)
            }
        }
    }

    /// Live allocation count across all pools.
    #[must_use]
    pub fn allocation_count(&self) -> usize {
        self.pools.read().allocation_index.len()
    }

    /// Live allocation count per pool name.
    #[must_use]
    pub fn allocations_by_pool(&self) -> BTreeMap<String, usize> {
        self.pools
            .read()
            .by_name
            .iter()
            .map(|(name, pool)| (name.clone(), pool.allocations.len()))
            .collect()
    }
}
