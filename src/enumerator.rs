//! Resource enumeration: one statistics query per domain and call.
//!
//! The enumerator turns raw [`SystemStats`] records into a [`DomainSnapshot`]
//! holding every resource of a domain, plus the aggregate and singleton
//! records when a request needs them.

use crate::catalog::Domain;
use crate::collector::{
    CollectError, ConntrackStat, CpuTimes, DiskUsage, LoadAvg, NetIoCounters, Partition,
    SystemStats, VirtualMemory,
};
use crate::config::DiskFilter;
use crate::metric::MetricValue;
use std::collections::BTreeMap;
use std::time::Instant;
use tracing::debug;

/// Id used for singleton snapshots.
pub const SINGLETON_ID: &str = "system";

/// Raw record behind a snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum Record {
    Load(LoadAvg),
    Cpu(CpuTimes),
    Memory(VirtualMemory),
    Net(NetIoCounters),
    Conntrack(ConntrackStat),
    Disk(DiskUsage),
}

impl Record {
    /// Value of the field a metric name refers to.
    pub fn field(&self, name: &str) -> Option<MetricValue> {
        let value = match self {
            Record::Load(l) => match name {
                "load1" => l.load1.into(),
                "load5" => l.load5.into(),
                "load15" => l.load15.into(),
                _ => return None,
            },
            Record::Cpu(c) => match name {
                "user" => c.user.into(),
                "system" => c.system.into(),
                "idle" => c.idle.into(),
                "nice" => c.nice.into(),
                "iowait" => c.iowait.into(),
                "irq" => c.irq.into(),
                "softirq" => c.softirq.into(),
                "steal" => c.steal.into(),
                "guest" => c.guest.into(),
                "guest_nice" => c.guest_nice.into(),
                _ => return None,
            },
            Record::Memory(m) => match name {
                "total" => m.total.into(),
                "available" => m.available.into(),
                "used" => m.used.into(),
                "used_percent" => m.used_percent.into(),
                "free" => m.free.into(),
                "active" => m.active.into(),
                "inactive" => m.inactive.into(),
                "buffers" => m.buffers.into(),
                "cached" => m.cached.into(),
                _ => return None,
            },
            Record::Net(n) => match name {
                "bytes_sent" => n.bytes_sent.into(),
                "bytes_recv" => n.bytes_recv.into(),
                "packets_sent" => n.packets_sent.into(),
                "packets_recv" => n.packets_recv.into(),
                "errin" => n.errin.into(),
                "errout" => n.errout.into(),
                "dropin" => n.dropin.into(),
                "dropout" => n.dropout.into(),
                _ => return None,
            },
            Record::Conntrack(c) => match name {
                "conntrackcount" => c.count.into(),
                "conntrackmax" => c.max.into(),
                _ => return None,
            },
            Record::Disk(d) => match name {
                "total" => d.total.into(),
                "used" => d.used.into(),
                "free" => d.free.into(),
                "percent" => d.used_percent.into(),
                "inodes_total" => d.inodes_total.into(),
                "inodes_used" => d.inodes_used.into(),
                "inodes_free" => d.inodes_free.into(),
                "inodes_percent" => d.inodes_used_percent.into(),
                _ => return None,
            },
        };
        Some(value)
    }
}

/// One enumerated resource.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceSnapshot {
    pub id: String,
    pub record: Record,
    /// Descriptive attributes copied onto every metric of this resource.
    pub tags: BTreeMap<String, String>,
}

impl ResourceSnapshot {
    fn new(id: impl Into<String>, record: Record) -> Self {
        Self {
            id: id.into(),
            record,
            tags: BTreeMap::new(),
        }
    }
}

/// Which parts of a domain the requests of one call need.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Demand {
    pub per_resource: bool,
    pub aggregate: bool,
    pub singleton: bool,
}

/// Everything enumerated for one domain during one call.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DomainSnapshot {
    /// Resources in enumeration order.
    pub resources: Vec<ResourceSnapshot>,
    pub aggregate: Option<ResourceSnapshot>,
    pub singleton: Option<ResourceSnapshot>,
}

impl DomainSnapshot {
    /// Finds a resource by id.
    pub fn find(&self, id: &str) -> Option<&ResourceSnapshot> {
        self.resources.iter().find(|r| r.id == id)
    }
}

/// Queries a statistics source for the resources of a domain.
pub struct Enumerator<'a, S: SystemStats + ?Sized> {
    stats: &'a S,
}

impl<'a, S: SystemStats + ?Sized> Enumerator<'a, S> {
    pub fn new(stats: &'a S) -> Self {
        Self { stats }
    }

    /// Enumerates `domain`, querying only what `demand` asks for.
    ///
    /// Any query failure aborts the whole domain.
    pub fn enumerate(
        &self,
        domain: Domain,
        demand: &Demand,
        filter: &DiskFilter,
    ) -> Result<DomainSnapshot, CollectError> {
        let start = Instant::now();

        let snapshot = match domain {
            Domain::Load => self.load()?,
            Domain::Cpu => self.cpu(demand)?,
            Domain::Vm => self.vm()?,
            Domain::Net => self.net(demand)?,
            Domain::Disk => self.disk(filter)?,
        };

        debug!(
            domain = %domain,
            resources = snapshot.resources.len(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "domain enumerated"
        );
        Ok(snapshot)
    }

    fn load(&self) -> Result<DomainSnapshot, CollectError> {
        let load = self.stats.load_avg()?;
        Ok(DomainSnapshot {
            singleton: Some(ResourceSnapshot::new(SINGLETON_ID, Record::Load(load))),
            ..Default::default()
        })
    }

    fn vm(&self) -> Result<DomainSnapshot, CollectError> {
        let memory = self.stats.virtual_memory()?;
        Ok(DomainSnapshot {
            singleton: Some(ResourceSnapshot::new(SINGLETON_ID, Record::Memory(memory))),
            ..Default::default()
        })
    }

    fn cpu(&self, demand: &Demand) -> Result<DomainSnapshot, CollectError> {
        let mut snapshot = DomainSnapshot::default();
        if !(demand.per_resource || demand.aggregate) {
            return Ok(snapshot);
        }

        // Cores and total come from the same reading
        let reading = self.stats.cpu_times()?;
        if demand.per_resource {
            snapshot.resources = reading
                .per_cpu
                .into_iter()
                .map(|times| ResourceSnapshot::new(times.cpu.clone(), Record::Cpu(times)))
                .collect();
        }
        if demand.aggregate {
            let total = reading.total;
            snapshot.aggregate = Some(ResourceSnapshot::new(total.cpu.clone(), Record::Cpu(total)));
        }

        Ok(snapshot)
    }

    fn net(&self, demand: &Demand) -> Result<DomainSnapshot, CollectError> {
        let mut snapshot = DomainSnapshot::default();

        if demand.per_resource || demand.aggregate {
            let reading = self.stats.net_io_counters()?;
            if demand.per_resource {
                for counters in reading.per_nic {
                    let info = self.stats.interface_info(&counters.name);
                    let mut resource =
                        ResourceSnapshot::new(counters.name.clone(), Record::Net(counters));
                    if let Some(addr) = info.hardware_addr {
                        resource.tags.insert("hardware_addr".to_string(), addr);
                    }
                    if let Some(mtu) = info.mtu {
                        resource.tags.insert("mtu".to_string(), mtu.to_string());
                    }
                    snapshot.resources.push(resource);
                }
            }
            if demand.aggregate {
                let total = reading.total;
                snapshot.aggregate =
                    Some(ResourceSnapshot::new(total.name.clone(), Record::Net(total)));
            }
        }
        if demand.singleton {
            let conntrack = self.stats.conntrack()?;
            snapshot.singleton = Some(ResourceSnapshot::new(
                SINGLETON_ID,
                Record::Conntrack(conntrack),
            ));
        }

        Ok(snapshot)
    }

    fn disk(&self, filter: &DiskFilter) -> Result<DomainSnapshot, CollectError> {
        let partitions: Vec<Partition> = match filter {
            DiskFilter::Physical => self.stats.partitions(false)?,
            DiskFilter::All => self.stats.partitions(true)?,
            DiskFilter::AllowList(_) => self
                .stats
                .partitions(true)?
                .into_iter()
                .filter(|p| filter.admits(&p.mountpoint))
                .collect(),
        };

        let mut snapshot = DomainSnapshot::default();
        for partition in partitions {
            let usage = self.stats.disk_usage(&partition.mountpoint)?;
            let mut resource = ResourceSnapshot::new(partition.mountpoint, Record::Disk(usage));
            resource.tags.insert("device".to_string(), partition.device);
            snapshot.resources.push(resource);
        }

        Ok(snapshot)
    }
}
