//! The namespace catalog: every metric family this collector can produce.
//!
//! The catalog is built once from the declarative tables below and never
//! mutated. Each family is a set of fields sharing one shape: either a single
//! system-wide record, or one record per resource with a dynamic namespace
//! element (and optionally an aggregate pseudo-resource such as `cpu-total`).

use crate::namespace::Namespace;
use serde::Serialize;
use std::fmt;
use std::sync::LazyLock;

/// Leading elements shared by every namespace.
pub const VENDOR: &str = "intel";
pub const PLUGIN: &str = "psutil";

/// Index of the routing element, right after `intel/psutil`.
pub const DOMAIN_INDEX: usize = 2;

/// Category of OS counters.
///
/// The declaration order is the order in which domains are processed and
/// their metrics returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    Load,
    Cpu,
    Vm,
    Net,
    Disk,
}

impl Domain {
    pub const ALL: [Domain; 5] = [
        Domain::Load,
        Domain::Cpu,
        Domain::Vm,
        Domain::Net,
        Domain::Disk,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Domain::Load => "load",
            Domain::Cpu => "cpu",
            Domain::Vm => "vm",
            Domain::Net => "net",
            Domain::Disk => "disk",
        }
    }

    pub fn from_token(token: &str) -> Option<Domain> {
        Domain::ALL.into_iter().find(|d| d.as_str() == token)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// How a descriptor's value is located at collection time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Scope {
    /// One system-wide record (load, vm, conntrack).
    Singleton,
    /// The aggregate pseudo-resource of a per-resource family.
    Aggregate,
    /// One record per resource; the element at `index` names the resource.
    PerResource { index: usize },
}

/// A metric family as advertised to the host.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDescriptor {
    pub namespace: Namespace,
    pub unit: &'static str,
    pub description: &'static str,
    pub domain: Domain,
    pub scope: Scope,
}

impl MetricDescriptor {
    /// Field name, the last namespace element.
    pub fn field(&self) -> &str {
        self.namespace.last().unwrap_or_default()
    }
}

/// OS family the catalog is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Linux,
    MacOs,
    Other,
}

impl Platform {
    pub fn current() -> Platform {
        if cfg!(target_os = "linux") {
            Platform::Linux
        } else if cfg!(target_os = "macos") {
            Platform::MacOs
        } else {
            Platform::Other
        }
    }

    /// Every domain is read from procfs, which only Linux provides.
    fn has_procfs(self) -> bool {
        self == Platform::Linux
    }
}

struct Field {
    name: &'static str,
    unit: &'static str,
    description: &'static str,
}

struct Dimension {
    name: &'static str,
    description: &'static str,
}

enum Shape {
    Singleton,
    PerResource {
        dimension: Dimension,
        aggregate: Option<&'static str>,
    },
}

struct Family {
    domain: Domain,
    shape: Shape,
    fields: &'static [Field],
}

const fn field(name: &'static str, unit: &'static str, description: &'static str) -> Field {
    Field {
        name,
        unit,
        description,
    }
}

const LOAD_FIELDS: &[Field] = &[
    field("load1", "Load/1M", "1 minute load average"),
    field("load5", "Load/5M", "5 minute load average"),
    field("load15", "Load/15M", "15 minute load average"),
];

const CPU_FIELDS: &[Field] = &[
    field("user", "s", "time spent in user mode"),
    field("system", "s", "time spent in kernel mode"),
    field("idle", "s", "time spent idle"),
    field("nice", "s", "time spent in user mode with low priority"),
    field("iowait", "s", "time spent waiting for I/O to complete"),
    field("irq", "s", "time spent servicing hardware interrupts"),
    field("softirq", "s", "time spent servicing software interrupts"),
    field("steal", "s", "time stolen by the hypervisor for other guests"),
    field("guest", "s", "time spent running a virtual CPU for guests"),
    field("guest_nice", "s", "time spent running a niced guest"),
];

const VM_FIELDS: &[Field] = &[
    field("total", "B", "total physical memory"),
    field(
        "available",
        "B",
        "memory that can be given instantly to processes without swapping",
    ),
    field("used", "B", "memory in use: total - free - buffers - cached"),
    field(
        "used_percent",
        "%",
        "percentage usage calculated as (total - available) / total * 100",
    ),
    field("free", "B", "memory not being used at all (zeroed)"),
    field("active", "B", "memory currently in use or very recently used"),
    field("inactive", "B", "memory marked as not used"),
    field("buffers", "B", "cache for things like file system metadata"),
    field("cached", "B", "page cache"),
];

const NET_FIELDS: &[Field] = &[
    field("bytes_sent", "B", "number of bytes sent"),
    field("bytes_recv", "B", "number of bytes received"),
    field("packets_sent", "packets", "number of packets sent"),
    field("packets_recv", "packets", "number of packets received"),
    field("errin", "packets", "total number of errors while receiving"),
    field("errout", "packets", "total number of errors while sending"),
    field("dropin", "packets", "total number of incoming packets dropped"),
    field("dropout", "packets", "total number of outgoing packets dropped"),
];

const CONNTRACK_FIELDS: &[Field] = &[
    field(
        "conntrackcount",
        "connections",
        "number of entries in the connection tracking table",
    ),
    field(
        "conntrackmax",
        "connections",
        "maximum size of the connection tracking table",
    ),
];

const DISK_FIELDS: &[Field] = &[
    field("total", "B", "total size of the filesystem"),
    field("used", "B", "space in use"),
    field("free", "B", "space available to unprivileged users"),
    field("percent", "%", "used / (used + free) * 100"),
    field("inodes_total", "inodes", "total number of inodes"),
    field("inodes_used", "inodes", "number of inodes in use"),
    field("inodes_free", "inodes", "number of free inodes"),
    field("inodes_percent", "%", "inodes_used / inodes_total * 100"),
];

const FAMILIES: &[Family] = &[
    Family {
        domain: Domain::Load,
        shape: Shape::Singleton,
        fields: LOAD_FIELDS,
    },
    Family {
        domain: Domain::Cpu,
        shape: Shape::PerResource {
            dimension: Dimension {
                name: "cpu_id",
                description: "CPU identifier (cpu0, cpu1, ...)",
            },
            aggregate: Some("cpu-total"),
        },
        fields: CPU_FIELDS,
    },
    Family {
        domain: Domain::Vm,
        shape: Shape::Singleton,
        fields: VM_FIELDS,
    },
    Family {
        domain: Domain::Net,
        shape: Shape::PerResource {
            dimension: Dimension {
                name: "interface_name",
                description: "network interface name",
            },
            aggregate: Some("all"),
        },
        fields: NET_FIELDS,
    },
    Family {
        domain: Domain::Net,
        shape: Shape::Singleton,
        fields: CONNTRACK_FIELDS,
    },
    Family {
        domain: Domain::Disk,
        shape: Shape::PerResource {
            dimension: Dimension {
                name: "mount_point",
                description: "mount point of the filesystem",
            },
            aggregate: None,
        },
        fields: DISK_FIELDS,
    },
];

/// Immutable set of metric descriptors.
#[derive(Debug, Clone)]
pub struct Catalog {
    descriptors: Vec<MetricDescriptor>,
}

impl Catalog {
    /// Builds the catalog for a platform. Platforms without procfs get an
    /// empty catalog.
    pub fn for_platform(platform: Platform) -> Catalog {
        let mut descriptors = Vec::new();
        if !platform.has_procfs() {
            return Catalog { descriptors };
        }

        for family in FAMILIES {
            let base = Namespace::new([VENDOR, PLUGIN, family.domain.as_str()]);

            for f in family.fields {
                let mut push = |namespace: Namespace, scope: Scope| {
                    descriptors.push(MetricDescriptor {
                        namespace,
                        unit: f.unit,
                        description: f.description,
                        domain: family.domain,
                        scope,
                    });
                };

                match &family.shape {
                    Shape::Singleton => {
                        push(base.clone().add_static(f.name), Scope::Singleton);
                    }
                    Shape::PerResource {
                        dimension,
                        aggregate,
                    } => {
                        push(
                            base.clone()
                                .add_dynamic(dimension.name, dimension.description)
                                .add_static(f.name),
                            Scope::PerResource { index: DOMAIN_INDEX + 1 },
                        );
                        if let Some(id) = aggregate {
                            push(
                                base.clone().add_static(*id).add_static(f.name),
                                Scope::Aggregate,
                            );
                        }
                    }
                }
            }
        }

        Catalog { descriptors }
    }

    pub fn descriptors(&self) -> &[MetricDescriptor] {
        &self.descriptors
    }

    pub fn domain(&self, domain: Domain) -> impl Iterator<Item = &MetricDescriptor> {
        self.descriptors.iter().filter(move |d| d.domain == domain)
    }

    /// Finds the descriptor matching `request` within `domain`.
    ///
    /// An all-static template beats a dynamic one, so `cpu/cpu-total/user`
    /// resolves to the aggregate rather than to a core named `cpu-total`.
    pub fn resolve(&self, domain: Domain, request: &Namespace) -> Option<&MetricDescriptor> {
        let mut dynamic_match = None;
        for descriptor in self.domain(domain) {
            if !descriptor.namespace.matches(request) {
                continue;
            }
            if descriptor.scope == Scope::Aggregate || descriptor.scope == Scope::Singleton {
                return Some(descriptor);
            }
            dynamic_match.get_or_insert(descriptor);
        }
        dynamic_match
    }
}

static CATALOG: LazyLock<Catalog> = LazyLock::new(|| Catalog::for_platform(Platform::current()));

/// The catalog for the platform this binary was built for.
pub fn catalog() -> &'static Catalog {
    &CATALOG
}

/// Every metric family this collector can produce on this platform.
pub fn list_metric_descriptors() -> &'static [MetricDescriptor] {
    CATALOG.descriptors()
}
