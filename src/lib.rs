//! psutil-collector - host metrics behind a namespace catalog.
//!
//! Every metric this library can produce is advertised as a namespace such as
//! `/intel/psutil/cpu/*/user`. A batch of requested namespaces is routed to
//! its domain (load, cpu, vm, net, disk), each domain is enumerated exactly
//! once, and wildcards are expanded into one metric per resource.
//!
//! ```
//! use psutil_collector::collector::{MockFs, ProcfsStats};
//! use psutil_collector::{CollectionRequest, PsutilCollector};
//!
//! # if cfg!(target_os = "linux") {
//! let collector = PsutilCollector::new(ProcfsStats::new(MockFs::typical_system(), "/proc"));
//! let request = CollectionRequest::new("/intel/psutil/load/load1".parse().unwrap());
//! let metrics = collector.collect_metrics(&[request]).unwrap();
//! assert_eq!(metrics[0].unit, "Load/1M");
//! # }
//! ```

pub mod catalog;
pub mod collector;
pub mod config;
pub mod dispatcher;
pub mod enumerator;
pub mod error;
pub mod metric;
pub mod namespace;
pub mod plugin;

pub use catalog::{Catalog, Domain, MetricDescriptor, Scope, list_metric_descriptors};
pub use config::{CollectorConfig, ConfigPolicy, ConfigRule, DiskFilter};
pub use dispatcher::{CollectionRequest, Dispatcher};
pub use error::PluginError;
pub use metric::{Metric, MetricValue};
pub use namespace::{Namespace, NamespaceElement};
pub use plugin::{PluginMeta, PsutilCollector};
