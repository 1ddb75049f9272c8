//! Plugin facade exposing the collector to a telemetry host.

use crate::catalog::MetricDescriptor;
use crate::collector::SystemStats;
use crate::config::{CollectorConfig, ConfigPolicy};
use crate::dispatcher::{CollectionRequest, Dispatcher};
use crate::error::PluginError;
use crate::metric::Metric;
use serde::Serialize;

pub const PLUGIN_NAME: &str = "psutil";
pub const PLUGIN_VERSION: u32 = 6;

/// Identity advertised to the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PluginMeta {
    pub name: &'static str,
    pub version: u32,
}

/// The psutil collector plugin.
pub struct PsutilCollector<S: SystemStats> {
    dispatcher: Dispatcher<S>,
}

impl<S: SystemStats> PsutilCollector<S> {
    pub fn new(stats: S) -> Self {
        Self {
            dispatcher: Dispatcher::new(stats),
        }
    }

    /// Collector-level configuration, used when a disk request has none.
    pub fn with_config(self, config: CollectorConfig) -> Self {
        Self {
            dispatcher: self.dispatcher.with_config(config),
        }
    }

    pub fn meta() -> PluginMeta {
        PluginMeta {
            name: PLUGIN_NAME,
            version: PLUGIN_VERSION,
        }
    }

    /// Advertised metric families. The mount filter is validated but the
    /// mounts themselves are only enumerated at collection time.
    pub fn get_metric_types(
        &self,
        config: &CollectorConfig,
    ) -> Result<Vec<MetricDescriptor>, PluginError> {
        config.disk_filter()?;
        Ok(self.dispatcher.describe().to_vec())
    }

    pub fn collect_metrics(
        &self,
        requests: &[CollectionRequest],
    ) -> Result<Vec<Metric>, PluginError> {
        self.dispatcher.collect(requests)
    }

    pub fn get_config_policy(&self) -> ConfigPolicy {
        ConfigPolicy::new()
    }
}

// The facade serves the host catalog, which only Linux populates
#[cfg(all(test, target_os = "linux"))]
mod tests {
    use super::*;
    use crate::collector::{MockFs, ProcfsStats};

    fn collector() -> PsutilCollector<ProcfsStats<MockFs>> {
        PsutilCollector::new(ProcfsStats::new(MockFs::typical_system(), "/proc").with_clock_ticks(100))
    }

    #[test]
    fn test_meta() {
        let meta = PsutilCollector::<ProcfsStats<MockFs>>::meta();
        assert_eq!(meta.name, "psutil");
        assert_eq!(meta.version, 6);
    }

    #[test]
    fn test_get_metric_types_validates_config() {
        let c = collector();
        let types = c.get_metric_types(&CollectorConfig::default()).unwrap();
        assert_eq!(types.len(), crate::catalog::list_metric_descriptors().len());

        assert!(
            c.get_metric_types(&CollectorConfig::with_mount_points("/nowhere"))
                .is_ok()
        );
        assert!(matches!(
            c.get_metric_types(&CollectorConfig::with_mount_points("||")),
            Err(PluginError::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_collect_metrics() {
        let c = collector();
        let metrics = c
            .collect_metrics(&[CollectionRequest::new(
                "/intel/psutil/load/load5".parse().unwrap(),
            )])
            .unwrap();
        assert_eq!(metrics.len(), 1);
        assert_eq!(metrics[0].value.as_f64(), 0.10);
    }

    #[test]
    fn test_collector_config_applies() {
        let c = collector().with_config(CollectorConfig::with_mount_points("all"));
        let metrics = c
            .collect_metrics(&[CollectionRequest::new(
                "|intel|psutil|disk|*|inodes_free".parse().unwrap(),
            )])
            .unwrap();
        assert_eq!(metrics.len(), 6);
    }

    #[test]
    fn test_config_policy() {
        let policy = collector().get_config_policy();
        assert_eq!(policy.rules[0].key, "mount_points");
    }
}
