//! Request resolution: routes each requested namespace to its domain,
//! enumerates every domain once and materializes the requested fields.

use crate::catalog::{self, Catalog, DOMAIN_INDEX, Domain, MetricDescriptor, PLUGIN, Scope, VENDOR};
use crate::collector::SystemStats;
use crate::config::{CollectorConfig, DiskFilter};
use crate::enumerator::{Demand, DomainSnapshot, Enumerator, ResourceSnapshot};
use crate::error::PluginError;
use crate::metric::Metric;
use crate::namespace::{Namespace, WILDCARD};
use chrono::{DateTime, Utc};
use std::collections::BTreeMap;
use tracing::trace;

/// One requested namespace with the configuration attached to it.
#[derive(Debug, Clone, PartialEq)]
pub struct CollectionRequest {
    pub namespace: Namespace,
    pub config: CollectorConfig,
}

impl CollectionRequest {
    pub fn new(namespace: Namespace) -> Self {
        Self {
            namespace,
            config: CollectorConfig::default(),
        }
    }

    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.config = config;
        self
    }
}

struct Resolved<'r> {
    request: &'r CollectionRequest,
    descriptor: &'static MetricDescriptor,
}

/// Resolves batches of requests against a statistics source.
///
/// Holds no state between calls.
pub struct Dispatcher<S: SystemStats> {
    stats: S,
    catalog: &'static Catalog,
    default_config: CollectorConfig,
}

impl<S: SystemStats> Dispatcher<S> {
    pub fn new(stats: S) -> Self {
        Self {
            stats,
            catalog: catalog::catalog(),
            default_config: CollectorConfig::default(),
        }
    }

    /// Uses another catalog, e.g. one built for a different platform.
    pub fn with_catalog(mut self, catalog: &'static Catalog) -> Self {
        self.catalog = catalog;
        self
    }

    /// Configuration used when no disk request carries its own.
    pub fn with_config(mut self, config: CollectorConfig) -> Self {
        self.default_config = config;
        self
    }

    /// Every metric family this dispatcher can collect.
    pub fn describe(&self) -> &'static [MetricDescriptor] {
        self.catalog.descriptors()
    }

    /// Collects every request, or fails the whole batch.
    ///
    /// Metrics come out grouped by domain in the fixed domain order, then in
    /// request order; a wildcard expands in place in enumeration order.
    pub fn collect(&self, requests: &[CollectionRequest]) -> Result<Vec<Metric>, PluginError> {
        let catalog: &'static Catalog = self.catalog;
        let mut plan: BTreeMap<Domain, Vec<Resolved<'_>>> = BTreeMap::new();
        for request in requests {
            let domain = route(&request.namespace)?;
            let descriptor = catalog
                .resolve(domain, &request.namespace)
                .ok_or_else(|| PluginError::UnknownStatistic {
                    domain,
                    namespace: request.namespace.to_string(),
                })?;
            plan.entry(domain).or_default().push(Resolved {
                request,
                descriptor,
            });
        }

        let filter = self.disk_filter(plan.get(&Domain::Disk).map(Vec::as_slice))?;
        let enumerator = Enumerator::new(&self.stats);
        let mut metrics = Vec::new();

        for (domain, resolved) in &plan {
            let snapshot = enumerator.enumerate(*domain, &demand(resolved), &filter)?;
            let timestamp = Utc::now();

            for item in resolved {
                let before = metrics.len();
                materialize(*domain, item, &snapshot, timestamp, &mut metrics)?;
                trace!(
                    namespace = %item.request.namespace,
                    metrics = metrics.len() - before,
                    "request resolved"
                );
            }
        }

        Ok(metrics)
    }

    fn disk_filter(&self, disk: Option<&[Resolved<'_>]>) -> Result<DiskFilter, PluginError> {
        let config = disk
            .and_then(|resolved| resolved.first())
            .map(|first| &first.request.config)
            .filter(|config| config.mount_points.is_some())
            .unwrap_or(&self.default_config);
        Ok(config.disk_filter()?)
    }
}

/// Domain named by the routing element after the `intel/psutil` prefix.
fn route(namespace: &Namespace) -> Result<Domain, PluginError> {
    let prefixed = namespace.value(0) == Some(VENDOR) && namespace.value(1) == Some(PLUGIN);
    namespace
        .value(DOMAIN_INDEX)
        .filter(|_| prefixed)
        .and_then(Domain::from_token)
        .ok_or_else(|| PluginError::UnknownDomain {
            namespace: namespace.to_string(),
        })
}

fn demand(resolved: &[Resolved<'_>]) -> Demand {
    resolved
        .iter()
        .fold(Demand::default(), |mut demand, item| {
            match item.descriptor.scope {
                Scope::Singleton => demand.singleton = true,
                Scope::Aggregate => demand.aggregate = true,
                Scope::PerResource { .. } => demand.per_resource = true,
            }
            demand
        })
}

fn materialize(
    domain: Domain,
    item: &Resolved<'_>,
    snapshot: &DomainSnapshot,
    timestamp: DateTime<Utc>,
    out: &mut Vec<Metric>,
) -> Result<(), PluginError> {
    let descriptor = item.descriptor;

    match descriptor.scope {
        Scope::Singleton => {
            let resource = snapshot
                .singleton
                .as_ref()
                .ok_or_else(|| not_found(domain, descriptor.field()))?;
            out.push(metric(
                domain,
                descriptor,
                descriptor.namespace.clone(),
                resource,
                timestamp,
            )?);
        }
        Scope::Aggregate => {
            let id = item.request.namespace.value(DOMAIN_INDEX + 1).unwrap_or_default();
            let resource = snapshot
                .aggregate
                .as_ref()
                .ok_or_else(|| not_found(domain, id))?;
            out.push(metric(
                domain,
                descriptor,
                descriptor.namespace.clone(),
                resource,
                timestamp,
            )?);
        }
        Scope::PerResource { index } => {
            let id = item.request.namespace.value(index).unwrap_or_default();
            if id == WILDCARD {
                for resource in &snapshot.resources {
                    let namespace = descriptor.namespace.with_value(index, resource.id.as_str());
                    out.push(metric(domain, descriptor, namespace, resource, timestamp)?);
                }
            } else {
                let resource = snapshot.find(id).ok_or_else(|| not_found(domain, id))?;
                let namespace = descriptor.namespace.with_value(index, id);
                out.push(metric(domain, descriptor, namespace, resource, timestamp)?);
            }
        }
    }

    Ok(())
}

fn metric(
    domain: Domain,
    descriptor: &MetricDescriptor,
    namespace: Namespace,
    resource: &ResourceSnapshot,
    timestamp: DateTime<Utc>,
) -> Result<Metric, PluginError> {
    let value = resource
        .record
        .field(descriptor.field())
        .ok_or_else(|| PluginError::UnknownStatistic {
            domain,
            namespace: namespace.to_string(),
        })?;

    Ok(Metric {
        namespace,
        value,
        unit: descriptor.unit.to_string(),
        tags: resource.tags.clone(),
        timestamp,
    })
}

fn not_found(domain: Domain, resource: &str) -> PluginError {
    PluginError::ResourceNotFound {
        domain,
        resource: resource.to_string(),
    }
}
