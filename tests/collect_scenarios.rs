//! End-to-end collection against simulated hosts.
//!
//! The collector only advertises metrics where procfs exists.
#![cfg(target_os = "linux")]

use psutil_collector::collector::{MockFs, ProcfsStats};
use psutil_collector::{
    CollectionRequest, CollectorConfig, Domain, MetricValue, Namespace, PluginError,
    PsutilCollector, Scope,
};

fn collector(fs: MockFs) -> PsutilCollector<ProcfsStats<MockFs>> {
    PsutilCollector::new(ProcfsStats::new(fs, "/proc").with_clock_ticks(100))
}

fn req(namespace: &str) -> CollectionRequest {
    CollectionRequest::new(namespace.parse().unwrap())
}

fn sample_resource(domain: Domain) -> &'static str {
    match domain {
        Domain::Cpu => "cpu0",
        Domain::Net => "eth0",
        Domain::Disk => "/",
        Domain::Load | Domain::Vm => unreachable!("{} has no resources", domain),
    }
}

#[test]
fn test_every_descriptor_materializes_to_one_metric() {
    let c = collector(MockFs::with_conntrack());
    let descriptors = c.get_metric_types(&CollectorConfig::default()).unwrap();
    assert!(!descriptors.is_empty());

    for descriptor in &descriptors {
        let namespace: Namespace = match descriptor.scope {
            Scope::PerResource { index } => descriptor
                .namespace
                .with_value(index, sample_resource(descriptor.domain)),
            Scope::Singleton | Scope::Aggregate => descriptor.namespace.clone(),
        };
        let request: Namespace = namespace.to_string().parse().unwrap();

        let metrics = c
            .collect_metrics(&[CollectionRequest::new(request.clone())])
            .unwrap_or_else(|e| panic!("{}: {}", request, e));
        assert_eq!(metrics.len(), 1, "{}", request);
        assert!(metrics[0].namespace.same_values(&request), "{}", request);
        assert_eq!(metrics[0].unit, descriptor.unit);
    }
}

#[test]
fn test_four_core_mixed_batch_yields_seven_metrics() {
    let c = collector(MockFs::typical_system());
    let metrics = c
        .collect_metrics(&[
            req("/intel/psutil/load/load1"),
            req("/intel/psutil/load/load5"),
            req("/intel/psutil/vm/total"),
            req("/intel/psutil/cpu/*/user"),
        ])
        .unwrap();

    assert_eq!(metrics.len(), 7);
    let count = |suffix: &str| {
        metrics
            .iter()
            .filter(|m| m.namespace.last() == Some(suffix))
            .count()
    };
    assert_eq!(count("load1"), 1);
    assert_eq!(count("load5"), 1);
    assert_eq!(count("total"), 1);
    assert_eq!(count("user"), 4);
}

#[test]
fn test_double_wildcard_expands_independently() {
    let c = collector(MockFs::typical_system());
    let metrics = c
        .collect_metrics(&[
            req("/intel/psutil/net/*/packets_recv"),
            req("/intel/psutil/net/*/packets_recv"),
        ])
        .unwrap();
    let rendered: Vec<String> = metrics.iter().map(|m| m.namespace.to_string()).collect();
    assert_eq!(
        rendered,
        vec![
            "/intel/psutil/net/lo/packets_recv",
            "/intel/psutil/net/eth0/packets_recv",
            "/intel/psutil/net/lo/packets_recv",
            "/intel/psutil/net/eth0/packets_recv",
        ]
    );
}

#[test]
fn test_bogus_domain_returns_nothing() {
    let c = collector(MockFs::typical_system());
    let result = c.collect_metrics(&[
        req("/intel/psutil/vm/free"),
        req("/intel/psutil/bogus/x"),
        req("/intel/psutil/cpu/*/idle"),
    ]);
    assert!(matches!(result, Err(PluginError::UnknownDomain { .. })));
}

#[test]
fn test_all_mounts_superset_of_physical() {
    let c = collector(MockFs::typical_system());
    let mounts = |filter: &str| -> Vec<String> {
        c.collect_metrics(&[req("|intel|psutil|disk|*|total")
            .with_config(CollectorConfig::with_mount_points(filter))])
            .unwrap()
            .into_iter()
            .filter_map(|m| m.namespace.value(3).map(String::from))
            .collect()
    };

    let physical = mounts("physical");
    let all = mounts("all");
    assert_eq!(physical, vec!["/", "/var", "/boot"]);
    assert!(physical.iter().all(|m| all.contains(m)));
    assert!(all.len() > physical.len());
    assert_eq!(mounts("*"), all);
}

#[test]
fn test_net_aggregate_sums_interfaces() {
    let c = collector(MockFs::typical_system());
    let metrics = c
        .collect_metrics(&[
            req("/intel/psutil/net/all/bytes_recv"),
            req("/intel/psutil/net/eth0/bytes_recv"),
        ])
        .unwrap();
    assert_eq!(metrics[0].unit, metrics[1].unit);
    assert_ne!(metrics[0].value, metrics[1].value);
    assert_eq!(metrics[0].value, MetricValue::U64(12_345_678 + 987_654_321));

    // With a single interface the aggregate equals it
    let c = collector(MockFs::single_interface());
    let metrics = c
        .collect_metrics(&[
            req("/intel/psutil/net/all/bytes_recv"),
            req("/intel/psutil/net/eth0/bytes_recv"),
        ])
        .unwrap();
    assert_eq!(metrics[0].value, metrics[1].value);
}

#[test]
fn test_mount_point_with_space() {
    let c = collector(MockFs::with_spaced_mount());
    let metrics = c
        .collect_metrics(&[req("|intel|psutil|disk|/mnt/my disk|percent")])
        .unwrap();
    assert_eq!(metrics.len(), 1);
    assert_eq!(metrics[0].value, MetricValue::F64(50.0));
    assert_eq!(
        metrics[0].namespace.to_string(),
        "|intel|psutil|disk|/mnt/my disk|percent"
    );
}

#[test]
fn test_unknown_field_on_known_resource() {
    let c = collector(MockFs::typical_system());
    let err = c
        .collect_metrics(&[req("/intel/psutil/net/eth0/mtu_probe")])
        .unwrap_err();
    assert!(matches!(err, PluginError::UnknownStatistic { domain: Domain::Net, .. }));
}

#[test]
fn test_metrics_serialize_to_json() {
    let c = collector(MockFs::typical_system());
    let metrics = c
        .collect_metrics(&[req("/intel/psutil/net/eth0/errin")])
        .unwrap();
    let json = serde_json::to_value(&metrics[0]).unwrap();
    assert_eq!(json["value"], 5);
    assert_eq!(json["tags"]["hardware_addr"], "52:54:00:12:34:56");
}
