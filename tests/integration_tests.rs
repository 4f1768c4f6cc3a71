use kube_usage_monitor::{
    aggregate, aggregate_log, extract_usage, load_settings_with_env, normalize_cpu, normalize_memory,
    plan_load_tests, render_usage_table, KubeApiSource, MetricsSource, MockEnvironment, MonitorConfig,
    PodUsage, SampleLog, SourceKind, UsageRange, UsageSample, UsageSampler,
};
use kube_usage_monitor::loadtest::parse_loadtest_config;
use kube_usage_monitor::metrics::parse_snapshot;
use std::collections::{BTreeMap, BTreeSet};
use std::time::Duration;

const METRICS_BODY: &str = r#"{
  "kind": "PodMetricsList",
  "apiVersion": "metrics.k8s.io/v1beta1",
  "metadata": {},
  "items": [
    {
      "metadata": {"name": "web-1", "namespace": "ci", "creationTimestamp": "2024-05-01T10:00:00Z"},
      "timestamp": "2024-05-01T10:00:00Z",
      "window": "10.5s",
      "containers": [{"name": "web", "usage": {"cpu": "500n", "memory": "131072"}}]
    },
    {
      "metadata": {"name": "api-2", "namespace": "ci"},
      "timestamp": "2024-05-01T10:00:00Z",
      "window": "10.5s",
      "containers": [
        {"name": "api", "usage": {"cpu": "250m", "memory": "64Mi"}},
        {"name": "envoy", "usage": {"cpu": "2", "memory": "1Gi"}}
      ]
    }
  ]
}"#;

#[test]
fn test_unit_conversion_edge_cases() {
    assert_eq!(normalize_cpu("0n"), Ok(0.0));
    assert_eq!(normalize_cpu("1n"), Ok(0.000001));
    assert_eq!(normalize_cpu("  100m  "), Ok(100.0));
    assert_eq!(normalize_cpu("16"), Ok(16000.0));

    assert_eq!(normalize_memory("0"), Ok(0.0));
    assert_eq!(normalize_memory("512Ki"), Ok(0.5));
    assert_eq!(normalize_memory("\t3Gi\n"), Ok(3072.0));

    // suffixes the metrics API does not emit for usage are rejected, not guessed
    assert!(normalize_cpu("1500u").is_err());
    assert!(normalize_memory("1Ti").is_err());
    assert!(normalize_memory("1K").is_err());
}

#[test]
fn test_snapshot_to_usage_scenarios() {
    let snapshot = parse_snapshot(METRICS_BODY.as_bytes()).unwrap();
    let usage = extract_usage(&snapshot, None).unwrap();

    assert_eq!(usage["web-1"], PodUsage { cpu: 0.0005, memory: 0.125 });
    // sidecar containers are not counted
    assert_eq!(usage["api-2"], PodUsage { cpu: 250.0, memory: 64.0 });

    let only_web = BTreeSet::from(["web-1".to_string()]);
    let usage = extract_usage(&snapshot, Some(&only_web)).unwrap();
    assert_eq!(usage.len(), 1);
}

#[tokio::test]
async fn test_kube_api_source_reads_metrics_endpoint() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("GET", "/apis/metrics.k8s.io/v1beta1/namespaces/ci/pods")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(METRICS_BODY)
        .create_async()
        .await;

    let config = kube::Config::new(server.url().parse().unwrap());
    let client = kube::Client::try_from(config).unwrap();
    let source = KubeApiSource::new(client);

    let snapshot = source.fetch("ci").await.unwrap();
    mock.assert_async().await;
    assert_eq!(snapshot.items.len(), 2);
    assert_eq!(snapshot.items[0].name(), Some("web-1"));
}

#[tokio::test]
async fn test_kube_api_source_reports_server_errors() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/apis/metrics.k8s.io/v1beta1/namespaces/ci/pods")
        .with_status(503)
        .with_header("content-type", "application/json")
        .with_body(r#"{"kind":"Status","apiVersion":"v1","status":"Failure","message":"the server is currently unable to handle the request","reason":"ServiceUnavailable","code":503}"#)
        .create_async()
        .await;

    let config = kube::Config::new(server.url().parse().unwrap());
    let source = KubeApiSource::new(kube::Client::try_from(config).unwrap());

    assert!(source.fetch("ci").await.is_err());
}

#[tokio::test]
async fn test_sample_then_report_pipeline() {
    let mut server = mockito::Server::new_async().await;
    let _mock = server
        .mock("GET", "/apis/metrics.k8s.io/v1beta1/namespaces/ci/pods")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(METRICS_BODY)
        .expect_at_least(1)
        .create_async()
        .await;

    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("usage.jsonl");
    let cfg = MonitorConfig {
        namespace: "ci".to_string(),
        pod_filter: Some(BTreeSet::from(["web-1".to_string(), "api-2".to_string()])),
        interval: Duration::from_secs(1),
        duration: Duration::from_secs(1),
        output: path.clone(),
        source: SourceKind::Api,
    };
    cfg.validate().unwrap();

    let config = kube::Config::new(server.url().parse().unwrap());
    let source = KubeApiSource::new(kube::Client::try_from(config).unwrap());
    let mut log = SampleLog::open(&path).unwrap();
    let summary = UsageSampler::new(&source, &cfg).run(&mut log).await.unwrap();
    drop(log);

    assert_eq!(summary.recorded, summary.ticks);
    assert_eq!(summary.recorded, 1);

    let usage = aggregate_log(&path).unwrap();
    assert_eq!(usage.samples, summary.recorded);
    assert_eq!(
        usage.get("api-2"),
        Some(&UsageRange { min_cpu: 250.0, max_cpu: 250.0, min_memory: 64.0, max_memory: 64.0 })
    );

    let md = render_usage_table(&usage);
    assert!(md.contains("| api-2 | 250 | 250 | 64 | 64 |"));
    assert!(md.contains("| web-1 | 0.0005 | 0.0005 | 0.125 | 0.125 |"));
}

#[test]
fn test_aggregate_over_interleaved_pods() {
    let sample = |ts: f64, pods: &[(&str, f64, f64)]| UsageSample {
        timestamp: ts,
        usage: pods
            .iter()
            .map(|(n, c, m)| (n.to_string(), PodUsage { cpu: *c, memory: *m }))
            .collect::<BTreeMap<_, _>>(),
    };
    let samples = vec![
        sample(10.0, &[("x", 10.0, 100.0)]),
        sample(11.0, &[("y", 1.0, 1.0)]),
        sample(11.0, &[("x", 30.0, 50.0), ("y", 4.0, 0.5)]),
    ];

    let agg = aggregate(&samples);
    assert_eq!(agg, aggregate(&samples));
    assert_eq!(
        agg.get("x"),
        Some(&UsageRange { min_cpu: 10.0, max_cpu: 30.0, min_memory: 50.0, max_memory: 100.0 })
    );
    assert_eq!(
        agg.get("y"),
        Some(&UsageRange { min_cpu: 1.0, max_cpu: 4.0, min_memory: 0.5, max_memory: 1.0 })
    );
}

#[test]
fn test_loadtest_defaults_from_environment() {
    let env = MockEnvironment::new()
        .with_var("VEGETA_RATE", "25")
        .with_var("VEGETA_DURATION", "");
    let settings = load_settings_with_env(&env);

    let entries = parse_loadtest_config(
        r#"
homepage:
  target: http://web.ci.svc.cluster.local/
checkout:
  method: POST
  target: http://api.ci.svc.cluster.local/checkout
  duration: 1m
broken:
  method: GET
"#,
    )
    .unwrap();
    let plans = plan_load_tests(&entries, &settings);

    assert_eq!(plans.len(), 2);
    assert_eq!(plans[0].name, "homepage");
    assert_eq!(plans[0].method, "GET");
    assert_eq!(plans[0].rate, "25");
    assert_eq!(plans[0].duration, "10s");
    assert_eq!(plans[1].method, "POST");
    assert_eq!(plans[1].duration, "1m");
    assert_eq!(plans[1].attack_args(), vec!["attack", "-rate", "25", "-duration", "1m"]);
}
