#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use promscope_core::{CardinalityScope, ErrorKind, OverflowPolicy};
use promscope_server::config;

#[test]
fn deny_unknown_fields_nested() {
    let bad = r#"
version: 1
metrics:
  cardinality_limt: 10 # typo should fail
"#;

    let err = config::load_from_str(bad).expect_err("must fail");
    assert_eq!(err.kind().as_str(), "bad_config");
}

#[test]
fn ok_minimal_config() {
    let cfg = config::load_from_str("version: 1\n").expect("must parse");
    assert_eq!(cfg.version, 1);
    assert_eq!(cfg.server.listen, "0.0.0.0:9100");
    assert_eq!(cfg.server.scrape_path, "/metrics");
    assert_eq!(cfg.metrics.cardinality_limit, 500);
    assert!(cfg.http.enabled);

    let opts = cfg.metrics.registry_options();
    assert_eq!(opts.cardinality_scope, CardinalityScope::PerMetric);
    assert_eq!(opts.overflow, OverflowPolicy::Reject);
    assert!(opts.count_errors);
}

#[test]
fn full_config_maps_to_registry_options() {
    let ok = r#"
version: 1
server:
  listen: "127.0.0.1:9200"
  scrape_path: "/internal/metrics"
metrics:
  namespace: "shop"
  cardinality_limit: 50
  cardinality_scope: registry
  registry_cardinality_limit: 400
  overflow: fold
  overflow_value: "__other__"
  histograms:
    http_request_duration_seconds: [0.1, 0.5, 1]
http:
  tag_keys: ["name"]
"#;
    let cfg = config::load_from_str(ok).expect("must parse");
    let opts = cfg.metrics.registry_options();
    assert_eq!(opts.namespace.as_deref(), Some("shop"));
    assert_eq!(opts.cardinality_scope, CardinalityScope::Registry { limit: 400 });
    assert_eq!(
        opts.overflow,
        OverflowPolicy::Fold {
            value: "__other__".into()
        }
    );
    assert_eq!(cfg.http.tag_keys, vec!["name".to_string()]);
}

#[test]
fn rejects_bad_values() {
    let cases = [
        "version: 2\n",
        "version: 1\nserver: { listen: \"nope\" }\n",
        "version: 1\nserver: { scrape_path: \"metrics\" }\n",
        "version: 1\nserver: { scrape_path: \"/healthz\" }\n",
        "version: 1\nmetrics: { cardinality_limit: 0 }\n",
        "version: 1\nmetrics: { namespace: \"has-dash\" }\n",
        "version: 1\nmetrics: { histograms: { x: [1, 0.5] } }\n",
        "version: 1\nhttp: { tag_keys: [\"status\"] }\n",
        "version: 1\nhttp: { tag_keys: [\"le\"] }\n",
        "version: 1\nhttp: { duration_buckets: [.nan] }\n",
    ];
    for case in cases {
        assert!(config::load_from_str(case).is_err(), "accepted: {case}");
    }
    let err = config::load_from_str("version: 2\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::UnsupportedVersion);
}

#[test]
fn bad_listen_address_is_named_in_the_error() {
    let err = config::load_from_str("version: 1\nserver: { listen: \"nope\" }\n").unwrap_err();
    assert_eq!(err.kind(), ErrorKind::BadConfig);
    assert!(err.to_string().contains("server.listen is not a socket address: nope"));
}
