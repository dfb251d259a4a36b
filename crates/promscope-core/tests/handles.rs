//! Recording through pre-interned handles and bound recorders.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use promscope_core::{Buckets, ErrorKind, LabelSet, MetricsError, Registry};

fn ls(pairs: &[(&str, &str)]) -> LabelSet {
    LabelSet::from_pairs(pairs)
}

#[test]
fn bound_counter_accumulates_under_its_labels() {
    let r = Registry::default();
    let c = r.counter("jobs_total", "Jobs.").unwrap();
    let bound = c.with(&ls(&[("queue", "fast")])).unwrap();
    bound.inc().unwrap();
    bound.add(2.5).unwrap();
    c.inc(&ls(&[("queue", "fast")])).unwrap();

    assert_eq!(c.get(&ls(&[("queue", "fast")])), 4.5);
    assert_eq!(c.get(&ls(&[("queue", "slow")])), 0.0);
}

#[test]
fn increment_with_interned_handle() {
    let r = Registry::default();
    let c = r.counter("jobs_total", "Jobs.").unwrap();
    let h = c.metric().intern(&ls(&[("queue", "slow")])).unwrap();
    c.increment(h, 3.0).unwrap();
    c.increment(h, 0.0).unwrap();
    assert_eq!(c.get(&ls(&[("queue", "slow")])), 3.0);
}

#[test]
fn bad_values_through_bound_handles_are_counted() {
    let r = Registry::default();
    let c = r.counter("jobs_total", "Jobs.").unwrap();
    let h = r
        .histogram("job_seconds", "Job time.", Buckets::default_latency())
        .unwrap();
    let bc = c.with(&LabelSet::new()).unwrap();
    let bh = h.with(&LabelSet::new()).unwrap();

    assert!(matches!(bc.add(-1.0), Err(MetricsError::InvalidDelta(_))));
    assert!(matches!(bc.add(f64::NAN), Err(MetricsError::InvalidDelta(_))));
    assert!(matches!(
        bh.observe(f64::NAN),
        Err(MetricsError::InvalidObservation(_))
    ));
    assert!(matches!(
        h.observe_handle(bh.handle(), f64::NAN),
        Err(MetricsError::InvalidObservation(_))
    ));

    assert_eq!(r.recording_errors("jobs_total", ErrorKind::InvalidDelta), 2);
    assert_eq!(r.recording_errors("job_seconds", ErrorKind::InvalidObservation), 2);
    assert_eq!(c.get(&LabelSet::new()), 0.0);

    let snap = r.snapshot();
    let errors = snap.get("metrics_recording_errors_total").unwrap();
    let reason = ls(&[("metric", "job_seconds"), ("reason", "invalid_observation")]);
    assert_eq!(errors.counter(&reason), Some(2.0));
}

#[test]
fn bound_histogram_observes_into_buckets() {
    let r = Registry::default();
    let h = r
        .histogram("size_bytes", "Size.", Buckets::new(vec![1.0, 10.0]).unwrap())
        .unwrap();
    let bound = h.with(&ls(&[("kind", "blob")])).unwrap();
    bound.observe(0.5).unwrap();
    bound.observe(10.0).unwrap();
    h.observe_handle(bound.handle(), 50.0).unwrap();

    let snap = h.metric().snapshot();
    let sample = snap.histogram(&ls(&[("kind", "blob")])).unwrap();
    assert_eq!(sample.count, 3);
    assert_eq!(sample.sum, 60.5);
    assert_eq!(sample.bucket(1.0), Some(1));
    assert_eq!(sample.bucket(10.0), Some(2));
    assert_eq!(sample.bucket(f64::INFINITY), Some(3));
}

#[test]
fn handle_from_another_counter_is_rejected() {
    let r = Registry::default();
    let a = r.counter("a_total", "A.").unwrap();
    let b = r.counter("b_total", "B.").unwrap();
    let ha = a.metric().intern(&ls(&[("k", "1")])).unwrap();

    let err = b.increment(ha, 1.0).unwrap_err();
    assert!(matches!(err, MetricsError::InvalidLabel(_)));
    assert_eq!(r.recording_errors("b_total", ErrorKind::InvalidInput), 1);

    let snap = r.snapshot();
    assert!(snap.get("b_total").unwrap().is_empty());
    assert_eq!(a.get(&ls(&[("k", "1")])), 0.0);
}

#[test]
fn handle_from_another_histogram_is_rejected() {
    let r = Registry::default();
    let a = r
        .histogram("a_seconds", "A.", Buckets::default_latency())
        .unwrap();
    let b = r
        .histogram("b_seconds", "B.", Buckets::default_latency())
        .unwrap();
    let ha = a.with(&LabelSet::new()).unwrap().handle();

    assert!(matches!(
        b.observe_handle(ha, 0.1),
        Err(MetricsError::InvalidLabel(_))
    ));
    assert!(r.snapshot().get("b_seconds").unwrap().is_empty());
}
