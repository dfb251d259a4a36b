//! Counter and histogram store semantics.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::atomic::{AtomicBool, Ordering};

use promscope_core::counter::CounterStore;
use promscope_core::histogram::HistogramStore;
use promscope_core::interner::{CardinalityPolicy, LabelInterner};
use promscope_core::{Buckets, LabelSet, MetricsError};

fn handle() -> promscope_core::LabelSetHandle {
    LabelInterner::new("m", CardinalityPolicy::per_metric(1), &[])
        .intern(&LabelSet::new())
        .unwrap()
}

#[test]
fn concurrent_increments_are_not_lost() {
    let store = CounterStore::new();
    let h = handle();
    std::thread::scope(|s| {
        for _ in 0..8 {
            s.spawn(|| {
                for _ in 0..10_000 {
                    store.increment(h, 1.0).unwrap();
                }
            });
        }
    });
    assert_eq!(store.get(h), 80_000.0);
    assert_eq!(store.snapshot(), vec![(h, 80_000.0)]);
}

#[test]
fn negative_and_nan_deltas_are_rejected() {
    let store = CounterStore::new();
    let h = handle();
    assert_eq!(store.increment(h, -1.0), Err(MetricsError::InvalidDelta(-1.0)));
    assert!(matches!(
        store.increment(h, f64::NAN),
        Err(MetricsError::InvalidDelta(_))
    ));
    store.increment(h, 0.0).unwrap();
    assert_eq!(store.get(h), 0.0);
}

#[test]
fn boundary_value_lands_in_its_own_bucket() {
    let store = HistogramStore::new(Buckets::new(vec![0.1, 0.5, 1.0]).unwrap());
    let h = handle();
    store.observe(h, 0.5).unwrap();

    let (_, v) = store.snapshot().pop().unwrap();
    assert_eq!(v.cumulative, vec![0, 1, 1, 1]);
    assert_eq!(v.count, 1);
}

#[test]
fn infinities_go_to_extreme_buckets_and_nan_fails() {
    let store = HistogramStore::new(Buckets::new(vec![1.0, 2.0]).unwrap());
    let h = handle();
    store.observe(h, f64::NEG_INFINITY).unwrap();
    store.observe(h, f64::INFINITY).unwrap();
    assert!(matches!(
        store.observe(h, f64::NAN),
        Err(MetricsError::InvalidObservation(_))
    ));

    let (_, v) = store.snapshot().pop().unwrap();
    assert_eq!(v.cumulative, vec![1, 1, 2]);
    assert_eq!(v.count, 2);
}

#[test]
fn bucket_validation() {
    assert!(Buckets::new(vec![1.0, 1.0]).is_err());
    assert!(Buckets::new(vec![2.0, 1.0]).is_err());
    assert!(Buckets::new(vec![f64::NAN]).is_err());
    let b = Buckets::new(vec![1.0, 2.0, f64::INFINITY]).unwrap();
    assert_eq!(b.bounds(), &[1.0, 2.0]);
    assert_eq!(Buckets::linear(1.0, 1.0, 3).unwrap().bounds(), &[1.0, 2.0, 3.0]);
    assert_eq!(
        Buckets::exponential(1.0, 2.0, 4).unwrap().bounds(),
        &[1.0, 2.0, 4.0, 8.0]
    );
    assert!(Buckets::exponential(0.0, 2.0, 4).is_err());
}

#[test]
fn snapshots_stay_consistent_under_concurrent_writers() {
    let store = HistogramStore::new(Buckets::new(vec![0.5, 1.5]).unwrap());
    let h = handle();
    let stop = AtomicBool::new(false);

    let consistent = std::thread::scope(|s| {
        for _ in 0..4 {
            s.spawn(|| {
                while !stop.load(Ordering::Relaxed) {
                    store.observe(h, 1.0).unwrap();
                }
            });
        }
        let ok = (0..200).all(|_| {
            store.snapshot().into_iter().all(|(_, v)| {
                v.cumulative.last() == Some(&v.count)
                    && v.cumulative.windows(2).all(|w| w[0] <= w[1])
                    && v.sum == v.count as f64
            })
        });
        stop.store(true, Ordering::Relaxed);
        ok
    });
    assert!(consistent);
}
