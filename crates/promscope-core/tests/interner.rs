//! Label set interning and cardinality ceilings.

#![allow(clippy::unwrap_used)]
#![allow(clippy::expect_used)]
#![allow(clippy::panic)]

use std::sync::Arc;

use promscope_core::interner::{
    CardinalityBudget, CardinalityPolicy, LabelInterner, FOLD_SET_LIMIT,
};
use promscope_core::{LabelSet, MetricsError, OverflowPolicy};

fn ls(pairs: &[(&str, &str)]) -> LabelSet {
    LabelSet::from_pairs(pairs)
}

#[test]
fn equal_sets_in_any_order_share_a_handle() {
    let i = LabelInterner::new("m", CardinalityPolicy::per_metric(10), &[]);
    let a = i.intern(&ls(&[("route", "/"), ("status", "200")])).unwrap();
    let b = i.intern(&ls(&[("status", "200"), ("route", "/")])).unwrap();
    let c = i.intern(&ls(&[("route", "/"), ("status", "500")])).unwrap();
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(i.cardinality(), 2);
    assert_eq!(i.label_set(a), Some(ls(&[("route", "/"), ("status", "200")])));
}

#[test]
fn duplicate_key_keeps_last_value() {
    let set = ls(&[("a", "1"), ("a", "2")]);
    assert_eq!(set.len(), 1);
    assert_eq!(set.get("a"), Some("2"));
}

#[test]
fn ceiling_th_set_succeeds_and_next_fails() {
    let i = LabelInterner::new("m", CardinalityPolicy::per_metric(3), &[]);
    for n in 0..3 {
        let n = n.to_string();
        i.intern(&ls(&[("n", n.as_str())])).unwrap();
    }
    let err = i.intern(&ls(&[("n", "3")])).unwrap_err();
    assert_eq!(
        err,
        MetricsError::CardinalityExceeded {
            metric: "m".into(),
            limit: 3
        }
    );
    // known sets still resolve after the ceiling is hit
    assert!(i.intern(&ls(&[("n", "0")])).is_ok());
    assert_eq!(i.cardinality(), 3);
}

#[test]
fn fold_policy_maps_overflow_to_fallback_set() {
    let policy = CardinalityPolicy {
        limit: 1,
        overflow: OverflowPolicy::Fold {
            value: "other".into(),
        },
        shared: None,
    };
    let i = LabelInterner::new("m", policy, &[]);
    i.intern(&ls(&[("name", "alice")])).unwrap();
    let bob = i.intern(&ls(&[("name", "bob")])).unwrap();
    let carol = i.intern(&ls(&[("name", "carol")])).unwrap();
    assert_eq!(bob, carol);
    assert_eq!(i.label_set(bob), Some(ls(&[("name", "other")])));
    assert_eq!(i.cardinality(), 1);
}

#[test]
fn fold_targets_are_bounded_when_key_names_vary() {
    let policy = CardinalityPolicy {
        limit: 1,
        overflow: OverflowPolicy::Fold {
            value: "other".into(),
        },
        shared: None,
    };
    let i = LabelInterner::new("m", policy, &[]);
    i.intern(&ls(&[("k", "v")])).unwrap();

    let mut folded = 0;
    let mut rejected = 0;
    for n in 0..200 {
        let key = format!("k{n}");
        match i.intern(&ls(&[(key.as_str(), "v")])) {
            Ok(_) => folded += 1,
            Err(MetricsError::CardinalityExceeded { limit: 1, .. }) => rejected += 1,
            Err(e) => panic!("unexpected error: {e}"),
        }
    }
    assert_eq!(folded, FOLD_SET_LIMIT);
    assert_eq!(rejected, 200 - FOLD_SET_LIMIT);
    assert!(i.label_sets().len() <= 1 + FOLD_SET_LIMIT);
    assert_eq!(i.cardinality(), 1);

    // existing fold targets keep absorbing their key set
    let again = i.intern(&ls(&[("k0", "late")])).unwrap();
    assert_eq!(i.label_set(again), Some(ls(&[("k0", "other")])));
}

#[test]
fn handles_are_owned_by_their_interner() {
    let a = LabelInterner::new("a", CardinalityPolicy::per_metric(10), &[]);
    let b = LabelInterner::new("b", CardinalityPolicy::per_metric(10), &[]);
    let ha = a.intern(&ls(&[("k", "1")])).unwrap();
    let hb = b.intern(&ls(&[("k", "1")])).unwrap();
    assert_eq!(ha.index(), hb.index());
    assert_ne!(ha, hb);
    assert!(a.owns(ha));
    assert!(!a.owns(hb));
    assert!(!b.owns(ha));
}

#[test]
fn shared_budget_caps_all_interners() {
    let budget = Arc::new(CardinalityBudget::new(2));
    let policy = CardinalityPolicy {
        limit: 10,
        overflow: OverflowPolicy::Reject,
        shared: Some(Arc::clone(&budget)),
    };
    let a = LabelInterner::new("a", policy.clone(), &[]);
    let b = LabelInterner::new("b", policy, &[]);

    a.intern(&ls(&[("k", "1")])).unwrap();
    b.intern(&ls(&[("k", "1")])).unwrap();
    let err = a.intern(&ls(&[("k", "2")])).unwrap_err();
    assert!(matches!(err, MetricsError::CardinalityExceeded { limit: 2, .. }));
    assert_eq!(budget.used(), 2);
}

#[test]
fn reserved_and_malformed_label_names_are_rejected() {
    let i = LabelInterner::new("h", CardinalityPolicy::per_metric(10), &["le"]);
    assert!(matches!(
        i.intern(&ls(&[("le", "1")])),
        Err(MetricsError::InvalidLabel(_))
    ));
    assert!(matches!(
        i.intern(&ls(&[("__name__", "x")])),
        Err(MetricsError::InvalidLabel(_))
    ));
    assert!(matches!(
        i.intern(&ls(&[("0bad", "x")])),
        Err(MetricsError::InvalidLabel(_))
    ));
    assert_eq!(i.cardinality(), 0);
}

#[test]
fn concurrent_interning_never_overshoots_ceiling() {
    let i = LabelInterner::new("m", CardinalityPolicy::per_metric(50), &[]);
    std::thread::scope(|s| {
        for t in 0..8 {
            let i = &i;
            s.spawn(move || {
                for n in 0..40 {
                    let v = format!("{t}-{n}");
                    let _ = i.intern(&ls(&[("v", v.as_str())]));
                }
            });
        }
    });
    assert_eq!(i.cardinality(), 50);
    assert_eq!(i.label_sets().len(), 50);
}
