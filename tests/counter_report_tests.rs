#![cfg(feature = "stats")]

use std::sync::Arc;
use std::thread;
use tagcache::{AverageCounter, CacheCounter, Counter, CounterRegistry, Error, SimpleCounter};

fn keys(counter: &dyn Counter) -> Vec<String> {
    counter.create_report().keys().map(str::to_string).collect()
}

#[test]
fn test_simple_counter_report_keys() {
    let counter = SimpleCounter::new("requests");
    assert_eq!(keys(&counter), ["count", "peak"]);

    counter.inc();
    counter.inc();
    counter.dec().unwrap();
    let report = counter.create_report();
    assert_eq!(report.name(), "requests");
    assert_eq!(report.get("count"), Some("1"));
    assert_eq!(report.get("peak"), Some("2"));
}

#[test]
fn test_simple_counter_underflow_is_an_error() {
    let counter = SimpleCounter::new("requests");
    assert!(matches!(counter.dec(), Err(Error::CounterUnderflow { .. })));
    assert_eq!(counter.count(), 0);
}

#[test]
fn test_average_counter_empty_report_has_only_count() {
    let counter = AverageCounter::new("render-time");
    assert_eq!(keys(&counter), ["count"]);
    assert_eq!(counter.create_report().get("count"), Some("0"));
    assert_eq!(counter.avg(), None);
}

#[test]
fn test_average_counter_add_and_remove() {
    let counter = AverageCounter::new("render-time");
    counter.add(5).unwrap();
    counter.add(3).unwrap();
    counter.remove(3).unwrap();

    let report = counter.create_report();
    assert_eq!(keys(&counter), ["avg", "count", "max", "min", "total"]);
    assert_eq!(report.get("count"), Some("1"));
    assert_eq!(report.get("total"), Some("5"));
    assert_eq!(report.get("min"), Some("3"));
    assert_eq!(report.get("max"), Some("5"));
    assert_eq!(report.get("avg"), Some("5"));
}

#[test]
fn test_average_counter_avg_truncates() {
    let counter = AverageCounter::new("render-time");
    counter.add(2).unwrap();
    counter.add(3).unwrap();
    assert_eq!(counter.avg(), Some(2));
}

#[test]
fn test_average_counter_zero_is_ignored() {
    let counter = AverageCounter::new("render-time");
    counter.add(0).unwrap();
    assert_eq!(counter.count(), 0);
    assert!(counter.remove(0).is_ok());
}

#[test]
fn test_average_counter_remove_underflow_leaves_state() {
    let counter = AverageCounter::new("render-time");
    assert!(counter.remove(1).is_err());

    counter.add(4).unwrap();
    assert!(counter.remove(10).is_err());
    assert_eq!(counter.count(), 1);
    assert_eq!(counter.total(), 4);
}

#[test]
fn test_average_counter_total_overflow_is_an_error() {
    let counter = AverageCounter::new("render-time");
    counter.add(u64::MAX).unwrap();
    assert!(matches!(counter.add(1), Err(Error::CounterOverflow { .. })));

    let report = counter.create_report();
    assert_eq!(report.get("count"), Some("1"));
    assert_eq!(report.get("total"), Some(u64::MAX.to_string().as_str()));
    assert!(counter.remove(u64::MAX).is_ok());
    assert_eq!(counter.count(), 0);
}

#[test]
fn test_cache_counter_report() {
    let counter = CacheCounter::new("page-cache");
    counter.inc_stored();
    counter.inc_loaded();
    counter.inc_loaded();
    counter.inc_removed();
    counter.inc_used_memory(100);
    counter.dec_used_memory(40);

    let report = counter.create_report();
    assert_eq!(keys(&counter), ["loaded", "removed", "stored", "used-memory"]);
    assert_eq!(report.get("stored"), Some("1"));
    assert_eq!(report.get("loaded"), Some("2"));
    assert_eq!(report.get("removed"), Some("1"));
    assert_eq!(report.get("used-memory"), Some("60"));
}

#[test]
fn test_cache_counter_used_memory_goes_negative() {
    let counter = CacheCounter::new("page-cache");
    counter.dec_used_memory(16);
    assert_eq!(counter.used_memory(), -16);
    assert_eq!(counter.create_report().get("used-memory"), Some("-16"));
}

#[test]
fn test_concurrent_updates_are_not_lost() {
    let counter = Arc::new(AverageCounter::new("render-time"));
    let handles: Vec<_> = (0..8)
        .map(|_| {
            let counter = Arc::clone(&counter);
            thread::spawn(move || {
                for _ in 0..1000 {
                    counter.add(2).unwrap();
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(counter.count(), 8000);
    assert_eq!(counter.total(), 16000);
    assert_eq!(counter.avg(), Some(2));
}

#[test]
fn test_registry_json_reports() {
    let registry = CounterRegistry::new();
    registry.simple("requests").inc();
    registry.cache("page-cache").inc_stored();

    let json: serde_json::Value = serde_json::from_str(&registry.to_json().unwrap()).unwrap();
    let reports = json.as_array().unwrap();
    assert_eq!(reports.len(), 2);
    assert_eq!(reports[0]["name"], "page-cache");
    assert_eq!(reports[0]["attributes"]["stored"], "1");
    assert_eq!(reports[1]["name"], "requests");
    assert_eq!(reports[1]["attributes"]["count"], "1");
}
