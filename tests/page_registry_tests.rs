use std::panic::{catch_unwind, AssertUnwindSafe};
use std::time::Duration;

use serde_json::{json, Value};
use webmon::page::{Page, RegistryError};
use webmon::protocol::{FilterSpec, VariableType};
use webmon::transport::PageId;
use webmon::DurationUnit;

#[test]
fn test_registration_order_survives_mutation() {
    let page = Page::new();
    let zeta = page.counter("zeta").unwrap();
    let alpha = page.timer("alpha").unwrap();
    let mid = page.counter("mid").unwrap();

    // Mutate in a different order than declaration.
    mid.set(4.0);
    alpha.record(12.0);
    zeta.increment(2.0);
    alpha.set_description("changed later");

    let names: Vec<String> = page.registry().snapshot().into_iter().map(|s| s.name).collect();
    assert_eq!(names, vec!["zeta", "alpha", "mid"], "Snapshot must follow declaration order");
    assert_eq!(page.registry().names(), names);
}

#[test]
fn test_duplicate_names_rejected() {
    let page = Page::new();
    page.counter("requests").unwrap();
    let err = page.timer("requests").unwrap_err();
    assert_eq!(err, RegistryError::DuplicateName("requests".to_string()));
    assert_eq!(page.registry().len(), 1, "The rejected variable must not be registered");
}

#[test]
fn test_counter_capture_is_pure() {
    let page = Page::new();
    let counter = page.counter("hits").unwrap();
    counter.incr();
    counter.incr();
    counter.increment(3.0);
    assert_eq!(counter.value(), 5.0);

    let first = page.registry().snapshot();
    let second = page.registry().snapshot();
    assert_eq!(first[0].value, 5.0);
    assert_eq!(second[0].value, 5.0, "Counters are not reset by capture");

    counter.set(1.0);
    assert_eq!(page.registry().snapshot()[0].value, 1.0);
}

#[test]
fn test_timer_reset_on_capture() {
    let page = Page::new();
    let latency = page.timer("latency").unwrap();
    for ms in [10.0, 20.0, 30.0] {
        latency.record(ms);
    }

    let captured = page.registry().snapshot();
    assert_eq!(captured[0].value, 20.0, "Capture yields the average since the last capture");

    let again = page.registry().snapshot();
    assert_eq!(again[0].value, 0.0, "A capture with no new records yields 0");

    latency.record_duration(Duration::from_millis(8));
    assert_eq!(page.registry().snapshot()[0].value, 8.0);
}

#[test]
fn test_timer_measure_records_even_on_panic() {
    let page = Page::new();
    let timer = page.timer("work").unwrap();

    let result = timer.measure(|| 7);
    assert_eq!(result, 7);
    let measured = page.registry().snapshot()[0].value;
    assert!(measured >= 0.0 && measured.is_finite());

    let outcome = catch_unwind(AssertUnwindSafe(|| {
        timer.measure(|| {
            std::thread::sleep(Duration::from_millis(2));
            panic!("boom");
        })
    }));
    assert!(outcome.is_err());
    let measured = page.registry().snapshot()[0].value;
    assert!(measured >= 2.0, "Panicking work is still timed, got {}", measured);
}

#[test]
fn test_defaults_and_builders() {
    let page = Page::new();
    let counter = page.counter("c").unwrap();
    let timer = page.timer("t").unwrap();

    assert_eq!(counter.unit(), DurationUnit::seconds(1.0));
    assert_eq!(timer.unit(), DurationUnit::millis(1.0));
    assert_eq!(counter.kind(), VariableType::Counter);
    assert_eq!(timer.kind(), VariableType::Timer);
    assert_eq!(counter.description(), "");

    counter.set_description("Requests").calc_rate();
    counter.calc_rate_over("5m").unwrap();
    timer.set_unit("s").unwrap();

    assert_eq!(counter.description(), "Requests");
    assert_eq!(
        counter.filters(),
        vec![FilterSpec::rate(), FilterSpec::rate_over(DurationUnit::minutes(5.0))],
        "Filters only grow, in call order"
    );
    assert_eq!(timer.unit(), DurationUnit::seconds(1.0));
}

#[test]
fn test_bad_unit_fails_at_configuration_time() {
    let page = Page::new();
    let timer = page.timer("t").unwrap();
    assert!(timer.set_unit("3w").is_err());
    assert!(timer.calc_rate_over("5q").is_err());
    assert_eq!(timer.unit(), DurationUnit::millis(1.0), "A failed set_unit leaves the unit alone");
    assert!(timer.filters().is_empty(), "A failed calc_rate_over adds no filter");
}

#[test]
fn test_snapshot_json_shape() {
    let page = Page::new();
    let counter = page.counter("requests").unwrap();
    counter.set_description("Requests handled").calc_rate_over("/5m").unwrap();
    counter.increment(3.0);
    page.timer("render").unwrap();

    let json: Value = serde_json::from_str(&page.registry().snapshot_json().unwrap()).unwrap();
    assert_eq!(
        json,
        json!([
            {
                "type": "Counter",
                "name": "requests",
                "description": "Requests handled",
                "filters": [{"rate": {"minute": 5.0}}],
                "value": 3.0,
                "unit": {"second": 1.0}
            },
            {
                "type": "Timer",
                "name": "render",
                "description": "",
                "filters": [],
                "value": 0.0,
                "unit": {"milli": 1.0}
            }
        ])
    );
}

#[tokio::test]
async fn test_bridge_answers_get_variables() {
    let page = Page::new();
    let hits = page.counter("hits").unwrap();
    hits.increment(2.0);

    let (connection, handle) = page.connect(PageId::new());
    let reply = connection.send(r#"["getVariables"]"#).await.expect("page should answer");
    let json: Value = serde_json::from_str(&reply).unwrap();
    assert_eq!(json[0]["name"], "hits");
    assert_eq!(json[0]["value"], 2.0);

    let unknown = connection.send(r#"["reload"]"#).await.expect("page should answer");
    assert_eq!(unknown, "null", "Unknown methods are answered with null");
    let garbage = connection.send("not json").await.expect("page should answer");
    assert_eq!(garbage, "null");

    handle.shutdown().await;
    assert!(connection.send(r#"["getVariables"]"#).await.is_err(), "Closed pages don't answer");
    assert!(connection.is_closed());
}
