use serde_json::json;
use webmon::unit::{DurationUnit, ParseError, UnitSpec};

#[test]
fn test_parse_grammar_forms() {
    assert_eq!("".parse::<DurationUnit>().unwrap(), DurationUnit::seconds(1.0), "Empty means one second");
    assert_eq!("5m".parse::<DurationUnit>().unwrap(), DurationUnit::minutes(5.0));
    assert_eq!("/5m".parse::<DurationUnit>().unwrap(), DurationUnit::minutes(5.0).per());
    assert_eq!("2".parse::<DurationUnit>().unwrap(), DurationUnit::millis(2.0), "Bare digits are milliseconds");
    assert_eq!("250".parse::<DurationUnit>().unwrap(), DurationUnit::millis(250.0));
    assert_eq!("h".parse::<DurationUnit>().unwrap(), DurationUnit::hours(1.0), "Missing count defaults to 1");
    assert_eq!("/s".parse::<DurationUnit>().unwrap(), DurationUnit::seconds(1.0).per());
    assert_eq!("1.5s".parse::<DurationUnit>().unwrap(), DurationUnit::seconds(1.5));
}

#[test]
fn test_parse_rejects_unknown_units() {
    match "5x".parse::<DurationUnit>() {
        Err(ParseError::UnknownUnit { spec, unit }) => {
            assert_eq!(spec, "5x");
            assert_eq!(unit, 'x');
        }
        other => panic!("Expected UnknownUnit, got {:?}", other),
    }

    assert!(matches!("/".parse::<DurationUnit>(), Err(ParseError::Empty(_))));
    assert!(matches!("abcs".parse::<DurationUnit>(), Err(ParseError::InvalidCount { .. })));
    assert!(matches!("-5s".parse::<DurationUnit>(), Err(ParseError::InvalidCount { .. })));

    let message = "5d".parse::<DurationUnit>().unwrap_err().to_string();
    assert!(message.contains("5d"), "Error should name the input: {}", message);
}

#[test]
fn test_structured_units_pass_through() {
    let unit = DurationUnit::hours(2.0).per();
    assert_eq!(DurationUnit::parse(unit).unwrap(), unit);
    assert_eq!(DurationUnit::parse("5m").unwrap(), DurationUnit::minutes(5.0));

    let text: UnitSpec = serde_json::from_str("\"5m\"").unwrap();
    assert_eq!(text, UnitSpec::Text("5m".to_string()));
    let structured: UnitSpec = serde_json::from_str(r#"{"minute": 5}"#).unwrap();
    assert_eq!(structured, UnitSpec::Structured(DurationUnit::minutes(5.0)));
}

#[test]
fn test_to_millis() {
    assert_eq!(DurationUnit::minutes(5.0).to_millis(), 300_000.0);
    assert_eq!(DurationUnit::hours(1.0).to_millis(), 3_600_000.0);
    assert_eq!(DurationUnit::millis(2.0).to_millis(), 2.0);
    assert_eq!(DurationUnit::seconds(1.0).per().to_millis(), 0.001, "Reciprocal inverts");

    let mixed = DurationUnit {
        milli: Some(500.0),
        second: Some(1.0),
        ..DurationUnit::default()
    };
    assert_eq!(mixed.to_millis(), 1_500.0, "Components are summed");
}

#[test]
fn test_display_suffix() {
    assert_eq!(DurationUnit::minutes(5.0).display_suffix(), "5m");
    assert_eq!(DurationUnit::seconds(1.0).display_suffix(), "s", "Magnitude 1 is omitted");
    assert_eq!(DurationUnit::millis(1.0).display_suffix(), "", "Milliseconds have no letter");
    assert_eq!(DurationUnit::millis(2.0).display_suffix(), "2");
    assert_eq!(DurationUnit::seconds(1.0).per().display_suffix(), "/s");
    assert_eq!(DurationUnit::minutes(5.0).per().display_suffix(), "/5m");
    assert_eq!(DurationUnit::millis(1.0).per().display_suffix(), "", "No slash without a suffix");
    assert_eq!(DurationUnit::seconds(1.5).to_string(), "1.5s");
}

#[test]
fn test_round_trip_per_form() {
    for (spec, millis, suffix) in [("5m", 300_000.0, "5m"), ("s", 1_000.0, "s"), ("2h", 7_200_000.0, "2h"), ("20", 20.0, "20")] {
        let unit: DurationUnit = spec.parse().unwrap();
        assert_eq!(unit.to_millis(), millis, "to_millis of {}", spec);
        assert_eq!(unit.display_suffix(), suffix, "suffix of {}", spec);
        let reparsed: DurationUnit = unit.display_suffix().parse().unwrap();
        assert_eq!(reparsed.to_millis(), millis, "reparsed {}", spec);
    }
}

#[test]
fn test_unit_json_shape() {
    assert_eq!(serde_json::to_value(DurationUnit::minutes(5.0)).unwrap(), json!({"minute": 5.0}));
    assert_eq!(
        serde_json::to_value(DurationUnit::seconds(1.0).per()).unwrap(),
        json!({"second": 1.0, "reciprocal": true})
    );
    let parsed: DurationUnit = serde_json::from_value(json!({"hour": 1, "reciprocal": true})).unwrap();
    assert_eq!(parsed, DurationUnit::hours(1.0).per());
}
