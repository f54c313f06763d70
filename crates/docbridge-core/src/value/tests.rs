use super::*;
use crate::error::ErrorCode;
use serde_json::json;

#[test]
fn classify_recognizes_each_envelope() {
    let cases = [
        (json!({ "__type": "Pointer", "className": "A", "objectId": "1" }), "Pointer"),
        (json!({ "__type": "Relation", "className": "A" }), "Relation"),
        (json!({ "__type": "Date", "iso": "2020-01-01T00:00:00.000Z" }), "Date"),
        (json!({ "__type": "Bytes", "base64": "YWJj" }), "Bytes"),
        (json!({ "__type": "GeoPoint", "latitude": 1, "longitude": 2 }), "GeoPoint"),
        (json!({ "__type": "Polygon", "coordinates": [[0, 0], [0, 1], [1, 1]] }), "Polygon"),
        (json!({ "__type": "File", "name": "a.txt" }), "File"),
    ];

    for (value, kind) in cases {
        let atom = classify(&value).expect("valid envelope");
        let matched = match atom {
            RestAtom::Pointer(_) => "Pointer",
            RestAtom::Relation(_) => "Relation",
            RestAtom::Date(_) => "Date",
            RestAtom::Bytes(_) => "Bytes",
            RestAtom::GeoPoint(_) => "GeoPoint",
            RestAtom::Polygon(_) => "Polygon",
            RestAtom::File(_) => "File",
            other => panic!("unexpected classification {other:?}"),
        };
        assert_eq!(matched, kind);
    }
}

#[test]
fn classify_rejects_unknown_type_tags() {
    let err = classify(&json!({ "__type": "Widget" })).expect_err("unknown kind");

    assert_eq!(err.code, ErrorCode::InvalidJson);
    assert_eq!(err.message, "invalid __type: \"Widget\"");
}

#[test]
fn classify_rejects_envelopes_missing_fields() {
    let err = classify(&json!({ "__type": "Pointer", "className": "A" })).expect_err("no objectId");

    assert_eq!(err.message, "Pointer requires a string objectId");
}

#[test]
fn classify_bare_regex_and_plain_objects() {
    let regex = json!({ "$regex": "^a" });
    assert_eq!(classify(&regex).expect("regex"), RestAtom::Regex("^a"));

    let err = classify(&json!({ "$regex": 1 })).expect_err("non-string pattern");
    assert_eq!(err.message, "bad regex: 1");

    let plain = json!({ "a": 1 });
    assert!(matches!(classify(&plain), Ok(RestAtom::Object(_))));
}

#[test]
fn numbers_pick_the_narrowest_native_type() {
    assert_eq!(json_number_to_bson(&Number::from(7)), Bson::Int32(7));
    assert_eq!(
        json_number_to_bson(&Number::from(5_000_000_000_i64)),
        Bson::Int64(5_000_000_000)
    );
    assert_eq!(
        json_number_to_bson(&Number::from_f64(1.5).expect("finite")),
        Bson::Double(1.5)
    );
}

#[test]
fn non_finite_doubles_have_no_json_number() {
    assert_eq!(bson_number_to_json(&Bson::Double(f64::NAN)), None);
    assert_eq!(bson_number_to_json(&Bson::Int64(3)), Some(Number::from(3)));
}

#[test]
fn depth_guard_fails_past_the_limit() {
    let depth = Depth::new(2, ErrorOrigin::Value);
    let depth = depth.descend().expect("first level");
    let depth = depth.descend().expect("second level");

    let err = depth.descend().expect_err("third level");
    assert_eq!(err.message, "value nesting exceeds the maximum depth of 2");
}

#[test]
fn truthiness_follows_rest_conventions() {
    assert!(!is_truthy(&json!(null)));
    assert!(!is_truthy(&json!(0)));
    assert!(!is_truthy(&json!("")));
    assert!(is_truthy(&json!("x")));
    assert!(is_truthy(&json!([])));
    assert!(is_truthy(&json!({})));
}

#[test]
fn integer_ids_accept_numbers_and_numeric_strings() {
    assert_eq!(integer_id(&json!("42"), ErrorOrigin::Query).expect("numeric string"), Bson::Int32(42));
    assert_eq!(integer_id(&json!(7), ErrorOrigin::Query).expect("number"), Bson::Int32(7));
    assert!(integer_id(&json!("abc"), ErrorOrigin::Query).is_err());
}

#[test]
fn verbatim_conversion_keeps_envelopes() {
    let value = json!({ "p": { "__type": "Pointer", "className": "A", "objectId": "1" }, "n": [1, null] });

    assert_eq!(
        json_to_bson(&value, Depth::new(8, ErrorOrigin::Value)).expect("shallow value"),
        Bson::Document(bson::doc! {
            "p": { "__type": "Pointer", "className": "A", "objectId": "1" },
            "n": [1, Bson::Null],
        })
    );
}

#[test]
fn verbatim_conversion_is_depth_bounded() {
    let value = json!([[[[1]]]]);

    assert!(json_to_bson(&value, Depth::new(5, ErrorOrigin::Query)).is_ok());

    let err = json_to_bson(&value, Depth::new(4, ErrorOrigin::Query)).expect_err("five levels");
    assert_eq!(err.code, ErrorCode::InvalidJson);
    assert_eq!(err.origin, ErrorOrigin::Query);
}
