use super::*;
use crate::error::{ErrorCode, ErrorOrigin};
use bson::{Binary, doc, spec::BinarySubtype};
use chrono::{DateTime, Utc};
use proptest::prelude::*;
use serde_json::{Number, json};

fn map(value: Value) -> Map<String, Value> {
    match value {
        Value::Object(map) => map,
        other => panic!("expected object, got {other}"),
    }
}

fn number(value: f64) -> Number {
    Number::from_f64(value).expect("finite test number")
}

// ---- GeoPoint ----------------------------------------------------------

#[test]
fn geo_point_native_order_is_longitude_first() {
    let point = GeoPoint::from_envelope(&map(json!({
        "__type": "GeoPoint", "latitude": 10, "longitude": 20
    })))
    .expect("valid envelope");

    assert_eq!(
        point.to_native().expect("encode"),
        Bson::Array(vec![Bson::Int32(20), Bson::Int32(10)])
    );

    let decoded = GeoPoint::database_to_json(&Bson::Array(vec![Bson::Int32(20), Bson::Int32(10)]))
        .expect("decode")
        .expect("native pair");
    assert_eq!(
        decoded,
        json!({ "__type": "GeoPoint", "latitude": 10, "longitude": 20 })
    );
}

#[test]
fn geo_point_range_errors_name_the_bound() {
    let err = validate_coordinates(-91.0, 0.0).expect_err("latitude too small");
    assert_eq!(err.message, "GeoPoint latitude out of bounds: -91 < -90.0.");

    let err = validate_coordinates(0.0, 181.5).expect_err("longitude too large");
    assert_eq!(err.message, "GeoPoint longitude out of bounds: 181.5 > 180.0.");
}

#[test]
fn geo_point_rejects_non_pairs() {
    assert!(!GeoPoint::is_valid_database_object(&Bson::Array(vec![Bson::Int32(1)])).expect("check"));
    assert!(!GeoPoint::is_valid_database_object(&Bson::String("1,2".into())).expect("check"));
}

// ---- Polygon -----------------------------------------------------------

#[test]
fn polygon_encode_closes_ring_and_swaps_axes() {
    let polygon = Polygon::from_envelope(&map(json!({
        "__type": "Polygon", "coordinates": [[0, 0], [0, 5], [5, 5]]
    })))
    .expect("valid envelope");

    assert_eq!(
        polygon.to_native().expect("encode"),
        Bson::Document(doc! {
            "type": "Polygon",
            "coordinates": [[[0, 0], [5, 0], [5, 5], [0, 0]]],
        })
    );
}

#[test]
fn polygon_with_two_distinct_vertices_is_internal_error() {
    let polygon = Polygon::from_envelope(&map(json!({
        "__type": "Polygon", "coordinates": [[0, 0], [0, 0], [0, 1]]
    })))
    .expect("valid envelope");

    let err = polygon.to_native().expect_err("degenerate ring");
    assert_eq!(err.code, ErrorCode::Internal);
    assert_eq!(err.origin, ErrorOrigin::Codec);
}

// Decoding does not reopen the ring that encoding closed.
#[test]
fn polygon_decode_keeps_closing_vertex() {
    let polygon = Polygon::from_envelope(&map(json!({
        "__type": "Polygon", "coordinates": [[0, 0], [0, 5], [5, 5]]
    })))
    .expect("valid envelope");
    let native = polygon.to_native().expect("encode");

    let decoded = Polygon::database_to_json(&native)
        .expect("decode")
        .expect("native polygon");
    assert_eq!(
        decoded,
        json!({ "__type": "Polygon", "coordinates": [[0, 0], [0, 5], [5, 5], [0, 0]] })
    );
}

// ---- Bytes -------------------------------------------------------------

#[test]
fn bytes_read_back_from_both_native_shapes() {
    let atom = BytesAtom::from_envelope(&map(json!({ "__type": "Bytes", "base64": "aGVsbG8=" })))
        .expect("valid envelope");
    let wrapped = atom.to_native().expect("encode");

    assert_eq!(
        wrapped,
        Bson::Binary(Binary {
            subtype: BinarySubtype::Generic,
            bytes: b"hello".to_vec(),
        })
    );
    assert_eq!(BytesAtom::from_native(&wrapped).expect("decode"), Some(atom.clone()));

    let literal = Bson::String("aGVsbG8=".to_string());
    assert!(matches!(
        NativeBytes::resolve(&literal),
        Some(NativeBytes::LiteralBase64("aGVsbG8="))
    ));
    assert_eq!(BytesAtom::from_native(&literal).expect("decode"), Some(atom));
}

#[test]
fn wrapped_bytes_render_standard_base64() {
    let binary = Binary {
        subtype: BinarySubtype::Generic,
        bytes: b"hello".to_vec(),
    };

    assert_eq!(
        NativeBytes::Wrapped(&binary).to_base64(),
        Ok("aGVsbG8=".to_string())
    );
    assert_eq!(
        BytesAtom::database_to_json(&Bson::Binary(binary)).expect("decode"),
        Some(json!({ "__type": "Bytes", "base64": "aGVsbG8=" }))
    );
}

#[test]
fn bytes_envelope_must_carry_valid_base64() {
    let err = BytesAtom::from_envelope(&map(json!({ "__type": "Bytes", "base64": "not base64!" })))
        .expect_err("invalid payload");

    assert_eq!(err.code, ErrorCode::InvalidJson);
}

#[test]
fn base64_shape_check() {
    assert!(looks_like_base64(""));
    assert!(looks_like_base64("aGVsbG8="));
    assert!(looks_like_base64("YWJj"));
    assert!(!looks_like_base64("abc"));
    assert!(!looks_like_base64("a==="));
    assert!(!looks_like_base64("ab!d"));
}

// ---- Date / File / Pointer --------------------------------------------

#[test]
fn date_envelope_renders_millisecond_utc() {
    let atom = DateAtom::from_envelope(&map(json!({
        "__type": "Date", "iso": "2021-06-01T12:30:00.250+02:00"
    })))
    .expect("valid envelope");

    assert_eq!(atom.iso(), "2021-06-01T10:30:00.250Z");
}

#[test]
fn date_envelope_rejects_garbage() {
    let err = DateAtom::from_envelope(&map(json!({ "__type": "Date", "iso": "yesterday" })))
        .expect_err("not a timestamp");

    assert_eq!(err.message, "invalid date: 'yesterday'");
}

#[test]
fn file_stores_only_the_name() {
    let file = FileAtom::from_envelope(&map(json!({
        "__type": "File", "name": "a.png", "url": "http://files/a.png"
    })))
    .expect("valid envelope");

    assert_eq!(file.to_native().expect("encode"), Bson::String("a.png".into()));
    assert_eq!(
        FileAtom::database_to_json(&Bson::String("a.png".into())).expect("decode"),
        Some(json!({ "__type": "File", "name": "a.png" }))
    );
}

#[test]
fn pointer_string_splits_at_first_dollar() {
    let pointer = PointerAtom::parse_pointer_string("_User$u1").expect("valid pointer");

    assert_eq!(pointer.class_name, "_User");
    assert_eq!(pointer.object_id, "u1");
    assert_eq!(pointer.pointer_string(), "_User$u1");
    assert!(PointerAtom::parse_pointer_string("nodollar").is_err());
}

#[test]
fn type_tag_recognition() {
    assert!(DateAtom::is_valid_json(&json!({ "__type": "Date", "iso": "x" })));
    assert!(!DateAtom::is_valid_json(&json!({ "__type": "Bytes" })));
    assert!(!GeoPoint::is_valid_json(&json!({ "latitude": 1, "longitude": 2 })));
}

// ---- round trips -------------------------------------------------------

proptest! {
    #[test]
    fn date_round_trip(millis in -62_000_000_000_000_i64..250_000_000_000_000_i64) {
        let datetime = DateTime::<Utc>::from_timestamp_millis(millis).expect("in range");
        let atom = DateAtom(datetime);

        let native = atom.to_native().expect("encode");
        prop_assert_eq!(DateAtom::from_native(&native).expect("decode"), Some(atom));

        let envelope = atom.to_envelope();
        let reparsed = DateAtom::from_envelope(envelope.as_object().expect("envelope map"))
            .expect("reparse");
        prop_assert_eq!(reparsed, atom);
    }

    #[test]
    fn bytes_round_trip(payload in prop::collection::vec(any::<u8>(), 0..64)) {
        let binary = Binary { subtype: BinarySubtype::Generic, bytes: payload };
        let atom = BytesAtom {
            base64: NativeBytes::Wrapped(&binary).to_base64().expect("encode payload"),
        };

        let native = atom.to_native().expect("encode");
        prop_assert_eq!(&native, &Bson::Binary(binary.clone()));
        prop_assert_eq!(BytesAtom::from_native(&native).expect("decode"), Some(atom.clone()));

        let literal = Bson::String(atom.base64.clone());
        prop_assert_eq!(BytesAtom::from_native(&literal).expect("decode"), Some(atom));
    }

    #[test]
    fn geo_point_round_trip(latitude in -90.0_f64..=90.0, longitude in -180.0_f64..=180.0) {
        let point = GeoPoint { latitude: number(latitude), longitude: number(longitude) };

        let native = point.to_native().expect("encode");
        prop_assert_eq!(GeoPoint::from_native(&native).expect("decode"), Some(point));
    }

    #[test]
    fn file_round_trip(name in "[a-zA-Z0-9_.-]{1,24}") {
        let file = FileAtom { name, url: None };

        let native = file.to_native().expect("encode");
        prop_assert_eq!(FileAtom::from_native(&native).expect("decode"), Some(file));
    }
}
