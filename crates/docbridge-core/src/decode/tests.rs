use super::*;
use crate::error::ErrorCode;
use bson::{Binary, Regex, doc, spec::BinarySubtype};
use serde_json::json;

fn decode(class_name: &str, document: &Document, schema: &ClassSchema) -> Result<Map<String, Value>, TransformError> {
    let config = TransformConfig::default();
    let decoder = ObjectDecoder {
        class_name,
        schema,
        config: &config,
    };

    decoder.decode(document)
}

fn datetime(iso: &str) -> bson::DateTime {
    bson::DateTime::parse_rfc3339_str(iso).expect("valid timestamp")
}

fn post_schema() -> ClassSchema {
    ClassSchema::new()
        .with_field("author", FieldSchema::pointer("_User"))
        .with_field("title", FieldSchema::new(FieldType::String))
}

#[test]
fn reserved_columns_get_rest_names() {
    let document = doc! {
        "_id": "abc",
        "_created_at": datetime("2020-01-01T00:00:00.000Z"),
        "_updated_at": datetime("2020-01-02T03:04:05.678Z"),
        "expiresAt": datetime("2021-01-01T00:00:00.000Z"),
        "_session_token": "r:token",
        "times_used": 3,
    };

    let object = decode("_Session", &document, &ClassSchema::new()).expect("decode");

    assert_eq!(
        Value::Object(object),
        json!({
            "objectId": "abc",
            "createdAt": "2020-01-01T00:00:00.000Z",
            "updatedAt": "2020-01-02T03:04:05.678Z",
            "expiresAt": { "__type": "Date", "iso": "2021-01-01T00:00:00.000Z" },
            "sessionToken": "r:token",
            "timesUsed": 3
        })
    );
}

#[test]
fn permission_lists_default_to_empty_and_acl_is_dropped() {
    let document = doc! {
        "_id": "abc",
        "_rperm": ["*"],
        "_acl": { "*": { "r": true } },
    };

    let object = decode("Post", &document, &post_schema()).expect("decode");

    assert_eq!(object.get("_rperm"), Some(&json!(["*"])));
    assert_eq!(object.get("_wperm"), Some(&json!([])));
    assert!(!object.contains_key("_acl"));
}

#[test]
fn documents_without_permissions_gain_no_lists() {
    let object = decode("Post", &doc! { "_id": "abc" }, &post_schema()).expect("decode");

    assert!(!object.contains_key("_rperm"));
    assert!(!object.contains_key("_wperm"));
}

#[test]
fn user_auth_data_columns_fold_into_auth_data() {
    let document = doc! {
        "_id": "u1",
        "authData": { "legacy": true },
        "_auth_data_facebook": { "id": "fb1" },
        "_auth_data_github": { "id": "gh1" },
        "_hashed_password": "$2b$10$hash",
    };

    let object = decode("_User", &document, &ClassSchema::new()).expect("decode");

    assert_eq!(
        object.get("authData"),
        Some(&json!({ "facebook": { "id": "fb1" }, "github": { "id": "gh1" } }))
    );
    assert_eq!(object.get("_hashed_password"), Some(&json!("$2b$10$hash")));
}

#[test]
fn unknown_underscore_columns_are_internal_errors() {
    for key in ["_auth_data_facebook", "_secret"] {
        let mut document = Document::new();
        document.insert(key, "x");

        let err = decode("Post", &document, &post_schema()).expect_err("bad column");
        assert_eq!(err.code, ErrorCode::Internal);
        assert_eq!(err.message, format!("bad key in untransform: {key}"));
    }
}

#[test]
fn pointer_columns_are_rebuilt_from_schema() {
    let object = decode("Post", &doc! { "_p_author": "_User$u1" }, &post_schema()).expect("decode");

    assert_eq!(
        object.get("author"),
        Some(&json!({ "__type": "Pointer", "className": "_User", "objectId": "u1" }))
    );
}

#[test]
fn null_and_undeclared_pointer_columns_are_dropped() {
    let document = doc! {
        "_p_author": Bson::Null,
        "_p_ghost": "Ghost$g1",
        "_p_title": "_User$u1",
    };

    let object = decode("Post", &document, &post_schema()).expect("decode");

    assert!(object.is_empty(), "unexpected keys: {object:?}");
}

#[test]
fn pointer_to_wrong_class_is_an_error() {
    let err = decode("Post", &doc! { "_p_author": "Team$t1" }, &post_schema())
        .expect_err("class mismatch");

    assert_eq!(err.message, "pointer to incorrect className");
}

#[test]
fn schema_types_pick_the_envelope() {
    let schema = ClassSchema::new()
        .with_field("avatar", FieldSchema::new(FieldType::File))
        .with_field("location", FieldSchema::new(FieldType::GeoPoint))
        .with_field("payload", FieldSchema::new(FieldType::Bytes));
    let document = doc! {
        "avatar": "a.png",
        "location": [20, 10],
        "payload": "aGVsbG8=",
        "label": "a.png",
    };

    let object = decode("Place", &document, &schema).expect("decode");

    assert_eq!(
        Value::Object(object),
        json!({
            "avatar": { "__type": "File", "name": "a.png" },
            "location": { "__type": "GeoPoint", "latitude": 10, "longitude": 20 },
            "payload": { "__type": "Bytes", "base64": "aGVsbG8=" },
            "label": "a.png"
        })
    );
}

#[test]
fn relation_fields_get_placeholders() {
    let schema = ClassSchema::new().with_field("members", FieldSchema::relation("_User"));

    let object = decode("Team", &doc! { "_id": "t1" }, &schema).expect("decode");

    assert_eq!(
        object.get("members"),
        Some(&json!({ "__type": "Relation", "className": "_User" }))
    );
}

#[test]
fn nested_values_are_converted_structurally() {
    let document = doc! {
        "meta": {
            "seen": datetime("2020-05-01T00:00:00.000Z"),
            "blob": Binary { subtype: BinarySubtype::Generic, bytes: b"abc".to_vec() },
            "pattern": Regex { pattern: "^a".into(), options: "i".into() },
            "stored": { "__type": "Date", "iso": datetime("2020-06-01T00:00:00.000Z") },
        },
    };

    let object = decode("Post", &document, &post_schema()).expect("decode");

    assert_eq!(
        object.get("meta"),
        Some(&json!({
            "seen": { "__type": "Date", "iso": "2020-05-01T00:00:00.000Z" },
            "blob": { "__type": "Bytes", "base64": "YWJj" },
            "pattern": { "$regex": "^a", "$options": "i" },
            "stored": { "__type": "Date", "iso": "2020-06-01T00:00:00.000Z" }
        }))
    );
}

#[test]
fn non_date_timestamp_columns_are_errors() {
    let err = decode("Post", &doc! { "_created_at": 5 }, &post_schema()).expect_err("not a date");

    assert_eq!(err.message, "bad date value in _created_at");
}

#[test]
fn internal_timestamps_pass_through_as_iso_text() {
    let document = doc! {
        "_perishable_token_expires_at": datetime("2024-05-01T08:00:00.000Z"),
        "_password_changed_at": datetime("2024-04-01T00:00:00.500Z"),
        "_failed_login_count": 2,
    };

    let object = decode("_User", &document, &ClassSchema::new()).expect("decode");

    assert_eq!(
        Value::Object(object),
        json!({
            "_perishable_token_expires_at": "2024-05-01T08:00:00.000Z",
            "_password_changed_at": "2024-04-01T00:00:00.500Z",
            "_failed_login_count": 2
        })
    );
}
