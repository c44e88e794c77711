use music_catalog::{
    ApiError,
    models::{Album, AlbumPayload, Song, User, UserPayload},
    payload::parse_payload,
    validation::{NOT_NULL, REQUIRED, Validator},
};
use serde_json::json;

// --- Serialization shapes ---

#[test]
fn test_album_serializes_with_nested_user() {
    let album = Album {
        id: 3,
        name: "Blue".to_string(),
        year: 1971,
        user: User {
            id: 1,
            username: "joni".to_string(),
            email: "joni@example.com".to_string(),
            full_name: None,
            artistic_name: "Joni".to_string(),
        },
    };

    assert_eq!(
        serde_json::to_value(&album).unwrap(),
        json!({
            "id": 3,
            "name": "Blue",
            "year": 1971,
            "user": {
                "id": 1,
                "username": "joni",
                "email": "joni@example.com",
                "full_name": null,
                "artistic_name": "Joni",
            }
        })
    );
}

#[test]
fn test_song_exposes_album_as_plain_id() {
    let song = Song {
        id: 9,
        title: "River".to_string(),
        duration: "4:00".to_string(),
        album_id: 3,
    };

    let value = serde_json::to_value(&song).unwrap();
    assert_eq!(value["album_id"], 3);
    assert_eq!(value.as_object().unwrap().len(), 4);
}

// --- Payload parsing ---

#[test]
fn test_payload_distinguishes_null_from_missing() {
    let payload: UserPayload = parse_payload(br#"{"full_name": null}"#).unwrap();

    assert_eq!(payload.full_name, Some(serde_json::Value::Null));
    assert!(payload.username.is_none());
}

#[test]
fn test_payload_ignores_unknown_keys() {
    let payload: AlbumPayload =
        parse_payload(br#"{"name": "x", "year": 1, "user": 5, "id": 99}"#).unwrap();

    assert_eq!(payload.name, Some(json!("x")));
}

#[test]
fn test_payload_must_be_an_object() {
    let result = parse_payload::<AlbumPayload>(b"\"just a string\"");

    assert!(matches!(result, Err(ApiError::MalformedBody(_))));
}

#[test]
fn test_explicit_null_on_required_field() {
    let payload: AlbumPayload = parse_payload(br#"{"name": null}"#).unwrap();

    let Err(ApiError::Validation(errors)) = payload.validate() else {
        panic!("expected field errors");
    };
    assert_eq!(errors["name"], [NOT_NULL]);
    assert_eq!(errors["year"], [REQUIRED]);
}

#[test]
fn test_partial_user_payload_accepts_empty_body() {
    let payload: UserPayload = parse_payload(b"").unwrap();
    let mut validator = Validator::default();

    let draft = payload.clean(&mut validator, true);

    assert!(validator.finish().is_ok());
    assert!(draft.username.is_none());
    assert!(draft.full_name.is_none());
}
