use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlx::FromRow;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::validation::present;

// --- Core Application Schemas (Mapped to Database) ---

/// User
///
/// The public projection of an account, as returned by every endpoint that exposes a user
/// (registration, detail, update, and the `user` field nested in albums).
/// The password hash never appears here; see `UserAccount` for the credential-bearing row.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct User {
    pub id: i64,
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub artistic_name: String,
}

/// UserAccount
///
/// Internal row used by login and token authentication. Carries the argon2 PHC string
/// stored in `users.password` and the activity flag; never serialized.
#[derive(Debug, Clone, FromRow)]
pub struct UserAccount {
    #[sqlx(flatten)]
    pub user: User,
    pub password: String,
    pub is_active: bool,
}

/// Album
///
/// An album with its owner nested, matching the shape returned by the album endpoints.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Album {
    pub id: i64,
    pub name: String,
    pub year: i32,
    pub user: User,
}

/// Song
///
/// A track belonging to one album. The owning album is exposed as a plain id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, FromRow, Default)]
#[ts(export)]
pub struct Song {
    pub id: i64,
    pub title: String,
    pub duration: String,
    pub album_id: i64,
}

// --- Validated Inputs (handed to the Repository) ---

#[derive(Debug, Clone, PartialEq)]
pub struct NewAlbum {
    pub name: String,
    pub year: i32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewSong {
    pub title: String,
    pub duration: String,
}

/// NewUser
///
/// A registration that passed validation and uniqueness checks, with the password already hashed.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub username: String,
    pub email: String,
    pub full_name: Option<String>,
    pub artistic_name: String,
    pub password_hash: String,
}

/// UserChanges
///
/// A partial update. `None` leaves a column untouched; `full_name: Some(None)` clears it.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<Option<String>>,
    pub artistic_name: Option<String>,
    pub password_hash: Option<String>,
}

// --- Request Payloads ---
//
// Payload fields are kept as raw JSON so that validation can tell a missing key from an
// explicit `null` and report every offending field at once.

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct AlbumPayload {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = i32)]
    pub year: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct SongPayload {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub title: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub duration: Option<Value>,
}

/// UserPayload
///
/// Body of registration (`POST`), full update (`PUT`) and partial update (`PATCH`).
/// `password` is write-only: accepted here, never echoed back.
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct UserPayload {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub username: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub email: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub full_name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub artistic_name: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub password: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct LoginPayload {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub username: Option<Value>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub password: Option<Value>,
}

#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct RefreshPayload {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = String)]
    pub refresh: Option<Value>,
}

// --- Token Responses ---

/// TokenPair
///
/// Returned by the login endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct TokenPair {
    pub refresh: String,
    pub access: String,
}

/// Returned by the refresh endpoint.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AccessToken {
    pub access: String,
}
