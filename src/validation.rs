//! Field-level validation for request payloads.
//!
//! Every payload is checked field by field and all failures are collected into a single
//! `FieldErrors` map, so a client submitting `{}` learns about every missing field at once.

use serde::{Deserialize, Deserializer};
use serde_json::Value;
use std::ops::RangeInclusive;

use crate::{
    error::{ApiError, FieldErrors},
    models::{
        AlbumPayload, LoginPayload, NewAlbum, NewSong, RefreshPayload, SongPayload, UserChanges,
        UserPayload,
    },
};

pub const REQUIRED: &str = "This field is required.";
pub const NOT_NULL: &str = "This field may not be null.";
pub const NOT_BLANK: &str = "This field may not be blank.";
pub const NOT_A_STRING: &str = "Not a valid string.";
pub const NOT_AN_INTEGER: &str = "A valid integer is required.";
pub const INVALID_EMAIL: &str = "Enter a valid email address.";
pub const INVALID_USERNAME: &str =
    "Enter a valid username. This value may contain only letters, numbers, and @/./+/-/_ characters.";
pub const USERNAME_TAKEN: &str = "A user with that username already exists.";
pub const NOT_UNIQUE: &str = "This field must be unique.";

pub const NAME_MAX_LEN: usize = 255;
pub const TITLE_MAX_LEN: usize = 255;
pub const DURATION_MAX_LEN: usize = 255;
pub const USERNAME_MAX_LEN: usize = 150;
pub const EMAIL_MAX_LEN: usize = 254;
pub const FULL_NAME_MAX_LEN: usize = 50;
pub const ARTISTIC_NAME_MAX_LEN: usize = 50;
pub const PASSWORD_MAX_LEN: usize = 128;
pub const YEAR_RANGE: RangeInclusive<i64> = 0..=32767;

/// Serde helper: distinguishes a key sent as `null` (`Some(Value::Null)`) from an absent key
/// (`None`, via `#[serde(default)]`).
pub fn present<'de, D>(deserializer: D) -> Result<Option<Value>, D::Error>
where
    D: Deserializer<'de>,
{
    Value::deserialize(deserializer).map(Some)
}

/// Collects per-field error messages while individual values are coerced.
#[derive(Debug, Default)]
pub struct Validator {
    errors: FieldErrors,
}

impl Validator {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    /// Fails with every collected message, or succeeds if nothing was recorded.
    pub fn finish(self) -> Result<(), ApiError> {
        if self.errors.is_empty() {
            Ok(())
        } else {
            Err(ApiError::Validation(self.errors))
        }
    }

    /// `required` or `optional`, chosen at runtime.
    pub fn take(&mut self, field: &str, value: Option<Value>, required: bool) -> Option<Value> {
        if required {
            self.required(field, value)
        } else {
            self.optional(field, value)
        }
    }

    /// A key that must be present and non-null.
    pub fn required(&mut self, field: &str, value: Option<Value>) -> Option<Value> {
        match value {
            None => {
                self.add(field, REQUIRED);
                None
            }
            Some(value) => self.optional(field, Some(value)),
        }
    }

    /// A key that may be absent but, when sent, must be non-null.
    pub fn optional(&mut self, field: &str, value: Option<Value>) -> Option<Value> {
        match value {
            Some(Value::Null) => {
                self.add(field, NOT_NULL);
                None
            }
            other => other,
        }
    }

    /// Coerces to a trimmed, non-blank string of at most `max_len` characters.
    pub fn text(&mut self, field: &str, value: Value, max_len: Option<usize>) -> Option<String> {
        let raw = self.stringify(field, value)?;
        self.bounded(field, raw.trim().to_string(), max_len)
    }

    /// Like `text`, but keeps surrounding whitespace. Used for passwords.
    pub fn secret(&mut self, field: &str, value: Value, max_len: Option<usize>) -> Option<String> {
        let raw = self.stringify(field, value)?;
        self.bounded(field, raw, max_len)
    }

    /// Coerces to an integer within `range`. Accepts JSON numbers and numeric strings.
    pub fn integer(&mut self, field: &str, value: Value, range: RangeInclusive<i64>) -> Option<i64> {
        let parsed = match &value {
            Value::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64)),
            Value::String(s) => parse_integer(s.trim()),
            _ => None,
        };

        let Some(number) = parsed else {
            self.add(field, NOT_AN_INTEGER);
            return None;
        };

        if number > *range.end() {
            self.add(
                field,
                format!("Ensure this value is less than or equal to {}.", range.end()),
            );
            return None;
        }
        if number < *range.start() {
            self.add(
                field,
                format!("Ensure this value is greater than or equal to {}.", range.start()),
            );
            return None;
        }
        Some(number)
    }

    fn stringify(&mut self, field: &str, value: Value) -> Option<String> {
        match value {
            Value::String(s) => Some(s),
            Value::Number(n) => Some(n.to_string()),
            _ => {
                self.add(field, NOT_A_STRING);
                None
            }
        }
    }

    fn bounded(&mut self, field: &str, value: String, max_len: Option<usize>) -> Option<String> {
        if value.trim().is_empty() {
            self.add(field, NOT_BLANK);
            return None;
        }
        if let Some(max) = max_len {
            if value.chars().count() > max {
                self.add(
                    field,
                    format!("Ensure this field has no more than {max} characters."),
                );
                return None;
            }
        }
        Some(value)
    }
}

/// Parses `"2000"` and `"2000.0"`, rejecting fractional values.
fn parse_integer(s: &str) -> Option<i64> {
    match s.split_once('.') {
        Some((whole, fraction)) if fraction.chars().all(|c| c == '0') => whole.parse().ok(),
        Some(_) => None,
        None => s.parse().ok(),
    }
}

/// Letters, digits and `@ . + - _`.
pub fn is_valid_username(username: &str) -> bool {
    username
        .chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '@' | '.' | '+' | '-' | '_'))
}

/// `local@domain` where the local part is a dot-atom and the domain is either `localhost` or
/// dotted hostname labels ending in an alphabetic top-level label of at least two letters.
pub fn is_valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.rsplit_once('@') else {
        return false;
    };
    is_dot_atom(local) && (domain == "localhost" || is_email_domain(domain))
}

const ATOM_SPECIALS: &str = "!#$%&'*+/=?^_`{|}~-";

fn is_dot_atom(local: &str) -> bool {
    local.split('.').all(|atom| {
        !atom.is_empty()
            && atom
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || ATOM_SPECIALS.contains(c))
    })
}

fn is_email_domain(domain: &str) -> bool {
    let labels: Vec<&str> = domain.split('.').collect();
    let Some((tld, hosts)) = labels.split_last() else {
        return false;
    };
    !hosts.is_empty()
        && tld.len() >= 2
        && tld.chars().all(|c| c.is_ascii_alphabetic())
        && hosts.iter().all(|label| {
            (1..=63).contains(&label.len())
                && !label.starts_with('-')
                && !label.ends_with('-')
                && label.chars().all(|c| c.is_ascii_alphanumeric() || c == '-')
        })
}

// --- Payload validation ---

impl AlbumPayload {
    pub fn validate(self) -> Result<NewAlbum, ApiError> {
        let mut v = Validator::default();
        let name = v
            .required("name", self.name)
            .and_then(|value| v.text("name", value, Some(NAME_MAX_LEN)));
        let year = v
            .required("year", self.year)
            .and_then(|value| v.integer("year", value, YEAR_RANGE));

        match (name, year) {
            (Some(name), Some(year)) => Ok(NewAlbum {
                name,
                // Bounded by YEAR_RANGE.
                year: year as i32,
            }),
            _ => incomplete(v),
        }
    }
}

impl SongPayload {
    pub fn validate(self) -> Result<NewSong, ApiError> {
        let mut v = Validator::default();
        let title = v
            .required("title", self.title)
            .and_then(|value| v.text("title", value, Some(TITLE_MAX_LEN)));
        let duration = v
            .required("duration", self.duration)
            .and_then(|value| v.text("duration", value, Some(DURATION_MAX_LEN)));

        match (title, duration) {
            (Some(title), Some(duration)) => Ok(NewSong { title, duration }),
            _ => incomplete(v),
        }
    }
}

/// Username/password pair submitted to the login endpoint.
#[derive(Debug, Clone)]
pub struct Credentials {
    pub username: String,
    pub password: String,
}

impl LoginPayload {
    pub fn validate(self) -> Result<Credentials, ApiError> {
        let mut v = Validator::default();
        let username = v
            .required("username", self.username)
            .and_then(|value| v.text("username", value, None));
        let password = v
            .required("password", self.password)
            .and_then(|value| v.secret("password", value, None));

        match (username, password) {
            (Some(username), Some(password)) => {
                Ok(Credentials { username, password })
            }
            _ => incomplete(v),
        }
    }
}

impl RefreshPayload {
    pub fn validate(self) -> Result<String, ApiError> {
        let mut v = Validator::default();
        let refresh = v
            .required("refresh", self.refresh)
            .and_then(|value| v.text("refresh", value, None));

        match refresh {
            Some(token) => Ok(token),
            _ => incomplete(v),
        }
    }
}

/// UserDraft
///
/// A user payload after per-field coercion. Uniqueness is checked separately since it needs
/// the repository; the password is still plain text at this point.
#[derive(Debug, Clone, Default)]
pub struct UserDraft {
    pub username: Option<String>,
    pub email: Option<String>,
    pub full_name: Option<Option<String>>,
    pub artistic_name: Option<String>,
    pub password: Option<String>,
}

impl UserDraft {
    pub fn into_changes(self, password_hash: Option<String>) -> UserChanges {
        UserChanges {
            username: self.username,
            email: self.email,
            full_name: self.full_name,
            artistic_name: self.artistic_name,
            password_hash,
        }
    }
}

impl UserPayload {
    /// Coerces each field, recording failures in `v`. With `partial` set, absent keys are
    /// skipped instead of reported as required.
    pub fn clean(self, v: &mut Validator, partial: bool) -> UserDraft {
        let required = !partial;

        let username = v.take("username", self.username, required)
            .and_then(|value| v.text("username", value, Some(USERNAME_MAX_LEN)))
            .and_then(|username| {
                if is_valid_username(&username) {
                    Some(username)
                } else {
                    v.add("username", INVALID_USERNAME);
                    None
                }
            });

        let email = v.take("email", self.email, required)
            .and_then(|value| v.text("email", value, Some(EMAIL_MAX_LEN)))
            .and_then(|email| {
                if is_valid_email(&email) {
                    Some(email)
                } else {
                    v.add("email", INVALID_EMAIL);
                    None
                }
            });

        let full_name = match self.full_name {
            None => None,
            Some(Value::Null) => Some(None),
            Some(value) => v.text("full_name", value, Some(FULL_NAME_MAX_LEN)).map(Some),
        };

        let artistic_name = v.take("artistic_name", self.artistic_name, required)
            .and_then(|value| v.text("artistic_name", value, Some(ARTISTIC_NAME_MAX_LEN)));

        let password = v.take("password", self.password, required)
            .and_then(|value| v.secret("password", value, Some(PASSWORD_MAX_LEN)));

        UserDraft {
            username,
            email,
            full_name,
            artistic_name,
            password,
        }
    }
}

/// Every path that drops a required value records a field error, so `finish` fails here.
fn incomplete<T>(v: Validator) -> Result<T, ApiError> {
    v.finish()?;
    Err(ApiError::Internal(
        "validated payload is missing a required value".to_string(),
    ))
}
