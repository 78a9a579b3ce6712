//! Normalization of upstream tweet payloads.
//!
//! The platform client hands back loosely-typed JSON. Everything here turns
//! one item into a fixed [`NormalizedPost`] or reports why it could not.

use chrono::{DateTime, Utc};
use scrapper_common::{AppError, AppResult};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Epoch values above this are treated as milliseconds.
const EPOCH_MILLIS_THRESHOLD: f64 = 1e11;

/// Millisecond values past this do not fit an `i64`.
const EPOCH_MILLIS_LIMIT: f64 = 9.2e18;

/// Author of a normalized post. Every field is null when the upstream item
/// carries no author.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostAuthor {
    /// Platform user id.
    pub id: Option<String>,
    /// Handle, without the `@`.
    pub screen_name: Option<String>,
    /// Display name.
    pub name: Option<String>,
}

/// Flat, fixed-shape view of an upstream tweet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NormalizedPost {
    /// Tweet id.
    pub id: String,
    /// Full text.
    pub text: String,
    /// Creation time, see [`normalize_timestamp`].
    pub created_at: Option<String>,
    /// Author.
    pub user: PostAuthor,
    /// Retweets, 0 when upstream omits it.
    pub retweet_count: i64,
    /// Likes, 0 when upstream omits it.
    pub favorite_count: i64,
    /// Replies, 0 when upstream omits it.
    pub reply_count: i64,
    /// Language code detected by the platform.
    pub lang: Option<String>,
}

impl NormalizedPost {
    /// Normalize one upstream item.
    pub fn from_json(item: &Value) -> AppResult<Self> {
        let obj = item.as_object().ok_or_else(|| {
            AppError::Normalization(format!(
                "expected object, got {}",
                json_type_name(Some(item))
            ))
        })?;

        Ok(Self {
            id: required_id(obj, "id")?,
            text: required_str(obj, "text")?,
            created_at: normalize_timestamp(obj.get("created_at")),
            user: author_from_json(obj.get("user"))?,
            retweet_count: count_or_zero(obj, "retweet_count")?,
            favorite_count: count_or_zero(obj, "favorite_count")?,
            reply_count: count_or_zero(obj, "reply_count")?,
            lang: optional_str(obj, "lang")?,
        })
    }
}

fn author_from_json(user: Option<&Value>) -> AppResult<PostAuthor> {
    match user {
        None | Some(Value::Null) => Ok(PostAuthor::default()),
        Some(Value::Object(user)) => Ok(PostAuthor {
            id: Some(required_id(user, "id")?),
            screen_name: Some(required_str(user, "screen_name")?),
            name: Some(required_str(user, "name")?),
        }),
        Some(other) => Err(AppError::Normalization(format!(
            "field `user`: expected object, got {}",
            json_type_name(Some(other))
        ))),
    }
}

/// Normalize an upstream timestamp into text.
///
/// - absent or `null` gives `None`
/// - a string is returned unchanged
/// - a number is read as a Unix epoch (seconds, or milliseconds when large)
///   and rendered as RFC 3339
/// - anything else is rendered as its JSON text
///
/// Never fails.
#[must_use]
pub fn normalize_timestamp(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::Null => None,
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(
            n.as_f64()
                .and_then(datetime_from_epoch)
                .map_or_else(|| n.to_string(), |dt| dt.to_rfc3339()),
        ),
        other => Some(other.to_string()),
    }
}

fn datetime_from_epoch(epoch: f64) -> Option<DateTime<Utc>> {
    if !epoch.is_finite() {
        return None;
    }
    let millis = if epoch.abs() >= EPOCH_MILLIS_THRESHOLD {
        epoch
    } else {
        epoch * 1000.0
    };
    if millis.abs() >= EPOCH_MILLIS_LIMIT {
        return None;
    }
    DateTime::from_timestamp_millis(millis as i64)
}

/// Name of the JSON type of a field, `"missing"` when absent.
#[must_use]
pub const fn json_type_name(value: Option<&Value>) -> &'static str {
    match value {
        None => "missing",
        Some(Value::Null) => "null",
        Some(Value::Bool(_)) => "bool",
        Some(Value::Number(_)) => "number",
        Some(Value::String(_)) => "string",
        Some(Value::Array(_)) => "array",
        Some(Value::Object(_)) => "object",
    }
}

fn mismatch(field: &str, expected: &str, found: Option<&Value>) -> AppError {
    AppError::Normalization(format!(
        "field `{field}`: expected {expected}, got {}",
        json_type_name(found)
    ))
}

/// Identifiers arrive as strings or as bare integers.
fn required_id(obj: &Map<String, Value>, field: &str) -> AppResult<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(Value::Number(n)) if n.is_u64() || n.is_i64() => Ok(n.to_string()),
        other => Err(mismatch(field, "string id", other)),
    }
}

fn required_str(obj: &Map<String, Value>, field: &str) -> AppResult<String> {
    match obj.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        other => Err(mismatch(field, "string", other)),
    }
}

fn optional_str(obj: &Map<String, Value>, field: &str) -> AppResult<Option<String>> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.clone())),
        other => Err(mismatch(field, "string", other)),
    }
}

fn count_or_zero(obj: &Map<String, Value>, field: &str) -> AppResult<i64> {
    match obj.get(field) {
        None | Some(Value::Null) => Ok(0),
        Some(Value::Number(n)) => n
            .as_i64()
            .ok_or_else(|| mismatch(field, "integer", obj.get(field))),
        other => Err(mismatch(field, "integer", other)),
    }
}
