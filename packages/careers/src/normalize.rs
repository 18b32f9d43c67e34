//! Mapping raw source records onto [`ScrapedListing`].
//!
//! Both source strategies hand their records over as JSON objects (HTML
//! sources build one object per matched element), so a single
//! pointer-based [`FieldMap`] covers every employer.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use url::Url;

use crate::error::{NormalizeError, NormalizeResult};
use crate::types::ScrapedListing;

/// Separator used when a list-valued field is flattened to one string.
pub const LIST_SEPARATOR: &str = "; ";

/// How a posted-date field is encoded by the source.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DateFormat {
    Iso8601,
    EpochSeconds,
    EpochMillis,
    /// Numbers are epoch (millis when implausibly large for seconds), strings ISO
    #[default]
    Auto,
}

/// Location and encoding of the posted date.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateField {
    pub pointer: String,
    #[serde(default)]
    pub format: DateFormat,
}

impl DateField {
    pub fn new(pointer: impl Into<String>, format: DateFormat) -> Self {
        Self {
            pointer: pointer.into(),
            format,
        }
    }
}

/// JSON-pointer mapping from a raw record to canonical listing fields.
///
/// `id` is an ordered preference list: the first pointer holding a
/// non-empty value wins. Put the stable ATS id first and internal numeric
/// ids after it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldMap {
    pub id: Vec<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default)]
    pub degree_requirement: Option<String>,
    #[serde(default)]
    pub experience_level: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub posted_at: Option<DateField>,
    #[serde(default)]
    pub source_url: Option<String>,
    /// Base for resolving relative listing URLs
    #[serde(default)]
    pub url_base: Option<String>,
    /// Fallback URL with an `{id}` placeholder, used when `source_url` is absent
    #[serde(default)]
    pub url_template: Option<String>,
}

impl FieldMap {
    pub fn with_id(mut self, pointer: impl Into<String>) -> Self {
        self.id.push(pointer.into());
        self
    }

    pub fn with_title(mut self, pointer: impl Into<String>) -> Self {
        self.title = Some(pointer.into());
        self
    }

    pub fn with_department(mut self, pointer: impl Into<String>) -> Self {
        self.department = Some(pointer.into());
        self
    }

    pub fn with_location(mut self, pointer: impl Into<String>) -> Self {
        self.location = Some(pointer.into());
        self
    }

    pub fn with_degree_requirement(mut self, pointer: impl Into<String>) -> Self {
        self.degree_requirement = Some(pointer.into());
        self
    }

    pub fn with_experience_level(mut self, pointer: impl Into<String>) -> Self {
        self.experience_level = Some(pointer.into());
        self
    }

    pub fn with_description(mut self, pointer: impl Into<String>) -> Self {
        self.description = Some(pointer.into());
        self
    }

    pub fn with_posted_at(mut self, pointer: impl Into<String>, format: DateFormat) -> Self {
        self.posted_at = Some(DateField::new(pointer, format));
        self
    }

    pub fn with_source_url(mut self, pointer: impl Into<String>) -> Self {
        self.source_url = Some(pointer.into());
        self
    }

    pub fn with_url_base(mut self, base: impl Into<String>) -> Self {
        self.url_base = Some(base.into());
        self
    }

    pub fn with_url_template(mut self, template: impl Into<String>) -> Self {
        self.url_template = Some(template.into());
        self
    }

    /// Map one raw record to a listing for `employer`.
    pub fn normalize(&self, employer: &str, raw: &Value) -> NormalizeResult<ScrapedListing> {
        if !raw.is_object() {
            return Err(NormalizeError::NotAnObject);
        }

        let external_id = extract_id(raw, &self.id).ok_or_else(|| NormalizeError::MissingId {
            tried: self.id.clone(),
        })?;

        let text = |pointer: &Option<String>| {
            pointer
                .as_deref()
                .and_then(|p| raw.pointer(p))
                .and_then(flatten_text)
        };

        let posted_at = self.posted_at.as_ref().and_then(|field| {
            raw.pointer(&field.pointer)
                .and_then(|v| parse_timestamp(v, field.format))
        });

        let source_url = match text(&self.source_url) {
            Some(url) => Some(self.resolve_url(url)),
            None => self
                .url_template
                .as_ref()
                .map(|t| t.replace("{id}", &external_id)),
        };

        Ok(ScrapedListing {
            employer: employer.to_string(),
            title: text(&self.title),
            department: text(&self.department),
            location: text(&self.location),
            degree_requirement: text(&self.degree_requirement),
            experience_level: text(&self.experience_level),
            description: text(&self.description),
            posted_at,
            source_url,
            external_id,
        })
    }

    fn resolve_url(&self, url: String) -> String {
        if Url::parse(&url).is_ok() {
            return url;
        }
        self.url_base
            .as_deref()
            .and_then(|base| Url::parse(base).ok())
            .and_then(|base| base.join(&url).ok())
            .map(|u| u.to_string())
            .unwrap_or(url)
    }
}

/// First usable identifier among `pointers`.
///
/// Strings are trimmed and must be non-empty; integers are stringified
/// without a fractional part. Anything else is skipped.
pub fn extract_id(raw: &Value, pointers: &[String]) -> Option<String> {
    pointers
        .iter()
        .filter_map(|p| raw.pointer(p))
        .find_map(|v| match v {
            Value::String(s) => Some(s.trim().to_string()).filter(|s| !s.is_empty()),
            Value::Number(n) => {
                if let Some(i) = n.as_i64() {
                    Some(i.to_string())
                } else if let Some(u) = n.as_u64() {
                    Some(u.to_string())
                } else {
                    n.as_f64()
                        .filter(|f| f.is_finite() && f.fract() == 0.0)
                        .map(|f| format!("{:.0}", f))
                }
            }
            _ => None,
        })
}

/// Flatten a JSON value to display text.
///
/// Arrays are joined with [`LIST_SEPARATOR`]; objects contribute their
/// `name` (or `title`) member. Blank results become `None`.
pub fn flatten_text(value: &Value) -> Option<String> {
    match value {
        Value::Null => None,
        Value::String(s) => {
            let s = s.trim();
            (!s.is_empty()).then(|| s.to_string())
        }
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => {
            let parts: Vec<String> = items.iter().filter_map(flatten_text).collect();
            (!parts.is_empty()).then(|| parts.join(LIST_SEPARATOR))
        }
        Value::Object(map) => map
            .get("name")
            .or_else(|| map.get("title"))
            .and_then(flatten_text),
    }
}

/// Parse a posted-date value. Unparseable input yields `None`, never an error.
pub fn parse_timestamp(value: &Value, format: DateFormat) -> Option<DateTime<Utc>> {
    match value {
        Value::Number(n) => match format {
            DateFormat::Iso8601 => None,
            _ => n.as_f64().and_then(|f| from_epoch(f, format)),
        },
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            match format {
                DateFormat::Iso8601 => parse_iso(s),
                DateFormat::EpochSeconds | DateFormat::EpochMillis => {
                    s.parse::<f64>().ok().and_then(|f| from_epoch(f, format))
                }
                DateFormat::Auto => match s.parse::<f64>() {
                    Ok(f) => from_epoch(f, format),
                    Err(_) => parse_iso(s),
                },
            }
        }
        _ => None,
    }
}

/// Epoch values above this are taken as milliseconds in `Auto` mode
/// (1e11 seconds is past the year 5000).
const AUTO_MILLIS_THRESHOLD: f64 = 1e11;

fn from_epoch(value: f64, format: DateFormat) -> Option<DateTime<Utc>> {
    if !value.is_finite() || value < 0.0 {
        return None;
    }
    let seconds = match format {
        DateFormat::EpochMillis => value / 1000.0,
        DateFormat::Auto if value > AUTO_MILLIS_THRESHOLD => value / 1000.0,
        _ => value,
    };
    let whole = seconds.trunc();
    let nanos = ((seconds - whole) * 1e9).round() as u32;
    DateTime::from_timestamp(whole as i64, nanos.min(999_999_999))
}

fn parse_iso(s: &str) -> Option<DateTime<Utc>> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    for fmt in ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(s, fmt) {
            return Some(naive.and_utc());
        }
    }
    NaiveDate::parse_from_str(s, "%Y-%m-%d")
        .ok()
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    fn micron_like() -> FieldMap {
        FieldMap::default()
            .with_id("/ats_job_id")
            .with_id("/id")
            .with_title("/name")
            .with_department("/department")
            .with_location("/location")
            .with_description("/job_description")
            .with_posted_at("/t_create", DateFormat::EpochSeconds)
            .with_source_url("/canonicalPositionUrl")
    }

    #[test]
    fn test_prefers_ats_id_over_internal_id() {
        let raw = json!({"ats_job_id": "JR12345", "id": 998877, "name": "Engineer"});
        let listing = micron_like().normalize("Micron", &raw).unwrap();
        assert_eq!(listing.external_id, "JR12345");
        assert_eq!(listing.employer, "Micron");
        assert_eq!(listing.title.as_deref(), Some("Engineer"));
    }

    #[test]
    fn test_falls_back_to_numeric_id() {
        let raw = json!({"ats_job_id": "  ", "id": 998877});
        let listing = micron_like().normalize("Micron", &raw).unwrap();
        assert_eq!(listing.external_id, "998877");

        let raw = json!({"ats_job_id": null, "id": 42.0});
        let listing = micron_like().normalize("Micron", &raw).unwrap();
        assert_eq!(listing.external_id, "42");
    }

    #[test]
    fn test_missing_id_is_an_error() {
        let raw = json!({"name": "No id here"});
        let err = micron_like().normalize("Micron", &raw).unwrap_err();
        assert!(matches!(err, NormalizeError::MissingId { .. }));

        let err = micron_like().normalize("Micron", &json!("just a string")).unwrap_err();
        assert_eq!(err, NormalizeError::NotAnObject);
    }

    #[test]
    fn test_list_fields_are_flattened() {
        let raw = json!({
            "id": 1,
            "department": ["Engineering", "", {"name": "Research"}],
            "location": []
        });
        let listing = micron_like().normalize("Micron", &raw).unwrap();
        assert_eq!(listing.department.as_deref(), Some("Engineering; Research"));
        assert_eq!(listing.location, None);
    }

    #[test]
    fn test_epoch_seconds_post_date() {
        let raw = json!({"id": 1, "t_create": 1_700_000_000});
        let listing = micron_like().normalize("Micron", &raw).unwrap();
        assert_eq!(
            listing.posted_at,
            Some(Utc.timestamp_opt(1_700_000_000, 0).unwrap())
        );
    }

    #[test]
    fn test_bad_post_date_becomes_none() {
        let raw = json!({"id": 1, "t_create": "yesterday-ish"});
        let listing = micron_like().normalize("Micron", &raw).unwrap();
        assert_eq!(listing.posted_at, None);

        let raw = json!({"id": 1, "t_create": -5});
        let listing = micron_like().normalize("Micron", &raw).unwrap();
        assert_eq!(listing.posted_at, None);
    }

    #[test]
    fn test_parse_iso_variants() {
        let expected = Utc.with_ymd_and_hms(2025, 3, 4, 10, 30, 0).unwrap();
        assert_eq!(
            parse_timestamp(&json!("2025-03-04T10:30:00Z"), DateFormat::Iso8601),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!("2025-03-04T12:30:00+02:00"), DateFormat::Auto),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!("2025-03-04T10:30:00"), DateFormat::Iso8601),
            Some(expected)
        );
        assert_eq!(
            parse_timestamp(&json!("2025-03-04"), DateFormat::Iso8601),
            Some(Utc.with_ymd_and_hms(2025, 3, 4, 0, 0, 0).unwrap())
        );
        assert_eq!(parse_timestamp(&json!(1_700_000_000), DateFormat::Iso8601), None);
    }

    #[test]
    fn test_auto_detects_millis() {
        let secs = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        assert_eq!(
            parse_timestamp(&json!(1_700_000_000_000i64), DateFormat::Auto),
            Some(secs)
        );
        assert_eq!(parse_timestamp(&json!("1700000000"), DateFormat::Auto), Some(secs));
        assert_eq!(
            parse_timestamp(&json!(1_700_000_000_000i64), DateFormat::EpochMillis),
            Some(secs)
        );
    }

    #[test]
    fn test_relative_url_resolution_and_template() {
        let map = FieldMap::default()
            .with_id("/id")
            .with_source_url("/path")
            .with_url_base("https://careers.example.com/jobs/")
            .with_url_template("https://careers.example.com/job/{id}");

        let listing = map.normalize("Example", &json!({"id": "7", "path": "/job/7"})).unwrap();
        assert_eq!(
            listing.source_url.as_deref(),
            Some("https://careers.example.com/job/7")
        );

        let listing = map.normalize("Example", &json!({"id": "8"})).unwrap();
        assert_eq!(
            listing.source_url.as_deref(),
            Some("https://careers.example.com/job/8")
        );
    }
}
