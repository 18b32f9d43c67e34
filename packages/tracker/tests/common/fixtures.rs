//! Listing and record builders shared by the integration tests.

#![allow(dead_code)]

use careers::ScrapedListing;
use chrono::{DateTime, Duration, TimeZone, Utc};
use serde_json::{json, Value};

/// Fixed clock: midnight UTC on 1 April 2025 plus `days`.
pub fn day(days: i64) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 4, 1, 0, 0, 0).unwrap() + Duration::days(days)
}

pub fn listing(employer: &str, external_id: &str, title: &str) -> ScrapedListing {
    ScrapedListing::new(employer, external_id)
        .with_title(title)
        .with_location("Boise, ID")
        .with_source_url(format!("https://careers.example.com/jobs/{}", external_id))
}

/// `count` listings with ids "1".."count".
pub fn listings(employer: &str, count: usize) -> Vec<ScrapedListing> {
    (1..=count)
        .map(|i| listing(employer, &i.to_string(), &format!("Engineer {}", i)))
        .collect()
}

pub fn ids(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

/// Raw record in the shape `MockSource`'s default field map reads.
pub fn record(id: &str, title: &str) -> Value {
    json!({
        "id": id,
        "title": title,
        "location": "Veldhoven, NL",
        "posted_at": "2025-03-30T09:00:00Z",
        "url": format!("https://careers.example.com/jobs/{}", id)
    })
}
