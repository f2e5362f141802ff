use std::collections::BTreeMap;
use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Deserializer, Serialize};
use time::OffsetDateTime;

/// Normalize a day-of-month key the way stored records expect: the leading
/// decimal digits without padding, so `"07"` and `"7th"` both become `"7"`.
///
/// Returns `None` when the input does not start with a digit.
///
/// ```
/// use amen_progress::models::normalize_day;
/// assert_eq!(normalize_day("07").as_deref(), Some("7"));
/// assert_eq!(normalize_day(" 12 ").as_deref(), Some("12"));
/// assert_eq!(normalize_day("x1"), None);
/// ```
pub fn normalize_day(raw: &str) -> Option<String> {
    let trimmed = raw.trim_start();
    let digits = trimmed.find(|c: char| !c.is_ascii_digit()).unwrap_or(trimmed.len());
    let value: u32 = trimmed[..digits].parse().ok()?;
    Some(value.to_string())
}

/// Decode a per-day map, normalizing its keys and dropping those that are not days.
fn normalized_days<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BTreeMap<String, bool>, D::Error> {
    let raw = BTreeMap::<String, bool>::deserialize(deserializer)?;
    Ok(raw
        .into_iter()
        .filter_map(|(day, value)| Some((normalize_day(&day)?, value)))
        .collect())
}

/// Which per-day map of a month record a change applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProgressField {
    Completion,
    Like,
}
impl ProgressField {
    /// Name of the map inside the stored document.
    pub fn map_name(&self) -> &'static str {
        match self {
            Self::Completion => "completions",
            Self::Like => "likes",
        }
    }
}
impl Display for ProgressField {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            Self::Completion => f.write_str("completion"),
            Self::Like => f.write_str("like"),
        }
    }
}

/// One user's completion and like state for one month of one plan.
///
/// Day keys are normalized decimal strings (see [`normalize_day`]); keys
/// written any other way are normalized when a record is decoded. Absent
/// days read as `false`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthRecord {
    pub user_id: String,
    pub plan_id: String,
    pub year: i32,
    pub month: u8,
    #[serde(default, deserialize_with = "normalized_days")]
    pub completions: BTreeMap<String, bool>,
    #[serde(default, deserialize_with = "normalized_days")]
    pub likes: BTreeMap<String, bool>,
    #[serde(with = "time::serde::timestamp")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::timestamp")]
    pub updated_at: OffsetDateTime,
}
impl MonthRecord {
    /// A record with no completions or likes.
    pub fn empty(
        user_id: impl Into<String>,
        plan_id: impl Into<String>,
        year: i32,
        month: u8,
        now: OffsetDateTime,
    ) -> Self {
        Self {
            user_id: user_id.into(),
            plan_id: plan_id.into(),
            year,
            month,
            completions: BTreeMap::new(),
            likes: BTreeMap::new(),
            created_at: now,
            updated_at: now,
        }
    }

    fn map(&self, field: ProgressField) -> &BTreeMap<String, bool> {
        match field {
            ProgressField::Completion => &self.completions,
            ProgressField::Like => &self.likes,
        }
    }

    fn map_mut(&mut self, field: ProgressField) -> &mut BTreeMap<String, bool> {
        match field {
            ProgressField::Completion => &mut self.completions,
            ProgressField::Like => &mut self.likes,
        }
    }

    /// The stored value for a day, distinguishing "never set" from `false`.
    pub fn value(&self, field: ProgressField, day: u8) -> Option<bool> {
        self.map(field).get(&day.to_string()).copied()
    }

    /// Set (`Some`) or clear (`None`) the value for a day.
    pub fn set_value(&mut self, field: ProgressField, day: u8, value: Option<bool>) {
        let map = self.map_mut(field);
        match value {
            Some(value) => map.insert(day.to_string(), value),
            None => map.remove(&day.to_string()),
        };
    }

    pub fn is_completed(&self, day: u8) -> bool {
        self.value(ProgressField::Completion, day).unwrap_or(false)
    }

    pub fn is_liked(&self, day: u8) -> bool {
        self.value(ProgressField::Like, day).unwrap_or(false)
    }

    /// Days of the month whose value is `true`, ascending.
    pub fn days_set(&self, field: ProgressField) -> Vec<u8> {
        let mut days: Vec<u8> = self
            .map(field)
            .iter()
            .filter(|(_, value)| **value)
            .filter_map(|(day, _)| day.parse().ok())
            .collect();
        days.sort_unstable();
        days
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;
    use time::macros::datetime;

    #[rstest]
    #[case("7", Some("7"))]
    #[case("07", Some("7"))]
    #[case("31", Some("31"))]
    #[case("3abc", Some("3"))]
    #[case("", None)]
    #[case("-1", None)]
    fn test_normalize_day(#[case] raw: &str, #[case] expected: Option<&str>) {
        assert_eq!(normalize_day(raw).as_deref(), expected);
    }

    #[test]
    fn test_missing_likes_deserialize_as_empty() {
        let record: MonthRecord = serde_json::from_value(json!({
            "userId": "u1",
            "planId": "default",
            "year": 2025,
            "month": 3,
            "completions": {"1": true},
            "createdAt": 1735689600,
            "updatedAt": 1735689600
        }))
        .unwrap();
        assert!(record.likes.is_empty());
        assert!(record.is_completed(1));
        assert!(!record.is_completed(2));
        assert_eq!(record.created_at, datetime!(2025-01-01 00:00 UTC));
    }

    #[test]
    fn test_day_keys_are_normalized_on_decode() {
        let record: MonthRecord = serde_json::from_value(json!({
            "userId": "u1",
            "planId": "default",
            "year": 2025,
            "month": 3,
            "completions": {"07": true, "x": true, "10": false},
            "likes": {" 9": true},
            "createdAt": 1735689600,
            "updatedAt": 1735689600
        }))
        .unwrap();
        assert!(record.is_completed(7));
        assert_eq!(record.value(ProgressField::Completion, 10), Some(false));
        assert_eq!(record.completions.len(), 2);
        assert!(record.is_liked(9));
    }

    #[test]
    fn test_set_and_clear_values() {
        let mut record = MonthRecord::empty("u1", "default", 2025, 1, datetime!(2025-01-01 00:00 UTC));
        record.set_value(ProgressField::Like, 9, Some(true));
        record.set_value(ProgressField::Completion, 10, Some(true));
        record.set_value(ProgressField::Completion, 2, Some(true));
        record.set_value(ProgressField::Completion, 3, Some(false));
        assert_eq!(record.value(ProgressField::Like, 9), Some(true));
        assert_eq!(record.days_set(ProgressField::Completion), vec![2, 10]);
        record.set_value(ProgressField::Like, 9, None);
        assert_eq!(record.value(ProgressField::Like, 9), None);
    }

    #[test]
    fn test_serializes_camel_case_with_unix_timestamps() {
        let record = MonthRecord::empty("u1", "default", 2025, 1, datetime!(2025-01-01 00:00 UTC));
        let value = serde_json::to_value(&record).unwrap();
        assert_eq!(value["planId"], json!("default"));
        assert_eq!(value["createdAt"], json!(1735689600));
        assert_eq!(value["completions"], json!({}));
    }
}
