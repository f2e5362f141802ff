use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use time::Date;

use super::ScriptureRange;

/// The scripture ranges assigned to one day.
pub type DailyReading = Vec<ScriptureRange>;

/// An annual reading plan: the same month/day schedule applies to every
/// calendar year.
///
/// Serialized as `{"id", "title", "months": {"<month>": {"<day>": [range, ...]}}}`
/// with decimal-string keys.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReadingPlan {
    pub id: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub months: BTreeMap<u8, BTreeMap<u8, DailyReading>>,
}
impl ReadingPlan {
    pub fn new(id: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            title: title.into(),
            months: BTreeMap::new(),
        }
    }

    /// Assign the reading for a month/day, replacing any existing assignment.
    pub fn with_reading(mut self, month: u8, day: u8, ranges: impl Into<DailyReading>) -> Self {
        self.months.entry(month).or_default().insert(day, ranges.into());
        self
    }

    /// The reading assigned to a calendar date, if the plan schedules one.
    pub fn reading_for(&self, date: Date) -> Option<&[ScriptureRange]> {
        self.months.get(&u8::from(date.month()))?.get(&date.day()).map(Vec::as_slice)
    }

    /// Number of days with an assigned reading.
    pub fn scheduled_days(&self) -> usize {
        self.months.values().map(BTreeMap::len).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookCode;
    use time::macros::date;

    #[test]
    fn test_reading_for_date() {
        let genesis = ScriptureRange::new(BookCode::Genesis, 1, 3).unwrap();
        let plan = ReadingPlan::new("test", "Test").with_reading(1, 2, vec![genesis]);
        assert_eq!(plan.reading_for(date!(2025 - 01 - 02)), Some(&[genesis][..]));
        // Annual: the year is irrelevant
        assert_eq!(plan.reading_for(date!(2031 - 01 - 02)), Some(&[genesis][..]));
        assert_eq!(plan.reading_for(date!(2025 - 01 - 03)), None);
        assert_eq!(plan.scheduled_days(), 1);
    }

    #[test]
    fn test_deserialize_string_keys() {
        let json = r#"{
            "id": "default",
            "title": "Bible in a Year",
            "months": {"1": {"1": [{"book": "GEN", "startChapter": 1, "endChapter": 3}]}}
        }"#;
        let plan: ReadingPlan = serde_json::from_str(json).unwrap();
        let reading = plan.reading_for(date!(2025 - 01 - 01)).unwrap();
        assert_eq!(reading[0].end_chapter(), 3);
    }
}
