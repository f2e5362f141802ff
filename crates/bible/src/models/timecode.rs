use std::fmt::{Display, Formatter, Result as FmtResult};

use serde::{Deserialize, Serialize};

/// A `minutes:seconds` position inside a video, kept exactly as it appears in
/// the reference table.
///
/// Timecodes are reference data and are not validated on construction. A
/// malformed timecode simply has no numeric value: [`to_seconds`](Self::to_seconds)
/// returns `None`, and that `None` travels with any segment built from it.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Timecode(String);
impl Timecode {
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Total seconds: `minutes * 60 + seconds`, using the first two
    /// colon-delimited components. Anything after the second component is
    /// ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use amen_bible::models::Timecode;
    /// assert_eq!(Timecode::new("5:07").to_seconds(), Some(307));
    /// assert_eq!(Timecode::new("00:00").to_seconds(), Some(0));
    /// assert_eq!(Timecode::new("five").to_seconds(), None);
    /// ```
    pub fn to_seconds(&self) -> Option<u32> {
        let mut parts = self.0.split(':').map(|part| part.trim().parse::<u32>());
        let minutes = parts.next()?.ok()?;
        let seconds = parts.next()?.ok()?;
        minutes.checked_mul(60)?.checked_add(seconds)
    }
}
impl From<&str> for Timecode {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
impl From<String> for Timecode {
    fn from(value: String) -> Self {
        Self(value)
    }
}
impl Display for Timecode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
