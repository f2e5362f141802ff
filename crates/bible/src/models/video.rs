use serde::{Deserialize, Serialize};

use super::{BookCode, Timecode};

/// One row of the chapter-to-video reference table: where a single chapter
/// is read within a video.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChapterVideoEntry {
    pub book: BookCode,
    pub chapter: u32,
    pub video_id: String,
    pub start_time: Timecode,
    pub end_time: Timecode,
}

/// A contiguous playable portion of one video, covering one or more merged
/// chapters. Derived per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoSegment {
    pub video_id: String,
    pub start_time: Timecode,
    pub end_time: Timecode,
}
impl VideoSegment {
    pub fn new(video_id: impl Into<String>, start_time: impl Into<Timecode>, end_time: impl Into<Timecode>) -> Self {
        Self {
            video_id: video_id.into(),
            start_time: start_time.into(),
            end_time: end_time.into(),
        }
    }

    pub(crate) fn from_entry(entry: &ChapterVideoEntry) -> Self {
        Self {
            video_id: entry.video_id.clone(),
            start_time: entry.start_time.clone(),
            end_time: entry.end_time.clone(),
        }
    }

    pub fn start_seconds(&self) -> Option<u32> {
        self.start_time.to_seconds()
    }

    pub fn end_seconds(&self) -> Option<u32> {
        self.end_time.to_seconds()
    }

    /// Playback length; `None` if either timecode is malformed or the end
    /// precedes the start.
    pub fn duration_seconds(&self) -> Option<u32> {
        self.end_seconds()?.checked_sub(self.start_seconds()?)
    }
}
