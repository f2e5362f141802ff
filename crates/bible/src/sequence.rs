//! Stitching scripture ranges into a playable video sequence.
//!
//! Each chapter in the reference table points at a window of some video.
//! Consecutive chapters are frequently read in the same video, so rather than
//! seeking between them the builder merges runs of chapters sharing a video
//! into a single segment.

use crate::models::{ScriptureRange, VideoSegment};
use crate::table::VideoTable;

/// Build the minimal ordered list of segments covering `ranges`.
///
/// - Chapters are selected per range, in table order.
/// - A run of chapters with the same video id becomes one segment, from the
///   first chapter's start to the last chapter's end. Timecodes are assumed to
///   increase within a video; this is not checked.
/// - Ranges are handled independently: segments never merge across a range
///   boundary, even when the video id is the same.
/// - A range with no table entries contributes nothing.
///
/// # Examples
///
/// ```
/// use amen_bible::models::{BookCode, ScriptureRange, VideoSegment};
/// use amen_bible::{VideoTable, build_sequence};
///
/// let table = VideoTable::from_csv(
///     "book,chapter,youtubeId,startTime,endTime\n\
///      GEN,1,X,0:00,5:00\n\
///      GEN,2,X,5:00,10:00\n\
///      GEN,3,Y,0:00,3:00",
/// ).unwrap();
/// let ranges = [ScriptureRange::new(BookCode::Genesis, 1, 3).unwrap()];
/// assert_eq!(build_sequence(&ranges, &table), vec![
///     VideoSegment::new("X", "0:00", "10:00"),
///     VideoSegment::new("Y", "0:00", "3:00"),
/// ]);
/// ```
pub fn build_sequence<'a>(ranges: impl IntoIterator<Item = &'a ScriptureRange>, table: &VideoTable) -> Vec<VideoSegment> {
    let mut sequence = Vec::new();
    for range in ranges {
        let mut current: Option<VideoSegment> = None;
        for entry in table.chapters_in(range) {
            match current.as_mut() {
                Some(segment) if segment.video_id == entry.video_id => {
                    segment.end_time = entry.end_time.clone();
                },
                _ => {
                    if let Some(closed) = current.replace(VideoSegment::from_entry(entry)) {
                        sequence.push(closed);
                    }
                },
            }
        }
        sequence.extend(current);
    }
    sequence
}

/// What the player should show for a day's reading.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Playback {
    /// None of the requested chapters have video yet; show a placeholder.
    Unavailable,
    /// Segments to play, in order.
    Ready(Vec<VideoSegment>),
}
impl Playback {
    pub fn plan<'a>(ranges: impl IntoIterator<Item = &'a ScriptureRange>, table: &VideoTable) -> Self {
        let segments = build_sequence(ranges, table);
        match segments.is_empty() {
            true => {
                tracing::debug!("No video segments for reading; content not yet available");
                Self::Unavailable
            },
            false => Self::Ready(segments),
        }
    }

    pub fn segments(&self) -> &[VideoSegment] {
        match self {
            Self::Unavailable => &[],
            Self::Ready(segments) => segments,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Ready(_))
    }

    /// Total playback time; `None` if any segment has malformed timecodes.
    pub fn total_seconds(&self) -> Option<u32> {
        self.segments().iter().map(VideoSegment::duration_seconds).sum()
    }
}
