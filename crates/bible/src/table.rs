//! The chapter-to-video reference table.
//!
//! The table is loaded once at startup from a CSV document with the header
//! `book,chapter,youtubeId,startTime,endTime` and never mutated afterwards.
//! Rows are kept in file order; the sequence builder relies on that order
//! being chapter-ascending per book but does not enforce it.

use exn::ResultExt;
use tracing::instrument;

use crate::consts::VIDEO_TABLE_HEADER;
use crate::error::{ErrorKind, Result};
use crate::models::{BookCode, ChapterVideoEntry, ScriptureRange, Timecode};

/// Immutable chapter-to-video lookup table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VideoTable {
    entries: Vec<ChapterVideoEntry>,
}
impl VideoTable {
    pub fn new(entries: impl IntoIterator<Item = ChapterVideoEntry>) -> Self {
        Self {
            entries: entries.into_iter().collect(),
        }
    }

    /// Parse the CSV reference table.
    ///
    /// The first non-empty line is treated as the header and skipped (after
    /// checking it looks like one). Blank lines are ignored. Any row without
    /// exactly five columns, with an unknown book, or with a non-numeric
    /// chapter fails the whole load: this is configuration, and a partial
    /// table would silently hide readings.
    #[instrument(skip(csv), fields(csv_size = csv.len()))]
    pub fn from_csv(csv: &str) -> Result<Self> {
        let mut lines = csv.lines().map(str::trim).filter(|line| !line.is_empty());
        match lines.next() {
            Some(header) if Self::is_header(header) => {},
            Some(header) => exn::bail!(ErrorKind::ParseError {
                field: "header",
                value: header.to_string(),
            }),
            None => return Ok(Self::default()),
        }
        let entries = lines.map(Self::parse_row).collect::<Result<Vec<_>>>()?;
        tracing::debug!(rows = entries.len(), "Loaded chapter-to-video table");
        Ok(Self { entries })
    }

    fn is_header(line: &str) -> bool {
        line.split(',').map(str::trim).eq(VIDEO_TABLE_HEADER)
    }

    fn parse_row(line: &str) -> Result<ChapterVideoEntry> {
        let columns: Vec<&str> = line.split(',').map(str::trim).collect();
        let [book, chapter, video_id, start_time, end_time] = columns.as_slice() else {
            exn::bail!(ErrorKind::ParseError {
                field: "row",
                value: line.to_string(),
            });
        };
        Ok(ChapterVideoEntry {
            book: book.parse::<BookCode>()?,
            chapter: chapter.parse::<u32>().or_raise(|| ErrorKind::ParseError {
                field: "chapter",
                value: chapter.to_string(),
            })?,
            video_id: video_id.to_string(),
            start_time: Timecode::new(*start_time),
            end_time: Timecode::new(*end_time),
        })
    }

    pub fn entries(&self) -> &[ChapterVideoEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries covered by a range, in table order.
    pub fn chapters_in<'a>(&'a self, range: &'a ScriptureRange) -> impl Iterator<Item = &'a ChapterVideoEntry> + 'a {
        self.entries.iter().filter(move |entry| range.contains(entry.book, entry.chapter))
    }

    /// Find the entry a segment starts on: same video, same start timecode.
    ///
    /// Used to tell the reader which chapter the next video begins with.
    pub fn chapter_at(&self, video_id: &str, start_time: &Timecode) -> Option<&ChapterVideoEntry> {
        self.entries
            .iter()
            .find(|entry| entry.video_id == video_id && &entry.start_time == start_time)
    }
}
