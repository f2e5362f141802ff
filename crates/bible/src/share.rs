//! Human-readable labels for readings, in Korean.

use crate::models::{BookCode, ScriptureRange, VideoSegment};
use crate::table::VideoTable;

/// Label for a single chapter, e.g. `창세기 3장`.
pub fn chapter_label(book: BookCode, chapter: u32) -> String {
    format!("{} {chapter}장", book.korean_name())
}

/// Label for a range, e.g. `창세기 1-3장` or `출애굽기 4장`.
pub fn range_label(range: &ScriptureRange) -> String {
    match range.is_single_chapter() {
        true => chapter_label(range.book(), range.start_chapter()),
        false => format!(
            "{} {}-{}장",
            range.book().korean_name(),
            range.start_chapter(),
            range.end_chapter()
        ),
    }
}

/// Text shared alongside a day's reading: every range label, comma separated.
///
/// ```
/// use amen_bible::models::{BookCode, ScriptureRange};
/// use amen_bible::share_text;
///
/// let ranges = [
///     ScriptureRange::new(BookCode::Genesis, 1, 3).unwrap(),
///     ScriptureRange::chapter(BookCode::Exodus, 4).unwrap(),
/// ];
/// assert_eq!(share_text(&ranges), "창세기 1-3장, 출애굽기 4장");
/// ```
pub fn share_text<'a>(ranges: impl IntoIterator<Item = &'a ScriptureRange>) -> String {
    ranges.into_iter().map(range_label).collect::<Vec<_>>().join(", ")
}

/// Label for the chapter a segment opens with, used for the "up next" prompt.
///
/// Returns `None` when no table entry starts exactly where the segment does.
pub fn next_chapter_label(segment: &VideoSegment, table: &VideoTable) -> Option<String> {
    table
        .chapter_at(&segment.video_id, &segment.start_time)
        .map(|entry| chapter_label(entry.book, entry.chapter))
}
