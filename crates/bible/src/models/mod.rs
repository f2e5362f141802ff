mod book;
mod plan;
mod range;
mod timecode;
mod video;

pub use self::book::BookCode;
pub use self::plan::{DailyReading, ReadingPlan};
pub use self::range::ScriptureRange;
pub use self::timecode::Timecode;
pub use self::video::{ChapterVideoEntry, VideoSegment};

fn sanitize(s: impl AsRef<str>) -> String {
    s.as_ref().trim().to_lowercase().replace([' ', '-', '_'], "")
}
