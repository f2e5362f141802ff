use regex::Regex;
use std::sync::LazyLock;

macro_rules! regex {
    ($name:ident, $regex:expr) => {
        pub(crate) static $name: LazyLock<Regex> = LazyLock::new(|| Regex::new($regex).unwrap());
    };
}

// "GEN 1-3", "1 Samuel 4", "psa 23 - 24"
regex!(RANGE_REGEX, r"^\s*(.+?)\s+(\d+)(?:\s*-\s*(\d+))?\s*$");

/// Header row of the chapter-to-video reference table.
pub(crate) const VIDEO_TABLE_HEADER: [&str; 5] = ["book", "chapter", "youtubeId", "startTime", "endTime"];
