use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use super::BookCode;
use crate::consts::RANGE_REGEX;
use crate::error::{Error, ErrorKind, Result};

/// A contiguous chapter span within one book, e.g. Genesis 1-3.
///
/// Both chapters are inclusive and `1 <= start_chapter <= end_chapter` always
/// holds: construction, parsing and deserialization all reject anything else.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRange", rename_all = "camelCase")]
pub struct ScriptureRange {
    book: BookCode,
    start_chapter: u32,
    end_chapter: u32,
}
impl ScriptureRange {
    pub fn new(book: BookCode, start_chapter: u32, end_chapter: u32) -> Result<Self> {
        if start_chapter == 0 || start_chapter > end_chapter {
            exn::bail!(ErrorKind::InvalidRange {
                start: start_chapter,
                end: end_chapter
            });
        }
        Ok(Self {
            book,
            start_chapter,
            end_chapter,
        })
    }

    /// A range covering exactly one chapter.
    pub fn chapter(book: BookCode, chapter: u32) -> Result<Self> {
        Self::new(book, chapter, chapter)
    }

    pub fn book(&self) -> BookCode {
        self.book
    }

    pub fn start_chapter(&self) -> u32 {
        self.start_chapter
    }

    pub fn end_chapter(&self) -> u32 {
        self.end_chapter
    }

    pub fn contains(&self, book: BookCode, chapter: u32) -> bool {
        self.book == book && (self.start_chapter..=self.end_chapter).contains(&chapter)
    }

    pub fn is_single_chapter(&self) -> bool {
        self.start_chapter == self.end_chapter
    }
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawRange {
    book: BookCode,
    start_chapter: u32,
    end_chapter: u32,
}
impl TryFrom<RawRange> for ScriptureRange {
    type Error = ErrorKind;
    fn try_from(raw: RawRange) -> std::result::Result<Self, Self::Error> {
        // Serde wants a Display error, which the inner kind already is.
        Self::new(raw.book, raw.start_chapter, raw.end_chapter).map_err(|e| (*e).clone())
    }
}

impl FromStr for ScriptureRange {
    type Err = Error;
    /// Parses `"<book> <start>[-<end>]"`, e.g. `"GEN 1-3"` or `"1 Samuel 4"`.
    fn from_str(s: &str) -> Result<Self> {
        let captures = RANGE_REGEX.captures(s).ok_or_else(|| {
            exn::Exn::from(ErrorKind::ParseError {
                field: "range",
                value: s.to_string(),
            })
        })?;
        let book = captures[1].parse::<BookCode>()?;
        let chapter = |index: usize| -> Result<Option<u32>> {
            captures
                .get(index)
                .map(|m| {
                    m.as_str().parse::<u32>().map_err(|_| {
                        exn::Exn::from(ErrorKind::ParseError {
                            field: "chapter",
                            value: m.as_str().to_string(),
                        })
                    })
                })
                .transpose()
        };
        let start = chapter(2)?.unwrap_or_default();
        let end = chapter(3)?.unwrap_or(start);
        Self::new(book, start, end)
    }
}

impl Display for ScriptureRange {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self.is_single_chapter() {
            true => write!(f, "{} {}", self.book, self.start_chapter),
            false => write!(f, "{} {}-{}", self.book, self.start_chapter, self.end_chapter),
        }
    }
}
