use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use super::sanitize;
use crate::error::{Error, ErrorKind};

macro_rules! books {
    ($($variant:ident => $code:literal, $name:literal, $korean:literal;)+) => {
        /// Canonical book of the Protestant canon, identified by its USFM code.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum BookCode {
            $($variant,)+
        }
        impl BookCode {
            /// Every book, in canonical order.
            pub const ALL: &'static [BookCode] = &[$(BookCode::$variant,)+];

            /// Three-character USFM code (e.g. `GEN`, `1SA`).
            pub fn code(&self) -> &'static str {
                match self {
                    $(Self::$variant => $code,)+
                }
            }

            /// English display name.
            pub fn name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $name,)+
                }
            }

            /// Korean display name, as used in share text and chapter labels.
            pub fn korean_name(&self) -> &'static str {
                match self {
                    $(Self::$variant => $korean,)+
                }
            }
        }
    };
}

books! {
    Genesis => "GEN", "Genesis", "창세기";
    Exodus => "EXO", "Exodus", "출애굽기";
    Leviticus => "LEV", "Leviticus", "레위기";
    Numbers => "NUM", "Numbers", "민수기";
    Deuteronomy => "DEU", "Deuteronomy", "신명기";
    Joshua => "JOS", "Joshua", "여호수아";
    Judges => "JDG", "Judges", "사사기";
    Ruth => "RUT", "Ruth", "룻기";
    FirstSamuel => "1SA", "1 Samuel", "사무엘상";
    SecondSamuel => "2SA", "2 Samuel", "사무엘하";
    FirstKings => "1KI", "1 Kings", "열왕기상";
    SecondKings => "2KI", "2 Kings", "열왕기하";
    FirstChronicles => "1CH", "1 Chronicles", "역대상";
    SecondChronicles => "2CH", "2 Chronicles", "역대하";
    Ezra => "EZR", "Ezra", "에스라";
    Nehemiah => "NEH", "Nehemiah", "느헤미야";
    Esther => "EST", "Esther", "에스더";
    Job => "JOB", "Job", "욥기";
    Psalms => "PSA", "Psalms", "시편";
    Proverbs => "PRO", "Proverbs", "잠언";
    Ecclesiastes => "ECC", "Ecclesiastes", "전도서";
    SongOfSongs => "SNG", "Song of Songs", "아가";
    Isaiah => "ISA", "Isaiah", "이사야";
    Jeremiah => "JER", "Jeremiah", "예레미야";
    Lamentations => "LAM", "Lamentations", "예레미야애가";
    Ezekiel => "EZK", "Ezekiel", "에스겔";
    Daniel => "DAN", "Daniel", "다니엘";
    Hosea => "HOS", "Hosea", "호세아";
    Joel => "JOL", "Joel", "요엘";
    Amos => "AMO", "Amos", "아모스";
    Obadiah => "OBA", "Obadiah", "오바댜";
    Jonah => "JON", "Jonah", "요나";
    Micah => "MIC", "Micah", "미가";
    Nahum => "NAM", "Nahum", "나훔";
    Habakkuk => "HAB", "Habakkuk", "하박국";
    Zephaniah => "ZEP", "Zephaniah", "스바냐";
    Haggai => "HAG", "Haggai", "학개";
    Zechariah => "ZEC", "Zechariah", "스가랴";
    Malachi => "MAL", "Malachi", "말라기";
    Matthew => "MAT", "Matthew", "마태복음";
    Mark => "MRK", "Mark", "마가복음";
    Luke => "LUK", "Luke", "누가복음";
    John => "JHN", "John", "요한복음";
    Acts => "ACT", "Acts", "사도행전";
    Romans => "ROM", "Romans", "로마서";
    FirstCorinthians => "1CO", "1 Corinthians", "고린도전서";
    SecondCorinthians => "2CO", "2 Corinthians", "고린도후서";
    Galatians => "GAL", "Galatians", "갈라디아서";
    Ephesians => "EPH", "Ephesians", "에베소서";
    Philippians => "PHP", "Philippians", "빌립보서";
    Colossians => "COL", "Colossians", "골로새서";
    FirstThessalonians => "1TH", "1 Thessalonians", "데살로니가전서";
    SecondThessalonians => "2TH", "2 Thessalonians", "데살로니가후서";
    FirstTimothy => "1TI", "1 Timothy", "디모데전서";
    SecondTimothy => "2TI", "2 Timothy", "디모데후서";
    Titus => "TIT", "Titus", "디도서";
    Philemon => "PHM", "Philemon", "빌레몬서";
    Hebrews => "HEB", "Hebrews", "히브리서";
    James => "JAS", "James", "야고보서";
    FirstPeter => "1PE", "1 Peter", "베드로전서";
    SecondPeter => "2PE", "2 Peter", "베드로후서";
    FirstJohn => "1JN", "1 John", "요한일서";
    SecondJohn => "2JN", "2 John", "요한이서";
    ThirdJohn => "3JN", "3 John", "요한삼서";
    Jude => "JUD", "Jude", "유다서";
    Revelation => "REV", "Revelation", "요한계시록";
}

impl FromStr for BookCode {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let sanitized = sanitize(s);
        Self::ALL
            .iter()
            .find(|book| sanitize(book.code()) == sanitized || sanitize(book.name()) == sanitized)
            .copied()
            .ok_or_else(|| {
                exn::Exn::from(ErrorKind::ParseError {
                    field: "book",
                    value: s.to_string(),
                })
            })
    }
}
impl TryFrom<String> for BookCode {
    type Error = Error;
    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.as_str().parse()
    }
}

impl Display for BookCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.code())
    }
}

impl Serialize for BookCode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.code())
    }
}
impl<'de> Deserialize<'de> for BookCode {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse::<BookCode>().map_err(|e| serde::de::Error::custom(&*e))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case("GEN", BookCode::Genesis)]
    #[case("gen", BookCode::Genesis)]
    #[case(" Genesis ", BookCode::Genesis)]
    #[case("1SA", BookCode::FirstSamuel)]
    #[case("1 samuel", BookCode::FirstSamuel)]
    #[case("song of songs", BookCode::SongOfSongs)]
    #[case("REV", BookCode::Revelation)]
    fn test_parse(#[case] input: &str, #[case] expected: BookCode) {
        assert_eq!(input.parse::<BookCode>().unwrap(), expected);
    }

    #[test]
    fn test_parse_unknown() {
        let err = "Hezekiah".parse::<BookCode>().unwrap_err();
        assert!(matches!(&*err, ErrorKind::ParseError { field: "book", .. }));
    }

    #[test]
    fn test_catalogue_is_complete() {
        assert_eq!(BookCode::ALL.len(), 66);
        assert_eq!(BookCode::ALL.first(), Some(&BookCode::Genesis));
        assert_eq!(BookCode::ALL.last(), Some(&BookCode::Revelation));
    }

    #[test]
    fn test_serde_uses_code() {
        let json = serde_json::to_string(&BookCode::FirstCorinthians).unwrap();
        assert_eq!(json, r#""1CO""#);
        let book: BookCode = serde_json::from_str(r#""psa""#).unwrap();
        assert_eq!(book, BookCode::Psalms);
        assert!(serde_json::from_str::<BookCode>(r#""XYZ""#).is_err());
    }
}
