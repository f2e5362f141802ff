//! Scripture reference data and video sequencing.
//!
//! This crate owns everything that is static at runtime: the book catalogue,
//! scripture ranges, reading plans, and the chapter-to-video table. Its main
//! operation is [`build_sequence`], which turns a day's ranges into the
//! ordered list of video segments the player walks through.

mod consts;
mod embedded;
pub mod error;
pub mod models;
mod registry;
mod sequence;
mod share;
mod table;

pub use crate::embedded::{DEFAULT_PLAN_FILE, ReferenceData, VIDEO_TABLE_FILE};
pub use crate::registry::{DEFAULT_PLAN_ID, PlanRegistry};
pub use crate::sequence::{Playback, build_sequence};
pub use crate::share::{chapter_label, next_chapter_label, range_label, share_text};
pub use crate::table::VideoTable;
