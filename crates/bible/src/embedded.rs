//! Reference data compiled into the binary.
//!
//! The chapter-to-video table and the default reading plan live under `data/`
//! at the repository root and are embedded at compile time using
//! [`rust-embed`](rust_embed).

use std::borrow::Cow;

use exn::{OptionExt, ResultExt};
use rust_embed::Embed;

use crate::error::{ErrorKind, Result};
use crate::models::ReadingPlan;
use crate::table::VideoTable;

pub const VIDEO_TABLE_FILE: &str = "videos.csv";
pub const DEFAULT_PLAN_FILE: &str = "default_plan.json";

#[derive(Embed)]
#[folder = "../../data/"]
pub struct ReferenceData;
impl ReferenceData {
    /// Raw bytes of an embedded file.
    pub fn load(name: impl AsRef<str>) -> Result<Cow<'static, [u8]>> {
        Self::get(name.as_ref())
            .map(|f| f.data)
            .ok_or_raise(|| ErrorKind::AssetNotFound(name.as_ref().to_string()))
    }

    /// The bundled chapter-to-video table.
    pub fn video_table() -> Result<VideoTable> {
        let raw = Self::load(VIDEO_TABLE_FILE)?;
        let csv = std::str::from_utf8(&raw).or_raise(|| ErrorKind::InvalidData("video table is not UTF-8"))?;
        VideoTable::from_csv(csv)
    }

    /// The bundled default reading plan.
    pub fn default_plan() -> Result<ReadingPlan> {
        let raw = Self::load(DEFAULT_PLAN_FILE)?;
        ReadingPlan::from_json(&raw)
    }
}

impl ReadingPlan {
    /// Decode a plan from its JSON form.
    pub fn from_json(raw: impl AsRef<[u8]>) -> Result<Self> {
        serde_json::from_slice(raw.as_ref()).or_raise(|| ErrorKind::InvalidData("reading plan is not valid JSON"))
    }
}
