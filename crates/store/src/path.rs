//! Document and collection paths.
//!
//! A path is a sequence of `/`-separated segments alternating between
//! collection ids and document ids: `users` is a collection, `users/abc` a
//! document in it, `users/abc/plans` a subcollection of that document, and so
//! on. Documents therefore always have an even number of segments and
//! collections an odd number.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;

use crate::error::{Error, ErrorKind, Result};

/// Split and check a raw path.
///
/// Empty segments (from doubled or trailing slashes) are dropped. Segments
/// of `.` or `..`, or containing null bytes, are rejected: paths are keys,
/// not filesystem locations, and there is nothing to resolve.
fn segments(raw: &str) -> Result<Vec<&str>> {
    let mut segments = Vec::new();
    for segment in raw.split('/').filter(|s| !s.is_empty()) {
        if segment == "." || segment == ".." || segment.contains('\0') {
            exn::bail!(ErrorKind::InvalidPath(raw.to_string()));
        }
        segments.push(segment);
    }
    Ok(segments)
}

/// Check a single document or collection id.
///
/// ```
/// use amen_store::validate_id;
/// assert!(validate_id("abc").is_ok());
/// assert!(validate_id("a/b").is_err());
/// assert!(validate_id("").is_err());
/// ```
pub fn validate_id(id: &str) -> Result<&str> {
    match segments(id)?.as_slice() {
        [segment] if *segment == id => Ok(id),
        _ => exn::bail!(ErrorKind::InvalidPath(id.to_string())),
    }
}

/// Path to a single document, e.g. `users/abc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct DocPath(String);
impl DocPath {
    /// Validate and normalize a document path.
    ///
    /// ```
    /// use amen_store::DocPath;
    /// assert_eq!(DocPath::new("users//abc/").unwrap().as_str(), "users/abc");
    /// assert!(DocPath::new("users").is_err());
    /// assert!(DocPath::new("users/../abc").is_err());
    /// ```
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        let segments = segments(raw)?;
        if segments.is_empty() || segments.len() % 2 != 0 {
            exn::bail!(ErrorKind::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The document's own id (last segment).
    pub fn id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// The collection containing this document.
    pub fn parent(&self) -> CollectionPath {
        // Always at least two segments, so there is always a separator.
        let (parent, _) = self.0.rsplit_once('/').unwrap_or((&self.0, ""));
        CollectionPath(parent.to_string())
    }

    /// A subcollection under this document.
    pub fn collection(&self, id: impl AsRef<str>) -> Result<CollectionPath> {
        let id = validate_id(id.as_ref())?;
        Ok(CollectionPath(format!("{}/{id}", self.0)))
    }
}
impl FromStr for DocPath {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
impl Display for DocPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}

/// Path to a collection of documents, e.g. `users` or `users/abc/plans`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CollectionPath(String);
impl CollectionPath {
    pub fn new(raw: impl AsRef<str>) -> Result<Self> {
        let raw = raw.as_ref();
        let segments = segments(raw)?;
        if segments.len() % 2 != 1 {
            exn::bail!(ErrorKind::InvalidPath(raw.to_string()));
        }
        Ok(Self(segments.join("/")))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The collection id (last segment). Collection group queries match on this.
    pub fn collection_id(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// A document within this collection.
    pub fn doc(&self, id: impl AsRef<str>) -> Result<DocPath> {
        let id = validate_id(id.as_ref())?;
        Ok(DocPath(format!("{}/{id}", self.0)))
    }
}
impl FromStr for CollectionPath {
    type Err = Error;
    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}
impl Display for CollectionPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.write_str(&self.0)
    }
}
