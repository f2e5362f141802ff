use serde_json::Value;

use crate::document::{Document, get_field};
use crate::path::{CollectionPath, DocPath};

/// Which documents a query ranges over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Scope {
    /// Documents directly inside one collection.
    Collection(CollectionPath),
    /// Documents inside every collection with this id, at any depth.
    Group(String),
}

/// An equality condition on a (possibly dotted) field.
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub value: Value,
}

/// A collection or collection-group query with equality filters.
///
/// ```
/// use amen_store::{CollectionPath, Query};
/// let query = Query::group("months").where_eq("planId", "default").where_eq("year", 2025);
/// assert_eq!(query.filters().len(), 2);
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct Query {
    scope: Scope,
    filters: Vec<Filter>,
}
impl Query {
    pub fn collection(path: CollectionPath) -> Self {
        Self {
            scope: Scope::Collection(path),
            filters: Vec::new(),
        }
    }

    pub fn group(collection_id: impl Into<String>) -> Self {
        Self {
            scope: Scope::Group(collection_id.into()),
            filters: Vec::new(),
        }
    }

    pub fn where_eq(mut self, field: impl Into<String>, value: impl Into<Value>) -> Self {
        self.filters.push(Filter {
            field: field.into(),
            value: value.into(),
        });
        self
    }

    pub fn scope(&self) -> &Scope {
        &self.scope
    }

    pub fn filters(&self) -> &[Filter] {
        &self.filters
    }

    /// Whether a document at `path` falls within the query's scope.
    pub fn in_scope(&self, path: &DocPath) -> bool {
        let parent = path.parent();
        match &self.scope {
            Scope::Collection(collection) => &parent == collection,
            Scope::Group(id) => parent.collection_id() == id,
        }
    }

    /// Whether a document is in scope and satisfies every filter.
    pub fn matches(&self, path: &DocPath, document: &Document) -> bool {
        self.in_scope(path)
            && self
                .filters
                .iter()
                .all(|filter| get_field(document, &filter.field) == Some(&filter.value))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn month(plan: &str, year: i64) -> Document {
        match json!({"planId": plan, "year": year, "month": 1}) {
            Value::Object(map) => map,
            _ => unreachable!(),
        }
    }

    #[test]
    fn test_collection_scope() {
        let months = CollectionPath::new("userPlans/u1/yearPlans/default/months").unwrap();
        let query = Query::collection(months.clone());
        assert!(query.in_scope(&months.doc("1").unwrap()));
        let other = DocPath::new("userPlans/u2/yearPlans/default/months/1").unwrap();
        assert!(!query.in_scope(&other));
    }

    #[test]
    fn test_group_scope_spans_users() {
        let query = Query::group("months").where_eq("planId", "default").where_eq("year", 2025);
        let u1 = DocPath::new("userPlans/u1/yearPlans/default/months/1").unwrap();
        let u2 = DocPath::new("userPlans/u2/yearPlans/default/months/1").unwrap();
        let user = DocPath::new("users/u1").unwrap();
        assert!(query.matches(&u1, &month("default", 2025)));
        assert!(query.matches(&u2, &month("default", 2025)));
        assert!(!query.matches(&u1, &month("default", 2024)));
        assert!(!query.matches(&u1, &month("other", 2025)));
        assert!(!query.matches(&user, &month("default", 2025)));
    }
}
