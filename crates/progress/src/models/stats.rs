use amen_store::{Document, get_field};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// How many users completed and liked one day of one plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanStats {
    pub total_likes: u32,
    pub total_completions: u32,
}
impl PlanStats {
    /// Count the month documents that mark `day` as liked and as completed.
    ///
    /// Documents are inspected as stored rather than decoded, so partial or
    /// older records still count.
    pub fn tally<'a>(documents: impl IntoIterator<Item = &'a Document>, day: &str) -> Self {
        let is_set = |document: &Document, map: &str| {
            get_field(document, &format!("{map}.{day}")).and_then(Value::as_bool).unwrap_or(false)
        };
        documents.into_iter().fold(Self::default(), |mut stats, document| {
            stats.total_likes += u32::from(is_set(document, "likes"));
            stats.total_completions += u32::from(is_set(document, "completions"));
            stats
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn doc(value: Value) -> Document {
        match value {
            Value::Object(map) => map,
            _ => panic!("test document must be an object"),
        }
    }

    #[test]
    fn test_tally() {
        let documents = [
            doc(json!({"completions": {"5": true}, "likes": {"5": true}})),
            doc(json!({"completions": {"5": true, "6": true}})),
            doc(json!({"completions": {"5": false}, "likes": {"6": true}})),
            doc(json!({})),
        ];
        let stats = PlanStats::tally(&documents, "5");
        assert_eq!(
            stats,
            PlanStats {
                total_likes: 1,
                total_completions: 2
            }
        );
        assert_eq!(PlanStats::tally(&documents, "6").total_likes, 1);
        assert_eq!(PlanStats::tally(std::iter::empty(), "1"), PlanStats::default());
    }
}
