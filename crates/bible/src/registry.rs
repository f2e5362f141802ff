use std::collections::BTreeMap;

use time::Date;

use crate::embedded::ReferenceData;
use crate::error::{ErrorKind, Result};
use crate::models::{ReadingPlan, ScriptureRange};

/// Identifier of the bundled plan.
pub const DEFAULT_PLAN_ID: &str = "default";

/// Loaded reading plans and which one is active.
///
/// There is always an active plan: the registry is only ever constructed
/// around one and switching to an unknown id is rejected.
#[derive(Debug, Clone)]
pub struct PlanRegistry {
    plans: BTreeMap<String, ReadingPlan>,
    active: String,
}
impl PlanRegistry {
    pub fn new(plan: ReadingPlan) -> Self {
        let active = plan.id.clone();
        Self {
            plans: BTreeMap::from([(active.clone(), plan)]),
            active,
        }
    }

    /// A registry holding the bundled plan, active.
    pub fn load_default() -> Result<Self> {
        let plan = ReferenceData::default_plan()?;
        tracing::debug!(plan = %plan.id, days = plan.scheduled_days(), "Loaded default reading plan");
        Ok(Self::new(plan))
    }

    /// Add (or replace) a plan without activating it.
    pub fn insert(&mut self, plan: ReadingPlan) {
        if let Some(previous) = self.plans.insert(plan.id.clone(), plan) {
            tracing::debug!(plan = %previous.id, "Replaced reading plan");
        }
    }

    pub fn set_active(&mut self, id: &str) -> Result<()> {
        if !self.plans.contains_key(id) {
            exn::bail!(ErrorKind::PlanNotFound(id.to_string()));
        }
        self.active = id.to_string();
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&ReadingPlan> {
        self.plans.get(id)
    }

    pub fn active(&self) -> &ReadingPlan {
        // Construction and `set_active` guarantee the key exists.
        &self.plans[&self.active]
    }

    pub fn active_id(&self) -> &str {
        &self.active
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.plans.keys().map(String::as_str)
    }

    /// The active plan's reading for a date; empty when nothing is scheduled.
    pub fn reading_for(&self, date: Date) -> &[ScriptureRange] {
        self.active().reading_for(date).unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BookCode;
    use time::macros::date;

    fn custom() -> ReadingPlan {
        ReadingPlan::new("nt", "New Testament").with_reading(
            1,
            1,
            vec![ScriptureRange::new(BookCode::Matthew, 1, 2).unwrap()],
        )
    }

    #[test]
    fn test_load_default() {
        let registry = PlanRegistry::load_default().unwrap();
        assert_eq!(registry.active_id(), DEFAULT_PLAN_ID);
        assert!(!registry.reading_for(date!(2025 - 01 - 01)).is_empty());
    }

    #[test]
    fn test_switch_active_plan() {
        let mut registry = PlanRegistry::load_default().unwrap();
        registry.insert(custom());
        assert_eq!(registry.active_id(), DEFAULT_PLAN_ID);
        registry.set_active("nt").unwrap();
        assert_eq!(registry.reading_for(date!(2025 - 01 - 01))[0].book(), BookCode::Matthew);
        assert!(registry.reading_for(date!(2025 - 01 - 02)).is_empty());
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec![DEFAULT_PLAN_ID, "nt"]);
    }

    #[test]
    fn test_switch_to_unknown_plan() {
        let mut registry = PlanRegistry::new(custom());
        let err = registry.set_active("missing").unwrap_err();
        assert_eq!(*err, ErrorKind::PlanNotFound("missing".to_string()));
        assert_eq!(registry.active_id(), "nt");
    }
}
