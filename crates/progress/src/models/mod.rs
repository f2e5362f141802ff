mod month;
mod stats;
mod user;

pub use self::month::{MonthRecord, ProgressField, normalize_day};
pub use self::stats::PlanStats;
pub use self::user::{Credential, Provider, UserProfile};
