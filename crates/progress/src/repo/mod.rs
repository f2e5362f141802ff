mod month;
mod user;

pub use self::month::MonthRepository;
pub use self::user::UserRepository;
