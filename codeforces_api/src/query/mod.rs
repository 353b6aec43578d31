mod standings;
pub use self::standings::StandingsQuery;

mod user_status;
pub use self::user_status::UserStatusQuery;
