mod client;
mod errors;
mod query;
mod signature;
pub mod types;
pub mod user_agent;
pub use self::client::{Auth, Client};
pub use self::errors::Error;
pub use self::query::{StandingsQuery, UserStatusQuery};
pub use self::signature::{build_sorted_query, sign_params, Credentials};
