pub mod client;
pub mod identity;
pub mod posts;
pub mod users;

mod record;
