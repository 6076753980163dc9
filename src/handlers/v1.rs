pub mod auth;
pub mod friends;
pub mod notes;
pub mod users;
