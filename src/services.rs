pub mod auth;
pub mod friendships;
pub mod notes;
pub mod permissions;
pub mod tokens;
pub mod users;
