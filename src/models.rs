pub mod friends;
pub mod notes;
pub mod pagination;
pub mod tokens;
pub mod users;
