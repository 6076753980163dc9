pub mod email;
pub mod extract;
pub mod password;
