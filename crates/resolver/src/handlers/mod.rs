pub mod discussion;
pub mod special;
pub mod user;
