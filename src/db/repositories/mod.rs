pub mod embedding;
pub mod pin;
pub mod user;
