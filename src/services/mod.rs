pub mod auth;
pub mod forms;
pub mod listing;
pub mod policy;
