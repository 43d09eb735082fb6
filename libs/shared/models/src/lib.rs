pub mod auth;
pub mod directory;
pub mod error;
pub mod queue;
pub mod response;
pub mod schedule;
