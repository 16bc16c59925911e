//! Route handlers organized by resource

pub mod categories;
pub mod export;
pub mod goals;
pub mod health;
pub mod sessions;
pub mod stats;
pub mod tasks;
