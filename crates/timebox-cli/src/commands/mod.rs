pub mod category;
pub mod config;
pub mod data;
pub mod goal;
pub mod habit;
pub mod helpers;
pub mod init;
pub mod maintenance;
pub mod prefs;
pub mod report;
pub mod review;
pub mod session;
pub mod task;
