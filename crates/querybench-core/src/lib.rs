pub mod classify;
pub mod compare;
pub mod config;
pub mod engine;
pub mod errors;
pub mod model;
pub mod providers;
pub mod queries;
pub mod report;
pub mod stats;
pub mod summary;
