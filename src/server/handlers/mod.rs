pub mod config;
pub mod documents;
pub mod flags;
pub mod health;
pub mod jobs;
pub mod search;
