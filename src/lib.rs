pub mod config;
pub mod content;
pub mod db;
pub mod error;
pub mod events;
pub mod models;
pub mod scheduler;
pub mod search;
pub mod sync;

#[cfg(test)]
mod testing;

pub use error::{Result, SearchError};
