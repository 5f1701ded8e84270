//! Redis backend

mod backend;
mod config;

pub use backend::RedisBackend;
pub use config::RedisConfig;
