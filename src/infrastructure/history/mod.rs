//! History store implementations

mod in_memory;
mod redis;

pub use in_memory::InMemoryHistoryStore;
pub use self::redis::{RedisHistoryConfig, RedisHistoryStore};
