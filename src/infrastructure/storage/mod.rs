//! Storage infrastructure - Cache and origin tier implementations

mod factory;
mod in_memory;
mod moka_store;
mod postgres;
mod redis_store;

pub use factory::{CacheTier, StoreConfig, StoreFactory, StoreType};
pub use in_memory::InMemoryStore;
pub use moka_store::{MokaStore, MokaStoreConfig};
pub use postgres::{PostgresConfig, PostgresStore};
pub use redis_store::{RedisStore, RedisStoreConfig};
