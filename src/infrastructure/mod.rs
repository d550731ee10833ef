//! Infrastructure layer - Storage adapters, the cache coordinator and ambient services

pub mod logging;
pub mod observability;
pub mod services;
pub mod storage;
