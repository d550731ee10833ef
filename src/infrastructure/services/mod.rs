//! Infrastructure services

mod cache_repository;
mod in_flight;

pub use cache_repository::CacheRepository;
pub use in_flight::InFlightLoads;
