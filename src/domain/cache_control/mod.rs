//! Cache-control domain - Freshness policies and the decisions they make

mod age;
mod mode;
mod policy;

pub use age::{CacheControlAge, ETERNAL_MAX_AGE};
pub use mode::{CacheAction, CacheMode};
pub use policy::{CacheControl, CacheControlProps};
