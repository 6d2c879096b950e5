//! Configuration objects, runtime overrides and the factory that ties them
//! to active storage.

pub mod factory;
pub mod object;
pub mod overrides;

pub use factory::{ConfigFactory, OverrideMode};
pub use object::Config;
pub use overrides::{OverrideMap, OverrideProvider};
