#![forbid(unsafe_code)]

pub mod model;
pub mod scoring;
pub mod time;
pub mod trend;

pub use time::Clock;
