// Air quality telemetry - adaptive downsampling of multi-sensor readings
pub mod application;
pub mod domain;
pub mod infrastructure;
pub mod presentation;
