// Domain layer - Sensor readings and identities
pub mod device;
pub mod readings;
pub mod sensor;
