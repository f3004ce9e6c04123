// Application layer - Downsampling core and query and ingest use cases
pub mod accumulator;
pub mod downsampler;
pub mod ingest_service;
pub mod median;
pub mod query_resolver;
pub mod readings_repository;
pub mod readings_service;
