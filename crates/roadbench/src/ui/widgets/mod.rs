pub mod histogram;
pub mod log;
pub mod summary;
pub mod throughput;
pub mod workers;
