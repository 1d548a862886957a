pub mod aggregate;
pub mod conditions;
pub mod config;
pub mod criteria;
pub mod error;
pub mod io;
pub mod segment;
pub mod speed_probe;
pub mod study;
pub mod summary;
