//! Utility modules - codes, distance, logging

pub mod codes;
pub mod geo;
pub mod logger;

pub use codes::{generate_otp, generate_tracking_number, verify_otp};
pub use geo::haversine_km;
pub use logger::{init_logger, init_logger_with_file};
