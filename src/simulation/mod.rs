pub mod config;
pub mod controller;
pub mod geometry;
pub mod io;
pub mod logging;
pub mod map;
pub mod random;
pub mod telemetry;
pub mod vehicles;
