pub mod config;
pub mod eta;
pub mod frame;
