pub mod config;
pub mod molecules;
