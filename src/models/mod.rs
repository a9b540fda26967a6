pub mod config;
pub mod pinpoint;
pub mod sound;
