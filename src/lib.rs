pub mod client;
pub mod config;
pub mod db;
pub mod error;
pub mod middleware;
pub mod models;
pub mod player;
pub mod routes;
pub mod state;
pub mod storage;
