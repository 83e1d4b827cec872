pub mod api;
pub mod batch;
pub mod clients;
pub mod config;
pub mod dispatch;
pub mod models;
