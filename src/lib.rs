pub mod api;
pub mod auth;
pub mod config;
pub mod db;
pub mod gateway;
pub mod notify;
pub mod qr;
pub mod service;

pub use self::config::Config;
