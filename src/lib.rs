pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod handlers;
pub mod ledger;
pub mod services;
pub mod state;
pub mod utils;

pub type Error = Box<dyn std::error::Error + Send + Sync>;
