pub mod config;
pub mod error;
pub mod feed;
pub mod indicator;
pub mod model;
pub mod monitor;
pub mod price_store;
pub mod protocol;
pub mod strategy;
