pub mod aggregator;
pub mod broadcaster;
pub mod server;
pub mod simulator;
