pub mod bench;
pub mod config;
pub mod lock;
pub mod sink;
pub mod strategy;

pub use bench::{measure, run, warm_up, Measurement};
pub use config::Config;
pub use sink::Sink;
pub use strategy::{Runner, Strategy};
