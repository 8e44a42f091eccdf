pub mod client;
pub mod engine;
pub mod indicators;
pub mod insurance;
pub mod monitoring;
pub mod storage;
pub mod strategy;
pub mod types;
pub mod utils;

pub use crate::types::*;
