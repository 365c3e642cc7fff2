pub mod config;
pub mod error;
pub mod history;
pub mod render;
pub mod sampler;
pub mod sensor;
pub mod state;
pub mod stats;
pub mod tank;
pub mod task;
