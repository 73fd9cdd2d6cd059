pub mod lead;
pub mod task;
pub mod board;
pub mod config;

pub use lead::*;
pub use task::*;
pub use board::*;
pub use config::*;
