pub mod codec;
pub mod config_io;
pub mod lock;
pub mod recovery;
pub mod signal;
pub mod storage;
pub mod watcher;
pub mod workspace;
