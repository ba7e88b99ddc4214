pub mod board_io;
pub mod config_io;
pub mod file_remote;
pub mod lock;
