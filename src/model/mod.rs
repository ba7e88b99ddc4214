pub mod item;
pub mod container;
pub mod collection;
pub mod config;

pub use item::*;
pub use container::*;
pub use collection::*;
pub use config::*;
