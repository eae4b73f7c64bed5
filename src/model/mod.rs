pub mod task;
pub mod list;
pub mod filter;
pub mod config;

pub use task::*;
pub use list::*;
pub use filter::*;
pub use config::*;
