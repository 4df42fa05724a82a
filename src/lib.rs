pub mod analysis;
pub mod assistant;
pub mod cli;
pub mod collection;
pub mod config;
pub mod daily;
pub mod database;
pub mod intake;
pub mod models;
pub mod session;
pub mod timeline;
pub mod utils;

pub use config::Config;
pub use database::{Database, KeyValueStore, MemoryStore};
pub use models::{DailyAnalysis, Priority, Task, TaskDraft, TaskEdit, TaskStatus};
pub use session::Session;
pub use utils::Profile;
