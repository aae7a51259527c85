pub mod config;
pub mod error;
pub mod fs;
pub mod text;

pub use config::Config;
pub use error::CoreError;
pub use fs::{load_json, save_json};
pub use text::truncate_chars;
