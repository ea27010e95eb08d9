pub mod config;
pub mod logging;
pub mod progress;
pub mod types;
pub mod utils;

pub use config::Config;
pub use logging::*;
pub use progress::{create_count_progress_bar, create_spinner};
pub use types::*;
pub use utils::*;
