pub mod loader;
pub mod types;

pub use loader::{ConfigError, load_default_settings, load_settings, load_settings_from_str};
pub use types::ManagerSettings;
