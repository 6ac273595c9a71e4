pub mod about;
pub mod settings;

pub use about::render_about_window;
pub use settings::{SettingsResult, SettingsWindow};
