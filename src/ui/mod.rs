pub mod app;
pub mod components;
pub mod palette;
pub mod toasts;
pub mod views;
pub mod windows;

pub use app::DeviscopeApp;
pub use toasts::ToastManager;
