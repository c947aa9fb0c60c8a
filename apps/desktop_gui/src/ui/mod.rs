//! UI layer for the desktop app: app shell, views, and theme plumbing.

pub mod app;

pub use app::{NeuraScanApp, PersistedSettings, SETTINGS_STORAGE_KEY};
