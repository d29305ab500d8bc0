pub mod cache;
pub mod settings;
