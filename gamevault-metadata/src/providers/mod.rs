//! Built-in metadata providers.

pub mod yaml;

pub use yaml::YamlProvider;
