//! Format-specific parsers and serializers

pub mod json;
pub mod toml;
pub mod yaml;
