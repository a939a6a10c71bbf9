//! Rendering a loaded document back to cloud-config YAML
//!
//! `users` and `write_files` come first, then the other sections in the
//! order they were read. Entry order and `content` bytes are preserved, so
//! loading the rendered text yields an equal document.

use serde_yaml::{Mapping, Value};

use super::ConfigDocument;
use crate::LoadError;

/// Header line cloud-init uses to recognise a cloud-config payload
pub const CLOUD_CONFIG_HEADER: &str = "#cloud-config";

impl ConfigDocument {
    /// Build the YAML value tree for this document
    pub fn to_value(&self) -> Result<Value, LoadError> {
        let mut root = Mapping::new();
        root.insert(Value::from("users"), render(&self.users)?);
        root.insert(Value::from("write_files"), render(&self.write_files)?);
        for section in &self.sections {
            root.insert(Value::from(section.key()), section.to_value()?);
        }
        Ok(Value::Mapping(root))
    }

    /// Render as a `#cloud-config` document
    pub fn to_yaml(&self) -> Result<String, LoadError> {
        let body = serde_yaml::to_string(&self.to_value()?)
            .map_err(|e| LoadError::Render(e.to_string()))?;
        Ok(format!("{CLOUD_CONFIG_HEADER}\n{body}"))
    }

    /// Render as pretty-printed JSON
    pub fn to_json(&self) -> Result<String, LoadError> {
        serde_json::to_string_pretty(&self.to_value()?).map_err(|e| LoadError::Render(e.to_string()))
    }
}

fn render<T: serde::Serialize>(value: &T) -> Result<Value, LoadError> {
    serde_yaml::to_value(value).map_err(|e| LoadError::Render(e.to_string()))
}
