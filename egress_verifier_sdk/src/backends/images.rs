//! Region to machine-image lookup for the aws backend
//!
//! Loaded from a TOML file at startup instead of being compiled in:
//!
//! ```toml
//! [aws]
//! us-east-1 = "ami-..."
//! eu-west-1 = "ami-..."
//! ```

use serde::Deserialize;
use std::collections::BTreeMap;
use std::path::Path;

#[derive(Debug, thiserror::Error)]
pub enum ImageCatalogError {
    #[error("Failed to read image catalog {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid image catalog: {0}")]
    Parse(#[from] toml::de::Error),
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ImageCatalog {
    #[serde(default)]
    aws: BTreeMap<String, String>,
}

impl ImageCatalog {
    pub fn from_toml_str(raw: &str) -> Result<Self, ImageCatalogError> {
        Ok(toml::from_str(raw)?)
    }

    pub fn from_file(path: &Path) -> Result<Self, ImageCatalogError> {
        let raw = std::fs::read_to_string(path).map_err(|source| ImageCatalogError::Io {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&raw)
    }

    pub fn aws_image(&self, region: &str) -> Option<&str> {
        self.aws.get(region).map(String::as_str)
    }

    pub fn aws_regions(&self) -> impl Iterator<Item = &str> {
        self.aws.keys().map(String::as_str)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup() {
        let catalog =
            ImageCatalog::from_toml_str("[aws]\nus-east-1 = \"ami-1\"\neu-west-1 = \"ami-2\"\n")
                .unwrap();
        assert_eq!(catalog.aws_image("eu-west-1"), Some("ami-2"));
        assert_eq!(catalog.aws_image("ap-south-1"), None);
        assert_eq!(catalog.aws_regions().collect::<Vec<_>>(), vec!["eu-west-1", "us-east-1"]);
    }

    #[test]
    fn test_invalid_catalog() {
        assert!(ImageCatalog::from_toml_str("[aws]\nus-east-1 = 3\n").is_err());
    }
}
