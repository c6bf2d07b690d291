//! Credentials file loading and fixed service constants.
//!
//! Configuration is read once at startup from a JSON file in the user's home
//! directory and passed by reference to every collaborator. The file carries
//! only the two API tokens:
//!
//! ```json
//! {
//!     "FIGMA_API_TOKEN": "{token goes here}",
//!     "CONFLUENCE_API_TOKEN": "{token goes here}"
//! }
//! ```
//!
//! Everything else (service-account username, Confluence base URL, the
//! placeholder Figma link for missing frames) is fixed for the service.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use serde::Deserialize;

/// Default config file name in the user's home directory.
pub const CONFIG_FILE_NAME: &str = ".objects-inventory-config.json";

/// Service account used for Confluence basic auth.
const CONFLUENCE_API_USERNAME: &str = "service-user.mpt@softwareone.com";

/// Confluence site base URL (REST endpoints live under `/rest/api`).
const CONFLUENCE_BASE_URL: &str = "https://softwareone.atlassian.net/wiki";

/// Figma frame rendered in place of schema links that are present but null.
const MISSING_FIGMA_PAGE_PLACEHOLDER: &str =
    "https://www.figma.com/design/rHxTpbi2gpbZ4dmVlyeY2S/Object-Diagrams?node-id=14494-411&t=9t14B4asXC7wJTrH-0";

#[derive(Debug, Deserialize)]
struct ConfigFile {
    #[serde(rename = "FIGMA_API_TOKEN")]
    figma_api_token: String,
    #[serde(rename = "CONFLUENCE_API_TOKEN")]
    confluence_api_token: String,
}

/// Process-wide configuration, immutable after load.
#[derive(Debug, Clone)]
pub struct Config {
    /// Token for the Figma images API (`X-Figma-Token` header).
    pub figma_api_token: String,
    /// Token half of the Confluence basic-auth credential.
    pub confluence_api_token: String,
    /// Username half of the Confluence basic-auth credential.
    pub confluence_api_username: String,
    /// Confluence site base URL.
    pub confluence_base_url: String,
    /// Substituted for schema links that are present but null.
    pub missing_figma_page_placeholder: String,
}

impl Config {
    /// Loads configuration from the default location in the home directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined or the
    /// file cannot be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::default_config_path()?)
    }

    /// Loads configuration from a specific file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or is not valid JSON with
    /// the expected keys.
    pub fn load_from(path: &Path) -> Result<Self> {
        println!("loading configuration from: {}...", path.display());

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let file: ConfigFile = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;

        Ok(Self {
            figma_api_token: file.figma_api_token,
            confluence_api_token: file.confluence_api_token,
            confluence_api_username: CONFLUENCE_API_USERNAME.to_string(),
            confluence_base_url: CONFLUENCE_BASE_URL.to_string(),
            missing_figma_page_placeholder: MISSING_FIGMA_PAGE_PLACEHOLDER.to_string(),
        })
    }

    /// Gets the default config file path (`~/.objects-inventory-config.json`).
    ///
    /// # Errors
    ///
    /// Returns an error if the home directory cannot be determined.
    pub fn default_config_path() -> Result<PathBuf> {
        let home = dirs::home_dir().context("Could not determine home directory")?;
        Ok(home.join(CONFIG_FILE_NAME))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"FIGMA_API_TOKEN": "figd_abc", "CONFLUENCE_API_TOKEN": "atl_xyz"}}"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.figma_api_token, "figd_abc");
        assert_eq!(config.confluence_api_token, "atl_xyz");
        assert_eq!(config.confluence_api_username, CONFLUENCE_API_USERNAME);
        assert!(config.confluence_base_url.ends_with("/wiki"));
        assert!(config.missing_figma_page_placeholder.contains("figma.com"));
    }

    #[test]
    fn test_missing_token_key_fails() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"FIGMA_API_TOKEN": "figd_abc"}}"#).unwrap();

        assert!(Config::load_from(file.path()).is_err());
    }
}
