//! Typed object schemas and the supported key paths.
//!
//! Each schema file under `schemas/` describes one documented object: its
//! name, its Confluence page, and the Figma links for every view and role.
//! Parsing validates all supported dot paths up front, so a schema that
//! reaches the renderer is guaranteed to resolve every path. A link that is
//! present but `null` is recorded as [`None`]; the renderer substitutes the
//! configured placeholder frame for those.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::Context;
use serde_json::Value;
use thiserror::Error;

/// The fixed list of dot paths every object schema must resolve.
///
/// Order matters: images are rendered and uploaded in this order.
pub const SUPPORTED_SCHEMA_PATHS: [&str; 16] = [
    "desktop.grid-view.vendor",
    "desktop.grid-view.operations",
    "desktop.grid-view.client",
    "desktop.details-view.vendor",
    "desktop.details-view.operations",
    "desktop.details-view.client",
    "desktop.infocard-view.vendor",
    "desktop.infocard-view.operations",
    "desktop.infocard-view.client",
    "state-diagram",
    "mobile.list-view.vendor",
    "mobile.list-view.operations",
    "mobile.list-view.client",
    "mobile.details-view.vendor",
    "mobile.details-view.operations",
    "mobile.details-view.client",
];

/// Errors raised while parsing an object schema file.
#[derive(Debug, Error)]
pub enum SchemaError {
    /// The schema root is not a JSON object.
    #[error("Object schema root must be a JSON object")]
    NotAnObject,
    /// A required top-level key is missing or not a string.
    #[error("Missing or invalid required key: {0}")]
    MissingKey(&'static str),
    /// A supported dot path hit a missing key during traversal.
    #[error("Reference not found for path: {path}")]
    ReferenceNotFound {
        /// The full dotted path that failed to resolve.
        path: String,
    },
    /// A supported dot path resolved to something other than a string or null.
    #[error("Value at path {path} must be a string or null")]
    InvalidLink {
        /// The full dotted path with the bad value.
        path: String,
    },
    /// The `confluence-page` URL has no `/pages/{id}` segment.
    #[error("No page id found after /pages/ in URL: {0}")]
    PageIdNotFound(String),
}

/// Figma links for the three roles of one view.
#[derive(Debug, Clone)]
pub struct RoleLinks {
    /// Vendor-role frame link, if set.
    pub vendor: Option<String>,
    /// Operations-role frame link, if set.
    pub operations: Option<String>,
    /// Client-role frame link, if set.
    pub client: Option<String>,
}

/// Desktop views of a documented object.
#[derive(Debug, Clone)]
pub struct DesktopViews {
    pub grid_view: RoleLinks,
    pub details_view: RoleLinks,
    pub infocard_view: RoleLinks,
}

/// Mobile views of a documented object.
#[derive(Debug, Clone)]
pub struct MobileViews {
    pub list_view: RoleLinks,
    pub details_view: RoleLinks,
}

/// One parsed and validated object schema.
#[derive(Debug, Clone)]
pub struct ObjectSchema {
    /// Object name, used in output filenames.
    pub name: String,
    /// Full URL of the Confluence page this object is published to.
    pub confluence_page: String,
    /// State-diagram frame link, if set.
    pub state_diagram: Option<String>,
    /// Desktop view links.
    pub desktop: DesktopViews,
    /// Mobile view links.
    pub mobile: MobileViews,
}

impl ObjectSchema {
    /// Loads and validates a schema from a JSON file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, is not valid JSON, or
    /// fails path validation.
    pub fn from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read schema file {}", path.display()))?;
        let value: Value = serde_json::from_str(&content)
            .with_context(|| format!("Failed to parse schema file {}", path.display()))?;
        let schema = Self::from_value(&value)
            .with_context(|| format!("Invalid object schema {}", path.display()))?;
        Ok(schema)
    }

    /// Builds a schema from a parsed JSON value, validating every supported
    /// dot path.
    ///
    /// # Errors
    ///
    /// Returns [`SchemaError::ReferenceNotFound`] naming the first dotted
    /// path whose traversal hits a missing key, or other [`SchemaError`]
    /// variants for structural problems.
    pub fn from_value(value: &Value) -> Result<Self, SchemaError> {
        let root = value.as_object().ok_or(SchemaError::NotAnObject)?;

        let name = match root.get("name") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(SchemaError::MissingKey("name")),
        };
        let confluence_page = match root.get("confluence-page") {
            Some(Value::String(s)) => s.clone(),
            _ => return Err(SchemaError::MissingKey("confluence-page")),
        };

        // Validate every supported path in canonical order first, so the
        // error always names the first failing path of the fixed list.
        for path in SUPPORTED_SCHEMA_PATHS {
            resolve_path(value, path)?;
        }

        let link = |path: &str| -> Result<Option<String>, SchemaError> {
            Ok(resolve_path(value, path)?.map(ToOwned::to_owned))
        };
        let roles = |view: &str| -> Result<RoleLinks, SchemaError> {
            Ok(RoleLinks {
                vendor: link(&format!("{view}.vendor"))?,
                operations: link(&format!("{view}.operations"))?,
                client: link(&format!("{view}.client"))?,
            })
        };

        Ok(Self {
            name,
            confluence_page,
            state_diagram: link("state-diagram")?,
            desktop: DesktopViews {
                grid_view: roles("desktop.grid-view")?,
                details_view: roles("desktop.details-view")?,
                infocard_view: roles("desktop.infocard-view")?,
            },
            mobile: MobileViews {
                list_view: roles("mobile.list-view")?,
                details_view: roles("mobile.details-view")?,
            },
        })
    }

    /// Gets all supported links in rendering order, paired with their paths.
    ///
    /// The order and the paths are exactly [`SUPPORTED_SCHEMA_PATHS`].
    pub fn links(&self) -> [(&'static str, Option<&str>); 16] {
        let d = &self.desktop;
        let m = &self.mobile;
        [
            ("desktop.grid-view.vendor", d.grid_view.vendor.as_deref()),
            ("desktop.grid-view.operations", d.grid_view.operations.as_deref()),
            ("desktop.grid-view.client", d.grid_view.client.as_deref()),
            ("desktop.details-view.vendor", d.details_view.vendor.as_deref()),
            ("desktop.details-view.operations", d.details_view.operations.as_deref()),
            ("desktop.details-view.client", d.details_view.client.as_deref()),
            ("desktop.infocard-view.vendor", d.infocard_view.vendor.as_deref()),
            ("desktop.infocard-view.operations", d.infocard_view.operations.as_deref()),
            ("desktop.infocard-view.client", d.infocard_view.client.as_deref()),
            ("state-diagram", self.state_diagram.as_deref()),
            ("mobile.list-view.vendor", m.list_view.vendor.as_deref()),
            ("mobile.list-view.operations", m.list_view.operations.as_deref()),
            ("mobile.list-view.client", m.list_view.client.as_deref()),
            ("mobile.details-view.vendor", m.details_view.vendor.as_deref()),
            ("mobile.details-view.operations", m.details_view.operations.as_deref()),
            ("mobile.details-view.client", m.details_view.client.as_deref()),
        ]
    }

    /// Extracts the numeric page id from the `confluence-page` URL.
    ///
    /// The id is the path segment immediately after `/pages/`.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL contains no such segment.
    pub fn page_id(&self) -> Result<&str, SchemaError> {
        let rest = self
            .confluence_page
            .split_once("/pages/")
            .map(|(_, rest)| rest)
            .ok_or_else(|| SchemaError::PageIdNotFound(self.confluence_page.clone()))?;
        let id = rest.split('/').next().unwrap_or_default();
        if id.is_empty() {
            return Err(SchemaError::PageIdNotFound(self.confluence_page.clone()));
        }
        Ok(id)
    }
}

/// Builds the deterministic PNG filename for one object and dot path.
///
/// `("Foo", "desktop.grid-view.vendor")` becomes
/// `Foo-desktop-grid-view-vendor.png`.
pub fn rendered_filename(object_name: &str, path: &str) -> String {
    format!("{object_name}-{}.png", path.replace('.', "-"))
}

/// Enumerates the schema files in a directory, sorted by filename.
///
/// # Errors
///
/// Returns an error if the directory cannot be read.
pub fn find_schema_files(dir: &Path) -> anyhow::Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .with_context(|| format!("Failed to read schemas directory {}", dir.display()))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.extension().is_some_and(|ext| ext == "json"))
        .collect();
    files.sort();
    Ok(files)
}

/// Walks a dot-separated path through nested JSON objects.
///
/// Returns the leaf string, or `None` if the leaf is null. A missing key
/// anywhere along the path (leaf included) is a
/// [`SchemaError::ReferenceNotFound`].
fn resolve_path<'a>(root: &'a Value, path: &str) -> Result<Option<&'a str>, SchemaError> {
    let mut current = root;
    for key in path.split('.') {
        current = current
            .get(key)
            .ok_or_else(|| SchemaError::ReferenceNotFound {
                path: path.to_string(),
            })?;
    }
    match current {
        Value::String(s) => Ok(Some(s)),
        Value::Null => Ok(None),
        _ => Err(SchemaError::InvalidLink {
            path: path.to_string(),
        }),
    }
}
