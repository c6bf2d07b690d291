//! # objects-inventory
//!
//! A publishing tool for the objects documentation catalog.
//!
//! `objects-inventory` reads JSON schema files describing documented objects,
//! renders PNG images of their Figma frames through the Figma REST API, and
//! publishes the images plus a generated HTML page to Confluence.
//!
//! ## Workflow
//!
//! For every schema file under `schemas/`:
//!
//! 1. Render all 16 Figma frames to PNG files in the build directory
//! 2. Download the current Confluence page for auditing
//! 3. Upload each PNG as a page attachment (replacing same-named ones)
//! 4. Compose the new page body from the HTML templates
//! 5. Publish the composed body as a new page version
//!
//! Processing is strictly sequential. There is no retry policy and no
//! per-file isolation: the first error aborts the whole run.
//!
//! ## Modules
//!
//! - [`config`] - Credentials file loading and fixed service constants
//! - [`schema`] - Typed object schemas and the supported key paths
//! - [`figma`] - Figma image rendering API client
//! - [`confluence`] - Confluence content and attachment API client
//! - [`template`] - HTML fragment loading and placeholder substitution
//! - [`compose`] - Page body composition from the template fragments
//! - [`inventory`] - The per-schema publishing pipeline

#[macro_use]
extern crate log;
#[macro_use]
extern crate anyhow;

/// Credentials file loading and fixed service constants.
pub mod config;

/// Typed object schemas and the supported key paths.
///
/// Schemas are validated at parse time: every supported dot path must
/// traverse successfully before any rendering starts.
pub mod schema;

/// Figma image rendering API client.
pub mod figma;

/// Confluence content and attachment API client.
pub mod confluence;

/// HTML fragment loading and placeholder substitution.
pub mod template;

/// Page body composition from the template fragments.
pub mod compose;

/// The per-schema publishing pipeline.
pub mod inventory;
