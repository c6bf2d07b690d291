//! Figma image rendering API client.
//!
//! Resolves Figma share URLs to `{file key, node id}` pairs, asks the images
//! API for a rendered PNG, and downloads the bytes to the build directory.
//! Rendering happens one frame at a time; the first failure aborts the run.

use std::{collections::HashMap, path::Path, time::Duration};

use anyhow::{Context, Result};
use colored::Colorize;
use regex::Regex;
use serde::Deserialize;

use crate::{
    config::Config,
    schema::{self, ObjectSchema},
};

/// Figma images API endpoint root.
const FIGMA_API_BASE: &str = "https://api.figma.com";

/// Render scale factor; 2x gives crisp images on the wiki pages.
const RENDER_SCALE: u32 = 2;

#[derive(Debug, Deserialize)]
struct ImagesResponse {
    /// Map from colon-delimited node id to a short-lived image URL. Figma
    /// reports nodes it could not render as null.
    images: HashMap<String, Option<String>>,
}

/// Client for the Figma images API.
pub struct FigmaClient {
    http: reqwest::blocking::Client,
    token: String,
    placeholder: String,
}

impl FigmaClient {
    /// Creates a client from the loaded configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be constructed.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            http,
            token: config.figma_api_token.clone(),
            placeholder: config.missing_figma_page_placeholder.clone(),
        })
    }

    /// Renders every supported frame of an object schema into `build_dir`.
    ///
    /// Links that are null in the schema are rendered from the configured
    /// placeholder frame instead. Returns the produced filenames in
    /// rendering order.
    ///
    /// # Errors
    ///
    /// Returns an error on the first failed extraction, API call, or file
    /// write.
    pub fn render_object(&self, object: &ObjectSchema, build_dir: &Path) -> Result<Vec<String>> {
        std::fs::create_dir_all(build_dir)
            .with_context(|| format!("Failed to create build directory {}", build_dir.display()))?;

        let links = object.links();
        let mut rendered_files = Vec::with_capacity(links.len());

        for (counter, (path, link)) in links.iter().enumerate() {
            println!();
            println!(
                "{}",
                format!(
                    "Processing Figma path: {path} ({} of {})",
                    counter + 1,
                    links.len()
                )
                .blue()
            );

            let url = match link {
                Some(url) => *url,
                None => {
                    debug!("link for {path} is null, using placeholder frame");
                    self.placeholder.as_str()
                }
            };

            let filename = schema::rendered_filename(&object.name, path);
            println!("Rendering {url} to {filename}");
            self.render_png(url, &build_dir.join(&filename))?;
            rendered_files.push(filename);
        }

        Ok(rendered_files)
    }

    /// Renders a single Figma frame to a local PNG file.
    ///
    /// # Errors
    ///
    /// Returns an error if the URL does not carry a file key and node id, if
    /// the API rejects the request (403 gets an enriched diagnostic), or if
    /// the image download or file write fails.
    pub fn render_png(&self, figma_url: &str, out_path: &Path) -> Result<()> {
        let file_key = file_key_from_url(figma_url)?;
        println!("File key: {file_key}");

        let node_id = node_id_from_url(figma_url)?;
        println!("Node ID: {node_id}");

        let api_url = format!(
            "{FIGMA_API_BASE}/v1/images/{file_key}?ids={node_id}&format=png&scale={RENDER_SCALE}"
        );
        let resp = self
            .http
            .get(&api_url)
            .header("X-Figma-Token", &self.token)
            .send()
            .with_context(|| format!("Figma render request failed: {api_url}"))?;

        if resp.status() == reqwest::StatusCode::FORBIDDEN {
            let body = resp.text().unwrap_or_default();
            bail!(
                "Figma API returned 403 Forbidden. This usually means your token is EXPIRED, \
                 incorrect, or does not have access to the file.\n\
                 Request URL: {api_url}\n\
                 File key and node id may be incorrect, or the Figma file may not be \
                 public/readable.\n\
                 Response: {body}"
            );
        }
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("Figma API error ({status}) for {api_url}: {body}");
        }

        let result: ImagesResponse = resp
            .json()
            .with_context(|| format!("Failed to parse Figma response for {api_url}"))?;

        // The response keys use colons where the URL uses hyphens.
        let image_key = node_id.replace('-', ":");
        let image_url = result
            .images
            .get(&image_key)
            .and_then(|url| url.as_deref())
            .with_context(|| {
                format!("Figma returned no image for node {node_id} in file {file_key}")
            })?;
        println!("Image URL: {image_url}");

        let img_resp = self
            .http
            .get(image_url)
            .send()
            .with_context(|| format!("Failed to download rendered image from {image_url}"))?;
        if !img_resp.status().is_success() {
            bail!(
                "Image download failed ({}) from {image_url}",
                img_resp.status()
            );
        }

        let bytes = img_resp.bytes().context("Failed to read image bytes")?;
        std::fs::write(out_path, &bytes)
            .with_context(|| format!("Failed to write image to {}", out_path.display()))?;

        println!("Rendered image saved as {}", out_path.display());
        Ok(())
    }
}

/// Extracts the file key from a Figma share URL.
///
/// Supports the `file`, `proto`, and `design` URL variants.
///
/// # Errors
///
/// Returns an error if the URL does not match any known variant.
pub fn file_key_from_url(figma_url: &str) -> Result<String> {
    let re = Regex::new(r"figma\.com/(file|proto|design)/([a-zA-Z0-9]+)")?;
    let captures = re
        .captures(figma_url)
        .with_context(|| format!("Could not extract Figma file key from URL: {figma_url}"))?;
    Ok(captures[2].to_string())
}

/// Extracts the frame node id from a Figma share URL's query string.
///
/// Colons in the raw id are percent-encoded so the id can be passed back in
/// a query parameter.
///
/// # Errors
///
/// Returns an error if the URL has no `node-id` parameter.
pub fn node_id_from_url(figma_url: &str) -> Result<String> {
    let re = Regex::new(r"node-id=([\d:-]+)")?;
    let captures = re
        .captures(figma_url)
        .with_context(|| format!("Could not extract node-id from URL: {figma_url}"))?;
    Ok(captures[1].replace(':', "%3A"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_key_from_design_url() {
        let url = "https://www.figma.com/design/rHxTpbi2gpbZ4dmVlyeY2S/Object-Diagrams?node-id=14494-411";
        assert_eq!(file_key_from_url(url).unwrap(), "rHxTpbi2gpbZ4dmVlyeY2S");
    }

    #[test]
    fn test_file_key_from_file_and_proto_urls() {
        assert_eq!(
            file_key_from_url("https://www.figma.com/file/AbC123/Something?node-id=1-2").unwrap(),
            "AbC123"
        );
        assert_eq!(
            file_key_from_url("https://www.figma.com/proto/XyZ789/Something?node-id=1-2").unwrap(),
            "XyZ789"
        );
    }

    #[test]
    fn test_file_key_rejects_unknown_shape() {
        assert!(file_key_from_url("https://www.figma.com/community/plugin/123").is_err());
        assert!(file_key_from_url("https://example.com/file/AbC123").is_err());
    }

    #[test]
    fn test_node_id_hyphen_form() {
        let url = "https://www.figma.com/design/AbC123/Objects?node-id=14494-411&t=tail";
        assert_eq!(node_id_from_url(url).unwrap(), "14494-411");
    }

    #[test]
    fn test_node_id_colon_form_is_percent_encoded() {
        let url = "https://www.figma.com/design/AbC123/Objects?node-id=14494:411";
        assert_eq!(node_id_from_url(url).unwrap(), "14494%3A411");
    }

    #[test]
    fn test_node_id_missing_is_error() {
        assert!(node_id_from_url("https://www.figma.com/design/AbC123/Objects").is_err());
    }
}
