//! Confluence content and attachment API client.
//!
//! Wraps the handful of REST calls the publisher needs: reading a page with
//! its storage body and version, replacing same-named attachments, uploading
//! new ones, and publishing a new page version. Every call uses basic auth
//! with the service-account credential and fails the run on the first
//! non-success response.

use std::{path::Path, time::Duration};

use anyhow::{Context, Result};
use reqwest::blocking::multipart;
use serde::Deserialize;
use serde_json::json;

use crate::config::Config;

#[derive(Debug, Deserialize)]
struct PageVersion {
    number: i64,
}

#[derive(Debug, Deserialize)]
struct PageStorage {
    value: String,
}

#[derive(Debug, Deserialize)]
struct PageBody {
    storage: PageStorage,
}

#[derive(Debug, Deserialize)]
struct PageResponse {
    title: String,
    version: PageVersion,
    body: Option<PageBody>,
}

#[derive(Debug, Deserialize)]
struct AttachmentResponse {
    #[serde(default)]
    results: Vec<Attachment>,
}

#[derive(Debug, Deserialize)]
struct Attachment {
    id: String,
}

/// Client for the Confluence content REST API.
pub struct ConfluenceClient {
    http: reqwest::blocking::Client,
    base_url: String,
    username: String,
    token: String,
}

impl ConfluenceClient {
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
            base_url: config.confluence_base_url.clone(),
            username: config.confluence_api_username.clone(),
            token: config.confluence_api_token.clone(),
        })
    }

    fn content_url(&self, page_id: &str) -> String {
        format!("{}/rest/api/content/{page_id}", self.base_url)
    }

    /// Downloads the current page body and saves a pretty-printed copy to
    /// `build_dir/current-confluence-page-{id}.html`.
    ///
    /// The dump is purely for auditing; nothing reads it back. The run still
    /// stops if the download fails.
    ///
    /// # Errors
    ///
    /// Returns an error if the API call fails or the file cannot be written.
    pub fn download_current_page(&self, page_id: &str, build_dir: &Path) -> Result<()> {
        let url = format!(
            "{}?expand=body.storage,version",
            self.content_url(page_id)
        );
        println!("Downloading Confluence page via API: {url}");

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .with_context(|| format!("Confluence page request failed: {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("Confluence API error ({status}) for {url}: {body}");
        }

        let page: PageResponse = resp
            .json()
            .with_context(|| format!("Failed to parse Confluence response for {url}"))?;
        let html = page
            .body
            .context("Confluence response carried no body.storage")?
            .storage
            .value;

        let out_path = build_dir.join(format!("current-confluence-page-{page_id}.html"));
        std::fs::write(&out_path, prettify_html(&html))
            .with_context(|| format!("Failed to write {}", out_path.display()))?;
        println!(
            "Downloaded and saved current Confluence page to {}",
            out_path.display()
        );
        println!();
        Ok(())
    }

    /// Uploads an image as a page attachment, replacing any existing
    /// attachment with the same filename.
    ///
    /// Confluence soft-deletes attachments, so an existing one is deleted in
    /// both its `current` and `trashed` states before the new upload;
    /// otherwise the same-named upload is rejected.
    ///
    /// # Errors
    ///
    /// Returns an error if the existence check, either delete, or the upload
    /// fails.
    pub fn upload_attachment(&self, page_id: &str, image_path: &Path) -> Result<()> {
        let url = format!("{}/child/attachment", self.content_url(page_id));
        println!(
            "Uploading image version to Confluence: {}",
            image_path.display()
        );

        let filename = image_path
            .file_name()
            .with_context(|| format!("No filename in path {}", image_path.display()))?
            .to_string_lossy()
            .to_string();

        if let Some(attachment_id) = self.find_attachment(page_id, &filename)? {
            println!("Deleting existing attachment with id: {attachment_id}");
            self.delete_attachment(&attachment_id, "current")?;
            self.delete_attachment(&attachment_id, "trashed")?;
        }

        let bytes = std::fs::read(image_path)
            .with_context(|| format!("Failed to read image file {}", image_path.display()))?;
        let part = multipart::Part::bytes(bytes)
            .file_name(filename)
            .mime_str("image/png")
            .context("Failed to build multipart file part")?;
        let form = multipart::Form::new()
            .part("file", part)
            .text("minorEdit", "true");

        let resp = self
            .http
            .post(&url)
            .header("Accept", "application/json")
            .header("X-Atlassian-Token", "no-check")
            .basic_auth(&self.username, Some(&self.token))
            .multipart(form)
            .send()
            .with_context(|| format!("Attachment upload request failed: {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("Confluence attachment upload failed ({status}): {body}");
        }

        println!("Successfully uploaded image version to Confluence");
        Ok(())
    }

    /// Finds the id of the first attachment with the given filename, if any.
    fn find_attachment(&self, page_id: &str, filename: &str) -> Result<Option<String>> {
        let url = format!("{}/child/attachment", self.content_url(page_id));
        let resp = self
            .http
            .get(&url)
            .query(&[("filename", filename), ("expand", "version")])
            .header("Accept", "application/json")
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .with_context(|| format!("Attachment lookup request failed: {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("Confluence attachment lookup failed ({status}): {body}");
        }

        let attachments: AttachmentResponse = resp
            .json()
            .context("Failed to parse attachment lookup response")?;
        Ok(attachments.results.into_iter().next().map(|a| a.id))
    }

    /// Deletes an attachment in one lifecycle state (`current` or `trashed`).
    fn delete_attachment(&self, attachment_id: &str, status: &str) -> Result<()> {
        let url = format!("{}?status={status}", self.content_url(attachment_id));
        let resp = self
            .http
            .delete(&url)
            .header("Accept", "application/json")
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .with_context(|| format!("Attachment delete request failed: {url}"))?;
        if !resp.status().is_success() {
            let status_code = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("Confluence attachment delete failed ({status_code}): {body}");
        }
        Ok(())
    }

    /// Publishes new page content as the next version of the page.
    ///
    /// Reads the current title and version first, then submits a full
    /// replace with the version number incremented by one. Confluence rejects
    /// the write if another update happened in between; that rejection
    /// surfaces as a generic API error.
    ///
    /// # Errors
    ///
    /// Returns an error if either the read or the write fails.
    pub fn update_page(&self, page_id: &str, new_content: &str) -> Result<()> {
        let url = self.content_url(page_id);

        let resp = self
            .http
            .get(&url)
            .header("Accept", "application/json")
            .basic_auth(&self.username, Some(&self.token))
            .send()
            .with_context(|| format!("Confluence page request failed: {url}"))?;
        if !resp.status().is_success() {
            let status = resp.status();
            let body = resp.text().unwrap_or_default();
            bail!("Confluence API error ({status}) for {url}: {body}");
        }
        let page: PageResponse = resp
            .json()
            .with_context(|| format!("Failed to parse Confluence response for {url}"))?;

        let payload = page_update_payload(page_id, &page.title, page.version.number, new_content);
        debug!("publishing page {page_id} as version {}", page.version.number + 1);

        let put_resp = self
            .http
            .put(&url)
            .header("Accept", "application/json")
            .basic_auth(&self.username, Some(&self.token))
            .json(&payload)
            .send()
            .with_context(|| format!("Confluence page update request failed: {url}"))?;
        if !put_resp.status().is_success() {
            let status = put_resp.status();
            let body = put_resp.text().unwrap_or_default();
            bail!("Confluence page update failed ({status}): {body}");
        }

        Ok(())
    }
}

/// Builds the full-replace payload for a page update.
fn page_update_payload(
    page_id: &str,
    title: &str,
    current_version: i64,
    new_content: &str,
) -> serde_json::Value {
    json!({
        "id": page_id,
        "type": "page",
        "title": title,
        "body": {
            "storage": {
                "value": new_content,
                "representation": "storage"
            }
        },
        "version": {
            "number": current_version + 1
        }
    })
}

/// Elements that never carry children and take no closing tag.
const VOID_TAGS: [&str; 6] = ["br", "hr", "img", "input", "link", "meta"];

/// Reformats an HTML fragment with one element per line and two-space
/// indentation, for human inspection of the audit dumps.
///
/// This is not a validating parser; malformed markup comes out line-broken
/// but otherwise untouched.
pub fn prettify_html(html: &str) -> String {
    let mut out = String::with_capacity(html.len() + html.len() / 4);
    let mut depth: usize = 0;
    let mut rest = html;

    while !rest.is_empty() {
        if rest.starts_with("<!--") {
            // Comments may contain '>', so they end at '-->' only.
            let end = rest.find("-->").map_or(rest.len(), |i| i + 3);
            push_line(&mut out, depth, rest[..end].trim());
            rest = &rest[end..];
        } else if let Some(stripped) = rest.strip_prefix('<') {
            let Some(end) = stripped.find('>') else {
                push_line(&mut out, depth, rest.trim());
                break;
            };
            let tag = &stripped[..end];

            if tag.starts_with('/') {
                depth = depth.saturating_sub(1);
            }
            push_line(&mut out, depth, &format!("<{tag}>"));
            if !tag.starts_with('/') && !tag.ends_with('/') && !tag.starts_with('!') {
                let name = tag
                    .split([' ', '\t', '\n'])
                    .next()
                    .unwrap_or_default()
                    .to_ascii_lowercase();
                if !VOID_TAGS.contains(&name.as_str()) {
                    depth += 1;
                }
            }
            rest = &stripped[end + 1..];
        } else {
            let text_end = rest.find('<').unwrap_or(rest.len());
            let text = rest[..text_end].trim();
            if !text.is_empty() {
                push_line(&mut out, depth, text);
            }
            rest = &rest[text_end..];
        }
    }

    out
}

fn push_line(out: &mut String, depth: usize, line: &str) {
    for _ in 0..depth {
        out.push_str("  ");
    }
    out.push_str(line);
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_update_payload_bumps_version() {
        let payload = page_update_payload("12345", "Subscription", 7, "<p>body</p>");
        assert_eq!(payload["id"], "12345");
        assert_eq!(payload["type"], "page");
        assert_eq!(payload["title"], "Subscription");
        assert_eq!(payload["version"]["number"], 8);
        assert_eq!(payload["body"]["storage"]["value"], "<p>body</p>");
        assert_eq!(payload["body"]["storage"]["representation"], "storage");
    }

    #[test]
    fn test_prettify_html_indents_nesting() {
        let pretty = prettify_html("<table><tr><td>cell</td></tr></table>");
        assert_eq!(
            pretty,
            "<table>\n  <tr>\n    <td>\n      cell\n    </td>\n  </tr>\n</table>\n"
        );
    }

    #[test]
    fn test_prettify_html_self_closing_and_void_tags() {
        let pretty = prettify_html("<p><ri:attachment ri:filename=\"a.png\" /><br>text</p>");
        assert_eq!(
            pretty,
            "<p>\n  <ri:attachment ri:filename=\"a.png\" />\n  <br>\n  text\n</p>\n"
        );
    }

    #[test]
    fn test_prettify_html_comment_with_gt_stays_whole() {
        let pretty = prettify_html("<p><!-- a > b -->text</p>");
        assert_eq!(pretty, "<p>\n  <!-- a > b -->\n  text\n</p>\n");
    }

    #[test]
    fn test_prettify_html_plain_text_untouched() {
        assert_eq!(prettify_html("just text"), "just text\n");
    }
}
