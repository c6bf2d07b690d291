//! The per-schema publishing pipeline.
//!
//! Ties the collaborators together: for every schema file, render the Figma
//! frames, download the current page for auditing, upload the attachments,
//! compose the new body, and publish it. Schema files are processed strictly
//! one after another; the first error ends the run and later files are never
//! touched.

use std::path::{Path, PathBuf};

use anyhow::Result;
use colored::Colorize;

use crate::{
    compose,
    config::Config,
    confluence::ConfluenceClient,
    figma::FigmaClient,
    schema::{self, ObjectSchema},
};

/// The publishing pipeline with its clients and directories.
pub struct Publisher {
    figma: FigmaClient,
    confluence: ConfluenceClient,
    schemas_dir: PathBuf,
    templates_dir: PathBuf,
    build_dir: PathBuf,
}

impl Publisher {
    /// Creates a publisher from the loaded configuration and directories.
    ///
    /// # Errors
    ///
    /// Returns an error if either API client cannot be constructed.
    pub fn new(
        config: &Config,
        schemas_dir: PathBuf,
        templates_dir: PathBuf,
        build_dir: PathBuf,
    ) -> Result<Self> {
        Ok(Self {
            figma: FigmaClient::new(config)?,
            confluence: ConfluenceClient::new(config)?,
            schemas_dir,
            templates_dir,
            build_dir,
        })
    }

    /// Processes every schema file in the schemas directory.
    ///
    /// # Errors
    ///
    /// Returns the first error from any schema; remaining files are skipped.
    pub fn run(&self) -> Result<()> {
        let schema_files = schema::find_schema_files(&self.schemas_dir)?;

        println!("Found {} schema files", schema_files.len());
        for (index, file) in schema_files.iter().enumerate() {
            println!(" {}: {}", index + 1, file.display());
        }

        for (counter, schema_file) in schema_files.iter().enumerate() {
            println!();
            println!(
                "{}",
                format!(
                    "Processing {} ({} of {})...",
                    schema_file.display(),
                    counter + 1,
                    schema_files.len()
                )
                .bold()
            );

            self.publish_object(schema_file)?;
        }

        Ok(())
    }

    /// Runs the full pipeline for one schema file.
    ///
    /// # Errors
    ///
    /// Returns an error from any stage; later stages are not attempted.
    pub fn publish_object(&self, schema_file: &Path) -> Result<()> {
        let object = ObjectSchema::from_file(schema_file)?;
        let page_id = object.page_id()?.to_string();
        info!("publishing object {} to page {page_id}", object.name);

        println!();
        println!("Rendering Figma images for {}...", schema_file.display());
        let rendered_files = self.figma.render_object(&object, &self.build_dir)?;

        println!();
        println!(
            "Downloading current Confluence page for {}...",
            schema_file.display()
        );
        self.confluence
            .download_current_page(&page_id, &self.build_dir)?;

        println!();
        println!(
            "Uploading {} images to Confluence page: {page_id}...",
            rendered_files.len()
        );
        for (counter, rendered_file) in rendered_files.iter().enumerate() {
            println!();
            println!(
                "Uploading image {} of {}...",
                counter + 1,
                rendered_files.len()
            );
            self.confluence
                .upload_attachment(&page_id, &self.build_dir.join(rendered_file))?;
        }

        let page = compose::compose_page(&object, &self.templates_dir, &self.build_dir, &page_id)?;

        println!();
        println!("Updating Confluence page: {page_id}...");
        self.confluence.update_page(&page_id, &page)?;

        println!(
            "{}",
            format!("Successfully updated Confluence page: {page_id}").green()
        );
        println!();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    fn test_config() -> Config {
        Config {
            figma_api_token: "figd_test".into(),
            confluence_api_token: "atl_test".into(),
            confluence_api_username: "svc@example.com".into(),
            confluence_base_url: "https://example.atlassian.net/wiki".into(),
            missing_figma_page_placeholder:
                "https://www.figma.com/design/AbC123/Objects?node-id=1-1".into(),
        }
    }

    #[test]
    fn test_malformed_schema_stops_before_any_network_call() {
        let schemas = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        std::fs::write(
            schemas.path().join("broken.json"),
            r#"{"name": "Broken", "confluence-page": "https://x/pages/1/Broken"}"#,
        )
        .unwrap();

        let publisher = Publisher::new(
            &test_config(),
            schemas.path().to_path_buf(),
            PathBuf::from("confluence-templates"),
            build.path().to_path_buf(),
        )
        .unwrap();

        // The schema parses as JSON but is missing every view mapping, so the
        // run fails at validation with a reference-not-found error.
        let err = publisher.run().unwrap_err();
        assert!(format!("{err:#}").contains("Reference not found for path"));
    }

    #[test]
    fn test_first_bad_schema_aborts_the_run() {
        let schemas = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        std::fs::write(schemas.path().join("a.json"), "not json at all").unwrap();
        std::fs::write(schemas.path().join("b.json"), "{}").unwrap();

        let publisher = Publisher::new(
            &test_config(),
            schemas.path().to_path_buf(),
            PathBuf::from("confluence-templates"),
            build.path().to_path_buf(),
        )
        .unwrap();

        // a.json fails to parse; b.json must never be reached, so the error
        // names a.json.
        let err = publisher.run().unwrap_err();
        assert!(format!("{err:#}").contains("a.json"));
    }
}
