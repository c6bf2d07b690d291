//! Page body composition from the template fragments.
//!
//! Builds the full Confluence storage body for one object: five roles
//! tables (desktop grid/details/infocard, mobile list/details), one
//! single-table block for the state diagram, and a last-updated timestamp,
//! all nested into the outer page template. Templates are loaded fresh from
//! disk for every object.

use std::path::Path;

use anyhow::{Context, Result};
use chrono::Local;

use crate::{
    schema::{ObjectSchema, RoleLinks},
    template::{self, TemplateError},
};

/// Outer page template filename.
const PAGE_TEMPLATE: &str = "object-page.html";
/// Three-column roles table fragment filename.
const ROLES_TABLE_TEMPLATE: &str = "roles-table.html";
/// Single-cell table fragment filename.
const SINGLE_TABLE_TEMPLATE: &str = "single-table.html";

/// Highlight colour for the state-diagram block.
const WHITE: &str = "#ffffff";
/// Highlight colour for the vendor column.
const LIGHT_BLUE: &str = "#eaf4ff";
/// Highlight colour for the operations column.
const LIGHT_RED: &str = "#fff4f0";
/// Highlight colour for the client column.
const LIGHT_GREEN: &str = "#edfff7";

/// Timestamp format for the page footer, e.g. `Aug 27, 2026 at 14:03:59`.
const LAST_UPDATED_FORMAT: &str = "%b %d, %Y at %H:%M:%S";

/// Composes the page body for one object and writes an audit copy to
/// `build_dir/confluence-page-updated-{page_id}.html`.
///
/// # Errors
///
/// Returns an error if a template cannot be read, a substitution key is
/// missing from its template, any `{{...}}` token survives substitution, or
/// the audit copy cannot be written.
pub fn compose_page(
    object: &ObjectSchema,
    templates_dir: &Path,
    build_dir: &Path,
    page_id: &str,
) -> Result<String> {
    let page_template = template::load_template(templates_dir, PAGE_TEMPLATE)?;
    let roles_table_template = template::load_template(templates_dir, ROLES_TABLE_TEMPLATE)?;
    let single_table_template = template::load_template(templates_dir, SINGLE_TABLE_TEMPLATE)?;

    let state_diagram_filename = format!("{}-state-diagram.png", object.name);
    let state_diagram = template::populate(
        &single_table_template,
        &[
            ("{{highlight-colour}}", Some(WHITE)),
            ("{{filename}}", Some(state_diagram_filename.as_str())),
            ("{{figma-link}}", object.state_diagram.as_deref()),
        ],
    )?;

    let desktop_grid = roles_table(
        &roles_table_template,
        &object.name,
        "desktop.grid-view",
        &object.desktop.grid_view,
    )?;
    let desktop_details = roles_table(
        &roles_table_template,
        &object.name,
        "desktop.details-view",
        &object.desktop.details_view,
    )?;
    let desktop_infocard = roles_table(
        &roles_table_template,
        &object.name,
        "desktop.infocard-view",
        &object.desktop.infocard_view,
    )?;
    let mobile_list = roles_table(
        &roles_table_template,
        &object.name,
        "mobile.list-view",
        &object.mobile.list_view,
    )?;
    let mobile_details = roles_table(
        &roles_table_template,
        &object.name,
        "mobile.details-view",
        &object.mobile.details_view,
    )?;

    let last_updated = Local::now().format(LAST_UPDATED_FORMAT).to_string();
    let page = template::populate(
        &page_template,
        &[
            ("{{state-diagram}}", Some(state_diagram.as_str())),
            ("{{desktop-grid-table-section}}", Some(desktop_grid.as_str())),
            (
                "{{desktop-details-table-section}}",
                Some(desktop_details.as_str()),
            ),
            (
                "{{desktop-infocard-table-section}}",
                Some(desktop_infocard.as_str()),
            ),
            ("{{mobile-list-table-section}}", Some(mobile_list.as_str())),
            (
                "{{mobile-details-table-section}}",
                Some(mobile_details.as_str()),
            ),
            ("{{last-updated}}", Some(last_updated.as_str())),
        ],
    )?;

    let out_path = build_dir.join(format!("confluence-page-updated-{page_id}.html"));
    std::fs::write(&out_path, &page)
        .with_context(|| format!("Failed to write {}", out_path.display()))?;

    Ok(page)
}

/// Fills one three-column roles table for a view.
fn roles_table(
    template_text: &str,
    object_name: &str,
    view_path: &str,
    links: &RoleLinks,
) -> Result<String, TemplateError> {
    let base = format!("{object_name}-{}", view_path.replace('.', "-"));
    let vendor_file = format!("{base}-vendor.png");
    let operations_file = format!("{base}-operations.png");
    let client_file = format!("{base}-client.png");

    template::populate(
        template_text,
        &[
            ("{{highlight-colour-column-1}}", Some(LIGHT_BLUE)),
            ("{{highlight-colour-column-2}}", Some(LIGHT_RED)),
            ("{{highlight-colour-column-3}}", Some(LIGHT_GREEN)),
            ("{{filename-column-1}}", Some(vendor_file.as_str())),
            ("{{filename-column-2}}", Some(operations_file.as_str())),
            ("{{filename-column-3}}", Some(client_file.as_str())),
            ("{{figma-link-column-1}}", links.vendor.as_deref()),
            ("{{figma-link-column-2}}", links.operations.as_deref()),
            ("{{figma-link-column-3}}", links.client.as_deref()),
        ],
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn write_templates(dir: &Path) {
        std::fs::write(
            dir.join(SINGLE_TABLE_TEMPLATE),
            "<td style=\"{{highlight-colour}}\">{{filename}}|{{figma-link}}</td>",
        )
        .unwrap();
        std::fs::write(
            dir.join(ROLES_TABLE_TEMPLATE),
            "{{highlight-colour-column-1}}|{{highlight-colour-column-2}}|{{highlight-colour-column-3}}|\
             {{filename-column-1}}|{{filename-column-2}}|{{filename-column-3}}|\
             {{figma-link-column-1}}|{{figma-link-column-2}}|{{figma-link-column-3}}",
        )
        .unwrap();
        std::fs::write(
            dir.join(PAGE_TEMPLATE),
            "{{state-diagram}}\n{{desktop-grid-table-section}}\n{{desktop-details-table-section}}\n\
             {{desktop-infocard-table-section}}\n{{mobile-list-table-section}}\n\
             {{mobile-details-table-section}}\nUpdated: {{last-updated}}",
        )
        .unwrap();
    }

    fn test_object() -> ObjectSchema {
        let roles = json!({
            "vendor": "https://www.figma.com/design/AbC123/Objects?node-id=1-100",
            "operations": "https://www.figma.com/design/AbC123/Objects?node-id=1-101",
            "client": null,
        });
        ObjectSchema::from_value(&json!({
            "name": "Order",
            "confluence-page": "https://example.atlassian.net/wiki/spaces/MPT/pages/777/Order",
            "state-diagram": "https://www.figma.com/design/AbC123/Objects?node-id=2-200",
            "desktop": {
                "grid-view": roles.clone(),
                "details-view": roles.clone(),
                "infocard-view": roles.clone(),
            },
            "mobile": {
                "list-view": roles.clone(),
                "details-view": roles,
            },
        }))
        .unwrap()
    }

    #[test]
    fn test_compose_page_fills_all_blocks() {
        let templates = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        write_templates(templates.path());

        let page = compose_page(&test_object(), templates.path(), build.path(), "777").unwrap();

        assert!(page.contains("Order-state-diagram.png"));
        assert!(page.contains("Order-desktop-grid-view-vendor.png"));
        assert!(page.contains("Order-mobile-details-view-operations.png"));
        // Null client links render as the literal Undefined.
        assert!(page.contains("Undefined"));
        assert!(page.contains("Updated: "));
        assert!(!page.contains("{{"));

        let audit = build.path().join("confluence-page-updated-777.html");
        assert_eq!(std::fs::read_to_string(audit).unwrap(), page);
    }

    #[test]
    fn test_compose_page_fails_on_template_drift() {
        let templates = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        write_templates(templates.path());
        // A template that lost one of its expected tokens.
        std::fs::write(
            templates.path().join(SINGLE_TABLE_TEMPLATE),
            "<td>{{filename}}|{{figma-link}}</td>",
        )
        .unwrap();

        let err = compose_page(&test_object(), templates.path(), build.path(), "777").unwrap_err();
        assert!(err.to_string().contains("{{highlight-colour}}"));
    }

    #[test]
    fn test_compose_page_fails_on_leftover_tokens() {
        let templates = tempfile::tempdir().unwrap();
        let build = tempfile::tempdir().unwrap();
        write_templates(templates.path());
        // A stray token the composer does not know about.
        std::fs::write(
            templates.path().join(PAGE_TEMPLATE),
            "{{state-diagram}}\n{{desktop-grid-table-section}}\n{{desktop-details-table-section}}\n\
             {{desktop-infocard-table-section}}\n{{mobile-list-table-section}}\n\
             {{mobile-details-table-section}}\n{{last-updated}}\n{{mystery}}",
        )
        .unwrap();

        let err = compose_page(&test_object(), templates.path(), build.path(), "777").unwrap_err();
        assert!(err.to_string().contains("{{mystery}}"));
    }
}
