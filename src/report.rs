//! Report task runner: render every (view, client) pair to a numbered page
//! file under the per-client output directory.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing::{error, info};

use crate::config::{Language, ReportConfig, View};
use crate::contract::{BatchReport, ViewRenderer};
use crate::roster::Client;

/// Pre-create the per-portfolio output and merged directory skeletons for
/// both languages. Creating an existing directory is not an error.
pub fn ensure_portfolio_dirs(config: &ReportConfig, output_root: &Path) {
    for language in [Language::En, Language::Fr] {
        for portfolio in config.portfolios(language) {
            let output_dir = output_root.join(language.as_dir()).join(portfolio);
            let merged_dir = output_root
                .join(&config.merged_dir)
                .join(language.as_dir())
                .join(portfolio);
            for dir in [&output_dir, &merged_dir] {
                info!(path = %dir.display(), "Creating directory");
                if let Err(e) = fs::create_dir_all(dir) {
                    error!(error = %e, path = %dir.display(), "Error creating output directory");
                }
            }
        }
    }
}

/// Render the given views for every client and write each page to
/// `{output}/{LANG}/{portfolio}/{display_name}/PAGE_{n}.{ext}`.
///
/// Views iterate outer, clients inner: each view is requested once per
/// client before the next view starts. That ordering fixes the I/O
/// interleaving and the log order, so it is kept deliberately. A failing
/// (view, client) pair is recorded and the loop moves on.
pub async fn generate_reports(
    renderer: &dyn ViewRenderer,
    config: &ReportConfig,
    views: &[View],
    clients: &[Client],
    language: Language,
    cut_off_date: &str,
    output_root: &Path,
) -> BatchReport {
    let mut report = BatchReport::default();

    for view in views {
        info!(
            page = view.page_number,
            view_id = %view.view_id,
            language = %language,
            "Rendering report page for all selected clients"
        );
        for client in clients {
            let page_path = page_file_path(config, client, language, view.page_number, output_root);
            let label = page_path
                .strip_prefix(output_root)
                .unwrap_or(&page_path)
                .display()
                .to_string();

            match render_page(renderer, view, client, cut_off_date, &page_path).await {
                Ok(size) => {
                    info!(path = %page_path.display(), size, "Saved report page");
                    report.record_success(label);
                }
                Err(e) => {
                    error!(
                        cmr_number = %client.cmr_number,
                        page = view.page_number,
                        error = %e,
                        "Error saving report page"
                    );
                    report.record_failure(label, e);
                }
            }
        }
    }

    report
}

async fn render_page(
    renderer: &dyn ViewRenderer,
    view: &View,
    client: &Client,
    cut_off_date: &str,
    page_path: &Path,
) -> Result<usize> {
    // Filter field names are part of the remote report design: one client
    // filter and one cut-off date filter per page, keyed by page number.
    // The server matches the CMR number as an integer, so leading zeros
    // from the roster are stripped.
    let cmr = client.cmr_number.trim_start_matches('0');
    let cmr = if cmr.is_empty() { "0" } else { cmr };
    let filters = vec![
        (
            format!("Client{}B", view.page_number),
            cmr.to_string(),
        ),
        (
            format!("Cut-Off Date{}", view.page_number),
            cut_off_date.to_string(),
        ),
    ];

    let content = renderer
        .render_pdf(&view.view_id, &filters)
        .await
        .map_err(|e| anyhow::anyhow!("render failed: {e}"))?;

    let client_dir = page_path
        .parent()
        .with_context(|| format!("Page path {} has no parent directory", page_path.display()))?;
    fs::create_dir_all(client_dir)
        .with_context(|| format!("Failed to create directory {}", client_dir.display()))?;

    fs::write(page_path, &content)
        .with_context(|| format!("Failed to write page to {}", page_path.display()))?;

    Ok(content.len())
}

fn page_file_path(
    config: &ReportConfig,
    client: &Client,
    language: Language,
    page_number: u8,
    output_root: &Path,
) -> PathBuf {
    output_root
        .join(language.as_dir())
        .join(client.portfolio_short_name(language))
        .join(client.display_name(language))
        .join(format!("PAGE_{}.{}", page_number, config.page_ext))
}
