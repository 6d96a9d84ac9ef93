//! Workbook backup: mirror the server's project hierarchy on disk and
//! download every workbook into its project directory.

use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{error, info, warn};

use crate::contract::{BatchReport, ContentRepository, WorkbookRecord};
use crate::hierarchy::{sanitize, Forest};

const WORKBOOK_EXT: &str = "twbx";

/// Download every workbook on the site into `output_dir`, nested under the
/// reconstructed project hierarchy.
///
/// Listing failures are fatal; everything after that is best-effort. Each
/// workbook either lands in the report's succeeded list or in its failed
/// list with a reason, and one bad workbook never stops the rest.
pub async fn export_workbooks(
    repo: &dyn ContentRepository,
    output_dir: &Path,
) -> Result<BatchReport> {
    let projects = repo
        .list_projects()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list projects: {e}"))?;
    info!(projects = projects.len(), "Fetched project listing");

    let forest = Forest::build(projects);
    forest.trace_tree();

    let workbooks = repo
        .list_workbooks()
        .await
        .map_err(|e| anyhow::anyhow!("Failed to list workbooks: {e}"))?;
    info!(workbooks = workbooks.len(), "Fetched workbook listing");

    let mut report = BatchReport::default();
    for workbook in &workbooks {
        match save_workbook(repo, &forest, workbook, output_dir).await {
            Ok(()) => report.record_success(&workbook.name),
            Err(e) => {
                error!(workbook = %workbook.name, error = %e, "Error saving workbook");
                report.record_failure(&workbook.name, e);
            }
        }
    }

    info!(summary = %report.summary(), "Workbook export finished");
    Ok(report)
}

async fn save_workbook(
    repo: &dyn ContentRepository,
    forest: &Forest,
    workbook: &WorkbookRecord,
    output_dir: &Path,
) -> Result<()> {
    // A workbook whose project is absent from the listing is skipped rather
    // than dumped at the base path; the report keeps the skip visible.
    let dir = match forest.resolve_path(&workbook.project_id, output_dir) {
        Some(dir) => dir,
        None => {
            warn!(
                workbook = %workbook.name,
                project_id = %workbook.project_id,
                "Workbook's project is not in the hierarchy, skipping"
            );
            anyhow::bail!("project {} not found in hierarchy", workbook.project_id);
        }
    };

    fs::create_dir_all(&dir)
        .with_context(|| format!("Failed to create directory {}", dir.display()))?;

    let content = repo
        .download_workbook(&workbook.id)
        .await
        .map_err(|e| anyhow::anyhow!("download failed: {e}"))?;

    let path = dir.join(format!("{}.{}", sanitize(&workbook.name), WORKBOOK_EXT));
    fs::write(&path, &content)
        .with_context(|| format!("Failed to write workbook to {}", path.display()))?;

    info!(path = %path.display(), size = content.len(), "Saved workbook");
    Ok(())
}
