//! Page set merger: consolidate each client's rendered pages into a single
//! document per client.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::{debug, error, info, warn};

use crate::config::{Language, ReportConfig};
use crate::contract::BatchReport;

/// Merge every client folder under `{output}/{LANG}/{portfolio}` into
/// `{output}/merged/{LANG}/{portfolio}/{client}.{ext}`.
///
/// Pages are ordered by the page number parsed from the filename, so
/// PAGE_10 follows PAGE_9 (a plain lexicographic sort would put it after
/// PAGE_1). Files without a parsable number sort after the numbered pages,
/// by name. Folders with no matching files are skipped; a failing client
/// is recorded and the scan continues.
pub fn merge_reports(config: &ReportConfig, output_root: &Path, language: Language) -> BatchReport {
    info!(language = %language, "Merging report pages per client");

    let page_number = Regex::new(r"PAGE_(\d+)").expect("hard-coded pattern compiles");
    let merged_root = output_root.join(&config.merged_dir).join(language.as_dir());
    let mut report = BatchReport::default();

    for portfolio in config.portfolios(language) {
        let merged_dir = merged_root.join(portfolio);
        if let Err(e) = fs::create_dir_all(&merged_dir) {
            error!(error = %e, path = %merged_dir.display(), "Error creating merged directory");
            report.record_failure(format!("{}/{}", language, portfolio), e);
            continue;
        }

        let portfolio_dir = output_root.join(language.as_dir()).join(portfolio);
        let entries = match fs::read_dir(&portfolio_dir) {
            Ok(entries) => entries,
            Err(e) => {
                warn!(
                    error = %e,
                    path = %portfolio_dir.display(),
                    "Portfolio directory is not readable, skipping"
                );
                continue;
            }
        };

        for entry in entries.flatten() {
            let client_dir = entry.path();
            if !client_dir.is_dir() {
                continue;
            }
            let client_name = entry.file_name().to_string_lossy().into_owned();
            let label = format!("{}/{}/{}", language, portfolio, client_name);

            match merge_client(config, &page_number, &client_dir, &merged_dir, &client_name) {
                Ok(Some(path)) => {
                    info!(client = %client_name, path = %path.display(), "Merged client pages");
                    report.record_success(label);
                }
                Ok(None) => {
                    debug!(client = %client_name, "No pages to merge, skipping");
                }
                Err(e) => {
                    error!(client = %client_name, error = %e, "Error merging pages");
                    report.record_failure(label, e);
                }
            }
        }
    }

    info!(language = %language, summary = %report.summary(), "Merge finished");
    report
}

/// Merge one client folder. Returns the merged file path, or `None` when
/// the folder holds no page files.
fn merge_client(
    config: &ReportConfig,
    page_number: &Regex,
    client_dir: &Path,
    merged_dir: &Path,
    client_name: &str,
) -> Result<Option<PathBuf>> {
    let suffix = format!(".{}", config.page_ext);
    let mut pages: Vec<(u64, String)> = Vec::new();

    for entry in fs::read_dir(client_dir)
        .with_context(|| format!("Failed to read client directory {}", client_dir.display()))?
    {
        let entry = entry?;
        let name = entry.file_name().to_string_lossy().into_owned();
        if !name.ends_with(&suffix) {
            continue;
        }
        let number = page_number
            .captures(&name)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse::<u64>().ok())
            .unwrap_or(u64::MAX);
        pages.push((number, name));
    }

    if pages.is_empty() {
        return Ok(None);
    }
    pages.sort();

    let mut merged = Vec::new();
    for (_, name) in &pages {
        let page_path = client_dir.join(name);
        let content = fs::read(&page_path)
            .with_context(|| format!("Failed to read page {}", page_path.display()))?;
        if content.is_empty() {
            bail!("Page {} is empty", page_path.display());
        }
        merged.extend_from_slice(&content);
    }

    let output_path = merged_dir.join(format!("{}.{}", client_name, config.page_ext));
    fs::write(&output_path, &merged)
        .with_context(|| format!("Failed to write merged file {}", output_path.display()))?;

    Ok(Some(output_path))
}
