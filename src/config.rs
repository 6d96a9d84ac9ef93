//! Report configuration: per-language view tables and portfolio lists.
//!
//! The view ids and portfolio short names are deployment data, not code, so
//! they live in one struct handed to the runner and merger. The compiled-in
//! defaults match the production site; a YAML file with the same shape can
//! override them per deployment.

use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{error, info};

/// Report language. Doubles as the name of the per-language output
/// directory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Language {
    En,
    Fr,
}

impl Language {
    pub fn as_dir(&self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Fr => "FR",
        }
    }
}

impl fmt::Display for Language {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_dir())
    }
}

/// One report page template on the server: page number plus the remote view
/// id that renders it.
#[derive(Debug, Clone)]
pub struct View {
    pub page_number: u8,
    pub view_id: String,
}

/// View table and portfolio list for one language.
#[derive(Debug, Clone)]
pub struct LanguageTable {
    pub views: Vec<View>,
    pub portfolios: Vec<String>,
}

/// Full report configuration, passed into the runner and the merger.
#[derive(Debug, Clone)]
pub struct ReportConfig {
    en: LanguageTable,
    fr: LanguageTable,
    pub merged_dir: String,
    pub page_ext: String,
}

impl ReportConfig {
    /// Production defaults: five report pages and six portfolios per
    /// language.
    pub fn builtin() -> Self {
        let en_views = [
            "4e8a17eb-0d30-4161-bcf7-46d3044cc88b",
            "54ba008c-546e-4c89-a7e5-104ccc4284ef",
            "a8d2b65d-47b3-432d-935d-590b79d2f1a1",
            "3a464694-bb10-4173-96fb-0371a8e2e173",
            "bf32ac95-f644-4355-98a6-6d2bef9cb62f",
        ];
        let fr_views = [
            "87208742-47ab-46b4-9c61-6641121c7b3c",
            "7163d8a5-e5c8-4173-a4c7-65678751d9f7",
            "b3edb664-5c59-4175-8b61-5e89ecbdd962",
            "8b6bab27-1670-4eb8-bbf0-3be8bab5e376",
            "bb2702de-f132-4eb1-a763-683aa3e0f9aa",
        ];
        let table = |ids: &[&str], portfolios: &[&str]| LanguageTable {
            views: ids
                .iter()
                .enumerate()
                .map(|(i, id)| View {
                    page_number: (i + 1) as u8,
                    view_id: id.to_string(),
                })
                .collect(),
            portfolios: portfolios.iter().map(|p| p.to_string()).collect(),
        };

        ReportConfig {
            en: table(&en_views, &["BRLP", "CAP", "PSDI", "JUS", "IRRP", "TLS"]),
            fr: table(&fr_views, &["PDADR", "POC", "SPDI", "JUS", "PDRA", "SDF"]),
            merged_dir: "merged".to_string(),
            page_ext: "pdf".to_string(),
        }
    }

    pub fn table(&self, language: Language) -> &LanguageTable {
        match language {
            Language::En => &self.en,
            Language::Fr => &self.fr,
        }
    }

    pub fn portfolios(&self, language: Language) -> &[String] {
        &self.table(language).portfolios
    }

    /// Views for the given pages, in page order. Unknown page numbers are
    /// simply absent from the result.
    pub fn views_for(&self, language: Language, pages: &[u8]) -> Vec<View> {
        self.table(language)
            .views
            .iter()
            .filter(|v| pages.contains(&v.page_number))
            .cloned()
            .collect()
    }

    pub fn page_numbers(&self, language: Language) -> Vec<u8> {
        self.table(language)
            .views
            .iter()
            .map(|v| v.page_number)
            .collect()
    }
}

#[derive(Deserialize)]
struct StaticReportConfig {
    #[serde(default = "default_merged_dir")]
    merged_dir: String,
    #[serde(default = "default_page_ext")]
    page_ext: String,
    languages: HashMap<String, StaticLanguageTable>,
}

#[derive(Deserialize)]
struct StaticLanguageTable {
    views: Vec<StaticView>,
    portfolios: Vec<String>,
}

#[derive(Deserialize)]
struct StaticView {
    page: u8,
    view_id: String,
}

fn default_merged_dir() -> String {
    "merged".to_string()
}

fn default_page_ext() -> String {
    "pdf".to_string()
}

/// Load a report configuration override from a YAML file. Both languages
/// must be present and each view table must have unique, positive page
/// numbers.
pub fn load_report_config<P: AsRef<Path>>(path: P) -> Result<ReportConfig> {
    let path_ref = path.as_ref();
    info!(config_path = ?path_ref, "Loading report configuration from file");

    let content = fs::read_to_string(path_ref)
        .with_context(|| format!("Failed to read report config file {:?}", path_ref))?;

    let static_conf: StaticReportConfig = match serde_yaml::from_str(&content) {
        Ok(conf) => conf,
        Err(e) => {
            error!(error = ?e, config_path = ?path_ref, "Failed to parse report config YAML");
            bail!("Failed to parse report config YAML: {e}");
        }
    };

    let en = convert_table(&static_conf, "EN")?;
    let fr = convert_table(&static_conf, "FR")?;

    info!(
        en_views = en.views.len(),
        fr_views = fr.views.len(),
        "Report configuration loaded"
    );

    Ok(ReportConfig {
        en,
        fr,
        merged_dir: static_conf.merged_dir,
        page_ext: static_conf.page_ext,
    })
}

fn convert_table(conf: &StaticReportConfig, key: &str) -> Result<LanguageTable> {
    let table = match conf.languages.get(key) {
        Some(t) => t,
        None => {
            error!(language = key, "Report config is missing a language section");
            bail!("Report config is missing the {key} language section");
        }
    };
    if table.views.is_empty() {
        bail!("Report config has an empty view table for {key}");
    }

    let mut views: Vec<View> = Vec::with_capacity(table.views.len());
    for v in &table.views {
        if v.page == 0 {
            bail!("Report config for {key} has a view with page number 0");
        }
        if views.iter().any(|seen| seen.page_number == v.page) {
            bail!("Report config for {key} repeats page number {}", v.page);
        }
        views.push(View {
            page_number: v.page,
            view_id: v.view_id.clone(),
        });
    }
    views.sort_by_key(|v| v.page_number);

    Ok(LanguageTable {
        views,
        portfolios: table.portfolios.clone(),
    })
}
