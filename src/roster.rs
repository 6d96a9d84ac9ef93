//! Client roster loading and selection.
//!
//! The roster is a JSON document with a top-level `Clients` array. The
//! schema is validated up front: a missing field or a non-numeric CMR number
//! fails the whole load with a contextual error instead of surfacing halfway
//! through a batch.

use std::fs;
use std::path::Path;

use anyhow::{bail, Context, Result};
use serde::Deserialize;
use tracing::{error, info};

use crate::config::Language;

/// One client from the roster. The CMR number is the unique key and the
/// value injected into the report client filter.
#[derive(Debug, Clone, Deserialize)]
pub struct Client {
    #[serde(rename = "CmrNumber")]
    pub cmr_number: String,
    #[serde(rename = "PortfolioShortEN")]
    pub portfolio_short_en: String,
    #[serde(rename = "PortfolioShortFR")]
    pub portfolio_short_fr: String,
    #[serde(rename = "ClientNameShortEN")]
    pub client_name_short_en: String,
    #[serde(rename = "ClientNameShortFR")]
    pub client_name_short_fr: String,
}

impl Client {
    pub fn portfolio_short_name(&self, language: Language) -> &str {
        match language {
            Language::En => &self.portfolio_short_en,
            Language::Fr => &self.portfolio_short_fr,
        }
    }

    pub fn display_name(&self, language: Language) -> &str {
        match language {
            Language::En => &self.client_name_short_en,
            Language::Fr => &self.client_name_short_fr,
        }
    }
}

#[derive(Debug, Deserialize)]
struct RosterDocument {
    #[serde(rename = "Clients")]
    clients: Vec<Client>,
}

/// The loaded client roster, immutable for the run.
#[derive(Debug, Clone)]
pub struct Roster {
    clients: Vec<Client>,
}

impl Roster {
    /// Load and validate the roster from a JSON file.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path_ref = path.as_ref();
        info!(roster_path = ?path_ref, "Loading client roster");

        let content = fs::read_to_string(path_ref)
            .with_context(|| format!("Failed to read client roster {:?}", path_ref))?;

        let document: RosterDocument = match serde_json::from_str(&content) {
            Ok(doc) => doc,
            Err(e) => {
                error!(error = ?e, roster_path = ?path_ref, "Failed to parse client roster JSON");
                bail!("Failed to parse client roster {:?}: {e}", path_ref);
            }
        };

        for client in &document.clients {
            if client.cmr_number.is_empty() || !client.cmr_number.chars().all(|c| c.is_ascii_digit())
            {
                bail!(
                    "Client roster entry has a non-numeric CMR number: {:?}",
                    client.cmr_number
                );
            }
        }

        info!(clients = document.clients.len(), "Client roster loaded");
        Ok(Roster {
            clients: document.clients,
        })
    }

    pub fn clients(&self) -> &[Client] {
        &self.clients
    }

    pub fn len(&self) -> usize {
        self.clients.len()
    }

    pub fn is_empty(&self) -> bool {
        self.clients.is_empty()
    }

    /// Narrow the roster to one CMR number, or keep every client for the
    /// `all` selector. Selecting an unknown CMR number is an error: running
    /// a batch over zero clients silently would hide a typo.
    pub fn select(&self, selector: &str) -> Result<Vec<Client>> {
        if selector == "all" {
            return Ok(self.clients.clone());
        }
        let selected: Vec<Client> = self
            .clients
            .iter()
            .filter(|c| c.cmr_number == selector)
            .cloned()
            .collect();
        if selected.is_empty() {
            bail!("No client with CMR number {selector} in the roster");
        }
        Ok(selected)
    }
}
