//! Production client for the Tableau REST API.
//!
//! Implements the collaborator traits over reqwest: JSON sign-in/sign-out,
//! paginated project and workbook listings, workbook content download and
//! view PDF export. The core never talks to this type directly, only
//! through the traits in `contract.rs`.

use anyhow::{bail, Context, Result};
use async_trait::async_trait;
use reqwest::header::ACCEPT;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{debug, error, info};

use crate::contract::{ContentRepository, ProjectRecord, RemoteError, Session, ViewRenderer, WorkbookRecord};

const API_VERSION: &str = "3.14";
const AUTH_HEADER: &str = "X-Tableau-Auth";
const PAGE_SIZE: usize = 1000;

/// Connection parameters for [`RestClient::connect`].
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    pub username: String,
    pub password: String,
    /// Server host, without scheme.
    pub server: String,
    /// Site content URL; the default site when absent.
    pub site: Option<String>,
    /// Skip TLS certificate verification (internal servers with self-signed
    /// certificates).
    pub insecure: bool,
}

/// A signed-in REST session. Holds the auth token and site id for the run.
pub struct RestClient {
    http: reqwest::Client,
    base_url: String,
    token: String,
    site_id: String,
}

#[derive(Deserialize)]
struct SignInResponse {
    credentials: Credentials,
}

#[derive(Deserialize)]
struct Credentials {
    token: String,
    site: SiteRef,
}

#[derive(Deserialize)]
struct SiteRef {
    id: String,
}

#[derive(Deserialize)]
struct ProjectsResponse {
    pagination: Pagination,
    projects: ProjectList,
}

#[derive(Deserialize)]
struct ProjectList {
    #[serde(default)]
    project: Vec<ApiProject>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ApiProject {
    id: String,
    name: String,
    parent_project_id: Option<String>,
}

#[derive(Deserialize)]
struct WorkbooksResponse {
    pagination: Pagination,
    workbooks: WorkbookList,
}

#[derive(Deserialize)]
struct WorkbookList {
    #[serde(default)]
    workbook: Vec<ApiWorkbook>,
}

#[derive(Deserialize)]
struct ApiWorkbook {
    id: String,
    name: String,
    project: Option<ApiProjectRef>,
}

#[derive(Deserialize)]
struct ApiProjectRef {
    id: String,
}

// The API returns pagination counters as JSON strings.
#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct Pagination {
    total_available: String,
}

impl RestClient {
    /// Sign in and return a connected client. A sign-in failure is fatal to
    /// the whole run.
    pub async fn connect(opts: &ConnectOptions) -> Result<Self> {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(opts.insecure)
            .build()
            .context("Failed to build HTTP client")?;

        let base_url = format!("https://{}", opts.server.trim_end_matches('/'));
        let url = format!("{base_url}/api/{API_VERSION}/auth/signin");
        let body = serde_json::json!({
            "credentials": {
                "name": opts.username,
                "password": opts.password,
                "site": { "contentUrl": opts.site.clone().unwrap_or_default() }
            }
        });

        let response = http
            .post(&url)
            .header(ACCEPT, "application/json")
            .json(&body)
            .send()
            .await
            .with_context(|| format!("Failed to reach {url}"))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            error!(status = %status, url = %url, "Sign-in rejected. Response body: {text}");
            bail!("Sign-in to {} failed with status {status}", opts.server);
        }

        let signin: SignInResponse = response
            .json()
            .await
            .context("Failed to decode sign-in response")?;

        info!(
            server = %base_url,
            username = %opts.username,
            site = opts.site.as_deref().unwrap_or("(default)"),
            "Connected to reporting server"
        );

        Ok(RestClient {
            http,
            base_url,
            token: signin.credentials.token,
            site_id: signin.credentials.site.id,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!(
            "{}/api/{}/sites/{}/{}",
            self.base_url, API_VERSION, self.site_id, path
        )
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<T, RemoteError> {
        debug!(url = %url, "GET (json)");
        let response = self
            .http
            .get(url)
            .header(AUTH_HEADER, &self.token)
            .header(ACCEPT, "application/json")
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("GET {url} returned {status}: {text}").into());
        }
        Ok(response.json::<T>().await?)
    }

    async fn get_bytes(
        &self,
        url: &str,
        query: &[(String, String)],
    ) -> Result<Vec<u8>, RemoteError> {
        debug!(url = %url, "GET (bytes)");
        let response = self
            .http
            .get(url)
            .header(AUTH_HEADER, &self.token)
            .query(query)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(format!("GET {url} returned {status}: {text}").into());
        }
        Ok(response.bytes().await?.to_vec())
    }

    fn page_query(page_number: usize) -> Vec<(String, String)> {
        vec![
            ("pageSize".to_string(), PAGE_SIZE.to_string()),
            ("pageNumber".to_string(), page_number.to_string()),
        ]
    }
}

#[async_trait]
impl ContentRepository for RestClient {
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, RemoteError> {
        let url = self.endpoint("projects");
        let mut records = Vec::new();
        let mut page_number = 1;
        loop {
            let page: ProjectsResponse = self.get_json(&url, &Self::page_query(page_number)).await?;
            let total: usize = page
                .pagination
                .total_available
                .parse()
                .map_err(|e| format!("Bad totalAvailable in projects response: {e}"))?;
            let fetched = page.projects.project.len();
            records.extend(page.projects.project.into_iter().map(|p| ProjectRecord {
                id: p.id,
                name: p.name,
                parent_id: p.parent_project_id,
            }));
            if fetched == 0 || records.len() >= total {
                break;
            }
            page_number += 1;
        }
        Ok(records)
    }

    async fn list_workbooks(&self) -> Result<Vec<WorkbookRecord>, RemoteError> {
        let url = self.endpoint("workbooks");
        let mut records = Vec::new();
        let mut page_number = 1;
        loop {
            let page: WorkbooksResponse =
                self.get_json(&url, &Self::page_query(page_number)).await?;
            let total: usize = page
                .pagination
                .total_available
                .parse()
                .map_err(|e| format!("Bad totalAvailable in workbooks response: {e}"))?;
            let fetched = page.workbooks.workbook.len();
            records.extend(page.workbooks.workbook.into_iter().map(|w| WorkbookRecord {
                id: w.id,
                name: w.name,
                project_id: w.project.map(|p| p.id).unwrap_or_default(),
            }));
            if fetched == 0 || records.len() >= total {
                break;
            }
            page_number += 1;
        }
        Ok(records)
    }

    async fn download_workbook(&self, workbook_id: &str) -> Result<Vec<u8>, RemoteError> {
        let url = self.endpoint(&format!("workbooks/{workbook_id}/content"));
        self.get_bytes(&url, &[]).await
    }
}

#[async_trait]
impl ViewRenderer for RestClient {
    async fn render_pdf(
        &self,
        view_id: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<u8>, RemoteError> {
        let url = self.endpoint(&format!("views/{view_id}/pdf"));
        let mut query = vec![
            ("type".to_string(), "Letter".to_string()),
            ("orientation".to_string(), "Portrait".to_string()),
        ];
        for (key, value) in filters {
            query.push((format!("vf_{key}"), value.clone()));
        }
        self.get_bytes(&url, &query).await
    }
}

#[async_trait]
impl Session for RestClient {
    async fn sign_out(&self) -> Result<(), RemoteError> {
        let url = format!("{}/api/{}/auth/signout", self.base_url, API_VERSION);
        let response = self
            .http
            .post(&url)
            .header(AUTH_HEADER, &self.token)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(format!("Sign-out returned {status}").into());
        }
        info!("Signed out from reporting server");
        Ok(())
    }
}
