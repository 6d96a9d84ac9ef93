//! Collaborator interfaces for the remote reporting server, plus the shared
//! record and batch-report types the export pipeline passes around.
//!
//! The traits here are the seams between the core (hierarchy building, path
//! resolution, batch orchestration) and the remote service. They are agnostic
//! of authentication and transport; the production implementation lives in
//! `remote.rs` and tests supply mockall mocks.

use async_trait::async_trait;

#[cfg(any(test, feature = "test-export-mocks"))]
use mockall::automock;

/// Boxed error for remote collaborator calls.
pub type RemoteError = Box<dyn std::error::Error + Send + Sync>;

/// One project (folder) from the remote flat listing. Parent references are
/// by id only; the tree is reconstructed locally.
#[derive(Debug, Clone)]
pub struct ProjectRecord {
    pub id: String,
    pub name: String,
    pub parent_id: Option<String>,
}

/// One workbook from the remote flat listing, referencing its containing
/// project by id.
#[derive(Debug, Clone)]
pub struct WorkbookRecord {
    pub id: String,
    pub name: String,
    pub project_id: String,
}

/// Read access to the server's content: project hierarchy and workbooks.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ContentRepository: Send + Sync {
    /// List every project on the site as flat records.
    async fn list_projects(&self) -> Result<Vec<ProjectRecord>, RemoteError>;

    /// List every workbook on the site as flat records.
    async fn list_workbooks(&self) -> Result<Vec<WorkbookRecord>, RemoteError>;

    /// Download the packaged workbook content as raw bytes.
    async fn download_workbook(&self, workbook_id: &str) -> Result<Vec<u8>, RemoteError>;
}

/// Renders one view (report page template) to PDF bytes. Filters are opaque
/// key/value pairs injected into the render request; the runner supplies the
/// client and cut-off date filters keyed by page number.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait ViewRenderer: Send + Sync {
    async fn render_pdf(
        &self,
        view_id: &str,
        filters: &[(String, String)],
    ) -> Result<Vec<u8>, RemoteError>;
}

/// A signed-in session that must be released when the run finishes,
/// successfully or not.
#[cfg_attr(any(test, feature = "test-export-mocks"), automock)]
#[async_trait]
pub trait Session: Send + Sync {
    async fn sign_out(&self) -> Result<(), RemoteError>;
}

/// Outcome of one batch operation: which items succeeded and which failed,
/// with enough context to diagnose each failure. Callers assert on counts
/// instead of scraping the log stream.
#[derive(Debug, Default)]
pub struct BatchReport {
    pub succeeded: Vec<String>,
    pub failed: Vec<ItemFailure>,
}

/// A single failed item in a batch, by name, with the failure reason.
#[derive(Debug)]
pub struct ItemFailure {
    pub item: String,
    pub reason: String,
}

impl BatchReport {
    pub fn record_success(&mut self, item: impl Into<String>) {
        self.succeeded.push(item.into());
    }

    pub fn record_failure(&mut self, item: impl Into<String>, reason: impl ToString) {
        self.failed.push(ItemFailure {
            item: item.into(),
            reason: reason.to_string(),
        });
    }

    /// Fold another batch into this one, keeping item order.
    pub fn absorb(&mut self, other: BatchReport) {
        self.succeeded.extend(other.succeeded);
        self.failed.extend(other.failed);
    }

    pub fn summary(&self) -> String {
        format!(
            "{} succeeded, {} failed",
            self.succeeded.len(),
            self.failed.len()
        )
    }
}
