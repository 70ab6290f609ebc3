//! In-process test request store.

use super::TestRequestStore;
use crate::{PortalError, PortalResult};
use api_shared::{NewTestReport, TestReport, TestRequest, TestRequestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Contents of a seed file: `{"test_requests": [...], "test_reports": [...]}`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct SeedData {
    #[serde(default)]
    pub test_requests: Vec<TestRequest>,
    #[serde(default)]
    pub test_reports: Vec<TestReport>,
}

#[derive(Debug, Default)]
struct Tables {
    requests: Vec<TestRequest>,
    reports: Vec<TestReport>,
}

/// `Mutex`-guarded tables. Status updates read then write with no version check.
#[derive(Debug, Default)]
pub struct MemoryTestRequestStore {
    tables: Mutex<Tables>,
}

impl MemoryTestRequestStore {
    pub fn new(requests: Vec<TestRequest>) -> Self {
        Self::from_seed(SeedData {
            test_requests: requests,
            test_reports: Vec::new(),
        })
    }

    pub fn from_seed(seed: SeedData) -> Self {
        Self {
            tables: Mutex::new(Tables {
                requests: seed.test_requests,
                reports: seed.test_reports,
            }),
        }
    }

    /// Loads a JSON seed file.
    ///
    /// # Errors
    ///
    /// `SettingsRead` if the file cannot be read, `Deserialization` if it is not valid seed
    /// JSON.
    pub fn from_seed_file(path: &Path) -> PortalResult<Self> {
        let contents = std::fs::read_to_string(path).map_err(PortalError::SettingsRead)?;
        let seed: SeedData =
            serde_json::from_str(&contents).map_err(PortalError::Deserialization)?;
        tracing::info!(
            "seeded {} test requests and {} reports from {}",
            seed.test_requests.len(),
            seed.test_reports.len(),
            path.display()
        );
        Ok(Self::from_seed(seed))
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        self.tables
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl TestRequestStore for MemoryTestRequestStore {
    async fn list(&self, status: Option<TestRequestStatus>) -> PortalResult<Vec<TestRequest>> {
        let mut rows: Vec<TestRequest> = self
            .tables()
            .requests
            .iter()
            .filter(|r| status.is_none_or(|s| r.status == s))
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(rows)
    }

    async fn statuses(&self) -> PortalResult<Vec<TestRequestStatus>> {
        Ok(self.tables().requests.iter().map(|r| r.status).collect())
    }

    async fn get(&self, id: &str) -> PortalResult<Option<TestRequest>> {
        Ok(self.tables().requests.iter().find(|r| r.id == id).cloned())
    }

    async fn update_status(
        &self,
        id: &str,
        status: TestRequestStatus,
        updated_at: DateTime<Utc>,
    ) -> PortalResult<()> {
        let mut tables = self.tables();
        let row = tables
            .requests
            .iter_mut()
            .find(|r| r.id == id)
            .ok_or_else(|| PortalError::NotFound(format!("test request {id}")))?;
        row.status = status;
        row.updated_at = updated_at;
        Ok(())
    }

    async fn insert_report(&self, report: NewTestReport) -> PortalResult<TestReport> {
        let mut tables = self.tables();
        if !tables.requests.iter().any(|r| r.id == report.request_id) {
            return Err(PortalError::NotFound(format!(
                "test request {}",
                report.request_id
            )));
        }

        let stored = TestReport {
            id: Uuid::new_v4().to_string(),
            request_id: report.request_id,
            file_name: report.file_name,
            file_type: report.file_type,
            file_url: report.file_url,
            file_size: report.file_size,
            uploaded_at: Utc::now(),
        };
        tables.reports.push(stored.clone());
        Ok(stored)
    }

    async fn reports_for(&self, request_id: &str) -> PortalResult<Vec<TestReport>> {
        let mut rows: Vec<TestReport> = self
            .tables()
            .reports
            .iter()
            .filter(|r| r.request_id == request_id)
            .cloned()
            .collect();
        rows.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_requests::tests::request;
    use api_shared::ReportFileType;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[tokio::test]
    async fn test_from_seed_file() {
        let seed = SeedData {
            test_requests: vec![
                request("r1", TestRequestStatus::Pending, 1),
                request("r2", TestRequestStatus::Completed, 2),
            ],
            test_reports: vec![],
        };
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(serde_json::to_string(&seed).unwrap().as_bytes())
            .unwrap();

        let store = MemoryTestRequestStore::from_seed_file(file.path()).unwrap();
        assert_eq!(store.list(None).await.unwrap().len(), 2);
        assert_eq!(
            store
                .list(Some(TestRequestStatus::Completed))
                .await
                .unwrap()[0]
                .id,
            "r2"
        );
    }

    #[test]
    fn test_bad_seed_file_is_deserialization_error() {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(b"[1, 2, 3]").unwrap();
        assert!(matches!(
            MemoryTestRequestStore::from_seed_file(file.path()),
            Err(PortalError::Deserialization(_))
        ));
    }

    #[tokio::test]
    async fn test_report_for_unknown_request_is_not_found() {
        let store = MemoryTestRequestStore::default();
        let result = store
            .insert_report(NewTestReport {
                request_id: "ghost".into(),
                file_name: "x.png".into(),
                file_type: ReportFileType::Image,
                file_url: "https://files.example/x.png".into(),
                file_size: 10,
            })
            .await;
        assert!(matches!(result, Err(PortalError::NotFound(_))));
    }

    #[tokio::test]
    async fn test_bundled_seed_file_loads() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("../../seed/test_requests.json");
        let store = MemoryTestRequestStore::from_seed_file(&path).unwrap();
        let all = store.list(None).await.unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].id, "tr_1001");
        assert_eq!(store.reports_for("tr_1003").await.unwrap().len(), 1);
    }
}
