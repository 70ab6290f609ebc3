//! Lab test request dashboard.
//!
//! [`TestRequestService`] holds the dashboard operations; rows live behind a
//! [`TestRequestStore`], either in memory ([`MemoryTestRequestStore`]) or in remote
//! PostgREST tables ([`RemoteTableStore`]).

pub mod memory;
pub mod remote;

use crate::{PortalError, PortalResult};
use api_shared::{
    DashboardStats, NewTestReport, StatusFilter, TestReport, TestRequest, TestRequestStatus,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use portal_types::NonEmptyText;
use std::sync::Arc;

pub use memory::{MemoryTestRequestStore, SeedData};
pub use remote::RemoteTableStore;

/// Storage for test requests and their reports.
///
/// Lists are newest first: requests by `created_at`, reports by `uploaded_at`.
#[async_trait]
pub trait TestRequestStore: Send + Sync {
    /// Requests with `status`, or every request for `None`.
    async fn list(&self, status: Option<TestRequestStatus>) -> PortalResult<Vec<TestRequest>>;

    /// The status of every request, in no particular order.
    async fn statuses(&self) -> PortalResult<Vec<TestRequestStatus>>;

    async fn get(&self, id: &str) -> PortalResult<Option<TestRequest>>;

    /// Sets `status` and `updated_at`. `NotFound` if no row has `id`.
    async fn update_status(
        &self,
        id: &str,
        status: TestRequestStatus,
        updated_at: DateTime<Utc>,
    ) -> PortalResult<()>;

    async fn insert_report(&self, report: NewTestReport) -> PortalResult<TestReport>;

    async fn reports_for(&self, request_id: &str) -> PortalResult<Vec<TestReport>>;
}

/// Counts statuses client-side.
pub fn count_statuses(statuses: &[TestRequestStatus]) -> DashboardStats {
    statuses
        .iter()
        .fold(DashboardStats::default(), |mut stats, status| {
            match status {
                TestRequestStatus::Pending => stats.pending += 1,
                TestRequestStatus::Completed => stats.completed += 1,
                TestRequestStatus::Processing => {}
            }
            stats.total += 1;
            stats
        })
}

/// One dashboard load: the filtered list plus the aggregate counts.
#[derive(Clone, Debug, PartialEq)]
pub struct DashboardSnapshot {
    pub requests: Vec<TestRequest>,
    pub stats: DashboardStats,
}

#[derive(Clone)]
pub struct TestRequestService {
    store: Arc<dyn TestRequestStore>,
}

impl TestRequestService {
    pub fn new(store: Arc<dyn TestRequestStore>) -> Self {
        Self { store }
    }

    pub async fn get_test_requests(&self, filter: StatusFilter) -> PortalResult<Vec<TestRequest>> {
        self.store.list(filter.status()).await
    }

    pub async fn get_dashboard_stats(&self) -> PortalResult<DashboardStats> {
        let statuses = self.store.statuses().await?;
        Ok(count_statuses(&statuses))
    }

    pub async fn get_test_request_by_id(&self, id: &str) -> PortalResult<Option<TestRequest>> {
        self.store.get(id).await
    }

    /// Last write wins; there is no version check.
    pub async fn update_request_status(
        &self,
        id: &str,
        status: TestRequestStatus,
    ) -> PortalResult<()> {
        self.store.update_status(id, status, Utc::now()).await?;
        tracing::info!("test request {} set to {}", id, status.as_str());
        Ok(())
    }

    pub async fn upload_test_report(&self, report: NewTestReport) -> PortalResult<TestReport> {
        for (name, value) in [
            ("request_id", &report.request_id),
            ("file_name", &report.file_name),
            ("file_url", &report.file_url),
        ] {
            NonEmptyText::new(value)
                .map_err(|_| PortalError::InvalidInput(format!("{name} cannot be empty")))?;
        }

        let stored = self.store.insert_report(report).await?;
        tracing::info!(
            "report {} uploaded for test request {}",
            stored.id,
            stored.request_id
        );
        Ok(stored)
    }

    pub async fn get_reports_by_request_id(&self, request_id: &str) -> PortalResult<Vec<TestReport>> {
        self.store.reports_for(request_id).await
    }

    /// Loads the list for `filter` and the stats together, as two independent reads.
    pub async fn refresh(&self, filter: StatusFilter) -> PortalResult<DashboardSnapshot> {
        let (requests, stats) =
            tokio::join!(self.get_test_requests(filter), self.get_dashboard_stats());
        Ok(DashboardSnapshot {
            requests: requests?,
            stats: stats?,
        })
    }
}
