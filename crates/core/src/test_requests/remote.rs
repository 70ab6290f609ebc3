//! Test request store backed by remote PostgREST tables (`/rest/v1/{table}`).

use super::TestRequestStore;
use crate::config::RemoteTableConfig;
use crate::constants::{TEST_REPORTS_TABLE, TEST_REQUESTS_TABLE};
use crate::{PortalError, PortalResult};
use api_shared::{NewTestReport, TestReport, TestRequest, TestRequestStatus};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::time::Duration;

#[derive(Deserialize)]
struct StatusRow {
    status: TestRequestStatus,
}

#[derive(Serialize)]
struct StatusPatch {
    status: TestRequestStatus,
    updated_at: DateTime<Utc>,
}

/// PostgREST client for the `test_requests` and `test_reports` tables.
#[derive(Clone, Debug)]
pub struct RemoteTableStore {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

impl RemoteTableStore {
    pub fn new(cfg: &RemoteTableConfig, timeout: Duration) -> PortalResult<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: reqwest::Method, table: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    async fn rows<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
        what: &str,
    ) -> PortalResult<Vec<T>> {
        let response = builder
            .send()
            .await?
            .error_for_status()
            .map_err(|e| PortalError::RemoteCallFailure(format!("{what}: {e}")))?;
        Ok(response.json::<Vec<T>>().await?)
    }
}

fn eq(value: impl std::fmt::Display) -> String {
    format!("eq.{value}")
}

#[async_trait]
impl TestRequestStore for RemoteTableStore {
    async fn list(&self, status: Option<TestRequestStatus>) -> PortalResult<Vec<TestRequest>> {
        let mut query = vec![
            ("select", "*".to_string()),
            ("order", "created_at.desc".to_string()),
        ];
        if let Some(status) = status {
            query.push(("status", eq(status.as_str())));
        }
        let builder = self
            .request(reqwest::Method::GET, TEST_REQUESTS_TABLE)
            .query(&query);
        self.rows(builder, "list test requests").await
    }

    async fn statuses(&self) -> PortalResult<Vec<TestRequestStatus>> {
        let builder = self
            .request(reqwest::Method::GET, TEST_REQUESTS_TABLE)
            .query(&[("select", "status")]);
        let rows: Vec<StatusRow> = self.rows(builder, "count test requests").await?;
        Ok(rows.into_iter().map(|r| r.status).collect())
    }

    async fn get(&self, id: &str) -> PortalResult<Option<TestRequest>> {
        let builder = self
            .request(reqwest::Method::GET, TEST_REQUESTS_TABLE)
            .query(&[("select", "*".to_string()), ("id", eq(id))]);
        let rows: Vec<TestRequest> = self.rows(builder, "get test request").await?;
        Ok(rows.into_iter().next())
    }

    async fn update_status(
        &self,
        id: &str,
        status: TestRequestStatus,
        updated_at: DateTime<Utc>,
    ) -> PortalResult<()> {
        let builder = self
            .request(reqwest::Method::PATCH, TEST_REQUESTS_TABLE)
            .query(&[("id", eq(id))])
            .header("Prefer", "return=representation")
            .json(&StatusPatch { status, updated_at });
        let rows: Vec<TestRequest> = self.rows(builder, "update test request").await?;
        if rows.is_empty() {
            return Err(PortalError::NotFound(format!("test request {id}")));
        }
        Ok(())
    }

    async fn insert_report(&self, report: NewTestReport) -> PortalResult<TestReport> {
        let builder = self
            .request(reqwest::Method::POST, TEST_REPORTS_TABLE)
            .header("Prefer", "return=representation")
            .json(&report);
        let rows: Vec<TestReport> = self.rows(builder, "insert test report").await?;
        rows.into_iter().next().ok_or_else(|| {
            PortalError::RemoteCallFailure("insert test report: no row returned".into())
        })
    }

    async fn reports_for(&self, request_id: &str) -> PortalResult<Vec<TestReport>> {
        let builder = self
            .request(reqwest::Method::GET, TEST_REPORTS_TABLE)
            .query(&[
                ("select", "*".to_string()),
                ("request_id", eq(request_id)),
                ("order", "uploaded_at.desc".to_string()),
            ]);
        self.rows(builder, "list test reports").await
    }
}
