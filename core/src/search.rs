//! Folder and dashboard search.

use serde::{Deserialize, Serialize};

use crate::client::Client;
use crate::error::ClientError;
use crate::http::{HttpMethod, Query};

/// Page size used when listing every dashboard.
pub const DASHBOARD_PAGE_LIMIT: usize = 1000;

/// One hit from `/api/search`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct FolderDashboardSearchResponse {
    pub id: i64,
    pub uid: String,
    pub title: String,
    pub uri: String,
    pub url: String,
    pub slug: String,
    /// `dash-db` or `dash-folder`.
    #[serde(rename = "type")]
    pub kind: String,
    pub tags: Vec<String>,
    pub is_starred: bool,
    pub folder_id: i64,
    pub folder_uid: String,
    pub folder_title: String,
    pub folder_url: String,
}

impl Client {
    /// Raw search with caller-supplied parameters.
    pub fn folder_dashboard_search(
        &self,
        params: &Query,
    ) -> Result<Vec<FolderDashboardSearchResponse>, ClientError> {
        self.request::<(), _>(HttpMethod::Get, "/api/search", params, None)
    }

    /// Every dashboard visible to the caller, fetched page by page.
    pub fn dashboards(&self) -> Result<Vec<FolderDashboardSearchResponse>, ClientError> {
        self.dashboards_paged(DASHBOARD_PAGE_LIMIT)
    }

    pub fn dashboards_by_ids(
        &self,
        ids: &[i64],
    ) -> Result<Vec<FolderDashboardSearchResponse>, ClientError> {
        let ids = serde_json::to_string(ids).map_err(ClientError::Serialization)?;
        let mut params = Query::new();
        params.set("type", "dash-db").set("dashboardIds", ids);
        self.folder_dashboard_search(&params)
    }

    fn dashboards_paged(
        &self,
        limit: usize,
    ) -> Result<Vec<FolderDashboardSearchResponse>, ClientError> {
        let mut params = Query::new();
        params.set("type", "dash-db").set("limit", limit.to_string());

        let mut dashboards = Vec::new();
        let mut page = 0;
        loop {
            page += 1;
            params.set("page", page.to_string());
            let batch = self.folder_dashboard_search(&params)?;
            let full = batch.len() >= limit;
            dashboards.extend(batch);
            if !full {
                return Ok(dashboards);
            }
        }
    }
}
