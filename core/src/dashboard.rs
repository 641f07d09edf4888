//! Dashboard endpoints: save, import, fetch and delete.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::client::Client;
use crate::error::ClientError;
use crate::http::{HttpMethod, Query};

/// Dashboard metadata as returned alongside the model.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardMeta {
    pub is_starred: bool,
    pub slug: String,
    #[serde(rename = "folderId")]
    pub folder: i64,
    pub url: String,
}

/// Response to creating or saving a dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashboardSaveResponse {
    pub slug: String,
    pub id: i64,
    pub uid: String,
    pub status: String,
    pub version: i64,
}

/// A dashboard with its JSON model and placement.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct Dashboard {
    pub meta: DashboardMeta,
    #[serde(rename = "dashboard")]
    pub model: Map<String, Value>,
    pub folder_id: i64,
    pub folder_uid: String,
    pub overwrite: bool,
    /// Commit message; only meaningful when saving.
    pub message: String,
}

/// Value bound to one `__inputs` entry of an exported dashboard.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardImportInput {
    /// e.g. `DS_PROMETHEUS`
    pub name: String,
    pub plugin_id: String,
    /// e.g. `datasource`
    #[serde(rename = "type")]
    pub kind: String,
    pub value: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardImportRequest {
    pub dashboard: Map<String, Value>,
    pub folder_uid: String,
    pub inputs: Vec<DashboardImportInput>,
    pub overwrite: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct DashboardImportResponse {
    pub uid: String,
    pub plugin_id: String,
    pub title: String,
    pub imported: bool,
    pub imported_uri: String,
    pub imported_url: String,
    pub slug: String,
    pub dashboard_id: i64,
    pub folder_id: i64,
    pub folder_uid: String,
    pub imported_revision: i64,
    pub revision: i64,
    pub description: String,
    pub path: String,
    pub removed: bool,
}

#[derive(Serialize)]
struct LegacySave<'a> {
    dashboard: &'a Map<String, Value>,
    overwrite: bool,
}

impl Client {
    /// Create or update a dashboard.
    pub fn new_dashboard(&self, dashboard: &Dashboard) -> Result<DashboardSaveResponse, ClientError> {
        self.request(HttpMethod::Post, "/api/dashboards/db", &Query::new(), Some(dashboard))
    }

    /// Save a bare dashboard model.
    #[deprecated(note = "use `new_dashboard`")]
    pub fn save_dashboard(
        &self,
        model: &Map<String, Value>,
        overwrite: bool,
    ) -> Result<DashboardSaveResponse, ClientError> {
        let body = LegacySave {
            dashboard: model,
            overwrite,
        };
        self.request(HttpMethod::Post, "/api/dashboards/db", &Query::new(), Some(&body))
    }

    pub fn import_dashboard(
        &self,
        request: &DashboardImportRequest,
    ) -> Result<DashboardImportResponse, ClientError> {
        self.request(HttpMethod::Post, "/api/dashboards/import", &Query::new(), Some(request))
    }

    pub fn dashboard_by_uid(&self, uid: &str) -> Result<Dashboard, ClientError> {
        self.fetch_dashboard(&format!("/api/dashboards/uid/{uid}"))
    }

    /// Fetch a dashboard by slug. Grafana 5+ addresses dashboards by uid.
    #[deprecated(note = "use `dashboard_by_uid`")]
    pub fn dashboard(&self, slug: &str) -> Result<Dashboard, ClientError> {
        self.fetch_dashboard(&format!("/api/dashboards/db/{slug}"))
    }

    pub fn delete_dashboard_by_uid(&self, uid: &str) -> Result<(), ClientError> {
        self.request_no_content::<()>(
            HttpMethod::Delete,
            &format!("/api/dashboards/uid/{uid}"),
            &Query::new(),
            None,
        )
    }

    #[deprecated(note = "use `delete_dashboard_by_uid`")]
    pub fn delete_dashboard(&self, slug: &str) -> Result<(), ClientError> {
        self.request_no_content::<()>(
            HttpMethod::Delete,
            &format!("/api/dashboards/db/{slug}"),
            &Query::new(),
            None,
        )
    }

    fn fetch_dashboard(&self, path: &str) -> Result<Dashboard, ClientError> {
        let mut dashboard: Dashboard = self.request::<(), _>(HttpMethod::Get, path, &Query::new(), None)?;
        dashboard.folder_id = dashboard.meta.folder;
        Ok(dashboard)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use pretty_assertions::assert_eq;
    use serde_json::json;

    use super::*;
    use crate::client::testing::{json, RecordingSleeper, ScriptedTransport};
    use crate::config::Config;

    fn client(transport: &Arc<ScriptedTransport>) -> Client {
        let config = Config {
            transport: Some(transport.clone()),
            sleeper: Arc::new(RecordingSleeper::default()),
            ..Config::default()
        };
        Client::new("http://localhost:3000", config).unwrap()
    }

    fn object(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            other => panic!("expected object, got {other}"),
        }
    }

    #[test]
    fn dashboard_by_uid_copies_folder_from_meta() {
        let transport = Arc::new(ScriptedTransport::new(vec![json(
            200,
            r#"{"meta":{"isStarred":true,"slug":"cpu","folderId":12,"url":"/d/abc/cpu"},
                "dashboard":{"uid":"abc","title":"CPU"}}"#,
        )]));
        let dashboard = client(&transport).dashboard_by_uid("abc").unwrap();

        assert_eq!(transport.sent()[0].url, "http://localhost:3000/api/dashboards/uid/abc");
        assert_eq!(dashboard.folder_id, 12);
        assert_eq!(dashboard.meta.slug, "cpu");
        assert!(dashboard.meta.is_starred);
        assert_eq!(dashboard.model["title"], "CPU");
    }

    #[test]
    fn new_dashboard_posts_full_payload() {
        let transport = Arc::new(ScriptedTransport::new(vec![json(
            200,
            r#"{"id":1,"uid":"abc","slug":"cpu","status":"success","version":1,"url":"/d/abc/cpu"}"#,
        )]));
        let dashboard = Dashboard {
            model: object(json!({"title": "CPU"})),
            folder_uid: "infra".to_string(),
            overwrite: true,
            message: "initial".to_string(),
            ..Dashboard::default()
        };
        let saved = client(&transport).new_dashboard(&dashboard).unwrap();

        assert_eq!(
            saved,
            DashboardSaveResponse {
                slug: "cpu".to_string(),
                id: 1,
                uid: "abc".to_string(),
                status: "success".to_string(),
                version: 1,
            }
        );
        let sent = transport.sent();
        assert_eq!(sent[0].method, HttpMethod::Post);
        let body: Value = serde_json::from_slice(sent[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body["dashboard"]["title"], "CPU");
        assert_eq!(body["folderUid"], "infra");
        assert_eq!(body["overwrite"], true);
        assert_eq!(body["message"], "initial");
    }

    #[test]
    #[allow(deprecated)]
    fn save_dashboard_wraps_model() {
        let transport = Arc::new(ScriptedTransport::new(vec![json(200, r#"{"uid":"x"}"#)]));
        let model = object(json!({"title": "Legacy"}));
        client(&transport).save_dashboard(&model, false).unwrap();

        let body: Value = serde_json::from_slice(transport.sent()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(body, json!({"dashboard": {"title": "Legacy"}, "overwrite": false}));
    }

    #[test]
    fn import_dashboard_serializes_inputs() {
        let transport = Arc::new(ScriptedTransport::new(vec![json(
            200,
            r#"{"uid":"rYdddlPWk","title":"Node Exporter Full","imported":true,"dashboardId":27,"importedRevision":1}"#,
        )]));
        let request = DashboardImportRequest {
            dashboard: object(json!({"title": "Node Exporter Full"})),
            inputs: vec![DashboardImportInput {
                name: "DS_PROMETHEUS".to_string(),
                plugin_id: "prometheus".to_string(),
                kind: "datasource".to_string(),
                value: "6fx8MQL4k".to_string(),
            }],
            overwrite: true,
            ..DashboardImportRequest::default()
        };
        let imported = client(&transport).import_dashboard(&request).unwrap();

        assert_eq!(imported.dashboard_id, 27);
        assert!(imported.imported);
        let body: Value = serde_json::from_slice(transport.sent()[0].body.as_deref().unwrap()).unwrap();
        assert_eq!(
            body["inputs"],
            json!([{"name": "DS_PROMETHEUS", "pluginId": "prometheus", "type": "datasource", "value": "6fx8MQL4k"}])
        );
    }

    #[test]
    fn delete_ignores_response_body() {
        let transport = Arc::new(ScriptedTransport::new(vec![json(
            200,
            r#"{"title":"CPU","message":"Dashboard CPU deleted","id":1}"#,
        )]));
        client(&transport).delete_dashboard_by_uid("abc").unwrap();
        let sent = transport.sent();
        assert_eq!(sent[0].method, HttpMethod::Delete);
        assert!(sent[0].body.is_none());
    }

    #[test]
    #[allow(deprecated)]
    fn slug_endpoints_surface_not_found() {
        let transport = Arc::new(ScriptedTransport::new(vec![
            json(404, r#"{"message":"Dashboard not found"}"#),
            json(404, r#"{"message":"Dashboard not found"}"#),
        ]));
        let client = client(&transport);
        assert!(client.dashboard("cpu").unwrap_err().is_not_found());
        assert!(client.delete_dashboard("cpu").unwrap_err().is_not_found());
        let sent = transport.sent();
        assert_eq!(sent[0].url, "http://localhost:3000/api/dashboards/db/cpu");
        assert_eq!(sent[1].url, "http://localhost:3000/api/dashboards/db/cpu");
    }
}
