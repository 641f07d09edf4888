use std::{
    collections::HashMap,
    sync::{
        atomic::{AtomicI64, AtomicU32, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, Request, State},
    http::{HeaderMap, StatusCode},
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

pub const ORG_ID_HEADER: &str = "x-grafana-org-id";

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StoredDashboard {
    pub id: i64,
    pub uid: String,
    pub slug: String,
    pub title: String,
    pub folder_id: i64,
    pub folder_uid: String,
    pub tags: Vec<String>,
    pub version: i64,
    pub model: Map<String, Value>,
}

impl StoredDashboard {
    fn url(&self) -> String {
        format!("/d/{}/{}", self.uid, self.slug)
    }

    fn search_hit(&self) -> Value {
        json!({
            "id": self.id,
            "uid": self.uid,
            "title": self.title,
            "uri": format!("db/{}", self.slug),
            "url": self.url(),
            "slug": self.slug,
            "type": "dash-db",
            "tags": self.tags,
            "isStarred": false,
            "folderId": self.folder_id,
            "folderUid": self.folder_uid,
            "folderTitle": "",
            "folderUrl": "",
        })
    }
}

/// Knobs for a mock instance.
#[derive(Clone, Debug)]
pub struct MockOptions {
    /// Number of leading requests answered with 503.
    pub outage: u32,
    /// Credentials accepted on `Authorization: Basic`.
    pub admin_user: String,
    pub admin_password: String,
}

impl Default for MockOptions {
    fn default() -> Self {
        Self {
            outage: 0,
            admin_user: "admin".to_string(),
            admin_password: "admin".to_string(),
        }
    }
}

#[derive(Default)]
pub struct AppState {
    dashboards: RwLock<HashMap<String, StoredDashboard>>,
    next_id: AtomicI64,
    /// Requests still to be answered with 503.
    outage: AtomicU32,
    /// `user:password` expected in basic auth.
    credentials: String,
}

pub type Db = Arc<AppState>;

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveDashboard {
    pub dashboard: Map<String, Value>,
    #[serde(default)]
    pub folder_id: i64,
    #[serde(default)]
    pub folder_uid: String,
    #[serde(default)]
    pub overwrite: bool,
    #[serde(default)]
    pub message: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportInput {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportDashboard {
    pub dashboard: Map<String, Value>,
    #[serde(default)]
    pub folder_uid: String,
    #[serde(default)]
    pub inputs: Vec<ImportInput>,
    #[serde(default)]
    pub overwrite: bool,
}

#[derive(Deserialize)]
pub struct SearchParams {
    #[serde(rename = "type")]
    pub kind: Option<String>,
    pub query: Option<String>,
    #[serde(rename = "dashboardIds")]
    pub dashboard_ids: Option<String>,
    pub limit: Option<usize>,
    pub page: Option<usize>,
}

type ApiResult = Result<Json<Value>, (StatusCode, Json<Value>)>;

pub fn app() -> Router {
    app_with(MockOptions::default())
}

/// Router whose first `failures` requests are answered with 503.
pub fn app_with_outage(failures: u32) -> Router {
    app_with(MockOptions {
        outage: failures,
        ..MockOptions::default()
    })
}

pub fn app_with(options: MockOptions) -> Router {
    let db: Db = Arc::new(AppState {
        outage: AtomicU32::new(options.outage),
        credentials: format!("{}:{}", options.admin_user, options.admin_password),
        ..AppState::default()
    });
    Router::new()
        .route("/api/dashboards/db", post(save_dashboard))
        .route(
            "/api/dashboards/db/{slug}",
            get(get_dashboard_by_slug).delete(delete_dashboard_by_slug),
        )
        .route(
            "/api/dashboards/uid/{uid}",
            get(get_dashboard_by_uid).delete(delete_dashboard_by_uid),
        )
        .route("/api/dashboards/import", post(import_dashboard))
        .route("/api/search", get(search))
        .layer(middleware::from_fn_with_state(db.clone(), guard))
        .with_state(db)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    serve(listener, app()).await
}

pub async fn serve(listener: TcpListener, router: Router) -> Result<(), std::io::Error> {
    axum::serve(listener, router).await
}

fn api_error(status: StatusCode, message: &str) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "message": message })))
}

/// Injected outages first, then basic-auth credentials, then the
/// service-account-token rule: a bearer token is bound to one organization
/// and may not be combined with an org override.
async fn guard(State(db): State<Db>, headers: HeaderMap, request: Request, next: Next) -> Response {
    let in_outage = db
        .outage
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |n| n.checked_sub(1))
        .is_ok();
    if in_outage {
        return api_error(StatusCode::SERVICE_UNAVAILABLE, "Service unavailable").into_response();
    }

    let authorization = headers.get("authorization").and_then(|v| v.to_str().ok());
    if let Some(encoded) = authorization.and_then(|v| v.strip_prefix("Basic ")) {
        let decoded = STANDARD.decode(encoded.trim()).ok();
        if decoded.as_deref() != Some(db.credentials.as_bytes()) {
            return api_error(StatusCode::UNAUTHORIZED, "Invalid username or password").into_response();
        }
    }

    let bearer = authorization.is_some_and(|v| v.starts_with("Bearer "));
    if bearer && headers.contains_key(ORG_ID_HEADER) {
        return api_error(
            StatusCode::UNAUTHORIZED,
            "Organization id override is not allowed for service account tokens",
        )
        .into_response();
    }
    next.run(request).await
}

pub fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for c in title.chars() {
        if c.is_alphanumeric() {
            slug.extend(c.to_lowercase());
        } else if !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_matches('-').to_string()
}

async fn store(
    db: &Db,
    mut model: Map<String, Value>,
    folder_id: i64,
    folder_uid: String,
    overwrite: bool,
) -> Result<StoredDashboard, (StatusCode, Json<Value>)> {
    let title = model
        .get("title")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    if title.trim().is_empty() {
        return Err(api_error(StatusCode::BAD_REQUEST, "Dashboard title cannot be empty"));
    }
    let uid = match model.get("uid").and_then(Value::as_str) {
        Some(uid) if !uid.is_empty() => uid.to_string(),
        _ => Uuid::new_v4().simple().to_string()[..9].to_string(),
    };
    let tags = model
        .get("tags")
        .and_then(Value::as_array)
        .map(|tags| tags.iter().filter_map(Value::as_str).map(str::to_string).collect())
        .unwrap_or_default();

    let mut dashboards = db.dashboards.write().await;
    let (id, version) = match dashboards.get(&uid) {
        Some(_) if !overwrite => {
            return Err((
                StatusCode::PRECONDITION_FAILED,
                Json(json!({
                    "message": "A dashboard with the same uid already exists",
                    "status": "name-exists",
                })),
            ))
        }
        Some(existing) => (existing.id, existing.version + 1),
        None => (db.next_id.fetch_add(1, Ordering::SeqCst) + 1, 1),
    };
    model.insert("uid".to_string(), json!(uid));
    model.insert("id".to_string(), json!(id));
    model.insert("version".to_string(), json!(version));

    let stored = StoredDashboard {
        id,
        slug: slugify(&title),
        uid: uid.clone(),
        title,
        folder_id,
        folder_uid,
        tags,
        version,
        model,
    };
    dashboards.insert(uid, stored.clone());
    Ok(stored)
}

async fn save_dashboard(State(db): State<Db>, Json(input): Json<SaveDashboard>) -> ApiResult {
    let stored = store(&db, input.dashboard, input.folder_id, input.folder_uid, input.overwrite).await?;
    Ok(Json(json!({
        "id": stored.id,
        "uid": stored.uid,
        "url": stored.url(),
        "status": "success",
        "version": stored.version,
        "slug": stored.slug,
    })))
}

/// Replace `${NAME}` placeholders in string values with the bound inputs.
fn substitute(value: &mut Value, inputs: &[ImportInput]) {
    match value {
        Value::String(s) => {
            for input in inputs {
                *s = s.replace(&format!("${{{}}}", input.name), &input.value);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(|v| substitute(v, inputs)),
        Value::Object(map) => map.values_mut().for_each(|v| substitute(v, inputs)),
        _ => {}
    }
}

async fn import_dashboard(State(db): State<Db>, Json(input): Json<ImportDashboard>) -> ApiResult {
    let mut model = input.dashboard;
    model.values_mut().for_each(|v| substitute(v, &input.inputs));
    let stored = store(&db, model, 0, input.folder_uid, input.overwrite).await?;
    Ok(Json(json!({
        "uid": stored.uid,
        "pluginId": "",
        "title": stored.title,
        "imported": true,
        "importedUri": format!("db/{}", stored.slug),
        "importedUrl": stored.url(),
        "slug": stored.slug,
        "dashboardId": stored.id,
        "folderId": stored.folder_id,
        "folderUid": stored.folder_uid,
        "importedRevision": 1,
        "revision": 1,
        "description": "",
        "path": "",
        "removed": false,
    })))
}

fn not_found() -> (StatusCode, Json<Value>) {
    api_error(StatusCode::NOT_FOUND, "Dashboard not found")
}

fn dashboard_with_meta(stored: &StoredDashboard) -> Json<Value> {
    Json(json!({
        "dashboard": stored.model,
        "meta": {
            "isStarred": false,
            "slug": stored.slug,
            "folderId": stored.folder_id,
            "folderUid": stored.folder_uid,
            "url": stored.url(),
            "version": stored.version,
        },
    }))
}

fn deleted(stored: &StoredDashboard) -> Json<Value> {
    Json(json!({
        "title": stored.title,
        "message": format!("Dashboard {} deleted", stored.title),
        "id": stored.id,
    }))
}

async fn get_dashboard_by_uid(State(db): State<Db>, Path(uid): Path<String>) -> ApiResult {
    let dashboards = db.dashboards.read().await;
    dashboards.get(&uid).map(dashboard_with_meta).ok_or_else(not_found)
}

async fn get_dashboard_by_slug(State(db): State<Db>, Path(slug): Path<String>) -> ApiResult {
    let dashboards = db.dashboards.read().await;
    dashboards
        .values()
        .find(|d| d.slug == slug)
        .map(dashboard_with_meta)
        .ok_or_else(not_found)
}

async fn delete_dashboard_by_uid(State(db): State<Db>, Path(uid): Path<String>) -> ApiResult {
    let mut dashboards = db.dashboards.write().await;
    dashboards.remove(&uid).map(|d| deleted(&d)).ok_or_else(not_found)
}

async fn delete_dashboard_by_slug(State(db): State<Db>, Path(slug): Path<String>) -> ApiResult {
    let mut dashboards = db.dashboards.write().await;
    let uid = dashboards
        .values()
        .find(|d| d.slug == slug)
        .map(|d| d.uid.clone())
        .ok_or_else(not_found)?;
    dashboards.remove(&uid).map(|d| deleted(&d)).ok_or_else(not_found)
}

async fn search(State(db): State<Db>, Query(params): Query<SearchParams>) -> ApiResult {
    if params.kind.as_deref().is_some_and(|kind| kind != "dash-db") {
        return Ok(Json(json!([])));
    }
    let ids: Option<Vec<i64>> = match params.dashboard_ids.as_deref() {
        Some(raw) => Some(
            serde_json::from_str(raw)
                .map_err(|_| api_error(StatusCode::BAD_REQUEST, "invalid dashboardIds"))?,
        ),
        None => None,
    };
    let needle = params.query.as_deref().map(str::to_lowercase);

    let dashboards = db.dashboards.read().await;
    let mut hits: Vec<&StoredDashboard> = dashboards
        .values()
        .filter(|d| ids.as_ref().is_none_or(|ids| ids.contains(&d.id)))
        .filter(|d| {
            needle
                .as_deref()
                .is_none_or(|n| d.title.to_lowercase().contains(n))
        })
        .collect();
    hits.sort_by(|a, b| a.title.cmp(&b.title).then(a.id.cmp(&b.id)));

    let limit = params.limit.unwrap_or(1000).max(1);
    let page = params.page.unwrap_or(1).max(1);
    let page_hits: Vec<Value> = hits
        .into_iter()
        .skip((page - 1).saturating_mul(limit))
        .take(limit)
        .map(StoredDashboard::search_hit)
        .collect();
    Ok(Json(Value::Array(page_hits)))
}
