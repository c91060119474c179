use crate::auth::{AuthGate, AuthenticatedUser};
use crate::catalog::{Catalog, catalog};
use crate::models::{SiteMetadata, UploadedPhoto};
use crate::services::clipboard::{ClipboardSink, ExportResult, export};
use crate::services::webhook::WebhookClient;
use crate::services::wizard::{Wizard, WizardError};
use crate::services::workspace::{ImageFallback, Workspace};
use axum::{
    Router,
    extract::{DefaultBodyLimit, Path, State},
    http::{HeaderMap, StatusCode},
    response::{Html, IntoResponse, Json, Response},
    routing::{delete, get, patch, post, put},
};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::Mutex;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use uuid::Uuid;

#[derive(Clone)]
pub struct AppState {
    pub webhook: Arc<WebhookClient>,
    pub auth: Arc<dyn AuthGate>,
    pub clipboard: Arc<dyn ClipboardSink>,
    pub sessions: Sessions,
    pub image_fallback: ImageFallback,
    pub body_limit: usize,
}

pub type Sessions = Arc<Mutex<HashMap<Uuid, Session>>>;

/// A wizard and the last time any request reached it.
pub struct Session {
    wizard: Wizard,
    touched: Instant,
}

impl Session {
    fn new(wizard: Wizard) -> Self {
        Self {
            wizard,
            touched: Instant::now(),
        }
    }

    fn touch(&mut self) -> &mut Wizard {
        self.touched = Instant::now();
        &mut self.wizard
    }
}

/// Drops sessions untouched for at least `ttl` as of `now`. Sessions with a
/// generation in flight are kept. Returns how many were dropped.
pub async fn evict_idle(sessions: &Sessions, ttl: Duration, now: Instant) -> usize {
    let mut sessions = sessions.lock().await;
    let before = sessions.len();
    sessions.retain(|id, session| {
        let idle = now.saturating_duration_since(session.touched);
        let keep = idle < ttl || session.wizard.is_generating();
        if !keep {
            tracing::info!(wizard = %id, idle_secs = idle.as_secs(), "idle session evicted");
        }
        keep
    });
    before - sessions.len()
}

/// Sweeps idle sessions every `ttl / 4` (at least once a second) until the
/// runtime shuts down.
pub fn spawn_session_sweeper(sessions: Sessions, ttl: Duration) -> tokio::task::JoinHandle<()> {
    let period = (ttl / 4).max(Duration::from_secs(1));
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(period);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        loop {
            interval.tick().await;
            let evicted = evict_idle(&sessions, ttl, Instant::now()).await;
            if evicted > 0 {
                tracing::debug!(evicted, "session sweep finished");
            }
        }
    })
}

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("인증이 필요합니다.")]
    Unauthorized,
    #[error("session not found")]
    SessionNotFound,
    #[error(transparent)]
    Wizard(#[from] WizardError),
    #[error("export failed: {0}")]
    Export(#[from] tokio::task::JoinError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::Unauthorized => StatusCode::UNAUTHORIZED,
            ApiError::SessionNotFound => StatusCode::NOT_FOUND,
            ApiError::Wizard(WizardError::MissingFields(_) | WizardError::NoCompletePairs) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Wizard(_) => StatusCode::CONFLICT,
            ApiError::Export(_) => StatusCode::INTERNAL_SERVER_ERROR,
        };
        (status, Json(json!({ "message": self.to_string() }))).into_response()
    }
}

#[derive(Debug, Deserialize)]
pub struct UploadRequest {
    pub files: Vec<UploadedPhoto>,
}

/// One user action in the editor.
#[derive(Debug, Deserialize)]
#[serde(tag = "op", rename_all = "camelCase")]
pub enum WorkspaceEdit {
    EditTitle { text: String },
    EditHashtags { text: String },
    EditSection { id: Uuid, html: String },
    RemoveSection { id: Uuid },
    InsertImage { index: usize, image: String },
    MoveSection { from: usize, to: usize },
}

pub fn router(state: AppState) -> Router {
    let body_limit = state.body_limit;
    Router::new()
        .route("/", get(index))
        .route("/health", get(health_check))
        .route("/api/user", get(current_user))
        .route("/api/options", get(options))
        .route("/api/sessions", post(create_session))
        .route("/api/sessions/:id", get(get_session).delete(delete_session))
        .route("/api/sessions/:id/metadata", put(submit_metadata))
        .route("/api/sessions/:id/photos", post(upload_photos).delete(clear_photos))
        .route("/api/sessions/:id/photos/:pair_id", delete(remove_photo))
        .route("/api/sessions/:id/generate", post(generate))
        .route("/api/sessions/:id/workspace", patch(edit_workspace))
        .route("/api/sessions/:id/export", post(export_post))
        .route("/api/sessions/:id/back", post(go_back))
        .route("/api/sessions/:id/complete", post(complete))
        .route("/api/sessions/:id/reset", post(reset))
        .with_state(state)
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(
            CorsLayer::new()
                .allow_origin(tower_http::cors::Any)
                .allow_methods(tower_http::cors::AllowMethods::any())
                .allow_headers(tower_http::cors::AllowHeaders::any()),
        )
}

async fn index() -> Html<&'static str> {
    Html(
        r#"
    <!DOCTYPE html>
    <html>
    <head>
        <title>K-COAT Studio</title>
        <meta charset="utf-8">
        <style>
            body { font-family: Arial, sans-serif; margin: 40px; }
            .info-box { background-color: #fff4ef; padding: 20px; border-radius: 8px; margin: 20px 0; }
            .endpoint { background-color: #f5f5f5; padding: 10px; margin: 10px 0; border-radius: 4px; font-family: monospace; }
        </style>
    </head>
    <body>
        <h1>K-COAT Studio</h1>

        <div class="info-box">
            <h2>Service Information</h2>
            <p>Collects site details and before/after photos, sends them to the blog generation webhook
            and keeps the returned post editable until it is copied to the blog.</p>
        </div>

        <h2>Available Endpoints:</h2>
        <div class="endpoint">GET /health - Health check</div>
        <div class="endpoint">GET /api/options - Products and issue tags</div>
        <div class="endpoint">POST /api/sessions - Start a wizard</div>
        <div class="endpoint">DELETE /api/sessions/:id - Discard a wizard</div>
        <div class="endpoint">PUT /api/sessions/:id/metadata - Step 1: site details</div>
        <div class="endpoint">POST /api/sessions/:id/photos - Step 2: upload photos (paired by file name)</div>
        <div class="endpoint">POST /api/sessions/:id/generate - Step 3: generate the post</div>
        <div class="endpoint">PATCH /api/sessions/:id/workspace - Edit the post</div>
        <div class="endpoint">POST /api/sessions/:id/export - Copy the post as HTML</div>
        <div class="endpoint">POST /api/sessions/:id/complete - Step 4: finish</div>
    </body>
    </html>
    "#,
    )
}

async fn health_check() -> &'static str {
    "OK"
}

fn require_user(state: &AppState, headers: &HeaderMap) -> Result<AuthenticatedUser, ApiError> {
    state.auth.authenticate(headers).ok_or(ApiError::Unauthorized)
}

async fn current_user(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<AuthenticatedUser>, ApiError> {
    require_user(&state, &headers).map(Json)
}

async fn options() -> Json<Catalog> {
    Json(catalog())
}

async fn create_session(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<(StatusCode, Json<Wizard>), ApiError> {
    let user = require_user(&state, &headers)?;
    let wizard = Wizard::new(state.image_fallback);
    tracing::info!(wizard = %wizard.id(), user = %user.name, "wizard started");

    state
        .sessions
        .lock()
        .await
        .insert(wizard.id(), Session::new(wizard.clone()));
    Ok((StatusCode::CREATED, Json(wizard)))
}

/// Runs `action` against the session and returns the updated snapshot.
async fn with_wizard<F>(
    state: &AppState,
    headers: &HeaderMap,
    id: Uuid,
    action: F,
) -> Result<Json<Wizard>, ApiError>
where
    F: FnOnce(&mut Wizard) -> Result<(), WizardError>,
{
    require_user(state, headers)?;
    let mut sessions = state.sessions.lock().await;
    let wizard = sessions
        .get_mut(&id)
        .ok_or(ApiError::SessionNotFound)?
        .touch();
    action(wizard)?;
    Ok(Json(wizard.clone()))
}

async fn get_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, |_| Ok(())).await
}

async fn delete_session(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    require_user(&state, &headers)?;
    state
        .sessions
        .lock()
        .await
        .remove(&id)
        .ok_or(ApiError::SessionNotFound)?;
    tracing::info!(wizard = %id, "wizard discarded");
    Ok(StatusCode::NO_CONTENT)
}

async fn submit_metadata(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(metadata): Json<SiteMetadata>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, |wizard| wizard.submit_metadata(metadata)).await
}

async fn upload_photos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(request): Json<UploadRequest>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, |wizard| wizard.add_uploads(request.files)).await
}

async fn clear_photos(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, Wizard::clear_pairs).await
}

async fn remove_photo(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path((id, pair_id)): Path<(Uuid, Uuid)>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, |wizard| wizard.remove_pair(pair_id).map(|_| ())).await
}

async fn generate(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<(StatusCode, Json<Wizard>), ApiError> {
    require_user(&state, &headers)?;

    let (ticket, snapshot) = {
        let mut sessions = state.sessions.lock().await;
        let wizard = sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound)?
            .touch();
        let ticket = wizard.start_generation()?;
        (ticket, wizard.clone())
    };

    let task_state = state.clone();
    tokio::spawn(async move {
        let result = task_state.webhook.submit(&ticket.payload).await;
        let mut sessions = task_state.sessions.lock().await;
        match sessions.get_mut(&id) {
            Some(session) => {
                session.wizard.finish_generation(ticket.cycle, result);
            }
            None => tracing::info!(wizard = %id, "session vanished before generation finished"),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(snapshot)))
}

fn apply_edit(workspace: &mut Workspace, edit: WorkspaceEdit) {
    let applied = match edit {
        WorkspaceEdit::EditTitle { text } => {
            workspace.edit_title(text);
            true
        }
        WorkspaceEdit::EditHashtags { text } => {
            workspace.edit_hashtags(text);
            true
        }
        WorkspaceEdit::EditSection { id, html } => workspace.edit_section_content(id, html),
        WorkspaceEdit::RemoveSection { id } => workspace.remove_section(id),
        WorkspaceEdit::InsertImage { index, image } => {
            workspace.insert_image_at(index, image);
            true
        }
        WorkspaceEdit::MoveSection { from, to } => workspace.move_section(from, to),
    };
    if !applied {
        tracing::debug!("workspace edit did not match any block");
    }
}

async fn edit_workspace(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(edit): Json<WorkspaceEdit>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, |wizard| {
        apply_edit(wizard.workspace_mut()?, edit);
        Ok(())
    })
    .await
}

async fn export_post(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<ExportResult>, ApiError> {
    require_user(&state, &headers)?;

    let workspace = {
        let mut sessions = state.sessions.lock().await;
        let wizard = sessions
            .get_mut(&id)
            .ok_or(ApiError::SessionNotFound)?
            .touch();
        wizard.workspace().cloned().ok_or(WizardError::NoWorkspace)?
    };

    // Clipboard writes block.
    let clipboard = state.clipboard.clone();
    let result =
        tokio::task::spawn_blocking(move || export(&workspace, clipboard.as_ref())).await?;
    Ok(Json(result))
}

async fn go_back(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, Wizard::back).await
}

async fn complete(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, Wizard::complete).await
}

async fn reset(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<Wizard>, ApiError> {
    with_wizard(&state, &headers, id, Wizard::reset).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::TokenGate;
    use crate::services::clipboard::NoClipboard;
    use crate::services::webhook::tests::spawn_stub;
    use axum::body::{Body, to_bytes};
    use axum::http::Request;
    use serde_json::Value;
    use tower::ServiceExt;

    const TOKEN: &str = "Bearer secret";

    async fn state_with_webhook(hook: Router) -> AppState {
        let base = spawn_stub(hook).await;
        AppState {
            webhook: Arc::new(
                WebhookClient::new(format!("{base}/hook"), Some(Duration::from_secs(5))).unwrap(),
            ),
            auth: Arc::new(TokenGate::new(vec!["secret".to_string()])),
            clipboard: Arc::new(NoClipboard),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            image_fallback: ImageFallback::GeneratedThenUploaded,
            body_limit: 16 * 1024 * 1024,
        }
    }

    async fn app_with_webhook(hook: Router) -> Router {
        router(state_with_webhook(hook).await)
    }

    async fn call(
        app: &Router,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let builder = Request::builder()
            .method(method)
            .uri(uri)
            .header("Authorization", TOKEN)
            .header("Content-Type", "application/json");
        let request = match body {
            Some(body) => builder.body(Body::from(body.to_string())).unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn metadata() -> Value {
        json!({
            "buildingName": "반포 래미안",
            "workDate": "2024-05-01",
            "workType": "new",
            "detailedLocation": "베란다 3개소",
            "productType": "premium_zerostop",
            "productColor": "화이트",
            "issues": ["#결로현상"]
        })
    }

    fn uploads() -> Value {
        json!({"files": [
            {"name": "02_after.jpg", "dataUri": "data:image/jpeg;base64,AFTER"},
            {"name": "01_before.jpg", "dataUri": "data:image/jpeg;base64,BEFORE"}
        ]})
    }

    /// Creates a session and walks it to the upload step with one pair.
    async fn session_at_upload(app: &Router) -> String {
        let (status, wizard) = call(app, "POST", "/api/sessions", None).await;
        assert_eq!(status, StatusCode::CREATED);
        let id = wizard["id"].as_str().unwrap().to_string();

        let uri = format!("/api/sessions/{id}/metadata");
        let (status, _) = call(app, "PUT", &uri, Some(metadata())).await;
        assert_eq!(status, StatusCode::OK);
        let uri = format!("/api/sessions/{id}/photos");
        let (status, wizard) = call(app, "POST", &uri, Some(uploads())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wizard["step"], "photoUpload");
        id
    }

    async fn wait_until_settled(app: &Router, id: &str) -> Value {
        for _ in 0..100 {
            let (_, wizard) = call(app, "GET", &format!("/api/sessions/{id}"), None).await;
            if wizard["generating"] == false {
                return wizard;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        panic!("generation never settled");
    }

    #[tokio::test]
    async fn requests_without_token_are_rejected() {
        let app = app_with_webhook(Router::new()).await;
        let request = Request::builder()
            .method("POST")
            .uri("/api/sessions")
            .body(Body::empty())
            .unwrap();

        let response = app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);

        let (status, user) = call(&app, "GET", "/api/user", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(user["name"], "token-1");
    }

    #[tokio::test]
    async fn full_generation_edit_and_export() {
        let hook = Router::new().route(
            "/hook",
            post(|Json(body): Json<Value>| async move {
                assert_eq!(body["photoSets"][0]["before"], "data:image/jpeg;base64,BEFORE");
                Json(json!([{
                    "title": "T",
                    "인트로": "<p>intro</p>",
                    "FAQ": "<p>faq</p>",
                    "해시태그": "#a #b"
                }]))
            }),
        );
        let app = app_with_webhook(hook).await;
        let id = session_at_upload(&app).await;

        let uri = format!("/api/sessions/{id}/generate");
        let (status, wizard) = call(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(wizard["step"], "editing");

        let wizard = wait_until_settled(&app, &id).await;
        let workspace = &wizard["workspace"];
        assert_eq!(workspace["title"], "T");
        assert_eq!(workspace["hashtags"], "#a #b");
        assert_eq!(workspace["images"], json!(["data:image/jpeg;base64,AFTER"]));
        let faq_id = workspace["blocks"][1]["id"].as_str().unwrap().to_string();

        let (status, wizard) = call(
            &app,
            "PATCH",
            &format!("/api/sessions/{id}/workspace"),
            Some(json!({"op": "insertImage", "index": 1, "image": "http://x/a.png"})),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wizard["workspace"]["blocks"][1]["kind"], "image");

        call(
            &app,
            "PATCH",
            &format!("/api/sessions/{id}/workspace"),
            Some(json!({"op": "removeSection", "id": faq_id})),
        )
        .await;

        let uri = format!("/api/sessions/{id}/export");
        let (status, exported) = call(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(exported["copied"], false);
        let html = exported["html"].as_str().unwrap();
        assert!(html.contains("<p>intro</p>"));
        assert!(html.contains("http://x/a.png"));
        assert!(!html.contains("<p>faq</p>"));

        let uri = format!("/api/sessions/{id}/complete");
        let (status, wizard) = call(&app, "POST", &uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wizard["step"], "done");

        let (_, wizard) = call(&app, "POST", &format!("/api/sessions/{id}/reset"), None).await;
        assert_eq!(wizard["step"], "metadataEntry");
        assert_eq!(wizard["workspace"], Value::Null);
    }

    #[tokio::test]
    async fn webhook_failure_returns_to_upload_step() {
        let hook = Router::new().route(
            "/hook",
            post(|| async { (StatusCode::INTERNAL_SERVER_ERROR, "server error") }),
        );
        let app = app_with_webhook(hook).await;
        let id = session_at_upload(&app).await;

        call(&app, "POST", &format!("/api/sessions/{id}/generate"), None).await;
        let wizard = wait_until_settled(&app, &id).await;

        assert_eq!(wizard["step"], "photoUpload");
        assert_eq!(wizard["workspace"], Value::Null);
        assert!(wizard["lastError"].is_string());

        let (status, _) = call(&app, "POST", &format!("/api/sessions/{id}/export"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn second_generate_while_in_flight_conflicts() {
        let hook = Router::new().route(
            "/hook",
            post(|| async {
                tokio::time::sleep(Duration::from_millis(300)).await;
                Json(json!({"html": "<p>late</p>"}))
            }),
        );
        let app = app_with_webhook(hook).await;
        let id = session_at_upload(&app).await;

        let (status, _) = call(&app, "POST", &format!("/api/sessions/{id}/generate"), None).await;
        assert_eq!(status, StatusCode::ACCEPTED);
        let (status, _) = call(&app, "POST", &format!("/api/sessions/{id}/generate"), None).await;
        assert_eq!(status, StatusCode::CONFLICT);

        // Abandon the request; its late response must not revive step 3.
        let (status, wizard) = call(&app, "POST", &format!("/api/sessions/{id}/back"), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wizard["step"], "photoUpload");

        tokio::time::sleep(Duration::from_millis(500)).await;
        let (_, wizard) = call(&app, "GET", &format!("/api/sessions/{id}"), None).await;
        assert_eq!(wizard["step"], "photoUpload");
        assert_eq!(wizard["workspace"], Value::Null);
    }

    #[tokio::test]
    async fn invalid_metadata_and_unknown_session() {
        let app = app_with_webhook(Router::new()).await;
        let (_, wizard) = call(&app, "POST", "/api/sessions", None).await;
        let id = wizard["id"].as_str().unwrap();

        let (status, body) = call(
            &app,
            "PUT",
            &format!("/api/sessions/{id}/metadata"),
            Some(json!({"buildingName": "x"})),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert!(body["message"].as_str().unwrap().contains("workDate"));

        let uri = format!("/api/sessions/{}", Uuid::new_v4());
        let (status, _) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, options) = call(&app, "GET", "/api/options", None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(options["products"].as_array().unwrap().len(), 4);
    }

    #[tokio::test]
    async fn every_edit_op_reaches_the_workspace() {
        let hook = Router::new().route(
            "/hook",
            post(|| async {
                Json(json!({"title": "T", "인트로": "<p>a</p>", "FAQ": "<p>b</p>"}))
            }),
        );
        let app = app_with_webhook(hook).await;
        let id = session_at_upload(&app).await;
        call(&app, "POST", &format!("/api/sessions/{id}/generate"), None).await;
        let wizard = wait_until_settled(&app, &id).await;
        let intro_id = wizard["workspace"]["blocks"][0]["id"].clone();
        let uri = format!("/api/sessions/{id}/workspace");

        let (status, wizard) =
            call(&app, "PATCH", &uri, Some(json!({"op": "editTitle", "text": "새 제목"}))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wizard["workspace"]["title"], "새 제목");

        let edit = json!({"op": "editHashtags", "text": "#x #y"});
        let (_, wizard) = call(&app, "PATCH", &uri, Some(edit)).await;
        assert_eq!(wizard["workspace"]["hashtags"], "#x #y");

        let edit = json!({"op": "editSection", "id": intro_id, "html": "<p>고침</p>"});
        let (_, wizard) = call(&app, "PATCH", &uri, Some(edit)).await;
        assert_eq!(wizard["workspace"]["blocks"][0]["content"], "<p>고침</p>");

        let edit = json!({"op": "moveSection", "from": 0, "to": 2});
        let (_, wizard) = call(&app, "PATCH", &uri, Some(edit)).await;
        let blocks = &wizard["workspace"]["blocks"];
        assert_eq!(blocks[0]["content"], "<p>b</p>");
        assert_eq!(blocks[1]["id"], intro_id);

        let before = wizard["workspace"].clone();
        for edit in [
            json!({"op": "editSection", "id": Uuid::new_v4(), "html": "<p>lost</p>"}),
            json!({"op": "removeSection", "id": Uuid::new_v4()}),
            json!({"op": "moveSection", "from": 9, "to": 0}),
        ] {
            let (status, wizard) = call(&app, "PATCH", &uri, Some(edit)).await;
            assert_eq!(status, StatusCode::OK);
            assert_eq!(wizard["workspace"], before);
        }

        let (status, _) = call(&app, "PATCH", &uri, Some(json!({"op": "shuffle"}))).await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    }

    #[tokio::test]
    async fn uploads_larger_than_two_megabytes_are_accepted() {
        let app = app_with_webhook(Router::new()).await;
        let (_, wizard) = call(&app, "POST", "/api/sessions", None).await;
        let id = wizard["id"].as_str().unwrap().to_string();
        call(&app, "PUT", &format!("/api/sessions/{id}/metadata"), Some(metadata())).await;

        let photo = format!("data:image/jpeg;base64,{}", "A".repeat(1_500_000));
        let files = json!({"files": [
            {"name": "01_before.jpg", "dataUri": photo},
            {"name": "02_after.jpg", "dataUri": photo}
        ]});
        let uri = format!("/api/sessions/{id}/photos");
        let (status, wizard) = call(&app, "POST", &uri, Some(files.clone())).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(wizard["photoPairs"].as_array().unwrap().len(), 1);

        let mut state = state_with_webhook(Router::new()).await;
        state.body_limit = 1024 * 1024;
        let small = router(state);
        let (_, wizard) = call(&small, "POST", "/api/sessions", None).await;
        let id = wizard["id"].as_str().unwrap();
        let uri = format!("/api/sessions/{id}/photos");
        let (status, _) = call(&small, "POST", &uri, Some(files)).await;
        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
    }

    #[tokio::test]
    async fn deleted_session_is_gone() {
        let app = app_with_webhook(Router::new()).await;
        let (_, wizard) = call(&app, "POST", "/api/sessions", None).await;
        let uri = format!("/api/sessions/{}", wizard["id"].as_str().unwrap());

        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);
        let (status, _) = call(&app, "GET", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "DELETE", &uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn idle_sessions_are_evicted() {
        let state = state_with_webhook(Router::new()).await;
        let app = router(state.clone());
        let ttl = Duration::from_secs(60);

        let (_, idle) = call(&app, "POST", "/api/sessions", None).await;
        let (_, busy) = call(&app, "POST", "/api/sessions", None).await;
        let idle_uri = format!("/api/sessions/{}", idle["id"].as_str().unwrap());
        let busy_uri = format!("/api/sessions/{}", busy["id"].as_str().unwrap());

        assert_eq!(evict_idle(&state.sessions, ttl, Instant::now()).await, 0);

        // Touching one session moves its deadline, the other stays where it was.
        tokio::time::sleep(Duration::from_millis(5)).await;
        let (status, _) = call(&app, "GET", &busy_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        let idle_touched = {
            let sessions = state.sessions.lock().await;
            let id: Uuid = idle["id"].as_str().unwrap().parse().unwrap();
            sessions[&id].touched
        };

        let evicted = evict_idle(&state.sessions, ttl, idle_touched + ttl).await;
        assert_eq!(evicted, 1);
        let (status, _) = call(&app, "GET", &idle_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        let (status, _) = call(&app, "GET", &busy_uri, None).await;
        assert_eq!(status, StatusCode::OK);

        let later = Instant::now() + ttl * 2;
        assert_eq!(evict_idle(&state.sessions, ttl, later).await, 1);
        assert!(state.sessions.lock().await.is_empty());
    }
}
