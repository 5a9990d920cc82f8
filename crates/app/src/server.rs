//! HTTP surface over the query, summarization and indexing pipelines.
//!
//! | Method | Path | Description |
//! |--------|------|-------------|
//! | `GET`  | `/` | Health check |
//! | `POST` | `/ask` | Answer a question with sources |
//! | `GET`  | `/summarize` | Summarize every raw document |
//! | `POST` | `/upload-document` | Store a `.pdf`/`.txt` upload and index it |
//! | `POST` | `/index?full=true` | Run indexing explicitly |
//!
//! Every indexing request goes through the one shared [`IndexManager`], which
//! serialises runs.

use axum::{
    extract::{DefaultBodyLimit, Multipart, Query, State},
    http::{HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use doc_rag_core::{
    Answer, AnswerGenerator, DocumentKind, Embedder, IndexManager, IndexingOutcome, QueryPipeline,
    RagError, SummarizationPipeline,
};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tracing::{error, info};

const FRONTEND_ORIGIN: &str = "http://localhost:5173";
const MAX_UPLOAD_BYTES: usize = 50 * 1024 * 1024;

#[derive(Clone)]
pub struct AppState {
    pub raw_dir: PathBuf,
    pub indexer: Arc<IndexManager<dyn Embedder>>,
    pub query: Arc<QueryPipeline<dyn Embedder, dyn AnswerGenerator>>,
    pub summarizer: Arc<SummarizationPipeline<dyn AnswerGenerator>>,
}

pub fn router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(HeaderValue::from_static(FRONTEND_ORIGIN))
        .allow_methods([Method::GET, Method::POST])
        .allow_headers(tower_http::cors::Any);

    Router::new()
        .route("/", get(handle_health))
        .route("/ask", post(handle_ask))
        .route("/summarize", get(handle_summarize))
        .route(
            "/upload-document",
            post(handle_upload).layer(DefaultBodyLimit::max(MAX_UPLOAD_BYTES)),
        )
        .route("/index", post(handle_index))
        .layer(cors)
        .with_state(state)
}

pub async fn run_server(bind_addr: &str, state: AppState) -> anyhow::Result<()> {
    let app = router(state);
    let listener = tokio::net::TcpListener::bind(bind_addr).await?;
    info!(bind = %bind_addr, "http server listening");
    axum::serve(listener, app).await?;
    Ok(())
}

// ============ Errors ============

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
}

struct AppError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

impl AppError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self {
            status: StatusCode::BAD_REQUEST,
            code: "bad_request",
            message: message.into(),
        }
    }
}

impl From<RagError> for AppError {
    fn from(err: RagError) -> Self {
        let (status, code) = match &err {
            RagError::InvalidQuestion(_) => (StatusCode::BAD_REQUEST, "bad_request"),
            RagError::NotFound(_) | RagError::IndexNotFound(_) => (StatusCode::NOT_FOUND, "not_found"),
            RagError::Service { .. } | RagError::Http(_) => (StatusCode::BAD_GATEWAY, "upstream_error"),
            _ => (StatusCode::INTERNAL_SERVER_ERROR, "internal"),
        };
        error!(code, error = %err, "request failed");
        Self {
            status,
            code,
            message: err.to_string(),
        }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        RagError::Io(err).into()
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                code: self.code,
                message: self.message,
            },
        };
        (self.status, Json(body)).into_response()
    }
}

// ============ Handlers ============

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
}

async fn handle_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "RAG backend running",
    })
}

#[derive(Deserialize)]
struct QuestionRequest {
    question: String,
}

async fn handle_ask(
    State(state): State<AppState>,
    Json(request): Json<QuestionRequest>,
) -> Result<Json<Answer>, AppError> {
    let answer = state.query.ask(&request.question).await?;
    Ok(Json(answer))
}

#[derive(Serialize)]
struct SummaryResponse {
    summary: String,
}

async fn handle_summarize(State(state): State<AppState>) -> Result<Json<SummaryResponse>, AppError> {
    let summary = state.summarizer.summarize().await?;
    Ok(Json(SummaryResponse { summary }))
}

#[derive(Deserialize)]
struct IndexParams {
    #[serde(default)]
    full: bool,
}

async fn handle_index(
    State(state): State<AppState>,
    Query(params): Query<IndexParams>,
) -> Result<Json<IndexingOutcome>, AppError> {
    let outcome = state.indexer.run_indexing(!params.full).await?;
    Ok(Json(outcome))
}

#[derive(Serialize)]
struct UploadResponse {
    message: &'static str,
    filename: String,
    path: String,
    indexing: IndexingOutcome,
}

async fn handle_upload(
    State(state): State<AppState>,
    mut multipart: Multipart,
) -> Result<Json<UploadResponse>, AppError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| AppError::bad_request(err.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .and_then(upload_file_name)
            .ok_or_else(|| AppError::bad_request("Only PDF and TXT files allowed"))?;
        let bytes = field
            .bytes()
            .await
            .map_err(|err| AppError::bad_request(err.to_string()))?;

        tokio::fs::create_dir_all(&state.raw_dir).await?;
        let path = state.raw_dir.join(&filename);
        tokio::fs::write(&path, &bytes).await?;
        info!(file = %filename, bytes = bytes.len(), "stored upload");

        let indexing = state.indexer.run_indexing(true).await?;
        return Ok(Json(UploadResponse {
            message: "Document uploaded successfully",
            filename,
            path: path.display().to_string(),
            indexing,
        }));
    }

    Err(AppError::bad_request("multipart field `file` is required"))
}

/// Keeps only the final path component and accepts `.pdf`/`.txt` names.
fn upload_file_name(raw: &str) -> Option<String> {
    let name = Path::new(raw).file_name()?.to_str()?;
    DocumentKind::from_path(Path::new(name))?;
    Some(name.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use axum::body::{to_bytes, Body};
    use axum::http::{header::CONTENT_TYPE, Request};
    use doc_rag_core::{CharacterNgramEmbedder, ChunkingConfig, RagPaths, Retriever};
    use serde_json::Value;
    use std::fs;
    use tempfile::{tempdir, TempDir};
    use tower::util::ServiceExt;

    const BOUNDARY: &str = "doc-rag-test-boundary";

    enum StubGenerator {
        Reply(&'static str),
        Unavailable,
    }

    #[async_trait]
    impl AnswerGenerator for StubGenerator {
        async fn generate(&self, _prompt: &str, _temperature: f32) -> Result<String, RagError> {
            match self {
                Self::Reply(text) => Ok(text.to_string()),
                Self::Unavailable => Err(RagError::Service {
                    backend: "llm".to_string(),
                    details: "503 Service Unavailable".to_string(),
                }),
            }
        }
    }

    fn test_app(generator: StubGenerator) -> (TempDir, RagPaths, Router) {
        let dir = tempdir().unwrap();
        let paths = RagPaths::new(dir.path().join("raw"), dir.path().join("index"));
        let embedder: Arc<dyn Embedder> = Arc::new(CharacterNgramEmbedder::default());
        let generator: Arc<dyn AnswerGenerator> = Arc::new(generator);

        let state = AppState {
            raw_dir: paths.raw_dir.clone(),
            indexer: Arc::new(
                IndexManager::new(paths.clone(), ChunkingConfig::default(), embedder.clone()).unwrap(),
            ),
            query: Arc::new(QueryPipeline::new(
                Retriever::new(paths.index_dir.clone(), embedder),
                generator.clone(),
            )),
            summarizer: Arc::new(SummarizationPipeline::new(paths.raw_dir.clone(), generator)),
        };
        (dir, paths, router(state))
    }

    fn upload_request(file_name: &str, contents: &[u8]) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"file\"; filename=\"{file_name}\"\r\n\
             Content-Type: application/octet-stream\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(contents);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method(Method::POST)
            .uri("/upload-document")
            .header(CONTENT_TYPE, format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn ask_request(question: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri("/ask")
            .header(CONTENT_TYPE, "application/json")
            .body(Body::from(serde_json::json!({ "question": question }).to_string()))
            .unwrap()
    }

    fn index_request(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[test]
    fn upload_names_are_flattened_and_filtered() {
        assert_eq!(upload_file_name("policy.PDF").as_deref(), Some("policy.PDF"));
        assert_eq!(upload_file_name("../../etc/notes.txt").as_deref(), Some("notes.txt"));
        assert_eq!(upload_file_name("malware.exe"), None);
        assert_eq!(upload_file_name(".."), None);
    }

    #[tokio::test]
    async fn health_route_reports_running() {
        let (_dir, _paths, app) = test_app(StubGenerator::Reply("unused"));
        let (status, body) = send(&app, Request::get("/").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["status"], "RAG backend running");
    }

    #[tokio::test]
    async fn uploads_are_stored_then_indexed_incrementally() {
        let (_dir, paths, app) = test_app(StubGenerator::Reply("unused"));

        let (status, body) = send(
            &app,
            upload_request("leave.txt", b"Employees accrue two days of leave per month."),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["filename"], "leave.txt");
        assert_eq!(body["indexing"]["outcome"], "rebuilt");
        assert!(paths.raw_dir.join("leave.txt").is_file());

        let (status, body) = send(
            &app,
            upload_request("../travel.txt", b"Travel must be booked through the approved agency."),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indexing"]["outcome"], "updated");
        assert_eq!(body["indexing"]["new_files"], serde_json::json!(["travel.txt"]));
        assert!(paths.raw_dir.join("travel.txt").is_file());
    }

    #[tokio::test]
    async fn uploads_larger_than_two_megabytes_are_accepted() {
        let (_dir, paths, app) = test_app(StubGenerator::Reply("unused"));
        let contents = "Badges must be worn on site.\n".repeat(3 * 1024 * 1024 / 29 + 1);
        assert!(contents.len() > 3 * 1024 * 1024);

        let (status, body) = send(&app, upload_request("big.txt", contents.as_bytes())).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["indexing"]["outcome"], "rebuilt");
        assert_eq!(
            fs::metadata(paths.raw_dir.join("big.txt")).unwrap().len(),
            contents.len() as u64
        );
    }

    #[tokio::test]
    async fn unsupported_uploads_are_rejected() {
        let (_dir, paths, app) = test_app(StubGenerator::Reply("unused"));

        let (status, body) = send(&app, upload_request("slides.pptx", b"binary")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"]["code"], "bad_request");
        assert!(!paths.raw_dir.join("slides.pptx").exists());
    }

    #[tokio::test]
    async fn ask_without_index_is_not_found() {
        let (_dir, _paths, app) = test_app(StubGenerator::Reply("unused"));

        let (status, body) = send(&app, ask_request("What is the leave policy?")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"]["code"], "not_found");
    }

    #[tokio::test]
    async fn ask_returns_answer_with_sources() {
        let (_dir, paths, app) = test_app(StubGenerator::Reply("Two days per month."));
        fs::create_dir_all(&paths.raw_dir).unwrap();
        fs::write(paths.raw_dir.join("leave.txt"), "Employees accrue two days of leave per month.").unwrap();
        send(&app, index_request("/index?full=true")).await;

        let (status, body) = send(&app, ask_request("How much leave do I get?")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["answer"], "Two days per month.");
        assert_eq!(body["sources"][0]["source"], "leave.txt");
    }

    #[tokio::test]
    async fn generator_failures_map_to_bad_gateway() {
        let (_dir, paths, app) = test_app(StubGenerator::Unavailable);
        fs::create_dir_all(&paths.raw_dir).unwrap();
        fs::write(paths.raw_dir.join("leave.txt"), "Employees accrue two days of leave per month.").unwrap();
        send(&app, index_request("/index?full=true")).await;

        let (status, body) = send(&app, ask_request("How much leave do I get?")).await;

        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"]["code"], "upstream_error");
        assert!(body["error"]["message"].as_str().unwrap().contains("503"));
    }

    #[tokio::test]
    async fn index_route_rebuilds_on_full_and_updates_otherwise() {
        let (_dir, paths, app) = test_app(StubGenerator::Reply("unused"));
        fs::create_dir_all(&paths.raw_dir).unwrap();
        fs::write(paths.raw_dir.join("a.txt"), "Parking permits are issued by facilities.").unwrap();

        let (status, body) = send(&app, index_request("/index?full=true")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["outcome"], "rebuilt");
        assert_eq!(body["files"], serde_json::json!(["a.txt"]));

        let (_, body) = send(&app, index_request("/index")).await;
        assert_eq!(body["outcome"], "up_to_date");

        let (_, body) = send(&app, index_request("/index?full=true")).await;
        assert_eq!(body["outcome"], "rebuilt");
    }

    #[tokio::test]
    async fn summarize_route_returns_the_empty_message_without_documents() {
        let (_dir, _paths, app) = test_app(StubGenerator::Unavailable);

        let (status, body) = send(&app, Request::get("/summarize").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["summary"], doc_rag_core::NO_DOCUMENTS_SUMMARY);
    }
}
