pub mod error;
pub mod middleware;
pub mod response;

use axum::http::StatusCode;
use axum::middleware::from_fn_with_state;
use axum::response::Response;
use axum::{Json, Router};
use migration::MigratorTrait;
use sea_orm::{Database, DatabaseConnection};
use std::sync::Arc;
use tower::ServiceBuilder;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;

use crate::config::{AppEnv, Config};
use crate::task::{TaskState, create_task_router};
use crate::web::error::{panic_response, translate_errors};
use crate::web::middleware::RequestLogLayer;
use crate::web::response::{send_error, send_ok};

#[derive(OpenApi)]
#[openapi(
    paths(
        crate::task::api::list_tasks_handler,
        crate::task::api::get_task_handler,
        crate::task::api::create_task_handler,
        crate::task::api::update_task_handler,
        crate::task::api::delete_task_handler,
    ),
    components(schemas(
        crate::task::Task,
        crate::task::api::CreateTaskRequest,
        crate::task::api::UpdateTaskRequest,
        crate::web::response::ErrorEnvelope,
    )),
    tags((name = "Tasks", description = "Task management"))
)]
pub struct ApiDoc;

/// Builds the full application router on top of an open database connection.
///
/// `env` decides how much error detail reaches clients.
pub fn create_app(db: DatabaseConnection, env: AppEnv) -> Router {
    let task_router = create_task_router(TaskState { db: Arc::new(db) });

    Router::new()
        .route("/", axum::routing::get(welcome_handler))
        .route("/health", axum::routing::get(health_check_handler))
        .route("/api-docs/openapi.json", axum::routing::get(openapi_handler))
        .merge(task_router)
        .fallback(route_not_found_handler)
        .method_not_allowed_fallback(route_not_found_handler)
        .layer(from_fn_with_state(env, translate_errors))
        .layer(
            ServiceBuilder::new()
                // Spans only; RequestLogLayer emits the per-request line.
                .layer(
                    TraceLayer::new_for_http()
                        .on_request(())
                        .on_response(())
                        .on_failure(()),
                )
                .layer(
                    CorsLayer::new()
                        .allow_origin(Any)
                        .allow_methods(Any)
                        .allow_headers(Any),
                )
                .layer(RequestLogLayer::new())
                .layer(CatchPanicLayer::custom(panic_response(env))),
        )
}

#[tracing::instrument(skip(config))]
pub async fn start_web_server(config: Config) -> anyhow::Result<()> {
    let server_address = format!("0.0.0.0:{}", &config.port);
    let listener = tokio::net::TcpListener::bind(&server_address).await?;
    tracing::info!(
        "Web server running on http://{} ({:?})",
        server_address,
        config.environment
    );

    let db = Database::connect(&config.db_url).await?;
    migration::Migrator::up(&db, None).await?;
    tracing::info!("Database migrations applied successfully");

    let app = create_app(db, config.environment);
    axum::serve(listener, app).await?;
    Ok(())
}

#[tracing::instrument]
pub async fn welcome_handler() -> Response {
    send_ok((), "Welcome to the Task API")
}

#[tracing::instrument]
pub async fn health_check_handler() -> &'static str {
    "OK"
}

pub async fn openapi_handler() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[tracing::instrument]
pub async fn route_not_found_handler() -> Response {
    tracing::warn!("No route matched");
    send_error("Route not found", StatusCode::NOT_FOUND)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{Method, Request};
    use sea_orm::{DatabaseBackend, MockDatabase};
    use std::io::Write;
    use std::sync::Mutex;
    use tower::ServiceExt;

    #[derive(Clone, Default)]
    struct CapturedLogs(Arc<Mutex<Vec<u8>>>);

    impl Write for CapturedLogs {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    fn test_app() -> Router {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();
        create_app(db, AppEnv::Test)
    }

    async fn send(request: Request<Body>) -> (StatusCode, String) {
        let response = test_app().oneshot(request).await.unwrap();
        let status = response.status();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, String::from_utf8(body.to_vec()).unwrap())
    }

    #[tokio::test]
    async fn can_render_welcome_message() {
        let (status, body) = send(Request::builder().uri("/").body(Body::empty()).unwrap()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert_eq!(json["message"], "Welcome to the Task API");
        assert_eq!(json["status"], "success");
    }

    #[tokio::test]
    async fn can_check_health_endpoint() {
        let (status, body) =
            send(Request::builder().uri("/health").body(Body::empty()).unwrap()).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "OK");
    }

    #[tokio::test]
    async fn unmatched_route_is_not_found_envelope() {
        let (status, body) = send(
            Request::builder()
                .uri("/does/not/exist")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(
            json,
            serde_json::json!({
                "statusCode": 404,
                "status": "error",
                "message": "Route not found"
            })
        );
    }

    #[tokio::test]
    async fn unmatched_method_is_not_found_envelope() {
        let (status, body) = send(
            Request::builder()
                .method(Method::DELETE)
                .uri("/tasks")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(json["message"], "Route not found");
    }

    #[tokio::test]
    async fn storage_errors_pass_through_translator() {
        // The mock has no results queued, so listing fails in the driver.
        let (status, body) =
            send(Request::builder().uri("/tasks").body(Body::empty()).unwrap()).await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["status"], "error");
        assert_eq!(json["statusCode"], 500);
    }

    #[tokio::test]
    async fn each_request_is_logged_once() {
        let logs = CapturedLogs::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_ansi(false)
            .with_writer(move || writer.clone())
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (status, _) =
            send(Request::builder().uri("/health").body(Body::empty()).unwrap()).await;
        assert_eq!(status, StatusCode::OK);

        let output = String::from_utf8(logs.0.lock().unwrap().clone()).unwrap();
        assert_eq!(output.matches("GET /health").count(), 1);
        assert!(!output.contains("started processing request"));
        assert!(!output.contains("finished processing request"));
    }

    #[tokio::test]
    async fn can_serve_openapi_document() {
        let (status, body) = send(
            Request::builder()
                .uri("/api-docs/openapi.json")
                .body(Body::empty())
                .unwrap(),
        )
        .await;
        let json: serde_json::Value = serde_json::from_str(&body).unwrap();

        assert_eq!(status, StatusCode::OK);
        assert!(json["paths"]["/tasks"].is_object());
        assert!(json["paths"]["/tasks/{id}"].is_object());
    }
}
