//! Axum route handlers for the Portfolio API.

use axum::{
    extract::{multipart::MultipartRejection, Multipart, State},
    Json,
};
use tracing::{info_span, warn, Instrument};
use uuid::Uuid;

use crate::errors::AppError;
use crate::models::portfolio::PortfolioResponse;
use crate::portfolio::pipeline::run_pipeline;
use crate::portfolio::upload::receive_upload;
use crate::state::AppState;

/// POST /file
///
/// Multipart upload of a resume (field `file`). Extracts text, generates a
/// portfolio page and tries to publish it. Responds 200 whenever a page was
/// generated, even if publishing failed. A body that is not multipart at all
/// is answered like a missing file.
pub async fn handle_upload(
    State(state): State<AppState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<PortfolioResponse>, AppError> {
    let span = info_span!("portfolio", request_id = %Uuid::new_v4());

    async move {
        let multipart = multipart.map_err(|rejection| {
            warn!("Request is not a multipart upload: {rejection}");
            AppError::MissingFile
        })?;
        let document = receive_upload(multipart, &state.settings.upload_dir).await?;
        tracing::info!(
            "Received '{}' ({} bytes, {:?}, declared {})",
            document.original_name,
            document.size,
            document.kind,
            document.content_type.as_deref().unwrap_or("no content type")
        );

        // Dropping `document` also removes the file if this future is cancelled.
        let outcome = run_pipeline(&state, document.path()).await;
        document.discard();

        Ok::<_, AppError>(Json(outcome?))
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{to_bytes, Body},
        http::{Request, StatusCode},
        Router,
    };
    use serde_json::Value;
    use std::time::Duration;
    use tower::ServiceExt;

    use crate::llm_client::LlmError;
    use crate::publisher::PublishError;
    use crate::routes::build_router;
    use crate::state::test_support::{state_with, FakeExtractor, FakeGenerator, FakePublisher};
    use crate::state::AppState;

    const BOUNDARY: &str = "folio-test-boundary";

    fn multipart_request(
        field: &str,
        file_name: &str,
        content_type: &str,
        data: &[u8],
    ) -> Request<Body> {
        let mut body = format!(
            "--{BOUNDARY}\r\n\
             Content-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\n\
             Content-Type: {content_type}\r\n\r\n"
        )
        .into_bytes();
        body.extend_from_slice(data);
        body.extend_from_slice(format!("\r\n--{BOUNDARY}--\r\n").as_bytes());

        Request::builder()
            .method("POST")
            .uri("/file")
            .header("content-type", format!("multipart/form-data; boundary={BOUNDARY}"))
            .body(Body::from(body))
            .unwrap()
    }

    fn router_in(dir: &tempfile::TempDir, mut state: AppState) -> Router {
        state.settings.upload_dir = dir.path().to_path_buf();
        build_router(state)
    }

    async fn send(router: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = router.oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    fn upload_dir_is_empty(dir: &tempfile::TempDir) -> bool {
        std::fs::read_dir(dir.path()).unwrap().next().is_none()
    }

    #[tokio::test]
    async fn test_full_success_returns_html_repo_and_deploy_link() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FakeExtractor::ok("Jane Doe, Rust engineer");
        let state = state_with(
            extractor.clone(),
            FakeGenerator::ok("<html>Jane</html>"),
            FakePublisher::ok(),
        );

        let (status, body) = send(
            router_in(&dir, state),
            multipart_request("file", "resume.pdf", "application/pdf", b"%PDF-1.4"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["html"], "<html>Jane</html>");
        assert_eq!(
            body["github"]["repository"],
            "https://github.com/octocat/portfolio-test"
        );
        assert_eq!(body["github"]["branch"], "main");
        assert_eq!(body["github"]["commit"]["sha"], "abc123");
        assert!(body["vercel"]["deployUrl"]
            .as_str()
            .unwrap()
            .starts_with("https://vercel.com/new/clone?repository-url=https%3A%2F%2Fgithub.com"));
        assert!(body["timestamp"].is_i64());
        assert!(extractor.saw_file(), "upload must exist while extracting");
        assert!(upload_dir_is_empty(&dir), "upload must be removed afterwards");
    }

    #[tokio::test]
    async fn test_duplicate_repository_still_returns_200_with_html() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            FakeExtractor::ok("Jane"),
            FakeGenerator::ok("<html/>"),
            FakePublisher::failing(PublishError::RepositoryExists("portfolio-1".into())),
        );

        let (status, body) = send(
            router_in(&dir, state),
            multipart_request("file", "resume.png", "image/png", b"\x89PNG"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["html"], "<html/>");
        assert_eq!(body["github"]["error"], "Failed to upload to GitHub");
        assert!(body["github"]["details"].as_str().unwrap().contains("already exists"));
        assert!(body["vercel"].is_null());
    }

    #[tokio::test]
    async fn test_missing_file_field_returns_500_without_provider_calls() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FakeExtractor::ok("unused");
        let state = state_with(
            extractor.clone(),
            FakeGenerator::ok("<html/>"),
            FakePublisher::ok(),
        );

        let (status, body) = send(
            router_in(&dir, state),
            multipart_request("filename", "resume.pdf", "application/pdf", b"%PDF"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["html"].is_null());
        assert!(body["github"].is_null());
        assert!(body["vercel"].is_null());
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_unsupported_type_is_rejected_before_storage() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FakeExtractor::ok("unused");
        let state = state_with(
            extractor.clone(),
            FakeGenerator::ok("<html/>"),
            FakePublisher::ok(),
        );

        let (status, body) = send(
            router_in(&dir, state),
            multipart_request("file", "notes.txt", "text/plain", b"hello"),
        )
        .await;

        assert_eq!(status, StatusCode::UNSUPPORTED_MEDIA_TYPE);
        assert_eq!(body["success"], false);
        assert_eq!(extractor.calls(), 0);
        assert!(upload_dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_empty_file_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            FakeExtractor::ok("unused"),
            FakeGenerator::ok("<html/>"),
            FakePublisher::ok(),
        );

        let (status, body) = send(
            router_in(&dir, state),
            multipart_request("file", "resume.pdf", "application/pdf", b""),
        )
        .await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_generation_failure_returns_500_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let publisher = FakePublisher::ok();
        let state = state_with(
            FakeExtractor::ok("Jane"),
            FakeGenerator::failing(LlmError::Api {
                status: 400,
                message: "API key not valid".into(),
            }),
            publisher.clone(),
        );

        let (status, body) = send(
            router_in(&dir, state),
            multipart_request("file", "resume.pdf", "application/pdf", b"%PDF"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["html"].is_null());
        assert!(body["message"].as_str().unwrap().contains("API key not valid"));
        assert_eq!(publisher.calls(), 0);
        assert!(upload_dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_extraction_failure_returns_500_and_cleans_up() {
        let dir = tempfile::tempdir().unwrap();
        let generator = FakeGenerator::ok("<html/>");
        let state = state_with(
            FakeExtractor::failing("E500: timed out"),
            generator.clone(),
            FakePublisher::ok(),
        );

        let (status, body) = send(
            router_in(&dir, state),
            multipart_request("file", "scan.jpg", "image/jpeg", b"\xff\xd8\xff"),
        )
        .await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Failed to extract text from resume");
        assert!(body["message"].as_str().unwrap().starts_with("Failed to process PDF"));
        assert_eq!(generator.calls(), 0);
        assert!(upload_dir_is_empty(&dir));
    }

    #[tokio::test]
    async fn test_upload_typed_only_by_content_type_is_stored_with_extension() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FakeExtractor::ok("Jane");
        let state = state_with(
            extractor.clone(),
            FakeGenerator::ok("<html/>"),
            FakePublisher::ok(),
        );

        let (status, _) = send(
            router_in(&dir, state),
            multipart_request("file", "blob", "image/png", b"PNG data"),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        let stored = extractor.last_path().unwrap();
        assert_eq!(stored.extension().and_then(|e| e.to_str()), Some("png"));
    }

    #[tokio::test]
    async fn test_non_multipart_body_gets_json_failure() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FakeExtractor::ok("unused");
        let state = state_with(
            extractor.clone(),
            FakeGenerator::ok("<html/>"),
            FakePublisher::ok(),
        );
        let request = Request::builder()
            .method("POST")
            .uri("/file")
            .body(Body::empty())
            .unwrap();

        let (status, body) = send(router_in(&dir, state), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
        assert!(body["html"].is_null());
        assert!(body["message"].as_str().unwrap().contains("'file'"));
        assert_eq!(extractor.calls(), 0);
    }

    #[tokio::test]
    async fn test_bad_boundary_gets_json_failure() {
        let dir = tempfile::tempdir().unwrap();
        let state = state_with(
            FakeExtractor::ok("unused"),
            FakeGenerator::ok("<html/>"),
            FakePublisher::ok(),
        );
        let request = Request::builder()
            .method("POST")
            .uri("/file")
            .header("content-type", "multipart/form-data")
            .body(Body::from("not a multipart body"))
            .unwrap();

        let (status, body) = send(router_in(&dir, state), request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_cancelled_request_removes_upload() {
        let dir = tempfile::tempdir().unwrap();
        let extractor = FakeExtractor::slow(Duration::from_secs(600));
        let state = state_with(
            extractor.clone(),
            FakeGenerator::ok("<html/>"),
            FakePublisher::ok(),
        );
        let request = multipart_request("file", "resume.pdf", "application/pdf", b"%PDF");

        let outcome = tokio::time::timeout(
            Duration::from_millis(200),
            router_in(&dir, state).oneshot(request),
        )
        .await;

        assert!(outcome.is_err(), "request should still be extracting");
        assert_eq!(extractor.calls(), 1);
        assert!(extractor.saw_file());
        assert!(upload_dir_is_empty(&dir), "upload must be removed when the request is dropped");
    }
}
