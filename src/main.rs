use std::net::SocketAddr;
use std::sync::Arc;

use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::extract::MatchedPath;
use dotenvy::dotenv;
use http::HeaderValue;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use insights_api::application::ports::document_store::DocumentStore;
use insights_api::application::ports::object_storage::ObjectStorage;
use insights_api::bootstrap::app_context::{AppContext, AppServices};
use insights_api::bootstrap::config::{Config, StoreBackend};

#[derive(OpenApi)]
#[openapi(
        paths(
            insights_api::presentation::http::posts::list_posts,
            insights_api::presentation::http::posts::create_post,
            insights_api::presentation::http::posts::get_post,
            insights_api::presentation::http::posts::update_post,
            insights_api::presentation::http::posts::delete_post,
            insights_api::presentation::http::posts::publish_post,
            insights_api::presentation::http::posts::unpublish_post,
            insights_api::presentation::http::posts::duplicate_post,
            insights_api::presentation::http::posts::check_slug,
            insights_api::presentation::http::posts::related_posts,
            insights_api::presentation::http::files::upload_cover,
            insights_api::presentation::http::health::health,
        ),
        components(schemas(
            insights_api::presentation::http::posts::CoverImagePayload,
            insights_api::presentation::http::posts::LanguageBlockRequest,
            insights_api::presentation::http::posts::LanguageBlock,
            insights_api::presentation::http::posts::AuthorInfo,
            insights_api::presentation::http::posts::PostResponse,
            insights_api::presentation::http::posts::PostListResponse,
            insights_api::presentation::http::posts::CreatePostRequest,
            insights_api::presentation::http::posts::CreatePostResponse,
            insights_api::presentation::http::posts::UpdatePostRequest,
            insights_api::presentation::http::posts::SlugCheckResponse,
            insights_api::presentation::http::files::UploadCoverResponse,
            insights_api::presentation::http::files::UploadCoverMultipart,
            insights_api::presentation::http::ErrorBody,
            insights_api::presentation::http::health::HealthResp,
        )),
        tags(
            (name = "Posts", description = "Blog post management"),
            (name = "Files", description = "Cover image uploads"),
            (name = "Health", description = "System health checks")
        )
    )]
struct ApiDoc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(
            std::env::var("RUST_LOG")
                .unwrap_or_else(|_| "insights_api=debug,axum=info,tower_http=info".into()),
        )
        .init();

    let cfg = Config::from_env()?;
    info!(?cfg, "Starting insights backend");

    let document_store: Arc<dyn DocumentStore> = match cfg.store_backend {
        StoreBackend::Memory => {
            Arc::new(insights_api::infrastructure::db::memory_store::MemoryDocumentStore::new())
        }
        StoreBackend::Postgres => {
            let pool = insights_api::infrastructure::db::connect_pool(&cfg.database_url).await?;
            insights_api::infrastructure::db::pg_store::ensure_schema(&pool).await?;
            Arc::new(insights_api::infrastructure::db::pg_store::PgDocumentStore::new(pool))
        }
    };

    if let Err(e) = tokio::fs::create_dir_all(&cfg.uploads_dir).await {
        tracing::warn!(error = ?e, dir = %cfg.uploads_dir, "Failed to create uploads dir");
    }
    let public_base = cfg
        .public_base_url
        .clone()
        .unwrap_or_else(|| format!("http://localhost:{}/uploads", cfg.api_port));
    let object_storage: Arc<dyn ObjectStorage> = Arc::new(
        insights_api::infrastructure::storage::fs_object_storage::FsObjectStorage::new(
            &cfg.uploads_dir,
            public_base,
        ),
    );

    let services = AppServices::new(document_store, object_storage);
    let ctx = AppContext::new(cfg.clone(), services);

    let cors = if let Some(origin) = cfg.frontend_url.clone() {
        match HeaderValue::from_str(&origin) {
            Ok(v) => CorsLayer::new()
                .allow_origin(v)
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::DELETE,
                    http::Method::PATCH,
                    http::Method::OPTIONS,
                ])
                .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
                .allow_credentials(true),
            Err(_) => CorsLayer::new()
                .allow_origin(AllowOrigin::mirror_request())
                .allow_methods([
                    http::Method::GET,
                    http::Method::POST,
                    http::Method::DELETE,
                    http::Method::PATCH,
                    http::Method::OPTIONS,
                ])
                .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
                .allow_credentials(true),
        }
    } else if cfg.is_production {
        // FRONTEND_URL is mandatory in production (enforced earlier); deny all as fallback
        CorsLayer::new()
            .allow_origin(AllowOrigin::exact(HeaderValue::from_static("http://invalid")))
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::DELETE,
                http::Method::PATCH,
                http::Method::OPTIONS,
            ])
            .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
    } else {
        // Development convenience
        CorsLayer::new()
            .allow_origin(AllowOrigin::mirror_request())
            .allow_methods([
                http::Method::GET,
                http::Method::POST,
                http::Method::DELETE,
                http::Method::PATCH,
                http::Method::OPTIONS,
            ])
            .allow_headers([http::header::CONTENT_TYPE, http::header::AUTHORIZATION])
            .allow_credentials(true)
    };

    let app = Router::new()
        .nest(
            "/api",
            insights_api::presentation::http::health::routes(ctx.clone()),
        )
        .nest(
            "/api",
            insights_api::presentation::http::posts::routes(ctx.clone()),
        )
        .nest(
            "/api",
            insights_api::presentation::http::files::routes(ctx.clone()),
        )
        .merge(SwaggerUi::new("/api/docs").url("/api/openapi.json", ApiDoc::openapi()))
        .layer(cors)
        .layer(DefaultBodyLimit::max(cfg.upload_max_bytes))
        .layer(
            TraceLayer::new_for_http().make_span_with(|req: &http::Request<_>| {
                let method = req.method().clone();
                let uri = req.uri().clone();
                let matched = req
                    .extensions()
                    .get::<MatchedPath>()
                    .map(|p| p.as_str().to_string())
                    .unwrap_or_default();
                tracing::info_span!("http", %method, %uri, matched_path = %matched)
            }),
        );

    let api_addr = SocketAddr::from(([0, 0, 0, 0], cfg.api_port));
    info!(%api_addr, "HTTP API listening");
    let listener = tokio::net::TcpListener::bind(api_addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            info!("shutdown signal received");
        })
        .await?;
    Ok(())
}
