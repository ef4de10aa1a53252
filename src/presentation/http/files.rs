use axum::{
    Json, Router,
    extract::{Multipart, State},
    http::StatusCode,
    routing::post,
};
use serde::Serialize;
use utoipa::ToSchema;

use crate::application::use_cases::files::upload_cover_image::UploadCoverImage;
use crate::bootstrap::app_context::AppContext;
use crate::presentation::http::ApiError;
use crate::presentation::http::auth::{self, Bearer};

#[derive(Debug, Serialize, ToSchema)]
pub struct UploadCoverResponse {
    pub path: String,
    pub url: String,
}

#[derive(ToSchema)]
#[allow(dead_code)]
pub struct UploadCoverMultipart {
    /// Image to upload
    #[schema(value_type = String, format = Binary)]
    file: String,
}

#[utoipa::path(
    post,
    path = "/api/files/covers",
    tag = "Files",
    request_body(
        content = UploadCoverMultipart,
        content_type = "multipart/form-data",
    ),
    responses((status = 200, description = "Cover uploaded", body = UploadCoverResponse))
)]
pub async fn upload_cover(
    State(ctx): State<AppContext>,
    bearer: Bearer,
    mut multipart: Multipart,
) -> Result<Json<UploadCoverResponse>, ApiError> {
    auth::validate_bearer(&ctx.cfg, bearer)?;

    let mut file_bytes: Option<Vec<u8>> = None;
    let mut orig_filename: Option<String> = None;

    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?
    {
        if field.name() == Some("file") {
            orig_filename = field.file_name().map(|s| s.to_string());
            let data = field.bytes().await.map_err(|_| StatusCode::BAD_REQUEST)?;
            if data.len() > ctx.cfg.upload_max_bytes {
                return Err(StatusCode::PAYLOAD_TOO_LARGE.into());
            }
            file_bytes = Some(data.to_vec());
        }
    }
    let bytes = file_bytes.ok_or(StatusCode::BAD_REQUEST)?;

    let storage = ctx.object_storage();
    let uc = UploadCoverImage {
        storage: storage.as_ref(),
    };
    let out = uc.execute(orig_filename.as_deref(), &bytes).await?;
    Ok(Json(UploadCoverResponse {
        path: out.path,
        url: out.url,
    }))
}

pub fn routes(ctx: AppContext) -> Router {
    Router::new()
        .route("/files/covers", post(upload_cover))
        .with_state(ctx)
}
