//! 文件上传处理器：解析 multipart 表单并写入存储目录。

use axum::extract::{Extension, Multipart};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use std::sync::Arc;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::files::FileResponse;
use crate::storage::{Storage, StorageError};

/// 接收 multipart 字段 `file` 并保存，同名文件会被覆盖。
pub async fn upload_file(
    Extension(storage): Extension<Arc<Storage>>,
    mut multipart: Multipart,
) -> Result<Response, ApiError> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|err| ApiError::BadRequest(format!("invalid multipart body: {err}")))?
    {
        if field.name() != Some("file") {
            continue;
        }

        let filename = field
            .file_name()
            .map(str::to_string)
            .ok_or_else(|| ApiError::BadRequest("file name is required".into()))?;
        let data = field
            .bytes()
            .await
            .map_err(|err| ApiError::BadRequest(format!("failed to read upload body: {err}")))?;

        return match storage.store_file(&filename, &data).await {
            Ok(_) => {
                info!(filename, size = data.len(), "upload file");
                Ok(JsonResponse(FileResponse {
                    filename: Some(filename),
                    message: "file uploaded".to_string(),
                })
                .into_response())
            }
            Err(StorageError::Io(io_err)) => {
                warn!(filename, error = %io_err, "upload failed");
                Ok((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    JsonResponse(FileResponse {
                        filename: None,
                        message: format!("failed to upload file: {io_err}"),
                    }),
                )
                    .into_response())
            }
            Err(err) => Err(err.into()),
        };
    }

    Err(ApiError::BadRequest("missing multipart field: file".into()))
}
