//! 文件列表、下载、删除与磁盘信息处理器。

use axum::body::Body as AxumBody;
use axum::extract::{Extension, Path as UrlPath};
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json as JsonResponse, Response};
use httpdate::fmt_http_date;
use serde::Serialize;
use std::io::ErrorKind;
use std::sync::Arc;
use tokio_util::io::ReaderStream;
use tracing::{info, warn};

use crate::error::ApiError;
use crate::storage::{DiskUsage, FileInfo, Storage, StorageError};

/// Outcome payload for upload and delete operations.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FileResponse {
    pub filename: Option<String>,
    pub message: String,
}

/// 列出存储目录中的全部常规文件。
pub async fn list_files(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<Vec<FileInfo>>, ApiError> {
    let files = storage.list_files().await?;
    info!(count = files.len(), "list files");
    Ok(JsonResponse(files))
}

/// 下载单个文件，以附件形式返回原始字节流。
pub async fn download_file(
    UrlPath(filename): UrlPath<String>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    let (file, metadata) = storage.open_file(&filename).await?;
    let file_size = metadata.len();

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("application/octet-stream"),
    );
    response_headers.insert(
        header::CONTENT_DISPOSITION,
        HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
            .map_err(|_| ApiError::BadRequest("invalid file name".into()))?,
    );
    response_headers.insert(
        header::CONTENT_LENGTH,
        HeaderValue::from_str(&file_size.to_string())
            .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
    );
    if let Ok(modified) = metadata.modified() {
        let value = fmt_http_date(modified);
        response_headers.insert(
            header::LAST_MODIFIED,
            HeaderValue::from_str(&value)
                .map_err(|_| ApiError::Internal("响应头构建失败".into()))?,
        );
    }

    info!(filename, size = file_size, "download file");
    let stream = ReaderStream::new(file);
    Ok((
        StatusCode::OK,
        response_headers,
        AxumBody::from_stream(stream),
    )
        .into_response())
}

/// 删除单个文件。
pub async fn delete_file(
    UrlPath(filename): UrlPath<String>,
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<Response, ApiError> {
    if let Err(err) = storage.delete_file(&filename).await {
        return match err {
            StorageError::Io(io_err) if io_err.kind() != ErrorKind::NotFound => {
                warn!(filename, error = %io_err, "delete failed");
                Ok((
                    StatusCode::INTERNAL_SERVER_ERROR,
                    JsonResponse(FileResponse {
                        filename: Some(filename),
                        message: format!("failed to delete file: {io_err}"),
                    }),
                )
                    .into_response())
            }
            err => Err(err.into()),
        };
    }

    info!(filename, "delete file");
    Ok(JsonResponse(FileResponse {
        filename: Some(filename),
        message: "file deleted".to_string(),
    })
    .into_response())
}

/// 返回存储目录所在卷的磁盘使用情况。
pub async fn disk_info(
    Extension(storage): Extension<Arc<Storage>>,
) -> Result<JsonResponse<DiskUsage>, ApiError> {
    let usage = storage.disk_usage().await?;
    info!(
        used = usage.used_space,
        total = usage.total_space,
        uploaded = usage.uploaded_files_size,
        "disk info"
    );
    Ok(JsonResponse(usage))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::to_bytes;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn make_storage() -> (tempfile::TempDir, Arc<Storage>) {
        let temp = tempdir().expect("tempdir");
        let root = temp.path().join("storage");
        (temp, Arc::new(Storage::new(root)))
    }

    #[tokio::test]
    async fn list_files_with_missing_root_is_empty() {
        let (_temp, storage) = make_storage();
        let JsonResponse(files) = list_files(Extension(storage)).await.expect("list");
        assert!(files.is_empty());
    }

    #[tokio::test]
    async fn download_missing_file_is_not_found() {
        let (_temp, storage) = make_storage();
        storage.ensure_root().await.expect("ensure");
        let result = download_file(UrlPath("ghost.txt".to_string()), Extension(storage)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn download_rejects_traversal_name() {
        let (_temp, storage) = make_storage();
        let result =
            download_file(UrlPath("../secret.txt".to_string()), Extension(storage)).await;
        assert!(matches!(result, Err(ApiError::BadRequest(_))));
    }

    #[tokio::test]
    async fn download_streams_stored_bytes_with_attachment_headers() {
        let (_temp, storage) = make_storage();
        storage.store_file("a.txt", b"hi").await.expect("store");

        let response = download_file(UrlPath("a.txt".to_string()), Extension(storage))
            .await
            .expect("download");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_DISPOSITION)
                .and_then(|value| value.to_str().ok()),
            Some(r#"attachment; filename="a.txt""#)
        );
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("application/octet-stream")
        );

        let body = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], b"hi");
    }

    #[tokio::test]
    async fn delete_missing_file_is_not_found() {
        let (_temp, storage) = make_storage();
        storage.ensure_root().await.expect("ensure");
        let result = delete_file(UrlPath("ghost.txt".to_string()), Extension(storage)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[tokio::test]
    async fn delete_then_download_is_not_found() {
        let (_temp, storage) = make_storage();
        storage.store_file("a.txt", b"hi").await.expect("store");

        let response = delete_file(UrlPath("a.txt".to_string()), Extension(storage.clone()))
            .await
            .expect("delete");
        assert_eq!(response.status(), StatusCode::OK);

        let result = download_file(UrlPath("a.txt".to_string()), Extension(storage)).await;
        assert!(matches!(result, Err(ApiError::NotFound(_))));
    }

    #[test]
    fn payload_keys_are_camel_case() {
        let response = FileResponse {
            filename: None,
            message: "failed".to_string(),
        };
        let json = serde_json::to_value(&response).expect("serialize");
        assert_eq!(json["filename"], serde_json::Value::Null);

        let info = FileInfo {
            name: "a.txt".to_string(),
            size: 2,
            last_modified: 1_700_000_000_000,
        };
        let json = serde_json::to_value(&info).expect("serialize");
        assert!(json.get("lastModified").is_some());
        assert!(json.get("last_modified").is_none());
    }
}
