//! 静态令牌认证：校验 X-API-Token 请求头。

use axum::body::Body as AxumBody;
use axum::extract::Extension;
use axum::http::Request;
use axum::{middleware, response::Response};
use std::sync::Arc;
use tracing::warn;

use crate::config::API_TOKEN_HEADER;
use crate::error::ApiError;

/// Shared secret every file operation must present.
#[derive(Debug)]
pub struct ApiToken {
    secret: String,
}

impl ApiToken {
    pub fn new(secret: String) -> Self {
        Self { secret }
    }

    /// 判断请求提供的令牌是否与配置的密钥逐字节一致。
    pub fn matches(&self, supplied: Option<&str>) -> bool {
        supplied.is_some_and(|value| value == self.secret)
    }

    pub fn is_empty(&self) -> bool {
        self.secret.is_empty()
    }
}

/// 认证中间件：文件操作在进入处理器前统一校验令牌。
pub async fn auth_middleware(
    Extension(token): Extension<Arc<ApiToken>>,
    req: Request<AxumBody>,
    next: middleware::Next,
) -> Result<Response, ApiError> {
    let path = req.uri().path();
    if is_auth_exempt_path(path) {
        return Ok(next.run(req).await);
    }

    let supplied = req
        .headers()
        .get(API_TOKEN_HEADER)
        .and_then(|value| value.to_str().ok());
    if token.matches(supplied) {
        return Ok(next.run(req).await);
    }

    warn!(path, "rejected request with invalid api token");
    Err(ApiError::Unauthorized)
}

fn is_auth_exempt_path(path: &str) -> bool {
    if path == "/api/version" {
        return true;
    }
    !path.starts_with("/api/")
}

#[cfg(test)]
mod tests {
    use super::{ApiToken, is_auth_exempt_path};

    #[test]
    fn matches_requires_exact_token() {
        let token = ApiToken::new("lemon-secret".to_string());
        assert!(token.matches(Some("lemon-secret")));
        assert!(!token.matches(Some("Lemon-Secret")));
        assert!(!token.matches(Some("lemon-secret ")));
        assert!(!token.matches(None));
    }

    #[test]
    fn empty_secret_matches_empty_supplied_token() {
        // An empty configured secret authorizes an empty header; startup
        // only warns about this instead of refusing to boot.
        let token = ApiToken::new(String::new());
        assert!(token.matches(Some("")));
        assert!(!token.matches(None));
    }

    #[test]
    fn api_paths_are_guarded() {
        assert!(!is_auth_exempt_path("/api/files/list"));
        assert!(!is_auth_exempt_path("/api/files/download/a.txt"));
        assert!(is_auth_exempt_path("/api/version"));
        assert!(is_auth_exempt_path("/"));
        assert!(is_auth_exempt_path("/index.html"));
    }
}
