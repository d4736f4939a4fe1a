use std::convert::Infallible;
use std::time::Instant;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request},
    http::{header, request::Parts, HeaderMap},
    middleware::Next,
    response::Response,
};

/// The raw bearer credential of a request, if one was presented.
///
/// Extraction never fails: a missing credential is an authorization outcome
/// (`TokenMissing`) decided by the pipeline, not by the extractor.
#[derive(Debug, Clone, Default)]
pub struct BearerCredential(pub Option<String>);

impl BearerCredential {
    pub fn as_deref(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

#[async_trait]
impl<S> FromRequestParts<S> for BearerCredential
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(extract_bearer(&parts.headers).map(str::to_owned)))
    }
}

/// `Authorization: Bearer <token>` → `<token>`.
///
/// Any other scheme (or no header) counts as no credential. An empty token
/// after the scheme is passed through so the codec reports it as malformed.
pub fn extract_bearer(headers: &HeaderMap) -> Option<&str> {
    let header = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = header.split_once(' ').unwrap_or((header, ""));
    if !scheme.eq_ignore_ascii_case("bearer") {
        return None;
    }
    Some(token.trim())
}

/// One structured line per request: method, path, status, latency.
pub async fn request_logging(req: Request, next: Next) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_owned();
    let started = Instant::now();

    let response = next.run(req).await;

    tracing::info!(
        method = %method,
        path = %path,
        status = response.status().as_u16(),
        latency_ms = started.elapsed().as_millis() as u64,
        "request completed"
    );
    response
}

#[cfg(test)]
mod tests {
    use axum::http::HeaderValue;

    use super::*;

    fn headers(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static(value));
        headers
    }

    #[test]
    fn extracts_bearer_token() {
        assert_eq!(extract_bearer(&headers("Bearer abc.def.ghi")), Some("abc.def.ghi"));
        assert_eq!(extract_bearer(&headers("bearer abc")), Some("abc"));
    }

    #[test]
    fn other_schemes_and_missing_header_are_no_credential() {
        assert_eq!(extract_bearer(&HeaderMap::new()), None);
        assert_eq!(extract_bearer(&headers("Basic dXNlcjpwYXNz")), None);
        assert_eq!(extract_bearer(&headers("abc.def.ghi")), None);
    }

    #[test]
    fn empty_bearer_is_passed_through() {
        assert_eq!(extract_bearer(&headers("Bearer ")), Some(""));
        assert_eq!(extract_bearer(&headers("Bearer")), Some(""));
    }
}
