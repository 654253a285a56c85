//! Static bearer token and origin policy for the MCP endpoints.
//!
//! Only enforced when a token is configured. `GET` on the JSON-RPC path stays open as a
//! connectivity probe; `OPTIONS` is left to the CORS layer.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::body::Body;
use config::AuthConfig;
use http::{Method, Request, Response, StatusCode, header};
use secrecy::ExposeSecret;
use serde_json::json;
use sha2::{Digest, Sha256, digest::Output};
use tower::Layer;

#[derive(Clone)]
pub(crate) struct AuthLayer(Arc<AuthLayerInner>);

struct AuthLayerInner {
    config: AuthConfig,
    mcp_path: String,
    /// Digest of the configured token. Presented tokens are compared by digest, so the
    /// comparison time does not depend on how much of the token a caller guessed.
    token_digest: Option<Output<Sha256>>,
}

impl AuthLayer {
    pub fn new(config: AuthConfig, mcp_path: &str) -> Self {
        Self(Arc::new(AuthLayerInner::new(config, mcp_path)))
    }
}

impl<Service> Layer<Service> for AuthLayer
where
    Service: Send + Clone,
{
    type Service = AuthService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        AuthService {
            next,
            layer: self.0.clone(),
        }
    }
}

#[derive(Clone)]
pub(crate) struct AuthService<Service> {
    next: Service,
    layer: Arc<AuthLayerInner>,
}

#[derive(Debug, PartialEq, Eq)]
enum Rejection {
    ForbiddenOrigin,
    Unauthorized,
}

impl AuthLayerInner {
    fn new(config: AuthConfig, mcp_path: &str) -> Self {
        let token_digest = config
            .token
            .as_ref()
            .map(|token| Sha256::digest(token.expose_secret().as_bytes()));

        Self {
            config,
            mcp_path: mcp_path.trim_end_matches('/').to_string(),
            token_digest,
        }
    }

    fn check<B>(&self, request: &Request<B>) -> Result<(), Rejection> {
        let Some(expected) = &self.token_digest else {
            return Ok(());
        };

        let method = request.method();

        if method == Method::OPTIONS || (method == Method::GET && request.uri().path() == self.mcp_path) {
            return Ok(());
        }

        let headers = request.headers();

        if let Some(origin) = headers.get(header::ORIGIN) {
            let allowed = origin
                .to_str()
                .is_ok_and(|origin| self.config.allows_origin(origin));

            if !allowed {
                return Err(Rejection::ForbiddenOrigin);
            }
        }

        let bearer = headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.split_once(' '))
            .filter(|(scheme, _)| scheme.eq_ignore_ascii_case("bearer"))
            .map(|(_, token)| token.trim());

        match bearer {
            Some(bearer) if !bearer.is_empty() && Sha256::digest(bearer.as_bytes()) == *expected => Ok(()),
            _ => Err(Rejection::Unauthorized),
        }
    }
}

impl Rejection {
    fn into_response(self) -> Response<Body> {
        let (status, code, message) = match self {
            Rejection::ForbiddenOrigin => (StatusCode::FORBIDDEN, "forbidden_origin", "Origin not allowed."),
            Rejection::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                "unauthorized",
                "Missing or invalid bearer token.",
            ),
        };

        let body = json!({ "error": { "code": code, "message": message } });

        let mut response = Response::new(Body::from(body.to_string()));
        *response.status_mut() = status;

        let headers = response.headers_mut();
        headers.insert(header::CONTENT_TYPE, http::HeaderValue::from_static("application/json"));

        if status == StatusCode::UNAUTHORIZED {
            headers.insert(header::WWW_AUTHENTICATE, http::HeaderValue::from_static("Bearer"));
        }

        response
    }
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for AuthService<Service>
where
    Service: tower::Service<Request<ReqBody>, Response = Response<Body>> + Send + Clone + 'static,
    Service::Future: Send,
    Service::Error: Display + 'static,
    ReqBody: http_body::Body + Send + 'static,
{
    type Response = Response<Body>;
    type Error = Service::Error;
    type Future = Pin<Box<dyn Future<Output = Result<Response<Body>, Self::Error>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.next.poll_ready(cx)
    }

    fn call(&mut self, req: Request<ReqBody>) -> Self::Future {
        if let Err(rejection) = self.layer.check(&req) {
            log::debug!("Rejecting {} {}: {rejection:?}", req.method(), req.uri().path());
            return Box::pin(async move { Ok(rejection.into_response()) });
        }

        let mut next = self.next.clone();

        Box::pin(async move { next.call(req).await })
    }
}

#[cfg(test)]
mod tests {
    use config::AuthConfig;
    use http::{Method, Request};
    use secrecy::SecretString;

    use super::{AuthLayerInner, Rejection};

    fn layer(token: Option<&str>) -> AuthLayerInner {
        let config = AuthConfig {
            token: token.map(SecretString::from),
            ..Default::default()
        };

        AuthLayerInner::new(config, "/mcp/")
    }

    fn request(method: Method, path: &str, headers: &[(&str, &str)]) -> Request<()> {
        let mut builder = Request::builder().method(method).uri(path);

        for (name, value) in headers {
            builder = builder.header(*name, *value);
        }

        builder.body(()).unwrap()
    }

    #[test]
    fn open_without_token() {
        let layer = layer(None);

        assert_eq!(layer.check(&request(Method::POST, "/mcp", &[("origin", "https://evil.example")])), Ok(()));
    }

    #[test]
    fn bearer_required_with_token() {
        let layer = layer(Some("secret"));

        assert_eq!(layer.check(&request(Method::POST, "/mcp", &[])), Err(Rejection::Unauthorized));
        assert_eq!(
            layer.check(&request(Method::POST, "/mcp", &[("authorization", "Bearer wrong")])),
            Err(Rejection::Unauthorized)
        );
        assert_eq!(
            layer.check(&request(Method::POST, "/mcp", &[("authorization", "bearer secret")])),
            Ok(())
        );
        assert_eq!(
            layer.check(&request(Method::GET, "/mcp/getDeals", &[])),
            Err(Rejection::Unauthorized)
        );
    }

    #[test]
    fn probe_and_preflight_stay_open() {
        let layer = layer(Some("secret"));

        assert_eq!(layer.check(&request(Method::GET, "/mcp", &[])), Ok(()));
        assert_eq!(layer.check(&request(Method::OPTIONS, "/mcp", &[])), Ok(()));
    }

    #[test]
    fn origin_checked_before_token() {
        let layer = layer(Some("secret"));

        let headers = [("origin", "https://evil.example"), ("authorization", "Bearer secret")];
        assert_eq!(layer.check(&request(Method::POST, "/mcp", &headers)), Err(Rejection::ForbiddenOrigin));

        let headers = [("origin", "http://localhost"), ("authorization", "Bearer secret")];
        assert_eq!(layer.check(&request(Method::POST, "/mcp", &headers)), Ok(()));
    }

    #[test]
    fn near_miss_tokens_are_rejected() {
        let layer = layer(Some("secret"));

        for presented in ["Bearer secre", "Bearer secret2", "Bearer SECRET", "Bearer  ", "Basic secret"] {
            assert_eq!(
                layer.check(&request(Method::POST, "/mcp", &[("authorization", presented)])),
                Err(Rejection::Unauthorized),
                "{presented}"
            );
        }

        assert_eq!(
            layer.check(&request(Method::POST, "/mcp", &[("authorization", "Bearer  secret ")])),
            Ok(())
        );
    }
}
