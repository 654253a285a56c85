//! HTTP request metrics and the `/metrics` endpoint.
//!
//! Every request is recorded to `http.server.request.duration` (milliseconds), with the matched
//! route, method and status code as attributes.

use std::{
    fmt::Display,
    future::Future,
    pin::Pin,
    sync::Arc,
    task::{Context, Poll},
};

use axum::{
    Json,
    body::Body,
    extract::{MatchedPath, State},
};
use http::{Request, Response};
use mcp::{AppContext, MetricsSnapshot};
use telemetry::metrics::{self, Recorder};
use tower::Layer;

/// Sweeps expired sessions and reports counters as JSON.
pub(crate) async fn snapshot(State(context): State<Arc<AppContext>>) -> Json<MetricsSnapshot> {
    Json(context.metrics())
}

#[derive(Clone, Default)]
pub(crate) struct MetricsLayer;

impl<Service> Layer<Service> for MetricsLayer
where
    Service: Send + Clone,
{
    type Service = MetricsService<Service>;

    fn layer(&self, next: Service) -> Self::Service {
        MetricsService { next }
    }
}

#[derive(Clone)]
pub(crate) struct MetricsService<Service> {
    next: Service,
}

impl<Service, ReqBody> tower::Service<Request<ReqBody>> for MetricsService<Service>
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
        let route = req
            .extensions()
            .get::<MatchedPath>()
            .map(|path| path.as_str().to_owned())
            .unwrap_or_else(|| "unmatched".to_string());

        let mut recorder = Recorder::new(metrics::HTTP_SERVER_REQUEST_DURATION);
        recorder.push_attribute("http.request.method", req.method().to_string());
        recorder.push_attribute("http.route", route);

        let mut next = self.next.clone();

        Box::pin(async move {
            let response = next.call(req).await?;

            recorder.push_attribute("http.response.status_code", i64::from(response.status().as_u16()));
            recorder.record();

            Ok(response)
        })
    }
}
