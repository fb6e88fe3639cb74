use crate::config::{Settings, DEFAULT_PORT};
use crate::database::{DbConnection, DbContext};
use crate::error::FrameworkError;
use crate::http::{HttpResponse, Request, Response};
use crate::middleware::{
    next_fn, CorsMiddleware, CorsPolicy, DatabaseContextMiddleware, JsonBodyMiddleware,
    Middleware, MiddlewareChain, MiddlewareRegistry,
};
use crate::routing::Router;
use crate::static_files::StaticFiles;
use bytes::Bytes;
use futures::FutureExt;
use http_body_util::Full;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tracing::Instrument;

const DEFAULT_MAX_BODY_SIZE: usize = 1024 * 1024;

/// Everything a request passes through, without the socket
///
/// Order: global middleware, then the route table, then static files, then
/// the not-found fallback. The last three run as the chain's endpoint, so
/// their responses (including a 500 from a panicking handler) still come back
/// through every middleware.
pub struct Pipeline {
    middleware: MiddlewareRegistry,
    router: Arc<Router>,
    statics: Arc<Vec<StaticFiles>>,
}

impl Pipeline {
    /// Run one request to completion
    pub async fn dispatch(&self, request: Request) -> HttpResponse {
        let mut chain = MiddlewareChain::new();
        chain.extend(self.middleware.global_middleware().iter().cloned());

        let router = self.router.clone();
        let statics = self.statics.clone();
        let endpoint = next_fn(move |request: Request| {
            let router = router.clone();
            let statics = statics.clone();
            async move { route(&router, &statics, request).await }
        });

        chain.execute(request, endpoint).await.unwrap_or_else(|e| e)
    }

    pub fn router(&self) -> &Router {
        &self.router
    }
}

async fn route(router: &Router, statics: &[StaticFiles], request: Request) -> Response {
    if let Some((handler, params)) = router.match_route(request.method(), request.path()) {
        let request = request.with_params(params);
        return match AssertUnwindSafe(async move { handler(request).await })
            .catch_unwind()
            .await
        {
            Ok(response) => response,
            Err(panic) => {
                tracing::error!(panic = panic_message(panic.as_ref()), "handler panicked");
                Err(FrameworkError::internal("handler panicked").into())
            }
        };
    }

    for files in statics {
        if let Some(response) = files.serve(&request).await {
            return response;
        }
    }

    Err(FrameworkError::NotFound.into())
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> &str {
    if let Some(message) = panic.downcast_ref::<&str>() {
        message
    } else if let Some(message) = panic.downcast_ref::<String>() {
        message.as_str()
    } else {
        "non-string panic payload"
    }
}

pub struct Server {
    router: Router,
    middleware: MiddlewareRegistry,
    statics: Vec<StaticFiles>,
    host: String,
    port: u16,
    max_body_size: usize,
}

impl Server {
    pub fn new(router: impl Into<Router>) -> Self {
        Self {
            router: router.into(),
            middleware: MiddlewareRegistry::new(),
            statics: Vec::new(),
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_body_size: DEFAULT_MAX_BODY_SIZE,
        }
    }

    /// Server with the standard storefront pipeline
    ///
    /// CORS, then JSON body parsing, then the per-request database scope,
    /// with the uploads directory served after the route table.
    pub fn from_settings(router: impl Into<Router>, settings: &Settings, db: DbConnection) -> Self {
        Self::new(router)
            .host(&settings.server.host)
            .port(settings.server.port)
            .max_body_size(settings.server.max_body_size)
            .middleware(CorsMiddleware::new(CorsPolicy::new(&settings.cors)))
            .middleware(JsonBodyMiddleware)
            .middleware(DatabaseContextMiddleware::new(DbContext::new(db)))
            .static_files(StaticFiles::from_config(&settings.uploads))
    }

    /// Add global middleware; runs on every request in registration order
    ///
    /// ```rust,ignore
    /// Server::new(router)
    ///     .middleware(CorsMiddleware::new(policy))
    ///     .middleware(JsonBodyMiddleware)
    /// ```
    pub fn middleware<M: Middleware + 'static>(mut self, middleware: M) -> Self {
        self.middleware = self.middleware.append(middleware);
        self
    }

    /// Serve a directory after the route table
    pub fn static_files(mut self, files: StaticFiles) -> Self {
        self.statics.push(files);
        self
    }

    pub fn host(mut self, host: &str) -> Self {
        self.host = host.to_string();
        self
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn max_body_size(mut self, limit: usize) -> Self {
        self.max_body_size = limit;
        self
    }

    pub fn pipeline(self) -> Pipeline {
        self.into_parts().0
    }

    fn into_parts(self) -> (Pipeline, String, u16, usize) {
        let pipeline = Pipeline {
            middleware: self.middleware,
            router: Arc::new(self.router),
            statics: Arc::new(self.statics),
        };
        (pipeline, self.host, self.port, self.max_body_size)
    }

    /// Bind the listener; nothing is served until [`BoundServer::serve`]
    pub async fn bind(self) -> Result<BoundServer, FrameworkError> {
        let (pipeline, host, port, max_body_size) = self.into_parts();
        let listener = TcpListener::bind((host.as_str(), port))
            .await
            .map_err(|e| FrameworkError::internal(format!("Cannot bind {}:{}: {}", host, port, e)))?;
        let local_addr = listener
            .local_addr()
            .map_err(|e| FrameworkError::internal(e.to_string()))?;

        tracing::info!(
            address = %local_addr,
            routes = pipeline.router().routes().len(),
            "listener bound"
        );

        Ok(BoundServer {
            listener,
            local_addr,
            pipeline: Arc::new(pipeline),
            max_body_size,
        })
    }

    /// Bind and serve until Ctrl-C
    pub async fn run(self) -> Result<(), FrameworkError> {
        self.bind().await?.serve().await
    }
}

/// A server whose listener is bound but not yet accepting
pub struct BoundServer {
    listener: TcpListener,
    local_addr: SocketAddr,
    pipeline: Arc<Pipeline>,
    max_body_size: usize,
}

impl BoundServer {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Serve until Ctrl-C
    pub async fn serve(self) -> Result<(), FrameworkError> {
        self.serve_with_shutdown(ctrl_c()).await
    }

    /// Accept connections until `signal` resolves
    ///
    /// Each connection runs on its own task. When a client goes away the
    /// in-flight request future is dropped, which releases its database scope.
    pub async fn serve_with_shutdown<F>(self, signal: F) -> Result<(), FrameworkError>
    where
        F: Future<Output = ()>,
    {
        tracing::info!("Storefront server running on http://{}", self.local_addr);
        tokio::pin!(signal);

        loop {
            tokio::select! {
                accepted = self.listener.accept() => {
                    let (stream, remote) = match accepted {
                        Ok(accepted) => accepted,
                        Err(e) => {
                            tracing::warn!(error = %e, "accept failed");
                            continue;
                        }
                    };
                    let io = TokioIo::new(stream);
                    let pipeline = self.pipeline.clone();
                    let limit = self.max_body_size;

                    tokio::spawn(async move {
                        let service = service_fn(move |req: hyper::Request<hyper::body::Incoming>| {
                            let pipeline = pipeline.clone();
                            async move { Ok::<_, Infallible>(handle_request(pipeline, limit, req).await) }
                        });

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            tracing::debug!(error = %err, %remote, "connection error");
                        }
                    });
                }
                _ = &mut signal => {
                    tracing::info!("shutdown signal received, no longer accepting connections");
                    return Ok(());
                }
            }
        }
    }
}

/// Resolves on Ctrl-C; never resolves if the signal cannot be installed
pub(crate) async fn ctrl_c() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "cannot listen for Ctrl-C");
        std::future::pending::<()>().await;
    }
}

async fn handle_request(
    pipeline: Arc<Pipeline>,
    body_limit: usize,
    req: hyper::Request<hyper::body::Incoming>,
) -> hyper::Response<Full<Bytes>> {
    let started = Instant::now();
    let span = tracing::info_span!(
        "http.request",
        method = %req.method(),
        path = %req.uri().path(),
        origin = tracing::field::Empty,
    );

    async move {
        let request = Request::from_incoming(req, body_limit).await;
        if let Some(origin) = request.origin() {
            tracing::Span::current().record("origin", origin);
        }

        let response = pipeline.dispatch(request).await;
        tracing::info!(
            status = response.status_code(),
            latency_ms = started.elapsed().as_millis() as u64,
            "request completed"
        );
        response.into_hyper()
    }
    .instrument(span)
    .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CorsConfig;
    use crate::testing::{self, TestDatabase, TEST_ORIGIN};
    use tokio::io::{AsyncReadExt, AsyncWriteExt};

    async fn list(_req: Request) -> Response {
        Ok(HttpResponse::json(serde_json::json!([{ "id": 1, "name": "Tools" }])))
    }

    async fn scoped(req: Request) -> Response {
        let scope = req.db()?;
        Ok(HttpResponse::json(serde_json::json!({ "scope": scope.id() })))
    }

    async fn failing(_req: Request) -> Response {
        Err(FrameworkError::model_not_found("Category").into())
    }

    async fn explode(_req: Request) -> Response {
        panic!("boom")
    }

    fn router() -> Router {
        Router::new().group("/api/categories", |r| {
            r.get("/", list)
                .get("/scoped", scoped)
                .get("/missing", failing)
                .get("/panic", explode)
        })
    }

    struct Harness {
        _uploads: tempfile::TempDir,
        _db: TestDatabase,
        pipeline: Pipeline,
        context_stats: Arc<crate::database::ScopeStats>,
    }

    async fn harness() -> Harness {
        let uploads = tempfile::tempdir().unwrap();
        std::fs::write(uploads.path().join("logo.svg"), b"<svg/>").unwrap();
        let db = TestDatabase::new().await;
        let context = db.context();
        let stats = context.stats();
        let settings = testing::settings(uploads.path());

        let pipeline = Server::new(router())
            .middleware(CorsMiddleware::new(CorsPolicy::new(&settings.cors)))
            .middleware(JsonBodyMiddleware)
            .middleware(DatabaseContextMiddleware::new(context))
            .static_files(StaticFiles::from_config(&settings.uploads))
            .pipeline();

        Harness {
            _uploads: uploads,
            _db: db,
            pipeline,
            context_stats: stats,
        }
    }

    #[tokio::test]
    async fn routes_through_pipeline_with_cors_headers() {
        let h = harness().await;
        let response = h
            .pipeline
            .dispatch(testing::request("GET", "/api/categories", &[], ""))
            .await;

        assert_eq!(response.status_code(), 200);
        assert_eq!(
            response.header_value("Access-Control-Allow-Origin"),
            Some(TEST_ORIGIN)
        );
        assert_eq!(
            response.header_value("Access-Control-Allow-Credentials"),
            Some("true")
        );
    }

    #[tokio::test]
    async fn preflight_never_reaches_router() {
        let h = harness().await;
        let response = h
            .pipeline
            .dispatch(testing::request(
                "OPTIONS",
                "/api/categories/panic",
                &[("origin", TEST_ORIGIN)],
                "",
            ))
            .await;

        assert_eq!(response.status_code(), 204);
        assert!(response.body().is_empty());
        assert_eq!(h.context_stats.opened(), 0);
    }

    #[tokio::test]
    async fn unknown_paths_get_uniform_404() {
        let h = harness().await;
        for (method, path) in [
            ("GET", "/"),
            ("GET", "/api/unknown"),
            ("DELETE", "/api/categories"),
            ("GET", "/uploads/missing.png"),
            ("POST", "/health"),
        ] {
            let response = h.pipeline.dispatch(testing::request(method, path, &[], "")).await;
            assert_eq!(response.status_code(), 404, "{} {}", method, path);
            assert_eq!(
                response.json_body(),
                Some(serde_json::json!({ "message": "Resource not found!" }))
            );
            assert_eq!(
                response.header_value("Access-Control-Allow-Origin"),
                Some(TEST_ORIGIN)
            );
        }
    }

    #[tokio::test]
    async fn rejected_origin_skips_database_scope() {
        let h = harness().await;
        let response = h
            .pipeline
            .dispatch(testing::request(
                "GET",
                "/api/categories/scoped",
                &[("origin", "https://evil.test")],
                "",
            ))
            .await;

        assert_eq!(response.status_code(), 403);
        assert_eq!(h.context_stats.opened(), 0);
    }

    #[tokio::test]
    async fn every_request_opens_and_releases_one_scope() {
        let h = harness().await;
        let pipeline = Arc::new(h.pipeline);

        let mut handles = Vec::new();
        for path in ["/api/categories/scoped", "/api/categories/missing", "/api/categories/panic", "/nowhere"]
            .into_iter()
            .cycle()
            .take(20)
        {
            let pipeline = pipeline.clone();
            handles.push(tokio::spawn(async move {
                pipeline.dispatch(testing::request("GET", path, &[], "")).await
            }));
        }
        for handle in handles {
            handle.await.unwrap();
        }

        assert_eq!(h.context_stats.opened(), 20);
        assert_eq!(h.context_stats.released(), 20);
    }

    #[tokio::test]
    async fn panicking_handler_becomes_500() {
        let h = harness().await;
        let response = h
            .pipeline
            .dispatch(testing::request("GET", "/api/categories/panic", &[], ""))
            .await;

        assert_eq!(response.status_code(), 500);
        assert_eq!(
            response.json_body(),
            Some(serde_json::json!({ "message": "Internal server error" }))
        );
        assert_eq!(
            response.header_value("Access-Control-Allow-Origin"),
            Some(TEST_ORIGIN)
        );
    }

    #[tokio::test]
    async fn uploads_are_served_and_guarded() {
        let h = harness().await;
        let served = h
            .pipeline
            .dispatch(testing::request("GET", "/uploads/logo.svg", &[], ""))
            .await;
        assert_eq!(served.status_code(), 200);
        assert_eq!(served.body().as_ref(), b"<svg/>");

        let escaped = h
            .pipeline
            .dispatch(testing::request("GET", "/uploads/../../etc/passwd", &[], ""))
            .await;
        assert_eq!(escaped.status_code(), 403);
    }

    #[tokio::test]
    async fn malformed_json_is_400_before_routing() {
        let h = harness().await;
        let response = h
            .pipeline
            .dispatch(testing::request(
                "POST",
                "/api/categories",
                &[("content-type", "application/json")],
                "{oops",
            ))
            .await;
        assert_eq!(response.status_code(), 400);
        assert_eq!(h.context_stats.opened(), 0);
    }

    #[tokio::test]
    async fn serves_over_tcp_until_shutdown() {
        let db = TestDatabase::new().await;
        let uploads = tempfile::tempdir().unwrap();
        let mut settings = testing::settings(uploads.path());
        settings.cors = CorsConfig::parse("https://shop.test").unwrap();

        let bound = Server::from_settings(router(), &settings, db.connection())
            .bind()
            .await
            .unwrap();
        let addr = bound.local_addr();
        let (stop, stopped) = tokio::sync::oneshot::channel::<()>();
        let serving = tokio::spawn(bound.serve_with_shutdown(async {
            let _ = stopped.await;
        }));

        let mut stream = tokio::net::TcpStream::connect(addr).await.unwrap();
        stream
            .write_all(b"GET /missing HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
            .await
            .unwrap();
        let mut raw = String::new();
        stream.read_to_string(&mut raw).await.unwrap();

        assert!(raw.starts_with("HTTP/1.1 404"));
        assert!(raw.contains("Resource not found!"));
        assert!(raw
            .to_ascii_lowercase()
            .contains("access-control-allow-origin: https://shop.test"));

        stop.send(()).unwrap();
        serving.await.unwrap().unwrap();
    }

    #[tokio::test]
    async fn bind_failure_is_reported() {
        let taken = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = taken.local_addr().unwrap().port();

        let err = Server::new(Router::new())
            .host("127.0.0.1")
            .port(port)
            .bind()
            .await
            .err()
            .unwrap();
        assert!(err.to_string().contains("Cannot bind"));
    }
}
