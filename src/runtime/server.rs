//! HTTP/1.1 server driving an [`App`].

use crate::http::{json_error, HttpRequest, HttpResponse};
use crate::runtime::{App, ServerConfig};
use http_body_util::{BodyExt, Limited};
use hyper::body::Incoming;
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, StatusCode};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info};

impl App {
    /// Serve the application with the default configuration.
    pub async fn run(self) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.serve(ServerConfig::default()).await
    }

    /// Accept connections on `config.bind_addr()` until the listener fails.
    pub async fn serve(
        self,
        config: ServerConfig,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let addr: SocketAddr = config.bind_addr().parse()?;
        let listener = TcpListener::bind(addr).await?;

        info!("Server listening on {}", addr);

        let app = Arc::new(self);
        let max_body_size = config.max_body_size;

        loop {
            let (stream, remote_addr) = listener.accept().await?;
            let io = TokioIo::new(stream);

            let app = app.clone();

            tokio::task::spawn(async move {
                let service = service_fn(move |req| {
                    let app = app.clone();
                    async move { handle_request(req, app, max_body_size, remote_addr).await }
                });

                if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                    error!("Error serving connection: {:?}", err);
                }
            });
        }
    }
}

/// Collect the body of an incoming request and dispatch it.
async fn handle_request(
    req: Request<Incoming>,
    app: Arc<App>,
    max_body_size: usize,
    remote_addr: SocketAddr,
) -> Result<HttpResponse, Infallible> {
    debug!("Accepted {} {} from {}", req.method(), req.uri(), remote_addr);

    let request = match collect_request(req, max_body_size).await {
        Some(request) => request,
        None => return Ok(json_error(StatusCode::PAYLOAD_TOO_LARGE, "request body too large")),
    };

    Ok(app.dispatch(request).await)
}

/// Buffer the request body, or `None` when it exceeds `max_body_size`.
async fn collect_request(req: Request<Incoming>, max_body_size: usize) -> Option<HttpRequest> {
    let (parts, body) = req.into_parts();
    match Limited::new(body, max_body_size).collect().await {
        Ok(collected) => Some(Request::from_parts(parts, collected.to_bytes())),
        Err(err) => {
            debug!("Failed to read request body: {}", err);
            None
        }
    }
}
