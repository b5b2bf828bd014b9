//! Route table mapping method and exact path to endpoints.

use crate::error::{ConfigurationError, Unhandled};
use crate::function::{Endpoint, Handler};
use crate::http::{decoded_path, json_error, HttpRequest, HttpResponse};
use hyper::{Method, StatusCode};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Translates failures an endpoint could not answer into a response.
pub type ErrorHandler = Arc<dyn Fn(&Unhandled) -> HttpResponse + Send + Sync>;

struct Route {
    method: Method,
    endpoint: Endpoint,
}

/// The application: registered endpoints and the handler for unhandled
/// failures.
pub struct App {
    routes: HashMap<String, Vec<Route>>,
    error_handler: ErrorHandler,
}

impl App {
    pub fn new() -> Self {
        Self {
            routes: HashMap::new(),
            error_handler: Arc::new(internal_error),
        }
    }

    /// Compile `handler` into an endpoint and register it for `method` and
    /// `path`.
    ///
    /// Registering the same method and path again replaces the endpoint.
    pub fn route<F, Args>(
        &mut self,
        method: Method,
        path: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Handler<Args>,
        Args: 'static,
    {
        let path = path.into();
        let endpoint = Endpoint::new(handler).map_err(|err| {
            warn!("Failed to register {} {}: {}", method, path, err);
            err
        })?;

        let routes = self.routes.entry(path.clone()).or_default();
        match routes.iter_mut().find(|route| route.method == method) {
            Some(route) => {
                warn!("Replacing endpoint for {} {}", method, path);
                route.endpoint = endpoint;
            }
            None => {
                info!("Registered endpoint {} {}", method, path);
                routes.push(Route { method, endpoint });
            }
        }
        Ok(self)
    }

    /// Register a `GET` endpoint.
    pub fn get<F, Args>(
        &mut self,
        path: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Handler<Args>,
        Args: 'static,
    {
        self.route(Method::GET, path, handler)
    }

    /// Register a `POST` endpoint.
    pub fn post<F, Args>(
        &mut self,
        path: impl Into<String>,
        handler: F,
    ) -> Result<&mut Self, ConfigurationError>
    where
        F: Handler<Args>,
        Args: 'static,
    {
        self.route(Method::POST, path, handler)
    }

    /// Replace the handler for failures endpoints return as [`Unhandled`].
    pub fn error_handler<H>(&mut self, handler: H) -> &mut Self
    where
        H: Fn(&Unhandled) -> HttpResponse + Send + Sync + 'static,
    {
        self.error_handler = Arc::new(handler);
        self
    }

    /// Registered method and path pairs, sorted by path.
    pub fn routes(&self) -> Vec<(Method, String)> {
        let mut routes: Vec<(Method, String)> = self
            .routes
            .iter()
            .flat_map(|(path, routes)| {
                routes
                    .iter()
                    .map(move |route| (route.method.clone(), path.clone()))
            })
            .collect();
        routes.sort_by(|a, b| (&a.1, a.0.as_str()).cmp(&(&b.1, b.0.as_str())));
        routes
    }

    /// Route one request to its endpoint, looked up by its percent-decoded
    /// path.
    pub async fn dispatch(&self, mut request: HttpRequest) -> HttpResponse {
        let method = request.method().clone();
        let path = decoded_path(&mut request);
        debug!("Handling request: {} {}", method, path);

        let Some(routes) = self.routes.get(&path) else {
            return json_error(StatusCode::NOT_FOUND, "not found");
        };
        let Some(route) = routes.iter().find(|route| route.method == method) else {
            return json_error(StatusCode::METHOD_NOT_ALLOWED, "method not allowed");
        };

        match route.endpoint.handle(request).await {
            Ok(response) => response,
            Err(err) => (self.error_handler)(&err),
        }
    }
}

impl Default for App {
    fn default() -> Self {
        Self::new()
    }
}

fn internal_error(err: &Unhandled) -> HttpResponse {
    error!("PANIC: {}", err);
    json_error(StatusCode::INTERNAL_SERVER_ERROR, "server error")
}
