//! Path-prefix reverse proxy: a compiled route table in front of a
//! single-host forwarder.

use std::fmt::{self, Display, Formatter};
use std::sync::Arc;

use axum::body::Body;
use axum::extract::{Request, State};
use axum::http::header::HOST;
use axum::http::{HeaderMap, StatusCode};
use axum::middleware;
use axum::response::{IntoResponse, Response};
use axum::Router;
use tower_http::cors::CorsLayer;
use url::Url;

use crate::logging::{self, AccessLog};
use crate::proxy::strip::Strip;
use crate::ProxyError;

pub mod strip;

const HOP_BY_HOP_HEADERS: [&str; 8] = [
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// One proxied prefix: requests under `route` are forwarded to `target`
/// after the strip rule rewrites the path.
#[derive(Debug, Clone)]
pub struct RouteConfig {
    pub route: String,
    pub strip: String,
    pub target: Url,
}

impl RouteConfig {
    pub fn new(route: &str, strip: &str, target: Url) -> RouteConfig {
        RouteConfig {
            route: route.to_string(),
            strip: strip.to_string(),
            target,
        }
    }

    /// A one-entry route table covering every path.
    pub fn single(strip: &str, target: Url) -> Vec<RouteConfig> {
        vec![RouteConfig::new("/", strip, target)]
    }
}

impl Display for RouteConfig {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.strip.is_empty() {
            write!(f, "Route(from:'{}' to:'{}')", self.route, self.target)
        } else {
            write!(
                f,
                "Route(from:'{}' to:'{}' strip:'{}')",
                self.route, self.target, self.strip
            )
        }
    }
}

#[derive(Debug, Clone)]
pub struct ProxyConfig {
    pub routes: Vec<RouteConfig>,
    pub port: u16,
    pub trace: bool,
    pub logging_off: bool,
    pub enable_cors: bool,
}

#[derive(Debug)]
struct CompiledRoute {
    prefix: String,
    strip: Strip,
    target: Url,
}

#[derive(Debug)]
struct ProxyState {
    client: reqwest::Client,
    routes: Vec<CompiledRoute>,
}

/// The reverse proxy service. Construction validates every route, so a
/// malformed strip rule fails before the listener ever opens.
pub struct ReverseProxy {
    router: Router,
    config: ProxyConfig,
}

impl ReverseProxy {
    pub fn new(config: &ProxyConfig) -> Result<ReverseProxy, ProxyError> {
        let client = reqwest::Client::builder()
            .redirect(reqwest::redirect::Policy::none())
            .build()?;

        let mut routes = Vec::with_capacity(config.routes.len());
        for route in &config.routes {
            routes.push(CompiledRoute {
                prefix: route.route.clone(),
                strip: Strip::parse(&route.strip)?,
                target: route.target.clone(),
            });
        }

        let state = Arc::new(ProxyState { client, routes });
        let mut router = Router::new().fallback(forward).with_state(state);

        if !config.logging_off {
            router = router.layer(middleware::from_fn_with_state(
                AccessLog {
                    trace: config.trace,
                },
                logging::access_log,
            ));
        }
        if config.enable_cors {
            router = router.layer(CorsLayer::permissive());
        }

        Ok(ReverseProxy {
            router,
            config: config.clone(),
        })
    }

    /// The composed service, for callers stacking more middleware on top.
    pub fn into_router(self) -> Router {
        self.router
    }

    /// Bind and serve until the process is stopped.
    pub async fn start(self) -> Result<(), ProxyError> {
        info!("Reverse proxy starting on port {}", self.config.port);
        for route in &self.config.routes {
            info!("Proxying to {}", route);
        }
        serve(self.router, self.config.port).await
    }
}

/// Bind `router` on `port` and run it.
pub async fn serve(router: Router, port: u16) -> Result<(), ProxyError> {
    let listener = tokio::net::TcpListener::bind(("0.0.0.0", port)).await?;
    axum::serve(listener, router).await?;
    Ok(())
}

async fn forward(State(state): State<Arc<ProxyState>>, req: Request) -> Response {
    let path = req.uri().path();
    let Some(route) = state
        .routes
        .iter()
        .find(|route| path.starts_with(route.prefix.as_str()))
    else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match forward_to(&state.client, route, req).await {
        Ok(resp) => resp,
        Err(err) => {
            error!("could not forward request: {}", err);
            StatusCode::BAD_GATEWAY.into_response()
        }
    }
}

async fn forward_to(
    client: &reqwest::Client,
    route: &CompiledRoute,
    req: Request,
) -> Result<Response, ProxyError> {
    let path = route.strip.apply(req.uri().path());
    let url = join_upstream(&route.target, &path, req.uri().query());

    let (mut parts, body) = req.into_parts();
    remove_hop_by_hop_headers(&mut parts.headers);
    parts.headers.remove(HOST);

    debug!("Forwarding {} {}", parts.method, url);

    let upstream = client
        .request(parts.method, url)
        .headers(parts.headers)
        .body(reqwest::Body::wrap_stream(body.into_data_stream()))
        .send()
        .await?;

    let mut headers = upstream.headers().clone();
    remove_hop_by_hop_headers(&mut headers);

    let mut resp = Response::builder()
        .status(upstream.status())
        .body(Body::from_stream(upstream.bytes_stream()))
        .map_err(|err| ProxyError::Codec(format!("could not build response: {}", err)))?;
    *resp.headers_mut() = headers;

    Ok(resp)
}

/// Single-host rewrite: the target's path prefixes the (stripped) request
/// path, the query passes through untouched.
fn join_upstream(target: &Url, path: &str, query: Option<&str>) -> Url {
    let mut url = target.clone();
    let base = target.path().trim_end_matches('/');
    url.set_path(&format!("{}{}", base, path));
    url.set_query(query);
    url
}

fn remove_hop_by_hop_headers(headers: &mut HeaderMap) {
    for name in HOP_BY_HOP_HEADERS {
        headers.remove(name);
    }
}
