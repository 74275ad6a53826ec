//! The registry-mutation layer: the set of fake application clusters, the
//! request classifier that intercepts Eureka control traffic, and the
//! response merge for the applications listing.

use std::sync::Arc;

use axum::body::to_bytes;
use axum::extract::{Request, State};
use axum::http::header::CONTENT_TYPE;
use axum::http::{Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use regex::Regex;
use tokio::sync::RwLock;

use crate::httputil::{self, ResponseRecorder};
use crate::wire::{self, RegistrationRequest};
use crate::ProxyError;

pub use self::app::{FakeApp, FakeTarget};
pub use self::cluster::AppCluster;

pub mod app;
pub mod cluster;

lazy_static! {
    static ref REGISTRATION_PATH: Regex = Regex::new(r"/eureka/apps/[\w-]+").unwrap();
    static ref HEARTBEAT_PATH: Regex = Regex::new(r"/eureka/apps/[\w-]+/.*\d{4}$").unwrap();
}

/// Process-wide set of fake application clusters. Insertion order is kept so
/// classification visits clusters in the order they were declared.
pub struct FakeRegistry {
    clusters: RwLock<Vec<Arc<AppCluster>>>,
    pollute: bool,
}

impl FakeRegistry {
    /// Group the declared fake apps into clusters; apps sharing an id merge
    /// into one cluster.
    pub fn new(apps: Vec<FakeApp>, pollute: bool) -> FakeRegistry {
        let mut grouped: Vec<FakeApp> = Vec::new();
        for app in apps {
            match grouped.iter_mut().find(|g| g.id() == app.id()) {
                Some(existing) => existing.merge(app),
                None => grouped.push(app),
            }
        }

        FakeRegistry {
            clusters: RwLock::new(
                grouped
                    .into_iter()
                    .map(|app| Arc::new(AppCluster::new(app)))
                    .collect(),
            ),
            pollute,
        }
    }

    /// When polluting, unknown registrations and heartbeats pass through to
    /// the real Eureka instead of being intercepted.
    pub fn pollute(&self) -> bool {
        self.pollute
    }

    pub async fn snapshot(&self) -> Vec<Arc<AppCluster>> {
        self.clusters.read().await.clone()
    }

    /// Add a fake app, merging into an existing cluster when the id is
    /// already known.
    pub async fn inject(&self, app: FakeApp) -> Result<(), ProxyError> {
        let mut clusters = self.clusters.write().await;
        match clusters.iter().find(|cluster| cluster.id() == app.id()) {
            Some(cluster) => cluster.absorb(app).await,
            None => {
                clusters.push(Arc::new(AppCluster::new(app)));
                Ok(())
            }
        }
    }

    async fn remove(&self, id: &str) {
        self.clusters.write().await.retain(|cluster| cluster.id() != id);
    }

    pub async fn names(&self) -> Vec<String> {
        self.clusters
            .read()
            .await
            .iter()
            .map(|cluster| cluster.id().to_string())
            .collect()
    }
}

/// Classify every request against the fake registry: the applications
/// listing is rewritten, control traffic for fake apps is answered locally,
/// everything else falls through to the forwarder.
pub async fn intercept(
    State(registry): State<Arc<FakeRegistry>>,
    req: Request,
    next: Next,
) -> Response {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    if is_apps_listing(&method, &path) {
        let resp = next.run(req).await;
        return match respond_with_fakes(&registry, resp).await {
            Ok(resp) => resp,
            Err(err) => {
                error!("could not rewrite applications listing: {}", err);
                StatusCode::BAD_GATEWAY.into_response()
            }
        };
    }

    if !registry.pollute() {
        for cluster in registry.snapshot().await {
            if cluster.is_registration(&method, &path) {
                return match absorb_registration(&cluster, req).await {
                    Ok(()) => registered_response(),
                    Err(err) => {
                        error!("could not absorb registration for {}: {}", cluster.id(), err);
                        StatusCode::INTERNAL_SERVER_ERROR.into_response()
                    }
                };
            }

            if cluster.is_heartbeat(&method, &path) {
                return StatusCode::OK.into_response();
            }

            if let Some(instance_id) = cluster.deregistration_instance(&method, &path) {
                if let Some(target) = cluster.deregister(&instance_id).await {
                    info!(
                        "A deregistration request was detected. Deregistering: {} instance: {}",
                        cluster.id(),
                        target
                    );
                }
                if cluster.is_empty().await {
                    registry.remove(cluster.id()).await;
                }
                // The instance is gone as far as the client is concerned.
                return StatusCode::NOT_FOUND.into_response();
            }
        }

        if method == Method::POST && REGISTRATION_PATH.is_match(&path) {
            return match read_registration(req).await {
                Ok(app) => inject_fake_app(&registry, app, registered_response()).await,
                Err(err) => {
                    error!("could not read registration request: {}", err);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            };
        }

        if method == Method::PUT && HEARTBEAT_PATH.is_match(&path) {
            return match heartbeat_app(&path) {
                Ok(app) => inject_fake_app(&registry, app, StatusCode::OK.into_response()).await,
                Err(err) => {
                    error!("could not synthesize app from heartbeat: {}", err);
                    StatusCode::INTERNAL_SERVER_ERROR.into_response()
                }
            };
        }
    }

    next.run(req).await
}

fn is_apps_listing(method: &Method, path: &str) -> bool {
    *method == Method::GET
        && (path.ends_with("eureka/apps") || path.ends_with("eureka/apps/"))
}

fn registered_response() -> Response {
    (
        StatusCode::NO_CONTENT,
        [(CONTENT_TYPE, "application/json")],
    )
        .into_response()
}

async fn inject_fake_app(registry: &FakeRegistry, app: FakeApp, reply: Response) -> Response {
    info!("A new service was detected. Injecting: {}", app);
    match registry.inject(app).await {
        Ok(()) => reply,
        Err(err) => {
            error!("could not inject fake app: {}", err);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

async fn absorb_registration(cluster: &AppCluster, req: Request) -> Result<(), ProxyError> {
    let app = read_registration(req).await?;
    cluster.absorb(app).await
}

/// Parse a Eureka registration body into a single-instance fake app.
async fn read_registration(req: Request) -> Result<FakeApp, ProxyError> {
    let bytes = to_bytes(req.into_body(), usize::MAX).await.map_err(|err| {
        ProxyError::BadRegistration(format!("could not read registration body: {}", err))
    })?;
    let registration: RegistrationRequest = serde_json::from_slice(&bytes).map_err(|err| {
        ProxyError::BadRegistration(format!("could not parse registration body: {}", err))
    })?;

    let instance = registration.instance;
    let port = instance
        .port
        .as_ref()
        .ok_or_else(|| {
            ProxyError::BadRegistration(format!(
                "registration for {} carries no port",
                instance.app
            ))
        })?
        .number();
    // hostName doubles as the instance id when the client sends none.
    let instance_id = instance
        .instance_id
        .clone()
        .unwrap_or_else(|| instance.host_name.clone());

    Ok(FakeApp::single_instance(
        &instance.app,
        &instance_id,
        &instance.ip_addr,
        &instance.host_name,
        port,
    ))
}

/// Synthesize a local fake app from a heartbeat path. The port is read from
/// the trailing four digits, which limits detectable ports to 1000-9999.
fn heartbeat_app(path: &str) -> Result<FakeApp, ProxyError> {
    let segments: Vec<&str> = path.split('/').collect();
    if segments.len() < 2 {
        return Err(ProxyError::BadRegistration(format!(
            "heartbeat path too short: {}",
            path
        )));
    }
    let instance_id = segments[segments.len() - 1];
    let app_id = segments[segments.len() - 2];
    let port: u16 = path[path.len() - 4..].parse().map_err(|err| {
        ProxyError::BadRegistration(format!(
            "could not parse port from heartbeat path {}: {}",
            path, err
        ))
    })?;

    FakeApp::local_with_instance(app_id, instance_id, port)
}

/// Rewrite the recorded applications listing: every fake cluster replaces
/// the instances of its upstream namesake or is appended as a new
/// application, preserving representation and compression.
async fn respond_with_fakes(
    registry: &FakeRegistry,
    resp: Response,
) -> Result<Response, ProxyError> {
    let rec = ResponseRecorder::record(resp).await?;

    let content_type = rec.content_type().to_string();
    let gzipped = rec.is_gzip();
    let body = rec.body()?;
    let mut state = wire::decode(&content_type, &body)?;

    for cluster in registry.snapshot().await {
        let fake = cluster.to_eureka_app().await;
        match state.applications.find_app_mut(cluster.id()) {
            Some(existing) => existing.replace_instances(fake.instance),
            None => state.applications.add_app(fake),
        }
    }

    let mut bytes = wire::encode(&content_type, &state)?;
    if gzipped {
        bytes = httputil::gzip(&bytes)?;
    }

    let names = registry.names().await;
    if !names.is_empty() {
        info!(
            "Will respond with the following fake services:\n\n{}\n",
            names.join("\n")
        );
    }

    Ok(rec.flush_with(bytes))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::header::{CONTENT_ENCODING, CONTENT_LENGTH};

    use super::*;

    fn fake_app(id: &str, port: u16) -> FakeApp {
        FakeApp::single_instance(id, id, "10.0.0.7", "dev-box", port)
    }

    fn json_response(body: &str) -> Response {
        Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/json")
            .header(CONTENT_LENGTH, body.len().to_string())
            .body(Body::from(body.to_string()))
            .unwrap()
    }

    #[test]
    fn test_apps_listing_detection() {
        assert!(is_apps_listing(&Method::GET, "/eureka/apps"));
        assert!(is_apps_listing(&Method::GET, "/eureka/apps/"));
        assert!(is_apps_listing(&Method::GET, "/v2/eureka/apps"));
        assert!(!is_apps_listing(&Method::GET, "/eureka/apps/FOO"));
        assert!(!is_apps_listing(&Method::POST, "/eureka/apps"));
    }

    #[test]
    fn test_path_patterns() {
        assert!(REGISTRATION_PATH.is_match("/eureka/apps/foo-service"));
        assert!(!REGISTRATION_PATH.is_match("/eureka/apps/"));

        assert!(HEARTBEAT_PATH.is_match("/eureka/apps/foo/dev-box:foo:8081"));
        assert!(!HEARTBEAT_PATH.is_match("/eureka/apps/foo/dev-box:foo:80"));
        assert!(!HEARTBEAT_PATH.is_match("/eureka/apps/foo"));
    }

    #[tokio::test]
    async fn test_registry_groups_apps_by_id() {
        let registry = FakeRegistry::new(
            vec![fake_app("foo", 8081), fake_app("FOO", 9000), fake_app("bar", 7000)],
            false,
        );

        assert_eq!(
            registry.names().await,
            vec!["foo".to_string(), "bar".to_string()]
        );
    }

    #[tokio::test]
    async fn test_inject_and_remove_cluster() {
        let registry = FakeRegistry::new(vec![], false);
        registry.inject(fake_app("new", 1234)).await.unwrap();
        assert_eq!(registry.names().await, vec!["new".to_string()]);

        registry.remove("new").await;
        assert!(registry.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_read_registration_builds_a_single_instance_app() {
        let body = r#"{"instance":{"app":"NEW","hostName":"h","ipAddr":"1.2.3.4","port":{"$":1234,"@enabled":"true"}}}"#;
        let req = Request::builder()
            .method(Method::POST)
            .uri("/eureka/apps/NEW")
            .body(Body::from(body))
            .unwrap();

        let app = read_registration(req).await.unwrap();
        assert_eq!(app.id(), "new");
        let target = app.targets().next().unwrap();
        assert_eq!(target.instance_id, "h");
        assert_eq!(target.ip_address, "1.2.3.4");
        assert_eq!(target.port, 1234);
    }

    #[tokio::test]
    async fn test_read_registration_rejects_garbage() {
        let req = Request::builder()
            .method(Method::POST)
            .uri("/eureka/apps/NEW")
            .body(Body::from("not json"))
            .unwrap();

        assert!(read_registration(req).await.is_err());
    }

    #[tokio::test]
    async fn test_merge_appends_unknown_fake_app() {
        let registry = FakeRegistry::new(vec![fake_app("foo", 8081)], false);
        let resp = json_response(r#"{"applications":{"application":[]}}"#);

        let merged = respond_with_fakes(&registry, resp).await.unwrap();
        assert!(merged.headers().get(CONTENT_LENGTH).is_none());

        let bytes = to_bytes(merged.into_body(), usize::MAX).await.unwrap();
        let state = wire::decode("application/json", &bytes).unwrap();
        assert_eq!(state.applications.application.len(), 1);

        let app = &state.applications.application[0];
        assert_eq!(app.name, "FOO");
        assert_eq!(app.instance.len(), 1);
        assert_eq!(app.instance[0].port.as_ref().unwrap().number(), 8081);
        assert_eq!(app.instance[0].vip_address.as_deref(), Some("foo"));
    }

    #[tokio::test]
    async fn test_merge_replaces_instances_of_known_app() {
        let registry = FakeRegistry::new(vec![fake_app("bar", 9000)], false);
        let upstream = r#"{"applications":{"application":[
            {"name":"BAR","instance":[
                {"hostName":"a","app":"BAR","ipAddr":"10.1.1.1","status":"UP","port":{"$":1,"@enabled":"true"}},
                {"hostName":"b","app":"BAR","ipAddr":"10.1.1.2","status":"UP","port":{"$":2,"@enabled":"true"}},
                {"hostName":"c","app":"BAR","ipAddr":"10.1.1.3","status":"UP","port":{"$":3,"@enabled":"true"}}]},
            {"name":"OTHER","instance":[
                {"hostName":"d","app":"OTHER","ipAddr":"10.1.1.4","status":"UP","port":{"$":4,"@enabled":"true"}}]}
        ]}}"#;

        let merged = respond_with_fakes(&registry, json_response(upstream))
            .await
            .unwrap();
        let bytes = to_bytes(merged.into_body(), usize::MAX).await.unwrap();
        let state = wire::decode("application/json", &bytes).unwrap();

        assert_eq!(state.applications.application.len(), 2);
        let bar = &state.applications.application[0];
        assert_eq!(bar.name, "BAR");
        assert_eq!(bar.instance.len(), 1);
        assert_eq!(bar.instance[0].port.as_ref().unwrap().number(), 9000);

        let other = &state.applications.application[1];
        assert_eq!(other.name, "OTHER");
        assert_eq!(other.instance[0].host_name, "d");
    }

    #[tokio::test]
    async fn test_merge_preserves_gzipped_xml() {
        let registry = FakeRegistry::new(vec![fake_app("qux", 7000)], false);
        let upstream = "<applications><application><name>QUX</name><instance>\
            <hostName>old</hostName><app>QUX</app><ipAddr>10.1.1.9</ipAddr><status>UP</status>\
            <port enabled=\"true\">6999</port></instance></application></applications>";
        let zipped = httputil::gzip(upstream.as_bytes()).unwrap();

        let resp = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "application/xml")
            .header(CONTENT_ENCODING, "gzip")
            .body(Body::from(zipped))
            .unwrap();

        let merged = respond_with_fakes(&registry, resp).await.unwrap();
        assert_eq!(merged.headers().get(CONTENT_ENCODING).unwrap(), "gzip");

        let bytes = to_bytes(merged.into_body(), usize::MAX).await.unwrap();
        let xml = httputil::gunzip(&bytes).unwrap();
        let state = wire::decode("application/xml", &xml).unwrap();

        let qux = &state.applications.application[0];
        assert_eq!(qux.name, "QUX");
        assert_eq!(qux.instance.len(), 1);
        assert_eq!(qux.instance[0].port.as_ref().unwrap().number(), 7000);
    }

    #[tokio::test]
    async fn test_merge_rejects_unknown_content_type() {
        let registry = FakeRegistry::new(vec![], false);
        let resp = Response::builder()
            .status(StatusCode::OK)
            .header(CONTENT_TYPE, "text/html")
            .body(Body::from("<html></html>"))
            .unwrap();

        assert!(respond_with_fakes(&registry, resp).await.is_err());
    }

    #[tokio::test]
    async fn test_merge_round_trips_untouched_listing() {
        let registry = FakeRegistry::new(vec![], false);
        let upstream = r#"{"applications":{"versions__delta":"1","apps__hashcode":"UP_1_","application":[{"name":"REAL","instance":[{"hostName":"h","app":"REAL","ipAddr":"10.1.1.1","status":"UP","port":{"$":80,"@enabled":"true"}}]}]}}"#;

        let merged = respond_with_fakes(&registry, json_response(upstream))
            .await
            .unwrap();
        let bytes = to_bytes(merged.into_body(), usize::MAX).await.unwrap();

        let before: serde_json::Value = serde_json::from_str(upstream).unwrap();
        let after: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(before, after);
    }
}
