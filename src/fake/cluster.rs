//! A registry-held fake application plus the request matchers for its
//! control traffic.

use axum::http::Method;
use tokio::sync::Mutex;

use crate::fake::app::{FakeApp, FakeTarget};
use crate::{contains_ignore_case, wire, ProxyError};

/// One fake application cluster. The inner app carries its own lock so
/// instances can be added and removed while other requests read the cluster.
#[derive(Debug)]
pub struct AppCluster {
    id: String,
    app: Mutex<FakeApp>,
}

impl AppCluster {
    pub fn new(app: FakeApp) -> AppCluster {
        AppCluster {
            id: app.id().to_string(),
            app: Mutex::new(app),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Merge all instances of `app` into this cluster.
    pub async fn absorb(&self, app: FakeApp) -> Result<(), ProxyError> {
        if !self.id.eq_ignore_ascii_case(app.id()) {
            return Err(ProxyError::BadRegistration(format!(
                "cannot add an application with id: {} to cluster with id: {}",
                app.id(),
                self.id
            )));
        }
        self.app.lock().await.merge(app);
        Ok(())
    }

    /// Remove one instance; the removed target is handed back for logging.
    pub async fn deregister(&self, instance_id: &str) -> Option<FakeTarget> {
        self.app.lock().await.remove_target(instance_id)
    }

    pub async fn is_empty(&self) -> bool {
        self.app.lock().await.is_empty()
    }

    /// A consistent snapshot of the cluster as a Eureka application.
    pub async fn to_eureka_app(&self) -> wire::Application {
        self.app.lock().await.to_eureka_app()
    }

    pub fn is_registration(&self, method: &Method, path: &str) -> bool {
        *method == Method::POST
            && contains_ignore_case(path, &format!("eureka/apps/{}", self.id))
    }

    pub fn is_heartbeat(&self, method: &Method, path: &str) -> bool {
        *method == Method::PUT && contains_ignore_case(path, &format!("eureka/apps/{}", self.id))
    }

    /// Deregistration match; yields the instance id trailing the app path.
    pub fn deregistration_instance(&self, method: &Method, path: &str) -> Option<String> {
        if *method != Method::DELETE {
            return None;
        }
        let needle = format!("eureka/apps/{}/", self.id);
        split_after_ignore_case(path, &needle).map(|rest| rest.to_string())
    }
}

fn split_after_ignore_case<'a>(haystack: &'a str, needle: &str) -> Option<&'a str> {
    let idx = haystack
        .to_ascii_lowercase()
        .find(&needle.to_ascii_lowercase())?;
    haystack.get(idx + needle.len()..)
}
