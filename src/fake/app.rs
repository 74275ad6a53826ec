//! Fake applications and their instances, as declared in configuration or
//! learned from intercepted registrations.

use std::collections::HashMap;
use std::fmt::{self, Display, Formatter};

use crate::{netutil, normalize, wire, ProxyError};

/// A single synthetic application instance.
#[derive(Debug, Clone, PartialEq)]
pub struct FakeTarget {
    pub instance_id: String,
    pub host_name: String,
    pub ip_address: String,
    pub port: u16,
}

impl Display for FakeTarget {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Instance{{id={}, host={}, port={}, ip={}}}",
            self.instance_id, self.host_name, self.port, self.ip_address
        )
    }
}

/// A synthetic application: a normalized id and its instances, keyed by
/// lower-cased instance id.
#[derive(Debug, Clone, Default)]
pub struct FakeApp {
    id: String,
    targets: HashMap<String, FakeTarget>,
}

impl FakeApp {
    pub fn new(id: &str) -> FakeApp {
        FakeApp {
            id: normalize(id),
            targets: HashMap::new(),
        }
    }

    /// An app holding exactly one instance.
    pub fn single_instance(
        app_id: &str,
        instance_id: &str,
        ip: &str,
        host: &str,
        port: u16,
    ) -> FakeApp {
        let mut app = FakeApp::new(app_id);
        app.add_target(FakeTarget {
            instance_id: instance_id.to_string(),
            host_name: host.to_string(),
            ip_address: ip.to_string(),
            port,
        });
        app
    }

    /// A single-instance app bound to this machine, with the
    /// `<hostname>:<id>:<port>` instance id convention.
    pub fn local(app_id: &str, port: u16) -> Result<FakeApp, ProxyError> {
        let host = netutil::hostname()?;
        let instance_id = format!("{}:{}:{}", host, app_id, port);
        FakeApp::local_with_instance(app_id, &instance_id, port)
    }

    /// A single-instance app bound to this machine under a caller-provided
    /// instance id.
    pub fn local_with_instance(
        app_id: &str,
        instance_id: &str,
        port: u16,
    ) -> Result<FakeApp, ProxyError> {
        let host = netutil::hostname()?;
        let ip = netutil::outbound_ip()?.to_string();
        Ok(FakeApp::single_instance(app_id, instance_id, &ip, &host, port))
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn add_target(&mut self, target: FakeTarget) {
        self.targets.insert(normalize(&target.instance_id), target);
    }

    /// Merge every instance of `other` into this app.
    pub fn merge(&mut self, other: FakeApp) {
        for (key, target) in other.targets {
            self.targets.insert(key, target);
        }
    }

    /// Remove one instance; the removed target is handed back for logging.
    pub fn remove_target(&mut self, instance_id: &str) -> Option<FakeTarget> {
        self.targets.remove(&normalize(instance_id))
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn targets(&self) -> impl Iterator<Item = &FakeTarget> {
        self.targets.values()
    }

    /// The Eureka-visible application synthesized from this fake app.
    pub fn to_eureka_app(&self) -> wire::Application {
        wire::Application {
            name: self.id.to_uppercase(),
            instance: self.instances(),
        }
    }

    /// Wire instances synthesized from every target.
    pub fn instances(&self) -> Vec<wire::Instance> {
        self.targets
            .values()
            .map(|t| wire::Instance::synthesized(&self.id, &t.ip_address, &t.host_name, t.port))
            .collect()
    }
}

impl Display for FakeApp {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let instances: Vec<String> = self.targets.values().map(|t| t.to_string()).collect();
        write!(f, "FakeApp{{id={}, instances=[{}]}}", self.id, instances.join(", "))
    }
}
