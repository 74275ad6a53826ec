//! CLI argument resolution and the YAML configuration file.

use std::collections::BTreeMap;
use std::path::Path;

use serde::Deserialize;
use url::Url;

use crate::fake::FakeApp;
use crate::proxy::RouteConfig;
use crate::{netutil, ProxyError};

/// Root of the YAML configuration.
#[derive(Debug, Deserialize)]
pub struct ConfigFile {
    pub proxy: ProxySection,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProxySection {
    #[serde(default)]
    pub eureka_url: Option<String>,
    /// Kept as a string for compatibility with existing config files.
    #[serde(default)]
    pub port: Option<String>,
    #[serde(default)]
    pub fakes: Vec<FakeSection>,
    #[serde(default)]
    pub routes: BTreeMap<String, RouteSection>,
}

#[derive(Debug, Deserialize)]
pub struct FakeSection {
    /// `serviceId:port`
    pub id: String,
    #[serde(default)]
    pub ip: Option<String>,
    #[serde(default)]
    pub hostname: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RouteSection {
    pub path: String,
    pub url: String,
    #[serde(default)]
    pub strip_prefix: bool,
}

pub fn load_config(path: &Path) -> Result<ConfigFile, ProxyError> {
    let bytes = std::fs::read(path)?;
    serde_yaml::from_slice(&bytes)
        .map_err(|err| ProxyError::Config(format!("could not parse yaml file err: {}", err)))
}

impl ConfigFile {
    /// The upstream Eureka URL; required in eureka-proxy mode.
    pub fn eureka_url(&self) -> Result<Url, ProxyError> {
        let raw = self.proxy.eureka_url.as_deref().ok_or_else(|| {
            ProxyError::Config("please specify a valid eurekaUrl in the yml configuration".into())
        })?;
        parse_url(raw)
    }

    pub fn port(&self) -> Result<Option<u16>, ProxyError> {
        match &self.proxy.port {
            Some(port) => port.parse().map(Some).map_err(|_| {
                ProxyError::Config(format!("invalid port in configuration: '{}'", port))
            }),
            None => Ok(None),
        }
    }

    /// Fake apps declared in the file. `ip` falls back to the outbound local
    /// IP and `hostname` to `<host>.EUREKA-PROXY.FAKE`. The service id
    /// doubles as the instance id for configured fakes.
    pub fn fake_apps(&self) -> Result<Vec<FakeApp>, ProxyError> {
        let mut apps = Vec::with_capacity(self.proxy.fakes.len());
        for fake in &self.proxy.fakes {
            let (service_id, port) = parse_id_and_port(&fake.id)?;
            let ip = match &fake.ip {
                Some(ip) => ip.clone(),
                None => netutil::outbound_ip()?.to_string(),
            };
            let host = match &fake.hostname {
                Some(host) => host.clone(),
                None => format!("{}.EUREKA-PROXY.FAKE", netutil::hostname()?),
            };
            apps.push(FakeApp::single_instance(
                &service_id,
                &service_id,
                &ip,
                &host,
                port,
            ));
        }
        Ok(apps)
    }

    /// Route table declared in the file (reverse-proxy mode). `stripPrefix`
    /// compiles to a `<path>:` strip rule.
    pub fn route_configs(&self) -> Result<Vec<RouteConfig>, ProxyError> {
        let mut routes = Vec::new();
        for (label, route) in &self.proxy.routes {
            let url = parse_url(&route.url).map_err(|err| {
                ProxyError::Config(format!(
                    "the url {} for route {} is invalid, err: {}",
                    route.url, label, err
                ))
            })?;
            let strip = if route.strip_prefix {
                format!("{}:", route.path)
            } else {
                String::new()
            };
            routes.push(RouteConfig::new(&route.path, &strip, url));
        }
        Ok(routes)
    }
}

/// Parse `serviceId:port` as used by `--fake` values and config `id` keys.
pub fn parse_id_and_port(value: &str) -> Result<(String, u16), ProxyError> {
    let invalid = || {
        ProxyError::Config(format!(
            "Fake service '{}' is in invalid format, example 'foo-service:8081'",
            value
        ))
    };
    let (id, port) = value.split_once(':').ok_or_else(invalid)?;
    let port: u16 = port.parse().map_err(|_| invalid())?;
    if id.is_empty() || port == 0 {
        return Err(invalid());
    }
    Ok((id.to_string(), port))
}

/// Parse an upstream URL, assuming `http://` when no scheme is present.
pub fn parse_url(value: &str) -> Result<Url, ProxyError> {
    let raw = if value.starts_with("http://") || value.starts_with("https://") {
        value.to_string()
    } else {
        format!("http://{}", value)
    };
    Url::parse(&raw).map_err(|err| ProxyError::Config(format!("invalid url '{}': {}", value, err)))
}

/// The positional argument: an existing file wins, otherwise it must parse
/// as a URL.
pub enum TargetArg {
    Config(ConfigFile),
    Upstream(Url),
}

pub fn resolve_target(arg: &str) -> Result<TargetArg, ProxyError> {
    let path = Path::new(arg);
    if path.is_file() {
        return Ok(TargetArg::Config(load_config(path)?));
    }
    Ok(TargetArg::Upstream(parse_url(arg)?))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_id_and_port() {
        let (id, port) = parse_id_and_port("foo-service:8081").unwrap();
        assert_eq!(id, "foo-service");
        assert_eq!(port, 8081);
    }

    #[test]
    fn test_parse_id_and_port_rejects_bad_values() {
        assert!(parse_id_and_port("foo-service").is_err());
        assert!(parse_id_and_port("foo-service:http").is_err());
        assert!(parse_id_and_port("foo-service:0").is_err());
        assert!(parse_id_and_port(":8081").is_err());
        assert!(parse_id_and_port("foo:70000").is_err());
    }

    #[test]
    fn test_parse_url_assumes_http() {
        let url = parse_url("eureka.internal:8761").unwrap();
        assert_eq!(url.as_str(), "http://eureka.internal:8761/");

        let url = parse_url("https://eureka.internal:8761").unwrap();
        assert_eq!(url.scheme(), "https");
    }

    #[test]
    fn test_eureka_proxy_config() {
        let raw = "
proxy:
  eurekaUrl: http://eureka.internal:8761
  port: \"9999\"
  fakes:
    - id: foo-service:8081
      ip: 10.0.0.7
      hostname: dev-box
    - id: bar:9000
      ip: 10.0.0.8
      hostname: dev-box
";
        let config: ConfigFile = serde_yaml::from_str(raw).unwrap();
        assert_eq!(
            config.eureka_url().unwrap().as_str(),
            "http://eureka.internal:8761/"
        );
        assert_eq!(config.port().unwrap(), Some(9999));

        let fakes = config.fake_apps().unwrap();
        assert_eq!(fakes.len(), 2);
        assert_eq!(fakes[0].id(), "foo-service");
        let target = fakes[0].targets().next().unwrap();
        assert_eq!(target.instance_id, "foo-service");
        assert_eq!(target.ip_address, "10.0.0.7");
        assert_eq!(target.host_name, "dev-box");
        assert_eq!(target.port, 8081);
    }

    #[test]
    fn test_reverse_proxy_routes_config() {
        let raw = "
proxy:
  routes:
    api:
      path: /api
      url: http://backend.internal:8080
      stripPrefix: true
    web:
      path: /web
      url: http://frontend.internal:3000
";
        let config: ConfigFile = serde_yaml::from_str(raw).unwrap();
        let routes = config.route_configs().unwrap();
        assert_eq!(routes.len(), 2);

        assert_eq!(routes[0].route, "/api");
        assert_eq!(routes[0].strip, "/api:");
        assert_eq!(routes[1].route, "/web");
        assert_eq!(routes[1].strip, "");
    }

    #[test]
    fn test_missing_eureka_url_is_an_error() {
        let config: ConfigFile = serde_yaml::from_str("proxy:\n  port: \"8761\"\n").unwrap();
        assert!(config.eureka_url().is_err());
    }
}
