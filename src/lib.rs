#[macro_use]
extern crate lazy_static;
#[macro_use]
extern crate log;
#[macro_use]
extern crate quick_error;

pub use reqwest::Error as ReqwestError;

pub use self::fake::{AppCluster, FakeApp, FakeRegistry, FakeTarget};
pub use self::proxy::{ProxyConfig, ReverseProxy, RouteConfig};

pub mod config;
pub mod fake;
pub mod httputil;
pub mod logging;
pub mod netutil;
pub mod proxy;
pub mod wire;

quick_error! {
    #[derive(Debug)]
    pub enum ProxyError {
        /// Invalid flag, URL or configuration file. Fatal at startup.
        Config(msg: String) {
            display("{}", msg)
        }
        /// The upstream could not be reached or dropped the connection.
        Forward(err: ReqwestError) {
            display("could not reach upstream: {}", err)
            cause(err)
            from()
        }
        /// The applications listing carried a Content-Type no codec handles.
        UnknownContentType(content_type: String) {
            display("could not deserialize body, unknown Content-Type: {}", content_type)
        }
        /// The applications listing could not be decoded or re-encoded.
        Codec(msg: String) {
            display("{}", msg)
        }
        /// An intercepted registration or heartbeat could not be parsed.
        BadRegistration(msg: String) {
            display("{}", msg)
        }
        Io(err: std::io::Error) {
            display("{}", err)
            cause(err)
            from()
        }
    }
}

/// All app and instance ids compare case-insensitively; this is the single
/// normalization used for map keys and lookups.
pub(crate) fn normalize(id: &str) -> String {
    id.to_ascii_lowercase()
}

pub(crate) fn contains_ignore_case(haystack: &str, needle: &str) -> bool {
    haystack
        .to_ascii_lowercase()
        .contains(&needle.to_ascii_lowercase())
}
