use std::collections::HashMap;
use std::fmt::{Display, Error as FmtError, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Envelope around the applications listing, `{"applications": {...}}` on
/// the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct State {
    pub applications: Applications,
}

/// The full listing returned by `GET /eureka/apps`. The version and hashcode
/// fields are opaque to the proxy and pass through untouched.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Applications {
    #[serde(rename = "versions__delta", skip_serializing_if = "Option::is_none")]
    pub versions_delta: Option<String>,
    #[serde(rename = "apps__hashcode", skip_serializing_if = "Option::is_none")]
    pub apps_hashcode: Option<String>,
    #[serde(default)]
    pub application: Vec<Application>,
}

impl Applications {
    /// Look up an application by name, ignoring case.
    pub fn find_app_mut(&mut self, name: &str) -> Option<&mut Application> {
        self.application
            .iter_mut()
            .find(|app| app.name.eq_ignore_ascii_case(name))
    }

    pub fn add_app(&mut self, app: Application) {
        self.application.push(app);
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Application {
    pub name: String,
    #[serde(default)]
    pub instance: Vec<Instance>,
}

impl Application {
    pub fn replace_instances(&mut self, instances: Vec<Instance>) {
        self.instance = instances;
    }
}

/// Registration payload posted by discovery clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistrationRequest {
    pub instance: Instance,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Instance {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance_id: Option<String>,
    pub host_name: String,
    pub app: String,
    pub ip_addr: String,
    #[serde(default)]
    pub status: StatusType,
    /// Older Eureka servers spell this key in all lowercase.
    #[serde(alias = "overriddenstatus", skip_serializing_if = "Option::is_none")]
    pub overridden_status: Option<StatusType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub port: Option<PortData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_port: Option<PortData>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub country_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_center_info: Option<DataCenterInfo>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub lease_info: Option<LeaseInfo>,
    /// App specific metadata, arbitrary string keys.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<HashMap<String, String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub home_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub status_page_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub health_check_url: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub secure_vip_address: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_coordinating_discovery_server: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_updated_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_dirty_timestamp: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub action_type: Option<String>,
}

impl Instance {
    /// The instance a fake target appears as in the rewritten listing.
    ///
    /// The template mirrors what real registrations in the shared
    /// environments look like: `hostName` deliberately carries the IP
    /// address, and the lease and update timestamps are fixed sentinels (the
    /// proxy performs no lease bookkeeping).
    pub fn synthesized(app_id: &str, ip: &str, host_name: &str, port: u16) -> Instance {
        let id = app_id.to_lowercase();
        Instance {
            instance_id: Some(format!("{}:{}:{}", host_name.to_lowercase(), id, port)),
            host_name: ip.to_string(),
            app: app_id.to_uppercase(),
            ip_addr: ip.to_string(),
            status: StatusType::Up,
            overridden_status: Some(StatusType::Unknown),
            port: Some(PortData::new(port, true)),
            secure_port: Some(PortData::new(443, false)),
            country_id: Some(1),
            data_center_info: Some(DataCenterInfo::default()),
            lease_info: Some(LeaseInfo::default()),
            metadata: Some(HashMap::from([(
                "instanceId".to_string(),
                format!("{}:{}", id, port),
            )])),
            home_page_url: Some(format!("http://{}:{}/", ip, port)),
            status_page_url: Some(format!("http://{}:{}/admin/manage/info", ip, port)),
            health_check_url: Some(format!("http://{}:{}/admin/manage/health", ip, port)),
            vip_address: Some(id.clone()),
            secure_vip_address: Some(id),
            is_coordinating_discovery_server: Some("false".to_string()),
            last_updated_timestamp: Some("1517243533603".to_string()),
            last_dirty_timestamp: Some("1513015393398".to_string()),
            action_type: Some("ADDED".to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortData {
    #[serde(rename = "$")]
    value: u16,
    #[serde(rename = "@enabled")]
    enabled: String,
}

impl PortData {
    pub fn new(port: u16, enabled: bool) -> Self {
        PortData {
            value: port,
            enabled: enabled.to_string(),
        }
    }

    pub fn number(&self) -> u16 {
        self.value
    }

    pub fn enabled(&self) -> bool {
        self.enabled == "true"
    }

    pub fn value(&self) -> Option<u16> {
        if self.enabled == "true" {
            Some(self.value)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataCenterInfo {
    #[serde(rename = "@class", skip_serializing_if = "Option::is_none")]
    pub class: Option<String>,
    pub name: DcNameType,
    /// metadata is only allowed if name is Amazon, and then is required
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<AmazonMetadataType>,
}

impl Default for DataCenterInfo {
    fn default() -> Self {
        DataCenterInfo {
            class: Some("com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo".into()),
            name: DcNameType::MyOwn,
            metadata: None,
        }
    }
}

/// Lease fields pass through from upstream; the synthesized default is the
/// fixed template every fake instance carries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaseInfo {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub renewal_interval_in_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_in_secs: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub registration_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_renewal_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub eviction_timestamp: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub service_up_timestamp: Option<i64>,
}

impl Default for LeaseInfo {
    fn default() -> Self {
        LeaseInfo {
            renewal_interval_in_secs: Some(30),
            duration_in_secs: Some(90),
            registration_timestamp: Some(1_519_411_412_763),
            last_renewal_timestamp: Some(1_519_747_384_239),
            eviction_timestamp: Some(0),
            service_up_timestamp: Some(1_519_411_412_763),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum DcNameType {
    MyOwn,
    Amazon,
}

impl Display for DcNameType {
    fn fmt(&self, f: &mut Formatter) -> Result<(), FmtError> {
        write!(f, "{:?}", self)
    }
}

impl FromStr for DcNameType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "MyOwn" => Ok(Self::MyOwn),
            "Amazon" => Ok(Self::Amazon),
            _ => Err(format!("invalid dcNameType: {}", s)),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum StatusType {
    Up,
    Down,
    Starting,
    OutOfService,
    #[default]
    Unknown,
}

impl Display for StatusType {
    fn fmt(&self, f: &mut Formatter) -> Result<(), FmtError> {
        match *self {
            Self::Up => write!(f, "UP"),
            Self::Down => write!(f, "DOWN"),
            Self::Starting => write!(f, "STARTING"),
            Self::OutOfService => write!(f, "OUT_OF_SERVICE"),
            Self::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

impl FromStr for StatusType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "UP" => Ok(Self::Up),
            "DOWN" => Ok(Self::Down),
            "STARTING" => Ok(Self::Starting),
            "OUT_OF_SERVICE" => Ok(Self::OutOfService),
            "UNKNOWN" => Ok(Self::Unknown),
            _ => Err(format!("invalid statusType: {}", s)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct AmazonMetadataType {
    pub ami_launch_index: String,
    pub local_hostname: String,
    pub availability_zone: String,
    pub instance_id: String,
    pub public_ipv4: String,
    pub public_hostname: String,
    pub ami_manifest_path: String,
    pub local_ipv4: String,
    pub hostname: String,
    pub ami_id: String,
    pub instance_type: String,
}
