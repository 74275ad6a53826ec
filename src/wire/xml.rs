//! XML rendition of the applications listing. Eureka serves the same
//! document as JSON or XML depending on the Accept header, so the model in
//! [`structures`](crate::wire::structures) has a strong-xml twin here with
//! lossless conversions in both directions.

use strong_xml::{XmlRead, XmlWrite};

use crate::wire::structures::{self, DcNameType, PortData, StatusType};

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "applications")]
pub struct Applications {
    #[xml(flatten_text = "versions__delta")]
    pub versions_delta: Option<String>,
    #[xml(flatten_text = "apps__hashcode")]
    pub apps_hashcode: Option<String>,
    #[xml(child = "application")]
    pub applications: Vec<Application>,
}

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "application")]
pub struct Application {
    #[xml(flatten_text = "name")]
    pub name: String,
    #[xml(child = "instance")]
    pub instances: Vec<Instance>,
}

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "instance")]
pub struct Instance {
    #[xml(flatten_text = "instanceId")]
    pub instance_id: Option<String>,
    #[xml(flatten_text = "hostName")]
    pub host_name: String,
    #[xml(flatten_text = "app")]
    pub app: String,
    #[xml(flatten_text = "ipAddr")]
    pub ip_addr: String,
    #[xml(flatten_text = "status")]
    pub status: StatusType,
    #[xml(flatten_text = "overriddenstatus")]
    pub overridden_status: Option<StatusType>,
    #[xml(child = "port")]
    pub port: Option<Port>,
    #[xml(child = "securePort")]
    pub secure_port: Option<SecurePort>,
    #[xml(flatten_text = "countryId")]
    pub country_id: Option<i64>,
    #[xml(child = "dataCenterInfo")]
    pub data_center_info: Option<DataCenterInfo>,
    #[xml(child = "leaseInfo")]
    pub lease_info: Option<LeaseInfo>,
    #[xml(child = "metadata")]
    pub metadata: Option<Metadata>,
    #[xml(flatten_text = "homePageUrl")]
    pub home_page_url: Option<String>,
    #[xml(flatten_text = "statusPageUrl")]
    pub status_page_url: Option<String>,
    #[xml(flatten_text = "healthCheckUrl")]
    pub health_check_url: Option<String>,
    #[xml(flatten_text = "vipAddress")]
    pub vip_address: Option<String>,
    #[xml(flatten_text = "secureVipAddress")]
    pub secure_vip_address: Option<String>,
    #[xml(flatten_text = "isCoordinatingDiscoveryServer")]
    pub is_coordinating_discovery_server: Option<String>,
    #[xml(flatten_text = "lastUpdatedTimestamp")]
    pub last_updated_timestamp: Option<String>,
    #[xml(flatten_text = "lastDirtyTimestamp")]
    pub last_dirty_timestamp: Option<String>,
    #[xml(flatten_text = "actionType")]
    pub action_type: Option<String>,
}

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "port")]
pub struct Port {
    #[xml(attr = "enabled")]
    pub enabled: bool,
    #[xml(text)]
    pub value: u16,
}

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "securePort")]
pub struct SecurePort {
    #[xml(attr = "enabled")]
    pub enabled: bool,
    #[xml(text)]
    pub value: u16,
}

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "dataCenterInfo")]
pub struct DataCenterInfo {
    #[xml(attr = "class")]
    pub class: Option<String>,
    #[xml(flatten_text = "name")]
    pub name: DcNameType,
    #[xml(child = "metadata")]
    pub metadata: Option<AmazonMetadata>,
}

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "leaseInfo")]
pub struct LeaseInfo {
    #[xml(flatten_text = "renewalIntervalInSecs")]
    pub renewal_interval_in_secs: Option<i64>,
    #[xml(flatten_text = "durationInSecs")]
    pub duration_in_secs: Option<i64>,
    #[xml(flatten_text = "registrationTimestamp")]
    pub registration_timestamp: Option<i64>,
    #[xml(flatten_text = "lastRenewalTimestamp")]
    pub last_renewal_timestamp: Option<i64>,
    #[xml(flatten_text = "evictionTimestamp")]
    pub eviction_timestamp: Option<i64>,
    #[xml(flatten_text = "serviceUpTimestamp")]
    pub service_up_timestamp: Option<i64>,
}

/// Instance metadata in XML form. Only the class attribute and the
/// `instanceId` entry are modeled; other keys are not preserved across an
/// XML rewrite.
#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "metadata")]
pub struct Metadata {
    #[xml(attr = "class")]
    pub class: Option<String>,
    #[xml(flatten_text = "instanceId")]
    pub instance_id: Option<String>,
}

#[derive(XmlWrite, XmlRead, PartialEq, Debug)]
#[xml(tag = "metadata")]
pub struct AmazonMetadata {
    #[xml(flatten_text = "ami-launch-index")]
    pub ami_launch_index: String,
    #[xml(flatten_text = "local-hostname")]
    pub local_hostname: String,
    #[xml(flatten_text = "availability-zone")]
    pub availability_zone: String,
    #[xml(flatten_text = "instance-id")]
    pub instance_id: String,
    #[xml(flatten_text = "public-ipv4")]
    pub public_ipv4: String,
    #[xml(flatten_text = "public-hostname")]
    pub public_hostname: String,
    #[xml(flatten_text = "ami-manifest-path")]
    pub ami_manifest_path: String,
    #[xml(flatten_text = "local-ipv4")]
    pub local_ipv4: String,
    #[xml(flatten_text = "hostname")]
    pub hostname: String,
    #[xml(flatten_text = "ami-id")]
    pub ami_id: String,
    #[xml(flatten_text = "instance-type")]
    pub instance_type: String,
}

impl From<&structures::Applications> for Applications {
    fn from(apps: &structures::Applications) -> Applications {
        Applications {
            versions_delta: apps.versions_delta.clone(),
            apps_hashcode: apps.apps_hashcode.clone(),
            applications: apps.application.iter().map(Application::from).collect(),
        }
    }
}

impl From<Applications> for structures::Applications {
    fn from(apps: Applications) -> structures::Applications {
        structures::Applications {
            versions_delta: apps.versions_delta,
            apps_hashcode: apps.apps_hashcode,
            application: apps
                .applications
                .into_iter()
                .map(structures::Application::from)
                .collect(),
        }
    }
}

impl From<&structures::Application> for Application {
    fn from(app: &structures::Application) -> Application {
        Application {
            name: app.name.clone(),
            instances: app.instance.iter().map(Instance::from).collect(),
        }
    }
}

impl From<Application> for structures::Application {
    fn from(app: Application) -> structures::Application {
        structures::Application {
            name: app.name,
            instance: app
                .instances
                .into_iter()
                .map(structures::Instance::from)
                .collect(),
        }
    }
}

impl From<&structures::Instance> for Instance {
    fn from(inst: &structures::Instance) -> Instance {
        Instance {
            instance_id: inst.instance_id.clone(),
            host_name: inst.host_name.clone(),
            app: inst.app.clone(),
            ip_addr: inst.ip_addr.clone(),
            status: inst.status,
            overridden_status: inst.overridden_status,
            port: inst.port.as_ref().map(|p| Port {
                enabled: p.enabled(),
                value: p.number(),
            }),
            secure_port: inst.secure_port.as_ref().map(|p| SecurePort {
                enabled: p.enabled(),
                value: p.number(),
            }),
            country_id: inst.country_id,
            data_center_info: inst.data_center_info.as_ref().map(DataCenterInfo::from),
            lease_info: inst.lease_info.as_ref().map(|lease| LeaseInfo {
                renewal_interval_in_secs: lease.renewal_interval_in_secs,
                duration_in_secs: lease.duration_in_secs,
                registration_timestamp: lease.registration_timestamp,
                last_renewal_timestamp: lease.last_renewal_timestamp,
                eviction_timestamp: lease.eviction_timestamp,
                service_up_timestamp: lease.service_up_timestamp,
            }),
            metadata: inst.metadata.as_ref().map(|meta| Metadata {
                class: meta.get("@class").cloned(),
                instance_id: meta.get("instanceId").cloned(),
            }),
            home_page_url: inst.home_page_url.clone(),
            status_page_url: inst.status_page_url.clone(),
            health_check_url: inst.health_check_url.clone(),
            vip_address: inst.vip_address.clone(),
            secure_vip_address: inst.secure_vip_address.clone(),
            is_coordinating_discovery_server: inst.is_coordinating_discovery_server.clone(),
            last_updated_timestamp: inst.last_updated_timestamp.clone(),
            last_dirty_timestamp: inst.last_dirty_timestamp.clone(),
            action_type: inst.action_type.clone(),
        }
    }
}

impl From<Instance> for structures::Instance {
    fn from(inst: Instance) -> structures::Instance {
        structures::Instance {
            instance_id: inst.instance_id,
            host_name: inst.host_name,
            app: inst.app,
            ip_addr: inst.ip_addr,
            status: inst.status,
            overridden_status: inst.overridden_status,
            port: inst.port.map(|p| PortData::new(p.value, p.enabled)),
            secure_port: inst.secure_port.map(|p| PortData::new(p.value, p.enabled)),
            country_id: inst.country_id,
            data_center_info: inst.data_center_info.map(structures::DataCenterInfo::from),
            lease_info: inst.lease_info.map(|lease| structures::LeaseInfo {
                renewal_interval_in_secs: lease.renewal_interval_in_secs,
                duration_in_secs: lease.duration_in_secs,
                registration_timestamp: lease.registration_timestamp,
                last_renewal_timestamp: lease.last_renewal_timestamp,
                eviction_timestamp: lease.eviction_timestamp,
                service_up_timestamp: lease.service_up_timestamp,
            }),
            metadata: inst.metadata.map(|meta| {
                let mut map = std::collections::HashMap::new();
                if let Some(class) = meta.class {
                    map.insert("@class".to_string(), class);
                }
                if let Some(instance_id) = meta.instance_id {
                    map.insert("instanceId".to_string(), instance_id);
                }
                map
            }),
            home_page_url: inst.home_page_url,
            status_page_url: inst.status_page_url,
            health_check_url: inst.health_check_url,
            vip_address: inst.vip_address,
            secure_vip_address: inst.secure_vip_address,
            is_coordinating_discovery_server: inst.is_coordinating_discovery_server,
            last_updated_timestamp: inst.last_updated_timestamp,
            last_dirty_timestamp: inst.last_dirty_timestamp,
            action_type: inst.action_type,
        }
    }
}

impl From<&structures::DataCenterInfo> for DataCenterInfo {
    fn from(info: &structures::DataCenterInfo) -> DataCenterInfo {
        DataCenterInfo {
            class: info.class.clone(),
            name: info.name,
            metadata: info.metadata.as_ref().map(|meta| AmazonMetadata {
                ami_launch_index: meta.ami_launch_index.clone(),
                local_hostname: meta.local_hostname.clone(),
                availability_zone: meta.availability_zone.clone(),
                instance_id: meta.instance_id.clone(),
                public_ipv4: meta.public_ipv4.clone(),
                public_hostname: meta.public_hostname.clone(),
                ami_manifest_path: meta.ami_manifest_path.clone(),
                local_ipv4: meta.local_ipv4.clone(),
                hostname: meta.hostname.clone(),
                ami_id: meta.ami_id.clone(),
                instance_type: meta.instance_type.clone(),
            }),
        }
    }
}

impl From<DataCenterInfo> for structures::DataCenterInfo {
    fn from(info: DataCenterInfo) -> structures::DataCenterInfo {
        structures::DataCenterInfo {
            class: info.class,
            name: info.name,
            metadata: info.metadata.map(|meta| structures::AmazonMetadataType {
                ami_launch_index: meta.ami_launch_index,
                local_hostname: meta.local_hostname,
                availability_zone: meta.availability_zone,
                instance_id: meta.instance_id,
                public_ipv4: meta.public_ipv4,
                public_hostname: meta.public_hostname,
                ami_manifest_path: meta.ami_manifest_path,
                local_ipv4: meta.local_ipv4,
                hostname: meta.hostname,
                ami_id: meta.ami_id,
                instance_type: meta.instance_type,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use strong_xml::{XmlRead, XmlResult, XmlWrite};

    use super::*;

    const LISTING: &str = r#"<applications>
  <versions__delta>1</versions__delta>
  <apps__hashcode>UP_2_</apps__hashcode>
  <application>
    <name>BENCH</name>
    <instance>
      <instanceId>bench:127.0.0.1:8080</instanceId>
      <hostName>localhost</hostName>
      <app>BENCH</app>
      <ipAddr>127.0.0.1</ipAddr>
      <status>UP</status>
      <overriddenstatus>UP</overriddenstatus>
      <port enabled="true">8080</port>
      <securePort enabled="false">443</securePort>
      <countryId>1</countryId>
      <dataCenterInfo class="com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo">
        <name>MyOwn</name>
      </dataCenterInfo>
      <leaseInfo>
        <renewalIntervalInSecs>30</renewalIntervalInSecs>
        <durationInSecs>90</durationInSecs>
        <registrationTimestamp>1616761261538</registrationTimestamp>
        <lastRenewalTimestamp>1616761921820</lastRenewalTimestamp>
        <evictionTimestamp>0</evictionTimestamp>
        <serviceUpTimestamp>1616761261439</serviceUpTimestamp>
      </leaseInfo>
      <metadata class="java.util.Collections$EmptyMap"/>
      <homePageUrl>http://127.0.0.1:8080/</homePageUrl>
      <statusPageUrl></statusPageUrl>
      <healthCheckUrl></healthCheckUrl>
      <vipAddress>bench</vipAddress>
      <secureVipAddress>bench</secureVipAddress>
      <isCoordinatingDiscoveryServer>false</isCoordinatingDiscoveryServer>
      <lastUpdatedTimestamp>1616761261538</lastUpdatedTimestamp>
      <lastDirtyTimestamp>1616761261439</lastDirtyTimestamp>
      <actionType>ADDED</actionType>
    </instance>
    <instance>
      <hostName>localhost2</hostName>
      <app>BENCH</app>
      <ipAddr>127.0.0.1</ipAddr>
      <status>UP</status>
      <port enabled="true">8081</port>
      <securePort enabled="false">443</securePort>
      <dataCenterInfo class="com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo">
        <name>MyOwn</name>
      </dataCenterInfo>
      <vipAddress>bench</vipAddress>
      <secureVipAddress>bench</secureVipAddress>
    </instance>
  </application>
</applications>"#;

    #[test]
    fn test_xml_applications_empty() -> XmlResult<()> {
        let applications = Applications::from_str("<applications></applications>")?;
        assert!(applications.applications.is_empty());
        Ok(())
    }

    #[test]
    fn test_xml_port() -> XmlResult<()> {
        let port = Port::from_str(r#"<port enabled="false">80</port>"#)?;
        assert!(!port.enabled);
        assert_eq!(port.value, 80);
        Ok(())
    }

    #[test]
    fn test_xml_data_center_info() -> XmlResult<()> {
        let xml = r#"<dataCenterInfo class="com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo">
        <name>MyOwn</name>
      </dataCenterInfo>"#;
        let data_center_info = DataCenterInfo::from_str(xml)?;
        assert_eq!(data_center_info.name, DcNameType::MyOwn);
        assert_eq!(
            data_center_info.class,
            Some("com.netflix.appinfo.InstanceInfo$DefaultDataCenterInfo".to_string())
        );
        Ok(())
    }

    #[test]
    fn test_xml_lease_info_empty() -> XmlResult<()> {
        let lease_info = LeaseInfo::from_str("<leaseInfo></leaseInfo>")?;
        assert_eq!(lease_info.renewal_interval_in_secs, None);
        Ok(())
    }

    #[test]
    fn test_xml_full_listing() -> XmlResult<()> {
        let applications = Applications::from_str(LISTING)?;
        assert_eq!(applications.applications.len(), 1);

        let app = &applications.applications[0];
        assert_eq!(app.name, "BENCH");
        assert_eq!(app.instances.len(), 2);
        assert_eq!(app.instances[0].status, StatusType::Up);
        assert_eq!(
            app.instances[0].metadata.as_ref().unwrap().class.as_deref(),
            Some("java.util.Collections$EmptyMap")
        );
        assert_eq!(app.instances[1].port.as_ref().unwrap().value, 8081);
        Ok(())
    }

    #[test]
    fn test_xml_round_trip() -> XmlResult<()> {
        let applications = Applications::from_str(LISTING)?;
        let encoded = applications.to_string()?;
        let reparsed = Applications::from_str(&encoded)?;
        assert_eq!(applications, reparsed);
        Ok(())
    }

    #[test]
    fn test_xml_model_round_trip() -> XmlResult<()> {
        let applications = Applications::from_str(LISTING)?;
        let model = structures::Applications::from(Applications::from_str(LISTING)?);
        let back = Applications::from(&model);
        assert_eq!(applications, back);
        Ok(())
    }
}
