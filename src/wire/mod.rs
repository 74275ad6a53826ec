//! Wire-level model of the Eureka applications listing, with the JSON and
//! XML codecs selected by the response Content-Type.

use strong_xml::{XmlRead, XmlWrite};

pub use self::structures::{
    Application, Applications, DataCenterInfo, Instance, LeaseInfo, PortData,
    RegistrationRequest, State, StatusType,
};

pub mod structures;
pub mod xml;

use crate::{contains_ignore_case, ProxyError};

const APPLICATION_XML: &str = "application/xml";
const APPLICATION_JSON: &str = "application/json";

/// Decode an applications listing according to the upstream Content-Type.
pub fn decode(content_type: &str, body: &[u8]) -> Result<State, ProxyError> {
    if contains_ignore_case(content_type, APPLICATION_XML) {
        let text = std::str::from_utf8(body).map_err(|err| {
            ProxyError::Codec(format!("applications listing is not valid utf-8: {}", err))
        })?;
        let applications = xml::Applications::from_str(text)
            .map_err(|err| ProxyError::Codec(format!("could not parse xml content: {:?}", err)))?;
        Ok(State {
            applications: applications.into(),
        })
    } else if contains_ignore_case(content_type, APPLICATION_JSON) {
        serde_json::from_slice(body)
            .map_err(|err| ProxyError::Codec(format!("could not parse json content: {}", err)))
    } else {
        Err(ProxyError::UnknownContentType(content_type.to_string()))
    }
}

/// Re-encode a listing in the same representation it was decoded from.
pub fn encode(content_type: &str, state: &State) -> Result<Vec<u8>, ProxyError> {
    if contains_ignore_case(content_type, APPLICATION_XML) {
        let applications = xml::Applications::from(&state.applications);
        let text = applications
            .to_string()
            .map_err(|err| ProxyError::Codec(format!("could not marshal xml content: {:?}", err)))?;
        Ok(text.into_bytes())
    } else if contains_ignore_case(content_type, APPLICATION_JSON) {
        serde_json::to_vec(state)
            .map_err(|err| ProxyError::Codec(format!("could not marshal json content: {}", err)))
    } else {
        Err(ProxyError::UnknownContentType(content_type.to_string()))
    }
}
