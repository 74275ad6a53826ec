//! Local host and address discovery used when synthesizing fake instances.

use std::net::{IpAddr, UdpSocket};

use crate::ProxyError;

/// The local address used for outbound traffic, discovered by connecting a
/// UDP socket towards a public resolver. No packet is sent.
pub fn outbound_ip() -> Result<IpAddr, ProxyError> {
    let socket = UdpSocket::bind("0.0.0.0:0")?;
    socket.connect("8.8.8.8:80")?;
    Ok(socket.local_addr()?.ip())
}

pub fn hostname() -> Result<String, ProxyError> {
    hostname::get()?
        .into_string()
        .map_err(|name| ProxyError::Config(format!("hostname is not valid utf-8: {:?}", name)))
}
