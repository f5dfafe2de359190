//! Locating the USRP on the local network

use std::net::{Ipv4Addr, SocketAddrV4};

use nix::ifaddrs::getifaddrs;
use tracing::{info, warn};

use crate::error::ConfigError;

/// Picks the USRP address from the host's own addresses.
///
/// The testbed puts each USRP at `192.168.xx.2` on the subnet of the host
/// interface it hangs off, so any `192.168.xx.*` host address identifies it.
pub fn usrp_from_host_addrs(addrs: impl IntoIterator<Item = Ipv4Addr>) -> Option<Ipv4Addr> {
    addrs
        .into_iter()
        .find(|ip| matches!(ip.octets(), [192, 168, _, _]))
        .map(|ip| Ipv4Addr::new(192, 168, ip.octets()[2], 2))
}

fn host_ipv4_addrs() -> Vec<Ipv4Addr> {
    match getifaddrs() {
        Ok(ifaddrs) => ifaddrs
            .filter_map(|ifa| ifa.address)
            .filter_map(|addr| addr.as_sockaddr_in().copied())
            .map(|sin| *SocketAddrV4::from(sin).ip())
            .collect(),
        Err(e) => {
            warn!("Could not list network interfaces: {e}");
            Vec::new()
        }
    }
}

/// Use the given address, or detect one from the local interfaces
pub fn resolve_device_addr(given: Option<&str>) -> Result<String, ConfigError> {
    if let Some(addr) = given {
        return Ok(addr.to_owned());
    }
    let ip = usrp_from_host_addrs(host_ipv4_addrs()).ok_or(ConfigError::NoDeviceAddress)?;
    info!("Using automatically detected USRP address: {ip}");
    Ok(ip.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_from_subnet() {
        let addrs = [
            Ipv4Addr::LOCALHOST,
            Ipv4Addr::new(10, 11, 0, 5),
            Ipv4Addr::new(192, 168, 60, 1),
            Ipv4Addr::new(192, 168, 70, 1),
        ];
        assert_eq!(
            Some(Ipv4Addr::new(192, 168, 60, 2)),
            usrp_from_host_addrs(addrs)
        );
    }

    #[test]
    fn test_no_matching_subnet() {
        assert_eq!(
            None,
            usrp_from_host_addrs([Ipv4Addr::LOCALHOST, Ipv4Addr::new(172, 16, 0, 1)])
        );
    }

    #[test]
    fn test_explicit_address_wins() {
        assert_eq!(
            Ok("192.168.10.2".to_owned()),
            resolve_device_addr(Some("192.168.10.2"))
        );
    }
}
