//! Host-side network discovery for reaching a sensor.
//!
//! The driver needs a local endpoint on the sensor's subnet: the host address
//! to bind and the subnet's broadcast address for discovery traffic.

use crate::error::IlidarError;
use crate::Result;
use std::net::Ipv4Addr;

/// Host address, its mask, and the derived broadcast address.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetworkEndpoint {
    pub host_ip: Ipv4Addr,
    pub mask: Ipv4Addr,
    pub broadcast: Ipv4Addr,
}

impl NetworkEndpoint {
    pub fn new(host_ip: Ipv4Addr, mask: Ipv4Addr) -> Self {
        Self {
            host_ip,
            mask,
            broadcast: broadcast_address(host_ip, mask),
        }
    }
}

/// One IPv4 address assigned to a local interface.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterface {
    pub name: String,
    pub ip: Ipv4Addr,
    pub mask: Ipv4Addr,
}

/// Source of the host's IPv4 interface addresses.
pub trait InterfaceSource: Send {
    /// Addresses in enumeration order.
    fn ipv4_interfaces(&self) -> Result<Vec<HostInterface>>;
}

/// Enumerates the operating system's interfaces.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemInterfaces;

impl InterfaceSource for SystemInterfaces {
    fn ipv4_interfaces(&self) -> Result<Vec<HostInterface>> {
        let ifaces = if_addrs::get_if_addrs().map_err(IlidarError::InterfaceEnumeration)?;
        Ok(ifaces
            .into_iter()
            .filter_map(|iface| match iface.addr {
                if_addrs::IfAddr::V4(v4) => Some(HostInterface {
                    name: iface.name,
                    ip: v4.ip,
                    mask: v4.netmask,
                }),
                _ => None,
            })
            .collect())
    }
}

/// A fixed list of interfaces, for tests and hosts with known wiring.
impl InterfaceSource for Vec<HostInterface> {
    fn ipv4_interfaces(&self) -> Result<Vec<HostInterface>> {
        Ok(self.clone())
    }
}

/// Per-octet `host_ip | !mask`.
pub fn broadcast_address(host_ip: Ipv4Addr, mask: Ipv4Addr) -> Ipv4Addr {
    let (host, mask) = (host_ip.octets(), mask.octets());
    Ipv4Addr::from(std::array::from_fn::<u8, 4, _>(|i| host[i] | !mask[i]))
}

/// True when `a` and `b` agree on every bit selected by `mask`.
pub fn same_subnet(a: Ipv4Addr, b: Ipv4Addr, mask: Ipv4Addr) -> bool {
    let (a, b, mask) = (a.octets(), b.octets(), mask.octets());
    (0..4).all(|i| a[i] & mask[i] == b[i] & mask[i])
}

/// Find the first interface whose own subnet contains `target`.
///
/// When several interfaces match, the first in enumeration order wins. The
/// OS does not promise a stable order, so multi-homed hosts with overlapping
/// subnets may pick a different interface between runs.
pub fn find_matching_host_interface(
    source: &dyn InterfaceSource,
    target: Ipv4Addr,
) -> Result<Option<(Ipv4Addr, Ipv4Addr)>> {
    let found = source
        .ipv4_interfaces()?
        .into_iter()
        .find(|iface| same_subnet(iface.ip, target, iface.mask));

    if let Some(iface) = &found {
        log::debug!(
            "Interface {} ({}/{}) matches sensor {}",
            iface.name,
            iface.ip,
            iface.mask,
            target
        );
    }

    Ok(found.map(|iface| (iface.ip, iface.mask)))
}

/// Resolve the endpoint the driver should bind to reach `target`.
pub fn resolve_endpoint(
    source: &dyn InterfaceSource,
    target: Ipv4Addr,
) -> Result<NetworkEndpoint> {
    find_matching_host_interface(source, target)?
        .map(|(host_ip, mask)| NetworkEndpoint::new(host_ip, mask))
        .ok_or(IlidarError::NetworkUnreachable(target))
}
