//! Local network interface enumeration.
//!
//! Discovery needs the broadcast address of every local IPv4 interface that
//! has one. On unix this walks `getifaddrs`; elsewhere it returns nothing and
//! discovery falls back to the limited broadcast address.

use std::io;
use std::net::Ipv4Addr;

/// A local IPv4 interface that supports broadcast.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetworkInterface {
    /// Interface name (`eth0`, `en0`, ...).
    pub name: String,
    /// Interface address.
    pub ip: Ipv4Addr,
    /// Subnet mask.
    pub netmask: Ipv4Addr,
}

impl NetworkInterface {
    /// Subnet-directed broadcast address (ip | !mask).
    pub fn broadcast_address(&self) -> Ipv4Addr {
        let ip = u32::from(self.ip);
        let mask = u32::from(self.netmask);
        Ipv4Addr::from(ip | !mask)
    }
}

/// Lists local IPv4 interfaces that have a broadcast address, excluding
/// loopback.
///
/// # Errors
///
/// Returns the OS error if the interface list cannot be read.
pub fn broadcast_interfaces() -> io::Result<Vec<NetworkInterface>> {
    broadcast_interfaces_impl()
}

/// Distinct broadcast addresses of [`broadcast_interfaces`].
pub fn broadcast_addresses() -> io::Result<Vec<Ipv4Addr>> {
    let mut addrs: Vec<Ipv4Addr> = broadcast_interfaces()?
        .iter()
        .map(NetworkInterface::broadcast_address)
        .collect();
    addrs.sort();
    addrs.dedup();
    Ok(addrs)
}

#[cfg(unix)]
fn broadcast_interfaces_impl() -> io::Result<Vec<NetworkInterface>> {
    use std::ffi::CStr;

    let mut interfaces = Vec::new();

    // SAFETY: the list returned by getifaddrs is only read while it is alive
    // and is released exactly once below.
    unsafe {
        let mut ifaddrs: *mut libc::ifaddrs = std::ptr::null_mut();
        if libc::getifaddrs(&mut ifaddrs) != 0 {
            return Err(io::Error::last_os_error());
        }

        let mut current = ifaddrs;
        while !current.is_null() {
            let ifa = &*current;
            current = ifa.ifa_next;

            if ifa.ifa_addr.is_null() || ifa.ifa_netmask.is_null() {
                continue;
            }
            if ifa.ifa_flags & libc::IFF_BROADCAST as libc::c_uint == 0 {
                continue;
            }

            let family = i32::from((*ifa.ifa_addr).sa_family);
            if family != libc::AF_INET {
                continue;
            }

            let addr = ifa.ifa_addr as *const libc::sockaddr_in;
            let ip = Ipv4Addr::from((*addr).sin_addr.s_addr.to_ne_bytes());
            if ip.is_loopback() {
                continue;
            }

            let mask_addr = ifa.ifa_netmask as *const libc::sockaddr_in;
            let netmask = Ipv4Addr::from((*mask_addr).sin_addr.s_addr.to_ne_bytes());

            let name = if ifa.ifa_name.is_null() {
                String::new()
            } else {
                CStr::from_ptr(ifa.ifa_name).to_string_lossy().into_owned()
            };

            interfaces.push(NetworkInterface { name, ip, netmask });
        }

        libc::freeifaddrs(ifaddrs);
    }

    Ok(interfaces)
}

#[cfg(not(unix))]
fn broadcast_interfaces_impl() -> io::Result<Vec<NetworkInterface>> {
    Ok(Vec::new())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn iface(ip: [u8; 4], mask: [u8; 4]) -> NetworkInterface {
        NetworkInterface {
            name: "test0".into(),
            ip: Ipv4Addr::from(ip),
            netmask: Ipv4Addr::from(mask),
        }
    }

    #[test]
    fn test_broadcast_address_slash_24() {
        let iface = iface([192, 168, 1, 100], [255, 255, 255, 0]);
        assert_eq!(iface.broadcast_address(), Ipv4Addr::new(192, 168, 1, 255));
    }

    #[test]
    fn test_broadcast_address_slash_8() {
        let iface = iface([10, 10, 10, 10], [255, 0, 0, 0]);
        assert_eq!(iface.broadcast_address(), Ipv4Addr::new(10, 255, 255, 255));
    }

    #[test]
    fn test_broadcast_address_slash_30() {
        let iface = iface([172, 16, 0, 1], [255, 255, 255, 252]);
        assert_eq!(iface.broadcast_address(), Ipv4Addr::new(172, 16, 0, 3));
    }

    #[test]
    fn test_enumeration_excludes_loopback() {
        let interfaces = broadcast_interfaces().unwrap();
        assert!(interfaces.iter().all(|i| !i.ip.is_loopback()));
    }
}
