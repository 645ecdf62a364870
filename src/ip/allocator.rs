//! Host address allocation over the fixed host subnet.

use ipnet::Ipv4Net;
use std::net::Ipv4Addr;

/// Subnet every emulated host lives in
pub const HOST_SUBNET: Ipv4Net = Ipv4Net::new_assert(Ipv4Addr::new(10, 0, 0, 0), 24);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressError {
    #[error("host index {index} exceeds the {capacity} addresses of {subnet}")]
    Exhausted {
        index: usize,
        capacity: usize,
        subnet: Ipv4Net,
    },
}

/// Maps host indices to addresses, in order, skipping the network address
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HostAddressPlan {
    subnet: Ipv4Net,
}

impl Default for HostAddressPlan {
    fn default() -> Self {
        Self {
            subnet: HOST_SUBNET,
        }
    }
}

impl HostAddressPlan {
    pub fn subnet(&self) -> Ipv4Net {
        self.subnet
    }

    /// Number of assignable host addresses
    pub fn capacity(&self) -> usize {
        self.subnet.hosts().count()
    }

    /// Address of host `index`, with the subnet prefix length
    pub fn host_address(&self, index: usize) -> Result<Ipv4Net, AddressError> {
        let exhausted = || AddressError::Exhausted {
            index,
            capacity: self.capacity(),
            subnet: self.subnet,
        };
        let addr = self.subnet.hosts().nth(index).ok_or_else(exhausted)?;
        Ipv4Net::new(addr, self.subnet.prefix_len()).map_err(|_| exhausted())
    }

    /// Check that `count` hosts can all be addressed
    pub fn ensure_capacity(&self, count: usize) -> Result<(), AddressError> {
        match count.checked_sub(1) {
            Some(last) => self.host_address(last).map(|_| ()),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_first_addresses() {
        let plan = HostAddressPlan::default();
        assert_eq!(plan.host_address(0).unwrap().to_string(), "10.0.0.1/24");
        assert_eq!(plan.host_address(1).unwrap().to_string(), "10.0.0.2/24");
        assert_eq!(plan.host_address(253).unwrap().to_string(), "10.0.0.254/24");
    }

    #[test]
    fn test_capacity() {
        let plan = HostAddressPlan::default();
        assert_eq!(plan.capacity(), 254);
        assert!(plan.ensure_capacity(0).is_ok());
        assert!(plan.ensure_capacity(254).is_ok());
        assert!(matches!(
            plan.ensure_capacity(255),
            Err(AddressError::Exhausted { index: 254, capacity: 254, .. })
        ));
    }

    #[test]
    fn test_addresses_unique_and_in_subnet() {
        let plan = HostAddressPlan::default();
        let mut seen = HashSet::new();
        for i in 0..plan.capacity() {
            let addr = plan.host_address(i).unwrap();
            assert!(plan.subnet().contains(&addr.addr()));
            assert!(seen.insert(addr.addr()));
        }
    }
}
