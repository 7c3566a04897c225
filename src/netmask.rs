use std::fmt;
use std::net::Ipv4Addr;
use std::str::FromStr;

use crate::error::TopologyError;

/// Subnet mask used to decide whether two addresses are the endpoints
/// of one point-to-point link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Netmask(u32);

impl Default for Netmask {
	/// 255.255.255.252, the /30 link convention.
	fn default() -> Self {
		Netmask(0xffff_fffc)
	}
}

impl Netmask {
	pub fn from_prefix(len: u8) -> Result<Self, TopologyError> {
		if len > 32 {
			return Err(TopologyError::InvalidNetmask(format!("/{}", len)));
		}
		let bits = if len == 0 { 0 } else { u32::MAX << (32 - len) };
		Ok(Netmask(bits))
	}

	pub fn prefix_len(&self) -> u32 {
		self.0.leading_ones()
	}

	/// The two usable hosts of the subnet containing `addr`:
	/// (network + 1, broadcast - 1).
	pub fn usable_pair(&self, addr: Ipv4Addr) -> (Ipv4Addr, Ipv4Addr) {
		let a = u32::from(addr);
		let low = (a & self.0).wrapping_add(1);
		let high = (a | !self.0).wrapping_sub(1);
		(Ipv4Addr::from(low), Ipv4Addr::from(high))
	}

	/// True iff `a` and `b` are exactly the two usable hosts of one subnet.
	///
	/// Under /31 the formula flips (low = broadcast, high = network), which
	/// still yields both addresses of the pair.
	pub fn matches(&self, a: Ipv4Addr, b: Ipv4Addr) -> bool {
		let (low, high) = self.usable_pair(a);
		(a == low && b == high) || (a == high && b == low)
	}
}

impl FromStr for Netmask {
	type Err = TopologyError;

	/// Accepts "255.255.255.252" or "/30".
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let trimmed = s.trim();
		if let Some(len) = trimmed.strip_prefix('/') {
			let len: u8 = len.parse()
				.map_err(|_| TopologyError::InvalidNetmask(s.to_string()))?;
			return Self::from_prefix(len);
		}
		let addr: Ipv4Addr = trimmed.parse()
			.map_err(|_| TopologyError::InvalidNetmask(s.to_string()))?;
		let bits = u32::from(addr);
		// Contiguous ones followed by zeros only
		if bits.leading_ones() + bits.trailing_zeros() != 32 {
			return Err(TopologyError::InvalidNetmask(s.to_string()));
		}
		Ok(Netmask(bits))
	}
}

impl fmt::Display for Netmask {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", Ipv4Addr::from(self.0))
	}
}
