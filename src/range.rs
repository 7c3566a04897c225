use std::net::Ipv4Addr;

use crate::error::TopologyError;

/// Inclusive IPv4 address range swept by the scanner.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AddressRange {
	start: u32,
	end: u32,
}

impl AddressRange {
	pub fn new(start: Ipv4Addr, end: Ipv4Addr) -> Result<Self, TopologyError> {
		let (s, e) = (u32::from(start), u32::from(end));
		if s > e {
			return Err(TopologyError::InvalidRange {
				start: start.to_string(),
				end: end.to_string(),
			});
		}
		Ok(Self { start: s, end: e })
	}

	/// Parse a range from two dotted-decimal strings.
	pub fn parse(start: &str, end: &str) -> Result<Self, TopologyError> {
		Self::new(parse_ipv4(start)?, parse_ipv4(end)?)
	}

	pub fn start(&self) -> Ipv4Addr {
		Ipv4Addr::from(self.start)
	}

	pub fn end(&self) -> Ipv4Addr {
		Ipv4Addr::from(self.end)
	}

	/// Number of addresses in the range. A full /0 sweep is 2^32, hence u64.
	pub fn len(&self) -> u64 {
		u64::from(self.end) - u64::from(self.start) + 1
	}

	/// Consecutive batches of at most `batch_size` addresses, in ascending order.
	///
	/// Returns an iterator of (first address, count). The last batch is
	/// truncated to whatever remains.
	pub fn batches(&self, batch_size: usize) -> Batches {
		Batches {
			next: u64::from(self.start),
			end: u64::from(self.end),
			batch_size: batch_size.max(1) as u64,
		}
	}

	/// Expected number of batches for a given size.
	pub fn batch_count(&self, batch_size: usize) -> u64 {
		let size = batch_size.max(1) as u64;
		self.len().div_ceil(size)
	}
}

/// Iterator over the batches of an `AddressRange`.
#[derive(Debug, Clone)]
pub struct Batches {
	next: u64,
	end: u64,
	batch_size: u64,
}

impl Iterator for Batches {
	type Item = (Ipv4Addr, usize);

	fn next(&mut self) -> Option<Self::Item> {
		if self.next > self.end {
			return None;
		}
		let count = (self.end - self.next + 1).min(self.batch_size);
		let first = Ipv4Addr::from(self.next as u32);
		self.next += count;
		Some((first, count as usize))
	}
}

pub fn parse_ipv4(input: &str) -> Result<Ipv4Addr, TopologyError> {
	input.trim().parse()
		.map_err(|_| TopologyError::InvalidAddress(input.to_string()))
}

/// Owner name of the PTR record for an address, e.g. "1.0.0.10.in-addr.arpa.".
pub fn ptr_name(addr: Ipv4Addr) -> String {
	let [a, b, c, d] = addr.octets();
	format!("{}.{}.{}.{}.in-addr.arpa.", d, c, b, a)
}
