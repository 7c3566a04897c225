use std::net::{Ipv4Addr, SocketAddr};
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for a single DNS resolver
#[derive(Debug, Clone)]
pub struct ResolverConfig {
	pub label: String,
	pub addr: SocketAddr,
}

/// A resolved reverse lookup. Failed lookups are represented as `None`
/// wherever an ordered stream of `Option<PtrRecord>` is used.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PtrRecord {
	pub ip: Ipv4Addr,
	pub name: String,
}

/// Scan configuration
#[derive(Debug, Clone)]
pub struct ScanConfig {
	/// Lookups in flight per batch
	pub batch_size: usize,
	/// Per-attempt timeout
	pub timeout: Duration,
	/// Attempts per address, each against the next resolver in the list
	pub attempts: u32,
}

impl Default for ScanConfig {
	fn default() -> Self {
		Self {
			batch_size: 32,
			timeout: Duration::from_millis(2000),
			attempts: 2,
		}
	}
}
