use std::net::{IpAddr, SocketAddr};

use anyhow::{anyhow, Context, Result};

use crate::transport::ResolverConfig;

const DNS_PORT: u16 = 53;

/// Parse a resolver address string into a ResolverConfig.
///
/// Supports formats:
///   "1.1.1.1"              -- IPv4, default port 53
///   "1.1.1.1:53"           -- IPv4 with explicit port
///   "2606:4700::1111"      -- bare IPv6, default port 53
///   "[2606:4700::1111]:53" -- bracketed IPv6 with port
pub fn parse_resolver(input: &str) -> Result<ResolverConfig> {
	let trimmed = input.trim();
	if trimmed.is_empty() {
		return Err(anyhow!("empty resolver address"));
	}

	// Socket form first ("1.1.1.1:53", "[::1]:53"), then a bare IP
	let addr = match trimmed.parse::<SocketAddr>() {
		Ok(addr) => addr,
		Err(_) => {
			let ip: IpAddr = trimmed.parse()
				.map_err(|e| anyhow!("invalid resolver address '{}': {}", trimmed, e))?;
			SocketAddr::new(ip, DNS_PORT)
		}
	};

	Ok(ResolverConfig { label: addr.ip().to_string(), addr })
}

/// Read resolver addresses from a file, one per line.
///
/// Blank lines and lines starting with '#' are skipped.
pub fn read_resolver_file(path: &str) -> Result<Vec<ResolverConfig>> {
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read resolver file '{}'", path))?;
	content.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty() && !line.starts_with('#'))
		.map(|line| parse_resolver(line)
			.with_context(|| format!("in resolver file '{}'", path)))
		.collect()
}

/// Read system resolvers from /etc/resolv.conf (Unix only).
///
/// Returns an empty vec if the file cannot be read.
pub fn system_resolvers() -> Vec<ResolverConfig> {
	std::fs::read_to_string("/etc/resolv.conf")
		.map(|content| parse_resolv_conf(&content))
		.unwrap_or_default()
}

fn parse_resolv_conf(content: &str) -> Vec<ResolverConfig> {
	content.lines()
		.filter_map(|line| line.trim().strip_prefix("nameserver"))
		.filter_map(|rest| rest.split_whitespace().next())
		.filter_map(|addr| parse_resolver(addr).ok())
		.collect()
}

/// Return the public resolvers used when none are configured.
pub fn default_resolvers() -> Vec<ResolverConfig> {
	[
		("Cloudflare", [1, 1, 1, 1]),
		("Cloudflare", [1, 0, 0, 1]),
		("Google", [8, 8, 8, 8]),
		("Google", [8, 8, 4, 4]),
	]
	.into_iter()
	.map(|(label, ip)| ResolverConfig {
		label: label.to_string(),
		addr: SocketAddr::from((ip, DNS_PORT)),
	})
	.collect()
}
