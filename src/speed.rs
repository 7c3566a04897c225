/// Interface families recognized from the hostname's interface-type token.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum InterfaceKind {
	FastEthernet,
	GigabitEthernet,
	TenGigabitEthernet,
	HundredGigabitEthernet,
	/// Packet over SONET. Several line rates exist; collapsed to OC-48.
	Pos,
	/// Serial, assumed T3.
	Serial,
	Unknown,
}

const TOKENS: &[(&str, InterfaceKind)] = &[
	("fa", InterfaceKind::FastEthernet),
	("fe", InterfaceKind::FastEthernet),
	("g", InterfaceKind::GigabitEthernet),
	("gi", InterfaceKind::GigabitEthernet),
	("ge", InterfaceKind::GigabitEthernet),
	("gig", InterfaceKind::GigabitEthernet),
	("te", InterfaceKind::TenGigabitEthernet),
	("ten", InterfaceKind::TenGigabitEthernet),
	("teng", InterfaceKind::TenGigabitEthernet),
	("tenge", InterfaceKind::TenGigabitEthernet),
	("tengig", InterfaceKind::TenGigabitEthernet),
	("tengige", InterfaceKind::TenGigabitEthernet),
	("hu", InterfaceKind::HundredGigabitEthernet),
	("hundredge", InterfaceKind::HundredGigabitEthernet),
	("hundredgig", InterfaceKind::HundredGigabitEthernet),
	("hundredgige", InterfaceKind::HundredGigabitEthernet),
	("pos", InterfaceKind::Pos),
	("ser", InterfaceKind::Serial),
];

impl InterfaceKind {
	/// Classify an interface-type token, case-insensitively.
	pub fn from_token(token: &str) -> Self {
		let lower = token.to_ascii_lowercase();
		TOKENS.iter()
			.find(|(t, _)| *t == lower)
			.map(|(_, kind)| *kind)
			.unwrap_or(InterfaceKind::Unknown)
	}

	/// Nominal bandwidth in Mbps.
	pub fn nominal_mbps(self) -> u64 {
		match self {
			InterfaceKind::FastEthernet => 100,
			InterfaceKind::GigabitEthernet => 1_000,
			InterfaceKind::TenGigabitEthernet => 10_000,
			InterfaceKind::HundredGigabitEthernet => 100_000,
			InterfaceKind::Pos => 2_488,
			InterfaceKind::Serial => 45,
			InterfaceKind::Unknown => 0,
		}
	}
}

/// Nominal bandwidth in Mbps for an interface-type token.
pub fn nominal_mbps(token: &str) -> u64 {
	InterfaceKind::from_token(token).nominal_mbps()
}

/// Presentation bucket for an aggregate link throughput.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum SpeedBucket {
	Low,
	Moderate,
	High,
	VeryHigh,
	Extreme,
}

/// Upper bounds (exclusive, Mbps) of every bucket but the last.
const BUCKET_LIMITS: [(u64, SpeedBucket); 4] = [
	(10_000, SpeedBucket::Low),
	(50_000, SpeedBucket::Moderate),
	(100_000, SpeedBucket::High),
	(200_000, SpeedBucket::VeryHigh),
];

impl SpeedBucket {
	pub fn for_mbps(total_mbps: u64) -> Self {
		BUCKET_LIMITS.iter()
			.find(|(limit, _)| total_mbps < *limit)
			.map(|(_, bucket)| *bucket)
			.unwrap_or(SpeedBucket::Extreme)
	}

	pub fn color(self) -> &'static str {
		match self {
			SpeedBucket::Low => "black",
			SpeedBucket::Moderate => "blue",
			SpeedBucket::High => "green",
			SpeedBucket::VeryHigh => "orange",
			SpeedBucket::Extreme => "red",
		}
	}

	/// Stroke width for map rendering.
	pub fn width(self) -> u32 {
		match self {
			SpeedBucket::Low => 1,
			SpeedBucket::Moderate => 2,
			SpeedBucket::High => 3,
			SpeedBucket::VeryHigh => 4,
			SpeedBucket::Extreme => 5,
		}
	}
}

const UNITS: [&str; 5] = ["bps", "Kbps", "Mbps", "Gbps", "Tbps"];

/// Format a rate in bits per second with a base-1000 auto-scaled unit,
/// e.g. 11_000_000_000 -> "11Gbps", 2_488_000_000 -> "2.488Gbps".
pub fn format_speed(bps: u64) -> String {
	let mut mag = 0;
	let mut scale = 1u64;
	while mag < UNITS.len() - 1 && bps / scale >= 1000 {
		scale *= 1000;
		mag += 1;
	}
	format!("{}{}", bps as f64 / scale as f64, UNITS[mag])
}

/// Format an aggregate expressed in Mbps.
pub fn format_mbps(total_mbps: u64) -> String {
	format_speed(total_mbps.saturating_mul(1_000_000))
}
