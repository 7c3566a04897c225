use std::collections::BTreeMap;
use std::fmt;

use tracing::{debug, trace};

use crate::hostname::{self, NodeIdPolicy};
use crate::netmask::Netmask;
use crate::speed;
use crate::transport::PtrRecord;

/// Unordered pair of node ids, stored sorted.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LinkKey {
	a: String,
	b: String,
}

impl LinkKey {
	pub fn new(x: impl Into<String>, y: impl Into<String>) -> Self {
		let (x, y) = (x.into(), y.into());
		if x <= y {
			LinkKey { a: x, b: y }
		} else {
			LinkKey { a: y, b: x }
		}
	}

	pub fn a(&self) -> &str {
		&self.a
	}

	pub fn b(&self) -> &str {
		&self.b
	}
}

impl fmt::Display for LinkKey {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}-{}", self.a, self.b)
	}
}

/// Nominal bandwidth contributions (Mbps) of the parallel links between
/// one node pair, in discovery order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LinkAggregate {
	contributions: Vec<u64>,
}

impl LinkAggregate {
	pub fn push(&mut self, mbps: u64) {
		self.contributions.push(mbps);
	}

	#[cfg(test)]
	pub fn contributions(&self) -> &[u64] {
		&self.contributions
	}

	pub fn total_mbps(&self) -> u64 {
		self.contributions.iter().sum()
	}

	pub fn link_count(&self) -> usize {
		self.contributions.len()
	}
}

/// Aggregated links keyed by node pair. Iteration order is the sorted
/// key order, so exports are deterministic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TopologyGraph {
	links: BTreeMap<LinkKey, LinkAggregate>,
}

impl TopologyGraph {
	pub fn add(&mut self, key: LinkKey, mbps: u64) {
		self.links.entry(key).or_default().push(mbps);
	}

	#[cfg(test)]
	pub fn get(&self, key: &LinkKey) -> Option<&LinkAggregate> {
		self.links.get(key)
	}

	pub fn iter(&self) -> impl Iterator<Item = (&LinkKey, &LinkAggregate)> {
		self.links.iter()
	}

	#[cfg(test)]
	pub fn len(&self) -> usize {
		self.links.len()
	}

	#[cfg(test)]
	pub fn is_empty(&self) -> bool {
		self.links.is_empty()
	}
}

/// Knobs for pair detection.
#[derive(Debug, Clone, Copy, Default)]
pub struct AggregateConfig {
	pub netmask: Netmask,
	pub node_id_policy: NodeIdPolicy,
}

/// Counters gathered during aggregation.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AggregateStats {
	pub records: usize,
	pub subnet_pairs: usize,
	pub unparsed_pairs: usize,
	pub self_links: usize,
	pub links: usize,
}

/// Fold state: the graph so far plus the previous record of the
/// two-element window.
#[derive(Debug, Clone, Default)]
pub struct Aggregation {
	pub graph: TopologyGraph,
	pub stats: AggregateStats,
	previous: Option<PtrRecord>,
}

impl Aggregation {
	/// Advance the window by one stream element.
	///
	/// Absent records are skipped without touching the window. The
	/// previous slot always moves to the current record, matched or not.
	pub fn step(mut self, record: Option<PtrRecord>, config: &AggregateConfig) -> Self {
		let Some(current) = record else {
			return self;
		};
		self.stats.records += 1;

		let partner = self.previous.as_ref()
			.filter(|prev| config.netmask.matches(current.ip, prev.ip))
			.cloned();
		if let Some(previous) = partner {
			self.stats.subnet_pairs += 1;
			self.pair(previous, &current, config);
		}

		self.previous = Some(current);
		self
	}

	fn pair(&mut self, previous: PtrRecord, current: &PtrRecord, config: &AggregateConfig) {
		let policy = config.node_id_policy;
		let parsed = (
			hostname::parse(&previous.name, policy),
			hostname::parse(&current.name, policy),
		);
		let (prev, cur) = match parsed {
			(Ok(prev), Ok(cur)) => (prev, cur),
			(prev, cur) => {
				for err in [prev.err(), cur.err()].into_iter().flatten() {
					trace!("{}", err);
				}
				self.stats.unparsed_pairs += 1;
				return;
			}
		};

		if prev.node_id == cur.node_id {
			self.stats.self_links += 1;
			return;
		}

		// The current record's interface type sets the link speed
		let mbps = speed::nominal_mbps(&cur.interface_speed_class);
		debug!(
			a = %prev.node_id, b = %cur.node_id,
			interface = %cur.interface_speed_class, mbps,
			"link between {} and {}", previous.ip, current.ip
		);
		self.graph.add(LinkKey::new(prev.node_id, cur.node_id), mbps);
		self.stats.links += 1;
	}
}

/// Build the topology graph from an ordered record stream.
///
/// The stream must be in ascending address order: only records that are
/// consecutive in the stream can be paired.
pub fn aggregate<I>(records: I, config: &AggregateConfig) -> Aggregation
where
	I: IntoIterator<Item = Option<PtrRecord>>,
{
	records.into_iter()
		.fold(Aggregation::default(), |acc, record| acc.step(record, config))
}
