use std::fmt::Write;

use crate::speed::{format_mbps, SpeedBucket};
use crate::topology::{LinkKey, TopologyGraph};

/// One rendered edge of the topology graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EdgeRecord {
	pub a: String,
	pub b: String,
	pub total_mbps: u64,
	pub links: usize,
	pub bucket: SpeedBucket,
	pub label: String,
}

impl EdgeRecord {
	fn new(key: &LinkKey, total_mbps: u64, links: usize) -> Self {
		Self {
			a: key.a().to_string(),
			b: key.b().to_string(),
			total_mbps,
			links,
			bucket: SpeedBucket::for_mbps(total_mbps),
			label: format_mbps(total_mbps),
		}
	}
}

/// One edge per node pair, in graph key order.
pub fn edges(graph: &TopologyGraph) -> Vec<EdgeRecord> {
	graph.iter()
		.map(|(key, agg)| EdgeRecord::new(key, agg.total_mbps(), agg.link_count()))
		.collect()
}

/// Render the graph as an undirected Graphviz document.
pub fn render_dot(graph: &TopologyGraph) -> String {
	let mut out = String::new();
	out.push_str("graph network {\n");
	out.push_str("\tnode [shape=box]\n\n");
	out.push_str("\t# Graph Start\n");
	for edge in edges(graph) {
		// Writing to a String cannot fail
		let _ = writeln!(
			out,
			"\t\"{}\" -- \"{}\" [color={},label=\" {}\"]",
			edge.a, edge.b, edge.bucket.color(), edge.label,
		);
	}
	out.push_str("}\n");
	out
}

#[cfg(test)]
mod tests {
	use super::*;

	fn sample() -> TopologyGraph {
		let mut graph = TopologyGraph::default();
		graph.add(LinkKey::new("nyc", "chi"), 10_000);
		graph.add(LinkKey::new("chi", "nyc"), 1_000);
		graph.add(LinkKey::new("lax", "sea"), 100_000);
		graph.add(LinkKey::new("lax", "sea"), 100_000);
		graph.add(LinkKey::new("dal", "atl"), 45);
		graph
	}

	#[test]
	fn test_edges_in_key_order() {
		let edges = edges(&sample());
		let pairs: Vec<(&str, &str)> = edges.iter()
			.map(|e| (e.a.as_str(), e.b.as_str()))
			.collect();
		assert_eq!(pairs, vec![("atl", "dal"), ("chi", "nyc"), ("lax", "sea")]);
		assert_eq!(edges[1].total_mbps, 11_000);
		assert_eq!(edges[1].links, 2);
		assert_eq!(edges[1].label, "11Gbps");
		assert_eq!(edges[1].bucket.color(), "blue");
		assert_eq!(edges[2].bucket.color(), "red");
		assert_eq!(edges[0].label, "45Mbps");
	}

	#[test]
	fn test_render_dot() {
		let dot = render_dot(&sample());
		assert!(dot.starts_with("graph network {\n\tnode [shape=box]\n"));
		assert!(dot.contains("\t\"chi\" -- \"nyc\" [color=blue,label=\" 11Gbps\"]\n"));
		assert!(dot.contains("\t\"lax\" -- \"sea\" [color=red,label=\" 200Gbps\"]\n"));
		assert!(dot.ends_with("}\n"));
	}

	#[test]
	fn test_render_is_deterministic() {
		let graph = sample();
		assert_eq!(render_dot(&graph), render_dot(&graph));
	}

	#[test]
	fn test_empty_graph() {
		let dot = render_dot(&TopologyGraph::default());
		assert_eq!(dot, "graph network {\n\tnode [shape=box]\n\n\t# Graph Start\n}\n");
	}
}
