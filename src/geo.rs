use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::debug;

use crate::graph::edges;
use crate::topology::TopologyGraph;

/// Location of a point of presence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PopLocation {
	pub lat: f64,
	pub lng: f64,
	pub name: String,
}

/// PoP code -> location, sorted by code.
pub type PopTable = BTreeMap<String, PopLocation>;

/// Read a PoP table from a JSON object keyed by PoP code.
///
/// Codes are lowercased to match node ids derived from hostnames.
pub fn load_pop_table(path: impl AsRef<Path>) -> Result<PopTable> {
	let path = path.as_ref();
	let content = std::fs::read_to_string(path)
		.with_context(|| format!("failed to read PoP table '{}'", path.display()))?;
	let raw: BTreeMap<String, PopLocation> = serde_json::from_str(&content)
		.with_context(|| format!("failed to parse PoP table '{}'", path.display()))?;
	Ok(raw.into_iter()
		.map(|(code, loc)| (code.to_ascii_lowercase(), loc))
		.collect())
}

/// Result of a geo export.
#[derive(Debug, Clone, PartialEq)]
pub struct GeoExport {
	pub collection: Value,
	/// Links left out because a PoP code had no location.
	pub dropped: usize,
}

/// Build a GeoJSON FeatureCollection: one point per known PoP, one line
/// per link whose endpoints are both known.
pub fn export(graph: &TopologyGraph, pops: &PopTable) -> GeoExport {
	let mut features = Vec::new();

	for (code, loc) in pops {
		features.push(json!({
			"type": "Feature",
			"properties": {
				"name": loc.name,
				"code": code,
			},
			"geometry": {
				"type": "Point",
				"coordinates": [loc.lng, loc.lat],
			},
		}));
	}

	let mut dropped = 0;
	for edge in edges(graph) {
		let (from, to) = match (pops.get(&edge.a), pops.get(&edge.b)) {
			(Some(from), Some(to)) => (from, to),
			_ => {
				debug!(a = %edge.a, b = %edge.b, "unknown PoP code, link left off the map");
				dropped += 1;
				continue;
			}
		};
		features.push(json!({
			"type": "Feature",
			"properties": {
				"stroke": edge.bucket.color(),
				"stroke-width": edge.bucket.width(),
				"name": format!("{} - {}", from.name, to.name),
				"from": edge.a,
				"to": edge.b,
				"speed": edge.label,
			},
			"geometry": {
				"type": "LineString",
				"coordinates": [[from.lng, from.lat], [to.lng, to.lat]],
			},
		}));
	}

	GeoExport {
		collection: json!({
			"type": "FeatureCollection",
			"features": features,
		}),
		dropped,
	}
}
