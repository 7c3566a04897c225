use std::path::Path;

use comfy_table::{Table, ContentArrangement, presets::UTF8_FULL};

use anyhow::{Context, Result};

use crate::graph::EdgeRecord;
use crate::range::AddressRange;
use crate::scan::ScanSummary;
use crate::topology::AggregateStats;
use crate::transport::{ResolverConfig, ScanConfig};

/// Print a summary of the scan configuration before running.
pub fn print_scan_summary(
	range: &AddressRange,
	resolvers: &[ResolverConfig],
	config: &ScanConfig,
) {
	println!("PTR Sweep Configuration");
	println!("=======================");
	println!("Range:          {} - {}", range.start(), range.end());
	println!("Addresses:      {}", range.len());
	println!("Resolvers:      {}", resolvers.len());
	for r in resolvers {
		println!("  - {} ({})", r.label, r.addr);
	}
	println!("Batch size:     {}", config.batch_size);
	println!("Batches:        {}", range.batch_count(config.batch_size));
	println!("Timeout:        {} ms", config.timeout.as_millis());
	println!("Attempts:       {}", config.attempts);
	println!();
}

/// Print the totals of a finished scan.
pub fn print_scan_result(summary: &ScanSummary) {
	println!();
	println!("Scanned {} addresses in {} batches: {} resolved, {} without PTR",
		summary.visited, summary.batches, summary.resolved, summary.failed);
	if summary.cancelled {
		println!("Scan was cancelled before the end of the range");
	}
}

/// Print the aggregated links as a formatted table.
pub fn print_links_table(edges: &[EdgeRecord], stats: &AggregateStats) {
	let mut table = Table::new();
	table.load_preset(UTF8_FULL);
	table.set_content_arrangement(ContentArrangement::Dynamic);
	table.set_header(vec![
		"Node A", "Node B", "Links", "Total", "Color",
	]);

	for e in edges {
		table.add_row(vec![
			e.a.clone(),
			e.b.clone(),
			format!("{}", e.links),
			e.label.clone(),
			e.bucket.color().to_string(),
		]);
	}

	println!("\nInferred Backbone Links");
	println!("=======================\n");
	println!("{table}");
	println!(
		"{} records, {} subnet pairs, {} unparsed, {} same-node, {} node pairs",
		stats.records, stats.subnet_pairs, stats.unparsed_pairs,
		stats.self_links, edges.len(),
	);
}

/// Write the aggregated links to a CSV file.
pub fn write_csv(path: &str, edges: &[EdgeRecord]) -> Result<()> {
	let mut writer = csv::Writer::from_writer(Vec::new());

	writer.write_record([
		"a", "b", "links", "total_mbps", "speed", "color",
	])?;

	for e in edges {
		writer.write_record([
			e.a.clone(),
			e.b.clone(),
			e.links.to_string(),
			e.total_mbps.to_string(),
			e.label.clone(),
			e.bucket.color().to_string(),
		])?;
	}

	let bytes = writer.into_inner()
		.map_err(|e| anyhow::anyhow!("failed to finish CSV: {}", e))?;
	write_atomic(path, &bytes)?;
	println!("\nLinks written to: {}", path);
	Ok(())
}

/// Replace `path` with `contents` so that readers see either the old file
/// or the complete new one.
pub fn write_atomic(path: impl AsRef<Path>, contents: &[u8]) -> Result<()> {
	let path = path.as_ref();
	let mut tmp = path.as_os_str().to_owned();
	tmp.push(".tmp");
	std::fs::write(&tmp, contents)
		.with_context(|| format!("failed to write '{}'", Path::new(&tmp).display()))?;
	std::fs::rename(&tmp, path)
		.with_context(|| format!("failed to replace '{}'", path.display()))?;
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::speed::SpeedBucket;

	#[test]
	fn test_write_atomic_replaces() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("graph.gv");
		std::fs::write(&path, "old").unwrap();
		write_atomic(&path, b"new").unwrap();
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "new");
		assert!(!dir.path().join("graph.gv.tmp").exists());
	}

	#[test]
	fn test_write_atomic_missing_dir_fails() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("missing-dir").join("graph.gv");
		assert!(write_atomic(&path, b"new").is_err());
	}

	#[test]
	fn test_write_csv() {
		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("links.csv");
		let edges = vec![EdgeRecord {
			a: "chi".to_string(),
			b: "nyc".to_string(),
			total_mbps: 11_000,
			links: 2,
			bucket: SpeedBucket::Moderate,
			label: "11Gbps".to_string(),
		}];
		write_csv(path.to_str().unwrap(), &edges).unwrap();
		let content = std::fs::read_to_string(&path).unwrap();
		assert_eq!(content, "a,b,links,total_mbps,speed,color\nchi,nyc,2,11000,11Gbps,blue\n");
	}
}
