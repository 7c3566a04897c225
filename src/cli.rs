use clap::{Args, Parser, Subcommand};

use crate::hostname::NodeIdPolicy;

/// Backbone topology inference from reverse DNS
#[derive(Parser, Debug)]
#[command(name = "ptr-topology")]
#[command(about = "Sweep PTR records across an IPv4 range and infer backbone links")]
pub struct Cli {
	/// Verbose logging (repeat for trace); RUST_LOG overrides
	#[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
	pub verbose: u8,

	#[command(subcommand)]
	pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
	/// Sweep a range and write the record stream
	Scan(ScanArgs),
	/// Build the topology from a record stream
	Map(MapArgs),
	/// Scan, then map the in-memory records
	Run {
		#[command(flatten)]
		scan: ScanArgs,
		#[command(flatten)]
		map: MapOutputArgs,
	},
}

#[derive(Args, Debug)]
pub struct ScanArgs {
	/// First address of the range (inclusive)
	#[arg(long = "start")]
	pub start: String,

	/// Last address of the range (inclusive)
	#[arg(long = "end")]
	pub end: String,

	/// DNS resolver address (repeatable, e.g. 1.1.1.1 or 1.1.1.1:53)
	#[arg(short = 'r', long = "resolver")]
	pub resolvers: Vec<String>,

	/// File containing resolver addresses (one per line)
	#[arg(short = 'f', long = "resolver-file")]
	pub resolver_file: Option<String>,

	/// Include system resolvers from /etc/resolv.conf
	#[arg(long = "system-resolvers")]
	pub system_resolvers: bool,

	/// Lookups in flight per batch
	#[arg(short = 'b', long = "batch-size", default_value = "32")]
	pub batch_size: usize,

	/// Per-attempt query timeout in milliseconds
	#[arg(short = 't', long = "timeout", default_value = "2000")]
	pub timeout: u64,

	/// Attempts per address, rotating through resolvers
	#[arg(long = "attempts", default_value = "2")]
	pub attempts: u32,

	/// Record stream output path
	#[arg(long = "records", default_value = "dns-records.json")]
	pub records: String,

	/// Hide the progress bar
	#[arg(short = 'q', long = "quiet")]
	pub quiet: bool,
}

#[derive(Args, Debug)]
pub struct MapArgs {
	/// Record stream input path
	#[arg(long = "records", default_value = "dns-records.json")]
	pub records: String,

	#[command(flatten)]
	pub output: MapOutputArgs,
}

#[derive(Args, Debug)]
pub struct MapOutputArgs {
	/// Link subnet mask, dotted or /len
	#[arg(long = "netmask", default_value = "255.255.255.252")]
	pub netmask: String,

	/// Node id policy: "full" PoP label or "prefix[:N]" characters of it
	#[arg(long = "node-id", default_value = "prefix:3")]
	pub node_id: NodeIdPolicy,

	/// Graphviz output path
	#[arg(short = 'g', long = "graph", default_value = "graph.gv")]
	pub graph: String,

	/// PoP coordinate table (JSON object keyed by PoP code)
	#[arg(long = "pops")]
	pub pops: Option<String>,

	/// GeoJSON output path (requires --pops)
	#[arg(long = "geojson", requires = "pops")]
	pub geojson: Option<String>,

	/// CSV link table output path
	#[arg(long = "csv")]
	pub csv: Option<String>,
}
