mod cli;
mod dns;
mod error;
mod geo;
mod graph;
mod hostname;
mod netmask;
mod output;
mod progress;
mod range;
mod records;
mod resolver;
mod scan;
mod speed;
mod topology;
mod transport;

use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::cli::{Cli, Command, MapOutputArgs, ScanArgs};
use crate::netmask::Netmask;
use crate::progress::{BarProgress, CountingProgress, ProgressReporter};
use crate::range::AddressRange;
use crate::records::{JsonRecordWriter, RecordSink};
use crate::scan::{PtrLookup, UdpPtrLookup};
use crate::topology::{aggregate, AggregateConfig};
use crate::transport::{PtrRecord, ScanConfig};

#[tokio::main]
async fn main() -> Result<()> {
	let cli = Cli::parse();
	init_logging(cli.verbose);

	match cli.command {
		Command::Scan(args) => {
			run_scan(&args).await?;
		}
		Command::Map(args) => {
			// A bad stream aborts here with a non-zero exit
			let records = records::load_records(&args.records)?;
			info!(records = records.len(), path = %args.records, "loaded record stream");
			run_map(records, &args.output)?;
		}
		Command::Run { scan, map } => {
			let records = run_scan(&scan).await?;
			run_map(records.into_iter().map(Some), &map)?;
		}
	}

	Ok(())
}

fn init_logging(verbose: u8) {
	let default = match verbose {
		0 => "warn",
		1 => "info",
		2 => "debug",
		_ => "trace",
	};
	let filter = EnvFilter::try_from_default_env()
		.unwrap_or_else(|_| EnvFilter::new(default));
	tracing_subscriber::fmt()
		.with_env_filter(filter)
		.with_writer(std::io::stderr)
		.init();
}

async fn run_scan(args: &ScanArgs) -> Result<Vec<PtrRecord>> {
	let range = AddressRange::parse(&args.start, &args.end)?;

	// Collect resolvers from all sources
	let mut resolvers = Vec::new();
	for r in &args.resolvers {
		resolvers.push(resolver::parse_resolver(r)?);
	}
	if let Some(path) = &args.resolver_file {
		resolvers.extend(resolver::read_resolver_file(path)?);
	}
	if args.system_resolvers {
		resolvers.extend(resolver::system_resolvers());
	}
	if resolvers.is_empty() {
		resolvers = resolver::default_resolvers();
	}

	let config = ScanConfig {
		batch_size: args.batch_size.max(1),
		timeout: Duration::from_millis(args.timeout),
		attempts: args.attempts.max(1),
	};
	output::print_scan_summary(&range, &resolvers, &config);

	// Ctrl-C stops the sweep at the next batch boundary, a second one exits
	let stop = Arc::new(AtomicBool::new(false));
	{
		let stop = stop.clone();
		tokio::spawn(async move {
			if scan::watch_interrupts(&stop, tokio::signal::ctrl_c).await {
				warn!("second interrupt received, exiting");
				std::process::exit(130);
			}
		});
	}

	let lookup: Arc<dyn PtrLookup> = Arc::new(UdpPtrLookup::new(resolvers, config.clone())?);
	let progress: Arc<dyn ProgressReporter> = if args.quiet {
		Arc::new(CountingProgress::default())
	} else {
		Arc::new(BarProgress::new(range.len()))
	};
	let mut sink = JsonRecordWriter::create(&args.records)?;

	let (records, summary) = scan::run_scan(
		&range, lookup, &config, &mut sink as &mut dyn RecordSink, progress, &stop,
	).await?;

	output::print_scan_result(&summary);
	if summary.cancelled {
		println!("Partial records left at: {}", sink.partial_path().display());
	} else {
		println!("Records written to: {}", args.records);
	}
	Ok(records)
}

fn run_map<I>(records: I, args: &MapOutputArgs) -> Result<()>
where
	I: IntoIterator<Item = Option<PtrRecord>>,
{
	let netmask: Netmask = args.netmask.parse()?;
	let config = AggregateConfig {
		netmask,
		node_id_policy: args.node_id,
	};
	info!(%netmask, prefix = netmask.prefix_len(), policy = %args.node_id, "aggregating links");

	let aggregation = aggregate(records, &config);
	let edges = graph::edges(&aggregation.graph);

	output::write_atomic(&args.graph, graph::render_dot(&aggregation.graph).as_bytes())?;
	println!("Graph written to: {}", args.graph);

	if let Some(pops_path) = &args.pops {
		let pops = geo::load_pop_table(pops_path)?;
		let export = geo::export(&aggregation.graph, &pops);
		if export.dropped > 0 {
			info!(dropped = export.dropped, "links with unknown PoP codes left off the map");
		}
		if let Some(path) = &args.geojson {
			let bytes = serde_json::to_vec_pretty(&export.collection)
				.context("failed to serialize GeoJSON")?;
			output::write_atomic(path, &bytes)?;
			println!("GeoJSON written to: {}", path);
		}
	}

	if let Some(path) = &args.csv {
		output::write_csv(path, &edges)?;
	}

	output::print_links_table(&edges, &aggregation.stats);
	Ok(())
}
