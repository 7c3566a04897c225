use std::future::Future;
use std::net::{Ipv4Addr, SocketAddr};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use tokio::net::UdpSocket;
use tracing::{debug, info, warn};

use crate::dns::{build_ptr_query, parse_ptr_response};
use crate::error::ResolutionFailure;
use crate::progress::ProgressReporter;
use crate::range::AddressRange;
use crate::records::RecordSink;
use crate::transport::{PtrRecord, ResolverConfig, ScanConfig};

/// Reverse lookup of one address.
#[async_trait]
pub trait PtrLookup: Send + Sync {
	async fn lookup(&self, addr: Ipv4Addr) -> Result<String, ResolutionFailure>;
}

/// PTR lookups over plain UDP against a list of resolvers.
///
/// Attempt `k` for address `a` goes to resolver `(a + k) % n`, so retries
/// land on a different server and load spreads across the list.
pub struct UdpPtrLookup {
	resolvers: Vec<ResolverConfig>,
	config: ScanConfig,
}

impl UdpPtrLookup {
	pub fn new(resolvers: Vec<ResolverConfig>, config: ScanConfig) -> Result<Self> {
		if resolvers.is_empty() {
			return Err(anyhow!("no resolvers configured"));
		}
		Ok(Self { resolvers, config })
	}

	fn resolver_for(&self, addr: Ipv4Addr, attempt: u32) -> SocketAddr {
		let idx = (u32::from(addr) as usize).wrapping_add(attempt as usize) % self.resolvers.len();
		self.resolvers[idx].addr
	}
}

#[async_trait]
impl PtrLookup for UdpPtrLookup {
	async fn lookup(&self, addr: Ipv4Addr) -> Result<String, ResolutionFailure> {
		let attempts = self.config.attempts.max(1);
		let mut last_err = ResolutionFailure::Timeout;
		for attempt in 0..attempts {
			let resolver = self.resolver_for(addr, attempt);
			match send_ptr_query(resolver, addr, self.config.timeout).await {
				Ok(name) => return Ok(name),
				// An authoritative "no such record" will not change on retry
				Err(ResolutionFailure::NoRecord) => return Err(ResolutionFailure::NoRecord),
				Err(e) => last_err = e,
			}
		}
		Err(last_err)
	}
}

/// Send a single PTR query over UDP and wait for the matching reply.
///
/// Creates a dedicated socket per query to avoid response stealing between
/// concurrent tasks.
async fn send_ptr_query(
	resolver: SocketAddr,
	addr: Ipv4Addr,
	timeout: std::time::Duration,
) -> Result<String, ResolutionFailure> {
	let txid: u16 = rand::random();
	let query_bytes = build_ptr_query(addr, txid)
		.map_err(|e| ResolutionFailure::Transport(e.to_string()))?;

	let bind_addr = if resolver.is_ipv4() {
		"0.0.0.0:0"
	} else {
		"[::]:0"
	};
	let socket = UdpSocket::bind(bind_addr).await
		.map_err(|e| ResolutionFailure::Transport(e.to_string()))?;

	let start = Instant::now();
	socket.send_to(&query_bytes, resolver).await
		.map_err(|e| ResolutionFailure::Transport(e.to_string()))?;

	// Receive with timeout, skip stray datagrams with a foreign txid
	let mut buf = vec![0u8; 4096];
	let max_reads = 3;
	for _ in 0..max_reads {
		let elapsed = start.elapsed();
		if elapsed >= timeout {
			break;
		}
		let remaining = timeout - elapsed;

		match tokio::time::timeout(remaining, socket.recv_from(&mut buf)).await {
			Ok(Ok((len, _src))) => match parse_ptr_response(&buf[..len], txid) {
				Err(ResolutionFailure::Malformed(_)) => continue,
				other => return other,
			},
			Ok(Err(e)) => return Err(ResolutionFailure::Transport(e.to_string())),
			Err(_) => break,
		}
	}
	Err(ResolutionFailure::Timeout)
}

/// Set `stop` on the first interrupt and wait for a second one.
///
/// Returns `true` when a second interrupt arrives, `false` if the signal
/// source fails first.
pub async fn watch_interrupts<F, Fut>(stop: &AtomicBool, mut interrupt: F) -> bool
where
	F: FnMut() -> Fut,
	Fut: Future<Output = std::io::Result<()>>,
{
	if interrupt().await.is_err() {
		return false;
	}
	warn!("interrupt received, finishing current batch (press Ctrl-C again to exit)");
	stop.store(true, Ordering::Relaxed);
	interrupt().await.is_ok()
}

/// Outcome of a scan.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanSummary {
	pub visited: u64,
	pub resolved: u64,
	pub failed: u64,
	pub batches: u64,
	pub cancelled: bool,
}

/// Resolve `count` consecutive addresses starting at `first`, concurrently.
///
/// Slot `i` of the result always belongs to `first + i`, whatever order
/// the lookups settle in. Failures become `None`.
pub async fn resolve_batch(
	lookup: &Arc<dyn PtrLookup>,
	first: Ipv4Addr,
	count: usize,
	progress: &Arc<dyn ProgressReporter>,
) -> Vec<Option<PtrRecord>> {
	let base = u32::from(first);
	let mut handles = Vec::with_capacity(count);

	for i in 0..count {
		let addr = Ipv4Addr::from(base.wrapping_add(i as u32));
		let lookup = lookup.clone();
		let progress = progress.clone();

		handles.push(tokio::spawn(async move {
			let result = lookup.lookup(addr).await;
			progress.inc(1);
			match result {
				Ok(name) => Some(PtrRecord { ip: addr, name }),
				Err(e) => {
					debug!(%addr, error = %e, "reverse lookup failed");
					None
				}
			}
		}));
	}

	// Awaiting in spawn order is the barrier and keeps slots positional
	let mut slots = Vec::with_capacity(count);
	for handle in handles {
		match handle.await {
			Ok(slot) => slots.push(slot),
			Err(e) => {
				warn!("lookup task failed: {}", e);
				slots.push(None);
			}
		}
	}
	slots
}

/// Sweep `range` in batches of `config.batch_size`.
///
/// No lookup of batch N+1 starts before every lookup of batch N has
/// settled. Resolved records go to `sink` in ascending address order and
/// are also returned. `stop` is checked at each batch boundary; a
/// cancelled sweep aborts the sink instead of finishing it.
pub async fn run_scan(
	range: &AddressRange,
	lookup: Arc<dyn PtrLookup>,
	config: &ScanConfig,
	sink: &mut dyn RecordSink,
	progress: Arc<dyn ProgressReporter>,
	stop: &AtomicBool,
) -> Result<(Vec<PtrRecord>, ScanSummary)> {
	info!(
		start = %range.start(), end = %range.end(),
		addresses = range.len(), batch_size = config.batch_size,
		"starting PTR sweep"
	);

	let mut records = Vec::new();
	let mut summary = ScanSummary::default();

	for (first, count) in range.batches(config.batch_size) {
		if stop.load(Ordering::Relaxed) {
			warn!(next = %first, "scan cancelled at batch boundary");
			summary.cancelled = true;
			break;
		}

		let slots = resolve_batch(&lookup, first, count, &progress).await;
		summary.batches += 1;
		summary.visited += slots.len() as u64;

		for record in slots.into_iter().flatten() {
			sink.append(&record)?;
			records.push(record);
			summary.resolved += 1;
		}
		sink.end_batch()?;
	}

	summary.failed = summary.visited - summary.resolved;
	if summary.cancelled {
		sink.abort()?;
	} else {
		sink.finish()?;
	}
	progress.finish();

	info!(
		visited = summary.visited, resolved = summary.resolved,
		failed = summary.failed, batches = summary.batches,
		"PTR sweep finished"
	);
	Ok((records, summary))
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::collections::HashMap;
	use std::sync::atomic::AtomicUsize;
	use std::sync::Mutex;
	use std::time::Duration;

	use crate::progress::CountingProgress;
	use crate::records::MemorySink;

	/// Answers from a fixed table; tracks concurrency and call order.
	#[derive(Default)]
	struct FakeLookup {
		names: HashMap<Ipv4Addr, String>,
		in_flight: AtomicUsize,
		max_in_flight: AtomicUsize,
		calls: Mutex<Vec<Ipv4Addr>>,
		stop_after: Option<(usize, Arc<AtomicBool>)>,
	}

	impl FakeLookup {
		fn with_names(pairs: &[(&str, &str)]) -> Self {
			Self {
				names: pairs.iter()
					.map(|(ip, name)| (ip.parse().unwrap(), name.to_string()))
					.collect(),
				..Default::default()
			}
		}
	}

	#[async_trait]
	impl PtrLookup for FakeLookup {
		async fn lookup(&self, addr: Ipv4Addr) -> Result<String, ResolutionFailure> {
			let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
			self.max_in_flight.fetch_max(now, Ordering::SeqCst);
			let calls = {
				let mut calls = self.calls.lock().unwrap();
				calls.push(addr);
				calls.len()
			};
			if let Some((n, stop)) = &self.stop_after {
				if calls >= *n {
					stop.store(true, Ordering::SeqCst);
				}
			}

			// Later addresses in a batch settle first
			let delay = 20 - (u32::from(addr) % 8) as u64 * 2;
			tokio::time::sleep(Duration::from_millis(delay)).await;

			self.in_flight.fetch_sub(1, Ordering::SeqCst);
			self.names.get(&addr).cloned().ok_or(ResolutionFailure::NoRecord)
		}
	}

	async fn scan(
		range: &AddressRange,
		fake: Arc<FakeLookup>,
		batch_size: usize,
		stop: &AtomicBool,
	) -> (Vec<PtrRecord>, ScanSummary, MemorySink, Arc<CountingProgress>) {
		let config = ScanConfig { batch_size, ..Default::default() };
		let mut sink = MemorySink::default();
		let progress = Arc::new(CountingProgress::default());
		let (records, summary) = run_scan(
			range, fake, &config, &mut sink, progress.clone(), stop,
		).await.unwrap();
		(records, summary, sink, progress)
	}

	#[tokio::test]
	async fn test_batch_slots_are_positional() {
		let fake: Arc<dyn PtrLookup> = Arc::new(FakeLookup::with_names(&[
			("10.0.0.1", "one"),
			("10.0.0.3", "three"),
			("10.0.0.6", "six"),
		]));
		let progress: Arc<dyn ProgressReporter> = Arc::new(CountingProgress::default());
		let slots = resolve_batch(&fake, Ipv4Addr::new(10, 0, 0, 0), 8, &progress).await;

		assert_eq!(slots.len(), 8);
		for (i, slot) in slots.iter().enumerate() {
			let expected = Ipv4Addr::new(10, 0, 0, i as u8);
			if let Some(record) = slot {
				assert_eq!(record.ip, expected);
			}
		}
		assert_eq!(slots[1].as_ref().map(|r| r.name.as_str()), Some("one"));
		assert_eq!(slots[3].as_ref().map(|r| r.name.as_str()), Some("three"));
		assert_eq!(slots[6].as_ref().map(|r| r.name.as_str()), Some("six"));
		assert_eq!(slots.iter().filter(|s| s.is_none()).count(), 5);
	}

	#[tokio::test]
	async fn test_visits_every_address_once() {
		let range = AddressRange::parse("10.0.0.0", "10.0.0.99").unwrap();
		let fake = Arc::new(FakeLookup::with_names(&[
			("10.0.0.0", "first"),
			("10.0.0.50", "middle"),
			("10.0.0.99", "last"),
		]));
		let stop = AtomicBool::new(false);
		let (records, summary, sink, progress) = scan(&range, fake.clone(), 32, &stop).await;

		let mut calls = fake.calls.lock().unwrap().clone();
		calls.sort();
		calls.dedup();
		assert_eq!(calls.len(), 100);
		assert_eq!(fake.calls.lock().unwrap().len(), 100);

		assert_eq!(summary.visited, 100);
		assert_eq!(summary.resolved, 3);
		assert_eq!(summary.failed, 97);
		assert_eq!(summary.batches, range.batch_count(32));
		assert_eq!(progress.count(), 100);

		let names: Vec<&str> = records.iter().map(|r| r.name.as_str()).collect();
		assert_eq!(names, vec!["first", "middle", "last"]);
		assert_eq!(sink.records, records);
		assert_eq!(sink.batches, 4);
		assert!(sink.finished);
		assert!(!sink.aborted);
	}

	#[tokio::test]
	async fn test_concurrency_bounded_by_batch_size() {
		let range = AddressRange::parse("10.0.0.0", "10.0.0.63").unwrap();
		let fake = Arc::new(FakeLookup::default());
		let stop = AtomicBool::new(false);
		let (_, summary, _, _) = scan(&range, fake.clone(), 8, &stop).await;

		assert_eq!(summary.batches, 8);
		let max = fake.max_in_flight.load(Ordering::SeqCst);
		assert!(max <= 8, "max in flight {} exceeds batch size", max);
	}

	#[tokio::test]
	async fn test_records_ascending_despite_settle_order() {
		let pairs: Vec<(String, String)> = (0..16)
			.map(|i| (format!("10.0.0.{}", i), format!("host{}", i)))
			.collect();
		let refs: Vec<(&str, &str)> = pairs.iter()
			.map(|(a, b)| (a.as_str(), b.as_str()))
			.collect();
		let range = AddressRange::parse("10.0.0.0", "10.0.0.15").unwrap();
		let stop = AtomicBool::new(false);
		let (records, _, _, _) = scan(&range, Arc::new(FakeLookup::with_names(&refs)), 16, &stop).await;

		let ips: Vec<Ipv4Addr> = records.iter().map(|r| r.ip).collect();
		let mut sorted = ips.clone();
		sorted.sort();
		assert_eq!(ips, sorted);
		assert_eq!(ips.len(), 16);
	}

	#[tokio::test]
	async fn test_stop_checked_at_batch_boundary() {
		let stop = Arc::new(AtomicBool::new(false));
		let fake = Arc::new(FakeLookup {
			stop_after: Some((1, stop.clone())),
			..Default::default()
		});
		let range = AddressRange::parse("10.0.0.0", "10.0.0.255").unwrap();
		let (_, summary, sink, _) = scan(&range, fake.clone(), 16, &stop).await;

		// The first batch runs to completion, nothing after it starts
		assert!(summary.cancelled);
		assert_eq!(summary.batches, 1);
		assert_eq!(summary.visited, 16);
		assert_eq!(fake.calls.lock().unwrap().len(), 16);
		assert!(sink.aborted);
		assert!(!sink.finished);
	}

	#[tokio::test]
	async fn test_cancelled_scan_keeps_previous_stream() {
		use crate::records::{load_records, JsonRecordWriter};

		let dir = tempfile::tempdir().unwrap();
		let path = dir.path().join("dns-records.json");
		let previous = r#"[{"ip":"10.0.0.9","name":"old.example.net"},null]"#;
		std::fs::write(&path, previous).unwrap();

		let stop = Arc::new(AtomicBool::new(false));
		let fake = Arc::new(FakeLookup {
			names: [(Ipv4Addr::new(10, 0, 0, 3), "three".to_string())].into_iter().collect(),
			stop_after: Some((1, stop.clone())),
			..Default::default()
		});
		let range = AddressRange::parse("10.0.0.0", "10.0.0.255").unwrap();
		let config = ScanConfig { batch_size: 16, ..Default::default() };
		let mut sink = JsonRecordWriter::create(&path).unwrap();
		let (_, summary) = run_scan(
			&range, fake, &config, &mut sink, Arc::new(CountingProgress::default()), &stop,
		).await.unwrap();

		assert!(summary.cancelled);
		assert_eq!(std::fs::read_to_string(&path).unwrap(), previous);
		let partial = load_records(sink.partial_path()).unwrap();
		assert_eq!(partial.len(), 1);
		assert_eq!(partial[0].as_ref().map(|r| r.name.as_str()), Some("three"));
	}

	#[tokio::test]
	async fn test_udp_lookup_times_out_without_resolver() {
		// Bind a socket that never answers and point the lookup at it
		let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
		let config = ScanConfig {
			batch_size: 1,
			timeout: Duration::from_millis(50),
			attempts: 2,
		};
		let lookup = UdpPtrLookup::new(vec![ResolverConfig {
			label: "silent".to_string(),
			addr: silent.local_addr().unwrap(),
		}], config).unwrap();
		let result = lookup.lookup(Ipv4Addr::new(10, 0, 0, 1)).await;
		assert_eq!(result, Err(ResolutionFailure::Timeout));
	}

	#[tokio::test]
	async fn test_second_interrupt_requests_exit() {
		let stop = AtomicBool::new(false);
		let seen = AtomicUsize::new(0);
		let exit = watch_interrupts(&stop, || {
			seen.fetch_add(1, Ordering::SeqCst);
			async { Ok(()) }
		}).await;
		assert!(exit);
		assert!(stop.load(Ordering::SeqCst));
		assert_eq!(seen.load(Ordering::SeqCst), 2);
	}

	#[tokio::test]
	async fn test_interrupt_source_failure() {
		let stop = AtomicBool::new(false);
		let exit = watch_interrupts(&stop, || async {
			Err(std::io::Error::new(std::io::ErrorKind::Other, "no signal handler"))
		}).await;
		assert!(!exit);
		assert!(!stop.load(Ordering::SeqCst));

		// Flag set on the first interrupt, no exit when the second wait fails
		let calls = AtomicUsize::new(0);
		let exit = watch_interrupts(&stop, || {
			let n = calls.fetch_add(1, Ordering::SeqCst);
			async move {
				if n == 0 {
					Ok(())
				} else {
					Err(std::io::Error::new(std::io::ErrorKind::Other, "closed"))
				}
			}
		}).await;
		assert!(!exit);
		assert!(stop.load(Ordering::SeqCst));
	}

	#[test]
	fn test_udp_lookup_requires_resolvers() {
		assert!(UdpPtrLookup::new(Vec::new(), ScanConfig::default()).is_err());
	}

	#[test]
	fn test_retries_rotate_resolvers() {
		let resolvers = crate::resolver::default_resolvers();
		let lookup = UdpPtrLookup::new(resolvers.clone(), ScanConfig::default()).unwrap();
		let addr = Ipv4Addr::new(10, 0, 0, 4);
		assert_ne!(lookup.resolver_for(addr, 0), lookup.resolver_for(addr, 1));
		assert_eq!(lookup.resolver_for(addr, 0), lookup.resolver_for(addr, 4));
	}
}
