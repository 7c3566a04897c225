use thiserror::Error;

/// Why a single reverse lookup produced no hostname.
///
/// Always absorbed by the scanner: the address is recorded as absent
/// and the batch carries on.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ResolutionFailure {
	#[error("lookup timed out")]
	Timeout,
	#[error("no PTR record")]
	NoRecord,
	#[error("server answered {0}")]
	ServerError(String),
	#[error("transport error: {0}")]
	Transport(String),
	#[error("malformed response: {0}")]
	Malformed(String),
}

/// Structural failures that abort a run.
#[derive(Debug, Error)]
pub enum TopologyError {
	#[error("malformed record stream '{path}': {reason}")]
	MalformedInput { path: String, reason: String },
	#[error("invalid IPv4 address '{0}'")]
	InvalidAddress(String),
	#[error("invalid range: start {start} is after end {end}")]
	InvalidRange { start: String, end: String },
	#[error("invalid netmask '{0}'")]
	InvalidNetmask(String),
}
