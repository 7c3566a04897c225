use std::net::Ipv4Addr;

use anyhow::{anyhow, Result};
use hickory_proto::op::{Message, MessageType, Query, ResponseCode};
use hickory_proto::rr::{Name, RData, RecordType};

use crate::error::ResolutionFailure;
use crate::range::ptr_name;

/// Build a PTR query message for the given address.
///
/// Returns the serialized query bytes ready to send over UDP.
pub fn build_ptr_query(addr: Ipv4Addr, txid: u16) -> Result<Vec<u8>> {
	let owner = ptr_name(addr);
	let name = Name::from_ascii(&owner)
		.map_err(|e| anyhow!("invalid PTR owner name '{}': {}", owner, e))?;

	let mut message = Message::new();
	message.set_id(txid);
	message.set_recursion_desired(true);
	message.add_query(Query::query(name, RecordType::PTR));

	let bytes = message.to_vec()
		.map_err(|e| anyhow!("failed to serialize PTR query: {}", e))?;
	Ok(bytes)
}

/// Parse a PTR response, validating the transaction ID.
///
/// Returns the first PTR target without its trailing root dot.
pub fn parse_ptr_response(
	bytes: &[u8],
	expected_txid: u16,
) -> Result<String, ResolutionFailure> {
	let message = Message::from_vec(bytes)
		.map_err(|e| ResolutionFailure::Malformed(e.to_string()))?;

	if message.id() != expected_txid {
		return Err(ResolutionFailure::Malformed(format!(
			"txid mismatch: expected {}, got {}",
			expected_txid, message.id()
		)));
	}

	// Verify this is a response, not a query
	if message.message_type() != MessageType::Response {
		return Err(ResolutionFailure::Malformed(
			"received a query instead of a response".to_string(),
		));
	}

	match message.response_code() {
		ResponseCode::NoError => {}
		ResponseCode::NXDomain => return Err(ResolutionFailure::NoRecord),
		other => return Err(ResolutionFailure::ServerError(other.to_string())),
	}

	message.answers().iter()
		.find_map(|record| match record.data() {
			RData::PTR(ptr) => Some(ptr.0.to_utf8()),
			_ => None,
		})
		.map(|name| name.trim_end_matches('.').to_string())
		.ok_or(ResolutionFailure::NoRecord)
}
