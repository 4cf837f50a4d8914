//! JSON encoding of outcomes.
//!
//! An [`Outcome`] is what a transport hands back to the chat platform. The
//! encoding is plain JSON; size and version are checked on both sides.

use crate::MAX_MESSAGE_SIZE;
use crate::error::{ProtocolError, ProtocolResult};
use crate::types::Outcome;

/// Encodes an outcome as compact JSON.
pub fn encode_outcome(outcome: &Outcome) -> ProtocolResult<String> {
    let json = serde_json::to_string(outcome)?;
    check_size(json.len())?;
    Ok(json)
}

/// Encodes an outcome as indented JSON, for terminals.
pub fn encode_outcome_pretty(outcome: &Outcome) -> ProtocolResult<String> {
    let json = serde_json::to_string_pretty(outcome)?;
    check_size(json.len())?;
    Ok(json)
}

/// Decodes an outcome, rejecting other protocol versions.
pub fn decode_outcome(data: &str) -> ProtocolResult<Outcome> {
    if data.trim().is_empty() {
        return Err(ProtocolError::EmptyMessage);
    }
    check_size(data.len())?;

    let outcome: Outcome = serde_json::from_str(data)?;
    if !outcome.is_compatible() {
        return Err(ProtocolError::UnsupportedVersion(outcome.protocol_version));
    }
    Ok(outcome)
}

fn check_size(size: usize) -> ProtocolResult<()> {
    if size > MAX_MESSAGE_SIZE {
        return Err(ProtocolError::MessageTooLarge {
            size,
            max: MAX_MESSAGE_SIZE,
        });
    }
    Ok(())
}
