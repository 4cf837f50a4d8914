//! Request, response and outcome types for the agenda pipeline.
//!
//! A validated chat command becomes a [`Request`]; carrying it out against
//! a calendar yields a [`Response`]; both end up in the [`Outcome`] that is
//! returned for every chat message, together with the Spanish reply text.
//!
//! ```rust
//! use agenda_core::Action;
//! use agenda_protocol::{Outcome, decode_outcome, encode_outcome};
//!
//! let outcome = Outcome::info(Action::Help, "ayuda");
//! let json = encode_outcome(&outcome).unwrap();
//! assert_eq!(decode_outcome(&json).unwrap(), outcome);
//! ```

mod codec;
mod error;
mod types;

pub use codec::{decode_outcome, encode_outcome, encode_outcome_pretty};
pub use error::{ProtocolError, ProtocolResult};
pub use types::{DeletedEvent, ErrorCode, ErrorResponse, Outcome, Request, Response};

/// Protocol version constant.
pub const PROTOCOL_VERSION: &str = "1";

/// Maximum encoded outcome size (1 MB).
pub const MAX_MESSAGE_SIZE: usize = 1024 * 1024;
