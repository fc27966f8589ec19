//! Push-channel messages: shapes, parsing, and validation.

pub mod codec;
pub mod types;
pub mod validator;

pub use codec::{encode_outbound, parse_inbound};
pub use types::{InboundMessage, MenuOperation, MenuUpdate, OutboundMessage, RawMessage};
