//! Socket protocol definitions
//!
//! All frames are JSON objects of the shape `{op, seq?, t?, d?}`.

mod close_codes;
mod messages;
mod opcodes;
mod payloads;

pub use close_codes::CloseCode;
pub use messages::SocketMessage;
pub use opcodes::OpCode;
pub use payloads::{HelloPayload, InitializePayload, PresenceEnvelope};

/// Event name for the initial per-user snapshot after Initialize
pub const EVENT_INIT_STATE: &str = "INIT_STATE";
/// Event name for store mutations
pub const EVENT_PRESENCE_UPDATE: &str = "PRESENCE_UPDATE";
