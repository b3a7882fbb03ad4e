//! Chat engine: transcript, relay client and the stream state machine.

pub mod relay;
pub mod session;
pub mod transcript;

pub use relay::{DirectRelay, HttpRelayClient, RelayClient};
pub use session::{
    ChatPhase, ChatSession, ChatUpdate, RunOutcome, UpdateSink, ASSISTANT_ERROR_MESSAGE,
};
pub use transcript::Transcript;
