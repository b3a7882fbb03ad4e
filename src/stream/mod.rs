//! Decoding of relayed run streams into typed events.
//!
//! The relay forwards upstream server-sent events untouched. [`FrameDecoder`]
//! reassembles SSE frames across arbitrary byte chunk boundaries and
//! [`EventDecoder`] maps each frame onto a [`StreamEvent`](crate::types::StreamEvent).

pub mod events;
pub mod sse;

use bytes::Bytes;
use futures::stream::BoxStream;

use crate::error::PortalError;

pub use events::{event_stream, EventDecoder};
pub use sse::{FrameDecoder, SseFrame};

/// Raw bytes of a run stream.
pub type ByteStream = BoxStream<'static, Result<Bytes, PortalError>>;
