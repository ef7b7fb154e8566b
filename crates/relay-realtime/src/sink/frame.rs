//! Server-sent event framing.

use bytes::Bytes;

use relay_core::events::Event;
use relay_core::result::AppResult;

/// Comment frame clients ignore; keeps idle proxies from closing the stream.
pub const KEEP_ALIVE: &[u8] = b":\n\n";

/// The keep-alive frame.
pub fn keep_alive() -> Bytes {
    Bytes::from_static(KEEP_ALIVE)
}

/// Encode an event as a single `data:` frame.
///
/// The result is shared by every sink the event is written to.
pub fn encode(event: &Event) -> AppResult<Bytes> {
    let json = event.to_json()?;
    Ok(Bytes::from(format!("data: {json}\n\n")))
}
