//! Bridge from progress streams to Server-Sent Events responses.

use std::convert::Infallible;
use std::time::Duration;

use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use tokio::sync::mpsc;
use tokio_stream::wrappers::UnboundedReceiverStream;
use tokio_stream::StreamExt;

use finishpix_events::ProgressEvent;

/// Comment keep-alive interval, so idle streams survive proxies.
const KEEP_ALIVE_INTERVAL: Duration = Duration::from_secs(30);

/// Wrap a hub subscription as an SSE response.
///
/// Each frame is one `data:` message holding the JSON-serialized
/// [`ProgressEvent`]; clients dispatch on its `type` field. The stream
/// ends when the tracker drops the sender (session swept or process
/// shutdown).
pub fn stream_response(
    rx: mpsc::UnboundedReceiver<ProgressEvent>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let stream = UnboundedReceiverStream::new(rx).filter_map(|frame| {
        match serde_json::to_string(&frame) {
            Ok(json) => Some(Ok(Event::default().data(json))),
            Err(error) => {
                tracing::warn!(%error, "dropping unserializable progress frame");
                None
            }
        }
    });

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(KEEP_ALIVE_INTERVAL)
            .text("keep-alive"),
    )
}
