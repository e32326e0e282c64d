//! The SSE shaper: turns a per-request stream of JSON events into `data:`
//! framed bytes. Single-producer: each SSE route owns one handler-produced
//! stream rather than subscribing to a shared broadcast channel, since an
//! SSE handler is a per-request generator.

use bytes::Bytes;
use futures_core::Stream;
use futures::StreamExt;
use std::pin::Pin;

use crate::error::DispatchError;

/// The type-erased stream an SSE handler hands back: a sequence of JSON
/// events, or a `DispatchError` if the producer fails mid-stream.
pub type SseEventStream = Pin<Box<dyn Stream<Item = Result<serde_json::Value, DispatchError>> + Send>>;

/// The three response headers every SSE response carries.
pub const HEADERS: [(&str, &str); 3] = [
    ("content-type", "text/event-stream"),
    ("cache-control", "no-cache"),
    ("connection", "keep-alive"),
];

/// Frame one event as `data: <payload>\n\n`: the payload is the value
/// verbatim if it's already a JSON string, otherwise its JSON encoding.
pub fn frame_event(value: &serde_json::Value) -> Bytes {
    let payload = match value {
        serde_json::Value::String(s) => s.clone(),
        other => serde_json::to_string(other).unwrap_or_default(),
    };
    Bytes::from(format!("data: {payload}\n\n"))
}

/// Frame a producer failure as `event: error\ndata: {"message":...}\n\n`.
pub fn frame_error(err: &DispatchError) -> Bytes {
    let body = serde_json::json!({ "message": err.message });
    Bytes::from(format!("event: error\ndata: {}\n\n", body))
}

/// Turn an [`SseEventStream`] into the framed byte stream an adapter writes
/// straight to its response body. Stops (closing the stream) as soon as the
/// producer errors, after emitting exactly one `event: error` frame.
pub fn shape(events: SseEventStream) -> impl Stream<Item = Bytes> + Send + 'static {
    futures::stream::unfold((events, false), |(mut events, done)| async move {
        if done {
            return None;
        }
        match events.next().await {
            None => None,
            Some(Ok(value)) => {
                let frame = frame_event(&value);
                Some((frame, (events, false)))
            }
            Some(Err(e)) => {
                tracing::warn!(error = %e.message, "sse producer failed, closing stream");
                let frame = frame_error(&e);
                Some((frame, (events, true)))
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn boxed(
        items: Vec<Result<serde_json::Value, DispatchError>>,
    ) -> SseEventStream {
        Box::pin(futures::stream::iter(items))
    }

    #[tokio::test]
    async fn frames_events_in_order_and_closes() {
        let events = boxed(vec![
            Ok(serde_json::json!({ "n": 1 })),
            Ok(serde_json::json!({ "n": 2 })),
        ]);
        let frames: Vec<Bytes> = shape(events).collect().await;
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0], Bytes::from("data: {\"n\":1}\n\n"));
        assert_eq!(frames[1], Bytes::from("data: {\"n\":2}\n\n"));
    }

    #[tokio::test]
    async fn string_events_are_emitted_verbatim() {
        let events = boxed(vec![Ok(serde_json::json!("hello"))]);
        let frames: Vec<Bytes> = shape(events).collect().await;
        assert_eq!(frames[0], Bytes::from("data: hello\n\n"));
    }

    #[tokio::test]
    async fn error_frame_then_close() {
        let events = boxed(vec![
            Ok(serde_json::json!({ "n": 1 })),
            Err(DispatchError::internal("boom")),
            Ok(serde_json::json!({ "n": 3 })),
        ]);
        let frames: Vec<Bytes> = shape(events).collect().await;
        // The third event must never be reached once the producer has errored.
        assert_eq!(frames.len(), 2);
        assert!(String::from_utf8_lossy(&frames[1]).starts_with("event: error\n"));
    }
}
