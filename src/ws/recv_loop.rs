use tokio::{
    io::{AsyncRead, AsyncReadExt},
    sync::mpsc::Sender,
};

use super::{Event, MessageReader};
use crate::{MAX_FRAME_PAYLOAD, role::RolePolicy};

/// Drive `reader` from `stream` until EOF, a read error, a protocol
/// violation, or the receiving side of `event_tx` going away.
///
/// A violation is reported as [`Event::Error`] and ends the loop without
/// touching the write side; closing the connection is the receiver's job.
/// [`Event::Closed`] is sent last on EOF or read error.
pub async fn recv_loop<S, R>(mut stream: S, mut reader: MessageReader<R>, event_tx: Sender<Event>)
where
    S: AsyncRead + Unpin,
    R: RolePolicy,
{
    let mut buf = vec![0; MAX_FRAME_PAYLOAD];

    loop {
        let n = match stream.read(&mut buf).await {
            Ok(0) => {
                tracing::info!("TCP FIN");
                break;
            }
            Ok(n) => n,
            Err(e) => {
                tracing::warn!(error = ?e, "reader error");
                break;
            }
        };
        tracing::trace!(bytes = n, "read socket");

        reader.push_bytes(&buf[..n]);
        loop {
            match reader.next_event() {
                Ok(Some(event)) => {
                    if event_tx.send(event).await.is_err() {
                        tracing::debug!("event receiver dropped, stopping");
                        return;
                    }
                }
                // break to read more bytes
                Ok(None) => break,
                Err(reason) => {
                    tracing::warn!(reason = ?reason, "protocol violation detected");
                    let _ = event_tx.send(Event::Error(reason)).await;
                    return;
                }
            }
        }
    }

    let pending = reader.pending().count();
    if pending > 0 {
        tracing::warn!(frames = pending, "stream ended mid-message");
    }
    let _ = event_tx.send(Event::Closed).await;
}
