//! Per-connection plumbing between a socket and the gateway.
//!
//! Each accepted connection gets its own task running this handler plus
//! a writer task. The reader decodes client events and forwards them to
//! the gateway; the writer drains the connection's event channel back
//! onto the socket. State never lives here — a handler that dies just
//! tells the gateway to disconnect its connection.

use scrawl_protocol::{ClientEvent, Codec, JsonCodec};
use scrawl_transport::{Connection, WebSocketConnection};
use tracing::{debug, warn};

use crate::gateway::GatewayHandle;
use crate::ScrawlError;

pub(crate) async fn handle_connection(
    conn: WebSocketConnection,
    gateway: GatewayHandle,
) -> Result<(), ScrawlError> {
    let conn_id = conn.id();
    debug!(conn = %conn_id, "handling new connection");

    let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
    gateway.register(conn_id, tx);

    // Writer: event channel → socket. Runs until the gateway drops the
    // sender (on disconnect) or the socket breaks.
    let writer_conn = conn.clone();
    let writer = tokio::spawn(async move {
        while let Some(event) = rx.recv().await {
            let bytes = match JsonCodec.encode(&event) {
                Ok(bytes) => bytes,
                Err(e) => {
                    warn!(conn = %conn_id, error = %e, "failed to encode event");
                    continue;
                }
            };
            if let Err(e) = writer_conn.send(&bytes).await {
                debug!(conn = %conn_id, error = %e, "send failed, stopping writer");
                break;
            }
        }
    });

    // Reader: socket → gateway.
    loop {
        match conn.recv().await {
            Ok(Some(data)) => match JsonCodec.decode::<ClientEvent>(&data) {
                Ok(event) => gateway.inbound(conn_id, event),
                Err(e) => {
                    debug!(conn = %conn_id, error = %e, "undecodable event");
                    gateway.reject(conn_id, "invalid event".to_string());
                }
            },
            Ok(None) => {
                debug!(conn = %conn_id, "connection closed cleanly");
                break;
            }
            Err(e) => {
                debug!(conn = %conn_id, error = %e, "recv error");
                break;
            }
        }
    }

    gateway.disconnect(conn_id);
    writer.abort();
    Ok(())
}
