//! Per-connection reader/writer tasks and the TCP accept/connect entry points.
//!
//! Each connection gets two tasks. The reader decodes frames into
//! [`NetEvent::Received`]; a frame that fails to decode is logged and
//! skipped without closing the connection. The writer drains the
//! connection's outbound queue in order. Both stop on the shared shutdown
//! signal.

use std::net::SocketAddr;

use tokio::io::{AsyncRead, AsyncWrite, AsyncWriteExt};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{mpsc, watch};

use crate::framing::{FrameConfig, FrameError, read_message, write_message};
use crate::messages::Message;
use crate::routing::{ConnectionHandle, ConnectionId, IdGenerator, NetEvent};

/// Tunables shared by every connection.
#[derive(Debug, Clone)]
pub struct ConnectionConfig {
    pub frame: FrameConfig,
    /// Messages that may wait in one connection's outbound queue.
    pub outbound_capacity: usize,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            frame: FrameConfig::default(),
            outbound_capacity: 256,
        }
    }
}

/// Spawns the reader and writer tasks for one established stream, announces
/// it as [`NetEvent::Connected`] and returns the tick-side handle.
///
/// The announcement is queued before the reader starts, so the tick loop
/// never sees a message from a connection it has not been told about.
pub async fn spawn_connection<R, W>(
    id: ConnectionId,
    reader: R,
    writer: W,
    events: mpsc::Sender<NetEvent>,
    shutdown: watch::Receiver<bool>,
    config: &ConnectionConfig,
) -> ConnectionHandle
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin + Send + 'static,
{
    let (outbound_tx, outbound_rx) = mpsc::channel(config.outbound_capacity.max(1));

    tokio::spawn(write_loop(
        id,
        writer,
        outbound_rx,
        shutdown.clone(),
        config.frame.clone(),
    ));
    let handle = ConnectionHandle::new(id, outbound_tx);
    if events.send(NetEvent::Connected(handle.clone())).await.is_ok() {
        tokio::spawn(read_loop(id, reader, events, shutdown, config.frame.clone()));
    }
    handle
}

async fn read_loop<R: AsyncRead + Unpin>(
    id: ConnectionId,
    mut reader: R,
    events: mpsc::Sender<NetEvent>,
    mut shutdown: watch::Receiver<bool>,
    config: FrameConfig,
) {
    loop {
        tokio::select! {
            result = read_message(&mut reader, &config) => {
                match result {
                    Ok(message) => {
                        tracing::trace!(connection = %id, kind = ?message.kind(), "received");
                        let event = NetEvent::Received { connection: id, message };
                        if events.send(event).await.is_err() {
                            return;
                        }
                    }
                    Err(FrameError::Message(e)) => {
                        tracing::warn!(connection = %id, error = %e, "dropping undecodable message");
                    }
                    Err(FrameError::ConnectionClosed) => break,
                    Err(e) => {
                        tracing::warn!(connection = %id, error = %e, "read failed");
                        break;
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    let _ = events.send(NetEvent::Disconnected(id)).await;
}

async fn write_loop<W: AsyncWrite + Unpin>(
    id: ConnectionId,
    mut writer: W,
    mut outbound: mpsc::Receiver<Message>,
    mut shutdown: watch::Receiver<bool>,
    config: FrameConfig,
) {
    loop {
        tokio::select! {
            next = outbound.recv() => {
                let Some(message) = next else { break };
                if let Err(e) = write_message(&mut writer, &message, &config).await {
                    tracing::warn!(connection = %id, error = %e, "write failed");
                    break;
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
        }
    }
    let _ = writer.shutdown().await;
}

// ---------------------------------------------------------------------------
// TCP
// ---------------------------------------------------------------------------

/// Runs the accept loop until shutdown, announcing each accepted stream as
/// [`NetEvent::Connected`].
pub async fn serve(
    listener: TcpListener,
    events: mpsc::Sender<NetEvent>,
    mut shutdown: watch::Receiver<bool>,
    config: ConnectionConfig,
) -> std::io::Result<()> {
    let ids = IdGenerator::new();
    loop {
        tokio::select! {
            result = listener.accept() => {
                let (stream, peer_addr) = result?;
                stream.set_nodelay(true)?;
                let id = ids.next_id();
                let (reader, writer) = stream.into_split();
                tracing::info!(connection = %id, %peer_addr, "accepted");
                spawn_connection(id, reader, writer, events.clone(), shutdown.clone(), &config).await;
                if events.is_closed() {
                    break;
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    tracing::info!("listener shutting down");
                    break;
                }
            }
        }
    }
    Ok(())
}

/// Connects to a server and spawns the connection tasks.
pub async fn connect(
    addr: SocketAddr,
    events: mpsc::Sender<NetEvent>,
    shutdown: watch::Receiver<bool>,
    config: &ConnectionConfig,
) -> std::io::Result<ConnectionHandle> {
    let stream = TcpStream::connect(addr).await?;
    stream.set_nodelay(true)?;
    let (reader, writer) = stream.into_split();
    tracing::info!(%addr, "connected");
    Ok(spawn_connection(ConnectionId(0), reader, writer, events, shutdown, config).await)
}
