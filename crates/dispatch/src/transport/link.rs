//! Client side of a pinned transport.
//!
//! A link connects lazily on first use and reuses the connection until the
//! peer closes it. Requests are correlated with replies by id; a reader task
//! completes the matching waiter. When the connection drops, every waiter
//! fails with a transport error and the next `forward` reconnects. Nothing is
//! retried.

use std::{
    collections::HashMap,
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use {
    pinion_common::Message,
    pinion_protocol::{Frame, RequestFrame, ResponseFrame, decode_frame},
    tokio::{
        io::{AsyncWriteExt, BufReader},
        sync::{Mutex, oneshot},
        task::JoinHandle,
    },
    tracing::{debug, info, warn},
};

use crate::{
    action::ActResult,
    error::ActError,
    transport::{
        endpoint::{BoxedReader, BoxedWriter, Endpoint},
        framing::{LineRead, read_frame_line},
    },
};

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<ResponseFrame>>>>;

pub struct RemoteLink {
    endpoint: Endpoint,
    timeout: Duration,
    conn: Mutex<Option<Arc<Connection>>>,
}

struct Connection {
    writer: Mutex<BoxedWriter>,
    pending: PendingMap,
    closed: Arc<AtomicBool>,
    reader_handle: JoinHandle<()>,
}

impl RemoteLink {
    pub fn new(endpoint: Endpoint, timeout: Duration) -> Self {
        Self {
            endpoint,
            timeout,
            conn: Mutex::new(None),
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    pub async fn is_connected(&self) -> bool {
        self.conn
            .lock()
            .await
            .as_ref()
            .is_some_and(|c| !c.closed.load(Ordering::SeqCst))
    }

    /// Requests sent on the current connection that are still waiting for a reply.
    pub async fn pending_count(&self) -> usize {
        let conn = self.conn.lock().await.clone();
        match conn {
            Some(c) => c.pending.lock().await.len(),
            None => 0,
        }
    }

    /// Send `msg` to the remote process and wait for its reply.
    pub async fn forward(&self, msg: Message) -> ActResult {
        let conn = self.connection().await?;
        let id = uuid::Uuid::new_v4().to_string();
        let line = Frame::from(RequestFrame {
            id: id.clone(),
            msg,
        })
        .to_line()
        .map_err(|e| ActError::transport(e.to_string()))?;

        let (tx, rx) = oneshot::channel();
        conn.pending.lock().await.insert(id.clone(), tx);
        if conn.closed.load(Ordering::SeqCst) {
            conn.pending.lock().await.remove(&id);
            return Err(ActError::transport(format!(
                "connection to {} closed",
                self.endpoint
            )));
        }

        if let Err(e) = conn.write_line(&line).await {
            conn.pending.lock().await.remove(&id);
            conn.closed.store(true, Ordering::SeqCst);
            return Err(ActError::transport(format!(
                "failed to write to {}: {e}",
                self.endpoint
            )));
        }
        debug!(id = %id, endpoint = %self.endpoint, "forwarded message");

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(frame)) => frame.into_result().map_err(ActError::from_shape),
            Ok(Err(_)) => Err(ActError::transport(format!(
                "connection to {} closed before reply",
                self.endpoint
            ))),
            Err(_) => {
                conn.pending.lock().await.remove(&id);
                warn!(id = %id, endpoint = %self.endpoint, "remote reply timed out");
                Err(ActError::transport(format!(
                    "no reply from {} within {}ms",
                    self.endpoint,
                    self.timeout.as_millis()
                )))
            },
        }
    }

    async fn connection(&self) -> Result<Arc<Connection>, ActError> {
        let mut guard = self.conn.lock().await;
        if let Some(conn) = guard.as_ref()
            && !conn.closed.load(Ordering::SeqCst)
        {
            return Ok(Arc::clone(conn));
        }

        let stream = match tokio::time::timeout(self.timeout, self.endpoint.connect()).await {
            Ok(Ok(stream)) => stream,
            Ok(Err(e)) => {
                return Err(ActError::transport(format!(
                    "cannot connect to {}: {e}",
                    self.endpoint
                )));
            },
            Err(_) => {
                return Err(ActError::transport(format!(
                    "connecting to {} timed out",
                    self.endpoint
                )));
            },
        };
        info!(endpoint = %self.endpoint, "remote link connected");

        let conn = Arc::new(Connection::start(
            stream.reader,
            stream.writer,
            self.endpoint.to_string(),
        ));
        *guard = Some(Arc::clone(&conn));
        Ok(conn)
    }
}

impl std::fmt::Debug for RemoteLink {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteLink")
            .field("endpoint", &self.endpoint)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

impl Connection {
    fn start(reader: BoxedReader, writer: BoxedWriter, endpoint: String) -> Self {
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let closed = Arc::new(AtomicBool::new(false));
        let reader_handle = tokio::spawn(read_loop(
            reader,
            Arc::clone(&pending),
            Arc::clone(&closed),
            endpoint,
        ));
        Self {
            writer: Mutex::new(writer),
            pending,
            closed,
            reader_handle,
        }
    }

    async fn write_line(&self, line: &str) -> std::io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(line.as_bytes()).await?;
        writer.flush().await
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.reader_handle.abort();
    }
}

async fn read_loop(reader: BoxedReader, pending: PendingMap, closed: Arc<AtomicBool>, endpoint: String) {
    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        match read_frame_line(&mut reader, &mut buf).await {
            Ok(LineRead::Eof) => {
                debug!(endpoint = %endpoint, "remote closed connection");
                break;
            },
            Ok(LineRead::TooLong) => {
                warn!(endpoint = %endpoint, "dropped oversized reply frame");
            },
            Ok(LineRead::Line) => {
                let line = String::from_utf8_lossy(&buf);
                if line.trim().is_empty() {
                    continue;
                }
                match decode_frame(&line) {
                    Ok(Frame::Response(res)) => {
                        let mut map = pending.lock().await;
                        if let Some(tx) = map.remove(&res.id) {
                            let _ = tx.send(res);
                        } else {
                            warn!(id = %res.id, "received reply for unknown request id");
                        }
                    },
                    Ok(Frame::Request(req)) => {
                        warn!(id = %req.id, endpoint = %endpoint, "ignoring request frame on client link");
                    },
                    Err(e) => {
                        warn!(error = %e, endpoint = %endpoint, "malformed frame from remote");
                    },
                }
            },
            Err(e) => {
                warn!(error = %e, endpoint = %endpoint, "error reading from remote");
                break;
            },
        }
    }
    closed.store(true, Ordering::SeqCst);
    // Dropping the senders wakes every waiter with a closed-channel error.
    pending.lock().await.clear();
}
