//! Server side of a pinned transport.
//!
//! Each accepted connection gets a write loop fed by an unbounded channel, and
//! every request on it runs as its own task, so replies may leave in a
//! different order than requests arrived.

use std::io;

use {
    pinion_protocol::{
        ErrorShape, Frame, MAX_PAYLOAD_BYTES, RequestFrame, ResponseFrame, decode_frame,
        error_codes, recover_id,
    },
    pinion_routing::Pattern,
    tokio::{
        io::{AsyncWriteExt, BufReader},
        sync::mpsc,
        task::JoinHandle,
    },
    tokio_util::sync::CancellationToken,
    tracing::{debug, info, warn},
};

use crate::{
    dispatcher::Dispatcher,
    error::ActError,
    transport::{
        endpoint::{Acceptor, Endpoint, Stream},
        framing::{LineRead, read_frame_line},
    },
};

/// A running listener. Dropping the handle leaves it running; call
/// [`ListenerHandle::shutdown`] to stop accepting, close connections and
/// remove the listener's pin.
pub struct ListenerHandle {
    dispatcher: Dispatcher,
    endpoint: Endpoint,
    pin: Pattern,
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

impl ListenerHandle {
    /// The bound endpoint, with an ephemeral port resolved.
    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    pub fn pin(&self) -> &Pattern {
        &self.pin
    }

    pub async fn shutdown(self) {
        self.cancel.cancel();
        let _ = self.task.await;
        self.dispatcher.unpin_listener(&self.pin, &self.endpoint);
    }

    /// Wait until the accept loop ends.
    pub async fn wait(self) {
        let _ = self.task.await;
    }
}

pub(crate) async fn start(dispatcher: Dispatcher, pin: Pattern, endpoint: &Endpoint) -> io::Result<ListenerHandle> {
    let acceptor = endpoint.bind().await?;
    let bound = acceptor.local_endpoint()?;
    info!(endpoint = %bound, pin = %pin, "listening");

    let cancel = CancellationToken::new();
    let task = tokio::spawn(accept_loop(
        acceptor,
        dispatcher.clone(),
        pin.clone(),
        cancel.clone(),
    ));
    Ok(ListenerHandle {
        dispatcher,
        endpoint: bound,
        pin,
        cancel,
        task,
    })
}

async fn accept_loop(acceptor: Acceptor, dispatcher: Dispatcher, pin: Pattern, cancel: CancellationToken) {
    loop {
        tokio::select! {
            () = cancel.cancelled() => break,
            accepted = acceptor.accept() => match accepted {
                Ok((stream, peer)) => {
                    tokio::spawn(handle_connection(
                        stream,
                        peer,
                        dispatcher.clone(),
                        pin.clone(),
                        cancel.child_token(),
                    ));
                },
                Err(e) => warn!(error = %e, "accept failed"),
            },
        }
    }
    debug!(pin = %pin, "listener stopped");
}

async fn handle_connection(
    stream: Stream,
    peer: String,
    dispatcher: Dispatcher,
    pin: Pattern,
    cancel: CancellationToken,
) {
    let conn_id = uuid::Uuid::new_v4().to_string();
    info!(conn_id = %conn_id, peer = %peer, "new connection");

    let Stream { reader, mut writer } = stream;
    let (tx, mut rx) = mpsc::unbounded_channel::<String>();

    let write_conn_id = conn_id.clone();
    let write_handle = tokio::spawn(async move {
        while let Some(line) = rx.recv().await {
            if writer.write_all(line.as_bytes()).await.is_err() || writer.flush().await.is_err() {
                debug!(conn_id = %write_conn_id, "write loop closed");
                break;
            }
        }
    });

    let mut reader = BufReader::new(reader);
    let mut buf = Vec::new();
    loop {
        let read = tokio::select! {
            () = cancel.cancelled() => break,
            read = read_frame_line(&mut reader, &mut buf) => read,
        };
        match read {
            Ok(LineRead::Eof) => break,
            Ok(LineRead::Line) => {},
            Ok(LineRead::TooLong) => {
                // Uncorrelatable; closing fails the peer's pending calls.
                warn!(conn_id = %conn_id, limit = MAX_PAYLOAD_BYTES, "request frame too large, closing");
                break;
            },
            Err(e) => {
                debug!(conn_id = %conn_id, error = %e, "read error");
                break;
            },
        }
        let line = String::from_utf8_lossy(&buf);
        if line.trim().is_empty() {
            continue;
        }

        let req = match decode_frame(&line) {
            Ok(Frame::Request(req)) => req,
            Ok(Frame::Response(res)) => {
                let shape = ErrorShape::new(error_codes::INVALID_REQUEST, "expected a request frame");
                queue(&tx, ResponseFrame::err(res.id, shape));
                continue;
            },
            Err(e) => {
                warn!(conn_id = %conn_id, error = %e, "invalid frame");
                if let Some(id) = recover_id(&line) {
                    let shape = ErrorShape::new(error_codes::INVALID_REQUEST, e.to_string());
                    queue(&tx, ResponseFrame::err(id, shape));
                }
                continue;
            },
        };

        let tx = tx.clone();
        let dispatcher = dispatcher.clone();
        let pin = pin.clone();
        tokio::spawn(async move {
            queue(&tx, respond(&dispatcher, &pin, req).await);
        });
    }

    // In-flight requests hold sender clones; the write loop drains their
    // replies before it stops.
    drop(tx);
    let _ = write_handle.await;
    info!(conn_id = %conn_id, "connection closed");
}

async fn respond(dispatcher: &Dispatcher, pin: &Pattern, req: RequestFrame) -> ResponseFrame {
    let RequestFrame { id, msg } = req;
    if !pin.matches(&msg) {
        debug!(id = %id, pin = %pin, "request outside listener pin");
        return ResponseFrame::err(id, ActError::no_match(&msg).to_shape());
    }
    match dispatcher.send(msg).await {
        Ok(payload) => ResponseFrame::ok(id, payload),
        Err(e) => ResponseFrame::err(id, e.to_shape()),
    }
}

fn queue(tx: &mpsc::UnboundedSender<String>, reply: ResponseFrame) {
    let id = reply.id.clone();
    let line = match Frame::from(reply).to_line() {
        Ok(line) => line,
        Err(e) => {
            warn!(id = %id, error = %e, "reply could not be encoded");
            let shape = ErrorShape::new(error_codes::HANDLER_ERROR, e.to_string());
            match Frame::from(ResponseFrame::err(id, shape)).to_line() {
                Ok(line) => line,
                Err(_) => return,
            }
        },
    };
    let _ = tx.send(line);
}
