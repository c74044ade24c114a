//! Connected browser clients.

use std::net::TcpStream;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tungstenite::WebSocket;
use tungstenite::protocol::Message;

use super::message::ReloadMessage;
use crate::core::ShutdownToken;
use crate::debug;

/// Shared set of live-reload clients.
///
/// Cloning is cheap; every clone broadcasts to the same clients.
#[derive(Clone, Default)]
pub struct ReloadHub {
    clients: Arc<Mutex<Vec<WebSocket<TcpStream>>>>,
    /// Last error, replayed to clients that connect while it is showing
    pending_error: Arc<Mutex<Option<ReloadMessage>>>,
}

impl ReloadHub {
    pub fn new() -> Self {
        Self::default()
    }

    #[cfg(test)]
    pub fn client_count(&self) -> usize {
        self.clients.lock().len()
    }

    /// Complete the handshake on `stream` and register the client.
    pub fn add_client(&self, stream: TcpStream) {
        let mut ws = match tungstenite::accept(stream) {
            Ok(ws) => ws,
            Err(e) => {
                debug!("reload"; "handshake failed: {}", e);
                return;
            }
        };

        if let Err(e) = ws.send(text(&ReloadMessage::connected())) {
            debug!("reload"; "failed to greet client: {}", e);
            return;
        }
        if let Some(error) = self.pending_error.lock().as_ref()
            && let Err(e) = ws.send(text(error))
        {
            debug!("reload"; "failed to replay error: {}", e);
            return;
        }

        // Reads are polled by the reader thread
        let _ = ws.get_ref().set_nonblocking(true);

        let mut clients = self.clients.lock();
        clients.push(ws);
        debug!("reload"; "client connected (total: {})", clients.len());
    }

    /// Send `msg` to every client, dropping the ones that fail.
    pub fn broadcast(&self, msg: &ReloadMessage) {
        match msg {
            ReloadMessage::Error { .. } => *self.pending_error.lock() = Some(msg.clone()),
            ReloadMessage::ClearError => *self.pending_error.lock() = None,
            _ => {}
        }

        let frame = text(msg);
        let mut clients = self.clients.lock();
        if clients.is_empty() {
            debug!("reload"; "no clients connected");
            return;
        }

        clients.retain_mut(|ws| match ws.send(frame.clone()) {
            Ok(()) => true,
            Err(e) => {
                debug!("reload"; "client disconnected: {}", e);
                false
            }
        });
        debug!("reload"; "broadcast to {} clients", clients.len());
    }

    /// Poll client sockets so close frames and pings are handled.
    ///
    /// Runs until `shutdown` fires, then closes every connection.
    pub fn reader_loop(&self, shutdown: &ShutdownToken) {
        while !shutdown.is_triggered() {
            std::thread::sleep(Duration::from_millis(100));

            let mut clients = self.clients.lock();
            clients.retain_mut(|ws| match ws.read() {
                Ok(Message::Close(_)) => false,
                Ok(_) => true,
                Err(tungstenite::Error::Io(ref e))
                    if e.kind() == std::io::ErrorKind::WouldBlock =>
                {
                    true
                }
                Err(_) => false,
            });
        }

        for mut ws in self.clients.lock().drain(..) {
            let _ = ws.close(None);
            let _ = ws.flush();
        }
    }
}

fn text(msg: &ReloadMessage) -> Message {
    Message::Text(msg.to_json().into())
}
