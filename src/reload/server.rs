//! WebSocket acceptor for live reload.
//!
//! Accepted connections are handed to the [`ReloadHub`], which performs the
//! handshake and owns the client from then on.

use std::net::{IpAddr, SocketAddr, TcpListener};
use std::time::Duration;

use super::hub::ReloadHub;
use crate::core::ShutdownToken;
use crate::watch::WatchError;
use crate::{debug, log};

/// Maximum port retry attempts
pub const MAX_PORT_RETRIES: u16 = 10;

/// Bind the live-reload server and start accepting clients.
///
/// Returns the bound port, which is `base_port` or one of the next
/// [`MAX_PORT_RETRIES`] ports. The acceptor and reader threads exit once
/// `shutdown` fires.
pub fn start(
    interface: IpAddr,
    base_port: u16,
    hub: ReloadHub,
    shutdown: ShutdownToken,
) -> Result<u16, WatchError> {
    let (listener, port) = try_bind_port(interface, base_port)?;
    listener
        .set_nonblocking(true)
        .map_err(|e| WatchError::bind("websocket", base_port, e))?;

    if port != base_port {
        log!("reload"; "port {} in use, using {} instead", base_port, port);
    }

    {
        let hub = hub.clone();
        let shutdown = shutdown.clone();
        std::thread::spawn(move || hub.reader_loop(&shutdown));
    }

    std::thread::spawn(move || {
        while !shutdown.is_triggered() {
            match listener.accept() {
                Ok((stream, addr)) => {
                    debug!("reload"; "client connected: {}", addr);
                    // Blocking for the handshake
                    let _ = stream.set_nonblocking(false);
                    hub.add_client(stream);
                }
                Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock => {
                    std::thread::sleep(Duration::from_millis(100));
                }
                Err(e) => {
                    log!("reload"; "accept error: {}", e);
                    std::thread::sleep(Duration::from_millis(100));
                }
            }
        }
        debug!("reload"; "acceptor stopped");
    });

    Ok(port)
}

/// Try binding to port, retry with incremented port if in use
fn try_bind_port(interface: IpAddr, base_port: u16) -> Result<(TcpListener, u16), WatchError> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match TcpListener::bind(SocketAddr::new(interface, port)) {
            Ok(listener) => {
                let actual_port = listener
                    .local_addr()
                    .map_err(|e| WatchError::bind("websocket", base_port, e))?
                    .port();
                return Ok((listener, actual_port));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(WatchError::bind(
        "websocket",
        base_port,
        last_error.unwrap_or_else(|| std::io::Error::other("no port attempted")),
    ))
}
