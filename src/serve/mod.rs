//! Development HTTP server.
//!
//! Serves the source directory, falling back to the output root so compiled
//! bundles resolve too. HTML responses get the live-reload client injected.

mod path;
mod response;

use std::net::{IpAddr, SocketAddr};
use std::path::PathBuf;
use std::sync::Arc;
use std::thread::JoinHandle;

use anyhow::Result;
use tiny_http::{Method, Request, Server};

use crate::config::AssetflowConfig;
use crate::embed::serve::LIVERELOAD_PATH;
use crate::watch::WatchError;
use crate::{debug, log};

/// Maximum number of port binding attempts.
pub const MAX_PORT_RETRIES: u16 = 10;

/// A running HTTP server; stop it with [`DevServer::stop`].
pub struct DevServer {
    server: Arc<Server>,
    addr: SocketAddr,
    thread: Option<JoinHandle<()>>,
}

impl DevServer {
    /// Bind and start serving. `ws_port` is baked into the client script.
    pub fn start(config: &AssetflowConfig, ws_port: u16) -> Result<Self, WatchError> {
        let (server, addr) = bind_with_retry(config.serve.interface, config.serve.port)?;
        let server = Arc::new(server);
        let roots: Arc<[PathBuf]> = vec![config.serve_root(), config.output_dir()].into();

        let thread = {
            let server = Arc::clone(&server);
            std::thread::spawn(move || run_request_loop(&server, &roots, ws_port))
        };

        log!("serve"; "http://{}", addr);
        Ok(Self {
            server,
            addr,
            thread: Some(thread),
        })
    }

    #[cfg(test)]
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Unblock the request loop and wait for it to return.
    pub fn stop(mut self) {
        self.server.unblock();
        if let Some(thread) = self.thread.take() {
            let _ = thread.join();
        }
        debug!("serve"; "stopped http://{}", self.addr);
    }
}

/// Bind to the specified interface and port, with automatic port retry.
fn bind_with_retry(interface: IpAddr, base_port: u16) -> Result<(Server, SocketAddr), WatchError> {
    let mut last_error = None;

    for offset in 0..MAX_PORT_RETRIES {
        let port = base_port.saturating_add(offset);
        match Server::http(SocketAddr::new(interface, port)) {
            Ok(server) => {
                if offset > 0 {
                    log!("serve"; "port {} in use, using {} instead", base_port, port);
                }
                let addr = server
                    .server_addr()
                    .to_ip()
                    .unwrap_or_else(|| SocketAddr::new(interface, port));
                return Ok((server, addr));
            }
            Err(e) => last_error = Some(e),
        }
    }

    Err(WatchError::bind(
        "http",
        base_port,
        last_error.unwrap_or_else(|| "no port attempted".into()),
    ))
}

fn run_request_loop(server: &Server, roots: &Arc<[PathBuf]>, ws_port: u16) {
    for request in server.incoming_requests() {
        let roots = Arc::clone(roots);
        rayon::spawn(move || {
            if let Err(e) = handle_request(request, &roots, ws_port) {
                log!("serve"; "request error: {e}");
            }
        });
    }
}

/// Handle a single HTTP request
fn handle_request(request: Request, roots: &[PathBuf], ws_port: u16) -> Result<()> {
    if !matches!(request.method(), Method::Get | Method::Head) {
        return response::respond_method_not_allowed(request);
    }

    let url = request.url().to_string();
    debug!("serve"; "{} {}", request.method(), url);

    if path::normalize_url(&url) == LIVERELOAD_PATH.trim_start_matches('/') {
        return response::respond_livereload_js(request, ws_port);
    }

    match path::resolve_in(&url, roots) {
        Some(file) => response::respond_file(request, &file),
        None => response::respond_not_found(request),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_config_at;
    use crate::embed::serve::script_tag;
    use std::fs;
    use std::io::{Read, Write};
    use std::net::TcpStream;
    use tempfile::TempDir;

    fn get(addr: SocketAddr, url: &str) -> String {
        let mut stream = TcpStream::connect(addr).unwrap();
        write!(
            stream,
            "GET {url} HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n"
        )
        .unwrap();
        let mut response = String::new();
        stream.read_to_string(&mut response).unwrap();
        response
    }

    fn start(dir: &TempDir) -> DevServer {
        let mut config = test_config_at(dir.path());
        config.serve.port = 0;
        DevServer::start(&config, 35799).unwrap()
    }

    #[test]
    fn test_serves_html_with_client() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("src")).unwrap();
        fs::write(dir.path().join("src/index.html"), "<body><p>hi</p></body>").unwrap();

        let server = start(&dir);
        let response = get(server.addr(), "/");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains(&format!("<p>hi</p>{}</body>", script_tag())));
        server.stop();
    }

    #[test]
    fn test_serves_client_script_with_port() {
        let dir = TempDir::new().unwrap();
        let server = start(&dir);
        let response = get(server.addr(), LIVERELOAD_PATH);
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("35799"));
        server.stop();
    }

    #[test]
    fn test_falls_back_to_output_and_404() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dist/css")).unwrap();
        fs::write(dir.path().join("dist/css/main.min.css"), "a{color:red}").unwrap();

        let server = start(&dir);
        let response = get(server.addr(), "/css/main.min.css");
        assert!(response.starts_with("HTTP/1.1 200"));
        assert!(response.contains("a{color:red}"));
        assert!(!response.contains("<script"));

        assert!(get(server.addr(), "/nope.css").starts_with("HTTP/1.1 404"));
        server.stop();
    }
}
