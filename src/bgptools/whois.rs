// Whois client for bgp.tools (TCP port 43)
//
// Every query opens its own connection, writes the request, and reads until
// the server closes the connection or the deadline passes.

use std::io::{ErrorKind, Read, Write};
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::time::{Duration, Instant};

use crate::error::{AppError, AppResult};

pub const SINGLE_QUERY_TIMEOUT: Duration = Duration::from_secs(30);
pub const BULK_QUERY_TIMEOUT: Duration = Duration::from_secs(60);
const READ_CHUNK: usize = 4096;

pub struct WhoisClient {
    host: String,
    port: u16,
    single_timeout: Duration,
    bulk_timeout: Duration,
}

impl WhoisClient {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        WhoisClient {
            host: host.into(),
            port,
            single_timeout: SINGLE_QUERY_TIMEOUT,
            bulk_timeout: BULK_QUERY_TIMEOUT,
        }
    }

    pub fn with_timeouts(mut self, single: Duration, bulk: Duration) -> Self {
        self.single_timeout = single;
        self.bulk_timeout = bulk;
        self
    }

    /// Verbose single query. Returns "" on any error.
    pub fn single_query(&self, target: &str) -> String {
        tracing::debug!("Making whois query: {}", target);

        match self.exchange(&single_request(target), self.single_timeout) {
            Ok(result) => {
                tracing::debug!("Whois query completed, {} characters received", result.len());
                result
            }
            Err(e) => {
                tracing::error!("ERROR in whois query: {}", e);
                String::new()
            }
        }
    }

    /// One `begin ... end` block on a single connection. Returns "" on any error.
    pub fn bulk_query(&self, targets: &[String]) -> String {
        tracing::debug!("Making bulk whois query with {} items", targets.len());

        match self.exchange(&bulk_request(targets), self.bulk_timeout) {
            Ok(result) => {
                tracing::debug!(
                    "Bulk whois query completed, {} characters received",
                    result.len()
                );
                result
            }
            Err(e) => {
                tracing::error!("ERROR in bulk whois query: {}", e);
                String::new()
            }
        }
    }

    fn exchange(&self, request: &str, timeout: Duration) -> AppResult<String> {
        let deadline = Instant::now() + timeout;
        let mut stream = self.connect(timeout)?;

        stream.set_write_timeout(Some(timeout))?;
        stream.write_all(request.as_bytes())?;
        stream.flush()?;

        let mut response = Vec::new();
        let mut buffer = [0u8; READ_CHUNK];
        loop {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                return Err(AppError::Whois(format!(
                    "timed out after {}s waiting for {}:{}",
                    timeout.as_secs(),
                    self.host,
                    self.port
                )));
            }
            stream.set_read_timeout(Some(remaining))?;

            match stream.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => response.extend_from_slice(&buffer[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if matches!(e.kind(), ErrorKind::WouldBlock | ErrorKind::TimedOut) => {
                    return Err(AppError::Whois(format!(
                        "timed out after {}s waiting for {}:{}",
                        timeout.as_secs(),
                        self.host,
                        self.port
                    )));
                }
                Err(e) => return Err(e.into()),
            }
        }

        Ok(String::from_utf8_lossy(&response).into_owned())
    }

    fn connect(&self, timeout: Duration) -> AppResult<TcpStream> {
        let addrs: Vec<SocketAddr> = (self.host.as_str(), self.port)
            .to_socket_addrs()
            .map_err(|e| AppError::Network(format!("cannot resolve {}: {}", self.host, e)))?
            .collect();

        let mut last_error = None;
        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => {
                    tracing::trace!("Connect to {} failed: {}", addr, e);
                    last_error = Some(e);
                }
            }
        }

        Err(AppError::Network(match last_error {
            Some(e) => format!("cannot connect to {}:{}: {}", self.host, self.port, e),
            None => format!("no addresses found for {}", self.host),
        }))
    }
}

fn single_request(target: &str) -> String {
    format!(" -v {}\r\n", target)
}

fn bulk_request(targets: &[String]) -> String {
    let mut request = String::from("begin\nverbose\n");
    for target in targets {
        request.push_str(target);
        request.push('\n');
    }
    request.push_str("end\n");
    request
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::BufRead;
    use std::net::TcpListener;
    use std::thread;

    /// Serve one connection: capture the request, send `reply`, close.
    fn one_shot_server(reply: &'static str, lines: usize) -> (u16, thread::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let handle = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            let mut reader = std::io::BufReader::new(stream.try_clone().unwrap());
            let mut request = String::new();
            for _ in 0..lines {
                reader.read_line(&mut request).unwrap();
            }
            let mut stream = stream;
            stream.write_all(reply.as_bytes()).unwrap();
            request
        });
        (port, handle)
    }

    #[test]
    fn test_request_formats() {
        assert_eq!(single_request("as6939"), " -v as6939\r\n");
        assert_eq!(
            bulk_request(&["as1".to_string(), "as2".to_string()]),
            "begin\nverbose\nas1\nas2\nend\n"
        );
        assert_eq!(bulk_request(&[]), "begin\nverbose\nend\n");
    }

    #[test]
    fn test_single_query_roundtrip() {
        let (port, server) = one_shot_server("6939 | 6939 | x | ARIN | US | d | HE\n", 1);
        let client = WhoisClient::new("127.0.0.1", port);

        let result = client.single_query("as6939");
        assert_eq!(result, "6939 | 6939 | x | ARIN | US | d | HE\n");
        assert_eq!(server.join().unwrap(), " -v as6939\r\n");
    }

    #[test]
    fn test_bulk_query_roundtrip() {
        let (port, server) = one_shot_server("1 | a\n2 | b\n", 5);
        let client = WhoisClient::new("127.0.0.1", port);

        let result = client.bulk_query(&["as1".to_string(), "as2".to_string()]);
        assert_eq!(result, "1 | a\n2 | b\n");
        assert_eq!(server.join().unwrap(), "begin\nverbose\nas1\nas2\nend\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            let mut buf = [0u8; 64];
            let _ = stream.read(&mut buf).unwrap();
            stream.write_all(&[b'o', b'k', 0xff, b'\n']).unwrap();
        });

        let client = WhoisClient::new("127.0.0.1", port);
        assert_eq!(client.single_query("as1"), "ok\u{fffd}\n");
        server.join().unwrap();
    }

    #[test]
    fn test_connection_refused_returns_empty() {
        // Bind then drop to get a port with nothing listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let client = WhoisClient::new("127.0.0.1", port)
            .with_timeouts(Duration::from_secs(2), Duration::from_secs(2));
        assert_eq!(client.single_query("as1"), "");
        assert_eq!(client.bulk_query(&["as1".to_string()]), "");
    }

    #[test]
    fn test_silent_server_times_out() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let port = listener.local_addr().unwrap().port();
        let server = thread::spawn(move || {
            let (stream, _) = listener.accept().unwrap();
            thread::sleep(Duration::from_millis(800));
            drop(stream);
        });

        let client = WhoisClient::new("127.0.0.1", port)
            .with_timeouts(Duration::from_millis(200), Duration::from_millis(200));
        assert_eq!(client.single_query("as1"), "");
        server.join().unwrap();
    }
}
