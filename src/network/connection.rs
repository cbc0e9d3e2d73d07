//! TCP Connection
//!
//! Owns zero or one socket to a single Barbershop server.

use std::io::{BufRead, BufReader, ErrorKind, Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use bytes::Bytes;

use crate::config::Config;
use crate::error::{BarbershopError, Result};
use super::{Endpoint, Transport, MAX_LINE_LEN};

/// Initial buffer for `read_exact`
const READ_CHUNK: usize = 64 * 1024;

/// Socket options applied on every (re)connect
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SocketOptions {
    pub connect_timeout: Option<Duration>,
    pub read_timeout: Option<Duration>,
    pub write_timeout: Option<Duration>,
}

impl SocketOptions {
    pub fn from_config(config: &Config) -> Self {
        Self {
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
            write_timeout: config.write_timeout(),
        }
    }
}

/// Live socket state
///
/// The buffered reader and the write handle are created and dropped
/// together, so one can never exist without the other.
struct Socket {
    /// TCP stream reader (buffered for line reads)
    reader: BufReader<TcpStream>,

    /// TCP stream writer (unbuffered, commands are written in one call)
    writer: TcpStream,
}

/// Manages TCP communication to and from a Barbershop server
pub struct Connection {
    endpoint: Endpoint,
    options: SocketOptions,
    socket: Option<Socket>,
}

impl Connection {
    /// Create a disconnected connection; the socket opens lazily
    pub fn new(endpoint: Endpoint, options: SocketOptions) -> Self {
        Self {
            endpoint,
            options,
            socket: None,
        }
    }

    /// Create a connection from a client config
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.endpoint(), SocketOptions::from_config(config))
    }

    fn open_stream(&self) -> std::io::Result<TcpStream> {
        let target = (self.endpoint.host.as_str(), self.endpoint.port);
        let timeout = match self.options.connect_timeout {
            Some(timeout) => timeout,
            None => return TcpStream::connect(target),
        };

        let mut last_err = None;
        for addr in target.to_socket_addrs()? {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(stream) => return Ok(stream),
                Err(e) => last_err = Some(e),
            }
        }
        Err(last_err.unwrap_or_else(|| {
            std::io::Error::new(ErrorKind::NotFound, "host resolved to no addresses")
        }))
    }

    fn configure(&self, stream: &TcpStream) -> std::io::Result<()> {
        // Disable Nagle so small command writes are not delayed
        stream.set_nodelay(true)?;
        stream.set_read_timeout(self.options.read_timeout)?;
        stream.set_write_timeout(self.options.write_timeout)?;
        Ok(())
    }

    fn failure(&self, err: &std::io::Error) -> BarbershopError {
        BarbershopError::connection(&self.endpoint.host, self.endpoint.port, err)
    }

    fn not_connected(&self) -> BarbershopError {
        BarbershopError::connection_closed(&self.endpoint.host, self.endpoint.port, "not connected")
    }

    /// Any read error leaves the stream position unknown, so drop the socket
    fn read_failed(&mut self, err: std::io::Error) -> BarbershopError {
        tracing::warn!("Error reading from {}: {}", self.endpoint, err);
        let failure = match err.kind() {
            ErrorKind::UnexpectedEof => BarbershopError::connection_closed(
                &self.endpoint.host,
                self.endpoint.port,
                "socket closed on remote end",
            ),
            _ => self.failure(&err),
        };
        self.disconnect();
        failure
    }
}

impl Transport for Connection {
    fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    fn is_connected(&self) -> bool {
        self.socket.is_some()
    }

    fn connect(&mut self) -> Result<()> {
        if self.socket.is_some() {
            return Ok(());
        }

        let stream = self.open_stream().map_err(|e| self.failure(&e))?;
        self.configure(&stream).map_err(|e| self.failure(&e))?;
        let read_stream = stream.try_clone().map_err(|e| self.failure(&e))?;

        self.socket = Some(Socket {
            reader: BufReader::new(read_stream),
            writer: stream,
        });
        tracing::debug!("Connected to {}", self.endpoint);
        Ok(())
    }

    fn disconnect(&mut self) {
        let socket = match self.socket.take() {
            Some(socket) => socket,
            None => return,
        };
        // Close failures are not actionable
        let _ = socket.writer.shutdown(std::net::Shutdown::Both);
        tracing::debug!("Disconnected from {}", self.endpoint);
    }

    fn send(&mut self, bytes: &[u8]) -> Result<()> {
        self.connect()?;
        let socket = match self.socket.as_mut() {
            Some(socket) => socket,
            None => return Err(self.not_connected()),
        };

        let result = socket
            .writer
            .write_all(bytes)
            .and_then(|_| socket.writer.flush());
        if let Err(e) = result {
            tracing::warn!("Error writing to {}: {}", self.endpoint, e);
            let failure = self.failure(&e);
            // Only a broken pipe is known to have killed the stream
            if e.kind() == ErrorKind::BrokenPipe {
                self.disconnect();
            }
            return Err(failure);
        }
        Ok(())
    }

    fn read_line(&mut self) -> Result<Bytes> {
        let socket = match self.socket.as_mut() {
            Some(socket) => socket,
            None => return Err(self.not_connected()),
        };

        let mut line = Vec::with_capacity(64);
        let limit = (MAX_LINE_LEN + 1) as u64;
        let read = (&mut socket.reader).take(limit).read_until(b'\n', &mut line);
        match read {
            Ok(_) if line.len() > MAX_LINE_LEN => {
                let failure = BarbershopError::connection_closed(
                    &self.endpoint.host,
                    self.endpoint.port,
                    format!("reply line exceeds {} bytes", MAX_LINE_LEN),
                );
                tracing::warn!("{}", failure);
                self.disconnect();
                Err(failure)
            }
            Ok(_) => Ok(Bytes::from(line)),
            Err(e) => Err(self.read_failed(e)),
        }
    }

    fn read_exact(&mut self, len: usize) -> Result<Bytes> {
        let socket = match self.socket.as_mut() {
            Some(socket) => socket,
            None => return Err(self.not_connected()),
        };

        // Grow with the bytes that actually arrive rather than trusting `len`
        let mut data = Vec::with_capacity(len.min(READ_CHUNK));
        let read = (&mut socket.reader).take(len as u64).read_to_end(&mut data);
        match read {
            Ok(n) if n == len => Ok(Bytes::from(data)),
            Ok(_) => Err(self.read_failed(ErrorKind::UnexpectedEof.into())),
            Err(e) => Err(self.read_failed(e)),
        }
    }
}

impl Drop for Connection {
    fn drop(&mut self) {
        self.disconnect();
    }
}
