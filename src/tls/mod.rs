//! TLS over stream sockets.
//!
//! A [`TlsSocket`] is a [`Socket`] with a TLS session layered on top. The
//! socket lifecycle is unchanged; `connect` and `accept` additionally run
//! the handshake, and `send`/`recv` carry application data through the
//! session instead of straight to the descriptor.
//!
//! ```text
//!   TlsSocket
//!   +-- session   one per connection, rebuilt on connect
//!   +-- context   shared with every socket accepted from this one
//!   +-- socket    owns the descriptor
//! ```
//!
//! Teardown runs top to bottom: close_notify is sent, the session and
//! context are released, and the descriptor is closed last.

mod context;
mod session;

use std::fmt;
use std::os::fd::RawFd;
use std::sync::Arc;

use crate::addr::{AddressFamily, Endpoint};
use crate::config::TlsConfig;
use crate::error::{Error, RecvError, Result, SendError, TlsError};
use crate::socket::{receive_chunked, Chunk, Connection, Socket, SocketState, TransportType};

pub use self::context::TlsContext;
pub use self::session::{TlsErrorCode, TlsSession};

use self::session::FdIo;

/// Which side of the handshake this socket plays.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TlsMode {
	#[default]
	Client,
	Server,
}

impl fmt::Display for TlsMode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			TlsMode::Client => "client",
			TlsMode::Server => "server",
		})
	}
}

/// A socket whose stream traffic is protected by TLS.
pub struct TlsSocket {
	// field order is drop order
	session: TlsSession,
	context: TlsContext,
	socket: Socket,
}

impl TlsSocket {
	/// Creates a socket and a TLS context for `mode`.
	pub fn open(family: AddressFamily, transport: TransportType, mode: TlsMode, config: &TlsConfig) -> Result<Self> {
		Self::from_socket(Socket::open(family, transport)?, mode, config)
	}

	/// Creates a stream socket bound to `endpoint` with a TLS context for `mode`.
	pub fn open_and_bind(
		family: AddressFamily,
		endpoint: impl Into<Arc<Endpoint>>,
		mode: TlsMode,
		config: &TlsConfig,
	) -> Result<Self> {
		Self::from_socket(Socket::open_and_bind(family, endpoint)?, mode, config)
	}

	/// Layers TLS over an existing, not yet connected socket.
	pub fn from_socket(socket: Socket, mode: TlsMode, config: &TlsConfig) -> Result<Self> {
		let context = TlsContext::new(mode, config)?;
		let session = context.new_session(socket.endpoint().map(|e| e.as_ref()))?;
		Ok(Self { session, context, socket })
	}

	pub fn mode(&self) -> TlsMode {
		self.context.mode()
	}

	pub fn context(&self) -> &TlsContext {
		&self.context
	}

	pub fn as_raw_fd(&self) -> RawFd {
		self.socket.as_raw_fd()
	}

	pub fn address_family(&self) -> AddressFamily {
		self.socket.address_family()
	}

	pub fn transport(&self) -> TransportType {
		self.socket.transport()
	}

	pub fn state(&self) -> SocketState {
		self.socket.state()
	}

	pub fn endpoint(&self) -> Option<&Arc<Endpoint>> {
		self.socket.endpoint()
	}

	pub fn local_endpoint(&self) -> Result<Endpoint> {
		self.socket.local_endpoint()
	}

	pub fn bind(&mut self, endpoint: impl Into<Arc<Endpoint>>) -> Result<()> {
		self.socket.bind(endpoint)
	}

	pub fn bind_to_port(&mut self, port: u16) -> Result<()> {
		self.socket.bind_to_port(port)
	}

	pub fn listen(&mut self, backlog: i32) -> Result<()> {
		self.socket.listen(backlog)
	}

	pub fn enable_address_reuse(&self, enable: bool) -> Result<()> {
		self.socket.enable_address_reuse(enable)
	}

	pub fn enable_port_reuse(&self, enable: bool) -> Result<()> {
		self.socket.enable_port_reuse(enable)
	}

	/// In non-blocking mode `recv` retries would-block results up to the
	/// configured [`RetryConfig`](crate::config::RetryConfig) bound.
	pub fn enable_non_blocking(&self, enable: bool) -> Result<()> {
		self.socket.enable_non_blocking(enable)
	}

	pub fn is_non_blocking(&self) -> Result<bool> {
		self.socket.is_non_blocking()
	}

	/// Connects and runs the client handshake.
	///
	/// A handshake failure leaves the socket `Disconnected`.
	pub fn connect(&mut self, endpoint: impl Into<Arc<Endpoint>>) -> Result<()> {
		if self.mode() != TlsMode::Client {
			return Err(Error::precondition("Cannot connect a server-mode TLS socket"));
		}
		let endpoint = endpoint.into();
		self.socket.connect(Arc::clone(&endpoint))?;
		self.session = self.context.new_session(Some(&endpoint))?;

		let mut io = FdIo::new(self.socket.calls().as_ref(), self.socket.as_raw_fd());
		let failure = match self.session.handshake(&mut io) {
			Ok(()) => return Ok(()),
			Err(TlsErrorCode::ZeroReturn) => TlsError::ClosedByPeer { message: "Failed to connect to endpoint" },
			Err(code) => TlsError::Handshake { message: "Failed to connect to endpoint", code },
		};
		tracing::debug!(fd = self.socket.as_raw_fd(), error = %failure, "client handshake failed");
		self.socket.set_state(SocketState::Disconnected);
		Err(failure.into())
	}

	/// Accepts a connection and runs the server handshake on it.
	///
	/// The new socket shares this socket's context.
	pub fn accept(&self) -> Result<TlsSocket> {
		self.socket.check_accept()?;
		if self.mode() != TlsMode::Server {
			return Err(Error::precondition("Cannot accept on a client-mode TLS socket"));
		}

		let socket = self.socket.accept_raw()?;
		let session = self.context.new_session(None)?;
		let mut conn = TlsSocket { session, context: self.context.clone(), socket };

		let mut io = FdIo::new(conn.socket.calls().as_ref(), conn.socket.as_raw_fd());
		if let Err(code) = conn.session.handshake(&mut io) {
			tracing::debug!(fd = conn.socket.as_raw_fd(), error = %code, "server handshake failed");
			return Err(TlsError::Handshake { message: "Failed to accept connection", code }.into());
		}
		conn.socket.set_state(SocketState::Connected);
		Ok(conn)
	}

	/// Encrypts and sends `data` in one call.
	///
	/// On a non-blocking socket a successful return may leave encrypted
	/// records queued in the session; they go out with the next `send` or
	/// `flush`. A would-block error means no plaintext was taken.
	pub fn send(&mut self, data: &[u8]) -> Result<usize> {
		let mut io = FdIo::new(self.socket.calls().as_ref(), self.socket.as_raw_fd());
		self.session.write(&mut io, data).map_err(|code| {
			let err = match code {
				TlsErrorCode::Syscall(errno) if errno != 0 => SendError::Os { errno },
				code => SendError::Tls { code },
			};
			err.into()
		})
	}

	/// Receives decrypted data using the chunked loop.
	///
	/// A close_notify from the peer ends the read cleanly; would-block results
	/// are retried up to the configured bound.
	pub fn recv(&mut self, buf: &mut Vec<u8>, autoresize: bool) -> Result<usize> {
		let retry = self.context.config().retry;
		let session = &mut self.session;
		let mut io = FdIo::new(self.socket.calls().as_ref(), self.socket.as_raw_fd());

		let n = receive_chunked(buf, autoresize, &retry, |chunk| match session.read(&mut io, chunk) {
			Ok(n) => Ok(Chunk::Data(n)),
			Err(TlsErrorCode::ZeroReturn) => Ok(Chunk::Closed),
			Err(code) if code.is_transient() => Ok(Chunk::Retry),
			Err(TlsErrorCode::Syscall(errno)) => Err(RecvError::Io { errno }),
			Err(code) => Err(RecvError::Tls { code }),
		})?;
		Ok(n)
	}

	pub fn recv_sized(&mut self, buf: &mut Vec<u8>, size: usize) -> Result<usize> {
		buf.resize(size, 0);
		self.recv(buf, false)
	}
}

impl Drop for TlsSocket {
	fn drop(&mut self) {
		if self.session.is_handshaking() {
			return;
		}
		let mut io = FdIo::new(self.socket.calls().as_ref(), self.socket.as_raw_fd());
		if let Err(code) = self.session.shutdown(&mut io) {
			tracing::warn!(fd = self.socket.as_raw_fd(), error = %code, "close_notify not delivered");
		}
	}
}

impl fmt::Debug for TlsSocket {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TlsSocket")
			.field("mode", &self.mode())
			.field("socket", &self.socket)
			.field("session", &self.session)
			.finish()
	}
}

impl std::os::fd::AsRawFd for TlsSocket {
	fn as_raw_fd(&self) -> RawFd {
		self.socket.as_raw_fd()
	}
}

impl std::io::Read for TlsSocket {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		let mut io = FdIo::new(self.socket.calls().as_ref(), self.socket.as_raw_fd());
		match self.session.read(&mut io, buf) {
			Ok(n) => Ok(n),
			Err(TlsErrorCode::ZeroReturn) => Ok(0),
			Err(TlsErrorCode::Syscall(errno)) => Err(Error::from(RecvError::Io { errno }).into()),
			Err(code) => Err(Error::from(RecvError::Tls { code }).into()),
		}
	}
}

impl std::io::Write for TlsSocket {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		Ok(TlsSocket::send(self, buf)?)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		let mut io = FdIo::new(self.socket.calls().as_ref(), self.socket.as_raw_fd());
		self.session
			.flush_pending(&mut io)
			.map_err(|code| Error::from(SendError::Tls { code }).into())
	}
}

impl Connection for TlsSocket {
	fn connect(&mut self, endpoint: Arc<Endpoint>) -> Result<()> {
		TlsSocket::connect(self, endpoint)
	}

	fn accept(&self) -> Result<Self> {
		TlsSocket::accept(self)
	}

	fn send(&mut self, data: &[u8]) -> Result<usize> {
		TlsSocket::send(self, data)
	}

	fn recv(&mut self, buf: &mut Vec<u8>, autoresize: bool) -> Result<usize> {
		TlsSocket::recv(self, buf, autoresize)
	}
}
