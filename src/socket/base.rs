use std::os::fd::RawFd;
use std::sync::Arc;

use crate::addr::{AddressFamily, Endpoint};
use crate::config::RetryConfig;
use crate::error::{Error, RecvError, Result, SendError};
use crate::sys::{SocketCalls, System};
use super::recv::{receive_chunked, Chunk};
use super::{SocketState, TransportType};

/// An owned native socket plus its lifecycle state.
///
/// Exactly one `Socket` owns a descriptor; dropping it closes the descriptor.
/// Sockets produced by [`accept`](Socket::accept) wrap a fresh descriptor of
/// their own.
pub struct Socket {
	fd: RawFd,
	family: AddressFamily,
	transport: TransportType,
	state: SocketState,
	endpoint: Option<Arc<Endpoint>>,
	calls: Arc<dyn SocketCalls>,
}

impl Socket {
	/// Creates a new socket of the given family and transport.
	pub fn open(family: AddressFamily, transport: TransportType) -> Result<Self> {
		Self::open_with(System::shared(), family, transport)
	}

	/// Creates a stream socket and binds it to `endpoint`.
	pub fn open_and_bind(family: AddressFamily, endpoint: impl Into<Arc<Endpoint>>) -> Result<Self> {
		Self::open_and_bind_with(System::shared(), family, endpoint)
	}

	/// [`open`](Self::open) through a caller-supplied set of socket calls.
	pub fn open_with(
		calls: Arc<dyn SocketCalls>,
		family: AddressFamily,
		transport: TransportType,
	) -> Result<Self> {
		let domain = family.to_native()?;
		let ty = transport.to_native()?;

		let fd = calls
			.socket(domain, ty)
			.map_err(|errno| Error::os("Failed to create socket", errno))?;
		tracing::debug!(fd, family = %family, transport = %transport, "socket opened");

		Ok(Self {
			fd,
			family,
			transport,
			state: SocketState::Open,
			endpoint: None,
			calls,
		})
	}

	/// [`open_and_bind`](Self::open_and_bind) through a caller-supplied set of socket calls.
	pub fn open_and_bind_with(
		calls: Arc<dyn SocketCalls>,
		family: AddressFamily,
		endpoint: impl Into<Arc<Endpoint>>,
	) -> Result<Self> {
		let mut socket = Self::open_with(calls, family, TransportType::Stream)?;
		socket.bind(endpoint)?;
		Ok(socket)
	}

	/// Takes ownership of a descriptor handed out by `accept`.
	///
	/// Internal only: nothing outside the crate can adopt a raw descriptor.
	pub(crate) fn wrap(
		calls: Arc<dyn SocketCalls>,
		fd: RawFd,
		endpoint: Arc<Endpoint>,
		transport: TransportType,
	) -> Result<Self> {
		if fd < 0 {
			return Err(Error::precondition("Cannot wrap an invalid descriptor"));
		}
		Ok(Self {
			fd,
			family: endpoint.address_family(),
			transport,
			state: SocketState::Open,
			endpoint: Some(endpoint),
			calls,
		})
	}

	/// Returns the raw file descriptor. Does not transfer ownership.
	#[inline]
	pub fn as_raw_fd(&self) -> RawFd {
		self.fd
	}

	pub fn address_family(&self) -> AddressFamily {
		self.family
	}

	pub fn transport(&self) -> TransportType {
		self.transport
	}

	pub fn state(&self) -> SocketState {
		self.state
	}

	/// The bound endpoint (or the peer, for accepted sockets).
	pub fn endpoint(&self) -> Option<&Arc<Endpoint>> {
		self.endpoint.as_ref()
	}

	pub(crate) fn set_state(&mut self, state: SocketState) {
		self.state = state;
	}

	pub(crate) fn calls(&self) -> &Arc<dyn SocketCalls> {
		&self.calls
	}

	/// Binds to `endpoint` and records it. Stream sockets only.
	pub fn bind(&mut self, endpoint: impl Into<Arc<Endpoint>>) -> Result<()> {
		if self.transport != TransportType::Stream {
			return Err(Error::precondition("Cannot bind a datagram socket to an endpoint"));
		}
		self.bind_endpoint(endpoint.into())
	}

	/// Binds to the wildcard address of this socket's family.
	///
	/// Unlike [`bind`](Self::bind) this works for datagram sockets too; it is
	/// how a UDP server claims its port.
	pub fn bind_to_port(&mut self, port: u16) -> Result<()> {
		let endpoint = Endpoint::from_family_any(self.family, port)?;
		self.bind_endpoint(Arc::new(endpoint))
	}

	fn bind_endpoint(&mut self, endpoint: Arc<Endpoint>) -> Result<()> {
		self.calls
			.bind(self.fd, &endpoint)
			.map_err(|errno| Error::os("Failed to bind to endpoint", errno))?;
		tracing::debug!(fd = self.fd, endpoint = %endpoint, "bound");
		self.endpoint = Some(endpoint);
		Ok(())
	}

	/// Connects to `endpoint`. Stream sockets only.
	pub fn connect(&mut self, endpoint: impl Into<Arc<Endpoint>>) -> Result<()> {
		if self.transport != TransportType::Stream {
			return Err(Error::precondition("Cannot connect a datagram socket"));
		}
		let endpoint = endpoint.into();
		self.calls
			.connect(self.fd, &endpoint)
			.map_err(|errno| Error::os("Failed to connect", errno))?;
		tracing::debug!(fd = self.fd, endpoint = %endpoint, "connected");
		self.state = SocketState::Connected;
		Ok(())
	}

	/// Starts listening. Requires a bound stream socket.
	pub fn listen(&mut self, backlog: i32) -> Result<()> {
		if self.transport != TransportType::Stream {
			return Err(Error::precondition("Cannot listen on a datagram socket"));
		}
		if self.endpoint.is_none() {
			return Err(Error::precondition("Cannot listen without binding to an endpoint"));
		}
		self.calls
			.listen(self.fd, backlog)
			.map_err(|errno| Error::os("Failed to listen", errno))?;
		tracing::debug!(fd = self.fd, backlog, "listening");
		self.state = SocketState::Listening;
		Ok(())
	}

	/// Checks the accept preconditions, most fundamental first.
	pub(crate) fn check_accept(&self) -> Result<()> {
		if self.transport != TransportType::Stream {
			return Err(Error::precondition("Cannot accept on a datagram socket"));
		}
		if self.endpoint.is_none() {
			return Err(Error::precondition("Cannot accept without binding to an endpoint"));
		}
		if self.state != SocketState::Listening {
			return Err(Error::precondition("Cannot accept without listening"));
		}
		Ok(())
	}

	/// Accepts the next raw connection: a new, still `Open` socket owning the
	/// peer descriptor.
	pub(crate) fn accept_raw(&self) -> Result<Socket> {
		self.check_accept()?;

		let (fd, peer) = self
			.calls
			.accept(self.fd)
			.map_err(|errno| Error::os("Failed to accept", errno))?;

		let peer = match Endpoint::from_raw_addr(&peer) {
			Ok(peer) => Arc::new(peer),
			Err(err) => {
				// nobody owns fd yet
				if let Err(errno) = self.calls.close(fd) {
					tracing::warn!(fd, errno, "close of unaddressable peer failed");
				}
				return Err(err);
			}
		};
		tracing::debug!(listener = self.fd, fd, peer = %peer, "accepted");

		Socket::wrap(Arc::clone(&self.calls), fd, peer, self.transport)
	}

	/// Blocks until a peer connects and returns the connection.
	pub fn accept(&self) -> Result<Socket> {
		let mut connection = self.accept_raw()?;
		connection.state = SocketState::Connected;
		Ok(connection)
	}

	/// The address the kernel actually bound (learn ephemeral ports here).
	pub fn local_endpoint(&self) -> Result<Endpoint> {
		let raw = self
			.calls
			.local_addr(self.fd)
			.map_err(|errno| Error::os("Failed to read local address", errno))?;
		Endpoint::from_raw_addr(&raw)
	}

	/// Sends `data` in a single call. Returns the bytes accepted by the kernel.
	pub fn send(&self, data: &[u8]) -> Result<usize> {
		self.calls
			.send(self.fd, data)
			.map_err(|errno| SendError::Os { errno }.into())
	}

	/// Receives into `buf` using the chunked loop.
	///
	/// With `autoresize` the buffer is grown as needed and trimmed to the
	/// received length; otherwise at most `buf.len()` bytes are read. A
	/// non-blocking socket with nothing pending fails with `EAGAIN`.
	pub fn recv(&self, buf: &mut Vec<u8>, autoresize: bool) -> Result<usize> {
		let n = receive_chunked(buf, autoresize, &RetryConfig::default(), |chunk| loop {
			match self.calls.recv(self.fd, chunk) {
				Ok(n) => return Ok(Chunk::Data(n)),
				Err(libc::EINTR) => continue,
				Err(errno) => return Err(RecvError::Os { errno }),
			}
		})?;
		Ok(n)
	}

	/// Resizes `buf` to `size` and fills at most that many bytes.
	pub fn recv_sized(&self, buf: &mut Vec<u8>, size: usize) -> Result<usize> {
		buf.resize(size, 0);
		self.recv(buf, false)
	}
}

impl Drop for Socket {
	fn drop(&mut self) {
		if let Err(errno) = self.calls.close(self.fd) {
			tracing::warn!(fd = self.fd, errno, "close failed");
		}
		self.state = SocketState::Closed;
	}
}

impl std::fmt::Debug for Socket {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Socket")
			.field("fd", &self.fd)
			.field("family", &self.family)
			.field("transport", &self.transport)
			.field("state", &self.state)
			.field("endpoint", &self.endpoint)
			.finish()
	}
}

impl std::os::fd::AsRawFd for Socket {
	fn as_raw_fd(&self) -> RawFd {
		self.fd
	}
}

impl std::io::Read for Socket {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		self.calls
			.recv(self.fd, buf)
			.map_err(|errno| Error::from(RecvError::Os { errno }).into())
	}
}

impl std::io::Write for Socket {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		Ok(Socket::send(self, buf)?)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(()) // nothing buffered at this level
	}
}
