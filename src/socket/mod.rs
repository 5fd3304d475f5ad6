//! Sockets and their lifecycle.
//!
//! A [`Socket`] owns one descriptor and tracks where it is in its life:
//! `Open` after creation, `Listening` after `listen`, `Connected` after
//! `connect` (or when produced by `accept`), `Closed` once dropped.
//! Operations that only make sense for one transport check it up front and
//! fail with a precondition error instead of reaching the kernel.

mod base;
mod datagram;
mod kind;
mod options;
mod recv;

use std::sync::Arc;

use crate::addr::Endpoint;
use crate::error::Result;

pub use self::base::Socket;
pub use self::datagram::{UdpPacket, MAX_DATAGRAM_SIZE};
pub use self::kind::{SocketState, TransportType};
pub use self::recv::CHUNK_SIZE;

pub(crate) use self::recv::{receive_chunked, Chunk};

/// The connection-oriented contract shared by [`Socket`] and
/// [`TlsSocket`](crate::tls::TlsSocket).
///
/// Generic code can drive either transport through this trait; the
/// `*_str`/`*_string` helpers are the byte-sequence and line-buffer forms.
pub trait Connection: Sized {
	fn connect(&mut self, endpoint: Arc<Endpoint>) -> Result<()>;

	fn accept(&self) -> Result<Self>;

	fn send(&mut self, data: &[u8]) -> Result<usize>;

	fn recv(&mut self, buf: &mut Vec<u8>, autoresize: bool) -> Result<usize>;

	fn recv_sized(&mut self, buf: &mut Vec<u8>, size: usize) -> Result<usize> {
		buf.resize(size, 0);
		self.recv(buf, false)
	}

	fn send_str(&mut self, text: &str) -> Result<usize> {
		self.send(text.as_bytes())
	}

	/// Receives whatever is pending and decodes it lossily as UTF-8.
	fn recv_string(&mut self) -> Result<String> {
		let mut buf = Vec::new();
		self.recv(&mut buf, true)?;
		Ok(String::from_utf8_lossy(&buf).into_owned())
	}
}

impl Connection for Socket {
	fn connect(&mut self, endpoint: Arc<Endpoint>) -> Result<()> {
		Socket::connect(self, endpoint)
	}

	fn accept(&self) -> Result<Self> {
		Socket::accept(self)
	}

	fn send(&mut self, data: &[u8]) -> Result<usize> {
		Socket::send(self, data)
	}

	fn recv(&mut self, buf: &mut Vec<u8>, autoresize: bool) -> Result<usize> {
		Socket::recv(self, buf, autoresize)
	}
}
