use std::fmt;
use std::io::{Read, Write};
use std::os::fd::RawFd;
use std::sync::Arc;

use rustls::pki_types::ServerName;
use rustls::{ClientConfig, ClientConnection, Connection, ServerConfig, ServerConnection};

use crate::error::errno_to_str;
use crate::sys::SocketCalls;

/// Why a TLS engine call did not produce data.
///
/// The numeric [`code`](TlsErrorCode::code) follows the conventional
/// `SSL_ERROR_*` numbering so messages read the same as other TLS stacks.
#[derive(Debug, Clone, PartialEq)]
pub enum TlsErrorCode {
	/// The peer sent close_notify: orderly end of the session.
	ZeroReturn,
	/// The descriptor would block waiting for input.
	WantRead,
	/// The descriptor would block flushing output.
	WantWrite,
	/// The underlying socket failed; 0 means the peer vanished without close_notify.
	Syscall(i32),
	/// The TLS protocol itself failed.
	Protocol(rustls::Error),
}

impl TlsErrorCode {
	pub fn code(&self) -> i32 {
		match self {
			TlsErrorCode::Protocol(_) => 1,
			TlsErrorCode::WantRead => 2,
			TlsErrorCode::WantWrite => 3,
			TlsErrorCode::Syscall(_) => 5,
			TlsErrorCode::ZeroReturn => 6,
		}
	}

	pub fn os_error(&self) -> Option<i32> {
		match self {
			TlsErrorCode::Syscall(errno) if *errno != 0 => Some(*errno),
			TlsErrorCode::WantRead | TlsErrorCode::WantWrite => Some(libc::EAGAIN),
			_ => None,
		}
	}

	/// The engine is waiting on the transport; the same call may be retried.
	pub fn is_transient(&self) -> bool {
		matches!(self, TlsErrorCode::WantRead | TlsErrorCode::WantWrite)
	}

	fn from_io(err: std::io::Error, want: TlsErrorCode) -> Self {
		if err.kind() == std::io::ErrorKind::WouldBlock {
			return want;
		}
		TlsErrorCode::Syscall(err.raw_os_error().unwrap_or(0))
	}
}

impl fmt::Display for TlsErrorCode {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			TlsErrorCode::ZeroReturn => f.write_str("session closed by peer"),
			TlsErrorCode::WantRead => f.write_str("engine wants to read"),
			TlsErrorCode::WantWrite => f.write_str("engine wants to write"),
			TlsErrorCode::Syscall(errno) => f.write_str(&errno_to_str(*errno)),
			TlsErrorCode::Protocol(err) => write!(f, "{}", err),
		}
	}
}

/// Blocking byte I/O over a descriptor, routed through the socket-call seam.
pub(crate) struct FdIo<'a> {
	calls: &'a dyn SocketCalls,
	fd: RawFd,
}

impl<'a> FdIo<'a> {
	pub(crate) fn new(calls: &'a dyn SocketCalls, fd: RawFd) -> Self {
		Self { calls, fd }
	}
}

impl Read for FdIo<'_> {
	fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
		loop {
			match self.calls.recv(self.fd, buf) {
				Ok(n) => return Ok(n),
				Err(libc::EINTR) => continue,
				Err(errno) => return Err(std::io::Error::from_raw_os_error(errno)),
			}
		}
	}
}

impl Write for FdIo<'_> {
	fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
		self.calls
			.send(self.fd, buf)
			.map_err(std::io::Error::from_raw_os_error)
	}

	fn flush(&mut self) -> std::io::Result<()> {
		Ok(())
	}
}

/// One TLS session, bound to whichever descriptor its I/O is driven over.
pub struct TlsSession {
	conn: Connection,
}

impl TlsSession {
	pub(crate) fn client(config: Arc<ClientConfig>, name: ServerName<'static>) -> Result<Self, rustls::Error> {
		let conn = ClientConnection::new(config, name)?;
		Ok(Self { conn: Connection::Client(conn) })
	}

	pub(crate) fn server(config: Arc<ServerConfig>) -> Result<Self, rustls::Error> {
		let conn = ServerConnection::new(config)?;
		Ok(Self { conn: Connection::Server(conn) })
	}

	pub fn is_handshaking(&self) -> bool {
		self.conn.is_handshaking()
	}

	/// Writes out every pending TLS record.
	fn flush<T: Read + Write>(&mut self, io: &mut T) -> Result<(), TlsErrorCode> {
		while self.conn.wants_write() {
			self.conn
				.write_tls(io)
				.map_err(|e| TlsErrorCode::from_io(e, TlsErrorCode::WantWrite))?;
		}
		Ok(())
	}

	/// Pulls TLS records off the wire and processes them. Returns the raw
	/// byte count; 0 means the peer closed the transport.
	fn fetch<T: Read + Write>(&mut self, io: &mut T) -> Result<usize, TlsErrorCode> {
		let n = self
			.conn
			.read_tls(io)
			.map_err(|e| TlsErrorCode::from_io(e, TlsErrorCode::WantRead))?;

		if let Err(err) = self.conn.process_new_packets() {
			// best effort: let the peer see our alert
			let _ = self.flush(io);
			return Err(TlsErrorCode::Protocol(err));
		}
		Ok(n)
	}

	/// Drives the handshake to completion.
	///
	/// `ZeroReturn` means the transport closed before the handshake finished.
	pub(crate) fn handshake<T: Read + Write>(&mut self, io: &mut T) -> Result<(), TlsErrorCode> {
		while self.conn.is_handshaking() {
			self.flush(io)?;
			if !self.conn.is_handshaking() {
				break;
			}
			if self.conn.wants_read() && self.fetch(io)? == 0 {
				return Err(TlsErrorCode::ZeroReturn);
			}
		}
		self.flush(io)?;
		tracing::debug!(version = ?self.conn.protocol_version(), "TLS handshake complete");
		Ok(())
	}

	/// Reads decrypted bytes into `buf`.
	pub(crate) fn read<T: Read + Write>(&mut self, io: &mut T, buf: &mut [u8]) -> Result<usize, TlsErrorCode> {
		loop {
			match self.conn.reader().read(buf) {
				Ok(0) if !buf.is_empty() => return Err(TlsErrorCode::ZeroReturn),
				Ok(n) => return Ok(n),
				Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => {}
				// transport EOF without close_notify
				Err(_) => return Err(TlsErrorCode::Syscall(0)),
			}
			self.flush(io)?;
			self.fetch(io)?;
		}
	}

	/// Encrypts and sends `data`. Returns the plaintext bytes taken.
	///
	/// Records still queued from an earlier call go out first. Once any
	/// plaintext is taken the call succeeds; records the transport could not
	/// take yet stay queued for the next write or flush.
	pub(crate) fn write<T: Read + Write>(&mut self, io: &mut T, data: &[u8]) -> Result<usize, TlsErrorCode> {
		self.flush(io)?;
		let n = self
			.conn
			.writer()
			.write(data)
			.map_err(|e| TlsErrorCode::from_io(e, TlsErrorCode::WantWrite))?;
		if n == 0 && !data.is_empty() {
			return Err(TlsErrorCode::WantWrite);
		}
		match self.flush(io) {
			Err(code) if code.is_transient() => Ok(n),
			flushed => flushed.map(|()| n),
		}
	}

	/// Flushes pending records without writing new data.
	pub(crate) fn flush_pending<T: Read + Write>(&mut self, io: &mut T) -> Result<(), TlsErrorCode> {
		self.flush(io)
	}

	/// Sends close_notify.
	pub(crate) fn shutdown<T: Read + Write>(&mut self, io: &mut T) -> Result<(), TlsErrorCode> {
		self.conn.send_close_notify();
		self.flush(io)
	}
}

impl fmt::Debug for TlsSession {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("TlsSession")
			.field("handshaking", &self.conn.is_handshaking())
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn codes_follow_ssl_numbering() {
		assert_eq!(TlsErrorCode::ZeroReturn.code(), 6);
		assert_eq!(TlsErrorCode::WantRead.code(), 2);
		assert_eq!(TlsErrorCode::WantWrite.code(), 3);
		assert_eq!(TlsErrorCode::Syscall(libc::EPIPE).code(), 5);
		assert_eq!(TlsErrorCode::Protocol(rustls::Error::DecryptError).code(), 1);
	}

	#[test]
	fn would_block_maps_to_want() {
		let err = std::io::Error::from_raw_os_error(libc::EAGAIN);
		assert_eq!(TlsErrorCode::from_io(err, TlsErrorCode::WantRead), TlsErrorCode::WantRead);
		assert!(TlsErrorCode::WantWrite.is_transient());
	}

	#[test]
	fn socket_failures_keep_errno() {
		let err = std::io::Error::from_raw_os_error(libc::ECONNRESET);
		let code = TlsErrorCode::from_io(err, TlsErrorCode::WantRead);
		assert_eq!(code, TlsErrorCode::Syscall(libc::ECONNRESET));
		assert_eq!(code.os_error(), Some(libc::ECONNRESET));
		assert_eq!(TlsErrorCode::Syscall(0).os_error(), None);
	}
}
