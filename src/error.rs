use crate::addr::AddressFamily;
use crate::tls::TlsErrorCode;

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Base error: everything this library reports is one of these.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error(transparent)]
	Endpoint(#[from] EndpointError),

	#[error(transparent)]
	Socket(#[from] SocketError),
}

/// Address construction/validation errors.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EndpointError {
	#[error("invalid address: {reason}")]
	InvalidAddress { reason: String },

	#[error("invalid address family: {family}")]
	InvalidAddressFamily { family: AddressFamily },

	#[error("invalid port: {port}")]
	InvalidPort { port: i64 },
}

/// Socket lifecycle and transport errors.
///
/// `Precondition` is a programming error (wrong transport, wrong state) and
/// is never worth retrying. `Os` carries the errno of the failed call.
#[derive(Debug, thiserror::Error)]
pub enum SocketError {
	#[error("{message}")]
	Precondition { message: &'static str },

	#[error("{message}: [{errno}] {}", errno_to_str(*.errno))]
	Os { message: &'static str, errno: i32 },

	#[error(transparent)]
	Send(#[from] SendError),

	#[error(transparent)]
	Recv(#[from] RecvError),

	#[error(transparent)]
	Tls(#[from] TlsError),
}

/// Failures of the send family.
#[derive(Debug, thiserror::Error)]
pub enum SendError {
	#[error("Failed to send: [{errno}] {}", errno_to_str(*.errno))]
	Os { errno: i32 },

	#[error("Failed to send: [{}] {code}", .code.code())]
	Tls { code: TlsErrorCode },
}

/// Failures of the receive family.
#[derive(Debug, thiserror::Error)]
pub enum RecvError {
	#[error("Failed to receive: [{errno}] {}", errno_to_str(*.errno))]
	Os { errno: i32 },

	/// Socket-level failure surfaced through the TLS layer.
	#[error("I/O error occurred: [{errno}] {}", errno_to_str(*.errno))]
	Io { errno: i32 },

	#[error("Failed to receive: [{}] {code}", .code.code())]
	Tls { code: TlsErrorCode },

	#[error("Failed to receive: gave up after {attempts} would-block retries")]
	RetryLimit { attempts: u32 },
}

/// TLS engine failures.
#[derive(Debug, thiserror::Error)]
pub enum TlsError {
	#[error("{message}: [{}] {code}", .code.code())]
	Handshake { message: &'static str, code: TlsErrorCode },

	#[error("{message}: connection closed by peer")]
	ClosedByPeer { message: &'static str },

	#[error("Failed to create TLS context: {reason}")]
	Context { reason: String },
}

impl Error {
	pub(crate) fn precondition(message: &'static str) -> Self {
		SocketError::Precondition { message }.into()
	}

	pub(crate) fn os(message: &'static str, errno: i32) -> Self {
		SocketError::Os { message, errno }.into()
	}

	pub(crate) fn invalid_address(reason: impl Into<String>) -> Self {
		EndpointError::InvalidAddress { reason: reason.into() }.into()
	}

	pub(crate) fn invalid_family(family: AddressFamily) -> Self {
		EndpointError::InvalidAddressFamily { family }.into()
	}

	pub fn is_endpoint(&self) -> bool {
		matches!(self, Error::Endpoint(_))
	}

	/// True for every socket-side error, including send/recv/TLS failures.
	pub fn is_socket(&self) -> bool {
		matches!(self, Error::Socket(_))
	}

	pub fn is_precondition(&self) -> bool {
		matches!(self, Error::Socket(SocketError::Precondition { .. }))
	}

	pub fn is_send(&self) -> bool {
		matches!(self, Error::Socket(SocketError::Send(_)))
	}

	pub fn is_recv(&self) -> bool {
		matches!(self, Error::Socket(SocketError::Recv(_)))
	}

	pub fn is_tls(&self) -> bool {
		matches!(self, Error::Socket(SocketError::Tls(_)))
	}

	/// The OS error code behind this failure, if there is one.
	pub fn os_error(&self) -> Option<i32> {
		match self {
			Error::Socket(SocketError::Os { errno, .. })
			| Error::Socket(SocketError::Send(SendError::Os { errno }))
			| Error::Socket(SocketError::Recv(RecvError::Os { errno }))
			| Error::Socket(SocketError::Recv(RecvError::Io { errno })) => Some(*errno),
			Error::Socket(SocketError::Send(SendError::Tls { code }))
			| Error::Socket(SocketError::Recv(RecvError::Tls { code }))
			| Error::Socket(SocketError::Tls(TlsError::Handshake { code, .. })) => code.os_error(),
			_ => None,
		}
	}

	/// True when the caller may reasonably try the same operation again.
	pub fn is_retryable(&self) -> bool {
		if let Error::Socket(SocketError::Recv(RecvError::RetryLimit { .. })) = self {
			return true;
		}
		matches!(
			self.os_error(),
			Some(libc::EAGAIN | libc::EINTR | libc::EINPROGRESS | libc::ENOBUFS)
		)
	}
}

impl From<SendError> for Error {
	fn from(err: SendError) -> Self {
		Error::Socket(err.into())
	}
}

impl From<RecvError> for Error {
	fn from(err: RecvError) -> Self {
		Error::Socket(err.into())
	}
}

impl From<TlsError> for Error {
	fn from(err: TlsError) -> Self {
		Error::Socket(err.into())
	}
}

/// Returns current errno value.
#[inline]
pub fn errno() -> i32 {
	unsafe { *libc::__errno_location() }
}

/// Converts errno to human-readable string.
pub(crate) fn errno_to_str(errno: i32) -> String {
	match errno {
		0 => "unexpected end of stream".into(),
		libc::EACCES => "permission denied".into(),
		libc::EADDRINUSE => "address already in use".into(),
		libc::EADDRNOTAVAIL => "address not available".into(),
		libc::EAFNOSUPPORT => "address family not supported".into(),
		libc::EAGAIN => "resource temporarily unavailable".into(),
		libc::EBADF => "bad file descriptor".into(),
		libc::ECONNREFUSED => "connection refused".into(),
		libc::ECONNRESET => "connection reset by peer".into(),
		libc::EDESTADDRREQ => "destination address required".into(),
		libc::EINPROGRESS => "operation in progress".into(),
		libc::EINTR => "interrupted by signal".into(),
		libc::EINVAL => "invalid argument".into(),
		libc::EISCONN => "already connected".into(),
		libc::EMFILE => "too many open files".into(),
		libc::ENETUNREACH => "network unreachable".into(),
		libc::ENOBUFS => "no buffer space available".into(),
		libc::ENOTCONN => "not connected".into(),
		libc::EOPNOTSUPP => "operation not supported".into(),
		libc::EPIPE => "broken pipe".into(),
		libc::ETIMEDOUT => "connection timed out".into(),
		_ => format!("errno {}", errno),
	}
}

/// Maps errno to std::io::ErrorKind.
fn errno_to_kind(errno: i32) -> std::io::ErrorKind {
	match errno {
		libc::EACCES | libc::EPERM => std::io::ErrorKind::PermissionDenied,
		libc::EADDRINUSE => std::io::ErrorKind::AddrInUse,
		libc::EADDRNOTAVAIL => std::io::ErrorKind::AddrNotAvailable,
		libc::EAGAIN => std::io::ErrorKind::WouldBlock,
		libc::ECONNREFUSED => std::io::ErrorKind::ConnectionRefused,
		libc::ECONNRESET => std::io::ErrorKind::ConnectionReset,
		libc::EINTR => std::io::ErrorKind::Interrupted,
		libc::EINVAL => std::io::ErrorKind::InvalidInput,
		libc::ENOTCONN => std::io::ErrorKind::NotConnected,
		libc::EPIPE => std::io::ErrorKind::BrokenPipe,
		libc::ETIMEDOUT => std::io::ErrorKind::TimedOut,
		_ => std::io::ErrorKind::Other,
	}
}

impl From<Error> for std::io::Error {
	fn from(err: Error) -> Self {
		let kind = match &err {
			Error::Endpoint(_) => std::io::ErrorKind::InvalidInput,
			Error::Socket(SocketError::Precondition { .. }) => std::io::ErrorKind::Unsupported,
			Error::Socket(SocketError::Recv(RecvError::RetryLimit { .. })) => {
				std::io::ErrorKind::WouldBlock
			}
			Error::Socket(SocketError::Tls(TlsError::ClosedByPeer { .. })) => {
				std::io::ErrorKind::ConnectionAborted
			}
			_ => match err.os_error() {
				Some(errno) => errno_to_kind(errno),
				None => std::io::ErrorKind::Other,
			},
		};
		std::io::Error::new(kind, err)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn os_errors_use_canonical_format() {
		let err = Error::os("Failed to bind to endpoint", libc::EADDRINUSE);
		assert_eq!(
			err.to_string(),
			format!("Failed to bind to endpoint: [{}] address already in use", libc::EADDRINUSE)
		);
		assert_eq!(err.os_error(), Some(libc::EADDRINUSE));
		assert!(err.is_socket());
		assert!(!err.is_precondition());
	}

	#[test]
	fn precondition_is_a_socket_error_without_code() {
		let err = Error::precondition("Cannot listen on a datagram socket");
		assert!(err.is_socket());
		assert!(err.is_precondition());
		assert_eq!(err.os_error(), None);
		assert!(!err.is_retryable());
		assert_eq!(err.to_string(), "Cannot listen on a datagram socket");
	}

	#[test]
	fn send_and_recv_are_socket_kinds() {
		let send: Error = SendError::Os { errno: libc::EPIPE }.into();
		assert!(send.is_send() && send.is_socket() && !send.is_recv());

		let recv: Error = RecvError::Os { errno: libc::EAGAIN }.into();
		assert!(recv.is_recv() && recv.is_socket());
		assert!(recv.is_retryable());
	}

	#[test]
	fn unknown_errno_falls_back_to_number() {
		assert_eq!(errno_to_str(4242), "errno 4242");
	}

	#[test]
	fn endpoint_errors_map_to_invalid_input() {
		let err = Error::invalid_family(AddressFamily::Unknown);
		assert!(err.is_endpoint());
		let io: std::io::Error = err.into();
		assert_eq!(io.kind(), std::io::ErrorKind::InvalidInput);
	}

	#[test]
	fn would_block_maps_to_io_kind() {
		let io: std::io::Error = Error::from(RecvError::Os { errno: libc::EAGAIN }).into();
		assert_eq!(io.kind(), std::io::ErrorKind::WouldBlock);
	}
}
