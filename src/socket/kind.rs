use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Transport type of a socket.
///
/// - `Stream`: reliable, ordered byte stream (TCP)
/// - `Datagram`: unreliable, unordered packets (UDP)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportType {
	Stream,
	Datagram,
	Unknown,
}

impl TransportType {
	/// Returns the libc constant for this transport.
	pub fn to_native(self) -> Result<libc::c_int> {
		match self {
			TransportType::Stream => Ok(libc::SOCK_STREAM),
			TransportType::Datagram => Ok(libc::SOCK_DGRAM),
			TransportType::Unknown => Err(Error::precondition("Cannot create a socket of unknown transport")),
		}
	}

	pub fn from_native(raw: libc::c_int) -> Self {
		match raw {
			libc::SOCK_STREAM => TransportType::Stream,
			libc::SOCK_DGRAM => TransportType::Datagram,
			_ => TransportType::Unknown,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			TransportType::Stream => "TCP",
			TransportType::Datagram => "UDP",
			TransportType::Unknown => "Unknown",
		}
	}
}

impl fmt::Display for TransportType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for TransportType {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(match s {
			"TCP" | "SOCK_STREAM" => TransportType::Stream,
			"UDP" | "SOCK_DGRAM" => TransportType::Datagram,
			_ => TransportType::Unknown,
		})
	}
}

/// Lifecycle state of a socket.
///
/// ```text
/// open ──► Open ──bind──► Open(+endpoint) ──listen──► Listening ──accept──► (new) Connected
///            └──────────────connect──────────────► Connected
/// drop ──► Closed
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketState {
	Closed,
	Open,
	Listening,
	Connected,
	Disconnected,
	Unknown,
}

impl SocketState {
	pub fn as_str(self) -> &'static str {
		match self {
			SocketState::Closed => "Closed",
			SocketState::Open => "Open",
			SocketState::Listening => "Listening",
			SocketState::Connected => "Connected",
			SocketState::Disconnected => "Disconnected",
			SocketState::Unknown => "Unknown",
		}
	}
}

impl fmt::Display for SocketState {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for SocketState {
	type Err = std::convert::Infallible;

	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(match s {
			"Closed" => SocketState::Closed,
			"Open" => SocketState::Open,
			"Listening" => SocketState::Listening,
			"Connected" => SocketState::Connected,
			"Disconnected" => SocketState::Disconnected,
			_ => SocketState::Unknown,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn transport_aliases() {
		assert_eq!("SOCK_STREAM".parse::<TransportType>().unwrap(), TransportType::Stream);
		assert_eq!("UDP".parse::<TransportType>().unwrap(), TransportType::Datagram);
		assert_eq!("SOCK_RAW".parse::<TransportType>().unwrap(), TransportType::Unknown);
	}

	#[test]
	fn unknown_transport_has_no_native_value() {
		assert!(TransportType::Unknown.to_native().unwrap_err().is_precondition());
		assert_eq!(TransportType::from_native(libc::SOCK_RAW), TransportType::Unknown);
	}

	#[test]
	fn state_names_round_trip() {
		for state in [
			SocketState::Closed,
			SocketState::Open,
			SocketState::Listening,
			SocketState::Connected,
			SocketState::Disconnected,
		] {
			assert_eq!(state.to_string().parse::<SocketState>().unwrap(), state);
		}
	}
}
