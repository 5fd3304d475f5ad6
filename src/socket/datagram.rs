use std::sync::Arc;

use crate::addr::Endpoint;
use crate::error::{Error, RecvError, Result, SendError};
use super::{Socket, TransportType};

/// Largest payload `recv_from` will accept in one datagram.
pub const MAX_DATAGRAM_SIZE: usize = 65_536;

/// One datagram and the endpoint it came from or is headed to.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UdpPacket {
	pub payload: Vec<u8>,
	pub endpoint: Option<Arc<Endpoint>>,
}

impl UdpPacket {
	pub fn new(payload: impl Into<Vec<u8>>, endpoint: impl Into<Arc<Endpoint>>) -> Self {
		Self {
			payload: payload.into(),
			endpoint: Some(endpoint.into()),
		}
	}

	pub fn len(&self) -> usize {
		self.payload.len()
	}

	pub fn is_empty(&self) -> bool {
		self.payload.is_empty()
	}
}

impl Socket {
	fn require_datagram(&self, message: &'static str) -> Result<()> {
		if self.transport() != TransportType::Datagram {
			return Err(Error::precondition(message));
		}
		Ok(())
	}

	/// Sends one datagram to `endpoint`.
	pub fn send_to(&self, data: &[u8], endpoint: &Endpoint) -> Result<usize> {
		self.require_datagram("Cannot send_to on a stream socket")?;
		self.calls()
			.send_to(self.as_raw_fd(), data, endpoint)
			.map_err(|errno| SendError::Os { errno }.into())
	}

	/// Sends `packet.payload` to `packet.endpoint`.
	pub fn send_packet(&self, packet: &UdpPacket) -> Result<usize> {
		let endpoint = packet
			.endpoint
			.as_ref()
			.ok_or_else(|| Error::precondition("Cannot send a packet without a destination endpoint"))?;
		self.send_to(&packet.payload, endpoint)
	}

	/// Receives one datagram, annotated with its sender.
	pub fn recv_from(&self) -> Result<UdpPacket> {
		self.require_datagram("Cannot recv_from on a stream socket")?;

		let mut payload = vec![0u8; MAX_DATAGRAM_SIZE];
		let (n, sender) = loop {
			match self.calls().recv_from(self.as_raw_fd(), &mut payload) {
				Err(libc::EINTR) => continue,
				other => break other.map_err(|errno| Error::from(RecvError::Os { errno }))?,
			}
		};
		payload.truncate(n);

		let endpoint = if sender.is_empty() {
			None
		} else {
			Some(Arc::new(Endpoint::from_raw_addr(&sender)?))
		};
		tracing::trace!(fd = self.as_raw_fd(), len = n, "datagram received");

		Ok(UdpPacket { payload, endpoint })
	}
}
