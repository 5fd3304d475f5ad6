use crate::error::{Error, Result};
use super::Socket;

/// Sets an integer boolean socket option.
fn set_flag(socket: &Socket, level: libc::c_int, name: libc::c_int, enable: bool, message: &'static str) -> Result<()> {
	let val: libc::c_int = if enable { 1 } else { 0 };
	socket
		.calls()
		.set_option(socket.as_raw_fd(), level, name, val)
		.map_err(|errno| Error::os(message, errno))
}

impl Socket {
	/// Sets SO_BROADCAST.
	///
	/// Required before sending datagrams to a broadcast address.
	pub fn enable_broadcast(&self, enable: bool) -> Result<()> {
		set_flag(self, libc::SOL_SOCKET, libc::SO_BROADCAST, enable, "Failed to set broadcast mode")
	}

	/// Sets SO_REUSEPORT.
	///
	/// Allows multiple sockets to bind the same port.
	pub fn enable_port_reuse(&self, enable: bool) -> Result<()> {
		set_flag(self, libc::SOL_SOCKET, libc::SO_REUSEPORT, enable, "Failed to set port reuse mode")
	}

	/// Sets SO_REUSEADDR.
	///
	/// Allows binding to an address that's in TIME_WAIT state.
	pub fn enable_address_reuse(&self, enable: bool) -> Result<()> {
		set_flag(self, libc::SOL_SOCKET, libc::SO_REUSEADDR, enable, "Failed to set address reuse mode")
	}

	/// Sets or clears O_NONBLOCK. Idempotent.
	///
	/// In non-blocking mode plain `accept`/`send`/`recv` report `EAGAIN`
	/// instead of waiting; only the TLS receive loop retries internally.
	pub fn enable_non_blocking(&self, enable: bool) -> Result<()> {
		let flags = self
			.calls()
			.get_flags(self.as_raw_fd())
			.map_err(|errno| Error::os("Failed to read descriptor flags", errno))?;

		let new_flags = if enable {
			flags | libc::O_NONBLOCK
		} else {
			flags & !libc::O_NONBLOCK
		};

		self.calls()
			.set_flags(self.as_raw_fd(), new_flags)
			.map_err(|errno| Error::os("Failed to set non-blocking mode", errno))
	}

	pub fn is_non_blocking(&self) -> Result<bool> {
		let flags = self
			.calls()
			.get_flags(self.as_raw_fd())
			.map_err(|errno| Error::os("Failed to read descriptor flags", errno))?;
		Ok(flags & libc::O_NONBLOCK != 0)
	}
}

#[cfg(test)]
mod tests {
	use crate::addr::AddressFamily;
	use crate::socket::{Socket, TransportType};

	#[test]
	fn options_apply_to_a_fresh_socket() {
		let socket = Socket::open(AddressFamily::IPv4, TransportType::Datagram).unwrap();
		socket.enable_broadcast(true).unwrap();
		socket.enable_address_reuse(true).unwrap();
		socket.enable_port_reuse(true).unwrap();
	}

	#[test]
	fn non_blocking_toggles() {
		let socket = Socket::open(AddressFamily::IPv4, TransportType::Stream).unwrap();
		assert!(!socket.is_non_blocking().unwrap());
		socket.enable_non_blocking(true).unwrap();
		socket.enable_non_blocking(true).unwrap();
		assert!(socket.is_non_blocking().unwrap());
		socket.enable_non_blocking(false).unwrap();
		assert!(!socket.is_non_blocking().unwrap());
	}
}
