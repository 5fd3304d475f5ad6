/// IPv4 payload of an endpoint (IP + port).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SocketAddrV4 {
	ip: [u8; 4],
	port: u16,
}

impl SocketAddrV4 {
	pub(crate) fn new(ip: [u8; 4], port: u16) -> Self {
		Self { ip, port }
	}

	/// Creates from raw sockaddr_in.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in) -> Self {
		Self {
			ip: raw.sin_addr.s_addr.to_ne_bytes(),
			port: u16::from_be(raw.sin_port),
		}
	}

	pub(crate) fn ip(&self) -> [u8; 4] {
		self.ip
	}

	pub(crate) fn port(&self) -> u16 {
		self.port
	}

	/// Converts to the raw sockaddr_in for syscalls.
	///
	/// Port and address end up in network byte order; `sin_zero` stays zeroed.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in {
		let mut raw: libc::sockaddr_in = unsafe { std::mem::zeroed() };
		raw.sin_family = libc::AF_INET as libc::sa_family_t;
		raw.sin_port = self.port.to_be();
		raw.sin_addr.s_addr = u32::from_ne_bytes(self.ip);
		raw
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn raw_layout_is_network_order() {
		let addr = SocketAddrV4::new([127, 0, 0, 1], 0x1f90);
		let raw = addr.to_raw();
		assert_eq!(raw.sin_family as i32, libc::AF_INET);
		assert_eq!(raw.sin_port.to_ne_bytes(), [0x1f, 0x90]);
		assert_eq!(raw.sin_addr.s_addr.to_ne_bytes(), [127, 0, 0, 1]);
		assert_eq!(SocketAddrV4::from_raw(&raw), addr);
	}
}
