/// IPv6 payload of an endpoint (IP + port + scope).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct SocketAddrV6 {
	ip: [u8; 16],
	port: u16,
	/// Scope ID for link-local addresses (identifies network interface).
	scope_id: u32,
}

impl SocketAddrV6 {
	pub(crate) fn new(ip: [u8; 16], port: u16) -> Self {
		Self { ip, port, scope_id: 0 }
	}

	pub(crate) fn ip(&self) -> [u8; 16] {
		self.ip
	}

	pub(crate) fn port(&self) -> u16 {
		self.port
	}

	/// Converts to the raw sockaddr_in6 for syscalls.
	pub(crate) fn to_raw(&self) -> libc::sockaddr_in6 {
		let mut raw: libc::sockaddr_in6 = unsafe { std::mem::zeroed() };
		raw.sin6_family = libc::AF_INET6 as libc::sa_family_t;
		raw.sin6_port = self.port.to_be();
		raw.sin6_addr.s6_addr = self.ip;
		raw.sin6_scope_id = self.scope_id;
		raw
	}

	/// Creates from raw sockaddr_in6.
	pub(crate) fn from_raw(raw: &libc::sockaddr_in6) -> Self {
		Self {
			ip: raw.sin6_addr.s6_addr,
			port: u16::from_be(raw.sin6_port),
			scope_id: raw.sin6_scope_id,
		}
	}
}

/*
Two extra fields compared to V4:
- sin6_flowinfo: traffic class and flow label, always 0 here
- sin6_scope_id: link-local scope, kept from whatever the kernel handed us
*/
