use std::fmt;
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use crate::error::{EndpointError, Error, Result};
use super::resolve::{describe_gai_error, Resolver, SystemResolver};
use super::{AddressFamily, RawAddr, SocketAddrV4, SocketAddrV6};

/// Family-tagged address payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Payload {
	V4(SocketAddrV4),
	V6(SocketAddrV6),
}

/// A resolved transport address: family, IP, port and its native sockaddr
/// encoding.
///
/// Immutable once built. Sockets hold it behind an `Arc` so a bound
/// listener and whoever created the endpoint share one copy.
#[derive(Clone)]
pub struct Endpoint {
	payload: Payload,
	native: RawAddr,
}

impl Endpoint {
	fn from_payload(payload: Payload) -> Self {
		let native = match payload {
			Payload::V4(addr) => {
				let raw = addr.to_raw();
				encode(&raw)
			}
			Payload::V6(addr) => {
				let raw = addr.to_raw();
				encode(&raw)
			}
		};
		Self { payload, native }
	}

	/// Resolves `hostname` with the system resolver, constrained to `family`.
	pub fn from_hostname(hostname: &str, port: u16, family: AddressFamily) -> Result<Self> {
		Self::from_hostname_with(&SystemResolver, hostname, port, family)
	}

	/// Same as [`from_hostname`](Self::from_hostname) with a caller-supplied resolver.
	pub fn from_hostname_with<R: Resolver + ?Sized>(
		resolver: &R,
		hostname: &str,
		port: u16,
		family: AddressFamily,
	) -> Result<Self> {
		if family == AddressFamily::Unknown {
			return Err(Error::invalid_family(family));
		}

		let ips = resolver.resolve(hostname, family).map_err(|code| {
			Error::invalid_address(format!(
				"cannot resolve '{}': {}",
				hostname,
				describe_gai_error(code)
			))
		})?;

		let payload = ips
			.into_iter()
			.find_map(|ip| match (ip, family) {
				(IpAddr::V4(v4), AddressFamily::IPv4) => {
					Some(Payload::V4(SocketAddrV4::new(v4.octets(), port)))
				}
				(IpAddr::V6(v6), AddressFamily::IPv6) => {
					Some(Payload::V6(SocketAddrV6::new(v6.octets(), port)))
				}
				_ => None,
			})
			.ok_or_else(|| {
				Error::invalid_address(format!("no {} record for '{}'", family, hostname))
			})?;

		tracing::trace!(host = hostname, port, family = %family, "resolved endpoint");
		Ok(Self::from_payload(payload))
	}

	/// IPv4 endpoint from raw address bytes (network order).
	///
	/// The "no address" sentinel (255.255.255.255) and the all-zero address
	/// are refused; use [`from_family_any`](Self::from_family_any) for wildcard binds.
	pub fn from_ip(ip: [u8; 4], port: u16) -> Result<Self> {
		if ip == [0xff; 4] || ip == [0; 4] {
			return Err(Error::invalid_address(format!("{} is not a usable address", Ipv4Addr::from(ip))));
		}
		Ok(Self::from_payload(Payload::V4(SocketAddrV4::new(ip, port))))
	}

	/// IPv6 endpoint from raw address bytes. The unspecified address is refused.
	pub fn from_ipv6(ip: [u8; 16], port: u16) -> Result<Self> {
		if ip == [0; 16] {
			return Err(Error::invalid_address("the unspecified address is not usable"));
		}
		Ok(Self::from_payload(Payload::V6(SocketAddrV6::new(ip, port))))
	}

	/// Wildcard ("any") address for server binds.
	pub fn from_family_any(family: AddressFamily, port: u16) -> Result<Self> {
		let payload = match family {
			AddressFamily::IPv4 => Payload::V4(SocketAddrV4::new([0; 4], port)),
			AddressFamily::IPv6 => Payload::V6(SocketAddrV6::new([0; 16], port)),
			AddressFamily::Unknown => return Err(Error::invalid_family(family)),
		};
		Ok(Self::from_payload(payload))
	}

	/// Decodes a native sockaddr.
	///
	/// The length of `raw` must be exactly the structure size implied by its
	/// family tag. An empty slice stands for a null address.
	pub fn from_native(raw: &[u8]) -> Result<Self> {
		if raw.len() < std::mem::size_of::<libc::sa_family_t>() {
			return Err(Error::invalid_address("null or truncated sockaddr"));
		}

		let tag = unsafe { std::ptr::read_unaligned(raw.as_ptr() as *const libc::sa_family_t) };
		let family = AddressFamily::from_native(tag as libc::c_int);
		let expected = family.native_size().ok_or_else(|| Error::invalid_family(family))?;

		if raw.len() != expected {
			return Err(Error::invalid_address(format!(
				"sockaddr size {} does not match {} ({})",
				raw.len(),
				family,
				expected
			)));
		}

		let payload = match family {
			AddressFamily::IPv4 => {
				let sin = unsafe { std::ptr::read_unaligned(raw.as_ptr() as *const libc::sockaddr_in) };
				Payload::V4(SocketAddrV4::from_raw(&sin))
			}
			_ => {
				let sin6 = unsafe { std::ptr::read_unaligned(raw.as_ptr() as *const libc::sockaddr_in6) };
				Payload::V6(SocketAddrV6::from_raw(&sin6))
			}
		};
		Ok(Self::from_payload(payload))
	}

	pub(crate) fn from_raw_addr(raw: &RawAddr) -> Result<Self> {
		Self::from_native(raw.as_bytes())
	}

	/// Parses a literal `ip:port` or `[ipv6]:port`.
	pub fn parse(text: &str) -> Result<Self> {
		let (host, port) = text
			.rsplit_once(':')
			.ok_or_else(|| Error::invalid_address(format!("missing port in '{}'", text)))?;

		let port: i64 = port
			.parse()
			.map_err(|_| EndpointError::InvalidPort { port: -1 })?;
		let port = u16::try_from(port).map_err(|_| EndpointError::InvalidPort { port })?;

		let host = host
			.strip_prefix('[')
			.and_then(|h| h.strip_suffix(']'))
			.unwrap_or(host);
		let ip: IpAddr = host
			.parse()
			.map_err(|_| Error::invalid_address(format!("'{}' is not an IP literal", host)))?;

		let payload = match ip {
			IpAddr::V4(v4) => Payload::V4(SocketAddrV4::new(v4.octets(), port)),
			IpAddr::V6(v6) => Payload::V6(SocketAddrV6::new(v6.octets(), port)),
		};
		Ok(Self::from_payload(payload))
	}

	pub fn address_family(&self) -> AddressFamily {
		match self.payload {
			Payload::V4(_) => AddressFamily::IPv4,
			Payload::V6(_) => AddressFamily::IPv6,
		}
	}

	/// Port in host byte order.
	pub fn port(&self) -> u16 {
		match self.payload {
			Payload::V4(addr) => addr.port(),
			Payload::V6(addr) => addr.port(),
		}
	}

	pub fn ip(&self) -> IpAddr {
		match self.payload {
			Payload::V4(addr) => IpAddr::V4(Ipv4Addr::from(addr.ip())),
			Payload::V6(addr) => IpAddr::V6(Ipv6Addr::from(addr.ip())),
		}
	}

	/// The native sockaddr bytes handed to the kernel.
	pub fn native_address(&self) -> &[u8] {
		self.native.as_bytes()
	}

	/// Always the canonical structure size of the family (16 or 28).
	pub fn native_size(&self) -> usize {
		self.native.len()
	}

	/// Calls `f` with a pointer to the native sockaddr and its size.
	pub(crate) fn with_raw<F, R>(&self, f: F) -> R
	where
		F: FnOnce(*const libc::sockaddr, libc::socklen_t) -> R,
	{
		f(self.native.as_ptr(), self.native.len() as libc::socklen_t)
	}
}

fn encode<T>(raw: &T) -> RawAddr {
	let bytes = unsafe {
		std::slice::from_raw_parts(raw as *const T as *const u8, std::mem::size_of::<T>())
	};
	// sockaddr_in/sockaddr_in6 always fit in sockaddr_storage
	RawAddr::from_bytes(bytes).unwrap_or_else(RawAddr::empty)
}

impl PartialEq for Endpoint {
	fn eq(&self, other: &Self) -> bool {
		self.payload == other.payload
	}
}

impl Eq for Endpoint {}

impl fmt::Debug for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Endpoint")
			.field("family", &self.address_family())
			.field("ip", &self.ip())
			.field("port", &self.port())
			.finish()
	}
}

impl fmt::Display for Endpoint {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self.ip() {
			IpAddr::V4(ip) => write!(f, "{}:{}", ip, self.port()),
			IpAddr::V6(ip) => write!(f, "[{}]:{}", ip, self.port()),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	struct Fixed(Vec<IpAddr>);

	impl Resolver for Fixed {
		fn resolve(&self, _host: &str, _family: AddressFamily) -> std::result::Result<Vec<IpAddr>, i32> {
			Ok(self.0.clone())
		}
	}

	struct Failing;

	impl Resolver for Failing {
		fn resolve(&self, _host: &str, _family: AddressFamily) -> std::result::Result<Vec<IpAddr>, i32> {
			Err(libc::EAI_NONAME)
		}
	}

	#[test]
	fn resolver_records_of_other_family_are_skipped() {
		let resolver = Fixed(vec!["::1".parse().unwrap(), "10.0.0.7".parse().unwrap()]);
		let ep = Endpoint::from_hostname_with(&resolver, "box", 22, AddressFamily::IPv4).unwrap();
		assert_eq!(ep.ip(), "10.0.0.7".parse::<IpAddr>().unwrap());
		assert_eq!(ep.port(), 22);
	}

	#[test]
	fn no_usable_record_is_invalid_address() {
		let resolver = Fixed(vec!["::1".parse().unwrap()]);
		let err = Endpoint::from_hostname_with(&resolver, "box", 22, AddressFamily::IPv4).unwrap_err();
		assert!(matches!(err, Error::Endpoint(EndpointError::InvalidAddress { .. })));
	}

	#[test]
	fn resolver_failure_is_invalid_address() {
		let err = Endpoint::from_hostname_with(&Failing, "nope", 1, AddressFamily::IPv6).unwrap_err();
		assert!(matches!(err, Error::Endpoint(EndpointError::InvalidAddress { .. })));
	}

	#[test]
	fn native_encoding_matches_payload() {
		let ep = Endpoint::from_ip([192, 168, 1, 20], 8080).unwrap();
		let bytes = ep.native_address();
		assert_eq!(bytes.len(), 16);
		assert_eq!(&bytes[2..4], &8080u16.to_be_bytes());
		assert_eq!(&bytes[4..8], &[192, 168, 1, 20]);
	}

	#[test]
	fn display_brackets_ipv6() {
		let ep = Endpoint::parse("[::1]:443").unwrap();
		assert_eq!(ep.to_string(), "[::1]:443");
		assert_eq!(Endpoint::parse("127.0.0.1:80").unwrap().to_string(), "127.0.0.1:80");
	}
}
