use std::ffi::{CStr, CString};
use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use super::AddressFamily;

/// Name resolution primitive used by [`Endpoint::from_hostname`](super::Endpoint::from_hostname).
///
/// Failures are reported as a `getaddrinfo` (`EAI_*`) code.
pub trait Resolver {
	fn resolve(&self, host: &str, family: AddressFamily) -> Result<Vec<IpAddr>, i32>;
}

/// Resolves through the system's `getaddrinfo`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemResolver;

impl Resolver for SystemResolver {
	fn resolve(&self, host: &str, family: AddressFamily) -> Result<Vec<IpAddr>, i32> {
		let c_host = CString::new(host).map_err(|_| libc::EAI_NONAME)?;
		let ai_family = family.to_native().map_err(|_| libc::EAI_FAMILY)?;

		let mut hints: libc::addrinfo = unsafe { std::mem::zeroed() };
		hints.ai_family = ai_family;
		hints.ai_socktype = libc::SOCK_STREAM;

		let mut res: *mut libc::addrinfo = std::ptr::null_mut();
		let rc = unsafe { libc::getaddrinfo(c_host.as_ptr(), std::ptr::null(), &hints, &mut res) };
		if rc != 0 {
			return Err(rc);
		}

		let mut out = Vec::new();
		let mut cur = res;
		while !cur.is_null() {
			let ai = unsafe { &*cur };
			if !ai.ai_addr.is_null() {
				match ai.ai_family {
					libc::AF_INET => {
						let sin = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in) };
						out.push(IpAddr::V4(Ipv4Addr::from(sin.sin_addr.s_addr.to_ne_bytes())));
					}
					libc::AF_INET6 => {
						let sin6 = unsafe { &*(ai.ai_addr as *const libc::sockaddr_in6) };
						out.push(IpAddr::V6(Ipv6Addr::from(sin6.sin6_addr.s6_addr)));
					}
					_ => {}
				}
			}
			cur = ai.ai_next;
		}
		unsafe { libc::freeaddrinfo(res) };

		// getaddrinfo returns one record per socktype/protocol combination
		out.dedup();
		Ok(out)
	}
}

/// Human-readable text for a `getaddrinfo` failure code.
pub fn describe_gai_error(code: i32) -> String {
	let text = unsafe { libc::gai_strerror(code) };
	if text.is_null() {
		return format!("resolver error {}", code);
	}
	unsafe { CStr::from_ptr(text) }.to_string_lossy().into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn localhost_resolves_to_loopback() {
		let ips = SystemResolver.resolve("localhost", AddressFamily::IPv4).unwrap();
		assert!(ips.iter().any(|ip| ip.is_loopback()));
		assert!(ips.iter().all(|ip| ip.is_ipv4()));
	}

	#[test]
	fn interior_nul_is_rejected() {
		assert_eq!(
			SystemResolver.resolve("local\0host", AddressFamily::IPv4),
			Err(libc::EAI_NONAME)
		);
	}

	#[test]
	fn unknown_family_is_rejected() {
		assert_eq!(
			SystemResolver.resolve("localhost", AddressFamily::Unknown),
			Err(libc::EAI_FAMILY)
		);
	}
}
