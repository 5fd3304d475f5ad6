use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// Address family of an endpoint or socket.
///
/// `Unknown` only appears as the result of decoding something we do not
/// support; it is rejected wherever a native value is needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AddressFamily {
	IPv4,
	IPv6,
	Unknown,
}

/*
  ┌──────────┬──────────┬───────────────┐
  │ Variant  │ Constant │ Value (Linux) │
  ├──────────┼──────────┼───────────────┤
  │ IPv4     │ AF_INET  │ 2             │
  │ IPv6     │ AF_INET6 │ 10            │
  │ Unknown  │ AF_UNSPEC│ 0 (rejected)  │
  └──────────┴──────────┴───────────────┘
*/

impl AddressFamily {
	/// Returns the libc constant for this address family.
	pub fn to_native(self) -> Result<libc::c_int> {
		match self {
			AddressFamily::IPv4 => Ok(libc::AF_INET),
			AddressFamily::IPv6 => Ok(libc::AF_INET6),
			AddressFamily::Unknown => Err(Error::invalid_family(self)),
		}
	}

	/// Decodes a libc `AF_*` value. Anything else is `Unknown`.
	pub fn from_native(raw: libc::c_int) -> Self {
		match raw {
			libc::AF_INET => AddressFamily::IPv4,
			libc::AF_INET6 => AddressFamily::IPv6,
			_ => AddressFamily::Unknown,
		}
	}

	/// Size of the native sockaddr structure for this family.
	pub fn native_size(self) -> Option<usize> {
		match self {
			AddressFamily::IPv4 => Some(std::mem::size_of::<libc::sockaddr_in>()),
			AddressFamily::IPv6 => Some(std::mem::size_of::<libc::sockaddr_in6>()),
			AddressFamily::Unknown => None,
		}
	}

	pub fn as_str(self) -> &'static str {
		match self {
			AddressFamily::IPv4 => "AF_INET",
			AddressFamily::IPv6 => "AF_INET6",
			AddressFamily::Unknown => "AF_UNSPEC",
		}
	}
}

impl fmt::Display for AddressFamily {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

impl FromStr for AddressFamily {
	type Err = std::convert::Infallible;

	/// Unrecognised names decode to `Unknown` rather than failing.
	fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
		Ok(match s {
			"AF_INET" | "IPv4" => AddressFamily::IPv4,
			"AF_INET6" | "IPv6" => AddressFamily::IPv6,
			_ => AddressFamily::Unknown,
		})
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn native_round_trip() {
		for family in [AddressFamily::IPv4, AddressFamily::IPv6] {
			let raw = family.to_native().unwrap();
			assert_eq!(AddressFamily::from_native(raw), family);
		}
		assert_eq!(AddressFamily::from_native(libc::AF_UNIX), AddressFamily::Unknown);
	}

	#[test]
	fn unknown_has_no_native_value() {
		let err = AddressFamily::Unknown.to_native().unwrap_err();
		assert!(err.is_endpoint());
		assert_eq!(AddressFamily::Unknown.native_size(), None);
	}

	#[test]
	fn canonical_sizes() {
		assert_eq!(AddressFamily::IPv4.native_size(), Some(16));
		assert_eq!(AddressFamily::IPv6.native_size(), Some(28));
	}

	#[test]
	fn string_codec() {
		assert_eq!("AF_INET6".parse::<AddressFamily>().unwrap(), AddressFamily::IPv6);
		assert_eq!("AF_APPLETALK".parse::<AddressFamily>().unwrap(), AddressFamily::Unknown);
		assert_eq!(AddressFamily::IPv4.to_string(), "AF_INET");
	}
}
