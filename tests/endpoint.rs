use std::net::{IpAddr, Ipv4Addr, Ipv6Addr};

use socklane::{AddressFamily, Endpoint, EndpointError, Error, Resolver};

struct Table(Vec<IpAddr>);

impl Resolver for Table {
	fn resolve(&self, _host: &str, _family: AddressFamily) -> Result<Vec<IpAddr>, i32> {
		Ok(self.0.clone())
	}
}

#[test]
fn ipv4_native_form_is_sockaddr_in() {
	let ep = Endpoint::from_ip([192, 168, 1, 20], 8080).unwrap();
	assert_eq!(ep.address_family(), AddressFamily::IPv4);
	assert_eq!(ep.native_size(), 16);
	assert_eq!(ep.port(), 8080);
	assert_eq!(ep.ip(), IpAddr::V4(Ipv4Addr::new(192, 168, 1, 20)));
	assert_eq!(ep.to_string(), "192.168.1.20:8080");

	let bytes = ep.native_address();
	assert_eq!(bytes.len(), 16);
	// port is stored big-endian after the family tag
	assert_eq!(&bytes[2..4], &8080u16.to_be_bytes());
	assert_eq!(&bytes[4..8], &[192, 168, 1, 20]);
}

#[test]
fn ipv6_native_form_is_sockaddr_in6() {
	let ep = Endpoint::from_ipv6(Ipv6Addr::LOCALHOST.octets(), 443).unwrap();
	assert_eq!(ep.address_family(), AddressFamily::IPv6);
	assert_eq!(ep.native_size(), 28);
	assert_eq!(ep.to_string(), "[::1]:443");
}

#[test]
fn sentinel_addresses_are_rejected() {
	assert!(Endpoint::from_ip([255, 255, 255, 255], 80).unwrap_err().is_endpoint());
	assert!(Endpoint::from_ip([0, 0, 0, 0], 80).unwrap_err().is_endpoint());
	assert!(Endpoint::from_ipv6([0; 16], 80).unwrap_err().is_endpoint());
}

#[test]
fn wildcard_endpoints() {
	let v4 = Endpoint::from_family_any(AddressFamily::IPv4, 53).unwrap();
	assert_eq!(v4.ip(), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
	assert_eq!(v4.port(), 53);

	let v6 = Endpoint::from_family_any(AddressFamily::IPv6, 53).unwrap();
	assert_eq!(v6.native_size(), 28);

	let err = Endpoint::from_family_any(AddressFamily::Unknown, 53).unwrap_err();
	assert!(matches!(
		err,
		Error::Endpoint(EndpointError::InvalidAddressFamily { family: AddressFamily::Unknown })
	));
}

#[test]
fn hostname_resolution() {
	let ep = Endpoint::from_hostname("localhost", 8000, AddressFamily::IPv4).unwrap();
	assert_eq!(ep.ip(), IpAddr::V4(Ipv4Addr::LOCALHOST));
	assert_eq!(ep.port(), 8000);

	let err = Endpoint::from_hostname("localhost", 8000, AddressFamily::Unknown).unwrap_err();
	assert!(err.is_endpoint());

	let err = Endpoint::from_hostname("no-such-host.invalid", 8000, AddressFamily::IPv4).unwrap_err();
	assert!(err.is_endpoint());
	assert!(err.to_string().contains("no-such-host.invalid"));
}

#[test]
fn resolver_results_are_filtered_by_family() {
	let table = Table(vec![IpAddr::V6(Ipv6Addr::LOCALHOST), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7))]);

	let ep = Endpoint::from_hostname_with(&table, "db", 5432, AddressFamily::IPv4).unwrap();
	assert_eq!(ep.ip(), IpAddr::V4(Ipv4Addr::new(10, 0, 0, 7)));

	let only_v6 = Table(vec![IpAddr::V6(Ipv6Addr::LOCALHOST)]);
	let err = Endpoint::from_hostname_with(&only_v6, "db", 5432, AddressFamily::IPv4).unwrap_err();
	assert!(err.is_endpoint());
}

#[test]
fn native_decoding_checks_tag_and_size() {
	let ep = Endpoint::from_ip([127, 0, 0, 1], 9).unwrap();
	let decoded = Endpoint::from_native(ep.native_address()).unwrap();
	assert_eq!(decoded, ep);

	assert!(Endpoint::from_native(&[]).unwrap_err().is_endpoint());

	let err = Endpoint::from_native(&ep.native_address()[..12]).unwrap_err();
	assert!(matches!(err, Error::Endpoint(EndpointError::InvalidAddress { .. })));

	let mut unix = vec![0u8; 16];
	unix[..2].copy_from_slice(&(libc::AF_UNIX as libc::sa_family_t).to_ne_bytes());
	let err = Endpoint::from_native(&unix).unwrap_err();
	assert!(matches!(err, Error::Endpoint(EndpointError::InvalidAddressFamily { .. })));
}

#[test]
fn parse_literals() {
	let ep = Endpoint::parse("127.0.0.1:8080").unwrap();
	assert_eq!(ep, Endpoint::from_ip([127, 0, 0, 1], 8080).unwrap());

	let ep = Endpoint::parse("[::1]:22").unwrap();
	assert_eq!(ep.address_family(), AddressFamily::IPv6);
	assert_eq!(ep.port(), 22);

	let err = Endpoint::parse("127.0.0.1:70000").unwrap_err();
	assert!(matches!(err, Error::Endpoint(EndpointError::InvalidPort { port: 70000 })));

	let err = Endpoint::parse("127.0.0.1:http").unwrap_err();
	assert!(matches!(err, Error::Endpoint(EndpointError::InvalidPort { port: -1 })));

	assert!(Endpoint::parse("localhost:80").unwrap_err().is_endpoint());
	assert!(Endpoint::parse("127.0.0.1").unwrap_err().is_endpoint());
}

#[test]
fn family_codecs() {
	assert_eq!(AddressFamily::IPv4.to_native().unwrap(), libc::AF_INET);
	assert_eq!(AddressFamily::from_native(libc::AF_INET6), AddressFamily::IPv6);
	assert_eq!(AddressFamily::from_native(libc::AF_UNIX), AddressFamily::Unknown);
	assert!(AddressFamily::Unknown.to_native().unwrap_err().is_endpoint());
	assert_eq!("AF_INET6".parse::<AddressFamily>().unwrap(), AddressFamily::IPv6);
	assert_eq!(AddressFamily::IPv4.to_string(), "AF_INET");
}
