//! Addresses and address families.
//!
//! - `AddressFamily` : IPv4 / IPv6 tag plus its native codec
//! - `Endpoint` : an immutable, resolved transport address
//! - `RawAddr` : a native sockaddr as returned by the kernel
//! - `Resolver` : the name lookup primitive behind `Endpoint::from_hostname`

mod endpoint;
mod family;
mod ipv4;
mod ipv6;
mod raw;
mod resolve;

pub use self::endpoint::Endpoint;
pub use self::family::AddressFamily;
pub use self::raw::RawAddr;
pub use self::resolve::{describe_gai_error, Resolver, SystemResolver};

pub(crate) use self::ipv4::SocketAddrV4;
pub(crate) use self::ipv6::SocketAddrV6;

/*
The kernel takes a `*const sockaddr` plus a length, and the structure behind
the pointer depends on the family:

  ┌────────┬──────────────┬──────┐
  │ Family │ Structure    │ Size │
  ├────────┼──────────────┼──────┤
  │ IPv4   │ sockaddr_in  │ 16   │
  │ IPv6   │ sockaddr_in6 │ 28   │
  └────────┴──────────────┴──────┘

Endpoint keeps a typed payload (SocketAddrV4 / SocketAddrV6) for reading and
the encoded native bytes for syscalls, so both views are always in sync.
*/
