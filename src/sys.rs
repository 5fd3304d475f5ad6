//! The primitive socket calls, behind a trait.
//!
//! Every `Socket` talks to the kernel through a [`SocketCalls`] object.
//! Production code uses [`System`]; tests hand in their own implementation
//! to script failures without touching real descriptors.

use std::os::fd::RawFd;
use std::sync::Arc;

use crate::addr::{Endpoint, RawAddr};
use crate::error::errno;

/// Result of a primitive call: the value, or the errno it failed with.
pub type SysResult<T> = Result<T, i32>;

pub trait SocketCalls: Send + Sync {
	fn socket(&self, domain: libc::c_int, ty: libc::c_int) -> SysResult<RawFd>;

	fn bind(&self, fd: RawFd, addr: &Endpoint) -> SysResult<()>;

	fn connect(&self, fd: RawFd, addr: &Endpoint) -> SysResult<()>;

	fn listen(&self, fd: RawFd, backlog: i32) -> SysResult<()>;

	/// Returns the new descriptor and the peer's address.
	fn accept(&self, fd: RawFd) -> SysResult<(RawFd, RawAddr)>;

	fn send(&self, fd: RawFd, buf: &[u8]) -> SysResult<usize>;

	fn recv(&self, fd: RawFd, buf: &mut [u8]) -> SysResult<usize>;

	fn send_to(&self, fd: RawFd, buf: &[u8], addr: &Endpoint) -> SysResult<usize>;

	fn recv_from(&self, fd: RawFd, buf: &mut [u8]) -> SysResult<(usize, RawAddr)>;

	fn set_option(&self, fd: RawFd, level: libc::c_int, name: libc::c_int, value: libc::c_int) -> SysResult<()>;

	/// `fcntl(F_GETFL)`.
	fn get_flags(&self, fd: RawFd) -> SysResult<libc::c_int>;

	/// `fcntl(F_SETFL)`.
	fn set_flags(&self, fd: RawFd, flags: libc::c_int) -> SysResult<()>;

	/// `getsockname`.
	fn local_addr(&self, fd: RawFd) -> SysResult<RawAddr>;

	fn close(&self, fd: RawFd) -> SysResult<()>;
}

/// The real thing: straight libc calls.
#[derive(Debug, Default, Clone, Copy)]
pub struct System;

impl System {
	pub fn shared() -> Arc<dyn SocketCalls> {
		Arc::new(System)
	}
}

#[inline]
fn check(result: libc::c_int) -> SysResult<()> {
	if result == -1 { Err(errno()) } else { Ok(()) }
}

#[inline]
fn check_len(result: libc::ssize_t) -> SysResult<usize> {
	if result < 0 { Err(errno()) } else { Ok(result as usize) }
}

impl SocketCalls for System {
	fn socket(&self, domain: libc::c_int, ty: libc::c_int) -> SysResult<RawFd> {
		let fd = unsafe { libc::socket(domain, ty | libc::SOCK_CLOEXEC, 0) };
		if fd == -1 { Err(errno()) } else { Ok(fd) }
	}

	fn bind(&self, fd: RawFd, addr: &Endpoint) -> SysResult<()> {
		check(addr.with_raw(|ptr, len| unsafe { libc::bind(fd, ptr, len) }))
	}

	fn connect(&self, fd: RawFd, addr: &Endpoint) -> SysResult<()> {
		check(addr.with_raw(|ptr, len| unsafe { libc::connect(fd, ptr, len) }))
	}

	fn listen(&self, fd: RawFd, backlog: i32) -> SysResult<()> {
		check(unsafe { libc::listen(fd, backlog) })
	}

	fn accept(&self, fd: RawFd) -> SysResult<(RawFd, RawAddr)> {
		let mut peer = RawAddr::empty();
		let (ptr, len) = peer.as_mut_parts();
		let client = unsafe { libc::accept4(fd, ptr, len, libc::SOCK_CLOEXEC) };
		if client == -1 {
			return Err(errno());
		}
		Ok((client, peer))
	}

	fn send(&self, fd: RawFd, buf: &[u8]) -> SysResult<usize> {
		// MSG_NOSIGNAL: a vanished peer is EPIPE, not SIGPIPE
		check_len(unsafe {
			libc::send(fd, buf.as_ptr() as *const libc::c_void, buf.len(), libc::MSG_NOSIGNAL)
		})
	}

	fn recv(&self, fd: RawFd, buf: &mut [u8]) -> SysResult<usize> {
		check_len(unsafe { libc::recv(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0) })
	}

	fn send_to(&self, fd: RawFd, buf: &[u8], addr: &Endpoint) -> SysResult<usize> {
		check_len(addr.with_raw(|ptr, len| unsafe {
			libc::sendto(
				fd,
				buf.as_ptr() as *const libc::c_void,
				buf.len(),
				libc::MSG_NOSIGNAL,
				ptr,
				len,
			)
		}))
	}

	fn recv_from(&self, fd: RawFd, buf: &mut [u8]) -> SysResult<(usize, RawAddr)> {
		let mut sender = RawAddr::empty();
		let (ptr, len) = sender.as_mut_parts();
		let n = check_len(unsafe {
			libc::recvfrom(fd, buf.as_mut_ptr() as *mut libc::c_void, buf.len(), 0, ptr, len)
		})?;
		Ok((n, sender))
	}

	fn set_option(&self, fd: RawFd, level: libc::c_int, name: libc::c_int, value: libc::c_int) -> SysResult<()> {
		check(unsafe {
			libc::setsockopt(
				fd,
				level,
				name,
				&value as *const _ as *const libc::c_void,
				std::mem::size_of::<libc::c_int>() as libc::socklen_t,
			)
		})
	}

	fn get_flags(&self, fd: RawFd) -> SysResult<libc::c_int> {
		let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
		if flags == -1 { Err(errno()) } else { Ok(flags) }
	}

	fn set_flags(&self, fd: RawFd, flags: libc::c_int) -> SysResult<()> {
		check(unsafe { libc::fcntl(fd, libc::F_SETFL, flags) })
	}

	fn local_addr(&self, fd: RawFd) -> SysResult<RawAddr> {
		let mut local = RawAddr::empty();
		let (ptr, len) = local.as_mut_parts();
		check(unsafe { libc::getsockname(fd, ptr, len) })?;
		Ok(local)
	}

	fn close(&self, fd: RawFd) -> SysResult<()> {
		check(unsafe { libc::close(fd) })
	}
}
