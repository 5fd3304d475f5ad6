use std::fmt;

/// A native socket address as the kernel hands it over: storage plus the
/// length actually written.
///
/// This is what crosses the [`SocketCalls`](crate::sys::SocketCalls) seam
/// for `accept`, `recvfrom` and `getsockname`.
#[derive(Clone, Copy)]
pub struct RawAddr {
	storage: libc::sockaddr_storage,
	len: libc::socklen_t,
}

impl RawAddr {
	/// Zeroed storage with the full capacity available, ready to be filled
	/// by a syscall.
	pub fn empty() -> Self {
		Self {
			storage: unsafe { std::mem::zeroed() },
			len: std::mem::size_of::<libc::sockaddr_storage>() as libc::socklen_t,
		}
	}

	/// Copies `bytes` into fresh storage. Returns None if they do not fit.
	pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
		let mut raw = Self::empty();
		if bytes.len() > std::mem::size_of::<libc::sockaddr_storage>() {
			return None;
		}
		unsafe {
			std::ptr::copy_nonoverlapping(
				bytes.as_ptr(),
				&mut raw.storage as *mut _ as *mut u8,
				bytes.len(),
			);
		}
		raw.len = bytes.len() as libc::socklen_t;
		Some(raw)
	}

	/// The valid prefix of the storage.
	pub fn as_bytes(&self) -> &[u8] {
		let len = (self.len as usize).min(std::mem::size_of::<libc::sockaddr_storage>());
		unsafe { std::slice::from_raw_parts(&self.storage as *const _ as *const u8, len) }
	}

	pub fn len(&self) -> usize {
		self.len as usize
	}

	pub fn is_empty(&self) -> bool {
		self.len == 0
	}

	pub(crate) fn as_ptr(&self) -> *const libc::sockaddr {
		&self.storage as *const _ as *const libc::sockaddr
	}

	/// Pointer/length pair for syscalls that write an address back.
	pub(crate) fn as_mut_parts(&mut self) -> (*mut libc::sockaddr, *mut libc::socklen_t) {
		(&mut self.storage as *mut _ as *mut libc::sockaddr, &mut self.len)
	}
}

impl fmt::Debug for RawAddr {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("RawAddr")
			.field("family", &self.storage.ss_family)
			.field("len", &self.len)
			.finish()
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn from_bytes_keeps_length() {
		let raw = RawAddr::from_bytes(&[2, 0, 0, 80]).unwrap();
		assert_eq!(raw.len(), 4);
		assert_eq!(raw.as_bytes(), &[2, 0, 0, 80]);
	}

	#[test]
	fn oversized_input_is_rejected() {
		let big = vec![0u8; std::mem::size_of::<libc::sockaddr_storage>() + 1];
		assert!(RawAddr::from_bytes(&big).is_none());
	}
}
