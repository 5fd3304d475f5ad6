#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::os::fd::RawFd;
use std::sync::atomic::{AtomicI32, Ordering};
use std::sync::{Arc, Mutex};

use socklane::{Endpoint, RawAddr, SocketCalls, SysResult};

pub const DATA_DIR: &str = concat!(env!("CARGO_MANIFEST_DIR"), "/tests/data");

pub fn data_path(name: &str) -> std::path::PathBuf {
	std::path::Path::new(DATA_DIR).join(name)
}

pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn loopback(port: u16) -> Arc<Endpoint> {
	Arc::new(Endpoint::from_ip([127, 0, 0, 1], port).unwrap())
}

pub fn loopback6(port: u16) -> Arc<Endpoint> {
	Arc::new(Endpoint::from_ipv6(std::net::Ipv6Addr::LOCALHOST.octets(), port).unwrap())
}

/// Scripted socket calls. Descriptors are fake numbers starting at 100;
/// nothing reaches the kernel.
#[derive(Default)]
pub struct MockCalls {
	next_fd: AtomicI32,
	failures: Mutex<HashMap<&'static str, i32>>,
	recv_script: Mutex<VecDeque<SysResult<Vec<u8>>>>,
	peers: Mutex<VecDeque<RawAddr>>,
	sent: Mutex<Vec<u8>>,
	closed: Mutex<Vec<RawFd>>,
}

impl MockCalls {
	pub fn new() -> Arc<Self> {
		Arc::new(Self {
			next_fd: AtomicI32::new(100),
			..Default::default()
		})
	}

	/// Makes every later call to `op` fail with `errno`.
	pub fn fail(&self, op: &'static str, errno: i32) {
		self.failures.lock().unwrap().insert(op, errno);
	}

	pub fn push_recv(&self, data: &[u8]) {
		self.recv_script.lock().unwrap().push_back(Ok(data.to_vec()));
	}

	pub fn push_recv_err(&self, errno: i32) {
		self.recv_script.lock().unwrap().push_back(Err(errno));
	}

	pub fn push_peer(&self, addr: RawAddr) {
		self.peers.lock().unwrap().push_back(addr);
	}

	pub fn sent(&self) -> Vec<u8> {
		self.sent.lock().unwrap().clone()
	}

	pub fn closed(&self) -> Vec<RawFd> {
		self.closed.lock().unwrap().clone()
	}

	fn check(&self, op: &'static str) -> SysResult<()> {
		match self.failures.lock().unwrap().get(op) {
			Some(errno) => Err(*errno),
			None => Ok(()),
		}
	}

	fn fresh_fd(&self) -> RawFd {
		self.next_fd.fetch_add(1, Ordering::SeqCst)
	}
}

impl SocketCalls for MockCalls {
	fn socket(&self, _domain: libc::c_int, _ty: libc::c_int) -> SysResult<RawFd> {
		self.check("socket")?;
		Ok(self.fresh_fd())
	}

	fn bind(&self, _fd: RawFd, _addr: &Endpoint) -> SysResult<()> {
		self.check("bind")
	}

	fn connect(&self, _fd: RawFd, _addr: &Endpoint) -> SysResult<()> {
		self.check("connect")
	}

	fn listen(&self, _fd: RawFd, _backlog: i32) -> SysResult<()> {
		self.check("listen")
	}

	fn accept(&self, _fd: RawFd) -> SysResult<(RawFd, RawAddr)> {
		self.check("accept")?;
		let peer = self.peers.lock().unwrap().pop_front().unwrap_or_else(RawAddr::empty);
		Ok((self.fresh_fd(), peer))
	}

	fn send(&self, _fd: RawFd, buf: &[u8]) -> SysResult<usize> {
		self.check("send")?;
		self.sent.lock().unwrap().extend_from_slice(buf);
		Ok(buf.len())
	}

	fn recv(&self, _fd: RawFd, buf: &mut [u8]) -> SysResult<usize> {
		self.check("recv")?;
		let mut script = self.recv_script.lock().unwrap();
		match script.pop_front() {
			Some(Ok(mut data)) => {
				let n = data.len().min(buf.len());
				buf[..n].copy_from_slice(&data[..n]);
				if n < data.len() {
					script.push_front(Ok(data.split_off(n)));
				}
				Ok(n)
			}
			Some(Err(errno)) => Err(errno),
			None => Ok(0),
		}
	}

	fn send_to(&self, fd: RawFd, buf: &[u8], _addr: &Endpoint) -> SysResult<usize> {
		self.send(fd, buf)
	}

	fn recv_from(&self, fd: RawFd, buf: &mut [u8]) -> SysResult<(usize, RawAddr)> {
		let n = self.recv(fd, buf)?;
		let peer = self.peers.lock().unwrap().pop_front().unwrap_or_else(RawAddr::empty);
		Ok((n, peer))
	}

	fn set_option(&self, _fd: RawFd, _level: libc::c_int, _name: libc::c_int, _value: libc::c_int) -> SysResult<()> {
		self.check("set_option")
	}

	fn get_flags(&self, _fd: RawFd) -> SysResult<libc::c_int> {
		self.check("get_flags")?;
		Ok(0)
	}

	fn set_flags(&self, _fd: RawFd, _flags: libc::c_int) -> SysResult<()> {
		self.check("set_flags")
	}

	fn local_addr(&self, _fd: RawFd) -> SysResult<RawAddr> {
		self.check("local_addr")?;
		Ok(RawAddr::empty())
	}

	fn close(&self, fd: RawFd) -> SysResult<()> {
		self.closed.lock().unwrap().push(fd);
		self.check("close")
	}
}
