//! The chunked, auto-growing receive loop shared by plain and TLS sockets.

use crate::config::RetryConfig;
use crate::error::RecvError;

/// Bytes asked of the transport per read.
pub const CHUNK_SIZE: usize = 1024;

/// Outcome of one transport read.
pub(crate) enum Chunk {
	/// `n` bytes landed in the slice. 0 means the peer closed.
	Data(usize),
	/// Orderly end of stream signalled out of band (TLS close_notify).
	Closed,
	/// Transient condition; the same read should be issued again.
	Retry,
}

/// Fills `buf` chunk by chunk using `read`.
///
/// With `autoresize` the buffer starts at one chunk, doubles whenever free
/// space drops below half its length, and is truncated to the received
/// length at the end. Without it, reading stops once `buf` is full.
///
/// The loop ends on a short read, a zero-length read, or a full fixed-size
/// buffer. Consecutive `Retry` results are bounded by `retry`.
pub(crate) fn receive_chunked<F>(
	buf: &mut Vec<u8>,
	autoresize: bool,
	retry: &RetryConfig,
	read: F,
) -> Result<usize, RecvError>
where
	F: FnMut(&mut [u8]) -> Result<Chunk, RecvError>,
{
	if autoresize {
		buf.clear();
		buf.resize(CHUNK_SIZE, 0);
	}

	let mut total = 0;
	let outcome = fill(buf, autoresize, retry, read, &mut total);

	if autoresize {
		buf.truncate(total);
	}
	outcome.map(|()| total)
}

fn fill<F>(
	buf: &mut Vec<u8>,
	autoresize: bool,
	retry: &RetryConfig,
	mut read: F,
	total: &mut usize,
) -> Result<(), RecvError>
where
	F: FnMut(&mut [u8]) -> Result<Chunk, RecvError>,
{
	let mut retries = 0u32;

	loop {
		let free = buf.len() - *total;
		if free == 0 {
			// only reachable for fixed-size buffers
			return Ok(());
		}

		let want = free.min(CHUNK_SIZE);
		let n = match read(&mut buf[*total..*total + want])? {
			Chunk::Data(n) => n,
			Chunk::Closed => return Ok(()),
			Chunk::Retry => {
				retries += 1;
				if retries >= retry.max_attempts {
					return Err(RecvError::RetryLimit { attempts: retries });
				}
				retry.pause();
				continue;
			}
		};
		retries = 0;

		if n == 0 {
			return Ok(());
		}
		*total += n;
		tracing::trace!(received = n, total = *total, capacity = buf.len(), "chunk");

		if n < want {
			return Ok(());
		}

		if autoresize && buf.len() - *total < buf.len() / 2 {
			let grown = buf.len() * 2;
			buf.resize(grown, 0);
		}
	}
}
