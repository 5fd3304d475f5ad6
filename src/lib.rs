pub mod addr;
pub mod config;
pub mod socket;
pub mod sys;
pub mod tls;
mod error;

pub use self::error::{errno, EndpointError, Error, RecvError, Result, SendError, SocketError, TlsError};
pub use self::addr::{AddressFamily, Endpoint, RawAddr, Resolver, SystemResolver};
pub use self::config::{ConfigError, RetryConfig, TlsConfig};
pub use self::socket::{Connection, Socket, SocketState, TransportType, UdpPacket, CHUNK_SIZE, MAX_DATAGRAM_SIZE};
pub use self::sys::{SocketCalls, SysResult, System};
pub use self::tls::{TlsContext, TlsErrorCode, TlsMode, TlsSocket};
