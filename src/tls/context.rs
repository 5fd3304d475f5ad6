use std::sync::Arc;

use rustls::crypto::CryptoProvider;
use rustls::pki_types::ServerName;
use rustls::server::{ClientHello, ResolvesServerCert};
use rustls::sign::CertifiedKey;
use rustls::{ClientConfig, RootCertStore, ServerConfig};

use crate::addr::Endpoint;
use crate::config::{load_certs, load_key, TlsConfig};
use crate::error::{Result, TlsError};
use super::session::TlsSession;
use super::TlsMode;

/// Stands in for a missing server identity: every handshake is refused.
#[derive(Debug)]
struct NoIdentity;

impl ResolvesServerCert for NoIdentity {
	fn resolve(&self, _hello: ClientHello<'_>) -> Option<Arc<CertifiedKey>> {
		None
	}
}

#[derive(Clone)]
enum Engine {
	Client(Arc<ClientConfig>),
	Server(Arc<ServerConfig>),
}

/// Process-side TLS configuration for one mode.
///
/// Cloning is cheap: sockets accepted from a TLS listener share the
/// listener's context.
#[derive(Clone)]
pub struct TlsContext {
	engine: Engine,
	config: TlsConfig,
}

fn context_error(reason: impl ToString) -> TlsError {
	TlsError::Context { reason: reason.to_string() }
}

impl TlsContext {
	pub fn new(mode: TlsMode, config: &TlsConfig) -> Result<Self> {
		config.validate().map_err(context_error)?;
		let provider = Arc::new(rustls::crypto::ring::default_provider());

		let engine = match mode {
			TlsMode::Client => Engine::Client(Arc::new(client_config(provider, config)?)),
			TlsMode::Server => Engine::Server(Arc::new(server_config(provider, config)?)),
		};
		tracing::debug!(mode = %mode, "TLS context created");

		Ok(Self { engine, config: config.clone() })
	}

	pub fn mode(&self) -> TlsMode {
		match self.engine {
			Engine::Client(_) => TlsMode::Client,
			Engine::Server(_) => TlsMode::Server,
		}
	}

	pub fn config(&self) -> &TlsConfig {
		&self.config
	}

	/// Starts a fresh session. Clients verify against `server_name` when
	/// configured, else against `peer`'s IP.
	pub(crate) fn new_session(&self, peer: Option<&Endpoint>) -> Result<TlsSession> {
		let session = match &self.engine {
			Engine::Client(cfg) => {
				let name = match (&self.config.server_name, peer) {
					(Some(name), _) => ServerName::try_from(name.clone()).map_err(context_error)?,
					(None, Some(peer)) => ServerName::from(peer.ip()),
					(None, None) => ServerName::try_from("localhost").map_err(context_error)?,
				};
				TlsSession::client(Arc::clone(cfg), name)
			}
			Engine::Server(cfg) => TlsSession::server(Arc::clone(cfg)),
		};
		Ok(session.map_err(context_error)?)
	}
}

fn client_config(provider: Arc<CryptoProvider>, config: &TlsConfig) -> Result<ClientConfig> {
	let mut roots = RootCertStore::empty();
	if let Some(ca) = &config.ca_path {
		for cert in load_certs(ca).map_err(context_error)? {
			roots.add(cert).map_err(context_error)?;
		}
	}

	let client = ClientConfig::builder_with_provider(provider)
		.with_safe_default_protocol_versions()
		.map_err(context_error)?
		.with_root_certificates(roots)
		.with_no_client_auth();
	Ok(client)
}

fn server_config(provider: Arc<CryptoProvider>, config: &TlsConfig) -> Result<ServerConfig> {
	let builder = ServerConfig::builder_with_provider(provider)
		.with_safe_default_protocol_versions()
		.map_err(context_error)?
		.with_no_client_auth();

	let server = match (&config.cert_path, &config.key_path) {
		(Some(cert), Some(key)) => {
			let chain = load_certs(cert).map_err(context_error)?;
			let key = load_key(key).map_err(context_error)?;
			builder.with_single_cert(chain, key).map_err(context_error)?
		}
		_ => {
			tracing::warn!("TLS server context has no identity; handshakes will fail");
			builder.with_cert_resolver(Arc::new(NoIdentity))
		}
	};
	Ok(server)
}

impl std::fmt::Debug for TlsContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("TlsContext")
			.field("mode", &self.mode())
			.field("config", &self.config)
			.finish()
	}
}
