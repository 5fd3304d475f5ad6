//! TLS and retry configuration.
//!
//! Everything derives serde so a `[tls]`-style TOML table can be loaded
//! straight into [`TlsConfig`]:
//!
//! ```toml
//! cert_path = "server.pem"
//! key_path = "server.key"
//! server_name = "localhost"
//!
//! [retry]
//! max_attempts = 64
//! backoff_us = 250
//! ```

use std::fs;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rustls::pki_types::{CertificateDer, PrivateKeyDer};
use serde::{Deserialize, Serialize};

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
	#[error("cannot read {path:?}: {source}")]
	Io { path: PathBuf, source: std::io::Error },

	#[error("parse error: {0}")]
	Parse(#[from] toml::de::Error),

	#[error("validation failed: {0}")]
	Validation(&'static str),

	#[error("bad PEM in {path:?}: {reason}")]
	Pem { path: PathBuf, reason: String },
}

/// Bound on the TLS receive loop's would-block retries.
///
/// Only reachable once the caller has switched the socket to non-blocking
/// mode; a blocking descriptor never reports would-block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
	/// Consecutive would-block results tolerated before giving up.
	pub max_attempts: u32,
	/// Sleep between attempts, in microseconds. 0 only yields.
	pub backoff_us: u64,
}

impl Default for RetryConfig {
	fn default() -> Self {
		Self {
			max_attempts: 1024,
			backoff_us: 100,
		}
	}
}

impl RetryConfig {
	pub(crate) fn pause(&self) {
		if self.backoff_us == 0 {
			std::thread::yield_now();
		} else {
			std::thread::sleep(Duration::from_micros(self.backoff_us));
		}
	}
}

/// TLS context configuration.
///
/// A server needs `cert_path` + `key_path` to complete handshakes; a client
/// trusts the roots in `ca_path`. `server_name` overrides the name the client
/// verifies, which otherwise is the IP of the endpoint it connects to.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct TlsConfig {
	pub cert_path: Option<PathBuf>,
	pub key_path: Option<PathBuf>,
	pub ca_path: Option<PathBuf>,
	pub server_name: Option<String>,
	pub retry: RetryConfig,
}

impl TlsConfig {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn identity(mut self, cert_path: impl Into<PathBuf>, key_path: impl Into<PathBuf>) -> Self {
		self.cert_path = Some(cert_path.into());
		self.key_path = Some(key_path.into());
		self
	}

	pub fn ca(mut self, ca_path: impl Into<PathBuf>) -> Self {
		self.ca_path = Some(ca_path.into());
		self
	}

	pub fn server_name(mut self, name: impl Into<String>) -> Self {
		self.server_name = Some(name.into());
		self
	}

	pub fn retry(mut self, retry: RetryConfig) -> Self {
		self.retry = retry;
		self
	}

	/// Parse and validate a TOML document.
	pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
		let config: TlsConfig = toml::from_str(content)?;
		config.validate()?;
		Ok(config)
	}

	/// Load and validate configuration from a TOML file.
	pub fn load(path: &Path) -> Result<Self, ConfigError> {
		let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
			path: path.to_path_buf(),
			source,
		})?;
		Self::from_toml_str(&content)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		match (&self.cert_path, &self.key_path) {
			(Some(_), None) => return Err(ConfigError::Validation("cert_path requires key_path")),
			(None, Some(_)) => return Err(ConfigError::Validation("key_path requires cert_path")),
			_ => {}
		}
		if self.retry.max_attempts == 0 {
			return Err(ConfigError::Validation("retry.max_attempts must be at least 1"));
		}
		if matches!(&self.server_name, Some(name) if name.is_empty()) {
			return Err(ConfigError::Validation("server_name must not be empty"));
		}
		Ok(())
	}
}

fn open_pem(path: &Path) -> Result<BufReader<fs::File>, ConfigError> {
	let file = fs::File::open(path).map_err(|source| ConfigError::Io {
		path: path.to_path_buf(),
		source,
	})?;
	Ok(BufReader::new(file))
}

/// Reads every certificate in a PEM file.
pub(crate) fn load_certs(path: &Path) -> Result<Vec<CertificateDer<'static>>, ConfigError> {
	let mut reader = open_pem(path)?;
	let certs = rustls_pemfile::certs(&mut reader)
		.collect::<Result<Vec<_>, _>>()
		.map_err(|e| ConfigError::Pem { path: path.to_path_buf(), reason: e.to_string() })?;
	if certs.is_empty() {
		return Err(ConfigError::Pem {
			path: path.to_path_buf(),
			reason: "no certificates found".into(),
		});
	}
	Ok(certs)
}

/// Reads the first private key in a PEM file.
pub(crate) fn load_key(path: &Path) -> Result<PrivateKeyDer<'static>, ConfigError> {
	let mut reader = open_pem(path)?;
	rustls_pemfile::private_key(&mut reader)
		.map_err(|e| ConfigError::Pem { path: path.to_path_buf(), reason: e.to_string() })?
		.ok_or_else(|| ConfigError::Pem {
			path: path.to_path_buf(),
			reason: "no private key found".into(),
		})
}
