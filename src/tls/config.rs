//! TLS configuration
//!
//! This module provides OpenSSL context builders for both client and server
//! engines.

use super::engine::TlsRecordLayer;
use super::TlsError;
use crate::legacy::wire::{Transport, Wire};
use openssl::pkey::PKey;
use openssl::ssl::{SslContext, SslContextBuilder, SslMethod, SslVerifyMode, SslVersion};
use openssl::x509::X509;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

/// TLS version
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum TlsVersion {
    /// TLS 1.2
    Tls12,
    /// TLS 1.3
    Tls13,
}

impl TlsVersion {
    /// Get OpenSSL protocol version constant
    pub fn to_openssl_version(self) -> SslVersion {
        match self {
            TlsVersion::Tls12 => SslVersion::TLS1_2,
            TlsVersion::Tls13 => SslVersion::TLS1_3,
        }
    }

    /// Get version as string
    pub fn as_str(&self) -> &'static str {
        match self {
            TlsVersion::Tls12 => "TLSv1.2",
            TlsVersion::Tls13 => "TLSv1.3",
        }
    }
}

impl FromStr for TlsVersion {
    type Err = TlsError;

    /// Parse TLS version from string (case-insensitive)
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "TLSV1.2" | "TLS1.2" => Ok(TlsVersion::Tls12),
            "TLSV1.3" | "TLS1.3" => Ok(TlsVersion::Tls13),
            _ => Err(TlsError::InvalidVersion(s.to_string())),
        }
    }
}

/// Client certificate verification mode (server-side)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientVerify {
    /// Don't request client certificates
    None,
    /// Request client certificate but don't require it
    Optional,
    /// Require client certificate
    Required,
}

/// TLS configuration (immutable after building)
#[derive(Clone)]
pub struct TlsConfig {
    pub(crate) ctx: SslContext,
    pub(crate) is_server: bool,
    pub(crate) servername: Option<String>,
}

impl TlsConfig {
    /// Create a new client configuration builder
    pub fn client() -> Result<ClientConfigBuilder, TlsError> {
        ClientConfigBuilder::new()
    }

    /// Create a new server configuration builder
    pub fn server() -> Result<ServerConfigBuilder, TlsError> {
        ServerConfigBuilder::new()
    }

    pub fn is_server(&self) -> bool {
        self.is_server
    }

    pub fn servername(&self) -> Option<&str> {
        self.servername.as_deref()
    }

    /// Create a record-layer engine pulling through `wire`
    pub fn engine<T: Transport>(&self, wire: Wire<T>) -> Result<TlsRecordLayer<T>, TlsError> {
        TlsRecordLayer::new(self, wire)
    }
}

fn set_version_range(
    builder: &mut SslContextBuilder,
    min: TlsVersion,
    max: TlsVersion,
) -> Result<(), TlsError> {
    if min > max {
        return Err(TlsError::InvalidConfig(format!(
            "minimum version {} above maximum {}",
            min.as_str(),
            max.as_str()
        )));
    }
    builder.set_min_proto_version(Some(min.to_openssl_version()))?;
    builder.set_max_proto_version(Some(max.to_openssl_version()))?;
    Ok(())
}

/// Load a certificate and its private key from one PEM bundle
fn load_cert_bundle(builder: &mut SslContextBuilder, pem: &[u8]) -> Result<(), TlsError> {
    let cert = X509::from_pem(pem)
        .map_err(|e| TlsError::Certificate(format!("Failed to load certificate: {}", e)))?;
    builder.set_certificate(&cert)?;

    let key = PKey::private_key_from_pem(pem)
        .map_err(|e| TlsError::Certificate(format!("Failed to load private key: {}", e)))?;
    builder.set_private_key(&key)?;
    builder.check_private_key()?;
    Ok(())
}

fn read_pem<P: AsRef<Path>>(path: P) -> Result<Vec<u8>, TlsError> {
    let mut pem = Vec::new();
    File::open(path.as_ref())?.read_to_end(&mut pem)?;
    Ok(pem)
}

/// Client configuration builder
pub struct ClientConfigBuilder {
    ctx_builder: SslContextBuilder,
    servername: Option<String>,
}

impl ClientConfigBuilder {
    fn new() -> Result<Self, TlsError> {
        let mut ctx_builder = SslContextBuilder::new(SslMethod::tls_client())?;

        // Default: don't verify peer (for testing)
        ctx_builder.set_verify(SslVerifyMode::NONE);

        Ok(ClientConfigBuilder {
            ctx_builder,
            servername: None,
        })
    }

    /// Set TLS version (both min and max)
    pub fn version(mut self, version: TlsVersion) -> Result<Self, TlsError> {
        set_version_range(&mut self.ctx_builder, version, version)?;
        Ok(self)
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Result<Self, TlsError> {
        set_version_range(&mut self.ctx_builder, min, max)?;
        Ok(self)
    }

    /// Set cipher list (for TLS 1.2)
    pub fn cipher_list(mut self, ciphers: &str) -> Result<Self, TlsError> {
        self.ctx_builder.set_cipher_list(ciphers)?;
        Ok(self)
    }

    /// Set cipher suites (for TLS 1.3)
    pub fn ciphersuites(mut self, ciphers: &str) -> Result<Self, TlsError> {
        self.ctx_builder.set_ciphersuites(ciphers)?;
        Ok(self)
    }

    /// Set SNI servername
    pub fn servername(mut self, name: impl Into<String>) -> Self {
        self.servername = Some(name.into());
        self
    }

    /// Enable/disable peer certificate verification
    pub fn verify_peer(mut self, verify: bool) -> Self {
        if verify {
            self.ctx_builder.set_verify(SslVerifyMode::PEER);
        } else {
            self.ctx_builder.set_verify(SslVerifyMode::NONE);
        }
        self
    }

    /// Trust the CA certificates in `path`
    pub fn ca_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, TlsError> {
        self.ctx_builder.set_ca_file(path.as_ref())?;
        Ok(self)
    }

    /// Load client certificate and key from a PEM file
    pub fn cert_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, TlsError> {
        let pem = read_pem(path)?;
        load_cert_bundle(&mut self.ctx_builder, &pem)?;
        Ok(self)
    }

    /// Build the TLS configuration
    pub fn build(self) -> Result<TlsConfig, TlsError> {
        Ok(TlsConfig {
            ctx: self.ctx_builder.build(),
            is_server: false,
            servername: self.servername,
        })
    }
}

/// Server configuration builder
pub struct ServerConfigBuilder {
    ctx_builder: SslContextBuilder,
    has_cert: bool,
}

impl ServerConfigBuilder {
    fn new() -> Result<Self, TlsError> {
        let ctx_builder = SslContextBuilder::new(SslMethod::tls_server())?;

        Ok(ServerConfigBuilder {
            ctx_builder,
            has_cert: false,
        })
    }

    /// Set TLS version (both min and max)
    pub fn version(mut self, version: TlsVersion) -> Result<Self, TlsError> {
        set_version_range(&mut self.ctx_builder, version, version)?;
        Ok(self)
    }

    /// Set TLS version range
    pub fn version_range(mut self, min: TlsVersion, max: TlsVersion) -> Result<Self, TlsError> {
        set_version_range(&mut self.ctx_builder, min, max)?;
        Ok(self)
    }

    /// Set cipher list (for TLS 1.2)
    pub fn cipher_list(mut self, ciphers: &str) -> Result<Self, TlsError> {
        self.ctx_builder.set_cipher_list(ciphers)?;
        Ok(self)
    }

    /// Set cipher suites (for TLS 1.3)
    pub fn ciphersuites(mut self, ciphers: &str) -> Result<Self, TlsError> {
        self.ctx_builder.set_ciphersuites(ciphers)?;
        Ok(self)
    }

    /// Load server certificate and key from a PEM file
    pub fn cert_file<P: AsRef<Path>>(mut self, path: P) -> Result<Self, TlsError> {
        let pem = read_pem(path)?;
        load_cert_bundle(&mut self.ctx_builder, &pem)?;
        self.has_cert = true;
        Ok(self)
    }

    /// Set client certificate verification mode
    pub fn client_verify(mut self, mode: ClientVerify) -> Self {
        let verify_mode = match mode {
            ClientVerify::None => SslVerifyMode::NONE,
            ClientVerify::Optional => SslVerifyMode::PEER,
            ClientVerify::Required => SslVerifyMode::PEER | SslVerifyMode::FAIL_IF_NO_PEER_CERT,
        };

        self.ctx_builder.set_verify(verify_mode);
        self
    }

    /// Set CA file for client certificate verification
    pub fn client_verify_ca<P: AsRef<Path>>(mut self, path: P) -> Result<Self, TlsError> {
        self.ctx_builder.set_ca_file(path.as_ref())?;
        Ok(self)
    }

    /// Build the TLS configuration
    ///
    /// Falls back to the built-in certificate when none was loaded.
    pub fn build(mut self) -> Result<TlsConfig, TlsError> {
        if !self.has_cert {
            load_cert_bundle(
                &mut self.ctx_builder,
                super::builtin_cert::BUILTIN_CERT.as_bytes(),
            )?;
            self.has_cert = true;
        }

        Ok(TlsConfig {
            ctx: self.ctx_builder.build(),
            is_server: true,
            servername: None,
        })
    }
}
