//! DNS resolution for mail delivery.
//!
//! Only MX records are consulted. There is no implicit-MX fallback to A/AAAA
//! records and no cache: every delivery performs its own lookup, so
//! concurrent deliveries share nothing but the resolver handle.

use std::time::Duration;

use async_trait::async_trait;
use hickory_resolver::{
    TokioResolver, config::ResolverOpts, name_server::TokioConnectionProvider,
};
use thiserror::Error;
use tracing::{debug, warn};

/// Port every DNS-derived mail server is contacted on.
pub const SMTP_PORT: u16 = 25;

/// Per-query DNS timeout.
const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during DNS resolution.
#[derive(Debug, Error)]
pub enum DnsError {
    /// The domain exists but publishes no MX records.
    #[error("No mail servers found for domain: {0}")]
    NoMailServers(String),

    /// DNS query failed due to network or resolver issues.
    #[error("DNS lookup failed: {0}")]
    LookupFailed(#[from] hickory_resolver::ResolveError),

    /// Domain does not exist (NXDOMAIN).
    #[error("Domain does not exist: {0}")]
    DomainNotFound(String),
}

/// A mail exchanger to attempt delivery to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailServer {
    /// Hostname or IP address, as published in DNS.
    pub host: String,
    /// MX preference (lower value = more preferred).
    pub priority: u16,
    pub port: u16,
}

impl MailServer {
    #[must_use]
    pub const fn new(host: String, priority: u16, port: u16) -> Self {
        Self {
            host,
            priority,
            port,
        }
    }

    /// Parses a `host:port` pair, e.g. `localhost:1025` or `[::1]:25`.
    #[must_use]
    pub fn parse_address(address: &str) -> Option<Self> {
        let (host, port) = address.rsplit_once(':')?;
        let host = host
            .strip_prefix('[')
            .and_then(|h| h.strip_suffix(']'))
            .unwrap_or(host);

        if host.is_empty() {
            return None;
        }

        Some(Self::new(host.to_string(), 0, port.parse().ok()?))
    }

    /// Returns the full address as `host:port`.
    #[must_use]
    pub fn address(&self) -> String {
        if self.host.contains(':') {
            format!("[{}]:{}", self.host, self.port)
        } else {
            format!("{}:{}", self.host, self.port)
        }
    }
}

/// Source of the mail exchangers for a domain.
///
/// Implementations return servers in the order they should be tried.
#[async_trait]
pub trait MailServerResolver: Send + Sync {
    /// # Errors
    ///
    /// Returns a [`DnsError`] if the domain's mail servers cannot be determined.
    async fn resolve_mail_servers(&self, domain: &str) -> Result<Vec<MailServer>, DnsError>;
}

/// MX resolver backed by the system's DNS configuration.
#[derive(Debug)]
pub struct DnsResolver {
    resolver: TokioResolver,
}

impl DnsResolver {
    /// Creates a resolver from the system DNS configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the system DNS configuration cannot be loaded.
    pub fn new() -> Result<Self, DnsError> {
        let mut opts = ResolverOpts::default();
        opts.timeout = LOOKUP_TIMEOUT;

        let resolver = TokioResolver::builder(TokioConnectionProvider::default())?
            .with_options(opts)
            .build();

        Ok(Self { resolver })
    }
}

#[async_trait]
impl MailServerResolver for DnsResolver {
    /// Looks up MX records for `domain`, most preferred first.
    ///
    /// Hosts are returned exactly as published, including the root-label dot.
    async fn resolve_mail_servers(&self, domain: &str) -> Result<Vec<MailServer>, DnsError> {
        debug!("Resolving mail servers for domain: {domain}");

        match self.resolver.mx_lookup(domain).await {
            Ok(mx_lookup) => {
                let servers = by_preference(
                    mx_lookup
                        .iter()
                        .map(|mx| {
                            let host = mx.exchange().to_utf8();
                            let priority = mx.preference();
                            debug!("Found MX record: {host} (priority: {priority})");
                            MailServer::new(host, priority, SMTP_PORT)
                        })
                        .collect(),
                );

                debug!("Resolved {} MX record(s) for {domain}", servers.len());
                Ok(servers)
            }
            Err(err) if err.is_nx_domain() => {
                warn!("MX lookup for {domain}: domain does not exist");
                Err(DnsError::DomainNotFound(domain.to_string()))
            }
            Err(err) if err.is_no_records_found() => {
                warn!("MX lookup for {domain}: no records");
                Err(DnsError::NoMailServers(domain.to_string()))
            }
            Err(err) => {
                warn!("MX lookup failed for {domain}: {err}");
                Err(DnsError::LookupFailed(err))
            }
        }
    }
}

/// Orders servers by MX preference, keeping answer order among equals.
fn by_preference(mut servers: Vec<MailServer>) -> Vec<MailServer> {
    servers.sort_by_key(|s| s.priority);
    servers
}

/// Resolver that always answers with the same servers.
///
/// Backs `MAILER_MX_OVERRIDE`, which pins delivery to one host (e.g. a local
/// test MTA) regardless of DNS.
#[derive(Debug, Clone)]
pub struct StaticResolver {
    servers: Vec<MailServer>,
}

impl StaticResolver {
    #[must_use]
    pub const fn new(servers: Vec<MailServer>) -> Self {
        Self { servers }
    }

    /// Builds a resolver for a single `host:port` address.
    #[must_use]
    pub fn from_address(address: &str) -> Option<Self> {
        MailServer::parse_address(address).map(|server| Self::new(vec![server]))
    }
}

#[async_trait]
impl MailServerResolver for StaticResolver {
    async fn resolve_mail_servers(&self, domain: &str) -> Result<Vec<MailServer>, DnsError> {
        debug!(
            "Using static mail servers for {domain}: {:?}",
            self.servers
                .iter()
                .map(MailServer::address)
                .collect::<Vec<_>>()
        );
        Ok(self.servers.clone())
    }
}
