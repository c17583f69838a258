// # OpenDNS IP Resolver
//
// This crate provides the default `IpResolver` for ipkeeper.
//
// OpenDNS resolvers answer a query for `myip.opendns.com` with the source
// address of the query, so one UDP round trip yields the public IPv4 address
// without any HTTP service in between.
//
// ## Error classification
//
// - Socket failures and timeouts: `Error::Network`
// - An answer without an A record: `Error::Lookup`

use hickory_client::client::{AsyncClient, ClientHandle};
use hickory_client::udp::UdpClientStream;
use hickory_proto::rr::{DNSClass, Name, RData, Record, RecordType};
use ipkeeper_core::traits::IpResolver;
use ipkeeper_core::{Error, Result};
use std::net::{Ipv4Addr, SocketAddr, SocketAddrV4};
use std::time::Duration;
use tokio::net::UdpSocket;
use tokio::time::timeout;

/// The name OpenDNS answers with the querier's address
pub const MYIP_NAME: &str = "myip.opendns.com.";

/// resolver2.opendns.com
pub const OPENDNS_SERVER: SocketAddr =
    SocketAddr::V4(SocketAddrV4::new(Ipv4Addr::new(208, 67, 220, 222), 53));

/// Default query timeout
const DEFAULT_QUERY_TIMEOUT: Duration = Duration::from_secs(5);

/// Resolver querying `myip.opendns.com` over UDP
#[derive(Debug, Clone)]
pub struct OpenDnsResolver {
    server: SocketAddr,
    query_timeout: Duration,
}

impl OpenDnsResolver {
    pub fn new() -> Self {
        Self {
            server: OPENDNS_SERVER,
            query_timeout: DEFAULT_QUERY_TIMEOUT,
        }
    }

    /// Query another server (must implement the myip behaviour)
    pub fn with_server(mut self, server: SocketAddr) -> Self {
        self.server = server;
        self
    }

    pub fn with_timeout(mut self, query_timeout: Duration) -> Self {
        self.query_timeout = query_timeout;
        self
    }

    pub fn server(&self) -> SocketAddr {
        self.server
    }
}

impl Default for OpenDnsResolver {
    fn default() -> Self {
        Self::new()
    }
}

/// First A record among `answers`
fn first_ipv4(answers: &[Record]) -> Option<Ipv4Addr> {
    answers.iter().find_map(|record| match record.data() {
        Some(RData::A(a)) => Some(a.0),
        _ => None,
    })
}

#[async_trait::async_trait]
impl IpResolver for OpenDnsResolver {
    async fn lookup(&self) -> Result<Ipv4Addr> {
        let name = Name::from_ascii(MYIP_NAME)
            .map_err(|e| Error::config(format!("Invalid query name: {}", e)))?;

        let stream = UdpClientStream::<UdpSocket>::with_timeout(self.server, self.query_timeout);
        let (mut client, bg) = AsyncClient::connect(stream)
            .await
            .map_err(|e| Error::network(format!("DNS client setup failed: {}", e)))?;
        tokio::spawn(bg);

        let response = timeout(
            self.query_timeout,
            client.query(name, DNSClass::IN, RecordType::A),
        )
        .await
        .map_err(|_| Error::network(format!("DNS query to {} timed out", self.server)))?
        .map_err(|e| Error::network(format!("DNS query to {} failed: {}", self.server, e)))?;

        let ip = first_ipv4(response.answers()).ok_or_else(|| {
            Error::lookup(format!(
                "No A record for {} in answer from {} (rcode {:?})",
                MYIP_NAME,
                self.server,
                response.response_code()
            ))
        })?;

        tracing::debug!("Resolved public IP via {}: {}", self.server, ip);
        Ok(ip)
    }

    fn name(&self) -> &'static str {
        "opendns"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::{A, CNAME};

    fn name(s: &str) -> Name {
        Name::from_ascii(s).unwrap()
    }

    #[test]
    fn test_first_a_record_wins() {
        let answers = vec![
            Record::from_rdata(name("myip.opendns.com."), 0, RData::CNAME(CNAME(name("x.example.")))),
            Record::from_rdata(name("myip.opendns.com."), 0, RData::A(A(Ipv4Addr::new(203, 0, 113, 9)))),
            Record::from_rdata(name("myip.opendns.com."), 0, RData::A(A(Ipv4Addr::new(198, 51, 100, 1)))),
        ];
        assert_eq!(first_ipv4(&answers), Some(Ipv4Addr::new(203, 0, 113, 9)));
    }

    #[test]
    fn test_no_a_record() {
        assert_eq!(first_ipv4(&[]), None);
    }

    #[test]
    fn test_defaults() {
        let resolver = OpenDnsResolver::default();
        assert_eq!(resolver.server().to_string(), "208.67.220.222:53");
        assert_eq!(resolver.name(), "opendns");
    }

    #[tokio::test]
    async fn test_silent_server_is_network_error() {
        // A bound socket that never answers
        let silent = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        let resolver = OpenDnsResolver::new()
            .with_server(silent.local_addr().unwrap())
            .with_timeout(Duration::from_millis(200));

        let err = resolver.lookup().await.unwrap_err();
        assert!(err.is_network(), "got {:?}", err);
    }
}
