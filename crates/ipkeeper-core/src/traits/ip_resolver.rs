// # IP Resolver Trait
//
// Defines the interface for discovering the caller's current public IPv4 address.
//
// ## Implementations
//
// - OpenDNS `myip.opendns.com` query: `ipkeeper-ip-opendns` crate (default)
// - Plain-text HTTP echo service: `ipkeeper-ip-http` crate (fallback)
//
// ## Usage
//
// ```rust,ignore
// use ipkeeper_core::IpResolver;
//
// #[tokio::main]
// async fn main() -> anyhow::Result<()> {
//     let resolver = /* IpResolver implementation */;
//
//     let ip = resolver.lookup().await?;
//     println!("public address: {ip}");
//
//     Ok(())
// }
// ```

use async_trait::async_trait;
use std::net::Ipv4Addr;

/// Trait for public IP resolver implementations
///
/// A resolver performs exactly one lookup per call. It is an **observer**:
/// it never retries, sleeps or decides whether the DNS record needs updating.
/// Retry timing is owned by the scheduler through the retry policy.
///
/// # Error classification
///
/// The update executor relies on the error variant to pick a retry track:
///
/// - `Error::Network`: the resolver could not be reached (socket failure,
///   timeout, non-success HTTP status)
/// - `Error::Lookup`: the resolver answered, but without a valid IPv4 address
///
/// Both share the connectivity retry track, but they are logged differently.
#[async_trait]
pub trait IpResolver: Send + Sync {
    /// Resolve the current public IPv4 address
    ///
    /// # Returns
    ///
    /// - `Ok(Ipv4Addr)`: The current public address
    /// - `Err(Error::Network | Error::Lookup)`: If the address could not be determined
    async fn lookup(&self) -> Result<Ipv4Addr, crate::Error>;

    /// Resolver name (for logging/debugging)
    fn name(&self) -> &'static str;
}
