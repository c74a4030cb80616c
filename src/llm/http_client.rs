use reqwest::Client;
use std::time::Duration;

/// Extra time the transport allows beyond the gateway's request deadline,
/// so the gateway's own timeout is the one that fires.
const CLIENT_HEADROOM: Duration = Duration::from_secs(5);
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const POOL_IDLE_TIMEOUT: Duration = Duration::from_secs(90);
const USER_AGENT: &str = concat!("chatkeep/", env!("CARGO_PKG_VERSION"));

/// HTTP client for provider adapters whose calls the gateway bounds by
/// `request_timeout`.
pub fn build_provider_client(request_timeout: Duration) -> Client {
    Client::builder()
        .timeout(client_timeout(request_timeout))
        .connect_timeout(CONNECT_TIMEOUT)
        .pool_max_idle_per_host(10)
        .pool_idle_timeout(POOL_IDLE_TIMEOUT)
        .user_agent(USER_AGENT)
        .build()
        .unwrap_or_else(|err| {
            tracing::warn!("Falling back to default HTTP client: {err}");
            Client::new()
        })
}

fn client_timeout(request_timeout: Duration) -> Duration {
    request_timeout.saturating_add(CLIENT_HEADROOM)
}
