use std::time::Duration;

use anyhow::Context;

use sreg_client::RestRegistryClient;
use sreg_config::{RegistryConfig, SregConfig};

pub fn load_config() -> anyhow::Result<SregConfig> {
    SregConfig::load_with_dotenv().context("failed to load configuration")
}

fn client_for(endpoint: &RegistryConfig) -> RestRegistryClient {
    let client =
        RestRegistryClient::new(&endpoint.url, Duration::from_secs(endpoint.timeout_secs));
    if endpoint.has_credentials() {
        client.with_basic_auth(&endpoint.username, &endpoint.password)
    } else {
        client
    }
}

/// Client for the configured source registry.
pub fn source_client(config: &SregConfig) -> anyhow::Result<RestRegistryClient> {
    let endpoint = config
        .require_source()
        .context("source registry is not configured (set source.url or SREG_SOURCE__URL)")?;
    Ok(client_for(endpoint))
}

/// Client for the configured destination registry.
pub fn destination_client(config: &SregConfig) -> anyhow::Result<RestRegistryClient> {
    let endpoint = config.require_destination().context(
        "destination registry is not configured (set destination.url or SREG_DESTINATION__URL)",
    )?;
    Ok(client_for(endpoint))
}
