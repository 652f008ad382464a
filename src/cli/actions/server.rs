use crate::gate::{self, GateConfig, RouteTable};
use anyhow::{anyhow, Context, Result};
use std::time::Duration;
use tracing::debug;
use url::Url;

#[derive(Debug)]
pub struct Args {
    pub port: u16,
    pub upstream: String,
    pub session_path: String,
    pub session_timeout_seconds: u64,
    pub upstream_connect_timeout_seconds: u64,
    pub public_routes: Vec<String>,
    pub protected_routes: Vec<String>,
}

impl Args {
    /// Turn raw arguments into a validated gate configuration.
    ///
    /// # Errors
    /// Returns an error if the upstream URL or session path is unusable.
    pub fn into_config(self) -> Result<GateConfig> {
        let upstream = Url::parse(&self.upstream)
            .with_context(|| format!("Invalid upstream URL: {}", self.upstream))?;

        if !matches!(upstream.scheme(), "http" | "https") {
            return Err(anyhow!(
                "Upstream URL must use http or https: {}",
                self.upstream
            ));
        }

        if upstream.host_str().is_none() {
            return Err(anyhow!(
                "Upstream URL must include a valid host: {}",
                self.upstream
            ));
        }

        if !self.session_path.starts_with('/') {
            return Err(anyhow!(
                "Session path must be absolute: {}",
                self.session_path
            ));
        }

        Ok(GateConfig {
            port: self.port,
            upstream,
            session_path: self.session_path,
            session_timeout: Duration::from_secs(self.session_timeout_seconds),
            upstream_connect_timeout: Duration::from_secs(self.upstream_connect_timeout_seconds),
            routes: RouteTable::new(self.public_routes, self.protected_routes),
        })
    }
}

/// Execute the server action.
/// # Errors
/// Returns an error if the configuration is invalid or the server fails to start.
pub async fn execute(args: Args) -> Result<()> {
    let config = args.into_config()?;

    debug!("Gate config: {:?}", config);

    gate::new(config).await
}
