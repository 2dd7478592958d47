//! Per-process application state built once at cold start.

use tracing::{error, info};

use crate::config::{Config, UpstreamCredentials};
use crate::endpoints::Endpoints;
use crate::resolver::Resolver;
use crate::secrets::get_upstream_credentials;
use crate::upstream::{build_client, HttpUpstream};
use crate::Result;

/// Application state
pub struct AppState {
    pub config: Config,
    http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: Config) -> Result<Self> {
        let http_client = build_client(&config)?;
        Ok(Self {
            config,
            http_client,
        })
    }

    /// Load configuration, completing credentials from Secrets Manager when
    /// the environment lacks them. A secret lookup failure is logged and left
    /// for each request to report as a configuration error.
    pub async fn from_env() -> Result<Self> {
        let mut config = Config::from_env();

        if config.needs_secret_credentials() {
            if let Some(secret_arn) = config.credentials_secret_arn.clone() {
                let aws_config =
                    aws_config::load_defaults(aws_config::BehaviorVersion::latest()).await;
                let secrets_client = aws_sdk_secretsmanager::Client::new(&aws_config);

                match get_upstream_credentials(&secrets_client, &secret_arn).await {
                    Ok(secret) => {
                        info!("Loaded upstream credentials from Secrets Manager");
                        config = config.with_secret_credentials(secret);
                    }
                    Err(e) => error!(error = %e, "Failed to load upstream credentials"),
                }
            }
        }

        Self::new(config)
    }

    /// Whether every credential needed for upstream calls is present.
    pub fn is_configured(&self) -> bool {
        UpstreamCredentials::from_config(&self.config).is_ok()
    }

    /// Resolver for one request. Fails fast when credentials are missing.
    pub fn resolver(&self) -> Result<Resolver<HttpUpstream>> {
        let credentials = UpstreamCredentials::from_config(&self.config).map_err(|e| {
            error!(error = %e, "Upstream credentials not configured");
            e
        })?;

        let upstream = HttpUpstream::new(self.http_client.clone(), &credentials);
        let endpoints = Endpoints::new(&self.config.base_url, &credentials.business_id);
        Ok(Resolver::new(upstream, endpoints).with_staff_fallback(self.config.staff_fallback))
    }
}
