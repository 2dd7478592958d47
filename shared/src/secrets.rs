//! Upstream credentials held in AWS Secrets Manager.

use aws_sdk_secretsmanager::Client as SecretsClient;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::OnceLock;
use tokio::sync::RwLock;
use tracing::debug;

use crate::{Error, Result};

/// Upstream API credentials stored in Secrets Manager.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamSecret {
    pub username: String,
    pub password: String,
}

/// Parsed credentials per secret ARN. Only secrets that parsed are kept, so a
/// fixed secret is picked up on the next lookup.
static CREDENTIALS_BY_ARN: OnceLock<RwLock<HashMap<String, UpstreamSecret>>> = OnceLock::new();

fn credentials_by_arn() -> &'static RwLock<HashMap<String, UpstreamSecret>> {
    CREDENTIALS_BY_ARN.get_or_init(Default::default)
}

async fn cached(secret_arn: &str) -> Option<UpstreamSecret> {
    credentials_by_arn().read().await.get(secret_arn).cloned()
}

async fn remember(secret_arn: &str, secret: &UpstreamSecret) {
    credentials_by_arn()
        .write()
        .await
        .insert(secret_arn.to_string(), secret.clone());
}

/// Upstream username and password from the secret at `secret_arn`.
///
/// Secrets Manager is called at most once per ARN per process while the
/// secret keeps parsing.
pub async fn get_upstream_credentials(
    client: &SecretsClient,
    secret_arn: &str,
) -> Result<UpstreamSecret> {
    if let Some(secret) = cached(secret_arn).await {
        debug!(secret_arn, "Using cached upstream credentials");
        return Ok(secret);
    }

    let raw = fetch_secret_string(client, secret_arn).await?;
    let secret = parse_upstream_secret(&raw)?;
    remember(secret_arn, &secret).await;
    Ok(secret)
}

async fn fetch_secret_string(client: &SecretsClient, secret_arn: &str) -> Result<String> {
    let output = client
        .get_secret_value()
        .secret_id(secret_arn)
        .send()
        .await
        .map_err(|e| Error::Aws(format!("Failed to read secret {}: {}", secret_arn, e)))?;

    output
        .secret_string()
        .map(str::to_string)
        .ok_or_else(|| Error::Aws(format!("Secret {} has no string value", secret_arn)))
}

fn parse_upstream_secret(secret_string: &str) -> Result<UpstreamSecret> {
    serde_json::from_str(secret_string)
        .map_err(|e| Error::Aws(format!("Failed to parse upstream credentials: {}", e)))
}

/// Forget every cached credential, e.g. after a rotation.
pub async fn clear_cache() {
    credentials_by_arn().write().await.clear();
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_secretsmanager::config::{BehaviorVersion, Region};

    fn offline_client() -> SecretsClient {
        let config = aws_sdk_secretsmanager::Config::builder()
            .behavior_version(BehaviorVersion::latest())
            .region(Region::new("eu-west-1"))
            .build();
        SecretsClient::from_conf(config)
    }

    #[test]
    fn test_parse_credentials() {
        let json = r#"{"username":"global/salon@example.com","password":"secret123"}"#;
        let creds = parse_upstream_secret(json).unwrap();
        assert_eq!(creds.username, "global/salon@example.com");
        assert_eq!(creds.password, "secret123");
    }

    #[test]
    fn test_parse_credentials_missing_password() {
        let err = parse_upstream_secret(r#"{"username":"u"}"#).unwrap_err();
        assert!(matches!(err, Error::Aws(_)));
    }

    #[tokio::test]
    async fn test_cached_credentials_skip_fetch_until_cleared() {
        let arn = "arn:aws:secretsmanager:eu-west-1:000000000000:secret:salon";
        remember(
            arn,
            &UpstreamSecret {
                username: "cached-user".to_string(),
                password: "cached-pass".to_string(),
            },
        )
        .await;

        // The client has no credentials, so this only succeeds from the cache.
        let secret = get_upstream_credentials(&offline_client(), arn).await.unwrap();
        assert_eq!(secret.username, "cached-user");
        assert_eq!(secret.password, "cached-pass");

        clear_cache().await;
        assert!(cached(arn).await.is_none());
    }
}
