//! Server configuration, injected at construction. No ambient globals.

use std::net::SocketAddr;
use std::time::Duration;

use alloy_primitives::Address;
use bon::Builder;
use url::Url;

use presspay_core::challenge::ChallengeContext;
use presspay_settle::RetryConfig;

/// Environment variables read by [`ServerConfig::from_env`].
mod vars {
    pub const BIND: &str = "PRESSPAY_BIND";
    pub const FACILITATOR_URL: &str = "FACILITATOR_URL";
    pub const LEDGER_URL: &str = "LEDGER_URL";
    pub const SIGNER_KEY: &str = "SERVER_SIGNING_KEY";
    pub const NETWORK: &str = "PAYMENT_NETWORK";
    pub const ASSET: &str = "PAYMENT_ASSET";
    pub const FACILITATOR_TIMEOUT_MS: &str = "FACILITATOR_TIMEOUT_MS";
    pub const LEDGER_TIMEOUT_MS: &str = "LEDGER_TIMEOUT_MS";
    pub const REQUEST_DEADLINE_MS: &str = "REQUEST_DEADLINE_MS";
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable `{0}`")]
    MissingVar(&'static str),

    #[error("invalid value for `{name}`: {reason}")]
    Invalid { name: &'static str, reason: String },
}

#[derive(Builder, Debug, Clone)]
pub struct ServerConfig {
    /// Address the HTTP server binds to.
    #[builder(default = SocketAddr::from(([0, 0, 0, 0], 3000)))]
    pub bind: SocketAddr,
    /// External facilitator endpoint, also advertised in challenges.
    pub facilitator_url: Url,
    /// Ledger node endpoint.
    pub ledger_url: Url,
    /// Server-held key authorizing mark transactions at the ledger node.
    #[builder(into)]
    pub signer_key: String,
    /// Network payments settle on.
    #[builder(into)]
    pub network: String,
    /// Asset prices are denominated in.
    pub asset: Address,
    /// Per-call timeout for facilitator requests.
    #[builder(default = Duration::from_secs(10))]
    pub facilitator_timeout: Duration,
    /// Per-call timeout for ledger requests.
    #[builder(default = Duration::from_secs(10))]
    pub ledger_timeout: Duration,
    /// Retry policy for transport failures.
    #[builder(default)]
    pub retry: RetryConfig,
    /// Overall per-request deadline. Must exceed the facilitator plus
    /// ledger timeouts so a single slow call cannot consume the budget.
    #[builder(default = Duration::from_secs(45))]
    pub request_deadline: Duration,
}

impl ServerConfig {
    /// Read the configuration from the environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let bind = match optional(vars::BIND) {
            Some(raw) => raw.parse::<SocketAddr>().map_err(|err| invalid(vars::BIND, err))?,
            None => SocketAddr::from(([0, 0, 0, 0], 3000)),
        };

        let facilitator_url = Url::parse(&required(vars::FACILITATOR_URL)?)
            .map_err(|err| invalid(vars::FACILITATOR_URL, err))?;
        let ledger_url =
            Url::parse(&required(vars::LEDGER_URL)?).map_err(|err| invalid(vars::LEDGER_URL, err))?;
        let signer_key = required(vars::SIGNER_KEY)?;
        let network = optional(vars::NETWORK).unwrap_or_else(|| "arbitrum".to_string());
        let asset = required(vars::ASSET)?
            .parse::<Address>()
            .map_err(|err| invalid(vars::ASSET, err))?;

        let config = ServerConfig {
            bind,
            facilitator_url,
            ledger_url,
            signer_key,
            network,
            asset,
            facilitator_timeout: duration_ms(vars::FACILITATOR_TIMEOUT_MS, Duration::from_secs(10))?,
            ledger_timeout: duration_ms(vars::LEDGER_TIMEOUT_MS, Duration::from_secs(10))?,
            retry: RetryConfig::default(),
            request_deadline: duration_ms(vars::REQUEST_DEADLINE_MS, Duration::from_secs(45))?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Check the deadline budget covers the remote-call timeouts.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let floor = self.facilitator_timeout + self.ledger_timeout;
        if self.request_deadline <= floor {
            return Err(ConfigError::Invalid {
                name: vars::REQUEST_DEADLINE_MS,
                reason: format!(
                    "request deadline {:?} must exceed the facilitator plus ledger timeouts ({floor:?})",
                    self.request_deadline
                ),
            });
        }
        Ok(())
    }

    /// Challenge parameters derived from this configuration.
    pub fn challenge_context(&self) -> ChallengeContext {
        ChallengeContext::builder()
            .network(self.network.clone())
            .asset(self.asset)
            .facilitator(self.facilitator_url.clone())
            .build()
    }
}

fn required(name: &'static str) -> Result<String, ConfigError> {
    optional(name).ok_or(ConfigError::MissingVar(name))
}

fn optional(name: &'static str) -> Option<String> {
    std::env::var(name).ok().filter(|value| !value.is_empty())
}

fn invalid(name: &'static str, reason: impl std::fmt::Display) -> ConfigError {
    ConfigError::Invalid {
        name,
        reason: reason.to_string(),
    }
}

fn duration_ms(name: &'static str, default: Duration) -> Result<Duration, ConfigError> {
    match optional(name) {
        None => Ok(default),
        Some(raw) => raw
            .parse::<u64>()
            .map(Duration::from_millis)
            .map_err(|err| invalid(name, err)),
    }
}
