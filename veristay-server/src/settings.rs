//! Settings / Configuration.

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::{path::PathBuf, time::Duration};
use url::Url;

/// Decision-policy knobs for the verification pipeline.
///
/// Every field has a default, so an empty `[policy]` section is valid.
#[derive(Clone, Debug, Deserialize)]
#[serde(default)]
pub struct Policy {
    /// Confidence at or above which a document verdict auto-approves
    pub approve_confidence: u8,
    /// Confidence at or below which a document verdict auto-rejects
    pub reject_confidence: u8,
    /// Validity window of phone confirmation codes, in seconds
    pub phone_code_ttl_secs: u64,
    /// Validity window of email confirmation tokens, in seconds
    pub email_token_ttl_secs: u64,
    /// Extracted monthly income must cover this multiple of the claimed rent
    pub income_rent_multiple: f32,
    /// Risk score at or above which an account is flagged as fraudulent
    pub fraud_threshold: u8,
    /// How many times a conflicted record update is retried before
    /// surfacing contention to the caller
    pub max_update_attempts: u32,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            approve_confidence: 85,
            reject_confidence: 30,
            phone_code_ttl_secs: 600,
            email_token_ttl_secs: 86_400,
            income_rent_multiple: 2.0,
            fraud_threshold: 75,
            max_update_attempts: 5,
        }
    }
}

impl Policy {
    /// Phone code validity window as a [chrono::Duration].
    pub fn phone_code_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.phone_code_ttl_secs as i64)
    }

    /// Email token validity window as a [chrono::Duration].
    pub fn email_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.email_token_ttl_secs as i64)
    }
}

/// Document-analysis service settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Analysis {
    /// Endpoint of the external analysis service
    pub endpoint: Url,
    /// Http-client settings for analysis calls
    #[serde(default)]
    pub http_client: HttpClient,
}

/// Background-check provider settings.
#[derive(Clone, Debug, Deserialize)]
pub struct BackgroundCheck {
    /// Endpoint the check initiation is posted to
    pub endpoint: Url,
    /// Http-client settings for initiation calls
    #[serde(default)]
    pub http_client: HttpClient,
}

/// [Mailgun] settings for outbound confirmation mail.
#[derive(Clone, Debug, Deserialize)]
pub struct Mailgun {
    /// Mailgun API key.
    pub api_key: String,
    /// Mailgun domain.
    pub domain: String,
    /// Mailgun Subject
    pub subject: String,
    /// Mailgun From Address
    pub from_address: String,
    /// Mailgun From Name
    pub from_name: String,
    /// Mailgun Template
    pub template: String,
}

/// Application settings.
#[derive(Clone, Debug, Deserialize)]
pub struct Settings {
    /// Decision-policy knobs
    #[serde(default)]
    pub policy: Policy,
    /// Document-analysis service settings
    pub analysis: Analysis,
    /// Background-check provider settings
    pub background_check: BackgroundCheck,
    /// Outbound mail settings
    pub mailgun: Mailgun,
    /// The path where the settings file resides.
    /// This can't actually be configured in the settings file itself, for obvious reasons.
    #[serde(skip)]
    pub path: Option<PathBuf>,
}

impl Settings {
    /// Load settings.
    pub fn load(config_path: Option<PathBuf>) -> Result<Self, ConfigError> {
        let path = config_path
            .unwrap_or(PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("config/settings.toml"));
        // inject environment variables naming them properly on the settings
        // e.g. [mailgun] domain="foo"
        // would be injected with environment variable VERISTAY_MAILGUN_DOMAIN="foo"
        let s = Config::builder()
            .add_source(File::with_name(&path.as_path().display().to_string()))
            .add_source(
                Environment::with_prefix("VERISTAY")
                    .separator("_")
                    .try_parsing(true),
            )
            .build()?;
        let mut settings: Self = s.try_deserialize()?;
        settings.path = Some(path);
        Ok(settings)
    }
}

/// Http-client retry options.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpClientRetryOptions {
    /// Retry count.
    pub count: u32,
    /// Retry lower bounds for [retry_policies::policies::ExponentialBackoff].
    pub bounds_low_ms: u64,
    /// Retry upper bounds for [retry_policies::policies::ExponentialBackoff].
    pub bounds_high_ms: u64,
}

impl Default for HttpClientRetryOptions {
    fn default() -> Self {
        Self {
            bounds_high_ms: 5_000,
            bounds_low_ms: 100,
            count: 3,
        }
    }
}

/// Settings for Http clients.
#[derive(Clone, Debug, Deserialize)]
pub struct HttpClient {
    /// Optional timeout for idle sockets being kept-alive.
    /// Using `None` to disable timeout.
    pub pool_idle_timeout_ms: Option<u64>,
    #[serde(default)]
    /// Http-client retry options.
    pub retry_options: HttpClientRetryOptions,
    /// Client timeout in milliseconds.
    pub timeout_ms: u64,
}

impl Default for HttpClient {
    fn default() -> Self {
        Self {
            pool_idle_timeout_ms: Some(5_000),
            retry_options: HttpClientRetryOptions::default(),
            timeout_ms: 30_000,
        }
    }
}

impl HttpClient {
    /// Convert `pool_idle_timeout_ms` to [Duration].
    pub fn pool_idle_timeout(&self) -> Option<Duration> {
        self.pool_idle_timeout_ms.and_then(|timeout| {
            if timeout != 0 {
                Some(Duration::from_millis(timeout))
            } else {
                None
            }
        })
    }

    /// Convert `timeout_ms` to [Duration].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}
