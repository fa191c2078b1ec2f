//! Client configuration and credential resolution.
//!
//! Values are resolved once, when [`ClientConfigBuilder::build`] runs. Sources
//! are applied in order of precedence, highest first:
//!
//! 1. Values set explicitly on the builder
//! 2. `SQS_POLLER_*` environment variables
//! 3. The standard `AWS_*` environment variables
//! 4. Built-in defaults (region `us-east-1`, 30 second request timeout)
//!
//! Each field is resolved independently, so an explicit region can be
//! combined with credentials taken from the environment.

use crate::error::ConfigurationError;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::fmt;
use std::time::Duration;
use url::Url;
use zeroize::Zeroizing;

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;

/// Region used when neither the builder nor the environment names one
pub const DEFAULT_REGION: &str = "us-east-1";

/// Prefix of the environment variables specific to this client
pub const ENV_PREFIX: &str = "SQS_POLLER";

const AWS_ENV_PREFIX: &str = "AWS";
const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Static credentials used to sign requests
#[derive(Clone)]
pub struct Credentials {
    access_key_id: String,
    secret_access_key: Zeroizing<String>,
    session_token: Option<Zeroizing<String>>,
}

impl Credentials {
    pub fn new(
        access_key_id: impl Into<String>,
        secret_access_key: impl Into<String>,
        session_token: Option<String>,
    ) -> Self {
        Self {
            access_key_id: access_key_id.into(),
            secret_access_key: Zeroizing::new(secret_access_key.into()),
            session_token: session_token.map(Zeroizing::new),
        }
    }

    pub fn access_key_id(&self) -> &str {
        &self.access_key_id
    }

    pub fn secret_access_key(&self) -> &str {
        &self.secret_access_key
    }

    pub fn session_token(&self) -> Option<&str> {
        self.session_token.as_ref().map(|t| t.as_str())
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("access_key_id", &self.access_key_id)
            .field("secret_access_key", &"<redacted>")
            .field(
                "session_token",
                &self.session_token.as_ref().map(|_| "<redacted>"),
            )
            .finish()
    }
}

/// Fully resolved client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    region: String,
    endpoint: Url,
    credentials: Option<Credentials>,
    request_timeout: Duration,
}

impl ClientConfig {
    /// Start building a configuration
    pub fn builder() -> ClientConfigBuilder {
        ClientConfigBuilder::default()
    }

    /// Resolve a configuration purely from the process environment
    pub fn from_env() -> Result<Self, ConfigurationError> {
        Self::builder().build()
    }

    pub fn region(&self) -> &str {
        &self.region
    }

    /// Service endpoint every request is sent to
    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }

    pub fn credentials(&self) -> Option<&Credentials> {
        self.credentials.as_ref()
    }

    /// HTTP timeout applied by the transport
    pub fn request_timeout(&self) -> Duration {
        self.request_timeout
    }
}

/// Builder for [`ClientConfig`]; explicit values override the environment
#[derive(Debug, Default, Clone)]
pub struct ClientConfigBuilder {
    access_key_id: Option<String>,
    secret_access_key: Option<Zeroizing<String>>,
    session_token: Option<Zeroizing<String>>,
    region: Option<String>,
    endpoint_url: Option<String>,
    request_timeout: Option<Duration>,
    environment: Option<config::Map<String, String>>,
}

impl ClientConfigBuilder {
    pub fn access_key_id(mut self, value: impl Into<String>) -> Self {
        self.access_key_id = Some(value.into());
        self
    }

    pub fn secret_access_key(mut self, value: impl Into<String>) -> Self {
        self.secret_access_key = Some(Zeroizing::new(value.into()));
        self
    }

    pub fn session_token(mut self, value: impl Into<String>) -> Self {
        self.session_token = Some(Zeroizing::new(value.into()));
        self
    }

    pub fn region(mut self, value: impl Into<String>) -> Self {
        self.region = Some(value.into());
        self
    }

    /// Send requests to this endpoint instead of the regional AWS one
    pub fn endpoint_url(mut self, value: impl Into<String>) -> Self {
        self.endpoint_url = Some(value.into());
        self
    }

    pub fn request_timeout(mut self, value: Duration) -> Self {
        self.request_timeout = Some(value);
        self
    }

    /// Read environment variables from `variables` instead of the process environment
    pub fn environment(mut self, variables: config::Map<String, String>) -> Self {
        self.environment = Some(variables);
        self
    }

    /// Resolve every setting and validate the result
    pub fn build(self) -> Result<ClientConfig, ConfigurationError> {
        let poller_env: PollerEnvironment = load_environment(ENV_PREFIX, &self.environment)?;
        let aws_env: AwsEnvironment = load_environment(AWS_ENV_PREFIX, &self.environment)?;

        let region = self
            .region
            .or(poller_env.region_name)
            .or(aws_env.region)
            .or(aws_env.default_region)
            .unwrap_or_else(|| DEFAULT_REGION.to_string());
        if region.trim().is_empty() {
            return Err(ConfigurationError::Invalid {
                message: "Region cannot be empty".to_string(),
            });
        }

        let endpoint = match self
            .endpoint_url
            .or(poller_env.endpoint_url)
            .or(aws_env.endpoint_url_sqs)
        {
            Some(raw) => parse_endpoint(&raw)?,
            None => parse_endpoint(&format!("https://sqs.{}.amazonaws.com", region))?,
        };

        let access_key_id = self
            .access_key_id
            .or(poller_env.aws_access_key_id)
            .or(aws_env.access_key_id);
        let secret_access_key = self
            .secret_access_key
            .or_else(|| poller_env.aws_secret_access_key.map(Zeroizing::new))
            .or_else(|| aws_env.secret_access_key.map(Zeroizing::new));
        let session_token = self
            .session_token
            .or_else(|| poller_env.aws_session_token.map(Zeroizing::new))
            .or_else(|| aws_env.session_token.map(Zeroizing::new));

        let credentials = match (access_key_id, secret_access_key) {
            (Some(access_key_id), Some(secret_access_key)) => Some(Credentials {
                access_key_id,
                secret_access_key,
                session_token,
            }),
            (Some(_), None) => {
                return Err(ConfigurationError::Missing {
                    key: "secret_access_key".to_string(),
                })
            }
            (None, Some(_)) => {
                return Err(ConfigurationError::Missing {
                    key: "access_key_id".to_string(),
                })
            }
            (None, None) => None,
        };

        Ok(ClientConfig {
            region,
            endpoint,
            credentials,
            request_timeout: self.request_timeout.unwrap_or(DEFAULT_REQUEST_TIMEOUT),
        })
    }
}

/// `SQS_POLLER_*` variables, keyed by the lower-cased remainder of the name
#[derive(Debug, Default, Deserialize)]
struct PollerEnvironment {
    aws_access_key_id: Option<String>,
    aws_secret_access_key: Option<String>,
    aws_session_token: Option<String>,
    region_name: Option<String>,
    endpoint_url: Option<String>,
}

/// Standard `AWS_*` variables
#[derive(Debug, Default, Deserialize)]
struct AwsEnvironment {
    access_key_id: Option<String>,
    secret_access_key: Option<String>,
    session_token: Option<String>,
    region: Option<String>,
    default_region: Option<String>,
    endpoint_url_sqs: Option<String>,
}

fn load_environment<T: DeserializeOwned>(
    prefix: &str,
    variables: &Option<config::Map<String, String>>,
) -> Result<T, ConfigurationError> {
    let source = config::Environment::with_prefix(prefix)
        .prefix_separator("_")
        .ignore_empty(true)
        .source(variables.clone());

    config::Config::builder()
        .add_source(source)
        .build()
        .and_then(|settings| settings.try_deserialize())
        .map_err(|e| ConfigurationError::Parsing {
            message: format!("{} environment: {}", prefix, e),
        })
}

fn parse_endpoint(raw: &str) -> Result<Url, ConfigurationError> {
    let url = Url::parse(raw).map_err(|e| ConfigurationError::Invalid {
        message: format!("Invalid endpoint URL '{}': {}", raw, e),
    })?;

    if !matches!(url.scheme(), "http" | "https") || url.host_str().is_none() {
        return Err(ConfigurationError::Invalid {
            message: format!("Endpoint URL '{}' must be an http(s) URL with a host", raw),
        });
    }

    Ok(url)
}
