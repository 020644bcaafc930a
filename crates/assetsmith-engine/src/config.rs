use std::env;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};

use crate::client::{DryrunClient, GeminiClient, GenerativeClient, DEFAULT_GEMINI_API_BASE};
use crate::dispatch::ModelOverrides;

/// API key. Never printed.
#[derive(Clone, PartialEq, Eq)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn expose(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential(<redacted>)")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ProviderKind {
    #[default]
    Gemini,
    Dryrun,
}

impl ProviderKind {
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "gemini" | "google" => Some(ProviderKind::Gemini),
            "dryrun" | "offline" => Some(ProviderKind::Dryrun),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ProviderKind::Gemini => "gemini",
            ProviderKind::Dryrun => "dryrun",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    pub provider: ProviderKind,
    pub credential: Option<Credential>,
    pub api_base: String,
    pub request_timeout: Option<Duration>,
    pub models: ModelOverrides,
}

impl EngineConfig {
    /// Resolved once at startup. A missing key for a real provider is fatal here.
    pub fn from_env(provider: ProviderKind) -> Result<Self> {
        Self::from_lookup(provider, |key| env::var(key).ok())
    }

    pub fn from_lookup(provider: ProviderKind, lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |key: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
        };
        let credential = non_empty("GEMINI_API_KEY")
            .or_else(|| non_empty("GOOGLE_API_KEY"))
            .map(Credential::new);
        if provider == ProviderKind::Gemini && credential.is_none() {
            bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
        }
        let api_base = non_empty("GEMINI_API_BASE")
            .map(|value| value.trim_end_matches('/').to_string())
            .unwrap_or_else(|| DEFAULT_GEMINI_API_BASE.to_string());
        let request_timeout = match non_empty("ASSETSMITH_REQUEST_TIMEOUT") {
            Some(raw) => {
                let seconds: u64 = raw.parse().with_context(|| {
                    format!("ASSETSMITH_REQUEST_TIMEOUT must be whole seconds, got {raw}")
                })?;
                if seconds == 0 {
                    bail!("ASSETSMITH_REQUEST_TIMEOUT must be positive, got {raw}");
                }
                Some(Duration::from_secs(seconds))
            }
            None => None,
        };
        Ok(Self {
            provider,
            credential,
            api_base,
            request_timeout,
            models: ModelOverrides {
                image_draft: non_empty("ASSETSMITH_IMAGE_MODEL_DRAFT"),
                image_final: non_empty("ASSETSMITH_IMAGE_MODEL_FINAL"),
                text: non_empty("ASSETSMITH_TEXT_MODEL"),
            },
        })
    }
}

pub fn build_client(config: &EngineConfig) -> Result<Arc<dyn GenerativeClient>> {
    match config.provider {
        ProviderKind::Dryrun => Ok(Arc::new(DryrunClient::new())),
        ProviderKind::Gemini => {
            let Some(credential) = config.credential.clone() else {
                bail!("GEMINI_API_KEY or GOOGLE_API_KEY not set");
            };
            let client = GeminiClient::create(
                credential,
                Some(config.api_base.as_str()),
                config.request_timeout,
            )?;
            Ok(Arc::new(client))
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::time::Duration;

    use super::{build_client, Credential, EngineConfig, ProviderKind};

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: BTreeMap<String, String> = pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn gemini_requires_credential_at_startup() {
        let err = EngineConfig::from_lookup(ProviderKind::Gemini, lookup(&[])).unwrap_err();
        assert!(err.to_string().contains("GEMINI_API_KEY"));
        let blank = EngineConfig::from_lookup(ProviderKind::Gemini, lookup(&[("GEMINI_API_KEY", "  ")]));
        assert!(blank.is_err());
    }

    #[test]
    fn google_key_is_a_fallback() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(ProviderKind::Gemini, lookup(&[("GOOGLE_API_KEY", "g-key")]))?;
        assert_eq!(config.credential, Some(Credential::new("g-key")));
        assert_eq!(config.api_base, "https://generativelanguage.googleapis.com/v1beta");
        assert_eq!(config.request_timeout, None);
        Ok(())
    }

    #[test]
    fn overrides_and_base_are_read() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(
            ProviderKind::Gemini,
            lookup(&[
                ("GEMINI_API_KEY", "k"),
                ("GEMINI_API_BASE", "http://127.0.0.1:9/v1beta/"),
                ("ASSETSMITH_IMAGE_MODEL_DRAFT", "gemini-2.5-flash-image"),
                ("ASSETSMITH_TEXT_MODEL", "gemini-3-pro-preview"),
                ("ASSETSMITH_REQUEST_TIMEOUT", "120"),
            ]),
        )?;
        assert_eq!(config.api_base, "http://127.0.0.1:9/v1beta");
        assert_eq!(config.models.image_draft.as_deref(), Some("gemini-2.5-flash-image"));
        assert_eq!(config.models.image_final, None);
        assert_eq!(config.models.text.as_deref(), Some("gemini-3-pro-preview"));
        assert_eq!(config.request_timeout, Some(Duration::from_secs(120)));
        Ok(())
    }

    #[test]
    fn bad_timeout_is_rejected() {
        for raw in ["-1", "0", "1e300", "2.5", "soon"] {
            let config = EngineConfig::from_lookup(
                ProviderKind::Dryrun,
                lookup(&[("ASSETSMITH_REQUEST_TIMEOUT", raw)]),
            );
            assert!(config.is_err(), "accepted timeout {raw}");
        }
    }

    #[test]
    fn dryrun_needs_no_credential() -> anyhow::Result<()> {
        let config = EngineConfig::from_lookup(ProviderKind::Dryrun, lookup(&[]))?;
        assert_eq!(build_client(&config)?.name(), "dryrun");
        Ok(())
    }

    #[test]
    fn credential_debug_is_redacted() {
        let rendered = format!("{:?}", Credential::new("super-secret"));
        assert!(!rendered.contains("super-secret"));
        assert_eq!(ProviderKind::parse("Offline"), Some(ProviderKind::Dryrun));
    }
}
