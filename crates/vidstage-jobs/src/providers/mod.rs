//! Provider adapters implementing [`GenerationJobClient`](crate::GenerationJobClient).

pub mod gemini;
mod http;
pub mod openai;
pub mod veo;

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use vidstage_common::Error;

pub use gemini::{GeminiConfig, GeminiImageClient};
pub use http::REQUEST_TIMEOUT;
pub use openai::{OpenAiConfig, OpenAiVideoClient};
pub use veo::{VeoClient, VeoConfig};

/// Supported generation backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    OpenAi,
    Veo,
    /// Gemini image models; jobs finish within the create call.
    Gemini,
}

impl ProviderKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Veo => "veo",
            Self::Gemini => "gemini",
        }
    }

    /// Model used when none is configured.
    pub fn default_model(self) -> &'static str {
        match self {
            Self::OpenAi => "sora-2",
            Self::Veo => "veo-3.1-generate-preview",
            Self::Gemini => "gemini-2.5-flash-image",
        }
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "openai" | "sora" => Ok(Self::OpenAi),
            "veo" | "vertex" => Ok(Self::Veo),
            "gemini" | "nano-banana" => Ok(Self::Gemini),
            other => Err(Error::config(format!("unknown provider: {other}"))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("openai".parse::<ProviderKind>().unwrap(), ProviderKind::OpenAi);
        assert_eq!("Veo".parse::<ProviderKind>().unwrap(), ProviderKind::Veo);
        assert!("runway".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Veo.to_string(), "veo");
        assert_eq!("nano-banana".parse::<ProviderKind>().unwrap(), ProviderKind::Gemini);
        assert_eq!(ProviderKind::Gemini.default_model(), "gemini-2.5-flash-image");
    }

    #[test]
    fn test_provider_kind_serde() {
        let kind: ProviderKind = serde_json::from_str("\"veo\"").unwrap();
        assert_eq!(kind, ProviderKind::Veo);
        assert_eq!(serde_json::to_string(&ProviderKind::OpenAi).unwrap(), "\"openai\"");
    }
}
