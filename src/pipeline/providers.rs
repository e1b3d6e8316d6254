use std::sync::Arc;
use std::time::Duration;

use vidstage_common::{Error, Result};
use vidstage_jobs::providers::{
    GeminiConfig, GeminiImageClient, OpenAiConfig, OpenAiVideoClient, VeoClient, VeoConfig,
};
use vidstage_jobs::{GenerationJobClient, ProviderKind};

use crate::config::Config;

/// Create the client for the configured provider.
///
/// Credentials must already be resolved into `config`; nothing here reads
/// the process environment.
pub fn create_client(config: &Config) -> Result<Arc<dyn GenerationJobClient>> {
    match config.generation.provider {
        ProviderKind::OpenAi => {
            let settings = &config.openai;
            let api_key = settings.api_key.clone().ok_or_else(|| {
                Error::config("no OpenAI API key configured (openai.api_key or OPENAI_API_KEY)")
            })?;
            let mut client_config = OpenAiConfig::new(api_key).with_base_url(&settings.base_url);
            client_config.request_timeout = Duration::from_secs(settings.request_timeout_secs);
            Ok(Arc::new(OpenAiVideoClient::new(client_config)?))
        }
        ProviderKind::Veo => {
            let settings = &config.veo;
            let project = settings
                .project
                .clone()
                .ok_or_else(|| Error::config("veo.project is not configured"))?;
            let token = settings.access_token.clone().ok_or_else(|| {
                Error::config("no Veo access token configured (veo.access_token or VEO_ACCESS_TOKEN)")
            })?;

            let mut client_config = VeoConfig::new(project, &settings.location, token);
            if let Some(url) = &settings.base_url {
                client_config = client_config.with_base_url(url);
            }
            if let Some(url) = &settings.storage_base_url {
                client_config = client_config.with_storage_base_url(url);
            }
            if let Some(uri) = &settings.storage_uri {
                client_config = client_config.with_storage_uri(uri);
            }
            client_config.request_timeout = Duration::from_secs(settings.request_timeout_secs);
            Ok(Arc::new(VeoClient::new(client_config)?))
        }
        ProviderKind::Gemini => {
            let project = config
                .gemini_project()
                .ok_or_else(|| Error::config("gemini.project (or veo.project) is not configured"))?;
            let token = config.gemini_access_token().ok_or_else(|| {
                Error::config("no Gemini access token configured (gemini.access_token, veo.access_token or VEO_ACCESS_TOKEN)")
            })?;

            let mut client_config = GeminiConfig::new(project, config.gemini_location(), token);
            if let Some(url) = config.gemini_base_url() {
                client_config = client_config.with_base_url(url);
            }
            client_config.request_timeout = config.gemini_request_timeout();
            Ok(Arc::new(GeminiImageClient::new(client_config)?))
        }
    }
}
