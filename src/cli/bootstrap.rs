//! CLI bootstrap - build every collaborator of the bot from settings.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};

use crate::config::CaptureConfig;
use crate::conversation::{CaptureFlow, Category};
use crate::dispatcher::{Dispatcher, DispatcherConfig};
use crate::enrichment::{LinkEnricher, OpenAiSummarizer, ReadabilityFetcher, SummarizerConfig};
use crate::notion::{NotionClient, NotionConfig};
use crate::runtime::console::ConsolePlatform;
use crate::runtime::telegram::{TelegramConfig, TelegramPlatform};
use crate::runtime::{ChatPlatform, VoiceSource};
use crate::settings::{get_with_env_fallback, NotebotSettings, SettingsManager};
use crate::transcription::{InputNormalizer, WhisperConfig, WhisperTranscriber};

use super::args::Args;

/// Everything needed to run the bot.
pub struct App {
    pub dispatcher: Dispatcher,

    /// Settings file the configuration came from
    pub settings_path: PathBuf,
}

/// Initialize logging, settings and all services.
pub async fn initialize(args: &Args) -> Result<App> {
    // Load .env file if present
    if let Err(e) = dotenvy::dotenv() {
        // Only warn on errors other than file not found
        if !matches!(e, dotenvy::Error::Io(_)) {
            eprintln!("Failed to load .env file: {}", e);
        }
    }

    init_logging(args)?;

    let settings_manager = SettingsManager::new(args.config.clone())
        .await
        .context("Failed to initialize settings manager")?;

    // Ensure settings file exists (creates template on first run)
    if let Err(e) = settings_manager.ensure_settings_file().await {
        tracing::warn!("Failed to create settings template: {}", e);
    }

    let settings = settings_manager.get().await;
    tracing::debug!("Settings loaded from {}", settings_manager.path().display());

    let config = Arc::new(CaptureConfig::from_settings(&settings));
    report_missing_databases(&config);

    let (platform, voices) = build_platform(args, &settings)?;
    let flow = Arc::new(build_flow(config, &settings, voices)?);

    let dispatcher = Dispatcher::new(
        platform,
        flow,
        DispatcherConfig {
            session_ttl: Duration::from_secs(settings.capture.session_ttl_secs),
            worker_idle: Duration::from_secs(settings.capture.worker_idle_secs),
        },
    );

    Ok(App {
        dispatcher,
        settings_path: settings_manager.path().clone(),
    })
}

fn init_logging(args: &Args) -> Result<()> {
    let directive: tracing_subscriber::filter::Directive = args
        .log_directive()
        .parse()
        .context("Invalid log directive")?;

    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(directive))
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_writer(std::io::stderr)
        .try_init();
    Ok(())
}

/// Databases are checked per session; here they are only reported.
fn report_missing_databases(config: &CaptureConfig) {
    for category in Category::ALL {
        if let Err(e) = config.database_for(category) {
            tracing::warn!("{}; '{}' entries cannot be saved", e, category);
        }
    }
}

/// Chat platform plus the voice source backed by the same connection.
fn build_platform(
    args: &Args,
    settings: &NotebotSettings,
) -> Result<(Arc<dyn ChatPlatform>, Arc<dyn VoiceSource>)> {
    if args.console {
        let console = Arc::new(ConsolePlatform::stdin());
        return Ok((console.clone(), console));
    }

    let telegram = Arc::new(
        TelegramPlatform::new(TelegramConfig {
            token: resolve_telegram_token(settings)?,
            api_base: settings.telegram.api_base.clone(),
            poll_timeout_secs: settings.telegram.poll_timeout_secs,
        })
        .context("Failed to create Telegram client")?,
    );
    Ok((telegram.clone(), telegram))
}

fn build_flow(
    config: Arc<CaptureConfig>,
    settings: &NotebotSettings,
    voices: Arc<dyn VoiceSource>,
) -> Result<CaptureFlow> {
    let openai_key = get_with_env_fallback(&settings.openai.api_key, &["OPENAI_API_KEY"], None);
    let openai_base =
        get_with_env_fallback(&settings.openai.base_url, &["OPENAI_BASE_URL"], None);

    let store = Arc::new(
        NotionClient::new(NotionConfig {
            token: get_with_env_fallback(&settings.notion.token, &["NOTION_TOKEN"], None),
            base_url: settings.notion.base_url.clone(),
            api_version: settings.notion.api_version.clone(),
        })
        .context("Failed to create Notion client")?,
    );

    let transcriber = Arc::new(
        WhisperTranscriber::new(WhisperConfig {
            api_key: openai_key.clone(),
            base_url: openai_base.clone(),
            model: settings.openai.transcription_model.clone(),
        })
        .context("Failed to create transcription client")?,
    );

    let fetcher = Arc::new(
        ReadabilityFetcher::new(Duration::from_secs(settings.capture.fetch_timeout_secs))
            .context("Failed to create page fetcher")?,
    );
    let summarizer = Arc::new(
        OpenAiSummarizer::new(SummarizerConfig {
            api_key: openai_key,
            base_url: openai_base,
            model: settings.openai.summary_model.clone(),
            temperature: settings.openai.temperature,
            max_chars: settings.capture.max_summary_chars,
        })
        .context("Failed to create summarizer client")?,
    );

    Ok(CaptureFlow::new(
        config,
        store,
        InputNormalizer::new(voices, transcriber),
        LinkEnricher::new(fetcher, summarizer),
    ))
}

/// The bot token is the one setting the process cannot start without.
fn resolve_telegram_token(settings: &NotebotSettings) -> Result<String> {
    get_with_env_fallback(&settings.telegram.token, &["TELEGRAM_TOKEN"], None)
        .ok_or_else(|| {
            anyhow::anyhow!(
                "No Telegram token found. Set TELEGRAM_TOKEN in .env, \
                 telegram.token in ~/.notebot/settings.toml, or run with --console"
            )
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_telegram_token_from_settings() {
        let mut settings = NotebotSettings::default();
        settings.telegram.token = Some("123:abc".to_string());

        let token = resolve_telegram_token(&settings).unwrap();
        assert_eq!(token, "123:abc");
    }

    #[test]
    fn test_empty_telegram_token_is_rejected() {
        // The fallback would otherwise pick up a developer's own token
        std::env::remove_var("TELEGRAM_TOKEN");

        let mut settings = NotebotSettings::default();
        settings.telegram.token = Some(String::new());

        assert!(resolve_telegram_token(&settings).is_err());
    }
}
