//! Conversation state machine.
//!
//! [`CaptureFlow::handle`] applies one inbound event to a session and pushes
//! the resulting replies. Errors never leave this module: every failure is
//! logged, turned into a message for the user and, unless the user can
//! simply try again, ends the session.

use std::sync::Arc;

use async_trait::async_trait;

use super::event::{Command, Incoming};
use super::keyboard::{category_keyboard, options_keyboard, Reply};
use super::messages;
use super::property_loop::{accept_choice, advance_and_present, Choice, Step};
use super::session::{Category, ConversationState, Session};
use crate::config::CaptureConfig;
use crate::enrichment::LinkEnricher;
use crate::error::{CaptureError, Result};
use crate::notion::{
    CommitError, CommitOutcome, PropertyResolver, RecordCommitter, RecordStore, StoreError,
};
use crate::transcription::InputNormalizer;

/// Sink for replies produced while handling an event.
#[async_trait]
pub trait Outbox: Send + Sync {
    async fn push(&self, reply: Reply);
}

pub struct CaptureFlow {
    config: Arc<CaptureConfig>,
    resolver: PropertyResolver,
    committer: RecordCommitter,
    normalizer: InputNormalizer,
    enricher: LinkEnricher,
}

impl CaptureFlow {
    pub fn new(
        config: Arc<CaptureConfig>,
        store: Arc<dyn RecordStore>,
        normalizer: InputNormalizer,
        enricher: LinkEnricher,
    ) -> Self {
        Self {
            config,
            resolver: PropertyResolver::new(store.clone()),
            committer: RecordCommitter::new(store),
            normalizer,
            enricher,
        }
    }

    /// Apply one event to `session`.
    pub async fn handle(&self, session: &mut Session, event: Incoming, out: &dyn Outbox) {
        tracing::debug!(
            "Handling {} in state {:?} (flow {})",
            event.kind(),
            session.state(),
            session.flow_id()
        );

        let result = match event {
            Incoming::Command(command) => {
                self.on_command(session, command, out).await;
                Ok(())
            }
            event => match session.state() {
                ConversationState::Idle => {
                    out.push(Reply::text(messages::NO_SESSION)).await;
                    Ok(())
                }
                ConversationState::Choosing => self.on_category(session, &event, out).await,
                ConversationState::TypingReply => self.on_content(session, &event, out).await,
                ConversationState::AwaitingLink => self.on_link(session, &event, out).await,
                ConversationState::SelectingProperty { .. } => {
                    self.on_property(session, &event, out).await
                }
            },
        };

        if let Err(err) = result {
            self.fail(session, err, out).await;
        }
    }

    async fn on_command(&self, session: &mut Session, command: Command, out: &dyn Outbox) {
        match command {
            Command::Start => {
                if session.is_active() {
                    tracing::info!(
                        "Abandoning flow {} in state {:?} after {}s",
                        session.flow_id(),
                        session.state(),
                        session.age_secs()
                    );
                }
                session.begin();
                out.push(Reply::with_keyboard(messages::GREETING, category_keyboard()))
                    .await;
            }
            Command::Cancel => {
                session.clear();
                out.push(Reply::removing_keyboard(messages::CANCELLED)).await;
            }
            Command::Help => out.push(Reply::text(messages::HELP)).await,
            Command::Other(name) => {
                tracing::debug!("Unknown command /{}", name);
                out.push(Reply::text(messages::UNKNOWN_COMMAND)).await;
            }
        }
    }

    async fn on_category(&self, session: &mut Session, event: &Incoming, out: &dyn Outbox) -> Result<()> {
        let category = match event {
            Incoming::Text(text) => Category::from_label(text),
            _ => None,
        };
        let Some(category) = category else {
            out.push(Reply::with_keyboard(
                messages::CHOOSE_CATEGORY,
                category_keyboard(),
            ))
            .await;
            return Ok(());
        };

        session
            .choose(category)
            .map_err(|e| CaptureError::InvalidUserInput(e.to_string()))?;
        tracing::info!("Flow {}: category {}", session.flow_id(), category);

        let prompt = match category {
            Category::Link => messages::ASK_LINK.to_string(),
            Category::Idea | Category::Task => messages::ask_content(category),
        };
        out.push(Reply::removing_keyboard(prompt)).await;
        Ok(())
    }

    async fn on_content(&self, session: &mut Session, event: &Incoming, out: &dyn Outbox) -> Result<()> {
        let Some(category) = session.category() else {
            session.clear();
            return Err(CaptureError::InvalidUserInput(messages::NO_SESSION.to_string()));
        };

        let from_voice = matches!(event, Incoming::Voice(_));
        if from_voice {
            out.push(Reply::text(messages::VOICE_RECEIVED)).await;
        }

        let text = match self.normalizer.normalize(event).await {
            Ok(text) => text,
            Err(err) => {
                tracing::error!(
                    "Flow {}: transcription failed: {}",
                    session.flow_id(),
                    err.detail()
                );
                session.clear();
                out.push(Reply::removing_keyboard(err.to_string())).await;
                return Ok(());
            }
        };
        if text.is_empty() {
            return Err(CaptureError::InvalidUserInput(messages::EMPTY_TEXT.to_string()));
        }

        let store_id = self.config.database_for(category)?.to_string();

        match category {
            Category::Task => {
                session.start_task(text, store_id, self.config.task_properties.clone());
                self.continue_task(session, out).await
            }
            Category::Idea | Category::Link => {
                let result = self
                    .committer
                    .commit(
                        &store_id,
                        &self.config.target(category).title_property,
                        &text,
                        &Default::default(),
                        &Default::default(),
                    )
                    .await;
                let success = if from_voice {
                    messages::saved_transcribed(category, &text)
                } else {
                    messages::saved(category)
                };
                self.finish(session, result, success, messages::STORE_FAILED, out)
                    .await
            }
        }
    }

    async fn on_property(&self, session: &mut Session, event: &Incoming, out: &dyn Outbox) -> Result<()> {
        let Some(current) = session.current_field().cloned() else {
            // Nothing shown yet; rescan from the cursor
            return self.continue_task(session, out).await;
        };

        let choice = match event {
            Incoming::Text(text) => accept_choice(session, text),
            _ => Choice::Rejected,
        };

        match choice {
            Choice::Rejected => {
                out.push(Reply::with_keyboard(
                    messages::choose_listed_value(&current.label),
                    options_keyboard(&current.options),
                ))
                .await;
                Ok(())
            }
            Choice::Skipped | Choice::Recorded => self.continue_task(session, out).await,
        }
    }

    async fn on_link(&self, session: &mut Session, event: &Incoming, out: &dyn Outbox) -> Result<()> {
        let url = match event {
            Incoming::Text(text) if is_web_url(text.trim()) => text.trim().to_string(),
            _ => {
                return Err(CaptureError::InvalidUserInput(
                    messages::INVALID_LINK.to_string(),
                ))
            }
        };

        let store_id = self.config.database_for(Category::Link)?.to_string();
        out.push(Reply::text(messages::LINK_RECEIVED)).await;

        let link = self.enricher.process(&url).await;
        let result = self
            .committer
            .commit_link(&store_id, &self.config.link, &link)
            .await;

        self.finish(
            session,
            result,
            messages::link_saved(&link.title),
            messages::LINK_STORE_FAILED,
            out,
        )
        .await
    }

    /// Ask for the next property with options, or commit the task.
    async fn continue_task(&self, session: &mut Session, out: &dyn Outbox) -> Result<()> {
        match advance_and_present(session, &self.resolver).await? {
            Step::Ask(field) => {
                out.push(Reply::with_keyboard(
                    messages::ask_property(&field.label),
                    options_keyboard(&field.options),
                ))
                .await;
                Ok(())
            }
            Step::Commit => {
                let (Some(store_id), Some(title)) = (
                    session.target_store_id().map(str::to_string),
                    session.title().map(str::to_string),
                ) else {
                    return Err(CaptureError::InvalidUserInput(messages::NO_SESSION.to_string()));
                };

                let result = self
                    .committer
                    .commit(
                        &store_id,
                        &self.config.task.title_property,
                        &title,
                        session.collected_properties(),
                        session.field_kinds(),
                    )
                    .await;
                self.finish(
                    session,
                    result,
                    messages::TASK_SAVED.to_string(),
                    messages::STORE_FAILED,
                    out,
                )
                .await
            }
        }
    }

    /// Report a commit and end the session.
    async fn finish(
        &self,
        session: &mut Session,
        result: std::result::Result<CommitOutcome, CommitError>,
        success: String,
        failure: &str,
        out: &dyn Outbox,
    ) -> Result<()> {
        let text = match result {
            Ok(outcome) => {
                tracing::info!(
                    "Flow {}: saved record {} after {}s",
                    session.flow_id(),
                    outcome.record_id(),
                    session.age_secs()
                );
                match outcome {
                    CommitOutcome::Created { .. } => success,
                    CommitOutcome::Partial { failed_step, .. } => {
                        messages::partially_saved(failed_step)
                    }
                }
            }
            Err(CommitError::Create(StoreError::NotConfigured(key))) => {
                return Err(CaptureError::missing(key, "Notion"));
            }
            Err(err) => {
                tracing::error!("Flow {}: {}", session.flow_id(), err);
                failure.to_string()
            }
        };

        session.clear();
        out.push(Reply::removing_keyboard(text)).await;
        Ok(())
    }

    async fn fail(&self, session: &mut Session, err: CaptureError, out: &dyn Outbox) {
        if err.is_recoverable() {
            out.push(Reply::text(err.user_message())).await;
            return;
        }

        match &err {
            CaptureError::ConfigurationMissing { .. } => {
                tracing::warn!("Flow {}: {}", session.flow_id(), err)
            }
            _ => tracing::error!("Flow {}: {}", session.flow_id(), err),
        }
        session.clear();
        out.push(Reply::removing_keyboard(err.user_message())).await;
    }
}

/// Absolute http(s) URL with a host.
fn is_web_url(text: &str) -> bool {
    url::Url::parse(text)
        .map(|u| matches!(u.scheme(), "http" | "https") && u.host_str().is_some())
        .unwrap_or(false)
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn web_urls() {
        assert!(is_web_url("https://example.com"));
        assert!(is_web_url("http://example.com/a?b=c"));
        assert!(!is_web_url("not-a-url"));
        assert!(!is_web_url("ftp://example.com"));
        assert!(!is_web_url("example.com"));
        assert!(!is_web_url("mailto:me@example.com"));
    }
}
