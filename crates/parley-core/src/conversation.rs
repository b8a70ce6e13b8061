//! Conversation controller.
//!
//! Owns the message log and the transient session state (pending request,
//! draft input, copy acknowledgment). All mutation happens on the caller's
//! task; the completion request and the acknowledgment timer run as spawned
//! tasks that report back through [`ConversationEvent`]s, which the caller
//! feeds into [`Conversation::apply`].

use anyhow::Result;
use log::{debug, error, info, warn};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

use crate::clipboard::ClipboardWriter;
use crate::completion::{CompletionClient, CompletionError, CompletionService, WireMessage};
use crate::config::Settings;
use crate::message::{MessageId, MessageLog, Role};

pub const DEFAULT_GREETING: &str = "Hello! I'm your assistant. How can I help you today?";
pub const APOLOGY: &str =
    "Sorry, I encountered an error while processing your request. Please try again.";
pub const NO_RESPONSE: &str = "Sorry, I couldn't generate a response.";
pub const DEFAULT_COPY_ACKNOWLEDGMENT: Duration = Duration::from_secs(2);

/// Whether a completion request is outstanding
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RequestState {
    #[default]
    Idle,
    Awaiting,
}

/// Completions of suspended work, delivered back to the owning task
#[derive(Debug)]
pub enum ConversationEvent {
    ReplyReady(Result<Option<String>, CompletionError>),
    /// Carries the generation of the acknowledgment that scheduled it
    AcknowledgmentExpired(u64),
}

#[derive(Debug, Clone)]
pub struct ConversationOptions {
    pub greeting: String,
    pub copy_acknowledgment: Duration,
}

impl Default for ConversationOptions {
    fn default() -> Self {
        Self {
            greeting: DEFAULT_GREETING.to_string(),
            copy_acknowledgment: DEFAULT_COPY_ACKNOWLEDGMENT,
        }
    }
}

pub struct Conversation {
    messages: MessageLog,
    request: RequestState,
    draft: String,
    copy_acknowledgment: Option<String>,
    acknowledgment_generation: u64,
    acknowledgment_timer: Option<JoinHandle<()>>,
    acknowledgment_delay: Duration,
    service: Arc<dyn CompletionService>,
    clipboard: Box<dyn ClipboardWriter>,
    events: mpsc::UnboundedSender<ConversationEvent>,
}

impl Conversation {
    pub fn new(
        options: ConversationOptions,
        service: Arc<dyn CompletionService>,
        clipboard: Box<dyn ClipboardWriter>,
        events: mpsc::UnboundedSender<ConversationEvent>,
    ) -> Self {
        Self {
            messages: MessageLog::with_greeting(options.greeting),
            request: RequestState::Idle,
            draft: String::new(),
            copy_acknowledgment: None,
            acknowledgment_generation: 0,
            acknowledgment_timer: None,
            acknowledgment_delay: options.copy_acknowledgment,
            service,
            clipboard,
            events,
        }
    }

    /// Build a conversation talking to the configured HTTP endpoint, along
    /// with the receiver its events arrive on.
    pub fn connect(
        settings: Settings,
        clipboard: Box<dyn ClipboardWriter>,
    ) -> Result<(Self, mpsc::UnboundedReceiver<ConversationEvent>)> {
        let client = CompletionClient::new(settings.completion)?;
        let (tx, rx) = mpsc::unbounded_channel();
        let conversation = Self::new(settings.conversation, Arc::new(client), clipboard, tx);
        Ok((conversation, rx))
    }

    pub fn messages(&self) -> &MessageLog {
        &self.messages
    }

    pub fn request_state(&self) -> RequestState {
        self.request
    }

    pub fn is_pending(&self) -> bool {
        self.request == RequestState::Awaiting
    }

    pub fn draft(&self) -> &str {
        &self.draft
    }

    pub fn draft_mut(&mut self) -> &mut String {
        &mut self.draft
    }

    pub fn set_draft(&mut self, text: impl Into<String>) {
        self.draft = text.into();
    }

    pub fn copy_acknowledgment(&self) -> Option<&str> {
        self.copy_acknowledgment.as_deref()
    }

    /// Acknowledgment is keyed by content, so identical blocks light up together.
    pub fn is_acknowledged(&self, content: &str) -> bool {
        self.copy_acknowledgment.as_deref() == Some(content)
    }

    /// Submit the current draft
    pub fn submit_draft(&mut self) -> Option<MessageId> {
        let text = self.draft.clone();
        self.submit(text)
    }

    /// Append a user turn and request the assistant's reply.
    ///
    /// Blank text, or any submission while a request is outstanding, is
    /// ignored and returns `None`.
    pub fn submit(&mut self, text: impl Into<String>) -> Option<MessageId> {
        let text = text.into();
        if text.trim().is_empty() {
            debug!("Ignoring blank submission");
            return None;
        }
        if self.request == RequestState::Awaiting {
            debug!("Ignoring submission while a reply is pending");
            return None;
        }

        let id = self.messages.append(Role::User, text).id();
        self.draft.clear();
        self.request = RequestState::Awaiting;

        let history: Vec<WireMessage> = self.messages.iter().map(WireMessage::from).collect();
        info!("Submitting message {} with {} turns of history", id, history.len());

        let service = Arc::clone(&self.service);
        let events = self.events.clone();
        tokio::spawn(async move {
            // A panicking service still has to settle the request
            let request = tokio::spawn(async move { service.complete(&history).await });
            let result = match request.await {
                Ok(result) => result,
                Err(e) => Err(CompletionError::Aborted(e)),
            };
            if events.send(ConversationEvent::ReplyReady(result)).is_err() {
                debug!("Conversation closed before the reply arrived");
            }
        });

        Some(id)
    }

    /// Copy a code block to the clipboard and show the acknowledgment for it.
    ///
    /// Returns false when the clipboard write failed; state is left unchanged.
    pub fn acknowledge_copy(&mut self, content: &str) -> bool {
        if let Err(e) = self.clipboard.write_text(content) {
            error!("Failed to copy: {}", e);
            return false;
        }

        self.acknowledgment_generation += 1;
        let generation = self.acknowledgment_generation;
        self.copy_acknowledgment = Some(content.to_string());

        if let Some(timer) = self.acknowledgment_timer.take() {
            timer.abort();
        }
        let delay = self.acknowledgment_delay;
        let events = self.events.clone();
        self.acknowledgment_timer = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if events.send(ConversationEvent::AcknowledgmentExpired(generation)).is_err() {
                debug!("Conversation closed before acknowledgment {} expired", generation);
            }
        }));

        debug!("Acknowledged copy {} ({} chars)", generation, content.len());
        true
    }

    pub fn apply(&mut self, event: ConversationEvent) {
        match event {
            ConversationEvent::ReplyReady(result) => self.settle(result),
            ConversationEvent::AcknowledgmentExpired(generation) => {
                self.expire_acknowledgment(generation)
            }
        }
    }

    fn settle(&mut self, result: Result<Option<String>, CompletionError>) {
        if self.request != RequestState::Awaiting {
            warn!("Dropping reply that arrived with no request pending");
            return;
        }

        let content = match result {
            Ok(Some(content)) => content,
            Ok(None) => {
                debug!("Completion carried no content, using placeholder");
                NO_RESPONSE.to_string()
            }
            Err(e) => {
                match &e {
                    CompletionError::Status { status, .. } => {
                        warn!("Completion service returned status {}", status.as_u16())
                    }
                    CompletionError::Transport(err) if err.is_timeout() => {
                        warn!("Completion request timed out: {}", err)
                    }
                    CompletionError::Transport(err) => warn!("Completion request failed: {}", err),
                    CompletionError::Decode(err) => warn!("Undecodable completion body: {}", err),
                    CompletionError::Aborted(err) => error!("Completion task failed: {}", err),
                }
                APOLOGY.to_string()
            }
        };

        self.messages.append(Role::Assistant, content);
        self.request = RequestState::Idle;
    }

    fn expire_acknowledgment(&mut self, generation: u64) {
        if generation != self.acknowledgment_generation {
            return;
        }
        debug!("Copy acknowledgment {} expired", generation);
        self.copy_acknowledgment = None;
        self.acknowledgment_timer = None;
    }
}
