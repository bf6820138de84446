use serde::Serialize;
use std::time::Duration;
use thiserror::Error;
use tokio::time::{Instant, Interval, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use super::api::{PdfUpload, QaApi};

/// Pace of the typing effect, one character per tick
pub const REVEAL_INTERVAL: Duration = Duration::from_millis(20);

const NO_ANSWER: &str = "No answer returned.";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
    pub complete: bool,
}

impl Message {
    fn user(content: String, file: String) -> Self {
        Self {
            role: Role::User,
            content,
            file: Some(file),
            complete: true,
        }
    }

    fn assistant(content: String, complete: bool) -> Self {
        Self {
            role: Role::Assistant,
            content,
            file: None,
            complete,
        }
    }
}

/// Where the dashboard is in its one-question-per-PDF lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    NoFile,
    FileSelected,
    QuestionAsked,
}

/// What the input area offers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Controls {
    Upload,
    Ask { file_name: String, enabled: bool },
    Waiting,
    ResetOnly,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ChatRejection {
    #[error("Please upload a PDF file first")]
    NoFile,
    #[error("Please type a question")]
    EmptyQuestion,
    #[error("Only one question can be asked per PDF; upload a new PDF to ask another")]
    AlreadyAsked,
    #[error("The previous answer is still in progress")]
    Busy,
}

#[derive(Debug, Clone)]
pub enum ChatEvent {
    FileSelected(PdfUpload),
    InputChanged(String),
    Submitted,
    Answered(String),
    RequestFailed(String),
    RevealTick,
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
struct Reveal {
    text: Vec<char>,
    shown: usize,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ChatState {
    pub file: Option<PdfUpload>,
    pub input: String,
    pub messages: Vec<Message>,
    pub loading: bool,
    pub question_asked: bool,
    reveal: Option<Reveal>,
}

impl ChatState {
    pub fn phase(&self) -> Phase {
        if self.question_asked {
            Phase::QuestionAsked
        } else if self.file.is_some() {
            Phase::FileSelected
        } else {
            Phase::NoFile
        }
    }

    pub fn is_typing(&self) -> bool {
        self.reveal.is_some()
    }

    /// Blinking cursor while the answer placeholder is still empty
    pub fn shows_cursor(&self) -> bool {
        self.is_typing()
            && self
                .messages
                .last()
                .is_some_and(|message| message.content.is_empty())
    }

    pub fn controls(&self) -> Controls {
        match (self.phase(), &self.file) {
            (Phase::NoFile, _) => Controls::Upload,
            (Phase::FileSelected, Some(file)) => Controls::Ask {
                file_name: file.file_name.clone(),
                enabled: !self.loading && !self.is_typing(),
            },
            (Phase::FileSelected, None) => Controls::Upload,
            (Phase::QuestionAsked, _) if self.loading || self.is_typing() => Controls::Waiting,
            (Phase::QuestionAsked, _) => Controls::ResetOnly,
        }
    }

    /// The single transition function of the dashboard
    pub fn apply(&mut self, event: ChatEvent) -> Result<(), ChatRejection> {
        if !matches!(event, ChatEvent::RevealTick) {
            debug!("Chat event: {:?}", event);
        }
        match event {
            ChatEvent::FileSelected(file) => {
                if self.question_asked {
                    return Err(ChatRejection::AlreadyAsked);
                }
                self.file = Some(file);
            }
            ChatEvent::InputChanged(input) => self.input = input,
            ChatEvent::Submitted => {
                if self.loading || self.is_typing() {
                    return Err(ChatRejection::Busy);
                }
                if self.question_asked {
                    return Err(ChatRejection::AlreadyAsked);
                }
                if self.input.trim().is_empty() {
                    return Err(ChatRejection::EmptyQuestion);
                }
                let Some(file) = &self.file else {
                    return Err(ChatRejection::NoFile);
                };

                let question = std::mem::take(&mut self.input);
                self.messages
                    .push(Message::user(question, file.file_name.clone()));
                self.loading = true;
                self.question_asked = true;
            }
            ChatEvent::Answered(answer) => {
                let text = if answer.is_empty() {
                    NO_ANSWER.to_string()
                } else {
                    answer
                };
                self.loading = false;
                self.messages.push(Message::assistant(String::new(), false));
                self.reveal = Some(Reveal {
                    text: text.chars().collect(),
                    shown: 0,
                });
            }
            ChatEvent::RequestFailed(error) => {
                self.loading = false;
                self.messages
                    .push(Message::assistant(format!("Error: {}", error), true));
            }
            ChatEvent::RevealTick => self.reveal_next(),
            ChatEvent::Reset => *self = Self::default(),
        }
        Ok(())
    }

    fn reveal_next(&mut self) {
        let Some(reveal) = &mut self.reveal else {
            return;
        };
        let Some(message) = self
            .messages
            .last_mut()
            .filter(|message| message.role == Role::Assistant)
        else {
            self.reveal = None;
            return;
        };

        if let Some(ch) = reveal.text.get(reveal.shown) {
            message.content.push(*ch);
            reveal.shown += 1;
        }
        if reveal.shown >= reveal.text.len() {
            message.complete = true;
            self.reveal = None;
        }
    }

    /// The question currently being asked, taken from the last user message
    fn pending_question(&self) -> Option<&str> {
        self.messages
            .iter()
            .rev()
            .find(|message| message.role == Role::User)
            .map(|message| message.content.as_str())
    }
}

/// Chat-style front end: one question per uploaded PDF, with the answer typed
/// out one character per tick.
///
/// The reveal timer lives inside the dashboard while an answer is being
/// typed. It is dropped when the reveal completes, on reset, and together
/// with the dashboard, so it never ticks against stale state.
pub struct ChatDashboard<A> {
    api: A,
    state: ChatState,
    pace: Duration,
    reveal_timer: Option<Interval>,
}

impl<A: QaApi> ChatDashboard<A> {
    pub fn new(api: A) -> Self {
        Self::with_pace(api, REVEAL_INTERVAL)
    }

    pub fn with_pace(api: A, pace: Duration) -> Self {
        Self {
            api,
            state: ChatState::default(),
            pace,
            reveal_timer: None,
        }
    }

    pub fn state(&self) -> &ChatState {
        &self.state
    }

    pub fn select_file(&mut self, file: PdfUpload) -> Result<(), ChatRejection> {
        self.state.apply(ChatEvent::FileSelected(file))
    }

    pub fn set_input(&mut self, input: impl Into<String>) {
        // Input edits are never rejected
        let _ = self.state.apply(ChatEvent::InputChanged(input.into()));
    }

    /// Submit the typed question against the selected PDF. On success the
    /// answer placeholder is appended and the reveal timer starts; drive it
    /// with [`ChatDashboard::next_frame`] or [`ChatDashboard::finish_reveal`].
    pub async fn ask(&mut self) -> Result<(), ChatRejection> {
        self.state.apply(ChatEvent::Submitted)?;

        let (Some(file), Some(question)) = (&self.state.file, self.state.pending_question())
        else {
            return Err(ChatRejection::NoFile);
        };
        info!("Chat question about '{}'", file.file_name);

        let event = match self.api.ask(file, question, None).await {
            Ok(result) => ChatEvent::Answered(result.answer),
            Err(e) => ChatEvent::RequestFailed(e.to_string()),
        };
        self.state.apply(event)?;

        if self.state.is_typing() {
            let mut timer = interval_at(Instant::now() + self.pace, self.pace);
            timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
            self.reveal_timer = Some(timer);
        }
        Ok(())
    }

    /// Wait for the next reveal tick and show one more character. Returns
    /// `false` when there is nothing left to reveal.
    pub async fn next_frame(&mut self) -> bool {
        let Some(timer) = self.reveal_timer.as_mut() else {
            return false;
        };
        timer.tick().await;

        // Ticks never fail
        let _ = self.state.apply(ChatEvent::RevealTick);
        if !self.state.is_typing() {
            debug!("Reveal finished");
            self.reveal_timer = None;
        }
        true
    }

    pub async fn finish_reveal(&mut self) {
        while self.next_frame().await {}
    }

    /// Back to an empty dashboard with no file, cancelling any reveal.
    pub fn reset(&mut self) {
        self.reveal_timer = None;
        let _ = self.state.apply(ChatEvent::Reset);
    }
}
