use tracing::{debug, info};

use super::api::{PdfUpload, QaApi};
use super::render::{plain_text, processing_time};
use crate::models::AnswerResult;

const FALLBACK_ERROR: &str = "Failed to get answer";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct QaFormState {
    pub file: Option<PdfUpload>,
    pub question: String,
    pub top_k: Option<u32>,
    pub result: Option<AnswerResult>,
    pub loading: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone)]
pub enum QaFormEvent {
    FileSelected(Option<PdfUpload>),
    QuestionChanged(String),
    TopKChanged(Option<u32>),
    SubmitStarted,
    Answered(AnswerResult),
    Failed(String),
}

/// An answer laid out for display
#[derive(Debug, Clone, PartialEq)]
pub struct AnswerView {
    pub answer: String,
    pub processing_time: String,
    pub document_hash: String,
    pub context_chunks: Vec<String>,
}

impl QaFormState {
    pub fn apply(&mut self, event: QaFormEvent) {
        debug!("Q&A form event: {:?}", event);
        match event {
            QaFormEvent::FileSelected(file) => self.file = file,
            QaFormEvent::QuestionChanged(question) => self.question = question,
            QaFormEvent::TopKChanged(top_k) => self.top_k = top_k,
            QaFormEvent::SubmitStarted => {
                self.loading = true;
                self.error = None;
                self.result = None;
            }
            QaFormEvent::Answered(result) => {
                self.loading = false;
                self.result = Some(result);
            }
            QaFormEvent::Failed(error) => {
                self.loading = false;
                self.error = Some(if error.is_empty() {
                    FALLBACK_ERROR.to_string()
                } else {
                    error
                });
            }
        }
    }

    pub fn can_submit(&self) -> bool {
        !self.loading && self.file.is_some() && !self.question.trim().is_empty()
    }

    pub fn submit_label(&self) -> &'static str {
        if self.loading {
            "Processing..."
        } else {
            "Ask Question"
        }
    }

    pub fn error_banner(&self) -> Option<String> {
        self.error.as_ref().map(|error| format!("Error: {}", error))
    }

    pub fn answer_view(&self) -> Option<AnswerView> {
        self.result.as_ref().map(|result| AnswerView {
            answer: plain_text(&result.answer),
            processing_time: processing_time(result.processing_time),
            document_hash: result.document_hash.clone(),
            context_chunks: result.context_chunks.clone(),
        })
    }
}

/// Single-shot question form. File and question stay in place after an
/// answer, so submitting again re-sends the same document.
pub struct QaForm<A> {
    api: A,
    state: QaFormState,
}

impl<A: QaApi> QaForm<A> {
    pub fn new(api: A) -> Self {
        Self {
            api,
            state: QaFormState::default(),
        }
    }

    pub fn state(&self) -> &QaFormState {
        &self.state
    }

    pub fn select_file(&mut self, file: Option<PdfUpload>) {
        self.state.apply(QaFormEvent::FileSelected(file));
    }

    pub fn set_question(&mut self, question: impl Into<String>) {
        self.state.apply(QaFormEvent::QuestionChanged(question.into()));
    }

    pub fn set_top_k(&mut self, top_k: Option<u32>) {
        self.state.apply(QaFormEvent::TopKChanged(top_k));
    }

    /// Send the current file and question. Returns `false` without doing
    /// anything when the form is incomplete or a request is in flight.
    pub async fn submit(&mut self) -> bool {
        if !self.state.can_submit() {
            debug!("Ignoring submit on incomplete or busy form");
            return false;
        }
        let Some(file) = self.state.file.clone() else {
            return false;
        };

        self.state.apply(QaFormEvent::SubmitStarted);
        info!("Asking about '{}'", file.file_name);

        let event = match self
            .api
            .ask(&file, &self.state.question, self.state.top_k)
            .await
        {
            Ok(result) => QaFormEvent::Answered(result),
            Err(e) => QaFormEvent::Failed(e.to_string()),
        };
        self.state.apply(event);
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::testing::{ScriptedApi, answer, report_pdf};

    #[test]
    fn test_submit_clears_previous_outcome() {
        let mut state = QaFormState {
            error: Some("old".to_string()),
            result: Some(answer("old")),
            ..Default::default()
        };

        state.apply(QaFormEvent::SubmitStarted);
        assert!(state.loading);
        assert!(state.error.is_none());
        assert!(state.result.is_none());
        assert_eq!(state.submit_label(), "Processing...");
        assert!(!state.can_submit());
    }

    #[test]
    fn test_answer_view_formats_result() {
        let mut state = QaFormState::default();
        let mut result = answer("<p>The total is <b>$500</b></p>");
        result.context_chunks = vec!["first".into(), "second".into()];
        state.apply(QaFormEvent::Answered(result));

        let view = state.answer_view().unwrap();
        assert_eq!(view.answer, "The total is $500");
        assert_eq!(view.processing_time, "1.23 seconds");
        assert_eq!(view.document_hash, "abc123");
        assert_eq!(view.context_chunks, vec!["first", "second"]);
    }

    #[test]
    fn test_empty_failure_message_falls_back() {
        let mut state = QaFormState::default();
        state.apply(QaFormEvent::Failed(String::new()));
        assert_eq!(state.error_banner().as_deref(), Some("Error: Failed to get answer"));
    }

    #[tokio::test]
    async fn test_incomplete_form_does_not_submit() {
        let mut form = QaForm::new(ScriptedApi::default());
        assert!(!form.submit().await);

        form.select_file(Some(report_pdf()));
        form.set_question("   ");
        assert!(!form.submit().await);
        assert!(form.api.asked.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_submit_success_keeps_inputs() {
        let api = ScriptedApi::default()
            .with_answer(Ok(answer("$500")))
            .with_answer(Ok(answer("$600")));
        let mut form = QaForm::new(api);
        form.select_file(Some(report_pdf()));
        form.set_question("What is the total?");

        assert!(form.submit().await);
        let state = form.state();
        assert!(!state.loading);
        assert_eq!(state.answer_view().unwrap().answer, "$500");
        assert_eq!(state.question, "What is the total?");
        assert!(state.file.is_some());

        // Re-submitting reuses the same file
        assert!(form.submit().await);
        assert_eq!(form.state().answer_view().unwrap().answer, "$600");
        let asked = form.api.asked.lock().unwrap();
        assert_eq!(asked.len(), 2);
        assert!(asked.iter().all(|(file, _)| file == "report.pdf"));
    }

    #[tokio::test]
    async fn test_submit_failure_shows_banner() {
        let api = ScriptedApi::default().with_answer(Err("Only PDF files are supported"));
        let mut form = QaForm::new(api);
        form.select_file(Some(report_pdf()));
        form.set_question("What is the total?");

        assert!(form.submit().await);
        let state = form.state();
        assert!(state.result.is_none());
        assert_eq!(
            state.error_banner().as_deref(),
            Some("Error: Only PDF files are supported")
        );
        assert_eq!(state.submit_label(), "Ask Question");
    }
}
