//! Front-end side of the service: a typed client for the proxy routes and the
//! view-models that drive the health widget, the Q&A form and the chat
//! dashboard. Each view-model owns its state and funnels every mutation
//! through a single `apply` transition.

pub mod api;
pub mod chat;
pub mod health;
pub mod qa_form;
pub mod render;

pub use api::{ApiClient, ClientError, PdfUpload, QaApi};
pub use chat::{ChatDashboard, ChatEvent, ChatRejection, ChatState, Message, Role};
pub use health::{HealthEvent, HealthState, HealthWidget, Indicator};
pub use qa_form::{QaForm, QaFormEvent, QaFormState};
