pub mod app;
pub mod backend;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod handler;
pub mod highlight;
pub mod log;
pub mod message;
pub mod orchestrator;
pub mod render;
pub mod selection;
pub mod status;
pub mod toggle;
pub mod tui;
pub mod ui;

// Re-export main types for convenience
pub use backend::BackendClient;
pub use config::Config;
pub use dispatch::{Action, Endpoint, RequestDescriptor};
pub use error::ConsoleError;
pub use log::{ConversationLog, LogId, Logs};
pub use message::{Message, MessageKind};
pub use orchestrator::{ChatPhase, Completion, Orchestrator};
pub use status::{Lifecycle, StatusBoard, Subsystem};
pub use toggle::{Toggle, Toggles};
