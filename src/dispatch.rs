//! Command dispatcher
//!
//! Maps each operator action to at most one outbound request, applying the
//! per-action validation and the immediate local effects (clearing an input,
//! flipping a toggle) before anything goes over the wire.

use crossterm::event::{KeyCode, KeyEvent};
use reqwest::Method;
use serde_json::{json, Value};

use crate::log::LogId;
use crate::selection::ConfigurationForm;
use crate::toggle::{Toggle, Toggles};

/// Every backend route the console talks to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    Generate,
    Connect,
    Chat,
    GraspPolicy,
    NewInteraction,
    Execute,
    Home,
    Move,
    Grasp,
    Release,
    KeepPolicy,
    TeachMode,
    SetHome,
    VlaObs,
    VlaAct,
    VlaResetPolicy,
    VlaRobotToggle,
    VlaRecordLoad,
    VlaObsAct,
}

impl Endpoint {
    pub fn path(&self) -> &'static str {
        match self {
            Endpoint::Generate => "/generate",
            Endpoint::Connect => "/connect",
            Endpoint::Chat => "/chat",
            Endpoint::GraspPolicy => "/grasp_policy",
            Endpoint::NewInteraction => "/new_interaction",
            Endpoint::Execute => "/execute",
            Endpoint::Home => "/home",
            Endpoint::Move => "/move",
            Endpoint::Grasp => "/grasp",
            Endpoint::Release => "/release",
            Endpoint::KeepPolicy => "/keep_policy",
            Endpoint::TeachMode => "/teach_mode",
            Endpoint::SetHome => "/set_home",
            Endpoint::VlaObs => "/vla_obs",
            Endpoint::VlaAct => "/vla_act",
            Endpoint::VlaResetPolicy => "/vla_reset_policy",
            Endpoint::VlaRobotToggle => "/vla_robot_toggle",
            Endpoint::VlaRecordLoad => "/vla_record_load",
            Endpoint::VlaObsAct => "/vla_obs_act",
        }
    }

    pub fn for_toggle(toggle: Toggle) -> Self {
        match toggle {
            Toggle::KeepPolicy => Endpoint::KeepPolicy,
            Toggle::TeachMode => Endpoint::TeachMode,
            Toggle::VlaRobot => Endpoint::VlaRobotToggle,
            Toggle::RecordLoad => Endpoint::VlaRecordLoad,
        }
    }
}

/// One outbound request: always a POST, optionally with a JSON body
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    pub endpoint: Endpoint,
    pub body: Option<Value>,
}

impl RequestDescriptor {
    pub fn new(endpoint: Endpoint) -> Self {
        Self { endpoint, body: None }
    }

    pub fn with_body(endpoint: Endpoint, body: Value) -> Self {
        Self {
            endpoint,
            body: Some(body),
        }
    }

    pub fn chat(message: &str) -> Self {
        Self::with_body(Endpoint::Chat, json!({ "message": message }))
    }

    /// Follow-up request of the chat flow
    pub fn grasp_policy(message: &str) -> Self {
        Self::with_body(Endpoint::GraspPolicy, json!({ "message": message }))
    }

    pub fn method(&self) -> Method {
        Method::POST
    }

    pub fn path(&self) -> &'static str {
        self.endpoint.path()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RobotCommand {
    Execute,
    Home,
    Move,
    Grasp,
    Release,
    SetHome,
}

impl RobotCommand {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            RobotCommand::Execute => Endpoint::Execute,
            RobotCommand::Home => Endpoint::Home,
            RobotCommand::Move => Endpoint::Move,
            RobotCommand::Grasp => Endpoint::Grasp,
            RobotCommand::Release => Endpoint::Release,
            RobotCommand::SetHome => Endpoint::SetHome,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VlaCommand {
    Observe,
    Act,
    ResetPolicy,
}

impl VlaCommand {
    pub fn endpoint(&self) -> Endpoint {
        match self {
            VlaCommand::Observe => Endpoint::VlaObs,
            VlaCommand::Act => Endpoint::VlaAct,
            VlaCommand::ResetPolicy => Endpoint::VlaResetPolicy,
        }
    }
}

/// Everything the operator can trigger
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    /// Starts the chained chat flow
    SendChat,
    /// Observe/act cycles with the count taken from the VLA input
    ObserveAct,
    Generate,
    Configure,
    NewInteraction,
    Robot(RobotCommand),
    Vla(VlaCommand),
    Toggle(Toggle),
    Clear(LogId),
}

/// Only Enter sends; modifiers are not inspected
pub fn is_send_key(key: &KeyEvent) -> bool {
    key.code == KeyCode::Enter
}

/// A single-line editable input with a char-indexed cursor
#[derive(Debug, Clone, Default)]
pub struct InputField {
    text: String,
    cursor: usize,
}

/// Convert a character index to a byte index for UTF-8 safe string operations
fn char_to_byte_index(s: &str, char_idx: usize) -> usize {
    s.char_indices()
        .nth(char_idx)
        .map(|(i, _)| i)
        .unwrap_or(s.len())
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn set(&mut self, text: &str) {
        self.text = text.to_string();
        self.cursor = self.text.chars().count();
    }

    pub fn clear(&mut self) {
        self.text.clear();
        self.cursor = 0;
    }

    pub fn insert(&mut self, c: char) {
        let byte_pos = char_to_byte_index(&self.text, self.cursor);
        self.text.insert(byte_pos, c);
        self.cursor += 1;
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.text.chars().count() {
            let byte_pos = char_to_byte_index(&self.text, self.cursor);
            self.text.remove(byte_pos);
        }
    }

    pub fn left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.text.chars().count());
    }

    pub fn home(&mut self) {
        self.cursor = 0;
    }

    pub fn end(&mut self) {
        self.cursor = self.text.chars().count();
    }

    /// Take the trimmed contents, clearing the field. Blank input is left
    /// untouched and yields `None`.
    pub fn take_message(&mut self) -> Option<String> {
        let message = self.text.trim();
        if message.is_empty() {
            return None;
        }
        let message = message.to_string();
        self.clear();
        Some(message)
    }
}

/// The input surfaces actions read from
#[derive(Debug, Clone)]
pub struct Inputs {
    pub chat: InputField,
    pub vla: InputField,
    pub generate: InputField,
    pub form: ConfigurationForm,
}

impl Inputs {
    pub fn new(form: ConfigurationForm) -> Self {
        Self {
            chat: InputField::new(),
            vla: InputField::new(),
            generate: InputField::new(),
            form,
        }
    }
}

/// Result of validating an action
#[derive(Debug, Clone, PartialEq)]
pub enum Prepared {
    /// Start the chained chat flow with this message
    Chat(String),
    Request(RequestDescriptor),
    /// Local only, no request
    Clear(LogId),
    /// Validation failed; nothing is sent
    Rejected,
}

/// Validate `action` against the current inputs and apply its immediate UI
/// effects.
pub fn prepare(action: Action, inputs: &mut Inputs, toggles: &mut Toggles) -> Prepared {
    match action {
        Action::SendChat => match inputs.chat.take_message() {
            Some(message) => Prepared::Chat(message),
            None => Prepared::Rejected,
        },
        Action::ObserveAct => match inputs.vla.take_message() {
            Some(message) => Prepared::Request(RequestDescriptor::with_body(
                Endpoint::VlaObsAct,
                json!({ "message": message }),
            )),
            None => Prepared::Rejected,
        },
        Action::Generate => Prepared::Request(RequestDescriptor::with_body(
            Endpoint::Generate,
            Value::String(inputs.generate.text().to_string()),
        )),
        Action::Configure => {
            let selection = inputs.form.assemble();
            match serde_json::to_value(&selection) {
                Ok(body) => Prepared::Request(RequestDescriptor::with_body(Endpoint::Connect, body)),
                Err(e) => {
                    tracing::error!(error = %e, "could not encode configuration selection");
                    Prepared::Rejected
                }
            }
        }
        Action::NewInteraction => Prepared::Request(RequestDescriptor::new(Endpoint::NewInteraction)),
        Action::Robot(command) => Prepared::Request(RequestDescriptor::new(command.endpoint())),
        Action::Vla(command) => Prepared::Request(RequestDescriptor::new(command.endpoint())),
        Action::Toggle(toggle) => {
            let on = toggles.flip(toggle);
            tracing::debug!(toggle = toggle.display_name(), on, "toggle flipped");
            Prepared::Request(RequestDescriptor::new(Endpoint::for_toggle(toggle)))
        }
        Action::Clear(log) => Prepared::Clear(log),
    }
}
