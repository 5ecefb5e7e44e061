//! Interaction orchestrator
//!
//! Turns dispatched actions into backend requests and feeds their replies to
//! the renderer and the status board. Requests run in spawned tasks; their
//! results come back as [`Completion`]s over an unbounded channel and are
//! applied on the owner's loop, so all state lives in one place and is only
//! mutated there.
//!
//! The chat flow is the one chained sequence: the primary `/chat` request and,
//! once its reply has been applied, the follow-up `/grasp_policy` request with
//! the same message. The follow-up is only issued from
//! [`Orchestrator::apply`], so a flow's phase always names the request that is
//! actually on the wire.

use std::collections::BTreeMap;

use serde_json::Value;
use tokio::sync::mpsc::UnboundedSender;

use crate::backend::{decode, BackendClient, ConnectReply, GenerateReply, StatusReply};
use crate::dispatch::{self, Action, Endpoint, Inputs, Prepared, RequestDescriptor};
use crate::error::ConsoleError;
use crate::log::{LogId, Logs};
use crate::message::{messages_from_reply, Message, ROLE_LLM, ROLE_USER};
use crate::render;
use crate::selection::ConfigurationForm;
use crate::status::{Lifecycle, StatusBoard, Subsystem};
use crate::toggle::Toggles;

/// Identifies one run of the chat flow
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FlowId(u64);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ChatPhase {
    #[default]
    Idle,
    AwaitingPrimary,
    AwaitingSecondary,
}

/// Result of a request, posted back to the orchestrator's owner
#[derive(Debug)]
pub enum Completion {
    ChatPrimary {
        flow: FlowId,
        outcome: Result<Vec<Message>, ConsoleError>,
    },
    ChatSecondary {
        flow: FlowId,
        outcome: Result<Vec<Message>, ConsoleError>,
    },
    Request {
        endpoint: Endpoint,
        outcome: Result<Value, ConsoleError>,
    },
}

/// Logs a single-request action renders its reply into
pub fn reply_targets(endpoint: Endpoint) -> &'static [LogId] {
    match endpoint {
        Endpoint::Execute => &[LogId::Chat, LogId::Robot],
        Endpoint::Generate | Endpoint::Chat | Endpoint::GraspPolicy => &[LogId::Chat],
        Endpoint::NewInteraction => &[],
        _ => &[LogId::Robot],
    }
}

/// Subsystem whose indicator follows a request's lifecycle
pub fn subsystem_for(endpoint: Endpoint) -> Option<Subsystem> {
    match endpoint {
        Endpoint::Connect => Some(Subsystem::Connect),
        Endpoint::Chat | Endpoint::GraspPolicy => Some(Subsystem::Chat),
        Endpoint::Generate | Endpoint::NewInteraction => None,
        _ => Some(Subsystem::Robot),
    }
}

/// An in-flight chat flow
#[derive(Debug, Clone)]
struct ChatFlow {
    phase: ChatPhase,
    /// Carried again by the follow-up request
    message: String,
}

pub struct Orchestrator {
    client: BackendClient,
    completions: UnboundedSender<Completion>,
    logs: Logs,
    status: StatusBoard,
    toggles: Toggles,
    inputs: Inputs,
    chat_flows: BTreeMap<FlowId, ChatFlow>,
    next_flow: u64,
}

impl Orchestrator {
    pub fn new(
        client: BackendClient,
        form: ConfigurationForm,
        completions: UnboundedSender<Completion>,
    ) -> Self {
        Self {
            client,
            completions,
            logs: Logs::new(),
            status: StatusBoard::new(),
            toggles: Toggles::new(),
            inputs: Inputs::new(form),
            chat_flows: BTreeMap::new(),
            next_flow: 0,
        }
    }

    pub fn logs(&self) -> &Logs {
        &self.logs
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn toggles(&self) -> &Toggles {
        &self.toggles
    }

    pub fn inputs(&self) -> &Inputs {
        &self.inputs
    }

    pub fn inputs_mut(&mut self) -> &mut Inputs {
        &mut self.inputs
    }

    /// Phase of the most recently started chat flow still in flight
    pub fn chat_phase(&self) -> ChatPhase {
        self.chat_flows
            .values()
            .next_back()
            .map(|flow| flow.phase)
            .unwrap_or_default()
    }

    pub fn flow_phase(&self, flow: FlowId) -> ChatPhase {
        self.chat_flows
            .get(&flow)
            .map(|flow| flow.phase)
            .unwrap_or_default()
    }

    pub fn chat_in_flight(&self) -> usize {
        self.chat_flows.len()
    }

    /// Run one operator action. Returns whether a request was issued.
    pub fn dispatch(&mut self, action: Action) -> bool {
        match dispatch::prepare(action, &mut self.inputs, &mut self.toggles) {
            Prepared::Chat(message) => {
                self.start_chat(message);
                true
            }
            Prepared::Request(request) => {
                self.issue(request);
                true
            }
            Prepared::Clear(log) => {
                render::clear(&mut self.logs, log);
                false
            }
            Prepared::Rejected => {
                tracing::debug!(?action, "action rejected, nothing sent");
                false
            }
        }
    }

    fn start_chat(&mut self, message: String) -> FlowId {
        let flow = FlowId(self.next_flow);
        self.next_flow += 1;

        render::render(&mut self.logs, LogId::Chat, &Message::text(ROLE_USER, message.as_str()));
        self.status.set(Subsystem::Chat, Lifecycle::Pending);
        self.spawn_chat_step(flow, ChatPhase::AwaitingPrimary, RequestDescriptor::chat(&message));
        self.chat_flows.insert(
            flow,
            ChatFlow {
                phase: ChatPhase::AwaitingPrimary,
                message,
            },
        );
        flow
    }

    fn spawn_chat_step(&self, flow: FlowId, phase: ChatPhase, request: RequestDescriptor) {
        let client = self.client.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = client.messages(&request).await;
            let completion = match phase {
                ChatPhase::AwaitingSecondary => Completion::ChatSecondary { flow, outcome },
                _ => Completion::ChatPrimary { flow, outcome },
            };
            let _ = completions.send(completion);
        });
    }

    fn issue(&mut self, request: RequestDescriptor) {
        let endpoint = request.endpoint;
        if let Some(subsystem) = subsystem_for(endpoint) {
            self.status.set(subsystem, Lifecycle::Pending);
        }

        let client = self.client.clone();
        let completions = self.completions.clone();
        tokio::spawn(async move {
            let outcome = client.send(&request).await;
            let _ = completions.send(Completion::Request { endpoint, outcome });
        });
    }

    /// Apply a completed request to logs and indicators
    pub fn apply(&mut self, completion: Completion) {
        match completion {
            Completion::ChatPrimary { flow, outcome } => self.on_chat_primary(flow, outcome),
            Completion::ChatSecondary { flow, outcome } => self.on_chat_secondary(flow, outcome),
            Completion::Request { endpoint, outcome } => self.on_request(endpoint, outcome),
        }
    }

    fn on_chat_primary(&mut self, flow: FlowId, outcome: Result<Vec<Message>, ConsoleError>) {
        match outcome {
            Ok(messages) => {
                self.status.set(Subsystem::Chat, Lifecycle::Succeeded);
                render::render_batch(&mut self.logs, LogId::Chat, &messages);

                let follow_up = self.chat_flows.get_mut(&flow).map(|state| {
                    state.phase = ChatPhase::AwaitingSecondary;
                    RequestDescriptor::grasp_policy(&state.message)
                });
                match follow_up {
                    Some(request) => {
                        self.spawn_chat_step(flow, ChatPhase::AwaitingSecondary, request)
                    }
                    None => tracing::warn!(?flow, "reply for an unknown chat flow"),
                }
            }
            Err(e) => {
                // Indicator is left as it is; failures only go to the log file.
                tracing::warn!(error = %e, ?flow, "chat request failed, follow-up not issued");
                self.chat_flows.remove(&flow);
            }
        }
    }

    fn on_chat_secondary(&mut self, flow: FlowId, outcome: Result<Vec<Message>, ConsoleError>) {
        self.chat_flows.remove(&flow);
        match outcome {
            Ok(messages) => {
                self.status.set(Subsystem::Chat, Lifecycle::FollowUpSucceeded);
                render::render_batch(&mut self.logs, LogId::Chat, &messages);
                tracing::info!(?flow, "chat flow complete");
            }
            Err(e) => tracing::warn!(error = %e, ?flow, "policy follow-up failed"),
        }
    }

    fn on_request(&mut self, endpoint: Endpoint, outcome: Result<Value, ConsoleError>) {
        let reply = match outcome {
            Ok(reply) => reply,
            Err(e) => {
                tracing::warn!(error = %e, path = endpoint.path(), "request failed");
                return;
            }
        };

        match endpoint {
            Endpoint::Connect => self.on_connect(reply),
            Endpoint::Generate => self.on_generate(reply),
            Endpoint::NewInteraction => self.on_new_interaction(reply),
            _ => {
                if let Some(subsystem) = subsystem_for(endpoint) {
                    self.status.set(subsystem, Lifecycle::Succeeded);
                }
                let messages = messages_from_reply(&reply);
                for log in reply_targets(endpoint) {
                    render::render_batch(&mut self.logs, *log, &messages);
                }
            }
        }
    }

    fn on_connect(&mut self, reply: Value) {
        let messages = messages_from_reply(&reply);
        match decode::<ConnectReply>(Endpoint::Connect.path(), reply) {
            Ok(connect) if connect.connected => {
                self.status.set(Subsystem::Connect, Lifecycle::Succeeded);
                tracing::info!(config = ?connect.config, "backend connected");
            }
            Ok(connect) => tracing::warn!(
                reason = connect.message.as_deref().unwrap_or(""),
                "backend refused connection"
            ),
            Err(e) => tracing::warn!(error = %e, "unexpected connect reply"),
        }
        for log in reply_targets(Endpoint::Connect) {
            render::render_batch(&mut self.logs, *log, &messages);
        }
    }

    fn on_generate(&mut self, reply: Value) {
        match decode::<GenerateReply>(Endpoint::Generate.path(), reply) {
            Ok(generated) => {
                let messages = [Message::code(ROLE_LLM, generated.completion)];
                for log in reply_targets(Endpoint::Generate) {
                    render::render_batch(&mut self.logs, *log, &messages);
                }
            }
            Err(e) => tracing::warn!(error = %e, "unexpected generate reply"),
        }
    }

    fn on_new_interaction(&mut self, reply: Value) {
        match decode::<StatusReply>(Endpoint::NewInteraction.path(), reply) {
            Ok(status) if status.success => {
                render::clear(&mut self.logs, LogId::Chat);
                tracing::info!("new interaction started");
            }
            Ok(status) => tracing::warn!(
                reason = status.message.as_deref().unwrap_or(""),
                "backend could not start a new interaction"
            ),
            Err(e) => tracing::warn!(error = %e, "unexpected new_interaction reply"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OptionCatalog;
    use crate::log::{LogEntry, RenderedBody};
    use crate::toggle::Toggle;
    use serde_json::json;
    use tokio::sync::mpsc;

    // Nothing listens here; requests issued by these tests fail in the
    // background and their completions are simply never applied.
    fn orchestrator() -> (Orchestrator, mpsc::UnboundedReceiver<Completion>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let client = BackendClient::new("http://127.0.0.1:9");
        let form = ConfigurationForm::new(&OptionCatalog::default());
        (Orchestrator::new(client, form, tx), rx)
    }

    fn texts(orchestrator: &Orchestrator, log: LogId) -> Vec<String> {
        orchestrator
            .logs()
            .get(log)
            .messages()
            .map(|m| match &m.body {
                RenderedBody::Text(t) => format!("{} {}", m.label, t),
                RenderedBody::Code(c) => format!("{} {}", m.label, c.source),
                RenderedBody::Image(_) => format!("{} <image>", m.label),
            })
            .collect()
    }

    #[tokio::test]
    async fn test_send_echoes_and_goes_pending() {
        let (mut orchestrator, _rx) = orchestrator();
        orchestrator.inputs_mut().chat.set("hello");
        assert!(orchestrator.dispatch(Action::SendChat));

        assert_eq!(texts(&orchestrator, LogId::Chat), vec!["USER: hello"]);
        assert_eq!(orchestrator.logs().get(LogId::Chat).separator_count(), 0);
        assert_eq!(orchestrator.status().state(Subsystem::Chat), Lifecycle::Pending);
        assert_eq!(orchestrator.chat_phase(), ChatPhase::AwaitingPrimary);
        assert_eq!(orchestrator.inputs().chat.text(), "");
    }

    #[tokio::test]
    async fn test_empty_send_does_nothing() {
        let (mut orchestrator, mut rx) = orchestrator();
        assert!(!orchestrator.dispatch(Action::SendChat));
        assert!(orchestrator.logs().get(LogId::Chat).is_empty());
        assert_eq!(orchestrator.status().state(Subsystem::Chat), Lifecycle::Idle);
        assert_eq!(orchestrator.chat_phase(), ChatPhase::Idle);
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_chat_flow_orders_batches() {
        let (mut orchestrator, _rx) = orchestrator();
        orchestrator.inputs_mut().chat.set("hello");
        orchestrator.dispatch(Action::SendChat);
        let flow = FlowId(0);

        orchestrator.apply(Completion::ChatPrimary {
            flow,
            outcome: Ok(vec![Message::text("assistant", "hi")]),
        });
        assert_eq!(orchestrator.flow_phase(flow), ChatPhase::AwaitingSecondary);
        assert_eq!(orchestrator.status().state(Subsystem::Chat), Lifecycle::Succeeded);

        orchestrator.apply(Completion::ChatSecondary {
            flow,
            outcome: Ok(vec![Message::system("policy noted")]),
        });
        assert_eq!(orchestrator.flow_phase(flow), ChatPhase::Idle);
        assert_eq!(
            orchestrator.status().state(Subsystem::Chat),
            Lifecycle::FollowUpSucceeded
        );
        assert_eq!(
            texts(&orchestrator, LogId::Chat),
            vec!["USER: hello", "ASSISTANT: hi", "SYSTEM: policy noted"]
        );
        assert_eq!(orchestrator.logs().get(LogId::Chat).separator_count(), 2);
    }

    #[tokio::test]
    async fn test_follow_up_is_issued_when_primary_is_applied() {
        let (mut orchestrator, mut rx) = orchestrator();
        orchestrator.inputs_mut().chat.set("hello");
        orchestrator.dispatch(Action::SendChat);

        let first = rx.recv().await.unwrap();
        assert!(matches!(first, Completion::ChatPrimary { flow: FlowId(0), .. }));
        assert!(rx.try_recv().is_err());

        orchestrator.apply(Completion::ChatPrimary {
            flow: FlowId(0),
            outcome: Ok(vec![]),
        });
        assert_eq!(orchestrator.flow_phase(FlowId(0)), ChatPhase::AwaitingSecondary);
        let second = rx.recv().await.unwrap();
        assert!(matches!(second, Completion::ChatSecondary { flow: FlowId(0), .. }));
    }

    #[tokio::test]
    async fn test_primary_failure_ends_flow_without_touching_indicator() {
        let (mut orchestrator, _rx) = orchestrator();
        orchestrator.inputs_mut().chat.set("hello");
        orchestrator.dispatch(Action::SendChat);

        orchestrator.apply(Completion::ChatPrimary {
            flow: FlowId(0),
            outcome: Err(ConsoleError::Decode {
                path: "/chat",
                reason: "bad".to_string(),
            }),
        });
        assert_eq!(orchestrator.chat_phase(), ChatPhase::Idle);
        assert_eq!(orchestrator.status().state(Subsystem::Chat), Lifecycle::Pending);
        assert_eq!(orchestrator.logs().get(LogId::Chat).len(), 1);
    }

    #[tokio::test]
    async fn test_execute_renders_into_both_logs() {
        let (mut orchestrator, _rx) = orchestrator();
        orchestrator.apply(Completion::Request {
            endpoint: Endpoint::Execute,
            outcome: Ok(json!({"messages": [
                {"role": "grasp", "type": "text", "content": "closing"},
                {"role": "grasp", "type": "text", "content": "done"}
            ]})),
        });
        for log in LogId::all() {
            let entries = orchestrator.logs().get(log).entries();
            assert_eq!(entries.len(), 3);
            assert_eq!(entries[2], LogEntry::Separator);
        }
        assert_eq!(orchestrator.status().state(Subsystem::Robot), Lifecycle::Succeeded);
    }

    #[tokio::test]
    async fn test_failed_request_changes_nothing() {
        let (mut orchestrator, _rx) = orchestrator();
        assert!(orchestrator.dispatch(Action::Toggle(Toggle::KeepPolicy)));
        orchestrator.apply(Completion::Request {
            endpoint: Endpoint::KeepPolicy,
            outcome: Err(ConsoleError::Decode {
                path: "/keep_policy",
                reason: "bad".to_string(),
            }),
        });
        assert!(orchestrator.toggles().is_on(Toggle::KeepPolicy));
        assert_eq!(orchestrator.status().state(Subsystem::Robot), Lifecycle::Pending);
        assert!(orchestrator.logs().get(LogId::Robot).is_empty());
    }

    #[tokio::test]
    async fn test_refused_connect_keeps_indicator_but_shows_reason() {
        let (mut orchestrator, _rx) = orchestrator();
        orchestrator.dispatch(Action::Configure);
        orchestrator.apply(Completion::Request {
            endpoint: Endpoint::Connect,
            outcome: Ok(json!({"connected": false, "message": "Failed to connect to robot.\n"})),
        });
        assert_eq!(orchestrator.status().state(Subsystem::Connect), Lifecycle::Pending);
        assert_eq!(
            texts(&orchestrator, LogId::Robot),
            vec!["SYSTEM: Failed to connect to robot.\n"]
        );
        assert!(orchestrator.logs().get(LogId::Chat).is_empty());
    }

    #[tokio::test]
    async fn test_generate_renders_code_into_chat() {
        let (mut orchestrator, _rx) = orchestrator();
        orchestrator.apply(Completion::Request {
            endpoint: Endpoint::Generate,
            outcome: Ok(json!({"completion": "gripper.close()"})),
        });
        assert_eq!(texts(&orchestrator, LogId::Chat), vec!["LLM: gripper.close()"]);
    }

    #[tokio::test]
    async fn test_new_interaction_clears_chat_only_on_success() {
        let (mut orchestrator, _rx) = orchestrator();
        orchestrator.inputs_mut().chat.set("hello");
        orchestrator.dispatch(Action::SendChat);

        orchestrator.apply(Completion::Request {
            endpoint: Endpoint::NewInteraction,
            outcome: Ok(json!({"success": false, "message": "No grasp log directory found."})),
        });
        assert_eq!(orchestrator.logs().get(LogId::Chat).len(), 1);

        orchestrator.apply(Completion::Request {
            endpoint: Endpoint::NewInteraction,
            outcome: Ok(json!({"success": true, "message": "New interaction started."})),
        });
        assert!(orchestrator.logs().get(LogId::Chat).is_empty());
    }

    #[tokio::test]
    async fn test_clear_action_is_local() {
        let (mut orchestrator, mut rx) = orchestrator();
        orchestrator.apply(Completion::Request {
            endpoint: Endpoint::Home,
            outcome: Ok(json!({"messages": []})),
        });
        assert!(!orchestrator.dispatch(Action::Clear(LogId::Robot)));
        assert!(orchestrator.logs().get(LogId::Robot).is_empty());
        assert_eq!(orchestrator.status().state(Subsystem::Robot), Lifecycle::Succeeded);
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_reply_targets() {
        assert_eq!(reply_targets(Endpoint::Execute), &[LogId::Chat, LogId::Robot]);
        assert_eq!(reply_targets(Endpoint::Connect), &[LogId::Robot]);
        assert_eq!(reply_targets(Endpoint::VlaObs), &[LogId::Robot]);
        assert!(reply_targets(Endpoint::NewInteraction).is_empty());
    }
}
