use crate::dispatch::InputField;
use crate::log::LogId;
use crate::orchestrator::Orchestrator;
use crate::status::{Lifecycle, Subsystem};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FocusPane {
    Controls,
    ChatInput,
    GenerateInput,
    VlaInput,
}

impl FocusPane {
    pub fn next(self) -> Self {
        match self {
            FocusPane::Controls => FocusPane::ChatInput,
            FocusPane::ChatInput => FocusPane::GenerateInput,
            FocusPane::GenerateInput => FocusPane::VlaInput,
            FocusPane::VlaInput => FocusPane::Controls,
        }
    }
}

/// Scroll position of one log pane
#[derive(Debug, Clone, Copy)]
pub struct LogView {
    pub scroll: u16,
    /// Stick to the newest entry
    pub follow: bool,
}

impl Default for LogView {
    fn default() -> Self {
        Self {
            scroll: 0,
            follow: true,
        }
    }
}

pub struct App {
    // Core state
    pub should_quit: bool,
    pub focus: FocusPane,
    pub show_config: bool,

    pub orchestrator: Orchestrator,
    pub backend_url: String,

    // Log panes
    pub chat_view: LogView,
    pub robot_view: LogView,

    // Animation state
    pub animation_frame: u8, // 0-2 for ellipsis animation
}

impl App {
    pub fn new(orchestrator: Orchestrator, backend_url: &str) -> Self {
        Self {
            should_quit: false,
            focus: FocusPane::ChatInput,
            show_config: false,
            orchestrator,
            backend_url: backend_url.to_string(),
            chat_view: LogView::default(),
            robot_view: LogView::default(),
            animation_frame: 0,
        }
    }

    pub fn view(&self, log: LogId) -> LogView {
        match log {
            LogId::Chat => self.chat_view,
            LogId::Robot => self.robot_view,
        }
    }

    pub fn view_mut(&mut self, log: LogId) -> &mut LogView {
        match log {
            LogId::Chat => &mut self.chat_view,
            LogId::Robot => &mut self.robot_view,
        }
    }

    pub fn focused_input_mut(&mut self) -> Option<&mut InputField> {
        let inputs = self.orchestrator.inputs_mut();
        match self.focus {
            FocusPane::ChatInput => Some(&mut inputs.chat),
            FocusPane::GenerateInput => Some(&mut inputs.generate),
            FocusPane::VlaInput => Some(&mut inputs.vla),
            FocusPane::Controls => None,
        }
    }

    /// Any subsystem with a request outstanding
    pub fn is_waiting(&self) -> bool {
        Subsystem::all()
            .into_iter()
            .any(|s| self.orchestrator.status().state(s) == Lifecycle::Pending)
    }

    pub fn tick_animation(&mut self) {
        if self.is_waiting() {
            self.animation_frame = (self.animation_frame + 1) % 3;
        }
    }

    pub fn scroll_up(&mut self, log: LogId, lines: u16) {
        let view = self.view_mut(log);
        view.follow = false;
        view.scroll = view.scroll.saturating_sub(lines);
    }

    pub fn scroll_down(&mut self, log: LogId, lines: u16) {
        let view = self.view_mut(log);
        view.scroll = view.scroll.saturating_add(lines);
    }

    pub fn follow(&mut self, log: LogId) {
        self.view_mut(log).follow = true;
    }
}
