/// Controls bound to a boolean capability on the backend.
///
/// The displayed state flips as soon as the control is used and is never
/// reconciled with what the backend reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Toggle {
    KeepPolicy,
    TeachMode,
    VlaRobot,
    RecordLoad,
}

impl Toggle {
    pub fn all() -> [Toggle; 4] {
        [
            Toggle::KeepPolicy,
            Toggle::TeachMode,
            Toggle::VlaRobot,
            Toggle::RecordLoad,
        ]
    }

    pub fn display_name(&self) -> &'static str {
        match self {
            Toggle::KeepPolicy => "Keep policy",
            Toggle::TeachMode => "Teach mode",
            Toggle::VlaRobot => "VLA robot",
            Toggle::RecordLoad => "Record load",
        }
    }

    fn index(&self) -> usize {
        match self {
            Toggle::KeepPolicy => 0,
            Toggle::TeachMode => 1,
            Toggle::VlaRobot => 2,
            Toggle::RecordLoad => 3,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct Toggles {
    on: [bool; 4],
}

impl Toggles {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_on(&self, toggle: Toggle) -> bool {
        self.on[toggle.index()]
    }

    /// Flip the displayed state and return the new value
    pub fn flip(&mut self, toggle: Toggle) -> bool {
        let slot = &mut self.on[toggle.index()];
        *slot = !*slot;
        *slot
    }
}
