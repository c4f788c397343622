//! # Device State Reconciliation
//!
//! Pure model of what is actually lit on the board. The only way to change it
//! is [`DeviceState::apply`], which takes one input (an inbound wire event, a
//! locally issued intent, or a fresh connection) and returns the reactions the
//! caller must carry out: notifications, diagnostics, and bytes to transmit.
//!
//! Local color commands are never applied optimistically. The board echoes
//! every command it executes, and only those echoes (or explicit reports)
//! change the model.
//!
//! | Input | State change | Reactions |
//! |---|---|---|
//! | `rRgGbBaA` echo | flags toggled, mode cleared | Notify if changed |
//! | `ModeReport(n)` | flags from mode, pending cleared | Notify (always) |
//! | `LedReport(t)` | as the equivalent echo, pending cleared | Notify if changed |
//! | `P` / `BTN:1` | none | Button |
//! | `L` / `BTN:0` | pending = AwaitingModeReport | Button, Notify if changed, Transmit `s` |
//! | `Unrecognized` | none | Diagnostic |
//! | local `QueryState` | pending = AwaitingModeReport | Notify if changed, Transmit `s` |
//! | other local intent | none | Transmit |
//! | connection opened | reset to all off | Notify |

use codec::hex::describe_unrecognized;
use codec::{encode, Command, InboundEvent, Intent, Mode};
use serde::{Deserialize, Serialize};

/// Whether a state query is outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum PendingQuery {
    #[default]
    None,
    AwaitingModeReport,
}

/// Read-only copy of the device state handed to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct DeviceSnapshot {
    pub red: bool,
    pub green: bool,
    pub blue: bool,
    /// Mode number from the last mode report, cleared by any other change.
    pub mode: Option<u8>,
    pub pending: PendingQuery,
}

impl DeviceSnapshot {
    pub fn all_off(&self) -> bool {
        !(self.red || self.green || self.blue)
    }
}

/// Everything that can drive the device model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineInput {
    Inbound(InboundEvent),
    LocalIntent(Intent),
    ConnectionOpened,
}

/// Side effect requested by [`DeviceState::apply`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reaction {
    Notify(DeviceSnapshot),
    Button { pressed: bool },
    Diagnostic(String),
    Transmit(Command),
}

#[derive(Debug, Default)]
pub struct DeviceState {
    current: DeviceSnapshot,
}

impl DeviceState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> DeviceSnapshot {
        self.current
    }

    pub fn pending(&self) -> PendingQuery {
        self.current.pending
    }

    /// Apply one input and return the reactions, in the order they must happen.
    pub fn apply(&mut self, input: &EngineInput) -> Vec<Reaction> {
        let before = self.current;
        let mut reactions = Vec::new();

        match input {
            EngineInput::ConnectionOpened => {
                self.current = DeviceSnapshot::default();
                reactions.push(Reaction::Notify(self.current));
                return reactions;
            }
            EngineInput::LocalIntent(intent) => {
                if *intent == Intent::QueryState {
                    self.current.pending = PendingQuery::AwaitingModeReport;
                    self.notify_if_changed(before, &mut reactions);
                }
                reactions.push(Reaction::Transmit(encode(*intent)));
            }
            EngineInput::Inbound(event) => self.apply_inbound(event, before, &mut reactions),
        }

        reactions
    }

    fn apply_inbound(
        &mut self,
        event: &InboundEvent,
        before: DeviceSnapshot,
        reactions: &mut Vec<Reaction>,
    ) {
        if event.is_report() {
            self.current.pending = PendingQuery::None;
        }

        match event {
            InboundEvent::ModeReport(mode) => {
                self.apply_mode(*mode);
                reactions.push(Reaction::Notify(self.current));
            }
            InboundEvent::Unrecognized(bytes) => {
                reactions.push(Reaction::Diagnostic(describe_unrecognized(bytes)));
            }
            _ => match (event.button_state(), event.as_intent()) {
                (Some(true), _) => reactions.push(Reaction::Button { pressed: true }),
                (Some(false), _) => {
                    reactions.push(Reaction::Button { pressed: false });
                    self.current.pending = PendingQuery::AwaitingModeReport;
                    self.notify_if_changed(before, reactions);
                    reactions.push(Reaction::Transmit(encode(Intent::QueryState)));
                }
                // Echoes and LED reports act as the toggle they stand for.
                (None, Some(intent)) => {
                    self.toggle(encode(intent).as_byte());
                    self.notify_if_changed(before, reactions);
                }
                (None, None) => {}
            },
        }
    }

    /// Apply a toggle symbol. Non-toggle symbols (`s`) leave the state alone.
    fn toggle(&mut self, symbol: u8) {
        let (red, green, blue) = (self.current.red, self.current.green, self.current.blue);
        let next = match symbol {
            b'r' => (true, green, blue),
            b'R' => (false, green, blue),
            b'g' => (red, true, blue),
            b'G' => (red, false, blue),
            b'b' => (red, green, true),
            b'B' => (red, green, false),
            b'a' => (true, true, true),
            b'A' => (false, false, false),
            _ => return,
        };
        if next != (red, green, blue) {
            (self.current.red, self.current.green, self.current.blue) = next;
            self.current.mode = None;
        }
    }

    /// Force all off, then light what the mode says.
    fn apply_mode(&mut self, mode: Mode) {
        let (red, green, blue) = mode.lit();
        self.current = DeviceSnapshot {
            red,
            green,
            blue,
            mode: Some(mode.value()),
            pending: PendingQuery::None,
        };
    }

    fn notify_if_changed(&self, before: DeviceSnapshot, reactions: &mut Vec<Reaction>) {
        if self.current != before {
            reactions.push(Reaction::Notify(self.current));
        }
    }
}
