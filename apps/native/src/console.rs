use actor_protocol::{DeviceSnapshot, PendingQuery, Sink, SystemEvent};
use codec::Mode;

/// Prints every event as one console line.
pub struct ConsoleSink;

fn lamp(on: bool) -> char {
    if on {
        '●'
    } else {
        '○'
    }
}

pub fn render_snapshot(snapshot: &DeviceSnapshot) -> String {
    let mut line = format!(
        "LEDs  R{}  G{}  B{}",
        lamp(snapshot.red),
        lamp(snapshot.green),
        lamp(snapshot.blue)
    );
    if let Some(mode) = snapshot.mode.and_then(Mode::new) {
        line.push_str(&format!("  mode {}", mode.label()));
    }
    if snapshot.pending == PendingQuery::AwaitingModeReport {
        line.push_str("  (querying)");
    }
    line
}

impl Sink for ConsoleSink {
    fn notify(&mut self, event: SystemEvent) {
        match event {
            SystemEvent::StateChanged { state } => println!("[{}]", state.status_text()),
            SystemEvent::DeviceStateChanged { snapshot } => {
                println!("{}", render_snapshot(&snapshot))
            }
            SystemEvent::ButtonChanged { pressed } => {
                println!("Button {}", if pressed { "pressed" } else { "released" })
            }
            SystemEvent::StatusUpdate { message } => println!("{}", message),
            SystemEvent::Error { message } => eprintln!("error: {}", message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_snapshot() {
        let snapshot = DeviceSnapshot {
            blue: true,
            mode: Some(2),
            ..DeviceSnapshot::default()
        };
        assert_eq!(render_snapshot(&snapshot), "LEDs  R○  G○  B●  mode II");

        let pending = DeviceSnapshot {
            pending: PendingQuery::AwaitingModeReport,
            ..DeviceSnapshot::default()
        };
        assert!(render_snapshot(&pending).ends_with("(querying)"));
    }
}
