use crate::messages::SystemEvent;

/// Receives every event the actor system publishes, in order.
pub trait Sink: Send {
    fn notify(&mut self, event: SystemEvent);
}

/// Collects events; handy for tests and batch consumers.
impl Sink for Vec<SystemEvent> {
    fn notify(&mut self, event: SystemEvent) {
        self.push(event);
    }
}

impl<S: Sink + ?Sized> Sink for Box<S> {
    fn notify(&mut self, event: SystemEvent) {
        (**self).notify(event);
    }
}
