use actor_protocol::{ActorError, SystemEvent};
use futures::stream::StreamExt;
use futures::SinkExt;
use futures_channel::mpsc;
use std::future::Future;

/// Actor trait for implementing message-driven components
///
/// Actors are independent, stateful components that communicate through
/// message passing. Each actor has its own message queue and processes
/// messages sequentially.
///
/// # Lifecycle
///
/// 1. **init()** - Called once before message processing starts
/// 2. **handle()** - Called for each received message
/// 3. **shutdown()** - Called when the actor is stopping
///
/// # Send Bounds
///
/// Actors run on the multi-threaded tokio runtime, so the actor, its message
/// type and every future it returns must be `Send`. Implementors can still
/// write plain `async fn` bodies.
///
/// # Example
///
/// ```ignore
/// struct MyActor {
///     event_tx: mpsc::Sender<SystemEvent>,
/// }
///
/// impl Actor for MyActor {
///     type Message = MyMessage;
///
///     fn name(&self) -> &'static str {
///         "MyActor"
///     }
///
///     async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
///         // Process message
///         Ok(())
///     }
/// }
/// ```
pub trait Actor: Send + 'static {
    /// Message type this actor processes
    type Message: Send + 'static;

    /// Actor name (used for logging and debugging)
    fn name(&self) -> &'static str;

    /// Initialize the actor before processing messages
    fn init(&mut self) -> impl Future<Output = Result<(), ActorError>> + Send {
        async { Ok(()) }
    }

    /// Handle a single message
    ///
    /// Messages are processed sequentially in the order received.
    fn handle(
        &mut self,
        msg: Self::Message,
    ) -> impl Future<Output = Result<(), ActorError>> + Send;

    /// Clean up before shutdown
    ///
    /// Called once the mailbox is closed. Use this to close ports and
    /// release resources.
    fn shutdown(&mut self) -> impl Future<Output = ()> + Send {
        async {}
    }

    /// Main actor run loop (provided by runtime)
    ///
    /// Runs init, then handles messages until every sender is dropped, then
    /// shuts down. Handler errors are reported as `SystemEvent::Error` and do
    /// not stop the actor. The event receiver must be drained.
    fn run(
        mut self,
        mut rx: mpsc::Receiver<Self::Message>,
        event_tx: mpsc::Sender<SystemEvent>,
    ) -> impl Future<Output = ()> + Send
    where
        Self: Sized,
    {
        async move {
            let mut event_tx = event_tx;

            // Initialize
            if let Err(e) = self.init().await {
                crate::actor_error!("{} init failed: {}", self.name(), e);
                let _ = event_tx
                    .send(SystemEvent::Error {
                        message: format!("{} init failed: {}", self.name(), e),
                    })
                    .await;
                return;
            }

            crate::actor_debug!("{} started", self.name());

            // Process messages
            while let Some(msg) = rx.next().await {
                if let Err(e) = self.handle(msg).await {
                    crate::actor_warn!("{} error: {}", self.name(), e);
                    // Waits for room: an error is never dropped for a slow subscriber.
                    let _ = event_tx
                        .send(SystemEvent::Error {
                            message: e.to_string(),
                        })
                        .await;
                }
            }

            // Shutdown
            self.shutdown().await;

            crate::actor_debug!("{} stopped", self.name());
        }
    }
}

/// Spawn an actor onto the current tokio runtime
pub fn spawn_actor<A>(
    actor: A,
    rx: mpsc::Receiver<A::Message>,
    event_tx: mpsc::Sender<SystemEvent>,
) -> tokio::task::JoinHandle<()>
where
    A: Actor,
{
    tokio::spawn(actor.run(rx, event_tx))
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use super::*;

    struct TestActor {
        init_called: bool,
        messages_received: Vec<String>,
        event_tx: mpsc::Sender<SystemEvent>,
    }

    impl TestActor {
        fn new(event_tx: mpsc::Sender<SystemEvent>) -> Self {
            Self {
                init_called: false,
                messages_received: Vec::new(),
                event_tx,
            }
        }
    }

    impl Actor for TestActor {
        type Message = String;

        fn name(&self) -> &'static str {
            "TestActor"
        }

        async fn init(&mut self) -> Result<(), ActorError> {
            self.init_called = true;
            Ok(())
        }

        async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
            assert!(self.init_called);
            self.messages_received.push(msg.clone());
            let _ = self.event_tx.clone().try_send(SystemEvent::StatusUpdate {
                message: format!("Received: {}", msg),
            });
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_actor_lifecycle() {
        let (mut tx, rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        let actor = TestActor::new(event_tx.clone());

        tx.try_send("msg1".into()).ok();
        tx.try_send("msg2".into()).ok();
        drop(tx); // Close channel to stop actor

        actor.run(rx, event_tx).await;

        // Verify events sent (this proves messages were processed)
        let events: Vec<_> = event_rx.collect().await;
        assert_eq!(events.len(), 2);
        match &events[0] {
            SystemEvent::StatusUpdate { message } => {
                assert_eq!(message, "Received: msg1");
            }
            _ => panic!("Wrong event type"),
        }
        match &events[1] {
            SystemEvent::StatusUpdate { message } => {
                assert_eq!(message, "Received: msg2");
            }
            _ => panic!("Wrong event type"),
        }
    }

    struct FailingActor {
        fail_init: bool,
    }

    impl Actor for FailingActor {
        type Message = String;

        fn name(&self) -> &'static str {
            "FailingActor"
        }

        async fn init(&mut self) -> Result<(), ActorError> {
            if self.fail_init {
                return Err(ActorError::Other("Init failed".into()));
            }
            Ok(())
        }

        async fn handle(&mut self, msg: Self::Message) -> Result<(), ActorError> {
            Err(ActorError::Other(format!("cannot handle {}", msg)))
        }
    }

    #[tokio::test]
    async fn test_actor_init_failure() {
        let (_tx, rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        FailingActor { fail_init: true }.run(rx, event_tx).await;

        let events: Vec<_> = event_rx.collect().await;
        assert_eq!(events.len(), 1);
        match &events[0] {
            SystemEvent::Error { message } => {
                assert!(message.contains("init failed"));
            }
            _ => panic!("Wrong event type"),
        }
    }

    #[test_log::test(tokio::test)]
    async fn test_handler_error_becomes_event_and_actor_continues() {
        let (mut tx, rx) = mpsc::channel(100);
        let (event_tx, event_rx) = mpsc::channel(100);

        tx.try_send("a".into()).ok();
        tx.try_send("b".into()).ok();
        drop(tx);

        let handle = spawn_actor(FailingActor { fail_init: false }, rx, event_tx);
        handle.await.unwrap();

        let events: Vec<_> = event_rx.collect().await;
        assert_eq!(events.len(), 2);
        match &events[1] {
            SystemEvent::Error { message } => assert_eq!(message, "cannot handle b"),
            _ => panic!("Wrong event type"),
        }
    }
}
