//! Read loop: turns inbound lines into observer notifications.
//!
//! One dispatcher run drives one connection. It reads lines until the
//! stream ends or fails, parses each line, and hands every recognised
//! event to the [`ObserverRegistry`]. What happens to the connection after
//! the loop exits is the client's business, not the dispatcher's.

use std::sync::Arc;

use linechat_protocol::{ServerEvent, parse_line, split_verb};
use linechat_transport::{ConnectionId, LineReader, TransportError};
use tokio::io::AsyncRead;

use crate::observer::ObserverRegistry;

/// Why a read loop stopped.
#[derive(Debug)]
pub enum LoopExit {
    /// The server closed its end of the connection.
    EndOfStream,
    /// Reading from the connection failed.
    ReadFailed(TransportError),
}

/// Parses server lines and delivers the resulting events.
#[derive(Clone)]
pub struct Dispatcher {
    observers: Arc<ObserverRegistry>,
}

impl Dispatcher {
    pub fn new(observers: Arc<ObserverRegistry>) -> Self {
        Self { observers }
    }

    pub fn observers(&self) -> &Arc<ObserverRegistry> {
        &self.observers
    }

    /// Handles a single line and returns the event it produced, if any.
    ///
    /// Unknown verbs are skipped. Malformed lines are logged and skipped;
    /// they never end the loop.
    pub fn dispatch_line(&self, conn_id: ConnectionId, line: &str) -> Option<ServerEvent> {
        match parse_line(line) {
            Ok(Some(event)) => {
                tracing::debug!(%conn_id, event = event.kind(), "dispatching");
                self.observers.notify(&event);
                Some(event)
            }
            Ok(None) => {
                if !line.is_empty() {
                    let (verb, _) = split_verb(line);
                    tracing::debug!(%conn_id, verb, "ignoring unknown verb");
                }
                None
            }
            Err(e) => {
                tracing::warn!(%conn_id, error = %e, "dropping server line");
                None
            }
        }
    }

    /// Reads and dispatches lines until the stream ends or a read fails.
    pub async fn run<R>(&self, conn_id: ConnectionId, reader: &mut LineReader<R>) -> LoopExit
    where
        R: AsyncRead + Unpin,
    {
        loop {
            match reader.read_line().await {
                Ok(Some(line)) => {
                    self.dispatch_line(conn_id, &line);
                }
                Ok(None) => {
                    tracing::info!(%conn_id, "server closed the connection");
                    return LoopExit::EndOfStream;
                }
                Err(e) => {
                    tracing::warn!(%conn_id, error = %e, "read failed");
                    return LoopExit::ReadFailed(e);
                }
            }
        }
    }

    /// Tells every observer the connection is gone.
    pub fn notify_disconnected(&self) {
        self.observers.notify(&ServerEvent::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ChatObserver;
    use linechat_protocol::TextMessage;
    use parking_lot::Mutex;
    use tokio::io::AsyncWriteExt;

    #[derive(Default)]
    struct Collect {
        events: Mutex<Vec<ServerEvent>>,
    }

    impl ChatObserver for Collect {
        fn on_event(&self, event: &ServerEvent) {
            self.events.lock().push(event.clone());
        }
    }

    fn setup() -> (Dispatcher, Arc<Collect>) {
        let registry = Arc::new(ObserverRegistry::new());
        let observer = Arc::new(Collect::default());
        registry.register(&observer);
        (Dispatcher::new(registry), observer)
    }

    #[test]
    fn test_dispatch_line_notifies_observers() {
        let (dispatcher, observer) = setup();
        let id = ConnectionId::new(1);

        let event = dispatcher.dispatch_line(id, "users alice bob");

        let expected = ServerEvent::UserList {
            users: vec!["alice".into(), "bob".into()],
        };
        assert_eq!(event, Some(expected.clone()));
        assert_eq!(*observer.events.lock(), vec![expected]);
    }

    #[test]
    fn test_dispatch_line_skips_unknown_and_malformed() {
        let (dispatcher, observer) = setup();
        let id = ConnectionId::new(1);

        assert_eq!(dispatcher.dispatch_line(id, "motd hello"), None);
        assert_eq!(dispatcher.dispatch_line(id, "msg alice"), None);
        assert_eq!(dispatcher.dispatch_line(id, ""), None);

        assert!(observer.events.lock().is_empty());
    }

    #[tokio::test]
    async fn test_run_delivers_in_order_until_eof() {
        let (dispatcher, observer) = setup();
        let (client, mut server) = tokio::io::duplex(1024);
        let mut reader = LineReader::new(client);

        server
            .write_all(b"loginok\r\nmsg alice\nmsg alice hi all\nprivmsg bob psst\n")
            .await
            .unwrap();
        drop(server);

        let exit = dispatcher.run(ConnectionId::new(7), &mut reader).await;

        assert!(matches!(exit, LoopExit::EndOfStream));
        assert_eq!(
            *observer.events.lock(),
            vec![
                ServerEvent::LoginResult {
                    success: true,
                    reason: None,
                },
                ServerEvent::MessageReceived(TextMessage {
                    sender: "alice".into(),
                    private: false,
                    text: "hi all".into(),
                }),
                ServerEvent::MessageReceived(TextMessage {
                    sender: "bob".into(),
                    private: true,
                    text: "psst".into(),
                }),
            ]
        );
    }

    #[tokio::test]
    async fn test_run_does_not_emit_disconnected_itself() {
        let (dispatcher, observer) = setup();
        let (client, server) = tokio::io::duplex(64);
        let mut reader = LineReader::new(client);
        drop(server);

        let exit = dispatcher.run(ConnectionId::new(8), &mut reader).await;

        assert!(matches!(exit, LoopExit::EndOfStream));
        assert!(observer.events.lock().is_empty());

        dispatcher.notify_disconnected();
        assert_eq!(*observer.events.lock(), vec![ServerEvent::Disconnected]);
    }
}
