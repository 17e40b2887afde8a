//! Observer trait and the registry that fans events out to observers.

use std::sync::{Arc, Weak};

use linechat_protocol::{ServerEvent, TextMessage};
use parking_lot::Mutex;

/// Receives server events from a [`ChatClient`](crate::ChatClient).
///
/// Every handler has an empty default, so an observer only implements the
/// events it cares about. Handlers run on the connection's read task and
/// should return quickly; hand long work off to a channel or another task.
///
/// ```rust
/// use linechat::ChatObserver;
/// use linechat::protocol::TextMessage;
///
/// struct Printer;
///
/// impl ChatObserver for Printer {
///     fn on_message_received(&self, message: &TextMessage) {
///         println!("<{}> {}", message.sender, message.text);
///     }
/// }
/// ```
pub trait ChatObserver: Send + Sync {
    /// Routes an event to the matching `on_*` handler.
    ///
    /// Override this instead of the individual handlers to see every event
    /// as a value.
    fn on_event(&self, event: &ServerEvent) {
        match event {
            ServerEvent::LoginResult { success, reason } => {
                self.on_login_result(*success, reason.as_deref());
            }
            ServerEvent::Disconnected => self.on_disconnect(),
            ServerEvent::UserList { users } => self.on_user_list(users),
            ServerEvent::MessageReceived(message) => {
                self.on_message_received(message);
            }
            ServerEvent::MessageError { message } => {
                self.on_message_error(message);
            }
            ServerEvent::CommandError { message } => {
                self.on_command_error(message);
            }
            ServerEvent::SupportedCommands { commands } => {
                self.on_supported_commands(commands);
            }
        }
    }

    /// `reason` is `Some` only when the login failed.
    fn on_login_result(&self, _success: bool, _reason: Option<&str>) {}

    /// The server closed the connection or reading from it failed.
    fn on_disconnect(&self) {}

    fn on_user_list(&self, _users: &[String]) {}

    fn on_message_received(&self, _message: &TextMessage) {}

    fn on_message_error(&self, _message: &str) {}

    fn on_command_error(&self, _message: &str) {}

    fn on_supported_commands(&self, _commands: &[String]) {}
}

/// Ordered set of weakly held observers.
///
/// The registry never keeps an observer alive: once the caller drops its
/// last `Arc`, the observer stops receiving events and its slot is pruned
/// on the next registration or notification.
#[derive(Default)]
pub struct ObserverRegistry {
    observers: Mutex<Vec<Weak<dyn ChatObserver>>>,
}

impl ObserverRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds `observer` at the end of the delivery order.
    ///
    /// Returns `false` if the same observer is already registered.
    pub fn register<O: ChatObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        let observer: Arc<dyn ChatObserver> = observer.clone();
        let mut observers = self.observers.lock();
        observers.retain(|weak| weak.strong_count() > 0);

        if observers.iter().any(|weak| same_observer(weak, &observer)) {
            return false;
        }
        observers.push(Arc::downgrade(&observer));
        true
    }

    /// Removes `observer`. Returns `false` if it was not registered.
    pub fn unregister<O: ChatObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        let observer: Arc<dyn ChatObserver> = observer.clone();
        let mut observers = self.observers.lock();
        observers.retain(|weak| weak.strong_count() > 0);

        match observers.iter().position(|weak| same_observer(weak, &observer)) {
            Some(index) => {
                observers.remove(index);
                true
            }
            None => false,
        }
    }

    /// Number of registered observers that are still alive.
    pub fn len(&self) -> usize {
        self.observers
            .lock()
            .iter()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Delivers `event` to every live observer in registration order.
    ///
    /// The list is snapshotted first and the lock released before any
    /// callback runs, so observers may register or unregister (themselves
    /// included) from inside a handler. Such changes apply from the next
    /// event on.
    pub fn notify(&self, event: &ServerEvent) {
        let snapshot: Vec<Arc<dyn ChatObserver>> = {
            let mut observers = self.observers.lock();
            observers.retain(|weak| weak.strong_count() > 0);
            observers.iter().filter_map(Weak::upgrade).collect()
        };

        tracing::trace!(event = event.kind(), observers = snapshot.len(), "notifying");
        for observer in snapshot {
            observer.on_event(event);
        }
    }
}

fn same_observer(weak: &Weak<dyn ChatObserver>, observer: &Arc<dyn ChatObserver>) -> bool {
    std::ptr::addr_eq(weak.as_ptr(), Arc::as_ptr(observer))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records the kind of every event it sees into a shared log.
    struct Recorder {
        name: &'static str,
        log: Arc<Mutex<Vec<String>>>,
    }

    impl Recorder {
        fn new(name: &'static str, log: &Arc<Mutex<Vec<String>>>) -> Arc<Self> {
            Arc::new(Self {
                name,
                log: Arc::clone(log),
            })
        }
    }

    impl ChatObserver for Recorder {
        fn on_event(&self, event: &ServerEvent) {
            self.log.lock().push(format!("{}:{}", self.name, event.kind()));
        }
    }

    fn user_list() -> ServerEvent {
        ServerEvent::UserList {
            users: vec!["alice".into()],
        }
    }

    #[test]
    fn test_register_twice_is_noop() {
        let log = Arc::default();
        let registry = ObserverRegistry::new();
        let observer = Recorder::new("a", &log);

        assert!(registry.register(&observer));
        assert!(!registry.register(&observer));
        assert_eq!(registry.len(), 1);

        registry.notify(&ServerEvent::Disconnected);
        assert_eq!(*log.lock(), vec!["a:disconnected"]);
    }

    #[test]
    fn test_notify_in_registration_order() {
        let log = Arc::default();
        let registry = ObserverRegistry::new();
        let first = Recorder::new("first", &log);
        let second = Recorder::new("second", &log);
        registry.register(&first);
        registry.register(&second);

        registry.notify(&user_list());

        assert_eq!(*log.lock(), vec!["first:user_list", "second:user_list"]);
    }

    #[test]
    fn test_unregister_stops_delivery() {
        let log = Arc::default();
        let registry = ObserverRegistry::new();
        let observer = Recorder::new("a", &log);
        registry.register(&observer);

        assert!(registry.unregister(&observer));
        assert!(!registry.unregister(&observer));
        registry.notify(&user_list());

        assert!(log.lock().is_empty());
        assert!(registry.is_empty());
    }

    #[test]
    fn test_unregister_unknown_observer_returns_false() {
        let log = Arc::default();
        let registry = ObserverRegistry::new();
        registry.register(&Recorder::new("kept", &log));
        let stranger = Recorder::new("stranger", &log);

        assert!(!registry.unregister(&stranger));
    }

    #[test]
    fn test_dropped_observer_is_not_notified() {
        let log = Arc::default();
        let registry = ObserverRegistry::new();
        let kept = Recorder::new("kept", &log);
        let dropped = Recorder::new("dropped", &log);
        registry.register(&kept);
        registry.register(&dropped);

        drop(dropped);
        registry.notify(&ServerEvent::Disconnected);

        assert_eq!(*log.lock(), vec!["kept:disconnected"]);
        assert_eq!(registry.len(), 1);
    }

    /// Unregisters itself from inside its own handler.
    struct OneShot {
        registry: Arc<ObserverRegistry>,
        me: Mutex<Weak<OneShot>>,
        calls: Mutex<usize>,
    }

    impl ChatObserver for OneShot {
        fn on_disconnect(&self) {
            *self.calls.lock() += 1;
            if let Some(me) = self.me.lock().upgrade() {
                self.registry.unregister(&me);
            }
        }
    }

    #[test]
    fn test_observer_can_unregister_itself_during_callback() {
        let registry = Arc::new(ObserverRegistry::new());
        let observer = Arc::new(OneShot {
            registry: Arc::clone(&registry),
            me: Mutex::new(Weak::new()),
            calls: Mutex::new(0),
        });
        *observer.me.lock() = Arc::downgrade(&observer);
        registry.register(&observer);

        registry.notify(&ServerEvent::Disconnected);
        registry.notify(&ServerEvent::Disconnected);

        assert_eq!(*observer.calls.lock(), 1);
        assert!(registry.is_empty());
    }

    /// Uses only the per-event handlers, not `on_event`.
    #[derive(Default)]
    struct Handlers {
        seen: Mutex<Vec<String>>,
    }

    impl ChatObserver for Handlers {
        fn on_login_result(&self, success: bool, reason: Option<&str>) {
            self.seen.lock().push(format!("login {success} {reason:?}"));
        }

        fn on_message_received(&self, message: &TextMessage) {
            self.seen
                .lock()
                .push(format!("{} {} {}", message.sender, message.private, message.text));
        }

        fn on_supported_commands(&self, commands: &[String]) {
            self.seen.lock().push(commands.join(","));
        }
    }

    #[test]
    fn test_default_on_event_routes_to_handlers() {
        let registry = ObserverRegistry::new();
        let observer = Arc::new(Handlers::default());
        registry.register(&observer);

        registry.notify(&ServerEvent::LoginResult {
            success: false,
            reason: Some("taken".into()),
        });
        registry.notify(&ServerEvent::MessageReceived(TextMessage {
            sender: "bob".into(),
            private: true,
            text: "hi".into(),
        }));
        registry.notify(&ServerEvent::SupportedCommands {
            commands: vec!["login".into(), "help".into()],
        });
        // No handler for this one; the default is a no-op.
        registry.notify(&ServerEvent::CommandError {
            message: "nope".into(),
        });

        assert_eq!(
            *observer.seen.lock(),
            vec![
                "login false Some(\"taken\")".to_string(),
                "bob true hi".to_string(),
                "login,help".to_string(),
            ]
        );
    }
}
