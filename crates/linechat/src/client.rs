//! The chat client: connection lifecycle, outbound commands, observers.
//!
//! A [`ChatClient`] owns at most one connection at a time. Connecting
//! spawns a Tokio task that runs the [`Dispatcher`] over the read half of
//! the socket; the write half stays with the client behind its own async
//! mutex so sends from any task are serialized line by line.
//!
//! The connection slot itself sits behind a short synchronous lock that is
//! never held across an `.await`. Whoever takes the connection out of the
//! slot first owns the teardown: it cancels the connection's token (which
//! interrupts any send blocked on flow control), shuts down the write half
//! and tells observers with exactly one
//! [`ServerEvent::Disconnected`](linechat_protocol::ServerEvent::Disconnected).
//! A caller's [`disconnect`](ChatClient::disconnect) also aborts the read
//! task; the read task, on end of stream or a read error, closes only the
//! connection it was spawned for.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use linechat_protocol::{Command, ProtocolError};
use linechat_transport::{ConnectionId, LineReader, LineWriter};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::ClientConfig;
use crate::dispatcher::{Dispatcher, LoopExit};
use crate::error::ClientError;
use crate::observer::{ChatObserver, ObserverRegistry};

type SharedWriter = Arc<tokio::sync::Mutex<LineWriter<OwnedWriteHalf>>>;

/// The open connection. Dropping it cancels pending sends and aborts the
/// read task, if still attached.
struct ActiveConnection {
    id: ConnectionId,
    peer: SocketAddr,
    writer: SharedWriter,
    closed: CancellationToken,
    read_task: Option<JoinHandle<()>>,
}

impl Drop for ActiveConnection {
    fn drop(&mut self) {
        self.closed.cancel();
        if let Some(task) = self.read_task.take() {
            task.abort();
        }
    }
}

/// Who is asking to close the connection.
#[derive(Debug, Clone, Copy)]
enum Closer {
    /// A caller of `disconnect`: closes whatever is open.
    Caller,
    /// The read task of one connection: closes only that connection.
    ReadLoop(ConnectionId),
}

/// State shared between the client handles and the read task.
struct Shared {
    config: ClientConfig,
    active: AtomicBool,
    connection: parking_lot::Mutex<Option<ActiveConnection>>,
    last_error: parking_lot::Mutex<Option<String>>,
    dispatcher: Dispatcher,
}

impl Shared {
    fn record_error(&self, error: &ClientError) {
        *self.last_error.lock() = Some(error.to_string());
    }

    /// Takes the connection out of the slot if `closer` may close it.
    ///
    /// At most one caller gets `Some` per connection. `active` is cleared
    /// and pending sends are cancelled before the lock is released.
    fn detach(&self, closer: Closer) -> Option<ActiveConnection> {
        let mut slot = self.connection.lock();
        let owned = match (slot.as_ref(), closer) {
            (Some(_), Closer::Caller) => true,
            (Some(conn), Closer::ReadLoop(id)) => conn.id == id,
            (None, _) => false,
        };
        if !owned {
            return None;
        }
        let conn = slot.take()?;
        self.active.store(false, Ordering::Release);
        conn.closed.cancel();
        Some(conn)
    }

    /// Closes the connection and notifies observers once.
    ///
    /// Returns `true` only for the call that actually performed the
    /// teardown.
    async fn close(&self, closer: Closer) -> bool {
        let Some(mut conn) = self.detach(closer) else {
            return false;
        };
        let read_task = conn.read_task.take();

        // Senders give the writer back as soon as they see the cancellation.
        if let Err(e) = conn.writer.lock().await.shutdown().await {
            tracing::warn!(conn_id = %conn.id, error = %e, "error closing connection");
            self.record_error(&ClientError::from(e));
        }

        if let (Closer::Caller, Some(task)) = (closer, read_task) {
            task.abort();
            // Wait for the read task to stop so no event follows `Disconnected`.
            let _ = task.await;
        }

        tracing::info!(conn_id = %conn.id, peer = %conn.peer, "disconnected");
        self.dispatcher.notify_disconnected();
        true
    }
}

/// Closes the read task's connection if the task ends without reaching its
/// own cleanup, i.e. when an observer panics.
///
/// `Drop` is synchronous, so the async close runs on a spawned task.
struct ReadLoopGuard {
    conn_id: ConnectionId,
    shared: Weak<Shared>,
    armed: bool,
}

impl Drop for ReadLoopGuard {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        let Some(shared) = self.shared.upgrade() else {
            return;
        };
        let Ok(runtime) = tokio::runtime::Handle::try_current() else {
            return;
        };
        let conn_id = self.conn_id;
        runtime.spawn(async move {
            shared.close(Closer::ReadLoop(conn_id)).await;
        });
    }
}

/// Drives one connection's inbound side until it ends.
async fn read_loop(
    mut reader: LineReader<OwnedReadHalf>,
    conn_id: ConnectionId,
    shared: Weak<Shared>,
    dispatcher: Dispatcher,
) {
    let mut guard = ReadLoopGuard {
        conn_id,
        shared: shared.clone(),
        armed: true,
    };

    let exit = dispatcher.run(conn_id, &mut reader).await;
    drop(reader);
    guard.armed = false;

    if let Some(shared) = shared.upgrade() {
        if let LoopExit::ReadFailed(e) = exit {
            shared.record_error(&ClientError::from(e));
        }
        shared.close(Closer::ReadLoop(conn_id)).await;
    }
}

/// Client for a line-based chat server.
///
/// Cloning is cheap and every clone drives the same connection, so one
/// task can read user input and send while another calls
/// [`disconnect`](Self::disconnect). Operations report success as `bool`;
/// on failure the reason is available from [`last_error`](Self::last_error).
///
/// ```rust,no_run
/// use std::sync::Arc;
/// use linechat::{ChatClient, ChatObserver};
///
/// struct Greeter;
/// impl ChatObserver for Greeter {
///     fn on_login_result(&self, success: bool, reason: Option<&str>) {
///         println!("login: {success} {reason:?}");
///     }
/// }
///
/// # async fn run() {
/// let client = ChatClient::new();
/// let greeter = Arc::new(Greeter);
/// client.register_observer(&greeter);
///
/// if client.connect("chat.example.com", 4000).await {
///     client.login("alice").await;
///     client.send_public_message("hello").await;
/// } else {
///     eprintln!("connect failed: {}", client.last_error());
/// }
/// # }
/// ```
#[derive(Clone)]
pub struct ChatClient {
    shared: Arc<Shared>,
}

impl Default for ChatClient {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChatClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChatClient")
            .field("active", &self.is_active())
            .field("observers", &self.shared.dispatcher.observers().len())
            .finish_non_exhaustive()
    }
}

impl ChatClient {
    /// Creates an idle client with the default configuration.
    pub fn new() -> Self {
        Self::with_config(ClientConfig::default())
    }

    /// Creates an idle client. Nothing touches the network until
    /// [`connect`](Self::connect).
    pub fn with_config(config: ClientConfig) -> Self {
        let observers = Arc::new(ObserverRegistry::new());
        Self {
            shared: Arc::new(Shared {
                config,
                active: AtomicBool::new(false),
                connection: parking_lot::Mutex::new(None),
                last_error: parking_lot::Mutex::new(None),
                dispatcher: Dispatcher::new(observers),
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.shared.config
    }

    // -----------------------------------------------------------------------
    // Connection lifecycle
    // -----------------------------------------------------------------------

    /// Opens a connection to `host:port` and starts delivering server
    /// events to observers.
    ///
    /// Returns `false` if the host cannot be resolved, the connection is
    /// refused or times out, or a connection is already open.
    pub async fn connect(&self, host: &str, port: u16) -> bool {
        match self.try_connect(host, port).await {
            Ok((conn_id, peer)) => {
                tracing::info!(%conn_id, %peer, "connected");
                true
            }
            Err(e) => {
                tracing::warn!(host, port, error = %e, "connect failed");
                self.shared.record_error(&e);
                false
            }
        }
    }

    async fn try_connect(
        &self,
        host: &str,
        port: u16,
    ) -> Result<(ConnectionId, SocketAddr), ClientError> {
        if let Some(peer) = self.peer_addr() {
            return Err(ClientError::AlreadyConnected(peer));
        }

        // Resolve and handshake without the slot lock; sends and
        // disconnects keep answering in the meantime.
        let options = self.shared.config.connect_options();
        let conn = linechat_transport::connect(host, port, &options).await?;
        let (conn_id, peer) = (conn.id(), conn.peer());
        let (reader, writer) = conn.into_split();

        let mut slot = self.shared.connection.lock();
        if let Some(existing) = slot.as_ref() {
            tracing::debug!(%conn_id, "another connect finished first, dropping this one");
            return Err(ClientError::AlreadyConnected(existing.peer));
        }

        // A read loop that ends immediately blocks on the slot lock until
        // this connection is installed.
        let read_task = tokio::spawn(read_loop(
            reader,
            conn_id,
            Arc::downgrade(&self.shared),
            self.shared.dispatcher.clone(),
        ));
        *slot = Some(ActiveConnection {
            id: conn_id,
            peer,
            writer: Arc::new(tokio::sync::Mutex::new(writer)),
            closed: CancellationToken::new(),
            read_task: Some(read_task),
        });
        self.shared.active.store(true, Ordering::Release);

        Ok((conn_id, peer))
    }

    /// Closes the open connection.
    ///
    /// Returns `true` if this call closed it, `false` if there was nothing
    /// to close. Safe to call from several tasks at once: exactly one of
    /// them gets `true`, and `is_active()` is `false` by the time any of
    /// them returns. A send blocked on a server that stopped reading is
    /// interrupted. Observers receive one `Disconnected` event.
    pub async fn disconnect(&self) -> bool {
        let closed = self.shared.close(Closer::Caller).await;
        if !closed {
            tracing::debug!("no connection to close");
        }
        closed
    }

    /// Whether a connection is open. Never blocks.
    pub fn is_active(&self) -> bool {
        self.shared.active.load(Ordering::Acquire)
    }

    /// Address of the server, while connected.
    pub fn peer_addr(&self) -> Option<SocketAddr> {
        self.shared.connection.lock().as_ref().map(|conn| conn.peer)
    }

    /// Description of the most recent failure, or an empty string.
    ///
    /// Not cleared by later successes.
    pub fn last_error(&self) -> String {
        self.shared.last_error.lock().clone().unwrap_or_default()
    }

    // -----------------------------------------------------------------------
    // Outbound commands
    // -----------------------------------------------------------------------

    /// Sends `verb args` as one line.
    ///
    /// Returns `false` if not connected, or if `verb` is empty or not a
    /// single word, or if either part contains a line break. In those
    /// cases nothing is written.
    pub async fn send_command(&self, verb: &str, args: &str) -> bool {
        self.send(Command::new(verb, args)).await
    }

    /// Sends `msg <text>` to everyone. Rejects empty or multi-line text.
    pub async fn send_public_message(&self, text: &str) -> bool {
        self.send(Command::public_message(text)).await
    }

    /// Sends `privmsg <recipient> <text>`.
    pub async fn send_private_message(&self, recipient: &str, text: &str) -> bool {
        self.send(Command::private_message(recipient, text)).await
    }

    /// Sends `login <username>`. An empty name is rejected, not sent.
    pub async fn login(&self, username: &str) -> bool {
        self.send(Command::login(username)).await
    }

    /// Sends `users`. The reply arrives as a user list event.
    pub async fn request_user_list(&self) -> bool {
        self.send(Ok(Command::users())).await
    }

    /// Sends `help`. The reply arrives as a supported-commands event.
    pub async fn request_supported_commands(&self) -> bool {
        self.send(Ok(Command::help())).await
    }

    /// Writes a validated command.
    ///
    /// A write error after validation still returns `true`: the command was
    /// handed to the connection, and a dead connection is reported through
    /// the read loop. The error is logged and kept for `last_error`.
    /// A write interrupted by a disconnect returns `false`.
    async fn send(&self, command: Result<Command, ProtocolError>) -> bool {
        let command = match command {
            Ok(command) => command,
            Err(e) => {
                tracing::debug!(error = %e, "rejected command");
                self.shared.record_error(&ClientError::from(e));
                return false;
            }
        };

        let Some((conn_id, writer, closed)) = self.writer() else {
            tracing::debug!(verb = command.verb(), "not connected, command dropped");
            self.shared.record_error(&ClientError::NotConnected);
            return false;
        };

        let line = command.to_string();
        tracing::debug!(%conn_id, verb = command.verb(), "sending");
        let write = async {
            let mut writer = writer.lock().await;
            writer.write_line(&line).await
        };

        tokio::select! {
            biased;
            () = closed.cancelled() => {
                tracing::debug!(%conn_id, verb = command.verb(), "connection closed during send");
                self.shared.record_error(&ClientError::NotConnected);
                false
            }
            result = write => {
                if let Err(e) = result {
                    tracing::warn!(%conn_id, error = %e, "send failed");
                    self.shared.record_error(&ClientError::from(e));
                }
                true
            }
        }
    }

    fn writer(&self) -> Option<(ConnectionId, SharedWriter, CancellationToken)> {
        self.shared
            .connection
            .lock()
            .as_ref()
            .map(|conn| (conn.id, Arc::clone(&conn.writer), conn.closed.clone()))
    }

    // -----------------------------------------------------------------------
    // Observers
    // -----------------------------------------------------------------------

    /// Registers `observer` for all future events.
    ///
    /// The client holds it weakly: dropping the last `Arc` unregisters it.
    /// Registering the same observer twice has no effect and returns
    /// `false`.
    pub fn register_observer<O: ChatObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        self.shared.dispatcher.observers().register(observer)
    }

    /// Stops delivering events to `observer`. Returns `false` if it was not
    /// registered.
    pub fn unregister_observer<O: ChatObserver + 'static>(&self, observer: &Arc<O>) -> bool {
        self.shared.dispatcher.observers().unregister(observer)
    }
}
