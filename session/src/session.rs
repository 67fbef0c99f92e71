//! The session lifecycle state machine and its public contract: `send`, `subscribe`, `cancel`,
//! `wait`, plus root/child context creation.
//!
//! A root `Session` owns the browser process and its transport. A child `Session` (created via
//! [`Session::new_context`]) shares the root's router and writer but scopes every outbound
//! command to a CDP target session id; it cannot outlive the root, since both share one
//! underlying transport and the root's shutdown sequence tears it down along the way. Cancelling
//! a child, however, is local to that child alone and never reaches the root (§5).

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use tokio::sync::{mpsc, watch, Notify};

use cdp_types::{CallId, JsonEventMessage, Message, MethodId, Response};

use crate::config::SessionConfig;
use crate::error::{CdpError, Result};
use crate::jsonlog::{Direction, JsonLog};
use crate::router::{Router, Subscription};
use crate::supervisor::Supervisor;
use crate::transport::{TransportReader, TransportWriter};

/// A session's position in its lifecycle. Transitions only ever move forward.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Starting,
    Running,
    Stopping,
    Terminated,
}

struct WriteJob {
    id: CallId,
    bytes: Vec<u8>,
}

struct SessionInner {
    router: Router,
    writer_tx: mpsc::UnboundedSender<WriteJob>,
    next_call_id: AtomicUsize,
    state_tx: watch::Sender<SessionState>,
    shutdown: Notify,
    shutdown_started: AtomicBool,
    output_dir: PathBuf,
    json_log: Option<Arc<JsonLog>>,
}

impl SessionInner {
    fn state(&self) -> SessionState {
        *self.state_tx.borrow()
    }

    fn set_state(&self, state: SessionState) {
        self.state_tx.send_replace(state);
    }
}

/// Per-context cancellation state. Separate from `SessionInner` so that cancelling a child
/// context never touches the root's (or a sibling child's) state: each context this crate hands
/// out from `new_context` gets its own `LocalCancel`, while the root's is the one `SessionInner`
/// itself was built with.
#[derive(Default)]
struct LocalCancel {
    cancelled: AtomicBool,
    notify: Notify,
}

impl LocalCancel {
    fn set(&self) {
        self.cancelled.store(true, Ordering::SeqCst);
        self.notify.notify_waiters();
    }

    fn is_set(&self) -> bool {
        self.cancelled.load(Ordering::SeqCst)
    }
}

/// A handle to a running (or starting, or stopping) CDP session.
///
/// Cloning a `Session` is cheap and every clone refers to the same underlying connection; there
/// is no separate "handle" type. Clones of the same context (root or a particular child) share
/// cancellation state; a fresh child minted via [`Session::new_context`] gets its own.
#[derive(Clone)]
pub struct Session {
    inner: Arc<SessionInner>,
    target_session_id: Option<String>,
    local: Arc<LocalCancel>,
}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("state", &self.inner.state())
            .field("target_session_id", &self.target_session_id)
            .field("locally_cancelled", &self.local.is_set())
            .finish()
    }
}

impl Session {
    /// Launches a browser per `config` and returns the root session, already past `Starting`.
    pub async fn launch(config: SessionConfig) -> Result<Self> {
        static SESSION_COUNTER: AtomicUsize = AtomicUsize::new(0);
        let session_id = SESSION_COUNTER.fetch_add(1, Ordering::Relaxed) as u64;

        let (output_dir, user_data_dir) = config.prepare_output_dir(session_id).await.map_err(CdpError::Io)?;
        let (supervisor, reader, writer) =
            Supervisor::launch(&config, &user_data_dir, &output_dir, 0).await?;

        let json_log = match JsonLog::open(&output_dir).await {
            Ok(log) => Some(Arc::new(log)),
            Err(err) => {
                tracing::warn!(%err, path = %output_dir.display(), "failed to open cdp_json.log");
                None
            }
        };

        Ok(Self::from_parts(reader, writer, Some(supervisor), output_dir, json_log))
    }

    /// Builds a session directly from a connected transport pair, skipping process launch
    /// entirely. Used by this crate's scenario tests against the in-process mock transport.
    #[cfg(any(test, feature = "test-support"))]
    pub fn launch_with_transport(reader: TransportReader, writer: TransportWriter) -> Self {
        Self::from_parts(reader, writer, None, std::env::temp_dir(), None)
    }

    fn from_parts(
        reader: TransportReader,
        writer: TransportWriter,
        supervisor: Option<Supervisor>,
        output_dir: PathBuf,
        json_log: Option<Arc<JsonLog>>,
    ) -> Self {
        let router = Router::new();
        let (writer_tx, writer_rx) = mpsc::unbounded_channel::<WriteJob>();
        let (state_tx, _) = watch::channel(SessionState::Starting);

        let inner = Arc::new(SessionInner {
            router: router.clone(),
            writer_tx,
            next_call_id: AtomicUsize::new(1),
            state_tx,
            shutdown: Notify::new(),
            shutdown_started: AtomicBool::new(false),
            output_dir,
            json_log,
        });

        spawn_writer_task(inner.clone(), writer, writer_rx);
        spawn_reader_task(inner.clone(), reader, router.clone());
        spawn_shutdown_task(inner.clone(), supervisor);

        inner.set_state(SessionState::Running);

        Session { inner, target_session_id: None, local: Arc::new(LocalCancel::default()) }
    }

    /// Returns a child context scoped to `target_session_id`, the CDP session id obtained from a
    /// prior `Target.attachToTarget` call. The child shares this session's transport and router,
    /// but owns an independent cancellation state: cancelling the child fails only its own
    /// in-flight `send`s without disturbing the root (or any other child) — it stops working the
    /// moment the root does, but the reverse does not hold (§5).
    pub fn new_context(&self, target_session_id: impl Into<String>) -> Session {
        Session { inner: self.inner.clone(), target_session_id: Some(target_session_id.into()), local: Arc::new(LocalCancel::default()) }
    }

    pub fn is_root(&self) -> bool {
        self.target_session_id.is_none()
    }

    pub fn state(&self) -> SessionState {
        self.inner.state()
    }

    pub fn output_dir(&self) -> &std::path::Path {
        &self.inner.output_dir
    }

    /// Sends a request and awaits the browser's response. Returns the full [`Response`]
    /// (including a failed `error` field) rather than just the correlating id, so the caller
    /// never needs a second lookup to see what happened.
    pub async fn send(&self, method: impl Into<MethodId>, params: serde_json::Value) -> Result<Response> {
        let method = method.into();
        if method.is_empty() {
            return Err(CdpError::MalformedRequest);
        }
        if self.local.is_set() || !matches!(self.inner.state(), SessionState::Starting | SessionState::Running) {
            return Err(CdpError::SessionCancelled);
        }

        let id = CallId::new(self.inner.next_call_id.fetch_add(1, Ordering::Relaxed));
        let call = cdp_types::MethodCall { id, method, session_id: self.target_session_id.clone(), params };
        let bytes = serde_json::to_vec(&call)?;

        let (tx, rx) = tokio::sync::oneshot::channel();
        self.inner.router.register_pending(id, tx).await;

        if self.inner.writer_tx.send(WriteJob { id, bytes }).is_err() {
            self.inner.router.fail_pending(id, CdpError::SessionCancelled).await;
            return Err(CdpError::SessionCancelled);
        }

        rx.await?
    }

    /// Subscribes to every event with this exact method name, across every target. There is no
    /// per-child filtering: a child context receives the same stream as the root would, and
    /// distinguishes its own events via `JsonEventMessage::session_id`.
    pub async fn subscribe(&self, method: impl Into<MethodId>) -> Subscription {
        self.inner.router.subscribe(method.into()).await
    }

    /// Initiates cancellation for this context.
    ///
    /// On the root, this is the orderly shutdown sequence from §5: it is idempotent (calling it
    /// more than once only runs the sequence once) and tears down the transport, fails every
    /// pending `send`, and terminates every child along with it.
    ///
    /// On a child, cancellation is local (§5): it marks this context cancelled so its own
    /// `send` calls fail fast from then on, without touching the root's transport, pending
    /// table, or any sibling child's state.
    pub fn cancel(&self) {
        self.local.set();
        if self.is_root() {
            self.inner.shutdown.notify_one();
        }
    }

    /// Waits until this context is done: for the root, that means `Terminated`; for a child, that
    /// means either this child was itself cancelled, or the root reached `Terminated` and took
    /// every child down with it.
    pub async fn wait(&self) {
        let mut rx = self.inner.state_tx.subscribe();
        loop {
            if self.local.is_set() || *rx.borrow() == SessionState::Terminated {
                return;
            }
            tokio::select! {
                _ = self.local.notify.notified() => return,
                changed = rx.changed() => {
                    if changed.is_err() {
                        return;
                    }
                }
            }
        }
    }
}

fn spawn_writer_task(inner: Arc<SessionInner>, mut writer: TransportWriter, mut rx: mpsc::UnboundedReceiver<WriteJob>) {
    tokio::spawn(async move {
        while let Some(job) = rx.recv().await {
            tracing::trace!(id = %job.id, "writing frame");
            if let Some(log) = &inner.json_log {
                log.record(Direction::Out, &job.bytes).await;
            }
            if let Err(err) = writer.write_frame(&job.bytes).await {
                tracing::error!(%err, "transport write failed, shutting down session");
                inner.router.fail_pending(job.id, err).await;
                inner.shutdown.notify_one();
                break;
            }
        }
    });
}

fn spawn_reader_task(inner: Arc<SessionInner>, mut reader: TransportReader, router: Router) {
    tokio::spawn(async move {
        loop {
            match reader.read_frame().await {
                Ok(Some(bytes)) => {
                    tracing::trace!(len = bytes.len(), "read frame");
                    if let Some(log) = &inner.json_log {
                        log.record(Direction::In, &bytes).await;
                    }
                    match serde_json::from_slice::<Message<JsonEventMessage>>(&bytes) {
                        Ok(message) => router.dispatch(message).await,
                        Err(err) => tracing::debug!(%err, "dropping malformed inbound frame"),
                    }
                }
                Ok(None) => {
                    tracing::debug!("transport reached end of stream");
                    inner.shutdown.notify_one();
                    break;
                }
                Err(err) => {
                    tracing::error!(%err, "transport read failed, shutting down session");
                    inner.shutdown.notify_one();
                    break;
                }
            }
        }
    });
}

fn spawn_shutdown_task(inner: Arc<SessionInner>, supervisor: Option<Supervisor>) {
    tokio::spawn(async move {
        let mut supervisor = supervisor;

        if let Some(sup) = supervisor.as_mut() {
            tokio::select! {
                _ = inner.shutdown.notified() => {}
                result = sup.wait() => {
                    match result {
                        Ok(status) => tracing::info!(?status, "browser process exited"),
                        Err(err) => tracing::warn!(%err, "failed to wait on browser process"),
                    }
                    inner.shutdown.notify_one();
                }
            }
        } else {
            inner.shutdown.notified().await;
        }

        if inner.shutdown_started.swap(true, Ordering::SeqCst) {
            return;
        }

        inner.set_state(SessionState::Stopping);
        inner.router.shutdown().await;
        if let Some(sup) = supervisor.as_mut() {
            let _ = sup.terminate().await;
        }
        inner.set_state(SessionState::Terminated);
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::transport::mock;

    /// Best-effort `tracing-subscriber` init so a failing scenario test prints its spans and
    /// events instead of leaving a bare panic to debug.
    fn init_tracing() {
        static ONCE: std::sync::Once = std::sync::Once::new();
        ONCE.call_once(|| {
            let _ = tracing_subscriber::fmt().with_test_writer().try_init();
        });
    }

    fn session_pair() -> (Session, mock::MockReader, mock::MockWriter) {
        init_tracing();
        let (our_reader, our_writer, their_reader, their_writer) = mock::channel();
        let session = Session::launch_with_transport(TransportReader::Mock(our_reader), TransportWriter::Mock(our_writer));
        (session, their_reader, their_writer)
    }

    async fn recv_call(reader: &mut mock::MockReader) -> cdp_types::MethodCall {
        let bytes = reader.read_frame().await.unwrap().unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    /// S1: a request sent while the session is running receives its matching response.
    #[tokio::test]
    async fn s1_request_response_round_trip() {
        let (session, mut their_reader, mut their_writer) = session_pair();

        let send = tokio::spawn({
            let session = session.clone();
            async move { session.send("Network.enable", serde_json::json!({})).await }
        });

        let call: serde_json::Value = serde_json::from_slice(&their_reader.read_frame().await.unwrap().unwrap()).unwrap();
        assert_eq!(call["method"], "Network.enable");
        let id = call["id"].as_u64().unwrap();

        their_writer
            .write_frame(format!(r#"{{"id":{id},"result":{{}}}}"#).as_bytes())
            .await
            .unwrap();

        let response = send.await.unwrap().unwrap();
        assert_eq!(response.id, CallId::new(id as usize));
    }

    /// S2: 100 concurrently issued `send`s each get a distinct, correctly correlated response.
    #[tokio::test]
    async fn s2_interleaved_concurrent_sends_assign_distinct_ids() {
        const N: u64 = 100;
        let (session, mut their_reader, their_writer) = session_pair();
        let their_writer = Arc::new(tokio::sync::Mutex::new(their_writer));

        let mut sends = Vec::new();
        for _ in 0..N {
            let session = session.clone();
            sends.push(tokio::spawn(async move { session.send("Foo.bar", serde_json::json!({})).await }));
        }

        // Mock browser: echo every inbound call's id straight back as its result.
        let echo = tokio::spawn(async move {
            for _ in 0..N {
                let call = recv_call(&mut their_reader).await;
                their_writer
                    .lock()
                    .await
                    .write_frame(format!(r#"{{"id":{},"result":{{}}}}"#, call.id.value()).as_bytes())
                    .await
                    .unwrap();
            }
        });

        let mut seen_ids = std::collections::HashSet::new();
        for send in sends {
            let response = send.await.unwrap().unwrap();
            assert!(seen_ids.insert(response.id), "id {} was assigned twice", response.id);
        }
        echo.await.unwrap();

        assert_eq!(seen_ids.len(), N as usize);
        for id in 1..=N as usize {
            assert!(seen_ids.contains(&CallId::new(id)), "id {id} missing from {{1..{N}}}");
        }
    }

    /// An event fired with no pending subscriber is simply not delivered anywhere, and does not
    /// affect subsequent sends.
    #[tokio::test]
    async fn event_with_no_subscriber_is_dropped_silently() {
        let (session, _their_reader, mut their_writer) = session_pair();
        their_writer
            .write_frame(br#"{"method":"Page.loadEventFired","params":{}}"#)
            .await
            .unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(10)).await;
        assert_eq!(session.state(), SessionState::Running);
    }

    /// A subscriber receives every event for its method, in order.
    #[tokio::test]
    async fn subscriber_receives_events_in_order() {
        let (session, _their_reader, mut their_writer) = session_pair();
        let mut sub = session.subscribe("Page.loadEventFired").await;

        for i in 0..3 {
            their_writer
                .write_frame(format!(r#"{{"method":"Page.loadEventFired","params":{{"n":{i}}}}}"#).as_bytes())
                .await
                .unwrap();
        }

        for i in 0..3 {
            let event = sub.events.recv().await.unwrap();
            assert_eq!(event.params["n"], i);
        }
    }

    /// S4: a malformed inbound frame is logged and dropped, but a well-formed response that
    /// follows it on the same wire is still delivered to its waiting caller.
    #[tokio::test]
    async fn s4_malformed_inbound_frame_is_dropped_response_still_delivered() {
        let (session, mut their_reader, mut their_writer) = session_pair();

        let send = tokio::spawn({
            let session = session.clone();
            async move { session.send("Network.enable", serde_json::json!({})).await }
        });

        let call = recv_call(&mut their_reader).await;
        their_writer.write_frame(b"not-json").await.unwrap();
        their_writer
            .write_frame(format!(r#"{{"id":{},"result":{{}}}}"#, call.id.value()).as_bytes())
            .await
            .unwrap();

        let response = send.await.unwrap().unwrap();
        assert_eq!(response.id, call.id);
        assert_eq!(session.state(), SessionState::Running);
    }

    /// A child context tags its outbound calls with its target session id.
    #[tokio::test]
    async fn child_context_tags_outbound_calls_with_session_id() {
        let (session, mut their_reader, _their_writer) = session_pair();
        let child = session.new_context("TARGET123");

        tokio::spawn(async move {
            let _ = child.send("Page.navigate", serde_json::json!({"url": "about:blank"})).await;
        });

        let call = recv_call(&mut their_reader).await;
        assert_eq!(call.session_id.as_deref(), Some("TARGET123"));
    }

    /// Property 6 (first half): cancelling a child context fails only that child's own `send`s;
    /// the root, and any sibling child, keep working.
    #[tokio::test]
    async fn child_cancel_does_not_affect_root_or_siblings() {
        let (session, mut their_reader, mut their_writer) = session_pair();
        let child = session.new_context("TARGET123");
        let sibling = session.new_context("TARGET456");

        child.cancel();
        child.wait().await;

        let result = child.send("Page.navigate", serde_json::json!({})).await;
        assert!(matches!(result, Err(CdpError::SessionCancelled)));
        assert_eq!(session.state(), SessionState::Running);

        let root_send = tokio::spawn({
            let session = session.clone();
            async move { session.send("Network.enable", serde_json::json!({})).await }
        });
        let call = recv_call(&mut their_reader).await;
        their_writer
            .write_frame(format!(r#"{{"id":{},"result":{{}}}}"#, call.id.value()).as_bytes())
            .await
            .unwrap();
        assert!(root_send.await.unwrap().is_ok());
        assert_eq!(session.state(), SessionState::Running);

        let sibling_send = tokio::spawn(async move { sibling.send("Network.enable", serde_json::json!({})).await });
        let call = recv_call(&mut their_reader).await;
        their_writer
            .write_frame(format!(r#"{{"id":{},"result":{{}}}}"#, call.id.value()).as_bytes())
            .await
            .unwrap();
        assert!(sibling_send.await.unwrap().is_ok());
    }

    /// Property 6 (second half): cancelling the root terminates every child along with it.
    #[tokio::test]
    async fn root_cancel_terminates_children() {
        let (session, _their_reader, _their_writer) = session_pair();
        let child = session.new_context("TARGET123");

        session.cancel();
        child.wait().await;
        session.wait().await;

        assert_eq!(session.state(), SessionState::Terminated);
        let result = child.send("Page.navigate", serde_json::json!({})).await;
        assert!(matches!(result, Err(CdpError::SessionCancelled)));
    }

    /// S5: the mock browser answers one send, then disconnects (end of stream), as a crash
    /// would. The first send succeeds; the second, already in flight, fails with
    /// `SessionCancelled` rather than hanging forever; the session's output directory is left
    /// untouched by the teardown.
    #[tokio::test]
    async fn s5_browser_disconnect_cancels_outstanding_sends() {
        let (session, mut their_reader, mut their_writer) = session_pair();
        let output_dir = session.output_dir().to_path_buf();

        let first = tokio::spawn({
            let session = session.clone();
            async move { session.send("Network.enable", serde_json::json!({})).await }
        });
        let first_call = recv_call(&mut their_reader).await;
        their_writer
            .write_frame(format!(r#"{{"id":{},"result":{{}}}}"#, first_call.id.value()).as_bytes())
            .await
            .unwrap();
        assert!(first.await.unwrap().is_ok());

        let second = tokio::spawn({
            let session = session.clone();
            async move { session.send("Network.disable", serde_json::json!({})).await }
        });
        // Wait for the second request to actually reach the wire (and so be registered as
        // pending) before severing the transport, otherwise this could race the registration.
        recv_call(&mut their_reader).await;
        drop(their_writer);

        let result = second.await.unwrap();
        assert!(matches!(result, Err(CdpError::SessionCancelled)));
        session.wait().await;
        assert_eq!(session.state(), SessionState::Terminated);
        assert!(output_dir.exists(), "teardown must not remove the session's output directory");
    }

    /// Calling `cancel` drives the session to `Terminated` and fails anything still pending.
    #[tokio::test]
    async fn explicit_cancel_reaches_terminated() {
        let (session, _their_reader, _their_writer) = session_pair();
        session.cancel();
        session.wait().await;
        assert_eq!(session.state(), SessionState::Terminated);

        let result = session.send("Network.enable", serde_json::json!({})).await;
        assert!(matches!(result, Err(CdpError::SessionCancelled)));
    }

    #[tokio::test]
    async fn empty_method_name_is_rejected_before_touching_the_transport() {
        let (session, _their_reader, _their_writer) = session_pair();
        let result = session.send("", serde_json::json!({})).await;
        assert!(matches!(result, Err(CdpError::MalformedRequest)));
    }
}
