//! Web server controller.
//!
//! # Data Flow
//! ```text
//! start()  Idle → Starting
//!     → discovery (configurations, then servlets) into the RouteTable
//!     → transport task: bind → Started | Failed
//!         on Started: register "Stop Web Server" with the ShutdownManager,
//!                     publish the service announcement
//! stop()   → Stopping
//!     → withdraw announcement, trigger transport shutdown, await drain
//!     → Stopped (shutdown task deregistered)
//! ```
//!
//! # Design Decisions
//! - One controller per process, built explicitly by the composition root;
//!   no global instance
//! - `start` never blocks; observers follow the state through `subscribe`
//! - Every transition happens under the slot mutex, so the transport task
//!   and a concurrent `stop` cannot interleave half-applied transitions
//! - The shutdown task holds only a weak handle to the controller

mod error;

use std::net::SocketAddr;
use std::panic::AssertUnwindSafe;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};

use futures_util::FutureExt;
use tokio::runtime::Handle;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::announce::{Announcement, LogAnnouncer, ServiceAnnouncer};
use crate::config::WebServerConfig;
use crate::discovery::{Discovery, DiscoveryReport};
use crate::handler::{Servlet, ServletDescriptor};
use crate::http::HttpServer;
use crate::lifecycle::{BoxError, LifecycleState, ParallelStopTask, ShutdownManager, ShutdownSignal, ShutdownTask};
use crate::net::Listener;
use crate::observability::metrics;
use crate::resource::{PortableRoots, ResourceResolver};
use crate::routing::{RegistrationError, RegistrationKind, RouteTable, ServletRegistration};

pub use error::ServerError;

/// Name of the task registered with the shutdown sequencer.
pub const SHUTDOWN_TASK_NAME: &str = "Stop Web Server";

/// Handle to the web server. Cheap to clone.
#[derive(Clone)]
pub struct WebServer {
    inner: Arc<Inner>,
}

struct Inner {
    config: WebServerConfig,
    routes: Arc<RouteTable>,
    discovery: Discovery,
    shutdown_manager: Option<Arc<ShutdownManager>>,
    announcer: Arc<dyn ServiceAnnouncer>,
    state: watch::Sender<LifecycleState>,
    slot: Mutex<Slot>,
}

/// Everything that exists only while a transport is up.
#[derive(Default)]
struct Slot {
    signal: Option<ShutdownSignal>,
    transport: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
    shutdown_task: Option<Arc<dyn ShutdownTask>>,
    announcement: Option<Announcement>,
    discovery: Option<DiscoveryReport>,
}

/// Builder for [`WebServer`].
pub struct WebServerBuilder {
    config: WebServerConfig,
    discovery: Option<Discovery>,
    shutdown_manager: Option<Arc<ShutdownManager>>,
    announcer: Arc<dyn ServiceAnnouncer>,
}

impl WebServerBuilder {
    /// Replace the contribution table. Defaults to
    /// [`Discovery::from_config`].
    pub fn discovery(mut self, discovery: Discovery) -> Self {
        self.discovery = Some(discovery);
        self
    }

    pub fn shutdown_manager(mut self, manager: Arc<ShutdownManager>) -> Self {
        self.shutdown_manager = Some(manager);
        self
    }

    pub fn announcer(mut self, announcer: Arc<dyn ServiceAnnouncer>) -> Self {
        self.announcer = announcer;
        self
    }

    pub fn build(self) -> WebServer {
        let discovery = self
            .discovery
            .unwrap_or_else(|| Discovery::from_config(&self.config));
        let resolver = ResourceResolver::new(PortableRoots::from_config(&self.config.paths));
        let (state, _) = watch::channel(LifecycleState::Idle);

        WebServer {
            inner: Arc::new(Inner {
                routes: Arc::new(RouteTable::new(resolver)),
                config: self.config,
                discovery,
                shutdown_manager: self.shutdown_manager,
                announcer: self.announcer,
                state,
                slot: Mutex::new(Slot::default()),
            }),
        }
    }
}

impl WebServer {
    pub fn builder(config: WebServerConfig) -> WebServerBuilder {
        WebServerBuilder {
            config,
            discovery: None,
            shutdown_manager: None,
            announcer: Arc::new(LogAnnouncer),
        }
    }

    /// A server with default collaborators.
    pub fn new(config: WebServerConfig) -> Self {
        Self::builder(config).build()
    }

    pub fn config(&self) -> &WebServerConfig {
        &self.inner.config
    }

    /// The configured port.
    pub fn port(&self) -> u16 {
        self.inner.config.server.port
    }

    /// The bound address while the transport is up.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.inner.lock_slot().local_addr
    }

    pub fn state(&self) -> LifecycleState {
        *self.inner.state.borrow()
    }

    /// Observe state transitions.
    pub fn subscribe(&self) -> watch::Receiver<LifecycleState> {
        self.inner.state.subscribe()
    }

    /// Wait until the state is Started, Failed or Stopped.
    pub async fn wait_until_settled(&self) -> LifecycleState {
        let mut states = self.subscribe();
        let settled = states.wait_for(|state| state.is_settled()).await.map(|state| *state);
        settled.unwrap_or_else(|_| self.state())
    }

    pub fn routes(&self) -> &Arc<RouteTable> {
        &self.inner.routes
    }

    /// What the last discovery pass did, once `start` has run it.
    pub fn discovery_report(&self) -> Option<DiscoveryReport> {
        self.inner.lock_slot().discovery.clone()
    }

    pub fn register_denial(&self, pattern: &str) -> Result<(), RegistrationError> {
        self.inner.routes.register_denial(pattern)
    }

    pub fn register_resource(&self, pattern: &str, logical_path: &str) -> Result<(), RegistrationError> {
        self.inner.routes.register_resource(pattern, logical_path)
    }

    pub fn register_redirection(&self, pattern: &str, target: &str) -> Result<(), RegistrationError> {
        self.inner.routes.register_redirection(pattern, target)
    }

    pub fn register_servlet(
        &self,
        descriptor: &ServletDescriptor,
        instance: Option<Arc<dyn Servlet>>,
    ) -> Result<ServletRegistration, RegistrationError> {
        self.inner.routes.register_servlet(descriptor, instance)
    }

    pub fn registration(&self, pattern: &str) -> Option<RegistrationKind> {
        self.inner.routes.kind(pattern)
    }

    /// Begin serving. Returns once startup is under way; the outcome is
    /// reported through the state. Calling it again is a no-op.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn start(&self) -> Result<(), ServerError> {
        let runtime = Handle::try_current().map_err(|_| ServerError::NoRuntime)?;

        let mut slot = self.inner.lock_slot();
        let claimed = self.inner.state.send_if_modified(|state| {
            if *state == LifecycleState::Idle {
                *state = LifecycleState::Starting;
                true
            } else {
                false
            }
        });
        if !claimed {
            tracing::debug!(state = %self.state(), "Web server already started");
            return Ok(());
        }

        tracing::info!(port = self.port(), "Starting Web Server");

        slot.discovery = Some(self.inner.discovery.apply(&self.inner.routes));

        let http = HttpServer::new(Arc::clone(&self.inner.routes), &self.inner.config.server);
        let signal = ShutdownSignal::new();
        let inner = Arc::clone(&self.inner);
        let transport_signal = signal.clone();
        let task_runtime = runtime.clone();

        slot.transport = Some(runtime.spawn(async move {
            let transport = Arc::clone(&inner).run_transport(http, transport_signal, task_runtime);
            if AssertUnwindSafe(transport).catch_unwind().await.is_err() {
                tracing::error!("Web Server transport panicked");
                inner.fail_start();
            }
        }));
        slot.signal = Some(signal);
        Ok(())
    }

    /// Stop serving and wait for in-flight connections to drain.
    ///
    /// Stopping a server that is already stopping or stopped does nothing.
    pub async fn stop(&self) -> Result<(), ServerError> {
        let (signal, transport, announcement) = {
            let mut slot = self.inner.lock_slot();
            match self.state() {
                LifecycleState::Idle => return Err(ServerError::NotStarted),
                LifecycleState::Stopping | LifecycleState::Stopped => {
                    tracing::debug!("Web server already stopping");
                    return Ok(());
                }
                LifecycleState::Starting | LifecycleState::Started | LifecycleState::Failed => {}
            }
            self.inner.state.send_replace(LifecycleState::Stopping);
            tracing::info!("Stopping Web Server");
            (slot.signal.take(), slot.transport.take(), slot.announcement.take())
        };

        if let Some(announcement) = announcement {
            if let Err(e) = self.inner.announcer.withdraw(&announcement) {
                tracing::warn!(error = %e, "Unable to withdraw service announcement");
            }
        }

        if let Some(signal) = signal {
            signal.trigger();
        }

        let result = match transport {
            Some(transport) => transport
                .await
                .map_err(|e| ServerError::TransportStop(e.to_string())),
            None => Ok(()),
        };

        let mut slot = self.inner.lock_slot();
        slot.local_addr = None;
        match &result {
            Ok(()) => {
                if let (Some(manager), Some(task)) =
                    (&self.inner.shutdown_manager, slot.shutdown_task.take())
                {
                    manager.deregister(&task);
                }
                self.inner.state.send_replace(LifecycleState::Stopped);
                tracing::info!("Web Server stopped");
            }
            Err(e) => {
                self.inner.state.send_replace(LifecycleState::Failed);
                tracing::error!(error = %e, "Web Server failed to stop");
            }
        }
        drop(slot);

        metrics::record_running(false);
        result
    }
}

impl Inner {
    fn lock_slot(&self) -> MutexGuard<'_, Slot> {
        self.slot.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn run_transport(self: Arc<Self>, http: HttpServer, signal: ShutdownSignal, runtime: Handle) {
        let listener = match Listener::bind(&self.config.server) {
            Ok(listener) => listener,
            Err(e) => {
                let e = ServerError::from(e);
                tracing::error!(port = self.config.server.port, error = %e, "Exception starting Web Server");
                self.fail_start();
                return;
            }
        };

        self.on_started(listener.local_addr().ok(), runtime);

        if let Err(e) = http.run(listener, signal).await {
            tracing::error!(error = %e, "Web Server transport failed");
            self.fail_start();
        }
    }

    /// Starting → Failed, unless a stop got there first.
    fn fail_start(&self) {
        let _slot = self.lock_slot();
        self.state.send_if_modified(|state| match *state {
            LifecycleState::Starting | LifecycleState::Started => {
                *state = LifecycleState::Failed;
                true
            }
            _ => false,
        });
    }

    fn on_started(self: &Arc<Self>, local_addr: Option<SocketAddr>, runtime: Handle) {
        let mut slot = self.lock_slot();
        if *self.state.borrow() != LifecycleState::Starting {
            return;
        }
        slot.local_addr = local_addr;

        if let Some(manager) = &self.shutdown_manager {
            let task: Arc<dyn ShutdownTask> = Arc::new(stop_task(Arc::downgrade(self), runtime));
            manager.register(Arc::clone(&task));
            slot.shutdown_task = Some(task);
        }

        if self.config.announcement.enabled {
            let port = local_addr.map_or(self.config.server.port, |addr| addr.port());
            let announcement = Announcement::web_server(&self.config.announcement, port);
            match self.announcer.publish(&announcement) {
                Ok(()) => slot.announcement = Some(announcement),
                Err(e) => tracing::warn!(error = %e, "Unable to publish service announcement"),
            }
        }

        self.state.send_replace(LifecycleState::Started);
        metrics::record_running(true);
        tracing::info!(address = ?local_addr, "Web Server finished starting");
    }
}

/// The sequencer's handle on this server: a parallel task that stops it.
fn stop_task(server: Weak<Inner>, runtime: Handle) -> ParallelStopTask {
    ParallelStopTask::new(SHUTDOWN_TASK_NAME, runtime, move || {
        let server = server.clone();
        Box::pin(async move {
            match server.upgrade() {
                Some(inner) => WebServer { inner }.stop().await.map_err(BoxError::from),
                None => Ok(()),
            }
        })
    })
}

impl std::fmt::Debug for WebServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebServer")
            .field("port", &self.port())
            .field("state", &self.state())
            .field("local_addr", &self.local_addr())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::announce::AnnounceError;
    use std::sync::Mutex as StdMutex;

    #[derive(Default)]
    struct Recording {
        events: StdMutex<Vec<String>>,
    }

    impl ServiceAnnouncer for Recording {
        fn publish(&self, announcement: &Announcement) -> Result<(), AnnounceError> {
            self.events.lock().unwrap().push(format!("publish {}", announcement.port));
            Ok(())
        }

        fn withdraw(&self, announcement: &Announcement) -> Result<(), AnnounceError> {
            self.events.lock().unwrap().push(format!("withdraw {}", announcement.port));
            Ok(())
        }
    }

    fn config() -> WebServerConfig {
        let mut config = WebServerConfig::default();
        config.server.bind_address = "127.0.0.1".into();
        config.server.port = 0;
        config.server.drain_timeout_secs = 1;
        config
    }

    #[test]
    fn start_outside_runtime_is_an_error() {
        let server = WebServer::new(config());
        assert!(matches!(server.start(), Err(ServerError::NoRuntime)));
        assert_eq!(server.state(), LifecycleState::Idle);
    }

    #[tokio::test]
    async fn stop_before_start_is_an_error() {
        let server = WebServer::new(config());
        assert!(matches!(server.stop().await, Err(ServerError::NotStarted)));
    }

    #[tokio::test]
    async fn start_then_stop() {
        let manager = Arc::new(ShutdownManager::default());
        let announcer = Arc::new(Recording::default());
        let server = WebServer::builder(config())
            .discovery(Discovery::new())
            .shutdown_manager(Arc::clone(&manager))
            .announcer(announcer.clone())
            .build();

        server.start().unwrap();
        assert_eq!(server.wait_until_settled().await, LifecycleState::Started);
        let port = server.local_addr().unwrap().port();
        assert_ne!(port, 0);
        assert_eq!(manager.tasks().len(), 1);
        assert_eq!(manager.tasks()[0].name(), SHUTDOWN_TASK_NAME);

        server.stop().await.unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
        assert!(server.local_addr().is_none());
        assert!(manager.tasks().is_empty());
        assert_eq!(
            *announcer.events.lock().unwrap(),
            vec![format!("publish {port}"), format!("withdraw {port}")]
        );

        // A second stop is a no-op.
        server.stop().await.unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn second_start_does_not_bind_again() {
        let port = std::net::TcpListener::bind("127.0.0.1:0")
            .unwrap()
            .local_addr()
            .unwrap()
            .port();
        let mut config = config();
        config.server.port = port;

        let server = WebServer::builder(config).discovery(Discovery::new()).build();
        server.start().unwrap();
        assert_eq!(server.wait_until_settled().await, LifecycleState::Started);

        // A second bind on the same fixed port would fail and move to Failed.
        server.start().unwrap();
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;
        assert_eq!(server.state(), LifecycleState::Started);
        assert_eq!(server.local_addr().unwrap().port(), port);

        server.stop().await.unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn oversized_worker_bound_fails_instead_of_hanging() {
        let mut config = config();
        config.server.max_workers = usize::MAX;
        let server = WebServer::builder(config).discovery(Discovery::new()).build();

        server.start().unwrap();
        let settled = tokio::time::timeout(std::time::Duration::from_secs(3), server.wait_until_settled())
            .await
            .unwrap();
        assert_eq!(settled, LifecycleState::Failed);
    }

    struct Exploding;

    impl ServiceAnnouncer for Exploding {
        fn publish(&self, _announcement: &Announcement) -> Result<(), AnnounceError> {
            panic!("announcer blew up");
        }

        fn withdraw(&self, _announcement: &Announcement) -> Result<(), AnnounceError> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn panic_during_readiness_moves_to_failed() {
        let server = WebServer::builder(config())
            .discovery(Discovery::new())
            .announcer(Arc::new(Exploding))
            .build();

        server.start().unwrap();
        let settled = tokio::time::timeout(std::time::Duration::from_secs(3), server.wait_until_settled())
            .await
            .unwrap();
        assert_eq!(settled, LifecycleState::Failed);

        server.stop().await.unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn bind_failure_moves_to_failed() {
        let occupied = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let mut config = config();
        config.server.port = occupied.local_addr().unwrap().port();
        let manager = Arc::new(ShutdownManager::default());

        let server = WebServer::builder(config)
            .discovery(Discovery::new())
            .shutdown_manager(Arc::clone(&manager))
            .build();
        server.start().unwrap();

        assert_eq!(server.wait_until_settled().await, LifecycleState::Failed);
        assert!(manager.tasks().is_empty());

        // Failed servers can still be stopped.
        server.stop().await.unwrap();
        assert_eq!(server.state(), LifecycleState::Stopped);
    }

    #[tokio::test]
    async fn start_runs_discovery() {
        let server = WebServer::new(config());
        server.start().unwrap();
        server.wait_until_settled().await;

        assert_eq!(server.registration("/dist"), Some(RegistrationKind::Resource));
        assert_eq!(server.registration("/prefs"), Some(RegistrationKind::Resource));
        assert_eq!(server.discovery_report().unwrap().registered, 2);
        server.stop().await.unwrap();
    }
}
