//! Connection lifecycle and by-name value access
//!
//! A [`Connection`] resolves a host name to an open [`Hub`], tracks
//! link state, and raises [`ConnectionEvent`]s on every state edge. A
//! background monitor task watches the hub's open flag so that a hub
//! shutting down drops every attached connection without the hub
//! holding references back to them.

use crate::config::ClientConfig;
use crate::error::{ClientError, ClientResult};
use crate::hub::Hub;
use crate::value::Value;
use log::{debug, info, warn};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, Weak};
use std::time::Duration;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;

/// How often an in-flight connect re-checks the hub registry.
const CONNECT_RETRY_INTERVAL: Duration = Duration::from_millis(20);

/// Connection-state edge, broadcast to subscribers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    Connected,
    Disconnected,
}

/// A live attachment to a hub plus the task watching its open flag.
#[derive(Debug)]
struct Link {
    hub: Arc<Hub>,
    monitor: JoinHandle<()>,
}

#[derive(Debug)]
struct ConnectionInner {
    config: ClientConfig,
    connected: AtomicBool,
    priority_mode: AtomicBool,
    link: Mutex<Option<Link>>,
    events: broadcast::Sender<ConnectionEvent>,
}

impl ConnectionInner {
    /// Flip the connected flag, emitting an event only on an actual
    /// edge. Redundant transitions are silent.
    fn transition(&self, connected: bool) {
        if self.connected.swap(connected, Ordering::SeqCst) != connected {
            let event = if connected {
                ConnectionEvent::Connected
            } else {
                ConnectionEvent::Disconnected
            };
            let _ = self.events.send(event);
        }
    }
}

impl Drop for ConnectionInner {
    fn drop(&mut self) {
        if let Some(link) = self.link.get_mut().expect("connection link poisoned").take() {
            link.monitor.abort();
        }
    }
}

/// Client-side connection object. Cheap to clone; clones share state.
#[derive(Clone, Debug)]
pub struct Connection {
    inner: Arc<ConnectionInner>,
}

impl Connection {
    /// Create a connection using configuration from the environment
    /// (see [`ClientConfig::load`]).
    pub fn new() -> ClientResult<Self> {
        Ok(Self::with_config(ClientConfig::load()?))
    }

    /// Create a connection with an explicit configuration.
    pub fn with_config(config: ClientConfig) -> Self {
        let (events, _) = broadcast::channel(config.event_capacity.max(1));
        Connection {
            inner: Arc::new(ConnectionInner {
                config,
                connected: AtomicBool::new(false),
                priority_mode: AtomicBool::new(false),
                link: Mutex::new(None),
                events,
            }),
        }
    }

    pub fn config(&self) -> &ClientConfig {
        &self.inner.config
    }

    /// Attach to the hub registered under `host` (the configured
    /// default host when `None`). Waits up to `connect_timeout_ms` for
    /// the hub to appear; a zero timeout checks exactly once. Already
    /// connected is a no-op.
    pub async fn connect(&self, host: Option<&str>) -> ClientResult<()> {
        let host = host
            .unwrap_or(&self.inner.config.default_host)
            .to_string();
        if self.is_connected() {
            debug!("connect to '{host}' skipped: already connected");
            return Ok(());
        }

        let hub = self.resolve(&host).await?;
        let monitor = tokio::spawn(monitor_hub(Arc::downgrade(&self.inner), hub.watch_open()));

        let mut link = self.inner.link.lock().expect("connection link poisoned");
        if let Some(old) = link.replace(Link { hub, monitor }) {
            old.monitor.abort();
        }
        drop(link);

        self.inner.transition(true);
        info!("connected to '{host}'");
        Ok(())
    }

    async fn resolve(&self, host: &str) -> ClientResult<Arc<Hub>> {
        let budget = Duration::from_millis(self.inner.config.connect_timeout_ms);
        let deadline = tokio::time::Instant::now() + budget;
        loop {
            if let Some(hub) = Hub::lookup(host) {
                if hub.is_open() {
                    return Ok(hub);
                }
            }
            if budget.is_zero() || tokio::time::Instant::now() >= deadline {
                return Err(ClientError::ConnectionFailed {
                    host: host.to_string(),
                    reason: "no hub is listening under that host name".to_string(),
                });
            }
            tokio::time::sleep(CONNECT_RETRY_INTERVAL).await;
        }
    }

    /// Detach from the hub. Idempotent; emits `Disconnected` only when
    /// a link was actually up.
    pub fn disconnect(&self) {
        let link = self.inner.link.lock().expect("connection link poisoned").take();
        if let Some(link) = link {
            link.monitor.abort();
            info!("disconnected from '{}'", link.hub.host());
        }
        self.inner.transition(false);
    }

    pub fn is_connected(&self) -> bool {
        self.inner.connected.load(Ordering::SeqCst)
    }

    /// Advisory write-priority flag; recorded locally and readable via
    /// [`Connection::priority_mode`]. Never fails.
    pub fn set_priority_mode(&self, enabled: bool) {
        self.inner.priority_mode.store(enabled, Ordering::SeqCst);
        debug!("priority mode {}", if enabled { "on" } else { "off" });
    }

    pub fn priority_mode(&self) -> bool {
        self.inner.priority_mode.load(Ordering::SeqCst)
    }

    /// Stream of connection-state edges.
    pub fn subscribe_events(&self) -> broadcast::Receiver<ConnectionEvent> {
        self.inner.events.subscribe()
    }

    pub(crate) fn hub(&self) -> ClientResult<Arc<Hub>> {
        self.inner
            .link
            .lock()
            .expect("connection link poisoned")
            .as_ref()
            .map(|link| Arc::clone(&link.hub))
            .ok_or(ClientError::NotConnected)
    }

    /// By-name read of the latest value on the hub. A slot that has
    /// never been written reports [`ClientError::NotReady`].
    pub fn read_value(&self, name: &str) -> ClientResult<Value> {
        let hub = self.hub()?;
        hub.read(name)?.ok_or_else(|| ClientError::not_ready(name))
    }

    /// By-name write through to the hub.
    pub fn write_value(&self, name: &str, value: Value) -> ClientResult<()> {
        self.hub()?.write(name, value)
    }
}

/// Watches a hub's open flag and severs the owning connection when the
/// hub closes. Holds only a `Weak` so an abandoned connection can
/// still drop.
async fn monitor_hub(inner: Weak<ConnectionInner>, mut open: watch::Receiver<bool>) {
    loop {
        if !*open.borrow_and_update() {
            break;
        }
        if open.changed().await.is_err() {
            break;
        }
    }
    if let Some(inner) = inner.upgrade() {
        // This task is the one referenced by the link; take() here
        // detaches rather than joins it.
        let link = inner.link.lock().expect("connection link poisoned").take();
        drop(link);
        inner.transition(false);
        warn!("hub closed; connection dropped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::ValueKind;
    use pretty_assertions::assert_eq;
    use tokio::time::timeout;

    fn test_config() -> ClientConfig {
        ClientConfig {
            default_host: "conn-test-default".to_string(),
            connect_timeout_ms: 0,
            event_capacity: 8,
        }
    }

    #[tokio::test]
    async fn test_connect_requires_open_hub() {
        let conn = Connection::with_config(test_config());
        let err = conn.connect(Some("conn-test-nobody")).await.unwrap_err();
        assert!(matches!(err, ClientError::ConnectionFailed { host, .. } if host == "conn-test-nobody"));
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_connect_and_disconnect_raise_edges() {
        let hub = Hub::open("conn-test-edges");
        let conn = Connection::with_config(test_config());
        let mut events = conn.subscribe_events();

        conn.connect(Some("conn-test-edges")).await.unwrap();
        assert!(conn.is_connected());
        // second connect is a no-op and must not raise another edge
        conn.connect(Some("conn-test-edges")).await.unwrap();

        conn.disconnect();
        assert!(!conn.is_connected());
        // second disconnect is silent
        conn.disconnect();

        assert_eq!(events.try_recv().unwrap(), ConnectionEvent::Connected);
        assert_eq!(events.try_recv().unwrap(), ConnectionEvent::Disconnected);
        assert!(events.try_recv().is_err());
        hub.close();
    }

    #[tokio::test]
    async fn test_default_host_used_when_none() {
        let hub = Hub::open("conn-test-default");
        let conn = Connection::with_config(test_config());
        conn.connect(None).await.unwrap();
        assert!(conn.is_connected());
        conn.disconnect();
        hub.close();
    }

    #[tokio::test]
    async fn test_connect_waits_for_hub_within_timeout() {
        let config = ClientConfig {
            connect_timeout_ms: 2_000,
            ..test_config()
        };
        let conn = Connection::with_config(config);

        let opener = tokio::spawn(async {
            tokio::time::sleep(Duration::from_millis(60)).await;
            Hub::open("conn-test-late")
        });

        conn.connect(Some("conn-test-late")).await.unwrap();
        assert!(conn.is_connected());
        conn.disconnect();
        opener.await.unwrap().close();
    }

    #[tokio::test]
    async fn test_hub_close_forces_disconnect() {
        let hub = Hub::open("conn-test-forced");
        let conn = Connection::with_config(test_config());
        conn.connect(Some("conn-test-forced")).await.unwrap();
        let mut events = conn.subscribe_events();

        hub.close();

        let event = timeout(Duration::from_secs(1), events.recv())
            .await
            .expect("monitor did not react to hub close")
            .unwrap();
        assert_eq!(event, ConnectionEvent::Disconnected);
        assert!(!conn.is_connected());
    }

    #[tokio::test]
    async fn test_value_ops_require_connection() {
        let conn = Connection::with_config(test_config());
        assert!(matches!(
            conn.read_value("anything"),
            Err(ClientError::NotConnected)
        ));
        assert!(matches!(
            conn.write_value("anything", Value::Float(1.0)),
            Err(ClientError::NotConnected)
        ));
    }

    #[tokio::test]
    async fn test_read_write_through_hub() {
        let hub = Hub::open("conn-test-values");
        hub.define("speed", ValueKind::Float);
        let conn = Connection::with_config(test_config());
        conn.connect(Some("conn-test-values")).await.unwrap();

        assert!(matches!(
            conn.read_value("speed"),
            Err(ClientError::NotReady { .. })
        ));
        conn.write_value("speed", Value::Float(142.5)).unwrap();
        assert_eq!(conn.read_value("speed").unwrap(), Value::Float(142.5));

        assert!(matches!(
            conn.read_value("undefined"),
            Err(ClientError::NotFound(_))
        ));

        conn.disconnect();
        hub.close();
    }

    #[tokio::test]
    async fn test_priority_mode_is_sticky() {
        let conn = Connection::with_config(test_config());
        assert!(!conn.priority_mode());
        conn.set_priority_mode(true);
        assert!(conn.priority_mode());
        conn.set_priority_mode(false);
        assert!(!conn.priority_mode());
    }
}
