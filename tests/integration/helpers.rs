//! Shared test helpers for integration tests.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{broadcast, mpsc};

use vocab_auth::{PermissionResolver, RbacEnforcer, Role};
use vocab_cache::StorageKeys;
use vocab_cache::local::MemoryLocalStore;
use vocab_core::config::cache::CacheConfig;
use vocab_core::config::sync::SyncConfig;
use vocab_core::error::AppError;
use vocab_core::events::{ClientEvent, ConnectionState, EventPayload};
use vocab_core::result::AppResult;
use vocab_core::traits::LocalStore;
use vocab_core::types::SubjectId;
use vocab_sync::connection::{Connection, Frame};
use vocab_sync::menu::MenuListing;
use vocab_sync::{MenuEntry, MenuId, MenuSource, SyncClient, SyncDependencies, SyncSession, Transport};

/// Transport that hands out queued server ends; with nothing queued every
/// connect is refused.
#[derive(Debug, Default)]
pub struct ScriptedTransport {
    pending: Mutex<VecDeque<mpsc::UnboundedReceiver<Frame>>>,
    pub connects: AtomicUsize,
}

impl ScriptedTransport {
    /// Queue one successful connect and return its server side.
    pub fn accept(&self) -> mpsc::UnboundedSender<Frame> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.pending.lock().unwrap().push_back(rx);
        tx
    }

    pub fn connect_count(&self) -> usize {
        self.connects.load(Ordering::SeqCst)
    }
}

struct ScriptedConnection {
    rx: mpsc::UnboundedReceiver<Frame>,
}

#[async_trait]
impl Transport for ScriptedTransport {
    async fn connect(&self, _url: &str) -> AppResult<Box<dyn Connection>> {
        self.connects.fetch_add(1, Ordering::SeqCst);
        let next = self.pending.lock().unwrap().pop_front();
        match next {
            Some(rx) => Ok(Box::new(ScriptedConnection { rx })),
            None => Err(AppError::network("connection refused")),
        }
    }
}

#[async_trait]
impl Connection for ScriptedConnection {
    async fn send(&mut self, _text: String) -> AppResult<()> {
        Ok(())
    }

    async fn recv(&mut self) -> Option<AppResult<Frame>> {
        self.rx.recv().await.map(Ok)
    }

    async fn close(&mut self, _code: u16) -> AppResult<()> {
        self.rx.close();
        Ok(())
    }
}

/// Menu source serving a fixed sidebar.
#[derive(Debug)]
pub struct StaticMenus {
    entries: Vec<MenuEntry>,
    pub fetches: AtomicUsize,
}

impl StaticMenus {
    pub fn sidebar() -> Self {
        Self {
            entries: vec![
                menu_entry(1, None, &[]),
                menu_entry(2, Some(1), &["learning.word_learning"]),
                menu_entry(3, Some(1), &["system.manage_users"]),
            ],
            fetches: AtomicUsize::new(0),
        }
    }

    pub fn fetch_count(&self) -> usize {
        self.fetches.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl MenuSource for StaticMenus {
    async fn fetch_menu(&self, _position: &str, _token: Option<&str>) -> AppResult<MenuListing> {
        self.fetches.fetch_add(1, Ordering::SeqCst);
        Ok(MenuListing {
            version: Some(1),
            entries: self.entries.clone(),
        })
    }
}

pub fn menu_entry(id: u64, parent: Option<u64>, permissions: &[&str]) -> MenuEntry {
    MenuEntry {
        id: MenuId::from(id),
        parent_id: parent.map(MenuId::from),
        title: format!("item {id}"),
        path: None,
        icon: None,
        order: id as i32,
        permissions: permissions.iter().map(|p| p.to_string()).collect(),
    }
}

pub fn subject(id: &str) -> SubjectId {
    SubjectId::new(id).expect("valid subject")
}

pub fn resolver() -> Arc<PermissionResolver> {
    Arc::new(PermissionResolver::new(
        Arc::new(RbacEnforcer::builtin().expect("builtin catalog")),
        &CacheConfig::default(),
    ))
}

/// A sync client wired to fakes, plus handles on the fakes.
pub struct TestClient {
    pub client: SyncClient,
    pub transport: Arc<ScriptedTransport>,
    pub menus: Arc<StaticMenus>,
    pub resolver: Arc<PermissionResolver>,
}

impl TestClient {
    pub fn new(subject_id: &str, role: Role, config: SyncConfig) -> Self {
        let transport = Arc::new(ScriptedTransport::default());
        let menus = Arc::new(StaticMenus::sidebar());
        let resolver = resolver();
        let store: Arc<dyn LocalStore> = Arc::new(MemoryLocalStore::new());

        let client = SyncClient::new(
            SyncSession {
                subject: subject(subject_id),
                role,
            },
            SyncDependencies {
                config,
                ws_base_url: "ws://backend.test".to_string(),
                resolver: Arc::clone(&resolver),
                menus: menus.clone(),
                store,
                keys: StorageKeys::new("vocab"),
                transport: transport.clone(),
            },
        );

        Self {
            client,
            transport,
            menus,
            resolver,
        }
    }
}

pub fn fast_sync_config() -> SyncConfig {
    SyncConfig {
        base_delay_ms: 100,
        max_reconnect_interval_ms: 1000,
        max_reconnect_attempts: 3,
        ..SyncConfig::default()
    }
}

pub async fn wait_for_state(client: &SyncClient, wanted: ConnectionState) {
    let mut rx = client.watch_state();
    tokio::time::timeout(Duration::from_secs(600), rx.wait_for(|s| *s == wanted))
        .await
        .expect("state not reached")
        .expect("state channel closed");
}

pub async fn wait_for_event(
    rx: &mut broadcast::Receiver<ClientEvent>,
    mut matches: impl FnMut(&EventPayload) -> bool,
) -> EventPayload {
    tokio::time::timeout(Duration::from_secs(600), async {
        loop {
            let event = rx.recv().await.expect("event channel closed");
            if matches(&event.payload) {
                return event.payload;
            }
        }
    })
    .await
    .expect("event not seen")
}
