use crossbeam_channel::{Receiver, Sender};
use leader_election::{new_err, ErrorKind, RankBackend, Result, SessionEvent};
use parking_lot::RwLock;

use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

type SessionId = u64;

#[derive(Debug)]
struct Child {
    payload: Vec<u8>,
    owner: SessionId,
}

#[derive(Debug, Default)]
struct Parent {
    next_sequence: u64,
    children: BTreeMap<String, Child>,
}

#[derive(Debug)]
struct Watch {
    session_id: SessionId,
    watch_tx: Sender<()>,
}

#[derive(Debug)]
struct Session {
    connected: bool,
    events_tx: Sender<SessionEvent>,
}

#[derive(Debug, Default)]
struct RankStoreState {
    parents: HashMap<String, Parent>,
    watches: HashMap<String, Vec<Watch>>,
    sessions: HashMap<SessionId, Session>,
    next_session_id: SessionId,
}

impl RankStoreState {
    fn remove_child(&mut self, path: &str) -> bool {
        let (parent, name) = split_path(path);
        let removed = self
            .parents
            .get_mut(parent)
            .and_then(|parent| parent.children.remove(name))
            .is_some();

        if removed {
            self.fire_watches(path);
        }

        removed
    }

    fn fire_watches(&mut self, path: &str) {
        if let Some(watchers) = self.watches.remove(path) {
            trace!("Deletion of {} notifies {} watcher(s)", path, watchers.len());
            for watch in watchers {
                // The watcher may have moved on already.
                let _ = watch.watch_tx.send(());
            }
        }
    }

    /// Drops the pending watches of a session, disconnecting their receivers.
    fn drop_watches(&mut self, session_id: SessionId) {
        for watchers in self.watches.values_mut() {
            watchers.retain(|watch| watch.session_id != session_id);
        }
        self.watches.retain(|_, watchers| !watchers.is_empty());
    }

    fn remove_ephemerals(&mut self, session_id: SessionId) {
        let owned: Vec<String> = self
            .parents
            .iter()
            .flat_map(|(parent_path, parent)| {
                parent
                    .children
                    .iter()
                    .filter(move |(_, child)| child.owner == session_id)
                    .map(move |(name, _)| format!("{}/{}", parent_path, name))
            })
            .collect();

        for path in owned {
            self.remove_child(&path);
        }
    }

    fn close_session(&mut self, session_id: SessionId) {
        self.remove_ephemerals(session_id);
        self.drop_watches(session_id);
        self.sessions.remove(&session_id);
    }

    fn child(&self, path: &str) -> Option<&Child> {
        let (parent, name) = split_path(path);
        self.parents
            .get(parent)
            .and_then(|parent| parent.children.get(name))
    }
}

fn split_path(path: &str) -> (&str, &str) {
    match path.rfind('/') {
        Some(idx) => (&path[..idx], &path[idx + 1..]),
        None => ("", path),
    }
}

/// In-memory tree of ordered ephemeral registrations, in the manner of a
/// ZooKeeper ensemble. Sessions own their ephemeral children; expiring a
/// session removes them and fires the deletion watches.
#[derive(Clone, Debug, Default)]
pub struct MemoryRankStore {
    state: Arc<RwLock<RankStoreState>>,
}

impl MemoryRankStore {
    pub fn new() -> MemoryRankStore {
        MemoryRankStore::default()
    }

    /// Opens a new session.
    pub fn connect(&self) -> MemoryRankSession {
        let (events_tx, events_rx) = crossbeam_channel::unbounded();

        let mut state = self.state.write();
        state.next_session_id += 1;
        let session_id = state.next_session_id;
        state.sessions.insert(
            session_id,
            Session {
                connected: true,
                events_tx,
            },
        );

        MemoryRankSession {
            store: self.clone(),
            session_id,
            events_rx,
            _closer: Arc::new(SessionCloser {
                store: self.clone(),
                session_id,
            }),
        }
    }

    /// Sessions with at least one live handle.
    pub fn open_sessions(&self) -> usize {
        self.state.read().sessions.len()
    }

    pub fn pending_watches(&self) -> usize {
        self.state.read().watches.values().map(Vec::len).sum()
    }

    /// Child names under `parent`, in creation order.
    pub fn children(&self, parent: &str) -> Vec<String> {
        let state = self.state.read();
        let mut children: Vec<(u64, String)> = Vec::new();
        if let Some(parent) = state.parents.get(parent) {
            for name in parent.children.keys() {
                let digits = name.chars().rev().take_while(|c| c.is_ascii_digit()).count();
                let sequence = name[name.len() - digits..].parse().unwrap_or(u64::MAX);
                children.push((sequence, name.clone()));
            }
        }
        children.sort();

        children.into_iter().map(|(_, name)| name).collect()
    }

    /// Removes a child regardless of its owner, as an operator would.
    pub fn delete_child(&self, path: &str) -> bool {
        self.state.write().remove_child(path)
    }
}

/// Closes the session when the last handle goes away, as a client
/// disconnecting cleanly would.
#[derive(Debug)]
struct SessionCloser {
    store: MemoryRankStore,
    session_id: SessionId,
}

impl Drop for SessionCloser {
    fn drop(&mut self) {
        self.store.state.write().close_session(self.session_id);
        trace!("Session {} closed", self.session_id);
    }
}

/// One client session of [`MemoryRankStore`]. Clones share the session, so a
/// test can keep a clone to suspend or expire it. Dropping the last clone
/// closes the session and removes its ephemeral children.
///
/// A session keeps a single deletion watch: a new watch replaces the pending one.
#[derive(Clone, Debug)]
pub struct MemoryRankSession {
    store: MemoryRankStore,
    session_id: SessionId,
    events_rx: Receiver<SessionEvent>,
    _closer: Arc<SessionCloser>,
}

impl MemoryRankSession {
    pub fn session_id(&self) -> u64 {
        self.session_id
    }

    /// Connection drop: calls fail until reconnect, ephemeral children stay.
    pub fn suspend(&self) {
        self.set_connected(false, SessionEvent::Suspended);
    }

    pub fn reconnect(&self) {
        self.set_connected(true, SessionEvent::Reconnected);
    }

    /// Session expiry: every ephemeral child of the session is deleted. The
    /// session is usable again afterwards, as a freshly established one.
    pub fn expire(&self) {
        let mut state = self.store.state.write();
        state.remove_ephemerals(self.session_id);

        if let Some(session) = state.sessions.get_mut(&self.session_id) {
            session.connected = true;
            let _ = session.events_tx.send(SessionEvent::Lost);
        }
        debug!("Session {} expired", self.session_id);
    }

    fn set_connected(&self, connected: bool, event: SessionEvent) {
        let mut state = self.store.state.write();
        if let Some(session) = state.sessions.get_mut(&self.session_id) {
            if session.connected != connected {
                session.connected = connected;
                let _ = session.events_tx.send(event);
            }
        }
    }

    fn check_connected(&self, state: &RankStoreState, path: &str) -> Result<()> {
        let connected = state
            .sessions
            .get(&self.session_id)
            .map_or(false, |session| session.connected);
        if connected {
            return Ok(());
        }

        new_err(
            ErrorKind::Unavailable,
            format!("Session {} is disconnected", self.session_id),
            format!("path {}", path),
        )
    }
}

fn not_found<T>(path: &str) -> Result<T> {
    new_err(
        ErrorKind::NotFound,
        format!("Node {} does not exist", path),
        String::new(),
    )
}

impl RankBackend for MemoryRankSession {
    fn create_path(&self, path: &str) -> Result<()> {
        let mut state = self.store.state.write();
        self.check_connected(&state, path)?;

        if state.parents.contains_key(path) {
            return new_err(
                ErrorKind::AlreadyExists,
                format!("Path {} already exists", path),
                String::new(),
            );
        }
        state.parents.insert(path.to_string(), Parent::default());

        Ok(())
    }

    fn create_ephemeral_sequential(
        &self,
        parent: &str,
        prefix: &str,
        payload: &[u8],
    ) -> Result<String> {
        let mut state = self.store.state.write();
        self.check_connected(&state, parent)?;

        let parent_node = match state.parents.get_mut(parent) {
            Some(parent_node) => parent_node,
            None => {
                return new_err(
                    ErrorKind::ResourceMissing,
                    format!("Parent path {} does not exist", parent),
                    String::new(),
                )
            }
        };

        let name = format!("{}{:010}", prefix, parent_node.next_sequence);
        parent_node.next_sequence += 1;
        parent_node.children.insert(
            name.clone(),
            Child {
                payload: payload.to_vec(),
                owner: self.session_id,
            },
        );
        trace!("Session {} created {}/{}", self.session_id, parent, name);

        Ok(name)
    }

    fn children(&self, parent: &str) -> Result<Vec<String>> {
        let state = self.store.state.read();
        self.check_connected(&state, parent)?;

        match state.parents.get(parent) {
            Some(parent_node) => Ok(parent_node.children.keys().cloned().collect()),
            None => new_err(
                ErrorKind::ResourceMissing,
                format!("Parent path {} does not exist", parent),
                String::new(),
            ),
        }
    }

    fn read(&self, path: &str) -> Result<Vec<u8>> {
        let state = self.store.state.read();
        self.check_connected(&state, path)?;

        match state.child(path) {
            Some(child) => Ok(child.payload.clone()),
            None => not_found(path),
        }
    }

    fn delete(&self, path: &str) -> Result<()> {
        let mut state = self.store.state.write();
        self.check_connected(&state, path)?;

        if state.remove_child(path) {
            Ok(())
        } else {
            not_found(path)
        }
    }

    fn watch_deletion(&self, path: &str) -> Result<Receiver<()>> {
        let mut state = self.store.state.write();
        self.check_connected(&state, path)?;

        state.drop_watches(self.session_id);

        let (watch_tx, watch_rx) = crossbeam_channel::bounded(1);
        if state.child(path).is_none() {
            let _ = watch_tx.send(());
        } else {
            state
                .watches
                .entry(path.to_string())
                .or_insert_with(Vec::new)
                .push(Watch {
                    session_id: self.session_id,
                    watch_tx,
                });
        }

        Ok(watch_rx)
    }

    fn session_events(&self) -> Receiver<SessionEvent> {
        self.events_rx.clone()
    }
}
