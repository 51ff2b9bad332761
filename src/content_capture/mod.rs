// Content capture
//
// Native code reports captured page content per frame session. The receiver
// keeps a tree of known sessions and fans each event out to consumers.

pub mod session;

pub use session::SessionTree;

use crate::models::Rect;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Opaque identifier of one document frame session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SessionId(pub i64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path of session ids from the root frame down to a leaf frame.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct FrameSession(pub Vec<SessionId>);

impl FrameSession {
    pub fn new(path: Vec<SessionId>) -> Self {
        Self(path)
    }

    pub fn path(&self) -> &[SessionId] {
        &self.0
    }

    pub fn leaf(&self) -> Option<SessionId> {
        self.0.last().copied()
    }

    /// The enclosing session, `None` for a root or empty path.
    pub fn parent(&self) -> Option<FrameSession> {
        match self.0.len() {
            0 | 1 => None,
            n => Some(Self(self.0[..n - 1].to_vec())),
        }
    }

    /// Proper prefixes of this path, root first.
    pub fn ancestors(&self) -> impl Iterator<Item = FrameSession> + '_ {
        (1..self.0.len()).map(|n| Self(self.0[..n].to_vec()))
    }

    /// `true` if `other` is this session or lies below it.
    pub fn is_prefix_of(&self, other: &FrameSession) -> bool {
        other.0.starts_with(&self.0)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<const N: usize> From<[i64; N]> for FrameSession {
    fn from(path: [i64; N]) -> Self {
        Self(path.into_iter().map(SessionId).collect())
    }
}

impl fmt::Display for FrameSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let parts: Vec<String> = self.0.iter().map(SessionId::to_string).collect();
        write!(f, "[{}]", parts.join("/"))
    }
}

/// One captured node and its descendants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentCaptureData {
    pub id: i64,

    #[serde(default)]
    pub value: String,

    #[serde(default)]
    pub bounds: Rect,

    #[serde(default)]
    pub children: Vec<ContentCaptureData>,
}

impl ContentCaptureData {
    pub fn new(id: i64, value: impl Into<String>, bounds: Rect) -> Self {
        Self {
            id,
            value: value.into(),
            bounds,
            children: Vec::new(),
        }
    }

    /// This node's id followed by every descendant id, depth first.
    pub fn ids(&self) -> Vec<i64> {
        let mut ids = vec![self.id];
        for child in &self.children {
            ids.extend(child.ids());
        }
        ids
    }
}

/// Receiver of content-capture events.
pub trait ContentCaptureConsumer: Send + Sync {
    fn did_capture_content(&self, session: &FrameSession, data: &ContentCaptureData);

    fn did_update_content(&self, session: &FrameSession, data: &ContentCaptureData);

    fn did_remove_content(&self, session: &FrameSession, ids: &[i64]);

    fn did_remove_session(&self, session: &FrameSession);
}

/// Entry point for native content-capture callbacks.
///
/// Updates the [`SessionTree`] first and then forwards the event to every
/// registered consumer in registration order. Updates and removals that name
/// an unknown session are dropped.
#[derive(Default)]
pub struct ContentCaptureReceiver {
    tree: Mutex<SessionTree>,
    consumers: RwLock<Vec<Arc<dyn ContentCaptureConsumer>>>,
}

impl ContentCaptureReceiver {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_consumer(&self, consumer: Arc<dyn ContentCaptureConsumer>) {
        self.consumers
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .push(consumer);
    }

    /// # Returns
    /// `true` if the consumer was registered
    pub fn remove_consumer(&self, consumer: &Arc<dyn ContentCaptureConsumer>) -> bool {
        let mut consumers = self.consumers.write().unwrap_or_else(PoisonError::into_inner);
        let before = consumers.len();
        consumers.retain(|existing| !Arc::ptr_eq(existing, consumer));
        consumers.len() != before
    }

    pub fn did_capture_content(&self, session: &FrameSession, data: &ContentCaptureData) {
        let created = self.tree().capture(session, data);
        if session.is_empty() {
            return;
        }
        if created > 0 {
            tracing::debug!("Content capture opened {} session(s) under {}", created, session);
        }
        self.each_consumer(|consumer| consumer.did_capture_content(session, data));
    }

    pub fn did_update_content(&self, session: &FrameSession, data: &ContentCaptureData) {
        if !self.tree().update(session, data) {
            tracing::debug!("Ignoring content update for unknown session {}", session);
            return;
        }
        self.each_consumer(|consumer| consumer.did_update_content(session, data));
    }

    pub fn did_remove_content(&self, session: &FrameSession, ids: &[i64]) {
        if self.tree().remove_content(session, ids).is_none() {
            tracing::debug!("Ignoring content removal for unknown session {}", session);
            return;
        }
        self.each_consumer(|consumer| consumer.did_remove_content(session, ids));
    }

    /// Remove `session` and its descendants; consumers hear about each one,
    /// deepest first.
    pub fn did_remove_session(&self, session: &FrameSession) {
        let removed = self.tree().remove_session(session);
        if removed.is_empty() {
            tracing::debug!("Ignoring removal of unknown session {}", session);
            return;
        }
        for gone in &removed {
            self.each_consumer(|consumer| consumer.did_remove_session(gone));
        }
    }

    pub fn contains_session(&self, session: &FrameSession) -> bool {
        self.tree().contains(session)
    }

    pub fn session_count(&self) -> usize {
        self.tree().len()
    }

    fn tree(&self) -> std::sync::MutexGuard<'_, SessionTree> {
        self.tree.lock().unwrap_or_else(PoisonError::into_inner)
    }

    // Consumers are cloned out so a callback may call back into the receiver.
    fn each_consumer<F: Fn(&dyn ContentCaptureConsumer)>(&self, f: F) {
        let consumers = self
            .consumers
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone();
        for consumer in &consumers {
            f(consumer.as_ref());
        }
    }
}
