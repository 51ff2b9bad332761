use super::{ContentCaptureData, FrameSession};
use std::collections::{HashMap, HashSet};

/// Known frame sessions and the content ids captured in each.
///
/// Sessions form a tree through their paths: `[1, 2]` is a child of `[1]`.
/// Capturing on a path creates it and any missing ancestors. Removing a
/// session removes its whole subtree.
#[derive(Debug, Default)]
pub struct SessionTree {
    sessions: HashMap<FrameSession, HashSet<i64>>,
}

impl SessionTree {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record captured content, creating `session` and its ancestors as needed.
    ///
    /// # Returns
    /// Number of sessions created
    pub fn capture(&mut self, session: &FrameSession, data: &ContentCaptureData) -> usize {
        if session.is_empty() {
            tracing::warn!("Ignoring content captured on an empty session path");
            return 0;
        }

        let mut created = 0;
        for ancestor in session.ancestors() {
            if !self.sessions.contains_key(&ancestor) {
                self.sessions.insert(ancestor, HashSet::new());
                created += 1;
            }
        }

        let ids = self.sessions.entry(session.clone()).or_insert_with(|| {
            created += 1;
            HashSet::new()
        });
        ids.extend(data.ids());
        created
    }

    /// Record updated content on an existing session.
    ///
    /// # Returns
    /// `false` if the session is unknown
    pub fn update(&mut self, session: &FrameSession, data: &ContentCaptureData) -> bool {
        match self.sessions.get_mut(session) {
            Some(ids) => {
                ids.extend(data.ids());
                true
            }
            None => false,
        }
    }

    /// Drop content ids from a session.
    ///
    /// # Returns
    /// How many of `ids` were present, or `None` if the session is unknown
    pub fn remove_content(&mut self, session: &FrameSession, ids: &[i64]) -> Option<usize> {
        let known = self.sessions.get_mut(session)?;
        Some(ids.iter().filter(|id| known.remove(id)).count())
    }

    /// Remove a session and every session below it.
    ///
    /// # Returns
    /// The removed sessions, deepest first. Empty if `session` was unknown.
    pub fn remove_session(&mut self, session: &FrameSession) -> Vec<FrameSession> {
        if !self.sessions.contains_key(session) {
            return Vec::new();
        }

        let mut removed: Vec<FrameSession> = self
            .sessions
            .keys()
            .filter(|candidate| session.is_prefix_of(candidate))
            .cloned()
            .collect();
        removed.sort_by(|a, b| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));

        for gone in &removed {
            self.sessions.remove(gone);
        }
        removed
    }

    pub fn contains(&self, session: &FrameSession) -> bool {
        self.sessions.contains_key(session)
    }

    pub fn content_ids(&self, session: &FrameSession) -> Option<&HashSet<i64>> {
        self.sessions.get(session)
    }

    /// Direct children of `session`.
    pub fn children(&self, session: &FrameSession) -> Vec<FrameSession> {
        let mut children: Vec<FrameSession> = self
            .sessions
            .keys()
            .filter(|candidate| candidate.parent().as_ref() == Some(session))
            .cloned()
            .collect();
        children.sort();
        children
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}
