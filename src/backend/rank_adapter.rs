use crossbeam_channel::Receiver;

use crate::backend::lease_adapter::normalize;
use crate::backend::{NodeId, RankBackend, RankToken, SessionEvent};
use crate::errors::{ElectionError, ErrorKind, Result};

/// Rank strategy side of the backend boundary.
#[derive(Debug)]
pub struct RankAdapter<B: RankBackend> {
    backend: B,
    election_path: String,
    token_prefix: String,
    node_id: NodeId,
}

impl<B: RankBackend> RankAdapter<B> {
    pub fn new(
        backend: B,
        election_path: String,
        token_prefix: String,
        node_id: NodeId,
    ) -> RankAdapter<B> {
        RankAdapter {
            backend,
            election_path,
            token_prefix,
            node_id,
        }
    }

    pub fn election_path(&self) -> &str {
        &self.election_path
    }

    /// Creates the election path unless it exists; a concurrent creation by
    /// another node counts as success.
    pub fn ensure_election_path(&self) -> Result<()> {
        match self.backend.create_path(&self.election_path) {
            Ok(()) => {
                info!("Node {} created election path {}", self.node_id, self.election_path);
                Ok(())
            }
            Err(err) if err.kind() == ErrorKind::AlreadyExists => Ok(()),
            Err(err) => Err(normalize(err, &[])),
        }
    }

    /// Registers a fresh ephemeral token carrying this node's identity.
    pub fn register(&self) -> Result<RankToken> {
        let payload = self.node_id.as_bytes();
        let created = match self.backend.create_ephemeral_sequential(
            &self.election_path,
            &self.token_prefix,
            payload,
        ) {
            Err(err) if err.kind() == ErrorKind::ResourceMissing => {
                self.ensure_election_path()?;
                self.backend.create_ephemeral_sequential(
                    &self.election_path,
                    &self.token_prefix,
                    payload,
                )
            }
            other => other,
        };

        let name = created.map_err(|err| normalize(err, &[ErrorKind::ResourceMissing]))?;
        Ok(RankToken::new(name))
    }

    /// Live tokens in election order; the first one is the leader.
    pub fn list_live_tokens(&self) -> Result<Vec<RankToken>> {
        let children = self
            .backend
            .children(&self.election_path)
            .map_err(|err| normalize(err, &[ErrorKind::ResourceMissing]))?;

        let mut tokens: Vec<RankToken> = children.into_iter().map(RankToken::new).collect();
        tokens.sort();

        Ok(tokens)
    }

    pub fn watch_disappearance(&self, token: &RankToken) -> Result<Receiver<()>> {
        self.backend
            .watch_deletion(&self.token_path(token))
            .map_err(|err| normalize(err, &[]))
    }

    /// Voluntary exit. Deleting an already removed token succeeds.
    pub fn unregister(&self, token: &RankToken) -> Result<()> {
        match self.backend.delete(&self.token_path(token)) {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == ErrorKind::NotFound => Ok(()),
            Err(err) => Err(normalize(err, &[])),
        }
    }

    pub fn read_token_owner(&self, token: &RankToken) -> Result<NodeId> {
        let payload = self
            .backend
            .read(&self.token_path(token))
            .map_err(|err| normalize(err, &[ErrorKind::NotFound]))?;

        String::from_utf8(payload).map_err(|err| {
            ElectionError::new(
                ErrorKind::InvalidData,
                format!("Token {} carries no node identity", token),
                err.to_string(),
            )
        })
    }

    pub fn session_events(&self) -> Receiver<SessionEvent> {
        self.backend.session_events()
    }

    fn token_path(&self, token: &RankToken) -> String {
        format!("{}/{}", self.election_path, token.name())
    }
}
