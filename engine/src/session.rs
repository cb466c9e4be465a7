//! A passcode-gated session around the engine.

use crate::config::Config;
use crate::gate::PasscodeGate;
use crate::local::{FileBackend, LocalStore, StorageBackend};
use crate::reconcile::{Engine, SyncReport};
use crate::remote::{HttpRemote, RemoteCollections, RemoteResult};
use crate::error::Result;
use std::future::Future;

/// Result of an unlock attempt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Unlock {
    /// Wrong code; try again.
    Rejected,
    /// Unlocked, local-only.
    LocalOnly,
    /// Unlocked and attached to the remote.
    Attached(SyncReport),
}

/// Nothing but the gate is reachable until the session is unlocked.
pub struct Session<B> {
    gate: PasscodeGate,
    engine: Engine<B>,
    unlocked: bool,
}

impl<B: StorageBackend> Session<B> {
    pub fn new(gate: PasscodeGate, engine: Engine<B>) -> Self {
        Self {
            gate,
            engine,
            unlocked: false,
        }
    }

    pub fn is_unlocked(&self) -> bool {
        self.unlocked
    }

    /// Check the passcode without touching the remote.
    pub fn unlock(&mut self, input: &str) -> bool {
        if !self.unlocked {
            self.unlocked = self.gate.check(input);
        }
        self.unlocked
    }

    /// Check the passcode and, on the first success, initialize the remote.
    ///
    /// `init` is only awaited when this attempt is the one that unlocks.
    pub async fn unlock_and_connect<F, R>(&mut self, input: &str, init: F) -> Unlock
    where
        F: Future<Output = RemoteResult<R>>,
        R: RemoteCollections + 'static,
    {
        if self.unlocked {
            return Unlock::LocalOnly;
        }
        if !self.unlock(input) {
            return Unlock::Rejected;
        }
        match self.engine.connect(init).await {
            Some(report) => Unlock::Attached(report),
            None => Unlock::LocalOnly,
        }
    }

    pub fn engine(&self) -> Option<&Engine<B>> {
        self.unlocked.then_some(&self.engine)
    }

    pub fn engine_mut(&mut self) -> Option<&mut Engine<B>> {
        if self.unlocked {
            Some(&mut self.engine)
        } else {
            None
        }
    }
}

/// Session over the file-backed Local Store, optionally mirrored to
/// `tally-server`.
pub struct ConfiguredSession {
    session: Session<FileBackend>,
    remote_url: Option<String>,
}

impl ConfiguredSession {
    /// Open the Local Store under `config.data_dir`.
    pub fn open(config: Config) -> Result<Self> {
        let backend = FileBackend::open(&config.data_dir)?;
        let engine = Engine::open(LocalStore::new(backend));
        Ok(Self {
            session: Session::new(PasscodeGate::new(config.passcode), engine),
            remote_url: config.remote_url,
        })
    }

    /// Unlock, connecting to the configured remote if there is one.
    pub async fn unlock(&mut self, input: &str) -> Unlock {
        match self.remote_url.clone() {
            Some(url) => {
                self.session
                    .unlock_and_connect(input, HttpRemote::connect(url))
                    .await
            }
            None if self.session.unlock(input) => Unlock::LocalOnly,
            None => Unlock::Rejected,
        }
    }

    pub fn session(&self) -> &Session<FileBackend> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session<FileBackend> {
        &mut self.session
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::local::MemoryBackend;
    use crate::reconcile::SyncMode;
    use crate::remote::{MemoryRemote, RemoteError};

    fn session() -> Session<MemoryBackend> {
        Session::new(
            PasscodeGate::new("1234".parse().unwrap()),
            Engine::open(LocalStore::new(MemoryBackend::new())),
        )
    }

    #[test]
    fn engine_hidden_until_unlocked() {
        let mut session = session();
        assert!(session.engine().is_none());
        assert!(!session.unlock("9999"));
        assert!(session.engine_mut().is_none());
        assert!(session.unlock("1234"));
        assert!(session.engine().is_some());
    }

    #[tokio::test]
    async fn wrong_code_does_not_init_remote() {
        let mut session = session();
        let remote = MemoryRemote::new();
        let handle = remote.clone();
        let outcome = session
            .unlock_and_connect("0000", async move { Ok(remote) })
            .await;
        assert_eq!(outcome, Unlock::Rejected);
        assert!(handle.calls().is_empty());
    }

    #[tokio::test]
    async fn unlock_attaches_once() {
        let mut session = session();
        let remote = MemoryRemote::new();
        let outcome = session
            .unlock_and_connect("1234", async move { Ok(remote) })
            .await;
        assert!(matches!(outcome, Unlock::Attached(_)));
        assert_eq!(
            session.engine().map(Engine::mode),
            Some(SyncMode::RemoteAttached)
        );

        let again = session
            .unlock_and_connect("1234", async { Ok(MemoryRemote::new()) })
            .await;
        assert_eq!(again, Unlock::LocalOnly);
    }

    #[tokio::test]
    async fn failed_init_still_unlocks() {
        let mut session = session();
        let outcome = session
            .unlock_and_connect("1234", async {
                Err::<MemoryRemote, _>(RemoteError::Unavailable("offline".into()))
            })
            .await;
        assert_eq!(outcome, Unlock::LocalOnly);
        assert!(session.is_unlocked());
        assert!(session.engine().unwrap().remote_failed());
    }

    #[tokio::test]
    async fn configured_session_without_remote() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::from_lookup(|key| match key {
            "TALLY_PASSCODE" => Some("4321".into()),
            "TALLY_DATA_DIR" => Some(dir.path().display().to_string()),
            _ => None,
        })
        .unwrap();

        let mut configured = ConfiguredSession::open(config).unwrap();
        assert_eq!(configured.unlock("1111").await, Unlock::Rejected);
        assert_eq!(configured.unlock("4321").await, Unlock::LocalOnly);
        assert!(configured.session().is_unlocked());
    }
}
