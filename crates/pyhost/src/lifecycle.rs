//! Running state of an interpreter context.

use parking_lot::RwLock;
use strum::{Display, IntoStaticStr};

use crate::error::{Error, Result};

/// Whether the embedded interpreter accepts boundary calls.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, IntoStaticStr)]
#[strum(serialize_all = "SCREAMING_SNAKE_CASE")]
pub enum LifecycleState {
    #[default]
    NotRunning,
    Running,
}

#[derive(Debug, Clone, Copy)]
struct Session {
    state: LifecycleState,
    /// Bumped on every transition into `Running`.
    generation: u64,
}

/// Lifecycle flag of one [`Interpreter`](crate::Interpreter) context.
///
/// Only `start` and `stop` write; everything else reads. The lock is never held
/// while Python code runs.
#[derive(Debug)]
pub(crate) struct LifecycleGuard {
    session: RwLock<Session>,
}

impl LifecycleGuard {
    pub fn new() -> Self {
        Self {
            session: RwLock::new(Session {
                state: LifecycleState::NotRunning,
                generation: 0,
            }),
        }
    }

    pub fn state(&self) -> LifecycleState {
        self.session.read().state
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Transitions to `Running`, returning the new generation, or `None` if the
    /// guard was already running.
    pub fn start(&self) -> Option<u64> {
        let mut session = self.session.write();
        if session.state == LifecycleState::Running {
            return None;
        }
        session.state = LifecycleState::Running;
        session.generation += 1;
        Some(session.generation)
    }

    /// Transitions to `NotRunning`. Returns `false` if it was not running.
    pub fn stop(&self) -> bool {
        let mut session = self.session.write();
        let was_running = session.state == LifecycleState::Running;
        session.state = LifecycleState::NotRunning;
        was_running
    }

    /// True while running inside the session that handed out `generation`.
    pub fn is_current(&self, generation: u64) -> bool {
        let session = self.session.read();
        session.state == LifecycleState::Running && session.generation == generation
    }

    /// Fails with [`Error::NotRunning`] unless the interpreter is running.
    ///
    /// Hitting this is a defect in the calling code, so it is logged at error
    /// level before being returned.
    pub fn ensure_running(&self, operation: &'static str) -> Result<()> {
        self.running_generation(operation).map(|_| ())
    }

    /// Generation of the running session, read under one lock so the state and
    /// the generation agree.
    pub fn running_generation(&self, operation: &'static str) -> Result<u64> {
        let session = *self.session.read();
        if session.state == LifecycleState::Running {
            Ok(session.generation)
        } else {
            tracing::error!(operation, "boundary operation attempted while interpreter is not running");
            Err(Error::NotRunning { operation })
        }
    }
}
