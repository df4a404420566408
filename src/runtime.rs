//! Capabilities the routing core consumes from the network runtime.
//!
//! The core never touches sockets. It issues requests through [`Runtime`]
//! while handling a chunk, and the runtime carries them out afterwards.
//! [`CommandQueue`] records those requests in order so an async driver (or a
//! test) can execute or inspect them.

use bytes::Bytes;

use crate::backend::{BackendId, BackendOptions};

/// Requests the core can make of the runtime for one connection.
pub trait Runtime {
    /// Open (or attach) the backend connection. `name` is `None` for an
    /// anonymous, inline backend.
    fn setup_backend(&mut self, name: Option<&BackendId>, options: &BackendOptions);

    /// Forward a buffer to the backend armed by the preceding `setup_backend`.
    fn relay_forward(&mut self, bytes: Bytes);

    /// Terminate the client connection and anything attached to it.
    fn close_connection(&mut self);
}

/// A request recorded by [`CommandQueue`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    SetupBackend {
        name: Option<BackendId>,
        options: BackendOptions,
    },
    Forward(Bytes),
    Close,
}

/// [`Runtime`] that records commands for later execution.
#[derive(Debug, Default)]
pub struct CommandQueue {
    commands: Vec<Command>,
}

impl CommandQueue {
    pub fn new() -> Self {
        Self::default()
    }

    /// Commands recorded so far, oldest first.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take every recorded command, leaving the queue empty.
    pub fn drain(&mut self) -> std::vec::Drain<'_, Command> {
        self.commands.drain(..)
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Whether a close has been requested.
    pub fn close_requested(&self) -> bool {
        self.commands.iter().any(|c| matches!(c, Command::Close))
    }

    /// Bytes forwarded to the backend, concatenated.
    pub fn forwarded(&self) -> Vec<u8> {
        self.commands
            .iter()
            .filter_map(|c| match c {
                Command::Forward(bytes) => Some(&bytes[..]),
                _ => None,
            })
            .flatten()
            .copied()
            .collect()
    }
}

impl Runtime for CommandQueue {
    fn setup_backend(&mut self, name: Option<&BackendId>, options: &BackendOptions) {
        self.commands.push(Command::SetupBackend {
            name: name.cloned(),
            options: options.clone(),
        });
    }

    fn relay_forward(&mut self, bytes: Bytes) {
        self.commands.push(Command::Forward(bytes));
    }

    fn close_connection(&mut self) {
        self.commands.push(Command::Close);
    }
}
