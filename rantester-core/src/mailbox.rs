//! Per-UE command mailboxes.
//!
//! A mailbox is FIFO and has exactly one reader, the actor it was opened
//! for. The supervisor keeps the sending half in a [`MailboxTable`]; an
//! index is only ever given a fresh mailbox after the previous one has been
//! closed by its actor.

use std::collections::BTreeMap;

use thiserror::Error;
use tokio::sync::mpsc;
use tracing::{debug, trace};

/// Command delivered to exactly one UE.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    Register,
    EstablishSession,
    Terminate,
}

#[derive(Debug, Error, Clone, Copy, PartialEq, Eq)]
#[error("mailbox of UE {ue_id} (generation {generation}) is closed")]
pub struct MailboxClosed {
    pub ue_id: u32,
    pub generation: u64,
}

/// Opens a mailbox for one incarnation of `ue_id`.
pub fn mailbox(ue_id: u32, generation: u64) -> (MailboxHandle, Mailbox) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        MailboxHandle {
            ue_id,
            generation,
            tx,
        },
        Mailbox {
            ue_id,
            generation,
            rx,
        },
    )
}

/// Sending half. Cheap to clone; the actor keeps one to enqueue its own commands.
#[derive(Debug, Clone)]
pub struct MailboxHandle {
    ue_id: u32,
    generation: u64,
    tx: mpsc::UnboundedSender<Command>,
}

impl MailboxHandle {
    pub fn ue_id(&self) -> u32 {
        self.ue_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn send(&self, command: Command) -> Result<(), MailboxClosed> {
        trace!(ue_id = self.ue_id, ?command, "enqueue");
        self.tx.send(command).map_err(|_| MailboxClosed {
            ue_id: self.ue_id,
            generation: self.generation,
        })
    }

    /// True while the owning actor still holds the receiving half open.
    pub fn is_live(&self) -> bool {
        !self.tx.is_closed()
    }

    /// Resolves once the owning actor has closed or dropped its mailbox.
    pub async fn closed(&self) {
        self.tx.closed().await
    }

    /// Sends `Terminate` and waits until the actor has accepted it and shut down.
    ///
    /// Returns `false` when the actor was already gone.
    pub async fn terminate(&self) -> bool {
        let delivered = self.send(Command::Terminate).is_ok();
        self.closed().await;
        delivered
    }
}

/// Receiving half, owned by the actor.
#[derive(Debug)]
pub struct Mailbox {
    ue_id: u32,
    generation: u64,
    rx: mpsc::UnboundedReceiver<Command>,
}

impl Mailbox {
    pub fn ue_id(&self) -> u32 {
        self.ue_id
    }

    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Next command in send order. Cancel safe.
    pub async fn recv(&mut self) -> Option<Command> {
        self.rx.recv().await
    }

    /// Stops accepting commands; pending senders observe the mailbox as closed.
    pub fn close(&mut self) {
        self.rx.close();
    }
}

/// UE index → mailbox of its current incarnation.
///
/// Mutated only by the supervisor task.
#[derive(Debug, Default)]
pub struct MailboxTable {
    slots: BTreeMap<u32, MailboxHandle>,
    next_generation: u64,
}

impl MailboxTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, ue_id: u32) -> Option<&MailboxHandle> {
        self.slots.get(&ue_id)
    }

    /// Mailbox of `ue_id` if its actor is still running.
    pub fn live(&self, ue_id: u32) -> Option<&MailboxHandle> {
        self.slots.get(&ue_id).filter(|handle| handle.is_live())
    }

    pub fn live_count(&self) -> usize {
        self.slots.values().filter(|handle| handle.is_live()).count()
    }

    /// Clones of every handle whose actor is still running.
    pub fn live_handles(&self) -> Vec<MailboxHandle> {
        self.slots
            .values()
            .filter(|handle| handle.is_live())
            .cloned()
            .collect()
    }

    /// Terminates the live incarnation of `ue_id` (if any) and opens a fresh mailbox.
    pub async fn reopen(&mut self, ue_id: u32) -> (MailboxHandle, Mailbox) {
        if let Some(previous) = self.live(ue_id) {
            debug!(
                ue_id,
                generation = previous.generation(),
                "terminating previous incarnation"
            );
            previous.terminate().await;
        }

        self.next_generation += 1;
        let (handle, mailbox) = mailbox(ue_id, self.next_generation);
        self.slots.insert(ue_id, handle.clone());
        (handle, mailbox)
    }

    /// Sends `Terminate` to every live mailbox, then waits for each to close.
    ///
    /// Returns how many actors accepted the command.
    pub async fn terminate_all(&mut self) -> usize {
        let live = self.live_handles();

        let mut accepted = 0;
        for handle in &live {
            if handle.send(Command::Terminate).is_ok() {
                accepted += 1;
            }
        }
        for handle in &live {
            handle.closed().await;
        }
        accepted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn delivers_in_send_order() {
        let (handle, mut mailbox) = mailbox(1, 1);
        handle.send(Command::Register).unwrap();
        handle.send(Command::EstablishSession).unwrap();
        handle.send(Command::Terminate).unwrap();

        assert_eq!(mailbox.recv().await, Some(Command::Register));
        assert_eq!(mailbox.recv().await, Some(Command::EstablishSession));
        assert_eq!(mailbox.recv().await, Some(Command::Terminate));
    }

    #[tokio::test]
    async fn closed_mailbox_rejects_commands() {
        let (handle, mut mailbox) = mailbox(7, 3);
        mailbox.close();
        assert!(!handle.is_live());
        assert_eq!(
            handle.send(Command::Register),
            Err(MailboxClosed {
                ue_id: 7,
                generation: 3
            })
        );
        assert!(!handle.terminate().await);
    }

    #[tokio::test]
    async fn reopen_waits_for_previous_incarnation() {
        let mut table = MailboxTable::new();
        let (_, mut first) = table.reopen(1).await;
        assert_eq!(table.live_count(), 1);

        let actor = tokio::spawn(async move {
            let command = first.recv().await;
            drop(first);
            command
        });

        let (second, _second_rx) = table.reopen(1).await;
        assert_eq!(actor.await.unwrap(), Some(Command::Terminate));
        assert_eq!(second.generation(), 2);
        assert_eq!(table.live(1).unwrap().generation(), 2);
        assert_eq!(table.live_count(), 1);
    }

    #[tokio::test]
    async fn terminate_all_reaches_every_live_actor() {
        let mut table = MailboxTable::new();
        let mut actors = Vec::new();
        for ue_id in 1..=3 {
            let (_, mut mailbox) = table.reopen(ue_id).await;
            actors.push(tokio::spawn(async move {
                while let Some(command) = mailbox.recv().await {
                    if command == Command::Terminate {
                        break;
                    }
                }
            }));
        }

        assert_eq!(table.terminate_all().await, 3);
        assert_eq!(table.live_count(), 0);
        for actor in actors {
            actor.await.unwrap();
        }
    }
}
