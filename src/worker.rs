//! Single-writer command queue serializing all outbound traffic for one
//! `FileManager` onto its own thread.
//!
//! Every command that needs to reach the peer — acks, published files,
//! open/close requests, data updates — is pushed onto a bounded ring buffer
//! and drained by a dedicated worker thread that owns the `Transport`. This
//! keeps transport calls off whichever thread is producing the data
//! (parser, routing fabric, application code) and gives a single place to
//! enforce backpressure: a full queue returns `ApxError::BufferFull`
//! immediately rather than blocking the caller.

use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam::channel::{self, Sender, TrySendError};

use crate::connection::Transport;
use crate::error::{ApxError, Result};
use crate::file::FileInfo;
use crate::rmf::{encode_numheader, Command};

const JOIN_TIMEOUT: Duration = Duration::from_secs(5);

/// One unit of outbound work for a `FileManager`'s worker thread.
#[derive(Debug, Clone)]
pub enum WorkerCommand {
    Exit,
    SendAck,
    SendNack,
    PublishLocalFile(FileInfo),
    RevokeLocalFile { address: u32 },
    OpenRemoteFile { address: u32 },
    CloseRemoteFile { address: u32 },
    /// Full contents of a just-opened file, sent once as a single write.
    SendLocalConstData { address: u32, data: Vec<u8> },
    /// An incremental update to an already-open file; `more_bit` is set by
    /// the caller when this is one fragment of a larger logical write.
    SendLocalData { address: u32, more_bit: bool, data: Vec<u8> },
    SendHeaderAccepted,
}

/// Owns the background thread that drains `WorkerCommand`s onto a
/// `Transport`.
pub struct Worker {
    sender: Sender<WorkerCommand>,
    handle: Option<JoinHandle<()>>,
}

impl Worker {
    pub fn spawn(transport: Arc<dyn Transport>, capacity: usize) -> Result<Self> {
        let (sender, receiver) = channel::bounded(capacity);
        let handle = std::thread::Builder::new()
            .name("apx-file-manager-worker".into())
            .spawn(move || run(transport, receiver))
            .map_err(|_| ApxError::ThreadCreate)?;
        Ok(Self { sender, handle: Some(handle) })
    }

    /// Enqueue a command. Never blocks: a full queue is backpressure,
    /// reported as `ApxError::BufferFull` so callers can retry or drop.
    pub fn push(&self, cmd: WorkerCommand) -> Result<()> {
        self.sender.try_send(cmd).map_err(|e| match e {
            TrySendError::Full(_) => ApxError::BufferFull,
            TrySendError::Disconnected(_) => ApxError::ThreadJoin,
        })
    }

    /// Ask the worker thread to exit and wait for it, up to 5 seconds.
    pub fn stop(&mut self) -> Result<()> {
        let Some(handle) = self.handle.take() else {
            return Ok(());
        };
        let _ = self.sender.send(WorkerCommand::Exit);
        let (done_tx, done_rx) = channel::bounded::<()>(1);
        let waiter = std::thread::spawn(move || {
            let _ = handle.join();
            let _ = done_tx.send(());
        });
        match done_rx.recv_timeout(JOIN_TIMEOUT) {
            Ok(()) => {
                let _ = waiter.join();
                Ok(())
            }
            Err(_) => Err(ApxError::ThreadJoinTimeout),
        }
    }
}

impl Drop for Worker {
    fn drop(&mut self) {
        let _ = self.stop();
    }
}

fn run(transport: Arc<dyn Transport>, receiver: channel::Receiver<WorkerCommand>) {
    while let Ok(cmd) = receiver.recv() {
        match cmd {
            WorkerCommand::Exit => break,
            WorkerCommand::SendAck => send_command(&transport, Command::Ack),
            WorkerCommand::SendNack => send_command(&transport, Command::Nack),
            WorkerCommand::PublishLocalFile(info) => send_command(&transport, Command::PublishFile(info)),
            WorkerCommand::RevokeLocalFile { address } => send_command(&transport, Command::RevokeFile { address }),
            WorkerCommand::OpenRemoteFile { address } => send_command(&transport, Command::OpenFile { address }),
            WorkerCommand::CloseRemoteFile { address } => send_command(&transport, Command::CloseFile { address }),
            WorkerCommand::SendLocalConstData { address, data } => {
                let _ = transport.transmit_data_message(address, false, &data);
            }
            WorkerCommand::SendLocalData { address, more_bit, data } => {
                let _ = transport.transmit_data_message(address, more_bit, &data);
            }
            WorkerCommand::SendHeaderAccepted => {
                let greeting = b"RMFP/1.0\n\n";
                let _ = transport.transmit_direct_message(greeting);
            }
        }
    }
}

fn send_command(transport: &Arc<dyn Transport>, cmd: Command) {
    let Ok(payload) = cmd.encode() else { return };
    let Ok(header) = encode_numheader(payload.len() as u32) else { return };
    let mut message = header;
    message.extend_from_slice(&payload);
    let _ = transport.transmit_direct_message(&message);
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<Vec<u8>>>,
    }

    impl Transport for RecordingTransport {
        fn max_buffer_size(&self) -> usize {
            4096
        }
        fn current_bytes_available(&self) -> usize {
            4096
        }
        fn transmit_begin(&self) -> Result<()> {
            Ok(())
        }
        fn transmit_end(&self) -> Result<()> {
            Ok(())
        }
        fn transmit_data_message(&self, _address: u32, _more_bit: bool, data: &[u8]) -> Result<()> {
            self.sent.lock().push(data.to_vec());
            Ok(())
        }
        fn transmit_direct_message(&self, data: &[u8]) -> Result<()> {
            self.sent.lock().push(data.to_vec());
            Ok(())
        }
    }

    #[test]
    fn ack_is_delivered_to_transport() {
        let transport = Arc::new(RecordingTransport::default());
        let mut worker = Worker::spawn(transport.clone(), 16).unwrap();
        worker.push(WorkerCommand::SendAck).unwrap();
        worker.stop().unwrap();
        assert_eq!(transport.sent.lock().len(), 1);
    }

    #[test]
    fn full_queue_reports_buffer_full_without_blocking() {
        let transport = Arc::new(RecordingTransport::default());
        // Capacity 1 worker thread not started to force the queue to fill.
        let (sender, _receiver) = channel::bounded::<WorkerCommand>(1);
        sender.try_send(WorkerCommand::SendAck).unwrap();
        let err = sender.try_send(WorkerCommand::SendAck).unwrap_err();
        assert!(matches!(err, TrySendError::Full(_)));
        drop(transport);
    }

    #[test]
    fn stop_is_idempotent() {
        let transport = Arc::new(RecordingTransport::default());
        let mut worker = Worker::spawn(transport, 16).unwrap();
        worker.stop().unwrap();
        worker.stop().unwrap();
    }
}
