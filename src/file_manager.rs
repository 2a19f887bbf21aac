//! Per-connection file manager: owns both sides' `FileMap`s, the fragment
//! `Receiver`, and the outbound `Worker`, and dispatches every inbound byte
//! range to either the command handler or a file write notification.
//!
//! Lifecycle: `Created` → `Idle` → (client: publish local files then wait
//! for `ACK`; server: wait for the client's `FILE_INFO` then `ACK` it) →
//! `Connected` → `Closed`. Both roles converge on `Connected` once their
//! own outbound files are acknowledged and at least the definition file has
//! been received from the other side building a node.

use std::sync::Arc;

use crate::connection::{ConnectionEvents, Transport};
use crate::error::{ApxError, Result};
use crate::file::file::FileOwner;
use crate::file::{File, FileInfo, FileMap};
use crate::receiver::Receiver;
use crate::rmf::{decode_numheader, Command, CMD_AREA_START_ADDRESS};
use crate::types::{ApxFileType, Mode};
use crate::worker::{Worker, WorkerCommand};

/// Connection-level lifecycle state, tracked independently of the
/// per-file-area `DataState` carried by each published file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Created,
    Idle,
    WaitingAck,
    Connected,
    Closed,
}

/// Drives one connection's file traffic: local/remote file maps, fragment
/// reassembly, and the outbound worker thread.
pub struct FileManager {
    mode: Mode,
    state: ConnectionState,
    local_files: FileMap,
    remote_files: FileMap,
    receiver: Receiver,
    worker: Worker,
    events: Arc<dyn ConnectionEvents>,
}

impl FileManager {
    pub fn new(
        mode: Mode,
        transport: Arc<dyn Transport>,
        events: Arc<dyn ConnectionEvents>,
        command_queue_capacity: usize,
    ) -> Result<Self> {
        Ok(Self {
            mode,
            state: ConnectionState::Created,
            local_files: FileMap::new(),
            remote_files: FileMap::new(),
            receiver: Receiver::new(),
            worker: Worker::spawn(transport, command_queue_capacity)?,
            events,
        })
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    pub fn start(&mut self) -> Result<()> {
        self.state = ConnectionState::Idle;
        Ok(())
    }

    /// Enqueue the RMF greeting line (`RMFP/1.0\n\n`), sent once by the
    /// client when a `Connection` starts and once more by the server in
    /// reply once it has validated the client's greeting.
    pub fn send_greeting(&mut self) -> Result<()> {
        self.worker.push(WorkerCommand::SendHeaderAccepted)
    }

    /// Publish a locally-owned file: assign it an address if it doesn't
    /// have one yet, record it, and enqueue the announcement.
    pub fn publish_local_file(&mut self, file_type: ApxFileType, name: impl Into<String>, size: u32) -> Result<u32> {
        let name = name.into();
        let address = self.local_files.auto_assign_address(file_type, size)?;
        let info = FileInfo::new(address, size, name, crate::types::RmfFileType::Fixed);
        self.local_files.insert(File::new(info.clone(), FileOwner::Local))?;
        self.worker.push(WorkerCommand::PublishLocalFile(info))?;
        if self.state == ConnectionState::Idle {
            self.state = ConnectionState::WaitingAck;
        }
        Ok(address)
    }

    pub fn revoke_local_file(&mut self, address: u32) -> Result<()> {
        self.local_files.remove(address).ok_or(ApxError::FileNotFound)?;
        self.worker.push(WorkerCommand::RevokeLocalFile { address })
    }

    pub fn open_remote_file(&mut self, address: u32) -> Result<()> {
        let file = self.remote_files.get_mut(address).ok_or(ApxError::FileNotFound)?;
        file.open();
        self.worker.push(WorkerCommand::OpenRemoteFile { address })
    }

    pub fn close_remote_file(&mut self, address: u32) -> Result<()> {
        if let Some(file) = self.remote_files.get_mut(address) {
            file.close();
        }
        self.worker.push(WorkerCommand::CloseRemoteFile { address })
    }

    pub fn write_local_data(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let file = self.local_files.get(address).ok_or(ApxError::FileNotFound)?;
        if !file.is_open() && self.mode == Mode::Server {
            return Err(ApxError::FileNotOpen);
        }
        self.worker.push(WorkerCommand::SendLocalData { address, more_bit: false, data: data.to_vec() })
    }

    /// Feed one inbound wire fragment (already address-decoded by the
    /// connection's read loop) through reassembly and dispatch.
    pub fn on_inbound_fragment(&mut self, address: u32, more_bit: bool, data: &[u8]) -> Result<()> {
        let Some((start_address, bytes)) = self.receiver.on_fragment(address, more_bit, data)? else {
            return Ok(());
        };
        if start_address >= CMD_AREA_START_ADDRESS {
            self.dispatch_command(&bytes)
        } else {
            self.dispatch_data_write(start_address, &bytes)
        }
    }

    fn dispatch_command(&mut self, bytes: &[u8]) -> Result<()> {
        let (len, consumed) = decode_numheader(bytes)?;
        let payload = bytes.get(consumed..consumed + len as usize).ok_or(ApxError::InvalidMsg)?;
        let cmd = Command::decode(payload)?;
        match cmd {
            Command::Ack => {
                self.state = ConnectionState::Connected;
            }
            Command::Nack => {
                self.state = ConnectionState::Closed;
            }
            Command::PublishFile(info) => {
                self.events.remote_file_published_notification(&info);
                let address = info.address;
                let is_definition = info.name.ends_with(".apx");
                self.remote_files.insert(File::new(info, FileOwner::Remote))?;
                self.worker.push(WorkerCommand::SendAck)?;
                // spec.md §4.7: on the server side, a published definition file is
                // opened immediately so its content starts streaming in (spec.md
                // §8 S3's `OPEN_FILE(0x04000000)` right after `PUBLISH_FILE`).
                if self.mode == Mode::Server && is_definition {
                    if let Some(file) = self.remote_files.get_mut(address) {
                        file.open();
                    }
                    self.worker.push(WorkerCommand::OpenRemoteFile { address })?;
                }
            }
            Command::RevokeFile { address } => {
                self.remote_files.remove(address);
                self.events.remote_file_revoked_notification(address);
            }
            Command::OpenFile { address } => {
                if let Some(file) = self.local_files.get_mut(address) {
                    file.open();
                    // spec.md §4.7's open_notify: for provide-port-data files this
                    // pushes the current packed bytes back to the peer that just
                    // opened us.
                    if let Some(data) = self.events.local_file_open_notify(address) {
                        self.worker.push(WorkerCommand::SendLocalConstData { address, data })?;
                    }
                }
            }
            Command::CloseFile { address } => {
                if let Some(file) = self.local_files.get_mut(address) {
                    file.close();
                }
            }
        }
        Ok(())
    }

    fn dispatch_data_write(&mut self, address: u32, data: &[u8]) -> Result<()> {
        let file = self.remote_files.find_containing(address).ok_or(ApxError::FileNotFound)?;
        if !file.is_open() {
            return Err(ApxError::FileNotOpen);
        }
        let offset = address - file.address();
        self.events.remote_file_write_notification(file.address(), offset, data);
        Ok(())
    }

    pub fn local_files(&self) -> &FileMap {
        &self.local_files
    }

    pub fn remote_files(&self) -> &FileMap {
        &self.remote_files
    }

    pub fn close(&mut self) -> Result<()> {
        self.state = ConnectionState::Closed;
        self.worker.stop()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parking_lot::Mutex;

    struct NullTransport;
    impl Transport for NullTransport {
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
        fn transmit_data_message(&self, _address: u32, _more_bit: bool, _data: &[u8]) -> Result<()> {
            Ok(())
        }
        fn transmit_direct_message(&self, _data: &[u8]) -> Result<()> {
            Ok(())
        }
    }

    #[derive(Default)]
    struct RecordingEvents {
        published: Mutex<Vec<FileInfo>>,
        writes: Mutex<Vec<(u32, u32, Vec<u8>)>>,
    }

    impl ConnectionEvents for RecordingEvents {
        fn remote_file_published_notification(&self, info: &FileInfo) {
            self.published.lock().push(info.clone());
        }
        fn remote_file_revoked_notification(&self, _address: u32) {}
        fn remote_file_write_notification(&self, address: u32, offset: u32, data: &[u8]) {
            self.writes.lock().push((address, offset, data.to_vec()));
        }
        fn node_created_notification(&self, _node_name: &str) {}
        fn port_connector_change_notify(&self, _node_name: &str, _port_name: &str, _delta: i32) {}
    }

    fn manager() -> (FileManager, Arc<RecordingEvents>) {
        let events = Arc::new(RecordingEvents::default());
        let fm = FileManager::new(Mode::Client, Arc::new(NullTransport), events.clone(), 16).unwrap();
        (fm, events)
    }

    #[test]
    fn publish_local_file_assigns_and_records_address() {
        let (mut fm, _events) = manager();
        fm.start().unwrap();
        let addr = fm.publish_local_file(ApxFileType::ProvidePortData, "Node.out", 32).unwrap();
        assert_eq!(addr, 0x0);
        assert!(fm.local_files().get(addr).is_some());
        assert_eq!(fm.state(), ConnectionState::WaitingAck);
    }

    #[test]
    fn inbound_ack_command_transitions_to_connected() {
        let (mut fm, _events) = manager();
        fm.start().unwrap();
        let payload = Command::Ack.encode().unwrap();
        let mut msg = crate::rmf::encode_numheader(payload.len() as u32).unwrap();
        msg.extend_from_slice(&payload);
        fm.on_inbound_fragment(CMD_AREA_START_ADDRESS, false, &msg).unwrap();
        assert_eq!(fm.state(), ConnectionState::Connected);
    }

    #[test]
    fn inbound_publish_file_command_notifies_and_acks() {
        let (mut fm, events) = manager();
        fm.start().unwrap();
        let info = FileInfo::new(0x2000, 16, "Peer.out", crate::types::RmfFileType::Fixed);
        let payload = Command::PublishFile(info.clone()).encode().unwrap();
        let mut msg = crate::rmf::encode_numheader(payload.len() as u32).unwrap();
        msg.extend_from_slice(&payload);
        fm.on_inbound_fragment(CMD_AREA_START_ADDRESS, false, &msg).unwrap();
        assert_eq!(events.published.lock().len(), 1);
        assert!(fm.remote_files().get(0x2000).is_some());
    }

    /// spec.md §8 S3: a server receiving `PUBLISH_FILE` for a `.apx` name
    /// opens that remote file itself, so its content starts streaming in
    /// without any extra application-level call.
    #[test]
    fn server_auto_opens_remote_definition_file_on_publish() {
        let events = Arc::new(RecordingEvents::default());
        let mut fm = FileManager::new(Mode::Server, Arc::new(NullTransport), events, 16).unwrap();
        fm.start().unwrap();
        let info = FileInfo::new(0x0400_0000, 40, "Node1.apx", crate::types::RmfFileType::Fixed);
        let payload = Command::PublishFile(info).encode().unwrap();
        let mut msg = crate::rmf::encode_numheader(payload.len() as u32).unwrap();
        msg.extend_from_slice(&payload);
        fm.on_inbound_fragment(CMD_AREA_START_ADDRESS, false, &msg).unwrap();
        assert!(fm.remote_files().get(0x0400_0000).unwrap().is_open());
    }

    #[test]
    fn data_write_is_routed_to_containing_remote_file() {
        let (mut fm, events) = manager();
        fm.start().unwrap();
        fm.remote_files.insert(File::new(
            FileInfo::new(0x3000, 64, "Peer.out", crate::types::RmfFileType::Fixed),
            FileOwner::Remote,
        )).unwrap();
        fm.remote_files.get_mut(0x3000).unwrap().open();
        fm.on_inbound_fragment(0x3010, false, &[9, 9]).unwrap();
        let writes = events.writes.lock();
        assert_eq!(writes.len(), 1);
        assert_eq!(writes[0], (0x3000, 0x10, vec![9, 9]));
    }

    /// spec.md §4.7 requires writes to unopened files to be rejected rather
    /// than silently forwarded.
    #[test]
    fn write_to_unopened_remote_file_is_rejected() {
        let (mut fm, _events) = manager();
        fm.start().unwrap();
        fm.remote_files.insert(File::new(
            FileInfo::new(0x3000, 64, "Peer.out", crate::types::RmfFileType::Fixed),
            FileOwner::Remote,
        )).unwrap();
        assert_eq!(fm.on_inbound_fragment(0x3010, false, &[9, 9]), Err(ApxError::FileNotOpen));
    }

    #[test]
    fn write_to_unknown_address_is_file_not_found() {
        let (mut fm, _events) = manager();
        fm.start().unwrap();
        assert_eq!(fm.on_inbound_fragment(0x9000, false, &[1]), Err(ApxError::FileNotFound));
    }

    /// spec.md §4.7's `open_notify`: opening a local provide-port-data file
    /// pushes its current bytes straight back to the peer, exercising the
    /// `WorkerCommand::SendLocalConstData` path end to end.
    #[test]
    fn opening_a_local_file_pushes_its_current_data() {
        #[derive(Default)]
        struct RecordingTransport {
            sent: Mutex<Vec<(u32, Vec<u8>)>>,
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
            fn transmit_data_message(&self, address: u32, _more_bit: bool, data: &[u8]) -> Result<()> {
                self.sent.lock().push((address, data.to_vec()));
                Ok(())
            }
            fn transmit_direct_message(&self, _data: &[u8]) -> Result<()> {
                Ok(())
            }
        }

        struct PushOnOpenEvents;
        impl ConnectionEvents for PushOnOpenEvents {
            fn remote_file_published_notification(&self, _info: &FileInfo) {}
            fn remote_file_revoked_notification(&self, _address: u32) {}
            fn remote_file_write_notification(&self, _address: u32, _offset: u32, _data: &[u8]) {}
            fn node_created_notification(&self, _node_name: &str) {}
            fn port_connector_change_notify(&self, _node_name: &str, _port_name: &str, _delta: i32) {}
            fn local_file_open_notify(&self, _address: u32) -> Option<Vec<u8>> {
                Some(vec![0xAA, 0xBB])
            }
        }

        let transport = Arc::new(RecordingTransport::default());
        let mut fm = FileManager::new(Mode::Server, transport.clone(), Arc::new(PushOnOpenEvents), 16).unwrap();
        fm.start().unwrap();
        let addr = fm.publish_local_file(ApxFileType::ProvidePortData, "Node.out", 2).unwrap();

        let payload = Command::OpenFile { address: addr }.encode().unwrap();
        let mut msg = crate::rmf::encode_numheader(payload.len() as u32).unwrap();
        msg.extend_from_slice(&payload);
        fm.on_inbound_fragment(CMD_AREA_START_ADDRESS, false, &msg).unwrap();
        fm.close().unwrap();

        let sent = transport.sent.lock();
        assert!(sent.iter().any(|(a, data)| *a == addr && data == &vec![0xAA, 0xBB]));
    }
}
