//! Bulk-downlink session state machine (§4.8, §3): paced transmission of a
//! file region as `DownlinkFirst`/`DownlinkNext`/`DownlinkLast` packets.

use super::Downlink;
use crate::errors::OcsError;
use crate::hw::FileSystem;
use crate::logging::{self, Severity, Subsystem};
use obc_wire::packet::{self, PacketType, MAX_APP_PAYLOAD};
use parking_lot::Mutex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio::time::Duration;

pub const MAX_SESSION_BYTES: u64 = 1024 * 1024;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    Downlinking,
    Paused,
}

#[derive(Clone)]
pub struct BulkSession {
    pub path: PathBuf,
    pub absolute_start_offset: u64,
    pub next_read_offset: u64,
    pub total_bytes: u64,
    pub bytes_sent: u64,
    pub next_seq_num: u32,
    pub total_seq_num: u32,
    pub state: SessionState,
}

impl BulkSession {
    fn idle() -> Self {
        Self {
            path: PathBuf::new(),
            absolute_start_offset: 0,
            next_read_offset: 0,
            total_bytes: 0,
            bytes_sent: 0,
            next_seq_num: 0,
            total_seq_num: 0,
            state: SessionState::Idle,
        }
    }
}

pub struct BulkDownlinkTask {
    session: Mutex<BulkSession>,
    fs: Arc<dyn FileSystem>,
    downlink: Downlink,
    packet_delay_ms: u64,
    payload_capacity: usize,
}

impl BulkDownlinkTask {
    pub fn new(fs: Arc<dyn FileSystem>, downlink: Downlink, packet_delay_ms: u64, payload_capacity: usize) -> Self {
        Self {
            session: Mutex::new(BulkSession::idle()),
            fs,
            downlink,
            packet_delay_ms,
            payload_capacity: payload_capacity.min(MAX_APP_PAYLOAD),
        }
    }

    pub fn snapshot(&self) -> BulkSession {
        self.session.lock().clone()
    }

    /// Starts a new session, implicitly canceling any previous one.
    pub async fn start(&self, path: PathBuf, start_offset: u64, max_bytes: u64) -> Result<(), OcsError> {
        let max_bytes = max_bytes.min(MAX_SESSION_BYTES);
        let file_len = self.fs.file_len(&path).await?;
        if start_offset > file_len {
            return Err(OcsError::FileSystem("start_offset beyond end of file".into()));
        }
        let remaining = file_len - start_offset;
        let total_bytes = max_bytes.min(remaining);
        let total_seq_num = total_bytes.div_ceil(self.payload_capacity as u64) as u32;

        let mut session = self.session.lock();
        *session = BulkSession {
            path,
            absolute_start_offset: start_offset,
            next_read_offset: start_offset,
            total_bytes,
            bytes_sent: 0,
            next_seq_num: 0,
            total_seq_num,
            state: SessionState::Downlinking,
        };
        Ok(())
    }

    pub fn pause(&self) -> Result<(), OcsError> {
        let mut session = self.session.lock();
        if session.state != SessionState::Downlinking {
            return Err(OcsError::Other("pause() only valid while Downlinking".into()));
        }
        session.state = SessionState::Paused;
        Ok(())
    }

    pub fn resume(&self) -> Result<(), OcsError> {
        let mut session = self.session.lock();
        if session.state != SessionState::Paused {
            return Err(OcsError::Other("resume() only valid while Paused".into()));
        }
        session.state = SessionState::Downlinking;
        Ok(())
    }

    /// One iteration: reads the next chunk, downlinks it, and advances the
    /// session. Returns `true` if a packet was sent.
    pub async fn step(&self) -> bool {
        let (path, offset, seq_num, total_seq_num, remaining, read_len) = {
            let session = self.session.lock();
            if session.state != SessionState::Downlinking {
                return false;
            }
            let remaining = session.total_bytes - session.bytes_sent;
            let read_len = remaining.min(self.payload_capacity as u64) as usize;
            (
                session.path.clone(),
                session.next_read_offset,
                session.next_seq_num,
                session.total_seq_num,
                remaining,
                read_len,
            )
        };

        if remaining == 0 {
            let mut session = self.session.lock();
            session.state = SessionState::Idle;
            return false;
        }

        let data = match self.fs.read_file(&path, offset, read_len).await {
            Ok(d) => d,
            Err(e) => {
                logging::global().log(
                    Subsystem::FileSystem,
                    Severity::Error,
                    logging::all_sinks_except(0),
                    format_args!("bulk downlink: read failed: {e}"),
                );
                let mut session = self.session.lock();
                session.state = SessionState::Idle;
                return false;
            }
        };

        let packet_type = if seq_num == 0 {
            PacketType::DownlinkFirst
        } else if (data.len() as u64) == remaining {
            PacketType::DownlinkLast
        } else {
            PacketType::DownlinkNext
        };

        let payload = packet::build_bulk_payload(seq_num, total_seq_num, offset as u32, &data);
        self.downlink.send_packet(packet_type, &payload);

        {
            let mut session = self.session.lock();
            session.next_read_offset += data.len() as u64;
            session.bytes_sent += data.len() as u64;
            session.next_seq_num = session.next_seq_num.saturating_add(1);
            if session.bytes_sent == session.total_bytes {
                session.state = SessionState::Idle;
            }
        }

        tokio::time::sleep(Duration::from_millis(self.packet_delay_ms)).await;
        true
    }

    /// Drives `step()` forever; intended to be the body of a long-lived task.
    pub async fn run(self: Arc<Self>) {
        loop {
            if !self.step().await {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::hw::TokioFileSystem;

    fn test_downlink() -> Downlink {
        let (tx, mut rx) = tokio::sync::mpsc::unbounded_channel();
        tokio::spawn(async move { while rx.recv().await.is_some() {} });
        Downlink::new(None, tx)
    }

    #[tokio::test]
    async fn bulk_downlink_totality_across_packets() {
        let dir = std::env::temp_dir().join(format!("obc_bulk_test_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let fs: Arc<dyn FileSystem> = Arc::new(TokioFileSystem::new(dir.clone()));
        let data: Vec<u8> = (0..513u32).map(|i| (i % 256) as u8).collect();
        fs.write_file(std::path::Path::new("bulk.bin"), &data).await.unwrap();

        let task = BulkDownlinkTask::new(fs, test_downlink(), 0, 200);
        task.start(PathBuf::from("bulk.bin"), 0, 513).await.unwrap();
        assert_eq!(task.snapshot().total_seq_num, 3);

        let mut iterations = 0;
        while task.snapshot().state == SessionState::Downlinking && iterations < 10 {
            task.step().await;
            iterations += 1;
        }
        let snap = task.snapshot();
        assert_eq!(snap.state, SessionState::Idle);
        assert_eq!(snap.bytes_sent, 513);

        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    #[tokio::test]
    async fn pause_only_valid_while_downlinking() {
        let dir = std::env::temp_dir().join(format!("obc_bulk_pause_{}", std::process::id()));
        tokio::fs::create_dir_all(&dir).await.unwrap();
        let fs: Arc<dyn FileSystem> = Arc::new(TokioFileSystem::new(dir.clone()));
        let task = BulkDownlinkTask::new(fs, test_downlink(), 0, 200);
        assert!(task.pause().is_err());
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }
}
