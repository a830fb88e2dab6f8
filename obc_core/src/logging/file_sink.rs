//! Lazy file-backed log sink (§4.4): the log file is opened on first write
//! after a period of inactivity, synced on a fixed interval, and closed again
//! after a longer idle interval so a quiet subsystem doesn't hold a file
//! handle open indefinitely.

use crate::logging::LogMessage;
use std::path::PathBuf;
use tokio::fs::OpenOptions;
use tokio::io::{AsyncWriteExt, BufWriter};
use tokio::sync::mpsc::UnboundedReceiver;
use tokio::time::{Duration, Instant};
use tracing::{debug, warn};

pub struct FileSinkConfig {
    pub data_dir: PathBuf,
    pub sync_interval: Duration,
    pub close_interval: Duration,
}

/// Runs until `rx` closes. Intended to be `tokio::spawn`ed once at boot.
pub async fn run(mut rx: UnboundedReceiver<LogMessage>, cfg: FileSinkConfig) {
    let mut file: Option<BufWriter<tokio::fs::File>> = None;
    let mut last_write = Instant::now();
    let mut last_sync = Instant::now();
    let mut tick = tokio::time::interval(Duration::from_millis(500));

    loop {
        tokio::select! {
            maybe_msg = rx.recv() => {
                let Some(msg) = maybe_msg else { break };
                if file.is_none() {
                    file = open_log_file(&cfg.data_dir).await;
                }
                if let Some(f) = file.as_mut() {
                    if f.write_all(msg.line.as_bytes()).await.is_err() {
                        warn!("log file sink: write failed, dropping entry");
                        file = None;
                    } else {
                        last_write = Instant::now();
                    }
                }
            }
            _ = tick.tick() => {
                if let Some(f) = file.as_mut() {
                    if last_write.elapsed() >= cfg.sync_interval && last_sync < last_write {
                        let _ = f.flush().await;
                        last_sync = Instant::now();
                    }
                    if last_write.elapsed() >= cfg.close_interval {
                        let _ = f.flush().await;
                        file = None;
                        debug!("log file sink: closed idle file handle");
                    }
                }
            }
        }
    }
}

async fn open_log_file(data_dir: &std::path::Path) -> Option<BufWriter<tokio::fs::File>> {
    if let Err(e) = tokio::fs::create_dir_all(data_dir).await {
        warn!("log file sink: could not create data dir: {e}");
        return None;
    }
    let name = format!("obc_log_{}.txt", compact_timestamp());
    let path = data_dir.join(name);
    match OpenOptions::new().create(true).append(true).open(&path).await {
        Ok(f) => Some(BufWriter::new(f)),
        Err(e) => {
            warn!("log file sink: could not open {path:?}: {e}");
            None
        }
    }
}

fn compact_timestamp() -> String {
    use chrono::Utc;
    Utc::now().format("%Y%m%d").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::logging::MAX_LINE_LEN;

    #[tokio::test]
    async fn writes_and_closes_on_idle() {
        let dir = tempdir_path();
        let (tx, rx) = tokio::sync::mpsc::unbounded_channel();
        let cfg = FileSinkConfig {
            data_dir: dir.clone(),
            sync_interval: Duration::from_millis(10),
            close_interval: Duration::from_millis(50),
        };
        let handle = tokio::spawn(run(rx, cfg));

        let mut line: heapless::String<MAX_LINE_LEN> = heapless::String::new();
        let _ = line.push_str("hello from test\n");
        tx.send(LogMessage { line }).unwrap();

        tokio::time::sleep(Duration::from_millis(150)).await;
        drop(tx);
        let _ = handle.await;

        let mut entries = tokio::fs::read_dir(&dir).await.unwrap();
        let mut found_contents = String::new();
        while let Some(entry) = entries.next_entry().await.unwrap() {
            found_contents += &tokio::fs::read_to_string(entry.path()).await.unwrap();
        }
        assert!(found_contents.contains("hello from test"));
        let _ = tokio::fs::remove_dir_all(&dir).await;
    }

    fn tempdir_path() -> PathBuf {
        std::env::temp_dir().join(format!("obc_log_sink_test_{}", std::process::id()))
    }
}
