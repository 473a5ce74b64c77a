//! Resumable multipart upload engine.
//!
//! One file at a time, parts strictly sequential, so a single chunk buffer
//! is in memory at any moment. Resume never trusts the provider's part list
//! blindly: every acknowledged part is re-read locally and its MD5 compared
//! against the recorded entity tag, which bounds re-transfer to unconfirmed
//! or corrupted parts only.

use tracing::{debug, warn};

use crate::error::{Result, S3Error, UploadError};
use crate::path::RemotePath;
use crate::progress::{EventCallback, ProgressCallback, TransferEvent, TransferProgress};
use crate::upload::source::{md5_of_range, DataSource};
use crate::upload::state::{PartRecord, UploadPhase, UploadSession, DEFAULT_PART_SIZE};
use crate::upload::transport::UploadTransport;

/// Upload engine driving transfers through an [`UploadTransport`].
pub struct UploadEngine<T: UploadTransport> {
    transport: T,
    part_size: u64,
    progress: Option<ProgressCallback>,
    events: Option<EventCallback>,
}

impl<T: UploadTransport> UploadEngine<T> {
    /// Create an engine with the default 10 MiB part size.
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            part_size: DEFAULT_PART_SIZE,
            progress: None,
            events: None,
        }
    }

    /// Set the part size in bytes.
    pub fn set_part_size(&mut self, bytes: u64) {
        self.part_size = bytes.max(1);
    }

    /// Get the configured part size.
    pub fn part_size(&self) -> u64 {
        self.part_size
    }

    /// Install a progress callback.
    ///
    /// The callback fires once per transferred chunk; returning `false`
    /// cancels the transfer, aborting the provider-side upload.
    pub fn set_progress_callback(&mut self, callback: ProgressCallback) {
        self.progress = Some(callback);
    }

    /// Install a lifecycle event callback.
    pub fn set_event_callback(&mut self, callback: EventCallback) {
        self.events = Some(callback);
    }

    /// Access the transport.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Upload one source to a destination path, resuming when the provider
    /// already holds an in-flight upload for the key.
    ///
    /// On success the returned session is `Completed`. A transport failure
    /// surfaces as a resumable error: calling `upload` again with the same
    /// source and destination rediscovers the in-flight upload and
    /// transfers only the parts that are missing or corrupted. The engine
    /// never resubmits on its own; the caller decides.
    pub async fn upload(
        &mut self,
        source: &mut dyn DataSource,
        dest: &RemotePath,
    ) -> Result<UploadSession> {
        if dest.is_folder() {
            return Err(S3Error::NotAFile(dest.to_string()));
        }

        let mut session = UploadSession::new(dest.clone(), source.name(), source.len());
        match self.run_transfer(source, &mut session).await {
            Ok(()) => {
                session.phase = UploadPhase::Completed;
                self.emit(TransferEvent::Completed {
                    filename: session.filename.clone(),
                });
                self.emit(TransferEvent::RefreshRequested);
                Ok(session)
            }
            Err(S3Error::Upload(UploadError::Aborted)) => {
                session.phase = UploadPhase::Canceled;
                self.emit(TransferEvent::Canceled {
                    filename: session.filename.clone(),
                });
                Err(S3Error::Upload(UploadError::Aborted))
            }
            Err(err) => {
                session.phase = UploadPhase::Failed;
                self.emit(TransferEvent::Failed {
                    filename: session.filename.clone(),
                    message: err.to_string(),
                });
                Err(err)
            }
        }
    }

    /// Upload a queue of sources sequentially.
    ///
    /// A failing file does not stop the queue. Emits `QueueDrained` after
    /// the last file.
    pub async fn upload_all(
        &mut self,
        batch: Vec<(Box<dyn DataSource>, RemotePath)>,
    ) -> Vec<Result<UploadSession>> {
        let mut results = Vec::with_capacity(batch.len());
        for (mut source, dest) in batch {
            results.push(self.upload(source.as_mut(), &dest).await);
        }
        self.emit(TransferEvent::QueueDrained);
        results
    }

    /// Cancel a session, aborting the provider-side upload.
    ///
    /// No-op for sessions that already reached `Completed`.
    pub async fn cancel(&mut self, session: &mut UploadSession) -> Result<()> {
        if session.phase == UploadPhase::Completed {
            return Ok(());
        }
        if let Some(upload_id) = session.upload_id.clone() {
            self.transport
                .abort_upload(&session.dest, &upload_id)
                .await?;
        }
        session.phase = UploadPhase::Canceled;
        self.emit(TransferEvent::Canceled {
            filename: session.filename.clone(),
        });
        Ok(())
    }

    async fn run_transfer(
        &mut self,
        source: &mut dyn DataSource,
        session: &mut UploadSession,
    ) -> Result<()> {
        // Small files skip the multipart protocol entirely.
        if session.total_bytes <= self.part_size {
            session.phase = UploadPhase::Uploading;
            let data = source.read_range(0, session.total_bytes).await?;
            self.transport
                .put_object(&session.dest, data)
                .await
                .map_err(into_transient)?;
            session.uploaded_bytes = session.total_bytes;
            self.report_chunk(session);
            return Ok(());
        }

        session.phase = UploadPhase::AwaitingUploadId;
        let upload_id = match self.transport.find_upload(&session.dest).await? {
            Some(existing) => {
                debug!(dest = %session.dest, upload_id = %existing, "resuming upload");
                session.phase = UploadPhase::Resuming;
                session.upload_id = Some(existing.clone());
                self.verify_acknowledged_parts(source, session, &existing)
                    .await?;
                existing
            }
            None => {
                let fresh = self.transport.initiate_upload(&session.dest).await?;
                session.upload_id = Some(fresh.clone());
                fresh
            }
        };

        session.phase = UploadPhase::Uploading;
        let part_count = part_count(session.total_bytes, self.part_size);

        for part_number in 1..=part_count {
            if session.parts.iter().any(|p| p.part_number == part_number) {
                continue;
            }

            let offset = (u64::from(part_number) - 1) * self.part_size;
            let size = self.part_size.min(session.total_bytes - offset);
            let data = source.read_range(offset, size).await?;

            let etag = self
                .transport
                .upload_part(&session.dest, &upload_id, part_number, data)
                .await
                .map_err(into_transient)?;

            session.record_part(PartRecord {
                part_number,
                etag,
                size,
            });

            if !self.report_chunk(session) {
                self.transport
                    .abort_upload(&session.dest, &upload_id)
                    .await?;
                return Err(S3Error::Upload(UploadError::Aborted));
            }
        }

        self.transport
            .complete_upload(&session.dest, &upload_id, &session.parts)
            .await
            .map_err(into_transient)?;
        Ok(())
    }

    /// Verify provider-acknowledged parts against the local source.
    ///
    /// Matching parts are marked complete and skipped; mismatching parts
    /// stay unrecorded so the transfer loop re-queues them. A part that
    /// cannot belong to the local source at all means the source changed
    /// since the upload began.
    async fn verify_acknowledged_parts(
        &mut self,
        source: &mut dyn DataSource,
        session: &mut UploadSession,
        upload_id: &str,
    ) -> Result<()> {
        let acknowledged = self.transport.list_parts(&session.dest, upload_id).await?;
        let part_count = part_count(session.total_bytes, self.part_size);

        for part in acknowledged {
            if u64::from(part.part_number) > u64::from(part_count) {
                return Err(S3Error::ResumeMismatch(format!(
                    "acknowledged part {} exceeds the {} parts of the local source",
                    part.part_number, part_count
                )));
            }

            let offset = (u64::from(part.part_number) - 1) * self.part_size;
            let expected_size = self.part_size.min(session.total_bytes - offset);
            if part.size != expected_size {
                warn!(
                    part = part.part_number,
                    "acknowledged part size differs, re-queueing"
                );
                continue;
            }

            let local_hash = md5_of_range(source, offset, expected_size).await?;
            if local_hash == part.etag {
                session.record_part(PartRecord {
                    part_number: part.part_number,
                    etag: part.etag,
                    size: part.size,
                });
            } else {
                warn!(part = part.part_number, "content hash mismatch, re-queueing");
            }
        }
        Ok(())
    }

    /// Report one transferred chunk. Returns `false` when the caller asked
    /// to cancel.
    fn report_chunk(&mut self, session: &UploadSession) -> bool {
        let progress = TransferProgress::new(
            session.uploaded_bytes,
            session.total_bytes,
            session.filename.clone(),
        );
        self.emit(TransferEvent::Progress {
            filename: session.filename.clone(),
            percent: progress.percent(),
            bytes_loaded: session.uploaded_bytes,
        });
        match &mut self.progress {
            Some(callback) => callback(&progress),
            None => true,
        }
    }

    fn emit(&mut self, event: TransferEvent) {
        if let Some(callback) = &mut self.events {
            callback(&event);
        }
    }
}

fn part_count(total_bytes: u64, part_size: u64) -> u32 {
    (total_bytes.div_ceil(part_size)) as u32
}

fn into_transient(err: S3Error) -> S3Error {
    match err {
        S3Error::Upload(_) | S3Error::ResumeMismatch(_) => err,
        other => S3Error::Upload(UploadError::Transient(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::xml::PartSummary;
    use crate::upload::source::{md5_hex, BytesSource};
    use async_trait::async_trait;
    use std::collections::{BTreeMap, HashMap};
    use std::sync::{Arc, Mutex};

    const MIB: u64 = 1024 * 1024;

    #[derive(Default)]
    struct MockState {
        objects: HashMap<String, Vec<u8>>,
        uploads: HashMap<String, MockUpload>,
        next_id: u32,
        transferred_parts: Vec<u32>,
        single_puts: u32,
        fail_part: Option<u32>,
    }

    struct MockUpload {
        key: String,
        parts: BTreeMap<u32, Vec<u8>>,
    }

    #[derive(Clone, Default)]
    struct MockTransport {
        state: Arc<Mutex<MockState>>,
    }

    impl MockTransport {
        fn seed_upload(&self, key: &str, parts: Vec<(u32, Vec<u8>)>) -> String {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("upload-{}", state.next_id);
            state.uploads.insert(
                id.clone(),
                MockUpload {
                    key: key.to_string(),
                    parts: parts.into_iter().collect(),
                },
            );
            id
        }

        fn object(&self, key: &str) -> Option<Vec<u8>> {
            self.state.lock().unwrap().objects.get(key).cloned()
        }

        fn transferred_parts(&self) -> Vec<u32> {
            self.state.lock().unwrap().transferred_parts.clone()
        }

        fn upload_count(&self) -> usize {
            self.state.lock().unwrap().uploads.len()
        }

        fn single_puts(&self) -> u32 {
            self.state.lock().unwrap().single_puts
        }

        fn fail_part(&self, part_number: u32) {
            self.state.lock().unwrap().fail_part = Some(part_number);
        }
    }

    #[async_trait]
    impl UploadTransport for MockTransport {
        async fn put_object(&self, dest: &RemotePath, data: Vec<u8>) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            state.single_puts += 1;
            state.objects.insert(dest.to_string(), data);
            Ok(())
        }

        async fn find_upload(&self, dest: &RemotePath) -> Result<Option<String>> {
            let state = self.state.lock().unwrap();
            let key = dest.to_string();
            Ok(state
                .uploads
                .iter()
                .find(|(_, upload)| upload.key == key)
                .map(|(id, _)| id.clone()))
        }

        async fn initiate_upload(&self, dest: &RemotePath) -> Result<String> {
            let mut state = self.state.lock().unwrap();
            state.next_id += 1;
            let id = format!("upload-{}", state.next_id);
            state.uploads.insert(
                id.clone(),
                MockUpload {
                    key: dest.to_string(),
                    parts: BTreeMap::new(),
                },
            );
            Ok(id)
        }

        async fn list_parts(
            &self,
            _dest: &RemotePath,
            upload_id: &str,
        ) -> Result<Vec<PartSummary>> {
            let state = self.state.lock().unwrap();
            let upload = state
                .uploads
                .get(upload_id)
                .ok_or_else(|| S3Error::Custom("unknown upload id".to_string()))?;
            Ok(upload
                .parts
                .iter()
                .map(|(number, data)| PartSummary {
                    part_number: *number,
                    etag: md5_hex(data),
                    size: data.len() as u64,
                })
                .collect())
        }

        async fn upload_part(
            &self,
            _dest: &RemotePath,
            upload_id: &str,
            part_number: u32,
            data: Vec<u8>,
        ) -> Result<String> {
            let mut state = self.state.lock().unwrap();
            if state.fail_part == Some(part_number) {
                return Err(S3Error::HttpError(500));
            }
            state.transferred_parts.push(part_number);
            let etag = md5_hex(&data);
            let upload = state
                .uploads
                .get_mut(upload_id)
                .ok_or_else(|| S3Error::Custom("unknown upload id".to_string()))?;
            upload.parts.insert(part_number, data);
            Ok(etag)
        }

        async fn complete_upload(
            &self,
            _dest: &RemotePath,
            upload_id: &str,
            parts: &[PartRecord],
        ) -> Result<()> {
            let mut state = self.state.lock().unwrap();
            let upload = state
                .uploads
                .remove(upload_id)
                .ok_or_else(|| S3Error::Custom("unknown upload id".to_string()))?;

            // The provider rejects finalization when any part is missing.
            for record in parts {
                if !upload.parts.contains_key(&record.part_number) {
                    return Err(S3Error::Upload(UploadError::Rejected(format!(
                        "part {} missing",
                        record.part_number
                    ))));
                }
            }

            let mut data = Vec::new();
            for bytes in upload.parts.values() {
                data.extend_from_slice(bytes);
            }
            state.objects.insert(upload.key, data);
            Ok(())
        }

        async fn abort_upload(&self, _dest: &RemotePath, upload_id: &str) -> Result<()> {
            self.state.lock().unwrap().uploads.remove(upload_id);
            Ok(())
        }
    }

    fn patterned_bytes(len: u64) -> Vec<u8> {
        (0..len).map(|i| (i % 251) as u8).collect()
    }

    fn engine_with(transport: MockTransport) -> UploadEngine<MockTransport> {
        let mut engine = UploadEngine::new(transport);
        engine.set_part_size(10 * MIB);
        engine
    }

    #[tokio::test]
    async fn test_small_file_bypasses_multipart() {
        let transport = MockTransport::default();
        let mut engine = engine_with(transport.clone());

        let data = patterned_bytes(4096);
        let mut source = BytesSource::new("small.bin", data.clone());
        let dest = RemotePath::parse("docs/small.bin");

        let session = engine.upload(&mut source, &dest).await.unwrap();
        assert_eq!(session.phase, UploadPhase::Completed);
        assert_eq!(transport.single_puts(), 1);
        assert!(transport.transferred_parts().is_empty());
        assert_eq!(transport.object("docs/small.bin").unwrap(), data);
    }

    #[tokio::test]
    async fn test_multipart_transfers_parts_in_order() {
        let transport = MockTransport::default();
        let mut engine = engine_with(transport.clone());

        let data = patterned_bytes(25 * MIB);
        let mut source = BytesSource::new("big.bin", data.clone());
        let dest = RemotePath::parse("docs/big.bin");

        let session = engine.upload(&mut source, &dest).await.unwrap();
        assert_eq!(session.phase, UploadPhase::Completed);
        assert_eq!(transport.transferred_parts(), [1, 2, 3]);
        assert_eq!(session.uploaded_bytes, 25 * MIB);
        assert_eq!(transport.object("docs/big.bin").unwrap(), data);
    }

    #[tokio::test]
    async fn test_resume_transfers_only_missing_parts() {
        let transport = MockTransport::default();
        let data = patterned_bytes(25 * MIB);

        // Part 1 was acknowledged before the interruption.
        transport.seed_upload(
            "docs/big.bin",
            vec![(1, data[..(10 * MIB) as usize].to_vec())],
        );

        let mut engine = engine_with(transport.clone());
        let mut source = BytesSource::new("big.bin", data.clone());
        let dest = RemotePath::parse("docs/big.bin");

        let session = engine.upload(&mut source, &dest).await.unwrap();
        assert_eq!(transport.transferred_parts(), [2, 3]);
        assert_eq!(session.parts.len(), 3);

        let object = transport.object("docs/big.bin").unwrap();
        assert_eq!(object.len() as u64, 25 * MIB);
        assert_eq!(object, data);
    }

    #[tokio::test]
    async fn test_resume_reuploads_corrupted_part() {
        let transport = MockTransport::default();
        let data = patterned_bytes(25 * MIB);

        // Provider acknowledged a part whose content no longer matches.
        transport.seed_upload("docs/big.bin", vec![(1, vec![0xFF; (10 * MIB) as usize])]);

        let mut engine = engine_with(transport.clone());
        let mut source = BytesSource::new("big.bin", data.clone());
        let dest = RemotePath::parse("docs/big.bin");

        engine.upload(&mut source, &dest).await.unwrap();
        assert_eq!(transport.transferred_parts(), [1, 2, 3]);
        assert_eq!(transport.object("docs/big.bin").unwrap(), data);
    }

    #[tokio::test]
    async fn test_resume_mismatch_when_source_shrank() {
        let transport = MockTransport::default();

        // Five acknowledged parts cannot belong to a 25 MiB source.
        transport.seed_upload("docs/big.bin", vec![(5, vec![1u8; (10 * MIB) as usize])]);

        let mut engine = engine_with(transport.clone());
        let mut source = BytesSource::new("big.bin", patterned_bytes(25 * MIB));
        let dest = RemotePath::parse("docs/big.bin");

        let err = engine.upload(&mut source, &dest).await.unwrap_err();
        assert!(matches!(err, S3Error::ResumeMismatch(_)));
    }

    #[tokio::test]
    async fn test_cancel_leaves_no_parts_behind() {
        let transport = MockTransport::default();
        let mut engine = engine_with(transport.clone());
        engine.set_progress_callback(Box::new(|_| false));

        let mut source = BytesSource::new("big.bin", patterned_bytes(25 * MIB));
        let dest = RemotePath::parse("docs/big.bin");

        let err = engine.upload(&mut source, &dest).await.unwrap_err();
        assert!(matches!(err, S3Error::Upload(UploadError::Aborted)));
        assert_eq!(transport.upload_count(), 0);
        assert!(transport.object("docs/big.bin").is_none());
    }

    #[tokio::test]
    async fn test_transport_failure_is_resumable() {
        let transport = MockTransport::default();
        transport.fail_part(2);

        let mut engine = engine_with(transport.clone());
        let mut source = BytesSource::new("big.bin", patterned_bytes(25 * MIB));
        let dest = RemotePath::parse("docs/big.bin");

        let err = engine.upload(&mut source, &dest).await.unwrap_err();
        assert!(err.is_resumable());
        // The in-flight upload survives for a later resume.
        assert_eq!(transport.upload_count(), 1);
    }

    #[tokio::test]
    async fn test_folder_destination_fails_fast() {
        let mut engine = engine_with(MockTransport::default());
        let mut source = BytesSource::new("x.bin", vec![0u8; 16]);
        let err = engine
            .upload(&mut source, &RemotePath::parse("docs/"))
            .await
            .unwrap_err();
        assert!(matches!(err, S3Error::NotAFile(_)));
    }

    #[tokio::test]
    async fn test_event_ordering_contract() {
        let transport = MockTransport::default();
        let mut engine = engine_with(transport);

        let events: Arc<Mutex<Vec<TransferEvent>>> = Arc::new(Mutex::new(Vec::new()));
        let sink = events.clone();
        engine.set_event_callback(Box::new(move |event| {
            sink.lock().unwrap().push(event.clone());
        }));

        let batch: Vec<(Box<dyn DataSource>, RemotePath)> = vec![
            (
                Box::new(BytesSource::new("a.bin", patterned_bytes(25 * MIB))),
                RemotePath::parse("docs/a.bin"),
            ),
            (
                Box::new(BytesSource::new("b.bin", patterned_bytes(1024))),
                RemotePath::parse("docs/b.bin"),
            ),
        ];
        let results = engine.upload_all(batch).await;
        assert!(results.iter().all(Result::is_ok));

        let events = events.lock().unwrap();

        // Per file: progress* -> completed -> refresh; queue-drained last.
        let mut index = 0;
        for expected_file in ["a.bin", "b.bin"] {
            let mut saw_progress = false;
            while let Some(TransferEvent::Progress { filename, .. }) = events.get(index) {
                assert_eq!(filename, expected_file);
                saw_progress = true;
                index += 1;
            }
            assert!(saw_progress, "no progress events for {}", expected_file);
            assert_eq!(
                events.get(index),
                Some(&TransferEvent::Completed {
                    filename: expected_file.to_string()
                })
            );
            index += 1;
            assert_eq!(events.get(index), Some(&TransferEvent::RefreshRequested));
            index += 1;
        }
        assert_eq!(events.get(index), Some(&TransferEvent::QueueDrained));
        assert_eq!(events.len(), index + 1);
    }

    #[tokio::test]
    async fn test_explicit_cancel_aborts_session() {
        let transport = MockTransport::default();
        let upload_id = transport.seed_upload("docs/big.bin", vec![]);

        let mut engine = engine_with(transport.clone());
        let mut session = UploadSession::new(RemotePath::parse("docs/big.bin"), "big.bin", 25 * MIB);
        session.upload_id = Some(upload_id);
        session.phase = UploadPhase::Failed;

        engine.cancel(&mut session).await.unwrap();
        assert_eq!(session.phase, UploadPhase::Canceled);
        assert_eq!(transport.upload_count(), 0);
    }
}
