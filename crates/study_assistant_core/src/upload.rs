//! crates/study_assistant_core/src/upload.rs
//!
//! Accepts uploaded PDFs onto local disk and swaps them into the remote assistant.
//!
//! The remote assistant accumulates every file ever uploaded into one corpus with a small
//! quota, so ingestion is a destructive replace: delete the assistant, recreate it, then
//! upload the new file. Only one ingest may run at a time.

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use std::fmt::Display;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::fs;
use tokio::io::AsyncWriteExt;
use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::assistant::AssistantManager;
use crate::domain::{AssistantInfo, FileStatus, IndexedDocument, RemoteFile, StoredDocument};
use crate::error::{StudyError, StudyResult};
use crate::session::DocumentSession;

#[derive(Debug, Clone)]
pub struct UploadSettings {
    pub upload_dir: PathBuf,
    /// Upper bound on waiting for the remote side to index a file. `None` waits forever.
    pub ingest_timeout: Option<Duration>,
}

impl Default for UploadSettings {
    fn default() -> Self {
        Self {
            upload_dir: PathBuf::from("uploads"),
            ingest_timeout: None,
        }
    }
}

/// Returns true when the client-supplied filename names a PDF.
pub fn is_pdf_filename(filename: &str) -> bool {
    Path::new(filename.trim())
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"))
}

/// The name shown to the remote service: the last path component, without control characters.
fn display_name(original: &str) -> String {
    let base = original
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or(original)
        .chars()
        .filter(|c| !c.is_control())
        .collect::<String>();
    if base.trim().is_empty() {
        "document.pdf".to_string()
    } else {
        base
    }
}

pub struct UploadCoordinator {
    assistant: Arc<AssistantManager>,
    settings: UploadSettings,
    ingest_lock: Mutex<()>,
    shutdown: CancellationToken,
}

impl UploadCoordinator {
    pub fn new(
        assistant: Arc<AssistantManager>,
        settings: UploadSettings,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            assistant,
            settings,
            ingest_lock: Mutex::new(()),
            shutdown,
        }
    }

    /// Writes an uploaded PDF into the uploads directory under a generated name.
    ///
    /// Bytes land in a `.part` file that is renamed only once the stream has been fully
    /// written, so a failed upload never leaves a usable file behind.
    pub async fn accept_upload<S, E>(&self, filename: &str, stream: S) -> StudyResult<StoredDocument>
    where
        S: Stream<Item = Result<Bytes, E>>,
        E: Display,
    {
        if !is_pdf_filename(filename) {
            warn!(filename, "Rejected non-PDF upload");
            return Err(StudyError::InvalidFileType(filename.to_string()));
        }

        fs::create_dir_all(&self.settings.upload_dir).await?;

        let id = Uuid::new_v4();
        let path = self.settings.upload_dir.join(format!("{id}.pdf"));
        let partial = self.settings.upload_dir.join(format!("{id}.pdf.part"));

        let cleanup = RemoveOnDrop::new(partial.clone());
        let written = write_stream(&partial, stream).await?;
        fs::rename(&partial, &path).await?;
        cleanup.disarm();

        info!(filename, path = %path.display(), bytes = written, "Stored upload");
        Ok(StoredDocument {
            id,
            original_name: filename.to_string(),
            path,
        })
    }

    /// Replaces the assistant's corpus with `document` and waits until it is indexed.
    ///
    /// `session` is cleared as soon as the replace starts and set again only on success.
    /// The stored file is removed on failure, and also when this future is dropped before
    /// it completes (e.g. the client went away mid-ingest).
    pub async fn ingest(
        &self,
        document: &StoredDocument,
        session: &DocumentSession,
    ) -> StudyResult<IndexedDocument> {
        let cleanup = RemoveOnDrop::new(document.path.clone());
        let _guard = self.ingest_lock.lock().await;
        session.clear();

        match self.replace_and_index(document).await {
            Ok(indexed) => {
                info!(
                    file_id = %indexed.file.id,
                    assistant = %indexed.assistant.name,
                    "Document indexed"
                );
                cleanup.disarm();
                session.mark_ready(indexed.clone());
                Ok(indexed)
            }
            Err(e) => {
                error!(path = %document.path.display(), "Ingestion failed: {}", e);
                Err(e)
            }
        }
    }

    /// Deletes the assistant and forgets the indexed document.
    pub async fn retire(&self, session: &DocumentSession) -> StudyResult<()> {
        let _guard = self.ingest_lock.lock().await;
        session.clear();
        self.assistant
            .delete_resource(self.assistant.resource_name())
            .await
    }

    async fn replace_and_index(&self, document: &StoredDocument) -> StudyResult<IndexedDocument> {
        let name = self.assistant.resource_name().to_string();

        self.assistant.delete_resource(&name).await?;
        let resource = self.assistant.ensure_resource(&name).await?;

        info!(assistant = %name, path = %document.path.display(), "Uploading file to assistant");
        let file = self
            .assistant
            .upload_file(&resource, &document.path, &display_name(&document.original_name))
            .await?;

        let waiting = self.wait_until_indexed(&resource, file);
        let bounded = async {
            match self.settings.ingest_timeout {
                Some(limit) => tokio::time::timeout(limit, waiting)
                    .await
                    .unwrap_or(Err(StudyError::IngestionTimedOut(limit))),
                None => waiting.await,
            }
        };
        let file = tokio::select! {
            _ = self.shutdown.cancelled() => Err(StudyError::IngestionCancelled),
            result = bounded => result,
        }?;

        Ok(IndexedDocument {
            document: document.clone(),
            file,
            assistant: resource,
            indexed_at: Utc::now(),
        })
    }

    async fn wait_until_indexed(
        &self,
        resource: &AssistantInfo,
        mut file: RemoteFile,
    ) -> StudyResult<RemoteFile> {
        loop {
            match file.status {
                FileStatus::Available => return Ok(file),
                FileStatus::ProcessingFailed => {
                    return Err(StudyError::IngestionFailed(
                        file.error_message
                            .unwrap_or_else(|| "remote processing failed".to_string()),
                    ))
                }
                FileStatus::Deleting => {
                    return Err(StudyError::IngestionFailed(
                        "file was deleted while processing".to_string(),
                    ))
                }
                FileStatus::Processing | FileStatus::Other(_) => {}
            }
            tokio::time::sleep(self.assistant.poll_interval()).await;
            file = self.assistant.file_status(resource, &file.id).await?;
        }
    }
}

async fn write_stream<S, E>(path: &Path, stream: S) -> StudyResult<u64>
where
    S: Stream<Item = Result<Bytes, E>>,
    E: Display,
{
    futures::pin_mut!(stream);
    let mut file = fs::File::create(path).await?;
    let mut written = 0u64;
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| StudyError::UploadInterrupted(e.to_string()))?;
        file.write_all(&chunk).await?;
        written += chunk.len() as u64;
    }
    file.flush().await?;
    Ok(written)
}

/// Deletes a local upload file when dropped, unless disarmed first.
///
/// Runs on error returns and on cancellation alike, since a dropped future never reaches
/// its error arm.
struct RemoveOnDrop {
    path: Option<PathBuf>,
}

impl RemoveOnDrop {
    fn new(path: PathBuf) -> Self {
        Self { path: Some(path) }
    }

    fn disarm(mut self) {
        self.path = None;
    }
}

impl Drop for RemoveOnDrop {
    fn drop(&mut self) {
        let Some(path) = self.path.take() else {
            return;
        };
        match std::fs::remove_file(&path) {
            Ok(()) => info!(path = %path.display(), "Removed upload"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %path.display(), "Failed to remove upload: {}", e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::assistant::AssistantSettings;
    use crate::ports::PortError;
    use crate::testing::FakeAssistant;
    use futures::stream;

    const PDF: &[u8] = b"%PDF-1.4\n1 0 obj\n<<>>\nendobj\n%%EOF";

    struct Fixture {
        fake: Arc<FakeAssistant>,
        coordinator: Arc<UploadCoordinator>,
        session: Arc<DocumentSession>,
        shutdown: CancellationToken,
        dir: tempfile::TempDir,
    }

    fn fixture(ingest_timeout: Option<Duration>) -> Fixture {
        let dir = tempfile::tempdir().unwrap();
        let fake = Arc::new(FakeAssistant::new());
        let manager = Arc::new(AssistantManager::new(
            fake.clone(),
            AssistantSettings {
                poll_interval: Duration::from_millis(1),
                ..Default::default()
            },
        ));
        let shutdown = CancellationToken::new();
        let coordinator = Arc::new(UploadCoordinator::new(
            manager,
            UploadSettings {
                upload_dir: dir.path().join("uploads"),
                ingest_timeout,
            },
            shutdown.clone(),
        ));
        Fixture {
            fake,
            coordinator,
            session: Arc::new(DocumentSession::new()),
            shutdown,
            dir,
        }
    }

    fn pdf_stream() -> impl Stream<Item = Result<Bytes, std::io::Error>> {
        stream::iter(vec![
            Ok(Bytes::from_static(&PDF[..8])),
            Ok(Bytes::from_static(&PDF[8..])),
        ])
    }

    fn upload_dir_entries(fx: &Fixture) -> Vec<String> {
        match std::fs::read_dir(fx.dir.path().join("uploads")) {
            Ok(entries) => entries
                .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
                .collect(),
            Err(_) => Vec::new(),
        }
    }

    #[test]
    fn recognises_pdf_filenames() {
        assert!(is_pdf_filename("lecture.pdf"));
        assert!(is_pdf_filename("Lecture.PDF"));
        assert!(!is_pdf_filename("notes.txt"));
        assert!(!is_pdf_filename("pdf"));
        assert!(!is_pdf_filename("archive.pdf.zip"));
    }

    #[test]
    fn display_name_drops_directories() {
        assert_eq!(display_name("../../etc/lecture.pdf"), "lecture.pdf");
        assert_eq!(display_name("C:\\docs\\week1.pdf"), "week1.pdf");
        assert_eq!(display_name("/"), "document.pdf");
    }

    #[tokio::test]
    async fn rejects_non_pdf_before_touching_disk() {
        let fx = fixture(None);

        let err = fx
            .coordinator
            .accept_upload("notes.txt", pdf_stream())
            .await
            .unwrap_err();

        assert!(matches!(err, StudyError::InvalidFileType(_)));
        assert!(!fx.dir.path().join("uploads").exists());
    }

    #[tokio::test]
    async fn stores_pdf_under_generated_name() {
        let fx = fixture(None);

        let stored = fx
            .coordinator
            .accept_upload("../lecture.pdf", pdf_stream())
            .await
            .unwrap();

        assert_eq!(stored.original_name, "../lecture.pdf");
        assert_eq!(stored.path, fx.dir.path().join("uploads").join(format!("{}.pdf", stored.id)));
        assert_eq!(std::fs::read(&stored.path).unwrap(), PDF);
        assert_eq!(upload_dir_entries(&fx).len(), 1);
    }

    #[tokio::test]
    async fn interrupted_stream_leaves_no_file() {
        let fx = fixture(None);
        let broken = stream::iter(vec![
            Ok(Bytes::from_static(b"%PDF-1.4")),
            Err("connection reset"),
        ]);

        let err = fx
            .coordinator
            .accept_upload("lecture.pdf", broken)
            .await
            .unwrap_err();

        assert!(matches!(err, StudyError::UploadInterrupted(_)));
        assert!(upload_dir_entries(&fx).is_empty());
    }

    #[tokio::test]
    async fn ingest_replaces_assistant_and_marks_ready() {
        let fx = fixture(None);
        fx.fake.insert_assistant("pdf-assistant");
        fx.fake.set_processing_polls(2);
        let stored = fx
            .coordinator
            .accept_upload("lecture.pdf", pdf_stream())
            .await
            .unwrap();
        assert!(!fx.session.is_ready());

        let indexed = fx.coordinator.ingest(&stored, &fx.session).await.unwrap();

        assert_eq!(indexed.file.status, FileStatus::Available);
        assert_eq!(indexed.file.name, "lecture.pdf");
        assert!(fx.session.is_ready());
        let calls = fx.fake.calls();
        assert_eq!(
            &calls[..6],
            &[
                "delete:pdf-assistant",
                "describe:pdf-assistant",
                "create:pdf-assistant",
                "describe:pdf-assistant",
                "upload:pdf-assistant",
                "uploaded:pdf-assistant",
            ]
        );
        assert_eq!(
            calls.iter().filter(|c| c.starts_with("describe_file")).count(),
            3
        );
    }

    #[tokio::test]
    async fn failed_processing_rolls_back() {
        let fx = fixture(None);
        fx.fake.set_final_file_status(FileStatus::ProcessingFailed);
        let stored = fx
            .coordinator
            .accept_upload("lecture.pdf", pdf_stream())
            .await
            .unwrap();

        let err = fx.coordinator.ingest(&stored, &fx.session).await.unwrap_err();

        assert!(matches!(err, StudyError::IngestionFailed(ref m) if m == "could not extract text"));
        assert!(!stored.path.exists());
        assert!(!fx.session.is_ready());
    }

    #[tokio::test]
    async fn failed_second_ingest_reverts_to_not_ready() {
        let fx = fixture(None);
        let first = fx
            .coordinator
            .accept_upload("week1.pdf", pdf_stream())
            .await
            .unwrap();
        fx.coordinator.ingest(&first, &fx.session).await.unwrap();
        assert!(fx.session.is_ready());

        let second = fx
            .coordinator
            .accept_upload("week2.pdf", pdf_stream())
            .await
            .unwrap();
        fx.fake
            .fail_next_upload_with(PortError::Unavailable("upstream timeout".into()));
        let err = fx.coordinator.ingest(&second, &fx.session).await.unwrap_err();

        assert!(matches!(err, StudyError::RemoteUnavailable(_)));
        assert!(!fx.session.is_ready());
        assert!(!second.path.exists());
    }

    #[tokio::test]
    async fn bounded_wait_times_out() {
        let fx = fixture(Some(Duration::from_millis(30)));
        fx.fake.set_processing_polls(usize::MAX);
        let stored = fx
            .coordinator
            .accept_upload("lecture.pdf", pdf_stream())
            .await
            .unwrap();

        let err = fx.coordinator.ingest(&stored, &fx.session).await.unwrap_err();

        assert!(matches!(err, StudyError::IngestionTimedOut(_)));
        assert!(!stored.path.exists());
        assert!(!fx.session.is_ready());
    }

    #[tokio::test]
    async fn shutdown_cancels_unbounded_wait() {
        let fx = fixture(None);
        fx.fake.set_processing_polls(usize::MAX);
        let stored = fx
            .coordinator
            .accept_upload("lecture.pdf", pdf_stream())
            .await
            .unwrap();

        let shutdown = fx.shutdown.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            shutdown.cancel();
        });
        let err = fx.coordinator.ingest(&stored, &fx.session).await.unwrap_err();

        assert!(matches!(err, StudyError::IngestionCancelled));
        assert!(!stored.path.exists());
    }

    #[tokio::test]
    async fn concurrent_ingests_do_not_interleave() {
        let fx = fixture(None);
        fx.fake.set_upload_delay(Duration::from_millis(20));
        let a = fx
            .coordinator
            .accept_upload("a.pdf", pdf_stream())
            .await
            .unwrap();
        let b = fx
            .coordinator
            .accept_upload("b.pdf", pdf_stream())
            .await
            .unwrap();

        let (ca, sa) = (fx.coordinator.clone(), fx.session.clone());
        let (cb, sb) = (fx.coordinator.clone(), fx.session.clone());
        let first = tokio::spawn(async move { ca.ingest(&a, &sa).await });
        let second = tokio::spawn(async move { cb.ingest(&b, &sb).await });
        first.await.unwrap().unwrap();
        second.await.unwrap().unwrap();

        let calls = fx.fake.calls();
        let deletes: Vec<usize> = calls
            .iter()
            .enumerate()
            .filter(|(_, c)| c.starts_with("delete:"))
            .map(|(i, _)| i)
            .collect();
        assert_eq!(deletes.len(), 2);
        let first_uploaded = calls.iter().position(|c| c.starts_with("uploaded:")).unwrap();
        assert!(first_uploaded < deletes[1]);
        assert!(fx.session.is_ready());
        assert_eq!(fx.fake.file_count(), 1);
    }

    #[tokio::test]
    async fn abandoned_ingest_removes_the_stored_file() {
        let fx = fixture(None);
        fx.fake.set_processing_polls(usize::MAX);
        let stored = fx
            .coordinator
            .accept_upload("lecture.pdf", pdf_stream())
            .await
            .unwrap();

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            fx.coordinator.ingest(&stored, &fx.session),
        )
        .await;

        assert!(abandoned.is_err());
        assert!(!stored.path.exists());
        assert!(upload_dir_entries(&fx).is_empty());
        assert!(!fx.session.is_ready());
    }

    #[tokio::test]
    async fn abandoned_stream_leaves_no_partial_file() {
        let fx = fixture(None);
        let stalled = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"%PDF-1.4"))])
            .chain(stream::pending());

        let abandoned = tokio::time::timeout(
            Duration::from_millis(50),
            fx.coordinator.accept_upload("lecture.pdf", stalled),
        )
        .await;

        assert!(abandoned.is_err());
        assert!(upload_dir_entries(&fx).is_empty());
    }

    #[tokio::test]
    async fn reingest_waits_for_the_old_assistant_to_be_deleted() {
        let fx = fixture(None);
        fx.fake.set_deletion_polls(3);
        let first = fx
            .coordinator
            .accept_upload("week1.pdf", pdf_stream())
            .await
            .unwrap();
        fx.coordinator.ingest(&first, &fx.session).await.unwrap();

        let second = fx
            .coordinator
            .accept_upload("week2.pdf", pdf_stream())
            .await
            .unwrap();
        let indexed = fx.coordinator.ingest(&second, &fx.session).await.unwrap();

        assert_eq!(indexed.file.name, "week2.pdf");
        assert!(fx.session.is_ready());
        assert_eq!(fx.fake.file_count(), 1);
        assert!(second.path.exists());

        let calls = fx.fake.calls();
        let second_delete = calls.iter().rposition(|c| c.starts_with("delete:")).unwrap();
        let second_create = calls.iter().rposition(|c| c.starts_with("create:")).unwrap();
        let describes_between = calls[second_delete..second_create]
            .iter()
            .filter(|c| c.starts_with("describe:"))
            .count();
        assert_eq!(describes_between, 4);
    }

    #[tokio::test]
    async fn retire_deletes_assistant_and_clears_session() {
        let fx = fixture(None);
        let stored = fx
            .coordinator
            .accept_upload("lecture.pdf", pdf_stream())
            .await
            .unwrap();
        fx.coordinator.ingest(&stored, &fx.session).await.unwrap();

        fx.coordinator.retire(&fx.session).await.unwrap();

        assert!(!fx.session.is_ready());
        assert!(!fx.fake.has_assistant("pdf-assistant"));
    }
}
