//! PDF attachment extraction.
//!
//! Each attachment is decoded into a paged document and flattened into plain
//! text: a page's text items are joined with a single space and pages are
//! joined with a blank line. A batch of attachments is extracted concurrently
//! and a failed file is replaced by a placeholder instead of failing the batch.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::{join_all, BoxFuture};
use futures_util::FutureExt;
use tokio::sync::OnceCell;
use tracing::{debug, warn};

use crate::attachment::Attachment;
use crate::error::ExtractError;

/// How long to wait for the PDF backend to become ready by default.
pub const DEFAULT_INIT_TIMEOUT: Duration = Duration::from_secs(10);

/// Opens documents from raw bytes.
pub trait PdfBackend: Send + Sync + 'static {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, String>;
}

/// A parsed, paged document. Page numbers are 1-based.
pub trait PdfDocument: Send {
    fn page_count(&self) -> usize;
    fn page_text_items(&self, page: usize) -> Result<Vec<String>, String>;
}

/// Backend built on `pdf-extract`.
#[derive(Debug, Default, Clone, Copy)]
pub struct PdfExtractBackend;

struct ExtractedPages {
    pages: Vec<String>,
}

impl PdfBackend for PdfExtractBackend {
    fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, String> {
        let pages =
            pdf_extract::extract_text_from_mem_by_pages(bytes).map_err(|e| e.to_string())?;
        Ok(Box::new(ExtractedPages { pages }))
    }
}

impl PdfDocument for ExtractedPages {
    fn page_count(&self) -> usize {
        self.pages.len()
    }

    fn page_text_items(&self, page: usize) -> Result<Vec<String>, String> {
        let text = page
            .checked_sub(1)
            .and_then(|i| self.pages.get(i))
            .ok_or_else(|| format!("page {} out of range", page))?;

        Ok(text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect())
    }
}

type BackendLoader =
    Box<dyn Fn() -> BoxFuture<'static, Result<Arc<dyn PdfBackend>, ExtractError>> + Send + Sync>;

/// Owns the PDF backend and its one-time initialization.
///
/// The backend is created by an async loader the first time it is needed.
/// Waiting is bounded by `init_timeout`; on timeout or loader failure the
/// slot stays empty and the next caller tries again.
pub struct PdfRuntime {
    backend: OnceCell<Arc<dyn PdfBackend>>,
    loader: BackendLoader,
    init_timeout: Duration,
}

impl PdfRuntime {
    /// Runtime using the `pdf-extract` backend.
    pub fn new(init_timeout: Duration) -> Self {
        Self::with_loader(init_timeout, || async {
            Ok(Arc::new(PdfExtractBackend) as Arc<dyn PdfBackend>)
        })
    }

    pub fn with_loader<F, Fut>(init_timeout: Duration, loader: F) -> Self
    where
        F: Fn() -> Fut + Send + Sync + 'static,
        Fut: std::future::Future<Output = Result<Arc<dyn PdfBackend>, ExtractError>>
            + Send
            + 'static,
    {
        Self {
            backend: OnceCell::new(),
            loader: Box::new(move || loader().boxed()),
            init_timeout,
        }
    }

    /// Runtime whose backend is ready immediately.
    pub fn with_backend(backend: impl PdfBackend) -> Self {
        let backend: Arc<dyn PdfBackend> = Arc::new(backend);
        Self {
            backend: OnceCell::new_with(Some(backend)),
            loader: Box::new(|| {
                async {
                    Err(ExtractError::BackendUnavailable {
                        message: "no loader configured".to_string(),
                    })
                }
                .boxed()
            }),
            init_timeout: DEFAULT_INIT_TIMEOUT,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.backend.initialized()
    }

    pub async fn backend(&self) -> Result<Arc<dyn PdfBackend>, ExtractError> {
        if let Some(backend) = self.backend.get() {
            return Ok(Arc::clone(backend));
        }

        let init = self.backend.get_or_try_init(|| (self.loader)());
        match tokio::time::timeout(self.init_timeout, init).await {
            Ok(Ok(backend)) => {
                debug!("PDF backend ready");
                Ok(Arc::clone(backend))
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(ExtractError::BackendUnavailable {
                message: format!("not ready after {:?}", self.init_timeout),
            }),
        }
    }
}

impl Default for PdfRuntime {
    fn default() -> Self {
        Self::new(DEFAULT_INIT_TIMEOUT)
    }
}

/// Placeholder used in place of a file that could not be extracted.
pub fn failure_placeholder(name: &str) -> String {
    format!("[Failed to parse file: {}]", name)
}

#[derive(Clone)]
pub struct Extractor {
    runtime: Arc<PdfRuntime>,
}

impl Extractor {
    pub fn new(runtime: Arc<PdfRuntime>) -> Self {
        Self { runtime }
    }

    pub fn runtime(&self) -> &Arc<PdfRuntime> {
        &self.runtime
    }

    /// Extract one attachment. Any failure fails the whole file.
    pub async fn extract(&self, attachment: &Attachment) -> Result<String, ExtractError> {
        let bytes = attachment.load_bytes().await?;
        let backend = self.runtime.backend().await?;
        let name = attachment.name.clone();

        let parsed = tokio::task::spawn_blocking(move || {
            let document = backend.open(&bytes)?;
            let mut pages = Vec::with_capacity(document.page_count());
            for page in 1..=document.page_count() {
                pages.push(document.page_text_items(page)?.join(" "));
            }
            Ok::<_, String>(pages.join("\n\n"))
        })
        .await;

        match parsed {
            Ok(Ok(text)) => {
                debug!(file = %name, chars = text.len(), "extracted attachment");
                Ok(text)
            }
            Ok(Err(message)) => Err(ExtractError::Parse { name, message }),
            Err(join_err) => Err(ExtractError::Parse {
                name,
                message: format!("parser aborted: {}", join_err),
            }),
        }
    }

    /// Extract every attachment concurrently. Failed files are replaced by
    /// their placeholder; segments keep the attachment order and are joined
    /// with a blank line.
    pub async fn extract_all(&self, attachments: &[Attachment]) -> String {
        let segments = join_all(attachments.iter().map(|attachment| async move {
            match self.extract(attachment).await {
                Ok(text) => text,
                Err(e) => {
                    warn!(file = %attachment.name, error = %e, "attachment extraction failed");
                    failure_placeholder(&attachment.name)
                }
            }
        }))
        .await;

        segments.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Treats the bytes as UTF-8: pages separated by `\x0c`, items by `|`.
    /// Documents starting with `BAD` fail to open, pages containing `!` fail.
    struct FakeBackend;

    struct FakeDocument {
        pages: Vec<String>,
    }

    impl PdfBackend for FakeBackend {
        fn open(&self, bytes: &[u8]) -> Result<Box<dyn PdfDocument>, String> {
            let text = String::from_utf8(bytes.to_vec()).map_err(|e| e.to_string())?;
            if text.starts_with("BAD") {
                return Err("invalid header".to_string());
            }
            Ok(Box::new(FakeDocument {
                pages: text.split('\x0c').map(str::to_string).collect(),
            }))
        }
    }

    impl PdfDocument for FakeDocument {
        fn page_count(&self) -> usize {
            self.pages.len()
        }

        fn page_text_items(&self, page: usize) -> Result<Vec<String>, String> {
            let text = &self.pages[page - 1];
            if text.contains('!') {
                return Err(format!("broken page {}", page));
            }
            Ok(text.split('|').map(str::to_string).collect())
        }
    }

    fn fake_extractor() -> Extractor {
        Extractor::new(Arc::new(PdfRuntime::with_backend(FakeBackend)))
    }

    fn doc(name: &str, body: &str) -> Attachment {
        Attachment::from_bytes(name, body.as_bytes().to_vec())
    }

    #[tokio::test]
    async fn test_extract_joins_items_and_pages() {
        let text = fake_extractor()
            .extract(&doc("a.pdf", "Hello|world\x0cSecond|page|here"))
            .await
            .unwrap();
        assert_eq!(text, "Hello world\n\nSecond page here");
    }

    #[tokio::test]
    async fn test_extract_page_failure_fails_whole_file() {
        let err = fake_extractor()
            .extract(&doc("b.pdf", "fine\x0cbroken!"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse { ref name, .. } if name == "b.pdf"));
    }

    #[tokio::test]
    async fn test_extract_all_replaces_failures_in_order() {
        let dir = tempfile::tempdir().unwrap();
        let missing = Attachment::from_path(dir.path().join("missing.pdf")).unwrap();

        let batch = vec![
            doc("one.pdf", "first"),
            doc("two.pdf", "BAD bytes"),
            doc("three.pdf", "third|doc"),
            missing,
        ];

        let combined = fake_extractor().extract_all(&batch).await;
        assert_eq!(
            combined,
            "first\n\n[Failed to parse file: two.pdf]\n\nthird doc\n\n[Failed to parse file: missing.pdf]"
        );
    }

    #[tokio::test]
    async fn test_extract_all_empty_batch() {
        assert_eq!(fake_extractor().extract_all(&[]).await, "");
    }

    #[tokio::test]
    async fn test_pdf_extract_backend_rejects_garbage() {
        let extractor = Extractor::new(Arc::new(PdfRuntime::default()));
        let err = extractor
            .extract(&doc("junk.pdf", "this is not a pdf"))
            .await
            .unwrap_err();
        assert!(matches!(err, ExtractError::Parse { ref name, .. } if name == "junk.pdf"));
    }

    /// Single page, Helvetica, one `Tj` operator. Offsets are computed so the
    /// xref table is valid.
    fn hello_world_pdf() -> Vec<u8> {
        let content = "BT /F1 24 Tf 72 720 Td (Hello World) Tj ET";
        let objects = [
            "<< /Type /Catalog /Pages 2 0 R >>".to_string(),
            "<< /Type /Pages /Kids [3 0 R] /Count 1 >>".to_string(),
            "<< /Type /Page /Parent 2 0 R /MediaBox [0 0 612 792] \
             /Resources << /Font << /F1 4 0 R >> >> /Contents 5 0 R >>"
                .to_string(),
            "<< /Type /Font /Subtype /Type1 /BaseFont /Helvetica /Encoding /WinAnsiEncoding >>"
                .to_string(),
            format!(
                "<< /Length {} >>\nstream\n{}\nendstream",
                content.len(),
                content
            ),
        ];

        let mut pdf = String::from("%PDF-1.4\n");
        let mut offsets = Vec::new();
        for (i, body) in objects.iter().enumerate() {
            offsets.push(pdf.len());
            pdf.push_str(&format!("{} 0 obj\n{}\nendobj\n", i + 1, body));
        }

        let xref_start = pdf.len();
        pdf.push_str(&format!("xref\n0 {}\n0000000000 65535 f \n", objects.len() + 1));
        for offset in offsets {
            pdf.push_str(&format!("{:010} 00000 n \n", offset));
        }
        pdf.push_str(&format!(
            "trailer\n<< /Size {} /Root 1 0 R >>\nstartxref\n{}\n%%EOF\n",
            objects.len() + 1,
            xref_start
        ));
        pdf.into_bytes()
    }

    #[test]
    fn test_extracted_pages_items_are_trimmed_lines() {
        let document = ExtractedPages {
            pages: vec!["  a \n\n b\n".to_string(), String::new()],
        };

        assert_eq!(document.page_count(), 2);
        assert_eq!(document.page_text_items(1).unwrap(), vec!["a", "b"]);
        assert!(document.page_text_items(2).unwrap().is_empty());
        assert!(document.page_text_items(0).is_err());
        assert!(document.page_text_items(3).is_err());
    }

    #[tokio::test]
    async fn test_pdf_extract_backend_reads_text() {
        let extractor = Extractor::new(Arc::new(PdfRuntime::default()));
        let text = extractor
            .extract(&Attachment::from_bytes("hello.pdf", hello_world_pdf()))
            .await
            .unwrap();

        assert!(text.contains("Hello"), "extracted: {:?}", text);
        assert!(text.contains("World"), "extracted: {:?}", text);
        assert!(extractor.runtime().is_ready());
    }

    #[tokio::test]
    async fn test_runtime_initializes_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let runtime = PdfRuntime::with_loader(Duration::from_secs(1), move || {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(Arc::new(FakeBackend) as Arc<dyn PdfBackend>) }
        });

        assert!(!runtime.is_ready());
        runtime.backend().await.unwrap();
        runtime.backend().await.unwrap();
        assert!(runtime.is_ready());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_runtime_times_out_then_retries() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let runtime = PdfRuntime::with_loader(Duration::from_millis(50), move || {
            let attempt = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if attempt == 0 {
                    tokio::time::sleep(Duration::from_secs(5)).await;
                }
                Ok(Arc::new(FakeBackend) as Arc<dyn PdfBackend>)
            }
        });

        let err = runtime.backend().await.err().unwrap();
        assert!(matches!(err, ExtractError::BackendUnavailable { .. }));
        assert!(!runtime.is_ready());

        runtime.backend().await.unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unavailable_backend_yields_placeholders() {
        let runtime = PdfRuntime::with_loader(Duration::from_secs(1), || async {
            Err(ExtractError::BackendUnavailable {
                message: "failed to load".to_string(),
            })
        });
        let extractor = Extractor::new(Arc::new(runtime));

        let combined = extractor
            .extract_all(&[doc("x.pdf", "x"), doc("y.pdf", "y")])
            .await;
        assert_eq!(
            combined,
            "[Failed to parse file: x.pdf]\n\n[Failed to parse file: y.pdf]"
        );
    }
}
