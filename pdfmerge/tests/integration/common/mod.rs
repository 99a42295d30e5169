//! Shared helpers for the integration tests.
//!
//! Test documents are generated on the fly: every page draws a single text
//! label, which lets tests check page order after a merge.

#![allow(dead_code)]

use lopdf::content::{Content, Operation};
use lopdf::{
    Dictionary, Document, EncryptionState, EncryptionVersion, Object, Permissions, Stream,
    StringFormat, dictionary,
};
use pdfmerge::config::{CompressorConfig, MergeForm, MergeOptions, ServiceConfig};
use pdfmerge::io::Upload;
use pdfmerge::pipeline::MergeService;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// Build a PDF with `pages` pages labelled `"{label}-1"`, `"{label}-2"`, ...
pub fn pdf_bytes(label: &str, pages: usize) -> Vec<u8> {
    let mut bytes = Vec::new();
    pdf_document(label, pages)
        .save_to(&mut bytes)
        .expect("test pdf serialises");
    bytes
}

/// Like [`pdf_bytes`], but protected with separate user and owner passwords.
pub fn encrypted_pdf_bytes(label: &str, pages: usize, user_password: &str, owner_password: &str) -> Vec<u8> {
    let mut doc = pdf_document(label, pages);
    let id = b"fedcba9876543210".to_vec();
    doc.trailer.set(
        "ID",
        Object::Array(vec![
            Object::String(id.clone(), StringFormat::Hexadecimal),
            Object::String(id, StringFormat::Hexadecimal),
        ]),
    );

    let version = EncryptionVersion::V2 {
        document: &doc,
        owner_password,
        user_password,
        key_length: 128,
        permissions: Permissions::all(),
    };
    let state = EncryptionState::try_from(version).expect("encryption state");
    doc.encrypt(&state).expect("test pdf encrypts");

    let mut bytes = Vec::new();
    doc.save_to(&mut bytes).expect("test pdf serialises");
    bytes
}

fn pdf_document(label: &str, pages: usize) -> Document {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();
    let font_id = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Courier",
    });

    let mut kids: Vec<Object> = Vec::new();
    for n in 1..=pages {
        let content = Content {
            operations: vec![
                Operation::new("BT", vec![]),
                Operation::new("Tf", vec!["F1".into(), 24.into()]),
                Operation::new("Td", vec![100.into(), 600.into()]),
                Operation::new("Tj", vec![Object::string_literal(format!("{label}-{n}"))]),
                Operation::new("ET", vec![]),
            ],
        };
        let content_id = doc.add_object(Stream::new(
            Dictionary::new(),
            content.encode().expect("content encodes"),
        ));
        let page_id = doc.add_object(dictionary! {
            "Type" => "Page",
            "Parent" => pages_id,
            "Contents" => content_id,
            "MediaBox" => vec![0.into(), 0.into(), 612.into(), 792.into()],
            "Resources" => dictionary! {
                "Font" => dictionary! { "F1" => font_id },
            },
        });
        kids.push(page_id.into());
    }

    doc.objects.insert(
        pages_id,
        Object::Dictionary(dictionary! {
            "Type" => "Pages",
            "Kids" => kids,
            "Count" => pages as i64,
        }),
    );
    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    doc
}

/// An upload carrying a generated PDF.
pub fn pdf_upload(name: &str, label: &str, pages: usize) -> Upload {
    Upload::new(name, pdf_bytes(label, pages))
}

/// Text label of every page, in page order.
pub fn page_labels(doc: &Document) -> Vec<String> {
    doc.get_pages()
        .into_values()
        .map(|page_id| {
            let bytes = doc.get_page_content(page_id).unwrap_or_default();
            let text = String::from_utf8_lossy(&bytes);
            match (text.find('('), text.rfind(')')) {
                (Some(start), Some(end)) if start < end => text[start + 1..end].to_string(),
                _ => String::new(),
            }
        })
        .collect()
}

/// Whether the raw bytes of a PDF declare an encryption dictionary.
pub fn is_encrypted_bytes(bytes: &[u8]) -> bool {
    bytes.windows(b"/Encrypt".len()).any(|w| w == b"/Encrypt")
}

/// Parse form values the way the HTTP layer does.
pub fn options(compress: Option<&str>, quality: Option<&str>, password: Option<&str>) -> MergeOptions {
    MergeOptions::from_form(&MergeForm {
        compress: compress.map(str::to_string),
        quality: quality.map(str::to_string),
        password: password.map(str::to_string),
    })
    .expect("valid options")
}

/// Isolated service: workspaces go to a private root, the compressor is only
/// looked up in a private tool directory.
pub struct TestService {
    pub root: TempDir,
    pub tools: TempDir,
    pub service: Arc<MergeService>,
}

impl TestService {
    pub fn new() -> Self {
        Self::with_config(|_| {})
    }

    pub fn with_config(adjust: impl FnOnce(&mut ServiceConfig)) -> Self {
        let root = TempDir::new().expect("workspace root");
        let tools = TempDir::new().expect("tool dir");

        let mut config = ServiceConfig {
            compressor: CompressorConfig {
                search_path: Some(vec![tools.path().to_path_buf()]),
                timeout: Some(Duration::from_secs(10)),
                ..Default::default()
            },
            workspace_root: Some(root.path().to_path_buf()),
            ..Default::default()
        };
        adjust(&mut config);

        Self {
            service: Arc::new(MergeService::new(config)),
            root,
            tools,
        }
    }

    /// Number of workspaces currently on disk.
    pub fn workspaces_left(&self) -> usize {
        std::fs::read_dir(self.root.path()).map(|d| d.count()).unwrap_or(0)
    }

    /// Install an executable `gs` script in the tool directory.
    #[cfg(unix)]
    pub fn install_tool(&self, script: &str) {
        use std::os::unix::fs::PermissionsExt;

        let path = self.tools.path().join("gs");
        std::fs::write(&path, script).expect("write tool");
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).expect("chmod tool");
    }
}

/// Load an unprotected merged file.
pub fn load(path: &Path) -> Document {
    Document::load(path).expect("loads")
}

/// Whether `path` opens with `password`.
pub fn opens_with(path: &Path, password: &str) -> bool {
    Document::load(path).is_ok_and(|doc| doc.authenticate_password(password).is_ok())
}

/// Assert that a merged file is protected by `password` and does not carry
/// `plaintext` in clear.
pub fn assert_locked(path: &Path, password: &str, plaintext: &str) {
    assert!(opens_with(path, password), "does not open with {password:?}");
    assert!(!opens_with(path, ""), "opens with the empty password");
    assert!(!opens_with(path, "wrong"), "opens with a wrong password");

    let pages = Document::load(path).map(|doc| doc.get_pages().len()).unwrap_or(0);
    assert_eq!(pages, 0, "pages readable without the password");

    let bytes = std::fs::read(path).expect("read merged file");
    assert!(is_encrypted_bytes(&bytes));
    let needle = plaintext.as_bytes();
    assert!(!bytes.windows(needle.len()).any(|w| w == needle), "{plaintext:?} in clear text");
}
