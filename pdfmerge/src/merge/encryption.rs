//! Password protection.
//!
//! Documents are encrypted with the standard security handler (RC4, 128-bit
//! key). The same password is used as user and owner password, and all
//! permissions are granted once the document is opened.

use lopdf::{Document, EncryptionState, EncryptionVersion, Object, Permissions, StringFormat};
use std::path::Path;
use tokio::task;

use crate::error::{MergeError, Result};
use crate::io::{PdfReader, PdfWriter};
use crate::merge::merger::collate;

/// Encryption key length in bits.
const KEY_LENGTH: usize = 128;

/// Encrypt `doc` in place with `password`.
///
/// A file identifier is added to the trailer when missing, since the
/// encryption key is derived from it.
pub fn apply_password(doc: &mut Document, password: &str) -> Result<()> {
    if doc.trailer.get(b"ID").is_err() {
        let id = uuid::Uuid::new_v4().as_bytes().to_vec();
        doc.trailer.set(
            "ID",
            Object::Array(vec![
                Object::String(id.clone(), StringFormat::Hexadecimal),
                Object::String(id, StringFormat::Hexadecimal),
            ]),
        );
    }

    let version = EncryptionVersion::V2 {
        document: &*doc,
        owner_password: password,
        user_password: password,
        key_length: KEY_LENGTH,
        permissions: Permissions::all(),
    };

    let state = EncryptionState::try_from(version)
        .map_err(|e| MergeError::encryption_failed(e.to_string()))?;

    doc.encrypt(&state)
        .map_err(|e| MergeError::encryption_failed(e.to_string()))
}

/// Re-encrypts an existing PDF file.
///
/// Used after external compression, which produces a fresh unprotected file.
#[derive(Debug, Clone, Default)]
pub struct Encryptor {
    reader: PdfReader,
    writer: PdfWriter,
}

impl Encryptor {
    /// Create a new encryptor.
    pub fn new() -> Self {
        Self::default()
    }

    /// Write a password-protected copy of `input` to `output`.
    ///
    /// `output` is written atomically; on failure it does not exist and
    /// `input` is untouched.
    pub async fn encrypt(&self, input: &Path, output: &Path, password: &str) -> Result<()> {
        let loaded = self.reader.load(input).await?;
        let password = password.to_owned();

        let document = task::spawn_blocking(move || {
            let mut doc = collate(vec![loaded.document])?;
            apply_password(&mut doc, &password)?;
            Ok::<_, MergeError>(doc)
        })
        .await??;

        let stats = self.writer.save(document, output).await?;
        tracing::debug!(
            input = %input.display(),
            output = %output.display(),
            size = %stats.format_file_size(),
            "Encrypted document"
        );

        Ok(())
    }
}
