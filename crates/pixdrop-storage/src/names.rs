//! Random filenames for stored images

use crate::traits::{Storage, StorageResult};
use pixdrop_core::constants::FILENAME_RANDOM_BYTES;
use pixdrop_core::ImageKind;

/// `<32 lowercase hex>.<ext>` built from fresh random bytes.
pub fn random_filename(kind: ImageKind) -> String {
    let random: [u8; FILENAME_RANDOM_BYTES] = rand::random();
    format!("{}.{}", hex::encode(random), kind.extension())
}

/// Pick a filename not yet present in `storage`, regenerating on collision.
pub async fn generate_filename(storage: &dyn Storage, kind: ImageKind) -> StorageResult<String> {
    loop {
        let filename = random_filename(kind);
        if !storage.exists(&filename).await? {
            return Ok(filename);
        }
        tracing::warn!(filename = %filename, "Generated filename already taken, retrying");
    }
}

/// Whether `name` has the shape of a file this service stores.
pub fn is_stored_filename(name: &str) -> bool {
    let Some((stem, extension)) = name.split_once('.') else {
        return false;
    };

    stem.len() == FILENAME_RANDOM_BYTES * 2
        && stem
            .bytes()
            .all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b))
        && ImageKind::ALL.iter().any(|kind| kind.extension() == extension)
}
