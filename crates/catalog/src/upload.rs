use crate::{
    MAX_PHOTOS, MemoryStore, PhotoFile, PhotoRef, StoreError, UploadError, prepare_photo,
};

#[derive(Debug, Clone, PartialEq)]
pub struct FileFailure {
    pub file_name: String,
    pub error: UploadError,
}

/// Outcome of one upload batch. Failures never abort the batch.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BatchReport {
    /// Uploaded photos, numbered after the ones the draft already had.
    pub photos: Vec<PhotoRef>,
    pub failures: Vec<FileFailure>,
}

impl BatchReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Prepares and uploads `files` one at a time on behalf of `owner_id`.
///
/// `existing` is how many photos the draft already holds; once it plus the
/// accepted uploads reaches [`MAX_PHOTOS`], remaining files fail with
/// [`UploadError::LimitReached`]. A file that fails any step is reported and
/// skipped.
pub async fn upload_batch(
    store: &dyn MemoryStore,
    owner_id: &str,
    existing: usize,
    files: Vec<PhotoFile>,
) -> BatchReport {
    let mut report = BatchReport::default();

    for file in files {
        let file_name = file.file_name.clone();
        match upload_one(store, owner_id, existing + report.photos.len(), file).await {
            Ok(photo) => report.photos.push(photo),
            Err(error) => {
                tracing::warn!(file = %file_name, %error, "photo upload failed");
                report.failures.push(FileFailure { file_name, error });
            }
        }
    }

    tracing::info!(
        uploaded = report.photos.len(),
        failed = report.failures.len(),
        "photo batch finished"
    );
    report
}

async fn upload_one(
    store: &dyn MemoryStore,
    owner_id: &str,
    slot: usize,
    file: PhotoFile,
) -> Result<PhotoRef, UploadError> {
    if slot >= MAX_PHOTOS {
        return Err(UploadError::LimitReached { max: MAX_PHOTOS });
    }

    let prepared = prepare_photo(&file)?;
    let stored = store
        .upload_photo(owner_id.to_string(), prepared)
        .await
        .map_err(|err| match err {
            StoreError::Upload(err) => err,
            other => UploadError::Storage {
                file_name: file.file_name.clone(),
                reason: other.to_string(),
            },
        })?;

    Ok(PhotoRef {
        file_url: stored.file_url,
        thumbnail_url: stored.thumbnail_url,
        display_order: slot as u32,
    })
}

#[cfg(test)]
mod tests {
    use super::upload_batch;
    use crate::{InMemoryMemoryStore, PhotoFile, UploadError};
    use image::{DynamicImage, ImageFormat, RgbImage};
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn png_file(name: &str, shade: u8) -> PhotoFile {
        let img = RgbImage::from_pixel(40, 30, image::Rgb([shade, 100, 200]));
        let mut out = Cursor::new(Vec::new());
        DynamicImage::ImageRgb8(img)
            .write_to(&mut out, ImageFormat::Png)
            .unwrap();
        PhotoFile {
            file_name: name.to_string(),
            content_type: "image/png".to_string(),
            bytes: out.into_inner(),
        }
    }

    #[tokio::test]
    async fn eleventh_file_hits_the_limit() {
        let store = InMemoryMemoryStore::new();
        let files = (0..11).map(|i| png_file(&format!("p{i}.png"), i as u8)).collect();

        let report = upload_batch(&store, "u1", 0, files).await;

        assert_eq!(report.photos.len(), 10);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].file_name, "p10.png");
        assert_eq!(report.failures[0].error, UploadError::LimitReached { max: 10 });
        assert_eq!(
            report.photos.iter().map(|p| p.display_order).collect::<Vec<_>>(),
            (0..10).collect::<Vec<u32>>()
        );
        // Uploading photos never creates a memory.
        assert_eq!(store.row_count().await, 0);
    }

    #[tokio::test]
    async fn bad_file_is_skipped_and_the_rest_continue() {
        let store = InMemoryMemoryStore::new();
        let gif = PhotoFile {
            file_name: "anim.gif".to_string(),
            content_type: "image/gif".to_string(),
            bytes: vec![0; 8],
        };
        let files = vec![png_file("a.png", 1), gif, png_file("b.png", 2)];

        let report = upload_batch(&store, "u1", 0, files).await;

        assert_eq!(report.photos.len(), 2);
        assert!(!report.is_clean());
        assert!(matches!(
            report.failures[0].error,
            UploadError::UnsupportedType { .. }
        ));
        assert_eq!(report.photos[1].display_order, 1);
        assert!(report.photos.iter().all(|p| p.thumbnail_url.is_some()));
    }

    #[tokio::test]
    async fn existing_photos_count_toward_the_cap() {
        let store = InMemoryMemoryStore::new();
        let files = (0..3).map(|i| png_file(&format!("p{i}.png"), i)).collect();

        let report = upload_batch(&store, "u1", 8, files).await;

        assert_eq!(report.photos.len(), 2);
        assert_eq!(report.photos[0].display_order, 8);
        assert_eq!(report.failures.len(), 1);
    }
}
