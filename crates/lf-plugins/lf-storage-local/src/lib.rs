//! # lf-storage-local
//! lost-found/crates/lf-plugins/lf-storage-local/src/lib.rs
//! Local filesystem implementation of `BlobStore` for report photos.
//! Features: directory sharding, content-type checks and WebP thumbnails.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use anyhow::{anyhow, bail, Context};
use async_trait::async_trait;
use image::{DynamicImage, ImageFormat, ImageReader};
use lf_core::traits::BlobStore;
use log::{debug, info};
use tokio::fs;
use uuid::Uuid;

/// Longest edge of a generated thumbnail, in pixels.
const THUMBNAIL_EDGE: u32 = 250;

/// Accepted upload types and the file extension each is stored under.
const ALLOWED_TYPES: [(&str, &str); 4] = [
    ("image/jpeg", "jpg"),
    ("image/png", "png"),
    ("image/webp", "webp"),
    ("image/gif", "gif"),
];

pub struct LocalBlobStore {
    /// Root directory for all uploads (e.g., "./data/uploads")
    root_path: PathBuf,
    /// Public URL prefix (e.g., "/media")
    url_prefix: String,
}

/// A parsed `<32 hex>.<ext>` reference. Anything else is refused so a
/// reference can never point outside the root directory.
struct BlobName<'a> {
    stem: &'a str,
    file_name: &'a str,
}

impl<'a> BlobName<'a> {
    fn parse(reference: &'a str) -> anyhow::Result<Self> {
        let (stem, ext) = reference
            .split_once('.')
            .ok_or_else(|| anyhow!("malformed blob reference '{reference}'"))?;
        let stem_ok = stem.len() == 32 && stem.bytes().all(|b| b.is_ascii_digit() || (b'a'..=b'f').contains(&b));
        let ext_ok = ALLOWED_TYPES.iter().any(|(_, e)| *e == ext);
        if !stem_ok || !ext_ok {
            bail!("malformed blob reference '{reference}'");
        }
        Ok(Self { stem, file_name: reference })
    }

    /// "ab/cd" from the first four characters of the stem.
    fn shard(&self) -> String {
        format!("{}/{}", &self.stem[0..2], &self.stem[2..4])
    }

    fn thumbnail_name(&self) -> String {
        format!("thumb_{}.webp", self.stem)
    }
}

impl LocalBlobStore {
    pub fn new(root: PathBuf, url_prefix: String) -> Self {
        Self {
            root_path: root,
            url_prefix: url_prefix.trim_end_matches('/').to_string(),
        }
    }

    /// Generates a sharded directory: "<root>/ab/cd"
    fn shard_dir(&self, name: &BlobName<'_>) -> PathBuf {
        let mut path = self.root_path.clone();
        path.push(&name.stem[0..2]);
        path.push(&name.stem[2..4]);
        path
    }

    pub fn path_of(&self, reference: &str) -> anyhow::Result<PathBuf> {
        let name = BlobName::parse(reference)?;
        Ok(self.shard_dir(&name).join(name.file_name))
    }

    pub fn thumbnail_path_of(&self, reference: &str) -> anyhow::Result<PathBuf> {
        let name = BlobName::parse(reference)?;
        Ok(self.shard_dir(&name).join(name.thumbnail_name()))
    }
}

#[async_trait]
impl BlobStore for LocalBlobStore {
    /// Decodes the image, then writes the original and a WebP thumbnail.
    /// Nothing touches the disk unless the bytes decode.
    async fn upload(&self, data: Vec<u8>, content_type: &str) -> anyhow::Result<String> {
        let ext = ALLOWED_TYPES
            .iter()
            .find(|(mime, _)| *mime == content_type)
            .map(|(_, ext)| *ext)
            .ok_or_else(|| anyhow!("unsupported content type '{content_type}'"))?;

        let thumbnail = render_thumbnail(&data).context("upload is not a readable image")?;

        let reference = format!("{}.{}", Uuid::new_v4().simple(), ext);
        let name = BlobName::parse(&reference)?;
        let dir = self.shard_dir(&name);
        fs::create_dir_all(&dir).await?;

        fs::write(dir.join(name.file_name), &data).await?;
        fs::write(dir.join(name.thumbnail_name()), thumbnail).await?;

        info!("stored blob {} ({} bytes)", reference, data.len());
        Ok(reference)
    }

    async fn delete(&self, reference: &str) -> anyhow::Result<()> {
        let name = BlobName::parse(reference)?;
        let dir = self.shard_dir(&name);

        fs::remove_file(dir.join(name.file_name))
            .await
            .with_context(|| format!("could not delete blob {reference}"))?;
        remove_if_present(&dir.join(name.thumbnail_name())).await?;

        debug!("deleted blob {}", reference);
        Ok(())
    }

    fn url(&self, reference: &str) -> String {
        match BlobName::parse(reference) {
            Ok(name) => format!("{}/{}/{}", self.url_prefix, name.shard(), name.file_name),
            Err(_) => String::new(),
        }
    }

    /// Empty for a malformed reference, like `url`.
    fn thumbnail_url(&self, reference: &str) -> String {
        match BlobName::parse(reference) {
            Ok(name) => format!("{}/{}/{}", self.url_prefix, name.shard(), name.thumbnail_name()),
            Err(_) => String::new(),
        }
    }
}

/// Internal helper to produce a WebP thumbnail of at most 250px per edge.
fn render_thumbnail(data: &[u8]) -> anyhow::Result<Vec<u8>> {
    let img = ImageReader::new(Cursor::new(data))
        .with_guessed_format()?
        .decode()?;

    // The WebP encoder only takes 8-bit RGB(A).
    let thumb = DynamicImage::ImageRgba8(img.thumbnail(THUMBNAIL_EDGE, THUMBNAIL_EDGE).to_rgba8());
    let mut out = Vec::new();
    thumb.write_to(&mut Cursor::new(&mut out), ImageFormat::WebP)?;
    Ok(out)
}

async fn remove_if_present(path: &Path) -> anyhow::Result<()> {
    match fs::remove_file(path).await {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
        Err(e) => Err(e.into()),
    }
}
