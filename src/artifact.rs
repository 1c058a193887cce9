//! Output artifacts: encoded chart images, the correlation CSV, and the
//! single-slot "last result" snapshot files written under the output
//! directory.

use std::io::Cursor;
use std::path::{Path, PathBuf};

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use crate::analysis::CorrelationRecord;
use crate::error::{ArtifactError, PlotError};

// ---------------------------------------------------------------------------
// Image format
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageFormat {
    #[default]
    Jpeg,
    Png,
}

impl ImageFormat {
    /// File extension, also used as the snapshot category directory.
    pub fn extension(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "jpg",
            ImageFormat::Png => "png",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ImageFormat::Jpeg => "image/jpeg",
            ImageFormat::Png => "image/png",
        }
    }

    fn encoder_format(self) -> image::ImageFormat {
        match self {
            ImageFormat::Jpeg => image::ImageFormat::Jpeg,
            ImageFormat::Png => image::ImageFormat::Png,
        }
    }
}

/// Encode a tightly packed RGB8 buffer.
pub fn encode_rgb(buf: Vec<u8>, width: u32, height: u32, format: ImageFormat) -> Result<Vec<u8>, PlotError> {
    let img = image::RgbImage::from_raw(width, height, buf)
        .ok_or_else(|| PlotError::Draw(format!("pixel buffer does not match {width}x{height}")))?;
    let mut out = Vec::new();
    image::DynamicImage::ImageRgb8(img).write_to(&mut Cursor::new(&mut out), format.encoder_format())?;
    Ok(out)
}

// ---------------------------------------------------------------------------
// RenderedArtifact
// ---------------------------------------------------------------------------

/// One rendered chart. Regenerated on every request, never cached.
#[derive(Debug, Clone)]
pub struct RenderedArtifact {
    pub format: ImageFormat,
    pub width: u32,
    pub height: u32,
    pub bytes: Vec<u8>,
    /// Where the snapshot copy was written, if persistence is enabled.
    pub persisted: Option<PathBuf>,
}

impl RenderedArtifact {
    pub fn base64(&self) -> String {
        STANDARD.encode(&self.bytes)
    }

    /// `data:` URI for inline `<img>` embedding and download links.
    pub fn data_uri(&self) -> String {
        format!("data:{};base64,{}", self.format.mime(), self.base64())
    }

    pub fn download_name(&self) -> String {
        format!("plot.{}", self.format.extension())
    }
}

// ---------------------------------------------------------------------------
// Correlation table text
// ---------------------------------------------------------------------------

/// CSV text with a `col1,col2,pearson,kendall,spearman` header.
pub fn records_to_csv(records: &[CorrelationRecord]) -> Result<String, ArtifactError> {
    let mut writer = csv::Writer::from_writer(Vec::new());
    if records.is_empty() {
        writer.write_record(["col1", "col2", "pearson", "kendall", "spearman"])?;
    }
    for record in records {
        writer.serialize(record)?;
    }
    let bytes = writer.into_inner().map_err(|e| ArtifactError::Io {
        path: "<memory>".into(),
        source: e.into_error(),
    })?;
    Ok(String::from_utf8_lossy(&bytes).into_owned())
}

// ---------------------------------------------------------------------------
// Snapshot store
// ---------------------------------------------------------------------------

/// Writes the latest result of each category to a fixed file name.
/// Not versioned: every call overwrites the previous file (last write wins).
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    root: PathBuf,
    enabled: bool,
}

impl ArtifactStore {
    pub fn new(root: impl Into<PathBuf>, enabled: bool) -> Self {
        ArtifactStore {
            root: root.into(),
            enabled,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// `<root>/csv/corr.csv`
    pub fn save_correlation_csv(&self, csv_text: &str) -> Result<Option<PathBuf>, ArtifactError> {
        self.write("csv", "corr.csv", csv_text.as_bytes())
    }

    /// `<root>/<ext>/current.<ext>`
    pub fn save_chart(&self, artifact: &RenderedArtifact) -> Result<Option<PathBuf>, ArtifactError> {
        let ext = artifact.format.extension();
        self.write(ext, &format!("current.{ext}"), &artifact.bytes)
    }

    fn write(&self, category: &str, file_name: &str, bytes: &[u8]) -> Result<Option<PathBuf>, ArtifactError> {
        if !self.enabled {
            return Ok(None);
        }
        let dir = self.root.join(category);
        std::fs::create_dir_all(&dir).map_err(|source| ArtifactError::Io {
            path: dir.display().to_string(),
            source,
        })?;
        let path = dir.join(file_name);
        std::fs::write(&path, bytes).map_err(|source| ArtifactError::Io {
            path: path.display().to_string(),
            source,
        })?;
        log::debug!("wrote {} bytes to {}", bytes.len(), path.display());
        Ok(Some(path))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(a: &str, b: &str, pearson: f64, kendall: Option<f64>) -> CorrelationRecord {
        CorrelationRecord {
            column_a: a.into(),
            column_b: b.into(),
            pearson: Some(pearson),
            kendall,
            spearman: Some(pearson),
        }
    }

    #[test]
    fn csv_has_header_and_empty_absent_fields() {
        let text = records_to_csv(&[record("y", "x", 0.5, None)]).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some("col1,col2,pearson,kendall,spearman"));
        assert_eq!(lines.next(), Some("y,x,0.5,,0.5"));
        assert_eq!(lines.next(), None);
    }

    #[test]
    fn empty_table_still_has_header() {
        assert_eq!(
            records_to_csv(&[]).unwrap().trim_end(),
            "col1,col2,pearson,kendall,spearman"
        );
    }

    #[test]
    fn encode_png_roundtrip_dimensions() {
        let bytes = encode_rgb(vec![255; 4 * 3 * 3], 4, 3, ImageFormat::Png).unwrap();
        let decoded = image::load_from_memory(&bytes).unwrap();
        assert_eq!((decoded.width(), decoded.height()), (4, 3));
    }

    #[test]
    fn encode_rejects_short_buffer() {
        assert!(encode_rgb(vec![0; 5], 4, 3, ImageFormat::Jpeg).is_err());
    }

    #[test]
    fn store_overwrites_fixed_names() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path(), true);

        let first = store.save_correlation_csv("a\n").unwrap().unwrap();
        let second = store.save_correlation_csv("b\n").unwrap().unwrap();
        assert_eq!(first, second);
        assert_eq!(first, dir.path().join("csv").join("corr.csv"));
        assert_eq!(std::fs::read_to_string(&second).unwrap(), "b\n");

        let chart = RenderedArtifact {
            format: ImageFormat::Jpeg,
            width: 1,
            height: 1,
            bytes: vec![1, 2, 3],
            persisted: None,
        };
        let path = store.save_chart(&chart).unwrap().unwrap();
        assert_eq!(path, dir.path().join("jpg").join("current.jpg"));
    }

    #[test]
    fn disabled_store_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let store = ArtifactStore::new(dir.path().join("out"), false);
        assert_eq!(store.save_correlation_csv("x").unwrap(), None);
        assert!(!dir.path().join("out").exists());
    }

    #[test]
    fn data_uri_uses_mime() {
        let chart = RenderedArtifact {
            format: ImageFormat::Png,
            width: 1,
            height: 1,
            bytes: b"abc".to_vec(),
            persisted: None,
        };
        assert_eq!(chart.data_uri(), "data:image/png;base64,YWJj");
        assert_eq!(chart.download_name(), "plot.png");
    }
}
