use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use plotters::style::{register_font, FontStyle};

/// Family name every chart text style asks for.
pub const FONT_FAMILY: &str = "sans-serif";

/// Probed in order when no font is configured.
const SYSTEM_FONTS: &[&str] = &[
    "/usr/share/fonts/truetype/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/dejavu/DejaVuSans.ttf",
    "/usr/share/fonts/TTF/DejaVuSans.ttf",
    "/usr/share/fonts/truetype/liberation/LiberationSans-Regular.ttf",
    "/usr/share/fonts/liberation/LiberationSans-Regular.ttf",
    "/System/Library/Fonts/Supplemental/Arial.ttf",
    "/Library/Fonts/Arial.ttf",
    "C:\\Windows\\Fonts\\arial.ttf",
];

static INSTALLED: OnceLock<Option<PathBuf>> = OnceLock::new();

/// Register the chart font once per process and return the file it came from.
///
/// Without a font the renderer still draws every series; only text (title,
/// axis labels, tick labels, legend) is skipped.
pub fn install(configured: Option<&Path>) -> Option<&'static Path> {
    INSTALLED
        .get_or_init(|| {
            let candidates = configured
                .map(Path::to_path_buf)
                .into_iter()
                .chain(SYSTEM_FONTS.iter().map(PathBuf::from));
            for path in candidates {
                match try_register(&path) {
                    Ok(()) => {
                        log::info!("Chart font: {}", path.display());
                        return Some(path);
                    }
                    Err(e) => log::debug!("font {} unusable: {e}", path.display()),
                }
            }
            log::warn!("No usable font found; charts will render without text");
            None
        })
        .as_deref()
}

fn try_register(path: &Path) -> Result<(), String> {
    let bytes = std::fs::read(path).map_err(|e| e.to_string())?;
    // plotters keeps registered fonts for the life of the process.
    let bytes: &'static [u8] = Box::leak(bytes.into_boxed_slice());
    register_font(FONT_FAMILY, FontStyle::Normal, bytes)
        .map_err(|_| "not a usable TrueType/OpenType font".to_string())
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn garbage_font_file_is_rejected_with_a_message() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(b"definitely not a font").unwrap();
        let err = try_register(file.path()).unwrap_err();
        assert!(err.contains("not a usable"), "{err}");
    }

    #[test]
    fn missing_font_file_is_rejected() {
        assert!(try_register(Path::new("/no/such/font.ttf")).is_err());
    }
}
