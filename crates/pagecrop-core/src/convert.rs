//! CAD drawing to PDF conversion
//!
//! Conversion is delegated to an external command. The engine never sees
//! drawing files; callers convert first and hand the resulting PDF bytes to
//! the transform like any other upload.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, Output};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::error::PageCropError;

/// Default argument template, following the ODA File Converter convention:
/// input folder, output folder, output version, output type, recurse, audit
pub const ODA_ARGS: &[&str] = &["{input_dir}", "{output_dir}", "ACAD2018", "PDF", "1", "1"];

/// Drawing formats accepted for conversion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DrawingFormat {
    Dwg,
    Dxf,
}

impl DrawingFormat {
    pub fn extension(self) -> &'static str {
        match self {
            DrawingFormat::Dwg => "dwg",
            DrawingFormat::Dxf => "dxf",
        }
    }

    /// Match a file extension, case-insensitively
    pub fn from_extension(ext: &str) -> Option<Self> {
        match ext.trim_start_matches('.').to_ascii_lowercase().as_str() {
            "dwg" => Some(DrawingFormat::Dwg),
            "dxf" => Some(DrawingFormat::Dxf),
            _ => None,
        }
    }
}

/// Bytes in one drawing format in, PDF bytes out
pub trait FormatConverter: Send + Sync {
    fn convert(&self, input: &[u8], format: DrawingFormat) -> Result<Vec<u8>, PageCropError>;
}

/// Converter backed by an external program and an argument template.
///
/// Placeholders expanded in each argument: `{input}` (path of the drawing),
/// `{input_dir}`, `{output_dir}` and `{stem}` (file name without extension).
#[derive(Debug, Clone)]
pub struct CommandConverter {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl Default for CommandConverter {
    fn default() -> Self {
        Self {
            program: PathBuf::from("ODAFileConverter"),
            args: ODA_ARGS.iter().map(|s| s.to_string()).collect(),
        }
    }
}

impl CommandConverter {
    pub fn new(program: impl Into<PathBuf>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
        }
    }

    fn expand_args(&self, input: &Path, input_dir: &Path, output_dir: &Path, stem: &str) -> Vec<String> {
        self.args
            .iter()
            .map(|arg| {
                arg.replace("{input_dir}", &input_dir.to_string_lossy())
                    .replace("{output_dir}", &output_dir.to_string_lossy())
                    .replace("{input}", &input.to_string_lossy())
                    .replace("{stem}", stem)
            })
            .collect()
    }
}

impl FormatConverter for CommandConverter {
    fn convert(&self, input: &[u8], format: DrawingFormat) -> Result<Vec<u8>, PageCropError> {
        let workspace = tempfile::tempdir().map_err(|e| {
            PageCropError::ConversionFailure(format!("Failed to create temp dir: {}", e))
        })?;
        let input_dir = workspace.path().join("in");
        let output_dir = workspace.path().join("out");
        let stem = "drawing";
        let input_path = input_dir.join(format!("{}.{}", stem, format.extension()));

        fs::create_dir_all(&input_dir)
            .and_then(|_| fs::create_dir_all(&output_dir))
            .and_then(|_| fs::write(&input_path, input))
            .map_err(|e| PageCropError::ConversionFailure(format!("Failed to stage input: {}", e)))?;

        let args = self.expand_args(&input_path, &input_dir, &output_dir, stem);
        info!(
            "Converting {} bytes of {} with {}",
            input.len(),
            format.extension(),
            self.program.display()
        );
        let output = run_tool(&self.program, &args).map_err(PageCropError::ConversionFailure)?;

        let pdf_path = find_pdf(&output_dir, stem).ok_or_else(|| {
            PageCropError::ConversionFailure(format!(
                "Output PDF not found{}",
                diagnostics_suffix(&output)
            ))
        })?;
        debug!("Conversion produced {}", pdf_path.display());

        fs::read(&pdf_path).map_err(|e| {
            PageCropError::ConversionFailure(format!("Failed to read converted PDF: {}", e))
        })
    }
}

/// Run an external tool, failing on spawn errors and non-zero exit.
///
/// The error string carries the tool's own diagnostics.
pub(crate) fn run_tool(program: &Path, args: &[String]) -> Result<Output, String> {
    let output = Command::new(program).args(args).output().map_err(|e| {
        if e.kind() == io::ErrorKind::NotFound {
            format!(
                "{} not found. Please make sure it is installed and on PATH",
                program.display()
            )
        } else {
            format!("Failed to run {}: {}", program.display(), e)
        }
    })?;

    if !output.status.success() {
        warn!("{} exited with {}", program.display(), output.status);
        return Err(format!(
            "{} exited with {}{}",
            program.display(),
            output.status,
            diagnostics_suffix(&output)
        ));
    }

    Ok(output)
}

/// Raw tool output, preferring stderr
fn diagnostics_suffix(output: &Output) -> String {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    let text = if stderr.trim().is_empty() {
        stdout.trim()
    } else {
        stderr.trim()
    };
    if text.is_empty() {
        String::new()
    } else {
        format!(": {}", text)
    }
}

/// `<stem>.pdf` if present, otherwise the first PDF in `dir`
fn find_pdf(dir: &Path, stem: &str) -> Option<PathBuf> {
    let expected = dir.join(format!("{}.pdf", stem));
    if expected.is_file() {
        return Some(expected);
    }

    let mut candidates: Vec<PathBuf> = fs::read_dir(dir)
        .ok()?
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| {
            path.is_file()
                && path
                    .extension()
                    .map(|ext| ext.eq_ignore_ascii_case("pdf"))
                    .unwrap_or(false)
        })
        .collect();
    candidates.sort();
    candidates.into_iter().next()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_from_extension() {
        assert_eq!(DrawingFormat::from_extension("dwg"), Some(DrawingFormat::Dwg));
        assert_eq!(DrawingFormat::from_extension(".DXF"), Some(DrawingFormat::Dxf));
        assert_eq!(DrawingFormat::from_extension("pdf"), None);
    }

    #[test]
    fn test_default_uses_oda_template() {
        let converter = CommandConverter::default();
        let args = converter.expand_args(
            Path::new("/tmp/in/drawing.dwg"),
            Path::new("/tmp/in"),
            Path::new("/tmp/out"),
            "drawing",
        );
        assert_eq!(args, vec!["/tmp/in", "/tmp/out", "ACAD2018", "PDF", "1", "1"]);
    }

    #[test]
    fn test_missing_program_reports_not_found() {
        let converter = CommandConverter::new("definitely-not-a-real-converter", vec![]);
        let err = converter.convert(b"drawing", DrawingFormat::Dwg).unwrap_err();
        match err {
            PageCropError::ConversionFailure(msg) => assert!(msg.contains("not found")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_nonzero_exit_carries_diagnostics() {
        let converter = CommandConverter::new(
            "sh",
            vec!["-c".to_string(), "echo 'bad drawing header' >&2; exit 3".to_string()],
        );
        let err = converter.convert(b"drawing", DrawingFormat::Dxf).unwrap_err();
        match err {
            PageCropError::ConversionFailure(msg) => {
                assert!(msg.contains("bad drawing header"), "message was: {}", msg);
            }
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_missing_output_is_failure() {
        let converter = CommandConverter::new("sh", vec!["-c".to_string(), "true".to_string()]);
        let err = converter.convert(b"drawing", DrawingFormat::Dwg).unwrap_err();
        match err {
            PageCropError::ConversionFailure(msg) => assert!(msg.contains("not found")),
            other => panic!("unexpected error: {}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_reads_converted_output() {
        let converter = CommandConverter::new(
            "sh",
            vec![
                "-c".to_string(),
                "cp \"$0\" \"$1/$2.pdf\"".to_string(),
                "{input}".to_string(),
                "{output_dir}".to_string(),
                "{stem}".to_string(),
            ],
        );
        let output = converter.convert(b"%PDF-1.7 fake", DrawingFormat::Dwg).unwrap();
        assert_eq!(output, b"%PDF-1.7 fake".to_vec());
    }

    #[test]
    fn test_find_pdf_falls_back_to_any_pdf() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("other.PDF"), b"%PDF").unwrap();
        let found = find_pdf(dir.path(), "drawing").unwrap();
        assert_eq!(found.file_name().unwrap(), "other.PDF");
    }
}
