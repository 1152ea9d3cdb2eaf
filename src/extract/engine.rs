//! OCR engine abstraction and the Tesseract backend.
//!
//! Recognition runs in an external process per invocation, so engine
//! state never crosses worker boundaries and a CPU retry stays safe
//! after a GPU failure elsewhere. Device preference is re-evaluated per
//! attempt rather than cached: a GPU can fail mid-document (OOM) and the
//! remaining pages must keep flowing on CPU.

use std::path::Path;
use std::process::Command;

use thiserror::Error;

/// Errors from a single recognition attempt.
#[derive(Debug, Error)]
pub enum OcrError {
    /// Recognition failed; retryable once on CPU if it happened on GPU.
    #[error("recognition failed: {0}")]
    Recognition(String),

    /// The backend cannot run at all (binary or model missing).
    #[error("OCR engine unavailable: {0}")]
    EngineUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl OcrError {
    /// Whether the scheduler may retry this failure on CPU.
    pub fn is_retryable(&self) -> bool {
        matches!(self, OcrError::Recognition(_))
    }
}

/// Compute device for a recognition attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Device {
    Gpu,
    Cpu,
}

impl std::fmt::Display for Device {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Device::Gpu => write!(f, "gpu"),
            Device::Cpu => write!(f, "cpu"),
        }
    }
}

/// Check whether a CUDA GPU is usable on this machine.
pub fn gpu_available() -> bool {
    if which::which("nvidia-smi").is_err() {
        return false;
    }
    Command::new("nvidia-smi")
        .arg("-L")
        .output()
        .map(|o| o.status.success())
        .unwrap_or(false)
}

/// A text recognizer over a single raster image.
pub trait OcrEngine: Send + Sync {
    /// Recognize text in one image. Output is the engine's word sequence
    /// joined by single spaces, in native reading order.
    fn recognize(&self, image: &Path, device: Device) -> Result<String, OcrError>;

    /// Whether this engine can run on a GPU at all.
    fn supports_gpu(&self) -> bool {
        false
    }

    /// Whether a GPU is currently usable for this engine.
    fn gpu_ready(&self) -> bool {
        gpu_available()
    }

    /// Whether the engine can run at all (binaries, models installed).
    fn is_available(&self) -> bool {
        true
    }
}

/// Select the device for one recognition attempt.
///
/// Called before every attempt, never cached.
pub fn select_device(engine: &dyn OcrEngine, force_cpu: bool) -> Device {
    if !force_cpu && engine.supports_gpu() && engine.gpu_ready() {
        Device::Gpu
    } else {
        Device::Cpu
    }
}

/// Tesseract OCR via the command-line binary.
///
/// Uses TSV output so the result is a clean word sequence rather than
/// tesseract's layout-formatted text.
pub struct TesseractEngine {
    languages: Vec<String>,
}

impl TesseractEngine {
    pub fn new(languages: Vec<String>) -> Self {
        let languages = if languages.is_empty() {
            vec!["eng".to_string()]
        } else {
            languages
        };
        Self { languages }
    }

    /// Tesseract language argument, e.g. `por+eng`.
    fn lang_arg(&self) -> String {
        self.languages.join("+")
    }

    /// Extract the word column from tesseract TSV output.
    ///
    /// Word rows are level 5; rows with negative confidence are layout
    /// placeholders, not recognized words.
    fn words_from_tsv(tsv: &str) -> String {
        let mut words = Vec::new();
        for line in tsv.lines().skip(1) {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() != 12 {
                continue;
            }
            let is_word = fields[0] == "5";
            let confident = fields[10].parse::<f32>().map(|c| c >= 0.0).unwrap_or(false);
            let text = fields[11].trim();
            if is_word && confident && !text.is_empty() {
                words.push(text);
            }
        }
        words.join(" ")
    }
}

impl OcrEngine for TesseractEngine {
    fn recognize(&self, image: &Path, _device: Device) -> Result<String, OcrError> {
        let output = Command::new("tesseract")
            .arg(image)
            .arg("stdout")
            .args(["-l", &self.lang_arg()])
            .arg("tsv")
            .output();

        match output {
            Ok(output) => {
                if output.status.success() {
                    let tsv = String::from_utf8_lossy(&output.stdout);
                    Ok(Self::words_from_tsv(&tsv))
                } else {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    Err(OcrError::Recognition(format!(
                        "tesseract failed: {}",
                        stderr.trim()
                    )))
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(OcrError::EngineUnavailable(
                "tesseract not found (install tesseract-ocr)".to_string(),
            )),
            Err(e) => Err(OcrError::Io(e)),
        }
    }

    // Tesseract is CPU-only; the GPU path is exercised by GPU-capable
    // engines behind the same trait.
    fn supports_gpu(&self) -> bool {
        false
    }

    fn is_available(&self) -> bool {
        which::which("tesseract").is_ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_words_from_tsv() {
        let tsv = "level\tpage_num\tblock_num\tpar_num\tline_num\tword_num\tleft\ttop\twidth\theight\tconf\ttext\n\
                   1\t1\t0\t0\t0\t0\t0\t0\t600\t800\t-1\t\n\
                   5\t1\t1\t1\t1\t1\t10\t10\t50\t20\t96.5\tHello\n\
                   5\t1\t1\t1\t1\t2\t70\t10\t50\t20\t92.1\tWorld\n\
                   4\t1\t1\t1\t1\t0\t10\t10\t110\t20\t-1\t\n";
        assert_eq!(TesseractEngine::words_from_tsv(tsv), "Hello World");
    }

    #[test]
    fn test_words_from_tsv_skips_unconfident_rows() {
        let tsv = "header\n5\t1\t1\t1\t1\t1\t0\t0\t1\t1\t-1\tghost\n\
                   5\t1\t1\t1\t1\t2\t0\t0\t1\t1\t88.0\treal\n";
        assert_eq!(TesseractEngine::words_from_tsv(tsv), "real");
    }

    #[test]
    fn test_lang_arg() {
        let engine = TesseractEngine::new(vec!["por".into(), "eng".into()]);
        assert_eq!(engine.lang_arg(), "por+eng");

        let fallback = TesseractEngine::new(Vec::new());
        assert_eq!(fallback.lang_arg(), "eng");
    }

    #[test]
    fn test_select_device_forced_cpu() {
        struct GpuEngine;
        impl OcrEngine for GpuEngine {
            fn recognize(&self, _: &Path, _: Device) -> Result<String, OcrError> {
                Ok(String::new())
            }
            fn supports_gpu(&self) -> bool {
                true
            }
            fn gpu_ready(&self) -> bool {
                true
            }
        }

        assert_eq!(select_device(&GpuEngine, true), Device::Cpu);
        assert_eq!(select_device(&GpuEngine, false), Device::Gpu);
    }

    #[test]
    fn test_select_device_cpu_only_engine() {
        let engine = TesseractEngine::new(vec!["eng".into()]);
        assert_eq!(select_device(&engine, false), Device::Cpu);
    }
}
