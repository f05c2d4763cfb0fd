//! Tesseract subprocess wrapper.
//!
//! The OCR engine is an opaque external service: we hand it a preprocessed
//! grayscale image and get text back. All engine-specific details (TSV
//! parsing, page segmentation modes) stay inside this module.

use std::process::Command;

use anyhow::{Context, Result, anyhow};
use image::GrayImage;
use tempfile::NamedTempFile;

/// Environment variable overriding the Tesseract executable path.
const TESSERACT_ENV: &str = "CARDSCAN_TESSERACT";

/// Page segmentation mode passed to Tesseract.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PageMode {
    /// A uniform block of text (`--psm 6`); used for ability blocks and
    /// narrative paragraphs.
    Block,
    /// A single text line (`--psm 7`); used for name/location/motto banners.
    SingleLine,
}

impl PageMode {
    fn psm(self) -> &'static str {
        match self {
            PageMode::Block => "6",
            PageMode::SingleLine => "7",
        }
    }
}

/// One recognized line with its average word confidence.
#[derive(Debug, Clone)]
pub struct OcrLine {
    pub text: String,
    pub words: Vec<OcrWord>,
    pub confidence: f32,
}

/// A single recognized word with its confidence score.
#[derive(Debug, Clone)]
pub struct OcrWord {
    pub text: String,
    pub confidence: f32,
}

fn tesseract_executable() -> String {
    std::env::var(TESSERACT_ENV).unwrap_or_else(|_| "tesseract".to_string())
}

/// Runs Tesseract on a preprocessed grayscale image.
///
/// Errors here mean "this region produced no signal" to callers; the
/// orchestrator in `ocr::extract_region` converts them to an empty result
/// and moves on to the next strategy.
pub fn recognize(img: &GrayImage, mode: PageMode) -> Result<Vec<OcrLine>> {
    let temp_input = NamedTempFile::with_suffix(".png").context("create OCR input file")?;
    img.save(temp_input.path()).context("write OCR input image")?;

    // Tesseract appends ".tsv" to the output base path.
    let temp_output = NamedTempFile::new().context("create OCR output file")?;
    let output_base = temp_output.path().to_string_lossy().to_string();

    let output = Command::new(tesseract_executable())
        .arg(temp_input.path())
        .arg(&output_base)
        .arg("-l")
        .arg("eng")
        .arg("--psm")
        .arg(mode.psm())
        .arg("tsv")
        .output()
        .context("spawn tesseract")?;

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(anyhow!("tesseract failed: {}", stderr.trim()));
    }

    let tsv_path = format!("{}.tsv", output_base);
    let tsv = std::fs::read_to_string(&tsv_path)
        .with_context(|| format!("read tesseract output {tsv_path}"))?;
    let _ = std::fs::remove_file(&tsv_path);

    Ok(parse_tsv(&tsv))
}

/// Parses Tesseract TSV output into per-line words with confidences.
///
/// TSV fields: level, page_num, block_num, par_num, line_num, word_num,
/// left, top, width, height, conf, text. Level 5 rows are words.
fn parse_tsv(tsv: &str) -> Vec<OcrLine> {
    let mut lines: Vec<OcrLine> = Vec::new();
    let mut words: Vec<OcrWord> = Vec::new();
    // (block, paragraph, line) triple identifying the current text line.
    let mut current_key: Option<(i32, i32, i32)> = None;

    fn flush(lines: &mut Vec<OcrLine>, words: &mut Vec<OcrWord>) {
        if words.is_empty() {
            return;
        }
        let confidence =
            words.iter().map(|w| w.confidence).sum::<f32>() / words.len() as f32;
        let text = words
            .iter()
            .map(|w| w.text.as_str())
            .collect::<Vec<_>>()
            .join(" ");
        lines.push(OcrLine { text, words: std::mem::take(words), confidence });
    }

    for row in tsv.lines().skip(1) {
        let fields: Vec<&str> = row.split('\t').collect();
        if fields.len() < 12 {
            continue;
        }

        let level: i32 = fields[0].parse().unwrap_or(-1);
        if level != 5 {
            continue;
        }

        let key = (
            fields[2].parse().unwrap_or(-1),
            fields[3].parse().unwrap_or(-1),
            fields[4].parse().unwrap_or(-1),
        );
        let conf: f32 = fields[10].parse().unwrap_or(-1.0);
        let text = fields[11].trim();
        if text.is_empty() || conf < 0.0 {
            continue;
        }

        if current_key.is_some() && current_key != Some(key) {
            flush(&mut lines, &mut words);
        }
        current_key = Some(key);
        words.push(OcrWord { text: text.to_string(), confidence: conf });
    }
    flush(&mut lines, &mut words);

    lines
}
