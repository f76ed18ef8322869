use anyhow::{Context, Result};
use indicatif::ProgressBar;
use regex::Regex;
use std::fmt;
use std::path::Path;
use unicode_normalization::is_nfc;
use walkdir::WalkDir;

/// One encoding problem found in an archive file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Finding {
    /// Path relative to the scanned archive root.
    pub path: String,
    pub problem: Problem,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Problem {
    InvalidUtf8(String),
    NulCharacter,
    ControlCharacter,
    NotNfcNormalized,
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Problem::InvalidUtf8(detail) => write!(f, "invalid UTF-8 ({detail})"),
            Problem::NulCharacter => write!(f, "NUL character in XML string"),
            Problem::ControlCharacter => write!(f, "C0 control character in XML string"),
            Problem::NotNfcNormalized => write!(f, "text is not NFC-normalized"),
        }
    }
}

pub struct Scanner {
    // C0 controls except NUL (reported separately) and tab/LF/CR.
    control: Regex,
}

impl Scanner {
    pub fn new() -> Result<Self> {
        let control = Regex::new("[\\x01-\\x08\\x0B\\x0C\\x0E-\\x1F]")
            .with_context(|| "compiling control character pattern")?;
        Ok(Self { control })
    }

    /// Checks one file's bytes. Undecodable files yield a single finding;
    /// decodable ones may yield several.
    pub fn check_bytes(&self, relative: &str, bytes: &[u8]) -> Vec<Finding> {
        let text = match std::str::from_utf8(bytes) {
            Ok(text) => text,
            Err(err) => {
                return vec![Finding {
                    path: relative.to_string(),
                    problem: Problem::InvalidUtf8(err.to_string()),
                }];
            }
        };

        let mut findings = Vec::new();
        if text.contains('\0') {
            findings.push(Finding {
                path: relative.to_string(),
                problem: Problem::NulCharacter,
            });
        }
        if self.control.is_match(text) {
            findings.push(Finding {
                path: relative.to_string(),
                problem: Problem::ControlCharacter,
            });
        }
        if !is_nfc(text) {
            findings.push(Finding {
                path: relative.to_string(),
                problem: Problem::NotNfcNormalized,
            });
        }
        findings
    }

    /// Walks every `*.xml` under the archive root, in sorted order, and
    /// collects findings. The scan always runs to completion.
    pub fn scan_archive(&self, archive_root: &Path, show_progress: bool) -> Result<Vec<Finding>> {
        let mut xml_files = Vec::new();
        for entry in WalkDir::new(archive_root)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
        {
            if entry.file_type().is_file()
                && entry.path().extension().and_then(|e| e.to_str()) == Some("xml")
            {
                xml_files.push(entry.into_path());
            }
        }

        let progress = if show_progress {
            ProgressBar::new(xml_files.len() as u64)
        } else {
            ProgressBar::hidden()
        };

        let mut findings = Vec::new();
        for path in &xml_files {
            progress.inc(1);
            let bytes =
                std::fs::read(path).with_context(|| format!("reading {}", path.display()))?;
            let relative = path
                .strip_prefix(archive_root)
                .unwrap_or(path)
                .display()
                .to_string();
            findings.extend(self.check_bytes(&relative, &bytes));
        }
        progress.finish_and_clear();

        Ok(findings)
    }
}
