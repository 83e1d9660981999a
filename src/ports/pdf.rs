use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::error::Result;

/// Renders a vulnerability finding report to disk. The in-repository
/// implementation writes a plain-text document with a `.pdf` extension,
/// matching this concern's own reportlab-or-text-fallback behavior — no
/// PDF-writing crate is pulled in for something explicitly out of scope.
pub trait PdfRenderer: Send + Sync {
    fn render_vulnerability_report(
        &self,
        threat_id: &str,
        title: &str,
        severity: &str,
        description: &str,
        output_path: &Path,
    ) -> Result<PathBuf>;
}

pub struct TextFallbackPdfRenderer;

impl PdfRenderer for TextFallbackPdfRenderer {
    fn render_vulnerability_report(
        &self,
        threat_id: &str,
        title: &str,
        severity: &str,
        description: &str,
        output_path: &Path,
    ) -> Result<PathBuf> {
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let contents = format!(
            "Sentryd Vulnerability Report\nThreat ID: {}\nGenerated: {}Z\n\nTitle: {}\nSeverity: {}\n\nDescription:\n{}\n",
            threat_id,
            Utc::now().to_rfc3339(),
            title,
            severity,
            description,
        );
        std::fs::write(output_path, contents)?;
        Ok(output_path.to_path_buf())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn writes_a_readable_text_fallback_report() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("vuln-thr-abc.pdf");
        let renderer = TextFallbackPdfRenderer;
        renderer
            .render_vulnerability_report("thr-abc", "Outdated OpenSSH", "P2", "details", &path)
            .unwrap();
        let contents = std::fs::read_to_string(&path).unwrap();
        assert!(contents.contains("Outdated OpenSSH"));
        assert!(contents.contains("thr-abc"));
    }
}
