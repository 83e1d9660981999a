use std::path::{Path, PathBuf};

use once_cell::sync::Lazy;
use regex::Regex;

use crate::config::DetectorConfig;
use crate::models::{Event, EventType, Severity};

const MAX_FILES: usize = 500;

struct Pattern {
    severity: Severity,
    regex: Regex,
    label: &'static str,
}

static PATTERNS: Lazy<Vec<Pattern>> = Lazy::new(|| {
    vec![
        // Tier 1: near-certain obfuscated-payload execution.
        p(Severity::P1, r"eval\s*\(\s*base64_decode\s*\(", "eval(base64_decode("),
        p(Severity::P1, r"eval\s*\(\s*gzinflate\s*\(", "eval(gzinflate("),
        p(Severity::P1, r"eval\s*\(\s*gzuncompress\s*\(", "eval(gzuncompress("),
        p(Severity::P1, r"eval\s*\(\s*str_rot13\s*\(", "eval(str_rot13("),
        p(Severity::P1, r"assert\s*\(\s*\$\w+\s*\)", "assert(variable)"),
        p(Severity::P1, r"create_function\s*\(", "create_function("),
        p(Severity::P1, r"preg_replace\s*\([^)]*/e\s*[),]", "preg_replace /e modifier"),
        // Tier 2: shell/command execution and common webshell helpers.
        p(Severity::P2, r"shell_exec\s*\(", "shell_exec("),
        p(Severity::P2, r"passthru\s*\(", "passthru("),
        p(Severity::P2, r"proc_open\s*\(", "proc_open("),
        p(Severity::P2, r"pcntl_exec\s*\(", "pcntl_exec("),
        p(Severity::P2, r#"base64_decode\s*\(\s*['"][A-Za-z0-9+/=]{20,}"#, "base64_decode(long string)"),
        p(Severity::P2, r"system\s*\(", "system("),
        p(Severity::P2, r"exec\s*\(", "exec("),
        p(Severity::P2, r"popen\s*\(", "popen("),
        // Tier 3: suspicious but not conclusive on their own.
        p(Severity::P3, r"\$\w+\s*\(\s*\$\w+\s*\)\s*;", "variable function call"),
        p(Severity::P3, r#"file_get_contents\s*\(\s*['"]https?://"#, "file_get_contents(http)"),
        p(Severity::P3, r"curl_exec\s*\(", "curl_exec("),
    ]
});

fn p(severity: Severity, pattern: &str, label: &'static str) -> Pattern {
    Pattern { severity, regex: Regex::new(pattern).expect("static php_scan pattern must compile"), label }
}

/// Walks configured roots for `*.php` files (capped at count and depth),
/// reads up to a byte cap per file, and matches the fixed tiered pattern
/// list in P1 -> P2 -> P3 order, emitting at most one event per file on
/// its first (highest-severity) match.
pub fn check(config: &DetectorConfig) -> Vec<Event> {
    if !config.php_scan_enabled {
        return Vec::new();
    }

    let mut files = Vec::new();
    for root in &config.php_scan_paths {
        find_php_files(Path::new(root), config.php_scan_max_depth, config.php_scan_max_files as usize, &mut files);
        if files.len() >= config.php_scan_max_files as usize {
            break;
        }
    }
    files.truncate(config.php_scan_max_files as usize);

    files
        .into_iter()
        .filter_map(|path| scan_file(&path, config.php_scan_max_bytes))
        .collect()
}

fn find_php_files(root: &Path, max_depth: u32, max_files: usize, out: &mut Vec<PathBuf>) {
    fn walk(dir: &Path, depth: u32, max_depth: u32, max_files: usize, out: &mut Vec<PathBuf>) {
        if out.len() >= max_files {
            return;
        }
        let Ok(entries) = std::fs::read_dir(dir) else { return };
        for entry in entries.filter_map(|e| e.ok()) {
            let path = entry.path();
            if path.is_dir() {
                if depth < max_depth {
                    walk(&path, depth + 1, max_depth, max_files, out);
                }
            } else if path.extension().and_then(|e| e.to_str()) == Some("php") {
                out.push(path);
            }
            if out.len() >= max_files {
                return;
            }
        }
    }
    walk(root, 0, max_depth, max_files, out);
}

fn scan_file(path: &Path, max_bytes: u64) -> Option<Event> {
    let bytes = std::fs::read(path).ok()?;
    let truncated = &bytes[..bytes.len().min(max_bytes as usize)];
    let contents = String::from_utf8_lossy(truncated);

    for pattern in PATTERNS.iter() {
        if pattern.regex.is_match(&contents) {
            let severity = pattern.severity;
            return Some(Event::new(
                "php_scan_detector",
                EventType::PhpMalwareSuspected,
                severity,
                format!("Suspicious PHP pattern in {}: {}", path.display(), pattern.label),
                serde_json::json!({"path": path.display().to_string(), "pattern": pattern.label}),
            ));
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn flags_base64_eval_as_p1() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("shell.php");
        std::fs::write(&file, "<?php eval(base64_decode($_GET['c'])); ?>").unwrap();
        let event = scan_file(&file, 102_400).expect("expected a match");
        assert_eq!(event.severity, Severity::P1);
    }

    #[test]
    fn flags_assert_of_a_bare_variable_as_p1() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("shell3.php");
        std::fs::write(&file, "<?php assert($payload); ?>").unwrap();
        let event = scan_file(&file, 102_400).expect("expected a match");
        assert_eq!(event.severity, Severity::P1);
    }

    #[test]
    fn flags_shell_exec_as_p2() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("shell2.php");
        std::fs::write(&file, "<?php shell_exec($_GET['cmd']); ?>").unwrap();
        let event = scan_file(&file, 102_400).expect("expected a match");
        assert_eq!(event.severity, Severity::P2);
    }

    #[test]
    fn clean_file_has_no_match() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("index.php");
        std::fs::write(&file, "<?php echo 'hello world'; ?>").unwrap();
        assert!(scan_file(&file, 102_400).is_none());
    }

    #[test]
    fn finds_php_files_recursively_respecting_cap() {
        let dir = tempdir().unwrap();
        std::fs::write(dir.path().join("a.php"), "<?php ?>").unwrap();
        let nested = dir.path().join("sub");
        std::fs::create_dir_all(&nested).unwrap();
        std::fs::write(nested.join("b.php"), "<?php ?>").unwrap();

        let mut out = Vec::new();
        find_php_files(dir.path(), 6, 500, &mut out);
        assert_eq!(out.len(), 2);
    }
}
