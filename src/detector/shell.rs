use std::path::Path;
use std::process::Command;

use tracing::debug;

use crate::core::result_set::MimeTypeSet;
use crate::core::types::MimeType;
use crate::detector::extension::full_extension;
use crate::detector::{base_name, file_name_of, Detector, DetectorError};

/// Delegates to the operating system: the registry's `Content Type` values on
/// Windows, `file --brief --mime-type` elsewhere
#[derive(Debug, Clone)]
pub struct ShellDetector {
    file_command: String,
}

impl ShellDetector {
    pub fn new() -> Self {
        Self {
            file_command: "file".to_string(),
        }
    }

    /// Use a different `file` executable
    #[must_use]
    pub fn with_file_command(mut self, command: &str) -> Self {
        self.file_command = command.to_string();
        self
    }

    fn run_file_command(&self, path: &Path) -> Result<MimeTypeSet, DetectorError> {
        let output = Command::new(&self.file_command)
            .arg("--brief")
            .arg("--mime-type")
            .arg(path)
            .output()
            .map_err(|e| {
                DetectorError::ClassificationFailure(format!(
                    "could not run '{}': {e}",
                    self.file_command
                ))
            })?;
        if !output.status.success() {
            return Err(DetectorError::ClassificationFailure(format!(
                "'{}' exited with {}",
                self.file_command, output.status
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_reported_type(&stdout).into_iter().collect())
    }

    fn query_registry(&self, name: &str) -> Result<MimeTypeSet, DetectorError> {
        let Some(extension) = full_extension(name).map(|e| e.rsplit('.').next().unwrap_or(e))
        else {
            return Ok(MimeTypeSet::new());
        };
        let key = format!(r"HKEY_CLASSES_ROOT\.{extension}");
        let output = Command::new("reg")
            .args(["query", &key, "/v", "Content Type"])
            .output()
            .map_err(|e| DetectorError::ClassificationFailure(format!("reg query failed: {e}")))?;
        if !output.status.success() {
            debug!(key = %key, "No registry entry");
            return Ok(MimeTypeSet::new());
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(parse_registry_output(&stdout).into_iter().collect())
    }
}

impl Default for ShellDetector {
    fn default() -> Self {
        Self::new()
    }
}

/// First line of `file --mime-type` output, if it is a valid type
fn parse_reported_type(output: &str) -> Option<MimeType> {
    output.lines().next()?.trim().parse().ok()
}

/// Value of the `Content Type` line printed by `reg query`
fn parse_registry_output(output: &str) -> Option<MimeType> {
    output
        .lines()
        .find(|line| line.contains("REG_SZ"))
        .and_then(|line| line.split_whitespace().last())
        .and_then(|value| value.parse().ok())
}

impl Detector for ShellDetector {
    fn description(&self) -> &str {
        "Asks the operating system (registry or file(1)) for the content type"
    }

    fn classify_name(&self, name: &str) -> Result<MimeTypeSet, DetectorError> {
        if cfg!(windows) {
            self.query_registry(base_name(name))
        } else {
            Err(DetectorError::Unsupported("file name"))
        }
    }

    fn classify_path(&self, path: &Path) -> Result<MimeTypeSet, DetectorError> {
        if cfg!(windows) {
            return match file_name_of(path) {
                Some(name) => self.query_registry(name),
                None => Ok(MimeTypeSet::new()),
            };
        }
        if !path.exists() {
            return Err(DetectorError::ClassificationFailure(format!(
                "{} does not exist",
                path.display()
            )));
        }
        self.run_file_command(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_reported_type() {
        assert_eq!(parse_reported_type("image/png\n").unwrap(), "image/png");
        assert!(parse_reported_type("cannot open `x'\n").is_none());
        assert!(parse_reported_type("").is_none());
    }

    #[test]
    fn test_parse_registry_output() {
        let output = "\r\nHKEY_CLASSES_ROOT\\.png\r\n    Content Type    REG_SZ    image/png\r\n\r\n";
        assert_eq!(parse_registry_output(output).unwrap(), "image/png");
        assert!(parse_registry_output("ERROR: not found").is_none());
    }

    #[test]
    fn test_missing_command_is_failure() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        std::fs::write(&path, "hello").unwrap();
        let detector = ShellDetector::new().with_file_command("definitely-not-a-real-command-xyz");
        if !cfg!(windows) {
            assert!(matches!(
                detector.classify_path(&path),
                Err(DetectorError::ClassificationFailure(_))
            ));
        }
    }

    #[test]
    fn test_buffers_unsupported() {
        assert!(ShellDetector::new()
            .classify_bytes(b"abc")
            .unwrap_err()
            .is_unsupported());
    }
}
