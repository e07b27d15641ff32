//! Persisted validation artifacts with digest verification.
//!
//! Layout: `<dir>/<encoded id>/validation.json` plus
//! `<dir>/<encoded id>/validation.digest` (hex SHA-256 of the JSON bytes).

use std::path::{Path, PathBuf};

use sha2::{Digest, Sha256};
use tracing::debug;

use crate::domain::{ReqforgeError, Result, ValidationResult};

const ARTIFACT_FILE: &str = "validation.json";
const DIGEST_FILE: &str = "validation.digest";

fn sha256_hex(bytes: &[u8]) -> String {
    hex::encode(Sha256::digest(bytes))
}

/// Directory name for a requirement id. ASCII alphanumerics, `-` and `_`
/// are kept; every other byte becomes `%XX`, so distinct ids never share a
/// directory and no id can escape `dir`.
fn artifact_dir(dir: &Path, requirement_id: &str) -> PathBuf {
    if requirement_id.is_empty() {
        return dir.join("%");
    }
    let mut name = String::with_capacity(requirement_id.len());
    for byte in requirement_id.bytes() {
        if byte.is_ascii_alphanumeric() || matches!(byte, b'-' | b'_') {
            name.push(char::from(byte));
        } else {
            name.push_str(&format!("%{:02X}", byte));
        }
    }
    dir.join(name)
}

/// Persist `result` and its digest. Returns the JSON artifact path.
pub fn write_validation_artifact(result: &ValidationResult, dir: &Path) -> Result<PathBuf> {
    let run_dir = artifact_dir(dir, &result.requirement_id);
    std::fs::create_dir_all(&run_dir)?;

    let artifact_path = run_dir.join(ARTIFACT_FILE);
    let digest_path = run_dir.join(DIGEST_FILE);
    let json = serde_json::to_vec_pretty(result)?;
    let digest = sha256_hex(&json);

    std::fs::write(&artifact_path, &json)?;
    std::fs::write(&digest_path, digest.as_bytes())?;
    debug!(path = %artifact_path.display(), "validation artifact written");

    Ok(artifact_path)
}

/// Read `<dir>/<requirement_id>/validation.json` and verify its digest.
pub fn read_validation_artifact(requirement_id: &str, dir: &Path) -> Result<ValidationResult> {
    let run_dir = artifact_dir(dir, requirement_id);
    let json = std::fs::read(run_dir.join(ARTIFACT_FILE))?;
    let digest = std::fs::read_to_string(run_dir.join(DIGEST_FILE))?;

    let actual = sha256_hex(&json);
    if digest.trim() != actual {
        return Err(ReqforgeError::DigestMismatch {
            expected: digest.trim().to_string(),
            actual,
        });
    }

    Ok(serde_json::from_slice(&json)?)
}
