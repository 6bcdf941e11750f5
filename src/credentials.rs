use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

pub const DEFAULT_ENV_FILE: &str = ".env_DIS";
pub const TOKEN_KEY: &str = "LOGFIRE_READ_TOKEN";

#[derive(Debug, Error)]
pub enum CredentialError {
    #[error("Could not read credentials file {}", path.display())]
    Unreadable {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Could not find {key} in {}", path.display())]
    Missing { key: String, path: PathBuf },
}

/// Something that can hand out the bearer token for a request.
pub trait CredentialSource: Send + Sync {
    fn load(&self) -> Result<String, CredentialError>;
}

/// Reads the token from a `KEY=value` file every time it is asked for.
#[derive(Debug, Clone)]
pub struct EnvFileCredentials {
    path: PathBuf,
    key: String,
}

impl EnvFileCredentials {
    pub fn new(path: impl Into<PathBuf>, key: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            key: key.into(),
        }
    }
}

impl CredentialSource for EnvFileCredentials {
    fn load(&self) -> Result<String, CredentialError> {
        load_credential(&self.path, &self.key)
    }
}

/// Return the trimmed value of the first `key=` line in the file at `path`.
pub fn load_credential(path: &Path, key: &str) -> Result<String, CredentialError> {
    let unreadable = |source| CredentialError::Unreadable {
        path: path.to_path_buf(),
        source,
    };

    let file = File::open(path).map_err(unreadable)?;
    let prefix = format!("{}=", key);

    for line in BufReader::new(file).lines() {
        let line = line.map_err(unreadable)?;
        if let Some(value) = line.strip_prefix(&prefix) {
            let value = value.trim();
            if value.is_empty() {
                // Empty counts as absent
                break;
            }
            log::debug!("found {} in {}", key, path.display());
            return Ok(value.to_string());
        }
    }

    Err(CredentialError::Missing {
        key: key.to_string(),
        path: path.to_path_buf(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn env_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn finds_token_among_other_lines() {
        let file = env_file(
            "DATABASE_URL=postgres://localhost/db\n\
             LOGFIRE_READ_TOKEN=  pylf_v1_secret \n\
             OTHER=value\n",
        );

        let token = load_credential(file.path(), TOKEN_KEY).unwrap();
        assert_eq!(token, "pylf_v1_secret");
    }

    #[test]
    fn keeps_equals_signs_after_the_first() {
        let file = env_file("LOGFIRE_READ_TOKEN=abc==\n");
        assert_eq!(load_credential(file.path(), TOKEN_KEY).unwrap(), "abc==");
    }

    #[test]
    fn first_match_wins() {
        let file = env_file("LOGFIRE_READ_TOKEN=first\nLOGFIRE_READ_TOKEN=second\n");
        assert_eq!(load_credential(file.path(), TOKEN_KEY).unwrap(), "first");
    }

    #[test]
    fn similar_key_prefix_does_not_match() {
        let file = env_file("LOGFIRE_READ_TOKEN_OLD=stale\nLOGFIRE_WRITE_TOKEN=w\n");
        let err = load_credential(file.path(), TOKEN_KEY).unwrap_err();
        assert!(matches!(err, CredentialError::Missing { .. }));
    }

    #[test]
    fn missing_key_is_an_error() {
        let file = env_file("SOMETHING_ELSE=1\n");
        let err = load_credential(file.path(), TOKEN_KEY).unwrap_err();
        assert!(matches!(err, CredentialError::Missing { ref key, .. } if key == TOKEN_KEY));
        assert!(err.to_string().contains("LOGFIRE_READ_TOKEN"));
    }

    #[test]
    fn empty_value_is_treated_as_missing() {
        let file = env_file("LOGFIRE_READ_TOKEN=   \n");
        let err = load_credential(file.path(), TOKEN_KEY).unwrap_err();
        assert!(matches!(err, CredentialError::Missing { .. }));
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_credential(&dir.path().join(".env_DIS"), TOKEN_KEY).unwrap_err();
        assert!(matches!(err, CredentialError::Unreadable { .. }));
    }

    #[test]
    fn env_file_source_rereads_the_file() {
        let file = env_file("LOGFIRE_READ_TOKEN=one\n");
        let source = EnvFileCredentials::new(file.path(), TOKEN_KEY);
        assert_eq!(source.load().unwrap(), "one");

        std::fs::write(file.path(), "LOGFIRE_READ_TOKEN=two\n").unwrap();
        assert_eq!(source.load().unwrap(), "two");
    }
}
