//! External scorer capability
//!
//! The scorer turns one match report link into one CSV file. The pipeline only
//! knows the [`Scorer`] trait; [`CommandScorer`] runs a configured program.

use crate::config::ScorerConfig;
use crate::fetch::ErrorClass;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tokio::process::Command;

/// Errors raised while scoring one item
#[derive(Debug, Error)]
pub enum CollaboratorError {
    #[error("Failed to start scorer '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Scorer exited with {code} for {link}: {stderr}")]
    Exit {
        link: String,
        code: String,
        stderr: String,
    },
}

impl CollaboratorError {
    pub fn class(&self) -> ErrorClass {
        ErrorClass::CollaboratorFailure
    }
}

/// Capability: score the match at `link` into a CSV at `destination`
#[async_trait]
pub trait Scorer: Send + Sync {
    async fn score(&self, link: &str, destination: &Path) -> Result<(), CollaboratorError>;
}

/// Runs `<program> <args..> <link> <destination>` and waits for it
#[derive(Debug, Clone)]
pub struct CommandScorer {
    program: String,
    args: Vec<String>,
    working_dir: PathBuf,
}

impl CommandScorer {
    pub fn new(
        program: impl Into<String>,
        args: Vec<String>,
        working_dir: impl Into<PathBuf>,
    ) -> Self {
        Self {
            program: program.into(),
            args,
            working_dir: working_dir.into(),
        }
    }

    pub fn from_config(config: &ScorerConfig) -> Self {
        Self::new(&config.program, config.args.clone(), &config.working_dir)
    }
}

#[async_trait]
impl Scorer for CommandScorer {
    async fn score(&self, link: &str, destination: &Path) -> Result<(), CollaboratorError> {
        tracing::info!(
            program = %self.program,
            link,
            destination = %destination.display(),
            "Running scorer"
        );

        let output = Command::new(&self.program)
            .args(&self.args)
            .arg(link)
            .arg(destination)
            .current_dir(&self.working_dir)
            .output()
            .await
            .map_err(|source| CollaboratorError::Spawn {
                program: self.program.clone(),
                source,
            })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if !stdout.trim().is_empty() {
            tracing::debug!(link, output = %stdout.trim(), "Scorer output");
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            tracing::warn!(
                exit_code = ?output.status.code(),
                link,
                stderr = %stderr.trim(),
                "Scorer failed"
            );
            return Err(CollaboratorError::Exit {
                link: link.to_string(),
                code: output
                    .status
                    .code()
                    .map_or_else(|| "signal".to_string(), |c| c.to_string()),
                stderr: stderr.trim().to_string(),
            });
        }

        Ok(())
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn shell(script: &str, dir: &Path) -> CommandScorer {
        CommandScorer::new(
            "sh",
            vec!["-c".to_string(), script.to_string(), "scorer".to_string()],
            dir,
        )
    }

    #[tokio::test]
    async fn test_failed_scorer_is_collaborator_failure() {
        let temp = TempDir::new().unwrap();
        let scorer = shell("exit 3", temp.path());

        let err = scorer
            .score("https://fbref.com/en/matches/x", &temp.path().join("out.csv"))
            .await
            .unwrap_err();

        assert!(matches!(err, CollaboratorError::Exit { .. }));
        assert_eq!(err.class(), ErrorClass::CollaboratorFailure);
    }

    #[tokio::test]
    async fn test_scorer_receives_link_and_destination() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("match_0.csv");
        let scorer = shell(r#"printf 'link\n%s\n' "$1" > "$2""#, temp.path());

        scorer
            .score("https://fbref.com/en/matches/abc", &destination)
            .await
            .unwrap();

        let written = std::fs::read_to_string(&destination).unwrap();
        assert_eq!(written, "link\nhttps://fbref.com/en/matches/abc\n");
    }

    #[tokio::test]
    async fn test_scorer_runs_in_working_dir() {
        let temp = TempDir::new().unwrap();
        let destination = temp.path().join("out.csv");
        let scorer = shell(r#"pwd > "$2""#, temp.path());

        scorer.score("x", &destination).await.unwrap();

        let written = std::fs::read_to_string(&destination).unwrap();
        assert_eq!(
            Path::new(written.trim()).canonicalize().unwrap(),
            temp.path().canonicalize().unwrap()
        );
    }

    #[tokio::test]
    async fn test_nonzero_exit_is_error() {
        let temp = TempDir::new().unwrap();
        let scorer = shell("echo boom >&2; exit 3", temp.path());

        let err = scorer
            .score("https://fbref.com/en/matches/abc", &temp.path().join("o.csv"))
            .await
            .unwrap_err();

        match err {
            CollaboratorError::Exit { code, stderr, .. } => {
                assert_eq!(code, "3");
                assert_eq!(stderr, "boom");
            }
            other => panic!("expected exit error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_program_is_spawn_error() {
        let temp = TempDir::new().unwrap();
        let scorer = CommandScorer::new("definitely-not-a-real-scorer", vec![], temp.path());

        let err = scorer.score("x", &temp.path().join("o.csv")).await.unwrap_err();
        assert!(matches!(err, CollaboratorError::Spawn { .. }));
    }
}
