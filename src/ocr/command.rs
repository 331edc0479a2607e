//! OCR through an external recognizer program.

use std::process::Stdio;

use async_trait::async_trait;
use log::debug;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::ocr::{CredentialRef, OcrEngine, OcrFailure};

/// Runs an external program per page: the PNG goes to its stdin, the text comes from stdout.
///
/// A program that cannot be started is a fatal failure, as is an exit code listed in
/// `fatal_exit_codes`; any other non-zero exit only fails the page. The credential bundle,
/// when set, is passed to the child process alone through `credential_env` and never touches
/// this process's environment.
#[derive(Debug, Clone)]
pub struct CommandOcrEngine {
    program: String,
    args: Vec<String>,
    credential_env: Option<String>,
    credentials: Option<CredentialRef>,
    fatal_exit_codes: Vec<i32>,
}

impl CommandOcrEngine {
    pub fn new(program: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            program: program.into(),
            args,
            credential_env: None,
            credentials: None,
            fatal_exit_codes: Vec::new(),
        }
    }

    /// `tesseract stdin stdout -l <language>`.
    pub fn tesseract(language: &str) -> Self {
        Self::new(
            "tesseract",
            vec![
                "stdin".to_string(),
                "stdout".to_string(),
                "-l".to_string(),
                language.to_string(),
            ],
        )
    }

    /// Hands `credentials` to the program through the environment variable `env_var`.
    ///
    /// An engine configured this way refuses to run a job without an existing bundle.
    pub fn with_credentials(mut self, env_var: impl Into<String>, credentials: CredentialRef) -> Self {
        self.credential_env = Some(env_var.into());
        self.credentials = Some(credentials);
        self
    }

    /// Treats `code` as an engine-wide failure (e.g. rejected credentials).
    pub fn fatal_on_exit_code(mut self, code: i32) -> Self {
        self.fatal_exit_codes.push(code);
        self
    }
}

#[async_trait]
impl OcrEngine for CommandOcrEngine {
    async fn recognize(&self, png: Vec<u8>) -> Result<String, OcrFailure> {
        let mut command = Command::new(&self.program);
        command
            .args(&self.args)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let (Some(var), Some(credentials)) = (&self.credential_env, &self.credentials) {
            command.env(var, credentials.path());
        }

        let mut child = command
            .spawn()
            .map_err(|e| OcrFailure::Fatal(format!("cannot start '{}': {}", self.program, e)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| OcrFailure::Page("recognizer stdin unavailable".to_string()))?;
        // Feed stdin while stdout is drained, or a large page could deadlock both pipes
        let writer = tokio::spawn(async move {
            let written = stdin.write_all(&png).await;
            drop(stdin);
            written
        });

        let output = child
            .wait_with_output()
            .await
            .map_err(|e| OcrFailure::Page(format!("'{}' failed: {}", self.program, e)))?;
        if let Ok(Err(e)) = writer.await {
            debug!("'{}' closed stdin early: {}", self.program, e);
        }

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let message = format!("'{}' exited with {}: {}", self.program, output.status, stderr);
            let fatal = output
                .status
                .code()
                .is_some_and(|code| self.fatal_exit_codes.contains(&code));
            return Err(if fatal {
                OcrFailure::Fatal(message)
            } else {
                OcrFailure::Page(message)
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim_end().to_string())
    }

    fn requires_credentials(&self) -> bool {
        self.credential_env.is_some()
    }

    fn credentials(&self) -> Option<&CredentialRef> {
        self.credentials.as_ref()
    }
}
