// SPDX-License-Identifier: AGPL-3.0-or-later
//
// Copyright (C) 2026 Relational Network

//! Interactive confirmation of every action the dApp requests.

use std::io::{self, BufRead, Write};

use async_trait::async_trait;

/// Asks the user to approve one operation.
#[async_trait]
pub trait Confirmer: Send + Sync {
    /// Show `summary` and wait for a decision. `Ok(())` means approved;
    /// a decline is an error so callers abort with `?`.
    async fn confirm(&self, summary: &str) -> Result<(), ConfirmError>;
}

/// Prompt on the controlling terminal (`Confirm [y/N]`).
///
/// Reading stdin blocks, so the prompt runs on tokio's blocking pool. The
/// caller still awaits it in-line: nothing else is processed meanwhile.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalConfirmer;

impl TerminalConfirmer {
    fn prompt(summary: &str) -> Result<(), ConfirmError> {
        let stdout = io::stdout();
        let mut out = stdout.lock();
        writeln!(out)?;
        writeln!(out, "{summary}")?;
        write!(out, "Confirm [y/N]: ")?;
        out.flush()?;

        let mut line = String::new();
        let read = io::stdin().lock().read_line(&mut line)?;
        if read == 0 {
            return Err(ConfirmError::Closed);
        }
        parse_answer(&line)
    }
}

#[async_trait]
impl Confirmer for TerminalConfirmer {
    async fn confirm(&self, summary: &str) -> Result<(), ConfirmError> {
        let summary = summary.to_string();
        tokio::task::spawn_blocking(move || Self::prompt(&summary))
            .await
            .map_err(|e| ConfirmError::Io(io::Error::other(e)))?
    }
}

fn parse_answer(line: &str) -> Result<(), ConfirmError> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Ok(()),
        _ => Err(ConfirmError::Declined),
    }
}

/// Why an operation was not approved.
#[derive(Debug, thiserror::Error)]
pub enum ConfirmError {
    #[error("Declined by user")]
    Declined,

    #[error("Input closed before an answer was given")]
    Closed,

    #[error("Prompt failed: {0}")]
    Io(#[from] io::Error),
}
