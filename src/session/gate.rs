//! Operator confirmation for the manual verification challenge.

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};

use crate::errors::SessionError;

/// Human-in-the-loop checkpoint between credential submission and the
/// post-login check. The driver blocks here while the operator completes
/// whatever second-factor prompt the site decided to show.
#[async_trait]
pub trait VerificationGate: Send + Sync {
    async fn wait_for_operator(&self) -> Result<(), SessionError>;
}

/// Prompts on stdout and waits for one line on stdin.
#[derive(Debug, Default)]
pub struct ConsoleGate;

#[async_trait]
impl VerificationGate for ConsoleGate {
    async fn wait_for_operator(&self) -> Result<(), SessionError> {
        println!();
        println!("If you see a 2FA/verification code prompt in the browser, please enter the code now.");
        println!("When you have completed any verification, press Enter here to continue...");

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        let read = reader
            .read_line(&mut line)
            .await
            .map_err(|err| SessionError::OperatorInput(err.to_string()))?;
        if read == 0 {
            return Err(SessionError::OperatorInput("stdin closed".to_string()));
        }
        Ok(())
    }
}

/// Gate that continues immediately, for unattended runs against scripted
/// browsers.
#[derive(Debug, Default)]
pub struct AutoContinueGate;

#[async_trait]
impl VerificationGate for AutoContinueGate {
    async fn wait_for_operator(&self) -> Result<(), SessionError> {
        Ok(())
    }
}
