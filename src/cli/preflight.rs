//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and configuration are available
//! before starting operations that would otherwise fail midway.

use crate::error::{Result, TubeRagError};
use crate::openai::is_api_key_configured;
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy)]
pub enum Operation {
    /// Processing fetches transcripts with yt-dlp and embeds them.
    Process,
    /// Asking, searching and summarizing call the OpenAI API.
    Query,
    /// Listing, stats and deleting only touch local state.
    Local,
}

/// Run pre-flight checks for the given operation.
///
/// Returns Ok(()) if all checks pass, or an error describing what's missing.
pub fn check(operation: Operation) -> Result<()> {
    match operation {
        Operation::Process => {
            check_api_key()?;
            check_tool("yt-dlp")?;
        }
        Operation::Query => {
            check_api_key()?;
        }
        Operation::Local => {}
    }
    Ok(())
}

/// Check if OpenAI API key is configured.
fn check_api_key() -> Result<()> {
    if is_api_key_configured() {
        Ok(())
    } else {
        Err(TubeRagError::Config(
            "OPENAI_API_KEY not set. Set it with: export OPENAI_API_KEY='sk-...'".to_string(),
        ))
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    match Command::new(name).arg("--version").output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(TubeRagError::ToolNotFound(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(TubeRagError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(TubeRagError::ToolNotFound(format!("{}: {}", name, e))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_operations_have_no_requirements() {
        assert!(check(Operation::Local).is_ok());
    }

    #[test]
    fn test_missing_tool() {
        let err = check_tool("tuberag-definitely-not-installed").unwrap_err();
        assert!(matches!(err, TubeRagError::ToolNotFound(_)));
    }
}
