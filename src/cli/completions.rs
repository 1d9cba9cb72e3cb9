//! `stackcheck completions` - Generate shell completions

use anyhow::{Context, Result};
use clap::CommandFactory;
use clap_complete::Shell;
use std::fs;
use std::path::Path;

/// Renders the completion script for `shell`
pub fn generate_completions(shell: Shell) -> Result<String> {
    let mut cmd = super::Args::command();
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut cmd, "stackcheck", &mut buf);

    String::from_utf8(buf).context("Failed to generate completions")
}

pub fn save_completions(completions: &str, output_path: &Path) -> Result<()> {
    fs::write(output_path, completions)
        .with_context(|| format!("Failed to write completions to: {}", output_path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_bash_completions() {
        let completions = generate_completions(Shell::Bash).unwrap();
        assert!(completions.contains("stackcheck"));
        assert!(completions.contains("validate"));
    }

    #[test]
    fn test_generate_zsh_completions() {
        let completions = generate_completions(Shell::Zsh).unwrap();
        assert!(completions.contains("--compose-dir"));
    }

    #[test]
    fn test_save_completions() {
        let temp_dir = tempfile::TempDir::new().unwrap();
        let path = temp_dir.path().join("stackcheck.fish");
        save_completions("complete -c stackcheck", &path).unwrap();
        assert_eq!(fs::read_to_string(path).unwrap(), "complete -c stackcheck");
    }
}
