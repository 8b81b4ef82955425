//! CLI argument definitions using clap.

use clap::Parser;

/// Researcher - a tool-using research agent
///
/// Answers a question by letting the model search the web, arXiv and the
/// internal document index until it can write a final answer.
#[derive(Parser, Debug)]
#[command(name = "researcher")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Research query; prompted for interactively when omitted
    pub query: Vec<String>,
}

impl Cli {
    /// Query words joined with single spaces, or None when none were given
    pub fn query_text(&self) -> Option<String> {
        let text = self.query.join(" ");
        if text.trim().is_empty() { None } else { Some(text) }
    }
}

/// Whether the user asked to leave instead of asking a question
pub fn is_exit_command(input: &str) -> bool {
    matches!(input.trim().to_lowercase().as_str(), "quit" | "exit")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_words_joined() {
        let cli = Cli::try_parse_from(["researcher", "summarize", "Google.pdf"]).unwrap();
        assert_eq!(cli.query_text().as_deref(), Some("summarize Google.pdf"));
    }

    #[test]
    fn test_no_query() {
        let cli = Cli::try_parse_from(["researcher"]).unwrap();
        assert!(cli.query_text().is_none());
    }

    #[test]
    fn test_unknown_flag_rejected() {
        assert!(Cli::try_parse_from(["researcher", "--thread", "x"]).is_err());
    }

    #[test]
    fn test_exit_commands() {
        assert!(is_exit_command("quit"));
        assert!(is_exit_command("  EXIT\n"));
        assert!(!is_exit_command("quit smoking research"));
        assert!(!is_exit_command(""));
    }
}
