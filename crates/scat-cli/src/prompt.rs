//! Interactive confirmation on the terminal

use scat_core::{Confirmation, ConfirmationRequest};
use std::io::{BufRead, Write};

/// Asks on stderr and reads a yes/no answer from stdin
///
/// Anything but `y` or `yes` counts as no, including end of input.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct StdinConfirmation;

#[async_trait::async_trait]
impl Confirmation for StdinConfirmation {
    async fn confirm(&self, request: ConfirmationRequest) -> bool {
        let prompt = format!("{request} [y/N] ");
        let answer = tokio::task::spawn_blocking(move || {
            let mut stderr = std::io::stderr().lock();
            write!(stderr, "{prompt}").ok()?;
            stderr.flush().ok()?;
            let mut line = String::new();
            std::io::stdin().lock().read_line(&mut line).ok()?;
            Some(line)
        })
        .await
        .ok()
        .flatten();

        answer.as_deref().is_some_and(is_yes)
    }
}

fn is_yes(answer: &str) -> bool {
    matches!(answer.trim().to_ascii_lowercase().as_str(), "y" | "yes")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_explicit_yes_confirms() {
        assert!(is_yes("y\n"));
        assert!(is_yes("  YES "));
        assert!(!is_yes(""));
        assert!(!is_yes("n"));
        assert!(!is_yes("yep"));
    }
}
