//! Operator interaction gate.
//!
//! The pipeline pauses at two points: before processing a discovered batch,
//! and between frames. Both are expressed as a synchronous confirm-or-skip
//! gate so the blocking-input mechanism can be swapped without touching the
//! pipeline logic. `StdinConsole` suits an attended focus run; `AutoConsole`
//! covers unattended monitoring.

use std::io::{self, BufRead, Write};

/// Operator's answer at a gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Confirm {
    /// Carry on with the proposed work
    Proceed,
    /// Skip the proposed work, keep the loop alive
    Skip,
    /// Stop the poll loop cleanly
    Quit,
}

/// Synchronous operator console.
pub trait OperatorConsole {
    /// Ask a yes/no/quit question.
    fn confirm(&mut self, prompt: &str) -> Confirm;

    /// Ask for a free-text value (e.g. the focus setting of a converted
    /// frame). `None` means the operator declined or no console is attached.
    fn prompt_value(&mut self, prompt: &str) -> Option<String>;
}

impl<T: OperatorConsole + ?Sized> OperatorConsole for Box<T> {
    fn confirm(&mut self, prompt: &str) -> Confirm {
        (**self).confirm(prompt)
    }

    fn prompt_value(&mut self, prompt: &str) -> Option<String> {
        (**self).prompt_value(prompt)
    }
}

/// Blocking stdin console: `y` proceeds, `q` quits, anything else skips.
#[derive(Debug, Default)]
pub struct StdinConsole;

impl OperatorConsole for StdinConsole {
    fn confirm(&mut self, prompt: &str) -> Confirm {
        print!("{prompt} (y/n/q): ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return Confirm::Quit;
        }
        match line.trim().to_ascii_lowercase().as_str() {
            "y" | "yes" => Confirm::Proceed,
            "q" | "quit" => Confirm::Quit,
            _ => Confirm::Skip,
        }
    }

    fn prompt_value(&mut self, prompt: &str) -> Option<String> {
        print!("{prompt}: ");
        let _ = io::stdout().flush();

        let mut line = String::new();
        if io::stdin().lock().read_line(&mut line).is_err() {
            return None;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.to_string())
        }
    }
}

/// Console that always proceeds and never supplies values, for unattended
/// runs and tests.
#[derive(Debug, Default)]
pub struct AutoConsole;

impl OperatorConsole for AutoConsole {
    fn confirm(&mut self, _prompt: &str) -> Confirm {
        Confirm::Proceed
    }

    fn prompt_value(&mut self, _prompt: &str) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_auto_console_always_proceeds() {
        let mut console = AutoConsole;
        assert_eq!(console.confirm("process batch?"), Confirm::Proceed);
        assert_eq!(console.prompt_value("focus"), None);
    }
}
