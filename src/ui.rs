//! A small interface the transaction calls for confirmations and messages.
//! Kept abstract so tests can inject scripted responses instead of driving
//! a real terminal.

pub trait Ui {
    /// Print a line to stdout.
    fn print(&self, line: &str);

    /// Print a line to stderr.
    fn log(&self, line: &str);

    /// Ask a yes/no question; returns the user's answer.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Colors a diff line by its leading marker, the way `git diff --color`
/// does, using the crate's shared ANSI style statics.
fn style_diff_line(line: &str) -> String {
    if line.starts_with('+') {
        crate::cmd::style::GREEN.paint(line).to_string()
    } else if line.starts_with('-') {
        crate::cmd::style::RED.paint(line).to_string()
    } else {
        line.to_string()
    }
}

/// Default UI: real stdio.
pub struct TermUi {
    pub assume_yes: bool,
    pub quiet: bool,
}

impl Ui for TermUi {
    fn print(&self, line: &str) {
        if !self.quiet {
            if atty::is(atty::Stream::Stdout) {
                println!("{}", style_diff_line(line));
            } else {
                println!("{}", line);
            }
        }
    }

    fn log(&self, line: &str) {
        eprintln!("{}", line);
    }

    fn confirm(&self, prompt: &str) -> bool {
        if self.assume_yes {
            return true;
        }
        eprint!("{} [y/N] ", prompt);
        use std::io::Write;
        std::io::stderr().flush().ok();
        let mut answer = String::new();
        if std::io::stdin().read_line(&mut answer).is_err() {
            return false;
        }
        matches!(answer.trim().to_lowercase().as_str(), "y" | "yes")
    }
}

/// Scripted UI for tests: always answers a fixed value, records output.
#[derive(Default)]
pub struct ScriptedUi {
    pub answer: std::cell::Cell<bool>,
    pub printed: std::cell::RefCell<Vec<String>>,
    pub logged: std::cell::RefCell<Vec<String>>,
}

impl Ui for ScriptedUi {
    fn print(&self, line: &str) {
        self.printed.borrow_mut().push(line.to_string());
    }

    fn log(&self, line: &str) {
        self.logged.borrow_mut().push(line.to_string());
    }

    fn confirm(&self, _prompt: &str) -> bool {
        self.answer.get()
    }
}
