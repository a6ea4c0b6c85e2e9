use crate::logger::Logger;
use indicatif::{ProgressBar, ProgressStyle};
use std::io::{stdout, IsTerminal};
use std::time::Duration;

/// One line per stack in the cargo style: a right-aligned bold stage label
/// followed by the stack name
pub(crate) struct Progress {
    progress_bar: ProgressBar,
    stack_name: String,
}

pub(crate) enum ProgressStatus {
    Success,
    Warn,
    Error,
}

impl Progress {
    pub(crate) fn new(stack_name: &str) -> Self {
        let progress_bar = Logger::multi_progress().add(ProgressBar::new_spinner());

        progress_bar.set_style(
            // Infallible: the template is a literal
            ProgressStyle::with_template("{spinner:.cyan} {msg}").unwrap(),
        );

        progress_bar.enable_steady_tick(Duration::from_millis(120));

        Self {
            progress_bar,
            stack_name: stack_name.to_string(),
        }
    }

    /// Show an ongoing stage on the spinner line
    pub(crate) fn stage(&self, stage: &str) {
        self.progress_bar.set_message(format!(
            "{} {}",
            console::style(with_padding(stage)).cyan().bold(),
            self.stack_name,
        ));
    }

    pub(crate) fn finish(&self, stage: &str, status: ProgressStatus, message: Option<&str>) {
        let stage = console::style(with_padding(stage)).bold();

        let stage = match status {
            ProgressStatus::Success => stage.green(),
            ProgressStatus::Warn => stage.yellow(),
            ProgressStatus::Error => stage.red(),
        };

        let message = message.map(|m| format!(": {m}")).unwrap_or_default();
        let line = format!("{} {}{}", stage, self.stack_name, message);

        // Terminal or CI/CD?
        if stdout().is_terminal() {
            self.progress_bar.finish_with_message(line);
        } else {
            self.progress_bar.finish_and_clear();
            self.progress_bar.suspend(|| println!("{line}"));
        }
    }

    pub(crate) fn error(&self, stage: &str) {
        self.finish(stage, ProgressStatus::Error, None);
    }
}

// Required padding to make the message centered in the cargo-like style
fn with_padding(message: &str) -> String {
    let padding = " ".repeat(12usize.saturating_sub(message.len()));
    format!("{padding}{message}")
}
