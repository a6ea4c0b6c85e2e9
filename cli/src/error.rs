/// A user-facing failure: what went wrong, and optionally what to do next
#[derive(Debug)]
pub struct Error {
    message: String,
    hint: Option<String>,
}

impl Error {
    pub fn new(message: &str, hint: Option<&str>) -> Self {
        Error {
            message: message.to_string(),
            hint: hint.map(|hint| hint.to_string()),
        }
    }
}

/// The message first, then the hint dimmed below it
impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
        write!(
            f,
            "{}\n\n{}",
            self.message,
            console::style(self.hint.clone().unwrap_or_default()).dim()
        )
    }
}

impl std::error::Error for Error {}

/// Eyre reports bail out of deep call chains, unwrap the original Error
/// when the report carries one
impl From<eyre::ErrReport> for Error {
    fn from(error: eyre::ErrReport) -> Self {
        let error = error
            .downcast::<Error>()
            .unwrap_or_else(|err| Error::new(&err.to_string(), None));

        eprintln!("\n\n{}\n{error}", console::style("Error").red().bold());

        // The converted report terminates the command
        std::process::exit(1)
    }
}
