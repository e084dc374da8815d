use std::io::ErrorKind;

use halyard_config::ProblemSetBuilder;
use halyard_config::Severity;

/// Reads a file referenced by the configuration, reporting what goes wrong.
///
/// Each failure mode gets its own message so users can tell a typo in a
/// path from an unreadable file.
pub(crate) struct FileCheck<'a> {
    pub empty: &'a str,
    pub not_found: &'a str,
    pub unreadable: &'a str,
}

impl FileCheck<'_> {
    /// The contents of `path`, or `None` when it is unset or unreadable.
    ///
    /// An empty file is a WARNING and still returns its (empty) contents.
    pub fn read(&self, p: &mut ProblemSetBuilder, path: Option<&str>) -> Option<String> {
        let path = path.filter(|path| !path.is_empty())?;

        match std::fs::read_to_string(path) {
            Ok(contents) => {
                if contents.is_empty() {
                    p.add_problem(Severity::Warning, format!("{}.", self.empty));
                }
                Some(contents)
            }
            Err(err) => {
                tracing::debug!(path, error = %err, "Failed to read referenced file");
                let message = if err.kind() == ErrorKind::NotFound {
                    self.not_found
                } else {
                    self.unreadable
                };
                p.add_problem(Severity::Error, format!("{}: {} ({}).", message, path, err));
                None
            }
        }
    }
}
