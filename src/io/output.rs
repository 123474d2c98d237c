//! Output management for CLI commands.
//!
//! Result lines go to stdout, diagnostics and error messages to stderr.

use std::io::{self, Write};

use serde::Serialize;

use crate::error::DvgError;
use crate::index::FileStatus;
use crate::io::exit_code::ExitCode;
use crate::search::{ScoredParagraph, SearchSession};

/// Header of the search result table.
pub const RESULT_HEADER: &str = "sim\tchars\tlocation\ttext";

/// Header of the index status table.
pub const STATUS_HEADER: &str = "file\tmtime\tindex";

/// How search results are printed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputFormat {
    /// One line per result with the best excerpt.
    #[default]
    Text,
    /// The location line followed by the quoted paragraph.
    Quote,
    /// One JSON object per line.
    Json,
}

/// A search result as printed in JSON mode.
#[derive(Debug, Serialize)]
pub struct ResultRecord<'a> {
    pub sim: f32,
    pub chars: usize,
    pub path: String,
    /// 1-based first line.
    pub start: usize,
    /// Last line, inclusive.
    pub end: usize,
    pub excerpt: String,
    pub lines: &'a [String],
}

/// Writes results and reports in the selected format.
pub struct OutputManager {
    format: OutputFormat,
    stdout: Box<dyn Write>,
    stderr: Box<dyn Write>,
}

impl OutputManager {
    pub fn new(format: OutputFormat) -> Self {
        Self {
            format,
            stdout: Box::new(io::stdout().lock()),
            stderr: Box::new(io::stderr()),
        }
    }

    /// Create an output manager for testing with custom writers.
    #[cfg(test)]
    pub fn new_with_writers(
        format: OutputFormat,
        stdout: Box<dyn Write>,
        stderr: Box<dyn Write>,
    ) -> Self {
        Self {
            format,
            stdout,
            stderr,
        }
    }

    /// Prints the result table header; JSON output has none.
    pub fn result_header(&mut self) -> io::Result<()> {
        if self.format != OutputFormat::Json {
            writeln!(self.stdout, "{RESULT_HEADER}")?;
        }
        Ok(())
    }

    /// Prints search results in rank order.
    pub fn results(
        &mut self,
        session: &SearchSession,
        results: &[ScoredParagraph],
    ) -> io::Result<ExitCode> {
        for result in results {
            let location = location(result);
            match self.format {
                OutputFormat::Text => {
                    let excerpt = session.excerpt(result);
                    writeln!(
                        self.stdout,
                        "{:.4}\t{}\t{location}\t{excerpt}",
                        result.score, result.chars
                    )?;
                }
                OutputFormat::Quote => {
                    writeln!(self.stdout, "{:.4}\t{}\t{location}", result.score, result.chars)?;
                    for line in result.paragraph() {
                        writeln!(self.stdout, "> {line}")?;
                    }
                }
                OutputFormat::Json => {
                    let record = ResultRecord {
                        sim: result.score,
                        chars: result.chars,
                        path: result.path.to_string_lossy().into_owned(),
                        start: result.range.start + 1,
                        end: result.range.end,
                        excerpt: session.excerpt(result),
                        lines: result.paragraph(),
                    };
                    writeln!(self.stdout, "{}", serde_json::to_string(&record)?)?;
                }
            }
        }
        self.stdout.flush()?;
        Ok(ExitCode::Success)
    }

    /// Prints the index status table.
    pub fn statuses<I>(&mut self, statuses: I, header: bool) -> io::Result<ExitCode>
    where
        I: IntoIterator<Item = FileStatus>,
    {
        if header && self.format != OutputFormat::Json {
            writeln!(self.stdout, "{STATUS_HEADER}")?;
        }
        for status in statuses {
            match self.format {
                OutputFormat::Json => {
                    writeln!(self.stdout, "{}", serde_json::to_string(&status)?)?;
                }
                _ => writeln!(
                    self.stdout,
                    "{}\t{}\t{}",
                    status.path,
                    status.mtime_display(),
                    status.state
                )?,
            }
        }
        self.stdout.flush()?;
        Ok(ExitCode::Success)
    }

    /// Output an error with suggestions.
    pub fn error(&mut self, error: &DvgError) -> io::Result<ExitCode> {
        match self.format {
            OutputFormat::Json => {
                let response = serde_json::json!({
                    "status": "error",
                    "code": error.status_code(),
                    "message": error.to_string(),
                    "suggestions": error.recovery_suggestions(),
                });
                writeln!(self.stderr, "{response}")?;
            }
            _ => {
                writeln!(self.stderr, "Error: {error}")?;
                for suggestion in error.recovery_suggestions() {
                    writeln!(self.stderr, "  Suggestion: {suggestion}")?;
                }
            }
        }
        Ok(ExitCode::from_error(error))
    }

    /// Informational message on stderr, suppressed in JSON mode.
    pub fn progress(&mut self, message: &str) -> io::Result<()> {
        if self.format != OutputFormat::Json {
            writeln!(self.stderr, "> {message}")?;
        }
        Ok(())
    }
}

/// `path:first-last` with 1-based inclusive line numbers.
#[must_use]
pub fn location(result: &ScoredParagraph) -> String {
    format!(
        "{}:{}-{}",
        result.path.display(),
        result.range.start + 1,
        result.range.end
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SearchConfig, SearchOverrides, Settings};
    use crate::index::IndexState;
    use crate::search::LineRange;
    use crate::tokenize::WhitespaceTokenizer;
    use crate::vector::toy_model;
    use std::path::Path;
    use std::sync::{Arc, Mutex};

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn text(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn manager(format: OutputFormat) -> (OutputManager, SharedBuf, SharedBuf) {
        let out = SharedBuf::default();
        let err = SharedBuf::default();
        let manager =
            OutputManager::new_with_writers(format, Box::new(out.clone()), Box::new(err.clone()));
        (manager, out, err)
    }

    fn fixture() -> (SearchSession, ScoredParagraph) {
        let config = SearchConfig::new(
            &Settings::default(),
            SearchOverrides {
                excerpt_length: Some(20),
                ..Default::default()
            },
        )
        .unwrap();
        let session =
            SearchSession::prepare(toy_model(), Arc::new(WhitespaceTokenizer), "a", config)
                .unwrap();
        let lines: Arc<[String]> = ["c", "a a", "c c"].iter().map(|s| s.to_string()).collect();
        let result = ScoredParagraph {
            score: 0.75,
            chars: 4,
            range: LineRange::new(1, 3),
            lines,
            path: Arc::from(Path::new("docs/a.txt")),
        };
        (session, result)
    }

    #[test]
    fn test_text_line() {
        let (session, result) = fixture();
        let (mut manager, out, _) = manager(OutputFormat::Text);
        manager.result_header().unwrap();
        manager.results(&session, &[result]).unwrap();
        let text = out.text();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(RESULT_HEADER));
        assert_eq!(lines.next(), Some("0.7500\t4\tdocs/a.txt:2-3\ta a|c c"));
    }

    #[test]
    fn test_quote_lines() {
        let (session, result) = fixture();
        let (mut manager, out, _) = manager(OutputFormat::Quote);
        manager.results(&session, &[result]).unwrap();
        assert_eq!(out.text(), "0.7500\t4\tdocs/a.txt:2-3\n> a a\n> c c\n");
    }

    #[test]
    fn test_json_line() {
        let (session, result) = fixture();
        let (mut manager, out, _) = manager(OutputFormat::Json);
        manager.result_header().unwrap();
        manager.results(&session, &[result]).unwrap();
        let value: serde_json::Value = serde_json::from_str(out.text().trim()).unwrap();
        assert_eq!(value["path"], "docs/a.txt");
        assert_eq!(value["start"], 2);
        assert_eq!(value["end"], 3);
        assert_eq!(value["lines"][1], "c c");
    }

    #[test]
    fn test_status_lines() {
        let (mut manager, out, _) = manager(OutputFormat::Text);
        let status = FileStatus {
            path: "a.txt".to_string(),
            mtime: 0,
            state: IndexState::Stale,
        };
        manager.statuses([status], true).unwrap();
        let text = out.text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], STATUS_HEADER);
        assert!(lines[1].starts_with("a.txt\t"));
        assert!(lines[1].ends_with("\t!"));
    }

    #[test]
    fn test_error_with_suggestions() {
        let (mut manager, _, err) = manager(OutputFormat::Text);
        let code = manager
            .error(&DvgError::ModelNotFound {
                name: "en".to_string(),
            })
            .unwrap();
        assert_eq!(code, ExitCode::NotFound);
        assert!(err.text().starts_with("Error: Model not found: en"));
    }
}
