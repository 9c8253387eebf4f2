use std::io::BufRead;

/// Severity keyword carried by a client log line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Trace,
    Debug,
    Info,
    Warn,
    Error,
    /// Line did not fit the expected column layout. Retained, never dropped.
    Unknown,
}

impl Severity {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "TRACE" => Some(Severity::Trace),
            "DEBUG" => Some(Severity::Debug),
            "INFO" => Some(Severity::Info),
            "WARN" => Some(Severity::Warn),
            "ERROR" => Some(Severity::Error),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Severity::Trace => "TRACE",
            Severity::Debug => "DEBUG",
            Severity::Info => "INFO",
            Severity::Warn => "WARN",
            Severity::Error => "ERROR",
            Severity::Unknown => "UNKNOWN",
        }
    }
}

/// One parsed client log line.
#[derive(Debug, Clone)]
pub struct LogRecord {
    pub severity: Severity,
    /// Original line text, preserved verbatim for archival.
    pub raw: String,
    /// Whitespace-delimited tokens up to and including the module token,
    /// i.e. everything preceding the free-form message.
    pub fields: Vec<String>,
}

/// Line-layout settings for the client's log format.
///
/// The client writes positional, whitespace-delimited lines of the form
/// `<date> <time> <LEVEL> <module> <message...>`; `severity_column` is the
/// token index of `<LEVEL>`. Lines that carry the severity keyword as their
/// first token (`<LEVEL> <module> - <message>`) are also recognized.
#[derive(Debug, Clone)]
pub struct LineFormat {
    pub severity_column: usize,
    /// Substring marking a "new data created" event, matched
    /// case-insensitively anywhere in the line, independent of severity.
    pub data_marker: String,
}

impl Default for LineFormat {
    fn default() -> Self {
        Self {
            severity_column: 2,
            data_marker: "- creating".to_string(),
        }
    }
}

impl LineFormat {
    /// Parse a single line. Total: malformed input yields `Unknown`, never
    /// an error.
    pub fn parse_line(&self, line: &str) -> LogRecord {
        let tokens: Vec<&str> = line.split_whitespace().collect();

        let found = tokens
            .get(self.severity_column)
            .and_then(|t| Severity::from_token(t))
            .map(|severity| (self.severity_column, severity))
            .or_else(|| {
                tokens
                    .first()
                    .and_then(|t| Severity::from_token(t))
                    .map(|severity| (0, severity))
            });

        match found {
            Some((idx, severity)) => {
                // Keep the positional tokens through the module name.
                let field_end = (idx + 2).min(tokens.len());
                LogRecord {
                    severity,
                    raw: line.to_string(),
                    fields: tokens[..field_end].iter().map(|t| t.to_string()).collect(),
                }
            }
            None => LogRecord {
                severity: Severity::Unknown,
                raw: line.to_string(),
                fields: Vec::new(),
            },
        }
    }

    /// True if the line reports a data-creation event.
    pub fn is_data_event(&self, line: &str) -> bool {
        !self.data_marker.is_empty()
            && line.to_lowercase().contains(&self.data_marker.to_lowercase())
    }

    /// Lazily parse a line stream. Single forward pass, one record per line;
    /// I/O errors end the stream (the classifier accounts for short streams
    /// via its artifact checks, so a truncated read degrades rather than
    /// panics).
    pub fn parse<'a, R: BufRead + 'a>(
        &'a self,
        reader: R,
    ) -> impl Iterator<Item = LogRecord> + 'a {
        reader
            .lines()
            .map_while(Result::ok)
            .map(move |line| self.parse_line(&line))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_severity_from_fixed_column() {
        let fmt = LineFormat::default();
        let rec = fmt.parse_line("2024-01-01 10:00:00 ERROR omics.mf.upload x failed");
        assert_eq!(rec.severity, Severity::Error);
        assert_eq!(rec.fields, vec!["2024-01-01", "10:00:00", "ERROR", "omics.mf.upload"]);
        assert_eq!(rec.raw, "2024-01-01 10:00:00 ERROR omics.mf.upload x failed");
    }

    #[test]
    fn test_severity_in_leading_token() {
        let fmt = LineFormat::default();
        let rec = fmt.parse_line("TRACE omics.mf.upload.daris.DarisUtil - Creating asset");
        assert_eq!(rec.severity, Severity::Trace);
        assert!(fmt.is_data_event(&rec.raw));
    }

    #[test]
    fn test_malformed_line_is_unknown_and_retained() {
        let fmt = LineFormat::default();
        let rec = fmt.parse_line("stack trace continuation without a level");
        assert_eq!(rec.severity, Severity::Unknown);
        assert_eq!(rec.raw, "stack trace continuation without a level");
        assert!(rec.fields.is_empty());
    }

    #[test]
    fn test_empty_line_is_unknown() {
        let fmt = LineFormat::default();
        assert_eq!(fmt.parse_line("").severity, Severity::Unknown);
    }

    #[test]
    fn test_marker_is_case_insensitive() {
        let fmt = LineFormat::default();
        assert!(fmt.is_data_event("TRACE a.b.c - CREATING thing"));
        assert!(!fmt.is_data_event("TRACE a.b.c - checking thing"));
    }

    #[test]
    fn test_parse_stream_is_lazy_and_ordered() {
        let fmt = LineFormat::default();
        let input = "2024-01-01 10:00:00 INFO m one\n2024-01-01 10:00:01 WARN m two\n";
        let records: Vec<_> = fmt.parse(Cursor::new(input)).collect();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].severity, Severity::Info);
        assert_eq!(records[1].severity, Severity::Warn);
    }
}
