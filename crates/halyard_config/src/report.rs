use std::collections::HashMap;
use std::io::Write;
use std::ops::Range;
use std::path::PathBuf;

use crate::NodeFilter;
use crate::Problem;
use crate::ProblemSet;
use crate::Severity;

/// Source information for the file a configuration was loaded from
#[derive(Debug, Clone)]
pub struct SourceInfo {
    pub file_path: PathBuf,
    pub content: String,
}

/// Byte spans of configuration nodes within their source file.
///
/// Filled in by the loader so problems can be rendered against the text
/// that caused them.
#[derive(Debug, Clone)]
pub struct SourceMap {
    source: SourceInfo,
    spans: HashMap<NodeFilter, Range<usize>>,
}

impl SourceMap {
    pub fn new(source: SourceInfo) -> Self {
        Self {
            source,
            spans: HashMap::new(),
        }
    }

    pub fn source(&self) -> &SourceInfo {
        &self.source
    }

    pub fn insert(&mut self, filter: NodeFilter, span: Range<usize>) {
        self.spans.insert(filter, span);
    }

    /// The span recorded for exactly `filter`.
    pub fn span(&self, filter: &NodeFilter) -> Option<Range<usize>> {
        self.spans.get(filter).cloned()
    }

    /// The span of `filter`, or of its closest ancestor with a known span.
    pub fn locate(&self, filter: &NodeFilter) -> Option<Range<usize>> {
        (1..=filter.len())
            .rev()
            .find_map(|len| self.span(&filter.truncated(len)))
    }
}

fn severity_label(severity: Severity) -> &'static str {
    match severity {
        Severity::None => "None",
        Severity::Warning => "Warning",
        Severity::Error => "Error",
        Severity::Fatal => "Fatal",
    }
}

fn severity_ansi(severity: Severity) -> &'static str {
    match severity {
        Severity::None => "\x1b[0m",
        Severity::Warning => "\x1b[33m",
        Severity::Error => "\x1b[31m",
        Severity::Fatal => "\x1b[35m",
    }
}

/// Format problems for display, grouped by location.
///
/// Problems whose location has a span in `sources` are rendered with
/// ariadne against the configuration text; the rest are formatted manually.
pub fn format_problems(problems: &ProblemSet, sources: Option<&SourceMap>) -> String {
    let mut output = Vec::new();

    for (filter, group) in problems.group_by_location() {
        let location = filter.map_or_else(|| crate::filter::GLOBAL.to_string(), |f| f.to_string());
        writeln!(&mut output, "\x1b[1mProblems in {}:\x1b[0m", location).ok();

        for problem in group {
            let span = sources.zip(filter).and_then(|(sources, filter)| {
                sources.locate(filter).map(|span| (sources.source(), span))
            });
            match span {
                Some((source, span)) => write_report(&mut output, problem, source, span),
                None => write_plain(&mut output, problem),
            }
        }
        writeln!(&mut output).ok();
    }

    String::from_utf8_lossy(&output).to_string()
}

fn write_plain(output: &mut Vec<u8>, problem: &Problem) {
    let severity = problem.severity();
    writeln!(
        output,
        "{}{}\x1b[0m: {}",
        severity_ansi(severity),
        severity_label(severity),
        problem.message()
    )
    .ok();
    if let Some(remediation) = problem.remediation() {
        writeln!(output, "  = help: {}", remediation).ok();
    }
    if !problem.options().is_empty() {
        writeln!(output, "  = options: {}", problem.options().join(", ")).ok();
    }
}

fn write_report(output: &mut Vec<u8>, problem: &Problem, source: &SourceInfo, span: Range<usize>) {
    use ariadne::Color;
    use ariadne::Label;
    use ariadne::Report;
    use ariadne::ReportKind;
    use ariadne::Source;

    let (kind, color) = match problem.severity() {
        Severity::Warning => (ReportKind::Warning, Color::Yellow),
        Severity::Fatal => (ReportKind::Custom("Fatal", Color::Magenta), Color::Magenta),
        Severity::Error | Severity::None => (ReportKind::Error, Color::Red),
    };

    let file_id = source.file_path.to_string_lossy().to_string();
    let mut report = Report::build(kind, (file_id.clone(), span.clone()))
        .with_message(problem.message())
        .with_label(
            Label::new((file_id.clone(), span))
                .with_message(problem.location())
                .with_color(color),
        );
    if let Some(remediation) = problem.remediation() {
        report = report.with_help(remediation);
    }
    if !problem.options().is_empty() {
        report = report.with_note(format!("options: {}", problem.options().join(", ")));
    }

    let source = Source::from(source.content.clone());
    report.finish().write((file_id, source), &mut *output).ok();
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ProblemBuilder;

    /// Strip ANSI escape sequences so snapshot output is stable and readable.
    fn strip_ansi(s: &str) -> String {
        let mut out = String::with_capacity(s.len());
        let mut chars = s.chars();
        while let Some(c) = chars.next() {
            if c == '\x1b' {
                for c2 in chars.by_ref() {
                    if c2 == 'm' {
                        break;
                    }
                }
            } else {
                out.push(c);
            }
        }
        out
    }

    fn problems() -> ProblemSet {
        let account = NodeFilter::global()
            .deployment("prod")
            .provider("google")
            .account("b");
        [
            ProblemBuilder::new(Severity::Fatal, "No deployment has been set").build(),
            ProblemBuilder::new(Severity::Error, "No google project supplied.")
                .filter(account.clone())
                .build(),
            ProblemBuilder::new(Severity::Warning, "Account name should be lowercase")
                .filter(account)
                .remediation("Rename the account")
                .options(["b", "b-2"])
                .build(),
        ]
        .into_iter()
        .collect::<Result<ProblemSet, _>>()
        .unwrap()
    }

    #[test]
    fn test_format_without_sources() {
        let output = strip_ansi(&format_problems(&problems(), None));
        insta::assert_snapshot!(output, @r"
        Problems in Global:
        Fatal: No deployment has been set

        Problems in deployment:prod/provider:google/account:b:
        Error: No google project supplied.
        Warning: Account name should be lowercase
          = help: Rename the account
          = options: b, b-2
        ");
    }

    #[test]
    fn test_format_colors() {
        let set: ProblemSet = [ProblemBuilder::new(Severity::Error, "bad")
            .filter(NodeFilter::global().deployment("prod"))
            .build()
            .unwrap()]
        .into_iter()
        .collect();

        let output = format_problems(&set, None);
        let expected = "\u{1b}[1mProblems in deployment:prod:\u{1b}[0m\n\u{1b}[31mError\u{1b}[0m: bad\n\n";
        assert_eq!(output, expected);
    }

    #[test]
    fn test_format_single_global_header() {
        let set: ProblemSet = [
            ProblemBuilder::new(Severity::Fatal, "No deployment has been set").build(),
            ProblemBuilder::new(Severity::Error, "Config is unreadable")
                .filter(NodeFilter::global())
                .build(),
        ]
        .into_iter()
        .collect::<Result<ProblemSet, _>>()
        .unwrap();

        let output = strip_ansi(&format_problems(&set, None));
        insta::assert_snapshot!(output, @r"
        Problems in Global:
        Fatal: No deployment has been set
        Error: Config is unreadable
        ");
    }

    #[test]
    fn test_format_empty() {
        assert_eq!(format_problems(&ProblemSet::new(), None), "");
    }

    #[test]
    fn test_locate_falls_back_to_ancestor() {
        let content = "[deployments.prod]\nversion = \"1.0\"\n";
        let mut sources = SourceMap::new(SourceInfo {
            file_path: PathBuf::from("/tmp/halconfig.toml"),
            content: content.to_string(),
        });
        let prod = NodeFilter::global().deployment("prod");
        sources.insert(prod.clone(), 13..17);

        let account = prod.clone().provider("google").account("a");
        assert_eq!(sources.span(&account), None);
        assert_eq!(sources.locate(&account), Some(13..17));
        assert_eq!(sources.locate(&NodeFilter::global().deployment("dev")), None);
        assert_eq!(sources.locate(&NodeFilter::global()), None);
    }

    #[test]
    fn test_format_with_sources() {
        let content = "[deployments.prod]\nversion = \"\"\n";
        let mut sources = SourceMap::new(SourceInfo {
            file_path: PathBuf::from("/tmp/halconfig.toml"),
            content: content.to_string(),
        });
        let prod = NodeFilter::global().deployment("prod");
        sources.insert(prod.clone(), 13..17);

        let set: ProblemSet = [ProblemBuilder::new(Severity::Error, "No version set")
            .filter(prod)
            .remediation("Pick a version")
            .build()
            .unwrap()]
        .into_iter()
        .collect();

        let output = strip_ansi(&format_problems(&set, Some(&sources)));
        assert!(output.starts_with("Problems in deployment:prod:\n"));
        assert!(output.contains("Error: No version set"));
        assert!(output.contains("/tmp/halconfig.toml:1:14"));
        assert!(output.contains("deployment:prod"));
        assert!(output.contains("Pick a version"));
    }
}
