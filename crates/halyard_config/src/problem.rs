use serde::Serialize;
use strum::Display;
use strum::EnumString;

use crate::NodeFilter;

/// How badly a problem affects the deployment.
///
/// Severities are ordered, so `severity >= Severity::Error` is the usual way
/// to decide whether a validation run failed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Display, EnumString, Serialize,
)]
#[strum(serialize_all = "UPPERCASE", ascii_case_insensitive)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// No problem at all. Only exists as a point of comparison; a problem
    /// can never be created with it.
    None,

    /// The deployment goes against recommended practice, e.g. an
    /// unauthenticated registry.
    Warning,

    /// The deployment will fail as-is, e.g. a wrong password.
    Error,

    /// The request itself cannot be performed, e.g. updating an account that
    /// doesn't exist.
    Fatal,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProblemError {
    #[error("a problem may not be created with NONE severity: {message}")]
    InvalidSeverity { message: String },
}

/// A single finding about the loaded configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Problem {
    severity: Severity,
    #[serde(rename = "location", serialize_with = "serialize_location")]
    filter: Option<NodeFilter>,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    remediation: Option<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    options: Vec<String>,
}

fn serialize_location<S>(filter: &Option<NodeFilter>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: serde::Serializer,
{
    match filter {
        Some(filter) => serializer.collect_str(filter),
        None => serializer.serialize_str(crate::filter::GLOBAL),
    }
}

impl Problem {
    pub fn new(
        severity: Severity,
        filter: Option<NodeFilter>,
        message: impl Into<String>,
        remediation: Option<String>,
        options: Vec<String>,
    ) -> Result<Self, ProblemError> {
        let message = message.into();
        if severity == Severity::None {
            return Err(ProblemError::InvalidSeverity { message });
        }

        Ok(Self {
            severity,
            filter,
            message,
            remediation,
            options,
        })
    }

    /// A FATAL problem about the request as a whole.
    pub fn fatal(message: impl Into<String>, options: Vec<String>) -> Self {
        Self {
            severity: Severity::Fatal,
            filter: None,
            message: message.into(),
            remediation: None,
            options,
        }
    }

    pub fn severity(&self) -> Severity {
        self.severity
    }

    /// Where the problem was found, `None` for global problems.
    pub fn filter(&self) -> Option<&NodeFilter> {
        self.filter.as_ref()
    }

    /// Human-readable location, `Global` when the problem has no filter.
    pub fn location(&self) -> String {
        match &self.filter {
            Some(filter) => filter.to_string(),
            None => crate::filter::GLOBAL.to_string(),
        }
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn remediation(&self) -> Option<&str> {
        self.remediation.as_deref()
    }

    /// Suggested alternative values, e.g. the names of existing accounts.
    pub fn options(&self) -> &[String] {
        &self.options
    }
}

/// Fluent construction of a single [`Problem`].
#[derive(Debug, Clone)]
pub struct ProblemBuilder {
    severity: Severity,
    filter: Option<NodeFilter>,
    message: String,
    remediation: Option<String>,
    options: Vec<String>,
}

impl ProblemBuilder {
    pub fn new(severity: Severity, message: impl Into<String>) -> Self {
        Self {
            severity,
            filter: None,
            message: message.into(),
            remediation: None,
            options: Vec::new(),
        }
    }

    pub fn filter(mut self, filter: NodeFilter) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn remediation(mut self, remediation: impl Into<String>) -> Self {
        self.remediation = Some(remediation.into());
        self
    }

    pub fn options<I, S>(mut self, options: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.options = options.into_iter().map(Into::into).collect();
        self
    }

    pub fn build(self) -> Result<Problem, ProblemError> {
        Problem::new(
            self.severity,
            self.filter,
            self.message,
            self.remediation,
            self.options,
        )
    }
}

/// Collects the problems reported by one validator for one node.
///
/// The builder is scoped to the node being validated: problems added through
/// it are located at that node unless they carry their own filter.
#[derive(Debug)]
pub struct ProblemSetBuilder {
    scope: NodeFilter,
    problems: Vec<Problem>,
    defect: Option<ProblemError>,
}

impl ProblemSetBuilder {
    pub fn new(scope: NodeFilter) -> Self {
        Self {
            scope,
            problems: Vec::new(),
            defect: None,
        }
    }

    /// The location problems are attached to by default.
    pub fn scope(&self) -> &NodeFilter {
        &self.scope
    }

    pub fn add_problem(&mut self, severity: Severity, message: impl Into<String>) -> &mut Self {
        self.push(ProblemBuilder::new(severity, message))
    }

    pub fn push(&mut self, mut problem: ProblemBuilder) -> &mut Self {
        if problem.filter.is_none() {
            problem.filter = Some(self.scope.clone());
        }

        match problem.build() {
            Ok(problem) => self.problems.push(problem),
            Err(err) => {
                // Keep the first defect; it is reported when the set is built.
                self.defect.get_or_insert(err);
            }
        }
        self
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn build(self) -> Result<ProblemSet, ProblemError> {
        match self.defect {
            Some(err) => Err(err),
            None => Ok(ProblemSet {
                problems: self.problems,
            }),
        }
    }
}

/// The ordered problems found by one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ProblemSet {
    problems: Vec<Problem>,
}

impl ProblemSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, problem: Problem) {
        self.problems.push(problem);
    }

    pub fn extend(&mut self, other: ProblemSet) {
        self.problems.extend(other.problems);
    }

    pub fn len(&self) -> usize {
        self.problems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.problems.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Problem> {
        self.problems.iter()
    }

    pub fn problems(&self) -> &[Problem] {
        &self.problems
    }

    /// The highest severity in the set, `Severity::None` when empty.
    pub fn max_severity(&self) -> Severity {
        self.problems
            .iter()
            .map(Problem::severity)
            .max()
            .unwrap_or(Severity::None)
    }

    /// Returns true if any problem is at least as severe as `severity`.
    pub fn has_at_least(&self, severity: Severity) -> bool {
        self.problems.iter().any(|p| p.severity >= severity)
    }

    /// Only the problems at or above `severity`, in their original order.
    pub fn with_min_severity(&self, severity: Severity) -> ProblemSet {
        ProblemSet {
            problems: self
                .problems
                .iter()
                .filter(|p| p.severity >= severity)
                .cloned()
                .collect(),
        }
    }

    /// Problems grouped by location.
    ///
    /// Groups appear in the order their first problem was reported and keep
    /// the reporting order inside each group. Every global location, with or
    /// without wildcard levels, falls into the single `None` group.
    pub fn group_by_location(&self) -> Vec<(Option<&NodeFilter>, Vec<&Problem>)> {
        let mut groups: Vec<(Option<&NodeFilter>, Vec<&Problem>)> = Vec::new();
        for problem in &self.problems {
            let location = problem.filter().filter(|f| !f.is_global());
            match groups.iter_mut().find(|(f, _)| *f == location) {
                Some((_, group)) => group.push(problem),
                None => groups.push((location, vec![problem])),
            }
        }
        groups
    }
}

impl IntoIterator for ProblemSet {
    type Item = Problem;
    type IntoIter = std::vec::IntoIter<Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.into_iter()
    }
}

impl<'a> IntoIterator for &'a ProblemSet {
    type Item = &'a Problem;
    type IntoIter = std::slice::Iter<'a, Problem>;

    fn into_iter(self) -> Self::IntoIter {
        self.problems.iter()
    }
}

impl FromIterator<Problem> for ProblemSet {
    fn from_iter<I: IntoIterator<Item = Problem>>(iter: I) -> Self {
        Self {
            problems: iter.into_iter().collect(),
        }
    }
}
