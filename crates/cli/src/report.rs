//! Rendering validation results for people and for tooling.

use std::fmt::Write as _;
use std::path::Path;

use chrono::{DateTime, Utc};
use rulecheck_rules::{CompilationError, RuleErrorKind, RuleSite, ValidateError, Validator};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Status {
    Clean,
    RuleErrors,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReportedError {
    pub type_name: String,
    pub field: String,
    pub attribute: String,
    pub expression: String,
    pub kind: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub column: Option<usize>,
    pub message: String,
    /// The error as [`CompilationError`] displays it.
    #[serde(skip)]
    pub rendered: String,
}

impl From<&CompilationError> for ReportedError {
    fn from(err: &CompilationError) -> Self {
        Self {
            type_name: err.type_name.clone(),
            field: err.field.clone(),
            attribute: err.attribute.clone(),
            expression: err.expression.clone(),
            kind: kind_label(err.error.kind),
            column: err.error.column,
            message: err.message().to_string(),
            rendered: err.to_string(),
        }
    }
}

fn kind_label(kind: RuleErrorKind) -> &'static str {
    match kind {
        RuleErrorKind::Syntax => "syntax",
        RuleErrorKind::UnresolvedSymbol => "unresolved_symbol",
        RuleErrorKind::Arity => "arity",
        RuleErrorKind::TypeMismatch => "type_mismatch",
        RuleErrorKind::Other => "other",
    }
}

/// Outcome of one validation run.
#[derive(Debug, Clone, Serialize)]
pub struct Report {
    pub module: String,
    pub checked_at: DateTime<Utc>,
    pub status: Status,
    pub errors: Vec<ReportedError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

impl Report {
    /// Validate `path` and capture the outcome, fatal failures included.
    pub fn run(validator: &Validator, path: &Path) -> Self {
        match validator.check(path) {
            Ok(errors) => Self::from_errors(path, &errors),
            Err(err) => Self::failed(path, &err),
        }
    }

    pub fn from_errors(path: &Path, errors: &[CompilationError]) -> Self {
        Self {
            module: path.display().to_string(),
            checked_at: Utc::now(),
            status: if errors.is_empty() {
                Status::Clean
            } else {
                Status::RuleErrors
            },
            errors: errors.iter().map(ReportedError::from).collect(),
            failure: None,
        }
    }

    pub fn failed(path: &Path, err: &ValidateError) -> Self {
        Self {
            module: path.display().to_string(),
            checked_at: Utc::now(),
            status: Status::Failed,
            errors: Vec::new(),
            failure: Some(err.to_string()),
        }
    }

    pub fn exit_code(&self) -> u8 {
        match self.status {
            Status::Clean => 0,
            Status::RuleErrors => 1,
            Status::Failed => 2,
        }
    }

    pub fn render_text(&self) -> String {
        let mut out = String::new();
        match self.status {
            Status::Clean => {
                let _ = writeln!(out, "{}: all rules compiled", self.module);
            }
            Status::RuleErrors => {
                for e in &self.errors {
                    let _ = writeln!(out, "error: {}", e.rendered);
                }
                let noun = if self.errors.len() == 1 { "rule" } else { "rules" };
                let _ = writeln!(
                    out,
                    "{}: {} {noun} failed to compile",
                    self.module,
                    self.errors.len()
                );
            }
            Status::Failed => {
                let _ = writeln!(out, "{}: validation failed", self.module);
                if let Some(failure) = &self.failure {
                    let _ = writeln!(out, "{failure}");
                }
            }
        }
        out
    }

    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

// ── inspect ─────────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize)]
pub struct SiteView<'a> {
    pub type_name: &'a str,
    pub field: &'a str,
    pub attribute: &'a str,
    pub expression: Option<&'a str>,
}

impl<'a> From<&'a RuleSite> for SiteView<'a> {
    fn from(site: &'a RuleSite) -> Self {
        Self {
            type_name: &site.type_name,
            field: &site.field,
            attribute: &site.attribute,
            expression: site.expression.as_deref(),
        }
    }
}

pub fn render_sites_text(sites: &[RuleSite]) -> String {
    let mut out = String::new();
    for site in sites {
        let _ = writeln!(
            out,
            "{}.{}\t{}(\"{}\")",
            site.type_name,
            site.field,
            site.attribute,
            site.expression.as_deref().unwrap_or("")
        );
    }
    let _ = writeln!(out, "{} rule annotation(s)", sites.len());
    out
}

pub fn render_sites_json(sites: &[RuleSite]) -> serde_json::Result<String> {
    let views: Vec<SiteView<'_>> = sites.iter().map(SiteView::from).collect();
    serde_json::to_string_pretty(&views)
}

#[cfg(test)]
mod tests {
    use rulecheck_rules::RuleError;

    use super::*;

    fn unresolved() -> CompilationError {
        CompilationError {
            type_name: "Model".to_string(),
            field: "PassportNumber".to_string(),
            attribute: "AssertThat".to_string(),
            expression: "IsDigitChain(PassportNumber)".to_string(),
            error: RuleError::new(
                RuleErrorKind::UnresolvedSymbol,
                "Parse error at column 1: Function 'IsDigitChain' not known.",
            )
            .at(1),
        }
    }

    #[test]
    fn clean_report_exits_zero() {
        let report = Report::from_errors(Path::new("App.rmod"), &[]);
        assert_eq!(report.status, Status::Clean);
        assert_eq!(report.exit_code(), 0);
        assert_eq!(report.render_text(), "App.rmod: all rules compiled\n");
    }

    #[test]
    fn rule_errors_exit_one_and_render_each_error() {
        let report = Report::from_errors(Path::new("App.rmod"), &[unresolved()]);
        assert_eq!(report.exit_code(), 1);

        let text = report.render_text();
        assert_eq!(text.lines().next(), Some(format!("error: {}", unresolved()).as_str()));
        assert!(text.starts_with(
            "error: Model.PassportNumber [AssertThat(\"IsDigitChain(PassportNumber)\")]:"
        ));
        assert!(text.ends_with("App.rmod: 1 rule failed to compile\n"));
    }

    #[test]
    fn json_report_carries_kind_and_column() {
        let report = Report::from_errors(Path::new("App.rmod"), &[unresolved()]);
        let value: serde_json::Value = serde_json::from_str(&report.to_json().unwrap()).unwrap();

        assert_eq!(value["status"], "rule_errors");
        assert_eq!(value["errors"][0]["kind"], "unresolved_symbol");
        assert_eq!(value["errors"][0]["column"], 1);
        assert!(value["checked_at"].is_string());
        assert!(value.get("failure").is_none());
        assert!(value["errors"][0].get("rendered").is_none());
    }

    #[test]
    fn fatal_failure_exits_two() {
        let err = ValidateError::Unclassified {
            type_name: "Model".to_string(),
            field: "A".to_string(),
            attribute: "AssertThat".to_string(),
            source: "broken".into(),
        };
        let report = Report::failed(Path::new("App.rmod"), &err);

        assert_eq!(report.exit_code(), 2);
        assert!(report.errors.is_empty());
        assert!(report
            .render_text()
            .contains("unclassified failure compiling AssertThat on Model.A: broken"));
    }

    #[test]
    fn sites_render_as_json_list() {
        let sites = vec![RuleSite {
            type_name: "Model".to_string(),
            field: "Level".to_string(),
            attribute: "AssertThat".to_string(),
            expression: Some("Level == Score.High".to_string()),
        }];
        let value: serde_json::Value =
            serde_json::from_str(&render_sites_json(&sites).unwrap()).unwrap();
        assert_eq!(value[0]["field"], "Level");
        assert!(render_sites_text(&sites).contains("Model.Level\tAssertThat(\"Level == Score.High\")"));
    }
}
