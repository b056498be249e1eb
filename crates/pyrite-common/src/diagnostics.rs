//! Diagnostic types and the per-file diagnostic sink.
//!
//! The binder never aborts on a user-source problem; everything recoverable
//! funnels through a [`DiagnosticSink`]. Each diagnostic belongs to a
//! [`DiagnosticRule`] whose severity can be tuned (or suppressed) via
//! [`DiagnosticRules`].

use crate::span::Span;
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Severity reported for a diagnostic.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum DiagnosticCategory {
    Error,
    Warning,
    Information,
}

/// Configured severity for a rule. `None` suppresses the rule entirely.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Severity {
    #[default]
    Default,
    Error,
    Warning,
    Information,
    None,
}

/// Every diagnostic the binding pass can produce.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DiagnosticRule {
    ImportResolution,
    MissingTypeStub,
    MissingModuleSource,
    StringEscape,
    StringFormat,
    WalrusComprehensionTarget,
    GlobalRedefinition,
    NonlocalRedefinition,
    GlobalReassignment,
    NonlocalReassignment,
    NonlocalAtModuleLevel,
    NonlocalNoBinding,
    AwaitOutsideAsync,
    YieldOutsideFunction,
    YieldFromInAsync,
    WildcardInNonModule,
    RaiseOutsideExcept,
    TypeAliasNotModuleLevel,
    AnnotationTargetForm,
}

impl DiagnosticRule {
    /// Stable rule name, as it appears in configuration files.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ImportResolution => "import-resolution",
            Self::MissingTypeStub => "missing-type-stub",
            Self::MissingModuleSource => "missing-module-source",
            Self::StringEscape => "string-escape",
            Self::StringFormat => "string-format",
            Self::WalrusComprehensionTarget => "walrus-comprehension-target",
            Self::GlobalRedefinition => "global-redefinition",
            Self::NonlocalRedefinition => "nonlocal-redefinition",
            Self::GlobalReassignment => "global-reassignment",
            Self::NonlocalReassignment => "nonlocal-reassignment",
            Self::NonlocalAtModuleLevel => "nonlocal-at-module-level",
            Self::NonlocalNoBinding => "nonlocal-no-binding",
            Self::AwaitOutsideAsync => "await-outside-async",
            Self::YieldOutsideFunction => "yield-outside-function",
            Self::YieldFromInAsync => "yield-from-in-async",
            Self::WildcardInNonModule => "wildcard-in-non-module",
            Self::RaiseOutsideExcept => "raise-outside-except",
            Self::TypeAliasNotModuleLevel => "type-alias-not-module-level",
            Self::AnnotationTargetForm => "annotation-target-form",
        }
    }

    /// Severity applied when the configuration does not override the rule.
    #[must_use]
    pub const fn default_category(self) -> DiagnosticCategory {
        match self {
            Self::ImportResolution
            | Self::StringEscape
            | Self::StringFormat
            | Self::WalrusComprehensionTarget
            | Self::GlobalRedefinition
            | Self::NonlocalRedefinition
            | Self::GlobalReassignment
            | Self::NonlocalReassignment
            | Self::NonlocalAtModuleLevel
            | Self::NonlocalNoBinding
            | Self::AwaitOutsideAsync
            | Self::YieldOutsideFunction
            | Self::YieldFromInAsync
            | Self::WildcardInNonModule
            | Self::RaiseOutsideExcept
            | Self::TypeAliasNotModuleLevel
            | Self::AnnotationTargetForm => DiagnosticCategory::Error,
            Self::MissingTypeStub | Self::MissingModuleSource => DiagnosticCategory::Warning,
        }
    }
}

/// Per-rule severity overrides.
#[derive(Clone, Debug, Default)]
pub struct DiagnosticRules {
    overrides: FxHashMap<DiagnosticRule, Severity>,
}

impl DiagnosticRules {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, rule: DiagnosticRule, severity: Severity) {
        self.overrides.insert(rule, severity);
    }

    /// Resolve the effective category for a rule, or `None` when suppressed.
    #[must_use]
    pub fn category(&self, rule: DiagnosticRule) -> Option<DiagnosticCategory> {
        match self.overrides.get(&rule).copied().unwrap_or_default() {
            Severity::Default => Some(rule.default_category()),
            Severity::Error => Some(DiagnosticCategory::Error),
            Severity::Warning => Some(DiagnosticCategory::Warning),
            Severity::Information => Some(DiagnosticCategory::Information),
            Severity::None => None,
        }
    }
}

/// A reported problem, located by byte span.
#[derive(Clone, Debug, Serialize)]
pub struct Diagnostic {
    pub category: DiagnosticCategory,
    pub rule: &'static str,
    pub message: String,
    pub span: Span,
}

/// Collects diagnostics for one file.
#[derive(Debug, Default)]
pub struct DiagnosticSink {
    rules: DiagnosticRules,
    diagnostics: Vec<Diagnostic>,
}

impl DiagnosticSink {
    #[must_use]
    pub fn new(rules: DiagnosticRules) -> Self {
        Self {
            rules,
            diagnostics: Vec::new(),
        }
    }

    /// Report a diagnostic under `rule` at `span`. Dropped when the rule is
    /// configured to `Severity::None`.
    pub fn report(&mut self, rule: DiagnosticRule, message: impl Into<String>, span: Span) {
        if let Some(category) = self.rules.category(rule) {
            self.diagnostics.push(Diagnostic {
                category,
                rule: rule.as_str(),
                message: message.into(),
                span,
            });
        }
    }

    /// Report with an explicit category, bypassing rule configuration only
    /// for the severity (suppression still applies).
    pub fn report_as(
        &mut self,
        category: DiagnosticCategory,
        rule: DiagnosticRule,
        message: impl Into<String>,
        span: Span,
    ) {
        if self.rules.category(rule).is_some() {
            self.diagnostics.push(Diagnostic {
                category,
                rule: rule.as_str(),
                message: message.into(),
                span,
            });
        }
    }

    #[must_use]
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    #[must_use]
    pub fn take(self) -> Vec<Diagnostic> {
        self.diagnostics
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.diagnostics.is_empty()
    }
}
