//! Safety gate: decides whether a statement may run now, needs an explicit
//! confirmation, or is refused outright.
//!
//! - SELECT and INSERT are safe.
//! - UPDATE and DELETE are destructive. They always need a top-level WHERE
//!   clause (a hard stop that confirmation cannot override) and, under the
//!   default policies, a confirmation.
//! - Free-text SQL is scanned for `DROP`, `DELETE FROM` and `TRUNCATE TABLE`.
//!   This is a UX safeguard against accidents. It is not an authorization
//!   boundary: once confirmed the statement runs as typed.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::dialect::Dialect;
use crate::error::{AdminError, AdminResult};
use crate::preview::parse_mutation;
use crate::query_spec::{Operator, QuerySpec};
use crate::sql_text::{detect_kind, has_multiple_statements};
use crate::statement::{Statement, StatementKind};
use crate::trace::GATE_TARGET;

/// The builder a spec came from. Each maps to a [`GatePolicy`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BuilderSurface {
    /// The basic query builder.
    #[default]
    Basic,
    /// The advanced (modal) query builder.
    Advanced,
    /// The bulk update-or-delete panel.
    Bulk,
}

impl std::str::FromStr for BuilderSurface {
    type Err = AdminError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "basic" => Ok(Self::Basic),
            "advanced" => Ok(Self::Advanced),
            "bulk" => Ok(Self::Bulk),
            other => Err(AdminError::validation(format!(
                "Unknown builder surface: {other}"
            ))),
        }
    }
}

/// What to do when free-text SQL contains a dangerous keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DangerousSqlPolicy {
    /// Run it.
    Allow,
    /// Run it and log a warning.
    Warn,
    /// Require the typed confirmation phrase.
    #[default]
    Confirm,
    /// Refuse it.
    Error,
}

/// Per-surface gate settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GatePolicy {
    /// Destructive statements need `confirmed = true`.
    pub confirm_destructive: bool,
    /// UPDATE/DELETE predicates may only use `=`.
    pub equality_predicates_only: bool,
    /// Offer a count + sample preview for destructive statements.
    pub preview_destructive: bool,
    pub free_text: DangerousSqlPolicy,
}

impl Default for GatePolicy {
    fn default() -> Self {
        Self {
            confirm_destructive: true,
            equality_predicates_only: false,
            preview_destructive: true,
            free_text: DangerousSqlPolicy::default(),
        }
    }
}

impl GatePolicy {
    pub fn for_surface(surface: BuilderSurface) -> Self {
        match surface {
            BuilderSurface::Basic | BuilderSurface::Advanced => Self::default(),
            BuilderSurface::Bulk => Self {
                equality_predicates_only: true,
                ..Self::default()
            },
        }
    }

    pub fn with_free_text(mut self, policy: DangerousSqlPolicy) -> Self {
        self.free_text = policy;
        self
    }
}

/// Outcome of a gate evaluation that did not block.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GateReport {
    pub destructive: bool,
    pub requires_confirmation: bool,
    /// A preview should be shown before confirming.
    pub preview: bool,
}

/// Destructive statement class found by [`scan_dangerous_sql`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DangerousAction {
    Drop,
    Delete,
    Truncate,
}

impl std::fmt::Display for DangerousAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            DangerousAction::Drop => "DROP",
            DangerousAction::Delete => "DELETE",
            DangerousAction::Truncate => "TRUNCATE",
        })
    }
}

static DANGEROUS_PATTERNS: LazyLock<Vec<(Regex, DangerousAction)>> = LazyLock::new(|| {
    [
        (r"(?i)\bDROP\s+(TABLE|DATABASE|INDEX|VIEW)\b", DangerousAction::Drop),
        (r"(?i)\bDELETE\s+FROM\b", DangerousAction::Delete),
        (r"(?i)\bTRUNCATE\s+TABLE\b", DangerousAction::Truncate),
    ]
    .into_iter()
    .map(|(pattern, action)| {
        (
            Regex::new(pattern).expect("invalid built-in dangerous SQL regex"),
            action,
        )
    })
    .collect()
});

/// Case-insensitive scan of free-text SQL for destructive statements.
///
/// Matches anywhere in the text, quoted content included, so it errs on the
/// side of asking.
pub fn scan_dangerous_sql(sql: &str) -> Option<DangerousAction> {
    DANGEROUS_PATTERNS
        .iter()
        .find(|(re, _)| re.is_match(sql))
        .map(|(_, action)| *action)
}

/// Applies a [`GatePolicy`] to specs, statements and free-text SQL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SafetyGate {
    policy: GatePolicy,
    dialect: Dialect,
}

impl SafetyGate {
    pub fn new(policy: GatePolicy, dialect: Dialect) -> Self {
        Self { policy, dialect }
    }

    pub fn for_surface(surface: BuilderSurface, dialect: Dialect) -> Self {
        Self::new(GatePolicy::for_surface(surface), dialect)
    }

    pub fn policy(&self) -> &GatePolicy {
        &self.policy
    }

    fn report(&self, kind: StatementKind) -> GateReport {
        let destructive = kind.is_destructive();
        GateReport {
            destructive,
            requires_confirmation: destructive && self.policy.confirm_destructive,
            preview: destructive && self.policy.preview_destructive,
        }
    }

    /// Gate a spec before it is synthesized.
    pub fn evaluate_spec(&self, spec: &QuerySpec) -> AdminResult<GateReport> {
        spec.check_shape()?;

        let kind = spec.kind();
        if kind.is_destructive() && self.policy.equality_predicates_only {
            if let Some(pred) = spec.predicates().iter().find(|p| p.operator != Operator::Eq) {
                return Err(AdminError::PolicyViolation(format!(
                    "only '=' predicates are allowed here, got '{}' on '{}'",
                    pred.operator, pred.column
                )));
            }
            if spec.raw_filter().is_some() {
                return Err(AdminError::PolicyViolation(
                    "free-text filters are not allowed here".to_string(),
                ));
            }
        }

        let report = self.report(kind);
        tracing::debug!(
            target: GATE_TARGET,
            kind = kind.as_str(),
            table = spec.table(),
            destructive = report.destructive,
            requires_confirmation = report.requires_confirmation,
            "spec gated"
        );
        Ok(report)
    }

    /// Gate a rendered statement, trusting nothing but its text.
    ///
    /// The text must be a single statement whose leading keyword matches
    /// `kind`. UPDATE and DELETE must carry a non-empty top-level WHERE.
    pub fn evaluate_statement(&self, stmt: &Statement) -> AdminResult<GateReport> {
        match detect_kind(&stmt.text) {
            Some(kind) if kind == stmt.kind => {}
            Some(kind) => {
                return Err(AdminError::PolicyViolation(format!(
                    "statement is labelled {} but its text is {}",
                    stmt.kind, kind
                )));
            }
            None => {
                return Err(AdminError::PolicyViolation(format!(
                    "statement text is not a {} statement",
                    stmt.kind
                )));
            }
        }
        if has_multiple_statements(&stmt.text, self.dialect) {
            return Err(AdminError::PolicyViolation(
                "only a single statement can be executed".to_string(),
            ));
        }

        if stmt.kind.is_destructive() {
            let parts = parse_mutation(stmt, self.dialect)?;
            if !parts.has_filter() {
                tracing::warn!(
                    target: GATE_TARGET,
                    kind = stmt.kind.as_str(),
                    table = parts.table.as_str(),
                    "blocked statement without WHERE clause"
                );
                return Err(AdminError::MissingPredicate(parts.table.as_str().to_string()));
            }
        }

        let report = self.report(stmt.kind);
        tracing::debug!(
            target: GATE_TARGET,
            kind = stmt.kind.as_str(),
            destructive = report.destructive,
            requires_confirmation = report.requires_confirmation,
            "statement gated"
        );
        Ok(report)
    }

    /// Refuse to proceed when confirmation is required but missing.
    pub fn check_confirmed(&self, report: &GateReport, confirmed: bool) -> AdminResult<()> {
        if report.requires_confirmation && !confirmed {
            tracing::info!(target: GATE_TARGET, "destructive statement awaiting confirmation");
            return Err(AdminError::ConfirmationRequired(
                "destructive statement must be confirmed before it runs".to_string(),
            ));
        }
        Ok(())
    }

    /// Gate free-text SQL.
    ///
    /// Returns the dangerous action found, if any, once the policy allows the
    /// statement through. Under [`DangerousSqlPolicy::Confirm`] the supplied
    /// confirmation must equal `phrase` (surrounding whitespace ignored).
    pub fn check_free_text(
        &self,
        sql: &str,
        confirmation: Option<&str>,
        phrase: &str,
    ) -> AdminResult<Option<DangerousAction>> {
        let Some(action) = scan_dangerous_sql(sql) else {
            return Ok(None);
        };

        match self.policy.free_text {
            DangerousSqlPolicy::Allow => {}
            DangerousSqlPolicy::Warn => {
                tracing::warn!(target: GATE_TARGET, action = %action, "running dangerous free-text SQL");
            }
            DangerousSqlPolicy::Confirm => {
                if confirmation.map(str::trim) != Some(phrase) {
                    return Err(AdminError::ConfirmationRequired(format!(
                        "{action} statement detected; type \"{phrase}\" to proceed"
                    )));
                }
                tracing::warn!(target: GATE_TARGET, action = %action, "dangerous free-text SQL confirmed");
            }
            DangerousSqlPolicy::Error => {
                return Err(AdminError::PolicyViolation(format!(
                    "{action} statements are not allowed from the SQL box"
                )));
            }
        }
        Ok(Some(action))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::query_spec::{DeleteSpec, Predicate, SelectSpec, UpdateSpec};
    use crate::statement::Params;

    const PHRASE: &str = "I UNDERSTAND THE RISK";

    fn gate(surface: BuilderSurface) -> SafetyGate {
        SafetyGate::for_surface(surface, Dialect::MySql)
    }

    fn stmt(kind: StatementKind, text: &str) -> Statement {
        Statement::new(kind, text, Params::new())
    }

    #[test]
    fn select_and_insert_are_safe() {
        let g = gate(BuilderSurface::Basic);
        let report = g
            .evaluate_statement(&stmt(StatementKind::Select, "SELECT * FROM `t`"))
            .unwrap();
        assert!(!report.destructive);
        assert!(!report.requires_confirmation);
        assert!(!report.preview);

        let report = g
            .evaluate_statement(&stmt(StatementKind::Insert, "INSERT INTO `t` (`a`) VALUES (:p0)"))
            .unwrap();
        assert!(!report.requires_confirmation);
    }

    #[test]
    fn delete_with_where_needs_confirmation() {
        let report = gate(BuilderSurface::Basic)
            .evaluate_statement(&stmt(StatementKind::Delete, "DELETE FROM `t` WHERE `id` = :p0"))
            .unwrap();
        assert!(report.destructive);
        assert!(report.requires_confirmation);
        assert!(report.preview);
    }

    #[test]
    fn delete_without_where_is_blocked() {
        let err = gate(BuilderSurface::Basic)
            .evaluate_statement(&stmt(StatementKind::Delete, "DELETE FROM `t`"))
            .unwrap_err();
        assert!(matches!(err, AdminError::MissingPredicate(ref t) if t == "t"));
    }

    #[test]
    fn where_inside_literal_does_not_count() {
        let err = gate(BuilderSurface::Basic)
            .evaluate_statement(&stmt(
                StatementKind::Update,
                "UPDATE `t` SET `note` = 'see WHERE clause'",
            ))
            .unwrap_err();
        assert!(err.is_missing_predicate());
    }

    #[test]
    fn mislabelled_statement_is_rejected() {
        let err = gate(BuilderSurface::Basic)
            .evaluate_statement(&stmt(StatementKind::Select, "DELETE FROM `t` WHERE 1=1"))
            .unwrap_err();
        assert!(matches!(err, AdminError::PolicyViolation(_)));
    }

    #[test]
    fn stacked_statements_are_rejected() {
        let err = gate(BuilderSurface::Basic)
            .evaluate_statement(&stmt(
                StatementKind::Select,
                "SELECT * FROM `t`; DROP TABLE `t`",
            ))
            .unwrap_err();
        assert!(matches!(err, AdminError::PolicyViolation(_)));
    }

    #[test]
    fn unconfirmed_destructive_is_refused() {
        let g = gate(BuilderSurface::Advanced);
        let report = g
            .evaluate_statement(&stmt(StatementKind::Update, "UPDATE `t` SET `a` = :p0 WHERE `id` = :p1"))
            .unwrap();
        assert!(g.check_confirmed(&report, false).unwrap_err().is_confirmation_required());
        assert!(g.check_confirmed(&report, true).is_ok());
    }

    #[test]
    fn bulk_surface_allows_only_equality() {
        let g = gate(BuilderSurface::Bulk);
        let ok: QuerySpec = DeleteSpec::new("t").filter(Predicate::eq("id", "1")).into();
        assert!(g.evaluate_spec(&ok).is_ok());

        let bad: QuerySpec = DeleteSpec::new("t")
            .filter(Predicate::new("id", Operator::Gt, "1"))
            .into();
        assert!(matches!(g.evaluate_spec(&bad), Err(AdminError::PolicyViolation(_))));

        let raw: QuerySpec = UpdateSpec::new("t").set("a", "1").raw_filter("id > 1").into();
        assert!(matches!(g.evaluate_spec(&raw), Err(AdminError::PolicyViolation(_))));
    }

    #[test]
    fn bulk_surface_does_not_restrict_select() {
        let spec: QuerySpec = SelectSpec::new("t")
            .filter(Predicate::new("id", Operator::Like, "1%"))
            .into();
        assert!(gate(BuilderSurface::Bulk).evaluate_spec(&spec).is_ok());
    }

    #[test]
    fn spec_without_predicate_blocked_before_confirmation() {
        let spec: QuerySpec = DeleteSpec::new("t").into();
        let err = gate(BuilderSurface::Basic).evaluate_spec(&spec).unwrap_err();
        assert!(err.is_missing_predicate());
    }

    #[test]
    fn dangerous_scan_is_case_insensitive() {
        assert_eq!(scan_dangerous_sql("drop   table users"), Some(DangerousAction::Drop));
        assert_eq!(scan_dangerous_sql("Delete From x"), Some(DangerousAction::Delete));
        assert_eq!(scan_dangerous_sql("truncate table x"), Some(DangerousAction::Truncate));
        assert_eq!(scan_dangerous_sql("DROP VIEW v"), Some(DangerousAction::Drop));
    }

    #[test]
    fn every_built_in_pattern_compiles() {
        let actions: Vec<DangerousAction> = DANGEROUS_PATTERNS.iter().map(|(_, a)| *a).collect();
        assert_eq!(
            actions,
            [DangerousAction::Drop, DangerousAction::Delete, DangerousAction::Truncate]
        );
    }

    #[test]
    fn dangerous_scan_ignores_lookalikes() {
        assert_eq!(scan_dangerous_sql("SELECT dropped_at FROM t"), None);
        assert_eq!(scan_dangerous_sql("UPDATE t SET deleted = 1 WHERE id = 2"), None);
        assert_eq!(scan_dangerous_sql("TRUNCATE t"), None);
    }

    #[test]
    fn free_text_confirm_policy_needs_phrase() {
        let g = gate(BuilderSurface::Basic);
        let err = g.check_free_text("DROP TABLE t", None, PHRASE).unwrap_err();
        assert!(err.is_confirmation_required());
        let err = g
            .check_free_text("DROP TABLE t", Some("i understand the risk"), PHRASE)
            .unwrap_err();
        assert!(err.is_confirmation_required());
        assert_eq!(
            g.check_free_text("DROP TABLE t", Some(" I UNDERSTAND THE RISK "), PHRASE)
                .unwrap(),
            Some(DangerousAction::Drop)
        );
        assert_eq!(g.check_free_text("SELECT 1", None, PHRASE).unwrap(), None);
    }

    #[test]
    fn free_text_error_and_allow_policies() {
        let strict = SafetyGate::new(
            GatePolicy::default().with_free_text(DangerousSqlPolicy::Error),
            Dialect::MySql,
        );
        assert!(matches!(
            strict.check_free_text("TRUNCATE TABLE t", Some(PHRASE), PHRASE),
            Err(AdminError::PolicyViolation(_))
        ));

        let lax = SafetyGate::new(
            GatePolicy::default().with_free_text(DangerousSqlPolicy::Allow),
            Dialect::MySql,
        );
        assert!(lax.check_free_text("TRUNCATE TABLE t", None, PHRASE).is_ok());
    }

    #[test]
    fn surface_parses_case_insensitively() {
        assert_eq!("BULK".parse::<BuilderSurface>().unwrap(), BuilderSurface::Bulk);
        assert!("wizard".parse::<BuilderSurface>().is_err());
    }
}
