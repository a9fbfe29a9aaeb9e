use std::{fmt::Display, sync::OnceLock};

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::db_types::{QueryError, User};

//--------------------------------------     Registration       ------------------------------------------------------
/// The result of registering a user from a WeChat profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RegistrationOutcome {
    /// A user with the union id already existed. Nothing was written.
    Existing(User),
    /// The union id was bound to the phone-only account that owns the phone number.
    BoundToPhoneUser(User),
    /// A new user row was created.
    Created(User),
}

impl RegistrationOutcome {
    pub fn user(&self) -> &User {
        match self {
            Self::Existing(u) | Self::BoundToPhoneUser(u) | Self::Created(u) => u,
        }
    }

    pub fn into_user(self) -> User {
        match self {
            Self::Existing(u) | Self::BoundToPhoneUser(u) | Self::Created(u) => u,
        }
    }

    /// The user whose cached entry went stale because of the registration, if any.
    pub fn stale_user_id(&self) -> Option<i64> {
        match self {
            Self::BoundToPhoneUser(u) => Some(u.id),
            _ => None,
        }
    }
}

//--------------------------------------     Wallet filters       ----------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ComparisonOp {
    Eq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
}

impl ComparisonOp {
    pub fn as_sql(&self) -> &'static str {
        match self {
            ComparisonOp::Eq => " = ",
            ComparisonOp::NotEq => " <> ",
            ComparisonOp::Lt => " < ",
            ComparisonOp::LtEq => " <= ",
            ComparisonOp::Gt => " > ",
            ComparisonOp::GtEq => " >= ",
        }
    }

    fn parse(s: &str) -> Option<Self> {
        match s {
            "=" => Some(Self::Eq),
            "!=" | "<>" => Some(Self::NotEq),
            "<" => Some(Self::Lt),
            "<=" => Some(Self::LtEq),
            ">" => Some(Self::Gt),
            ">=" => Some(Self::GtEq),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum SqlValue {
    Int(i64),
    Text(String),
}

impl Display for SqlValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SqlValue::Int(v) => write!(f, "{v}"),
            SqlValue::Text(v) => write!(f, "'{v}'"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Predicate {
    pub column: String,
    pub op: ComparisonOp,
    pub value: SqlValue,
}

/// A conjunction of `column op value` predicates, e.g. `user_id = 5 AND status = 1`.
///
/// Columns are checked against a whitelist and values are always bound as query parameters, so the text a caller
/// supplies never reaches the SQL statement verbatim. An empty filter is rejected: reads by condition must be
/// conditioned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordFilter {
    predicates: Vec<Predicate>,
}

fn predicate_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"^\s*([A-Za-z_][A-Za-z0-9_]*)\s*(<=|>=|<>|!=|=|<|>)\s*(-?\d+|'[^']*')\s*$")
            .expect("static regex is valid")
    })
}

fn conjunction_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)\s+and\s+").expect("static regex is valid"))
}

impl RecordFilter {
    pub fn parse(cond: &str, allowed: &[&str]) -> Result<Self, QueryError> {
        if cond.trim().is_empty() {
            return Err(QueryError::EmptyCondition);
        }
        let predicates = conjunction_regex()
            .split(cond.trim())
            .map(|clause| {
                let caps =
                    predicate_regex().captures(clause).ok_or_else(|| QueryError::InvalidCondition(clause.into()))?;
                let column = caps[1].to_string();
                if !allowed.contains(&column.as_str()) {
                    return Err(QueryError::UnknownColumn(column));
                }
                let op = ComparisonOp::parse(&caps[2]).ok_or_else(|| QueryError::InvalidCondition(clause.into()))?;
                let raw = &caps[3];
                let value = match raw.strip_prefix('\'').and_then(|s| s.strip_suffix('\'')) {
                    Some(text) => SqlValue::Text(text.to_string()),
                    None => SqlValue::Int(raw.parse().map_err(|_| QueryError::InvalidCondition(clause.into()))?),
                };
                Ok(Predicate { column, op, value })
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { predicates })
    }

    pub fn predicates(&self) -> &[Predicate] {
        &self.predicates
    }
}

//--------------------------------------     Balance expression       ------------------------------------------------
/// A balance change that is evaluated by the database (`balance + 100`, `balance - 25`), never a client-computed
/// absolute value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BalanceExpression {
    delta: i64,
}

fn balance_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"^\s*balance\s*([+-])\s*(\d+)\s*$").expect("static regex is valid"))
}

impl BalanceExpression {
    pub fn parse(expr: &str) -> Result<Self, QueryError> {
        let caps = balance_regex().captures(expr).ok_or_else(|| QueryError::InvalidExpression(expr.into()))?;
        let amount = caps[2].parse::<i64>().map_err(|_| QueryError::InvalidExpression(expr.into()))?;
        let delta = if &caps[1] == "-" { -amount } else { amount };
        Ok(Self { delta })
    }

    pub fn delta(&self) -> i64 {
        self.delta
    }
}

impl Display for BalanceExpression {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.delta < 0 {
            write!(f, "balance - {}", self.delta.unsigned_abs())
        } else {
            write!(f, "balance + {}", self.delta)
        }
    }
}
