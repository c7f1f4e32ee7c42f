//! Message-based failure classification.
//!
//! # Design Decisions
//! - Rules are an ordered list of `(predicate, kind)` pairs; first match wins
//! - Predicates see the lowercased message text
//! - New rules are added with [`Classifier::push_rule`], control flow never changes

use std::fmt;

use crate::tracker::types::ErrorKind;

type Predicate = Box<dyn Fn(&str) -> bool + Send + Sync>;

/// One classification rule.
pub struct Rule {
    name: &'static str,
    predicate: Predicate,
    kind: ErrorKind,
}

impl Rule {
    /// Build a rule from an arbitrary predicate over the lowercased message.
    pub fn new<P>(name: &'static str, kind: ErrorKind, predicate: P) -> Self
    where
        P: Fn(&str) -> bool + Send + Sync + 'static,
    {
        Self {
            name,
            predicate: Box::new(predicate),
            kind,
        }
    }

    /// Build a rule matching when any needle occurs in the message.
    pub fn contains_any(name: &'static str, kind: ErrorKind, needles: &'static [&'static str]) -> Self {
        Self::new(name, kind, move |msg| needles.iter().any(|n| msg.contains(n)))
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    pub fn kind(&self) -> ErrorKind {
        self.kind
    }
}

impl fmt::Debug for Rule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Rule")
            .field("name", &self.name)
            .field("kind", &self.kind)
            .finish()
    }
}

/// Ordered rule list.
#[derive(Debug)]
pub struct Classifier {
    rules: Vec<Rule>,
}

impl Classifier {
    /// A classifier with no rules; everything falls through.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Append a rule after the existing ones.
    pub fn push_rule(&mut self, rule: Rule) {
        self.rules.push(rule);
    }

    /// Insert a rule ahead of the existing ones.
    pub fn prepend_rule(&mut self, rule: Rule) {
        self.rules.insert(0, rule);
    }

    pub fn rules(&self) -> &[Rule] {
        &self.rules
    }

    /// First matching kind, if any.
    pub fn classify(&self, message: &str) -> Option<ErrorKind> {
        let lowered = message.to_lowercase();
        self.rules
            .iter()
            .find(|rule| (rule.predicate)(&lowered))
            .map(|rule| rule.kind)
    }

    /// First matching kind, or `fallback`.
    pub fn classify_or(&self, message: &str, fallback: ErrorKind) -> ErrorKind {
        self.classify(message).unwrap_or(fallback)
    }
}

impl Default for Classifier {
    fn default() -> Self {
        let mut classifier = Self::empty();
        classifier.push_rule(Rule::contains_any(
            "rate_limit",
            ErrorKind::RpcRateLimit,
            &["429", "rate limit", "too many requests"],
        ));
        classifier.push_rule(Rule::contains_any(
            "timeout",
            ErrorKind::RpcTimeout,
            &["timeout", "timed out", "deadline has elapsed"],
        ));
        classifier.push_rule(Rule::contains_any(
            "user_rejected",
            ErrorKind::WalletSignature,
            &["user rejected", "rejected the request"],
        ));
        classifier.push_rule(Rule::contains_any(
            "wallet_not_connected",
            ErrorKind::WalletConnection,
            &["wallet not connected", "wallet disconnected"],
        ));
        classifier.push_rule(Rule::contains_any(
            "insufficient_funds",
            ErrorKind::InsufficientFunds,
            &["insufficient funds", "insufficient lamports", "insufficientfunds"],
        ));
        classifier.push_rule(Rule::contains_any(
            "account_not_found",
            ErrorKind::AccountNotFound,
            &["account not found", "could not find account", "accountnotfound"],
        ));
        classifier.push_rule(Rule::contains_any(
            "simulation",
            ErrorKind::TransactionSimulation,
            &["simulation failed", "simulate"],
        ));
        classifier.push_rule(Rule::contains_any(
            "blockhash",
            ErrorKind::TransactionConfirmation,
            &["blockhash not found", "block height exceeded"],
        ));
        classifier.push_rule(Rule::contains_any(
            "program_error",
            ErrorKind::ProgramError,
            &["custom program error", "program error", "instruction error"],
        ));
        classifier
    }
}
