//! Rewriting of parameter expressions from trigger payload shape to webhook payload shape.
//!
//! A webhook delivers the caller's payload nested under `body`, whereas chat and form
//! triggers expose it at the top level of `$json`. Every string leaf of every node's
//! parameter tree goes through four ordered passes:
//!
//! 1. `$('<trigger name>')` becomes `$('Webhook')`.
//! 2. `$('Webhook').first().json.x`, `.last().json.x` and `.item.json.x` reach into `body`;
//!    `last()` collapses to `first()` because a webhook call is always a single item.
//! 3. `$('Webhook')...json.body['Some Field']` becomes `...json.body.Some_Field`.
//! 4. Flavor specific `{{ $json.<field> }}` shorthands are moved under `body`.
//!
//! Passes 2 and 3 only match text that already carries the `$('Webhook')` token, so a
//! string that never mentioned the trigger comes out unchanged.

use std::{borrow::Cow, sync::LazyLock};

use regex::{Captures, NoExpand, Regex};
use serde_json::{Map, Value};

use crate::{
    FlowfrontError, Result,
    transform::rewriter::WEBHOOK_NODE_NAME,
};

/// `$('Webhook')`
static WEBHOOK_REFERENCE: LazyLock<String> = LazyLock::new(|| format!("$('{}')", WEBHOOK_NODE_NAME));

/// Item accessors on the webhook reference followed by `.json.` or `.json[`.
static ACCESSOR_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\$\('Webhook'\)\.(first\(\)|last\(\)|item)\.json([.\[])").expect("static accessor pattern"));

/// Bracket field access on the migrated `body`, single or double quoted.
static BRACKET_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\$\('Webhook'\)\.(first\(\)|last\(\)|item)\.json\.body\[(?:'([^']+)'|"([^"]+)")\]"#).expect("static bracket pattern"));

static WHITESPACE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\s+").expect("static whitespace pattern"));

/// Field name as it appears in a webhook body: whitespace runs joined with `_`.
pub fn webhook_field_name(label: &str) -> String {
    WHITESPACE.replace_all(label, "_").into_owned()
}

/// A literal (non-pattern) substitution applied globally.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LiteralPattern {
    pub from: String,
    pub to: String,
}

impl LiteralPattern {
    pub fn new(
        from: impl Into<String>,
        to: impl Into<String>,
    ) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// `last()` reads the same single item as `first()` on a webhook.
fn normalize_accessor(accessor: &str) -> &str {
    match accessor {
        "item" => "item",
        _ => "first()",
    }
}

/// The four-pass rewriter, bound to one trigger name and one set of shorthand patterns.
#[derive(Debug, Clone)]
pub struct ExpressionRewriter {
    node_reference: Regex,
    field_patterns: Vec<LiteralPattern>,
}

impl ExpressionRewriter {
    pub fn new(
        trigger_name: &str,
        field_patterns: Vec<LiteralPattern>,
    ) -> Result<Self> {
        let escaped = regex::escape(trigger_name);
        let node_reference = Regex::new(&format!(r#"\$\((?:'{escaped}'|"{escaped}")\)"#)).map_err(|e| FlowfrontError::Transform {
            stage: "expression".to_string(),
            message: format!("cannot match node name '{}': {}", trigger_name, e),
        })?;

        Ok(Self {
            node_reference,
            field_patterns,
        })
    }

    /// Pass 1: retarget `$('<trigger>')` and `$("<trigger>")` to the webhook.
    pub fn retarget_node_reference<'a>(
        &self,
        text: &'a str,
    ) -> Cow<'a, str> {
        self.node_reference.replace_all(text, NoExpand(WEBHOOK_REFERENCE.as_str()))
    }

    /// Pass 2: descend into `body`, collapsing `last()` to `first()`.
    pub fn migrate_accessors(text: &str) -> Cow<'_, str> {
        ACCESSOR_PATTERN.replace_all(text, |caps: &Captures| format!("{}.{}.json.body{}", WEBHOOK_REFERENCE.as_str(), normalize_accessor(&caps[1]), &caps[2]))
    }

    /// Pass 3: `body['Full Name']` -> `body.Full_Name`.
    pub fn normalize_brackets(text: &str) -> Cow<'_, str> {
        BRACKET_PATTERN.replace_all(text, |caps: &Captures| {
            let field = caps.get(2).or_else(|| caps.get(3)).map(|m| m.as_str()).unwrap_or_default();
            format!("{}.{}.json.body.{}", WEBHOOK_REFERENCE.as_str(), normalize_accessor(&caps[1]), webhook_field_name(field))
        })
    }

    /// Pass 4: flavor shorthands.
    pub fn migrate_shorthands(
        &self,
        text: &str,
    ) -> String {
        let mut result = text.to_string();
        for pattern in self.field_patterns.iter() {
            if result.contains(&pattern.from) {
                result = result.replace(&pattern.from, &pattern.to);
            }
        }
        result
    }

    /// Run all passes, in order, over one string.
    pub fn rewrite_str(
        &self,
        text: &str,
    ) -> String {
        let retargeted = self.retarget_node_reference(text);
        let migrated = Self::migrate_accessors(&retargeted);
        let normalized = Self::normalize_brackets(&migrated);
        self.migrate_shorthands(&normalized)
    }

    /// Rewrite every string leaf of a parameter tree, keeping its structure and key order.
    pub fn rewrite_value(
        &self,
        value: &Value,
    ) -> Value {
        match value {
            Value::String(s) => Value::String(self.rewrite_str(s)),
            Value::Array(arr) => Value::Array(arr.iter().map(|v| self.rewrite_value(v)).collect()),
            Value::Object(obj) => Value::Object(obj.iter().map(|(k, v)| (k.clone(), self.rewrite_value(v))).collect::<Map<String, Value>>()),
            _ => value.clone(),
        }
    }
}
