use parley_schema::Rule;
use uuid::Uuid;

use crate::validate::normalize_message;

/// Reply returned when no rule matches. User-facing chat never errors; it
/// degrades to this string.
pub const FALLBACK_REPLY: &str = "I'm sorry, I didn't understand that. Can you please rephrase?";

/// Outcome of one resolution call. "No match" is a normal result, not an
/// error: `matched` is false and `reply` carries [`FALLBACK_REPLY`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub reply: String,
    pub matched: bool,
    pub rule_id: Option<Uuid>,
}

impl Resolution {
    fn fallback() -> Self {
        Self {
            reply: FALLBACK_REPLY.to_owned(),
            matched: false,
            rule_id: None,
        }
    }
}

/// Map one message to one reply using a rule snapshot.
///
/// The message is trimmed and lowercased, then the rules are walked in the
/// given order; the first rule whose keyword appears as a contiguous
/// substring wins. First-in-order beats longest-match: with rules
/// `["hi", "this"]` the message "this is great" resolves to "hi". Callers
/// that care about precedence control it through snapshot order.
///
/// Pure function of `(message, rules)`: no store access, no mutation, no
/// failure path.
pub fn resolve(message: &str, rules: &[Rule]) -> Resolution {
    let haystack = normalize_message(message);
    if haystack.is_empty() {
        return Resolution::fallback();
    }

    for rule in rules {
        // Stored keywords are non-empty by invariant; skip rather than
        // match-everything if a caller hands us a hand-built bad rule.
        if rule.keyword.is_empty() {
            continue;
        }
        if haystack.contains(&rule.keyword) {
            tracing::debug!(keyword = %rule.keyword, rule_id = %rule.id, "rule matched");
            return Resolution {
                reply: rule.response.clone(),
                matched: true,
                rule_id: Some(rule.id),
            };
        }
    }

    Resolution::fallback()
}
