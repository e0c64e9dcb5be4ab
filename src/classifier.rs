//! Message Classifier
//!
//! Derives two independent signals from the latest user message:
//! - needs-human: the customer should be escalated to a person
//! - needs-tool: the request needs an order/shipment lookup
//!
//! The keyword matcher is a stand-in for a real intent model. Anything
//! implementing [`Classifier`] can replace it without touching the router.

/// Signals produced for a single message
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signals {
    pub need_human: bool,
    pub needs_tool: bool,
}

/// Swappable classification seam used by the triage node
pub trait Classifier: Send + Sync {
    fn classify(&self, text: &str) -> Signals;
}

/// Static keyword lists, zero allocation
pub const ESCALATION_KEYWORDS: &[&str] = &["refund", "angry", "complaint", "chargeback"];

pub const TOOL_KEYWORDS: &[&str] = &["order", "status", "tracking", "shipment"];

/// Case-insensitive substring matcher.
///
/// Matches are plain substring tests, so "reorder" counts as "order".
pub struct KeywordClassifier;

impl Classifier for KeywordClassifier {
    fn classify(&self, text: &str) -> Signals {
        let text = text.to_lowercase();

        Signals {
            need_human: contains_any(&text, ESCALATION_KEYWORDS),
            needs_tool: contains_any(&text, TOOL_KEYWORDS),
        }
    }
}

fn contains_any(text: &str, keywords: &[&str]) -> bool {
    keywords.iter().any(|kw| text.contains(*kw))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escalation_keywords() {
        let cases = vec![
            "I want a REFUND",
            "this is a complaint",
            "I am Angry about this",
            "filing a chargeback tomorrow",
            "refund my tracking fee and check the order status",
        ];

        for c in cases {
            assert!(KeywordClassifier.classify(c).need_human, "{}", c);
        }
    }

    #[test]
    fn test_tool_keywords() {
        let cases = vec![
            ("Where is my order?", true),
            ("what's the STATUS", true),
            ("tracking number please", true),
            ("my shipment is late", true),
            ("Hello, how are you?", false),
        ];

        for (c, expected) in cases {
            let signals = KeywordClassifier.classify(c);
            assert_eq!(signals.needs_tool, expected, "{}", c);
            assert!(!signals.need_human, "{}", c);
        }
    }

    #[test]
    fn test_substring_not_word_boundary() {
        // "reorder" contains "order", "refunded" contains "refund"
        let signals = KeywordClassifier.classify("I reorder things until refunded");
        assert_eq!(
            signals,
            Signals {
                need_human: true,
                needs_tool: true,
            }
        );
    }

    #[test]
    fn test_both_signals_and_idempotence() {
        let text = "My shipment got lost, I'm so angry, give me a refund";
        let first = KeywordClassifier.classify(text);
        let second = KeywordClassifier.classify(text);

        assert!(first.need_human);
        assert!(first.needs_tool);
        assert_eq!(first, second);
    }

    #[test]
    fn test_empty_text() {
        assert_eq!(KeywordClassifier.classify(""), Signals::default());
    }
}
