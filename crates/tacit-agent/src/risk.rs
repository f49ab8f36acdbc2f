//! Keyword-based risk classification and knowledge attribution.

/// Phrases that mark a request as high-risk on their own.
pub const RISK_KEYWORDS: &[&str] = &[
    "withdraw",
    "transfer",
    "sell all",
    "entire",
    "retirement fund",
    "life savings",
    "mortgage",
    "loan",
    "borrow",
    "leverage",
    "risky",
    "speculative",
    "gambling",
    "crypto",
    "bitcoin",
    "startup investment",
    "high risk",
    "all in",
];

/// Words that make a message high-risk when it also mentions a dollar amount.
const MONEY_CONTEXT: &[&str] = &["portfolio", "investment", "transfer"];

pub const HIGH_RISK_REASONING: &str =
    "Detected high-risk financial scenario - consulting tacit knowledge and flagging for review";
pub const STANDARD_REASONING: &str = "Standard query processing";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RiskAssessment {
    pub high_risk: bool,
    pub reasoning: &'static str,
}

pub fn assess(message: &str) -> RiskAssessment {
    let lower = message.to_lowercase();
    let keyword_hit = RISK_KEYWORDS.iter().any(|k| lower.contains(k));
    let money_hit = lower.contains('$') && MONEY_CONTEXT.iter().any(|w| lower.contains(w));
    let high_risk = keyword_hit || money_hit;
    RiskAssessment {
        high_risk,
        reasoning: if high_risk { HIGH_RISK_REASONING } else { STANDARD_REASONING },
    }
}

/// One `Rule N` label per numbered line (`1.`, `2.`, ...) of the tacit knowledge.
pub fn knowledge_areas(tacit_knowledge: &str) -> Vec<String> {
    tacit_knowledge
        .lines()
        .map(str::trim)
        .filter(|line| is_numbered(line))
        .enumerate()
        .map(|(idx, _)| format!("Rule {}", idx + 1))
        .collect()
}

fn is_numbered(line: &str) -> bool {
    let digits = line.chars().take_while(char::is_ascii_digit).count();
    digits > 0 && line[digits..].starts_with('.')
}
