//! Lowercasing tokenizer used for both queries and chunk content.
//!
//! Text is lowercased, every character that is not a letter, digit or `_` is
//! treated as a separator, and tokens of two characters or fewer are dropped.
//! Duplicates are kept because term frequency depends on repetition.
//!
//! Letters and digits are Unicode-aware, so `"café"` stays one term rather
//! than being cut at the accent as an ASCII-only `\w` class would.

/// Tokens of this many characters or fewer are discarded.
pub const MAX_DISCARDED_LEN: usize = 2;

fn is_word_char(c: char) -> bool {
    c.is_alphanumeric() || c == '_'
}

/// Tokenize text into index terms, in order of appearance.
pub fn tokenize(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    lowered
        .split(|c: char| !is_word_char(c))
        .filter(|token| token.chars().count() > MAX_DISCARDED_LEN)
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accented_words_stay_whole() {
        assert_eq!(tokenize("Café RÉSUMÉ"), vec!["café", "résumé"]);
    }

    #[test]
    fn empty_and_blank_input_yield_nothing() {
        assert!(tokenize("").is_empty());
        assert!(tokenize("  \n\t ").is_empty());
    }

    #[test]
    fn punctuation_and_case_are_normalized() {
        assert_eq!(tokenize("Wire-Transfer!"), tokenize("wire transfer"));
        assert_eq!(tokenize("Wire-Transfer!"), vec!["wire", "transfer"]);
    }

    #[test]
    fn short_tokens_are_dropped() {
        assert_eq!(tokenize("I am a big cat on it"), vec!["big", "cat"]);
    }

    #[test]
    fn duplicates_and_order_are_kept() {
        assert_eq!(tokenize("apple banana apple"), vec!["apple", "banana", "apple"]);
    }

    #[test]
    fn underscores_and_digits_stay_inside_words() {
        assert_eq!(tokenize("retirement_fund 401k $5,000"), vec!["retirement_fund", "401k", "000"]);
    }

    #[test]
    fn length_counts_characters_not_bytes() {
        assert_eq!(tokenize("été où"), vec!["été"]);
    }

    #[test]
    fn deterministic() {
        let text = "Rebalance the portfolio; never chase momentum.";
        assert_eq!(tokenize(text), tokenize(text));
    }
}
