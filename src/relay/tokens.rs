use super::conversation::Message;

/// Per-message allowance for role and framing metadata.
pub const MESSAGE_OVERHEAD: u64 = 4;

const PUNCTUATION: &[char] = &['.', ',', '!', '?', ';', ':'];

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TokenUsage {
    pub input: u64,
    pub output: u64,
}

fn is_word_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Rough token count: the text is cut at word boundaries, each non-blank
/// piece costs one token per four characters (at least one), plus one when it
/// holds punctuation. Empty text costs nothing; anything else costs at least one.
pub fn estimate_tokens(text: &str) -> u64 {
    if text.is_empty() {
        return 0;
    }

    let mut estimate = 0u64;
    let mut piece = String::new();
    let mut in_word: Option<bool> = None;

    for c in text.chars() {
        let word = is_word_char(c);
        if in_word.is_some_and(|w| w != word) {
            estimate += piece_cost(&piece);
            piece.clear();
        }
        in_word = Some(word);
        piece.push(c);
    }
    estimate += piece_cost(&piece);

    estimate.max(1)
}

fn piece_cost(piece: &str) -> u64 {
    if piece.trim().is_empty() {
        return 0;
    }
    let len = piece.chars().count() as u64;
    let mut cost = if len <= 4 { 1 } else { len.div_ceil(4) };
    if piece.contains(PUNCTUATION) {
        cost += 1;
    }
    cost
}

/// Input estimate for a whole conversation: content plus fixed overhead per message.
pub fn estimate_conversation(messages: &[Message]) -> u64 {
    messages
        .iter()
        .map(|m| m.content.as_deref().map_or(0, estimate_tokens) + MESSAGE_OVERHEAD)
        .sum()
}
