//! Bilingual (Portuguese / English) fuzzy matching used by FAQ search.

use regex::Regex;
use std::collections::HashSet;
use std::sync::LazyLock;
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    Pt,
    En,
}

struct LanguageProfile {
    stop_words: &'static [&'static str],
    corrections: &'static [(&'static str, &'static str)],
    related: &'static [(&'static str, &'static [&'static str])],
}

// Stop words are stored accent-free because they are compared after normalisation.
const PT: LanguageProfile = LanguageProfile {
    stop_words: &[
        "o", "a", "os", "as", "um", "uma", "uns", "umas", "de", "do", "da", "dos", "das", "no",
        "na", "nos", "nas", "em", "que", "e", "esse", "esta", "este", "tal", "ele", "ela",
        "isso", "isto", "aquilo", "essa", "como",
    ],
    corrections: &[
        ("funsiona", "funciona"),
        ("funcion", "funciona"),
        ("funsion", "funciona"),
        ("interaje", "interage"),
        ("interag", "interage"),
        ("enterag", "interage"),
        ("enteraj", "interage"),
    ],
    related: &[
        ("funciona", &["interage", "trabalha", "opera", "executa"]),
        ("interage", &["funciona", "trabalha", "conecta", "comunica"]),
        ("bookworm", &["sistema", "ferramenta", "aplicacao", "programa"]),
    ],
};

const EN: LanguageProfile = LanguageProfile {
    stop_words: &[
        "the", "a", "an", "and", "or", "but", "in", "on", "at", "to", "for", "of", "with", "by",
        "from", "up", "about", "into", "over", "after", "is", "it", "its", "this", "that",
        "these", "those", "he", "she", "they", "we", "you", "how",
    ],
    corrections: &[
        ("funcionality", "functionality"),
        ("funcion", "function"),
        ("interacts", "interact"),
        ("interacting", "interact"),
    ],
    related: &[
        ("function", &["work", "operate", "run", "execute"]),
        ("interact", &["function", "work", "connect", "communicate"]),
        ("bookworm", &["system", "tool", "application", "program"]),
    ],
};

const PT_INDICATORS: &[&str] = &["de", "da", "do", "das", "dos", "como", "que", "é"];
const EN_INDICATORS: &[&str] = &["the", "of", "to", "in", "is", "how", "what", "why"];

static PUNCTUATION: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.,/#!?$%^&*;:{}=\-_`~()]").expect("valid punctuation pattern"));

impl Language {
    fn profile(self) -> &'static LanguageProfile {
        match self {
            Language::Pt => &PT,
            Language::En => &EN,
        }
    }
}

/// Guess the language by counting indicator words. Ties go to Portuguese.
pub fn detect_language(text: &str) -> Language {
    let lowered = text.to_lowercase();
    let (mut pt, mut en) = (0usize, 0usize);
    for word in lowered.split_whitespace() {
        if PT_INDICATORS.contains(&word) {
            pt += 1;
        }
        if EN_INDICATORS.contains(&word) {
            en += 1;
        }
    }
    if pt >= en {
        Language::Pt
    } else {
        Language::En
    }
}

/// Lowercase, strip accents and punctuation, collapse whitespace and drop stop words.
pub fn normalize(text: &str, lang: Language) -> String {
    let folded: String = text
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect();
    let stop_words = lang.profile().stop_words;

    PUNCTUATION
        .replace_all(&folded, " ")
        .split_whitespace()
        .filter(|word| !stop_words.contains(word))
        .collect::<Vec<_>>()
        .join(" ")
}

fn correct(word: &str, lang: Language) -> &str {
    lang.profile()
        .corrections
        .iter()
        .find(|(typo, _)| *typo == word)
        .map(|(_, fixed)| *fixed)
        .unwrap_or(word)
}

fn expand(word: &str, lang: Language) -> Vec<String> {
    let corrected = correct(word, lang);
    let mut terms = vec![corrected.to_string()];
    if let Some((_, related)) = lang
        .profile()
        .related
        .iter()
        .find(|(term, _)| *term == corrected)
    {
        terms.extend(related.iter().map(|t| t.to_string()));
    }
    terms
}

/// Score in `[0, 1]`: Jaccard over expanded word sets, boosted by exact word
/// overlap and by one text containing the other.
pub fn similarity(a: &str, b: &str, lang: Language) -> f64 {
    let s1 = normalize(a, lang);
    let s2 = normalize(b, lang);
    let words1: Vec<&str> = s1.split(' ').filter(|w| !w.is_empty()).collect();
    let words2: Vec<&str> = s2.split(' ').filter(|w| !w.is_empty()).collect();
    if words1.is_empty() || words2.is_empty() {
        return 0.0;
    }

    let expanded1: HashSet<String> = words1.iter().flat_map(|w| expand(w, lang)).collect();
    let expanded2: HashSet<String> = words2.iter().flat_map(|w| expand(w, lang)).collect();
    let intersection = expanded1.intersection(&expanded2).count();
    let union = expanded1.union(&expanded2).count();

    let mut score = intersection as f64 / union as f64;

    let exact = words1.iter().filter(|w| words2.contains(w)).count();
    if exact > 0 {
        score += 0.2 * (exact as f64 / words1.len().max(words2.len()) as f64);
    }

    if s1.contains(&s2) || s2.contains(&s1) {
        score += 0.3;
    }

    score.min(1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_portuguese_and_english() {
        assert_eq!(detect_language("Como funciona o sistema de busca?"), Language::Pt);
        assert_eq!(detect_language("How is the search working?"), Language::En);
        assert_eq!(detect_language("bookworm"), Language::Pt);
    }

    #[test]
    fn normalize_strips_accents_punctuation_and_stop_words() {
        assert_eq!(
            normalize("Qual é o horário de funcionamento?", Language::Pt),
            "qual horario funcionamento"
        );
        assert_eq!(normalize("The (quick), brown fox!", Language::En), "quick brown fox");
    }

    #[test]
    fn identical_questions_score_one() {
        let q = "Qual o horário de atendimento";
        assert!((similarity(q, q, Language::Pt) - 1.0).abs() < f64::EPSILON);
    }

    #[test]
    fn unrelated_texts_score_low() {
        let score = similarity("preço do plano anual", "horário de atendimento", Language::Pt);
        assert!(score < 0.2, "score was {score}");
    }

    #[test]
    fn typos_and_related_terms_raise_the_score() {
        let plain = similarity("como o bookworm opera", "o bookworm funsiona", Language::Pt);
        assert!(plain > 0.2, "score was {plain}");
    }

    #[test]
    fn empty_input_scores_zero() {
        assert_eq!(similarity("", "qualquer coisa", Language::Pt), 0.0);
        assert_eq!(similarity("de da do", "qualquer coisa", Language::Pt), 0.0);
    }
}
