//! Difficulty rubric, prompt construction and the rule-based fallback

use crate::models::{ClassifierJudgment, WordContext};

/// Tier descriptions with example words, lowest to highest
const TIERS: [(u8, &str, &str); 10] = [
    (1, "function words and the most frequent everyday words", "the, a, is, cat, go"),
    (2, "basic concrete nouns and verbs learned first", "apple, house, run, happy"),
    (3, "common everyday vocabulary", "weather, kitchen, decide, famous"),
    (4, "general vocabulary of ordinary conversation", "journey, improve, ancient"),
    (
        5,
        "intermediate vocabulary common in news and school texts",
        "sophisticated, economy, analyze",
    ),
    (6, "upper-intermediate abstract vocabulary", "ambiguous, reluctant, phenomenon"),
    (7, "advanced general vocabulary", "meticulous, alleviate, paradigm"),
    (8, "academic and formal register", "ubiquitous, juxtapose, epistemology"),
    (9, "rare literary or technical words", "obfuscate, perspicacious, sesquipedalian"),
    (
        10,
        "highly specialized, archaic or obscure words",
        "defenestration, sesquiplicate, floccinaucinihilipilification",
    ),
];

const RESPONSE_SCHEMA: &str = r#"{"word": string, "difficulty_level": integer 1-10, "confidence": number 0-1, "reasoning": string, "translation": string, "phonetic": string, "part_of_speech": string}"#;

/// System prompt shared by single and batch classification
pub fn system_prompt() -> String {
    let mut prompt = String::from(
        "You rate how difficult English words are for a Chinese learner of English. \
         Use this 1-10 scale:\n",
    );
    for (level, description, examples) in TIERS {
        prompt.push_str(&format!("{}: {} (e.g. {})\n", level, description, examples));
    }
    prompt.push_str("Also give a concise Simplified Chinese translation, ");
    prompt.push_str("the IPA phonetic and the part of speech. ");
    prompt.push_str("Reply with strict JSON only, no prose and no code fences.");
    prompt
}

fn describe(context: &WordContext) -> String {
    match &context.translation {
        Some(translation) if !translation.is_empty() => {
            format!("{} (translation: {})", context.word, translation)
        }
        _ => context.word.clone(),
    }
}

/// User prompt for one word; the reply is a single JSON object
pub fn single_prompt(context: &WordContext) -> String {
    format!(
        "Classify this word: {}\nReply with one JSON object: {}",
        describe(context),
        RESPONSE_SCHEMA
    )
}

/// User prompt for many words; the reply is a JSON array with one object per word
pub fn batch_prompt(words: &[WordContext]) -> String {
    let mut prompt = String::from("Classify each of these words:\n");
    for (i, context) in words.iter().enumerate() {
        prompt.push_str(&format!("{}. {}\n", i + 1, describe(context)));
    }
    prompt.push_str(&format!(
        "Reply with a JSON array, one object per word, each shaped as: {}",
        RESPONSE_SCHEMA
    ));
    prompt
}

/// Difficulty from word length alone
pub fn fallback_level(word: &str) -> u8 {
    match word.chars().count() {
        0..=3 => 1,
        4..=5 => 2,
        6..=7 => 3,
        8..=9 => 4,
        _ => 5,
    }
}

/// Judgment used whenever the model gives nothing usable for a word
pub fn fallback_judgment(word: &str) -> ClassifierJudgment {
    let level = fallback_level(word);
    ClassifierJudgment {
        word: word.to_string(),
        difficulty_level: level,
        confidence: 0.3,
        reasoning: format!("rule-based estimate from word length {}", word.chars().count()),
        translation: None,
        phonetic: None,
        part_of_speech: None,
        from_fallback: true,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fallback_levels() {
        assert_eq!(fallback_level("the"), 1);
        assert_eq!(fallback_level("cat"), 1);
        assert_eq!(fallback_level("house"), 2);
        assert_eq!(fallback_level("kitchen"), 3);
        assert_eq!(fallback_level("elephant"), 4);
        assert_eq!(fallback_level("sophisticated"), 5);
    }

    #[test]
    fn test_fallback_is_deterministic() {
        let a = fallback_judgment("ambiguous");
        let b = fallback_judgment("ambiguous");
        assert_eq!(a, b);
        assert!(a.from_fallback);
        assert_eq!(a.difficulty_level, 4);
    }

    #[test]
    fn test_prompts_mention_every_word() {
        let words = vec![
            WordContext::new("cat").with_translation("猫"),
            WordContext::new("sophisticated"),
        ];
        let prompt = batch_prompt(&words);
        assert!(prompt.contains("1. cat (translation: 猫)"));
        assert!(prompt.contains("2. sophisticated"));
        assert!(system_prompt().contains("10: "));
        assert!(single_prompt(&words[1]).contains("sophisticated"));
    }
}
