//! Group-chat personas and `@mention` parsing.

use serde::Serialize;

/// A named system-prompt preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Persona {
    /// Stable tag stored on bot-authored room messages.
    pub id: &'static str,
    /// Display name; `@Name` mentions match it case-insensitively.
    pub name: &'static str,
    pub tagline: &'static str,
    #[serde(skip)]
    pub system_prompt: &'static str,
}

/// Declaration order is dispatch order.
pub const PERSONAS: [Persona; 5] = [
    Persona {
        id: "cognify",
        name: "Cognify",
        tagline: "Your friendly AI tutor",
        system_prompt: "You are Cognify, a patient and encouraging AI tutor in a group study chat. \
            Explain concepts clearly, use short examples, and keep replies under 200 words.",
    },
    Persona {
        id: "socrates",
        name: "Socrates",
        tagline: "Answers questions with better questions",
        system_prompt: "You are Socrates in a group study chat. Guide learners with probing questions \
            instead of direct answers. Ask at most three questions and keep replies short.",
    },
    Persona {
        id: "ada",
        name: "Ada",
        tagline: "Coding mentor",
        system_prompt: "You are Ada, a senior software engineer mentoring students in a group chat. \
            Give practical coding advice with small, correct code snippets.",
    },
    Persona {
        id: "feynman",
        name: "Feynman",
        tagline: "Explains anything simply",
        system_prompt: "You are Feynman, famous for explaining hard ideas simply. Use everyday \
            analogies, avoid jargon, and finish with one memorable takeaway.",
    },
    Persona {
        id: "quizzy",
        name: "Quizzy",
        tagline: "Quiz master",
        system_prompt: "You are Quizzy, a playful quiz master in a group study chat. Respond with one \
            or two multiple-choice questions about the topic being discussed, then reveal the answers.",
    },
];

/// Look a persona up by id or display name, ignoring case.
pub fn find(name: &str) -> Option<&'static Persona> {
    PERSONAS
        .iter()
        .find(|p| p.id.eq_ignore_ascii_case(name) || p.name.eq_ignore_ascii_case(name))
}

/// Every `@token` in `text`.  A mention starts at the beginning or after a
/// non-word character and runs over letters, digits, `_` and `-`.
pub fn mention_tokens(text: &str) -> Vec<&str> {
    let is_word = |c: char| c.is_alphanumeric() || c == '_' || c == '-';
    let mut tokens = Vec::new();
    let mut prev: Option<char> = None;
    for (i, c) in text.char_indices() {
        if c == '@' && !prev.is_some_and(is_word) {
            let rest = &text[i + 1..];
            let end = rest.find(|ch: char| !is_word(ch)).unwrap_or(rest.len());
            if end > 0 {
                tokens.push(&rest[..end]);
            }
        }
        prev = Some(c);
    }
    tokens
}

/// Personas mentioned in `text`, each once, in declaration order.
pub fn mentioned(text: &str) -> Vec<&'static Persona> {
    let tokens = mention_tokens(text);
    PERSONAS
        .iter()
        .filter(|p| {
            tokens
                .iter()
                .any(|t| t.eq_ignore_ascii_case(p.name) || t.eq_ignore_ascii_case(p.id))
        })
        .collect()
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn mentions_follow_declaration_order() {
        let hit = mentioned("@feynman what is entropy? also @Cognify please");
        let names: Vec<_> = hit.iter().map(|p| p.name).collect();
        assert_eq!(names, vec!["Cognify", "Feynman"]);
    }

    #[test]
    fn repeated_and_unknown_mentions() {
        let hit = mentioned("@Ada @ada @Nobody hello");
        assert_eq!(hit.len(), 1);
        assert_eq!(hit[0].id, "ada");
    }

    #[test]
    fn email_addresses_are_not_mentions() {
        assert!(mention_tokens("mail me at ada@example.com").is_empty());
        assert!(mentioned("ada@example.com").is_empty());
    }

    #[test]
    fn trailing_punctuation_is_dropped() {
        assert_eq!(mention_tokens("hey @Socrates, why?"), vec!["Socrates"]);
        assert_eq!(mention_tokens("lonely @ sign"), Vec::<&str>::new());
    }

    #[test]
    fn lookup_by_id_or_name() {
        assert_eq!(find("QUIZZY").map(|p| p.id), Some("quizzy"));
        assert!(find("unknown").is_none());
        assert!(PERSONAS.len() <= 5);
    }
}
