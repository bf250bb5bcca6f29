//! Keyword and pattern matching for driver messages.
//!
//! Intent detection is deliberately not NLU: a small fixed vocabulary plus
//! three plate regex shapes, tried in order, with a length fallback.

use regex::Regex;
use std::sync::OnceLock;

/// Words that open an intake dialogue (substring match, case-insensitive).
const INTAKE_KEYWORDS: &[&str] = &[
    "ingreso",
    "ingresar",
    "hola",
    "buenos",
    "buenas",
    "inicio",
    "iniciar",
    "empezar",
    "comenzar",
    "taller",
    "mantenimiento",
    "reparacion",
    "problema",
];

/// Confirmation vocabulary (exact or prefix match on the trimmed message).
const AFFIRMATIVE_KEYWORDS: &[&str] = &[
    "si", "sí", "confirmar", "confirmo", "ok", "dale", "perfecto", "correcto", "exacto",
];

/// Cancellation vocabulary (exact or prefix match on the trimmed message).
const NEGATIVE_KEYWORDS: &[&str] = &[
    "no", "cancelar", "cancelo", "reiniciar", "reinicio", "volver",
];

/// Whether a message looks like it wants to start an intake.
pub fn is_intake_intent(text: &str) -> bool {
    let lower = text.to_lowercase();
    INTAKE_KEYWORDS.iter().any(|keyword| lower.contains(keyword))
}

/// Whether a message confirms the summary.
pub fn is_affirmative(text: &str) -> bool {
    let lower = text.to_lowercase();
    let lower = lower.trim();
    AFFIRMATIVE_KEYWORDS
        .iter()
        .any(|keyword| lower == *keyword || lower.starts_with(keyword))
}

/// Whether a message cancels the dialogue.
pub fn is_negative(text: &str) -> bool {
    let lower = text.to_lowercase();
    let lower = lower.trim();
    NEGATIVE_KEYWORDS
        .iter()
        .any(|keyword| lower == *keyword || lower.starts_with(keyword))
}

fn plate_patterns() -> &'static [Regex; 3] {
    static PATTERNS: OnceLock<[Regex; 3]> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            // AA1234
            Regex::new(r"(?i)\b([A-Z]{2}\d{4})\b").unwrap(),
            // ABCD12
            Regex::new(r"(?i)\b([A-Z]{4}\d{2})\b").unwrap(),
            // AB1234 (two digit pairs)
            Regex::new(r"(?i)\b([A-Z]{2}\d{2}\d{2})\b").unwrap(),
        ]
    })
}

/// Extract a license plate from a message.
///
/// Tries the three plate shapes in order; when none matches, a 4-6 character
/// message (whitespace stripped) is taken verbatim as the plate. Returns the
/// plate uppercased.
pub fn extract_plate(text: &str) -> Option<String> {
    for pattern in plate_patterns() {
        if let Some(captures) = pattern.captures(text) {
            return Some(captures[1].to_uppercase());
        }
    }

    let stripped: String = text.split_whitespace().collect::<Vec<_>>().concat();
    let stripped = stripped.to_uppercase();
    let len = stripped.chars().count();
    if (4..=6).contains(&len) {
        return Some(stripped);
    }

    None
}
