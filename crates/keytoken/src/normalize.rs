//! Raw backend events to canonical tokens.
//!
//! Every function here is pure and total: unsupported input yields `None`,
//! never an error, and callers drop `None` silently.

use crate::{MouseButton, Token};

/// Canonical names of every non-character key a token may carry.
pub const NAMED_KEYS: &[&str] = &[
    "f1", "f2", "f3", "f4", "f5", "f6", "f7", "f8", "f9", "f10", "f11", "f12", "f13", "f14",
    "f15", "f16", "f17", "f18", "f19", "f20", "f21", "f22", "f23", "f24", "esc", "space", "pgup",
    "pgdn", "home", "end", "insert", "delete", "up", "down", "left", "right", "tab", "enter",
    "backspace",
];

/// A key-down as reported by an input backend, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RawKey {
    /// The key produced a character.
    Char(char),
    /// The key is known to the backend by name (`"page_up"`, `"F8"`, `"Escape"`).
    Named(String),
}

/// Resolve a key name or alias to its canonical named-key form.
pub fn named_key(name: &str) -> Option<&'static str> {
    let lower = name.trim().to_ascii_lowercase();
    let canon = match lower.as_str() {
        "esc" | "escape" => "esc",
        "space" | "spacebar" => "space",
        "pgup" | "page_up" | "pageup" | "prior" => "pgup",
        "pgdn" | "page_down" | "pagedown" | "next" => "pgdn",
        "insert" | "ins" => "insert",
        "delete" | "del" => "delete",
        "up" | "up_arrow" | "uparrow" => "up",
        "down" | "down_arrow" | "downarrow" => "down",
        "left" | "left_arrow" | "leftarrow" => "left",
        "right" | "right_arrow" | "rightarrow" => "right",
        "enter" | "return" | "kp_enter" | "kpreturn" => "enter",
        "backspace" | "back_space" => "backspace",
        other => other,
    };
    NAMED_KEYS.iter().copied().find(|k| *k == canon)
}

/// Normalize one raw key-down into a token.
///
/// Printable characters become lowercase single-character tokens; the
/// whitespace and control characters that correspond to named keys map to
/// those names; everything else is `None`.
pub fn normalize_key(key: &RawKey) -> Option<Token> {
    match key {
        RawKey::Char(c) => normalize_char(*c),
        RawKey::Named(name) => named_key(name).map(|n| Token::from_canonical(n.to_string())),
    }
}

/// Normalize one raw mouse-button transition into a token.
///
/// Only presses produce a token. Releases are `None` even for known buttons
/// so a press/release pair never counts as two interactions.
pub fn normalize_mouse(button: &str, pressed: bool) -> Option<Token> {
    if !pressed {
        return None;
    }
    MouseButton::from_name(button).map(Token::mouse)
}

fn normalize_char(c: char) -> Option<Token> {
    let named = match c {
        ' ' => Some("space"),
        '\t' => Some("tab"),
        '\r' | '\n' => Some("enter"),
        '\u{8}' | '\u{7f}' => Some("backspace"),
        '\u{1b}' => Some("esc"),
        _ => None,
    };
    if let Some(n) = named {
        return Some(Token::from_canonical(n.to_string()));
    }
    if c.is_control() || c.is_whitespace() {
        return None;
    }
    let mut lower = c.to_lowercase();
    let single = match (lower.next(), lower.next()) {
        (Some(l), None) => l,
        // Multi-char lowercase expansions keep the original character.
        _ => c,
    };
    Some(Token::from_canonical(single.to_string()))
}

#[cfg(test)]
mod tests {
    use proptest::prelude::*;

    use super::*;

    fn key(c: char) -> Option<String> {
        normalize_key(&RawKey::Char(c)).map(|t| t.as_str().to_string())
    }

    fn named(n: &str) -> Option<String> {
        normalize_key(&RawKey::Named(n.to_string())).map(|t| t.as_str().to_string())
    }

    #[test]
    fn printable_chars_are_lowercased() {
        assert_eq!(key('A').as_deref(), Some("a"));
        assert_eq!(key('z').as_deref(), Some("z"));
        assert_eq!(key('5').as_deref(), Some("5"));
        assert_eq!(key('/').as_deref(), Some("/"));
    }

    #[test]
    fn control_chars() {
        assert_eq!(key(' ').as_deref(), Some("space"));
        assert_eq!(key('\r').as_deref(), Some("enter"));
        assert_eq!(key('\u{1b}').as_deref(), Some("esc"));
        assert_eq!(key('\u{1}'), None);
    }

    #[test]
    fn named_lookup() {
        assert_eq!(named("page_up").as_deref(), Some("pgup"));
        assert_eq!(named("page_down").as_deref(), Some("pgdn"));
        assert_eq!(named("F12").as_deref(), Some("f12"));
        assert_eq!(named("f24").as_deref(), Some("f24"));
        assert_eq!(named("Escape").as_deref(), Some("esc"));
        assert_eq!(named("return").as_deref(), Some("enter"));
        assert_eq!(named("shift"), None);
        assert_eq!(named("caps_lock"), None);
        assert_eq!(named(""), None);
    }

    #[test]
    fn mouse_press_only() {
        assert_eq!(
            normalize_mouse("left", true).map(|t| t.as_str().to_string()),
            Some("mouse.left".to_string())
        );
        assert_eq!(normalize_mouse("left", false), None);
        assert_eq!(
            normalize_mouse("button9", true).map(|t| t.as_str().to_string()),
            Some("mouse.x2".to_string())
        );
        assert_eq!(normalize_mouse("scroll_up", true), None);
    }

    proptest! {
        #[test]
        fn key_normalization_is_deterministic(c in any::<char>()) {
            let a = normalize_key(&RawKey::Char(c));
            let b = normalize_key(&RawKey::Char(c));
            prop_assert_eq!(a, b);
        }

        #[test]
        fn normalized_tokens_reparse_to_themselves(c in any::<char>()) {
            if let Some(t) = normalize_key(&RawKey::Char(c)) {
                prop_assert_eq!(Token::parse(t.as_str()), Some(t.clone()));
            }
        }

        #[test]
        fn named_normalization_is_total(name in ".{0,16}") {
            if let Some(t) = normalize_key(&RawKey::Named(name)) {
                prop_assert!(NAMED_KEYS.contains(&t.as_str()));
            }
        }

        #[test]
        fn mouse_release_never_yields(name in "[a-z0-9_]{0,10}") {
            prop_assert_eq!(normalize_mouse(&name, false), None);
        }
    }
}
