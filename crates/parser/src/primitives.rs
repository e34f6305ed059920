//! Leaf units: they look at the input directly and never call other units.

use std::fmt;

use crate::context::{Parse, Value};
use crate::unit::Unit;

/// Always succeeds without consuming input.
pub struct Empty;

impl<'g, V: Value> Unit<'g, V> for Empty {
    fn doparse(&self, _parse: &mut Parse<'g, '_, V>) -> bool {
        true
    }
}

impl fmt::Display for Empty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "empty")
    }
}

/// Always fails.
pub struct Fail;

impl<'g, V: Value> Unit<'g, V> for Fail {
    fn doparse(&self, _parse: &mut Parse<'g, '_, V>) -> bool {
        false
    }
}

impl fmt::Display for Fail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "fail")
    }
}

/// Matches a literal string. Fails on item input.
pub struct StringMatch<'g> {
    pub(crate) text: &'g str,
}

impl<'g, V: Value> Unit<'g, V> for StringMatch<'g> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        let pos = parse.pos();
        let matched = parse
            .text()
            .and_then(|text| text.get(pos..))
            .is_some_and(|rest| rest.starts_with(self.text));
        if matched {
            parse.set_pos(pos + self.text.len());
        }
        matched
    }

    fn expected(&self) -> Option<String> {
        Some(self.to_string())
    }
}

impl fmt::Display for StringMatch<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "\"{}\"", self.text.escape_debug())
    }
}

// =============================================================================
// Character classes
// =============================================================================

pub type CharFn<'g> = dyn Fn(char) -> bool + Sync + 'g;

/// A set of characters matched by [`CharPredicate`].
#[derive(Clone, Copy)]
pub enum CharClass<'g> {
    Any,
    Single(char),
    /// Inclusive range.
    Range(char, char),
    /// Any character of the string.
    Set(&'g str),
    Alpha,
    Alphanum,
    Digit,
    HexDigit,
    OctalDigit,
    Whitespace,
    Custom(&'g str, &'g CharFn<'g>),
}

impl CharClass<'_> {
    pub fn matches(&self, c: char) -> bool {
        match *self {
            CharClass::Any => true,
            CharClass::Single(x) => c == x,
            CharClass::Range(lo, hi) => (lo..=hi).contains(&c),
            CharClass::Set(chars) => chars.contains(c),
            CharClass::Alpha => c.is_ascii_alphabetic(),
            CharClass::Alphanum => c.is_ascii_alphanumeric(),
            CharClass::Digit => c.is_ascii_digit(),
            CharClass::HexDigit => c.is_ascii_hexdigit(),
            CharClass::OctalDigit => ('0'..='7').contains(&c),
            CharClass::Whitespace => c.is_whitespace(),
            CharClass::Custom(_, pred) => pred(c),
        }
    }
}

impl fmt::Display for CharClass<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CharClass::Any => write!(f, "any char"),
            CharClass::Single(c) => write!(f, "'{}'", c.escape_debug()),
            CharClass::Range(lo, hi) => write!(f, "[{}-{}]", lo.escape_debug(), hi.escape_debug()),
            CharClass::Set(chars) => write!(f, "[{}]", chars.escape_debug()),
            CharClass::Alpha => write!(f, "letter"),
            CharClass::Alphanum => write!(f, "letter or digit"),
            CharClass::Digit => write!(f, "digit"),
            CharClass::HexDigit => write!(f, "hex digit"),
            CharClass::OctalDigit => write!(f, "octal digit"),
            CharClass::Whitespace => write!(f, "whitespace"),
            CharClass::Custom(name, _) => write!(f, "{}", name),
        }
    }
}

/// Matches one character of a class. Fails on item input.
pub struct CharPredicate<'g> {
    pub(crate) class: CharClass<'g>,
}

impl<'g, V: Value> Unit<'g, V> for CharPredicate<'g> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        match parse.current_char() {
            Some(c) if self.class.matches(c) => {
                parse.set_pos(parse.pos() + c.len_utf8());
                true
            }
            _ => false,
        }
    }

    fn expected(&self) -> Option<String> {
        Some(self.class.to_string())
    }
}

impl fmt::Display for CharPredicate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.class)
    }
}

// =============================================================================
// Item and context predicates
// =============================================================================

pub type ObjectFn<'g, V> = dyn Fn(&V) -> bool + Sync + 'g;

/// Matches one item of item input.
pub struct ObjectPredicate<'g, V> {
    pub(crate) name: &'g str,
    pub(crate) pred: &'g ObjectFn<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for ObjectPredicate<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        match parse.current_item() {
            Some(item) if (self.pred)(item) => {
                parse.set_pos(parse.pos() + 1);
                true
            }
            _ => false,
        }
    }

    fn expected(&self) -> Option<String> {
        Some(self.name.to_string())
    }
}

impl<V> fmt::Display for ObjectPredicate<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

pub type ContextFn<'g, V> = dyn for<'p, 'i> Fn(&'p Parse<'g, 'i, V>) -> bool + Sync + 'g;

/// Succeeds without consuming input when the predicate holds on the
/// current parse state.
pub struct ContextPredicate<'g, V> {
    pub(crate) name: &'g str,
    pub(crate) pred: &'g ContextFn<'g, V>,
}

impl<'g, V: Value> Unit<'g, V> for ContextPredicate<'g, V> {
    fn doparse(&self, parse: &mut Parse<'g, '_, V>) -> bool {
        (self.pred)(parse)
    }
}

impl<V> fmt::Display for ContextPredicate<'_, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_char_classes() {
        assert!(CharClass::Any.matches('☃'));
        assert!(CharClass::Single('x').matches('x'));
        assert!(!CharClass::Single('x').matches('y'));
        assert!(CharClass::Range('a', 'f').matches('f'));
        assert!(!CharClass::Range('a', 'f').matches('g'));
        assert!(CharClass::Set("+-").matches('-'));
        assert!(!CharClass::Set("+-").matches('*'));
        assert!(CharClass::Alpha.matches('Q'));
        assert!(!CharClass::Alpha.matches('1'));
        assert!(CharClass::Alphanum.matches('1'));
        assert!(CharClass::Digit.matches('9'));
        assert!(CharClass::HexDigit.matches('F'));
        assert!(!CharClass::HexDigit.matches('g'));
        assert!(CharClass::OctalDigit.matches('7'));
        assert!(!CharClass::OctalDigit.matches('8'));
        assert!(CharClass::Whitespace.matches('\t'));
        let vowel = |c: char| "aeiou".contains(c);
        assert!(CharClass::Custom("vowel", &vowel).matches('e'));
    }

    #[test]
    fn test_char_class_display() {
        assert_eq!(CharClass::Single('\n').to_string(), "'\\n'");
        assert_eq!(CharClass::Range('0', '9').to_string(), "[0-9]");
        assert_eq!(CharClass::Digit.to_string(), "digit");
        let upper = |c: char| c.is_uppercase();
        assert_eq!(CharClass::Custom("uppercase", &upper).to_string(), "uppercase");
        assert_eq!(StringMatch { text: "a\"b" }.to_string(), "\"a\\\"b\"");
    }
}
