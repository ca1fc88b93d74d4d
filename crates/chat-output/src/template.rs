//! Positional `%s` templates compiled once at configuration time.
//!
//! A template like `"[%s] %s %s"` with keys `time,tag,message` is split into
//! literal segments and slot keys so rendering is a straight interleave and
//! the slot/key agreement is checked before any batch is seen.
//!
//! Only `%s` is a slot and `%%` renders a literal percent sign. Every other
//! specifier (`%d`, `%5s`, `%-10s`, a trailing bare `%`) is not a slot and is
//! rendered exactly as written, so a format ported from a printf-style
//! configuration may need its specifiers rewritten to `%s`.

use crate::error::ConfigError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    /// Always `keys.len() + 1` entries.
    literals: Vec<String>,
    keys: Vec<String>,
}

impl Template {
    /// Compile `format` against `keys`, failing when the number of `%s`
    /// slots differs from the number of keys.
    pub fn compile(
        format: &str,
        keys: &[String],
        field: &'static str,
        keys_field: &'static str,
    ) -> Result<Self, ConfigError> {
        let literals = split_literals(format);
        let slots = literals.len() - 1;
        if slots != keys.len() {
            return Err(ConfigError::TemplateMismatch {
                field,
                keys_field,
                slots,
                keys: keys.len(),
            });
        }
        Ok(Self {
            literals,
            keys: keys.to_vec(),
        })
    }

    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Fill each slot with `lookup(key)`, in key order.
    pub fn render<F>(&self, mut lookup: F) -> String
    where
        F: FnMut(&str) -> String,
    {
        let mut out = String::with_capacity(self.literals.iter().map(String::len).sum());
        out.push_str(&self.literals[0]);
        for (key, literal) in self.keys.iter().zip(&self.literals[1..]) {
            out.push_str(&lookup(key));
            out.push_str(literal);
        }
        out
    }
}

fn split_literals(format: &str) -> Vec<String> {
    let mut literals = Vec::new();
    let mut current = String::new();
    let mut chars = format.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '%' {
            current.push(c);
            continue;
        }
        match chars.peek() {
            Some('s') => {
                chars.next();
                literals.push(std::mem::take(&mut current));
            }
            Some('%') => {
                chars.next();
                current.push('%');
            }
            _ => current.push('%'),
        }
    }
    literals.push(current);
    literals
}
