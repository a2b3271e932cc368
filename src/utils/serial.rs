//! Serial number normalization and format checks.

use crate::models::Role;

/// How free-text serial input is canonicalized before lookup.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NormalizationRule {
    /// Trim, collapse whitespace runs, uppercase.
    CollapseWhitespace,
    /// Additionally drop dashes and the label letter printed right before one.
    StripDashes,
}

impl NormalizationRule {
    pub fn for_role(role: Role) -> Self {
        match role {
            Role::Buyer => NormalizationRule::CollapseWhitespace,
            Role::Seller => NormalizationRule::StripDashes,
        }
    }
}

fn is_dash(c: char) -> bool {
    matches!(
        c,
        '-' | '\u{2010}' | '\u{2011}' | '\u{2012}' | '\u{2013}' | '\u{2014}' | '\u{2212}'
    )
}

/// Drop dashes. Seller labels print `NNNNNNNx-NNNNN`; the letter between the
/// last digit and the dash is not part of the registered serial.
fn strip_dashes(raw: &str) -> String {
    let chars: Vec<char> = raw.chars().collect();
    let mut out = String::with_capacity(raw.len());
    for (i, &c) in chars.iter().enumerate() {
        if is_dash(c) {
            continue;
        }
        let label_letter = c.is_ascii_alphabetic()
            && i > 0
            && chars[i - 1].is_ascii_digit()
            && chars.get(i + 1).is_some_and(|&n| is_dash(n));
        if !label_letter {
            out.push(c);
        }
    }
    out
}

/// Canonical form of a serial. Idempotent for both rules.
pub fn normalize_serial(raw: &str, rule: NormalizationRule) -> String {
    let without_dashes;
    let source = match rule {
        NormalizationRule::CollapseWhitespace => raw,
        NormalizationRule::StripDashes => {
            without_dashes = strip_dashes(raw);
            &without_dashes
        }
    };
    source
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_uppercase()
}

/// Rejects empty input, embedded separators and non-alphanumeric characters.
pub fn validate_serial_format(normalized: &str) -> Result<(), String> {
    if normalized.is_empty() {
        return Err("Ingresa el número de serie".to_string());
    }
    if normalized.chars().any(|c| c.is_whitespace() || is_dash(c)) {
        return Err("El número de serie no debe contener espacios ni guiones".to_string());
    }
    if !normalized.chars().all(|c| c.is_ascii_alphanumeric()) {
        return Err("El número de serie contiene caracteres no permitidos".to_string());
    }
    Ok(())
}
