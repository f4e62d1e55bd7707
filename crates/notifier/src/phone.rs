//! WhatsApp address normalization.
//!
//! Callers hand over phone numbers in whatever shape the tenant record holds
//! (`"91 99999-99999"`, `"+919999999999"`, `"whatsapp:+919999999999"`). Each
//! provider wants its own prefix, added exactly once.

use tenancy_common::types::Provider;

/// Address prefix required by the Twilio WhatsApp API.
pub const TWILIO_PREFIX: &str = "whatsapp:";

/// Strip separators and any channel prefix, leaving the bare number.
pub fn digits(raw: &str) -> String {
    let mut rest = raw.trim();
    loop {
        let before = rest;
        if rest
            .get(..TWILIO_PREFIX.len())
            .is_some_and(|head| head.eq_ignore_ascii_case(TWILIO_PREFIX))
        {
            rest = rest[TWILIO_PREFIX.len()..].trim_start();
        }
        rest = rest.trim_start_matches('+');
        if rest == before {
            break;
        }
    }

    rest.chars()
        .filter(|c| !matches!(c, ' ' | '-' | '.' | '(' | ')'))
        .collect()
}

/// `whatsapp:+<digits>`
pub fn twilio_address(raw: &str) -> String {
    format!("{TWILIO_PREFIX}+{}", digits(raw))
}

/// `+<digits>`
pub fn international(raw: &str) -> String {
    format!("+{}", digits(raw))
}

/// Address in the form the given provider expects.
pub fn for_provider(provider: Provider, raw: &str) -> String {
    match provider {
        Provider::Twilio => twilio_address(raw),
        _ => international(raw),
    }
}
