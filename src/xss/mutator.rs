// src/xss/mutator.rs
//! Payload obfuscation and encoding primitives

use rand::Rng;

/// Flip each character to upper or lower case at random.
///
/// Characters whose case mapping is not a single character are kept as-is,
/// so the result always has the same character count as the input.
pub fn random_case<R: Rng + ?Sized>(payload: &str, rng: &mut R) -> String {
    payload
        .chars()
        .map(|ch| {
            if rng.gen_bool(0.5) {
                single_char(ch.to_uppercase()).unwrap_or(ch)
            } else {
                single_char(ch.to_lowercase()).unwrap_or(ch)
            }
        })
        .collect()
}

fn single_char(mut mapped: impl Iterator<Item = char>) -> Option<char> {
    let first = mapped.next()?;
    mapped.next().is_none().then_some(first)
}

/// Every character as a hex HTML numeric character reference
pub fn entity_encode(payload: &str) -> String {
    payload
        .chars()
        .map(|ch| format!("&#x{:x};", ch as u32))
        .collect()
}

/// Standard URL percent-encoding; path separators stay literal
pub fn percent_encode(payload: &str) -> String {
    payload
        .split('/')
        .map(|segment| urlencoding::encode(segment).into_owned())
        .collect::<Vec<_>>()
        .join("/")
}

/// Obfuscated variants of a payload, de-duplicated in first-seen order
pub fn obfuscate(payload: &str) -> Vec<String> {
    obfuscate_with(payload, &mut rand::thread_rng())
}

pub fn obfuscate_with<R: Rng + ?Sized>(payload: &str, rng: &mut R) -> Vec<String> {
    let variants = [
        random_case(payload, rng),
        entity_encode(payload),
        percent_encode(payload),
    ];

    let mut result: Vec<String> = Vec::with_capacity(variants.len());
    for variant in variants {
        if !result.contains(&variant) {
            result.push(variant);
        }
    }
    result
}

/// Exactly three fully-escaped variants: unicode escape, hex HTML entities,
/// and percent-encoding with no safe characters.
pub fn encode(payload: &str) -> Vec<String> {
    let unicode = payload
        .encode_utf16()
        .map(|unit| format!("\\u{:04x}", unit))
        .collect::<String>();

    vec![
        unicode,
        entity_encode(payload),
        urlencoding::encode(payload).into_owned(),
    ]
}
