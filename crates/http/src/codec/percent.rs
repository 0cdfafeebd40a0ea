//! Form-style percent decoding for request paths, query strings and urlencoded bodies.
//!
//! `+` decodes to a space and `%XX` to the byte `0xXX`; the resulting bytes are read as UTF-8.
//! A `%` that is not followed by two hex digits is kept literally, and input whose decoded bytes
//! are not valid UTF-8 is returned unchanged.

use std::borrow::Cow;
use std::collections::HashMap;

/// Decodes one percent-encoded component.
pub fn decode_percent(input: &str) -> Cow<'_, str> {
    if !input.contains(['%', '+']) {
        return Cow::Borrowed(input);
    }

    // before unescaping, so an encoded `%2B` stays a plus sign
    let spaced = input.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => Cow::Owned(decoded.into_owned()),
        Err(_) => Cow::Borrowed(input),
    }
}

/// Decodes `a=1&b=2` style parameters into `params`.
///
/// Empty segments are skipped, keys are trimmed, a segment without `=` maps to an empty value,
/// and for a repeated key the last occurrence wins.
pub fn decode_params(query: &str, params: &mut HashMap<String, String>) {
    for segment in query.split('&').filter(|segment| !segment.is_empty()) {
        let (key, value) = segment.split_once('=').unwrap_or((segment, ""));
        params.insert(decode_percent(key).trim().to_string(), decode_percent(value).into_owned());
    }
}
