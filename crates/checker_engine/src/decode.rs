use encoding_rs::{Encoding, UTF_8};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedWindow {
    pub text: String,
    pub encoding_label: String,
    /// Malformed sequences were replaced with U+FFFD.
    pub had_replacements: bool,
}

/// Decode a leading body window without ever failing.
///
/// Order: BOM -> Content-Type charset -> UTF-8. The window is usually cut
/// mid-stream, so a trailing partial character simply becomes a replacement.
pub fn decode_window(bytes: &[u8], content_type: Option<&str>) -> DecodedWindow {
    let encoding = Encoding::for_bom(bytes)
        .map(|(enc, _)| enc)
        .or_else(|| {
            content_type
                .and_then(extract_charset)
                .and_then(|label| Encoding::for_label(label.as_bytes()))
        })
        .unwrap_or(UTF_8);

    // `decode` sniffs and strips the BOM itself.
    let (text, used, had_replacements) = encoding.decode(bytes);
    DecodedWindow {
        text: text.into_owned(),
        encoding_label: used.name().to_string(),
        had_replacements,
    }
}

fn extract_charset(content_type: &str) -> Option<String> {
    content_type
        .split(';')
        .filter_map(|part| {
            let (key, value) = part.split_once('=')?;
            if key.trim().eq_ignore_ascii_case("charset") {
                Some(value.trim().trim_matches(['"', '\'']).to_string())
            } else {
                None
            }
        })
        .next()
}
