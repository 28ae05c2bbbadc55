//! `Content-Disposition` filename extraction.

/// Filename announced by a `Content-Disposition` header.
///
/// `filename*=UTF-8''<percent-encoded>` wins over a plain `filename=` when both
/// are present. Directory components are stripped.
pub fn filename_from_disposition(header: &str) -> Option<String> {
    let mut plain = None;
    let mut extended = None;
    for part in split_params(header) {
        let Some((name, value)) = part.split_once('=') else {
            continue;
        };
        let name = name.trim().to_ascii_lowercase();
        let value = value.trim();
        match name.as_str() {
            "filename*" => extended = decode_extended(value),
            "filename" => plain = Some(unquote(value)),
            _ => {}
        }
    }
    extended
        .or(plain)
        .map(|name| strip_directories(&name))
        .filter(|name| !name.is_empty())
}

// Splits on ';' outside of double quotes.
fn split_params(header: &str) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut in_quotes = false;
    let mut start = 0;
    for (idx, ch) in header.char_indices() {
        match ch {
            '"' => in_quotes = !in_quotes,
            ';' if !in_quotes => {
                parts.push(&header[start..idx]);
                start = idx + 1;
            }
            _ => {}
        }
    }
    parts.push(&header[start..]);
    parts
}

fn unquote(value: &str) -> String {
    let value = value.trim();
    if value.len() >= 2 && value.starts_with('"') && value.ends_with('"') {
        value[1..value.len() - 1].replace("\\\"", "\"")
    } else {
        value.to_string()
    }
}

fn decode_extended(value: &str) -> Option<String> {
    let value = unquote(value);
    let mut pieces = value.splitn(3, '\'');
    let charset = pieces.next()?;
    let _language = pieces.next()?;
    let encoded = pieces.next()?;
    if !charset.is_empty() && !charset.eq_ignore_ascii_case("utf-8") {
        tracing::debug!(charset, "Unsupported filename* charset");
        return None;
    }
    urlencoding::decode(encoded)
        .ok()
        .map(|decoded| decoded.into_owned())
}

fn strip_directories(name: &str) -> String {
    name.rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim()
        .to_string()
}
