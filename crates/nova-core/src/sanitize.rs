//! Best-effort sanitizer for error display strings that may embed
//! user-controlled scalar values (e.g. `serde_json`/`toml` deserialization
//! errors such as `invalid type: string "..."`, `unknown field \`...\``).
//!
//! This is intentionally string-based so callers can use it without
//! depending on the deserialization crate that produced the message.

/// Redact all double-quoted substrings in `message`, preserving surrounding
/// structure (line/column info, expected-field lists, ...).
#[must_use]
pub fn sanitize_json_error_message(message: &str) -> String {
    let mut out = String::with_capacity(message.len());
    let mut rest = message;

    while let Some(start) = rest.find('"') {
        out.push_str(&rest[..=start]);
        rest = &rest[start + 1..];

        let bytes = rest.as_bytes();
        let mut end = None;
        for (idx, &b) in bytes.iter().enumerate() {
            if b != b'"' {
                continue;
            }
            let mut backslashes = 0usize;
            let mut k = idx;
            while k > 0 && bytes[k - 1] == b'\\' {
                backslashes += 1;
                k -= 1;
            }
            if backslashes % 2 == 0 {
                end = Some(idx);
                break;
            }
        }

        match end {
            Some(end) => {
                out.push_str("<redacted>");
                out.push('"');
                rest = &rest[end + 1..];
            }
            None => {
                out.push_str("<redacted>");
                rest = "";
                break;
            }
        }
    }

    out.push_str(rest);
    out
}
