//! Text helpers for code sent to and versions read from the device

/// Undo typographic substitutions that break pasted code
///
/// Removes soft hyphens and turns curly quotes back into straight ones.
pub fn fix_broken_code(text: &str) -> String {
    text.chars()
        .filter(|&c| c != '\u{00AD}')
        .map(|c| match c {
            '\u{201C}' | '\u{201D}' => '"',
            '\u{2018}' | '\u{2019}' => '\'',
            other => other,
        })
        .collect()
}

/// Turn a firmware version such as `2v19` into a comparable number (`2.19`)
///
/// Anything after the leading numeric part is ignored, so `1v99.2` gives
/// `1.99`. Exponents are not read either: `1e2` is `1.0`, not `100.0`.
/// Firmware versions never carry one.
pub fn version_to_float(version: &str) -> Option<f64> {
    let normalized = version.trim().replacen('v', ".", 1);
    let bytes = normalized.as_bytes();

    let mut end = 0;
    if matches!(bytes.first(), Some(b'+' | b'-')) {
        end += 1;
    }
    while bytes.get(end).is_some_and(u8::is_ascii_digit) {
        end += 1;
    }
    if bytes.get(end) == Some(&b'.') {
        end += 1;
        while bytes.get(end).is_some_and(u8::is_ascii_digit) {
            end += 1;
        }
    }

    normalized[..end].parse().ok()
}
