//! Sql string operation.
//!
//! - [`next_insert`], locate parameter placeholders
//! - [`replace_variables`], rewrite host variable references to `$N`

/// A parameter placeholder in a command text.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Placeholder {
    /// Byte offset of `$` or `?`.
    pub start: usize,
    /// Byte offset after the placeholder.
    pub end: usize,
    pub kind: PlaceholderKind,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum PlaceholderKind {
    /// `$N` with `N > 0`.
    Numbered,
    /// `$0`, replaced by its value on the client side.
    Zero,
    /// Old style `?`.
    Question,
}

/// Find the next placeholder at or after `from`.
///
/// Single quoted literals are skipped, with backslash escapes when
/// `std_strings` is off, as well as `$tag$ ... $tag$` quoted bodies. `?` is
/// only recognized when `questionmarks` is set.
pub fn next_insert(text: &str, from: usize, questionmarks: bool, std_strings: bool) -> Option<Placeholder> {
    let bytes = text.as_bytes();
    let mut string = false;
    let mut p = from;

    while p < bytes.len() {
        let b = bytes[p];

        if string {
            if !std_strings && b == b'\\' {
                p += 1;
            } else if b == b'\'' {
                string = false;
            }
            p += 1;
            continue;
        }

        match b {
            b'\'' => string = true,
            b'$' if bytes.get(p + 1).is_some_and(u8::is_ascii_digit) => {
                let digits = bytes[p + 1..].iter().take_while(|b| b.is_ascii_digit()).count();
                let end = p + 1 + digits;
                let tail = bytes.get(end).copied().unwrap_or(0);
                if !tail.is_ascii_alphabetic() && tail != b'_' {
                    let kind = match &text[p + 1..end] {
                        "0" => PlaceholderKind::Zero,
                        _ => PlaceholderKind::Numbered,
                    };
                    return Some(Placeholder { start: p, end, kind });
                }
                p = end;
                continue;
            }
            b'$' => {
                if let Some(tag_len) = dollar_tag(&bytes[p..]) {
                    let tag = &bytes[p..p + tag_len];
                    let body = p + tag_len;
                    match bytes[body..].windows(tag_len).position(|w| w == tag) {
                        Some(close) => {
                            p = body + close + tag_len;
                            continue;
                        }
                        None => return None,
                    }
                }
            }
            b'?' if questionmarks => {
                return Some(Placeholder { start: p, end: p + 1, kind: PlaceholderKind::Question });
            }
            _ => { }
        }

        p += 1;
    }

    None
}

/// Length of a `$tag$` opening at the start of `bytes`.
fn dollar_tag(bytes: &[u8]) -> Option<usize> {
    let mut i = 1;
    while let Some(&b) = bytes.get(i) {
        match b {
            b'$' => return Some(i + 1),
            b'_' => { }
            b if b.is_ascii_alphabetic() || b >= 0x80 => { }
            b if b.is_ascii_digit() && i > 1 => { }
            _ => return None,
        }
        i += 1;
    }
    None
}

fn is_var_char(b: u8) -> bool {
    b.is_ascii_alphanumeric() || matches!(b, b'_' | b'>' | b'-' | b'.') || b >= 0x80
}

/// Replace host variable references, a `:` or `?` outside single quoted
/// literals together with the variable name following it, with `$1`, `$2`,
/// and so on. `::` casts are left alone.
pub fn replace_variables(text: &str) -> String {
    let mut text = text.as_bytes().to_vec();
    let mut string = false;
    let mut counter = 1u32;
    let mut ptr = 0;

    while ptr < text.len() {
        let b = text[ptr];
        if b == b'\'' {
            string = !string;
        }

        if string || (b != b':' && b != b'?') {
            ptr += 1;
            continue;
        }

        if b == b':' && text.get(ptr + 1) == Some(&b':') {
            // the cast type name right after is skipped as well
            ptr += 3;
            continue;
        }

        let mut len = 1;
        while text.get(ptr + len).copied().is_some_and(is_var_char) {
            len += 1;
        }

        let mut buffer = itoa::Buffer::new();
        let number = buffer.format(counter);
        counter += 1;

        let mut replacement = Vec::with_capacity(number.len() + 1);
        replacement.push(b'$');
        replacement.extend_from_slice(number.as_bytes());
        let next = ptr + replacement.len();
        text.splice(ptr..ptr + len, replacement).for_each(drop);
        ptr = next;
    }

    match String::from_utf8(text) {
        Ok(ok) => ok,
        Err(err) => String::from_utf8_lossy(err.as_bytes()).into_owned(),
    }
}
