//! Lightweight scanning of Python source text.
//!
//! Nothing here is a parser. The scanner only tracks what is needed to tell
//! code apart from comments and string literals: trailing-semicolon handling
//! and the bracket/termination sanity check both sit on top of it.

/// Split text into lines, keeping line endings attached (like Python's
/// `str.splitlines(keepends=True)` restricted to `\n`).
pub fn split_keepends(text: &str) -> Vec<String> {
    let mut lines = Vec::new();
    let mut start = 0;
    for (i, b) in text.bytes().enumerate() {
        if b == b'\n' {
            lines.push(text[start..=i].to_string());
            start = i + 1;
        }
    }
    if start < text.len() {
        lines.push(text[start..].to_string());
    }
    lines
}

struct ScanResult {
    /// Byte offset and character of every char outside comments and strings.
    code: Vec<(usize, char)>,
    unterminated_string: bool,
}

/// Walk the source once, classifying each character as code, comment, or
/// string content. Quote characters that open or close a literal are kept
/// as code. Backslash always escapes the next character; that matches the
/// tokenizer, which never ends a literal on an escaped quote even in raw
/// strings.
fn scan(src: &str) -> ScanResult {
    let mut code = Vec::new();
    let mut chars = src.char_indices().peekable();
    let mut unterminated = false;

    while let Some((i, c)) = chars.next() {
        match c {
            '#' => {
                // Comment runs to end of line.
                for (_, c2) in chars.by_ref() {
                    if c2 == '\n' {
                        break;
                    }
                }
            }
            '"' | '\'' => {
                code.push((i, c));
                let quote = c;
                // Triple-quoted?
                let mut triple = false;
                let rest = &src[i + c.len_utf8()..];
                let mut rest_chars = rest.chars();
                if rest_chars.next() == Some(quote) && rest_chars.next() == Some(quote) {
                    triple = true;
                    chars.next();
                    chars.next();
                }
                let mut closed = false;
                while let Some((j, sc)) = chars.next() {
                    match sc {
                        '\\' => {
                            chars.next();
                        }
                        '\n' if !triple => break,
                        q if q == quote => {
                            if triple {
                                let mut look = chars.clone();
                                if look.next().map(|(_, c2)| c2) == Some(quote)
                                    && look.next().map(|(_, c2)| c2) == Some(quote)
                                {
                                    code.push((j, sc));
                                    if let Some(p) = chars.next() {
                                        code.push(p);
                                    }
                                    if let Some(p) = chars.next() {
                                        code.push(p);
                                    }
                                    closed = true;
                                    break;
                                }
                            } else {
                                code.push((j, sc));
                                closed = true;
                                break;
                            }
                        }
                        _ => {}
                    }
                }
                if !closed {
                    unterminated = true;
                }
            }
            _ => code.push((i, c)),
        }
    }

    ScanResult {
        code,
        unterminated_string: unterminated,
    }
}

/// Remove a trailing semicolon if the last non-whitespace code character is
/// one. Returns the (possibly shortened) source and whether a semicolon was
/// removed. Semicolons inside comments or strings never match.
pub fn strip_trailing_semicolon(src: &str) -> (String, bool) {
    for &(i, c) in scan(src).code.iter().rev() {
        if c.is_whitespace() {
            continue;
        }
        if c == ';' {
            let mut out = String::with_capacity(src.len() - 1);
            out.push_str(&src[..i]);
            out.push_str(&src[i + 1..]);
            return (out, true);
        }
        break;
    }
    (src.to_string(), false)
}

/// Insert a semicolon after the last non-whitespace code character.
pub fn restore_trailing_semicolon(src: &str) -> String {
    for &(i, c) in scan(src).code.iter().rev() {
        if c.is_whitespace() {
            continue;
        }
        let end = i + c.len_utf8();
        let mut out = String::with_capacity(src.len() + 1);
        out.push_str(&src[..end]);
        out.push(';');
        out.push_str(&src[end..]);
        return out;
    }
    src.to_string()
}

/// For each line of `src`, whether that line begins inside a string
/// literal (an open triple-quoted string, or a single-quoted one continued
/// with a trailing backslash). Such lines are string content, whatever
/// they look like.
pub fn lines_opening_in_string(src: &str) -> Vec<bool> {
    let n = split_keepends(src).len();
    let mut flags = vec![false; n];
    let mut line = 0usize;
    let mut chars = src.char_indices().peekable();

    while let Some((i, c)) = chars.next() {
        match c {
            '\n' => line += 1,
            '#' => {
                for (_, c2) in chars.by_ref() {
                    if c2 == '\n' {
                        line += 1;
                        break;
                    }
                }
            }
            '"' | '\'' => {
                let quote = c;
                let mut triple = false;
                let rest = &src[i + c.len_utf8()..];
                let mut rest_chars = rest.chars();
                if rest_chars.next() == Some(quote) && rest_chars.next() == Some(quote) {
                    triple = true;
                    chars.next();
                    chars.next();
                }
                while let Some((_, sc)) = chars.next() {
                    match sc {
                        '\\' => {
                            if let Some((_, esc)) = chars.next()
                                && esc == '\n'
                            {
                                line += 1;
                                if line < n {
                                    flags[line] = true;
                                }
                            }
                        }
                        '\n' => {
                            line += 1;
                            if !triple {
                                break;
                            }
                            if line < n {
                                flags[line] = true;
                            }
                        }
                        q if q == quote => {
                            if triple {
                                let mut look = chars.clone();
                                if look.next().map(|(_, c2)| c2) == Some(quote)
                                    && look.next().map(|(_, c2)| c2) == Some(quote)
                                {
                                    chars.next();
                                    chars.next();
                                    break;
                                }
                            } else {
                                break;
                            }
                        }
                        _ => {}
                    }
                }
            }
            _ => {}
        }
    }

    flags
}

/// Cheap plausibility check: strings terminate and brackets balance LIFO.
/// This is deliberately weaker than a grammar; real syntax errors are the
/// external tool's to report.
pub fn is_probably_valid(src: &str) -> bool {
    let result = scan(src);
    if result.unterminated_string {
        return false;
    }
    let mut stack = Vec::new();
    for &(_, c) in &result.code {
        match c {
            '(' | '[' | '{' => stack.push(c),
            ')' => {
                if stack.pop() != Some('(') {
                    return false;
                }
            }
            ']' => {
                if stack.pop() != Some('[') {
                    return false;
                }
            }
            '}' => {
                if stack.pop() != Some('{') {
                    return false;
                }
            }
            _ => {}
        }
    }
    stack.is_empty()
}
