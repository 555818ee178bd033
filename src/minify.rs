//! Whitespace and comment compression for stylesheet and script artifacts.
//!
//! Conservative by construction: comments are stripped with a state machine
//! that tracks string literals, whitespace runs collapse to a single space,
//! and newlines in script sources are preserved so automatic semicolon
//! insertion keeps working. If a construct is ambiguous the input is emitted
//! unchanged. Same input always produces the same output.

/// Which comment forms to strip.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommentStyle {
    /// Block comments only (`/* ... */`) — stylesheets.
    Block,
    /// Block and line comments (`// ...`) — scripts.
    BlockAndLine,
}

/// Scanner state for the comment-stripping state machine.
enum State {
    Normal,
    AfterSlash,
    InString(char),
    InStringEscape(char),
    InBlockComment,
    InBlockCommentStar,
    InLineComment,
}

/// Strip comments outside string literals.
///
/// Block comments are replaced by nothing; line comments consume up to but
/// not including the newline. Content inside `"..."`, `'...'` and `` `...` ``
/// is passed through untouched.
pub fn strip_comments(input: &str, style: CommentStyle) -> String {
    let mut output = String::with_capacity(input.len());
    let mut state = State::Normal;

    for ch in input.chars() {
        state = match state {
            State::Normal => match ch {
                '"' | '\'' | '`' => {
                    output.push(ch);
                    State::InString(ch)
                }
                '/' => State::AfterSlash,
                _ => {
                    output.push(ch);
                    State::Normal
                }
            },
            State::AfterSlash => match ch {
                '*' => State::InBlockComment,
                '/' if style == CommentStyle::BlockAndLine => State::InLineComment,
                '"' | '\'' | '`' => {
                    output.push('/');
                    output.push(ch);
                    State::InString(ch)
                }
                '/' => {
                    // CSS has no line comments: keep both slashes
                    output.push('/');
                    output.push('/');
                    State::Normal
                }
                _ => {
                    output.push('/');
                    output.push(ch);
                    State::Normal
                }
            },
            State::InString(quote) => {
                output.push(ch);
                match ch {
                    '\\' => State::InStringEscape(quote),
                    c if c == quote => State::Normal,
                    _ => State::InString(quote),
                }
            }
            State::InStringEscape(quote) => {
                output.push(ch);
                State::InString(quote)
            }
            State::InBlockComment => match ch {
                '*' => State::InBlockCommentStar,
                _ => State::InBlockComment,
            },
            State::InBlockCommentStar => match ch {
                '/' => State::Normal,
                '*' => State::InBlockCommentStar,
                _ => State::InBlockComment,
            },
            State::InLineComment => match ch {
                '\n' => {
                    output.push('\n');
                    State::Normal
                }
                _ => State::InLineComment,
            },
        };
    }
    // A trailing lone slash is real content; unterminated comments are dropped.
    if let State::AfterSlash = state {
        output.push('/');
    }
    output
}

/// Collapse runs of spaces and tabs to one space, outside string literals.
/// Newlines survive; blank lines do not.
pub fn collapse_whitespace(input: &str) -> String {
    let mut output = String::with_capacity(input.len());
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    let mut pending_space = false;
    let mut line_has_content = false;

    for ch in input.chars() {
        if let Some(quote) = in_string {
            output.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }
        match ch {
            ' ' | '\t' => {
                if line_has_content {
                    pending_space = true;
                }
            }
            '\n' | '\r' => {
                if line_has_content {
                    output.push('\n');
                }
                pending_space = false;
                line_has_content = false;
            }
            _ => {
                if pending_space {
                    output.push(' ');
                    pending_space = false;
                }
                output.push(ch);
                line_has_content = true;
                if ch == '"' || ch == '\'' || ch == '`' {
                    in_string = Some(ch);
                }
            }
        }
    }
    output
}

/// Compress a stylesheet: strip block comments, collapse whitespace, then
/// drop spaces and newlines around CSS punctuation and semicolons before `}`.
pub fn compress_css(input: &str) -> String {
    let stripped = strip_comments(input, CommentStyle::Block);
    let collapsed = collapse_whitespace(&stripped);

    let mut output = String::with_capacity(collapsed.len());
    let chars: Vec<char> = collapsed.chars().collect();
    let mut in_string: Option<char> = None;
    let mut escaped = false;
    for (i, &ch) in chars.iter().enumerate() {
        // String content passes through untouched, punctuation included.
        if let Some(quote) = in_string {
            output.push(ch);
            if escaped {
                escaped = false;
            } else if ch == '\\' {
                escaped = true;
            } else if ch == quote {
                in_string = None;
            }
            continue;
        }
        match ch {
            '"' | '\'' => {
                output.push(ch);
                in_string = Some(ch);
            }
            ' ' | '\n' => {
                let prev = output.chars().last();
                let next = chars[i + 1..].iter().find(|c| **c != ' ' && **c != '\n');
                let tight_before = matches!(prev, Some('{' | '}' | ';' | ':' | ',' | '>') | None);
                let tight_after = matches!(next, Some('{' | '}' | ';' | ',' | '>') | None);
                if !tight_before && !tight_after {
                    output.push(' ');
                }
            }
            '}' => {
                // `;}` → `}`
                if output.ends_with(';') {
                    output.pop();
                }
                output.push('}');
            }
            _ => output.push(ch),
        }
    }
    output.trim().to_string()
}

/// Compress a script: strip comments, collapse whitespace. Newline structure
/// is preserved so statement boundaries stay intact.
pub fn compress_js(input: &str) -> String {
    collapse_whitespace(&strip_comments(input, CommentStyle::BlockAndLine))
}
