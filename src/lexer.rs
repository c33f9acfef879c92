//! A module implementing lexical analysis (tokenization) of a command line.
//!
//! Words are separated by runs of spaces, tabs or newlines. There is no quoting
//! and no escaping: `"a b"` is the two words `"a` and `b"`.

/// Capacity of the argument vector, the program name included.
pub const MAX_ARGS: usize = 64;

/// Capacity of the line buffer, terminator included.
pub const MAX_LINE_LENGTH: usize = 1024;

const SEPARATORS: [char; 3] = [' ', '\t', '\n'];

/// Splits a line into at most `max_args - 1` non-empty words.
///
/// Words beyond the bound are dropped without any error; an empty or
/// whitespace-only line gives an empty vector.
///
/// # Arguments
/// * `line` - The string to be tokenized.
/// * `max_args` - Capacity of the argument vector (see [`MAX_ARGS`]).
pub fn split_into_tokens(line: &str, max_args: usize) -> Vec<&str> {
    let limit = max_args.saturating_sub(1);
    let mut words = line.split(SEPARATORS).filter(|w| !w.is_empty());
    let tokens: Vec<&str> = words.by_ref().take(limit).collect();

    let dropped = words.count();
    if dropped > 0 {
        log::debug!("argument limit {} reached, dropping {} words", max_args, dropped);
    }
    tokens
}

/// Cuts `line` to what a buffer of `max_len` bytes holds (`max_len - 1` bytes
/// of text), backing off to the previous character boundary.
pub fn clamp_line(line: &str, max_len: usize) -> &str {
    let limit = max_len.saturating_sub(1);
    if line.len() <= limit {
        return line;
    }
    let mut end = limit;
    while !line.is_char_boundary(end) {
        end -= 1;
    }
    log::debug!("line of {} bytes cut to {}", line.len(), end);
    &line[..end]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_splits_on_runs_of_whitespace() {
        let tokens = split_into_tokens("  ls \t -l   /tmp\n", MAX_ARGS);
        assert_eq!(tokens, vec!["ls", "-l", "/tmp"]);
    }

    #[test]
    fn test_blank_lines_give_no_tokens() {
        assert!(split_into_tokens("", MAX_ARGS).is_empty());
        assert!(split_into_tokens(" \t  \n", MAX_ARGS).is_empty());
    }

    #[test]
    fn test_quotes_do_not_group_words() {
        let tokens = split_into_tokens("say \"hello world\"", MAX_ARGS);
        assert_eq!(tokens, vec!["say", "\"hello", "world\""]);
    }

    #[test]
    fn test_words_beyond_limit_are_dropped() {
        let line = (0..100).map(|i| i.to_string()).collect::<Vec<_>>().join(" ");
        let tokens = split_into_tokens(&line, MAX_ARGS);

        assert_eq!(tokens.len(), MAX_ARGS - 1);
        assert_eq!(tokens.first(), Some(&"0"));
        assert_eq!(tokens.last(), Some(&"62"));
        assert!(!tokens.contains(&"63"));
    }

    #[test]
    fn test_small_limit() {
        assert_eq!(split_into_tokens("a b c d", 3), vec!["a", "b"]);
        assert!(split_into_tokens("a b", 1).is_empty());
    }

    #[test]
    fn test_clamp_line_keeps_short_lines() {
        assert_eq!(clamp_line("echo hi", MAX_LINE_LENGTH), "echo hi");
    }

    #[test]
    fn test_clamp_line_respects_char_boundaries() {
        // 'é' is two bytes; a 5-byte buffer holds 4 bytes of text
        assert_eq!(clamp_line("abcdef", 5), "abcd");
        assert_eq!(clamp_line("abcé", 5), "abc");
    }
}
