//! Tokenizer for `<@ID>` user references embedded in message text.
//!
//! An id is `U` or `W` followed by 6 to 20 uppercase ASCII letters or digits,
//! and the reference must close with `>` right after the id.

const MIN_TAIL: usize = 6;
const MAX_TAIL: usize = 20;

/// A `<@ID>` occurrence; `start..end` covers the whole reference including
/// the brackets.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MentionSpan<'t> {
    pub start: usize,
    pub end: usize,
    pub id: &'t str,
}

/// Lazy iterator over the mentions of a text, left to right, non-overlapping.
pub struct Mentions<'t> {
    text: &'t str,
    pos: usize,
}

pub fn mentions(text: &str) -> Mentions<'_> {
    Mentions { text, pos: 0 }
}

impl<'t> Iterator for Mentions<'t> {
    type Item = MentionSpan<'t>;

    fn next(&mut self) -> Option<Self::Item> {
        let bytes = self.text.as_bytes();

        while let Some(offset) = self.text.get(self.pos..).and_then(|rest| rest.find("<@")) {
            let start = self.pos + offset;
            let id_start = start + 2;

            if let Some(id_len) = id_length(bytes, id_start)
                && bytes.get(id_start + id_len) == Some(&b'>')
                && let Some(id) = self.text.get(id_start..id_start + id_len)
            {
                let end = id_start + id_len + 1;
                self.pos = end;
                return Some(MentionSpan { start, end, id });
            }

            // `<@` can itself be followed by another `<@`
            self.pos = start + 1;
        }

        self.pos = self.text.len();
        None
    }
}

/// Length of a well-formed id starting at `at`, if there is one.
fn id_length(bytes: &[u8], at: usize) -> Option<usize> {
    match bytes.get(at) {
        Some(b'U') | Some(b'W') => {}
        _ => return None,
    }

    let tail = bytes
        .get(at + 1..)?
        .iter()
        .take_while(|b| b.is_ascii_uppercase() || b.is_ascii_digit())
        .count();

    (MIN_TAIL..=MAX_TAIL).contains(&tail).then_some(tail + 1)
}

/// Rewrite every `<@ID>` as `<@NAME>` where `NAME` comes from `resolve`.
///
/// Text outside the references is copied unchanged. The first resolver error
/// aborts the substitution.
pub fn replace_mentions<F, E>(text: &str, mut resolve: F) -> Result<String, E>
where
    F: FnMut(&str) -> Result<String, E>,
{
    let mut out = String::with_capacity(text.len());
    let mut copied = 0;

    for span in mentions(text) {
        out.push_str(text.get(copied..span.start).unwrap_or_default());
        out.push_str("<@");
        out.push_str(&resolve(span.id)?);
        out.push('>');
        copied = span.end;
    }
    out.push_str(text.get(copied..).unwrap_or_default());

    Ok(out)
}
