//! Content lines as used by vCard and iCalendar:
//! `[group.]NAME[;PARAM=value[,value]...]:value`, folded at 75 octets.

/// A single unfolded content line.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct ContentLine {
    /// Uppercased property name without its group prefix.
    pub name: String,
    /// Uppercased parameter names with their values.
    pub params: Vec<(String, Vec<String>)>,
    /// Raw (still escaped) value.
    pub value: String,
}

impl ContentLine {
    /// All values of `param`, e.g. every `TYPE`, uppercased.
    pub fn param_values(&self, param: &str) -> impl Iterator<Item = String> + '_ {
        let param = param.to_uppercase();
        self.params
            .iter()
            .filter(move |(name, _)| *name == param)
            .flat_map(|(_, values)| values.iter().map(|v| v.to_uppercase()))
    }

    pub fn has_type(&self, ty: &str) -> bool {
        self.param_values("TYPE").any(|t| t.split(',').any(|t| t == ty))
    }
}

/// Join folded lines: a line break followed by a space or tab continues the
/// previous line.
pub(crate) fn unfold(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = Vec::new();
    for raw in text.split('\n') {
        let raw = raw.strip_suffix('\r').unwrap_or(raw);
        match raw.strip_prefix([' ', '\t']) {
            Some(rest) if !lines.is_empty() => {
                if let Some(last) = lines.last_mut() {
                    last.push_str(rest);
                }
            }
            _ if raw.is_empty() => {}
            _ => lines.push(raw.to_string()),
        }
    }
    lines
}

/// Split a content line into name, parameters and value.
pub(crate) fn parse_line(line: &str) -> Option<ContentLine> {
    // the value starts at the first colon outside a quoted parameter value
    let mut in_quotes = false;
    let colon = line.char_indices().find_map(|(i, c)| match c {
        '"' => {
            in_quotes = !in_quotes;
            None
        }
        ':' if !in_quotes => Some(i),
        _ => None,
    })?;

    let (head, value) = (&line[..colon], &line[colon + 1..]);
    let mut parts = head.split(';');
    let name = parts.next()?.trim();
    let name = name.rsplit_once('.').map_or(name, |(_, n)| n).to_uppercase();
    if name.is_empty() {
        return None;
    }

    let params = parts
        .map(|param| match param.split_once('=') {
            Some((key, values)) => (
                key.trim().to_uppercase(),
                values
                    .split(',')
                    .map(|v| v.trim_matches('"').to_string())
                    .collect(),
            ),
            // vCard 2.1 bare types: `TEL;CELL:...`
            None => ("TYPE".to_string(), vec![param.trim().to_string()]),
        })
        .collect();

    Some(ContentLine {
        name,
        params,
        value: value.to_string(),
    })
}

/// Undo text escaping (`\\`, `\,`, `\;`, `\n`).
pub(crate) fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

pub(crate) fn escape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            ',' => out.push_str("\\,"),
            ';' => out.push_str("\\;"),
            '\n' => out.push_str("\\n"),
            '\r' => {}
            c => out.push(c),
        }
    }
    out
}

/// Split an escaped value on unescaped `sep`, leaving escapes in place.
pub(crate) fn split_raw(value: &str, sep: char) -> Vec<&str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut escaped = false;

    for (i, c) in value.char_indices() {
        if escaped {
            escaped = false;
        } else if c == '\\' {
            escaped = true;
        } else if c == sep {
            parts.push(&value[start..i]);
            start = i + c.len_utf8();
        }
    }
    parts.push(&value[start..]);
    parts
}

/// Split an escaped value on unescaped `sep`, unescaping each part.
pub(crate) fn split_unescaped(value: &str, sep: char) -> Vec<String> {
    split_raw(value, sep).into_iter().map(unescape).collect()
}

/// Fold a content line at 75 octets, never inside a UTF-8 sequence.
pub(crate) fn fold(line: &str) -> String {
    const LIMIT: usize = 75;

    let mut out = String::with_capacity(line.len() + line.len() / LIMIT * 3);
    let mut width = 0;
    for c in line.chars() {
        if width + c.len_utf8() > LIMIT {
            out.push_str("\r\n ");
            width = 1;
        }
        out.push(c);
        width += c.len_utf8();
    }
    out.push_str("\r\n");
    out
}
