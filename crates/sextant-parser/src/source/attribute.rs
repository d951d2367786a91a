//! Lexical helpers for attribute-annotated handler source.
//!
//! Everything here works on byte offsets into ASCII-delimited text. String,
//! verbatim-string and char literals are skipped so brackets and commas
//! inside them never count.

use serde_json::Value;

/// Replace `//` and `/* */` comments with spaces, keeping newlines so line
/// numbers survive.
pub(crate) fn strip_comments(text: &str) -> String {
    let bytes = text.as_bytes();
    let mut out = String::with_capacity(text.len());
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                let end = skip_literal(bytes, i);
                out.push_str(&text[i..end]);
                i = end;
            }
            b'/' if bytes.get(i + 1) == Some(&b'/') => {
                while i < bytes.len() && bytes[i] != b'\n' {
                    out.push(' ');
                    i += 1;
                }
            }
            b'/' if bytes.get(i + 1) == Some(&b'*') => {
                out.push_str("  ");
                i += 2;
                while i < bytes.len() && !(bytes[i] == b'*' && bytes.get(i + 1) == Some(&b'/')) {
                    out.push(if bytes[i] == b'\n' { '\n' } else { ' ' });
                    i += 1;
                }
                if i < bytes.len() {
                    out.push_str("  ");
                    i += 2;
                }
            }
            _ => {
                // Copy the whole UTF-8 sequence.
                let len = utf8_len(bytes[i]);
                let end = (i + len).min(bytes.len());
                out.push_str(&text[i..end]);
                i = end;
            }
        }
    }

    out
}

fn utf8_len(first: u8) -> usize {
    match first {
        0x00..=0x7f => 1,
        0xc0..=0xdf => 2,
        0xe0..=0xef => 3,
        _ => 4,
    }
}

/// Offset just past the literal opening at `start`.
///
/// A `"` preceded by `@` (or `$@`/`@$`) is a verbatim string where `""` is
/// the only escape.
fn skip_literal(bytes: &[u8], start: usize) -> usize {
    let quote = bytes[start];
    let verbatim = quote == b'"'
        && start > 0
        && (bytes[start - 1] == b'@' || (start > 1 && bytes[start - 2] == b'@' && bytes[start - 1] == b'$'));
    let mut i = start + 1;

    while i < bytes.len() {
        match bytes[i] {
            b'"' if verbatim => {
                if bytes.get(i + 1) == Some(&b'"') {
                    i += 2;
                    continue;
                }
                return i + 1;
            }
            b'\\' if !verbatim => i += 2,
            b'\n' if !verbatim => return i,
            c if c == quote => return i + 1,
            _ => i += 1,
        }
    }

    bytes.len()
}

/// Read a bracketed region starting at `open` (which must hold `(`, `[`, `{`
/// or `<`). Returns the inner text and the offset just past the closer.
pub(crate) fn read_balanced(text: &str, open: usize) -> Option<(&str, usize)> {
    let bytes = text.as_bytes();
    let opener = *bytes.get(open)?;
    let closer = match opener {
        b'(' => b')',
        b'[' => b']',
        b'{' => b'}',
        b'<' => b'>',
        _ => return None,
    };

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_literal(bytes, i);
                continue;
            }
            c if c == opener => depth += 1,
            c if c == closer => {
                depth -= 1;
                if depth == 0 {
                    return Some((&text[open + 1..i], i + 1));
                }
            }
            _ => {}
        }
        i += 1;
    }

    None
}

/// Split on `sep` outside of literals and `()`, `[]`, `{}`, `<>` nesting.
pub(crate) fn split_top_level(text: &str, sep: u8) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut parts = Vec::new();
    let mut depth = 0i32;
    let mut start = 0;
    let mut i = 0;

    while i < bytes.len() {
        match bytes[i] {
            b'"' | b'\'' => {
                i = skip_literal(bytes, i);
                continue;
            }
            b'(' | b'[' | b'{' | b'<' => depth += 1,
            b')' | b']' | b'}' | b'>' => depth -= 1,
            c if c == sep && depth == 0 => {
                parts.push(text[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }

    let last = text[start..].trim();
    if !last.is_empty() || !parts.is_empty() {
        parts.push(last);
    }
    parts.retain(|p| !p.is_empty());
    parts
}

/// A parsed attribute argument value.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ArgValue {
    /// A string literal, unescaped.
    Str(String),
    /// A bare identifier or member access (`AuthorizationLevel.Anonymous`).
    Symbol(String),
    /// `typeof(T)`.
    Type(String),
    Bool(bool),
    Int(i64),
    Null,
    List(Vec<ArgValue>),
}

impl ArgValue {
    pub(crate) fn parse(text: &str) -> Self {
        let text = text.trim();

        if let Some(literal) = parse_string_literal(text) {
            return Self::Str(literal);
        }
        if let Some(inner) = call_argument(text, "typeof") {
            return Self::Type(inner.to_string());
        }
        if let Some(inner) = call_argument(text, "nameof") {
            return Self::Str(last_member(inner).to_string());
        }
        if text.starts_with('[') && text.ends_with(']') {
            return Self::List(parse_items(&text[1..text.len() - 1]));
        }
        if text.starts_with("new") && text.ends_with('}') {
            if let Some(open) = text.find('{') {
                if let Some((inner, _)) = read_balanced(text, open) {
                    return Self::List(parse_items(inner));
                }
            }
        }
        match text {
            "true" => return Self::Bool(true),
            "false" => return Self::Bool(false),
            "null" => return Self::Null,
            _ => {}
        }
        if let Ok(n) = text.parse::<i64>() {
            return Self::Int(n);
        }

        Self::Symbol(text.to_string())
    }

    /// Scalar text: string contents, the member of a symbol, the type name.
    pub(crate) fn text(&self) -> Option<String> {
        match self {
            Self::Str(s) | Self::Type(s) => Some(s.clone()),
            Self::Symbol(s) => Some(last_member(s).to_string()),
            Self::Int(n) => Some(n.to_string()),
            Self::Bool(b) => Some(b.to_string()),
            Self::Null | Self::List(_) => None,
        }
    }

    /// `OperationType.Read` -> `Some(("OperationType", "Read"))`.
    pub(crate) fn qualified(&self) -> Option<(&str, &str)> {
        match self {
            Self::Symbol(s) => s.rsplit_once('.'),
            _ => None,
        }
    }

    pub(crate) fn to_json(&self) -> Value {
        match self {
            Self::Str(s) | Self::Symbol(s) | Self::Type(s) => Value::String(s.clone()),
            Self::Bool(b) => Value::Bool(*b),
            Self::Int(n) => Value::from(*n),
            Self::Null => Value::Null,
            Self::List(items) => Value::Array(items.iter().map(Self::to_json).collect()),
        }
    }
}

fn parse_items(inner: &str) -> Vec<ArgValue> {
    split_top_level(inner, b',')
        .into_iter()
        .map(ArgValue::parse)
        .collect()
}

fn last_member(s: &str) -> &str {
    s.rsplit('.').next().unwrap_or(s).trim()
}

/// `typeof(Foo)` -> `Foo` for the given function name.
fn call_argument<'a>(text: &'a str, function: &str) -> Option<&'a str> {
    let rest = text.strip_prefix(function)?.trim_start();
    let inner = rest.strip_prefix('(')?.strip_suffix(')')?;
    Some(inner.trim())
}

/// Unescape a regular, verbatim (`@"..."`) or interpolated (`$"..."`) string.
///
/// Interpolation holes of the form `{nameof(X)}` resolve to `X`; other holes
/// are kept verbatim.
fn parse_string_literal(text: &str) -> Option<String> {
    let (prefix, body) = text.split_at(text.find('"')?);
    let (interpolated, verbatim) = match prefix {
        "" => (false, false),
        "$" => (true, false),
        "@" => (false, true),
        "$@" | "@$" => (true, true),
        _ => return None,
    };
    let body = body.strip_prefix('"')?.strip_suffix('"')?;

    let mut out = String::with_capacity(body.len());
    let mut chars = body.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' if verbatim => {
                chars.next();
                out.push('"');
            }
            '\\' if !verbatim => match chars.next() {
                Some('n') => out.push('\n'),
                Some('t') => out.push('\t'),
                Some('r') => out.push('\r'),
                Some('0') => out.push('\0'),
                Some(other) => out.push(other),
                None => {}
            },
            _ => out.push(c),
        }
    }

    if interpolated {
        out = resolve_nameof_holes(&out);
    }
    Some(out)
}

fn resolve_nameof_holes(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    let mut rest = s;

    while let Some(start) = rest.find("{nameof(") {
        out.push_str(&rest[..start]);
        let after = &rest[start + "{nameof(".len()..];
        match after.find(")}") {
            Some(end) => {
                out.push_str(last_member(&after[..end]));
                rest = &after[end + 2..];
            }
            None => {
                out.push_str(&rest[start..]);
                rest = "";
            }
        }
    }
    out.push_str(rest);
    out
}

/// One argument of an attribute constructor call.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Argument {
    /// `name:` (constructor parameter) or `Name =` (property) label.
    pub name: Option<String>,
    /// True for `Name = value` property initializers.
    pub property: bool,
    pub value: ArgValue,
}

/// A parsed `[Name(args)]` attribute.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Attribute {
    /// Attribute name without namespace or `Attribute` suffix.
    pub name: String,
    pub args: Vec<Argument>,
}

impl Attribute {
    /// Parse the text of a single attribute (`HttpTrigger(...)`).
    pub(crate) fn parse(text: &str) -> Option<Self> {
        let text = text.trim();
        // Attribute targets: `return: Foo`, `assembly: Bar`.
        let text = match text.split_once(':') {
            Some((target, rest))
                if !target.contains('(') && target.trim().chars().all(|c| c.is_ascii_alphabetic()) =>
            {
                rest.trim()
            }
            _ => text,
        };

        let name_end = text
            .find(|c: char| !(c.is_alphanumeric() || c == '_' || c == '.'))
            .unwrap_or(text.len());
        let full_name = &text[..name_end];
        let name = last_member(full_name);
        if name.is_empty() {
            return None;
        }
        let name = name.strip_suffix("Attribute").filter(|n| !n.is_empty()).unwrap_or(name);

        let rest = text[name_end..].trim_start();
        let args = if rest.starts_with('(') {
            let open = text.len() - rest.len();
            let (inner, _) = read_balanced(text, open)?;
            split_top_level(inner, b',')
                .into_iter()
                .map(Argument::parse)
                .collect()
        } else {
            Vec::new()
        };

        Some(Self {
            name: name.to_string(),
            args,
        })
    }

    /// Parse the inner text of one `[...]` block, which may list several attributes.
    pub(crate) fn parse_block(inner: &str) -> Vec<Self> {
        split_top_level(inner, b',')
            .into_iter()
            .filter_map(Self::parse)
            .collect()
    }

    /// Constructor argument by `name:` label, else by position among
    /// constructor arguments.
    pub(crate) fn ctor_arg(&self, index: usize, name: &str) -> Option<&ArgValue> {
        let ctor: Vec<&Argument> = self.args.iter().filter(|a| !a.property).collect();
        ctor.iter()
            .copied()
            .find(|a| a.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .or_else(|| ctor.get(index).copied().filter(|a| a.name.is_none()))
            .map(|a| &a.value)
    }

    /// Property initializer (`Name = value`), case-insensitive.
    pub(crate) fn property(&self, name: &str) -> Option<&ArgValue> {
        self.args
            .iter()
            .find(|a| a.property && a.name.as_deref().is_some_and(|n| n.eq_ignore_ascii_case(name)))
            .map(|a| &a.value)
    }

    /// Constructor arguments, labelled or not, in order.
    pub(crate) fn ctor_args(&self) -> impl Iterator<Item = &ArgValue> {
        self.args.iter().filter(|a| !a.property).map(|a| &a.value)
    }
}

impl Argument {
    fn parse(text: &str) -> Self {
        let text = text.trim();
        let ident_end = text
            .find(|c: char| !(c.is_alphanumeric() || c == '_'))
            .unwrap_or(text.len());

        if ident_end > 0 {
            let label = &text[..ident_end];
            let rest = text[ident_end..].trim_start();
            let mut chars = rest.chars();
            match (chars.next(), chars.next()) {
                (Some('='), next) if next != Some('=') => {
                    return Self {
                        name: Some(label.to_string()),
                        property: true,
                        value: ArgValue::parse(&rest[1..]),
                    };
                }
                (Some(':'), next) if next != Some(':') => {
                    return Self {
                        name: Some(label.to_string()),
                        property: false,
                        value: ArgValue::parse(&rest[1..]),
                    };
                }
                _ => {}
            }
        }

        Self {
            name: None,
            property: false,
            value: ArgValue::parse(text),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn comments_are_blanked_but_lines_kept() {
        let text = "a // [Function(\"X\")]\nb /* one\ntwo */ c \"// kept\"";
        let stripped = strip_comments(text);
        assert_eq!(stripped.lines().count(), 3);
        assert!(!stripped.contains("Function"));
        assert!(stripped.contains("\"// kept\""));
        assert!(stripped.ends_with("c \"// kept\""));
    }

    #[test]
    fn balanced_read_skips_literals() {
        let text = r#"Foo(a, ")", (b)) rest"#;
        let (inner, end) = read_balanced(text, 3).unwrap();
        assert_eq!(inner, r#"a, ")", (b)"#);
        assert_eq!(&text[end..], " rest");
        assert!(read_balanced("(unclosed", 0).is_none());
    }

    #[test]
    fn split_respects_nesting() {
        let parts = split_top_level(r#"tags: ["a", "b"], Summary = "x, y", typeof(Dictionary<string, int>)"#, b',');
        assert_eq!(
            parts,
            vec![
                r#"tags: ["a", "b"]"#,
                r#"Summary = "x, y""#,
                "typeof(Dictionary<string, int>)"
            ]
        );
        assert!(split_top_level("  ", b',').is_empty());
    }

    #[test]
    fn argument_values() {
        assert_eq!(ArgValue::parse(r#""get""#), ArgValue::Str("get".into()));
        assert_eq!(ArgValue::parse("typeof(string[])"), ArgValue::Type("string[]".into()));
        assert_eq!(ArgValue::parse("nameof(GetAsync)"), ArgValue::Str("GetAsync".into()));
        assert_eq!(ArgValue::parse("true"), ArgValue::Bool(true));
        assert_eq!(ArgValue::parse("null"), ArgValue::Null);
        assert_eq!(ArgValue::parse("404"), ArgValue::Int(404));
        assert_eq!(
            ArgValue::parse(r#"["Repo", "Admin"]"#),
            ArgValue::List(vec![ArgValue::Str("Repo".into()), ArgValue::Str("Admin".into())])
        );
        assert_eq!(
            ArgValue::parse(r#"new[] { "a", "b" }"#),
            ArgValue::List(vec![ArgValue::Str("a".into()), ArgValue::Str("b".into())])
        );
        let symbol = ArgValue::parse("HttpStatusCode.OK");
        assert_eq!(symbol.text().as_deref(), Some("OK"));
        assert_eq!(symbol.qualified(), Some(("HttpStatusCode", "OK")));
    }

    #[test]
    fn string_literal_forms() {
        assert_eq!(
            ArgValue::parse(r#"$"OperationFailure: {nameof(GetAsync)}""#),
            ArgValue::Str("OperationFailure: GetAsync".into())
        );
        assert_eq!(ArgValue::parse(r#"@"C:\path""#), ArgValue::Str(r"C:\path".into()));
        assert_eq!(ArgValue::parse(r#""say \"hi\"""#), ArgValue::Str("say \"hi\"".into()));
    }

    #[test]
    fn attribute_arguments() {
        let attr = Attribute::parse(
            r#"OpenApiResponseWithBody(statusCode: HttpStatusCode.OK, "application/json", typeof(ResourceResult), Example = typeof(GetSandboxResponseExample))"#,
        )
        .unwrap();
        assert_eq!(attr.name, "OpenApiResponseWithBody");
        assert_eq!(attr.ctor_arg(0, "statusCode").and_then(ArgValue::text).as_deref(), Some("OK"));
        assert_eq!(attr.ctor_arg(1, "contentType").and_then(ArgValue::text).as_deref(), Some("application/json"));
        assert_eq!(attr.ctor_arg(2, "bodyType").and_then(ArgValue::text).as_deref(), Some("ResourceResult"));
        assert_eq!(
            attr.property("example"),
            Some(&ArgValue::Type("GetSandboxResponseExample".into()))
        );
        assert!(attr.property("Description").is_none());
    }

    #[test]
    fn attribute_names_are_normalized() {
        let attrs = Attribute::parse_block("Microsoft.Azure.Functions.Worker.FunctionAttribute(\"X\"), RequireDocsToken");
        assert_eq!(attrs.len(), 2);
        assert_eq!(attrs[0].name, "Function");
        assert_eq!(attrs[1].name, "RequireDocsToken");
        assert!(attrs[1].args.is_empty());

        let attr = Attribute::parse("return: JsonOutput").unwrap();
        assert_eq!(attr.name, "JsonOutput");
    }
}
