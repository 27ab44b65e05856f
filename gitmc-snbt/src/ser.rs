//! Deterministic SNBT serialization.

use gitmc_nbt::Value;

/// Which quote character wraps string values and non-bare keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuoteStyle {
    Double,
    Single,
}

impl QuoteStyle {
    fn char(self) -> char {
        match self {
            QuoteStyle::Double => '"',
            QuoteStyle::Single => '\'',
        }
    }
}

/// Serialization option bundle. Output is a pure function of the value and
/// these options.
#[derive(Debug, Clone)]
pub struct SnbtOptions {
    /// Spaces per nesting level; `None` suppresses all whitespace.
    pub indent: Option<usize>,
    /// Emit compound members in sorted key order instead of tree order.
    pub sort_keys: bool,
    pub quote_style: QuoteStyle,
    /// Emit the `b`/`s`/`L`/`f`/`d` suffixes. Both named bundles set this;
    /// turning it off makes the output lossy under re-parsing.
    pub print_typed_suffixes: bool,
}

impl SnbtOptions {
    /// The pretty, indented form written to disk for diffing.
    pub fn expanded() -> SnbtOptions {
        SnbtOptions {
            indent: Some(4),
            sort_keys: false,
            quote_style: QuoteStyle::Double,
            print_typed_suffixes: true,
        }
    }

    /// The whitespace-free form used as the basis for content comparison.
    pub fn compact() -> SnbtOptions {
        SnbtOptions {
            indent: None,
            sort_keys: false,
            quote_style: QuoteStyle::Double,
            print_typed_suffixes: true,
        }
    }
}

/// Serialize a value with the given options.
pub fn to_string(value: &Value, opts: &SnbtOptions) -> String {
    let mut out = String::new();
    write_value(&mut out, value, opts, 0);
    out
}

fn write_value(out: &mut String, value: &Value, opts: &SnbtOptions, depth: usize) {
    let mut itoa_buf = itoa::Buffer::new();
    match value {
        Value::Byte(n) => {
            out.push_str(itoa_buf.format(*n));
            suffix(out, opts, "b");
        }
        Value::Short(n) => {
            out.push_str(itoa_buf.format(*n));
            suffix(out, opts, "s");
        }
        Value::Int(n) => out.push_str(itoa_buf.format(*n)),
        Value::Long(n) => {
            out.push_str(itoa_buf.format(*n));
            suffix(out, opts, "L");
        }
        Value::Float(n) => {
            write_f32(out, *n);
            suffix(out, opts, "f");
        }
        Value::Double(n) => {
            write_f64(out, *n);
            suffix(out, opts, "d");
        }
        Value::String(s) => write_escaped(out, s, opts.quote_style.char()),
        Value::ByteArray(items) => {
            write_array(out, opts, "B", items.len(), |out, i| {
                out.push_str(itoa::Buffer::new().format(items[i]));
                suffix(out, opts, "b");
            });
        }
        Value::IntArray(items) => {
            write_array(out, opts, "I", items.len(), |out, i| {
                out.push_str(itoa::Buffer::new().format(items[i]));
            });
        }
        Value::LongArray(items) => {
            write_array(out, opts, "L", items.len(), |out, i| {
                out.push_str(itoa::Buffer::new().format(items[i]));
                suffix(out, opts, "L");
            });
        }
        Value::List(list) => {
            if list.is_empty() {
                out.push_str("[]");
                return;
            }
            out.push('[');
            for (i, item) in list.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline_indent(out, opts, depth + 1);
                write_value(out, item, opts, depth + 1);
            }
            newline_indent(out, opts, depth);
            out.push(']');
        }
        Value::Compound(compound) => {
            if compound.is_empty() {
                out.push_str("{}");
                return;
            }
            out.push('{');
            let mut keys: Vec<&String> = compound.keys().collect();
            if opts.sort_keys {
                keys.sort();
            }
            for (i, key) in keys.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                newline_indent(out, opts, depth + 1);
                write_key(out, key, opts);
                out.push(':');
                if opts.indent.is_some() {
                    out.push(' ');
                }
                write_value(out, &compound[key.as_str()], opts, depth + 1);
            }
            newline_indent(out, opts, depth);
            out.push('}');
        }
    }
}

fn suffix(out: &mut String, opts: &SnbtOptions, s: &str) {
    if opts.print_typed_suffixes {
        out.push_str(s);
    }
}

fn newline_indent(out: &mut String, opts: &SnbtOptions, depth: usize) {
    if let Some(width) = opts.indent {
        out.push('\n');
        for _ in 0..depth * width {
            out.push(' ');
        }
    }
}

/// Typed arrays stay on one line in both forms; a block-state array is a
/// single logical value and splitting it would bury real diffs in noise.
fn write_array(
    out: &mut String,
    opts: &SnbtOptions,
    prefix: &str,
    len: usize,
    mut element: impl FnMut(&mut String, usize),
) {
    out.push('[');
    out.push_str(prefix);
    out.push(';');
    for i in 0..len {
        if i > 0 {
            out.push(',');
        }
        if opts.indent.is_some() {
            out.push(' ');
        }
        element(out, i);
    }
    out.push(']');
}

fn write_f32(out: &mut String, n: f32) {
    if n.is_finite() {
        out.push_str(ryu::Buffer::new().format(n));
    } else if n.is_nan() {
        out.push_str("NaN");
    } else if n > 0.0 {
        out.push_str("Infinity");
    } else {
        out.push_str("-Infinity");
    }
}

fn write_f64(out: &mut String, n: f64) {
    if n.is_finite() {
        out.push_str(ryu::Buffer::new().format(n));
    } else if n.is_nan() {
        out.push_str("NaN");
    } else if n > 0.0 {
        out.push_str("Infinity");
    } else {
        out.push_str("-Infinity");
    }
}

fn write_key(out: &mut String, key: &str, opts: &SnbtOptions) {
    if is_bare_key(key) {
        out.push_str(key);
    } else {
        write_escaped(out, key, opts.quote_style.char());
    }
}

fn is_bare_key(key: &str) -> bool {
    !key.is_empty()
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | '+'))
}

fn write_escaped(out: &mut String, s: &str, quote: char) {
    out.push(quote);
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            c if c == quote => {
                out.push('\\');
                out.push(c);
            }
            c => out.push(c),
        }
    }
    out.push(quote);
}
