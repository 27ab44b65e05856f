//! Recursive-descent SNBT parser producing `gitmc_nbt::Value` trees.

use gitmc_nbt::{Compound, List, Tag, Value};

use crate::error::{Error, Result};
use crate::parser;

/// Parse a complete SNBT value. Trailing non-whitespace input is an error.
pub fn from_str(input: &str) -> Result<Value> {
    let (rest, parsed) = value(input, input)?;
    let rest = rest.trim_start();
    if !rest.is_empty() {
        return Err(Error::TrailingInput {
            offset: offset(input, rest),
        });
    }
    Ok(parsed)
}

fn offset(full: &str, rest: &str) -> usize {
    full.len() - rest.len()
}

fn value<'a>(full: &'a str, input: &'a str) -> Result<(&'a str, Value)> {
    let input = input.trim_start();
    match input.bytes().next() {
        None => Err(Error::Eof),
        Some(b'{') => compound(full, input),
        Some(b'[') => array_or_list(full, input),
        Some(b'"') | Some(b'\'') => {
            let (rest, s) = quoted(full, input)?;
            Ok((rest, Value::String(s)))
        }
        Some(_) => scalar(full, input),
    }
}

/// Read a quoted string starting at `input[0]` (either quote kind),
/// resolving C-style escapes.
fn quoted<'a>(full: &'a str, input: &'a str) -> Result<(&'a str, String)> {
    let mut iter = input.char_indices();
    let quote = match iter.next() {
        Some((_, c)) => c,
        None => return Err(Error::Eof),
    };
    let mut out = String::new();
    while let Some((i, c)) = iter.next() {
        if c == '\\' {
            match iter.next() {
                Some((_, 'n')) => out.push('\n'),
                Some((_, 't')) => out.push('\t'),
                Some((_, 'r')) => out.push('\r'),
                Some((_, '\\')) => out.push('\\'),
                Some((_, '"')) => out.push('"'),
                Some((_, '\'')) => out.push('\''),
                Some((j, _)) => {
                    return Err(Error::InvalidEscape {
                        offset: offset(full, &input[j..]),
                    })
                }
                None => break,
            }
        } else if c == quote {
            return Ok((&input[i + c.len_utf8()..], out));
        } else {
            out.push(c);
        }
    }
    Err(Error::UnterminatedString {
        offset: offset(full, input),
    })
}

fn scalar<'a>(full: &'a str, input: &'a str) -> Result<(&'a str, Value)> {
    match parser::bareword(input) {
        Ok((rest, token)) => Ok((rest, classify(full, input, token)?)),
        Err(_) => Err(Error::Expected {
            expected: "value",
            offset: offset(full, input),
        }),
    }
}

/// Decide what a bare token is: `true`/`false`, a suffixed or unsuffixed
/// number, or an unquoted string. Unsuffixed integers default to Int; an
/// unsuffixed all-digit token outside i32 range is an error rather than a
/// silent string.
fn classify(full: &str, at: &str, token: &str) -> Result<Value> {
    let off = offset(full, at);
    if token == "true" {
        return Ok(Value::Byte(1));
    }
    if token == "false" {
        return Ok(Value::Byte(0));
    }

    let (body, suffix) = split_suffix(token);
    let out_of_range = || Error::NumberOutOfRange { offset: off };
    match suffix {
        Some('b') => body.parse::<i8>().map(Value::Byte).map_err(|_| out_of_range()),
        Some('s') => body.parse::<i16>().map(Value::Short).map_err(|_| out_of_range()),
        Some('l') => body.parse::<i64>().map(Value::Long).map_err(|_| out_of_range()),
        Some('f') => body.parse::<f32>().map(Value::Float).map_err(|_| out_of_range()),
        Some('d') => body.parse::<f64>().map(Value::Double).map_err(|_| out_of_range()),
        _ => {
            if parser::is_integer(token) {
                token.parse::<i32>().map(Value::Int).map_err(|_| out_of_range())
            } else if parser::is_float(token) {
                token.parse::<f64>().map(Value::Double).map_err(|_| out_of_range())
            } else {
                Ok(Value::String(token.to_string()))
            }
        }
    }
}

/// Split a numeric suffix off a token. The suffix only counts when what
/// precedes it is numeric; `glib` is a string, not a mis-suffixed number.
fn split_suffix(token: &str) -> (&str, Option<char>) {
    if let Some(last) = token.chars().last() {
        let lower = last.to_ascii_lowercase();
        if matches!(lower, 'b' | 's' | 'l' | 'f' | 'd') {
            let body = &token[..token.len() - last.len_utf8()];
            let numeric_body = match lower {
                'f' | 'd' => !body.is_empty() && parser::is_numeric(body),
                _ => parser::is_integer(body),
            };
            if numeric_body {
                return (body, Some(lower));
            }
        }
    }
    (token, None)
}

#[derive(Clone, Copy)]
enum ArrayKind {
    Byte,
    Int,
    Long,
}

impl ArrayKind {
    fn name(self) -> &'static str {
        match self {
            ArrayKind::Byte => "Byte",
            ArrayKind::Int => "Int",
            ArrayKind::Long => "Long",
        }
    }
}

fn array_or_list<'a>(full: &'a str, input: &'a str) -> Result<(&'a str, Value)> {
    if let Some(rest) = input.strip_prefix("[B;") {
        typed_array(full, rest, ArrayKind::Byte)
    } else if let Some(rest) = input.strip_prefix("[I;") {
        typed_array(full, rest, ArrayKind::Int)
    } else if let Some(rest) = input.strip_prefix("[L;") {
        typed_array(full, rest, ArrayKind::Long)
    } else {
        list(full, &input[1..])
    }
}

fn typed_array<'a>(
    full: &'a str,
    input: &'a str,
    kind: ArrayKind,
) -> Result<(&'a str, Value)> {
    let mut bytes = Vec::new();
    let mut ints = Vec::new();
    let mut longs = Vec::new();

    let mut input = input.trim_start();
    if let Some(rest) = input.strip_prefix(']') {
        return Ok((rest, finish_array(kind, bytes, ints, longs)));
    }
    loop {
        let at = input;
        let (rest, element) = value(full, input)?;
        let mismatch = |found: Tag| Error::TypeMismatch {
            offset: offset(full, at),
            expected: kind.name(),
            found: found.name(),
        };
        match (kind, &element) {
            (ArrayKind::Byte, Value::Byte(b)) => bytes.push(*b),
            (ArrayKind::Byte, Value::Int(n)) => {
                bytes.push(i8::try_from(*n).map_err(|_| Error::NumberOutOfRange {
                    offset: offset(full, at),
                })?);
            }
            (ArrayKind::Int, Value::Int(n)) => ints.push(*n),
            (ArrayKind::Long, Value::Long(n)) => longs.push(*n),
            (ArrayKind::Long, Value::Int(n)) => longs.push(*n as i64),
            (_, other) => return Err(mismatch(other.tag())),
        }
        input = rest.trim_start();
        if let Some(rest) = input.strip_prefix(',') {
            input = rest.trim_start();
            continue;
        }
        if let Some(rest) = input.strip_prefix(']') {
            return Ok((rest, finish_array(kind, bytes, ints, longs)));
        }
        return Err(Error::Expected {
            expected: "',' or ']'",
            offset: offset(full, input),
        });
    }
}

fn finish_array(kind: ArrayKind, bytes: Vec<i8>, ints: Vec<i32>, longs: Vec<i64>) -> Value {
    match kind {
        ArrayKind::Byte => Value::ByteArray(bytes),
        ArrayKind::Int => Value::IntArray(ints),
        ArrayKind::Long => Value::LongArray(longs),
    }
}

fn list<'a>(full: &'a str, input: &'a str) -> Result<(&'a str, Value)> {
    let mut items = List::unknown();
    let mut input = input.trim_start();
    if let Some(rest) = input.strip_prefix(']') {
        return Ok((rest, Value::List(items)));
    }
    loop {
        let at = input;
        let (rest, element) = value(full, input)?;
        let found = element.tag();
        let expected = items.element();
        if items.push(element).is_err() {
            return Err(Error::TypeMismatch {
                offset: offset(full, at),
                expected: expected.name(),
                found: found.name(),
            });
        }
        input = rest.trim_start();
        if let Some(rest) = input.strip_prefix(',') {
            input = rest.trim_start();
            continue;
        }
        if let Some(rest) = input.strip_prefix(']') {
            return Ok((rest, Value::List(items)));
        }
        return Err(Error::Expected {
            expected: "',' or ']'",
            offset: offset(full, input),
        });
    }
}

fn compound<'a>(full: &'a str, input: &'a str) -> Result<(&'a str, Value)> {
    let mut members = Compound::new();
    let mut input = input[1..].trim_start();
    if let Some(rest) = input.strip_prefix('}') {
        return Ok((rest, Value::Compound(members)));
    }
    loop {
        let (rest, key) = match input.bytes().next() {
            None => return Err(Error::Eof),
            Some(b'"') | Some(b'\'') => quoted(full, input)?,
            Some(_) => match parser::bareword(input) {
                Ok((rest, token)) => (rest, token.to_string()),
                Err(_) => {
                    return Err(Error::Expected {
                        expected: "key",
                        offset: offset(full, input),
                    })
                }
            },
        };
        input = rest.trim_start();
        input = match input.strip_prefix(':') {
            Some(rest) => rest,
            None => {
                return Err(Error::Expected {
                    expected: "':'",
                    offset: offset(full, input),
                })
            }
        };
        let (rest, element) = value(full, input)?;
        members.insert(key, element);
        input = rest.trim_start();
        if let Some(rest) = input.strip_prefix(',') {
            input = rest.trim_start();
            continue;
        }
        if let Some(rest) = input.strip_prefix('}') {
            return Ok((rest, Value::Compound(members)));
        }
        return Err(Error::Expected {
            expected: "',' or '}'",
            offset: offset(full, input),
        });
    }
}
