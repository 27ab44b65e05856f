//! Token-level recognizers shared by the value parser.

use nom::branch::alt;
use nom::bytes::complete::{is_a, tag_no_case};
use nom::character::complete::{alphanumeric1, char, digit0, digit1, one_of};
use nom::combinator::{opt, recognize};
use nom::multi::many1;
use nom::sequence::{pair, tuple};
use nom::IResult;

/// The characters legal in an unquoted SNBT token (keys, bare strings,
/// numbers before classification).
pub(crate) fn bareword(input: &str) -> IResult<&str, &str> {
    recognize(many1(alt((alphanumeric1, is_a("_-.+")))))(input)
}

/// An optionally signed decimal integer. Leading zeros are accepted; the
/// game writes none but tolerates them.
pub(crate) fn integer(input: &str) -> IResult<&str, &str> {
    recognize(pair(opt(one_of("+-")), digit1))(input)
}

/// An optionally signed decimal float: digits with a dot, a dot with
/// digits, or plain digits when followed by an exponent; `inf`,
/// `infinity` and `nan` in any case are accepted too.
pub(crate) fn float(input: &str) -> IResult<&str, &str> {
    alt((
        recognize(pair(
            opt(one_of("+-")),
            alt((tag_no_case("infinity"), tag_no_case("inf"), tag_no_case("nan"))),
        )),
        recognize(tuple((
            opt(one_of("+-")),
            alt((
                recognize(tuple((digit1, char('.'), digit0))),
                recognize(pair(char('.'), digit1)),
                recognize(digit1),
            )),
            opt(tuple((one_of("eE"), opt(one_of("+-")), digit1))),
        ))),
    ))(input)
}

/// True when `token` is entirely an integer literal.
pub(crate) fn is_integer(token: &str) -> bool {
    matches!(integer(token), Ok(("", _)))
}

/// True when `token` is entirely a float literal that could not also be an
/// integer (it has a dot, an exponent, or is a named non-finite value).
pub(crate) fn is_float(token: &str) -> bool {
    if is_integer(token) {
        return false;
    }
    matches!(float(token), Ok(("", _)))
}

/// True when `token` is entirely a float or integer literal.
pub(crate) fn is_numeric(token: &str) -> bool {
    is_integer(token) || matches!(float(token), Ok(("", _)))
}
