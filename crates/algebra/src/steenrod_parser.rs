//! Parsers for the textual forms of Steenrod algebra basis elements, module elements and action
//! relations such as `P1 x0 = x4`.

use nom::{
    branch::alt,
    bytes::complete::{tag, take_while},
    character::complete::{char, digit1 as digit, satisfy, space0, space1},
    combinator::{all_consuming, map, map_res, opt, recognize},
    error::{context, convert_error, ParseError, VerboseError},
    multi::{separated_list0, separated_list1},
    sequence::{delimited, pair, preceded, terminated, tuple},
    IResult as IResultBase, Parser,
};
use std::str::FromStr;

use crate::algebra::milnor_algebra::PPart;

type IResult<I, O> = IResultBase<I, O, VerboseError<I>>;

/// A single factor of a Milnor basis element, as written by the user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AlgebraBasisElt {
    /// `Q_k`, `Qk` or `b` (which is `Q_0`).
    Q(u32),
    /// `Sq<n>` or `P<n>`.
    P(u32),
    /// `Sq(r1, r2, ...)` or `P(r1, r2, ...)`.
    PList(PPart),
    /// The unit, written `1`.
    Unit,
}

/// The parsed form of a basis element: a string of factors, together with whether `Sq` rather than
/// `P` was used anywhere.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedBasisElement {
    pub factors: Vec<AlgebraBasisElt>,
    pub uses_sq: bool,
}

/// One side of a relation: a sum of coefficients times module generator names.
pub type ModuleSum = Vec<(u32, String)>;

/// The text of a relation `op gen = sum`, split into its three parts. The operation is still a
/// string, since only the algebra knows how to interpret it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRelation {
    pub operation: String,
    pub input: String,
    pub output: ModuleSum,
}

/// Pad both ends with whitespace
pub(crate) fn space<'a, O, E: ParseError<&'a str>, F: Parser<&'a str, O, E>>(
    f: F,
) -> impl FnMut(&'a str) -> IResultBase<&'a str, O, E> {
    delimited(space0, f, space0)
}

/// Surround with brackets
pub(crate) fn brackets<'a, O, E: ParseError<&'a str>, F: Parser<&'a str, O, E>>(
    f: F,
) -> impl FnMut(&'a str) -> IResultBase<&'a str, O, E> {
    delimited(char('('), f, char(')'))
}

pub(crate) fn digits<T: FromStr + Copy>(i: &str) -> IResult<&str, T> {
    map_res(digit, FromStr::from_str)(i)
}

fn p_or_sq(i: &str) -> IResult<&str, bool> {
    alt((map(tag("Sq"), |_| true), map(tag("P"), |_| false)))(i)
}

fn algebra_factor(i: &str) -> IResult<&str, (AlgebraBasisElt, bool)> {
    context(
        "algebra factor",
        alt((
            map(char('b'), |_| (AlgebraBasisElt::Q(0), false)),
            map(preceded(pair(char('Q'), opt(char('_'))), digits), |k| {
                (AlgebraBasisElt::Q(k), false)
            }),
            map(
                pair(
                    p_or_sq,
                    brackets(separated_list0(char(','), space(digits))),
                ),
                |(sq, r)| (AlgebraBasisElt::PList(r), sq),
            ),
            map(pair(p_or_sq, digits), |(sq, n)| (AlgebraBasisElt::P(n), sq)),
            map(char('1'), |_| (AlgebraBasisElt::Unit, false)),
        )),
    )(i)
}

fn basis_element(i: &str) -> IResult<&str, ParsedBasisElement> {
    map(separated_list1(space1, algebra_factor), |factors| {
        let uses_sq = factors.iter().any(|&(_, sq)| sq);
        ParsedBasisElement {
            factors: factors.into_iter().map(|(f, _)| f).collect(),
            uses_sq,
        }
    })(i)
}

/// Whether `name` may be used as a module generator name.
pub fn is_generator_name(name: &str) -> bool {
    all_consuming(generator_name)(name).is_ok()
}

fn generator_name(i: &str) -> IResult<&str, &str> {
    context(
        "generator name",
        recognize(pair(
            satisfy(|c| c.is_ascii_alphabetic() || c == '_'),
            take_while(|c: char| c.is_ascii_alphanumeric() || c == '_' || c == '.'),
        )),
    )(i)
}

fn module_term(i: &str) -> IResult<&str, (u32, String)> {
    map(
        tuple((
            opt(terminated(digits, space(opt(char('*'))))),
            generator_name,
        )),
        |(c, name)| (c.unwrap_or(1), name.to_owned()),
    )(i)
}

fn module_sum(i: &str) -> IResult<&str, ModuleSum> {
    alt((
        map(all_consuming(space(char('0'))), |_| Vec::new()),
        separated_list1(space(char('+')), module_term),
    ))(i)
}

fn finish<'a, O>(input: &'a str, result: IResult<&'a str, O>) -> error::Result<O> {
    match result {
        Ok(("", o)) => Ok(o),
        Ok((rest, _)) => Err(error::Error::parse(
            input,
            format!("unexpected trailing input {rest:?}"),
        )),
        Err(nom::Err::Error(e) | nom::Err::Failure(e)) => {
            Err(error::Error::parse(input, convert_error(input, e)))
        }
        Err(nom::Err::Incomplete(_)) => Err(error::Error::parse(input, "incomplete input")),
    }
}

/// Parse a Milnor basis element such as `Sq(1,1)`, `P3`, `b` or `Q_1 P(2)`.
pub fn parse_basis_element(input: &str) -> error::Result<ParsedBasisElement> {
    let trimmed = input.trim();
    finish(trimmed, basis_element(trimmed))
}

/// Parse a sum of module generators such as `x0 + 2 x1`. The string `0` is the empty sum.
pub fn parse_module_sum(input: &str) -> error::Result<ModuleSum> {
    let trimmed = input.trim();
    finish(trimmed, module_sum(trimmed))
}

/// Parse an action relation `op gen = sum`. The operation may itself contain spaces; the input
/// generator is the last whitespace-separated word before the `=`.
pub fn parse_relation(input: &str) -> error::Result<ParsedRelation> {
    let invalid = |reason: &str| error::Error::InvalidRelation(format!("{input}: {reason}"));

    let (lhs, rhs) = input
        .split_once('=')
        .ok_or_else(|| invalid("missing '='"))?;
    let (operation, gen) = lhs
        .trim()
        .rsplit_once(char::is_whitespace)
        .ok_or_else(|| invalid("expected an operation followed by a generator"))?;
    let operation = operation.trim();
    let gen = gen.trim();
    if operation.is_empty() || gen.is_empty() {
        return Err(invalid("expected an operation followed by a generator"));
    }
    if !is_generator_name(gen) {
        return Err(invalid("bad generator name"));
    }

    let output = parse_module_sum(rhs).map_err(|e| invalid(&e.to_string()))?;
    Ok(ParsedRelation {
        operation: operation.to_owned(),
        input: gen.to_owned(),
        output,
    })
}
