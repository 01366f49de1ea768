//! Parser from program text to a [`SyntaxNode`] tree.
//!
//! ```text
//! constant  := /[a-z0-9_]+/
//! variable  := /[A-Z][a-z0-9_]*/
//! ident     := constant | variable
//! params    := ident (',' ident)*
//! predicate := ident '(' params ')'
//! union     := predicate (',' predicate)*
//! fact      := union '.'
//! query     := '?-' union '.'
//! program   := (fact | query)+
//! ```
//!
//! Whitespace may appear between any two tokens and `%` comments run to the
//! end of the line. Punctuation is kept in the tree as `char` leaves.

use crate::error::{Error, Result};
use crate::syntax::{Location, SyntaxNode};
use nom::{
    branch::alt,
    bytes::complete::{tag, take_while, take_while1},
    character::complete::{char as nomchar, multispace1, not_line_ending, satisfy},
    combinator::{all_consuming, cut, map, recognize, value},
    error::{context, VerboseError, VerboseErrorKind},
    multi::{many0, many1},
    sequence::{pair, terminated, tuple},
    Finish,
};

type In<'a> = &'a str;
type IResult<'a, O> = nom::IResult<In<'a>, O, VerboseError<In<'a>>>;

/// Parse a whole program.
///
/// # Errors
///
/// [`Error::Parse`] with the location where parsing stopped.
pub fn parse_program(source: &str) -> Result<SyntaxNode> {
    let program = node("program", many1(statement));
    parse_all(source, program)
}

/// Parse a single `?- ... .` query.
///
/// # Errors
///
/// [`Error::Parse`] with the location where parsing stopped.
pub fn parse_query(source: &str) -> Result<SyntaxNode> {
    parse_all(source, query)
}

fn parse_all<'a>(
    source: &'a str,
    parser: impl FnMut(In<'a>) -> IResult<'a, SyntaxNode>,
) -> Result<SyntaxNode> {
    match all_consuming(terminated(parser, blank))(source).finish() {
        Ok((_, mut tree)) => {
            anchor(&mut tree, source);
            Ok(tree)
        }
        Err(err) => Err(parse_error(source, &err)),
    }
}

/// While parsing, a node's offset holds the length of the input left at its
/// start; turn that into a real location.
fn anchor(node: &mut SyntaxNode, source: &str) {
    node.location = Location::locate(source, source.len() - node.location.offset);
    for child in &mut node.children {
        anchor(child, source);
    }
}

fn parse_error(source: &str, err: &VerboseError<In<'_>>) -> Error {
    let Some(&(rest, _)) = err.errors.first() else {
        return Error::Parse {
            location: Location::locate(source, 0),
            message: "invalid program".to_string(),
        };
    };
    let expected = err
        .errors
        .iter()
        .find_map(|(_, kind)| match kind {
            VerboseErrorKind::Char(c) => Some(format!("'{c}'")),
            VerboseErrorKind::Context(what) => Some((*what).to_string()),
            VerboseErrorKind::Nom(_) => None,
        });
    let found = rest
        .chars()
        .next()
        .map_or_else(|| "end of input".to_string(), |c| format!("'{c}'"));
    let message = match expected {
        Some(expected) => format!("expected {expected}, found {found}"),
        None => format!("unexpected {found}"),
    };
    Error::Parse {
        location: Location::locate(source, source.len() - rest.len()),
        message,
    }
}

/// Whitespace and comments.
fn blank(s: In) -> IResult<()> {
    let comment = pair(nomchar('%'), not_line_ending);
    value((), many0(alt((value((), multispace1), value((), comment)))))(s)
}

/// A leaf tagged `tag_name` holding the text recognised by `inner`.
fn leaf<'a>(
    tag_name: &'static str,
    mut inner: impl FnMut(In<'a>) -> IResult<'a, In<'a>>,
) -> impl FnMut(In<'a>) -> IResult<'a, SyntaxNode> {
    move |s: In<'a>| {
        let (s, ()) = blank(s)?;
        let (rest, text) = inner(s)?;
        Ok((rest, SyntaxNode::leaf(tag_name, text).at(pending(s))))
    }
}

/// An inner node tagged `tag_name` over the children produced by `inner`.
fn node<'a>(
    tag_name: &'static str,
    mut inner: impl FnMut(In<'a>) -> IResult<'a, Vec<SyntaxNode>>,
) -> impl FnMut(In<'a>) -> IResult<'a, SyntaxNode> {
    move |s: In<'a>| {
        let (s, ()) = blank(s)?;
        let (rest, children) = inner(s)?;
        Ok((rest, SyntaxNode::branch(tag_name, children).at(pending(s))))
    }
}

fn pending(s: In) -> Location {
    Location::new(s.len(), 0, 0)
}

fn punct<'a>(c: char) -> impl FnMut(In<'a>) -> IResult<'a, SyntaxNode> {
    leaf("char", recognize(nomchar(c)))
}

/// `item (',' item)*`, keeping the commas. Anything after a comma must be
/// another item.
fn separated<'a>(
    mut item: impl FnMut(In<'a>) -> IResult<'a, SyntaxNode>,
) -> impl FnMut(In<'a>) -> IResult<'a, Vec<SyntaxNode>> {
    move |s: In<'a>| {
        let (mut s, first) = item(s)?;
        let mut nodes = vec![first];
        loop {
            match punct(',')(s) {
                Ok((rest, comma)) => {
                    let (rest, next) = item(rest).map_err(|err| match err {
                        nom::Err::Error(e) => nom::Err::Failure(e),
                        other => other,
                    })?;
                    nodes.push(comma);
                    nodes.push(next);
                    s = rest;
                }
                Err(nom::Err::Error(_)) => return Ok((s, nodes)),
                Err(err) => return Err(err),
            }
        }
    }
}

fn is_name_char(c: char) -> bool {
    c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_'
}

fn constant(s: In) -> IResult<SyntaxNode> {
    leaf("ident|constant", take_while1(is_name_char))(s)
}

fn variable(s: In) -> IResult<SyntaxNode> {
    let name = recognize(pair(satisfy(|c| c.is_ascii_uppercase()), take_while(is_name_char)));
    leaf("ident|variable", name)(s)
}

fn ident(s: In) -> IResult<SyntaxNode> {
    context("identifier", alt((variable, constant)))(s)
}

fn params(s: In) -> IResult<SyntaxNode> {
    node("params", separated(ident))(s)
}

fn predicate(s: In) -> IResult<SyntaxNode> {
    let call = pair(ident, cut(tuple((punct('('), params, punct(')')))));
    node(
        "predicate",
        map(call, |(head, (open, params, close))| vec![head, open, params, close]),
    )(s)
}

fn union(s: In) -> IResult<SyntaxNode> {
    node("union", separated(predicate))(s)
}

fn fact(s: In) -> IResult<SyntaxNode> {
    let body = pair(union, cut(context("'.' to end the fact", punct('.'))));
    node("fact", map(body, |(union, stop)| vec![union, stop]))(s)
}

fn query(s: In) -> IResult<SyntaxNode> {
    let body = cut(pair(union, context("'.' to end the query", punct('.'))));
    let open = leaf("char", tag("?-"));
    node(
        "query",
        map(pair(open, body), |(open, (union, stop))| vec![open, union, stop]),
    )(s)
}

fn statement(s: In) -> IResult<SyntaxNode> {
    context("fact or query", alt((query, fact)))(s)
}
