//! Expression parser implementation using chumsky

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;

use crate::error::{ParseError, Span};
use crate::expr::ast::{BinaryOp, Expr, UnaryOp};
use crate::expr::lexer::{lex, Token};
use crate::value::Value;

type Extra<'a> = extra::Err<Rich<'a, Token>>;

/// Deepest bracket and prefix-operator nesting accepted by [`parse`]
pub const MAX_NESTING: usize = 32;

/// Trailing accessor after an atom: `.key`, `.0` or `[expr]`
#[derive(Debug, Clone)]
enum Accessor {
    Member(String),
    Index(Expr),
}

/// Parse an expression into an [`Expr`] tree
pub fn parse(input: &str) -> Result<Expr, Vec<ParseError>> {
    let len = input.len();

    let tokens = lex(input).map_err(|span| {
        vec![ParseError::syntax(
            span,
            "unrecognised character in expression",
        )]
    })?;

    if let Some(span) = too_deep(&tokens) {
        return Err(vec![ParseError::syntax(span, "expression nested too deeply")]);
    }

    let token_stream = Stream::from_iter(tokens.into_iter().map(|(tok, span)| (tok, span.into())))
        .map((len..len).into(), |(t, s): (_, _)| (t, s));

    expression_parser()
        .then_ignore(end())
        .parse(token_stream)
        .into_result()
        .map_err(|errs| errs.into_iter().map(|e| e.into()).collect())
}

/// Span of the first token past [`MAX_NESTING`] levels of brackets and
/// prefix operators, if any
fn too_deep(tokens: &[(Token, Span)]) -> Option<Span> {
    let mut brackets = 0usize;
    let mut prefix_run = 0usize;
    for (token, span) in tokens {
        match token {
            Token::ParenOpen | Token::BracketOpen => {
                brackets += 1;
                prefix_run = 0;
            }
            Token::ParenClose | Token::BracketClose => {
                brackets = brackets.saturating_sub(1);
                prefix_run = 0;
            }
            Token::Bang | Token::Minus => prefix_run += 1,
            _ => prefix_run = 0,
        }
        if brackets + prefix_run > MAX_NESTING {
            return Some(span.clone());
        }
    }
    None
}

/// One left-associative precedence level: `operand (op operand)*`
fn binary_level<'a, I, P, O>(
    operand: P,
    op: O,
) -> impl Parser<'a, I, Expr, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
    P: Parser<'a, I, Expr, Extra<'a>> + Clone,
    O: Parser<'a, I, BinaryOp, Extra<'a>> + Clone,
{
    operand
        .clone()
        .then(op.then(operand).repeated().collect::<Vec<_>>())
        .map(|(first, rest)| {
            rest.into_iter()
                .fold(first, |left, (op, right)| Expr::binary(op, left, right))
        })
}

fn expression_parser<'a, I>() -> impl Parser<'a, I, Expr, Extra<'a>> + Clone
where
    I: ValueInput<'a, Token = Token, Span = SimpleSpan>,
{
    recursive(|expr| {
        let literal = select! {
            Token::Number(n) => Expr::Literal(Value::Number(n)),
            Token::String(s) => Expr::Literal(Value::String(s)),
            Token::True => Expr::Literal(Value::Bool(true)),
            Token::False => Expr::Literal(Value::Bool(false)),
            Token::Null => Expr::Literal(Value::Null),
        };

        let identifier = select! {
            Token::Ident(name) => name,
        };

        let array = expr
            .clone()
            .separated_by(just(Token::Comma))
            .allow_trailing()
            .collect::<Vec<_>>()
            .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
            .map(Expr::Array);

        let atom = choice((
            literal,
            identifier.clone().map(Expr::Var),
            array,
            expr.clone()
                .delimited_by(just(Token::ParenOpen), just(Token::ParenClose)),
        ));

        // `user.name`, `items.0`, `items[i]`
        let accessor = choice((
            just(Token::Dot)
                .ignore_then(identifier)
                .map(Accessor::Member),
            just(Token::Dot)
                .ignore_then(select! { Token::Number(n) => n })
                .map(|n| Accessor::Index(Expr::Literal(Value::Number(n)))),
            expr.clone()
                .delimited_by(just(Token::BracketOpen), just(Token::BracketClose))
                .map(Accessor::Index),
        ));

        let access = atom
            .then(accessor.repeated().collect::<Vec<_>>())
            .map(|(base, accessors)| {
                accessors.into_iter().fold(base, |object, accessor| match accessor {
                    Accessor::Member(key) => Expr::Member(Box::new(object), key),
                    Accessor::Index(index) => Expr::Index(Box::new(object), Box::new(index)),
                })
            });

        let unary = recursive(|unary| {
            choice((
                just(Token::Bang)
                    .ignore_then(unary.clone())
                    .map(|e| Expr::Unary(UnaryOp::Not, Box::new(e))),
                just(Token::Minus)
                    .ignore_then(unary)
                    .map(|e| Expr::Unary(UnaryOp::Neg, Box::new(e))),
                access,
            ))
        });

        let product = binary_level(
            unary,
            choice((
                just(Token::Star).to(BinaryOp::Mul),
                just(Token::Slash).to(BinaryOp::Div),
                just(Token::Percent).to(BinaryOp::Rem),
            )),
        );

        let sum = binary_level(
            product,
            choice((
                just(Token::Plus).to(BinaryOp::Add),
                just(Token::Minus).to(BinaryOp::Sub),
            )),
        );

        let comparison = binary_level(
            sum,
            choice((
                just(Token::LessOrEqual).to(BinaryOp::LessOrEqual),
                just(Token::GreaterOrEqual).to(BinaryOp::GreaterOrEqual),
                just(Token::Less).to(BinaryOp::Less),
                just(Token::Greater).to(BinaryOp::Greater),
            )),
        );

        // Strict and loose spellings share one strict semantics
        let equality = binary_level(
            comparison,
            choice((
                just(Token::StrictEq).to(BinaryOp::Eq),
                just(Token::Eq).to(BinaryOp::Eq),
                just(Token::StrictNotEq).to(BinaryOp::NotEq),
                just(Token::NotEq).to(BinaryOp::NotEq),
            )),
        );

        let conjunction = binary_level(equality, just(Token::And).to(BinaryOp::And));

        binary_level(conjunction, just(Token::Or).to(BinaryOp::Or)).boxed()
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn var(name: &str) -> Expr {
        Expr::Var(name.to_string())
    }

    fn string(s: &str) -> Expr {
        Expr::Literal(Value::from(s))
    }

    #[test]
    fn test_parse_dotted_path() {
        let expr = parse("user.address.city").expect("Should parse");
        assert_eq!(expr.path().as_deref(), Some("user.address.city"));
    }

    #[test]
    fn test_parse_fallback() {
        let expr = parse("content || 'fallback'").expect("Should parse");
        assert_eq!(
            expr,
            Expr::binary(BinaryOp::Or, var("content"), string("fallback"))
        );
    }

    #[test]
    fn test_precedence() {
        // a || b && c == 1 + 2 * 3
        let expr = parse("a || b && c == 1 + 2 * 3").expect("Should parse");
        match expr {
            Expr::Binary(BinaryOp::Or, left, right) => {
                assert_eq!(*left, var("a"));
                match *right {
                    Expr::Binary(BinaryOp::And, _, eq) => {
                        assert!(matches!(*eq, Expr::Binary(BinaryOp::Eq, _, _)));
                    }
                    other => panic!("Expected And, got {:?}", other),
                }
            }
            other => panic!("Expected Or, got {:?}", other),
        }
    }

    #[test]
    fn test_index_and_modulo() {
        let expr = parse("items[i % 2]").expect("Should parse");
        match expr {
            Expr::Index(object, index) => {
                assert_eq!(*object, var("items"));
                assert!(matches!(*index, Expr::Binary(BinaryOp::Rem, _, _)));
            }
            other => panic!("Expected Index, got {:?}", other),
        }
    }

    #[test]
    fn test_numeric_member() {
        let expr = parse("rows.0.name").expect("Should parse");
        assert!(matches!(expr, Expr::Member(_, ref key) if key == "name"));
    }

    #[test]
    fn test_unary_and_parens() {
        let expr = parse("!(a && -b)").expect("Should parse");
        assert!(matches!(expr, Expr::Unary(UnaryOp::Not, _)));
    }

    #[test]
    fn test_array_literal() {
        let expr = parse("['a', 2,]").expect("Should parse");
        assert_eq!(
            expr,
            Expr::Array(vec![string("a"), Expr::Literal(Value::Number(2.0))])
        );
    }

    #[test]
    fn test_rejects_calls_and_assignment() {
        assert!(parse("run()").is_err());
        assert!(parse("a = 1").is_err());
        assert!(parse("user.name.toUpperCase()").is_err());
    }

    #[test]
    fn test_trailing_garbage_is_error() {
        assert!(parse("a b").is_err());
        assert!(parse("").is_err());
    }

    #[test]
    fn test_nesting_is_capped() {
        let ok = format!("{}a{}", "(".repeat(MAX_NESTING), ")".repeat(MAX_NESTING));
        assert_eq!(parse(&ok).expect("Should parse"), var("a"));

        let deep = format!("{}a{}", "(".repeat(500), ")".repeat(500));
        let errors = parse(&deep).expect_err("Should reject deep nesting");
        assert_eq!(errors[0].message(), "expression nested too deeply");

        assert!(parse(&format!("{}x", "!".repeat(500))).is_err());
        assert!(parse(&format!("{}0{}", "[".repeat(500), "]".repeat(500))).is_err());
        assert!(parse("a - b - c - -d").is_ok());
    }
}
