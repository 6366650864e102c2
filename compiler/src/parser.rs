// Parser for the lowered-statement language.
//
// Parses a token stream (from the lexer) into abstract kernel statements.
// Uses chumsky combinators.
//
// Grammar:
//   stmt  := COMMENT
//          | 'let' IDENT ':' type '=' expr ';'
//          | 'for' IDENT 'in' expr '..' expr '{' stmt* '}'
//          | place ('=' | '+=') expr ';'
//   expr  := term (('+' | '-') term)*
//   term  := unary (('*' | '/') unary)*
//   unary := '-'* postfix
//   postfix := atom ('[' expr ']')*
//   atom  := INT | FLOAT | IDENT | IDENT '(' args ')' | '(' expr ')'
//
// Preconditions: input is a valid token stream from `lexer::lex()`.
// Postconditions: returns statements plus any parse errors (non-fatal).
// Failure modes: syntax errors produce `Rich` diagnostics.
// Side effects: none.

use chumsky::input::{Stream, ValueInput};
use chumsky::prelude::*;
use chumsky::span::SimpleSpan;

use crate::kernel::{AssignOp, BinOp, Expr, MathFn, Stmt, ValueType};
use crate::lexer::Token;

/// Result of parsing: statements plus any errors.
#[derive(Debug)]
pub struct ParseResult {
    pub statements: Option<Vec<Stmt>>,
    pub errors: Vec<Rich<'static, Token, SimpleSpan>>,
}

/// Parse lowered-statement source. Lexes then parses.
pub fn parse(source: &str) -> ParseResult {
    let lex_result = crate::lexer::lex(source);
    let len = source.len();

    let token_iter = lex_result.tokens.into_iter().map(|(tok, span)| {
        let cspan: SimpleSpan = (span.start..span.end).into();
        (tok, cspan)
    });
    let eoi: SimpleSpan = (len..len).into();
    let stream = Stream::from_iter(token_iter).map(eoi, |(t, s): (_, _)| (t, s));

    let (statements, parse_errors) = statements_parser().parse(stream).into_output_errors();

    let mut all_errors: Vec<Rich<'static, Token, SimpleSpan>> = lex_result
        .errors
        .into_iter()
        .map(|e| {
            let span: SimpleSpan = (e.span.start..e.span.end).into();
            Rich::custom(span, e.message)
        })
        .collect();
    all_errors.extend(parse_errors.into_iter().map(|e| e.into_owned()));

    ParseResult {
        statements,
        errors: all_errors,
    }
}

/// Parse `source`, folding every error into one message.
pub fn parse_statements(source: &str) -> Result<Vec<Stmt>, String> {
    let result = parse(source);
    if !result.errors.is_empty() {
        let messages: Vec<String> = result
            .errors
            .iter()
            .map(|e| format!("{}..{}: {}", e.span().start, e.span().end, e))
            .collect();
        return Err(messages.join("; "));
    }
    result
        .statements
        .ok_or_else(|| "parse failed with no output".to_string())
}

// ── Parser builder ──

fn statements_parser<'tokens, I>(
) -> impl Parser<'tokens, I, Vec<Stmt>, extra::Err<Rich<'tokens, Token, SimpleSpan>>>
where
    I: ValueInput<'tokens, Token = Token, Span = SimpleSpan>,
{
    let ident = select! { Token::Ident(name) => name };

    // ── Expressions ──

    let expr = recursive(|expr| {
        let literal = select! {
            Token::Int(n) => Expr::Int(n),
            Token::Float(v) => Expr::Float(v),
        };

        let args = expr
            .clone()
            .separated_by(just(Token::Comma))
            .collect::<Vec<_>>()
            .delimited_by(just(Token::LParen), just(Token::RParen));

        let named = ident
            .clone()
            .then(args.or_not())
            .try_map(|(name, args), span| match args {
                None => Ok(Expr::Symbol(name)),
                Some(args) => {
                    let func = MathFn::from_name(&name).ok_or_else(|| {
                        Rich::custom(span, format!("unknown function '{}'", name))
                    })?;
                    if args.len() != func.arity() {
                        return Err(Rich::custom(
                            span,
                            format!(
                                "'{}' takes {} argument(s), found {}",
                                name,
                                func.arity(),
                                args.len()
                            ),
                        ));
                    }
                    Ok(Expr::Call { func, args })
                }
            });

        let atom = literal.or(named).or(expr
            .clone()
            .delimited_by(just(Token::LParen), just(Token::RParen)));

        let postfix = atom.foldl(
            expr.clone()
                .delimited_by(just(Token::LBracket), just(Token::RBracket))
                .repeated(),
            Expr::index,
        );

        let unary = just(Token::Minus)
            .repeated()
            .foldr(postfix, |_, operand| Expr::Neg(Box::new(operand)));

        let term = unary.clone().foldl(
            choice((
                just(Token::Star).to(BinOp::Mul),
                just(Token::Slash).to(BinOp::Div),
            ))
            .then(unary)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        );

        term.clone().foldl(
            choice((
                just(Token::Plus).to(BinOp::Add),
                just(Token::Minus).to(BinOp::Sub),
            ))
            .then(term)
            .repeated(),
            |lhs, (op, rhs)| Expr::binary(op, lhs, rhs),
        )
    });

    // ── Statements ──

    let value_type = ident.clone().try_map(|name, span| match name.as_str() {
        "scalar" => Ok(ValueType::Scalar),
        "real" => Ok(ValueType::Real),
        "int" => Ok(ValueType::Int),
        _ => Err(Rich::custom(
            span,
            format!("expected value type (scalar, real, int), found '{}'", name),
        )),
    });

    let stmt = recursive(|stmt| {
        let comment = select! { Token::Comment(text) => Stmt::Comment(text) };

        let decl = just(Token::Let)
            .ignore_then(ident.clone())
            .then_ignore(just(Token::Colon))
            .then(value_type.clone())
            .then_ignore(just(Token::Eq))
            .then(expr.clone())
            .then_ignore(just(Token::Semi))
            .map(|((name, ty), value)| Stmt::VarDecl { ty, name, value });

        let for_loop = just(Token::For)
            .ignore_then(ident.clone())
            .then_ignore(just(Token::In))
            .then(expr.clone())
            .then_ignore(just(Token::DotDot))
            .then(expr.clone())
            .then(
                stmt.repeated()
                    .collect::<Vec<_>>()
                    .delimited_by(just(Token::LBrace), just(Token::RBrace)),
            )
            .map(|(((index, begin), end), body)| Stmt::For {
                index,
                begin,
                end,
                body,
            });

        let assign = expr
            .clone()
            .then(choice((
                just(Token::Eq).to(AssignOp::Set),
                just(Token::PlusEq).to(AssignOp::Add),
            )))
            .then(expr.clone())
            .then_ignore(just(Token::Semi))
            .try_map(|((target, op), value), span| {
                if target.is_place() {
                    Ok(Stmt::Assign { target, op, value })
                } else {
                    Err(Rich::custom(
                        span,
                        "left-hand side of an assignment must be a variable or array element",
                    ))
                }
            });

        choice((comment, decl, for_loop, assign))
    });

    stmt.repeated().collect::<Vec<_>>()
}

// ── Tests ──
