//! Syntax tree for schema-definition sources
//!
//! Schema modules are TypeScript files made of declaration-constructor calls
//! (`pgEnum('status', [...])`, `pgTable('orders', { ... })`) surrounded by
//! imports and type aliases. Only the shapes the walker cares about are
//! modelled: calls (with member-call receivers), string literals, list
//! literals and key/value objects. Everything else is kept as opaque
//! [`Node::Other`] content whose brackets are still traversed, so nested
//! calls are never lost.

use std::fmt;

/// 1-indexed source position
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Span {
    pub line: usize,
    pub column: usize,
}

/// A string literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrLit {
    pub value: String,
    pub span: Span,
}

/// A call expression, e.g. `pgTable('t', {...})` or the `.notNull()` in
/// `decimal('total').notNull()` (whose receiver is the `decimal(...)` call)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Call {
    /// Dotted callee path for free calls, method name for member calls
    pub callee: String,
    pub receiver: Option<Box<Node>>,
    pub args: Vec<Node>,
    pub span: Span,
}

/// One `key: value` entry of an object literal
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    pub key: String,
    pub key_span: Span,
    pub value: Node,
}

/// Node kinds relevant to declaration extraction
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Node {
    Call(Call),
    Str(StrLit),
    List { items: Vec<Node>, span: Span },
    /// `rest` holds spreads, shorthand properties and block statements
    Object { entries: Vec<Entry>, rest: Vec<Node>, span: Span },
    Ident { name: String, span: Span },
    /// Anything else: multi-term expressions, parenthesised groups, bodies
    Other { children: Vec<Node> },
}

impl Node {
    /// Source position where the node starts, if it has one
    pub fn span(&self) -> Option<Span> {
        match self {
            Node::Call(call) => Some(call.span),
            Node::Str(lit) => Some(lit.span),
            Node::List { span, .. } | Node::Object { span, .. } | Node::Ident { span, .. } => {
                Some(*span)
            }
            Node::Other { children } => children.first().and_then(Node::span),
        }
    }

    /// The first string literal in pre-order (receivers before arguments)
    pub fn first_string_literal(&self) -> Option<&StrLit> {
        match self {
            Node::Str(lit) => Some(lit),
            Node::Call(call) => call
                .receiver
                .iter()
                .map(|r| r.as_ref())
                .chain(call.args.iter())
                .find_map(Node::first_string_literal),
            Node::List { items, .. } => items.iter().find_map(Node::first_string_literal),
            Node::Object { entries, rest, .. } => entries
                .iter()
                .map(|e| &e.value)
                .chain(rest.iter())
                .find_map(Node::first_string_literal),
            Node::Other { children } => children.iter().find_map(Node::first_string_literal),
            Node::Ident { .. } => None,
        }
    }
}

/// Parsed schema source unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceTree {
    pub nodes: Vec<Node>,
}

impl SourceTree {
    /// Parse source text
    pub fn parse(source: &str) -> Result<Self, SyntaxError> {
        let tokens = Lexer::new(source).tokenize()?;
        let mut parser = Parser { tokens, pos: 0 };
        let nodes = parser.parse_sequence(&[])?;
        Ok(Self { nodes })
    }
}

/// Lexing or bracket-matching failure
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{message} at {}:{}", .span.line, .span.column)]
pub struct SyntaxError {
    pub message: String,
    pub span: Span,
}

impl SyntaxError {
    fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum TokenKind {
    Ident(String),
    Str(String),
    Punct(char),
    /// Numbers, template literals with interpolation
    Opaque,
}

#[derive(Debug, Clone, PartialEq)]
struct Token {
    kind: TokenKind,
    span: Span,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TokenKind::Ident(name) => write!(f, "identifier '{}'", name),
            TokenKind::Str(value) => write!(f, "string '{}'", value),
            TokenKind::Punct(c) => write!(f, "'{}'", c),
            TokenKind::Opaque => write!(f, "literal"),
        }
    }
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    line: usize,
    column: usize,
}

impl<'a> Lexer<'a> {
    fn new(source: &'a str) -> Self {
        Self {
            chars: source.chars().peekable(),
            line: 1,
            column: 1,
        }
    }

    fn span(&self) -> Span {
        Span {
            line: self.line,
            column: self.column,
        }
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(c)
    }

    fn peek_second(&self) -> Option<char> {
        let mut ahead = self.chars.clone();
        ahead.next();
        ahead.next()
    }

    fn tokenize(mut self) -> Result<Vec<Token>, SyntaxError> {
        let mut tokens = Vec::new();

        while let Some(&c) = self.chars.peek() {
            let span = self.span();

            if c.is_whitespace() {
                self.bump();
            } else if c == '/' && self.peek_second() == Some('/') {
                while let Some(&c) = self.chars.peek() {
                    if c == '\n' {
                        break;
                    }
                    self.bump();
                }
            } else if c == '/' && self.peek_second() == Some('*') {
                self.bump();
                self.bump();
                let mut closed = false;
                while let Some(c) = self.bump() {
                    if c == '*' && self.chars.peek() == Some(&'/') {
                        self.bump();
                        closed = true;
                        break;
                    }
                }
                if !closed {
                    return Err(SyntaxError::new("unterminated block comment", span));
                }
            } else if c == '\'' || c == '"' {
                let value = self.quoted(c, span)?;
                tokens.push(Token { kind: TokenKind::Str(value), span });
            } else if c == '`' {
                let kind = self.template(span)?;
                tokens.push(Token { kind, span });
            } else if c.is_alphabetic() || c == '_' || c == '$' {
                let mut name = String::new();
                while let Some(&c) = self.chars.peek() {
                    if c.is_alphanumeric() || c == '_' || c == '$' {
                        name.push(c);
                        self.bump();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { kind: TokenKind::Ident(name), span });
            } else if c.is_ascii_digit() {
                while let Some(&c) = self.chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '.' || c == '_' {
                        self.bump();
                    } else {
                        break;
                    }
                }
                tokens.push(Token { kind: TokenKind::Opaque, span });
            } else {
                self.bump();
                tokens.push(Token { kind: TokenKind::Punct(c), span });
            }
        }

        Ok(tokens)
    }

    fn quoted(&mut self, quote: char, span: Span) -> Result<String, SyntaxError> {
        self.bump();
        let mut value = String::new();
        loop {
            match self.bump() {
                None | Some('\n') => {
                    return Err(SyntaxError::new("unterminated string literal", span));
                }
                Some(c) if c == quote => return Ok(value),
                Some('\\') => {
                    if let Some(c) = self.escape(span)? {
                        value.push(c);
                    }
                }
                Some(c) => value.push(c),
            }
        }
    }

    /// Decode the escape after a backslash; `None` for a line continuation
    fn escape(&mut self, span: Span) -> Result<Option<char>, SyntaxError> {
        let c = match self.bump() {
            None => return Err(SyntaxError::new("unterminated string literal", span)),
            Some('\n') => return Ok(None),
            Some('\r') => {
                if self.chars.peek() == Some(&'\n') {
                    self.bump();
                }
                return Ok(None);
            }
            Some('n') => '\n',
            Some('t') => '\t',
            Some('r') => '\r',
            Some('b') => '\u{8}',
            Some('f') => '\u{c}',
            Some('v') => '\u{b}',
            Some('0') => '\0',
            Some('x') => {
                let code = self.hex_digits(2, span)?;
                char::from_u32(code).ok_or_else(|| invalid_escape(span))?
            }
            Some('u') => self.unicode_escape(span)?,
            Some(other) => other,
        };
        Ok(Some(c))
    }

    fn hex_digits(&mut self, count: usize, span: Span) -> Result<u32, SyntaxError> {
        let mut value = 0;
        for _ in 0..count {
            let digit = self
                .bump()
                .and_then(|c| c.to_digit(16))
                .ok_or_else(|| invalid_escape(span))?;
            value = value * 16 + digit;
        }
        Ok(value)
    }

    /// `XXXX` or `{X...}` after `\u`
    fn code_unit(&mut self, span: Span) -> Result<u32, SyntaxError> {
        if self.chars.peek() != Some(&'{') {
            return self.hex_digits(4, span);
        }

        self.bump();
        let mut value: u32 = 0;
        let mut digits = 0;
        loop {
            match self.bump() {
                Some('}') if digits > 0 => return Ok(value),
                Some(c) => {
                    let digit = c.to_digit(16).ok_or_else(|| invalid_escape(span))?;
                    value = value * 16 + digit;
                    digits += 1;
                    if value > 0x10FFFF {
                        return Err(invalid_escape(span));
                    }
                }
                None => return Err(invalid_escape(span)),
            }
        }
    }

    /// A high surrogate must be followed by `\u` and its low surrogate
    fn unicode_escape(&mut self, span: Span) -> Result<char, SyntaxError> {
        let unit = self.code_unit(span)?;
        if !(0xD800..0xDC00).contains(&unit) {
            return char::from_u32(unit).ok_or_else(|| invalid_escape(span));
        }

        let mut ahead = self.chars.clone();
        if ahead.next() == Some('\\') && ahead.next() == Some('u') {
            self.bump();
            self.bump();
            let low = self.code_unit(span)?;
            if (0xDC00..0xE000).contains(&low) {
                let combined = 0x10000 + ((unit - 0xD800) << 10) + (low - 0xDC00);
                return char::from_u32(combined).ok_or_else(|| invalid_escape(span));
            }
        }
        Err(invalid_escape(span))
    }

    /// Template literals are string literals only when they contain no `${...}`
    fn template(&mut self, span: Span) -> Result<TokenKind, SyntaxError> {
        self.bump();
        let mut value = String::new();
        let mut interpolated = false;
        loop {
            match self.bump() {
                None => return Err(SyntaxError::new("unterminated template literal", span)),
                Some('`') => break,
                Some('\\') => {
                    if let Some(c) = self.escape(span)? {
                        value.push(c);
                    }
                }
                Some('$') if self.chars.peek() == Some(&'{') => {
                    interpolated = true;
                    self.bump();
                    let mut depth = 1usize;
                    while depth > 0 {
                        match self.bump() {
                            None => {
                                return Err(SyntaxError::new(
                                    "unterminated template literal",
                                    span,
                                ))
                            }
                            Some('{') => depth += 1,
                            Some('}') => depth -= 1,
                            Some(_) => {}
                        }
                    }
                }
                Some(c) => value.push(c),
            }
        }

        Ok(if interpolated {
            TokenKind::Opaque
        } else {
            TokenKind::Str(value)
        })
    }
}

fn invalid_escape(span: Span) -> SyntaxError {
    SyntaxError::new("invalid escape sequence", span)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

fn closing(open: char) -> char {
    match open {
        '(' => ')',
        '[' => ']',
        _ => '}',
    }
}

impl Parser {
    fn peek(&self) -> Option<&Token> {
        self.tokens.get(self.pos)
    }

    fn peek_kind(&self, offset: usize) -> Option<&TokenKind> {
        self.tokens.get(self.pos + offset).map(|t| &t.kind)
    }

    fn is_punct(&self, offset: usize, c: char) -> bool {
        matches!(self.peek_kind(offset), Some(TokenKind::Punct(p)) if *p == c)
    }

    fn eof_span(&self) -> Span {
        self.tokens.last().map(|t| t.span).unwrap_or_default()
    }

    /// Parse terms until one of `stops` (not consumed) or end of input.
    /// Closing brackets outside `stops` are unbalanced.
    fn parse_sequence(&mut self, stops: &[char]) -> Result<Vec<Node>, SyntaxError> {
        Ok(self.parse_terms(stops)?.0)
    }

    /// Returns the parsed terms and whether any token was skipped as opaque
    fn parse_terms(&mut self, stops: &[char]) -> Result<(Vec<Node>, bool), SyntaxError> {
        let mut nodes = Vec::new();
        let mut skipped = false;

        while let Some(token) = self.peek() {
            if let TokenKind::Punct(c) = token.kind {
                if stops.contains(&c) {
                    break;
                }
                if matches!(c, ')' | ']' | '}') {
                    return Err(SyntaxError::new(
                        format!("unexpected {}", token.kind),
                        token.span,
                    ));
                }
            }

            match self.parse_term()? {
                Some(node) => nodes.push(node),
                None => skipped = true,
            }
        }

        Ok((nodes, skipped))
    }

    /// One expression up to a stop: a lone term keeps its own kind,
    /// anything more becomes `Other`. `None` when no token was consumed.
    fn parse_expression(&mut self, stops: &[char]) -> Result<Option<Node>, SyntaxError> {
        let start = self.pos;
        let (mut nodes, skipped) = self.parse_terms(stops)?;
        if self.pos == start {
            return Ok(None);
        }
        if nodes.len() == 1 && !skipped {
            return Ok(Some(nodes.remove(0)));
        }
        Ok(Some(Node::Other { children: nodes }))
    }

    fn parse_term(&mut self) -> Result<Option<Node>, SyntaxError> {
        let Some(token) = self.peek().cloned() else {
            return Ok(None);
        };
        self.pos += 1;

        let node = match token.kind {
            TokenKind::Str(value) => Node::Str(StrLit { value, span: token.span }),
            TokenKind::Punct('[') => {
                let items = self.parse_delimited('[')?;
                Node::List { items, span: token.span }
            }
            TokenKind::Punct('{') => self.parse_object(token.span)?,
            TokenKind::Punct('(') => {
                let children = self.parse_delimited('(')?;
                Node::Other { children }
            }
            TokenKind::Ident(first) => {
                let mut path = first;
                while self.is_punct(0, '.') {
                    let Some(TokenKind::Ident(next)) = self.peek_kind(1) else {
                        break;
                    };
                    path.push('.');
                    path.push_str(next);
                    self.pos += 2;
                }
                if self.is_punct(0, '(') {
                    self.pos += 1;
                    let args = self.parse_delimited('(')?;
                    Node::Call(Call {
                        callee: path,
                        receiver: None,
                        args,
                        span: token.span,
                    })
                } else {
                    Node::Ident { name: path, span: token.span }
                }
            }
            TokenKind::Punct(_) | TokenKind::Opaque => return Ok(None),
        };

        self.parse_member_calls(node).map(Some)
    }

    /// `.name(args)` chains applied to an already parsed term
    fn parse_member_calls(&mut self, mut node: Node) -> Result<Node, SyntaxError> {
        loop {
            let dot = if self.is_punct(0, '?') && self.is_punct(1, '.') { 1 } else { 0 };
            if !self.is_punct(dot, '.') {
                return Ok(node);
            }
            let Some(TokenKind::Ident(method)) = self.peek_kind(dot + 1).cloned() else {
                return Ok(node);
            };
            if !self.is_punct(dot + 2, '(') {
                return Ok(node);
            }
            let span = self.tokens[self.pos + dot + 1].span;
            self.pos += dot + 3;
            let args = self.parse_delimited('(')?;
            node = Node::Call(Call {
                callee: method,
                receiver: Some(Box::new(node)),
                args,
                span,
            });
        }
    }

    /// Comma separated expressions up to the matching close bracket,
    /// whose open bracket has already been consumed
    fn parse_delimited(&mut self, open: char) -> Result<Vec<Node>, SyntaxError> {
        let close = closing(open);
        let mut items = Vec::new();

        loop {
            if self.is_punct(0, close) {
                self.pos += 1;
                return Ok(items);
            }
            if self.peek().is_none() {
                return Err(SyntaxError::new(format!("expected '{}'", close), self.eof_span()));
            }

            if let Some(item) = self.parse_expression(&[',', close])? {
                items.push(item);
            }
            if self.is_punct(0, ',') {
                self.pos += 1;
            }
        }
    }

    /// Object literal (or any brace block) whose `{` has been consumed
    fn parse_object(&mut self, span: Span) -> Result<Node, SyntaxError> {
        let mut entries = Vec::new();
        let mut rest = Vec::new();

        loop {
            if self.is_punct(0, '}') {
                self.pos += 1;
                return Ok(Node::Object { entries, rest, span });
            }
            let Some(token) = self.peek().cloned() else {
                return Err(SyntaxError::new("expected '}'", self.eof_span()));
            };

            match &token.kind {
                TokenKind::Ident(key) | TokenKind::Str(key) if self.is_punct(1, ':') => {
                    let key = key.clone();
                    self.pos += 2;
                    let value = self
                        .parse_expression(&[',', '}'])?
                        .unwrap_or(Node::Other { children: Vec::new() });
                    entries.push(Entry {
                        key,
                        key_span: token.span,
                        value,
                    });
                }
                // spreads, shorthand properties, statements of a block body
                _ => rest.extend(self.parse_sequence(&[',', '}'])?),
            }

            if self.is_punct(0, ',') {
                self.pos += 1;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Node> {
        SourceTree::parse(source).unwrap().nodes
    }

    fn calls(nodes: &[Node]) -> Vec<&Call> {
        nodes
            .iter()
            .filter_map(|n| match n {
                Node::Call(call) => Some(call),
                _ => None,
            })
            .collect()
    }

    #[test]
    fn parses_enum_declaration() {
        let nodes = parse("export const status = pgEnum('status', ['open', 'closed']);");
        let call = calls(&nodes)[0];

        assert_eq!(call.callee, "pgEnum");
        assert_eq!(call.args.len(), 2);
        assert!(matches!(&call.args[0], Node::Str(s) if s.value == "status"));
        assert!(matches!(&call.args[1], Node::List { items, .. } if items.len() == 2));
    }

    #[test]
    fn member_chain_keeps_receiver() {
        let nodes = parse("decimal('total').notNull().default('0')");
        let Node::Call(outer) = &nodes[0] else {
            panic!("expected call");
        };

        assert_eq!(outer.callee, "default");
        let Some(Node::Call(middle)) = outer.receiver.as_deref() else {
            panic!("expected receiver call");
        };
        assert_eq!(middle.callee, "notNull");
        assert_eq!(nodes[0].first_string_literal().unwrap().value, "total");
    }

    #[test]
    fn dotted_callee_is_one_path() {
        let nodes = parse("core.pgTable('t', {})");
        assert_eq!(calls(&nodes)[0].callee, "core.pgTable");
    }

    #[test]
    fn object_entries_and_positions() {
        let nodes = parse("pgTable('orders', {\n  id: serial('id'),\n  'total': decimal('total'),\n})");
        let call = calls(&nodes)[0];
        let Node::Object { entries, .. } = &call.args[1] else {
            panic!("expected object");
        };

        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].key, "id");
        assert_eq!(entries[0].key_span, Span { line: 2, column: 3 });
        assert_eq!(entries[1].key, "total");
    }

    #[test]
    fn comments_and_type_syntax_are_skipped() {
        let source = r#"
            import { pgTable, serial } from 'drizzle-orm/pg-core';
            // pgTable('commented', {})
            /* pgEnum('also_commented', []) */
            export type Row = InferModel<typeof t, 'insert'>;
            type Cols = T extends PgTableWithColumns<infer TC> ? TC : never;
            export const t = pgTable('t', { id: serial('id') });
        "#;
        let nodes = parse(source);
        let names: Vec<_> = calls(&nodes).iter().map(|c| c.callee.clone()).collect();

        assert_eq!(names, vec!["pgTable".to_string()]);
    }

    #[test]
    fn template_literals() {
        let nodes = parse("f(`plain`, `with ${x}`)");
        let call = calls(&nodes)[0];

        assert!(matches!(&call.args[0], Node::Str(s) if s.value == "plain"));
        assert!(matches!(&call.args[1], Node::Other { .. }));
    }

    #[test]
    fn escapes_are_decoded() {
        let nodes = parse(r#"f('\u0061bc', "\x73elect", '\u{6f}rder', `\u0075ser`, 'it\'s')"#);
        let values: Vec<_> = calls(&nodes)[0]
            .args
            .iter()
            .map(|arg| match arg {
                Node::Str(s) => s.value.clone(),
                other => panic!("expected string, got {:?}", other),
            })
            .collect();

        assert_eq!(values, vec!["abc", "select", "order", "user", "it's"]);
    }

    #[test]
    fn surrogate_pairs_combine() {
        let nodes = parse(r"f('\uD83D\uDE00')");
        assert!(matches!(&calls(&nodes)[0].args[0], Node::Str(s) if s.value == "\u{1F600}"));
    }

    #[test]
    fn malformed_escapes_are_errors() {
        assert!(SourceTree::parse(r"f('\u00zz')").is_err());
        assert!(SourceTree::parse(r"f('\x4')").is_err());
        assert!(SourceTree::parse(r"f('\u{110000}')").is_err());
        assert!(SourceTree::parse(r"f('\uD83D')").is_err());
    }

    #[test]
    fn multi_term_argument_is_other() {
        let nodes = parse("pgTable('a' + suffix, {})");
        assert!(matches!(calls(&nodes)[0].args[0], Node::Other { .. }));
    }

    #[test]
    fn unbalanced_brackets_are_errors() {
        assert!(SourceTree::parse("pgTable('t', {)").is_err());
        assert!(SourceTree::parse("f(a))").is_err());
        assert!(SourceTree::parse("f(a").is_err());
    }

    #[test]
    fn unterminated_literals_are_errors() {
        let err = SourceTree::parse("const a = 1;\nf('oops)").unwrap_err();
        assert_eq!(err.span, Span { line: 2, column: 3 });
        assert!(SourceTree::parse("/* never closed").is_err());
        assert!(SourceTree::parse("`open").is_err());
    }
}
