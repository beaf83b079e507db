//! Recursive-descent parser.
//!
//! One method per grammar rule, each returning the node it parsed. Rules
//! that may legitimately find nothing (`parse_primary`, `parse_indexing`)
//! return `Option` so callers can tell "no node here" from a syntax error.

use tracing::trace;
use vesh_ir::{
    Assignment, Chunk, Compound, Form, FormKind, IndexArray, Indexing, Lambda, MapPair, Param,
    Pipeline, Primary, PrimaryKind, Span,
};
use vesh_stack::ensure_sufficient_stack;

use crate::cursor::Cursor;
use crate::ParseError;

type ParseResult<T> = Result<T, ParseError>;

/// Lexical context that changes which bytes a bareword may contain.
#[derive(Clone, Copy, Debug, Default)]
struct Context {
    /// Assignment targets and map keys end at `=`.
    stop_at_eq: bool,
    /// Items of a braced list end at `,`.
    in_braced: bool,
}

fn is_bareword_char(c: char, ctx: Context) -> bool {
    match c {
        '=' => !ctx.stop_at_eq,
        ',' => !ctx.in_braced,
        '-' | '_' | ':' | '%' | '+' | '.' | '/' | '@' | '!' | '~' | '*' | '?' | '<' | '>' | '^' => {
            true
        }
        c => c.is_alphanumeric(),
    }
}

fn is_variable_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, '-' | '_' | ':' | '~')
}

fn is_space_or_newline(b: u8) -> bool {
    matches!(b, b' ' | b'\t' | b'\r' | b'\n')
}

pub(crate) struct Parser<'a> {
    cursor: Cursor<'a>,
    ctx: Context,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(code: &'a str) -> Self {
        Parser {
            cursor: Cursor::new(code),
            ctx: Context::default(),
        }
    }

    /// Parse a whole source text.
    pub(crate) fn parse_source(&mut self) -> ParseResult<Chunk> {
        let chunk = self.parse_chunk(None)?;
        if !self.cursor.is_eof() {
            return Err(self.unexpected());
        }
        Ok(chunk)
    }

    fn span_from(&self, start: u32) -> Span {
        Span::new(start, self.cursor.pos())
    }

    fn unexpected(&self) -> ParseError {
        let start = self.cursor.pos();
        match self.cursor.current_char() {
            Some(c) => ParseError::new(
                format!("unexpected {c:?}"),
                Span::new(start, start + u32::try_from(c.len_utf8()).unwrap_or(1)),
            ),
            None => ParseError::new("unexpected end of code", Span::point(start)),
        }
    }

    fn with_context<T>(&mut self, ctx: Context, f: impl FnOnce(&mut Self) -> T) -> T {
        let saved = std::mem::replace(&mut self.ctx, ctx);
        let result = f(self);
        self.ctx = saved;
        result
    }

    fn skip_comment(&mut self) {
        if self.cursor.current() == b'#' {
            self.cursor.eat_until_newline_or_eof();
        }
    }

    /// Skip whitespace, newlines, `;` and comments between pipelines.
    fn skip_separators(&mut self) {
        loop {
            self.cursor
                .eat_while(|b| is_space_or_newline(b) || b == b';');
            if self.cursor.current() == b'#' {
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    /// Skip whitespace, newlines and comments inside brackets.
    fn skip_blank(&mut self) {
        loop {
            self.cursor.eat_while(is_space_or_newline);
            if self.cursor.current() == b'#' {
                self.skip_comment();
            } else {
                break;
            }
        }
    }

    fn at_form_end(&self) -> bool {
        self.cursor.is_eof()
            || matches!(
                self.cursor.current(),
                b'\n' | b';' | b'|' | b')' | b'}' | b'#'
            )
    }

    // Chunk = { Pipeline (newline | ';') }

    fn parse_chunk(&mut self, closer: Option<u8>) -> ParseResult<Chunk> {
        ensure_sufficient_stack(|| self.parse_chunk_inner(closer))
    }

    fn parse_chunk_inner(&mut self, closer: Option<u8>) -> ParseResult<Chunk> {
        let start = self.cursor.pos();
        let mut pipelines = Vec::new();
        loop {
            self.skip_separators();
            if self.cursor.is_eof() {
                break;
            }
            let b = self.cursor.current();
            if Some(b) == closer {
                break;
            }
            if matches!(b, b')' | b']' | b'}') {
                return Err(self.unexpected());
            }
            pipelines.push(self.parse_pipeline()?);

            self.cursor.eat_inline_whitespace();
            self.skip_comment();
            match self.cursor.current() {
                b'\n' | b';' => {}
                _ if self.cursor.is_eof() => break,
                b if Some(b) == closer => break,
                _ => return Err(self.unexpected()),
            }
        }
        Ok(Chunk {
            pipelines,
            span: self.span_from(start),
        })
    }

    // Pipeline = Form { '|' Form }

    fn parse_pipeline(&mut self) -> ParseResult<Pipeline> {
        let start = self.cursor.pos();
        let mut forms = vec![self.parse_form()?];
        loop {
            self.cursor.eat_inline_whitespace();
            if self.cursor.current() != b'|' {
                break;
            }
            self.cursor.advance();
            self.skip_blank();
            forms.push(self.parse_form()?);
        }
        let end = forms.last().map_or(start, |form| form.span.end);
        Ok(Pipeline {
            forms,
            span: Span::new(start, end),
        })
    }

    fn parse_form(&mut self) -> ParseResult<Form> {
        let start = self.cursor.pos();
        if let Some(assignments) = self.try_assignments()? {
            let end = assignments.last().map_or(start, |a| a.span.end);
            return Ok(Form {
                kind: FormKind::Assign(assignments),
                span: Span::new(start, end),
            });
        }

        let head = self.parse_compound()?;
        if head.indexings.is_empty() {
            return Err(self.unexpected());
        }
        let mut end = head.span.end;
        let mut args = Vec::new();
        loop {
            self.cursor.eat_inline_whitespace();
            if self.at_form_end() {
                break;
            }
            let arg = self.parse_compound()?;
            if arg.indexings.is_empty() {
                return Err(self.unexpected());
            }
            end = arg.span.end;
            args.push(arg);
        }
        let span = Span::new(start, end);

        // Spaced assignment: `target = values...`.
        if args.first().and_then(Compound::as_bareword) == Some("=") {
            let head_span = head.span;
            let mut indexings = head.indexings;
            let (Some(left), true) = (indexings.pop(), indexings.is_empty()) else {
                return Err(ParseError::new(
                    "assignment target must be a single variable or braced list",
                    head_span,
                ));
            };
            args.remove(0);
            trace!(lhs = ?left.span, values = args.len(), "spaced assignment");
            return Ok(Form {
                kind: FormKind::Assign(vec![Assignment {
                    left,
                    right: args,
                    span,
                }]),
                span,
            });
        }

        Ok(Form {
            kind: FormKind::Command { head, args },
            span,
        })
    }

    /// Parse `a=b c[k]=d ...` at the start of a form. Returns `None` (with
    /// the cursor untouched) if the form does not start with an assignment.
    fn try_assignments(&mut self) -> ParseResult<Option<Vec<Assignment>>> {
        let mut assignments = Vec::new();
        loop {
            let snapshot = self.cursor;
            match self.try_compact_assignment() {
                Some(assignment) => assignments.push(assignment),
                None => {
                    self.cursor = snapshot;
                    break;
                }
            }
            self.cursor.eat_inline_whitespace();
            if self.at_form_end() {
                break;
            }
        }
        if assignments.is_empty() {
            return Ok(None);
        }
        self.cursor.eat_inline_whitespace();
        if !self.at_form_end() {
            return Err(ParseError::new(
                "temporary assignment is not supported",
                Span::point(self.cursor.pos()),
            ));
        }
        Ok(Some(assignments))
    }

    fn try_compact_assignment(&mut self) -> Option<Assignment> {
        let start = self.cursor.pos();
        // Lambdas and lists never start an assignment target; bail out
        // before parsing them twice.
        if matches!(self.cursor.current(), b'[' | b'(' | b'$' | b'\'' | b'"')
            || (self.cursor.current() == b'{' && is_space_or_newline(self.cursor.peek()))
        {
            return None;
        }
        let left = self
            .with_context(
                Context {
                    stop_at_eq: true,
                    in_braced: false,
                },
                Self::parse_indexing,
            )
            .ok()??;
        if !matches!(
            left.head.kind,
            PrimaryKind::Bareword(_) | PrimaryKind::Braced(_)
        ) {
            return None;
        }
        if self.cursor.current() != b'=' {
            return None;
        }
        self.cursor.advance();
        let right = self
            .with_context(Context::default(), Self::parse_compound)
            .ok()?;
        Some(Assignment {
            left,
            right: vec![right],
            span: self.span_from(start),
        })
    }

    // Compound = { Indexing }

    fn parse_compound(&mut self) -> ParseResult<Compound> {
        let start = self.cursor.pos();
        let mut indexings = Vec::new();
        while let Some(indexing) = self.parse_indexing()? {
            indexings.push(indexing);
        }
        Ok(Compound {
            indexings,
            span: self.span_from(start),
        })
    }

    // Indexing = Primary { '[' { Compound } ']' }

    fn parse_indexing(&mut self) -> ParseResult<Option<Indexing>> {
        let start = self.cursor.pos();
        let Some(head) = self.parse_primary()? else {
            return Ok(None);
        };
        let mut indices = Vec::new();
        while self.cursor.current() == b'[' {
            indices.push(self.parse_index_array()?);
        }
        Ok(Some(Indexing {
            head,
            indices,
            span: self.span_from(start),
        }))
    }

    fn parse_index_array(&mut self) -> ParseResult<IndexArray> {
        let start = self.cursor.pos();
        self.cursor.advance();
        let items = self.with_context(Context::default(), |p| p.parse_items(b']', "index"))?;
        Ok(IndexArray {
            items,
            span: self.span_from(start),
        })
    }

    /// Whitespace-separated compounds up to and including `closer`.
    fn parse_items(&mut self, closer: u8, what: &str) -> ParseResult<Vec<Compound>> {
        let start = self.cursor.pos().saturating_sub(1);
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            if self.cursor.current() == closer {
                self.cursor.advance();
                return Ok(items);
            }
            if self.cursor.is_eof() {
                return Err(ParseError::new(
                    format!("unterminated {what}"),
                    self.span_from(start),
                ));
            }
            let item = self.parse_compound()?;
            if item.indexings.is_empty() {
                return Err(self.unexpected());
            }
            items.push(item);
        }
    }

    fn parse_primary(&mut self) -> ParseResult<Option<Primary>> {
        ensure_sufficient_stack(|| self.parse_primary_inner())
    }

    fn parse_primary_inner(&mut self) -> ParseResult<Option<Primary>> {
        let start = self.cursor.pos();
        let kind = match self.cursor.current() {
            _ if self.cursor.is_eof() => return Ok(None),
            b'\'' => PrimaryKind::SingleQuoted(self.parse_single_quoted()?),
            b'"' => PrimaryKind::DoubleQuoted(self.parse_double_quoted()?),
            b'$' => PrimaryKind::Variable(self.parse_variable()?),
            b'(' => {
                self.cursor.advance();
                let chunk = self.with_context(Context::default(), |p| p.parse_chunk(Some(b')')))?;
                self.expect_closer(b')', "output capture", start)?;
                PrimaryKind::OutputCapture(chunk)
            }
            b'[' => self.with_context(Context::default(), Self::parse_bracketed)?,
            b'{' if is_space_or_newline(self.cursor.peek()) => {
                let body = self.with_context(Context::default(), Self::parse_lambda_body)?;
                PrimaryKind::Lambda(Lambda {
                    params: Vec::new(),
                    body,
                })
            }
            b'{' => PrimaryKind::Braced(self.parse_braced()?),
            _ => match self.cursor.current_char() {
                Some(c) if is_bareword_char(c, self.ctx) => {
                    let ctx = self.ctx;
                    while self
                        .cursor
                        .current_char()
                        .is_some_and(|c| is_bareword_char(c, ctx))
                    {
                        self.cursor.advance_char();
                    }
                    PrimaryKind::Bareword(self.cursor.slice_from(start).to_owned())
                }
                _ => return Ok(None),
            },
        };
        Ok(Some(Primary {
            kind,
            span: self.span_from(start),
        }))
    }

    fn expect_closer(&mut self, closer: u8, what: &str, start: u32) -> ParseResult<()> {
        if self.cursor.current() == closer && !self.cursor.is_eof() {
            self.cursor.advance();
            Ok(())
        } else {
            Err(ParseError::new(
                format!("unterminated {what}"),
                self.span_from(start),
            ))
        }
    }

    /// `'...'`, where `''` stands for one quote.
    fn parse_single_quoted(&mut self) -> ParseResult<String> {
        let start = self.cursor.pos();
        self.cursor.advance();
        let mut text = String::new();
        loop {
            let Some(quote) = self.cursor.find(b'\'') else {
                self.cursor.set_pos(u32::MAX);
                return Err(ParseError::new(
                    "unterminated single-quoted string",
                    self.span_from(start),
                ));
            };
            text.push_str(self.cursor.slice(self.cursor.pos(), quote));
            self.cursor.set_pos(quote + 1);
            if self.cursor.current() == b'\'' {
                text.push('\'');
                self.cursor.advance();
            } else {
                return Ok(text);
            }
        }
    }

    /// `"..."` with backslash escapes.
    fn parse_double_quoted(&mut self) -> ParseResult<String> {
        let start = self.cursor.pos();
        self.cursor.advance();
        let mut text = String::new();
        loop {
            let Some(stop) = self.cursor.find2(b'"', b'\\') else {
                self.cursor.set_pos(u32::MAX);
                return Err(ParseError::new(
                    "unterminated double-quoted string",
                    self.span_from(start),
                ));
            };
            text.push_str(self.cursor.slice(self.cursor.pos(), stop));
            self.cursor.set_pos(stop);
            if self.cursor.current() == b'"' {
                self.cursor.advance();
                return Ok(text);
            }
            self.parse_escape(&mut text)?;
        }
    }

    fn parse_escape(&mut self, text: &mut String) -> ParseResult<()> {
        let start = self.cursor.pos();
        self.cursor.advance();
        let c = match self.cursor.current() {
            b'n' => '\n',
            b't' => '\t',
            b'r' => '\r',
            b'e' => '\x1b',
            b'a' => '\x07',
            b'\\' => '\\',
            b'"' => '"',
            b'\'' => '\'',
            b'x' => {
                self.cursor.advance();
                return self.push_code_point(text, start, 16, 2);
            }
            b'0'..=b'7' => return self.push_code_point(text, start, 8, 3),
            _ => {
                self.cursor.advance_char();
                return Err(ParseError::new(
                    "invalid escape sequence",
                    self.span_from(start),
                ));
            }
        };
        self.cursor.advance();
        text.push(c);
        Ok(())
    }

    fn push_code_point(
        &mut self,
        text: &mut String,
        start: u32,
        radix: u32,
        digits: usize,
    ) -> ParseResult<()> {
        let mut code = 0u32;
        for _ in 0..digits {
            let Some(digit) = char::from(self.cursor.current()).to_digit(radix) else {
                return Err(ParseError::new(
                    "invalid escape sequence",
                    self.span_from(start),
                ));
            };
            code = code * radix + digit;
            self.cursor.advance();
        }
        match char::from_u32(code) {
            Some(c) => {
                text.push(c);
                Ok(())
            }
            None => Err(ParseError::new(
                "invalid escape sequence",
                self.span_from(start),
            )),
        }
    }

    /// `$name`, `$@name`, `$ns:name`. Returns the text after `$`.
    fn parse_variable(&mut self) -> ParseResult<String> {
        let start = self.cursor.pos();
        self.cursor.advance();
        let name_start = self.cursor.pos();
        if self.cursor.current() == b'@' {
            self.cursor.advance();
        }
        let name_body = self.cursor.pos();
        while self.cursor.current_char().is_some_and(is_variable_char) {
            self.cursor.advance_char();
        }
        if self.cursor.pos() == name_body {
            return Err(ParseError::new(
                "variable name must not be empty",
                self.span_from(start),
            ));
        }
        Ok(self.cursor.slice_from(name_start).to_owned())
    }

    /// After `[`: a list, a map, or the parameter list of a lambda.
    fn parse_bracketed(&mut self) -> ParseResult<PrimaryKind> {
        let start = self.cursor.pos();
        self.cursor.advance();
        self.skip_blank();
        if self.cursor.current() == b'&' {
            return Ok(PrimaryKind::Map(self.parse_map_pairs(start)?));
        }

        let items = self.parse_items(b']', "list")?;
        if self.cursor.current() != b'{' {
            return Ok(PrimaryKind::List(items));
        }

        let params = items
            .iter()
            .map(|item| match item.as_bareword() {
                Some(name) => Ok(Param {
                    name: name.to_owned(),
                    span: item.span,
                }),
                None => Err(ParseError::new(
                    "lambda parameter must be a bareword",
                    item.span,
                )),
            })
            .collect::<ParseResult<Vec<_>>>()?;
        let body = self.parse_lambda_body()?;
        Ok(PrimaryKind::Lambda(Lambda { params, body }))
    }

    fn parse_map_pairs(&mut self, start: u32) -> ParseResult<Vec<MapPair>> {
        let mut pairs = Vec::new();
        loop {
            self.skip_blank();
            match self.cursor.current() {
                _ if self.cursor.is_eof() => {
                    return Err(ParseError::new("unterminated map", self.span_from(start)));
                }
                b']' => {
                    self.cursor.advance();
                    return Ok(pairs);
                }
                b'&' => {
                    let pair_start = self.cursor.pos();
                    self.cursor.advance();
                    // `[&]` is the empty map.
                    if self.cursor.current() == b']' {
                        continue;
                    }
                    let key = self.with_context(
                        Context {
                            stop_at_eq: true,
                            in_braced: false,
                        },
                        Self::parse_compound,
                    )?;
                    if key.indexings.is_empty() || self.cursor.current() != b'=' {
                        return Err(ParseError::new(
                            "map pair must look like &key=value",
                            self.span_from(pair_start),
                        ));
                    }
                    self.cursor.advance();
                    let value = self.parse_compound()?;
                    pairs.push(MapPair {
                        key,
                        value,
                        span: self.span_from(pair_start),
                    });
                }
                _ => return Err(self.unexpected()),
            }
        }
    }

    /// `{ chunk }`, with the cursor on `{`.
    fn parse_lambda_body(&mut self) -> ParseResult<Chunk> {
        let start = self.cursor.pos();
        self.cursor.advance();
        let body = self.parse_chunk(Some(b'}'))?;
        self.expect_closer(b'}', "lambda", start)?;
        Ok(body)
    }

    /// `{a,b,c}`, with the cursor on `{`.
    fn parse_braced(&mut self) -> ParseResult<Vec<Compound>> {
        let start = self.cursor.pos();
        self.cursor.advance();
        let mut items = Vec::new();
        loop {
            self.skip_blank();
            let item = self.with_context(
                Context {
                    stop_at_eq: false,
                    in_braced: true,
                },
                Self::parse_compound,
            )?;
            items.push(item);
            self.skip_blank();
            match self.cursor.current() {
                b',' => self.cursor.advance(),
                b'}' => {
                    self.cursor.advance();
                    return Ok(items);
                }
                _ if self.cursor.is_eof() => {
                    return Err(ParseError::new(
                        "unterminated braced list",
                        self.span_from(start),
                    ));
                }
                _ => return Err(self.unexpected()),
            }
        }
    }
}
