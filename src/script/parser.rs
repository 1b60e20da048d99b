use super::lexer::{RawTemplatePart, SyntaxError, Tok, Token, tokenize};
use super::*;

const RESERVED_WORDS: &[&str] = &[
    "var", "let", "const", "function", "if", "else", "while", "for", "return", "break",
    "continue", "throw", "try", "catch", "finally", "new", "typeof", "void", "this", "true",
    "false", "null", "do", "switch", "case", "default", "class", "delete", "in", "instanceof",
];

/// Bound on syntactic nesting (blocks, parentheses, operator chains) so deep
/// input fails as a `SyntaxError` instead of exhausting the stack.
const MAX_NESTING_DEPTH: usize = 1000;
const PARSE_RED_ZONE: usize = 128 * 1024;
const PARSE_SEGMENT: usize = 4 * 1024 * 1024;

/// Parses a classic script.
pub(crate) fn parse_program(source: &Rc<str>) -> std::result::Result<Vec<Stmt>, SyntaxError> {
    Parser::new(source, 0, false)?.parse_statements_until_eof()
}

/// Parses an event handler attribute body, where `return` is allowed.
pub(crate) fn parse_handler_body(source: &Rc<str>) -> std::result::Result<Vec<Stmt>, SyntaxError> {
    Parser::new(source, 0, true)?.parse_statements_until_eof()
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
    source: Rc<str>,
    base_offset: usize,
    function_depth: usize,
    nesting: usize,
}

type ParseResult<T> = std::result::Result<T, SyntaxError>;

impl Parser {
    fn new(source: &Rc<str>, base_offset: usize, in_function: bool) -> ParseResult<Self> {
        Self::for_fragment(source, &source[..], base_offset, in_function)
    }

    fn for_fragment(
        source: &Rc<str>,
        fragment: &str,
        base_offset: usize,
        in_function: bool,
    ) -> ParseResult<Self> {
        let tokens = tokenize(fragment).map_err(|mut err| {
            err.offset += base_offset;
            err
        })?;
        Ok(Self {
            tokens,
            pos: 0,
            source: source.clone(),
            base_offset,
            function_depth: usize::from(in_function),
            nesting: 0,
        })
    }

    fn peek(&self) -> &Tok {
        &self.tokens[self.pos].tok
    }

    fn peek_at(&self, ahead: usize) -> &Tok {
        let index = (self.pos + ahead).min(self.tokens.len() - 1);
        &self.tokens[index].tok
    }

    fn offset(&self) -> usize {
        self.tokens[self.pos].offset + self.base_offset
    }

    fn advance(&mut self) -> Tok {
        let tok = self.tokens[self.pos].tok.clone();
        if self.pos + 1 < self.tokens.len() {
            self.pos += 1;
        }
        tok
    }

    /// Enters one nesting level. Callers only undo it on success; a failed
    /// parse discards the parser.
    fn descend(&mut self) -> ParseResult<()> {
        self.nesting += 1;
        if self.nesting > MAX_NESTING_DEPTH {
            return Err(SyntaxError::new(
                "script is nested too deeply",
                self.offset(),
            ));
        }
        Ok(())
    }

    fn is_punct(&self, punct: &str) -> bool {
        matches!(self.peek(), Tok::Punct(p) if *p == punct)
    }

    fn is_word(&self, word: &str) -> bool {
        matches!(self.peek(), Tok::Ident(w) if w == word)
    }

    fn eat_punct(&mut self, punct: &str) -> bool {
        if self.is_punct(punct) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_word(&mut self, word: &str) -> bool {
        if self.is_word(word) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn expect_punct(&mut self, punct: &str) -> ParseResult<()> {
        if self.eat_punct(punct) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("expected '{punct}'")))
        }
    }

    fn unexpected(&self, context: &str) -> SyntaxError {
        let found = match self.peek() {
            Tok::Eof => "end of input".to_string(),
            Tok::Punct(p) => format!("'{p}'"),
            Tok::Ident(word) => format!("'{word}'"),
            Tok::Num(n) => format!("number {n}"),
            Tok::Str(_) | Tok::Template(_) => "string".to_string(),
            Tok::Regex { .. } => "regular expression".to_string(),
        };
        SyntaxError::new(format!("unexpected {found}: {context}"), self.offset())
    }

    fn expect_identifier(&mut self) -> ParseResult<String> {
        match self.peek().clone() {
            Tok::Ident(word) if !RESERVED_WORDS.contains(&word.as_str()) => {
                self.advance();
                Ok(word)
            }
            _ => Err(self.unexpected("expected identifier")),
        }
    }

    /// Accepts `;`, or an inserted one before `}`, end of input, or a newline.
    fn end_statement(&mut self) -> ParseResult<()> {
        if self.eat_punct(";") {
            return Ok(());
        }
        let token = &self.tokens[self.pos];
        if token.newline_before || matches!(token.tok, Tok::Eof | Tok::Punct("}")) {
            return Ok(());
        }
        Err(self.unexpected("expected ';'"))
    }

    fn parse_statements_until_eof(&mut self) -> ParseResult<Vec<Stmt>> {
        let mut out = Vec::new();
        while !matches!(self.peek(), Tok::Eof) {
            out.push(self.parse_statement()?);
        }
        Ok(out)
    }

    fn parse_block_body(&mut self) -> ParseResult<Vec<Stmt>> {
        self.expect_punct("{")?;
        let mut out = Vec::new();
        while !self.is_punct("}") {
            if matches!(self.peek(), Tok::Eof) {
                return Err(self.unexpected("expected '}'"));
            }
            out.push(self.parse_statement()?);
        }
        self.advance();
        Ok(out)
    }

    fn parse_statement(&mut self) -> ParseResult<Stmt> {
        let offset = self.offset();
        self.descend()?;
        let kind = stacker::maybe_grow(PARSE_RED_ZONE, PARSE_SEGMENT, || {
            self.parse_statement_kind()
        })?;
        self.nesting -= 1;
        Ok(Stmt { offset, kind })
    }

    fn parse_statement_kind(&mut self) -> ParseResult<StmtKind> {
        if self.eat_punct(";") {
            return Ok(StmtKind::Empty);
        }
        if self.is_punct("{") {
            return Ok(StmtKind::Block(self.parse_block_body()?));
        }
        let Tok::Ident(word) = self.peek().clone() else {
            let expr = self.parse_expression()?;
            self.end_statement()?;
            return Ok(StmtKind::Expr(expr));
        };
        match word.as_str() {
            "var" | "let" | "const" => {
                let decl = self.parse_var_decl()?;
                self.end_statement()?;
                Ok(decl)
            }
            "function" if matches!(self.peek_at(1), Tok::Ident(_)) => {
                self.advance();
                let def = self.parse_function_rest(false)?;
                Ok(StmtKind::FunctionDecl(def))
            }
            "if" => {
                self.advance();
                self.expect_punct("(")?;
                let cond = self.parse_expression()?;
                self.expect_punct(")")?;
                let then = Box::new(self.parse_statement()?);
                let otherwise = if self.eat_word("else") {
                    Some(Box::new(self.parse_statement()?))
                } else {
                    None
                };
                Ok(StmtKind::If {
                    cond,
                    then,
                    otherwise,
                })
            }
            "while" => {
                self.advance();
                self.expect_punct("(")?;
                let cond = self.parse_expression()?;
                self.expect_punct(")")?;
                let body = Box::new(self.parse_statement()?);
                Ok(StmtKind::While { cond, body })
            }
            "for" => self.parse_for(),
            "return" => {
                if self.function_depth == 0 {
                    return Err(SyntaxError::new("illegal return statement", self.offset()));
                }
                self.advance();
                let token = &self.tokens[self.pos];
                let value = if token.newline_before
                    || matches!(token.tok, Tok::Eof | Tok::Punct(";") | Tok::Punct("}"))
                {
                    None
                } else {
                    Some(self.parse_expression()?)
                };
                self.end_statement()?;
                Ok(StmtKind::Return(value))
            }
            "break" => {
                self.advance();
                self.end_statement()?;
                Ok(StmtKind::Break)
            }
            "continue" => {
                self.advance();
                self.end_statement()?;
                Ok(StmtKind::Continue)
            }
            "throw" => {
                self.advance();
                if self.tokens[self.pos].newline_before {
                    return Err(SyntaxError::new("illegal newline after throw", self.offset()));
                }
                let value = self.parse_expression()?;
                self.end_statement()?;
                Ok(StmtKind::Throw(value))
            }
            "try" => self.parse_try(),
            _ => {
                let expr = self.parse_expression()?;
                self.end_statement()?;
                Ok(StmtKind::Expr(expr))
            }
        }
    }

    fn parse_var_decl(&mut self) -> ParseResult<StmtKind> {
        let kind = match self.advance() {
            Tok::Ident(word) if word == "let" => DeclKind::Let,
            Tok::Ident(word) if word == "const" => DeclKind::Const,
            _ => DeclKind::Var,
        };
        let mut decls = Vec::new();
        loop {
            let name = self.expect_identifier()?;
            let init = if self.eat_punct("=") {
                Some(self.parse_assignment()?)
            } else {
                if kind == DeclKind::Const {
                    return Err(SyntaxError::new(
                        "missing initializer in const declaration",
                        self.offset(),
                    ));
                }
                None
            };
            decls.push((name, init));
            if !self.eat_punct(",") {
                break;
            }
        }
        Ok(StmtKind::VarDecl { kind, decls })
    }

    fn parse_for(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        self.expect_punct("(")?;
        let init = if self.is_punct(";") {
            None
        } else {
            let offset = self.offset();
            let kind = if self.is_word("var") || self.is_word("let") || self.is_word("const") {
                self.parse_var_decl()?
            } else {
                StmtKind::Expr(self.parse_expression()?)
            };
            Some(Box::new(Stmt { offset, kind }))
        };
        self.expect_punct(";")?;
        let cond = if self.is_punct(";") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(";")?;
        let update = if self.is_punct(")") {
            None
        } else {
            Some(self.parse_expression()?)
        };
        self.expect_punct(")")?;
        let body = Box::new(self.parse_statement()?);
        Ok(StmtKind::For {
            init,
            cond,
            update,
            body,
        })
    }

    fn parse_try(&mut self) -> ParseResult<StmtKind> {
        self.advance();
        let block = self.parse_block_body()?;
        let catch = if self.eat_word("catch") {
            let binding = if self.eat_punct("(") {
                let name = self.expect_identifier()?;
                self.expect_punct(")")?;
                Some(name)
            } else {
                None
            };
            Some((binding, self.parse_block_body()?))
        } else {
            None
        };
        let finally = if self.eat_word("finally") {
            Some(self.parse_block_body()?)
        } else {
            None
        };
        if catch.is_none() && finally.is_none() {
            return Err(self.unexpected("missing catch or finally after try"));
        }
        Ok(StmtKind::Try {
            block,
            catch,
            finally,
        })
    }

    fn parse_params(&mut self) -> ParseResult<Vec<String>> {
        self.expect_punct("(")?;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
            params.push(self.expect_identifier()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(params)
    }

    /// After the `function` keyword.
    fn parse_function_rest(&mut self, allow_anonymous: bool) -> ParseResult<Rc<FunctionDef>> {
        let name = match self.peek() {
            Tok::Ident(_) => Some(self.expect_identifier()?),
            _ if allow_anonymous => None,
            _ => return Err(self.unexpected("expected function name")),
        };
        let params = self.parse_params()?;
        self.function_depth += 1;
        let body = self.parse_block_body();
        self.function_depth -= 1;
        Ok(Rc::new(FunctionDef {
            name,
            params,
            body: FunctionBody::Block(body?),
            is_arrow: false,
            source: self.source.clone(),
        }))
    }

    fn parse_arrow_body(&mut self, params: Vec<String>) -> ParseResult<Expr> {
        self.function_depth += 1;
        let body = if self.is_punct("{") {
            self.parse_block_body().map(FunctionBody::Block)
        } else {
            self.parse_assignment()
                .map(|expr| FunctionBody::Expr(Box::new(expr)))
        };
        self.function_depth -= 1;
        Ok(Expr::Function(Rc::new(FunctionDef {
            name: None,
            params,
            body: body?,
            is_arrow: true,
            source: self.source.clone(),
        })))
    }

    fn parse_expression(&mut self) -> ParseResult<Expr> {
        let first = self.parse_assignment()?;
        if !self.is_punct(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_punct(",") {
            items.push(self.parse_assignment()?);
        }
        Ok(Expr::Sequence(items))
    }

    fn is_arrow_ahead(&self) -> bool {
        match self.peek() {
            Tok::Ident(_) => matches!(self.peek_at(1), Tok::Punct("=>")),
            Tok::Punct("(") => {
                let mut ahead = 1;
                loop {
                    match self.peek_at(ahead) {
                        Tok::Punct(")") => return matches!(self.peek_at(ahead + 1), Tok::Punct("=>")),
                        Tok::Ident(_) | Tok::Punct(",") => ahead += 1,
                        _ => return false,
                    }
                }
            }
            _ => false,
        }
    }

    fn parse_assignment(&mut self) -> ParseResult<Expr> {
        self.descend()?;
        let expr = stacker::maybe_grow(PARSE_RED_ZONE, PARSE_SEGMENT, || {
            self.parse_assignment_inner()
        })?;
        self.nesting -= 1;
        Ok(expr)
    }

    fn parse_assignment_inner(&mut self) -> ParseResult<Expr> {
        if self.is_arrow_ahead() {
            let params = if self.is_punct("(") {
                self.parse_params()?
            } else {
                vec![self.expect_identifier()?]
            };
            self.expect_punct("=>")?;
            return self.parse_arrow_body(params);
        }

        let target = self.parse_conditional()?;
        let op = match self.peek() {
            Tok::Punct("=") => AssignOp::Assign,
            Tok::Punct("+=") => AssignOp::Add,
            Tok::Punct("-=") => AssignOp::Sub,
            Tok::Punct("*=") => AssignOp::Mul,
            Tok::Punct("/=") => AssignOp::Div,
            _ => return Ok(target),
        };
        if !matches!(target, Expr::Var(_) | Expr::Member { .. } | Expr::Index { .. }) {
            return Err(SyntaxError::new(
                "invalid left-hand side in assignment",
                self.offset(),
            ));
        }
        self.advance();
        let value = self.parse_assignment()?;
        Ok(Expr::Assign {
            target: Box::new(target),
            op,
            value: Box::new(value),
        })
    }

    fn parse_conditional(&mut self) -> ParseResult<Expr> {
        let cond = self.parse_logical_or()?;
        if !self.eat_punct("?") {
            return Ok(cond);
        }
        let then = self.parse_assignment()?;
        self.expect_punct(":")?;
        let otherwise = self.parse_assignment()?;
        Ok(Expr::Conditional {
            cond: Box::new(cond),
            then: Box::new(then),
            otherwise: Box::new(otherwise),
        })
    }

    fn parse_logical_or(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_logical_and()?;
        let entered = self.nesting;
        while self.eat_punct("||") {
            self.descend()?;
            let right = self.parse_logical_and()?;
            left = Expr::Logical {
                and: false,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.nesting = entered;
        Ok(left)
    }

    fn parse_logical_and(&mut self) -> ParseResult<Expr> {
        let mut left = self.parse_equality()?;
        let entered = self.nesting;
        while self.eat_punct("&&") {
            self.descend()?;
            let right = self.parse_equality()?;
            left = Expr::Logical {
                and: true,
                left: Box::new(left),
                right: Box::new(right),
            };
        }
        self.nesting = entered;
        Ok(left)
    }

    fn parse_binary_level(
        &mut self,
        table: &[(&str, BinaryOp)],
        next: fn(&mut Self) -> ParseResult<Expr>,
    ) -> ParseResult<Expr> {
        let mut left = next(self)?;
        let entered = self.nesting;
        'outer: loop {
            for (punct, op) in table {
                if self.eat_punct(punct) {
                    self.descend()?;
                    let right = next(self)?;
                    left = Expr::Binary {
                        op: *op,
                        left: Box::new(left),
                        right: Box::new(right),
                    };
                    continue 'outer;
                }
            }
            self.nesting = entered;
            return Ok(left);
        }
    }

    fn parse_equality(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[
                ("===", BinaryOp::StrictEq),
                ("!==", BinaryOp::StrictNotEq),
                ("==", BinaryOp::Eq),
                ("!=", BinaryOp::NotEq),
            ],
            Self::parse_relational,
        )
    }

    fn parse_relational(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[
                ("<=", BinaryOp::LtEq),
                (">=", BinaryOp::GtEq),
                ("<", BinaryOp::Lt),
                (">", BinaryOp::Gt),
            ],
            Self::parse_additive,
        )
    }

    fn parse_additive(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[("+", BinaryOp::Add), ("-", BinaryOp::Sub)],
            Self::parse_multiplicative,
        )
    }

    fn parse_multiplicative(&mut self) -> ParseResult<Expr> {
        self.parse_binary_level(
            &[
                ("*", BinaryOp::Mul),
                ("/", BinaryOp::Div),
                ("%", BinaryOp::Rem),
            ],
            Self::parse_unary,
        )
    }

    fn parse_unary(&mut self) -> ParseResult<Expr> {
        let op = match self.peek() {
            Tok::Punct("!") => Some(UnaryOp::Not),
            Tok::Punct("-") => Some(UnaryOp::Neg),
            Tok::Punct("+") => Some(UnaryOp::Plus),
            Tok::Ident(word) if word == "typeof" => Some(UnaryOp::TypeOf),
            Tok::Ident(word) if word == "void" => Some(UnaryOp::Void),
            _ => None,
        };
        if let Some(op) = op {
            self.advance();
            self.descend()?;
            let operand = self.parse_unary()?;
            self.nesting -= 1;
            return Ok(Expr::Unary {
                op,
                operand: Box::new(operand),
            });
        }
        if self.is_punct("++") || self.is_punct("--") {
            let delta = if self.is_punct("++") { 1.0 } else { -1.0 };
            self.advance();
            self.descend()?;
            let target = self.parse_unary()?;
            self.nesting -= 1;
            return self.update_expr(target, delta, true);
        }
        self.parse_postfix()
    }

    fn update_expr(&self, target: Expr, delta: f64, prefix: bool) -> ParseResult<Expr> {
        if !matches!(target, Expr::Var(_) | Expr::Member { .. } | Expr::Index { .. }) {
            return Err(SyntaxError::new(
                "invalid update expression operand",
                self.offset(),
            ));
        }
        Ok(Expr::Update {
            target: Box::new(target),
            delta,
            prefix,
        })
    }

    fn parse_postfix(&mut self) -> ParseResult<Expr> {
        let expr = self.parse_call_member()?;
        let token = &self.tokens[self.pos];
        if !token.newline_before {
            if self.is_punct("++") {
                self.advance();
                return self.update_expr(expr, 1.0, false);
            }
            if self.is_punct("--") {
                self.advance();
                return self.update_expr(expr, -1.0, false);
            }
        }
        Ok(expr)
    }

    fn parse_arguments(&mut self) -> ParseResult<Vec<Expr>> {
        self.expect_punct("(")?;
        let mut args = Vec::new();
        while !self.eat_punct(")") {
            args.push(self.parse_assignment()?);
            if !self.eat_punct(",") {
                self.expect_punct(")")?;
                break;
            }
        }
        Ok(args)
    }

    fn parse_property_name(&mut self) -> ParseResult<String> {
        match self.advance() {
            Tok::Ident(word) => Ok(word),
            _ => Err(SyntaxError::new("expected property name", self.offset())),
        }
    }

    fn parse_call_member(&mut self) -> ParseResult<Expr> {
        let mut expr = if self.eat_word("new") {
            let callee = self.parse_member_only()?;
            let args = if self.is_punct("(") {
                self.parse_arguments()?
            } else {
                Vec::new()
            };
            Expr::New {
                callee: Box::new(callee),
                args,
            }
        } else {
            self.parse_primary()?
        };
        let entered = self.nesting;
        loop {
            if matches!(self.peek(), Tok::Punct("." | "[" | "(")) {
                self.descend()?;
            }
            if self.eat_punct(".") {
                let property = self.parse_property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat_punct("[") {
                let index = self.parse_expression()?;
                self.expect_punct("]")?;
                expr = Expr::Index {
                    object: Box::new(expr),
                    index: Box::new(index),
                };
            } else if self.is_punct("(") {
                let args = self.parse_arguments()?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                self.nesting = entered;
                return Ok(expr);
            }
        }
    }

    /// Callee of `new`: member accesses without calls.
    fn parse_member_only(&mut self) -> ParseResult<Expr> {
        let mut expr = self.parse_primary()?;
        let entered = self.nesting;
        while self.eat_punct(".") {
            self.descend()?;
            let property = self.parse_property_name()?;
            expr = Expr::Member {
                object: Box::new(expr),
                property,
            };
        }
        self.nesting = entered;
        Ok(expr)
    }

    fn parse_primary(&mut self) -> ParseResult<Expr> {
        let offset = self.offset();
        match self.peek().clone() {
            Tok::Num(value) => {
                self.advance();
                Ok(Expr::Number(value))
            }
            Tok::Str(value) => {
                self.advance();
                Ok(Expr::String(value))
            }
            Tok::Template(parts) => {
                self.advance();
                let mut out = Vec::new();
                for part in parts {
                    match part {
                        RawTemplatePart::Text(text) => out.push(TemplatePart::Text(text)),
                        RawTemplatePart::Expr(src, at) => {
                            let mut inner = Parser::for_fragment(
                                &self.source,
                                &src,
                                self.base_offset + at,
                                self.function_depth > 0,
                            )?;
                            inner.nesting = self.nesting;
                            let expr = inner.parse_expression()?;
                            if !matches!(inner.peek(), Tok::Eof) {
                                return Err(inner.unexpected("in template expression"));
                            }
                            out.push(TemplatePart::Expr(expr));
                        }
                    }
                }
                Ok(Expr::Template(out))
            }
            Tok::Regex { pattern, flags } => {
                self.advance();
                Ok(Expr::Regex { pattern, flags })
            }
            Tok::Punct("(") => {
                self.advance();
                let expr = self.parse_expression()?;
                self.expect_punct(")")?;
                Ok(expr)
            }
            Tok::Punct("[") => {
                self.advance();
                let mut items = Vec::new();
                while !self.eat_punct("]") {
                    items.push(self.parse_assignment()?);
                    if !self.eat_punct(",") {
                        self.expect_punct("]")?;
                        break;
                    }
                }
                Ok(Expr::Array(items))
            }
            Tok::Punct("{") => {
                self.advance();
                let mut entries = Vec::new();
                while !self.eat_punct("}") {
                    let key = match self.advance() {
                        Tok::Ident(word) => word,
                        Tok::Str(text) => text,
                        Tok::Num(n) => super::value::number_to_string(n),
                        _ => return Err(SyntaxError::new("expected property key", self.offset())),
                    };
                    let value = if self.eat_punct(":") {
                        self.parse_assignment()?
                    } else {
                        Expr::Var(key.clone())
                    };
                    entries.push((key, value));
                    if !self.eat_punct(",") {
                        self.expect_punct("}")?;
                        break;
                    }
                }
                Ok(Expr::Object(entries))
            }
            Tok::Ident(word) => match word.as_str() {
                "true" => {
                    self.advance();
                    Ok(Expr::Bool(true))
                }
                "false" => {
                    self.advance();
                    Ok(Expr::Bool(false))
                }
                "null" => {
                    self.advance();
                    Ok(Expr::Null)
                }
                "undefined" => {
                    self.advance();
                    Ok(Expr::Undefined)
                }
                "this" => {
                    self.advance();
                    Ok(Expr::This)
                }
                "function" => {
                    self.advance();
                    Ok(Expr::Function(self.parse_function_rest(true)?))
                }
                _ if RESERVED_WORDS.contains(&word.as_str()) => {
                    Err(SyntaxError::new(format!("unexpected token '{word}'"), offset))
                }
                _ => {
                    self.advance();
                    Ok(Expr::Var(word))
                }
            },
            _ => Err(self.unexpected("expected expression")),
        }
    }
}
