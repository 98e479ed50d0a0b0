//! The recursive-descent declaration parser.
//!
//! The parser walks a flat token buffer through a stack of `[begin, end)`
//! views. Narrower views bound sub-parses (a parameter between commas, a
//! template argument list) so no production can look past its own region.
//! Speculative parses (the function-pointer attempt, the constructor-name
//! attempt, template arguments) snapshot the parser and roll back on
//! failure, which also restores any `>>` token that was split into two `>`
//! tokens while scanning a nested generic.

use crate::signature::*;
use crate::token::{self, Token, Value};
use crate::ParseDeclError;

const BUILTIN_KEYWORDS: [&str; 10] = [
    "void", "bool", "char", "short", "int", "long", "float", "double", "signed", "unsigned",
];

const SPECIFIER_KEYWORDS: [&str; 5] = ["virtual", "static", "inline", "constexpr", "explicit"];

pub(crate) struct Parser<'a> {
    source: &'a str,
    tokens: Vec<Token>,
    pos: usize,
    // Exclusive upper bounds of the active views, innermost last. The stack
    // is never empty: the bottom entry covers the whole buffer.
    view_stack: Vec<usize>,
}

struct Snapshot {
    pos: usize,
    view_stack: Vec<usize>,
    tokens: Vec<Token>,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(source: &'a str) -> Result<Parser<'a>, ParseDeclError> {
        let mut tokens = token::scan(source)?;
        // A documented declaration conventionally ends in a semicolon;
        // it carries no information.
        while matches!(tokens.last().map(|t| &t.value), Some(Value::Semicolon)) {
            tokens.pop();
        }
        let end = tokens.len();
        Ok(Parser {
            source,
            tokens,
            pos: 0,
            view_stack: vec![end],
        })
    }

    fn end(&self) -> usize {
        *self.view_stack.last().unwrap()
    }

    fn at_end(&self) -> bool {
        self.pos >= self.end()
    }

    fn peek(&self) -> Option<&Token> {
        if self.pos < self.end() {
            self.tokens.get(self.pos)
        } else {
            None
        }
    }

    fn peek_value(&self) -> Option<&Value> {
        self.peek().map(|t| &t.value)
    }

    fn peek_value_at(&self, offset: usize) -> Option<&Value> {
        if self.pos + offset < self.end() {
            self.tokens.get(self.pos + offset).map(|t| &t.value)
        } else {
            None
        }
    }

    fn advance(&mut self) {
        self.pos += 1;
    }

    fn error<S: Into<String>>(&self, reason: S) -> ParseDeclError {
        ParseDeclError {
            reason: reason.into(),
            offset: self
                .tokens
                .get(self.pos)
                .map(|t| t.start)
                .unwrap_or(self.source.len()),
        }
    }

    fn expect(&mut self, value: Value, what: &str) -> Result<(), ParseDeclError> {
        match self.peek_value() {
            Some(v) if *v == value => {
                self.advance();
                Ok(())
            }
            _ => Err(self.error(format!("expected {what}"))),
        }
    }

    fn eat(&mut self, value: &Value) -> bool {
        if self.peek_value() == Some(value) {
            self.advance();
            true
        } else {
            false
        }
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        match self.peek_value() {
            Some(Value::Ident(s)) if s == keyword => {
                self.advance();
                true
            }
            _ => false,
        }
    }

    fn peek_keyword(&self, keyword: &str) -> bool {
        matches!(self.peek_value(), Some(Value::Ident(s)) if s == keyword)
    }

    fn push_view(&mut self, end: usize) {
        debug_assert!(end <= self.end());
        self.view_stack.push(end);
    }

    fn pop_view(&mut self) {
        self.view_stack.pop();
        debug_assert!(!self.view_stack.is_empty());
    }

    fn save(&self) -> Snapshot {
        Snapshot {
            pos: self.pos,
            view_stack: self.view_stack.clone(),
            tokens: self.tokens.clone(),
        }
    }

    fn restore(&mut self, snapshot: Snapshot) {
        self.pos = snapshot.pos;
        self.view_stack = snapshot.view_stack;
        self.tokens = snapshot.tokens;
    }

    /// Splits the `>>` token at the current position into two `>` tokens.
    ///
    /// Views whose bound lies past the split point widen by one so they keep
    /// covering the same region. A snapshot restore undoes the split if the
    /// enclosing speculative parse fails.
    fn split_shift_right(&mut self) {
        let t = &self.tokens[self.pos];
        debug_assert_eq!(t.value, Value::ShiftRight);
        let (start, end) = (t.start, t.end);
        self.tokens[self.pos] = Token {
            value: Value::Greater,
            start,
            end: start + 1,
        };
        self.tokens.insert(
            self.pos + 1,
            Token {
                value: Value::Greater,
                start: start + 1,
                end,
            },
        );
        for e in &mut self.view_stack {
            if *e > self.pos {
                *e += 1;
            }
        }
    }

    /// The source text covered by the remainder of the current view, verbatim.
    fn raw_rest_of_view(&mut self) -> Result<String, ParseDeclError> {
        if self.at_end() {
            return Err(self.error("expected a value"));
        }
        let start = self.tokens[self.pos].start;
        let end = self.tokens[self.end() - 1].end;
        self.pos = self.end();
        Ok(self.source[start..end].trim().to_string())
    }

    // ----- types and names -----

    pub(crate) fn parse_type_eof(mut self) -> Result<Type, ParseDeclError> {
        let ty = self.parse_type()?;
        self.finish()?;
        Ok(ty)
    }

    fn parse_type(&mut self) -> Result<Type, ParseDeclError> {
        let is_const = self.eat_keyword("const");
        let name = self.parse_name()?;
        let mut ty = Type::named(name);
        ty.is_const = is_const;
        self.parse_type_suffix(&mut ty)?;
        if matches!(self.peek_value(), Some(Value::LParen)) {
            let snapshot = self.save();
            match self.try_function_pointer(ty.clone()) {
                Ok(fn_ptr) => ty = fn_ptr,
                Err(_) => self.restore(snapshot),
            }
        }
        Ok(ty)
    }

    fn parse_type_suffix(&mut self, ty: &mut Type) -> Result<(), ParseDeclError> {
        loop {
            match self.peek_value() {
                Some(Value::Ident(s)) if s == "const" => {
                    if let Some(pointer) = ty.pointers.last_mut() {
                        if pointer.is_const {
                            return Err(self.error("duplicate const qualifier"));
                        }
                        pointer.is_const = true;
                    } else {
                        if ty.trailing_const || ty.is_const {
                            return Err(self.error("duplicate const qualifier"));
                        }
                        ty.trailing_const = true;
                    }
                    self.advance();
                }
                Some(Value::Star) => {
                    ty.pointers.push(Pointer { is_const: false });
                    self.advance();
                }
                Some(Value::Amp) => {
                    ty.reference = RefQualifier::LValue;
                    self.advance();
                    break;
                }
                Some(Value::AmpAmp) => {
                    ty.reference = RefQualifier::RValue;
                    self.advance();
                    break;
                }
                _ => break,
            }
        }
        Ok(())
    }

    fn try_function_pointer(&mut self, return_type: Type) -> Result<Type, ParseDeclError> {
        self.expect(Value::LParen, "`(`")?;
        self.expect(Value::Star, "`*`")?;
        self.expect(Value::RParen, "`)`")?;
        let (parameters, _) = self.parse_parenthesized_parameters()?;
        Ok(Type {
            is_const: false,
            kind: TypeKind::FunctionPointer {
                return_type: Box::new(return_type),
                parameters,
            },
            trailing_const: false,
            pointers: Vec::new(),
            reference: RefQualifier::None,
        })
    }

    fn parse_name(&mut self) -> Result<Name, ParseDeclError> {
        // Builtin type names may span several keywords (`unsigned long long`)
        // and never take template arguments or `::` continuations.
        if matches!(self.peek_value(), Some(Value::Ident(s)) if is_builtin(s)) {
            let mut words = Vec::new();
            while let Some(Value::Ident(s)) = self.peek_value() {
                if !is_builtin(s) {
                    break;
                }
                words.push(s.clone());
                self.advance();
            }
            return Ok(Name::from_ident(words.join(" ")));
        }
        let mut segments = vec![self.parse_segment()?];
        while self.eat(&Value::Scope) {
            segments.push(self.parse_segment()?);
        }
        Ok(Name { segments })
    }

    fn parse_segment(&mut self) -> Result<Segment, ParseDeclError> {
        let ident = match self.peek_value().cloned() {
            Some(Value::Ident(s)) if s == "operator" => {
                self.advance();
                return Ok(Segment {
                    ident: self.parse_operator_name()?,
                    template_args: None,
                });
            }
            Some(Value::Ident(s)) => {
                self.advance();
                s
            }
            _ => return Err(self.error("expected a name")),
        };
        let template_args = if matches!(self.peek_value(), Some(Value::Less)) {
            let snapshot = self.save();
            match self.parse_template_args() {
                Ok(args) => Some(args),
                Err(_) => {
                    self.restore(snapshot);
                    None
                }
            }
        } else {
            None
        };
        Ok(Segment {
            ident,
            template_args,
        })
    }

    fn parse_operator_name(&mut self) -> Result<String, ParseDeclError> {
        // `operator()` and `operator[]`
        if self.peek_value() == Some(&Value::LParen) && self.peek_value_at(1) == Some(&Value::RParen)
        {
            self.advance();
            self.advance();
            return Ok("operator()".into());
        }
        if self.eat(&Value::LBracket) {
            self.expect(Value::RBracket, "`]`")?;
            return Ok("operator[]".into());
        }
        // Literal suffix: `operator"" _suffix`
        if matches!(self.peek_value(), Some(Value::Literal(s)) if s == "\"\"") {
            self.advance();
            let suffix = match self.peek_value().cloned() {
                Some(Value::Ident(s)) => {
                    self.advance();
                    s
                }
                _ => return Err(self.error("expected a literal suffix name")),
            };
            return Ok(format!("operator\"\"{suffix}"));
        }
        // A run of operator symbols, e.g. `==`, `<<`, `->`.
        let mut symbol = String::new();
        while let Some(value) = self.peek_value() {
            match value {
                Value::LParen => break,
                Value::Star
                | Value::Amp
                | Value::AmpAmp
                | Value::Less
                | Value::Greater
                | Value::ShiftLeft
                | Value::ShiftRight
                | Value::Assign
                | Value::Tilde
                | Value::Comma
                | Value::Other(_) => {
                    symbol.push_str(&value.text());
                    self.advance();
                }
                _ => break,
            }
        }
        if symbol.is_empty() {
            return Err(self.error("expected an operator symbol"));
        }
        Ok(format!("operator{symbol}"))
    }

    fn parse_template_args(&mut self) -> Result<Vec<TemplateArg>, ParseDeclError> {
        self.expect(Value::Less, "`<`")?;
        let mut args = Vec::new();
        if self.eat(&Value::Greater) {
            return Ok(args);
        }
        loop {
            let arg = match self.peek_value().cloned() {
                Some(Value::Number(s)) | Some(Value::Literal(s)) => {
                    self.advance();
                    TemplateArg::Literal(s)
                }
                _ => TemplateArg::Type(self.parse_type()?),
            };
            args.push(arg);
            match self.peek_value() {
                Some(Value::Comma) => {
                    self.advance();
                }
                Some(Value::Greater) => {
                    self.advance();
                    break;
                }
                Some(Value::ShiftRight) => {
                    // The `>>` closes both this generic and the enclosing
                    // one: split it and consume the first half.
                    self.split_shift_right();
                    self.advance();
                    break;
                }
                _ => return Err(self.error("expected `,` or `>` in template arguments")),
            }
        }
        Ok(args)
    }

    // ----- parameters -----

    /// Index of the end of the current parameter: the next top-level comma,
    /// or the `)` closing the list.
    fn scan_param_bound(&mut self) -> Result<(usize, bool), ParseDeclError> {
        let mut paren_depth: usize = 0;
        let mut bracket_depth: usize = 0;
        let mut angle_depth: usize = 0;
        let mut i = self.pos;
        while i < self.end() {
            match &self.tokens[i].value {
                Value::LParen => paren_depth += 1,
                Value::RParen => {
                    if paren_depth == 0 {
                        return Ok((i, false));
                    }
                    paren_depth -= 1;
                }
                Value::LBracket => bracket_depth += 1,
                Value::RBracket => bracket_depth = bracket_depth.saturating_sub(1),
                Value::Less => angle_depth += 1,
                Value::Greater => angle_depth = angle_depth.saturating_sub(1),
                Value::ShiftRight => angle_depth = angle_depth.saturating_sub(2),
                Value::Comma => {
                    if paren_depth == 0 && bracket_depth == 0 && angle_depth == 0 {
                        return Ok((i, true));
                    }
                }
                _ => {}
            }
            i += 1;
        }
        Err(self.error("unterminated parameter list"))
    }

    fn parse_parenthesized_parameters(
        &mut self,
    ) -> Result<(Vec<Parameter>, bool), ParseDeclError> {
        self.expect(Value::LParen, "`(`")?;
        let mut parameters = Vec::new();
        let mut is_variadic = false;
        if self.eat(&Value::RParen) {
            return Ok((parameters, is_variadic));
        }
        loop {
            let (bound, _) = self.scan_param_bound()?;
            if bound == self.pos + 1 && self.peek_value() == Some(&Value::Ellipsis) {
                is_variadic = true;
                self.advance();
            } else {
                self.push_view(bound);
                let parameter = self.parse_parameter();
                // A `>>` split inside the parameter may have widened the
                // view; read the adjusted bound before popping.
                let adjusted = self.end();
                self.pop_view();
                self.pos = adjusted;
                parameters.push(parameter?);
            }
            match self.peek_value() {
                Some(Value::Comma) => {
                    self.advance();
                }
                Some(Value::RParen) => {
                    self.advance();
                    break;
                }
                _ => return Err(self.error("expected `,` or `)` in parameter list")),
            }
        }
        // `f(void)` declares no parameters.
        if parameters.len() == 1 && !is_variadic && is_bare_void(&parameters[0]) {
            parameters.clear();
        }
        Ok((parameters, is_variadic))
    }

    fn parse_parameter(&mut self) -> Result<Parameter, ParseDeclError> {
        let ty = self.parse_type()?;
        let name = match self.peek_value().cloned() {
            Some(Value::Ident(s)) => {
                self.advance();
                Some(s)
            }
            _ => None,
        };
        let default = if self.eat(&Value::Assign) {
            Some(self.raw_rest_of_view()?)
        } else {
            None
        };
        if !self.at_end() {
            return Err(self.error("unexpected token after parameter"));
        }
        Ok(Parameter { ty, name, default })
    }

    // ----- declarations -----

    fn parse_specifiers(&mut self) -> Specifiers {
        let mut specifiers = Specifiers::default();
        loop {
            let flag = match self.peek_value() {
                Some(Value::Ident(s)) if SPECIFIER_KEYWORDS.contains(&s.as_str()) => s.clone(),
                _ => break,
            };
            match flag.as_str() {
                "virtual" => specifiers.is_virtual = true,
                "static" => specifiers.is_static = true,
                "inline" => specifiers.is_inline = true,
                "constexpr" => specifiers.is_constexpr = true,
                "explicit" => specifiers.is_explicit = true,
                _ => unreachable!(),
            }
            self.advance();
        }
        specifiers
    }

    pub(crate) fn parse_function(mut self) -> Result<Signature, ParseDeclError> {
        let specifiers = self.parse_specifiers();
        let mut signature = Signature {
            specifiers,
            kind: SignatureKind::Function,
            return_type: None,
            name: Name::from_ident(""),
            parameters: Vec::new(),
            is_variadic: false,
            const_qualified: false,
            noexcept: false,
            override_qualified: false,
            final_qualified: false,
            pure_virtual: false,
            deleted: false,
            defaulted: false,
        };
        if self.eat(&Value::Tilde) {
            signature.kind = SignatureKind::Destructor;
            signature.name = self.parse_name()?;
        } else if self.peek_keyword("operator")
            && matches!(self.peek_value_at(1), Some(Value::Ident(s)) if s != "operator")
        {
            // A conversion function: `operator` followed directly by a type.
            // Overloaded operators (`bool operator==`) never reach this case
            // because their return type comes first.
            self.advance();
            let target = self.parse_type()?;
            signature.name = Name::from_ident(format!("operator {target}"));
            signature.kind = SignatureKind::Conversion(target);
        } else {
            let snapshot = self.save();
            let constructor_name = match self.parse_name() {
                Ok(name) if self.peek_value() == Some(&Value::LParen) => Some(name),
                _ => None,
            };
            match constructor_name {
                Some(name) => {
                    signature.kind = SignatureKind::Constructor;
                    signature.name = name;
                }
                None => {
                    self.restore(snapshot);
                    signature.return_type = Some(self.parse_type()?);
                    signature.name = self.parse_name()?;
                }
            }
        }
        let (parameters, is_variadic) = self.parse_parenthesized_parameters()?;
        signature.parameters = parameters;
        signature.is_variadic = is_variadic;
        self.parse_trailing_qualifiers(&mut signature)?;
        self.finish()?;
        Ok(signature)
    }

    fn parse_trailing_qualifiers(
        &mut self,
        signature: &mut Signature,
    ) -> Result<(), ParseDeclError> {
        loop {
            if self.eat_keyword("const") {
                signature.const_qualified = true;
            } else if self.eat_keyword("noexcept") {
                signature.noexcept = true;
                // A `noexcept(expr)` condition is accepted and discarded.
                if self.eat(&Value::LParen) {
                    let mut depth = 1usize;
                    while depth > 0 {
                        match self.peek_value() {
                            Some(Value::LParen) => depth += 1,
                            Some(Value::RParen) => depth -= 1,
                            None => return Err(self.error("unterminated noexcept condition")),
                            _ => {}
                        }
                        self.advance();
                    }
                }
            } else if self.eat_keyword("override") {
                signature.override_qualified = true;
            } else if self.eat_keyword("final") {
                signature.final_qualified = true;
            } else if self.eat(&Value::Assign) {
                match self.peek_value().cloned() {
                    Some(Value::Number(n)) if n == "0" => {
                        self.advance();
                        signature.pure_virtual = true;
                    }
                    Some(Value::Ident(s)) if s == "delete" => {
                        self.advance();
                        signature.deleted = true;
                    }
                    Some(Value::Ident(s)) if s == "default" => {
                        self.advance();
                        signature.defaulted = true;
                    }
                    _ => return Err(self.error("expected `0`, `delete` or `default` after `=`")),
                }
            } else {
                break;
            }
        }
        Ok(())
    }

    pub(crate) fn parse_variable(mut self) -> Result<Variable, ParseDeclError> {
        let specifiers = self.parse_specifiers();
        let ty = self.parse_type()?;
        let name = self.parse_name()?;
        let initializer = if self.eat(&Value::Assign) {
            Some(self.raw_rest_of_view()?)
        } else {
            None
        };
        self.finish()?;
        Ok(Variable {
            specifiers,
            ty,
            name,
            initializer,
        })
    }

    pub(crate) fn parse_typedef(mut self) -> Result<Typedef, ParseDeclError> {
        if self.eat_keyword("using") {
            let name = self.parse_name()?;
            self.expect(Value::Assign, "`=`")?;
            let ty = self.parse_type()?;
            self.finish()?;
            return Ok(Typedef { ty, name });
        }
        // The `typedef` keyword itself is optional: the `\typedef` command
        // already says what the declaration is.
        self.eat_keyword("typedef");
        let ty = self.parse_type()?;
        let name = self.parse_name()?;
        self.finish()?;
        Ok(Typedef { ty, name })
    }

    pub(crate) fn parse_macro(mut self) -> Result<MacroDecl, ParseDeclError> {
        let name = match self.peek_value().cloned() {
            Some(Value::Ident(s)) => {
                self.advance();
                s
            }
            _ => return Err(self.error("expected a macro name")),
        };
        if self.at_end() {
            return Ok(MacroDecl {
                name,
                parameters: None,
                is_variadic: false,
            });
        }
        self.expect(Value::LParen, "`(`")?;
        let mut parameters = Vec::new();
        let mut is_variadic = false;
        if !self.eat(&Value::RParen) {
            loop {
                match self.peek_value().cloned() {
                    Some(Value::Ident(s)) => {
                        self.advance();
                        parameters.push(s);
                    }
                    Some(Value::Ellipsis) => {
                        self.advance();
                        is_variadic = true;
                        self.expect(Value::RParen, "`)` after `...`")?;
                        break;
                    }
                    _ => return Err(self.error("expected a macro parameter")),
                }
                match self.peek_value() {
                    Some(Value::Comma) => {
                        self.advance();
                    }
                    Some(Value::RParen) => {
                        self.advance();
                        break;
                    }
                    _ => return Err(self.error("expected `,` or `)` in macro parameters")),
                }
            }
        }
        self.finish()?;
        Ok(MacroDecl {
            name,
            parameters: Some(parameters),
            is_variadic,
        })
    }

    fn finish(&mut self) -> Result<(), ParseDeclError> {
        if self.at_end() {
            Ok(())
        } else {
            Err(self.error("unexpected trailing tokens"))
        }
    }
}

fn is_builtin(ident: &str) -> bool {
    BUILTIN_KEYWORDS.contains(&ident)
}

fn is_bare_void(parameter: &Parameter) -> bool {
    parameter.name.is_none()
        && parameter.default.is_none()
        && parameter.ty
            == Type::named(Name::from_ident("void"))
}
