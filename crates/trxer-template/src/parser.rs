use crate::ast::{
    Argument, CallExpr, EachBlockNode, Expression, IfBlockNode, IncludeNode, Node, OutputNode,
    PathExpr, Template, TextNode, UnlessBlockNode, UnsecureBlockNode,
};
use crate::error::{Location, Result, TemplateError};
use crate::token::{Token, TokenKind};
use crate::validator;

/// Recursive descent parser for report templates
pub struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

impl Parser {
    /// Create a new parser from a token stream
    pub fn new(tokens: Vec<Token>) -> Self {
        Self { tokens, pos: 0 }
    }

    /// Parse the token stream into an AST
    pub fn parse(&mut self) -> Result<Template> {
        let nodes = self.parse_nodes()?;
        if !self.is_eof() {
            return self.unexpected_token(Some("Unexpected block close"));
        }
        Ok(Template {
            nodes,
            location: Location::new(1, 1),
        })
    }

    fn parse_nodes(&mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while !self.is_eof() && !self.block_close(None)? {
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn parse_node(&mut self) -> Result<Node> {
        match &self.current_token().kind {
            TokenKind::Text(_) => self.parse_text(),
            TokenKind::Open => self.parse_mustache(),
            _ => self.unexpected_token(None),
        }
    }

    fn parse_text(&mut self) -> Result<Node> {
        let token = self.current_token().clone();
        match token.kind {
            TokenKind::Text(content) => {
                self.advance_token();
                Ok(Node::Text(TextNode {
                    content,
                    location: token.location,
                }))
            }
            other => Err(TemplateError::ParseError {
                message: format!("Expected text, got {:?}", other),
                location: token.location,
            }),
        }
    }

    fn parse_mustache(&mut self) -> Result<Node> {
        let open_token = self.consume(TokenKind::Open)?;

        // Whitespace between {[ and #, / or > is illegal
        if matches!(self.current_token().kind, TokenKind::Whitespace(_)) {
            let saved_pos = self.pos;
            self.skip_whitespace();
            let is_special = matches!(
                self.current_token().kind,
                TokenKind::Hash | TokenKind::Slash | TokenKind::Gt
            );
            if is_special {
                return Err(TemplateError::ParseError {
                    message: format!(
                        "Whitespace not allowed after '{{[' before '{:?}'",
                        self.current_token().kind
                    ),
                    location: open_token.location,
                });
            }
            self.pos = saved_pos;
        }

        self.skip_whitespace();

        match &self.current_token().kind {
            TokenKind::Hash => self.parse_block_open(),
            TokenKind::Slash => self.unexpected_token(Some("Unexpected block close")),
            TokenKind::Gt => self.parse_include(),
            _ => self.parse_output_node(),
        }
    }

    fn parse_block_open(&mut self) -> Result<Node> {
        self.consume(TokenKind::Hash)?;
        self.skip_whitespace();

        match &self.current_token().kind {
            TokenKind::KwIf => self.parse_if_block(),
            TokenKind::KwUnless => self.parse_unless_block(),
            TokenKind::KwEach => self.parse_each_block(),
            TokenKind::KwUnsecure => self.parse_unsecure_block(),
            TokenKind::KwElse => self.unexpected_token(Some("Unexpected 'else' without 'if'")),
            _ => self.unexpected_token(None),
        }
    }

    fn parse_if_block(&mut self) -> Result<Node> {
        let location = self.consume(TokenKind::KwIf)?.location;

        self.consume_required_whitespace()?;
        let condition = self.parse_expression()?;
        self.skip_whitespace();
        self.consume(TokenKind::Close)?;

        let then_nodes = self.parse_if_body()?;
        let else_nodes = if self.else_open()? {
            self.consume_else()?;
            Some(self.parse_if_body()?)
        } else {
            None
        };

        self.consume_block_close(Some(TokenKind::KwIf))?;

        Ok(Node::IfBlock(IfBlockNode {
            condition,
            then_nodes,
            else_nodes,
            location,
        }))
    }

    fn parse_if_body(&mut self) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while !self.block_close(Some(TokenKind::KwIf))? && !self.else_open()? {
            self.ensure_not_eof("if")?;
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn parse_unless_block(&mut self) -> Result<Node> {
        let location = self.consume(TokenKind::KwUnless)?.location;

        self.consume_required_whitespace()?;
        let condition = self.parse_expression()?;
        self.skip_whitespace();
        self.consume(TokenKind::Close)?;

        let body_nodes = self.parse_block_body(TokenKind::KwUnless, "unless")?;
        self.consume_block_close(Some(TokenKind::KwUnless))?;

        Ok(Node::UnlessBlock(UnlessBlockNode {
            condition,
            body_nodes,
            location,
        }))
    }

    fn else_open(&mut self) -> Result<bool> {
        if !matches!(self.current_token().kind, TokenKind::Open) {
            return Ok(false);
        }

        let saved_pos = self.pos;
        self.advance_token();

        if matches!(self.current_token().kind, TokenKind::Whitespace(_)) {
            self.pos = saved_pos;
            return Ok(false);
        }

        let result = if matches!(self.current_token().kind, TokenKind::Hash) {
            self.advance_token();
            self.skip_whitespace();
            matches!(self.current_token().kind, TokenKind::KwElse)
        } else {
            false
        };

        self.pos = saved_pos;
        Ok(result)
    }

    fn consume_else(&mut self) -> Result<()> {
        self.consume(TokenKind::Open)?;
        self.skip_whitespace();
        self.consume(TokenKind::Hash)?;
        self.skip_whitespace();
        self.consume(TokenKind::KwElse)?;
        self.skip_whitespace();
        self.consume(TokenKind::Close)?;
        Ok(())
    }

    fn parse_each_block(&mut self) -> Result<Node> {
        let location = self.consume(TokenKind::KwEach)?.location;

        self.consume_required_whitespace()?;
        let collection = self.parse_path()?;
        self.consume_required_whitespace()?;
        self.consume(TokenKind::KwAs)?;
        self.consume_required_whitespace()?;
        let item_name = self.parse_identifier_with_validation()?;

        self.skip_whitespace();
        let index_name = if matches!(self.current_token().kind, TokenKind::Comma) {
            self.consume(TokenKind::Comma)?;
            self.skip_whitespace();
            let idx = self.parse_identifier_with_validation()?;

            if item_name == idx {
                return Err(TemplateError::ParseError {
                    message: format!("Item and index cannot have the same name: '{}'", item_name),
                    location,
                });
            }

            Some(idx)
        } else {
            None
        };

        self.skip_whitespace();
        self.consume(TokenKind::Close)?;

        let body_nodes = self.parse_block_body(TokenKind::KwEach, "each")?;
        self.consume_block_close(Some(TokenKind::KwEach))?;

        Ok(Node::EachBlock(EachBlockNode {
            collection,
            item_name,
            index_name,
            body_nodes,
            location,
        }))
    }

    fn parse_unsecure_block(&mut self) -> Result<Node> {
        let location = self.consume(TokenKind::KwUnsecure)?.location;

        self.skip_whitespace();
        self.consume(TokenKind::Close)?;

        let nodes = self.parse_block_body(TokenKind::KwUnsecure, "unsecure")?;
        self.consume_block_close(Some(TokenKind::KwUnsecure))?;

        Ok(Node::UnsecureBlock(UnsecureBlockNode { nodes, location }))
    }

    fn parse_block_body(&mut self, keyword: TokenKind, name: &str) -> Result<Vec<Node>> {
        let mut nodes = Vec::new();
        while !self.block_close(Some(keyword.clone()))? {
            self.ensure_not_eof(name)?;
            nodes.push(self.parse_node()?);
        }
        Ok(nodes)
    }

    fn parse_include(&mut self) -> Result<Node> {
        let location = self.consume(TokenKind::Gt)?.location;

        self.skip_whitespace();
        let name = self.parse_include_name()?;
        let args = self.parse_include_args()?;
        self.skip_whitespace();
        self.consume(TokenKind::Close)?;

        Ok(Node::Include(IncludeNode {
            name,
            args,
            location,
        }))
    }

    fn parse_include_name(&mut self) -> Result<String> {
        let token = self.current_token().clone();
        let name = match &token.kind {
            TokenKind::Ident(s) if s.starts_with('/') => s.clone(),
            _ => {
                return Err(TemplateError::ParseError {
                    message: "Include name must start with '/'".to_string(),
                    location: token.location,
                });
            }
        };

        validator::validate_include_name_syntax(&name, &token.location)?;
        self.advance_token();
        Ok(name)
    }

    fn parse_include_args(&mut self) -> Result<Vec<(String, PathExpr)>> {
        let mut args: Vec<(String, PathExpr)> = Vec::new();

        while matches!(self.current_token().kind, TokenKind::Whitespace(_)) {
            self.skip_whitespace();

            let is_arg = matches!(&self.current_token().kind, TokenKind::Ident(s) if !s.starts_with('/'));
            if !is_arg {
                break;
            }

            let key_location = self.current_token().location;
            let key = self.parse_identifier_with_validation()?;

            if args.iter().any(|(existing, _)| *existing == key) {
                return Err(TemplateError::ParseError {
                    message: format!("Duplicate include argument: {}", key),
                    location: key_location,
                });
            }

            self.skip_whitespace();
            self.consume(TokenKind::Equal)?;
            self.skip_whitespace();
            let value = self.parse_path()?;
            args.push((key, value));
        }

        Ok(args)
    }

    fn parse_output_node(&mut self) -> Result<Node> {
        let expr = self.parse_expression()?;
        self.skip_whitespace();
        self.consume(TokenKind::Close)?;
        let location = expr.location();
        Ok(Node::Output(OutputNode { expr, location }))
    }

    /// A path, or a function call when the first identifier is followed by `(`
    fn parse_expression(&mut self) -> Result<Expression> {
        let location = self.current_token().location;
        let first = self.parse_identifier_with_validation()?;

        if matches!(self.current_token().kind, TokenKind::LParen) {
            let args = self.parse_call_args()?;
            return Ok(Expression::Call(CallExpr {
                name: first,
                args,
                location,
            }));
        }

        let segments = self.parse_path_rest(first)?;
        Ok(Expression::Path(PathExpr { segments, location }))
    }

    fn parse_call_args(&mut self) -> Result<Vec<Argument>> {
        self.consume(TokenKind::LParen)?;
        self.skip_whitespace();

        let mut args = Vec::new();
        if matches!(self.current_token().kind, TokenKind::RParen) {
            self.advance_token();
            return Ok(args);
        }

        loop {
            let arg = match &self.current_token().kind {
                TokenKind::StringLit(s) => {
                    let literal = s.clone();
                    self.advance_token();
                    Argument::Literal(literal)
                }
                _ => Argument::Path(self.parse_path()?),
            };
            args.push(arg);

            self.skip_whitespace();
            match self.current_token().kind {
                TokenKind::Comma => {
                    self.advance_token();
                    self.skip_whitespace();
                }
                TokenKind::RParen => {
                    self.advance_token();
                    break;
                }
                _ => return self.unexpected_token(Some("Expected ',' or ')' in argument list")),
            }
        }

        Ok(args)
    }

    fn parse_path(&mut self) -> Result<PathExpr> {
        let location = self.current_token().location;
        let first = self.parse_identifier_with_validation()?;
        let segments = self.parse_path_rest(first)?;
        Ok(PathExpr { segments, location })
    }

    fn parse_path_rest(&mut self, first: String) -> Result<Vec<String>> {
        let mut segments = vec![first];
        while matches!(self.current_token().kind, TokenKind::Dot) {
            self.consume(TokenKind::Dot)?;
            segments.push(self.parse_identifier_with_validation()?);
        }
        Ok(segments)
    }

    fn parse_identifier_with_validation(&mut self) -> Result<String> {
        let token = self.current_token().clone();

        if let Some(word) = Self::keyword_to_string(&token.kind) {
            self.advance_token();
            return Err(TemplateError::ReservedWordError {
                word: word.to_string(),
                location: token.location,
            });
        }

        let name = match &token.kind {
            TokenKind::Ident(s) if !s.starts_with('/') => s.clone(),
            other => {
                return Err(TemplateError::ParseError {
                    message: format!("Expected identifier, got {:?}", other),
                    location: token.location,
                });
            }
        };
        self.advance_token();

        validator::validate_identifier(&name, &token.location)?;
        Ok(name)
    }

    fn keyword_to_string(kind: &TokenKind) -> Option<&'static str> {
        match kind {
            TokenKind::KwIf => Some("if"),
            TokenKind::KwUnless => Some("unless"),
            TokenKind::KwElse => Some("else"),
            TokenKind::KwEach => Some("each"),
            TokenKind::KwAs => Some("as"),
            TokenKind::KwUnsecure => Some("unsecure"),
            _ => None,
        }
    }

    fn block_close(&mut self, keyword: Option<TokenKind>) -> Result<bool> {
        if !matches!(self.current_token().kind, TokenKind::Open) {
            return Ok(false);
        }

        let saved_pos = self.pos;
        self.advance_token();

        if matches!(self.current_token().kind, TokenKind::Whitespace(_)) {
            self.pos = saved_pos;
            return Ok(false);
        }

        let result = if matches!(self.current_token().kind, TokenKind::Slash) {
            if let Some(kw) = keyword {
                self.advance_token();
                self.skip_whitespace();
                self.current_token().kind == kw
            } else {
                true
            }
        } else {
            false
        };

        self.pos = saved_pos;
        Ok(result)
    }

    fn consume_block_close(&mut self, keyword: Option<TokenKind>) -> Result<()> {
        self.consume(TokenKind::Open)?;
        self.skip_whitespace();
        self.consume(TokenKind::Slash)?;
        self.skip_whitespace();
        if let Some(kw) = keyword {
            self.consume(kw)?;
        }
        self.skip_whitespace();
        self.consume(TokenKind::Close)?;
        Ok(())
    }

    fn ensure_not_eof(&self, block: &str) -> Result<()> {
        if self.is_eof() {
            return Err(TemplateError::ParseError {
                message: format!("Unclosed '{}' block", block),
                location: self.current_token().location,
            });
        }
        Ok(())
    }

    fn current_token(&self) -> &Token {
        &self.tokens[self.pos]
    }

    fn is_eof(&self) -> bool {
        matches!(self.current_token().kind, TokenKind::Eof)
    }

    fn advance_token(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn consume(&mut self, expected: TokenKind) -> Result<Token> {
        let token = self.current_token().clone();
        if std::mem::discriminant(&token.kind) != std::mem::discriminant(&expected) {
            return Err(TemplateError::ParseError {
                message: format!("Expected {:?}, got {:?}", expected, token.kind),
                location: token.location,
            });
        }
        self.advance_token();
        Ok(token)
    }

    fn consume_required_whitespace(&mut self) -> Result<()> {
        if !matches!(self.current_token().kind, TokenKind::Whitespace(_)) {
            return Err(TemplateError::ParseError {
                message: "Expected whitespace".to_string(),
                location: self.current_token().location,
            });
        }
        self.skip_whitespace();
        Ok(())
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.current_token().kind, TokenKind::Whitespace(_)) {
            self.advance_token();
        }
    }

    fn unexpected_token<T>(&self, message: Option<&str>) -> Result<T> {
        let token = self.current_token();
        let msg = match message {
            Some(m) => format!("{}: {:?}", m, token.kind),
            None => format!("Unexpected token: {:?}", token.kind),
        };
        Err(TemplateError::ParseError {
            message: msg,
            location: token.location,
        })
    }
}
