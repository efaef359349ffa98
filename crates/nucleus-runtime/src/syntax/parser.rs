//! Recursive-descent parser for the generated-source dialect.

use std::ops::Range;

use super::ParseError;
use super::ast::{
    ClassDecl, ClassMember, ConstDecl, Expr, FunctionDecl, ImportDecl, ImportName,
    InterfaceDecl, InterfaceField, Item, Module, Param, Stmt, TypeAliasDecl, TypeAnn,
};
use super::lexer::{LineIndex, Token, tokenize, unquote};

type PResult<T> = Result<T, ParseError>;

/// Deepest nesting of expressions and type annotations, counting each call,
/// member access and array suffix as a level.
pub const MAX_NESTING: usize = 256;

/// Parses a whole source file.
///
/// An item that fails to parse is recorded in [`Module::errors`] and skipped;
/// parsing resumes at the next top-level declaration.
#[must_use]
pub fn parse_module(input: &str) -> Module {
    let lines = LineIndex::new(input);
    let (tokens, mut errors) = tokenize(input, &lines);
    let mut parser = Parser::new(tokens, input.len(), lines);

    let mut items = Vec::new();
    while !parser.at_end() {
        let start = parser.pos;
        match parser.item() {
            Ok(item) => items.push(item),
            Err(err) => {
                tracing::debug!(line = err.line, column = err.column, "{}", err.message);
                errors.push(err);
                parser.recover(start);
            }
        }
    }

    errors.sort_by_key(|err| (err.line, err.column));
    Module { items, errors }
}

/// Parses a standalone type annotation such as `[u32, string, bool]`.
///
/// # Errors
///
/// Returns error if `input` is not exactly one type annotation.
pub fn parse_type(input: &str) -> Result<TypeAnn, ParseError> {
    let lines = LineIndex::new(input);
    let (tokens, errors) = tokenize(input, &lines);
    if let Some(err) = errors.into_iter().next() {
        return Err(err);
    }
    let mut parser = Parser::new(tokens, input.len(), lines);
    let ty = parser.type_ann()?;
    if !parser.at_end() {
        return Err(parser.error(&format!(
            "unexpected {} after type",
            describe(parser.peek())
        )));
    }
    Ok(ty)
}

struct Parser<'src> {
    tokens: Vec<(Token<'src>, Range<usize>)>,
    pos: usize,
    input_len: usize,
    lines: LineIndex,
    depth: usize,
}

impl<'src> Parser<'src> {
    const fn new(
        tokens: Vec<(Token<'src>, Range<usize>)>,
        input_len: usize,
        lines: LineIndex,
    ) -> Self {
        Self {
            tokens,
            pos: 0,
            input_len,
            lines,
            depth: 0,
        }
    }

    fn at_end(&self) -> bool {
        self.pos >= self.tokens.len()
    }

    fn peek(&self) -> Option<&Token<'src>> {
        self.tokens.get(self.pos).map(|(t, _)| t)
    }

    fn peek_at(&self, offset: usize) -> Option<&Token<'src>> {
        self.tokens.get(self.pos + offset).map(|(t, _)| t)
    }

    fn check(&self, expected: &Token<'src>) -> bool {
        self.peek() == Some(expected)
    }

    fn eat(&mut self, expected: &Token<'src>) -> bool {
        if self.check(expected) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    fn expect(&mut self, expected: &Token<'src>) -> PResult<()> {
        if self.eat(expected) {
            Ok(())
        } else {
            Err(self.error(&format!(
                "expected {}, found {}",
                describe(Some(expected)),
                describe(self.peek())
            )))
        }
    }

    fn error(&self, message: &str) -> ParseError {
        let offset = self
            .tokens
            .get(self.pos)
            .map_or(self.input_len, |(_, span)| span.start);
        let (line, column) = self.lines.position(offset);
        ParseError {
            line,
            column,
            message: message.to_string(),
        }
    }

    /// Skips the broken item starting at `start`.
    ///
    /// Stops at the next item keyword outside any braces.
    fn recover(&mut self, start: usize) {
        self.pos = start;
        while matches!(self.peek(), Some(Token::Export | Token::Async)) {
            self.pos += 1;
        }
        self.pos += 1;

        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token {
                Token::LBrace => depth += 1,
                Token::RBrace => depth = depth.saturating_sub(1),
                t if depth == 0 && t.starts_item() => return,
                _ => {}
            }
            self.pos += 1;
        }
    }

    fn enter(&mut self) -> PResult<()> {
        if self.depth >= MAX_NESTING {
            return Err(self.error(&format!("nesting exceeds {MAX_NESTING} levels")));
        }
        self.depth += 1;
        Ok(())
    }

    /// Runs `parse`, restoring the nesting depth afterwards.
    fn nested<T>(&mut self, parse: impl FnOnce(&mut Self) -> PResult<T>) -> PResult<T> {
        let saved = self.depth;
        let result = parse(self);
        self.depth = saved;
        result
    }

    fn ident(&mut self) -> PResult<String> {
        match self.peek() {
            Some(Token::Ident(name)) => {
                let name = (*name).to_string();
                self.pos += 1;
                Ok(name)
            }
            other => Err(self.error(&format!(
                "expected identifier, found {}",
                describe(other)
            ))),
        }
    }

    fn property_name(&mut self) -> PResult<String> {
        let name = match self.peek() {
            Some(Token::Ident(name) | Token::Number(name)) => (*name).to_string(),
            Some(Token::Str(raw)) => unquote(raw),
            other => match other.and_then(Token::keyword) {
                Some(keyword) => keyword.to_string(),
                None => {
                    return Err(self.error(&format!(
                        "expected property name, found {}",
                        describe(other)
                    )));
                }
            },
        };
        self.pos += 1;
        Ok(name)
    }

    fn list<T>(
        &mut self,
        close: &Token<'src>,
        mut element: impl FnMut(&mut Self) -> PResult<T>,
    ) -> PResult<Vec<T>> {
        let mut items = Vec::new();
        while !self.check(close) && !self.at_end() {
            items.push(element(self)?);
            if !self.eat(&Token::Comma) {
                break;
            }
        }
        self.expect(close)?;
        Ok(items)
    }

    fn end_statement(&mut self) {
        self.eat(&Token::Semicolon);
    }

    fn item(&mut self) -> PResult<Item> {
        let exported = self.eat(&Token::Export);
        match self.peek() {
            Some(Token::Import) if !exported => self.import().map(Item::Import),
            Some(Token::Async | Token::Function) => self.function(exported).map(Item::Function),
            Some(Token::Class) => self.class().map(Item::Class),
            Some(Token::Const | Token::Let) => self.constant().map(Item::Const),
            Some(Token::Interface) => self.interface().map(Item::Interface),
            Some(Token::Type) => self.type_alias().map(Item::TypeAlias),
            other => Err(self.error(&format!(
                "expected declaration, found {}",
                describe(other)
            ))),
        }
    }

    fn import(&mut self) -> PResult<ImportDecl> {
        self.expect(&Token::Import)?;
        self.expect(&Token::LBrace)?;
        let names = self.list(&Token::RBrace, |p| {
            let imported = p.property_name()?;
            let local = if p.eat(&Token::As) {
                p.ident()?
            } else {
                imported.clone()
            };
            Ok(ImportName { imported, local })
        })?;
        self.expect(&Token::From)?;
        let module = match self.peek() {
            Some(Token::Str(raw)) => unquote(raw),
            other => {
                return Err(self.error(&format!(
                    "expected module string, found {}",
                    describe(other)
                )));
            }
        };
        self.pos += 1;
        self.end_statement();
        Ok(ImportDecl { names, module })
    }

    fn function(&mut self, exported: bool) -> PResult<FunctionDecl> {
        let is_async = self.eat(&Token::Async);
        self.expect(&Token::Function)?;
        let name = self.ident()?;
        self.expect(&Token::LParen)?;
        let params = self.list(&Token::RParen, |p| {
            let name = p.ident()?;
            p.eat(&Token::Question);
            let ty = if p.eat(&Token::Colon) {
                Some(p.type_ann()?)
            } else {
                None
            };
            Ok(Param { name, ty })
        })?;
        let return_type = if self.eat(&Token::Colon) {
            Some(self.type_ann()?)
        } else {
            None
        };

        self.expect(&Token::LBrace)?;
        let mut body = Vec::new();
        while !self.check(&Token::RBrace) && !self.at_end() {
            body.push(self.statement()?);
        }
        self.expect(&Token::RBrace)?;

        Ok(FunctionDecl {
            name,
            exported,
            is_async,
            params,
            return_type,
            body,
        })
    }

    fn statement(&mut self) -> PResult<Stmt> {
        let stmt = match self.peek() {
            Some(Token::Return) => {
                self.pos += 1;
                if matches!(self.peek(), Some(Token::Semicolon | Token::RBrace) | None) {
                    Stmt::Return(None)
                } else {
                    Stmt::Return(Some(self.expr()?))
                }
            }
            Some(Token::Const | Token::Let) => {
                self.pos += 1;
                let name = self.ident()?;
                if self.eat(&Token::Colon) {
                    self.type_ann()?;
                }
                self.expect(&Token::Eq)?;
                Stmt::Let {
                    name,
                    value: self.expr()?,
                }
            }
            _ => Stmt::Expr(self.expr()?),
        };
        self.end_statement();
        Ok(stmt)
    }

    fn generic_params(&mut self) -> PResult<Vec<String>> {
        if self.eat(&Token::LAngle) {
            self.list(&Token::RAngle, Self::ident)
        } else {
            Ok(Vec::new())
        }
    }

    fn class(&mut self) -> PResult<ClassDecl> {
        self.expect(&Token::Class)?;
        let name = self.ident()?;
        let generics = self.generic_params()?;
        self.expect(&Token::Extends)?;
        let base = self.ident()?;
        self.expect(&Token::LBrace)?;

        let mut members = Vec::new();
        while !self.check(&Token::RBrace) && !self.at_end() {
            let name = self.property_name()?;
            self.expect(&Token::Colon)?;
            let value = self.expr()?;
            if !self.eat(&Token::Semicolon) {
                self.eat(&Token::Comma);
            }
            members.push(ClassMember { name, value });
        }
        self.expect(&Token::RBrace)?;

        Ok(ClassDecl {
            name,
            generics,
            base,
            members,
        })
    }

    fn constant(&mut self) -> PResult<ConstDecl> {
        self.pos += 1;
        let name = self.ident()?;
        let generics = self.generic_params()?;
        let ty = if self.eat(&Token::Colon) {
            Some(self.type_ann()?)
        } else {
            None
        };
        self.expect(&Token::Eq)?;
        let value = self.expr()?;
        self.end_statement();
        Ok(ConstDecl {
            name,
            generics,
            ty,
            value,
        })
    }

    fn interface(&mut self) -> PResult<InterfaceDecl> {
        self.expect(&Token::Interface)?;
        let name = self.ident()?;
        let generics = self.generic_params()?;
        let fields = self.object_fields()?;
        Ok(InterfaceDecl {
            name,
            generics,
            fields,
        })
    }

    fn type_alias(&mut self) -> PResult<TypeAliasDecl> {
        self.expect(&Token::Type)?;
        let name = self.ident()?;
        let generics = self.generic_params()?;
        self.expect(&Token::Eq)?;
        let ty = self.type_ann()?;
        self.end_statement();
        Ok(TypeAliasDecl { name, generics, ty })
    }

    fn object_fields(&mut self) -> PResult<Vec<InterfaceField>> {
        self.expect(&Token::LBrace)?;
        let mut fields = Vec::new();
        while !self.check(&Token::RBrace) && !self.at_end() {
            let name = self.property_name()?;
            let optional = self.eat(&Token::Question);
            self.expect(&Token::Colon)?;
            let ty = self.type_ann()?;
            if !self.eat(&Token::Semicolon) {
                self.eat(&Token::Comma);
            }
            fields.push(InterfaceField { name, optional, ty });
        }
        self.expect(&Token::RBrace)?;
        Ok(fields)
    }

    fn type_ann(&mut self) -> PResult<TypeAnn> {
        self.nested(Self::union_type)
    }

    fn union_type(&mut self) -> PResult<TypeAnn> {
        self.enter()?;
        self.eat(&Token::Pipe);
        let mut variants = vec![self.postfix_type()?];
        while self.eat(&Token::Pipe) {
            variants.push(self.postfix_type()?);
        }
        if variants.len() == 1 {
            Ok(variants.remove(0))
        } else {
            Ok(TypeAnn::Union { variants })
        }
    }

    fn postfix_type(&mut self) -> PResult<TypeAnn> {
        let mut ty = self.primary_type()?;
        while self.check(&Token::LBracket) && self.peek_at(1) == Some(&Token::RBracket) {
            self.enter()?;
            self.pos += 2;
            ty = TypeAnn::Array { elem: Box::new(ty) };
        }
        Ok(ty)
    }

    fn primary_type(&mut self) -> PResult<TypeAnn> {
        match self.peek() {
            Some(Token::Ident(_)) => {
                let name = self.ident()?;
                let args = if self.eat(&Token::LAngle) {
                    self.list(&Token::RAngle, Self::type_ann)?
                } else {
                    Vec::new()
                };
                Ok(TypeAnn::Named { name, args })
            }
            Some(Token::Null) => {
                self.pos += 1;
                Ok(TypeAnn::Null)
            }
            Some(Token::LBracket) => {
                self.pos += 1;
                let items = self.list(&Token::RBracket, Self::type_ann)?;
                Ok(TypeAnn::Tuple { items })
            }
            Some(Token::LBrace) => Ok(TypeAnn::Object {
                fields: self.object_fields()?,
            }),
            Some(Token::Str(text) | Token::Number(text)) => {
                let text = (*text).to_string();
                self.pos += 1;
                Ok(TypeAnn::Literal { text })
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let ty = self.type_ann()?;
                self.expect(&Token::RParen)?;
                Ok(ty)
            }
            other => Err(self.error(&format!("expected type, found {}", describe(other)))),
        }
    }

    fn expr(&mut self) -> PResult<Expr> {
        self.nested(Self::chain)
    }

    fn chain(&mut self) -> PResult<Expr> {
        self.enter()?;
        if self.eat(&Token::Await) {
            return Ok(Expr::Await(Box::new(self.expr()?)));
        }
        let mut expr = self.primary()?;
        loop {
            if self.eat(&Token::Dot) {
                self.enter()?;
                let property = self.property_name()?;
                expr = Expr::Member {
                    object: Box::new(expr),
                    property,
                };
            } else if self.eat(&Token::LParen) {
                self.enter()?;
                let args = self.list(&Token::RParen, Self::expr)?;
                expr = Expr::Call {
                    callee: Box::new(expr),
                    args,
                };
            } else {
                return Ok(expr);
            }
        }
    }

    fn primary(&mut self) -> PResult<Expr> {
        let expr = match self.peek() {
            Some(Token::Ident(name)) => Expr::Ident((*name).to_string()),
            Some(Token::Number(text)) => Expr::Number((*text).to_string()),
            Some(Token::Str(raw)) => Expr::Str(unquote(raw)),
            Some(Token::True) => Expr::Bool(true),
            Some(Token::False) => Expr::Bool(false),
            Some(Token::Null) => Expr::Null,
            Some(Token::LBracket) => {
                self.pos += 1;
                return self.list(&Token::RBracket, Self::expr).map(Expr::Array);
            }
            Some(Token::LBrace) => {
                self.pos += 1;
                return self
                    .list(&Token::RBrace, |p| {
                        let key = p.property_name()?;
                        let value = if p.eat(&Token::Colon) {
                            p.expr()?
                        } else {
                            Expr::Ident(key.clone())
                        };
                        Ok((key, value))
                    })
                    .map(Expr::Object);
            }
            Some(Token::LParen) => {
                self.pos += 1;
                let inner = self.expr()?;
                self.expect(&Token::RParen)?;
                return Ok(inner);
            }
            other => {
                return Err(self.error(&format!(
                    "expected expression, found {}",
                    describe(other)
                )));
            }
        };
        self.pos += 1;
        Ok(expr)
    }
}

fn describe(token: Option<&Token<'_>>) -> String {
    let Some(token) = token else {
        return "end of input".to_string();
    };
    if let Some(keyword) = token.keyword() {
        return format!("'{keyword}'");
    }
    let symbol = match token {
        Token::Ident(name) => return format!("identifier '{name}'"),
        Token::Number(text) | Token::Str(text) => return format!("'{text}'"),
        Token::LBrace => "{",
        Token::RBrace => "}",
        Token::LParen => "(",
        Token::RParen => ")",
        Token::LBracket => "[",
        Token::RBracket => "]",
        Token::LAngle => "<",
        Token::RAngle => ">",
        Token::Comma => ",",
        Token::Semicolon => ";",
        Token::Colon => ":",
        Token::Dot => ".",
        Token::Eq => "=",
        Token::Pipe => "|",
        Token::Question => "?",
        _ => "token",
    };
    format!("'{symbol}'")
}

#[cfg(test)]
mod tests {
    use super::*;

    const SOURCE: &str = r#"// Generated from the ABI of a nucleus. Do not edit by hand.
import { Struct, U32 as Word } from "@nucleus/codec";

function _call(method, name, output, args) { return Nucleus.request(method, name, output, args); }

export interface Point {
  x: u32;
  from?: Word;
}

export class Point extends Struct {
  x: Word;
  "0": Vec.with(Word);
}

export type Pair<T> = [T, T];
export const Pair<T> = Tuple.with(T, T);

export async function distance(a: Point, b: Point): u32 {
  return _call("get", "distance", Word, [_encode(Point, a), _encode(Point, b)]);
}
"#;

    #[test]
    fn test_parse_generated_items() {
        let module = parse_module(SOURCE);
        assert!(module.errors.is_empty(), "{:?}", module.errors);
        let names: Vec<_> = module.items.iter().map(Item::name).collect();
        assert_eq!(
            names,
            vec![
                None,
                Some("_call"),
                Some("Point"),
                Some("Point"),
                Some("Pair"),
                Some("Pair"),
                Some("distance"),
            ]
        );

        let Item::Import(import) = &module.items[0] else {
            panic!("expected import");
        };
        assert_eq!(import.module, "@nucleus/codec");
        assert_eq!(import.names[1].imported, "U32");
        assert_eq!(import.names[1].local, "Word");
    }

    #[test]
    fn test_parse_interface_fields() {
        let module = parse_module(SOURCE);
        let Item::Interface(point) = &module.items[2] else {
            panic!("expected interface");
        };
        assert_eq!(point.fields[1].name, "from");
        assert!(point.fields[1].optional);
        assert_eq!(point.fields[1].ty, TypeAnn::named("Word"));
    }

    #[test]
    fn test_parse_class_members() {
        let module = parse_module(SOURCE);
        let Item::Class(class) = &module.items[3] else {
            panic!("expected class");
        };
        assert_eq!(class.base, "Struct");
        assert_eq!(class.members[1].name, "0");
        assert!(class.members[1].value.is_factory_call());
    }

    #[test]
    fn test_parse_function_signature() {
        let module = parse_module(SOURCE);
        let function = module.functions().find(|f| f.name == "distance").unwrap();
        assert!(function.exported);
        assert!(function.is_async);
        assert_eq!(function.params.len(), 2);
        assert_eq!(function.params[0].ty, Some(TypeAnn::named("Point")));
        assert_eq!(function.return_type, Some(TypeAnn::named("u32")));
        assert!(matches!(function.body[0], Stmt::Return(Some(Expr::Call { .. }))));
    }

    #[test]
    fn test_recovers_after_broken_item() {
        let source = "export class Broken extends Struct { x: ; }\nexport const A = U32;\nexport function f( { }\nexport const B = U8;";
        let module = parse_module(source);
        let names: Vec<_> = module.items.iter().filter_map(Item::name).collect();
        assert_eq!(names, vec!["A", "B"]);
        assert_eq!(module.errors.len(), 2);
        assert_eq!(module.errors[0].line, 1);
        assert_eq!(module.errors[1].line, 3);
    }

    #[test]
    fn test_deep_nesting_is_a_parse_error() {
        let depth = MAX_NESTING * 4;
        let source = format!(
            "export const Deep = {}U8{};\nexport const Shallow = Vec.with(Vec.with(U8));",
            "Vec.with(".repeat(depth),
            ")".repeat(depth)
        );
        let module = parse_module(&source);
        assert_eq!(module.errors.len(), 1);
        assert!(module.errors[0].message.contains("nesting"));
        let names: Vec<_> = module.items.iter().filter_map(Item::name).collect();
        assert_eq!(names, vec!["Shallow"]);

        let ty = format!("{}u8{}", "Vec<".repeat(depth), ">".repeat(depth));
        assert!(parse_type(&ty).unwrap_err().message.contains("nesting"));
        assert!(parse_type(&format!("u8{}", "[]".repeat(depth))).is_err());
        assert!(parse_type("Vec<Vec<u8[]>>").is_ok());
    }

    #[test]
    fn test_parse_type_tuple() {
        let ty = parse_type("[u32, string, bool]").unwrap();
        assert_eq!(
            ty,
            TypeAnn::Tuple {
                items: vec![
                    TypeAnn::named("u32"),
                    TypeAnn::named("string"),
                    TypeAnn::named("bool"),
                ]
            }
        );
    }

    #[test]
    fn test_parse_type_union_and_arrays() {
        let ty = parse_type("{ Circle: u32 } | { Empty: null }").unwrap();
        assert!(matches!(ty, TypeAnn::Union { ref variants } if variants.len() == 2));

        let nested = parse_type("Option<[u8, u8][]>").unwrap();
        assert_eq!(nested.to_string(), "Option<[u8, u8][]>");
    }

    #[test]
    fn test_parse_type_rejects_trailing_tokens() {
        assert!(parse_type("u32 u8").is_err());
        assert!(parse_type("").is_err());
    }
}
