//! 선언 문서: desired-state 텍스트 파싱과 렌더링
//!
//! 지원하는 형식은 평평한 리소스 블록뿐입니다.
//!
//! ```text
//! resource "cdn_public_key" "test" {
//!   comment     = "comment 1"
//!   encoded_key = file("test-fixtures/cdn-public-key.pem")
//!   name        = "tf-acc-test-1234"
//! }
//! ```
//!
//! - 값은 문자열 리터럴이거나 `file("<상대 경로>")` 호출입니다.
//! - `#`, `//` 로 시작하는 줄 주석을 허용합니다.
//! - [`quote`]는 생성기가 파라미터를 안전하게 보간할 수 있도록 리터럴을 만듭니다.
//!
//! [`Renderer`]는 파싱된 문서의 `file()` 참조를 기준 디렉토리에서 읽어
//! 속성 값을 확정합니다. 파일 내용은 변형 없이 그대로 사용됩니다.

use std::collections::BTreeSet;
use std::fmt::Write as _;
use std::path::{Component, Path, PathBuf};

use driftwatch_core::types::{AttributeBag, ResourceAddress};

use crate::error::HarnessError;

/// 속성 표현식
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Expr {
    /// 문자열 리터럴
    Literal(String),
    /// `file("<path>")` 참조
    File(String),
}

/// 파싱된 리소스 블록
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceBlock {
    /// 리소스 주소
    pub address: ResourceAddress,
    /// 선언 순서대로의 속성
    pub attributes: Vec<(String, Expr)>,
    /// 블록이 시작된 줄
    pub line: usize,
}

/// 렌더링이 끝난 리소스 선언
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Declaration {
    /// 리소스 주소
    pub address: ResourceAddress,
    /// 확정된 속성 값
    pub attributes: AttributeBag,
}

/// 문자열을 문서 리터럴로 인용합니다.
///
/// 따옴표, 역슬래시, 제어 문자와 보간 시작 시퀀스(`${`, `%{`)를 이스케이프하므로
/// 어떤 입력도 리터럴 밖으로 새어 나가지 않습니다.
pub fn quote(value: &str) -> String {
    let mut out = String::with_capacity(value.len() + 2);
    out.push('"');
    let mut chars = value.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            '$' | '%' if chars.peek() == Some(&'{') => {
                out.push(c);
                out.push(c);
            }
            c if c.is_control() => {
                let _ = write!(out, "\\u{:04x}", u32::from(c));
            }
            c => out.push(c),
        }
    }
    out.push('"');
    out
}

/// 선언 문서를 파싱합니다.
///
/// # Errors
///
/// 문법 오류, 알 수 없는 블록/함수, 중복 주소나 중복 속성이 있으면
/// `HarnessError::Document`를 반환합니다.
pub fn parse(source: &str) -> Result<Vec<ResourceBlock>, HarnessError> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0 }.parse_document()
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Token {
    Ident(String),
    Str(String),
    LBrace,
    RBrace,
    LParen,
    RParen,
    Equals,
}

impl Token {
    fn describe(&self) -> String {
        match self {
            Self::Ident(s) => format!("identifier '{s}'"),
            Self::Str(_) => "string".to_owned(),
            Self::LBrace => "'{'".to_owned(),
            Self::RBrace => "'}'".to_owned(),
            Self::LParen => "'('".to_owned(),
            Self::RParen => "')'".to_owned(),
            Self::Equals => "'='".to_owned(),
        }
    }
}

fn doc_err(line: usize, reason: impl Into<String>) -> HarnessError {
    HarnessError::Document {
        line,
        reason: reason.into(),
    }
}

fn tokenize(source: &str) -> Result<Vec<(Token, usize)>, HarnessError> {
    let mut tokens = Vec::new();
    let mut line = 1;
    let mut chars = source.chars().peekable();

    while let Some(&c) = chars.peek() {
        match c {
            '\n' => {
                line += 1;
                chars.next();
            }
            c if c.is_whitespace() => {
                chars.next();
            }
            '#' => skip_line(&mut chars),
            '/' => {
                chars.next();
                if chars.peek() != Some(&'/') {
                    return Err(doc_err(line, "unexpected '/'"));
                }
                skip_line(&mut chars);
            }
            '{' | '}' | '(' | ')' | '=' => {
                chars.next();
                let token = match c {
                    '{' => Token::LBrace,
                    '}' => Token::RBrace,
                    '(' => Token::LParen,
                    ')' => Token::RParen,
                    _ => Token::Equals,
                };
                tokens.push((token, line));
            }
            '"' => {
                chars.next();
                let start_line = line;
                let value = read_string(&mut chars, start_line)?;
                tokens.push((Token::Str(value), start_line));
            }
            c if c.is_ascii_alphabetic() || c == '_' => {
                let mut ident = String::new();
                while let Some(&c) = chars.peek() {
                    if c.is_ascii_alphanumeric() || c == '_' || c == '-' {
                        ident.push(c);
                        chars.next();
                    } else {
                        break;
                    }
                }
                tokens.push((Token::Ident(ident), line));
            }
            other => return Err(doc_err(line, format!("unexpected character '{other}'"))),
        }
    }

    Ok(tokens)
}

fn skip_line(chars: &mut std::iter::Peekable<std::str::Chars<'_>>) {
    while let Some(&c) = chars.peek() {
        if c == '\n' {
            break;
        }
        chars.next();
    }
}

fn read_string(
    chars: &mut std::iter::Peekable<std::str::Chars<'_>>,
    line: usize,
) -> Result<String, HarnessError> {
    let mut value = String::new();
    loop {
        let Some(c) = chars.next() else {
            return Err(doc_err(line, "unterminated string"));
        };
        match c {
            '"' => return Ok(value),
            '\n' => return Err(doc_err(line, "newline in string literal")),
            '\\' => {
                let escaped = chars
                    .next()
                    .ok_or_else(|| doc_err(line, "unterminated escape"))?;
                match escaped {
                    'n' => value.push('\n'),
                    'r' => value.push('\r'),
                    't' => value.push('\t'),
                    '"' => value.push('"'),
                    '\\' => value.push('\\'),
                    'u' => {
                        let hex: String = chars.by_ref().take(4).collect();
                        let ch = u32::from_str_radix(&hex, 16)
                            .ok()
                            .and_then(char::from_u32)
                            .ok_or_else(|| doc_err(line, format!("invalid unicode escape '{hex}'")))?;
                        value.push(ch);
                    }
                    other => return Err(doc_err(line, format!("unknown escape '\\{other}'"))),
                }
            }
            '$' | '%' => {
                // `{` 앞의 연속된 `$`/`%` 중 마지막 두 개가 이스케이프: `$$${` 는 `$${`
                let mut run = 1;
                while chars.next_if_eq(&c).is_some() {
                    run += 1;
                }
                if chars.peek() == Some(&'{') {
                    if run == 1 {
                        return Err(doc_err(line, "template interpolation is not supported"));
                    }
                    run -= 1;
                }
                value.extend(std::iter::repeat_n(c, run));
            }
            c => value.push(c),
        }
    }
}

struct Parser {
    tokens: Vec<(Token, usize)>,
    pos: usize,
}

impl Parser {
    fn parse_document(mut self) -> Result<Vec<ResourceBlock>, HarnessError> {
        let mut blocks: Vec<ResourceBlock> = Vec::new();
        let mut seen = BTreeSet::new();

        while self.pos < self.tokens.len() {
            let block = self.parse_block()?;
            if !seen.insert(block.address.clone()) {
                return Err(doc_err(
                    block.line,
                    format!("duplicate resource {}", block.address),
                ));
            }
            blocks.push(block);
        }

        Ok(blocks)
    }

    fn parse_block(&mut self) -> Result<ResourceBlock, HarnessError> {
        let (keyword, line) = self.next_ident()?;
        if keyword != "resource" {
            return Err(doc_err(line, format!("unsupported block type '{keyword}'")));
        }
        let resource_type = self.next_string()?;
        let name = self.next_string()?;
        if resource_type.is_empty() || name.is_empty() || name.contains('.') {
            return Err(doc_err(line, "resource type and name must be non-empty identifiers"));
        }
        self.expect(&Token::LBrace)?;

        let mut attributes: Vec<(String, Expr)> = Vec::new();
        loop {
            match self.peek() {
                Some((Token::RBrace, _)) => {
                    self.pos += 1;
                    break;
                }
                Some(_) => {
                    let (key, key_line) = self.next_ident()?;
                    self.expect(&Token::Equals)?;
                    let expr = self.parse_expr()?;
                    if attributes.iter().any(|(k, _)| *k == key) {
                        return Err(doc_err(key_line, format!("duplicate attribute '{key}'")));
                    }
                    attributes.push((key, expr));
                }
                None => return Err(doc_err(line, "unterminated resource block")),
            }
        }

        Ok(ResourceBlock {
            address: ResourceAddress::new(resource_type, name),
            attributes,
            line,
        })
    }

    fn parse_expr(&mut self) -> Result<Expr, HarnessError> {
        match self.advance()? {
            (Token::Str(s), _) => Ok(Expr::Literal(s)),
            (Token::Ident(func), line) => {
                if func != "file" {
                    return Err(doc_err(line, format!("unsupported function '{func}'")));
                }
                self.expect(&Token::LParen)?;
                let path = self.next_string()?;
                self.expect(&Token::RParen)?;
                Ok(Expr::File(path))
            }
            (other, line) => Err(doc_err(
                line,
                format!("expected expression, found {}", other.describe()),
            )),
        }
    }

    fn peek(&self) -> Option<&(Token, usize)> {
        self.tokens.get(self.pos)
    }

    fn last_line(&self) -> usize {
        self.tokens.last().map(|(_, l)| *l).unwrap_or(1)
    }

    fn advance(&mut self) -> Result<(Token, usize), HarnessError> {
        let token = self
            .tokens
            .get(self.pos)
            .cloned()
            .ok_or_else(|| doc_err(self.last_line(), "unexpected end of document"))?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, expected: &Token) -> Result<(), HarnessError> {
        let (token, line) = self.advance()?;
        if &token == expected {
            Ok(())
        } else {
            Err(doc_err(
                line,
                format!("expected {}, found {}", expected.describe(), token.describe()),
            ))
        }
    }

    fn next_ident(&mut self) -> Result<(String, usize), HarnessError> {
        match self.advance()? {
            (Token::Ident(s), line) => Ok((s, line)),
            (other, line) => Err(doc_err(
                line,
                format!("expected identifier, found {}", other.describe()),
            )),
        }
    }

    fn next_string(&mut self) -> Result<String, HarnessError> {
        match self.advance()? {
            (Token::Str(s), _) => Ok(s),
            (other, line) => Err(doc_err(
                line,
                format!("expected string, found {}", other.describe()),
            )),
        }
    }
}

/// 선언 문서 렌더러
///
/// `file()` 경로는 기준 디렉토리에 대한 상대 경로여야 하며,
/// 절대 경로나 `..` 구성 요소는 거부됩니다.
#[derive(Debug, Clone)]
pub struct Renderer {
    root: PathBuf,
}

impl Renderer {
    /// 기준 디렉토리로 렌더러를 생성합니다.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// 기준 디렉토리
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// 문서를 파싱하고 모든 표현식을 확정합니다.
    pub async fn render(&self, source: &str) -> Result<Vec<Declaration>, HarnessError> {
        let blocks = parse(source)?;
        let mut declarations = Vec::with_capacity(blocks.len());

        for block in blocks {
            let mut attributes = AttributeBag::new();
            for (key, expr) in block.attributes {
                let value = match expr {
                    Expr::Literal(s) => s,
                    Expr::File(path) => self.read_fixture(&path).await?,
                };
                attributes.insert(key, value);
            }
            declarations.push(Declaration {
                address: block.address,
                attributes,
            });
        }

        Ok(declarations)
    }

    async fn read_fixture(&self, relative: &str) -> Result<String, HarnessError> {
        let path = Path::new(relative);
        if path
            .components()
            .any(|c| !matches!(c, Component::Normal(_) | Component::CurDir))
        {
            return Err(HarnessError::Render(format!(
                "file(\"{relative}\") must be a relative path inside the fixture root"
            )));
        }

        let full = self.root.join(path);
        tokio::fs::read_to_string(&full).await.map_err(|e| {
            HarnessError::Render(format!("failed to read {}: {e}", full.display()))
        })
    }
}
