use heapless::Vec;

use crate::assembler::{AssemblerError, AssemblerErrorKind};
use crate::Register;

pub const MAX_TOKENS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Token<'s> {
    /// `name:` at the start of a line.
    LabelDef(&'s str),
    Mnemonic(&'s str),
    Register(Register),
    /// Literal as written, range checked by the assembler.
    Number(i64),
    LabelRef(&'s str),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line<'s> {
    pub number: u32,
    pub tokens: Vec<Token<'s>, MAX_TOKENS>,
}

impl<'s> Line<'s> {
    pub fn labels(&self) -> impl Iterator<Item = &'s str> + '_ {
        self.tokens.iter().filter_map(|token| match token {
            Token::LabelDef(name) => Some(*name),
            _ => None,
        })
    }

    /// The mnemonic and its operands, if the line has an instruction.
    pub fn instruction(&self) -> Option<(&'s str, &[Token<'s>])> {
        let start = self
            .tokens
            .iter()
            .position(|token| !matches!(token, Token::LabelDef(_)))?;
        let (head, operands) = self.tokens.get(start..)?.split_first()?;
        match head {
            Token::Mnemonic(mnemonic) => Some((*mnemonic, operands)),
            _ => None,
        }
    }
}

/// Splits one source line into tokens.
pub fn lex_line(number: u32, text: &str) -> Result<Line<'_>, AssemblerError> {
    let mut tokens: Vec<Token<'_>, MAX_TOKENS> = Vec::new();
    let mut seen_mnemonic = false;

    for word in strip_comment(text).split_whitespace() {
        let token = if !seen_mnemonic {
            match word.strip_suffix(':') {
                Some(name) => Token::LabelDef(check_name(name).map_err(|err| err.with_line(number))?),
                None => {
                    seen_mnemonic = true;
                    Token::Mnemonic(word)
                }
            }
        } else {
            lex_operand(word).map_err(|err| err.with_line(number))?
        };
        tokens.push(token).map_err(|_| {
            AssemblerError::Kind(AssemblerErrorKind::TooManyTokens).with_line(number)
        })?;
    }

    Ok(Line { number, tokens })
}

/// Lexes every line of `source`, numbering from 1.
pub fn lex_source(source: &str) -> impl Iterator<Item = Result<Line<'_>, AssemblerError>> {
    source.lines().zip(1u32..).map(|(text, number)| lex_line(number, text))
}

fn lex_operand(word: &str) -> Result<Token<'_>, AssemblerError> {
    if let Some(name) = word.strip_suffix(':') {
        return Ok(Token::LabelRef(check_name(name)?));
    }
    if let Some(register) = Register::from_name(word) {
        return Ok(Token::Register(register));
    }
    if word.starts_with(|c: char| c.is_ascii_digit() || c == '-') {
        return parse_number(word).map(Token::Number);
    }
    Ok(Token::LabelRef(check_name(word)?))
}

fn parse_number(word: &str) -> Result<i64, AssemblerError> {
    let (negative, digits) = match word.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, word),
    };
    let magnitude = match digits
        .strip_prefix("0x")
        .or_else(|| digits.strip_prefix("0X"))
    {
        Some(hex) => i64::from_str_radix(hex, 16),
        None => digits.parse::<i64>(),
    }
    .map_err(|_| AssemblerError::Kind(AssemblerErrorKind::InvalidNumber))?;
    if negative {
        magnitude
            .checked_neg()
            .ok_or(AssemblerError::Kind(AssemblerErrorKind::InvalidNumber))
    } else {
        Ok(magnitude)
    }
}

fn check_name(name: &str) -> Result<&str, AssemblerError> {
    if name.is_empty() || name.contains(':') {
        return Err(AssemblerError::Kind(AssemblerErrorKind::InvalidLabel));
    }
    Ok(name)
}

fn strip_comment(line: &str) -> &str {
    match line.split([';', '#']).next() {
        Some(part) => part,
        None => line,
    }
}
