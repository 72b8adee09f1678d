//! Parser for the DQDIMACS input file format.
//!
//! DQDIMACS extends QDIMACS with `d` lines: `d <var> <dep>... 0` binds an
//! existential variable with an explicit set of universal dependencies,
//! while `e` lines bind existentials depending on all universals declared so
//! far. The QDIMACS base format is specified at
//! <https://www.qbflib.org/qdimacs.html>.

use crate::literal::{Lit, Var};
use miette::{Diagnostic, SourceSpan};
use std::{
    io::{Bytes, Read},
    iter::Peekable,
};
use thiserror::Error;

#[derive(Debug, Error, Diagnostic)]
#[error("Cannot parse DQDIMACS")]
#[diagnostic()]
pub struct ExtendedParseError {
    #[source_code]
    pub source_code: Vec<u8>,

    #[related]
    pub related: Vec<ParseError>,
}

#[derive(Debug, Error, Diagnostic)]
pub enum ParseError {
    #[error("The underlying IO has failed")]
    IO(#[from] std::io::Error),

    #[error("Invalid header: {}", reason)]
    #[diagnostic()]
    InvalidHeader {
        reason: HeaderError,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Missing DQDIMACS header, i.e., `p cnf ...`")]
    MissingHeader,

    #[error("Unexpected end of file")]
    UnexpectedEndOfFile {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Unexpected character")]
    #[diagnostic()]
    UnexpectedChar {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Invalid integer")]
    InvalidInt {
        #[label]
        err_span: SourceSpan,
    },

    #[error("Variable {val} is out of bound")]
    VariableOutOfBound {
        val: i64,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Literal {val} is out of bound")]
    LiteralOutOfBound {
        val: i64,

        #[label]
        err_span: SourceSpan,
    },

    #[error("Dependency line binds no variable")]
    EmptyDependencyLine {
        #[label]
        err_span: SourceSpan,
    },

    #[error(
        "Number of clauses does not match header: expected {}, but found {} clauses",
        expected,
        found
    )]
    NumClausesMismatch { expected: u32, found: u32 },
}

#[derive(Debug, Error, Diagnostic)]
pub enum HeaderError {
    #[error("`p cnf` prefix missing or invalid")]
    InvalidPrefix,

    #[error("Invalid variable count")]
    InvalidVariableCount,

    #[error("Invalid clause count")]
    InvalidClauseCount,
}

/// An instance of an implementor can be derived from a textual
/// representation of a DQBF in the DQDIMACS format.
pub trait FromDqdimacs: Default {
    fn set_num_variables(&mut self, variables: u32);
    fn set_num_clauses(&mut self, clauses: u32);
    /// Variables of an `a` line.
    fn universals(&mut self, vars: &[Var]);
    /// Variables of an `e` line; they depend on every universal declared
    /// before the line.
    fn existentials(&mut self, vars: &[Var]);
    /// A `d` line binding `var` with the explicit dependencies `deps`.
    fn dependency(&mut self, var: Var, deps: &[Var]);
    fn add_clause(&mut self, lits: &[Lit]);
}

#[derive(Debug)]
pub struct DqdimacsParser<R: Read> {
    bytes: Peekable<Bytes<R>>,
    num_clauses: u32,
    num_clauses_read: u32,

    offset: usize,
}

impl<R: Read> DqdimacsParser<R> {
    pub fn new(reader: R) -> Self {
        Self { bytes: reader.bytes().peekable(), offset: 0, num_clauses: 0, num_clauses_read: 0 }
    }

    /// Parses a DQDIMACS file and returns the representation `Q`.
    ///
    /// # Errors
    ///
    /// This function will return an error if the read content is not valid
    /// DQDIMACS. The function propagates underlying IO failures.
    pub fn parse<Q: FromDqdimacs>(&mut self) -> Result<Q, ParseError> {
        let mut result = Q::default();
        self.parse_comment_or_header(&mut result)?;
        self.parse_prefix(&mut result)?;
        self.parse_matrix(&mut result)?;

        // check that number of clauses match the header
        if self.num_clauses_read != self.num_clauses {
            return Err(ParseError::NumClausesMismatch {
                expected: self.num_clauses,
                found: self.num_clauses_read,
            });
        }

        Ok(result)
    }

    /// Either `c ...` or `p cnf ...`
    fn parse_comment_or_header<Q: FromDqdimacs>(
        &mut self,
        result: &mut Q,
    ) -> Result<(), ParseError> {
        while let Some(b) = self.next_byte()? {
            match b {
                b'c' => {
                    // start of a comment line, ignore remaining line
                    self.skip_until(b'\n')?;
                }
                b'p' => {
                    // `p cnf [NUM_VARIABLES] [NUM_CLAUSES]` header
                    self.expect(&b" cnf"[..]).map_err(|_| ParseError::InvalidHeader {
                        reason: HeaderError::InvalidPrefix,
                        err_span: self.err_span(),
                    })?;

                    // parse variable count
                    self.skip_whitespace_and_peek()?.ok_or_else(|| {
                        ParseError::UnexpectedEndOfFile { err_span: self.err_span() }
                    })?;
                    let num_variables: u32 =
                        self.parse_int().map_err(|err| ParseError::InvalidHeader {
                            reason: HeaderError::InvalidVariableCount,
                            err_span: err.err_span().unwrap_or_else(|| self.err_span()),
                        })?;

                    // parse clause count
                    self.skip_whitespace_and_peek()?.ok_or_else(|| {
                        ParseError::UnexpectedEndOfFile { err_span: self.err_span() }
                    })?;
                    let num_clauses: u32 =
                        self.parse_int().map_err(|err| ParseError::InvalidHeader {
                            reason: HeaderError::InvalidClauseCount,
                            err_span: err.err_span().unwrap_or_else(|| self.err_span()),
                        })?;

                    self.num_clauses = num_clauses;
                    result.set_num_variables(num_variables);
                    result.set_num_clauses(num_clauses);
                    return Ok(());
                }
                b if b.is_ascii_whitespace() => {
                    // ignore whitespace at the beginning of the file
                }
                _ => return Err(ParseError::UnexpectedChar { err_span: self.err_offset().into() }),
            }
        }
        Err(ParseError::MissingHeader)
    }

    /// `a ...`, `e ...` or `d ...` lines, stops before the matrix begins.
    fn parse_prefix<Q: FromDqdimacs>(&mut self, result: &mut Q) -> Result<(), ParseError> {
        while let Some(b) = self.skip_whitespace_and_peek()? {
            match b {
                b'a' | b'e' | b'd' => {
                    self.parse_prefix_line(result)?;
                }
                b'-' | (b'0'..=b'9') => {
                    // end of quantifier prefix
                    return Ok(());
                }
                _ => return Err(ParseError::UnexpectedChar { err_span: self.err_offset().into() }),
            }
        }
        Ok(())
    }

    /// A single `a`, `e` or `d` line.
    fn parse_prefix_line<Q: FromDqdimacs>(&mut self, result: &mut Q) -> Result<(), ParseError> {
        let line_offset = self.err_offset();
        let tag = self
            .next_byte()?
            .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.err_span() })?;
        let vars = self.parse_var_list()?;
        match tag {
            b'a' => result.universals(&vars),
            b'e' => result.existentials(&vars),
            b'd' => {
                let Some((&var, deps)) = vars.split_first() else {
                    return Err(ParseError::EmptyDependencyLine {
                        err_span: (line_offset..self.err_offset()).into(),
                    });
                };
                result.dependency(var, deps);
            }
            _ => unreachable!(),
        }
        Ok(())
    }

    /// Variables up to the terminating `0`.
    fn parse_var_list(&mut self) -> Result<Vec<Var>, ParseError> {
        let mut vars = Vec::new();
        loop {
            self.skip_whitespace_and_peek()?
                .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.err_span() })?;
            let start_offset = self.err_offset();
            let var: i32 = self.parse_int()?;
            if var == 0 {
                break;
            }
            if !(1..=Var::MAX_VAR.to_dimacs()).contains(&var) {
                return Err(ParseError::VariableOutOfBound {
                    val: var.into(),
                    // reduce end offset by one, as last byte was a whitespace
                    err_span: (start_offset..self.err_offset().saturating_sub(1)).into(),
                });
            }
            vars.push(Var::from_dimacs(var));
        }
        Ok(vars)
    }

    /// Parses clauses until EOF
    fn parse_matrix<Q: FromDqdimacs>(&mut self, result: &mut Q) -> Result<(), ParseError> {
        let mut clause = Vec::new();
        while (self.skip_whitespace_and_peek()?).is_some() {
            clause.clear();
            loop {
                self.skip_whitespace_and_peek()?
                    .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.err_span() })?;
                let start_offset = self.err_offset();
                let lit: i32 = self.parse_int()?;
                if lit == 0 {
                    break;
                }
                if !(Lit::MIN_LIT.to_dimacs()..=Lit::MAX_LIT.to_dimacs()).contains(&lit) {
                    return Err(ParseError::LiteralOutOfBound {
                        val: lit.into(),
                        err_span: (start_offset..self.err_offset()).into(),
                    });
                }
                clause.push(Lit::from_dimacs(lit));
            }
            result.add_clause(&clause);
            self.num_clauses_read += 1;
        }
        Ok(())
    }

    /// Consumes the next byte in the input.
    /// Returns the byte or `None` in the case of EOF.
    fn next_byte(&mut self) -> Result<Option<u8>, ParseError> {
        let byte = self.bytes.next().transpose()?;
        if byte.is_some() {
            self.offset += 1;
        }
        Ok(byte)
    }

    /// Returns the next byte value without consuming.
    fn peek_byte(&mut self) -> Option<u8> {
        match self.bytes.peek() {
            Some(Ok(b)) => Some(*b),
            _ => None,
        }
    }

    fn skip_until(&mut self, until: u8) -> Result<(), ParseError> {
        while self
            .next_byte()?
            .ok_or_else(|| ParseError::UnexpectedEndOfFile { err_span: self.err_span() })?
            != until
        {}
        Ok(())
    }

    /// Skips input bytes until a non-ASCII whitespace character is found.
    /// Returns the first non-ASCII whitespace character (if not EOF).
    fn skip_whitespace_and_peek(&mut self) -> Result<Option<u8>, ParseError> {
        while let Some(b) = self.peek_byte() {
            if !b.is_ascii_whitespace() {
                return Ok(Some(b));
            }
            self.next_byte()?;
        }
        Ok(None)
    }

    fn expect(&mut self, value: &[u8]) -> Result<(), ParseError> {
        for (&expected, found) in value.iter().zip(&mut self.bytes) {
            let found = found?;
            self.offset += 1;
            if found != expected {
                return Err(ParseError::UnexpectedChar { err_span: self.err_offset().into() });
            }
        }
        Ok(())
    }

    fn parse_int<I>(&mut self) -> Result<I, ParseError>
    where
        I: TryFrom<i64>,
    {
        let start_span = self.err_offset();
        let mut parsed: i64 = 0;
        let mut is_negated = false;
        while let Some(b) = self.next_byte()? {
            match b {
                b'-' => {
                    if is_negated {
                        return Err(ParseError::InvalidInt { err_span: self.err_span() });
                    }
                    is_negated = true;
                }
                b @ b'0'..=b'9' => {
                    let val = i64::from(b - b'0');
                    parsed = if let Some(parsed) =
                        parsed.checked_mul(10).and_then(|res| res.checked_add(val))
                    {
                        parsed
                    } else {
                        // overflow while parsing integer
                        return Err(ParseError::InvalidInt {
                            err_span: (start_span..self.err_offset()).into(),
                        });
                    }
                }
                b => {
                    if !b.is_ascii_whitespace() {
                        return Err(ParseError::InvalidInt {
                            err_span: (start_span..self.err_offset()).into(),
                        });
                    }
                    break;
                }
            }
        }
        if is_negated {
            parsed = -parsed;
        }
        I::try_from(parsed).map_err(|_| {
            ParseError::LiteralOutOfBound {
                val: parsed,
                // reduce end offset by one, as last byte was a whitespace
                err_span: (start_span..self.err_offset().saturating_sub(1)).into(),
            }
        })
    }

    fn err_offset(&self) -> usize {
        self.offset
    }

    fn err_span(&self) -> SourceSpan {
        self.offset.saturating_sub(1).into()
    }
}

impl ParseError {
    fn err_span(&self) -> Option<SourceSpan> {
        match self {
            ParseError::InvalidInt { err_span }
            | ParseError::LiteralOutOfBound { err_span, .. } => Some(*err_span),
            _ => None,
        }
    }
}
