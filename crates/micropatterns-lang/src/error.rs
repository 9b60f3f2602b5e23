use thiserror::Error as ThisError;

/// Parse error codes. Each code names one category of rejected source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    P001, // unknown command
    P002, // malformed parameters (syntax, quoting, duplicate key)
    P003, // missing or mistyped required parameter
    P004, // invalid integer literal
    P005, // undeclared variable
    P006, // variable redeclared
    P007, // assignment to / declaration of an environment variable
    P008, // invalid variable name
    P009, // malformed expression
    P010, // malformed condition
    P011, // block terminator without a matching opener (ENDREPEAT, ENDIF, ELSE)
    P012, // block still open at end of input
    P013, // invalid pattern definition (name, size, data, duplicates, table full)
}

impl ErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::P001 => "P001",
            Self::P002 => "P002",
            Self::P003 => "P003",
            Self::P004 => "P004",
            Self::P005 => "P005",
            Self::P006 => "P006",
            Self::P007 => "P007",
            Self::P008 => "P008",
            Self::P009 => "P009",
            Self::P010 => "P010",
            Self::P011 => "P011",
            Self::P012 => "P012",
            Self::P013 => "P013",
        }
    }
}

/// A parse error. Displays as `Line N: message`.
#[derive(Debug, Clone, PartialEq, ThisError)]
#[error("Line {line}: {message}")]
pub struct Error {
    pub code: ErrorCode,
    pub line: usize,
    pub message: String,
}

impl Error {
    pub fn new(code: ErrorCode, line: usize, message: impl Into<String>) -> Self {
        Self { code, line, message: message.into() }
    }
}

// ─────────────────────────────────────────────────────────────────────────────

/// Runtime error codes. Runtime errors never abort generation; the offending
/// operation degrades in place and the error is recorded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeErrorCode {
    R001, // unresolved variable
    R002, // division by zero
    R003, // modulo by zero
    R004, // $INDEX used outside a REPEAT body
    R005, // malformed expression or condition at run time
    R006, // LET target not declared
    R007, // invalid color name
    R008, // unknown pattern (FILL or DRAW)
    R009, // negative REPEAT count
}

impl RuntimeErrorCode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::R001 => "R001",
            Self::R002 => "R002",
            Self::R003 => "R003",
            Self::R004 => "R004",
            Self::R005 => "R005",
            Self::R006 => "R006",
            Self::R007 => "R007",
            Self::R008 => "R008",
            Self::R009 => "R009",
        }
    }
}

#[derive(Debug, Clone, PartialEq, ThisError)]
#[error("Runtime Error Line {line}: {message}")]
pub struct RuntimeError {
    pub code: RuntimeErrorCode,
    pub line: usize,
    pub message: String,
}

impl RuntimeError {
    pub fn new(code: RuntimeErrorCode, line: usize, message: impl Into<String>) -> Self {
        Self { code, line, message: message.into() }
    }
}
