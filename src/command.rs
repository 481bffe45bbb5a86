//! Parses one line of input into either a meta-command or a statement.
//!
//! A meta-command starts with `.` and is handled directly by the REPL
//! driver (`.exit`, `.constants`, `.btree`). A statement is `insert` or
//! `select`, handled against the open table. Nothing here touches the
//! table or the pager — this module only classifies text.

use crate::errors::{Error, UserError};
use crate::storage::row::{MAX_EMAIL_LEN, MAX_USERNAME_LEN};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MetaCommand {
    Exit,
    Constants,
    Btree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Statement {
    Insert { id: u32, username: String, email: String },
    Select,
}

/// Resolves a `.`-prefixed line to a known meta-command.
pub fn parse_meta_command(line: &str) -> Result<MetaCommand, Error> {
    match line {
        ".exit" => Ok(MetaCommand::Exit),
        ".constants" => Ok(MetaCommand::Constants),
        ".btree" => Ok(MetaCommand::Btree),
        other => Err(UserError::UnrecognizedCommand(other.to_string()).into()),
    }
}

/// Tokenizes and validates a non-meta line into a [`Statement`].
pub fn parse_statement(line: &str) -> Result<Statement, Error> {
    if line == "select" {
        return Ok(Statement::Select);
    }

    if let Some(rest) = line.strip_prefix("insert") {
        return parse_insert(rest, line);
    }

    Err(UserError::UnrecognizedStatement(line.to_string()).into())
}

fn parse_insert(rest: &str, whole_line: &str) -> Result<Statement, Error> {
    let mut fields = rest.split_whitespace();

    let id_token = fields.next().ok_or(UserError::SyntaxError)?;
    let username = fields.next().ok_or(UserError::SyntaxError)?;
    let email = fields.next().ok_or(UserError::SyntaxError)?;
    // Trailing tokens past email are ignored, not rejected.

    let id: i64 = id_token.parse().map_err(|_| UserError::SyntaxError)?;
    let id: u32 = id.try_into().map_err(|_| UserError::SyntaxError)?;

    if username.len() > MAX_USERNAME_LEN || email.len() > MAX_EMAIL_LEN {
        return Err(UserError::StringTooLong.into());
    }

    let _ = whole_line;
    Ok(Statement::Insert {
        id,
        username: username.to_string(),
        email: email.to_string(),
    })
}
