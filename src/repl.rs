//! The read-eval-print loop: prompt, read a line, dispatch, print, repeat.
//!
//! Every line written to stdout here is part of the external contract —
//! the prompt string, the constants dump, the tree dump, and every
//! diagnostic are byte-for-byte fixed. Diagnostics about what the loop is
//! doing internally go to `tracing`, which this driver never routes to
//! stdout.

use crate::command::{self, MetaCommand, Statement};
use crate::errors::Error;
use crate::storage::row::Row;
use crate::storage::Table;
use std::io::{BufRead, Write};
use tracing::{info, warn};

const PROMPT: &str = "simpledb > ";

/// Drives the loop against `table`, reading from `input` and writing to
/// `output`. Returns once `.exit` is read or `input` reaches EOF.
pub fn run<R: BufRead, W: Write>(
    table: &mut Table,
    input: &mut R,
    output: &mut W,
) -> Result<(), Error> {
    let mut line = String::new();

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        line.clear();
        let bytes_read = input.read_line(&mut line)?;
        if bytes_read == 0 {
            info!("input closed, exiting");
            return Ok(());
        }

        let trimmed = line.trim_end_matches(['\n', '\r']).to_string();

        if trimmed.starts_with('.') {
            match command::parse_meta_command(&trimmed) {
                Ok(MetaCommand::Exit) => {
                    table.close()?;
                    return Ok(());
                }
                Ok(MetaCommand::Constants) => {
                    write!(output, "{}", Table::format_constants())?;
                }
                Ok(MetaCommand::Btree) => {
                    write!(output, "Tree:\n{}", table.format_tree()?)?;
                }
                Err(e) => write!(output, "{}\n", e)?,
            }
            continue;
        }

        match run_statement(table, &trimmed, output) {
            Ok(()) => {}
            Err(e) if e.is_recoverable() => {
                warn!(line = %trimmed, error = %e, "recoverable error");
                write!(output, "{}\n", e)?;
            }
            Err(e) => return Err(e),
        }
    }
}

fn run_statement<W: Write>(table: &mut Table, line: &str, output: &mut W) -> Result<(), Error> {
    match command::parse_statement(line)? {
        Statement::Insert { id, username, email } => {
            let row = Row::new(id, &username, &email)?;
            table.insert(&row)?;
            write!(output, "Executed.\n")?;
        }
        Statement::Select => {
            for row in table.select_rows()? {
                write!(output, "{}\n", row)?;
            }
            write!(output, "Executed.\n")?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_transcript(table: &mut Table, script: &str) -> String {
        let mut input = std::io::Cursor::new(script.as_bytes().to_vec());
        let mut output = Vec::new();
        run(table, &mut input, &mut output).unwrap();
        String::from_utf8(output).unwrap()
    }

    #[test]
    fn exit_prints_only_the_prompt() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let out = run_transcript(&mut table, ".exit\n");
        assert_eq!(out, "simpledb > ");
    }

    #[test]
    fn unrecognized_meta_command_is_reported() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let out = run_transcript(&mut table, ".foo\n.exit\n");
        assert_eq!(
            out,
            "simpledb > Unrecognized command '.foo'\nsimpledb > "
        );
    }

    #[test]
    fn insert_then_select_round_trips() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let out = run_transcript(
            &mut table,
            "insert 1 user1 person1@example.com\nselect\n.exit\n",
        );
        assert_eq!(
            out,
            "simpledb > Executed.\n\
             simpledb > (1, user1, person1@example.com)\n\
             Executed.\n\
             simpledb > "
        );
    }

    #[test]
    fn oversized_username_is_rejected() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let long = "a".repeat(33);
        let out = run_transcript(&mut table, &format!("insert 1 {long} a@example.com\n.exit\n"));
        assert_eq!(out, "simpledb > String is too long.\nsimpledb > ");
    }

    #[test]
    fn unrecognized_statement_reports_whole_line() {
        let tmp = tempfile::NamedTempFile::new().unwrap();
        let mut table = Table::open(tmp.path()).unwrap();
        let out = run_transcript(&mut table, "delete 1\n.exit\n");
        assert_eq!(
            out,
            "simpledb > Unrecognized keyword at start of 'delete 1'.\nsimpledb > "
        );
    }
}
