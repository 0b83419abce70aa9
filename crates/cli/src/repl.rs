//! Interactive query prompt.

use std::io::{BufRead, Write};

use runtime::{Backend, Session, ToolTransport};
use tracing::warn;

use crate::error::Result;

const PROMPT: &str = "Query: ";

/// Read queries from `input` until `quit` or end of input.
///
/// A failing query is reported and the prompt continues.
pub async fn run<B, T>(
    session: &mut Session<B, T>,
    mut input: impl BufRead,
    mut out: impl Write,
) -> Result<()>
where
    B: Backend,
    T: ToolTransport,
{
    loop {
        write!(out, "\n{PROMPT}")?;
        out.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            break;
        }

        let query = line.trim();
        if query.is_empty() {
            continue;
        }
        if query.eq_ignore_ascii_case("quit") {
            break;
        }

        match session.process_query(query).await {
            Ok(answer) => writeln!(out, "\n{answer}")?,
            Err(e) => {
                warn!(error = %e, "query failed");
                writeln!(out, "\nError: {e}")?;
            }
        }
    }
    Ok(())
}
