use std::io::{BufRead, Write};

use crate::error::AuthError;

/// Print `message`, read one line, and return it trimmed. EOF reads as an
/// empty answer.
pub fn prompt(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    message: &str,
) -> Result<String, AuthError> {
    write!(out, "{message}")?;
    out.flush()?;
    let mut line = String::new();
    reader.read_line(&mut line)?;
    Ok(line.trim().to_string())
}

/// Like [`prompt`], returning `default` for an empty answer.
pub fn prompt_with_default(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    message: &str,
    default: &str,
) -> Result<String, AuthError> {
    let answer = prompt(reader, out, &format!("{message}({default}) "))?;
    if answer.is_empty() {
        Ok(default.to_string())
    } else {
        Ok(answer)
    }
}

/// Yes/no question that defaults to yes.
pub fn confirm(
    reader: &mut impl BufRead,
    out: &mut impl Write,
    message: &str,
) -> Result<bool, AuthError> {
    let answer = prompt(reader, out, message)?.to_lowercase();
    Ok(matches!(answer.as_str(), "" | "y" | "yes"))
}

pub fn is_tty_stdout() -> bool {
    std::io::IsTerminal::is_terminal(&std::io::stdout())
}
