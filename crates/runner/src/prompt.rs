//! Yes/no confirmation read from an input stream.

use std::io::{self, BufRead, Write};

/// Answers that count as "yes". The empty answer (just Enter) is a yes.
pub const AFFIRMATIVE: [&str; 3] = ["Y", "y", ""];

/// Whether `answer` (without its line terminator) confirms
pub fn is_affirmative(answer: &str) -> bool {
    AFFIRMATIVE.contains(&answer)
}

/// Print `question` and read one answer line.
///
/// End of input counts as a refusal.
pub fn confirm<R, W>(input: &mut R, output: &mut W, question: &str) -> io::Result<bool>
where
    R: BufRead + ?Sized,
    W: Write + ?Sized,
{
    write!(output, "{} [Y/n] ", question)?;
    output.flush()?;

    let mut answer = String::new();
    if input.read_line(&mut answer)? == 0 {
        return Ok(false);
    }
    let answer = answer.trim_end_matches(|c: char| c == '\n' || c == '\r');

    Ok(is_affirmative(answer))
}
