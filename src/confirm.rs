//! Interactive confirmation before a build starts.

use std::io::{self, BufRead, Write};

/// Question asked before the first stage runs.
pub const START_PROMPT: &str = "Start build?";

/// Asks the operator a yes/no question.
pub trait Confirm {
    /// Ask `question`, writing the prompt to `stderr`.
    ///
    /// An empty answer means yes.
    ///
    /// # Errors
    ///
    /// Returns any I/O error from writing the prompt or reading the answer.
    fn confirm(&mut self, question: &str, stderr: &mut dyn Write) -> io::Result<bool>;
}

/// Reads answers from standard input.
#[derive(Debug, Default)]
pub struct StdinConfirm;

impl Confirm for StdinConfirm {
    fn confirm(&mut self, question: &str, stderr: &mut dyn Write) -> io::Result<bool> {
        ask(&mut io::stdin().lock(), question, stderr)
    }
}

/// Reads answers from any buffered reader.
#[derive(Debug)]
pub struct ReaderConfirm<R> {
    input: R,
}

impl<R: BufRead> ReaderConfirm<R> {
    /// Answer questions from `input`.
    pub fn new(input: R) -> Self {
        Self { input }
    }
}

impl<R: BufRead> Confirm for ReaderConfirm<R> {
    fn confirm(&mut self, question: &str, stderr: &mut dyn Write) -> io::Result<bool> {
        ask(&mut self.input, question, stderr)
    }
}

fn ask(input: &mut dyn BufRead, question: &str, stderr: &mut dyn Write) -> io::Result<bool> {
    write!(stderr, "{question} [y] ")?;
    stderr.flush()?;

    let mut line = String::new();
    if input.read_line(&mut line)? == 0 {
        // End of input; nobody is there to say yes.
        return Ok(false);
    }
    Ok(is_affirmative(&line))
}

/// Interpret an answer, treating an empty answer as yes.
#[must_use]
pub fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.is_empty() || answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}
