//! Question sources

use crate::error::{RagError, RagResult};
use std::collections::VecDeque;
use std::io::{BufRead, Write};

/// Prompt shown before reading a question interactively
pub const QUESTION_PROMPT: &str = "Input your movie Query:";

/// Supplies the question for a run
pub trait QuestionSource {
    fn next_question(&mut self) -> RagResult<String>;
}

/// Reads one line from `reader` after writing the prompt to `writer`
pub struct PromptedInput<R, W> {
    reader: R,
    writer: W,
    prompt: String,
}

impl<R: BufRead, W: Write> PromptedInput<R, W> {
    pub fn new(reader: R, writer: W) -> Self {
        Self::with_prompt(reader, writer, QUESTION_PROMPT)
    }

    pub fn with_prompt(reader: R, writer: W, prompt: impl Into<String>) -> Self {
        Self {
            reader,
            writer,
            prompt: prompt.into(),
        }
    }
}

/// Interactive stdin source
pub fn stdin() -> PromptedInput<std::io::StdinLock<'static>, std::io::Stdout> {
    PromptedInput::new(std::io::stdin().lock(), std::io::stdout())
}

impl<R: BufRead, W: Write> QuestionSource for PromptedInput<R, W> {
    fn next_question(&mut self) -> RagResult<String> {
        let io_err = |e: std::io::Error| RagError::Input(e.to_string());

        write!(self.writer, "{}", self.prompt).map_err(io_err)?;
        self.writer.flush().map_err(io_err)?;

        let mut line = String::new();
        if self.reader.read_line(&mut line).map_err(io_err)? == 0 {
            return Err(RagError::Input("end of input before a question was entered".to_string()));
        }
        non_empty(line)
    }
}

/// Pre-recorded questions, for tests and one-shot invocations
#[derive(Debug, Default)]
pub struct ScriptedQuestions {
    questions: VecDeque<String>,
}

impl ScriptedQuestions {
    pub fn new<I, S>(questions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            questions: questions.into_iter().map(Into::into).collect(),
        }
    }
}

impl QuestionSource for ScriptedQuestions {
    fn next_question(&mut self) -> RagResult<String> {
        let question = self
            .questions
            .pop_front()
            .ok_or_else(|| RagError::Input("no question available".to_string()))?;
        non_empty(question)
    }
}

fn non_empty(question: String) -> RagResult<String> {
    let trimmed = question.trim();
    if trimmed.is_empty() {
        return Err(RagError::Input("question is empty".to_string()));
    }
    Ok(trimmed.to_string())
}
