use std::io::{self, BufRead, StdinLock, Stdout, Write};

use crate::{ChoiceMenu, GenerationError, Selection};

/// Asks the operator questions over a line-oriented console.
pub struct Configurator<R, W> {
    input: R,
    output: W,
    max_attempts: Option<usize>,
}

impl Configurator<StdinLock<'static>, Stdout> {
    pub fn stdio() -> Self {
        Self::new(io::stdin().lock(), io::stdout())
    }
}

impl<R: BufRead, W: Write> Configurator<R, W> {
    pub fn new(input: R, output: W) -> Self {
        Self {
            input,
            output,
            max_attempts: None,
        }
    }

    /// Gives up with [`GenerationError::TooManyAttempts`] after `attempts` invalid answers.
    pub fn with_max_attempts(mut self, attempts: Option<usize>) -> Self {
        self.max_attempts = attempts.filter(|n| *n > 0);
        self
    }

    pub fn into_output(self) -> W {
        self.output
    }

    /// Shows `menu` under `question` and returns the chosen value.
    pub fn ask<T: Clone>(
        &mut self,
        question: &str,
        menu: &ChoiceMenu<T>,
    ) -> Result<T, GenerationError> {
        writeln!(self.output, "\n{question}")?;
        for (i, choice) in menu.choices().iter().enumerate() {
            let marker = if i == menu.default_index() {
                " (default)"
            } else {
                ""
            };
            writeln!(self.output, "  {}. {}{marker}", i + 1, choice.label)?;
        }

        let mut invalid = 0;
        loop {
            write!(
                self.output,
                "\nEnter choice (1-{}) or press Enter for default: ",
                menu.len()
            )?;
            self.output.flush()?;

            let answer = self.read_line()?;
            match menu.select(&answer) {
                Selection::Picked(value) => return Ok(value.clone()),
                Selection::OutOfRange => writeln!(
                    self.output,
                    "Please enter a number between 1 and {}",
                    menu.len()
                )?,
                Selection::NotANumber => writeln!(self.output, "Please enter a valid number")?,
            }

            invalid += 1;
            if let Some(max) = self.max_attempts {
                if invalid >= max {
                    return Err(GenerationError::TooManyAttempts(max));
                }
            }
        }
    }

    /// Reads the free-text prompt. Blank input is an error.
    pub fn prompt_text(
        &mut self,
        heading: &str,
        example: Option<&str>,
    ) -> Result<String, GenerationError> {
        writeln!(self.output, "\n{heading}")?;
        if let Some(example) = example {
            writeln!(self.output, "(Example: '{example}')")?;
        }
        write!(self.output, "> ")?;
        self.output.flush()?;

        let prompt = self.read_line()?.trim().to_string();
        if prompt.is_empty() {
            return Err(GenerationError::EmptyPrompt);
        }
        Ok(prompt)
    }

    fn read_line(&mut self) -> Result<String, GenerationError> {
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(GenerationError::InputClosed);
        }
        Ok(line)
    }
}
