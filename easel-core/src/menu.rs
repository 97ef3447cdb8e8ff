use crate::GenerationError;

#[derive(Debug, Clone, PartialEq)]
pub struct Choice<T> {
    pub label: String,
    pub value: T,
}

/// An ordered list of labelled answers with one pre-selected default.
#[derive(Debug, Clone, PartialEq)]
pub struct ChoiceMenu<T> {
    choices: Vec<Choice<T>>,
    default: usize,
}

/// Outcome of interpreting one line typed at a menu.
#[derive(Debug, PartialEq)]
pub enum Selection<'a, T> {
    Picked(&'a T),
    OutOfRange,
    NotANumber,
}

impl<T> ChoiceMenu<T> {
    pub fn new<L: Into<String>>(
        choices: impl IntoIterator<Item = (L, T)>,
        default: usize,
    ) -> Result<Self, GenerationError> {
        let choices: Vec<_> = choices
            .into_iter()
            .map(|(label, value)| Choice {
                label: label.into(),
                value,
            })
            .collect();
        if choices.is_empty() {
            return Err(GenerationError::InvalidMenu(
                "a menu needs at least one choice".to_string(),
            ));
        }
        if default >= choices.len() {
            return Err(GenerationError::InvalidMenu(format!(
                "default index {default} is out of bounds for {} choices",
                choices.len()
            )));
        }
        Ok(Self { choices, default })
    }

    pub fn len(&self) -> usize {
        self.choices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.choices.is_empty()
    }

    pub fn default_index(&self) -> usize {
        self.default
    }

    pub fn default_value(&self) -> &T {
        &self.choices[self.default].value
    }

    pub fn choices(&self) -> &[Choice<T>] {
        &self.choices
    }

    /// Interprets an answer: blank picks the default, otherwise a 1-based index.
    pub fn select(&self, answer: &str) -> Selection<'_, T> {
        let answer = answer.trim();
        if answer.is_empty() {
            return Selection::Picked(self.default_value());
        }
        match answer.parse::<i64>() {
            Ok(n) if n >= 1 && (n as u64) <= self.choices.len() as u64 => {
                Selection::Picked(&self.choices[n as usize - 1].value)
            }
            Ok(_) => Selection::OutOfRange,
            Err(_) => Selection::NotANumber,
        }
    }
}
