//! Named options for the chain operations.

/// Printed by [`Engine::start`](crate::Engine::start) when no message is given.
pub const DEFAULT_START_MESSAGE: &str = "Starting a release.";

/// Inputs a prompt accepts when no choices are given.
pub const DEFAULT_CHOICES: &[&str] = &["y"];

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StartOptions {
    pub message: Option<String>,
    /// Skip ordinary steps until one carrying this mark is reached.
    pub resume_from: Option<String>,
}

impl StartOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn resume_from(mut self, mark: impl Into<String>) -> Self {
        self.resume_from = Some(mark.into());
        self
    }
}

/// Options for `print` and `run` steps.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StepOptions {
    pub mark: Option<String>,
    /// Run even while fast-forwarding past this step.
    pub required: bool,
}

impl StepOptions {
    pub fn at(mark: impl Into<String>) -> Self {
        Self {
            mark: Some(mark.into()),
            required: false,
        }
    }

    pub fn required() -> Self {
        Self {
            mark: None,
            required: true,
        }
    }

    pub fn require(mut self) -> Self {
        self.required = true;
        self
    }
}

/// Options for `prompt` steps. Prompts are never skipped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptOptions {
    pub mark: Option<String>,
    pub choices: Vec<String>,
}

impl PromptOptions {
    pub fn at(mark: impl Into<String>) -> Self {
        Self {
            mark: Some(mark.into()),
            ..Self::default()
        }
    }

    pub fn choices<I, S>(choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::default().with_choices(choices)
    }

    /// Replace the accepted inputs. An empty list falls back to [`DEFAULT_CHOICES`].
    pub fn with_choices<I, S>(mut self, choices: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let choices: Vec<String> = choices.into_iter().map(Into::into).collect();
        if !choices.is_empty() {
            self.choices = choices;
        }
        self
    }
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            mark: None,
            choices: DEFAULT_CHOICES.iter().map(|c| c.to_string()).collect(),
        }
    }
}
