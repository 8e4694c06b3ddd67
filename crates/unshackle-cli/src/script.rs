//! Release scripts: a TOML description of a chain.
//!
//! ```toml
//! message = "Releasing widget"
//! done = "Released!"
//!
//! [[steps]]
//! run = "git fetch --tags"
//! required = true
//!
//! [[steps]]
//! mark = "test"
//! run = "cargo test"
//!
//! [[steps]]
//! prompt = "Publish?"
//! choices = ["y", "n"]
//! ```

use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use unshackle_chain::{Chain, PromptOptions, SkipState, StepOptions, DEFAULT_CHOICES};
use unshackle_types::{Result, UnshackleError};

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawScript {
    message: Option<String>,
    done: Option<String>,
    #[serde(default)]
    steps: Vec<RawStep>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawStep {
    mark: Option<String>,
    print: Option<String>,
    run: Option<String>,
    prompt: Option<String>,
    required: Option<bool>,
    choices: Option<Vec<String>>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    Print(String),
    Run { command: String, required: bool },
    Prompt { message: String, choices: Vec<String> },
}

impl Action {
    /// Whether the step may be passed over while resuming.
    pub fn skippable(&self) -> bool {
        match self {
            Action::Print(_) => true,
            Action::Run { required, .. } => !required,
            Action::Prompt { .. } => false,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            Action::Print(message) => format!("print {message:?}"),
            Action::Run { command, required } => {
                if *required {
                    format!("run `{command}` (required)")
                } else {
                    format!("run `{command}`")
                }
            }
            Action::Prompt { message, choices } => {
                format!("prompt {message:?} [{}]", choices.join(", "))
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub mark: Option<String>,
    pub action: Action,
}

/// Whether a step would run when resuming from a given mark.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Planned<'a> {
    pub step: &'a Step,
    pub runs: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReleaseScript {
    pub message: Option<String>,
    pub done: Option<String>,
    pub steps: Vec<Step>,
}

impl ReleaseScript {
    pub fn load(path: &Path) -> Result<Self> {
        let source = std::fs::read_to_string(path)?;
        Self::parse(&source)
    }

    pub fn parse(source: &str) -> Result<Self> {
        let raw: RawScript =
            toml::from_str(source).map_err(|e| UnshackleError::Script(e.to_string()))?;

        let mut seen = HashSet::new();
        let mut steps = Vec::with_capacity(raw.steps.len());
        for (index, raw_step) in raw.steps.into_iter().enumerate() {
            let step = build_step(raw_step)
                .map_err(|msg| UnshackleError::Script(format!("step {}: {msg}", index + 1)))?;
            if let Some(ref mark) = step.mark {
                if !seen.insert(mark.clone()) {
                    return Err(UnshackleError::Script(format!(
                        "step {}: duplicate mark `{mark}`",
                        index + 1
                    )));
                }
            }
            steps.push(step);
        }

        Ok(Self {
            message: raw.message,
            done: raw.done,
            steps,
        })
    }

    pub fn marks(&self) -> impl Iterator<Item = &str> {
        self.steps.iter().filter_map(|step| step.mark.as_deref())
    }

    /// Reject a resume mark the script does not define.
    pub fn check_resume(&self, from: Option<&str>) -> Result<()> {
        match from {
            Some(mark) if !self.marks().any(|m| m == mark) => Err(UnshackleError::Script(
                format!("no step is marked `{mark}`"),
            )),
            _ => Ok(()),
        }
    }

    /// Decide, in order, which steps a run resuming from `from` would execute.
    pub fn plan(&self, from: Option<&str>) -> Vec<Planned<'_>> {
        let skip = SkipState::new();
        skip.seek(from.map(str::to_string));
        self.steps
            .iter()
            .map(|step| Planned {
                step,
                runs: !skip.should_skip(step.mark.as_deref(), step.action.skippable()),
            })
            .collect()
    }

    /// Append every step to `chain`.
    pub fn append_to(&self, chain: Chain) -> Chain {
        self.steps.iter().fold(chain, |chain, step| {
            let mark = step.mark.clone();
            match &step.action {
                Action::Print(message) => match mark {
                    Some(mark) => chain.print_at(mark, message.as_str()),
                    None => chain.print(message.as_str()),
                },
                Action::Run { command, required } => {
                    let options = StepOptions {
                        mark,
                        required: *required,
                    };
                    chain.run_with(options, command.as_str())
                }
                Action::Prompt { message, choices } => {
                    let options = PromptOptions {
                        mark,
                        choices: choices.clone(),
                    };
                    chain.prompt_with(options, message.as_str())
                }
            }
        })
    }
}

fn build_step(raw: RawStep) -> std::result::Result<Step, String> {
    let RawStep {
        mark,
        print,
        run,
        prompt,
        required,
        choices,
    } = raw;

    if required.is_some() && run.is_none() {
        return Err("`required` only applies to `run` steps".into());
    }
    if choices.is_some() && prompt.is_none() {
        return Err("`choices` only applies to `prompt` steps".into());
    }
    if mark.as_deref().is_some_and(|m| m.trim().is_empty()) {
        return Err("`mark` must not be blank".into());
    }

    let action = match (print, run, prompt) {
        (Some(message), None, None) => Action::Print(message),
        (None, Some(command), None) => Action::Run {
            command,
            required: required.unwrap_or(false),
        },
        (None, None, Some(message)) => {
            let choices = match choices {
                Some(choices) if choices.is_empty() => {
                    return Err("`choices` must not be empty".into())
                }
                Some(choices) => choices,
                None => DEFAULT_CHOICES.iter().map(|c| c.to_string()).collect(),
            };
            Action::Prompt { message, choices }
        }
        (None, None, None) => return Err("expected one of `print`, `run` or `prompt`".into()),
        _ => return Err("only one of `print`, `run` or `prompt` is allowed".into()),
    };

    Ok(Step { mark, action })
}
