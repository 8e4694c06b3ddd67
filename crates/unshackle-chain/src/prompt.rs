//! The body of a `prompt` step.

use unshackle_types::{Result, StepValue, UnshackleError};

use crate::engine::Engine;
use crate::events::ChainEvent;

/// Show `message`, arm the input gate with `choices` and wait for a match.
///
/// There is no timeout: the chain stays suspended until the operator types an
/// accepted input or interrupts the process.
pub(crate) async fn ask(engine: Engine, message: String, choices: Vec<String>) -> Result<StepValue> {
    engine.out(&format!("{message} [{}]", choices.join(", ")));

    let answer = engine.gate().arm(choices.clone())?;
    engine.emit(ChainEvent::PromptArmed { message, choices });
    engine.attach_dispatcher();

    let input = answer.await.map_err(|_| UnshackleError::InputClosed)?;
    tracing::debug!(input = %input, "Prompt answered");
    Ok(StepValue::String(input))
}
