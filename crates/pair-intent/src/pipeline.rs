//! Natural-language command path: sentence -> model -> validator -> dispatcher.

use std::sync::Arc;

use tracing::{debug, info};

use crate::chain::ChainClient;
use crate::engine::{CommandDispatcher, Outcome, Plan};
use crate::intent::IntentValidator;
use crate::llm::{LanguageModel, LlmRequest, ModelChoice};
use crate::registry::TokenRegistry;
use crate::types::{Command, LlmError, PairIntentError, Result};

pub struct IntentPipeline<M: ?Sized, C: ?Sized> {
    model: Arc<M>,
    registry: Arc<TokenRegistry>,
    dispatcher: CommandDispatcher<C>,
}

impl<M, C> IntentPipeline<M, C>
where
    M: LanguageModel + ?Sized,
    C: ChainClient + ?Sized,
{
    pub fn new(
        model: Arc<M>,
        registry: Arc<TokenRegistry>,
        dispatcher: CommandDispatcher<C>,
    ) -> Self {
        Self { model, registry, dispatcher }
    }

    pub fn dispatcher(&self) -> &CommandDispatcher<C> {
        &self.dispatcher
    }

    /// Asks the model for an intent and validates it.
    ///
    /// A blank sentence never reaches the model. A reply without a JSON
    /// object is [`PairIntentError::NoAction`] carrying the model's text.
    pub async fn interpret(&self, sentence: &str, model: ModelChoice) -> Result<Command> {
        if sentence.trim().is_empty() {
            return Err(LlmError::EmptyPrompt.into());
        }
        let request = LlmRequest::for_intent(sentence, model);
        let response = self.model.complete(&request).await?;
        let Some(raw) = response.structured else {
            debug!(output = %response.output, "model reply holds no intent object");
            return Err(PairIntentError::NoAction { output: response.output });
        };
        let command = IntentValidator::new(&self.registry).validate(&raw)?;
        info!(%command, "intent accepted");
        Ok(command)
    }

    /// Interprets `sentence` and plans the command without sending anything.
    pub async fn plan_prompt(&self, sentence: &str, model: ModelChoice) -> Result<Plan> {
        let command = self.interpret(sentence, model).await?;
        Ok(self.dispatcher.plan(&command).await?)
    }

    /// Interprets, plans and executes `sentence`.
    pub async fn run(&self, sentence: &str, model: ModelChoice) -> Result<Outcome> {
        let plan = self.plan_prompt(sentence, model).await?;
        Ok(self.dispatcher.execute(&plan).await?)
    }
}
