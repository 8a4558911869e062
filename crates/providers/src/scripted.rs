//! Scripted provider that replays canned decision outputs.
//!
//! Used by tests and by offline demo runs where no endpoint is reachable.
//! Outputs are consumed front to back; running past the end of the script is
//! an error so a misconfigured run fails loudly instead of looping.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use triagent_core::{DecisionRequest, DecisionResponse, Provider, ProviderError};

pub struct ScriptedProvider {
    outputs: Mutex<VecDeque<String>>,
    calls: AtomicUsize,
}

impl ScriptedProvider {
    pub fn new<I, S>(outputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            outputs: Mutex::new(outputs.into_iter().map(Into::into).collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// How many decision calls have been made so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// How many scripted outputs are left.
    pub fn remaining(&self) -> usize {
        self.lock_outputs().len()
    }

    fn lock_outputs(&self) -> std::sync::MutexGuard<'_, VecDeque<String>> {
        match self.outputs.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[async_trait]
impl Provider for ScriptedProvider {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn decide(
        &self,
        _request: DecisionRequest,
    ) -> std::result::Result<DecisionResponse, ProviderError> {
        let taken = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        let next = self.lock_outputs().pop_front();
        match next {
            Some(content) => Ok(DecisionResponse {
                content,
                model: "scripted".into(),
                usage: None,
            }),
            None => Err(ProviderError::MalformedOutput(format!(
                "script exhausted after {taken} decision calls"
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_outputs_in_order() {
        let provider = ScriptedProvider::new(["first", "second"]);

        let a = provider
            .decide(DecisionRequest::new("s", "u"))
            .await
            .unwrap();
        let b = provider
            .decide(DecisionRequest::new("s", "u"))
            .await
            .unwrap();

        assert_eq!(a.content, "first");
        assert_eq!(b.content, "second");
        assert_eq!(a.model, "scripted");
        assert_eq!(provider.call_count(), 2);
        assert_eq!(provider.remaining(), 0);
    }

    #[tokio::test]
    async fn an_exhausted_script_is_an_error() {
        let provider = ScriptedProvider::new(Vec::<String>::new());
        let err = provider
            .decide(DecisionRequest::new("s", "u"))
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::MalformedOutput(_)));
        assert_eq!(provider.call_count(), 1);
    }
}
