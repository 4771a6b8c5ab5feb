//! An oracle that replays canned replies.
//!
//! Used by tests and by `liftplan generate --replay` to exercise the retry
//! loop without a network.

use super::GenerationOracle;
use crate::{Error, Result};
use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::Mutex;

/// One canned oracle outcome
#[derive(Clone, Debug)]
pub enum ScriptedReply {
    Text(String),
    Failure(String),
}

/// Replays replies in order and records every prompt it receives
#[derive(Debug, Default)]
pub struct ScriptedOracle {
    replies: Mutex<VecDeque<ScriptedReply>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedOracle {
    pub fn new(replies: Vec<ScriptedReply>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            prompts: Mutex::new(Vec::new()),
        }
    }

    /// An oracle that answers with each text in turn
    pub fn with_texts<I, S>(texts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(texts.into_iter().map(|t| ScriptedReply::Text(t.into())).collect())
    }

    /// Prompts received so far, oldest first
    pub fn prompts(&self) -> Vec<String> {
        self.prompts
            .lock()
            .map(|p| p.clone())
            .unwrap_or_default()
    }

    pub fn calls(&self) -> usize {
        self.prompts().len()
    }
}

#[async_trait]
impl GenerationOracle for ScriptedOracle {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn generate(&self, prompt: &str) -> Result<String> {
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }

        let reply = self
            .replies
            .lock()
            .map_err(|_| Error::OracleCallFailed("script lock poisoned".into()))?
            .pop_front();

        match reply {
            Some(ScriptedReply::Text(text)) => Ok(text),
            Some(ScriptedReply::Failure(message)) => Err(Error::OracleCallFailed(message)),
            None => Err(Error::OracleCallFailed("script exhausted".into())),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_replays_in_order_then_fails() {
        let oracle = ScriptedOracle::new(vec![
            ScriptedReply::Text("first".into()),
            ScriptedReply::Failure("boom".into()),
        ]);

        assert_eq!(oracle.generate("a").await.unwrap(), "first");
        assert!(matches!(
            oracle.generate("b").await,
            Err(Error::OracleCallFailed(m)) if m == "boom"
        ));
        assert!(oracle.generate("c").await.is_err());
        assert_eq!(oracle.prompts(), vec!["a", "b", "c"]);
        assert_eq!(oracle.calls(), 3);
    }
}
