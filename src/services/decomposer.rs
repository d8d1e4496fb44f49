//! Rewrites free-form questions into a retrieval query and result count.

use regex::Regex;
use serde::Serialize;
use std::sync::{Arc, LazyLock};
use tracing::{debug, warn};

use crate::error::LlmError;
use crate::models::MetadataFilter;
use crate::services::llm::LanguageModel;

/// Result count used when the model's reply cannot be parsed.
pub const FALLBACK_K: usize = 5;

/// Output format shown to the model.
pub const DECOMPOSITION_FORMAT: &str = "['question': 'mp-100000', 'k': 1]";

static DECOMPOSITION_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\['question': '([^']*)', 'k': (\d+)\]").expect("valid decomposition pattern")
});

static MATERIAL_ID_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^mp-\d+").expect("valid material id pattern"));

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecomposedQuery {
    pub question: String,
    pub k: usize,
}

impl DecomposedQuery {
    pub fn fallback(question: &str) -> Self {
        Self {
            question: question.to_string(),
            k: FALLBACK_K,
        }
    }
}

pub struct QueryDecomposer {
    llm: Arc<dyn LanguageModel>,
}

impl QueryDecomposer {
    pub fn new(llm: Arc<dyn LanguageModel>) -> Self {
        Self { llm }
    }

    /// Ask the model for a (question, k) pair. An unparseable reply falls
    /// back to the original question with k = 5; model errors propagate.
    pub async fn decompose(&self, question: &str) -> Result<DecomposedQuery, LlmError> {
        let prompt = decomposition_prompt(question);
        let response = self.llm.generate(&prompt).await?;
        Ok(parse_decomposition(&response, question))
    }
}

/// Extract the first `['question': '...', 'k': N]` literal in `response`.
pub fn parse_decomposition(response: &str, original: &str) -> DecomposedQuery {
    let parsed = DECOMPOSITION_PATTERN.captures(response).and_then(|caps| {
        let k = caps[2].parse::<usize>().ok()?;
        Some(DecomposedQuery {
            question: caps[1].to_string(),
            k,
        })
    });

    match parsed {
        Some(query) => {
            debug!(question = %query.question, k = query.k, "decomposed query");
            query
        }
        None => {
            warn!(response = %response, "decomposition response format is incorrect");
            DecomposedQuery::fallback(original)
        }
    }
}

/// Exact-match filter on the material id when the question starts with one.
pub fn material_filter(question: &str) -> Option<MetadataFilter> {
    MATERIAL_ID_PATTERN
        .find(question)
        .map(|m| MetadataFilter::material_id(m.as_str()))
}

fn decomposition_prompt(question: &str) -> String {
    format!(
        "You help retrieve records from a database of materials science data.\n\
         Users sometimes ask using only a material identifier such as mp-100000.\n\
         Rewrite the user's question into a search query and decide how many records \
         to retrieve; k=5 retrieves five records.\n\
         Reply with the query and the count only, nothing else, in exactly this format:\n\
         {DECOMPOSITION_FORMAT}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Mutex;

    struct ScriptedModel {
        reply: Result<String, u16>,
        prompts: Mutex<Vec<String>>,
    }

    impl ScriptedModel {
        fn replying(reply: &str) -> Arc<Self> {
            Arc::new(Self {
                reply: Ok(reply.to_string()),
                prompts: Mutex::new(Vec::new()),
            })
        }

        fn failing(status: u16) -> Arc<Self> {
            Arc::new(Self {
                reply: Err(status),
                prompts: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl LanguageModel for ScriptedModel {
        async fn generate(&self, prompt: &str) -> Result<String, LlmError> {
            self.prompts.lock().unwrap().push(prompt.to_string());
            match &self.reply {
                Ok(text) => Ok(text.clone()),
                Err(status) => Err(LlmError::ServerError {
                    status: *status,
                    body: "unavailable".to_string(),
                }),
            }
        }

        fn name(&self) -> &str {
            "scripted"
        }

        async fn health_check(&self) -> Result<bool, LlmError> {
            Ok(true)
        }
    }

    #[test]
    fn test_parse_exact_format() {
        let parsed = parse_decomposition("['question': 'mp-100000', 'k': 3]", "orig");
        assert_eq!(
            parsed,
            DecomposedQuery {
                question: "mp-100000".to_string(),
                k: 3
            }
        );
    }

    #[test]
    fn test_parse_embedded_in_chatter() {
        let parsed = parse_decomposition(
            "Sure! Here you go:\n['question': 'band gap of Fe2O3', 'k': 0]\nHope that helps",
            "orig",
        );
        assert_eq!(parsed.question, "band gap of Fe2O3");
        assert_eq!(parsed.k, 0);
    }

    #[test]
    fn test_parse_garbage_falls_back() {
        for response in [
            "I cannot help with that",
            "['question': \"mp-1\", 'k': 3]",
            "['question': 'mp-1', 'k': three]",
            "['question': 'mp-1', 'k': 99999999999999999999999999]",
            "",
        ] {
            assert_eq!(
                parse_decomposition(response, "What is mp-1?"),
                DecomposedQuery::fallback("What is mp-1?"),
                "{response}"
            );
        }
    }

    #[test]
    fn test_material_filter() {
        assert_eq!(
            material_filter("mp-555698"),
            Some(MetadataFilter::material_id("mp-555698"))
        );
        assert_eq!(
            material_filter("mp-1197331 band gap"),
            Some(MetadataFilter::material_id("mp-1197331"))
        );
        assert_eq!(material_filter("band gap of mp-1197331"), None);
        assert_eq!(material_filter("mp-abc"), None);
    }

    #[tokio::test]
    async fn test_decompose_sends_format_and_question() {
        let model = ScriptedModel::replying("['question': 'mp-149', 'k': 2]");
        let decomposer = QueryDecomposer::new(model.clone());

        let query = decomposer.decompose("Tell me about mp-149").await.unwrap();
        assert_eq!(query.question, "mp-149");
        assert_eq!(query.k, 2);

        let prompts = model.prompts.lock().unwrap();
        assert_eq!(prompts.len(), 1);
        assert!(prompts[0].contains(DECOMPOSITION_FORMAT));
        assert!(prompts[0].contains("Question: Tell me about mp-149"));
    }

    #[tokio::test]
    async fn test_decompose_model_error_propagates() {
        let decomposer = QueryDecomposer::new(ScriptedModel::failing(503));
        let result = decomposer.decompose("What is silicon?").await;
        assert!(matches!(
            result,
            Err(LlmError::ServerError { status: 503, .. })
        ));
    }

    #[tokio::test]
    async fn test_decompose_unparseable_reply_falls_back() {
        let decomposer = QueryDecomposer::new(ScriptedModel::replying("no idea"));
        let query = decomposer.decompose("What is silicon?").await.unwrap();
        assert_eq!(query, DecomposedQuery::fallback("What is silicon?"));
    }
}
