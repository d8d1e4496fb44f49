//! Retrieval-augmented question answering.

use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::error::AskError;
use crate::models::{MetadataFilter, ScoredDocument, Turn, render_transcript};
use crate::services::decomposer::{DecomposedQuery, QueryDecomposer, material_filter};
use crate::services::index::DocumentIndex;
use crate::services::llm::LanguageModel;

/// Result count used when the decomposed `k` is zero.
pub const ZERO_K_DEFAULT: usize = 2;

/// An answer together with everything that went into producing it.
#[derive(Debug, Clone, Serialize)]
pub struct Answer {
    pub text: String,
    pub query: DecomposedQuery,
    /// Result count actually requested from the index
    pub k: usize,
    pub filter: Option<MetadataFilter>,
    pub sources: Vec<ScoredDocument>,
    pub context: String,
}

pub struct Answerer {
    llm: Arc<dyn LanguageModel>,
    index: Arc<DocumentIndex>,
    decomposer: QueryDecomposer,
}

impl Answerer {
    pub fn new(llm: Arc<dyn LanguageModel>, index: Arc<DocumentIndex>) -> Self {
        Self {
            decomposer: QueryDecomposer::new(Arc::clone(&llm)),
            llm,
            index,
        }
    }

    /// Answer `question` given the turns that preceded it. The model's reply
    /// is returned verbatim.
    pub async fn ask(&self, question: &str, history: &[Turn]) -> Result<String, AskError> {
        Ok(self.ask_with_trace(question, history).await?.text)
    }

    pub async fn ask_with_trace(
        &self,
        question: &str,
        history: &[Turn],
    ) -> Result<Answer, AskError> {
        let transcript = render_transcript(history);
        let query = self.decomposer.decompose(question).await?;
        let filter = material_filter(&query.question);
        let k = resolve_k(query.k);

        let sources = self
            .index
            .search(&query.question, k, filter.as_ref())
            .await?;
        let context = sources
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        info!(
            query = %query.question,
            k,
            filter = filter.as_ref().map(ToString::to_string),
            retrieved = sources.len(),
            "retrieved context"
        );
        debug!(context = %context, "final context passed to prompt");

        let prompt = answer_prompt(question, &context, &transcript);
        let text = self.llm.generate(&prompt).await?;

        Ok(Answer {
            text,
            query,
            k,
            filter,
            sources,
            context,
        })
    }
}

fn resolve_k(k: usize) -> usize {
    if k == 0 { ZERO_K_DEFAULT } else { k }
}

fn answer_prompt(question: &str, context: &str, transcript: &str) -> String {
    format!(
        "You are an assistant with expertise in materials science data.\n\
         Answer the user's question using the context below as your reference.\n\
         If the context does not contain enough information to answer, say so.\n\
         If any part of your answer is uncertain or may be inaccurate, say that too \
         and give the best answer the available information supports.\n\
         The user may give only a material id or a formula; describe that material \
         from the context as clearly as you can.\n\n\
         Previous conversation:\n{transcript}\n\n\
         Context: {context}\n\n\
         Question: {question}\n\n\
         Answer:"
    )
}
