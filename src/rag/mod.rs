//! Retrieval-augmented question answering.
//!
//! Retrieve the most relevant chunks for a question, build a grounded
//! prompt, and generate an answer. Retrieval and generation failures
//! degrade to user-facing fallback messages rather than erroring the
//! session.

use crate::llm::GenerativeModel;
use crate::store::VectorStore;

/// Prompt template for grounded answering. `{query}` and `{context}`
/// are substituted.
const ANSWER_PROMPT_TEMPLATE: &str = "\
Answer the question using the information in the context below.

Rules:
- Use the context, validated against what you already know.
- Give a clear, coherent summary of at most 4 paragraphs.
- If the answer is not in the context, say only: \"No answer could be found in the provided information.\"

[Question]
{query}

[Context]
{context}

[Answer]

";

/// Fallback when retrieval finds nothing usable.
const NO_CONTEXT_MESSAGE: &str =
    "Sorry, I could not find relevant information in the knowledge base.";

/// Fallback when generation fails.
const GENERATION_FAILED_MESSAGE: &str = "An error occurred while generating the answer.";

/// Question-answering pipeline over a vector store and a generator.
pub struct RagPipeline<S, M> {
    store: S,
    model: M,
}

impl<S: VectorStore, M: GenerativeModel> RagPipeline<S, M> {
    pub fn new(store: S, model: M) -> Self {
        Self { store, model }
    }

    /// Most relevant chunk texts for a question, best first.
    pub fn retrieve_context(&self, query: &str, k: usize) -> Vec<String> {
        match self.store.query_with_score(query, k) {
            Ok(results) => results.into_iter().map(|(chunk, _)| chunk.content).collect(),
            Err(e) => {
                tracing::error!("Context retrieval failed: {}", e);
                Vec::new()
            }
        }
    }

    /// Fill the answer template with the question and numbered context.
    pub fn build_prompt(&self, query: &str, context_chunks: &[String]) -> String {
        ANSWER_PROMPT_TEMPLATE
            .replace("{query}", query)
            .replace("{context}", &format_chunks(context_chunks))
    }

    /// Answer a question over the corpus.
    pub async fn answer(&self, query: &str, k: usize, max_tokens: u32) -> String {
        let context = self.retrieve_context(query, k);
        if context.is_empty() {
            return NO_CONTEXT_MESSAGE.to_string();
        }

        let prompt = self.build_prompt(query, &context);
        match self.model.generate(&prompt, max_tokens).await {
            Ok(answer) => answer,
            Err(e) => {
                tracing::error!("Answer generation failed: {}", e);
                GENERATION_FAILED_MESSAGE.to_string()
            }
        }
    }
}

/// Number chunks so the model can reference them.
fn format_chunks(chunks: &[String]) -> String {
    chunks
        .iter()
        .enumerate()
        .map(|(i, chunk)| format!("[{}] {}", i + 1, chunk.trim()))
        .collect::<Vec<_>>()
        .join("\n\n")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::LlmError;
    use crate::store::MemoryVectorStore;

    struct StubModel {
        reply: Option<String>,
    }

    #[async_trait::async_trait]
    impl GenerativeModel for StubModel {
        async fn generate(&self, _prompt: &str, _max_tokens: u32) -> Result<String, LlmError> {
            self.reply
                .clone()
                .ok_or_else(|| LlmError::Api("stub failure".into()))
        }
    }

    fn seeded_store() -> MemoryVectorStore {
        let mut store = MemoryVectorStore::new();
        store
            .add(
                vec![
                    "The cache writes artifacts atomically.".to_string(),
                    "Page order is preserved by sorting results.".to_string(),
                ],
                vec![serde_json::Value::Null, serde_json::Value::Null],
            )
            .unwrap();
        store
    }

    #[test]
    fn test_build_prompt_includes_query_and_context() {
        let pipeline = RagPipeline::new(MemoryVectorStore::new(), StubModel { reply: None });
        let prompt = pipeline.build_prompt(
            "how are artifacts written?",
            &["chunk one".to_string(), "chunk two".to_string()],
        );
        assert!(prompt.contains("how are artifacts written?"));
        assert!(prompt.contains("[1] chunk one"));
        assert!(prompt.contains("[2] chunk two"));
        assert!(!prompt.contains("{query}"));
        assert!(!prompt.contains("{context}"));
    }

    #[tokio::test]
    async fn test_answer_happy_path() {
        let pipeline = RagPipeline::new(
            seeded_store(),
            StubModel {
                reply: Some("Atomically, via temp file rename.".to_string()),
            },
        );
        let answer = pipeline.answer("how does the cache write?", 2, 128).await;
        assert_eq!(answer, "Atomically, via temp file rename.");
    }

    #[tokio::test]
    async fn test_answer_without_context_degrades() {
        let pipeline = RagPipeline::new(
            MemoryVectorStore::new(),
            StubModel {
                reply: Some("should never be used".to_string()),
            },
        );
        let answer = pipeline.answer("anything", 3, 128).await;
        assert_eq!(answer, NO_CONTEXT_MESSAGE);
    }

    #[tokio::test]
    async fn test_generation_failure_degrades() {
        let pipeline = RagPipeline::new(seeded_store(), StubModel { reply: None });
        let answer = pipeline.answer("page order", 2, 128).await;
        assert_eq!(answer, GENERATION_FAILED_MESSAGE);
    }
}
