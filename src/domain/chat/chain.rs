use metrics::histogram;
use tracing::{debug, instrument};

use super::{ChatAnswer, ChatRequest};
use crate::domain::endpoint::{ChatOptions, Completion, CompletionEndpoint, HistoryEndpoint};
use crate::domain::llm::LlmResponse;
use crate::domain::pipeline::Pipeline;
use crate::domain::prompt::TemplateCache;
use crate::domain::retrieval::{Retrieval, UpsertSummary};
use crate::domain::stream::StreamAggregator;
use crate::domain::vector::{DistanceMetric, QueryResult, Scope};
use crate::domain::DomainError;

const QUERY_SESSION: &str = "RagQueryChain";
const CHAT_SESSION: &str = "RagChatChain";

/// Template locations and limits used by [`RagChain`]
#[derive(Debug, Clone, PartialEq)]
pub struct ChatSettings {
    pub chat_template: String,
    pub query_template: String,
    pub max_tokens: u32,
}

impl Default for ChatSettings {
    fn default() -> Self {
        Self {
            chat_template: "chat".to_string(),
            query_template: "query".to_string(),
            max_tokens: 4096,
        }
    }
}

/// Retrieval-augmented question answering over a vector store
#[derive(Debug, Clone)]
pub struct RagChain {
    retrieval: Retrieval,
    completion: CompletionEndpoint,
    history: HistoryEndpoint,
    templates: TemplateCache,
    settings: ChatSettings,
}

impl RagChain {
    pub fn new(
        retrieval: Retrieval,
        completion: CompletionEndpoint,
        history: HistoryEndpoint,
        templates: TemplateCache,
        settings: ChatSettings,
    ) -> Self {
        Self {
            retrieval,
            completion,
            history,
            templates,
            settings,
        }
    }

    pub fn retrieval(&self) -> &Retrieval {
        &self.retrieval
    }

    pub fn history(&self) -> &HistoryEndpoint {
        &self.history
    }

    /// Store a document that was already split into chunks
    pub async fn ingest(&self, chunks: &[String], scope: &Scope) -> UpsertSummary {
        self.retrieval.upsert_all(chunks, scope).await
    }

    /// Answer `query` once per retrieved chunk, closest (L2) first
    #[instrument(skip(self, query), fields(namespace = %scope.namespace()))]
    pub async fn answer_each(
        &self,
        query: &str,
        top_k: usize,
        scope: &Scope,
    ) -> Result<Vec<LlmResponse>, DomainError> {
        let mut template = self.templates.template(&self.settings.query_template).await?;
        template
            .put("keepMaxTokens", true)
            .put("maxTokens", self.settings.max_tokens)
            .put("query", query);

        let retrieval = self.retrieval.clone();
        let completion = self.completion.clone();
        let scope = scope.clone();

        Pipeline::ready(query.to_string())
            .transform_async(move |query| async move {
                retrieval
                    .query_text(&query, DistanceMetric::L2, top_k, &scope)
                    .await
            })
            .on_each("retrieval_metrics", record_hits)
            .transform_async(move |hits| async move {
                let mut responses = Vec::with_capacity(hits.len());

                for hit in hits.hits() {
                    template.put("keepContext", true).put("context", hit.text());
                    let prompt = template.load_or_reload()?.get("prompt")?;

                    match completion
                        .complete(&prompt, QUERY_SESSION, &ChatOptions::default())
                        .await?
                    {
                        Completion::Single(response) => responses.push(response),
                        Completion::Stream(_) => {
                            return Err(DomainError::internal(
                                "Received a stream for a non-streaming completion",
                            ))
                        }
                    }
                }

                Ok(responses)
            })
            .get()
            .await
    }

    /// Answer one conversational turn and record it in the context's history
    #[instrument(skip(self, request), fields(context_id = %request.context_id, stream = request.stream))]
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatAnswer, DomainError> {
        let ChatRequest {
            context_id,
            query,
            scope,
            stream,
        } = request;

        let mut template = self.templates.template(&self.settings.chat_template).await?;
        template
            .put("keepMaxTokens", true)
            .put("maxTokens", self.settings.max_tokens)
            .put("query", query.as_str())
            .put("keepHistory", false)
            .put("keepContext", false);

        let rendered = template.load_or_reload()?;
        let top_k = positive(rendered.get_int("topK")?, "topK")?;
        let context_length = if rendered.has("contextLength") {
            Some(positive(rendered.get_int("contextLength")?, "contextLength")?)
        } else {
            None
        };

        let mut options = ChatOptions::default().with_stream(stream);
        if let Some(max_tokens) = rendered
            .get_int("maxTokens")
            .ok()
            .and_then(|n| u32::try_from(n).ok())
        {
            options = options.with_max_tokens(max_tokens);
        }

        let prior_history = self.history.get(&context_id).await?.response;
        debug!(top_k, history_len = prior_history.len(), "Chat template loaded");

        let retrieval = self.retrieval.clone();
        let completion = self.completion.clone();
        let history = self.history.clone();
        let history_text = prior_history.clone();
        let user_query = query.clone();

        Pipeline::ready(query)
            .transform_async(move |query| async move {
                retrieval
                    .query_text(&query, DistanceMetric::InnerProduct, top_k, &scope)
                    .await
            })
            .on_each("retrieval_metrics", record_hits)
            .transform(move |hits| {
                let joined = hits
                    .hits()
                    .iter()
                    .map(|hit| hit.text())
                    .collect::<Vec<_>>()
                    .join("\n");
                cap_context(joined, context_length)
            })
            .try_transform(move |context| {
                template
                    .put("keepHistory", true)
                    .put("history", history_text)
                    .put("keepContext", true)
                    .put("context", context);
                template.load_or_reload()?.get("prompt")
            })
            .transform_async(move |prompt| async move {
                completion.complete(&prompt, CHAT_SESSION, &options).await
            })
            .transform_async(move |completion| async move {
                let aggregator = StreamAggregator::new(history, context_id, user_query, prior_history);

                match completion {
                    Completion::Stream(stream) => Ok(ChatAnswer::Streaming(aggregator.tap(stream))),
                    single => {
                        let finalized = aggregator.drive(single.into_stream(), |_| {}).await?;
                        Ok(ChatAnswer::Complete(finalized.text))
                    }
                }
            })
            .get()
            .await
    }
}

fn record_hits(hits: &QueryResult) -> Result<(), DomainError> {
    histogram!("ragchain_retrieval_hits", "metric" => hits.metric().as_str()).record(hits.len() as f64);
    Ok(())
}

fn positive(value: i64, field: &str) -> Result<usize, DomainError> {
    usize::try_from(value)
        .ok()
        .filter(|v| *v > 0)
        .ok_or_else(|| {
            DomainError::template(format!(
                "'{}' must be a positive integer, got {}",
                field, value
            ))
        })
}

/// Keep at most `limit` characters of `context`
fn cap_context(context: String, limit: Option<usize>) -> String {
    match limit {
        Some(limit) if context.chars().count() > limit => context.chars().take(limit).collect(),
        _ => context,
    }
}
