use crate::core::state::LlmConfig;
use crate::error::CompletionError;
use crate::schema::{DraftDefaults, NodeCategory};
use async_trait::async_trait;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, error};

/// Instruction sent with every extraction request. `{node_kind}`,
/// `{edge_kind}` and `{categories}` are filled in by [`render_system_prompt`].
pub const SYSTEM_PROMPT: &str = r#"Role: You are a senior knowledge-graph architect. You turn business text into OpenSPG schema definitions.
角色：你是顶级知识图谱架构师，专门负责将业务文本转化为 OpenSPG 标准的 Schema 定义。

Task: Identify the following four element kinds ({categories}) in the user's text and return them as a node-link JSON document.
任务：从用户输入的文本中识别以下四种元素，并生成节点-连线格式的 JSON。

Element definitions / 元素定义:
- EntityType: an independent, concretely existing object (e.g. Supplier, PurchaseOrder). Must carry an ID and its core properties.
  客观存在的独立对象（如：供应商、采购单），必须包含 ID 和核心属性。
- ConceptType: an abstract classification or tag (e.g. CreditLevel, PurchaseCategory), used for classification and reasoning.
  抽象的分类或标签（如：信用等级、采购类型），用于分类和逻辑推理。
- Relation: an edge between two nodes (entity-entity or entity-concept). Direction and predicate must be explicit (e.g. supplies, INDEX_OF).
  连接两个节点的边，必须明确方向和语义谓词。
- EventType: a dynamic business action. Must carry time, subject and object.
  动态业务动作，必须包含时间、主体、对象三要素。

Output constraints / 输出约束:
- Return JSON only. No prose, no explanations. 仅返回 JSON。
- Give every node initial coordinates so the layout is readable and nodes do not overlap. 为每个节点分配不重叠的初始坐标。
- Mark every node with type "{node_kind}" and every edge with type "{edge_kind}".

JSON template / JSON 模板:
{
  "nodes": [
    {
      "id": "e1",
      "type": "{node_kind}",
      "data": { "label": "Supplier", "category": "EntityType", "props": ["name", "status"] },
      "position": { "x": 100, "y": 100 }
    }
  ],
  "edges": [
    { "id": "l1", "source": "e1", "target": "c1", "label": "hasCreditLevel", "animated": true, "type": "{edge_kind}" }
  ]
}"#;

pub fn render_system_prompt(defaults: &DraftDefaults) -> String {
    let categories = NodeCategory::ALL
        .iter()
        .map(NodeCategory::as_str)
        .collect::<Vec<_>>()
        .join(", ");

    SYSTEM_PROMPT
        .replace("{node_kind}", &defaults.node_kind)
        .replace("{edge_kind}", &defaults.edge_kind)
        .replace("{categories}", &categories)
}

/// Wraps the caller's text in the per-request instruction.
pub fn user_prompt(text: &str) -> String {
    format!(
        "User input: {}\n\nFollowing the requirements above, extract and return the Schema as JSON:\n请根据上述要求，提取并返回 JSON 格式的 Schema:",
        text
    )
}

/// A single-shot text completion: system instruction plus user message in,
/// full reply text out.
#[async_trait]
pub trait Completion: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CompletionError>;
}

/// OpenAI-compatible chat-completions client.
pub struct Cortex {
    client: reqwest::Client,
    config: LlmConfig,
}

impl Cortex {
    pub fn new(config: LlmConfig) -> Result<Self, CompletionError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CompletionError::Unexpected(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn endpoint(&self) -> String {
        format!("{}/chat/completions", self.config.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl Completion for Cortex {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String, CompletionError> {
        let api_key = self
            .config
            .api_key
            .as_deref()
            .filter(|k| !k.is_empty())
            .ok_or(CompletionError::AuthMissing)?;

        let payload = json!({
            "model": self.config.model,
            "messages": [
                { "role": "system", "content": system_prompt },
                { "role": "user", "content": user_prompt }
            ],
            "temperature": self.config.temperature,
            "top_p": self.config.top_p,
            "max_tokens": self.config.max_tokens
        });

        debug!(model = %self.config.model, endpoint = %self.endpoint(), "calling completion endpoint");

        let res = self
            .client
            .post(self.endpoint())
            .bearer_auth(api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| {
                error!(error = %e, "LLM request failed");
                CompletionError::Upstream(e.to_string())
            })?;

        let status = res.status();
        if !status.is_success() {
            let err_text = res.text().await.unwrap_or_default();
            error!(%status, body = %err_text, "LLM endpoint returned an error status");
            return Err(CompletionError::Upstream(format!("{} - {}", status, err_text)));
        }

        let body: Value = res.json().await.map_err(|e| {
            error!(error = %e, "LLM response body is not JSON");
            CompletionError::Unexpected(e.to_string())
        })?;

        extract_text(&body)
    }
}

/// `choices[0].message.content`, treating an absent `choices` key or content
/// as an empty reply.
fn extract_text(body: &Value) -> Result<String, CompletionError> {
    let Some(choices) = body.get("choices") else {
        return Ok(String::new());
    };

    let first = choices
        .get(0)
        .ok_or_else(|| CompletionError::Unexpected("completion response has no choices".into()))?;

    Ok(first
        .get("message")
        .and_then(|m| m.get("content"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string())
}
