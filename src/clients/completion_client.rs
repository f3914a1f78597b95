//! 补全服务客户端
//!
//! 对 Azure OpenAI chat completions 的一层薄封装：
//! - 固定的生成参数与请求超时
//! - 调用结果收敛为封闭的 [`Outcome`]，调用方穷举匹配，不走错误传播
//! - 内部不做重试（包括关闭 async-openai 自带的退避重试）
//!
//! ## 技术栈
//! - 使用 `async-openai` crate 进行 API 调用（`AzureConfig`）
//! - 超时由 `tokio::time::timeout` 控制，超时后请求 future 被直接丢弃

use std::time::Duration;

use async_openai::{
    config::AzureConfig,
    error::OpenAIError,
    types::chat::{
        ChatCompletionRequestMessage, ChatCompletionRequestSystemMessageArgs,
        ChatCompletionRequestUserMessageArgs, CreateChatCompletionRequest,
        CreateChatCompletionRequestArgs,
    },
    Client,
};
use async_trait::async_trait;
use backoff::{ExponentialBackoff, ExponentialBackoffBuilder};
use tracing::{debug, info};

use crate::config::Config;

const SYSTEM_PROMPT: &str = "You are a helpful assistant.";
const MAX_TOKENS: u32 = 8192;
const TEMPERATURE: f32 = 0.7;
const TOP_P: f32 = 0.95;

/// 单次提交的结果
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    /// 至少返回了一个候选（内容可以为空字符串）
    Completed {
        model_name: String,
        output_text: String,
    },
    /// 服务返回了零个候选
    EmptyResponse,
    /// 超过固定超时仍未返回
    TimedOut,
    /// 其他传输层或服务端错误
    Failed { error_description: String },
}

/// 补全客户端
///
/// 整个运行期间只持有一个长连接，运行结束时由调用方显式 `close`。
#[async_trait]
pub trait CompletionClient: Send {
    async fn submit(&mut self, prompt: &str, deployment: &str) -> Outcome;

    /// 释放底层连接
    async fn close(&mut self);
}

/// Azure OpenAI 补全客户端
pub struct AzureCompletionClient {
    client: Option<Client<AzureConfig>>,
    timeout: Duration,
}

impl AzureCompletionClient {
    pub fn new(config: &Config) -> Self {
        let azure_config = AzureConfig::new()
            .with_api_base(&config.azure_endpoint)
            .with_api_key(&config.azure_api_key)
            .with_deployment_id(&config.azure_deployment)
            .with_api_version(&config.azure_api_version);

        Self::with_azure_config(
            azure_config,
            Duration::from_secs(config.request_timeout_seconds),
        )
    }

    pub fn with_azure_config(azure_config: AzureConfig, timeout: Duration) -> Self {
        Self {
            client: Some(Client::with_config(azure_config).with_backoff(no_retry())),
            timeout,
        }
    }

    pub fn is_closed(&self) -> bool {
        self.client.is_none()
    }
}

/// 构建请求，生成参数固定
#[allow(deprecated)]
fn build_request(prompt: &str, deployment: &str) -> Result<CreateChatCompletionRequest, String> {
    let system_msg = ChatCompletionRequestSystemMessageArgs::default()
        .content(SYSTEM_PROMPT)
        .build()
        .map_err(|e| e.to_string())?;
    let user_msg = ChatCompletionRequestUserMessageArgs::default()
        .content(prompt)
        .build()
        .map_err(|e| e.to_string())?;

    CreateChatCompletionRequestArgs::default()
        .model(deployment)
        .messages(vec![
            ChatCompletionRequestMessage::System(system_msg),
            ChatCompletionRequestMessage::User(user_msg),
        ])
        .max_tokens(MAX_TOKENS)
        .temperature(TEMPERATURE)
        .top_p(TOP_P)
        .frequency_penalty(0.0)
        .presence_penalty(0.0)
        .stream(false)
        .build()
        .map_err(|e| e.to_string())
}

/// 关闭 async-openai 默认的指数退避（5xx / 429 会被反复重试直到超时）
fn no_retry() -> ExponentialBackoff {
    ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build()
}

fn classify_error(err: OpenAIError) -> Outcome {
    Outcome::Failed {
        error_description: err.to_string(),
    }
}

#[async_trait]
impl CompletionClient for AzureCompletionClient {
    async fn submit(&mut self, prompt: &str, deployment: &str) -> Outcome {
        let Some(client) = self.client.as_ref() else {
            return Outcome::Failed {
                error_description: "客户端已关闭".to_string(),
            };
        };

        let request = match build_request(prompt, deployment) {
            Ok(request) => request,
            Err(e) => {
                return Outcome::Failed {
                    error_description: format!("请求构建失败: {}", e),
                }
            }
        };

        debug!("调用补全 API，部署: {}，prompt 长度: {} 字符", deployment, prompt.len());

        let response = match tokio::time::timeout(self.timeout, client.chat().create(request)).await
        {
            Err(_) => return Outcome::TimedOut,
            Ok(Err(e)) => return classify_error(e),
            Ok(Ok(response)) => response,
        };

        let model_name = response.model;
        match response.choices.into_iter().next() {
            None => Outcome::EmptyResponse,
            Some(choice) => Outcome::Completed {
                model_name,
                output_text: choice.message.content.unwrap_or_default(),
            },
        }
    }

    async fn close(&mut self) {
        if self.client.take().is_some() {
            info!("🔌 补全客户端已释放");
        }
    }
}
