//! 답변 생성 모듈 - 검색 결과 기반 LLM 요약
//!
//! 시맨틱 검색 결과 상위 문서를 컨텍스트로 묶어 OpenAI 챗 모델에
//! 전달하고 한국어 답변을 받습니다. 프롬프트는 소스 타입별로
//! 다릅니다. 블로그는 주관성 주의, 뉴스는 중립성/출처, 쇼핑은
//! 객관적 상품 비교를 요구합니다.

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::store::{Metadata, ScoredDocument, SourceType};

/// OpenAI 챗 API 엔드포인트
const OPENAI_CHAT_URL: &str = "https://api.openai.com/v1/chat/completions";

/// 컨텍스트에 포함할 최대 문서 수
const MAX_CONTEXT_DOCS: usize = 5;

// ============================================================================
// AnswerProvider Trait
// ============================================================================

/// 답변 생성 백엔드 트레이트
#[async_trait]
pub trait AnswerProvider: Send + Sync {
    /// 시스템/사용자 프롬프트로 답변 텍스트 생성
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String>;
}

// ============================================================================
// OpenAI Chat
// ============================================================================

/// OpenAI 챗 구현체
pub struct OpenAiChat {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    max_tokens: u32,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: String,
}

impl OpenAiChat {
    /// 새 챗 클라이언트 생성
    pub fn new(api_key: String, model: String) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "OpenAI API 키가 비어 있습니다");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            api_key,
            model,
            client,
        })
    }
}

#[async_trait]
impl AnswerProvider for OpenAiChat {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<String> {
        let request = ChatRequest {
            model: &self.model,
            // 일관성 있는 답변을 위한 낮은 온도
            temperature: 0.3,
            max_tokens: 1000,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
        };

        let response = self
            .client
            .post(OPENAI_CHAT_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("답변 생성 요청 실패")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("답변 응답 본문 읽기 실패")?;

        if !status.is_success() {
            anyhow::bail!("OpenAI chat API error ({}): {}", status, body);
        }

        let parsed: ChatResponse =
            serde_json::from_str(&body).context("답변 응답 파싱 실패")?;

        parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| anyhow::anyhow!("답변 응답에 choices가 없습니다"))
    }
}

// ============================================================================
// Prompts
// ============================================================================

/// 소스 타입별 시스템 프롬프트
pub fn system_prompt(source_type: SourceType) -> &'static str {
    match source_type {
        SourceType::Blog => {
            "당신은 네이버 블로그 데이터를 기반으로 정확하고 유용한 정보를 제공하는 도우미입니다.\n\
             블로그 글은 개인의 경험과 의견을 담고 있으므로, 주관적인 내용이 포함될 수 있음을 인지하세요.\n\
             여러 블로그의 정보를 종합하여 균형 잡힌 시각을 제공하되, 정보의 출처가 개인 블로그임을 명시하세요.\n\
             특히 레시피, DIY 방법, 여행 경험 등 실용적인 정보에 집중하되, 의학적 조언이나 전문적인 내용은 참고 정보로만 안내하세요."
        }
        SourceType::News => {
            "당신은 네이버 뉴스 데이터를 기반으로 정확하고 객관적인 정보를 제공하는 도우미입니다.\n\
             뉴스 기사의 사실과 정보를 전달할 때는 편향되지 않게 중립적인 입장을 유지하세요.\n\
             여러 언론사의 기사를 비교하여 다양한 관점을 제시하고, 정보의 출처와 발행 날짜를 명확히 하세요.\n\
             특히 시사 문제, 최신 이슈, 사회 현상에 대해 설명할 때는 다양한 의견이 있을 수 있음을 인지하세요."
        }
        SourceType::Shopping => {
            "당신은 네이버 쇼핑 데이터를 기반으로 정확하고 유용한 정보를 제공하는 도우미입니다.\n\
             상품 정보, 가격, 기능, 특징 등을 객관적으로 설명하고 비교하세요.\n\
             다양한 상품 옵션과 가격대를 안내하되, 특정 브랜드나 제품을 지나치게 홍보하지 마세요.\n\
             사용자의 요구에 맞는 상품 추천이나 구매 팁을 제공할 때는 실용적인 관점에서 접근하세요."
        }
    }
}

/// 소스 타입별 사용자 프롬프트
pub fn user_prompt(query: &str, context_text: &str, source_type: SourceType) -> String {
    match source_type {
        SourceType::Blog => format!(
            "다음은 네이버 블로그에서 수집한 데이터입니다:\n\n{context_text}\n\n\
             위 블로그 글들을 바탕으로 다음 질문에 상세히 답변해주세요:\n\"{query}\"\n\n\
             답변 작성 규칙:\n\
             1. 한국어로 자연스럽게 답변해주세요.\n\
             2. 블로그 글은 개인의 경험과 의견을 담고 있으므로, 정보의 주관성을 고려해주세요.\n\
             3. 여러 블로그의 공통된 내용에 중점을 두고, 개인적 경험이나 팁은 \"블로거의 경험에 따르면...\"과 같이 맥락을 제공해주세요.\n\
             4. 상충되는 정보가 있다면 다양한 의견을 함께 제시해주세요.\n\
             5. 출처를 명시할 때는 \"문서 2의 블로거에 따르면...\"과 같이 표현해주세요.\n\
             6. 제공된 문서 내용만 사용하고, 문서에 없는 내용은 추측하거나 답변하지 마세요."
        ),
        SourceType::News => format!(
            "다음은 네이버 뉴스에서 수집한, 신뢰할 수 있는 언론사의 기사입니다:\n\n{context_text}\n\n\
             위 뉴스 기사들을 바탕으로 다음 질문에 상세히 답변해주세요:\n\"{query}\"\n\n\
             답변 작성 규칙:\n\
             1. 한국어로 자연스럽게 답변해주세요.\n\
             2. 뉴스 기사의 사실과 정보를 전달할 때는 편향되지 않게 중립적인 입장을 유지하세요.\n\
             3. 기사의 발행 날짜를 고려하여 정보의 시의성을 명시하세요.\n\
             4. 여러 언론사의 기사를 인용할 때는 \"문서 1의 OO일보에 따르면...\"과 같이 출처를 명확히 하세요.\n\
             5. 기사들 간에 상충되는 정보가 있다면 이를 언급하고 각 관점을 공정하게 제시하세요.\n\
             6. 제공된 기사 내용만 사용하고, 기사에 없는 내용은 추측하거나 답변하지 마세요."
        ),
        SourceType::Shopping => format!(
            "다음은 네이버 쇼핑에서 수집한 상품 정보입니다:\n\n{context_text}\n\n\
             위 쇼핑 데이터를 바탕으로 다음 질문에 상세히 답변해주세요:\n\"{query}\"\n\n\
             답변 작성 규칙:\n\
             1. 한국어로 자연스럽게 답변해주세요.\n\
             2. 상품의 가격, 기능, 특징 등을 객관적으로 설명하고 비교해주세요.\n\
             3. 가격은 범위로 표현하고 정확한 가격이 있다면 언급해주세요.\n\
             4. 다양한 브랜드와 제품을 균형 있게 소개하고, 특정 상품을 지나치게 홍보하지 마세요.\n\
             5. 제공된 상품 정보만 사용하고, 문서에 없는 내용은 추측하거나 답변하지 마세요."
        ),
    }
}

// ============================================================================
// Context Building
// ============================================================================

/// 검색 결과를 LLM 컨텍스트 텍스트로 변환
///
/// 상위 5건만 사용하며, 문서마다 제목/날짜/출처/유사도를 붙입니다.
pub fn build_context(results: &[ScoredDocument], source_type: SourceType) -> String {
    let mut contexts = Vec::new();

    for (i, result) in results.iter().take(MAX_CONTEXT_DOCS).enumerate() {
        let metadata = &result.document.metadata;
        let title = metadata.title().unwrap_or("제목 없음");

        let date_info = metadata
            .date()
            .map(|d| format!(" (작성일: {})", d))
            .unwrap_or_default();

        let source_info = match metadata {
            Metadata::Blog(m) if !m.bloggername.is_empty() => {
                format!(" - 블로거: {}", m.bloggername)
            }
            Metadata::News(m) if !m.publisher.is_empty() => {
                format!(" - 출처: {}", m.publisher)
            }
            Metadata::Shopping(m) if !m.mallname.is_empty() => {
                if m.lprice.is_empty() {
                    format!(" - 판매처: {}", m.mallname)
                } else {
                    format!(" - 판매처: {}, 가격: {}원", m.mallname, m.lprice)
                }
            }
            _ => String::new(),
        };

        let similarity_info = format!(" (유사도: {:.1}%)", result.similarity * 100.0);

        contexts.push(format!(
            "문서 {} - [{}] {}{}{}{}:\n{}\n",
            i + 1,
            source_type.display_name(),
            title,
            date_info,
            source_info,
            similarity_info,
            result.document.content
        ));
    }

    contexts.join("\n")
}

/// 검색 결과 기반 답변 생성
///
/// 결과가 비어 있으면 LLM 호출 없이 안내 문구를 반환합니다.
pub async fn generate_answer(
    provider: &dyn AnswerProvider,
    query: &str,
    results: &[ScoredDocument],
    source_type: SourceType,
) -> Result<String> {
    if results.is_empty() {
        return Ok(format!(
            "죄송합니다. 입력하신 '{}'에 대한 {} 검색 결과를 찾을 수 없습니다. \
             다른 검색어나 다른 소스 타입으로 시도해보세요.",
            query,
            source_type.display_name()
        ));
    }

    let context_text = build_context(results, source_type);
    let system = system_prompt(source_type);
    let user = user_prompt(query, &context_text, source_type);

    provider.complete(system, &user).await
}

// ============================================================================
// Tests
// ============================================================================
