//! 임베딩 모듈 - 텍스트 벡터화 및 정규화
//!
//! 텍스트를 OpenAI 임베딩 API로 벡터화합니다. 저장/질의되는 모든
//! 벡터는 [`EMBEDDING_DIMENSION`] 차원으로 강제됩니다. 차원이
//! 섞이면 코사인 유사도 계산이 무의미해지기 때문입니다.

use std::sync::OnceLock;
use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use regex::Regex;
use serde::{Deserialize, Serialize};

/// 벡터 테이블의 고정 임베딩 차원
///
/// Supabase documents 테이블의 vector(1536) 컬럼과 일치해야 합니다.
pub const EMBEDDING_DIMENSION: usize = 1536;

/// 임베딩 입력 최대 길이 (문자 수)
pub const MAX_INPUT_CHARS: usize = 512;

/// 임베딩 입력 최소 길이. 이보다 짧으면 임베딩을 생성하지 않습니다
pub const MIN_INPUT_CHARS: usize = 10;

/// OpenAI 임베딩 API 엔드포인트
const OPENAI_EMBED_URL: &str = "https://api.openai.com/v1/embeddings";

// ============================================================================
// EmbeddingProvider Trait
// ============================================================================

/// 임베딩 프로바이더 트레이트
///
/// 텍스트를 벡터로 변환하는 인터페이스입니다.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// 단일 텍스트 임베딩
    ///
    /// 반환 벡터의 차원은 백엔드 모델의 네이티브 차원입니다.
    /// 고정 차원 강제는 호출자가 [`fit_dimension`]으로 수행합니다.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// 임베딩 차원 수 (백엔드 네이티브)
    fn dimension(&self) -> usize;

    /// 프로바이더 이름
    fn name(&self) -> &str;
}

// ============================================================================
// OpenAI Embedding
// ============================================================================

/// OpenAI 임베딩 구현체
///
/// 재시도 없이 단일 호출로 동작합니다. 실패는 현재 항목에만
/// 치명적이며, 배치 수집 중에는 호출자가 해당 항목을 건너뜁니다.
pub struct OpenAiEmbedding {
    api_key: String,
    model: String,
    client: reqwest::Client,
    dimension: usize,
}

#[derive(Debug, Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Debug, Deserialize)]
struct EmbedData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedding {
    /// 새 임베딩 클라이언트 생성
    ///
    /// # Arguments
    /// * `api_key` - OpenAI API 키
    /// * `model` - 임베딩 모델 이름 (예: text-embedding-3-small)
    pub fn new(api_key: String, model: String) -> Result<Self> {
        anyhow::ensure!(!api_key.trim().is_empty(), "OpenAI API 키가 비어 있습니다");

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        // text-embedding-3-small 기준 네이티브 차원
        let dimension = EMBEDDING_DIMENSION;

        Ok(Self {
            api_key,
            model,
            client,
            dimension,
        })
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiEmbedding {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbedRequest {
            model: &self.model,
            input: text,
        };

        let response = self
            .client
            .post(OPENAI_EMBED_URL)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .context("Failed to send embedding request")?;

        let status = response.status();
        let body = response
            .text()
            .await
            .context("Failed to read embedding response body")?;

        if !status.is_success() {
            anyhow::bail!("OpenAI embedding API error ({}): {}", status, body);
        }

        let parsed: EmbedResponse =
            serde_json::from_str(&body).context("Failed to parse embedding response")?;

        parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .ok_or_else(|| anyhow::anyhow!("Embedding response contained no data"))
    }

    fn dimension(&self) -> usize {
        self.dimension
    }

    fn name(&self) -> &str {
        &self.model
    }
}

// ============================================================================
// Text Normalization
// ============================================================================

fn whitespace_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"\s+").expect("valid regex"))
}

fn special_chars_re() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    // 단어 문자, 공백, 한글, 마침표만 유지
    RE.get_or_init(|| Regex::new(r"[^\w\s가-힣\.]").expect("valid regex"))
}

/// 임베딩 입력용 텍스트 정규화
///
/// 공백을 정규화하고 특수문자를 제거한 뒤 512자로 자릅니다.
/// 10자 미만의 텍스트는 `None`입니다. 의미 없는 벡터를 만드느니
/// 임베딩을 건너뜁니다.
pub fn normalize_for_embedding(text: &str) -> Option<String> {
    let trimmed = text.trim();
    if trimmed.chars().count() < MIN_INPUT_CHARS {
        return None;
    }

    let cleaned = special_chars_re().replace_all(trimmed, " ");
    let cleaned = whitespace_re().replace_all(&cleaned, " ");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() < MIN_INPUT_CHARS {
        return None;
    }

    // UTF-8 경계 안전하게 512자 제한
    if cleaned.chars().count() > MAX_INPUT_CHARS {
        Some(cleaned.chars().take(MAX_INPUT_CHARS).collect())
    } else {
        Some(cleaned.to_string())
    }
}

/// 벡터를 고정 차원으로 강제
///
/// 짧은 벡터는 0으로 패딩하고 긴 벡터는 자릅니다. 768차원 모델
/// 출력을 1536 컬럼에 맞추던 운영 스키마를 그대로 따릅니다.
/// 제로 패딩은 패딩된 벡터끼리의 코사인 유사도를 바꾸지 않지만,
/// 네이티브 차원이 다른 모델의 벡터를 한 테이블에 섞으면 안 됩니다.
pub fn fit_dimension(mut vector: Vec<f32>, target: usize) -> Vec<f32> {
    if vector.len() == target {
        return vector;
    }

    if vector.len() != 768 {
        tracing::warn!(
            "Unexpected embedding dimension {} (fitting to {})",
            vector.len(),
            target
        );
    }

    if vector.len() < target {
        vector.resize(target, 0.0);
        vector
    } else {
        vector.truncate(target);
        vector
    }
}

/// 정규화 + 임베딩 + 차원 강제 파이프라인
///
/// 텍스트가 너무 짧으면 `Ok(None)`, 백엔드 실패는 `Err`로
/// 전파됩니다 (호출자가 항목 단위로 건너뜁니다).
pub async fn embed_text(
    provider: &dyn EmbeddingProvider,
    text: &str,
) -> Result<Option<Vec<f32>>> {
    let normalized = match normalize_for_embedding(text) {
        Some(t) => t,
        None => {
            tracing::debug!("Text too short to embed, skipping");
            return Ok(None);
        }
    };

    let vector = provider.embed(&normalized).await?;
    Ok(Some(fit_dimension(vector, EMBEDDING_DIMENSION)))
}

// ============================================================================
// Tests
// ============================================================================
