//! Supabase Document Store - PostgREST 기반 원격 벡터 테이블
//!
//! documents 테이블(content, embedding vector(1536), metadata jsonb)에
//! 대한 삽입/조회와 match_documents RPC 벡터 검색을 제공합니다.
//! ref: https://postgrest.org/en/stable/references/api.html

use std::time::Duration;

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Deserialize;

use crate::config::SupabaseConfig;

use super::document::{Document, Metadata, NewDocument, SourceType};
use super::ranker::ScoredDocument;

/// 문서 테이블 이름
const TABLE_NAME: &str = "documents";

/// 벡터 검색 RPC 함수 이름
const MATCH_RPC: &str = "match_documents";

// ============================================================================
// DocumentStore Trait
// ============================================================================

/// 문서 저장소 트레이트
///
/// 원격 벡터 테이블의 공통 인터페이스입니다.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// 문서 삽입, 생성된 행 id 반환
    async fn insert(&self, doc: &NewDocument) -> Result<i64>;

    /// 서버 측 벡터 유사도 검색 (match_documents RPC)
    async fn match_documents(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;

    /// 전체 문서 스캔 (클라이언트 측 랭킹 폴백용)
    async fn scan_all(&self) -> Result<Vec<Document>>;

    /// 저장된 문서 수
    async fn count(&self) -> Result<usize>;

    /// metadata.url이 일치하는 문서 조회 (중복 체크용)
    async fn find_by_url(&self, url: &str) -> Result<Vec<Document>>;

    /// 컬렉션별 문서 목록
    async fn list_by_collection(
        &self,
        source: SourceType,
        limit: usize,
    ) -> Result<Vec<Document>>;
}

// ============================================================================
// SupabaseStore
// ============================================================================

/// Supabase PostgREST 문서 저장소
pub struct SupabaseStore {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

/// match_documents RPC 응답 행
#[derive(Debug, Deserialize)]
struct MatchRow {
    id: i64,
    content: String,
    #[serde(default)]
    metadata: serde_json::Value,
    similarity: f32,
}

/// insert 응답 행 (Prefer: return=representation)
#[derive(Debug, Deserialize)]
struct InsertedRow {
    id: i64,
}

impl SupabaseStore {
    /// 새 저장소 클라이언트 생성
    pub fn new(config: &SupabaseConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self {
            client,
            base_url: format!("{}/rest/v1", config.url.trim_end_matches('/')),
            api_key: config.key.clone(),
        })
    }

    fn table_url(&self) -> String {
        format!("{}/{}", self.base_url, TABLE_NAME)
    }

    /// 인증 헤더가 붙은 요청 빌더
    fn request(&self, method: reqwest::Method, url: &str) -> reqwest::RequestBuilder {
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(&self.api_key)
    }

    /// 응답 상태 확인 후 본문 반환
    async fn read_body(response: reqwest::Response, action: &str) -> Result<String> {
        let status = response.status();
        let body = response
            .text()
            .await
            .with_context(|| format!("{} 응답 본문 읽기 실패", action))?;

        if !status.is_success() {
            anyhow::bail!("{} 실패 ({}): {}", action, status, body);
        }
        Ok(body)
    }
}

#[async_trait]
impl DocumentStore for SupabaseStore {
    async fn insert(&self, doc: &NewDocument) -> Result<i64> {
        let response = self
            .request(reqwest::Method::POST, &self.table_url())
            .header("Prefer", "return=representation")
            .json(doc)
            .send()
            .await
            .context("문서 삽입 요청 실패")?;

        let body = Self::read_body(response, "문서 삽입").await?;
        let rows: Vec<InsertedRow> =
            serde_json::from_str(&body).context("삽입 응답 파싱 실패")?;

        rows.first()
            .map(|r| r.id)
            .ok_or_else(|| anyhow::anyhow!("삽입 응답에 행이 없습니다"))
    }

    async fn match_documents(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let url = format!("{}/rpc/{}", self.base_url, MATCH_RPC);
        let payload = serde_json::json!({
            "query_embedding": query,
            "match_threshold": threshold,
            "match_count": limit,
        });

        let response = self
            .request(reqwest::Method::POST, &url)
            .json(&payload)
            .send()
            .await
            .context("벡터 검색 RPC 요청 실패")?;

        let body = Self::read_body(response, "벡터 검색 RPC").await?;
        let rows: Vec<MatchRow> =
            serde_json::from_str(&body).context("RPC 응답 파싱 실패")?;

        let results = rows
            .into_iter()
            .map(|row| {
                let metadata =
                    serde_json::from_value::<Metadata>(row.metadata).unwrap_or(Metadata::Unknown);
                ScoredDocument {
                    document: Document {
                        id: row.id,
                        content: row.content,
                        embedding: None,
                        metadata,
                    },
                    similarity: row.similarity,
                }
            })
            .collect();

        Ok(results)
    }

    async fn scan_all(&self) -> Result<Vec<Document>> {
        let response = self
            .request(reqwest::Method::GET, &self.table_url())
            .query(&[("select", "id,content,metadata,embedding")])
            .send()
            .await
            .context("전체 문서 조회 요청 실패")?;

        let body = Self::read_body(response, "전체 문서 조회").await?;
        serde_json::from_str(&body).context("문서 목록 파싱 실패")
    }

    async fn count(&self) -> Result<usize> {
        let response = self
            .request(reqwest::Method::GET, &self.table_url())
            .query(&[("select", "id")])
            .header("Prefer", "count=exact")
            .header("Range", "0-0")
            .send()
            .await
            .context("문서 수 조회 요청 실패")?;

        // Content-Range: 0-0/123 형식에서 전체 개수 추출
        let total = response
            .headers()
            .get("content-range")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.rsplit('/').next())
            .and_then(|n| n.parse::<usize>().ok());

        let status = response.status();
        if !status.is_success() {
            anyhow::bail!("문서 수 조회 실패 ({})", status);
        }

        total.ok_or_else(|| anyhow::anyhow!("Content-Range 헤더를 해석할 수 없습니다"))
    }

    async fn find_by_url(&self, url: &str) -> Result<Vec<Document>> {
        let url_filter = format!("eq.{}", url);
        let response = self
            .request(reqwest::Method::GET, &self.table_url())
            .query(&[
                ("select", "id,content,metadata"),
                ("metadata->>url", url_filter.as_str()),
            ])
            .send()
            .await
            .context("URL 중복 조회 요청 실패")?;

        let body = Self::read_body(response, "URL 중복 조회").await?;
        serde_json::from_str(&body).context("중복 조회 응답 파싱 실패")
    }

    async fn list_by_collection(
        &self,
        source: SourceType,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let collection_filter = format!("eq.{}", source.as_str());
        let limit = limit.to_string();
        let response = self
            .request(reqwest::Method::GET, &self.table_url())
            .query(&[
                ("select", "id,content,metadata"),
                ("metadata->>collection", collection_filter.as_str()),
                ("order", "id.desc"),
                ("limit", limit.as_str()),
            ])
            .send()
            .await
            .context("컬렉션 목록 조회 요청 실패")?;

        let body = Self::read_body(response, "컬렉션 목록 조회").await?;
        serde_json::from_str(&body).context("컬렉션 목록 파싱 실패")
    }
}

// ============================================================================
// Tests
// ============================================================================
