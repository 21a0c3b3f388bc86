//! 수집/검색 파이프라인
//!
//! 네이버 검색 결과를 임베딩해 저장하는 수집 파이프라인과,
//! 쿼리를 임베딩해 유사도 인덱스에 묻는 검색 파이프라인입니다.
//! 전역 가변 상태 없이 요청 구조체가 들어오고 결과가 나갑니다.

use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;

use crate::embedding::{embed_text, EmbeddingProvider};
use crate::naver::{strip_tags, NaverItem};
use crate::store::{
    BlogMeta, DocumentStore, Metadata, NewDocument, NewsMeta, ScoredDocument, ShoppingMeta,
    SimilarityIndex, SourceType,
};

/// 수집 항목의 최소 본문 길이 (문자 수)
const MIN_ENTRY_CHARS: usize = 20;

// ============================================================================
// Types
// ============================================================================

/// 검색 요청
#[derive(Debug, Clone)]
pub struct SearchRequest {
    pub query: String,
    pub source_type: SourceType,
    /// 최대 결과 수
    pub limit: usize,
    /// 기본 유사도 임계값 (소스별로 보정됨)
    pub threshold: f32,
}

impl SearchRequest {
    /// 소스 타입별 쿼리 프리픽스 적용
    ///
    /// 짧은 키워드 쿼리를 소스 도메인 쪽으로 끌어당겨
    /// 임베딩 매칭률을 높입니다.
    pub fn prefixed_query(&self) -> String {
        match self.source_type {
            SourceType::News => format!("뉴스 검색: {} 뉴스 기사 언론사 보도", self.query),
            SourceType::Shopping => format!("상품 검색: {} 쇼핑 상품 가격", self.query),
            SourceType::Blog => format!("블로그 검색: {} 블로그 포스팅", self.query),
        }
    }

    /// 소스 타입별 임계값 보정
    ///
    /// 뉴스는 제목/본문이 건조해 유사도가 낮게 나오므로 더 관대한
    /// 임계값을 적용합니다.
    pub fn adjusted_threshold(&self) -> f32 {
        match self.source_type {
            SourceType::News => (self.threshold - 0.3).max(0.1),
            _ => (self.threshold - 0.2).max(0.2),
        }
    }
}

/// 수집 결과 보고
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IngestReport {
    /// API에서 받은 항목 수
    pub fetched: usize,
    /// 새로 저장된 수
    pub saved: usize,
    /// 건너뛴 수 (본문 부족, 중복, 임베딩 생략)
    pub skipped: usize,
    /// 항목 단위 실패 수 (임베딩/저장 오류)
    pub failed: usize,
}

// ============================================================================
// Entry Building
// ============================================================================

/// 원문 링크에서 언론사 호스트 추출
fn extract_publisher(originallink: &str) -> String {
    if originallink.is_empty() {
        return String::new();
    }

    if let Ok(parsed) = url::Url::parse(originallink) {
        if let Some(host) = parsed.host_str() {
            return host.to_string();
        }
    }

    // 스킴이 빠진 값 등 URL 파싱이 안 되는 경우
    originallink
        .trim_start_matches("https://")
        .trim_start_matches("http://")
        .split('/')
        .next()
        .unwrap_or("")
        .to_string()
}

/// 검색 결과 항목을 저장 가능한 (본문, 메타데이터) 쌍으로 변환
///
/// 소스 타입별로 라벨이 붙은 본문 텍스트를 구성합니다. 정리 후
/// 본문이 너무 짧으면 `None`을 반환하여 항목을 건너뜁니다.
pub fn build_entry(item: &NaverItem, source_type: SourceType) -> Option<(String, Metadata)> {
    let title = strip_tags(&item.title);
    let collected_at = Some(Utc::now().to_rfc3339());

    let (full_text, metadata) = match source_type {
        SourceType::Blog => {
            let content = strip_tags(&item.description);
            let full_text = format!(
                "제목: {}\n내용: {}\n블로거: {}\n카테고리: 블로그",
                title, content, item.bloggername
            );
            let metadata = Metadata::Blog(BlogMeta {
                title,
                url: item.link.clone(),
                bloggername: item.bloggername.clone(),
                date: item.postdate.clone(),
                collected_at,
            });
            (full_text, metadata)
        }
        SourceType::News => {
            let content = strip_tags(&item.description);
            let publisher = extract_publisher(&item.originallink);
            let full_text = format!(
                "뉴스 제목: {}\n뉴스 내용: {}\n언론사: {}\n날짜: {}\n분류: 뉴스 기사",
                title, content, publisher, item.pub_date
            );
            let metadata = Metadata::News(NewsMeta {
                title,
                url: item.link.clone(),
                publisher,
                date: item.pub_date.clone(),
                collected_at,
            });
            (full_text, metadata)
        }
        SourceType::Shopping => {
            let category = strip_tags(&item.category3);
            let content = if category.is_empty() {
                title.clone()
            } else {
                format!("{}. {}", title, category)
            };
            let full_text = format!(
                "상품명: {}\n설명: {}\n브랜드: {}\n제조사: {}\n판매처: {}\n카테고리: 쇼핑",
                title, content, item.brand, item.maker, item.mall_name
            );
            let metadata = Metadata::Shopping(ShoppingMeta {
                title,
                url: item.link.clone(),
                lprice: item.lprice.clone(),
                hprice: item.hprice.clone(),
                mallname: item.mall_name.clone(),
                maker: item.maker.clone(),
                brand: item.brand.clone(),
                collected_at,
            });
            (full_text, metadata)
        }
    };

    if full_text.trim().chars().count() < MIN_ENTRY_CHARS {
        return None;
    }

    Some((full_text, metadata))
}

// ============================================================================
// Pipeline
// ============================================================================

/// 수집/검색 파이프라인
///
/// 저장소, 유사도 인덱스, 임베딩 프로바이더를 묶습니다.
pub struct Pipeline {
    store: Arc<dyn DocumentStore>,
    index: Box<dyn SimilarityIndex>,
    embedder: Arc<dyn EmbeddingProvider>,
}

impl Pipeline {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        index: Box<dyn SimilarityIndex>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            store,
            index,
            embedder,
        }
    }

    /// 검색 결과 항목들을 임베딩하여 저장
    ///
    /// 항목 단위 실패(임베딩 오류, 저장 오류)는 경고만 남기고
    /// 나머지 항목을 계속 처리합니다. URL 중복 체크는 조회-후-삽입
    /// 방식이라 동시 수집 시 중복 행이 생길 수 있습니다. 저장소가
    /// 유니크 제약을 갖지 않는 한 감수하는 동작입니다.
    pub async fn ingest(&self, items: &[NaverItem], source_type: SourceType) -> IngestReport {
        let mut report = IngestReport {
            fetched: items.len(),
            ..Default::default()
        };

        for (i, item) in items.iter().enumerate() {
            let (full_text, metadata) = match build_entry(item, source_type) {
                Some(entry) => entry,
                None => {
                    tracing::debug!("Item {} too short, skipping", i + 1);
                    report.skipped += 1;
                    continue;
                }
            };

            // 임베딩 생성 - 실패는 이 항목에만 치명적
            let embedding = match embed_text(self.embedder.as_ref(), &full_text).await {
                Ok(Some(v)) => v,
                Ok(None) => {
                    report.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!("항목 {} 임베딩 실패: {:#}", i + 1, e);
                    report.failed += 1;
                    continue;
                }
            };

            // URL 기반 중복 체크
            if let Some(doc_url) = metadata.url() {
                match self.store.find_by_url(doc_url).await {
                    Ok(existing) if !existing.is_empty() => {
                        tracing::debug!("Duplicate URL, skipping: {}", doc_url);
                        report.skipped += 1;
                        continue;
                    }
                    Ok(_) => {}
                    Err(e) => {
                        tracing::warn!("항목 {} 중복 조회 실패: {:#}", i + 1, e);
                        report.failed += 1;
                        continue;
                    }
                }
            }

            let doc = NewDocument {
                content: full_text,
                embedding,
                metadata,
            };

            match self.store.insert(&doc).await {
                Ok(id) => {
                    tracing::debug!("Inserted document id={}", id);
                    report.saved += 1;
                }
                Err(e) => {
                    tracing::warn!("항목 {} 저장 실패: {:#}", i + 1, e);
                    report.failed += 1;
                }
            }
        }

        tracing::info!(
            "Ingest done ({}): fetched={}, saved={}, skipped={}, failed={}",
            source_type,
            report.fetched,
            report.saved,
            report.skipped,
            report.failed
        );

        report
    }

    /// 시맨틱 검색
    ///
    /// 소스 프리픽스가 붙은 쿼리를 임베딩해 설정된 인덱스에
    /// 질의합니다.
    pub async fn search(&self, request: &SearchRequest) -> Result<Vec<ScoredDocument>> {
        let query_text = request.prefixed_query();

        let query_embedding = embed_text(self.embedder.as_ref(), &query_text)
            .await
            .context("쿼리 임베딩 생성 실패")?
            .ok_or_else(|| anyhow::anyhow!("검색어가 너무 짧습니다"))?;

        self.index
            .search(
                &query_embedding,
                Some(request.source_type),
                request.adjusted_threshold(),
                request.limit,
            )
            .await
    }

    /// 내부 스토어 접근
    pub fn store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }
}

// ============================================================================
// Tests
// ============================================================================
