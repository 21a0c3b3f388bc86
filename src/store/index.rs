//! 유사도 인덱스 - 원격 RPC / 클라이언트 측 구현
//!
//! 같은 검색 계약을 두 가지 방식으로 제공합니다. 어느 쪽을 쓸지는
//! 설정 시점에 결정되며, 런타임에 예외를 잡아 폴백하지 않습니다.

use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;

use super::document::SourceType;
use super::ranker::{rank_candidates, ScoredDocument};
use super::supabase::DocumentStore;

/// RPC 검색 시 컬렉션 필터링 후에도 limit을 채우기 위한 초과 조회 배수
const OVERFETCH_FACTOR: usize = 5;

// ============================================================================
// SimilarityIndex Trait
// ============================================================================

/// 유사도 검색 인터페이스
///
/// 쿼리 벡터를 받아 컬렉션 필터와 임계값을 적용한 상위 결과를
/// 반환합니다.
#[async_trait]
pub trait SimilarityIndex: Send + Sync {
    async fn search(
        &self,
        query: &[f32],
        source_type: Option<SourceType>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>>;
}

// ============================================================================
// RemoteSimilarityIndex
// ============================================================================

/// 서버 측 벡터 검색 (match_documents RPC)
///
/// RPC는 컬렉션을 모르므로 limit보다 넉넉히 가져온 뒤
/// 클라이언트에서 컬렉션 필터 → 재정렬 → 절단합니다.
pub struct RemoteSimilarityIndex {
    store: Arc<dyn DocumentStore>,
}

impl RemoteSimilarityIndex {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SimilarityIndex for RemoteSimilarityIndex {
    async fn search(
        &self,
        query: &[f32],
        source_type: Option<SourceType>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let fetch = limit.saturating_mul(OVERFETCH_FACTOR).max(limit);
        let mut rows = self.store.match_documents(query, threshold, fetch).await?;

        if let Some(wanted) = source_type {
            rows.retain(|r| r.document.metadata.source_type() == Some(wanted));
        }

        // RPC가 정렬해 주지만 필터링 후 순서를 보장하기 위해 재정렬
        rows.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        rows.truncate(limit);

        Ok(rows)
    }
}

// ============================================================================
// ClientSideSimilarityIndex
// ============================================================================

/// 클라이언트 측 전체 스캔 검색
///
/// RPC 함수가 배포되지 않은 환경용. 전체 테이블을 가져와
/// 유사도 랭커로 점수 계산/필터/정렬합니다.
pub struct ClientSideSimilarityIndex {
    store: Arc<dyn DocumentStore>,
}

impl ClientSideSimilarityIndex {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl SimilarityIndex for ClientSideSimilarityIndex {
    async fn search(
        &self,
        query: &[f32],
        source_type: Option<SourceType>,
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let candidates = self.store.scan_all().await?;
        tracing::debug!("Client-side ranking over {} documents", candidates.len());

        Ok(rank_candidates(query, &candidates, source_type, threshold, limit))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIMENSION;
    use crate::store::document::{Metadata, NewDocument, NewsMeta, ShoppingMeta};
    use crate::store::memory::MemoryStore;

    fn unit_vector(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIMENSION];
        v[axis] = 1.0;
        v
    }

    fn news_doc(n: usize, embedding: Vec<f32>) -> NewDocument {
        NewDocument {
            content: format!("뉴스 본문 {}", n),
            embedding,
            metadata: Metadata::News(NewsMeta {
                title: format!("뉴스 {}", n),
                url: format!("https://news.example.com/{}", n),
                publisher: "연합뉴스".to_string(),
                date: String::new(),
                collected_at: None,
            }),
        }
    }

    fn shop_doc(n: usize, embedding: Vec<f32>) -> NewDocument {
        NewDocument {
            content: format!("상품 {}", n),
            embedding,
            metadata: Metadata::Shopping(ShoppingMeta {
                title: format!("상품 {}", n),
                url: format!("https://shop.example.com/{}", n),
                lprice: "10000".to_string(),
                hprice: String::new(),
                mallname: "몰".to_string(),
                maker: String::new(),
                brand: String::new(),
                collected_at: None,
            }),
        }
    }

    async fn seeded_store() -> Arc<MemoryStore> {
        let store = Arc::new(MemoryStore::new());
        store.insert(&news_doc(1, unit_vector(0))).await.unwrap();
        store.insert(&news_doc(2, unit_vector(1))).await.unwrap();
        store.insert(&shop_doc(3, unit_vector(0))).await.unwrap();
        store
    }

    #[tokio::test]
    async fn test_client_side_index_filters_and_ranks() {
        let store = seeded_store().await;
        let index = ClientSideSimilarityIndex::new(store);

        let results = index
            .search(&unit_vector(0), Some(SourceType::News), 0.3, 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.metadata.title(), Some("뉴스 1"));
    }

    #[tokio::test]
    async fn test_remote_index_filters_after_rpc() {
        let store = seeded_store().await;
        let index = RemoteSimilarityIndex::new(store);

        // 쇼핑 문서도 유사도 1.0이지만 컬렉션 필터로 제외
        let results = index
            .search(&unit_vector(0), Some(SourceType::News), 0.3, 10)
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert_eq!(
            results[0].document.metadata.source_type(),
            Some(SourceType::News)
        );
    }

    #[tokio::test]
    async fn test_remote_index_respects_limit() {
        let store = Arc::new(MemoryStore::new());
        for i in 0..10 {
            store.insert(&news_doc(i, unit_vector(0))).await.unwrap();
        }
        let index = RemoteSimilarityIndex::new(store);

        let results = index
            .search(&unit_vector(0), Some(SourceType::News), 0.1, 3)
            .await
            .unwrap();
        assert_eq!(results.len(), 3);
    }

    #[tokio::test]
    async fn test_index_empty_store() {
        let store = Arc::new(MemoryStore::new());
        let index = ClientSideSimilarityIndex::new(store);

        let results = index.search(&unit_vector(0), None, 0.3, 10).await.unwrap();
        assert!(results.is_empty());
    }
}
