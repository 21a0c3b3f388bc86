//! 테스트용 인메모리 문서 저장소
//!
//! 원격 테이블 없이 파이프라인/인덱스 동작을 검증하기 위한
//! [`DocumentStore`] 구현입니다. 벡터 검색은 전체 항목에 대한
//! 브루트포스 코사인 유사도입니다.

use std::sync::RwLock;

use anyhow::Result;
use async_trait::async_trait;

use super::document::{Document, NewDocument, SourceType};
use super::ranker::{cosine_similarity, ScoredDocument};
use super::supabase::DocumentStore;

/// 인메모리 저장소
pub struct MemoryStore {
    rows: RwLock<Vec<Document>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            rows: RwLock::new(Vec::new()),
        }
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, doc: &NewDocument) -> Result<i64> {
        let mut rows = self.rows.write().expect("lock poisoned");
        let id = rows.len() as i64 + 1;
        rows.push(Document {
            id,
            content: doc.content.clone(),
            embedding: Some(doc.embedding.clone()),
            metadata: doc.metadata.clone(),
        });
        Ok(id)
    }

    async fn match_documents(
        &self,
        query: &[f32],
        threshold: f32,
        limit: usize,
    ) -> Result<Vec<ScoredDocument>> {
        let rows = self.rows.read().expect("lock poisoned");

        let mut scored: Vec<ScoredDocument> = rows
            .iter()
            .filter_map(|doc| {
                let embedding = doc.embedding.as_ref()?;
                let similarity = cosine_similarity(query, embedding);
                if similarity > threshold {
                    Some(ScoredDocument {
                        document: doc.clone(),
                        similarity,
                    })
                } else {
                    None
                }
            })
            .collect();

        scored.sort_by(|a, b| {
            b.similarity
                .partial_cmp(&a.similarity)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        scored.truncate(limit);
        Ok(scored)
    }

    async fn scan_all(&self) -> Result<Vec<Document>> {
        Ok(self.rows.read().expect("lock poisoned").clone())
    }

    async fn count(&self) -> Result<usize> {
        Ok(self.rows.read().expect("lock poisoned").len())
    }

    async fn find_by_url(&self, url: &str) -> Result<Vec<Document>> {
        let rows = self.rows.read().expect("lock poisoned");
        Ok(rows
            .iter()
            .filter(|doc| doc.metadata.url() == Some(url))
            .cloned()
            .collect())
    }

    async fn list_by_collection(
        &self,
        source: SourceType,
        limit: usize,
    ) -> Result<Vec<Document>> {
        let rows = self.rows.read().expect("lock poisoned");
        Ok(rows
            .iter()
            .filter(|doc| doc.metadata.source_type() == Some(source))
            .take(limit)
            .cloned()
            .collect())
    }
}
