//! 유사도 랭커 - 클라이언트 측 코사인 유사도 검색
//!
//! 원격 RPC 검색을 쓸 수 없을 때 전체 스캔 결과를 대상으로
//! 점수 계산 → 필터 → 정렬 → 절단을 수행합니다. 입력만으로
//! 결정되는 순수 함수이며 공유 상태를 변경하지 않으므로 여러
//! 호출자가 동시에 사용해도 안전합니다.

use super::document::{Document, SourceType};

// ============================================================================
// Types
// ============================================================================

/// 점수가 매겨진 검색 결과
#[derive(Debug, Clone)]
pub struct ScoredDocument {
    pub document: Document,
    /// 코사인 유사도 (-1.0 ~ 1.0)
    pub similarity: f32,
}

// ============================================================================
// Cosine Similarity
// ============================================================================

/// 코사인 유사도 계산
///
/// 두 벡터 간의 코사인 유사도를 계산합니다.
/// 결과는 -1.0 ~ 1.0 범위입니다. 차원이 다르거나 영벡터면 0.0.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }

    dot_product / (norm_a * norm_b)
}

// ============================================================================
// Ranking
// ============================================================================

/// 후보 문서 랭킹
///
/// 후보마다 쿼리 벡터와의 코사인 유사도를 계산하고,
/// `source_type`이 주어지면 해당 컬렉션만 남긴 뒤
/// `similarity > threshold`(경계값 제외)인 결과를 유사도
/// 내림차순으로 정렬하여 `limit` 개까지 반환합니다.
/// 동점은 원래 후보 순서를 유지합니다.
///
/// 임베딩이 없거나 차원이 맞지 않는 후보는 경고만 남기고
/// 건너뜁니다. 행 하나의 데이터 오류가 검색 전체를 실패시키면
/// 안 됩니다. URL이 같은 중복 행은 가장 높은 점수 하나만 남깁니다.
pub fn rank_candidates(
    query: &[f32],
    candidates: &[Document],
    source_type: Option<SourceType>,
    threshold: f32,
    limit: usize,
) -> Vec<ScoredDocument> {
    let mut scored: Vec<ScoredDocument> = Vec::new();

    for candidate in candidates {
        // 컬렉션 필터
        if let Some(wanted) = source_type {
            if candidate.metadata.source_type() != Some(wanted) {
                continue;
            }
        }

        let embedding = match &candidate.embedding {
            Some(e) => e,
            None => continue,
        };

        if embedding.len() != query.len() {
            tracing::warn!(
                "Dimension mismatch for document {} ({} vs {}), skipping",
                candidate.id,
                embedding.len(),
                query.len()
            );
            continue;
        }

        let similarity = cosine_similarity(query, embedding);
        if similarity > threshold {
            scored.push(ScoredDocument {
                document: candidate.clone(),
                similarity,
            });
        }
    }

    // 안정 정렬 - 동점은 원래 후보 순서 유지
    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });

    dedup_by_url(&mut scored);
    scored.truncate(limit);
    scored
}

/// URL 기준 중복 제거
///
/// 정렬된 결과에서 같은 URL의 행은 첫 번째(최고 점수)만 남깁니다.
/// URL이 없는 문서는 중복 판정이 불가능하므로 모두 유지합니다.
fn dedup_by_url(results: &mut Vec<ScoredDocument>) {
    let mut seen: std::collections::HashSet<String> = std::collections::HashSet::new();
    results.retain(|r| match r.document.metadata.url() {
        Some(url) => seen.insert(url.to_string()),
        None => true,
    });
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::embedding::EMBEDDING_DIMENSION;
    use crate::store::document::{BlogMeta, Metadata, NewsMeta};

    fn unit_vector(axis: usize) -> Vec<f32> {
        let mut v = vec![0.0; EMBEDDING_DIMENSION];
        v[axis] = 1.0;
        v
    }

    fn news_doc(id: i64, url: &str, embedding: Vec<f32>) -> Document {
        Document {
            id,
            content: format!("뉴스 본문 {}", id),
            embedding: Some(embedding),
            metadata: Metadata::News(NewsMeta {
                title: format!("뉴스 {}", id),
                url: url.to_string(),
                publisher: "연합뉴스".to_string(),
                date: String::new(),
                collected_at: None,
            }),
        }
    }

    fn blog_doc(id: i64, url: &str, embedding: Vec<f32>) -> Document {
        Document {
            id,
            content: format!("블로그 본문 {}", id),
            embedding: Some(embedding),
            metadata: Metadata::Blog(BlogMeta {
                title: format!("블로그 {}", id),
                url: url.to_string(),
                bloggername: String::new(),
                date: String::new(),
                collected_at: None,
            }),
        }
    }

    #[test]
    fn test_cosine_similarity_same() {
        let a = vec![1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &a) - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_orthogonal() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![0.0, 1.0, 0.0];
        assert!((cosine_similarity(&a, &b) - 0.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_opposite() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![-1.0, 0.0, 0.0];
        assert!((cosine_similarity(&a, &b) - -1.0).abs() < 0.0001);
    }

    #[test]
    fn test_cosine_similarity_mismatched_dims() {
        let a = vec![1.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_vector() {
        let a = vec![0.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_rank_worked_example() {
        // 쿼리 [1,0,0,...], 후보 두 건: 유사도 1.0과 0.0, threshold 0.3
        let query = unit_vector(0);
        let candidates = vec![
            news_doc(1, "https://n.com/1", unit_vector(0)),
            news_doc(2, "https://n.com/2", unit_vector(1)),
        ];

        let results = rank_candidates(&query, &candidates, Some(SourceType::News), 0.3, 10);

        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, 1);
        assert!((results[0].similarity - 1.0).abs() < 0.0001);
    }

    #[test]
    fn test_rank_descending_order() {
        let query = unit_vector(0);
        let mut mid = unit_vector(0);
        mid[1] = 1.0; // 유사도 ≈ 0.707

        let candidates = vec![
            news_doc(1, "https://n.com/1", mid),
            news_doc(2, "https://n.com/2", unit_vector(0)),
        ];

        let results = rank_candidates(&query, &candidates, None, 0.1, 10);
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].document.id, 2);
        assert!(results[0].similarity >= results[1].similarity);
    }

    #[test]
    fn test_rank_filters_source_type() {
        let query = unit_vector(0);
        let candidates = vec![
            blog_doc(1, "https://b.com/1", unit_vector(0)),
            news_doc(2, "https://n.com/2", unit_vector(0)),
        ];

        let results = rank_candidates(&query, &candidates, Some(SourceType::News), 0.1, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, 2);
    }

    #[test]
    fn test_rank_threshold_strictly_greater() {
        let query = unit_vector(0);
        // 유사도 정확히 1.0인 후보, threshold 1.0 → 제외
        let candidates = vec![news_doc(1, "https://n.com/1", unit_vector(0))];

        let results = rank_candidates(&query, &candidates, None, 1.0, 10);
        assert!(results.is_empty());
    }

    #[test]
    fn test_rank_respects_limit() {
        let query = unit_vector(0);
        let candidates: Vec<Document> = (0..20)
            .map(|i| news_doc(i, &format!("https://n.com/{}", i), unit_vector(0)))
            .collect();

        let results = rank_candidates(&query, &candidates, None, 0.5, 3);
        assert_eq!(results.len(), 3);
    }

    #[test]
    fn test_rank_empty_candidates() {
        let query = unit_vector(0);
        let results = rank_candidates(&query, &[], None, 0.3, 10);
        assert!(results.is_empty());
    }

    #[test]
    fn test_rank_skips_missing_embedding() {
        let query = unit_vector(0);
        let mut doc = news_doc(1, "https://n.com/1", unit_vector(0));
        doc.embedding = None;

        let results = rank_candidates(&query, &[doc], None, 0.1, 10);
        assert!(results.is_empty());
    }

    #[test]
    fn test_rank_skips_dimension_mismatch() {
        let query = unit_vector(0);
        let candidates = vec![
            news_doc(1, "https://n.com/1", vec![1.0, 0.0, 0.0]), // 768도 1536도 아님
            news_doc(2, "https://n.com/2", unit_vector(0)),
        ];

        // 차원이 안 맞는 후보만 건너뛰고 나머지는 정상 처리
        let results = rank_candidates(&query, &candidates, None, 0.1, 10);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].document.id, 2);
    }

    #[test]
    fn test_rank_dedups_by_url() {
        let query = unit_vector(0);
        let mut weaker = unit_vector(0);
        weaker[1] = 0.5;

        let candidates = vec![
            news_doc(1, "https://n.com/same", weaker),
            news_doc(2, "https://n.com/same", unit_vector(0)),
            news_doc(3, "https://n.com/other", unit_vector(0)),
        ];

        let results = rank_candidates(&query, &candidates, None, 0.1, 10);
        assert_eq!(results.len(), 2);
        // 같은 URL 중 최고 점수 행(id=2)만 생존
        assert!(results.iter().any(|r| r.document.id == 2));
        assert!(!results.iter().any(|r| r.document.id == 1));
    }

    #[test]
    fn test_rank_stable_tie_order() {
        let query = unit_vector(0);
        let candidates = vec![
            news_doc(10, "https://n.com/a", unit_vector(0)),
            news_doc(20, "https://n.com/b", unit_vector(0)),
            news_doc(30, "https://n.com/c", unit_vector(0)),
        ];

        let results = rank_candidates(&query, &candidates, None, 0.1, 10);
        let ids: Vec<i64> = results.iter().map(|r| r.document.id).collect();
        assert_eq!(ids, vec![10, 20, 30]);
    }
}
