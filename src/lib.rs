//! naver-rag - 네이버 검색 기반 시맨틱 검색 & AI 답변
//!
//! 네이버 검색 API(블로그/뉴스/쇼핑)에서 수집한 문서를 임베딩하여
//! Supabase 벡터 테이블에 저장하고, 시맨틱 검색 결과를 LLM으로
//! 요약하는 CLI입니다.

pub mod answer;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod naver;
pub mod pipeline;
pub mod store;

// Re-exports
pub use answer::{AnswerProvider, OpenAiChat};
pub use config::{Config, IndexMode};
pub use embedding::{
    EmbeddingProvider, OpenAiEmbedding, embed_text, fit_dimension, normalize_for_embedding,
    EMBEDDING_DIMENSION,
};
pub use naver::{Media, NaverClient, NaverError, NaverItem, NaverSearchResponse, Sort, strip_tags};
pub use pipeline::{IngestReport, Pipeline, SearchRequest};
pub use store::{
    BlogMeta, ClientSideSimilarityIndex, Document, DocumentStore, Metadata, NewDocument, NewsMeta,
    RemoteSimilarityIndex, ScoredDocument, ShoppingMeta, SimilarityIndex, SourceType,
    SupabaseStore, cosine_similarity, rank_candidates,
};
