//! CLI 모듈
//!
//! naver-rag CLI 명령어 정의 및 구현

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use crate::answer::{generate_answer, OpenAiChat};
use crate::config::{self, Config, IndexMode};
use crate::embedding::{EmbeddingProvider, OpenAiEmbedding};
use crate::naver::{NaverClient, Sort};
use crate::pipeline::{Pipeline, SearchRequest};
use crate::store::{
    ClientSideSimilarityIndex, DocumentStore, RemoteSimilarityIndex, ScoredDocument,
    SimilarityIndex, SourceType, SupabaseStore,
};

// ============================================================================
// CLI Definition
// ============================================================================

#[derive(Parser)]
#[command(name = "naver-rag")]
#[command(version, about = "네이버 검색 기반 시맨틱 검색 & AI 답변", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

/// 정렬 방식 (네이버 검색 API)
#[derive(Debug, Clone, Copy, ValueEnum)]
pub enum SortOrder {
    /// 정확도순
    Sim,
    /// 날짜순
    Date,
}

impl From<SortOrder> for Sort {
    fn from(value: SortOrder) -> Self {
        match value {
            SortOrder::Sim => Sort::Sim,
            SortOrder::Date => Sort::Date,
        }
    }
}

#[derive(Subcommand)]
pub enum Commands {
    /// 네이버 검색 결과를 수집하여 벡터 테이블에 저장
    Collect {
        /// 검색어
        query: String,

        /// 검색 소스 (blog/news/shopping)
        #[arg(short, long, value_enum)]
        source: SourceType,

        /// 수집할 결과 개수
        #[arg(short, long, default_value = "20")]
        count: usize,

        /// 검색 시작 위치 (페이징용)
        #[arg(long, default_value = "1")]
        start: usize,

        /// 정렬 방식
        #[arg(long, value_enum, default_value = "sim")]
        sort: SortOrder,
    },

    /// 저장된 데이터 시맨틱 검색 및 AI 답변 생성
    Search {
        /// 검색 질문
        query: String,

        /// 검색 소스 (blog/news/shopping)
        #[arg(short, long, value_enum)]
        source: SourceType,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "10")]
        limit: usize,

        /// 유사도 임계값 (0.0 ~ 1.0)
        #[arg(short, long, default_value = "0.4")]
        threshold: f32,

        /// AI 답변 생성 건너뛰기
        #[arg(long)]
        no_answer: bool,
    },

    /// 컬렉션별 저장된 문서 목록
    List {
        /// 검색 소스 (blog/news/shopping)
        #[arg(short, long, value_enum)]
        source: SourceType,

        /// 결과 개수 제한
        #[arg(short, long, default_value = "5")]
        limit: usize,
    },

    /// 상태 확인
    Status,
}

// ============================================================================
// CLI Runner
// ============================================================================

/// CLI 명령어 실행
pub async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Collect {
            query,
            source,
            count,
            start,
            sort,
        } => cmd_collect(&query, source, count, start, sort.into()).await,
        Commands::Search {
            query,
            source,
            limit,
            threshold,
            no_answer,
        } => cmd_search(&query, source, limit, threshold, no_answer).await,
        Commands::List { source, limit } => cmd_list(source, limit).await,
        Commands::Status => cmd_status().await,
    }
}

/// 설정에 따라 파이프라인 구성
fn build_pipeline(config: &Config) -> Result<Pipeline> {
    let store: Arc<dyn DocumentStore> =
        Arc::new(SupabaseStore::new(&config.supabase).context("Supabase 저장소 초기화 실패")?);

    let index: Box<dyn SimilarityIndex> = match config.index_mode {
        IndexMode::Remote => Box::new(RemoteSimilarityIndex::new(store.clone())),
        IndexMode::Client => Box::new(ClientSideSimilarityIndex::new(store.clone())),
    };

    let embedder: Arc<dyn EmbeddingProvider> = Arc::new(
        OpenAiEmbedding::new(
            config.openai.api_key.clone(),
            config.openai.embed_model.clone(),
        )
        .context("임베딩 클라이언트 초기화 실패")?,
    );

    Ok(Pipeline::new(store, index, embedder))
}

// ============================================================================
// Command Implementations
// ============================================================================

/// 수집 명령어 (collect)
///
/// 네이버 검색 API에서 결과를 가져와 임베딩 후 저장합니다.
async fn cmd_collect(
    query: &str,
    source: SourceType,
    count: usize,
    start: usize,
    sort: Sort,
) -> Result<()> {
    let config = Config::from_env()?;
    let pipeline = build_pipeline(&config)?;

    let naver = NaverClient::new(
        config.naver.client_id.clone(),
        config.naver.client_secret.clone(),
    )
    .context("네이버 API 클라이언트 생성 실패")?;

    println!(
        "[*] 네이버 {} 검색 중: \"{}\"",
        source.display_name(),
        query
    );

    let response = naver
        .search(source.media(), query, count, start, sort)
        .await
        .context("네이버 검색 실패")?;

    if response.items.is_empty() {
        println!(
            "[!] 네이버 {}에서 검색 결과가 없습니다. 다른 검색어를 시도해보세요.",
            source.display_name()
        );
        return Ok(());
    }

    println!(
        "[*] 전체 {}건 중 {}건 수신, 임베딩 및 저장 중...",
        response.total,
        response.items.len()
    );

    let report = pipeline.ingest(&response.items, source).await;

    println!();
    println!(
        "[OK] 수집 완료: 저장 {}, 건너뜀 {}, 실패 {}",
        report.saved, report.skipped, report.failed
    );

    Ok(())
}

/// 검색 명령어 (search)
///
/// 저장된 데이터에 대해 시맨틱 검색을 수행하고 AI 답변을 생성합니다.
async fn cmd_search(
    query: &str,
    source: SourceType,
    limit: usize,
    threshold: f32,
    no_answer: bool,
) -> Result<()> {
    let config = Config::from_env()?;
    let pipeline = build_pipeline(&config)?;

    println!(
        "[*] {} 시맨틱 검색 중: \"{}\"",
        source.display_name(),
        query
    );

    let request = SearchRequest {
        query: query.to_string(),
        source_type: source,
        limit,
        threshold,
    };

    let results = pipeline.search(&request).await.context("검색 실패")?;

    if results.is_empty() {
        println!(
            "\n[!] {}에서 검색 결과가 없습니다. 새 데이터를 수집하거나 다른 검색어를 시도해보세요.",
            source.display_name()
        );
        println!("    팁: 유사도 임계값을 더 낮추거나, collect로 데이터를 먼저 수집하세요.");
        return Ok(());
    }

    println!(
        "\n[OK] {}개의 {} 결과를 찾았습니다.",
        results.len(),
        source.display_name()
    );

    // AI 답변 생성
    if !no_answer {
        println!("[*] AI 답변 생성 중...");

        let chat = OpenAiChat::new(
            config.openai.api_key.clone(),
            config.openai.chat_model.clone(),
        )
        .context("답변 클라이언트 초기화 실패")?;

        let answer = generate_answer(&chat, query, &results, source)
            .await
            .context("AI 답변 생성 실패")?;

        println!("\n=== AI 답변 ({} 데이터 기반) ===\n", source.display_name());
        println!("{}", answer);
        println!("\n---");
    }

    print_results(&results);
    Ok(())
}

/// 검색 결과 출력
fn print_results(results: &[ScoredDocument]) {
    println!("\n검색 결과 원본:\n");

    for (i, result) in results.iter().enumerate() {
        let title = result.document.metadata.title().unwrap_or("제목 없음");

        println!(
            "{}. {} (유사도: {:.2}%)",
            i + 1,
            title,
            result.similarity * 100.0
        );

        if let Some(url) = result.document.metadata.url() {
            println!("   URL: {}", url);
        }
        if let Some(date) = result.document.metadata.date() {
            println!("   날짜: {}", date);
        }

        println!("   내용: {}", truncate_text(&result.document.content, 200));
        println!();
    }
}

/// 목록 명령어 (list)
///
/// 컬렉션별 저장된 문서를 조회합니다.
async fn cmd_list(source: SourceType, limit: usize) -> Result<()> {
    let config = Config::from_env()?;
    let store = SupabaseStore::new(&config.supabase).context("Supabase 저장소 초기화 실패")?;

    let docs = store
        .list_by_collection(source, limit)
        .await
        .context("문서 목록 조회 실패")?;

    if docs.is_empty() {
        println!("[!] 저장된 {} 문서가 없습니다.", source.display_name());
        return Ok(());
    }

    println!(
        "[OK] 저장된 {} 문서 ({} 건):\n",
        source.display_name(),
        docs.len()
    );

    for doc in docs {
        let title = doc
            .metadata
            .title()
            .map(|t| truncate_text(t, 40))
            .unwrap_or_else(|| "-".to_string());

        println!("  #{:<6} {}", doc.id, title);
        if let Some(url) = doc.metadata.url() {
            println!("          URL: {}", url);
        }
        println!("          내용: {}", truncate_text(&doc.content, 100));
        println!();
    }

    Ok(())
}

/// 상태 명령어 (status)
///
/// 키 설정 여부와 저장소 통계를 확인합니다.
async fn cmd_status() -> Result<()> {
    println!("naver-rag v{}", env!("CARGO_PKG_VERSION"));
    println!();

    // API 키 상태
    print_key_status("네이버 API 키", config::has_naver_keys());
    print_key_status("Supabase 키", config::has_supabase_keys());
    print_key_status("OpenAI 키", config::has_openai_key());

    if !config::has_supabase_keys() {
        return Ok(());
    }

    // 문서 수 및 컬렉션별 통계
    let config = Config::from_env()?;
    let store = SupabaseStore::new(&config.supabase)?;

    match store.count().await {
        Ok(count) => println!("\n[OK] 저장된 총 문서: {} 건", count),
        Err(e) => {
            println!("\n[!] 데이터베이스 상태를 확인할 수 없습니다: {:#}", e);
            return Ok(());
        }
    }

    match store.scan_all().await {
        Ok(docs) => {
            let mut counts: std::collections::HashMap<&str, usize> =
                std::collections::HashMap::new();
            for doc in &docs {
                let key = doc
                    .metadata
                    .source_type()
                    .map(|s| s.as_str())
                    .unwrap_or("기타");
                *counts.entry(key).or_insert(0) += 1;
            }

            let mut sorted: Vec<_> = counts.into_iter().collect();
            sorted.sort();
            for (collection, count) in sorted {
                println!("     {} 문서: {} 건", collection, count);
            }
        }
        Err(e) => {
            tracing::debug!("소스별 통계 조회 실패: {:#}", e);
        }
    }

    Ok(())
}

// ============================================================================
// Helper Functions
// ============================================================================

fn print_key_status(name: &str, present: bool) {
    if present {
        println!("[OK] {}: 설정됨", name);
    } else {
        println!("[!] {}: 미설정", name);
    }
}

/// 텍스트 자르기 (UTF-8 안전)
fn truncate_text(text: &str, max_chars: usize) -> String {
    let cleaned = text.replace('\n', " ").replace('\r', "");
    let cleaned = cleaned.trim();

    if cleaned.chars().count() <= max_chars {
        cleaned.to_string()
    } else {
        let truncated: String = cleaned.chars().take(max_chars).collect();
        format!("{}...", truncated)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate_text() {
        assert_eq!(truncate_text("hello", 10), "hello");
        assert_eq!(truncate_text("hello world", 5), "hello...");
        assert_eq!(truncate_text("hello\nworld", 20), "hello world");
    }

    #[test]
    fn test_truncate_unicode() {
        let korean = "안녕하세요 세계";
        assert_eq!(truncate_text(korean, 5), "안녕하세요...");
    }

    #[test]
    fn test_sort_order_mapping() {
        assert_eq!(Sort::from(SortOrder::Sim), Sort::Sim);
        assert_eq!(Sort::from(SortOrder::Date), Sort::Date);
    }

    #[test]
    fn test_cli_parses_collect() {
        let cli = Cli::try_parse_from([
            "naver-rag", "collect", "전자담배", "--source", "news", "--count", "30",
        ])
        .unwrap();

        match cli.command {
            Commands::Collect { query, source, count, .. } => {
                assert_eq!(query, "전자담배");
                assert_eq!(source, SourceType::News);
                assert_eq!(count, 30);
            }
            _ => panic!("collect 명령어로 파싱되어야 함"),
        }
    }

    #[test]
    fn test_cli_parses_search_defaults() {
        let cli = Cli::try_parse_from(["naver-rag", "search", "질문", "--source", "shopping"])
            .unwrap();

        match cli.command {
            Commands::Search { limit, threshold, no_answer, .. } => {
                assert_eq!(limit, 10);
                assert!((threshold - 0.4).abs() < 0.0001);
                assert!(!no_answer);
            }
            _ => panic!("search 명령어로 파싱되어야 함"),
        }
    }

    #[test]
    fn test_cli_rejects_unknown_source() {
        let result = Cli::try_parse_from(["naver-rag", "search", "질문", "--source", "image"]);
        assert!(result.is_err());
    }
}
