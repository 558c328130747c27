//! One-shot run: fetch feeds, tag new items, persist the corpus, print what was added.

use ncc_ai_news::config::{ai::AiConfig, news::NewsConfig};
use ncc_ai_news::{build_pipeline, init_tracing};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();
    init_tracing();

    let news_cfg = NewsConfig::load_default()?;
    let ai_cfg = AiConfig::load_default();
    let pipeline = build_pipeline(&news_cfg, &ai_cfg)?;

    let report = pipeline.run_cycle().await?;

    for (i, item) in report.corpus.iter().take(report.new_count).enumerate() {
        let title: String = item.title.chars().take(30).collect();
        println!("{}/{}: {}... -> {:?}", i + 1, report.new_count, title, item.tags);
    }
    println!(
        "tagging done: {} new, {} total in {}",
        report.new_count,
        report.corpus.len(),
        news_cfg.corpus_path.display()
    );
    Ok(())
}
