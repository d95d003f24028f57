use crate::CliResult;
use radio_charts::config::RadioChartsConfig;
use radio_charts::persistence::{FilePopularityCache, PopularityStore};

/// Show cached popularity scores
pub fn show_cache(config: &RadioChartsConfig, limit: usize) -> CliResult<()> {
    let cache = FilePopularityCache::open(&config.paths.cache)?;

    println!("📂 Popularity Cache ({})", cache.path().display());
    println!("==================");
    println!("  {} entries cached", cache.len());

    let keys = cache.keys();
    for key in keys.iter().take(limit) {
        if let Some(entry) = cache.get(key) {
            println!(
                "    {key}: {:.2} [{}]",
                entry.score,
                entry.fetched_at.format("%Y-%m-%d %H:%M:%S UTC")
            );
        }
    }
    if keys.len() > limit {
        println!("    ... and {} more entries", keys.len() - limit);
    }

    Ok(())
}

/// Remove every cached score
pub fn clear_cache(config: &RadioChartsConfig) -> CliResult<()> {
    let mut cache = FilePopularityCache::open(&config.paths.cache)?;
    let count = cache.len();
    cache.clear()?;
    cache.flush()?;
    println!("🗑️  Cleared {count} cached popularity scores");
    Ok(())
}
