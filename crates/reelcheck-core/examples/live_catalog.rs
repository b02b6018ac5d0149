use reelcheck_core::{Catalog, Config, KindSelector, MediaKind};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let config = Config::from_env()?;
    if config.upstream.api_key.is_none() {
        eprintln!("TMDB_API_KEY is not set, the upstream provider will reject requests");
    }
    let catalog = Catalog::new(config).await?;

    println!("Trending this week:\n");
    let trending = catalog.trending(KindSelector::All, 1, true).await?;
    for item in &trending.items {
        println!(
            "  {} [{}] {}",
            item.title_id(),
            item.record.media_kind,
            item.record.title.as_deref().unwrap_or("?")
        );
    }
    println!("\n{} playable of page 1/{}", trending.total, trending.total_pages);

    let home = catalog.home(50, true).await?;
    println!("\nHome sections:");
    for section in &home.sections {
        println!("  {} - {} titles", section.name, section.items.len());
    }

    if let Some(first) = trending.items.first() {
        let report = catalog
            .check_availability(first.record.media_kind, first.title_id())
            .await?;
        println!("\nAvailability of {}: {:?}", first.title_id(), report);
    }

    let detail = catalog.title_detail(1399, MediaKind::Series).await?;
    println!(
        "\n{} ({} seasons), available: {}",
        detail.title.as_deref().unwrap_or("?"),
        detail.number_of_seasons.unwrap_or(0),
        detail.available
    );

    let seasons = catalog.seasons(1399).await?;
    for season in &seasons.seasons {
        println!(
            "  Season {} - {} episodes, aired: {}",
            season.season_number, season.episode_count, season.is_aired
        );
    }

    let first_season = catalog.season_episodes(1399, 1, true).await?;
    for episode in first_season.episodes.iter().take(3) {
        println!(
            "  S01E{:02} {}: {:?}",
            episode.episode_number,
            episode.name.as_deref().unwrap_or("?"),
            episode.available
        );
    }

    Ok(())
}
