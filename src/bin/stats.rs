use followgraph::storage::{GraphRepository, TieredStore};
use followgraph::{Config, RelationType};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let config = Config::load()?;
    let store = TieredStore::new(config.data_dir())?;
    let repository = GraphRepository::open(store)?;

    println!("\n=== Followgraph Dataset Statistics ===\n");

    if repository.profile_count() == 0 {
        println!("No profiles in the dataset yet.");
        println!("\nRun a scrape to populate {}.", config.data_dir().display());
        return Ok(());
    }

    let profiles = repository.profiles();
    let private = profiles.values().filter(|p| p.is_private).count();
    let attempted = profiles
        .values()
        .filter(|p| p.followers_fetch_attempted)
        .count();
    let fetched = profiles.values().filter(|p| p.followers_fetched).count();
    let oversized = profiles.values().filter(|p| p.followers_oversized).count();
    let follower_edges = repository
        .edges()
        .iter()
        .filter(|e| e.relation_type == RelationType::Follower)
        .count();

    println!("{:-<50}", "");
    println!("{:<35} {:>12}", "Metric", "Count");
    println!("{:-<50}", "");
    println!("{:<35} {:>12}", "Profiles", repository.profile_count());
    println!("{:<35} {:>12}", "Edges", repository.edge_count());
    println!("{:<35} {:>12}", "  follower edges", follower_edges);
    println!("{:<35} {:>12}", "Private profiles", private);
    println!("{:<35} {:>12}", "Follower fetch attempted", attempted);
    println!("{:<35} {:>12}", "Follower lists fetched", fetched);
    println!("{:<35} {:>12}", "Oversized (download skipped)", oversized);
    println!("{:-<50}", "");

    // Largest known accounts still inside the crawl threshold
    let mut by_followers: Vec<_> = profiles
        .values()
        .filter(|p| p.followers.is_some())
        .collect();
    by_followers.sort_by_key(|p| std::cmp::Reverse(p.followers.unwrap_or(0)));

    if !by_followers.is_empty() {
        println!("\nTop accounts by follower count:\n");
        println!("{:<25} {:>12} {:>10}", "Profile", "Followers", "Private");
        println!("{:-<50}", "");
        for profile in by_followers.iter().take(10) {
            println!(
                "{:<25} {:>12} {:>10}",
                profile.display_name.as_deref().unwrap_or(&profile.id),
                profile.followers.unwrap_or(0),
                if profile.is_private { "yes" } else { "no" }
            );
        }
        println!("{:-<50}", "");
    }

    println!();

    Ok(())
}
