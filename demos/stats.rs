//! Print site statistics.
//!
//! Run with:
//!   cargo run --example stats -- --key your_app_key
//!
//! Or set STACKEXCHANGE_API_KEY and omit `--key`.

use clap::Parser;
use stackexchange::{ClientBuilder, Statistics};

#[derive(Parser, Debug)]
#[command(name = "stats", about = "Print Stack Exchange site statistics")]
struct Cli {
    /// Your API key
    #[arg(short, long)]
    key: Option<String>,

    /// Versioned API root to query
    #[arg(long, default_value = "https://api.stackoverflow.com/1.0")]
    base_url: String,
}

#[tokio::main]
async fn main() -> stackexchange::Result<()> {
    env_logger::init();
    let cli = Cli::parse();

    let mut builder = ClientBuilder::new().base_url(cli.base_url);
    if let Some(key) = cli.key {
        builder = builder.api_key(key);
    }
    let client = builder.build()?;

    for stats in client.get_statistics().await? {
        print_stats(&stats);
    }

    Ok(())
}

fn print_stats(stats: &Statistics) {
    println!("Answers per minute: {}", stats.answers_per_minute);
    println!("Badges per minute: {}", stats.badges_per_minute);
    println!("Questions per minute: {}", stats.questions_per_minute);
    println!("Total answers: {}", stats.total_answers);
    println!("Total badges: {}", stats.total_badges);
    println!("Total comments: {}", stats.total_comments);
    println!("Total questions: {}", stats.total_questions);
    println!("Total unanswered questions: {}", stats.total_unanswered);
    println!("Total users: {}", stats.total_users);
    println!("Total votes: {}", stats.total_votes);
    println!(
        "API version: {}:{}",
        stats.api_version.version, stats.api_version.revision
    );

    let site = &stats.site;
    println!("Site name: {}", site.name);
    println!("API endpoint: {}", site.api_endpoint);
    println!("Site URL: {}", site.site_url);
    if let Some(ref styling) = site.styling {
        println!("Site link color: {}", styling.link_color);
    }
}
