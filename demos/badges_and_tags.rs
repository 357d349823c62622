//! List badges by name, then walk the first 20 pages of tags.
//!
//! Run with:
//!   cargo run --example badges_and_tags -- --key your_app_key --output tags.txt
//!
//! Tag names go to `--output` as one comma-separated line, or to stdout.

use std::path::PathBuf;

use clap::Parser;
use stackexchange::{Client, ClientBuilder, Paging, RequestOptions, TagSort};

const PAGES: u32 = 20;

#[derive(Parser, Debug)]
#[command(name = "badges_and_tags", about = "Dump Stack Exchange badges and tags")]
struct Cli {
    /// Your API key
    #[arg(short, long)]
    key: Option<String>,

    /// File to write tag names to
    #[arg(short, long, value_name = "PATH")]
    output: Option<PathBuf>,

    /// Skip the badge listing
    #[arg(long)]
    tags_only: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();
    let cli = Cli::parse();

    let mut builder = ClientBuilder::new();
    if let Some(key) = cli.key {
        builder = builder.api_key(key);
    }
    let client = builder.build()?;

    if !cli.tags_only {
        println!("============ Badges ============");
        for badge in &client.get_badges_by_name().await? {
            println!("{}:{:?}:{}", badge.name, badge.rank, badge.award_count);
        }
    }

    let names = collect_tags(&client).await?;
    let line = format!("tags={}\n", names.join(", "));

    match cli.output {
        Some(path) => {
            tokio::fs::write(&path, line).await?;
            println!("wrote {} tags to {}", names.len(), path.display());
        }
        None => print!("{line}"),
    }

    Ok(())
}

/// Fetch up to `PAGES` pages of 100 tags, stopping early on the last page.
async fn collect_tags(client: &Client) -> stackexchange::Result<Vec<String>> {
    let mut names = Vec::new();
    let mut paging = Paging::new(1, 100)?;

    for _ in 0..PAGES {
        let opts = RequestOptions::new().sort(TagSort::Popular).paging(paging);
        let page = client.get_tags(&opts).await?;
        names.extend(page.iter().map(|tag| tag.name.clone()));
        if !page.has_more() {
            break;
        }
        paging = paging.next();
    }

    Ok(names)
}
