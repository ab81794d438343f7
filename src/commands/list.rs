//! List site content

use anyhow::Result;

use crate::content::Partition;
use crate::Site;

/// List site content by type
pub async fn run(site: &Site, content_type: &str) -> Result<()> {
    let loader = site.loader();

    match content_type {
        "all" | "aggregate" => {
            let collection = loader.load_collection().await?;
            println!(
                "Aggregate {:?} ({}):",
                loader.aggregate_path(),
                collection.len()
            );
            for item in collection.items() {
                println!("  {} - {}", item.slug, item.title);
            }
        }
        other => {
            let partition: Partition = other.parse().map_err(|e| {
                anyhow::anyhow!("{}. Available: general, pillar, static, all", e)
            })?;
            let slugs = loader.list(partition);
            println!(
                "{} {:?} ({}):",
                partition,
                loader.partition_dir(partition),
                slugs.len()
            );
            for slug in slugs {
                println!("  {}", slug);
            }
        }
    }

    Ok(())
}
