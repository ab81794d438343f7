//! Validate every record in the content store

use anyhow::Result;

use crate::content::Partition;
use crate::Site;

/// Outcome of a full store check
#[derive(Debug, Default)]
pub struct CheckReport {
    /// Number of records and aggregate files attempted
    pub checked: usize,
    /// One message per file that failed to load
    pub failures: Vec<String>,
}

impl CheckReport {
    pub fn is_ok(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Load every record of every partition and the aggregate file
pub async fn check(site: &Site) -> CheckReport {
    let loader = site.loader();
    let mut report = CheckReport::default();

    for partition in Partition::ALL {
        for slug in loader.list(partition) {
            report.checked += 1;
            if let Err(e) = loader.load(partition, &slug).await {
                report.failures.push(e.to_string());
            }
        }
    }

    report.checked += 1;
    if let Err(e) = loader.load_collection().await {
        report.failures.push(e.to_string());
    }

    report
}

/// Run the check and fail if anything is broken
pub async fn run(site: &Site) -> Result<()> {
    let report = check(site).await;

    for failure in &report.failures {
        println!("  ✗ {}", failure);
    }

    if !report.is_ok() {
        anyhow::bail!(
            "{} of {} content files failed to load",
            report.failures.len(),
            report.checked
        );
    }

    println!("All {} content files loaded cleanly.", report.checked);
    Ok(())
}
