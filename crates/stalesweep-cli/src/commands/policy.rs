use anyhow::Result;

use stalesweep_core::{cleanup::ThresholdPolicy, storage::Database, AppConfig};

pub async fn show(db: &Database, config: &AppConfig) -> Result<()> {
    let policy = ThresholdPolicy::new(db, &config.cleanup);

    let threshold = policy.get_threshold_days().await?;
    let auto = policy.is_auto_cleanup_enabled().await?;
    let statuses = policy.eligible_statuses()?;

    println!("Retention threshold: {} days", threshold);
    println!(
        "Auto cleanup: {}",
        if auto { "enabled" } else { "disabled" }
    );

    let names: Vec<&str> = statuses.iter().map(|s| s.as_str()).collect();
    println!("Eligible statuses: {}", names.join(", "));

    Ok(())
}

pub async fn set_threshold(db: &Database, config: &AppConfig, days: i64) -> Result<()> {
    let policy = ThresholdPolicy::new(db, &config.cleanup);

    if policy.set_threshold_days(days).await? {
        println!("Retention threshold set to {} days.", days);
    } else {
        println!(
            "Invalid threshold: {} (must be at least 1 day). Value unchanged.",
            days
        );
    }

    Ok(())
}

pub async fn enable_auto(db: &Database, config: &AppConfig) -> Result<()> {
    let policy = ThresholdPolicy::new(db, &config.cleanup);
    policy.enable_auto_cleanup().await?;
    println!("Auto cleanup enabled.");
    Ok(())
}

pub async fn disable_auto(db: &Database, config: &AppConfig) -> Result<()> {
    let policy = ThresholdPolicy::new(db, &config.cleanup);
    policy.disable_auto_cleanup().await?;
    println!("Auto cleanup disabled.");
    Ok(())
}
