//! Email availability fast path.
//!
//! Registration is the one hot path that asks "is this email taken?".
//! Two in-memory tiers answer most of those without a query: a cuckoo
//! filter of every email ever seen (a miss is a definite "available"),
//! and a short-lived cache of confirmed-taken emails (a hit is a definite
//! "taken"). Only the residue falls through to the database.

use anyhow::{Result, anyhow};
use autoscale_cuckoo_filter::CuckooFilter;
use futures::StreamExt;
use moka::future::Cache;
use once_cell::sync::Lazy;
use sqlx::MySqlPool;
use std::sync::RwLock;
use std::time::Duration;

/// Filter sizing; tune to real head counts.
const FILTER_CAPACITY: usize = 100_000;
const FALSE_POSITIVE_RATE: f64 = 0.001;

static SEEN: Lazy<RwLock<CuckooFilter<String>>> =
    Lazy::new(|| RwLock::new(CuckooFilter::new(FILTER_CAPACITY, FALSE_POSITIVE_RATE)));

/// Presence of a key means the email is confirmed taken.
static TAKEN: Lazy<Cache<String, ()>> = Lazy::new(|| {
    Cache::builder()
        .max_capacity(500_000)
        .time_to_live(Duration::from_secs(86_400))
        .build()
});

/// Canonical key form: trimmed and lowercased. Empty strings and strings
/// without an `@` are not addresses, so they never enter either tier.
pub fn normalize(raw: &str) -> Option<String> {
    let email = raw.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') {
        return None;
    }
    Some(email)
}

/// Three-tier check: filter miss => available, cache hit => taken,
/// otherwise ask the database. Malformed input is never available, and a
/// database failure reports "taken" so a flaky check cannot wave a
/// duplicate through.
pub async fn is_available(raw: &str, pool: &MySqlPool) -> bool {
    let Some(email) = normalize(raw) else {
        return false;
    };

    if !SEEN.read().expect("email filter poisoned").contains(&email) {
        return true;
    }

    if TAKEN.get(&email).await.is_some() {
        return false;
    }

    let exists =
        sqlx::query_scalar::<_, bool>("SELECT EXISTS(SELECT 1 FROM users WHERE email = ? LIMIT 1)")
            .bind(&email)
            .fetch_one(pool)
            .await
            .unwrap_or(true);

    !exists
}

/// Record a successful registration in both tiers.
pub async fn mark_registered(raw: &str) {
    let Some(email) = normalize(raw) else {
        return;
    };
    SEEN.write().expect("email filter poisoned").add(&email);
    TAKEN.insert(email, ()).await;
}

/// Stream every known email into the filter at startup.
pub async fn warmup_filter(pool: &MySqlPool, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>("SELECT email FROM users").fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row.map_err(|e| anyhow!("email warmup fetch failed: {e}"))?;
        if let Some(email) = normalize(&email) {
            batch.push(email);
            total += 1;
        }
        if batch.len() >= batch_size {
            drain_into_filter(&mut batch);
        }
    }
    drain_into_filter(&mut batch);

    tracing::info!(total, "Email filter warmup complete");
    Ok(())
}

fn drain_into_filter(batch: &mut Vec<String>) {
    if batch.is_empty() {
        return;
    }
    let mut filter = SEEN.write().expect("email filter poisoned");
    for email in batch.drain(..) {
        filter.add(&email);
    }
}

/// Pre-mark accounts active within the last `days` as taken; recent
/// logins are the emails most likely to collide with a new signup.
pub async fn warmup_recent(pool: &MySqlPool, days: u32, batch_size: usize) -> Result<()> {
    let mut stream = sqlx::query_as::<_, (String,)>(
        r#"
        SELECT email
        FROM users
        WHERE last_login_at >= NOW() - INTERVAL ? DAY
        ORDER BY last_login_at DESC
        "#,
    )
    .bind(days)
    .fetch(pool);

    let mut batch = Vec::with_capacity(batch_size);
    let mut total = 0usize;

    while let Some(row) = stream.next().await {
        let (email,) = row?;
        if let Some(email) = normalize(&email) {
            batch.push(email);
            total += 1;
        }
        if batch.len() >= batch_size {
            mark_batch(&mut batch).await;
        }
    }
    mark_batch(&mut batch).await;

    tracing::info!(total, days, "Email cache warmup complete");
    Ok(())
}

async fn mark_batch(batch: &mut Vec<String>) {
    let inserts: Vec<_> = batch.drain(..).map(|email| TAKEN.insert(email, ())).collect();
    futures::future::join_all(inserts).await;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_trims_lowercases_and_rejects_junk() {
        assert_eq!(
            normalize("  Jane.Doe@Company.COM "),
            Some("jane.doe@company.com".to_string())
        );
        assert_eq!(normalize("   "), None);
        assert_eq!(normalize(""), None);
        assert_eq!(normalize("not-an-address"), None);
    }

    #[actix_web::test]
    async fn registration_marks_both_tiers() {
        mark_registered("  Taken@Example.com ").await;
        assert!(
            SEEN.read()
                .unwrap()
                .contains(&"taken@example.com".to_string())
        );
        assert!(TAKEN.get("taken@example.com").await.is_some());
    }

    #[actix_web::test]
    async fn malformed_input_enters_neither_tier() {
        mark_registered("   ").await;
        mark_registered("no-at-sign").await;
        assert!(!SEEN.read().unwrap().contains(&"no-at-sign".to_string()));
        assert!(TAKEN.get("no-at-sign").await.is_none());
    }

    #[test]
    fn unseen_email_misses_the_filter() {
        assert!(
            !SEEN
                .read()
                .unwrap()
                .contains(&"never-registered@example.com".to_string())
        );
    }
}
