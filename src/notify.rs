use sqlx::{MySql, Transaction};
use tracing::warn;

/// Fire-and-forget notification insert.
///
/// Runs on the caller's transaction but never fails it: a lost notification
/// must not roll back a leave-state transition.
pub async fn notify(
    tx: &mut Transaction<'_, MySql>,
    user_id: u64,
    title: &str,
    message: &str,
    category: &str,
    link: Option<&str>,
) {
    let result = sqlx::query(
        r#"
        INSERT INTO notifications (user_id, title, message, category, link)
        VALUES (?, ?, ?, ?, ?)
        "#,
    )
    .bind(user_id)
    .bind(title)
    .bind(message)
    .bind(category)
    .bind(link)
    .execute(&mut **tx)
    .await;

    if let Err(e) = result {
        warn!(error = %e, user_id, title, "Failed to enqueue notification");
    }
}

/// Notify several recipients, deduplicating ids.
pub async fn notify_all(
    tx: &mut Transaction<'_, MySql>,
    user_ids: &[u64],
    title: &str,
    message: &str,
    category: &str,
    link: Option<&str>,
) {
    let mut seen = std::collections::HashSet::new();
    for &user_id in user_ids {
        if seen.insert(user_id) {
            notify(tx, user_id, title, message, category, link).await;
        }
    }
}
