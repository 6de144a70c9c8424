use std::fmt::Display;
use std::time::Duration;
use tokio::time::sleep;
use tracing::warn;

/// Retry a async operation with backoff.
///
/// # Arguments
/// * `operation` - The async operation to retry
/// * `base_delays` - Delays in seconds before each backoff retry
/// * `final_retries` - Number of additional retries at `final_delay`
/// * `final_delay` - Delay in seconds before each final retry
///
/// The operation always runs at least once; with no delays and no final
/// retries it runs exactly once.
///
/// # Returns
/// The result of the operation if successful, or the last error if all retries fail
pub async fn retry_with_backoff<F, Fut, T, E>(
    mut operation: F,
    base_delays: &[u64],
    final_retries: usize,
    final_delay: u64,
) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: std::future::Future<Output = Result<T, E>>,
    E: Display,
{
    let schedule: Vec<u64> = base_delays
        .iter()
        .copied()
        .chain(std::iter::repeat_n(final_delay, final_retries))
        .collect();
    let total = schedule.len() + 1;

    let mut attempt = 1;
    loop {
        match operation().await {
            Ok(result) => return Ok(result),
            Err(e) => {
                let Some(delay_secs) = schedule.get(attempt - 1) else {
                    return Err(e);
                };
                warn!(
                    "Request failed (attempt {}/{}): {e}. Retrying after {}s...",
                    attempt, total, delay_secs
                );
                sleep(Duration::from_secs(*delay_secs)).await;
                attempt += 1;
            }
        }
    }
}
