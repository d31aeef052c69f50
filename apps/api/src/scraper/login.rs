use std::future::Future;
use std::time::Duration;

use tokio::time::Instant;

/// URL fragments that mean the site is asking the operator to sign in.
const AUTH_MARKERS: [&str; 3] = ["login", "challenge", "authwall"];

pub fn is_auth_wall(url: &str) -> bool {
    AUTH_MARKERS.iter().any(|marker| url.contains(marker))
}

/// Sleeps `interval`, runs `check`, and repeats until it returns `true` or
/// `deadline` has elapsed. `check` receives the 1-based attempt number.
///
/// Returns `Ok(false)` on timeout. Errors from `check` end the poll.
pub async fn poll_until<F, Fut, E>(interval: Duration, deadline: Duration, mut check: F) -> Result<bool, E>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<bool, E>>,
{
    let started = Instant::now();
    let mut attempt = 0;
    loop {
        tokio::time::sleep(interval).await;
        attempt += 1;
        if check(attempt).await? {
            return Ok(true);
        }
        if started.elapsed() >= deadline {
            return Ok(false);
        }
    }
}
