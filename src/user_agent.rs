//! Browser User-Agent strings for search page requests.
//!
//! The search endpoint serves its script response to browsers, so requests
//! present a browser-like UA picked once per client from a fixed pool.

use rand::seq::SliceRandom;

/// Pool of desktop browser User-Agent strings.
const BROWSER_USER_AGENTS: &[&str] = &[
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/130.0.0.0 Safari/537.36",
    "Mozilla/5.0 (X11; Linux x86_64; rv:132.0) Gecko/20100101 Firefox/132.0",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 14_7_1) AppleWebKit/605.1.15 \
     (KHTML, like Gecko) Version/18.1 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/131.0.0.0 Safari/537.36 Edg/131.0.0.0",
];

/// Picks a browser User-Agent at random.
#[must_use]
pub(crate) fn random_browser_user_agent() -> &'static str {
    BROWSER_USER_AGENTS
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(BROWSER_USER_AGENTS[0])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_random_browser_user_agent_is_from_pool() {
        for _ in 0..20 {
            let ua = random_browser_user_agent();
            assert!(BROWSER_USER_AGENTS.contains(&ua), "unexpected UA: {ua}");
        }
    }

    #[test]
    fn test_pool_entries_look_like_browsers() {
        for ua in BROWSER_USER_AGENTS {
            assert!(ua.starts_with("Mozilla/5.0 ("), "bad UA format: {ua}");
            assert!(!ua.contains("  "), "line continuation left double space: {ua}");
        }
    }
}
