// Cache key scheme. Slugs are opaque and stored unnormalized so that the
// key a client asked for is the key that gets invalidated.

pub fn tournament_key(slug: &str) -> String {
    format!("tournament:{}", slug)
}

/// SCAN pattern covering every key this service writes.
pub fn namespace_pattern() -> &'static str {
    "tournament:*"
}
