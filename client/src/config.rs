/// Prefix of every backend route.
pub(crate) const API_BASE: &str = "/api";

/// Initial map view over the Canadian Arctic Archipelago, as `[lon, lat]`.
pub(crate) const INITIAL_CENTER: [f64; 2] = [-108.9515, 74.7496];
pub(crate) const INITIAL_ZOOM: f64 = 3.0;
pub(crate) const MAX_ZOOM: f64 = 8.0;

pub(crate) const BASEMAP_STYLE: &str = "mapbox/dark-v11";

/// Basemap access token baked in at build time from `ICEWATCH_MAP_TOKEN`.
pub(crate) fn map_token() -> Option<&'static str> {
    normalize_token(option_env!("ICEWATCH_MAP_TOKEN"))
}

fn normalize_token(raw: Option<&'static str>) -> Option<&'static str> {
    raw.map(str::trim).filter(|token| !token.is_empty())
}

pub(crate) fn api_url(path: &str) -> String {
    format!("{API_BASE}{path}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn blank_token_counts_as_missing() {
        assert_eq!(normalize_token(None), None);
        assert_eq!(normalize_token(Some("")), None);
        assert_eq!(normalize_token(Some("   ")), None);
        assert_eq!(normalize_token(Some(" pk.abc ")), Some("pk.abc"));
    }

    #[test]
    fn api_paths_share_prefix() {
        assert_eq!(api_url("/chat"), "/api/chat");
    }
}
