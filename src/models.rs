use serde::Deserialize;

/// One radio station as served by the backend. Everything beyond the name and
/// the stream URL is optional metadata from the scraper.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct Station {
    pub name: String,
    pub stream_url: String,
    #[serde(default)]
    pub homepage: Option<String>,
    #[serde(default)]
    pub country: Option<String>,
    #[serde(default)]
    pub tags: Option<String>,
    #[serde(default)]
    pub codec: Option<String>,
    #[serde(default)]
    pub bitrate: Option<u32>,
}

/// Tag substrings and the icon each one selects. First match wins.
const ICON_TABLE: &[(&str, &str)] = &[
    ("news", "📰"),
    ("music", "🎵"),
    ("sport", "⚽"),
    ("talk", "🎙"),
    ("religious", "🙏"),
    ("christian", "🙏"),
    ("catholic", "🙏"),
    ("jazz", "🎷"),
    ("rock", "🎸"),
    ("classical", "🎻"),
];

const DEFAULT_ICON: &str = "📻";

impl Station {
    /// Stations are the same iff their stream URLs match. Names are not
    /// unique and must never be used for identity.
    pub fn same_stream(&self, other: &Station) -> bool {
        self.stream_url == other.stream_url
    }

    pub fn country_display(&self) -> &str {
        match self.country.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => "Unknown",
        }
    }

    pub fn codec_display(&self) -> &str {
        match self.codec.as_deref() {
            Some(c) if !c.is_empty() => c,
            _ => "Unknown",
        }
    }

    /// A zero bitrate means the scraper could not determine one.
    pub fn bitrate_display(&self) -> String {
        match self.bitrate {
            Some(b) if b > 0 => b.to_string(),
            _ => "?".to_string(),
        }
    }

    pub fn icon(&self) -> &'static str {
        let tags = self.tags.as_deref().unwrap_or("").to_lowercase();
        ICON_TABLE
            .iter()
            .find(|(needle, _)| tags.contains(needle))
            .map(|(_, icon)| *icon)
            .unwrap_or(DEFAULT_ICON)
    }

    /// `"France • MP3 • 128 kbps"`, with display defaults for missing fields.
    pub fn meta_line(&self) -> String {
        format!(
            "{} • {} • {} kbps",
            self.country_display(),
            self.codec_display(),
            self.bitrate_display()
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(tags: Option<&str>) -> Station {
        Station {
            name: "Test FM".into(),
            stream_url: "http://example.com/stream".into(),
            homepage: None,
            country: None,
            tags: tags.map(str::to_string),
            codec: None,
            bitrate: None,
        }
    }

    #[test]
    fn parses_station_with_missing_fields() {
        let s: Station =
            serde_json::from_str(r#"{"name":"Jazz FM","stream_url":"http://j/1"}"#).unwrap();
        assert_eq!(s.name, "Jazz FM");
        assert_eq!(s.country, None);
        assert_eq!(s.bitrate, None);
    }

    #[test]
    fn display_defaults_for_missing_fields() {
        let s = station(None);
        assert_eq!(s.country_display(), "Unknown");
        assert_eq!(s.codec_display(), "Unknown");
        assert_eq!(s.bitrate_display(), "?");
        assert_eq!(s.meta_line(), "Unknown • Unknown • ? kbps");
    }

    #[test]
    fn zero_bitrate_displays_as_unknown() {
        let mut s = station(None);
        s.bitrate = Some(0);
        assert_eq!(s.bitrate_display(), "?");
        s.bitrate = Some(128);
        assert_eq!(s.bitrate_display(), "128");
    }

    #[test]
    fn icon_first_match_wins() {
        // "news" precedes "talk" in the table even though both substrings match.
        let s = station(Some("talk,news"));
        assert_eq!(s.icon(), "📰");
        assert_eq!(station(Some("Smooth JAZZ")).icon(), "🎷");
        assert_eq!(station(Some("catholic radio")).icon(), "🙏");
        assert_eq!(station(Some("")).icon(), "📻");
        assert_eq!(station(None).icon(), "📻");
    }
}
