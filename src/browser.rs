use crate::models::Station;

/// What the caller should do with the playback sink after a play request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayDecision {
    /// Load and start this URL. The sink replaces any prior source itself,
    /// so one load is the whole side effect.
    Start(String),
    /// The station is already active. No sink call.
    AlreadyPlaying,
}

/// Station list, filter state, and the single active station.
///
/// This is the whole browsing state of the app. It performs no I/O and never
/// touches the sink; the controller applies the decisions it returns. The
/// visible set is derived on demand from `all_stations` and the two filters,
/// and playback state has no effect on it.
#[derive(Debug, Default)]
pub struct StationBrowser {
    all_stations: Vec<Station>,
    total_count: usize,
    search_query: String,
    selected_country: String,
    current: Option<Station>,
}

impl StationBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wholesale replacement after a successful load. Filters and the active
    /// station carry over; the visible set is re-derived under them.
    pub fn set_stations(&mut self, stations: Vec<Station>, count: usize) {
        self.all_stations = stations;
        self.total_count = count;
    }

    /// The count reported by the last successful load. Drives the station
    /// count label; filtering does not change it.
    pub fn total_count(&self) -> usize {
        self.total_count
    }

    pub fn set_search_query(&mut self, query: &str) {
        self.search_query = query.trim().to_lowercase();
    }

    pub fn search_query(&self) -> &str {
        &self.search_query
    }

    /// Empty string clears the filter.
    pub fn set_country_filter(&mut self, country: &str) {
        self.selected_country = country.to_string();
    }

    pub fn selected_country(&self) -> &str {
        &self.selected_country
    }

    /// The stations passing both filters, in load order.
    pub fn visible_stations(&self) -> Vec<&Station> {
        self.all_stations
            .iter()
            .filter(|s| self.matches_search(s))
            .filter(|s| self.matches_country(s))
            .collect()
    }

    fn matches_search(&self, station: &Station) -> bool {
        if self.search_query.is_empty() {
            return true;
        }
        station.name.to_lowercase().contains(&self.search_query)
    }

    /// A station with no country never matches a non-empty selection.
    fn matches_country(&self, station: &Station) -> bool {
        if self.selected_country.is_empty() {
            return true;
        }
        station
            .country
            .as_deref()
            .unwrap_or("")
            .eq_ignore_ascii_case(&self.selected_country)
    }

    /// Re-clicking the active station is a no-op; anything else becomes the
    /// new active station and asks the caller for exactly one sink load.
    pub fn play(&mut self, station: &Station) -> PlayDecision {
        if let Some(current) = &self.current {
            if current.same_stream(station) {
                return PlayDecision::AlreadyPlaying;
            }
        }
        self.current = Some(station.clone());
        PlayDecision::Start(station.stream_url.clone())
    }

    /// Clears the active station. Returns whether there was one, so the
    /// caller halts the sink exactly once.
    pub fn stop(&mut self) -> bool {
        self.current.take().is_some()
    }

    pub fn current(&self) -> Option<&Station> {
        self.current.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn station(name: &str, country: Option<&str>, url: &str) -> Station {
        Station {
            name: name.into(),
            stream_url: url.into(),
            homepage: None,
            country: country.map(str::to_string),
            tags: None,
            codec: None,
            bitrate: None,
        }
    }

    fn loaded() -> StationBrowser {
        let mut b = StationBrowser::new();
        b.set_stations(
            vec![
                station("Jazz FM", Some("France"), "u1"),
                station("Rock Hits", Some("Germany"), "u2"),
            ],
            2,
        );
        b
    }

    fn urls(b: &StationBrowser) -> Vec<&str> {
        b.visible_stations()
            .iter()
            .map(|s| s.stream_url.as_str())
            .collect()
    }

    #[test]
    fn search_filters_by_name_case_insensitive() {
        let mut b = loaded();
        b.set_search_query("  JAZZ ");
        assert_eq!(urls(&b), ["u1"]);
    }

    #[test]
    fn clearing_search_restores_country_filtered_set() {
        let mut b = loaded();
        b.set_country_filter("Germany");
        let before: Vec<String> = urls(&b).iter().map(|s| s.to_string()).collect();
        b.set_search_query("jazz");
        b.set_search_query("");
        let after: Vec<String> = urls(&b).iter().map(|s| s.to_string()).collect();
        assert_eq!(after, before);
    }

    #[test]
    fn filters_commute() {
        let mut ab = loaded();
        ab.set_search_query("rock");
        ab.set_country_filter("Germany");

        let mut ba = loaded();
        ba.set_country_filter("Germany");
        ba.set_search_query("rock");

        assert_eq!(urls(&ab), urls(&ba));
        assert_eq!(urls(&ab), ["u2"]);
    }

    #[test]
    fn country_match_is_case_insensitive() {
        let mut b = loaded();
        b.set_country_filter("france");
        assert_eq!(urls(&b), ["u1"]);
    }

    #[test]
    fn missing_country_never_matches_a_selection() {
        let mut b = StationBrowser::new();
        b.set_stations(vec![station("Nowhere FM", None, "u9")], 1);
        b.set_country_filter("France");
        assert!(urls(&b).is_empty());
        b.set_country_filter("");
        assert_eq!(urls(&b), ["u9"]);
    }

    #[test]
    fn filter_intersection_scenario() {
        let mut b = loaded();
        b.set_search_query("jazz");
        assert_eq!(urls(&b), ["u1"]);
        b.set_country_filter("Germany");
        assert!(urls(&b).is_empty());
        b.set_country_filter("");
        b.set_search_query("");
        assert_eq!(urls(&b), ["u1", "u2"]);
    }

    #[test]
    fn play_is_idempotent_per_stream_url() {
        let mut b = loaded();
        let s = station("Jazz FM", Some("France"), "u1");
        assert_eq!(b.play(&s), PlayDecision::Start("u1".into()));
        assert_eq!(b.play(&s), PlayDecision::AlreadyPlaying);
        assert_eq!(b.current().unwrap().stream_url, "u1");
    }

    #[test]
    fn switching_stations_yields_one_replace_start() {
        let mut b = loaded();
        let a = station("Jazz FM", Some("France"), "u1");
        let c = station("Rock Hits", Some("Germany"), "u2");
        assert_eq!(b.play(&a), PlayDecision::Start("u1".into()));
        // A single Start: the sink's source replacement is the only stop.
        assert_eq!(b.play(&c), PlayDecision::Start("u2".into()));
        assert_eq!(b.current().unwrap().stream_url, "u2");
    }

    #[test]
    fn stop_clears_once_and_is_idempotent() {
        let mut b = loaded();
        let s = station("Jazz FM", Some("France"), "u1");
        b.play(&s);
        assert!(b.stop());
        assert!(b.current().is_none());
        assert!(!b.stop());
    }

    #[test]
    fn filtering_does_not_stop_playback() {
        let mut b = loaded();
        let s = station("Jazz FM", Some("France"), "u1");
        b.play(&s);
        b.set_country_filter("Germany");
        assert!(urls(&b).iter().all(|u| *u != "u1"));
        assert_eq!(b.current().unwrap().stream_url, "u1");
    }

    #[test]
    fn active_is_keyed_by_url_not_name() {
        let mut b = StationBrowser::new();
        let first = station("Duplicate", Some("France"), "u1");
        let second = station("Duplicate", Some("France"), "u2");
        b.set_stations(vec![first.clone(), second.clone()], 2);
        b.play(&first);
        let current = b.current().unwrap();
        assert!(current.same_stream(&first));
        assert!(!current.same_stream(&second));
    }

    #[test]
    fn reload_keeps_filters_and_current() {
        let mut b = loaded();
        let s = station("Jazz FM", Some("France"), "u1");
        b.play(&s);
        b.set_search_query("rock");
        b.set_stations(vec![station("Rock Hits", Some("Germany"), "u2")], 1);
        assert_eq!(urls(&b), ["u2"]);
        assert_eq!(b.total_count(), 1);
        assert_eq!(b.current().unwrap().stream_url, "u1");
    }
}
