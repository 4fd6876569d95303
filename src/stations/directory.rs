use crate::types::station::Station;
use regex::RegexBuilder;
use std::collections::{BTreeMap, BTreeSet};

/// Read-only lookup of stations by identifier, ordered by identifier.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StationDirectory {
    stations: BTreeMap<String, Station>,
}

impl StationDirectory {
    pub fn new(stations: impl IntoIterator<Item = Station>) -> Self {
        Self {
            stations: stations
                .into_iter()
                .map(|station| (station.station_number.clone(), station))
                .collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.stations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stations.is_empty()
    }

    pub fn get(&self, station_number: &str) -> Option<&Station> {
        self.stations.get(station_number)
    }

    pub fn contains(&self, station_number: &str) -> bool {
        self.stations.contains_key(station_number)
    }

    pub fn ids(&self) -> BTreeSet<String> {
        self.stations.keys().cloned().collect()
    }

    pub fn stations(&self) -> impl Iterator<Item = &Station> {
        self.stations.values()
    }

    /// Identifiers of the stations located in any of the given jurisdictions.
    pub fn in_jurisdictions(&self, codes: &[String]) -> BTreeSet<String> {
        self.stations
            .values()
            .filter(|station| codes.contains(&station.prov_terr_state_loc))
            .map(|station| station.station_number.clone())
            .collect()
    }

    /// The stations of `ids` that are in the directory, in identifier order.
    pub fn select(&self, ids: &BTreeSet<String>) -> Vec<Station> {
        ids.iter().filter_map(|id| self.get(id)).cloned().collect()
    }

    /// Case-insensitive regex search on station names.
    pub fn search_name(&self, pattern: &str) -> Result<Vec<Station>, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(self
            .stations
            .values()
            .filter(|station| regex.is_match(&station.station_name))
            .cloned()
            .collect())
    }

    /// Case-insensitive regex search on station identifiers.
    pub fn search_number(&self, pattern: &str) -> Result<Vec<Station>, regex::Error> {
        let regex = RegexBuilder::new(pattern).case_insensitive(true).build()?;
        Ok(self
            .stations
            .values()
            .filter(|station| regex.is_match(&station.station_number))
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::station::Network;

    fn directory() -> StationDirectory {
        StationDirectory::new([
            Station::new("08MF005", "FRASER RIVER AT HOPE", "BC", Network::Archive),
            Station::new("05AA008", "CROWSNEST RIVER AT FRANK", "AB", Network::Archive),
            Station::new("08NL071", "TULAMEEN RIVER BELOW VUICH CREEK", "BC", Network::Archive),
        ])
    }

    #[test]
    fn test_jurisdiction_filter() {
        let ids = directory().in_jurisdictions(&["BC".to_string()]);
        assert_eq!(ids.into_iter().collect::<Vec<_>>(), vec!["08MF005", "08NL071"]);
    }

    #[test]
    fn test_search() -> Result<(), regex::Error> {
        let dir = directory();
        let found = dir.search_name("river at")?;
        assert_eq!(found.len(), 2);
        let found = dir.search_number("^08")?;
        assert_eq!(found.len(), 2);
        assert!(dir.search_name("(").is_err());
        Ok(())
    }
}
