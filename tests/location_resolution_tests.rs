//! Location-resolution integration tests over the public API: bundled
//! gazetteer coverage, the geo cache round-trip and candidate rewrites.

use std::sync::atomic::{AtomicUsize, Ordering};
use tempfile::tempdir;

use wallcal::cache::{GeoCacheEnvelope, KvStore, geo_cache_key};
use wallcal::error::AppError;
use wallcal::geo::resolver::{
    GeocodePlace, GeocodeSearchResponse, GeocodingApi, build_geocode_candidates, resolve,
};
use wallcal::geo::{Gazetteer, GeoResult};
use wallcal::i18n::Lang;

struct CountingGeocoder {
    calls: AtomicUsize,
    results: Vec<GeocodePlace>,
}

impl CountingGeocoder {
    fn answering(results: Vec<GeocodePlace>) -> Self {
        Self {
            calls: AtomicUsize::new(0),
            results,
        }
    }

    fn silent() -> Self {
        Self::answering(Vec::new())
    }

    fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl GeocodingApi for CountingGeocoder {
    async fn search(
        &self,
        _name: &str,
        _lang: Lang,
        _constrain_country: bool,
    ) -> Result<GeocodeSearchResponse, AppError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(GeocodeSearchResponse {
            results: self.results.clone(),
        })
    }
}

async fn bundled_gazetteer() -> Gazetteer {
    Gazetteer::load(None).await.unwrap()
}

#[tokio::test]
async fn test_bundled_gazetteer_answers_known_districts_locally() {
    let dir = tempdir().unwrap();
    let store = KvStore::open(dir.path().join("store.json"));
    let gazetteer = bundled_gazetteer().await;
    let geocoder = CountingGeocoder::silent();

    for (lang, query) in [
        (Lang::Zh, "台北市信義區"),
        (Lang::Zh, "臺北市大安區"),
        (Lang::Zh, "新北市板橋區"),
        (Lang::Zh, "基隆市信義區"),
        (Lang::En, "Xinyi District Taipei"),
        (Lang::En, "Banqiao District, New Taipei City"),
    ] {
        let result = resolve(&store, &gazetteer, &geocoder, lang, query, 0)
            .await
            .unwrap_or_else(|e| panic!("{query} should resolve locally: {e}"));
        assert!(result.has_finite_coordinates(), "{query}");
    }

    assert_eq!(geocoder.call_count(), 0, "no geocoding request may go out");
}

#[tokio::test]
async fn test_ambiguous_district_takes_first_resource_entry() {
    let dir = tempdir().unwrap();
    let store = KvStore::open(dir.path().join("store.json"));
    let gazetteer = bundled_gazetteer().await;
    let geocoder = CountingGeocoder::silent();

    // 信義區 exists in 台北市 and 基隆市; bare district input takes the
    // first resource entry (台北市)
    let result = resolve(&store, &gazetteer, &geocoder, Lang::Zh, "信義區", 0)
        .await
        .unwrap();
    assert_eq!(result.admin_area, "台北市");

    // A city qualifier disambiguates
    let result = resolve(&store, &gazetteer, &geocoder, Lang::Zh, "基隆市信義區", 0)
        .await
        .unwrap();
    assert_eq!(result.admin_area, "基隆市");
}

#[tokio::test]
async fn test_geo_round_trip_preserves_result_within_ttl() {
    let dir = tempdir().unwrap();
    let store = KvStore::open(dir.path().join("store.json"));
    let gazetteer = bundled_gazetteer().await;
    let geocoder = CountingGeocoder::silent();
    let now_ms: i64 = 1_736_000_000_000;

    let first = resolve(&store, &gazetteer, &geocoder, Lang::Zh, "新北市板橋區", now_ms)
        .await
        .unwrap();

    // Re-read within the 7-day TTL: identical coordinates and name,
    // straight from the cache
    let six_days_later = now_ms + 6 * 24 * 60 * 60 * 1000;
    let second = resolve(
        &store,
        &gazetteer,
        &geocoder,
        Lang::Zh,
        "新北市板橋區",
        six_days_later,
    )
    .await
    .unwrap();

    assert_eq!(second.latitude, first.latitude);
    assert_eq!(second.longitude, first.longitude);
    assert_eq!(second.resolved_name, first.resolved_name);

    // The raw envelope carries the save time of the first resolution
    let envelope: GeoCacheEnvelope = store
        .get(&geo_cache_key(Lang::Zh, "新北市板橋區"))
        .unwrap();
    assert_eq!(envelope.saved_at_ms, now_ms);
}

#[tokio::test]
async fn test_cached_result_survives_gazetteer_absence() {
    // A previously cached remote result answers even with an empty
    // gazetteer and a silent upstream
    let dir = tempdir().unwrap();
    let store = KvStore::open(dir.path().join("store.json"));
    let empty = Gazetteer::default();
    let geocoder = CountingGeocoder::silent();
    let now_ms: i64 = 1_736_000_000_000;

    let cached = GeoResult {
        latitude: 24.95,
        longitude: 121.16,
        resolved_name: "楊梅".to_string(),
        admin_area: "桃園市".to_string(),
        timezone: "Asia/Taipei".to_string(),
        country_code: "TW".to_string(),
        matched_query: "楊梅".to_string(),
    };
    store.set(
        &geo_cache_key(Lang::Zh, "楊梅"),
        &GeoCacheEnvelope::new(cached, now_ms - 60 * 60 * 1000),
    );

    let result = resolve(&store, &empty, &geocoder, Lang::Zh, "楊梅", now_ms)
        .await
        .unwrap();
    assert_eq!(result.latitude, 24.95);
    assert_eq!(geocoder.call_count(), 0);
}

#[tokio::test]
async fn test_unlisted_place_falls_through_to_remote() {
    let dir = tempdir().unwrap();
    let store = KvStore::open(dir.path().join("store.json"));
    let gazetteer = bundled_gazetteer().await;

    // 金山區 is not in the bundled table; the remote backend answers
    let geocoder = CountingGeocoder::answering(vec![GeocodePlace {
        latitude: Some(25.22),
        longitude: Some(121.64),
        name: Some("金山區".to_string()),
        admin1: Some("新北市".to_string()),
        timezone: Some("Asia/Taipei".to_string()),
        country_code: Some("TW".to_string()),
    }]);

    let result = resolve(&store, &gazetteer, &geocoder, Lang::Zh, "金山區", 0)
        .await
        .unwrap();
    assert_eq!(result.resolved_name, "金山區");
    assert_eq!(result.admin_area, "新北市");
    assert_eq!(geocoder.call_count(), 1);
}

#[test]
fn test_candidate_rewrites_match_known_patterns() {
    // The canonical rewrite: full zh address down to the bare district
    let candidates = build_geocode_candidates(Lang::Zh, "新北市板橋區");
    assert_eq!(candidates, vec!["新北市板橋區", "板橋區", "板橋"]);

    // English inputs split on commas and drop the District suffix
    let candidates = build_geocode_candidates(Lang::En, "Xinyi District, Taipei");
    assert!(candidates.contains(&"Xinyi District".to_string()));
    assert!(candidates.contains(&"Xinyi, Taipei".to_string()));
}
