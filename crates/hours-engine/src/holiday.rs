//! Public-holiday lookup.
//!
//! Evaluators ask a [`HolidayOracle`] whether a date is a holiday. The oracle
//! is passed in explicitly; there is no process-wide instance.
//!
//! - [`FixedHolidays`] — deterministic, built from a list of dates (tests,
//!   offline use).
//! - [`CachedHolidayOracle`] — wraps any [`HolidaySource`] with a per-year
//!   read-mostly cache, optionally persisted as JSON files.
//! - [`HttpHolidaySource`] — fetches a year from the configured endpoint
//!   (feature `http`).
//!
//! Lookups never fail: a source error is logged and the year is treated as
//! having no holidays.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{Datelike, NaiveDate};
use parking_lot::RwLock;
use tracing::{debug, info, warn};

use crate::error::{HoursError, Result};

/// Holiday dates with their names, as served by the endpoint.
pub type HolidayNames = BTreeMap<NaiveDate, String>;

// ── HolidayOracle ───────────────────────────────────────────────────────────

/// Answers which dates of a year are public holidays.
///
/// Implementations must be infallible from the caller's point of view and
/// safe to share across threads.
pub trait HolidayOracle: Send + Sync {
    /// All holidays in `year`. Empty when unknown.
    fn get_holidays(&self, year: i32) -> HashSet<NaiveDate>;

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.get_holidays(date.year()).contains(&date)
    }
}

// ── FixedHolidays ───────────────────────────────────────────────────────────

/// A fixed set of holidays. Years without entries have none.
#[derive(Debug, Clone, Default)]
pub struct FixedHolidays {
    by_year: HashMap<i32, HashSet<NaiveDate>>,
}

impl FixedHolidays {
    /// No holidays at all.
    pub fn none() -> Self {
        Self::default()
    }

    pub fn from_dates<I: IntoIterator<Item = NaiveDate>>(dates: I) -> Self {
        dates.into_iter().collect()
    }
}

impl FromIterator<NaiveDate> for FixedHolidays {
    fn from_iter<I: IntoIterator<Item = NaiveDate>>(iter: I) -> Self {
        let mut by_year: HashMap<i32, HashSet<NaiveDate>> = HashMap::new();
        for date in iter {
            by_year.entry(date.year()).or_default().insert(date);
        }
        Self { by_year }
    }
}

impl HolidayOracle for FixedHolidays {
    fn get_holidays(&self, year: i32) -> HashSet<NaiveDate> {
        self.by_year.get(&year).cloned().unwrap_or_default()
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.by_year
            .get(&date.year())
            .is_some_and(|days| days.contains(&date))
    }
}

// ── HolidaySource ───────────────────────────────────────────────────────────

/// Where a [`CachedHolidayOracle`] gets a year it has not seen yet.
pub trait HolidaySource: Send + Sync {
    fn fetch(&self, year: i32) -> Result<HolidayNames>;
}

impl<F> HolidaySource for F
where
    F: Fn(i32) -> Result<HolidayNames> + Send + Sync,
{
    fn fetch(&self, year: i32) -> Result<HolidayNames> {
        self(year)
    }
}

/// Decode an endpoint payload (`{"2026-01-01": "元日", ...}`).
///
/// Keys that are not ISO dates, or fall outside `year`, are skipped.
///
/// # Errors
///
/// Returns [`HoursError::HolidayPayload`] if the body is not a JSON object
/// of strings.
pub fn parse_holiday_payload(year: i32, body: &str) -> Result<HolidayNames> {
    let raw: BTreeMap<String, String> = serde_json::from_str(body)
        .map_err(|e| HoursError::HolidayPayload(format!("year {year}: {e}")))?;

    Ok(raw
        .into_iter()
        .filter_map(|(key, name)| {
            let date = NaiveDate::parse_from_str(key.trim(), "%Y-%m-%d").ok()?;
            (date.year() == year).then_some((date, name))
        })
        .collect())
}

// ── CachedHolidayOracle ─────────────────────────────────────────────────────

/// Per-year cache in front of a [`HolidaySource`].
///
/// Reads take a shared lock. A missing year is fetched without holding any
/// lock and then inserted, so two callers racing on the same year both fetch
/// and the last insert wins; both values are the same. A failed fetch is
/// remembered as an empty year for the lifetime of the oracle, so a batch
/// pays the timeout at most once per year.
pub struct CachedHolidayOracle<S> {
    source: S,
    cache_dir: Option<PathBuf>,
    years: RwLock<HashMap<i32, Arc<HashSet<NaiveDate>>>>,
}

impl<S: HolidaySource> CachedHolidayOracle<S> {
    pub fn new(source: S) -> Self {
        Self {
            source,
            cache_dir: None,
            years: RwLock::new(HashMap::new()),
        }
    }

    /// Persist fetched years as `<dir>/<year>.json` and read them back before
    /// touching the source.
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = Some(dir.into());
        self
    }

    /// Shared handle to a year's holidays, loading it on first use.
    pub fn holidays(&self, year: i32) -> Arc<HashSet<NaiveDate>> {
        if let Some(hit) = self.years.read().get(&year) {
            return Arc::clone(hit);
        }

        let loaded = Arc::new(self.load(year));
        self.years.write().insert(year, Arc::clone(&loaded));
        loaded
    }

    /// Years currently held in memory, ascending.
    pub fn cached_years(&self) -> Vec<i32> {
        let mut years: Vec<i32> = self.years.read().keys().copied().collect();
        years.sort_unstable();
        years
    }

    fn load(&self, year: i32) -> HashSet<NaiveDate> {
        if let Some(dir) = &self.cache_dir {
            match read_cache_file(dir, year) {
                Ok(Some(names)) => {
                    debug!(year, count = names.len(), "holidays loaded from disk cache");
                    return names.into_keys().collect();
                }
                Ok(None) => {}
                Err(e) => warn!(year, error = %e, "ignoring unreadable holiday cache file"),
            }
        }

        match self.source.fetch(year) {
            Ok(names) => {
                info!(year, count = names.len(), "holidays fetched");
                if let Some(dir) = &self.cache_dir {
                    if let Err(e) = write_cache_file(dir, year, &names) {
                        warn!(year, error = %e, "could not persist holiday cache");
                    }
                }
                names.into_keys().collect()
            }
            Err(e) => {
                warn!(year, error = %e, "holiday lookup failed; assuming no holidays");
                HashSet::new()
            }
        }
    }
}

impl<S: HolidaySource> HolidayOracle for CachedHolidayOracle<S> {
    fn get_holidays(&self, year: i32) -> HashSet<NaiveDate> {
        self.holidays(year).as_ref().clone()
    }

    fn is_holiday(&self, date: NaiveDate) -> bool {
        self.holidays(date.year()).contains(&date)
    }
}

fn cache_path(dir: &Path, year: i32) -> PathBuf {
    dir.join(format!("{year}.json"))
}

fn read_cache_file(dir: &Path, year: i32) -> Result<Option<HolidayNames>> {
    let path = cache_path(dir, year);
    if !path.exists() {
        return Ok(None);
    }
    let body = std::fs::read_to_string(&path)
        .map_err(|e| HoursError::CacheIo(format!("{}: {e}", path.display())))?;
    parse_holiday_payload(year, &body).map(Some)
}

fn write_cache_file(dir: &Path, year: i32, names: &HolidayNames) -> Result<()> {
    std::fs::create_dir_all(dir)
        .map_err(|e| HoursError::CacheIo(format!("{}: {e}", dir.display())))?;
    let path = cache_path(dir, year);
    let body = serde_json::to_string_pretty(names)
        .map_err(|e| HoursError::CacheIo(format!("{}: {e}", path.display())))?;
    std::fs::write(&path, body).map_err(|e| HoursError::CacheIo(format!("{}: {e}", path.display())))
}

// ── HttpHolidaySource ───────────────────────────────────────────────────────

#[cfg(feature = "http")]
pub use http::{HttpHolidayOracle, HttpHolidaySource};

#[cfg(feature = "http")]
mod http {
    use super::*;
    use crate::config::HolidayConfig;

    /// Blocking fetch of one year from the configured endpoint.
    ///
    /// Uses `reqwest::blocking`; do not call from inside an async runtime.
    pub struct HttpHolidaySource {
        client: reqwest::blocking::Client,
        config: HolidayConfig,
    }

    /// The production oracle: HTTP source behind the per-year cache.
    pub type HttpHolidayOracle = CachedHolidayOracle<HttpHolidaySource>;

    impl HttpHolidaySource {
        /// # Errors
        ///
        /// Returns [`HoursError::InvalidConfig`] for an invalid config, or
        /// [`HoursError::HolidayFetch`] if the HTTP client cannot be built.
        pub fn new(config: HolidayConfig) -> Result<Self> {
            config.validate()?;
            let client = reqwest::blocking::Client::builder()
                .timeout(config.timeout())
                .build()
                .map_err(|e| HoursError::HolidayFetch(format!("client setup: {e}")))?;
            Ok(Self { client, config })
        }
    }

    impl HolidaySource for HttpHolidaySource {
        fn fetch(&self, year: i32) -> Result<HolidayNames> {
            let url = self.config.url_for(year);
            let body = self
                .client
                .get(&url)
                .send()
                .and_then(|resp| resp.error_for_status())
                .and_then(|resp| resp.text())
                .map_err(|e| HoursError::HolidayFetch(format!("{url}: {e}")))?;
            parse_holiday_payload(year, &body)
        }
    }

    impl CachedHolidayOracle<HttpHolidaySource> {
        /// Build the HTTP-backed oracle, honouring `config.cache_dir`.
        ///
        /// # Errors
        ///
        /// See [`HttpHolidaySource::new`].
        pub fn from_config(config: &HolidayConfig) -> Result<Self> {
            let oracle = CachedHolidayOracle::new(HttpHolidaySource::new(config.clone())?);
            Ok(match &config.cache_dir {
                Some(dir) => oracle.with_cache_dir(dir),
                None => oracle,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn new_year_source(calls: Arc<AtomicUsize>) -> impl HolidaySource {
        move |year: i32| -> Result<HolidayNames> {
            calls.fetch_add(1, Ordering::SeqCst);
            let mut names = HolidayNames::new();
            names.insert(date(year, 1, 1), "元日".to_string());
            Ok(names)
        }
    }

    // ── FixedHolidays ───────────────────────────────────────────────────

    #[test]
    fn test_fixed_holidays_lookup() {
        let oracle = FixedHolidays::from_dates([date(2026, 1, 1), date(2026, 5, 5)]);
        assert!(oracle.is_holiday(date(2026, 5, 5)));
        assert!(!oracle.is_holiday(date(2026, 5, 6)));
        assert_eq!(oracle.get_holidays(2026).len(), 2);
        assert!(oracle.get_holidays(2025).is_empty());
    }

    #[test]
    fn test_fixed_holidays_none() {
        let oracle = FixedHolidays::none();
        assert!(!oracle.is_holiday(date(2026, 1, 1)));
    }

    // ── parse_holiday_payload ───────────────────────────────────────────

    #[test]
    fn test_parse_payload() {
        let body = r#"{"2026-01-01": "元日", "2026-01-12": "成人の日", "2025-12-31": "x", "bogus": "y"}"#;
        let names = parse_holiday_payload(2026, body).unwrap();
        assert_eq!(names.len(), 2);
        assert_eq!(names[&date(2026, 1, 12)], "成人の日");
    }

    #[test]
    fn test_parse_payload_rejects_non_object() {
        let err = parse_holiday_payload(2026, "[1, 2]").unwrap_err().to_string();
        assert!(err.contains("Invalid holiday payload"), "got: {err}");
    }

    // ── CachedHolidayOracle ─────────────────────────────────────────────

    #[test]
    fn test_cache_fetches_each_year_once() {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = CachedHolidayOracle::new(new_year_source(Arc::clone(&calls)));

        assert!(oracle.is_holiday(date(2026, 1, 1)));
        assert!(!oracle.is_holiday(date(2026, 1, 2)));
        assert!(oracle.is_holiday(date(2027, 1, 1)));
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(oracle.cached_years(), vec![2026, 2027]);
    }

    #[test]
    fn test_failed_fetch_yields_empty_set() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let oracle = CachedHolidayOracle::new(move |year: i32| -> Result<HolidayNames> {
            counter.fetch_add(1, Ordering::SeqCst);
            Err(HoursError::HolidayFetch(format!("offline ({year})")))
        });

        assert!(oracle.get_holidays(2026).is_empty());
        assert!(!oracle.is_holiday(date(2026, 1, 1)));
        // The failure is remembered; no second request.
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_concurrent_reads() {
        let calls = Arc::new(AtomicUsize::new(0));
        let oracle = CachedHolidayOracle::new(new_year_source(Arc::clone(&calls)));
        oracle.holidays(2026);

        std::thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    for _ in 0..100 {
                        assert!(oracle.is_holiday(date(2026, 1, 1)));
                    }
                });
            }
        });
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_disk_cache_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let first = CachedHolidayOracle::new(new_year_source(Arc::clone(&calls)))
            .with_cache_dir(dir.path());
        assert!(first.is_holiday(date(2026, 1, 1)));
        assert!(dir.path().join("2026.json").exists());

        // A fresh oracle reads the file instead of calling the source.
        let second = CachedHolidayOracle::new(new_year_source(Arc::clone(&calls)))
            .with_cache_dir(dir.path());
        assert!(second.is_holiday(date(2026, 1, 1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_corrupt_disk_cache_falls_back_to_source() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("2026.json"), "not json").unwrap();
        let calls = Arc::new(AtomicUsize::new(0));

        let oracle = CachedHolidayOracle::new(new_year_source(Arc::clone(&calls)))
            .with_cache_dir(dir.path());
        assert!(oracle.is_holiday(date(2026, 1, 1)));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_failed_fetch_not_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let oracle = CachedHolidayOracle::new(|_year: i32| -> Result<HolidayNames> {
            Err(HoursError::HolidayFetch("offline".to_string()))
        })
        .with_cache_dir(dir.path());

        assert!(oracle.get_holidays(2026).is_empty());
        assert!(!dir.path().join("2026.json").exists());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_http_source_rejects_bad_config() {
        let config = crate::config::HolidayConfig::default().with_endpoint("http://localhost/");
        assert!(HttpHolidaySource::new(config).is_err());
    }
}
