//! Region orchestrator
//!
//! Validates a batch of region codes, runs one pagination driver per region
//! concurrently (each with its own browser session) and assembles the
//! results in request order under a shared deadline.

use std::sync::Arc;
use std::time::{Duration, Instant};

use cep_core::{
    Error, FailurePolicy, LocalityRecord, MAX_REGIONS, Region, RegionFailure, RegionResult,
    Resolution, Result, ScraperConfig,
};
use futures::StreamExt;
use futures::stream::FuturesUnordered;
use tracing::{debug, info, warn};

use crate::automation::DriverFactory;
use crate::context::{CancelFlag, RunContext, deadline_after};
use crate::pagination::{ScrapeSettings, scrape_region};

/// Resolves region codes to their locality listings
pub struct RegionResolver {
    factory: Arc<dyn DriverFactory>,
    settings: Arc<ScrapeSettings>,
    deadline: Duration,
    policy: FailurePolicy,
}

impl RegionResolver {
    pub fn new(factory: Arc<dyn DriverFactory>, config: &ScraperConfig) -> Self {
        Self {
            factory,
            settings: Arc::new(ScrapeSettings::from(config)),
            deadline: config.deadline(),
            policy: config.failure_policy,
        }
    }

    pub fn with_policy(mut self, policy: FailurePolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    pub fn policy(&self) -> FailurePolicy {
        self.policy
    }

    pub fn deadline(&self) -> Duration {
        self.deadline
    }

    /// Check the batch size, then trim and validate every code.
    ///
    /// Nothing is scraped unless the whole batch is valid.
    pub fn parse_regions<S: AsRef<str>>(codes: &[S]) -> Result<Vec<Region>> {
        if codes.len() > MAX_REGIONS {
            return Err(Error::TooManyRegions {
                requested: codes.len(),
                max: MAX_REGIONS,
            });
        }

        codes.iter().map(|code| code.as_ref().trim().parse()).collect()
    }

    /// Scrape every requested region.
    ///
    /// Results come back in the order the codes were given, whatever order
    /// the runs finish in. How a failed run is reported depends on the
    /// configured `FailurePolicy`.
    pub async fn resolve<S: AsRef<str>>(&self, codes: &[S]) -> Result<Resolution> {
        self.resolve_with(codes, self.policy).await
    }

    /// Scrape a single region, failing on any error
    pub async fn resolve_one(&self, code: &str) -> Result<Vec<LocalityRecord>> {
        let mut resolution = self.resolve_with(&[code], FailurePolicy::FailFast).await?;
        Ok(resolution
            .results
            .pop()
            .map(|result| result.localities)
            .unwrap_or_default())
    }

    async fn resolve_with<S: AsRef<str>>(
        &self,
        codes: &[S],
        policy: FailurePolicy,
    ) -> Result<Resolution> {
        let regions = Self::parse_regions(codes)?;
        if regions.is_empty() {
            return Ok(Resolution::default());
        }

        info!("Resolving {} regions: {:?}", regions.len(), regions);

        let started = Instant::now();
        let deadline = deadline_after(started, self.deadline);
        let cancel = CancelFlag::new();
        // stops every run still going once this future finishes or is dropped
        let _guard = cancel.guard();

        let mut pending: FuturesUnordered<_> = regions
            .iter()
            .copied()
            .enumerate()
            .map(|(slot, region)| {
                let factory = Arc::clone(&self.factory);
                let settings = Arc::clone(&self.settings);
                let ctx = RunContext::new(deadline, cancel.clone());

                let handle = tokio::task::spawn_blocking(move || {
                    run_region(factory.as_ref(), region, &settings, &ctx)
                });

                async move {
                    let outcome =
                        match tokio::time::timeout_at(tokio::time::Instant::from_std(deadline), handle)
                            .await
                        {
                            Ok(Ok(outcome)) => outcome,
                            Ok(Err(e)) => {
                                Err(Error::Automation(format!("{} run aborted: {}", region, e)))
                            }
                            Err(_) => Err(Error::DeadlineExceeded),
                        };
                    (slot, outcome)
                }
            })
            .collect();

        let mut slots: Vec<Option<Result<Vec<LocalityRecord>>>> =
            regions.iter().map(|_| None).collect();

        while let Some((slot, outcome)) = pending.next().await {
            match outcome {
                Err(e) if policy == FailurePolicy::FailFast => {
                    warn!("{} failed, abandoning the request: {}", regions[slot], e);
                    cancel.cancel();
                    return Err(e);
                }
                outcome => {
                    debug!("{} finished after {:?}", regions[slot], started.elapsed());
                    slots[slot] = Some(outcome);
                }
            }
        }

        let mut resolution = Resolution::default();
        for (region, outcome) in regions.into_iter().zip(slots) {
            match outcome.unwrap_or(Err(Error::DeadlineExceeded)) {
                Ok(localities) => resolution
                    .results
                    .push(RegionResult::new(region, localities)),
                Err(e) => {
                    warn!("{} failed: {}", region, e);
                    resolution.failures.push(RegionFailure {
                        region,
                        error: e.to_string(),
                    });
                }
            }
        }

        info!(
            "Resolved {} regions ({} failed) in {:?}",
            resolution.results.len(),
            resolution.failures.len(),
            started.elapsed()
        );

        Ok(resolution)
    }
}

/// One region run on a blocking thread, owning its browser session
fn run_region(
    factory: &dyn DriverFactory,
    region: Region,
    settings: &ScrapeSettings,
    ctx: &RunContext,
) -> Result<Vec<LocalityRecord>> {
    ctx.checkpoint()?;
    let driver = factory.open(region, ctx)?;
    scrape_region(driver.as_ref(), region, settings, ctx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fixture::{FixtureDriverFactory, FixtureSite, results_page};

    fn config() -> ScraperConfig {
        ScraperConfig {
            target_url: "http://fixture.local/buscaFaixaCep.cfm".into(),
            element_timeout_secs: 1,
            settle_delay_ms: 0,
            poll_interval_ms: 5,
            ..Default::default()
        }
    }

    fn site(name: &str) -> FixtureSite {
        FixtureSite::new(vec![results_page(&[(name, "00000-000 a 00001-999")], false, false)])
    }

    fn resolver(factory: &FixtureDriverFactory) -> RegionResolver {
        RegionResolver::new(Arc::new(factory.clone()), &config())
    }

    fn regions(resolution: &Resolution) -> Vec<Region> {
        resolution.results.iter().map(|r| r.region).collect()
    }

    #[tokio::test]
    async fn test_too_many_regions_opens_no_session() {
        let factory = FixtureDriverFactory::new();
        let codes = ["AC", "AL", "AP", "AM", "BA", "CE"];

        match resolver(&factory).resolve(&codes).await {
            Err(Error::TooManyRegions { requested, max }) => {
                assert_eq!(requested, 6);
                assert_eq!(max, 5);
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(factory.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_five_regions_are_accepted() {
        let codes = [Region::AC, Region::AL, Region::AP, Region::AM, Region::BA];
        let factory = codes.iter().fold(FixtureDriverFactory::new(), |f, &r| {
            f.with_site(r, site(r.as_str()))
        });

        let resolution = resolver(&factory)
            .resolve(&["AC", "AL", "AP", "AM", "BA"])
            .await
            .unwrap();

        assert_eq!(regions(&resolution), codes);
        assert!(resolution.is_complete());
        assert_eq!(factory.sessions_opened(), 5);
    }

    #[tokio::test]
    async fn test_invalid_region_opens_no_session() {
        let factory = FixtureDriverFactory::new().with_site(Region::AC, site("Xapuri"));

        match resolver(&factory).resolve(&["AC", "JI"]).await {
            Err(Error::InvalidRegion(code)) => assert_eq!(code, "JI"),
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(factory.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_codes_are_trimmed() {
        let factory = FixtureDriverFactory::new().with_site(Region::AC, site("Xapuri"));

        let resolution = resolver(&factory).resolve(&[" AC "]).await.unwrap();
        assert_eq!(regions(&resolution), [Region::AC]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let factory = FixtureDriverFactory::new();
        let codes: [&str; 0] = [];

        let resolution = resolver(&factory).resolve(&codes).await.unwrap();
        assert!(resolution.results.is_empty());
        assert_eq!(factory.sessions_opened(), 0);
    }

    #[tokio::test]
    async fn test_single_region_records() {
        let factory = FixtureDriverFactory::new().with_site(
            Region::AC,
            FixtureSite::new(vec![results_page(
                &[
                    ("Acrelândia", "69945-000 a 69949-999"),
                    ("Assis Brasil", "69935-000 a 69939-999"),
                    ("Brasiléia", "69932-000 a 69933-999"),
                ],
                false,
                false,
            )]),
        );

        let resolution = resolver(&factory).resolve(&["AC"]).await.unwrap();
        assert_eq!(resolution.results.len(), 1);
        assert_eq!(resolution.results[0].region, Region::AC);
        assert_eq!(resolution.results[0].localities.len(), 3);
        assert_eq!(
            resolution.results[0].localities[1],
            LocalityRecord::new("Assis Brasil", "69935-000 a 69939-999")
        );
    }

    #[tokio::test]
    async fn test_multi_page_region() {
        let factory = FixtureDriverFactory::new().with_site(
            Region::SP,
            FixtureSite::new(vec![
                results_page(&[("Adamantina", "1"), ("Adolfo", "2")], false, true),
                results_page(&[("Aguaí", "3")], true, false),
            ]),
        );

        let records = resolver(&factory).resolve_one("SP").await.unwrap();
        let names: Vec<&str> = records.iter().map(|r| r.locality_name.as_str()).collect();
        assert_eq!(names, ["Adamantina", "Adolfo", "Aguaí"]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 2)]
    async fn test_request_order_is_preserved() {
        // RJ finishes first, then SP, then AC
        let factory = FixtureDriverFactory::new()
            .with_site(Region::SP, site("Santos").with_delay(Duration::from_millis(150)))
            .with_site(Region::AC, site("Xapuri").with_delay(Duration::from_millis(300)))
            .with_site(Region::RJ, site("Niterói"));

        let resolution = resolver(&factory).resolve(&["SP", "AC", "RJ"]).await.unwrap();

        assert_eq!(regions(&resolution), [Region::SP, Region::AC, Region::RJ]);
        assert_eq!(resolution.results[2].localities[0].locality_name, "Niterói");
    }

    #[tokio::test]
    async fn test_fail_fast_returns_first_failure() {
        let factory = FixtureDriverFactory::new()
            .with_site(Region::AC, site("Xapuri"))
            .with_site(Region::RJ, site("Niterói").failing("connection reset"));

        match resolver(&factory).resolve(&["AC", "RJ"]).await {
            Err(Error::Automation(msg)) => assert!(msg.contains("connection reset")),
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_collect_errors_keeps_successes() {
        let factory = FixtureDriverFactory::new()
            .with_site(Region::AC, site("Xapuri"))
            .with_site(Region::RJ, site("Niterói").failing("connection reset"))
            .with_site(Region::SP, site("Santos"));

        let resolution = resolver(&factory)
            .with_policy(FailurePolicy::CollectErrors)
            .resolve(&["AC", "RJ", "SP"])
            .await
            .unwrap();

        assert_eq!(regions(&resolution), [Region::AC, Region::SP]);
        assert_eq!(resolution.failures.len(), 1);
        assert_eq!(resolution.failures[0].region, Region::RJ);
        assert!(resolution.failures[0].error.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_deadline_exceeded() {
        let factory = FixtureDriverFactory::new()
            .with_site(Region::AC, site("Xapuri").with_delay(Duration::from_millis(300)));

        let result = resolver(&factory)
            .with_deadline(Duration::from_millis(50))
            .resolve(&["AC"])
            .await;

        assert!(matches!(result, Err(Error::DeadlineExceeded)));
    }

    #[tokio::test]
    async fn test_deadline_under_collect_errors() {
        let factory = FixtureDriverFactory::new()
            .with_site(Region::AC, site("Xapuri"))
            .with_site(Region::RJ, site("Niterói").with_delay(Duration::from_millis(300)));

        let resolution = resolver(&factory)
            .with_policy(FailurePolicy::CollectErrors)
            .with_deadline(Duration::from_millis(100))
            .resolve(&["AC", "RJ"])
            .await
            .unwrap();

        assert_eq!(regions(&resolution), [Region::AC]);
        assert_eq!(resolution.failures[0].region, Region::RJ);
        assert_eq!(resolution.failures[0].error, Error::DeadlineExceeded.to_string());
    }

    #[tokio::test]
    async fn test_oversized_deadline_is_capped() {
        let factory = FixtureDriverFactory::new().with_site(Region::AC, site("Xapuri"));
        let config = ScraperConfig {
            deadline_secs: u64::MAX,
            ..config()
        };
        let resolver = RegionResolver::new(Arc::new(factory), &config);

        let resolution = resolver.resolve(&["AC"]).await.unwrap();
        assert_eq!(regions(&resolution), [Region::AC]);
    }

    #[tokio::test]
    async fn test_resolve_one_ignores_collect_policy() {
        let factory = FixtureDriverFactory::new()
            .with_site(Region::RJ, site("Niterói").failing("connection reset"));

        let result = resolver(&factory)
            .with_policy(FailurePolicy::CollectErrors)
            .resolve_one("RJ")
            .await;

        assert!(matches!(result, Err(Error::Automation(_))));
    }
}
