//! Listing Collector: authenticated search → deduplicated job records.
//!
//! The results feed exposes no page tokens; the only pagination primitive is
//! scroll-triggered loading. Progress is therefore inferred from card-count
//! deltas, with two independent termination conditions:
//!
//! - a pass over the rendered cards produced zero new records (all visible
//!   cards already seen), or
//! - the card count did not grow after a scroll trigger (no more content
//!   loads).
//!
//! A hard iteration cap guards against a feed that keeps "loading" without
//! ever settling.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use thiserror::Error;
use tracing::{debug, info, warn};
use url::Url;

use crate::error::{AutopilotError, SurfaceError};
use crate::locator::{selectors, ElementLocator};
use crate::surface::{ElementRef, PageSurface};
use crate::types::{Credentials, JobRecord, SearchQuery};

const LOGIN_URL: &str = "https://www.linkedin.com/login";
const SEARCH_URL: &str = "https://www.linkedin.com/jobs/search/";
const BASE_URL: &str = "https://www.linkedin.com/";

/// Tunables for one collection run. Every wait is bounded.
#[derive(Debug, Clone)]
pub struct CollectorConfig {
    /// Deadline for the post-login landing indicator.
    pub login_timeout: Duration,
    /// Deadline for the first batch of result cards.
    pub first_results_timeout: Duration,
    /// Interval between element-presence polls.
    pub poll_interval: Duration,
    /// Base pause after a scroll trigger, letting async loading complete.
    pub scroll_settle: Duration,
    /// Upper bound of the random extra pause added to each settle.
    pub scroll_jitter_ms: u64,
    /// Safety net against a misbehaving feed.
    pub max_scroll_iterations: usize,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            login_timeout: Duration::from_secs(30),
            first_results_timeout: Duration::from_secs(20),
            poll_interval: Duration::from_millis(500),
            scroll_settle: Duration::from_millis(1500),
            scroll_jitter_ms: 700,
            max_scroll_iterations: 25,
        }
    }
}

/// Why one card could not be turned into a record. Skipping a card never
/// aborts the run.
#[derive(Debug, Error)]
enum CardError {
    #[error("card missing {0}")]
    Missing(&'static str),
    #[error(transparent)]
    Surface(#[from] SurfaceError),
}

/// Harvests job records from the quick-apply-filtered search feed.
pub struct ListingCollector {
    surface: Arc<dyn PageSurface>,
    locator: ElementLocator,
    config: CollectorConfig,
}

impl ListingCollector {
    pub fn new(surface: Arc<dyn PageSurface>) -> Self {
        Self::with_config(surface, CollectorConfig::default())
    }

    pub fn with_config(surface: Arc<dyn PageSurface>, config: CollectorConfig) -> Self {
        let locator = ElementLocator::new(surface.clone());
        Self {
            surface,
            locator,
            config,
        }
    }

    /// Authenticate, run the search, and harvest the full result set in
    /// discovery order. Emits each platform job id at most once.
    pub async fn collect(
        &self,
        query: &SearchQuery,
        credentials: &Credentials,
    ) -> Result<Vec<JobRecord>, AutopilotError> {
        self.login(credentials).await?;
        self.open_search(query).await?;
        self.await_first_results().await?;
        Ok(self.harvest().await)
    }

    async fn login(&self, credentials: &Credentials) -> Result<(), AutopilotError> {
        info!("opening login surface");
        self.surface.goto(LOGIN_URL).await?;

        let email = self
            .locator
            .wait_first_visible(
                selectors::EMAIL_FIELD,
                self.config.login_timeout,
                self.config.poll_interval,
            )
            .await
            .ok_or(AutopilotError::AuthenticationFailed(
                self.config.login_timeout,
            ))?;
        self.surface.type_text(&email, &credentials.email).await?;

        let password = self
            .locator
            .password_field()
            .await
            .ok_or(AutopilotError::AuthenticationFailed(
                self.config.login_timeout,
            ))?;
        self.surface
            .type_text(&password, &credentials.password)
            .await?;

        let sign_in = self
            .locator
            .sign_in_button()
            .await
            .ok_or(AutopilotError::AuthenticationFailed(
                self.config.login_timeout,
            ))?;
        self.surface.click(&sign_in).await?;

        // The run is only valid with a session; wait for the landing
        // indicator rather than trusting the navigation alone.
        let landed = self
            .locator
            .wait_first_visible(
                selectors::LANDING_INDICATOR,
                self.config.login_timeout,
                self.config.poll_interval,
            )
            .await;
        if landed.is_none() {
            return Err(AutopilotError::AuthenticationFailed(
                self.config.login_timeout,
            ));
        }
        info!("authenticated session established");
        Ok(())
    }

    async fn open_search(&self, query: &SearchQuery) -> Result<(), AutopilotError> {
        // f_AL restricts the feed to quick-apply listings.
        let qs = url::form_urlencoded::Serializer::new(String::new())
            .append_pair("keywords", &query.title)
            .append_pair("location", &query.location)
            .append_pair("f_AL", "true")
            .finish();
        let url = format!("{SEARCH_URL}?{qs}");
        info!(title = %query.title, location = %query.location, "opening search results");
        self.surface.goto(&url).await?;
        Ok(())
    }

    async fn await_first_results(&self) -> Result<(), AutopilotError> {
        let deadline = Instant::now() + self.config.first_results_timeout;
        loop {
            if !self.locator.job_cards().await.is_empty() {
                return Ok(());
            }
            if Instant::now() >= deadline {
                return Err(AutopilotError::NoResultsFound(
                    self.config.first_results_timeout,
                ));
            }
            tokio::time::sleep(self.config.poll_interval).await;
        }
    }

    /// The scroll-pagination loop. Cards are re-queried every pass; nothing
    /// rendered is trusted across iterations.
    async fn harvest(&self) -> Vec<JobRecord> {
        let mut seen: HashSet<String> = HashSet::new();
        let mut records: Vec<JobRecord> = Vec::new();

        for iteration in 1..=self.config.max_scroll_iterations {
            let cards = self.locator.job_cards().await;
            let mut fresh = 0usize;

            for card in &cards {
                match self.extract_record(card).await {
                    Ok(record) => {
                        if seen.insert(record.job_id.clone()) {
                            debug!(job_id = %record.job_id, title = %record.title, "discovered listing");
                            records.push(record);
                            fresh += 1;
                        }
                    }
                    Err(e) => warn!(error = %e, "skipping unreadable card"),
                }
            }

            debug!(
                iteration,
                rendered = cards.len(),
                fresh,
                total = records.len(),
                "harvest pass"
            );

            if fresh == 0 {
                debug!("no new records this pass, feed exhausted");
                break;
            }
            if iteration == self.config.max_scroll_iterations {
                warn!(
                    iterations = iteration,
                    "scroll iteration cap reached, stopping harvest"
                );
                break;
            }

            let before = cards.len();
            if let Some(last) = cards.last() {
                if let Err(e) = self.surface.scroll_into_view(last).await {
                    warn!(error = %e, "scroll trigger failed, stopping harvest");
                    break;
                }
            }
            tokio::time::sleep(self.settle_pause()).await;

            let after = self.locator.job_cards().await.len();
            if after <= before {
                debug!(before, after, "card count did not grow, no more content");
                break;
            }
        }

        info!(total = records.len(), "collection finished");
        records
    }

    fn settle_pause(&self) -> Duration {
        let jitter = if self.config.scroll_jitter_ms > 0 {
            rand::thread_rng().gen_range(0..=self.config.scroll_jitter_ms)
        } else {
            0
        };
        self.config.scroll_settle + Duration::from_millis(jitter)
    }

    async fn extract_record(&self, card: &ElementRef) -> Result<JobRecord, CardError> {
        let mut job_id = None;
        for attr in selectors::CARD_ID_ATTRS {
            if let Some(value) = self.surface.attr(card, attr).await? {
                if !value.is_empty() {
                    job_id = Some(value);
                    break;
                }
            }
        }
        let job_id = job_id.ok_or(CardError::Missing("job id"))?;

        let title_el = self
            .locator
            .find_in_first(card, selectors::CARD_TITLE)
            .await
            .ok_or(CardError::Missing("title"))?;
        let title = self.surface.text(&title_el).await?;

        let company = match self
            .locator
            .find_in_first(card, selectors::CARD_COMPANY)
            .await
        {
            Some(el) => self.surface.text(&el).await?,
            None => String::new(),
        };

        let link = self
            .locator
            .find_in_first(card, selectors::CARD_LINK)
            .await
            .ok_or(CardError::Missing("link"))?;
        let href = self
            .surface
            .attr(&link, "href")
            .await?
            .ok_or(CardError::Missing("link href"))?;

        let already_applied_hint = self
            .locator
            .find_in_first(card, selectors::CARD_APPLIED_BADGE)
            .await
            .is_some();

        Ok(JobRecord {
            job_id,
            title,
            company,
            url: absolutize(&href),
            already_applied_hint,
        })
    }
}

/// Resolve a card href against the site origin when it is relative.
fn absolutize(href: &str) -> String {
    if let Ok(url) = Url::parse(href) {
        return url.into();
    }
    Url::parse(BASE_URL)
        .ok()
        .and_then(|base| base.join(href).ok())
        .map(Into::into)
        .unwrap_or_else(|| href.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{Frame, ScriptedElement, ScriptedSurface};

    fn fast_config(max_scroll_iterations: usize) -> CollectorConfig {
        CollectorConfig {
            login_timeout: Duration::from_millis(50),
            first_results_timeout: Duration::from_millis(50),
            poll_interval: Duration::from_millis(1),
            scroll_settle: Duration::from_millis(1),
            scroll_jitter_ms: 0,
            max_scroll_iterations,
        }
    }

    fn query() -> SearchQuery {
        SearchQuery {
            title: "Engineer".into(),
            location: "Remote".into(),
        }
    }

    fn credentials() -> Credentials {
        Credentials {
            email: "user@example.org".into(),
            password: "pw".into(),
        }
    }

    /// Login page frame: email, password, and a sign-in button whose click
    /// advances to the next frame.
    fn login_frame() -> Frame {
        Frame::new()
            .element(ScriptedElement::new("email", &[selectors::EMAIL_FIELD[0]]))
            .element(ScriptedElement::new(
                "password",
                &[selectors::PASSWORD_FIELD[0]],
            ))
            .element(
                ScriptedElement::new("sign-in", &[selectors::SIGN_IN_BUTTON[0]])
                    .advance_on_click(),
            )
    }

    /// Landed frame: the global nav renders. Navigating to the search URL
    /// advances past it.
    fn landing_frame() -> Frame {
        Frame::new().element(ScriptedElement::new(
            "nav",
            &[selectors::LANDING_INDICATOR[0]],
        ))
    }

    fn card(id: &str, advance_on_scroll: bool) -> Vec<ScriptedElement> {
        let name = format!("card-{id}");
        let mut card = ScriptedElement::new(&name, &[selectors::JOB_CARDS[0]])
            .attr("data-occludable-job-id", id);
        if advance_on_scroll {
            card = card.advance_on_scroll();
        }
        vec![
            card,
            ScriptedElement::new(&format!("title-{id}"), &[selectors::CARD_TITLE[0]])
                .child_of(&name)
                .text(&format!("Role {id}"))
                .attr("href", &format!("/jobs/view/{id}/")),
            ScriptedElement::new(&format!("company-{id}"), &[selectors::CARD_COMPANY[0]])
                .child_of(&name)
                .text("Acme"),
        ]
    }

    /// Frame rendering the given card ids; scrolling the last card into
    /// view advances to the next frame.
    fn results_frame(ids: &[&str]) -> Frame {
        let mut frame = Frame::new();
        for (i, id) in ids.iter().enumerate() {
            let is_last = i + 1 == ids.len();
            for element in card(id, is_last) {
                frame = frame.element(element);
            }
        }
        frame
    }

    fn scripted(results: Vec<Frame>) -> ScriptedSurface {
        let mut frames = vec![Frame::new(), login_frame(), landing_frame()];
        frames.extend(results);
        ScriptedSurface::new(frames).advance_on_goto()
    }

    #[tokio::test]
    async fn collects_across_scroll_pages_and_counts_triggers() {
        // 3 cards on first render, 5 after one scroll (2 new), then 5 again.
        let surface = Arc::new(scripted(vec![
            results_frame(&["1", "2", "3"]),
            results_frame(&["1", "2", "3", "4", "5"]),
            results_frame(&["1", "2", "3", "4", "5"]),
        ]));
        let collector =
            ListingCollector::with_config(surface.clone(), fast_config(25));

        let records = collector.collect(&query(), &credentials()).await.unwrap();

        let ids: Vec<&str> = records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2", "3", "4", "5"]);
        assert_eq!(surface.scroll_count(), 2);
        assert_eq!(records[0].title, "Role 1");
        assert_eq!(records[0].url, "https://www.linkedin.com/jobs/view/1/");
    }

    #[tokio::test]
    async fn dedups_repeated_ids_across_iterations() {
        // The second page re-renders ids 2 and 3 ahead of the new ones.
        let surface = Arc::new(scripted(vec![
            results_frame(&["1", "2", "3"]),
            results_frame(&["2", "3", "1", "4", "2"]),
            results_frame(&["2", "3", "1", "4", "2"]),
        ]));
        let collector =
            ListingCollector::with_config(surface.clone(), fast_config(25));

        let records = collector.collect(&query(), &credentials()).await.unwrap();

        let mut ids: Vec<&str> = records.iter().map(|r| r.job_id.as_str()).collect();
        assert_eq!(ids.len(), 4, "each id emitted at most once");
        ids.sort();
        assert_eq!(ids, vec!["1", "2", "3", "4"]);
    }

    #[tokio::test]
    async fn terminates_at_iteration_cap_when_feed_never_settles() {
        // Every scroll keeps producing brand-new cards.
        let frames: Vec<Frame> = (0..20)
            .map(|i| {
                let ids: Vec<String> = (0..=i).map(|n| format!("job-{n}")).collect();
                let refs: Vec<&str> = ids.iter().map(String::as_str).collect();
                results_frame(&refs)
            })
            .collect();
        let surface = Arc::new(scripted(frames));
        let collector = ListingCollector::with_config(surface.clone(), fast_config(3));

        let records = collector.collect(&query(), &credentials()).await.unwrap();

        assert_eq!(surface.scroll_count(), 2, "cap stops further scroll triggers");
        assert!(records.len() <= 3);
    }

    #[tokio::test]
    async fn unreadable_cards_are_skipped_not_fatal() {
        // One card with no id attribute at all.
        let broken = ScriptedElement::new("card-broken", &[selectors::JOB_CARDS[0]]);
        let mut frame = results_frame(&["1"]);
        frame = frame.element(broken);
        let surface = Arc::new(scripted(vec![frame]));
        let collector = ListingCollector::with_config(surface, fast_config(25));

        let records = collector.collect(&query(), &credentials()).await.unwrap();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].job_id, "1");
    }

    #[tokio::test]
    async fn empty_feed_reports_no_results() {
        let surface = Arc::new(scripted(vec![Frame::new()]));
        let collector = ListingCollector::with_config(surface, fast_config(25));

        let err = collector
            .collect(&query(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, AutopilotError::NoResultsFound(_)));
    }

    #[tokio::test]
    async fn missing_landing_indicator_is_an_authentication_failure() {
        // Sign-in click lands on a frame with no nav indicator.
        let frames = vec![Frame::new(), login_frame(), Frame::new()];
        let surface = Arc::new(ScriptedSurface::new(frames).advance_on_goto());
        let collector = ListingCollector::with_config(surface, fast_config(25));

        let err = collector
            .collect(&query(), &credentials())
            .await
            .unwrap_err();
        assert!(matches!(err, AutopilotError::AuthenticationFailed(_)));
    }

    #[tokio::test]
    async fn types_credentials_into_the_login_form() {
        let surface = Arc::new(scripted(vec![results_frame(&["1"])]));
        let collector = ListingCollector::with_config(surface.clone(), fast_config(25));

        collector.collect(&query(), &credentials()).await.unwrap();

        let typed = surface.typed();
        assert_eq!(typed[0], ("email".to_string(), "user@example.org".to_string()));
        assert_eq!(typed[1], ("password".to_string(), "pw".to_string()));
        assert!(surface.visits()[1].contains("f_AL=true"));
        assert!(surface.visits()[1].contains("keywords=Engineer"));
    }
}
