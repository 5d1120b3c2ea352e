//! Element Locator: semantic intent → zero-or-one concrete elements.
//!
//! Every intent is an ordered list of candidate selectors tried against the
//! live page; the first visible match wins. Absence is a normal outcome
//! returned as `None`, never an error — surface failures inside a lookup
//! are logged at debug level and mapped to `None`/`false`, isolating every
//! other component from markup fragility.

use std::time::{Duration, Instant};

use tracing::debug;

use crate::surface::{ElementRef, PageSurface};
use crate::types::{ModalStep, PrimaryAction};

/// Candidate selector strategies, ordered most-specific first.
///
/// Kept public so tests can script pages with the exact selectors the
/// locator probes for.
pub mod selectors {
    /// Login surface.
    pub const EMAIL_FIELD: &[&str] = &[
        "#username",
        "input[name='session_key']",
        "input[autocomplete='username']",
    ];
    pub const PASSWORD_FIELD: &[&str] = &[
        "#password",
        "input[name='session_password']",
        "input[autocomplete='current-password']",
    ];
    pub const SIGN_IN_BUTTON: &[&str] = &[
        "button[type='submit'][aria-label='Sign in']",
        ".login__form_action_container button",
        "button[type='submit']",
    ];
    /// Post-login landing indicator: the global nav only renders for an
    /// authenticated session.
    pub const LANDING_INDICATOR: &[&str] = &[
        "#global-nav",
        ".global-nav__me",
        "input.search-global-typeahead__input",
    ];

    /// Results feed.
    pub const JOB_CARDS: &[&str] = &[
        "li[data-occludable-job-id]",
        "li.jobs-search-results__list-item",
        "div.job-card-container",
    ];
    pub const CARD_TITLE: &[&str] = &[
        "a.job-card-list__title",
        ".job-card-container__link strong",
        "a.job-card-container__link",
    ];
    pub const CARD_COMPANY: &[&str] = &[
        ".job-card-container__primary-description",
        ".job-card-container__company-name",
        ".artdeco-entity-lockup__subtitle",
    ];
    pub const CARD_LINK: &[&str] = &["a.job-card-list__title", "a.job-card-container__link", "a"];
    /// Footer badge the feed renders on jobs the account already applied to.
    pub const CARD_APPLIED_BADGE: &[&str] = &[
        "li.job-card-container__footer-job-state",
        ".job-card-container__applied-date",
    ];
    /// Attributes that carry the platform job id on a card.
    pub const CARD_ID_ATTRS: &[&str] = &["data-occludable-job-id", "data-job-id"];

    /// Apply modal controls.
    pub const EASY_APPLY_BUTTON: &[&str] = &[
        "button.jobs-apply-button",
        ".jobs-apply-button--top-card button",
        "button[data-live-test-job-apply-button]",
    ];
    pub const NEXT_BUTTON: &[&str] = &[
        "button[aria-label='Continue to next step']",
        "button[data-easy-apply-next-button]",
        ".jobs-easy-apply-modal footer button.artdeco-button--primary",
    ];
    pub const REVIEW_BUTTON: &[&str] = &[
        "button[aria-label='Review your application']",
        "button[data-live-test-easy-apply-review-button]",
    ];
    pub const SUBMIT_BUTTON: &[&str] = &[
        "button[aria-label='Submit application']",
        "button[data-live-test-easy-apply-submit-button]",
    ];
    /// Confirmation UI is the least consistent surface across listings, so
    /// this family is deliberately wide.
    pub const DONE_BUTTON: &[&str] = &[
        "button[aria-label='Done']",
        "button[aria-label='Dismiss']",
        ".artdeco-modal__dismiss",
        ".artdeco-modal__actionbar button.artdeco-button--primary",
    ];

    /// Detector predicates for an additional-questions section. An OR, not
    /// exhaustive classification: missing a question section is more harmful
    /// than an over-cautious step.
    pub const QUESTIONS_SECTION: &[&str] = &[
        ".jobs-easy-apply-form-section__grouping",
        "div[data-test-form-element]",
        ".fb-dash-form-element",
        ".jobs-easy-apply-modal fieldset",
    ];
    /// Required form controls carrying a non-empty server-rendered value.
    pub const PREFILLED_FIELDS: &[&str] = &[
        "input[required][value]:not([value=''])",
        ".jobs-easy-apply-modal input[data-test-text-entity-list-form-select][value]:not([value=''])",
        "select[required] option[selected]:not([value=''])",
    ];
    /// Required form controls with no value to submit.
    pub const EMPTY_REQUIRED_FIELDS: &[&str] = &[
        "input[required]:not([value])",
        "input[required][value='']",
        "textarea[required]:placeholder-shown",
        "select[required] option[selected][value='']",
    ];
}

/// Finds semantic UI elements behind ordered fallback strategies.
pub struct ElementLocator {
    surface: std::sync::Arc<dyn PageSurface>,
}

impl ElementLocator {
    pub fn new(surface: std::sync::Arc<dyn PageSurface>) -> Self {
        Self { surface }
    }

    /// First visible match across the candidate list, in priority order.
    pub async fn first_visible<S: AsRef<str>>(&self, candidates: &[S]) -> Option<ElementRef> {
        for selector in candidates {
            let selector = selector.as_ref();
            match self.surface.find_visible(selector).await {
                Ok(Some(el)) => return Some(el),
                Ok(None) => {}
                Err(e) => debug!(selector, error = %e, "lookup failed, treating as absent"),
            }
        }
        None
    }

    /// Bounded poll for an intent that may still be rendering.
    pub async fn wait_first_visible<S: AsRef<str>>(
        &self,
        candidates: &[S],
        timeout: Duration,
        poll: Duration,
    ) -> Option<ElementRef> {
        let deadline = Instant::now() + timeout;
        loop {
            if let Some(el) = self.first_visible(candidates).await {
                return Some(el);
            }
            if Instant::now() >= deadline {
                return None;
            }
            tokio::time::sleep(poll).await;
        }
    }

    /// True when any detector predicate matches a visible element.
    async fn any_visible(&self, predicates: &[&str]) -> bool {
        for selector in predicates {
            match self.surface.count(selector).await {
                Ok(n) if n > 0 => return true,
                Ok(_) => {}
                Err(e) => debug!(selector, error = %e, "predicate failed, treating as no match"),
            }
        }
        false
    }

    pub async fn email_field(&self) -> Option<ElementRef> {
        self.first_visible(selectors::EMAIL_FIELD).await
    }

    pub async fn password_field(&self) -> Option<ElementRef> {
        self.first_visible(selectors::PASSWORD_FIELD).await
    }

    pub async fn sign_in_button(&self) -> Option<ElementRef> {
        self.first_visible(selectors::SIGN_IN_BUTTON).await
    }

    pub async fn landing_indicator(&self) -> Option<ElementRef> {
        self.first_visible(selectors::LANDING_INDICATOR).await
    }

    /// All currently rendered result cards, first non-empty strategy wins.
    pub async fn job_cards(&self) -> Vec<ElementRef> {
        for selector in selectors::JOB_CARDS {
            match self.surface.find_all_visible(selector).await {
                Ok(cards) if !cards.is_empty() => return cards,
                Ok(_) => {}
                Err(e) => debug!(selector, error = %e, "card query failed"),
            }
        }
        Vec::new()
    }

    /// The rendered card for a specific platform job id.
    pub async fn job_card_by_id(&self, job_id: &str) -> Option<ElementRef> {
        let candidates = [
            format!("li[data-occludable-job-id='{job_id}']"),
            format!("div[data-job-id='{job_id}']"),
            format!("li[data-job-id='{job_id}']"),
        ];
        self.first_visible(&candidates).await
    }

    /// First visible descendant of `parent` across the candidate list.
    pub async fn find_in_first(
        &self,
        parent: &ElementRef,
        candidates: &[&str],
    ) -> Option<ElementRef> {
        for selector in candidates {
            match self.surface.find_in(parent, selector).await {
                Ok(Some(el)) => return Some(el),
                Ok(None) => {}
                Err(e) => debug!(selector, error = %e, "scoped lookup failed"),
            }
        }
        None
    }

    pub async fn easy_apply_button(&self) -> Option<ElementRef> {
        self.first_visible(selectors::EASY_APPLY_BUTTON).await
    }

    pub async fn done_button(&self) -> Option<ElementRef> {
        self.first_visible(selectors::DONE_BUTTON).await
    }

    /// The primary action available right now.
    ///
    /// Fixed fallback order: Submit, then Review, then Next. Review is
    /// preferred over Next because it signals the flow is closer to
    /// completion when both could apply.
    pub async fn primary_action(&self) -> Option<(PrimaryAction, ElementRef)> {
        if let Some(el) = self.first_visible(selectors::SUBMIT_BUTTON).await {
            return Some((PrimaryAction::Submit, el));
        }
        if let Some(el) = self.first_visible(selectors::REVIEW_BUTTON).await {
            return Some((PrimaryAction::Review, el));
        }
        if let Some(el) = self.first_visible(selectors::NEXT_BUTTON).await {
            return Some((PrimaryAction::Next, el));
        }
        None
    }

    pub async fn has_additional_questions(&self) -> bool {
        self.any_visible(selectors::QUESTIONS_SECTION).await
    }

    pub async fn questions_prepopulated(&self) -> bool {
        self.any_visible(selectors::PREFILLED_FIELDS).await
    }

    pub async fn has_empty_required_fields(&self) -> bool {
        self.any_visible(selectors::EMPTY_REQUIRED_FIELDS).await
    }

    /// Recompute the modal control set from the live page. Never cached:
    /// the snapshot is only valid for the tick that took it.
    pub async fn modal_step(&self) -> ModalStep {
        ModalStep {
            primary: self.primary_action().await,
            has_questions: self.has_additional_questions().await,
            questions_prefilled: self.questions_prepopulated().await,
            empty_required: self.has_empty_required_fields().await,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::testing::{Frame, ScriptedElement, ScriptedSurface};

    fn locator_for(surface: ScriptedSurface) -> ElementLocator {
        ElementLocator::new(Arc::new(surface))
    }

    #[tokio::test]
    async fn absent_intent_returns_none() {
        let surface = ScriptedSurface::new(vec![Frame::new()]);
        let locator = locator_for(surface);
        assert!(locator.easy_apply_button().await.is_none());
        assert!(locator.primary_action().await.is_none());
        assert!(!locator.has_additional_questions().await);
    }

    #[tokio::test]
    async fn review_is_preferred_over_next() {
        let frame = Frame::new()
            .element(ScriptedElement::new("next", &[selectors::NEXT_BUTTON[0]]))
            .element(ScriptedElement::new(
                "review",
                &[selectors::REVIEW_BUTTON[0]],
            ));
        let locator = locator_for(ScriptedSurface::new(vec![frame]));

        let (action, _) = locator.primary_action().await.expect("primary action");
        assert_eq!(action, PrimaryAction::Review);
    }

    #[tokio::test]
    async fn submit_is_preferred_over_review_and_next() {
        let frame = Frame::new()
            .element(ScriptedElement::new("next", &[selectors::NEXT_BUTTON[0]]))
            .element(ScriptedElement::new(
                "review",
                &[selectors::REVIEW_BUTTON[0]],
            ))
            .element(ScriptedElement::new(
                "submit",
                &[selectors::SUBMIT_BUTTON[0]],
            ));
        let locator = locator_for(ScriptedSurface::new(vec![frame]));

        let (action, _) = locator.primary_action().await.expect("primary action");
        assert_eq!(action, PrimaryAction::Submit);
    }

    #[tokio::test]
    async fn fallback_selector_matches_when_primary_absent() {
        // Only the second-priority email selector renders.
        let frame = Frame::new().element(ScriptedElement::new(
            "email",
            &[selectors::EMAIL_FIELD[1]],
        ));
        let locator = locator_for(ScriptedSurface::new(vec![frame]));
        assert!(locator.email_field().await.is_some());
    }

    #[tokio::test]
    async fn transport_failures_read_as_absence() {
        let locator = ElementLocator::new(Arc::new(DownSurface));

        assert!(locator.easy_apply_button().await.is_none());
        assert!(locator.job_cards().await.is_empty());
        assert!(!locator.has_additional_questions().await);

        let step = locator.modal_step().await;
        assert!(step.primary.is_none());
        assert!(!step.blocks_on_input());
    }

    /// Surface whose every query fails, as after a dropped browser.
    struct DownSurface;

    #[async_trait::async_trait]
    impl crate::surface::PageSurface for DownSurface {
        async fn goto(&self, _url: &str) -> Result<(), crate::error::SurfaceError> {
            Err(down())
        }
        async fn find_visible(
            &self,
            _selector: &str,
        ) -> Result<Option<ElementRef>, crate::error::SurfaceError> {
            Err(down())
        }
        async fn find_all_visible(
            &self,
            _selector: &str,
        ) -> Result<Vec<ElementRef>, crate::error::SurfaceError> {
            Err(down())
        }
        async fn find_in(
            &self,
            _parent: &ElementRef,
            _selector: &str,
        ) -> Result<Option<ElementRef>, crate::error::SurfaceError> {
            Err(down())
        }
        async fn count(&self, _selector: &str) -> Result<usize, crate::error::SurfaceError> {
            Err(down())
        }
        async fn text(&self, _el: &ElementRef) -> Result<String, crate::error::SurfaceError> {
            Err(down())
        }
        async fn attr(
            &self,
            _el: &ElementRef,
            _name: &str,
        ) -> Result<Option<String>, crate::error::SurfaceError> {
            Err(down())
        }
        async fn click(&self, _el: &ElementRef) -> Result<(), crate::error::SurfaceError> {
            Err(down())
        }
        async fn type_text(
            &self,
            _el: &ElementRef,
            _text: &str,
        ) -> Result<(), crate::error::SurfaceError> {
            Err(down())
        }
        async fn scroll_into_view(
            &self,
            _el: &ElementRef,
        ) -> Result<(), crate::error::SurfaceError> {
            Err(down())
        }
    }

    fn down() -> crate::error::SurfaceError {
        crate::error::SurfaceError::Transport("connection closed".into())
    }

    #[tokio::test]
    async fn capability_queries_or_independent_predicates() {
        let frame = Frame::new()
            .element(ScriptedElement::new(
                "questions",
                &[selectors::QUESTIONS_SECTION[2]],
            ))
            .element(ScriptedElement::new(
                "empty-field",
                &[selectors::EMPTY_REQUIRED_FIELDS[1]],
            ));
        let locator = locator_for(ScriptedSurface::new(vec![frame]));

        assert!(locator.has_additional_questions().await);
        assert!(locator.has_empty_required_fields().await);
        assert!(!locator.questions_prepopulated().await);

        let step = locator.modal_step().await;
        assert!(step.blocks_on_input());
    }
}
