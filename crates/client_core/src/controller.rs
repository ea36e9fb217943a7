use std::{
    fmt,
    sync::{Arc, Mutex, MutexGuard, PoisonError},
};

use futures::future::{AbortHandle, Abortable};
use shared::{
    domain::PageInfo,
    error::ReportError,
    protocol::{BaseQuery, QueryVariables, METRIC_REPORT_QUERY},
};
use thiserror::Error;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

use crate::{
    credentials::AccessToken, transform::transform, view_model::ReportViewModel, QueryExecutor,
};

pub const DEFAULT_PAGE_SIZE: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ControllerOptions {
    pub page_size: u32,
}

impl Default for ControllerOptions {
    fn default() -> Self {
        Self {
            page_size: DEFAULT_PAGE_SIZE,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchStatus {
    Idle,
    Fetching,
    Ready,
    Failed(ReportError),
}

impl FetchStatus {
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::Fetching)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Navigation {
    Initial,
    Forward,
    Backward,
}

impl fmt::Display for Navigation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Initial => "initial",
            Self::Forward => "forward",
            Self::Backward => "backward",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NavigationRejected {
    #[error("a fetch is already in flight")]
    Busy,
    #[error("initial load already completed")]
    NotIdle,
    #[error("no next page available")]
    NoNextPage,
    #[error("no previous page available")]
    NoPreviousPage,
    #[error("page info reports a {0} page but carries no cursor")]
    MissingCursor(Navigation),
    #[error("no failed navigation to retry")]
    NothingToRetry,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ControllerError {
    #[error("navigation rejected: {0}")]
    Rejected(#[from] NavigationRejected),
    #[error(transparent)]
    Fetch(#[from] ReportError),
    #[error("fetch cancelled before completion")]
    Cancelled,
}

#[derive(Debug, Clone)]
pub enum ReportEvent {
    StatusChanged(FetchStatus),
    ViewModelUpdated(ReportViewModel),
    FetchFailed {
        navigation: Navigation,
        error: ReportError,
    },
    FetchDiscarded {
        navigation: Navigation,
    },
}

struct InFlight {
    generation: u64,
    navigation: Navigation,
    abort: AbortHandle,
    previous_status: FetchStatus,
}

struct LastRequest {
    navigation: Navigation,
    base: BaseQuery,
}

struct ControllerState {
    status: FetchStatus,
    page_info: Option<PageInfo>,
    view_model: Option<ReportViewModel>,
    generation: u64,
    in_flight: Option<InFlight>,
    last_request: Option<LastRequest>,
}

/// Owns cursor state and mediates every report fetch.
///
/// At most one fetch is outstanding: navigation while `Fetching` is rejected
/// without touching state. A failed fetch keeps the last good page and
/// cursors. A fetch cancelled through [`PaginationController::cancel`], or
/// whose navigation future is dropped, never applies its result.
pub struct PaginationController {
    executor: Arc<dyn QueryExecutor>,
    token: AccessToken,
    page_size: u32,
    state: Mutex<ControllerState>,
    events: broadcast::Sender<ReportEvent>,
}

impl PaginationController {
    pub fn new(executor: Arc<dyn QueryExecutor>, token: AccessToken) -> Arc<Self> {
        Self::with_options(executor, token, ControllerOptions::default())
    }

    pub fn with_options(
        executor: Arc<dyn QueryExecutor>,
        token: AccessToken,
        options: ControllerOptions,
    ) -> Arc<Self> {
        let (events, _) = broadcast::channel(64);
        Arc::new(Self {
            executor,
            token,
            page_size: options.page_size.max(1),
            state: Mutex::new(ControllerState {
                status: FetchStatus::Idle,
                page_info: None,
                view_model: None,
                generation: 0,
                in_flight: None,
                last_request: None,
            }),
            events,
        })
    }

    pub fn page_size(&self) -> u32 {
        self.page_size
    }

    // Never held across an await, so `FetchGuard` can take it from `drop`.
    fn lock_state(&self) -> MutexGuard<'_, ControllerState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ReportEvent> {
        self.events.subscribe()
    }

    pub async fn status(&self) -> FetchStatus {
        self.lock_state().status.clone()
    }

    pub async fn view_model(&self) -> Option<ReportViewModel> {
        self.lock_state().view_model.clone()
    }

    pub async fn page_info(&self) -> Option<PageInfo> {
        self.lock_state().page_info.clone()
    }

    pub async fn last_error(&self) -> Option<ReportError> {
        match &self.lock_state().status {
            FetchStatus::Failed(err) => Some(err.clone()),
            _ => None,
        }
    }

    pub async fn load_initial(&self, base: &BaseQuery) -> Result<(), ControllerError> {
        self.navigate(Navigation::Initial, base).await
    }

    pub async fn page_forward(&self, base: &BaseQuery) -> Result<(), ControllerError> {
        self.navigate(Navigation::Forward, base).await
    }

    pub async fn page_backward(&self, base: &BaseQuery) -> Result<(), ControllerError> {
        self.navigate(Navigation::Backward, base).await
    }

    /// Re-issues the navigation that last failed, with its original base query.
    pub async fn retry(&self) -> Result<(), ControllerError> {
        let (navigation, base) = {
            let state = self.lock_state();
            match (&state.status, &state.last_request) {
                (FetchStatus::Failed(_), Some(last)) => (last.navigation, last.base.clone()),
                (FetchStatus::Fetching, _) => return Err(NavigationRejected::Busy.into()),
                _ => return Err(NavigationRejected::NothingToRetry.into()),
            }
        };
        info!("report: retrying navigation={navigation}");
        self.navigate(navigation, &base).await
    }

    /// Abandons the in-flight fetch, if any. Status returns to what it was
    /// before that fetch started. Returns whether a fetch was cancelled.
    pub async fn cancel(&self) -> bool {
        let mut state = self.lock_state();
        let Some(in_flight) = state.in_flight.take() else {
            return false;
        };
        in_flight.abort.abort();
        state.status = in_flight.previous_status;
        info!(
            "report: cancelled fetch navigation={} generation={}",
            in_flight.navigation, in_flight.generation
        );
        let _ = self
            .events
            .send(ReportEvent::StatusChanged(state.status.clone()));
        true
    }

    async fn navigate(
        &self,
        navigation: Navigation,
        base: &BaseQuery,
    ) -> Result<(), ControllerError> {
        let (variables, generation, registration) = {
            let mut state = self.lock_state();
            let variables = match self.plan(&state, navigation, base) {
                Ok(variables) => variables,
                Err(reason) => {
                    warn!("report: navigation={navigation} rejected: {reason}");
                    return Err(reason.into());
                }
            };

            state.generation += 1;
            let generation = state.generation;
            let (abort, registration) = AbortHandle::new_pair();
            let previous_status = std::mem::replace(&mut state.status, FetchStatus::Fetching);
            state.in_flight = Some(InFlight {
                generation,
                navigation,
                abort,
                previous_status,
            });
            state.last_request = Some(LastRequest {
                navigation,
                base: base.clone(),
            });
            let _ = self
                .events
                .send(ReportEvent::StatusChanged(FetchStatus::Fetching));
            (variables, generation, registration)
        };

        // Declared before the second `lock_state`, so that lock is released first.
        let _guard = FetchGuard {
            controller: self,
            generation,
        };

        debug!(
            navigation = %navigation,
            generation,
            first = ?variables.first(),
            after = ?variables.after(),
            last = ?variables.last(),
            before = ?variables.before(),
            "report: fetching page"
        );

        let outcome = Abortable::new(
            self.executor
                .execute(METRIC_REPORT_QUERY, &variables, &self.token),
            registration,
        )
        .await;

        let mut state = self.lock_state();
        let owns_fetch = state
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == generation);
        if !owns_fetch {
            info!(
                "report: discarding cancelled fetch navigation={navigation} generation={generation}"
            );
            let _ = self.events.send(ReportEvent::FetchDiscarded { navigation });
            return Err(ControllerError::Cancelled);
        }
        state.in_flight = None;

        let result = match outcome {
            Ok(result) => result.and_then(transform),
            // Only `cancel` aborts, and it clears `in_flight` first.
            Err(_aborted) => return Err(ControllerError::Cancelled),
        };

        match result {
            Ok(view_model) => {
                debug!(
                    navigation = %navigation,
                    rows = view_model.rows.len(),
                    has_next = view_model.has_next_page(),
                    has_previous = view_model.has_previous_page(),
                    "report: page applied"
                );
                state.page_info = Some(view_model.page_info.clone());
                state.view_model = Some(view_model.clone());
                state.status = FetchStatus::Ready;
                let _ = self
                    .events
                    .send(ReportEvent::StatusChanged(FetchStatus::Ready));
                let _ = self.events.send(ReportEvent::ViewModelUpdated(view_model));
                Ok(())
            }
            Err(error) => {
                warn!("report: fetch failed navigation={navigation}: {error}");
                state.status = FetchStatus::Failed(error.clone());
                let _ = self
                    .events
                    .send(ReportEvent::StatusChanged(state.status.clone()));
                let _ = self.events.send(ReportEvent::FetchFailed {
                    navigation,
                    error: error.clone(),
                });
                Err(error.into())
            }
        }
    }

    fn plan(
        &self,
        state: &ControllerState,
        navigation: Navigation,
        base: &BaseQuery,
    ) -> Result<QueryVariables, NavigationRejected> {
        if state.status.is_fetching() {
            return Err(NavigationRejected::Busy);
        }

        match navigation {
            Navigation::Initial => {
                let never_loaded = state.page_info.is_none()
                    && matches!(state.status, FetchStatus::Idle | FetchStatus::Failed(_));
                if !never_loaded {
                    return Err(NavigationRejected::NotIdle);
                }
                Ok(QueryVariables::initial(base.clone(), self.page_size))
            }
            Navigation::Forward => {
                let page_info = state
                    .page_info
                    .as_ref()
                    .filter(|info| info.has_next_page)
                    .ok_or(NavigationRejected::NoNextPage)?;
                let after = page_info
                    .end_cursor
                    .clone()
                    .ok_or(NavigationRejected::MissingCursor(navigation))?;
                Ok(QueryVariables::forward(base.clone(), self.page_size, after))
            }
            Navigation::Backward => {
                let page_info = state
                    .page_info
                    .as_ref()
                    .filter(|info| info.has_previous_page)
                    .ok_or(NavigationRejected::NoPreviousPage)?;
                let before = page_info
                    .start_cursor
                    .clone()
                    .ok_or(NavigationRejected::MissingCursor(navigation))?;
                Ok(QueryVariables::backward(base.clone(), self.page_size, before))
            }
        }
    }
}

/// Unwinds a fetch whose navigation future was dropped before it resumed,
/// e.g. by a caller timeout or a losing `select!` branch.
struct FetchGuard<'a> {
    controller: &'a PaginationController,
    generation: u64,
}

impl Drop for FetchGuard<'_> {
    fn drop(&mut self) {
        let mut state = self.controller.lock_state();
        let owned = state
            .in_flight
            .as_ref()
            .is_some_and(|in_flight| in_flight.generation == self.generation);
        if !owned {
            return;
        }
        let Some(in_flight) = state.in_flight.take() else {
            return;
        };
        in_flight.abort.abort();
        state.status = in_flight.previous_status;
        info!(
            "report: fetch dropped before completion navigation={} generation={}",
            in_flight.navigation, in_flight.generation
        );
        let events = &self.controller.events;
        let _ = events.send(ReportEvent::StatusChanged(state.status.clone()));
        let _ = events.send(ReportEvent::FetchDiscarded {
            navigation: in_flight.navigation,
        });
    }
}

#[cfg(test)]
#[path = "tests/controller_tests.rs"]
mod tests;
