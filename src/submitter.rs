use std::cell::{Cell, RefCell};
use std::rc::Rc;
use std::time::Duration;

use log::{debug, error, info, warn};

use crate::scheduler::{ScheduledTask, Scheduler};
use crate::schema::{FeedbackPayload, GameId, MoveRequest, RequestError, TransportError};
use crate::service::GameService;

/// Pause before asking for the opponent's reply
pub const OPPONENT_MOVE_DELAY: Duration = Duration::from_millis(1000);

/// Plain-text form of the failure message, for surfaces without markup
pub const ERROR_MESSAGE: &str = "Error analyzing move. Please try again.";

/// Shown in the feedback area when a submission fails
pub const ERROR_ALERT_HTML: &str =
    r#"<div class="alert alert-danger">Error analyzing move. Please try again.</div>"#;

#[cfg_attr(test, mockall::automock)]
pub trait FeedbackRenderer {
    fn render(&self, payload: &FeedbackPayload);
}

/// Region the error message is written into
#[cfg_attr(test, mockall::automock)]
pub trait FeedbackArea {
    fn set_html(&self, html: &str);
}

#[cfg_attr(test, mockall::automock)]
pub trait HistoryRenderer {
    fn refresh(&self);
}

#[cfg_attr(test, mockall::automock)]
pub trait OpponentMover {
    fn request_move(&self);
}

/// The current game as seen by whoever owns it.
#[cfg_attr(test, mockall::automock)]
pub trait GameStatus {
    fn is_game_over(&self) -> bool;
}

impl GameStatus for chess::Board {
    fn is_game_over(&self) -> bool {
        self.status() != chess::BoardStatus::Ongoing
    }
}

impl GameStatus for crate::GameState {
    fn is_game_over(&self) -> bool {
        self.game_over()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SubmitOutcome {
    /// The server accepted and analyzed the move
    Accepted { opponent_scheduled: bool },
    /// The request failed; the error message is already on screen
    Failed(TransportError),
    /// Nothing was sent
    Rejected(RequestError),
}

/// Everything the submitter talks to.
#[derive(Clone)]
pub struct Collaborators {
    pub service: Rc<dyn GameService>,
    pub feedback: Rc<dyn FeedbackRenderer>,
    pub feedback_area: Rc<dyn FeedbackArea>,
    pub history: Rc<dyn HistoryRenderer>,
    pub opponent: Rc<dyn OpponentMover>,
    pub scheduler: Rc<dyn Scheduler>,
}

/// Sends user moves and drives the page refresh that follows.
pub struct MoveSubmitter {
    collaborators: Collaborators,
    in_flight: Rc<Cell<bool>>,
    pending: RefCell<Option<PendingMove>>,
}

/// The scheduled opponent request and whether its timer has gone off.
struct PendingMove {
    task: ScheduledTask,
    fired: Rc<Cell<bool>>,
}

/// Clears the in-flight flag even if the submission future is dropped.
struct InFlightGuard(Rc<Cell<bool>>);

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.0.set(false);
    }
}

impl MoveSubmitter {
    pub fn new(collaborators: Collaborators) -> Self {
        Self {
            collaborators,
            in_flight: Rc::new(Cell::new(false)),
            pending: RefCell::new(None),
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight.get()
    }

    /// True while an opponent move is scheduled and its timer has not fired.
    pub fn has_pending_opponent_move(&self) -> bool {
        self.pending
            .borrow()
            .as_ref()
            .map_or(false, |pending| !pending.fired.get())
    }

    /// Cancels a scheduled opponent move that has not fired yet.
    pub fn cancel_pending(&self) {
        let pending = self.pending.borrow_mut().take();
        if let Some(pending) = pending {
            if !pending.fired.get() {
                debug!("Cancelling pending opponent move");
            }
            pending.task.cancel();
        }
    }

    pub async fn submit_move(
        &self,
        game_id: &GameId,
        move_uci: &str,
        position_before: &str,
        position_after: &str,
        game: &dyn GameStatus,
    ) -> SubmitOutcome {
        let request = match MoveRequest::new(move_uci, position_before, position_after) {
            Ok(request) => request,
            Err(e) => {
                warn!("Not submitting move: {}", e);
                return SubmitOutcome::Rejected(e);
            }
        };

        if self.in_flight.replace(true) {
            warn!("Move {} ignored, previous move still in flight", move_uci);
            return SubmitOutcome::Rejected(RequestError::InFlight);
        }
        let _guard = InFlightGuard(self.in_flight.clone());

        info!("Submitting move {} for game {}", request.move_uci, game_id);
        match self.collaborators.service.submit_move(game_id, &request).await {
            Ok(payload) => {
                self.collaborators.feedback.render(&payload);
                self.collaborators.history.refresh();

                let opponent_scheduled = !game.is_game_over();
                if opponent_scheduled {
                    self.schedule_opponent_move();
                } else {
                    info!("Game {} is over, no opponent move requested", game_id);
                }
                SubmitOutcome::Accepted { opponent_scheduled }
            }
            Err(e) => {
                error!("Error sending move: {}", e);
                self.collaborators.feedback_area.set_html(ERROR_ALERT_HTML);
                SubmitOutcome::Failed(e)
            }
        }
    }

    fn schedule_opponent_move(&self) {
        let opponent = self.collaborators.opponent.clone();
        let fired = Rc::new(Cell::new(false));
        let task = self.collaborators.scheduler.schedule(OPPONENT_MOVE_DELAY, {
            let fired = fired.clone();
            Box::new(move || {
                fired.set(true);
                opponent.request_move();
            })
        });
        let previous = self.pending.borrow_mut().replace(PendingMove { task, fired });
        if let Some(previous) = previous {
            previous.task.cancel();
        }
    }
}

#[cfg(all(test, not(target_arch = "wasm32")))]
mod tests {
    use super::*;
    use crate::scheduler::Task;
    use crate::schema::{AiMove, MoveHistory};
    use crate::service::ServiceResult;
    use async_trait::async_trait;
    use mockall::Sequence;
    use std::future::{poll_fn, Future};
    use std::task::Poll;
    use tokio::sync::oneshot;

    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq e3 0 1";

    /// Answers every submission with a canned result and records what was sent.
    struct StubService {
        response: Result<FeedbackPayload, TransportError>,
        calls: RefCell<Vec<(GameId, MoveRequest)>>,
    }

    impl StubService {
        fn ok(body: &str) -> Rc<Self> {
            Rc::new(Self {
                response: Ok(FeedbackPayload::new(body)),
                calls: RefCell::new(Vec::new()),
            })
        }

        fn failing(error: TransportError) -> Rc<Self> {
            Rc::new(Self {
                response: Err(error),
                calls: RefCell::new(Vec::new()),
            })
        }
    }

    #[async_trait(?Send)]
    impl GameService for StubService {
        async fn submit_move(
            &self,
            game_id: &GameId,
            request: &MoveRequest,
        ) -> ServiceResult<FeedbackPayload> {
            self.calls
                .borrow_mut()
                .push((game_id.clone(), request.clone()));
            self.response.clone()
        }

        async fn ai_move(&self, _game_id: &GameId) -> ServiceResult<AiMove> {
            unreachable!("submitter never fetches the AI move itself")
        }

        async fn move_history(&self, _game_id: &GameId) -> ServiceResult<MoveHistory> {
            unreachable!("submitter never fetches history itself")
        }
    }

    /// Holds the first submission open until the test releases it.
    struct GatedService {
        gate: RefCell<Option<oneshot::Receiver<()>>>,
        calls: Cell<usize>,
    }

    impl GatedService {
        fn new(gate: oneshot::Receiver<()>) -> Rc<Self> {
            Rc::new(Self {
                gate: RefCell::new(Some(gate)),
                calls: Cell::new(0),
            })
        }
    }

    #[async_trait(?Send)]
    impl GameService for GatedService {
        async fn submit_move(
            &self,
            _game_id: &GameId,
            _request: &MoveRequest,
        ) -> ServiceResult<FeedbackPayload> {
            self.calls.set(self.calls.get() + 1);
            let gate = self.gate.borrow_mut().take();
            if let Some(gate) = gate {
                let _ = gate.await;
            }
            Ok(FeedbackPayload::new("{}"))
        }

        async fn ai_move(&self, _game_id: &GameId) -> ServiceResult<AiMove> {
            unreachable!("submitter never fetches the AI move itself")
        }

        async fn move_history(&self, _game_id: &GameId) -> ServiceResult<MoveHistory> {
            unreachable!("submitter never fetches history itself")
        }
    }

    /// Holds scheduled tasks so tests decide when they run.
    #[derive(Default)]
    struct ManualScheduler {
        tasks: RefCell<Vec<(Duration, Task, Rc<Cell<bool>>)>>,
        log: Option<Rc<RefCell<Vec<&'static str>>>>,
    }

    impl ManualScheduler {
        fn scheduled(&self) -> usize {
            self.tasks.borrow().len()
        }

        fn delays(&self) -> Vec<Duration> {
            self.tasks.borrow().iter().map(|(d, _, _)| *d).collect()
        }

        fn run_all(&self) {
            for (_, task, cancelled) in self.tasks.borrow_mut().drain(..) {
                if !cancelled.get() {
                    task();
                }
            }
        }
    }

    impl Scheduler for ManualScheduler {
        fn schedule(&self, delay: Duration, task: Task) -> ScheduledTask {
            if let Some(log) = &self.log {
                log.borrow_mut().push("schedule");
            }
            let cancelled = Rc::new(Cell::new(false));
            self.tasks.borrow_mut().push((delay, task, cancelled.clone()));
            ScheduledTask::new(move || cancelled.set(true))
        }
    }

    struct Harness {
        service: Rc<StubService>,
        scheduler: Rc<ManualScheduler>,
        submitter: MoveSubmitter,
    }

    fn harness(
        service: Rc<StubService>,
        scheduler: ManualScheduler,
        feedback: MockFeedbackRenderer,
        feedback_area: MockFeedbackArea,
        history: MockHistoryRenderer,
        opponent: MockOpponentMover,
    ) -> Harness {
        let scheduler = Rc::new(scheduler);
        let submitter = MoveSubmitter::new(Collaborators {
            service: service.clone(),
            feedback: Rc::new(feedback),
            feedback_area: Rc::new(feedback_area),
            history: Rc::new(history),
            opponent: Rc::new(opponent),
            scheduler: scheduler.clone(),
        });
        Harness {
            service,
            scheduler,
            submitter,
        }
    }

    fn ongoing() -> MockGameStatus {
        let mut game = MockGameStatus::new();
        game.expect_is_game_over().return_const(false);
        game
    }

    fn game_id() -> GameId {
        GameId::new("42").unwrap()
    }

    #[tokio::test]
    async fn test_success_renders_then_schedules_opponent_move() {
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut seq = Sequence::new();

        let mut feedback = MockFeedbackRenderer::new();
        let render_log = log.clone();
        feedback
            .expect_render()
            .withf(|payload| payload.as_str() == r#"{"status":"success"}"#)
            .times(1)
            .in_sequence(&mut seq)
            .returning_st(move |_| render_log.borrow_mut().push("render"));

        let mut history = MockHistoryRenderer::new();
        let history_log = log.clone();
        history
            .expect_refresh()
            .times(1)
            .in_sequence(&mut seq)
            .returning_st(move || history_log.borrow_mut().push("history"));

        let mut feedback_area = MockFeedbackArea::new();
        feedback_area.expect_set_html().never();

        let mut opponent = MockOpponentMover::new();
        opponent.expect_request_move().times(1).return_const(());

        let scheduler = ManualScheduler {
            log: Some(log.clone()),
            ..Default::default()
        };

        let h = harness(
            StubService::ok(r#"{"status":"success"}"#),
            scheduler,
            feedback,
            feedback_area,
            history,
            opponent,
        );

        let outcome = h
            .submitter
            .submit_move(&game_id(), "e2e4", crate::START_FEN, AFTER_E4, &ongoing())
            .await;

        assert_eq!(outcome, SubmitOutcome::Accepted { opponent_scheduled: true });
        assert_eq!(*log.borrow(), vec!["render", "history", "schedule"]);
        assert_eq!(h.scheduler.delays(), vec![Duration::from_millis(1000)]);
        assert!(h.submitter.has_pending_opponent_move());

        let calls = h.service.calls.borrow();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0.as_str(), "42");
        assert_eq!(calls[0].1.move_uci, "e2e4");
        assert_eq!(calls[0].1.position_before, crate::START_FEN);
        assert_eq!(calls[0].1.position_after, AFTER_E4);
        drop(calls);

        h.scheduler.run_all();
        assert!(!h.submitter.has_pending_opponent_move());
    }

    #[tokio::test]
    async fn test_game_over_skips_opponent_move() {
        let mut feedback = MockFeedbackRenderer::new();
        feedback.expect_render().times(1).return_const(());
        let mut history = MockHistoryRenderer::new();
        history.expect_refresh().times(1).return_const(());
        let mut opponent = MockOpponentMover::new();
        opponent.expect_request_move().never();

        let h = harness(
            StubService::ok("{}"),
            ManualScheduler::default(),
            feedback,
            MockFeedbackArea::new(),
            history,
            opponent,
        );

        let mut game = MockGameStatus::new();
        game.expect_is_game_over().times(1).return_const(true);

        let outcome = h
            .submitter
            .submit_move(&game_id(), "d8h4", "before", "after", &game)
            .await;

        assert_eq!(outcome, SubmitOutcome::Accepted { opponent_scheduled: false });
        assert_eq!(h.scheduler.scheduled(), 0);
        assert!(!h.submitter.has_pending_opponent_move());
    }

    #[tokio::test]
    async fn test_failure_shows_error_and_nothing_else() {
        let mut feedback = MockFeedbackRenderer::new();
        feedback.expect_render().never();
        let mut history = MockHistoryRenderer::new();
        history.expect_refresh().never();
        let mut opponent = MockOpponentMover::new();
        opponent.expect_request_move().never();

        let mut feedback_area = MockFeedbackArea::new();
        feedback_area
            .expect_set_html()
            .withf(|html| html == ERROR_ALERT_HTML && html.contains("Error"))
            .times(1)
            .return_const(());

        let error = TransportError::Status {
            status: 500,
            body: String::new(),
        };
        let h = harness(
            StubService::failing(error.clone()),
            ManualScheduler::default(),
            feedback,
            feedback_area,
            history,
            opponent,
        );

        let mut game = MockGameStatus::new();
        game.expect_is_game_over().never();

        let outcome = h
            .submitter
            .submit_move(&game_id(), "e2e4", crate::START_FEN, AFTER_E4, &game)
            .await;

        assert_eq!(outcome, SubmitOutcome::Failed(error));
        assert_eq!(h.scheduler.scheduled(), 0);
        assert!(!h.submitter.is_in_flight());
    }

    #[tokio::test]
    async fn test_empty_fields_are_rejected_without_request() {
        let h = harness(
            StubService::ok("{}"),
            ManualScheduler::default(),
            MockFeedbackRenderer::new(),
            MockFeedbackArea::new(),
            MockHistoryRenderer::new(),
            MockOpponentMover::new(),
        );

        let outcome = h
            .submitter
            .submit_move(&game_id(), "", crate::START_FEN, AFTER_E4, &ongoing())
            .await;

        assert_eq!(
            outcome,
            SubmitOutcome::Rejected(RequestError::EmptyField("move_uci"))
        );
        assert!(h.service.calls.borrow().is_empty());
    }

    #[tokio::test]
    async fn test_overlapping_submission_is_rejected() {
        let h = harness(
            StubService::ok("{}"),
            ManualScheduler::default(),
            MockFeedbackRenderer::new(),
            MockFeedbackArea::new(),
            MockHistoryRenderer::new(),
            MockOpponentMover::new(),
        );

        h.submitter.in_flight.set(true);
        let outcome = h
            .submitter
            .submit_move(&game_id(), "e2e4", crate::START_FEN, AFTER_E4, &ongoing())
            .await;

        assert_eq!(outcome, SubmitOutcome::Rejected(RequestError::InFlight));
        assert!(h.service.calls.borrow().is_empty());
        assert!(h.submitter.is_in_flight());
    }

    fn gated_submitter(
        service: Rc<GatedService>,
        scheduler: Rc<ManualScheduler>,
        renders: usize,
    ) -> MoveSubmitter {
        let mut feedback = MockFeedbackRenderer::new();
        feedback.expect_render().times(renders).return_const(());
        let mut history = MockHistoryRenderer::new();
        history.expect_refresh().times(renders).return_const(());
        let mut feedback_area = MockFeedbackArea::new();
        feedback_area.expect_set_html().never();
        let mut opponent = MockOpponentMover::new();
        opponent.expect_request_move().never();

        MoveSubmitter::new(Collaborators {
            service,
            feedback: Rc::new(feedback),
            feedback_area: Rc::new(feedback_area),
            history: Rc::new(history),
            opponent: Rc::new(opponent),
            scheduler,
        })
    }

    #[tokio::test]
    async fn test_second_submission_leaves_first_untouched() {
        let (release, gate) = oneshot::channel();
        let service = GatedService::new(gate);
        let scheduler = Rc::new(ManualScheduler::default());
        let submitter = gated_submitter(service.clone(), scheduler.clone(), 1);
        let id = game_id();
        let game = ongoing();

        let mut first =
            Box::pin(submitter.submit_move(&id, "e2e4", crate::START_FEN, AFTER_E4, &game));
        let waiting = poll_fn(|cx| Poll::Ready(first.as_mut().poll(cx).is_pending())).await;
        assert!(waiting);
        assert!(submitter.is_in_flight());

        let second = submitter
            .submit_move(&id, "d2d4", crate::START_FEN, "after", &game)
            .await;
        assert_eq!(second, SubmitOutcome::Rejected(RequestError::InFlight));
        assert_eq!(service.calls.get(), 1);
        assert!(submitter.is_in_flight());

        release.send(()).unwrap();
        assert_eq!(first.await, SubmitOutcome::Accepted { opponent_scheduled: true });
        assert!(!submitter.is_in_flight());
        assert_eq!(scheduler.scheduled(), 1);
    }

    #[tokio::test]
    async fn test_dropped_submission_clears_in_flight() {
        let (_release, gate) = oneshot::channel();
        let service = GatedService::new(gate);
        let scheduler = Rc::new(ManualScheduler::default());
        let submitter = gated_submitter(service.clone(), scheduler.clone(), 1);
        let id = game_id();
        let game = ongoing();

        let mut first =
            Box::pin(submitter.submit_move(&id, "e2e4", crate::START_FEN, AFTER_E4, &game));
        let waiting = poll_fn(|cx| Poll::Ready(first.as_mut().poll(cx).is_pending())).await;
        assert!(waiting);
        assert!(submitter.is_in_flight());

        drop(first);
        assert!(!submitter.is_in_flight());

        // The gate went with the dropped request, so this one answers at once.
        let outcome = submitter
            .submit_move(&id, "e2e4", crate::START_FEN, AFTER_E4, &game)
            .await;
        assert_eq!(outcome, SubmitOutcome::Accepted { opponent_scheduled: true });
        assert_eq!(service.calls.get(), 2);
    }

    #[tokio::test]
    async fn test_new_success_replaces_pending_opponent_move() {
        let mut feedback = MockFeedbackRenderer::new();
        feedback.expect_render().times(2).return_const(());
        let mut history = MockHistoryRenderer::new();
        history.expect_refresh().times(2).return_const(());
        let mut opponent = MockOpponentMover::new();
        opponent.expect_request_move().times(1).return_const(());

        let h = harness(
            StubService::ok("{}"),
            ManualScheduler::default(),
            feedback,
            MockFeedbackArea::new(),
            history,
            opponent,
        );

        for _ in 0..2 {
            let outcome = h
                .submitter
                .submit_move(&game_id(), "e2e4", crate::START_FEN, AFTER_E4, &ongoing())
                .await;
            assert_eq!(outcome, SubmitOutcome::Accepted { opponent_scheduled: true });
        }

        assert_eq!(h.scheduler.scheduled(), 2);
        h.scheduler.run_all();
    }

    #[tokio::test]
    async fn test_cancel_pending() {
        let mut feedback = MockFeedbackRenderer::new();
        feedback.expect_render().return_const(());
        let mut history = MockHistoryRenderer::new();
        history.expect_refresh().return_const(());
        let mut opponent = MockOpponentMover::new();
        opponent.expect_request_move().never();

        let h = harness(
            StubService::ok("{}"),
            ManualScheduler::default(),
            feedback,
            MockFeedbackArea::new(),
            history,
            opponent,
        );

        h.submitter
            .submit_move(&game_id(), "e2e4", crate::START_FEN, AFTER_E4, &ongoing())
            .await;
        h.submitter.cancel_pending();

        assert!(!h.submitter.has_pending_opponent_move());
        h.scheduler.run_all();
    }

    #[test]
    fn test_error_alert_carries_plain_message() {
        assert!(ERROR_ALERT_HTML.contains(ERROR_MESSAGE));
        assert!(!ERROR_MESSAGE.contains('<'));
    }

    #[test]
    fn test_board_game_status() {
        use std::str::FromStr;
        let mated =
            chess::Board::from_str("rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3")
                .unwrap();
        assert!(mated.is_game_over());
        assert!(!chess::Board::default().is_game_over());
    }
}
