//! Lesson navigation: ordered lesson sequence, active lesson, hints and
//! completion tracking for one course page.

use std::collections::HashSet;
use std::sync::Arc;

use tokio::sync::mpsc::UnboundedSender;

use crate::course::{CourseDetail, CourseStore, Lesson, LessonSummary, StoreError};
use crate::events::CoreEvent;
use crate::locator::Locator;
use crate::reconcile::Verdict;
use crate::session::ExecutionSession;

/// Identifies one lesson fetch. Only the most recent fetch may apply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LessonTicket {
    seq: u64,
    lesson_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LessonPage {
    /// The course has no lessons to show.
    Empty,
    Loading,
    Ready,
    NotFound(String),
    Failed(String),
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HintState {
    pub cursor: usize,
    pub hints_visible: bool,
    pub answer_visible: bool,
}

#[derive(Debug, Clone, Copy)]
pub struct LessonEntry<'a> {
    pub summary: &'a LessonSummary,
    pub active: bool,
    pub completed: bool,
}

pub struct LessonNavigator {
    store: Arc<dyn CourseStore>,
    events: UnboundedSender<CoreEvent>,
    course: CourseDetail,
    active: Option<String>,
    lesson: Option<Lesson>,
    page: LessonPage,
    hints: HintState,
    completed: HashSet<String>,
    locator: Locator,
    fetch_seq: u64,
    session: ExecutionSession,
}

impl LessonNavigator {
    /// Load the course and select the lesson named by `locator`, falling back
    /// to the first lesson when it names none or an unknown one.
    pub async fn open(
        store: Arc<dyn CourseStore>,
        locator: Locator,
        session: ExecutionSession,
        events: UnboundedSender<CoreEvent>,
    ) -> Result<Self, StoreError> {
        let mut course = store.get_course(&locator.course_id).await?;
        course.lessons.sort_by_key(|l| l.order);
        log::debug!("opened course {} with {} lessons", course.course.id, course.lessons.len());

        let mut nav = Self {
            store,
            events,
            locator: Locator::course(course.course.id.clone()),
            course,
            active: None,
            lesson: None,
            page: LessonPage::Empty,
            hints: HintState::default(),
            completed: HashSet::new(),
            fetch_seq: 0,
            session,
        };

        let requested = locator.lesson_id.filter(|id| {
            let known = nav.index_of(id).is_some();
            if !known {
                log::warn!("lesson '{}' is not part of course '{}'", id, nav.locator.course_id);
            }
            known
        });
        let initial = requested.or_else(|| nav.course.lessons.first().map(|l| l.id.clone()));
        if let Some(id) = initial {
            nav.select_lesson(&id);
        }
        Ok(nav)
    }

    pub fn course(&self) -> &CourseDetail {
        &self.course
    }

    pub fn lessons(&self) -> Vec<LessonEntry<'_>> {
        self.course
            .lessons
            .iter()
            .map(|summary| LessonEntry {
                summary,
                active: self.active.as_deref() == Some(summary.id.as_str()),
                completed: self.completed.contains(&summary.id),
            })
            .collect()
    }

    pub fn active_id(&self) -> Option<&str> {
        self.active.as_deref()
    }

    /// The loaded active lesson, once its fetch has completed.
    pub fn active_lesson(&self) -> Option<&Lesson> {
        self.lesson.as_ref()
    }

    pub fn page(&self) -> &LessonPage {
        &self.page
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn hints(&self) -> &HintState {
        &self.hints
    }

    pub fn session(&self) -> &ExecutionSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ExecutionSession {
        &mut self.session
    }

    pub fn expected_output(&self) -> Option<&str> {
        self.lesson.as_ref().and_then(Lesson::expectation)
    }

    pub fn verdict(&self) -> Verdict {
        self.session.verdict(self.expected_output())
    }

    pub fn is_completed(&self, lesson_id: &str) -> bool {
        self.completed.contains(lesson_id)
    }

    /// `(completed, total)` lesson counts.
    pub fn progress(&self) -> (usize, usize) {
        let total = self.course.lessons.len();
        let done = self
            .course
            .lessons
            .iter()
            .filter(|l| self.completed.contains(&l.id))
            .count();
        (done, total)
    }

    fn index_of(&self, lesson_id: &str) -> Option<usize> {
        self.course.lessons.iter().position(|l| l.id == lesson_id)
    }

    pub fn active_index(&self) -> Option<usize> {
        self.active.as_deref().and_then(|id| self.index_of(id))
    }

    pub fn has_next(&self) -> bool {
        self.active_index()
            .map_or(false, |i| i + 1 < self.course.lessons.len())
    }

    pub fn has_previous(&self) -> bool {
        self.active_index().map_or(false, |i| i > 0)
    }

    pub fn go_next(&mut self) -> bool {
        if !self.has_next() {
            return false;
        }
        match self.active_index().map(|i| self.course.lessons[i + 1].id.clone()) {
            Some(id) => self.select_lesson(&id),
            None => false,
        }
    }

    pub fn go_previous(&mut self) -> bool {
        if !self.has_previous() {
            return false;
        }
        match self.active_index().map(|i| self.course.lessons[i - 1].id.clone()) {
            Some(id) => self.select_lesson(&id),
            None => false,
        }
    }

    /// Make `lesson_id` active and start fetching it. Returns false when it is
    /// already active or not part of the course.
    pub fn select_lesson(&mut self, lesson_id: &str) -> bool {
        if self.active.as_deref() == Some(lesson_id) {
            return false;
        }
        if self.index_of(lesson_id).is_none() {
            log::warn!("ignoring unknown lesson '{}'", lesson_id);
            return false;
        }
        self.active = Some(lesson_id.to_string());
        self.locator.lesson_id = Some(lesson_id.to_string());
        self.fetch_active();
        true
    }

    /// Fetch the active lesson again, e.g. after a failed load.
    pub fn reload(&mut self) -> bool {
        if self.active.is_none() {
            return false;
        }
        self.fetch_active();
        true
    }

    fn fetch_active(&mut self) {
        let Some(lesson_id) = self.active.clone() else {
            return;
        };
        self.hints = HintState::default();
        // nothing from the previous lesson may run while this one loads
        self.session.reset("", Some(lesson_id.clone()));
        self.lesson = None;
        self.page = LessonPage::Loading;
        self.fetch_seq += 1;

        let ticket = LessonTicket { seq: self.fetch_seq, lesson_id: lesson_id.clone() };
        let store = self.store.clone();
        let events = self.events.clone();
        let course_id = self.course.course.id.clone();
        tokio::spawn(async move {
            let result = store.get_lesson(&course_id, &lesson_id).await;
            if events.send(CoreEvent::LessonLoaded { ticket, result }).is_err() {
                log::debug!("lesson '{}' loaded after the owner went away", lesson_id);
            }
        });
    }

    /// Apply a background completion. Returns whether it changed anything.
    pub fn apply(&mut self, event: CoreEvent) -> bool {
        match event {
            CoreEvent::RunProgress { ticket, output } => self.session.apply_progress(ticket, output),
            CoreEvent::RunFinished { ticket, outcome } => {
                let applied = self.session.apply_finished(ticket, outcome);
                if applied && self.verdict() == Verdict::Match {
                    if let Some(id) = &self.active {
                        self.completed.insert(id.clone());
                    }
                }
                applied
            }
            CoreEvent::LessonLoaded { ticket, result } => self.apply_lesson(ticket, result),
        }
    }

    fn apply_lesson(&mut self, ticket: LessonTicket, result: Result<Lesson, StoreError>) -> bool {
        if ticket.seq != self.fetch_seq || self.active.as_deref() != Some(ticket.lesson_id.as_str()) {
            log::debug!("dropping stale fetch of lesson '{}'", ticket.lesson_id);
            return false;
        }
        match result {
            Ok(lesson) => {
                self.session.reset(&lesson.code, Some(lesson.id.clone()));
                self.hints = HintState::default();
                self.lesson = Some(lesson);
                self.page = LessonPage::Ready;
            }
            Err(StoreError::NotFound(what)) => {
                self.page = LessonPage::NotFound(what);
            }
            Err(err) => {
                log::warn!("failed to load lesson '{}': {}", ticket.lesson_id, err);
                self.page = LessonPage::Failed(err.to_string());
            }
        }
        true
    }

    pub fn hint_count(&self) -> usize {
        self.lesson.as_ref().map_or(0, |l| l.hints.len())
    }

    /// The hint under the cursor while hints are shown.
    pub fn current_hint(&self) -> Option<&str> {
        if !self.hints.hints_visible {
            return None;
        }
        self.lesson
            .as_ref()
            .and_then(|l| l.hints.get(self.hints.cursor))
            .map(String::as_str)
    }

    pub fn show_hints(&mut self) {
        self.hints.hints_visible = !self.hints.hints_visible;
    }

    pub fn next_hint(&mut self) {
        let count = self.hint_count();
        if count > 0 {
            self.hints.cursor = (self.hints.cursor + 1).min(count - 1);
        }
    }

    pub fn previous_hint(&mut self) {
        self.hints.cursor = self.hints.cursor.saturating_sub(1);
    }

    pub fn toggle_answer(&mut self) {
        self.hints.answer_visible = !self.hints.answer_visible;
    }

    pub fn set_source(&mut self, source: impl Into<String>) {
        self.session.set_source(source);
    }

    /// Run the editor source. Nothing runs until the active lesson is loaded.
    pub fn run(&mut self) -> bool {
        if self.page != LessonPage::Ready {
            log::debug!("run ignored: lesson page is {:?}", self.page);
            return false;
        }
        self.session.run()
    }

    pub fn clear_output(&mut self) {
        self.session.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::course::{CatalogStore, Course, Level};
    use crate::execution::fake::FakeBackend;
    use crate::execution::ExecutionOutcome;
    use async_trait::async_trait;
    use tokio::sync::mpsc::{self, UnboundedReceiver};

    fn lesson(id: &str, order: i64, code: &str, hints: &[&str], expected: Option<&str>) -> Lesson {
        Lesson {
            id: id.into(),
            course_id: String::new(),
            title: format!("Lesson {}", id),
            description: None,
            order,
            content: format!("# {}", id),
            code: code.into(),
            hints: hints.iter().map(|h| h.to_string()).collect(),
            expected_output: expected.map(str::to_string),
        }
    }

    fn store() -> CatalogStore {
        let course = Course {
            id: "go-basics".into(),
            title: "Go basics".into(),
            description: "Core concepts".into(),
            instructor: "Zhang San".into(),
            duration: 12,
            level: Level::Beginner,
            category: "programming".into(),
            lessons_count: 0,
            created_at: None,
            updated_at: None,
        };
        let lessons = vec![
            lesson("maps", 35, "// maps", &[], None),
            lesson("hello", 10, "// hello", &["import fmt", "call Println"], Some("Hello, World!\n")),
            lesson("loops", 20, "// loops", &["use for"], Some("Done!")),
        ];
        CatalogStore::from_courses(vec![(course, lessons)])
    }

    async fn open_with(
        store: Arc<dyn CourseStore>,
        backend: Arc<FakeBackend>,
        locator: &str,
    ) -> (LessonNavigator, UnboundedReceiver<CoreEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = ExecutionSession::new(backend, tx.clone());
        let nav = LessonNavigator::open(store, locator.parse().unwrap(), session, tx)
            .await
            .unwrap();
        (nav, rx)
    }

    async fn open(locator: &str) -> (LessonNavigator, UnboundedReceiver<CoreEvent>) {
        let backend = FakeBackend::replying(ExecutionOutcome::success("Hello, World!\n"));
        open_with(Arc::new(store()), backend, locator).await
    }

    async fn pump(nav: &mut LessonNavigator, rx: &mut UnboundedReceiver<CoreEvent>) -> bool {
        let event = rx.recv().await.unwrap();
        nav.apply(event)
    }

    #[tokio::test]
    async fn opens_first_lesson_in_order() {
        let (mut nav, mut rx) = open("go-basics").await;
        assert_eq!(nav.active_id(), Some("hello"));
        assert_eq!(nav.page(), &LessonPage::Loading);
        assert_eq!(nav.locator().to_string(), "go-basics?lesson=hello");
        assert!(!nav.has_previous());
        assert!(nav.has_next());

        assert!(pump(&mut nav, &mut rx).await);
        assert_eq!(nav.page(), &LessonPage::Ready);
        assert_eq!(nav.session().source(), "// hello");
        assert_eq!(nav.active_lesson().map(|l| l.order), Some(10));
    }

    #[tokio::test]
    async fn unknown_locator_lesson_falls_back_to_first() {
        let (nav, _rx) = open("go-basics?lesson=pointers").await;
        assert_eq!(nav.active_id(), Some("hello"));
    }

    #[tokio::test]
    async fn missing_course_is_not_found() {
        let (tx, _rx) = mpsc::unbounded_channel();
        let session = ExecutionSession::new(FakeBackend::replying(ExecutionOutcome::default()), tx.clone());
        let result = LessonNavigator::open(Arc::new(store()), Locator::course("rust"), session, tx).await;
        assert!(matches!(result, Err(StoreError::NotFound(_))));
    }

    #[tokio::test]
    async fn navigation_clamps_at_bounds_with_sparse_ordinals() {
        let (mut nav, _rx) = open("go-basics?lesson=loops").await;
        assert_eq!(nav.active_index(), Some(1));
        assert!(nav.has_next() && nav.has_previous());

        assert!(nav.go_next());
        assert_eq!(nav.active_id(), Some("maps"));
        assert!(!nav.has_next());
        assert!(!nav.go_next());
        assert_eq!(nav.active_id(), Some("maps"));

        assert!(nav.go_previous());
        assert!(nav.go_previous());
        assert_eq!(nav.active_id(), Some("hello"));
        assert!(!nav.go_previous());
    }

    #[tokio::test]
    async fn selecting_active_or_unknown_lesson_is_a_no_op() {
        let (mut nav, _rx) = open("go-basics").await;
        assert!(!nav.select_lesson("hello"));
        assert!(!nav.select_lesson("pointers"));
        assert_eq!(nav.active_id(), Some("hello"));
    }

    #[tokio::test]
    async fn lesson_change_resets_hints_and_session() {
        let (mut nav, mut rx) = open("go-basics").await;
        pump(&mut nav, &mut rx).await;

        nav.show_hints();
        nav.next_hint();
        nav.next_hint();
        assert_eq!(nav.hints().cursor, 1);
        assert_eq!(nav.current_hint(), Some("call Println"));
        nav.toggle_answer();

        nav.set_source("package main // edited");
        assert!(nav.run());
        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.session().output(), "Hello, World!\n");

        assert!(nav.go_next());
        assert_eq!(nav.hints(), &HintState::default());
        assert_eq!(nav.session().output(), "");
        assert!(nav.session().error().is_none());
        assert_eq!(nav.locator().lesson_id.as_deref(), Some("loops"));

        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.session().source(), "// loops");
        assert_eq!(nav.hint_count(), 1);
    }

    #[tokio::test]
    async fn only_the_latest_lesson_fetch_applies() {
        let (mut nav, mut rx) = open("go-basics").await;
        nav.select_lesson("loops");
        nav.select_lesson("maps");

        let mut applied = 0;
        for _ in 0..3 {
            if pump(&mut nav, &mut rx).await {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(nav.page(), &LessonPage::Ready);
        assert_eq!(nav.active_lesson().map(|l| l.id.as_str()), Some("maps"));
        assert_eq!(nav.session().source(), "// maps");
    }

    #[tokio::test]
    async fn fabricated_stale_ticket_is_ignored() {
        let (mut nav, mut rx) = open("go-basics").await;
        pump(&mut nav, &mut rx).await;
        let stale = CoreEvent::LessonLoaded {
            ticket: LessonTicket { seq: 0, lesson_id: "hello".into() },
            result: Ok(lesson("hello", 10, "// other", &[], None)),
        };
        assert!(!nav.apply(stale));
        assert_eq!(nav.session().source(), "// hello");
    }

    #[tokio::test]
    async fn run_result_after_navigation_is_dropped() {
        let (mut nav, mut rx) = open("go-basics").await;
        pump(&mut nav, &mut rx).await;
        nav.run();
        nav.go_next();

        // run result and loops fetch, in either order
        pump(&mut nav, &mut rx).await;
        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.session().output(), "");
        assert!(!nav.is_completed("hello"));
    }

    #[tokio::test]
    async fn matching_run_marks_lesson_completed() {
        let (mut nav, mut rx) = open("go-basics").await;
        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.progress(), (0, 3));

        nav.run();
        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.verdict(), Verdict::Match);
        assert!(nav.is_completed("hello"));
        assert_eq!(nav.progress(), (1, 3));
        let entries = nav.lessons();
        assert!(entries[0].active && entries[0].completed);
        assert!(!entries[1].completed);
    }

    #[tokio::test]
    async fn hint_cursor_clamps() {
        let (mut nav, mut rx) = open("go-basics").await;
        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.current_hint(), None);
        nav.show_hints();
        nav.previous_hint();
        assert_eq!(nav.hints().cursor, 0);
        for _ in 0..5 {
            nav.next_hint();
        }
        assert_eq!(nav.hints().cursor, 1);
    }

    struct BrokenLessons(CatalogStore);

    #[async_trait]
    impl CourseStore for BrokenLessons {
        async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
            self.0.list_courses().await
        }

        async fn get_course(&self, course_id: &str) -> Result<CourseDetail, StoreError> {
            self.0.get_course(course_id).await
        }

        async fn get_lesson(&self, _: &str, lesson_id: &str) -> Result<Lesson, StoreError> {
            match lesson_id {
                "hello" => Err(StoreError::NotFound(format!("lesson '{}'", lesson_id))),
                _ => Err(StoreError::Transport("connection refused".into())),
            }
        }
    }

    #[tokio::test]
    async fn failed_fetches_set_distinct_page_states() {
        let backend = FakeBackend::replying(ExecutionOutcome::default());
        let (mut nav, mut rx) = open_with(Arc::new(BrokenLessons(store())), backend, "go-basics").await;
        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.page(), &LessonPage::NotFound("lesson 'hello'".into()));

        nav.go_next();
        pump(&mut nav, &mut rx).await;
        assert!(matches!(nav.page(), LessonPage::Failed(msg) if msg.contains("connection refused")));

        assert!(nav.reload());
        assert_eq!(nav.page(), &LessonPage::Loading);
    }

    #[tokio::test]
    async fn lesson_change_drops_previous_source_before_load() {
        let backend = FakeBackend::replying(ExecutionOutcome::success("Hello, World!\n"));
        let (mut nav, mut rx) = open_with(Arc::new(store()), backend.clone(), "go-basics").await;
        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.session().source(), "// hello");

        assert!(nav.go_next());
        assert_eq!(nav.page(), &LessonPage::Loading);
        assert_eq!(nav.session().source(), "");
        assert!(!nav.run());
        assert_eq!(backend.calls(), 0);

        pump(&mut nav, &mut rx).await;
        assert_eq!(nav.session().source(), "// loops");
        assert!(nav.run());
        pump(&mut nav, &mut rx).await;
        assert_eq!(backend.calls(), 1);
        let request = backend.last_request().unwrap();
        assert_eq!(request.source, "// loops");
        assert_eq!(request.example.as_deref(), Some("loops"));
    }

    struct LoopsUnavailable(CatalogStore);

    #[async_trait]
    impl CourseStore for LoopsUnavailable {
        async fn list_courses(&self) -> Result<Vec<Course>, StoreError> {
            self.0.list_courses().await
        }

        async fn get_course(&self, course_id: &str) -> Result<CourseDetail, StoreError> {
            self.0.get_course(course_id).await
        }

        async fn get_lesson(&self, course_id: &str, lesson_id: &str) -> Result<Lesson, StoreError> {
            match lesson_id {
                "loops" => Err(StoreError::Transport("connection refused".into())),
                _ => self.0.get_lesson(course_id, lesson_id).await,
            }
        }
    }

    #[tokio::test]
    async fn failed_lesson_load_keeps_no_stale_source() {
        let backend = FakeBackend::replying(ExecutionOutcome::default());
        let (mut nav, mut rx) =
            open_with(Arc::new(LoopsUnavailable(store())), backend.clone(), "go-basics").await;
        pump(&mut nav, &mut rx).await;
        nav.set_source("// hello, edited");

        nav.go_next();
        pump(&mut nav, &mut rx).await;
        assert!(matches!(nav.page(), LessonPage::Failed(_)));
        assert_eq!(nav.active_id(), Some("loops"));
        assert_eq!(nav.session().source(), "");
        assert!(!nav.run());
        assert_eq!(backend.calls(), 0);
    }
}
