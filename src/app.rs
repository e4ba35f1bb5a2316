//! Host glue between the terminal and the typing engine.
//!
//! `App` owns the catalog, the settings store, the active snippet and its
//! session, and maps key presses onto engine operations.

use std::sync::mpsc::{self, Receiver};

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;
use tracing::{debug, info, warn};

use crate::{
    catalog::{Catalog, Category, Snippet},
    content::ContentGenerator,
    error::{Error, Result},
    session::{Clock, SessionConfig, SystemClock, TypingSession},
    settings::{Mode, Settings, SettingsStore},
    stats::Stats,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Typing,
    Results,
}

/// What the event loop should do after a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Continue,
    Quit,
}

/// Startup choices that are not part of the persisted settings
#[derive(Debug, Clone, Default)]
pub struct AppOptions {
    pub category: Category,
    /// typed instead of a catalog snippet until the next `n`
    pub prompt: Option<String>,
}

pub struct App<C: Clock = SystemClock> {
    catalog: Catalog,
    store: Box<dyn SettingsStore>,
    settings: Settings,
    category: Category,
    snippet: Snippet,
    session: TypingSession<C>,
    screen: Screen,
    last_stats: Option<Stats>,
    status: Option<String>,
    completions: Receiver<Stats>,
    rng: StdRng,
}

impl App<SystemClock> {
    pub fn new(
        catalog: Catalog,
        store: Box<dyn SettingsStore>,
        settings: Settings,
        options: AppOptions,
    ) -> Result<Self> {
        Self::with_parts(
            catalog,
            store,
            settings,
            options,
            SystemClock,
            StdRng::from_entropy(),
        )
    }
}

impl<C: Clock> App<C> {
    pub fn with_parts(
        catalog: Catalog,
        store: Box<dyn SettingsStore>,
        settings: Settings,
        options: AppOptions,
        clock: C,
        mut rng: StdRng,
    ) -> Result<Self> {
        let snippet = match options.prompt {
            Some(prompt) => Snippet::custom(prompt, settings.difficulty),
            None => pick_snippet(&catalog, options.category, &settings, &mut rng)?,
        };
        let target = ContentGenerator::new(settings).generate_with(&snippet, &mut rng)?;

        let mut session = TypingSession::with_clock(target, SessionConfig::from(&settings), clock)?;
        let (tx, completions) = mpsc::channel();
        session.set_on_complete(move |stats| {
            // the receiver lives as long as the app
            let _ = tx.send(stats.clone());
        });

        info!(snippet = %snippet.id, mode = %settings.mode, "app ready");
        Ok(Self {
            catalog,
            store,
            settings,
            category: options.category,
            snippet,
            session,
            screen: Screen::Typing,
            last_stats: None,
            status: None,
            completions,
            rng,
        })
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn category(&self) -> Category {
        self.category
    }

    pub fn snippet(&self) -> &Snippet {
        &self.snippet
    }

    pub fn session(&self) -> &TypingSession<C> {
        &self.session
    }

    pub fn screen(&self) -> Screen {
        self.screen
    }

    /// Stats of the last finished session, while the results board is up
    pub fn last_stats(&self) -> Option<&Stats> {
        self.last_stats.as_ref()
    }

    /// One-line message for the footer, cleared by the next successful change
    pub fn status(&self) -> Option<&str> {
        self.status.as_deref()
    }

    pub fn handle_key(&mut self, key: KeyEvent) -> Control {
        if key.modifiers.contains(KeyModifiers::CONTROL) && key.code == KeyCode::Char('c') {
            return Control::Quit;
        }

        let control = match self.screen {
            Screen::Typing => self.handle_typing_key(key),
            Screen::Results => self.handle_results_key(key),
        };
        self.collect_completions();
        control
    }

    fn handle_typing_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Esc => return Control::Quit,
            KeyCode::Tab => self.restart(),
            KeyCode::Char('f') if key.modifiers.contains(KeyModifiers::CONTROL) => {
                self.session.finish();
            }
            KeyCode::F(1) => self.update_settings(Settings {
                mode: self.settings.mode.next(),
                ..self.settings
            }),
            KeyCode::F(2) => self.cycle_length(),
            KeyCode::F(3) => self.update_settings(Settings {
                allow_punctuation: !self.settings.allow_punctuation,
                ..self.settings
            }),
            KeyCode::F(4) => self.update_settings(Settings {
                allow_numbers: !self.settings.allow_numbers,
                ..self.settings
            }),
            KeyCode::F(5) => self.update_settings(Settings {
                difficulty: self.settings.difficulty.next(),
                ..self.settings
            }),
            KeyCode::F(6) => self.set_category(self.category.next()),
            KeyCode::Backspace => {
                self.session.backspace();
            }
            KeyCode::Enter => {
                self.session.type_char('\n');
            }
            KeyCode::Char(c)
                if !key
                    .modifiers
                    .intersects(KeyModifiers::CONTROL | KeyModifiers::ALT) =>
            {
                self.session.type_char(c);
            }
            _ => {}
        }
        Control::Continue
    }

    fn handle_results_key(&mut self, key: KeyEvent) -> Control {
        match key.code {
            KeyCode::Esc | KeyCode::Char('q') => return Control::Quit,
            KeyCode::Char('n') => self.next_snippet(),
            KeyCode::Char('r') => self.restart(),
            _ => {}
        }
        Control::Continue
    }

    /// Timer tick from the event loop
    pub fn on_tick(&mut self) {
        self.session.on_tick();
        self.collect_completions();
    }

    fn collect_completions(&mut self) {
        while let Ok(stats) = self.completions.try_recv() {
            debug!(wpm = stats.wpm, accuracy = stats.accuracy, "showing results");
            self.last_stats = Some(stats);
            self.screen = Screen::Results;
        }
    }

    /// Same target, fresh session
    pub fn restart(&mut self) {
        self.session.reset();
        self.show_typing();
    }

    /// Move on to a random snippet from the current filter
    pub fn next_snippet(&mut self) {
        let settings = self.settings;
        let result = pick_snippet(&self.catalog, self.category, &settings, &mut self.rng)
            .and_then(|snippet| {
                debug!(snippet = %snippet.id, "next snippet");
                self.load(snippet, settings)
            });
        self.settle(result);
    }

    /// Start over on fresh text under new settings, and persist them.
    ///
    /// If no text can be made under `settings`, the previous settings,
    /// text and session config stay in force and nothing is saved.
    pub fn update_settings(&mut self, settings: Settings) {
        if settings == self.settings {
            return;
        }

        // a custom prompt stays put; catalog snippets follow the difficulty
        let result = if settings.difficulty != self.settings.difficulty && !self.snippet.is_custom()
        {
            pick_snippet(&self.catalog, self.category, &settings, &mut self.rng)
                .and_then(|snippet| self.load(snippet, settings))
        } else {
            let snippet = self.snippet.clone();
            self.load(snippet, settings)
        };

        if result.is_ok() {
            if let Err(err) = self.store.save(&self.settings) {
                warn!(%err, "failed to save settings");
            }
        }
        self.settle(result);
    }

    pub fn set_category(&mut self, category: Category) {
        if category == self.category {
            return;
        }
        self.category = category;
        if self.snippet.is_custom() {
            return;
        }
        self.next_snippet();
    }

    fn cycle_length(&mut self) {
        let settings = match self.settings.mode {
            Mode::Time => Settings {
                time_duration: self.settings.time_duration.next(),
                ..self.settings
            },
            Mode::Count => Settings {
                count_amount: self.settings.count_amount.next(),
                ..self.settings
            },
            Mode::Zen => return,
        };
        self.update_settings(settings);
    }

    /// Generate text for `snippet` under `settings` and reset onto it.
    /// Nothing changes unless both steps succeed.
    fn load(&mut self, snippet: Snippet, settings: Settings) -> Result<()> {
        let target = ContentGenerator::new(settings).generate_with(&snippet, &mut self.rng)?;
        self.session.reset_with(target, SessionConfig::from(&settings))?;
        self.snippet = snippet;
        self.settings = settings;
        Ok(())
    }

    fn settle(&mut self, result: Result<()>) {
        match result {
            Ok(()) => {
                self.status = None;
                self.show_typing();
            }
            Err(err) => {
                // keep the previous text, but never a half-typed run
                self.restart();
                self.report(err);
            }
        }
    }

    fn show_typing(&mut self) {
        self.screen = Screen::Typing;
        self.last_stats = None;
    }

    fn report(&mut self, err: Error) {
        warn!(%err, snippet = %self.snippet.id, "could not prepare text");
        self.status = Some(err.to_string());
    }
}

fn pick_snippet<R: rand::Rng + ?Sized>(
    catalog: &Catalog,
    category: Category,
    settings: &Settings,
    rng: &mut R,
) -> Result<Snippet> {
    catalog
        .filter(category, settings.difficulty)
        .choose(rng)
        .map(|snippet| (*snippet).clone())
        .ok_or(Error::EmptyCatalog)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Difficulty;
    use crate::session::{ManualClock, Phase};
    use crate::settings::{FileSettingsStore, MemorySettingsStore, TimeDuration};
    use std::time::Duration;
    use tempfile::tempdir;

    fn key(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    fn ctrl(c: char) -> KeyEvent {
        KeyEvent::new(KeyCode::Char(c), KeyModifiers::CONTROL)
    }

    fn app_with(
        settings: Settings,
        options: AppOptions,
        store: Box<dyn SettingsStore>,
    ) -> (App<ManualClock>, ManualClock) {
        let clock = ManualClock::new();
        let app = App::with_parts(
            Catalog::builtin().unwrap(),
            store,
            settings,
            options,
            clock.clone(),
            StdRng::seed_from_u64(42),
        )
        .unwrap();
        (app, clock)
    }

    fn prompt_app(prompt: &str, mode: Mode) -> (App<ManualClock>, ManualClock) {
        let settings = Settings {
            mode,
            allow_punctuation: true,
            ..Settings::default()
        };
        let options = AppOptions {
            prompt: Some(prompt.to_string()),
            ..AppOptions::default()
        };
        app_with(settings, options, Box::new(MemorySettingsStore::default()))
    }

    fn type_str(app: &mut App<ManualClock>, text: &str) {
        for c in text.chars() {
            let code = if c == '\n' {
                KeyCode::Enter
            } else {
                KeyCode::Char(c)
            };
            app.handle_key(key(code));
        }
    }

    #[test]
    fn test_new_app_starts_typing() {
        let (app, _) = app_with(
            Settings::default(),
            AppOptions::default(),
            Box::new(MemorySettingsStore::default()),
        );

        assert_eq!(app.screen(), Screen::Typing);
        assert_eq!(app.snippet().difficulty, Difficulty::Easy);
        assert_eq!(app.session().phase(), Phase::Idle);
        assert!(app.last_stats().is_none());
    }

    #[test]
    fn test_custom_prompt_is_used() {
        let (app, _) = prompt_app("hello there", Mode::Count);
        assert_eq!(app.snippet().id, "custom");
        assert!(app.session().target().starts_with("hello there"));
    }

    #[test]
    fn test_finishing_shows_results() {
        let (mut app, clock) = prompt_app("hi", Mode::Zen);

        app.handle_key(key(KeyCode::Char('h')));
        clock.advance(Duration::from_millis(500));
        app.handle_key(key(KeyCode::Char('i')));

        assert_eq!(app.screen(), Screen::Results);
        let stats = app.last_stats().unwrap();
        assert_eq!(stats.accuracy, 100);
        assert_eq!(stats.elapsed, Duration::from_millis(500));
    }

    #[test]
    fn test_enter_types_newline() {
        let (mut app, _) = prompt_app("a\nb", Mode::Zen);
        type_str(&mut app, "a\n");
        assert_eq!(app.session().input(), "a\n");
        assert_eq!(app.session().mistakes(), 0);
    }

    #[test]
    fn test_results_keys() {
        let (mut app, _) = prompt_app("ok", Mode::Zen);
        type_str(&mut app, "ok");
        assert_eq!(app.screen(), Screen::Results);

        // typing on the board does nothing
        assert_eq!(app.handle_key(key(KeyCode::Char('x'))), Control::Continue);
        assert_eq!(app.screen(), Screen::Results);

        app.handle_key(key(KeyCode::Char('r')));
        assert_eq!(app.screen(), Screen::Typing);
        assert_eq!(app.session().phase(), Phase::Idle);
        assert_eq!(app.session().target(), "ok");

        type_str(&mut app, "ok");
        assert_eq!(app.handle_key(key(KeyCode::Char('q'))), Control::Quit);
    }

    #[test]
    fn test_next_leaves_custom_prompt() {
        let (mut app, _) = prompt_app("ok", Mode::Zen);
        type_str(&mut app, "ok");

        app.handle_key(key(KeyCode::Char('n')));

        assert_eq!(app.screen(), Screen::Typing);
        assert_ne!(app.snippet().id, "custom");
        assert_eq!(app.session().phase(), Phase::Idle);
    }

    #[test]
    fn test_escape_and_ctrl_c_quit() {
        let (mut app, _) = prompt_app("ok", Mode::Zen);
        assert_eq!(app.handle_key(key(KeyCode::Esc)), Control::Quit);
        assert_eq!(app.handle_key(ctrl('c')), Control::Quit);
    }

    #[test]
    fn test_tab_restarts_same_text() {
        let (mut app, _) = prompt_app("hello", Mode::Zen);
        type_str(&mut app, "hex");
        assert_eq!(app.session().mistakes(), 1);

        app.handle_key(key(KeyCode::Tab));

        assert_eq!(app.session().input(), "");
        assert_eq!(app.session().mistakes(), 0);
        assert_eq!(app.session().target(), "hello");
    }

    #[test]
    fn test_ctrl_f_finishes_zen() {
        let (mut app, clock) = prompt_app("a long text", Mode::Zen);
        type_str(&mut app, "a l");
        clock.advance(Duration::from_secs(1));

        app.handle_key(ctrl('f'));

        assert_eq!(app.screen(), Screen::Results);
        assert_eq!(app.last_stats().unwrap().elapsed, Duration::from_secs(1));
    }

    #[test]
    fn test_ctrl_modified_chars_are_not_typed() {
        let (mut app, _) = prompt_app("abc", Mode::Zen);
        app.handle_key(ctrl('a'));
        assert_eq!(app.session().input(), "");
    }

    #[test]
    fn test_tick_finishes_time_mode() {
        let settings = Settings {
            mode: Mode::Time,
            time_duration: TimeDuration::Secs15,
            ..Settings::default()
        };
        let (mut app, clock) = app_with(
            settings,
            AppOptions::default(),
            Box::new(MemorySettingsStore::default()),
        );

        let first = app.session().expected_char(0).unwrap();
        let code = if first == '\n' {
            KeyCode::Enter
        } else {
            KeyCode::Char(first)
        };
        app.handle_key(key(code));
        clock.advance(Duration::from_secs(14));
        app.on_tick();
        assert_eq!(app.screen(), Screen::Typing);

        clock.advance(Duration::from_secs(1));
        app.on_tick();
        assert_eq!(app.screen(), Screen::Results);
        assert_eq!(app.last_stats().unwrap().accuracy, 100);
    }

    #[test]
    fn test_settings_change_resets_and_persists() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let (mut app, _) = app_with(
            Settings::default(),
            AppOptions {
                prompt: Some("abc def".to_string()),
                ..AppOptions::default()
            },
            Box::new(FileSettingsStore::with_path(&path)),
        );
        type_str(&mut app, "ab");

        app.handle_key(key(KeyCode::F(1)));

        assert_eq!(app.settings().mode, Mode::Count);
        assert_eq!(app.session().phase(), Phase::Idle);
        assert_eq!(app.session().input(), "");
        // count mode repeats the prompt up to 25 words
        assert!(app.session().target().split_whitespace().count() >= 25);

        let saved = FileSettingsStore::with_path(&path).load();
        assert_eq!(saved.mode, Mode::Count);
    }

    #[test]
    fn test_f2_cycles_duration_or_count() {
        let (mut app, _) = prompt_app("abc", Mode::Time);
        app.handle_key(key(KeyCode::F(2)));
        assert_eq!(app.settings().time_duration, TimeDuration::Secs60);
        assert_eq!(app.session().time_remaining(), Some(60));

        let (mut app, _) = prompt_app("abc", Mode::Zen);
        let before = *app.settings();
        app.handle_key(key(KeyCode::F(2)));
        assert_eq!(app.settings(), &before);
    }

    #[test]
    fn test_toggles_regenerate_text() {
        let (mut app, _) = prompt_app("let x = 42;", Mode::Zen);
        assert_eq!(app.session().target(), "let x = ;");

        app.handle_key(key(KeyCode::F(3)));
        assert!(!app.settings().allow_punctuation);
        assert_eq!(app.session().target(), "let x");
    }

    #[test]
    fn test_empty_regeneration_keeps_previous_text() {
        let (mut app, _) = prompt_app("{ 42; }", Mode::Zen);
        let before = app.session().target().to_string();
        type_str(&mut app, "{ ");

        app.handle_key(key(KeyCode::F(3)));

        assert_eq!(app.session().target(), before);
        assert!(app.settings().allow_punctuation);
        assert_eq!(app.session().phase(), Phase::Idle);
        assert!(app.status().unwrap().contains("custom"));
    }

    #[test]
    fn test_failed_toggle_keeps_settings_and_session_in_step() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("settings.json");
        let settings = Settings {
            mode: Mode::Time,
            allow_punctuation: true,
            ..Settings::default()
        };
        let (mut app, _) = app_with(
            settings,
            AppOptions {
                prompt: Some("{ 42; }".to_string()),
                ..AppOptions::default()
            },
            Box::new(FileSettingsStore::with_path(&path)),
        );

        // nothing is left once punctuation goes
        app.handle_key(key(KeyCode::F(3)));
        assert!(app.settings().allow_punctuation);
        assert_eq!(app.settings().mode, app.session().config().mode);
        assert!(!path.exists());

        app.handle_key(key(KeyCode::F(1)));
        assert_eq!(app.settings().mode, Mode::Count);
        assert_eq!(app.settings().mode, app.session().config().mode);
        assert!(app.status().is_none());

        let saved = FileSettingsStore::with_path(&path).load();
        assert_eq!(saved, *app.settings());
    }

    #[test]
    fn test_difficulty_change_picks_matching_snippet() {
        let (mut app, _) = app_with(
            Settings::default(),
            AppOptions::default(),
            Box::new(MemorySettingsStore::default()),
        );

        app.handle_key(key(KeyCode::F(5)));

        assert_eq!(app.settings().difficulty, Difficulty::Medium);
        assert_eq!(app.snippet().difficulty, Difficulty::Medium);
    }

    #[test]
    fn test_category_cycle() {
        let (mut app, _) = app_with(
            Settings::default(),
            AppOptions::default(),
            Box::new(MemorySettingsStore::default()),
        );
        app.handle_key(key(KeyCode::F(6)));
        assert_eq!(app.category(), Category::Arrays);
        assert_eq!(app.snippet().difficulty, Difficulty::Easy);
    }
}
