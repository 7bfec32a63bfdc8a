//! The console overlay: a [`ConsoleSession`] wired to keyboard input.
//!
//! Hosts forward key events to [`Overlay::key_down`] / [`Overlay::key_up`]
//! and, when the returned [`Dispatch`] does not prevent it, perform the
//! key's default action themselves (usually through [`Overlay::insert_text`]).

use crate::keybind::{
    Chord, Dispatch, KEY_BACKTICK, KEY_DOWN, KEY_ENTER, KEY_T, KEY_TAB, KEY_UP, KeyEvent,
    KeyResult, KeyRouter,
};
use crate::input;
use crate::session::ConsoleSession;

/// Session plus key router.
pub struct Overlay {
    session: ConsoleSession,
    router: KeyRouter<ConsoleSession>,
}

impl Overlay {
    /// Wraps `session` with the default key bindings.
    pub fn new(session: ConsoleSession) -> Self {
        let mut router = KeyRouter::new();
        register_default_bindings(&mut router);
        Self { session, router }
    }

    /// Wraps `session` with a caller-supplied router and no defaults.
    pub fn with_router(session: ConsoleSession, router: KeyRouter<ConsoleSession>) -> Self {
        Self { session, router }
    }

    /// Routes a key press. Unhandled Tab in multi-line mode indents (or
    /// outdents with SHIFT).
    pub fn key_down(&mut self, event: &KeyEvent) -> Dispatch {
        let dispatch = self.router.dispatch(&mut self.session, event);
        if dispatch.prevents_default() {
            return dispatch;
        }

        if event.code == KEY_TAB
            && self.session.is_focused()
            && self.session.is_multiline()
            && !event.ctrl
            && !event.alt
        {
            let edited = input::indent(self.session.editor(), event.shift);
            self.session.set_editor(edited);
            return Dispatch::Ran(KeyResult::Handled);
        }
        dispatch
    }

    /// Handles a key release. A plain Enter in multi-line mode carries the
    /// previous line's indentation onto the new line.
    pub fn key_up(&mut self, event: &KeyEvent) {
        if event.code == KEY_ENTER
            && !event.ctrl
            && self.session.is_focused()
            && self.session.is_multiline()
        {
            let edited = input::auto_indent(self.session.editor());
            self.session.set_editor(edited);
        }
    }

    /// Types `text` over the current selection.
    pub fn insert_text(&mut self, text: &str) {
        let edited = input::insert_text(self.session.editor(), text);
        self.session.set_editor(edited);
    }

    pub fn session(&self) -> &ConsoleSession {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut ConsoleSession {
        &mut self.session
    }

    pub fn router_mut(&mut self) -> &mut KeyRouter<ConsoleSession> {
        &mut self.router
    }

    pub fn into_session(self) -> ConsoleSession {
        self.session
    }
}

impl std::fmt::Debug for Overlay {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Overlay")
            .field("session", &self.session)
            .field("bindings", &self.router.len())
            .finish()
    }
}

fn focused(session: &ConsoleSession) -> bool {
    session.is_focused() && !session.is_hidden()
}

fn single_line_focused(session: &ConsoleSession) -> bool {
    focused(session) && !session.is_multiline()
}

/// Installs the builtin shortcuts listed by `:help`.
pub fn register_default_bindings(router: &mut KeyRouter<ConsoleSession>) {
    router.register(Chord::new(KEY_BACKTICK), |s: &mut ConsoleSession, _: &KeyEvent| {
        s.toggle_display();
        KeyResult::Handled
    });

    router.register(
        Chord::new(KEY_UP).ctrl().shift(),
        |s: &mut ConsoleSession, _: &KeyEvent| {
            if !focused(s) {
                return KeyResult::Ignored;
            }
            s.toggle_mode(None).into()
        },
    );

    router.register(
        Chord::new(KEY_DOWN).ctrl().shift(),
        |s: &mut ConsoleSession, _: &KeyEvent| {
            if !focused(s) {
                return KeyResult::Ignored;
            }
            s.toggle_resizable();
            KeyResult::Handled
        },
    );

    router.register(
        Chord::new(KEY_T).ctrl().alt(),
        |s: &mut ConsoleSession, _: &KeyEvent| s.toggle_transparency().into(),
    );

    router.register(Chord::new(KEY_UP).ctrl(), |s: &mut ConsoleSession, _: &KeyEvent| {
        if !focused(s) {
            return KeyResult::Ignored;
        }
        s.recall_prev();
        KeyResult::Handled
    });

    router.register(Chord::new(KEY_DOWN).ctrl(), |s: &mut ConsoleSession, _: &KeyEvent| {
        if !focused(s) {
            return KeyResult::Ignored;
        }
        s.recall_next();
        KeyResult::Handled
    });

    router.register(Chord::new(KEY_ENTER).ctrl(), |s: &mut ConsoleSession, _: &KeyEvent| {
        if !focused(s) {
            return KeyResult::Ignored;
        }
        s.run_input();
        KeyResult::Handled
    });

    router.register(Chord::new(KEY_UP), |s: &mut ConsoleSession, _: &KeyEvent| {
        if !single_line_focused(s) {
            return KeyResult::Ignored;
        }
        s.recall_prev();
        KeyResult::Handled
    });

    router.register(Chord::new(KEY_DOWN), |s: &mut ConsoleSession, _: &KeyEvent| {
        if !single_line_focused(s) {
            return KeyResult::Ignored;
        }
        s.recall_next();
        KeyResult::Handled
    });

    router.register(Chord::new(KEY_ENTER), |s: &mut ConsoleSession, _: &KeyEvent| {
        if !single_line_focused(s) {
            return KeyResult::Ignored;
        }
        s.run_input();
        KeyResult::Handled
    });
}
