//! Key chord normalisation and dispatch.
//!
//! A chord is the held modifiers, always in `CTRL`, `ALT`, `SHIFT` order,
//! followed by the numeric key code, joined with `+` (`CTRL+SHIFT+38`).
//! Handlers decide for themselves whether their preconditions (focus, mode)
//! hold; the router only looks the chord up and reports whether the default
//! action should be suppressed.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{ConsoleError, Result};

pub const KEY_TAB: u32 = 9;
pub const KEY_ENTER: u32 = 13;
pub const KEY_SHIFT: u32 = 16;
pub const KEY_CTRL: u32 = 17;
pub const KEY_ALT: u32 = 18;
pub const KEY_SPACE: u32 = 32;
pub const KEY_UP: u32 = 38;
pub const KEY_DOWN: u32 = 40;
pub const KEY_T: u32 = 84;
pub const KEY_BACKTICK: u32 = 192;

/// A key-down (or key-up) event as delivered by the host.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct KeyEvent {
    pub code: u32,
    pub ctrl: bool,
    pub alt: bool,
    pub shift: bool,
}

impl KeyEvent {
    pub fn new(code: u32) -> Self {
        Self {
            code,
            ..Self::default()
        }
    }

    pub fn with_ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn with_alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn with_shift(mut self) -> Self {
        self.shift = true;
        self
    }

    /// True for a bare Shift, Ctrl or Alt press.
    pub fn is_modifier(&self) -> bool {
        matches!(self.code, KEY_SHIFT | KEY_CTRL | KEY_ALT)
    }
}

/// A normalised key combination.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Chord {
    ctrl: bool,
    alt: bool,
    shift: bool,
    code: u32,
}

impl Chord {
    pub fn new(code: u32) -> Self {
        Self {
            ctrl: false,
            alt: false,
            shift: false,
            code,
        }
    }

    pub fn ctrl(mut self) -> Self {
        self.ctrl = true;
        self
    }

    pub fn alt(mut self) -> Self {
        self.alt = true;
        self
    }

    pub fn shift(mut self) -> Self {
        self.shift = true;
        self
    }

    pub fn code(&self) -> u32 {
        self.code
    }
}

impl From<&KeyEvent> for Chord {
    fn from(event: &KeyEvent) -> Self {
        Self {
            ctrl: event.ctrl,
            alt: event.alt,
            shift: event.shift,
            code: event.code,
        }
    }
}

impl fmt::Display for Chord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.ctrl {
            f.write_str("CTRL+")?;
        }
        if self.alt {
            f.write_str("ALT+")?;
        }
        if self.shift {
            f.write_str("SHIFT+")?;
        }
        write!(f, "{}", self.code)
    }
}

/// Parses `CTRL+SHIFT+38` style strings. Modifier tokens are accepted in any
/// order and case; the key code must come last.
impl FromStr for Chord {
    type Err = ConsoleError;

    fn from_str(s: &str) -> Result<Self> {
        let invalid = || ConsoleError::InvalidChord(s.to_string());
        let mut tokens: Vec<&str> = s.split('+').map(str::trim).collect();
        let code = tokens
            .pop()
            .and_then(|t| t.parse::<u32>().ok())
            .ok_or_else(invalid)?;

        let mut chord = Chord::new(code);
        for token in tokens {
            match token.to_ascii_uppercase().as_str() {
                "CTRL" => chord.ctrl = true,
                "ALT" => chord.alt = true,
                "SHIFT" => chord.shift = true,
                _ => return Err(invalid()),
            }
        }
        Ok(chord)
    }
}

/// What a handler did with an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyResult {
    /// The event was consumed; suppress the host's default action.
    Handled,
    /// Let the host's default action run.
    Ignored,
}

impl From<bool> for KeyResult {
    fn from(handled: bool) -> Self {
        if handled { Self::Handled } else { Self::Ignored }
    }
}

/// Outcome of routing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Dispatch {
    /// Bare modifier press; never routed.
    Modifier,
    /// No handler registered for the chord.
    Unbound,
    /// A handler ran and returned the given result.
    Ran(KeyResult),
}

impl Dispatch {
    pub fn prevents_default(&self) -> bool {
        matches!(self, Self::Ran(KeyResult::Handled))
    }
}

/// Boxed chord handler operating on a context `C`.
pub type KeyHandler<C> = Box<dyn FnMut(&mut C, &KeyEvent) -> KeyResult>;

/// Maps chords to handlers. Last registration for a chord wins.
pub struct KeyRouter<C> {
    bindings: HashMap<Chord, KeyHandler<C>>,
}

impl<C> KeyRouter<C> {
    pub fn new() -> Self {
        Self {
            bindings: HashMap::new(),
        }
    }

    /// Registers a handler, replacing any previous handler for the chord.
    pub fn register<F>(&mut self, chord: Chord, handler: F)
    where
        F: FnMut(&mut C, &KeyEvent) -> KeyResult + 'static,
    {
        if self.bindings.insert(chord, Box::new(handler)).is_some() {
            tracing::debug!(%chord, "Replaced key binding");
        }
    }

    /// Registers many handlers at once.
    pub fn register_all<I>(&mut self, bindings: I)
    where
        I: IntoIterator<Item = (Chord, KeyHandler<C>)>,
    {
        for (chord, handler) in bindings {
            self.bindings.insert(chord, handler);
        }
    }

    /// Registers a handler for a chord given in string form.
    pub fn register_str<F>(&mut self, chord: &str, handler: F) -> Result<()>
    where
        F: FnMut(&mut C, &KeyEvent) -> KeyResult + 'static,
    {
        let chord: Chord = chord.parse()?;
        self.register(chord, handler);
        Ok(())
    }

    pub fn is_bound(&self, chord: &Chord) -> bool {
        self.bindings.contains_key(chord)
    }

    pub fn len(&self) -> usize {
        self.bindings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bindings.is_empty()
    }

    /// Routes a key-down event to its handler.
    pub fn dispatch(&mut self, ctx: &mut C, event: &KeyEvent) -> Dispatch {
        if event.is_modifier() {
            return Dispatch::Modifier;
        }

        let chord = Chord::from(event);
        match self.bindings.get_mut(&chord) {
            Some(handler) => {
                let result = handler(ctx, event);
                tracing::trace!(%chord, ?result, "Key dispatched");
                Dispatch::Ran(result)
            }
            None => Dispatch::Unbound,
        }
    }
}

impl<C> Default for KeyRouter<C> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C> fmt::Debug for KeyRouter<C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut chords: Vec<String> = self.bindings.keys().map(|c| c.to_string()).collect();
        chords.sort();
        f.debug_struct("KeyRouter").field("chords", &chords).finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chord_string_form() {
        let event = KeyEvent::new(KEY_UP).with_shift().with_ctrl();
        assert_eq!(Chord::from(&event).to_string(), "CTRL+SHIFT+38");
        assert_eq!(Chord::new(KEY_BACKTICK).to_string(), "192");
        assert_eq!(Chord::new(KEY_T).shift().alt().ctrl().to_string(), "CTRL+ALT+SHIFT+84");
    }

    #[test]
    fn test_chord_parse_normalises_order() {
        let chord: Chord = "shift+CTRL+38".parse().unwrap();
        assert_eq!(chord, Chord::new(KEY_UP).ctrl().shift());
        assert_eq!(chord.to_string(), "CTRL+SHIFT+38");
    }

    #[test]
    fn test_chord_parse_rejects_garbage() {
        assert!("CTRL+UP".parse::<Chord>().is_err());
        assert!("META+13".parse::<Chord>().is_err());
        assert!("".parse::<Chord>().is_err());
    }

    #[test]
    fn test_dispatch_handled_prevents_default() {
        let mut router: KeyRouter<u32> = KeyRouter::new();
        router.register(Chord::new(KEY_ENTER), |count, _| {
            *count += 1;
            KeyResult::Handled
        });

        let mut count = 0;
        let outcome = router.dispatch(&mut count, &KeyEvent::new(KEY_ENTER));
        assert!(outcome.prevents_default());
        assert_eq!(count, 1);
    }

    #[test]
    fn test_dispatch_ignored_allows_default() {
        let mut router: KeyRouter<u32> = KeyRouter::new();
        router.register(Chord::new(KEY_ENTER), |_, _| KeyResult::Ignored);

        let outcome = router.dispatch(&mut 0, &KeyEvent::new(KEY_ENTER));
        assert_eq!(outcome, Dispatch::Ran(KeyResult::Ignored));
        assert!(!outcome.prevents_default());
    }

    #[test]
    fn test_modifier_alone_is_never_routed() {
        let mut router: KeyRouter<u32> = KeyRouter::new();
        router.register(Chord::new(KEY_CTRL).ctrl(), |_, _| KeyResult::Handled);

        let event = KeyEvent::new(KEY_CTRL).with_ctrl();
        assert_eq!(router.dispatch(&mut 0, &event), Dispatch::Modifier);
    }

    #[test]
    fn test_unbound_chord_is_noop() {
        let mut router: KeyRouter<u32> = KeyRouter::new();
        router.register(Chord::new(KEY_ENTER), |_, _| KeyResult::Handled);

        let event = KeyEvent::new(KEY_ENTER).with_shift();
        assert_eq!(router.dispatch(&mut 0, &event), Dispatch::Unbound);
    }

    #[test]
    fn test_last_registration_wins() {
        let mut router: KeyRouter<Vec<&str>> = KeyRouter::new();
        router.register_str("13", |log, _| {
            log.push("first");
            KeyResult::Handled
        })
        .unwrap();
        router.register_str("13", |log, _| {
            log.push("second");
            KeyResult::Handled
        })
        .unwrap();

        let mut log = Vec::new();
        router.dispatch(&mut log, &KeyEvent::new(KEY_ENTER));
        assert_eq!(log, vec!["second"]);
        assert_eq!(router.len(), 1);
    }

    #[test]
    fn test_register_all_bulk() {
        let mut router: KeyRouter<u32> = KeyRouter::new();
        let bindings: Vec<(Chord, KeyHandler<u32>)> = vec![
            (
                Chord::new(KEY_UP),
                Box::new(|_: &mut u32, _: &KeyEvent| KeyResult::Handled),
            ),
            (
                Chord::new(KEY_DOWN),
                Box::new(|_: &mut u32, _: &KeyEvent| KeyResult::Handled),
            ),
        ];
        router.register_all(bindings);

        assert!(router.is_bound(&Chord::new(KEY_UP)));
        assert!(router.is_bound(&Chord::new(KEY_DOWN)));
    }
}
