/// Keyboard state for the game loop.
///
/// Movement follows held keys; fire, confirm and quit are edge-triggered
/// so holding space does not drain the beam every tick. Terminals that
/// never report key releases fall back to a hold timeout.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use crossterm::event::{self, poll, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};

use crate::domain::entity::{FrameInput, MoveDir};

/// After this long without a Press/Repeat event a key counts as released.
const HOLD_TIMEOUT: Duration = Duration::from_millis(160);

const KEYS_LEFT: &[KeyCode] = &[KeyCode::Left, KeyCode::Char('a'), KeyCode::Char('A')];
const KEYS_RIGHT: &[KeyCode] = &[KeyCode::Right, KeyCode::Char('d'), KeyCode::Char('D')];
const KEYS_UP: &[KeyCode] = &[KeyCode::Up, KeyCode::Char('w'), KeyCode::Char('W')];
const KEYS_DOWN: &[KeyCode] = &[KeyCode::Down, KeyCode::Char('s'), KeyCode::Char('S')];
const KEYS_FIRE: &[KeyCode] = &[KeyCode::Char(' '), KeyCode::Char('f'), KeyCode::Char('F')];
const KEYS_CONFIRM: &[KeyCode] = &[KeyCode::Enter];
const KEYS_QUIT: &[KeyCode] = &[KeyCode::Esc, KeyCode::Char('q'), KeyCode::Char('Q')];

pub struct InputState {
    /// Last Press/Repeat per key.
    last_active: HashMap<KeyCode, Instant>,
    /// Keys that went from released to held during the last drain.
    fresh_presses: Vec<KeyCode>,
    ctrl_c: bool,
    /// Only trust Release events once keyboard enhancement is confirmed.
    honor_release: bool,
}

impl InputState {
    /// `honor_release` is true when the terminal reports key releases;
    /// otherwise keys are released by the hold timeout.
    pub fn new(honor_release: bool) -> Self {
        InputState {
            last_active: HashMap::with_capacity(16),
            fresh_presses: Vec::with_capacity(8),
            ctrl_c: false,
            honor_release,
        }
    }

    /// Drain pending terminal events. Call once per frame before the tick.
    pub fn drain_events(&mut self) {
        self.begin_frame();
        while poll(Duration::ZERO).unwrap_or(false) {
            if let Ok(Event::Key(key)) = event::read() {
                self.apply(key, Instant::now());
            }
        }
        self.expire(Instant::now());
    }

    fn begin_frame(&mut self) {
        self.fresh_presses.clear();
        self.ctrl_c = false;
    }

    fn apply(&mut self, key: KeyEvent, now: Instant) {
        if key.modifiers.contains(KeyModifiers::CONTROL)
            && matches!(key.code, KeyCode::Char('c') | KeyCode::Char('C'))
        {
            self.ctrl_c = true;
            return;
        }
        match key.kind {
            KeyEventKind::Release if self.honor_release => {
                self.last_active.remove(&key.code);
            }
            KeyEventKind::Release => {}
            _ => {
                let was_held = self.held_at(key.code, now);
                self.last_active.insert(key.code, now);
                if !was_held {
                    self.fresh_presses.push(key.code);
                }
            }
        }
    }

    fn expire(&mut self, now: Instant) {
        self.last_active.retain(|_, t| now.duration_since(*t) < HOLD_TIMEOUT);
    }

    fn held_at(&self, code: KeyCode, now: Instant) -> bool {
        self.last_active.get(&code)
            .map_or(false, |t| now.duration_since(*t) < HOLD_TIMEOUT)
    }

    fn any_held(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.last_active.contains_key(c))
    }

    fn any_pressed(&self, codes: &[KeyCode]) -> bool {
        codes.iter().any(|c| self.fresh_presses.contains(c))
    }

    /// Movement direction from held keys. Vertical wins over horizontal so
    /// a diagonal press still climbs.
    pub fn movement(&self) -> Option<MoveDir> {
        let active = |keys: &[KeyCode]| self.any_held(keys) || self.any_pressed(keys);
        if active(KEYS_UP) {
            Some(MoveDir::Up)
        } else if active(KEYS_DOWN) {
            Some(MoveDir::Down)
        } else if active(KEYS_LEFT) {
            Some(MoveDir::Left)
        } else if active(KEYS_RIGHT) {
            Some(MoveDir::Right)
        } else {
            None
        }
    }

    pub fn frame_input(&self) -> FrameInput {
        FrameInput {
            movement: self.movement(),
            fire: self.any_pressed(KEYS_FIRE),
        }
    }

    pub fn confirm_pressed(&self) -> bool {
        self.any_pressed(KEYS_CONFIRM)
    }

    pub fn quit_requested(&self) -> bool {
        self.ctrl_c || self.any_pressed(KEYS_QUIT)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn press(code: KeyCode) -> KeyEvent {
        KeyEvent::new(code, KeyModifiers::NONE)
    }

    #[test]
    fn held_key_moves_and_fire_is_edge_triggered() {
        let mut input = InputState::new(false);
        let t0 = Instant::now();

        input.begin_frame();
        input.apply(press(KeyCode::Right), t0);
        input.apply(press(KeyCode::Char(' ')), t0);
        let first = input.frame_input();
        assert_eq!(first.movement, Some(MoveDir::Right));
        assert!(first.fire);

        // Key repeat on the next frame: still moving, no second shot
        let t1 = t0 + Duration::from_millis(50);
        input.begin_frame();
        input.apply(press(KeyCode::Right), t1);
        input.apply(press(KeyCode::Char(' ')), t1);
        input.expire(t1);
        let second = input.frame_input();
        assert_eq!(second.movement, Some(MoveDir::Right));
        assert!(!second.fire);
    }

    #[test]
    fn keys_expire_without_release_events() {
        let mut input = InputState::new(false);
        let t0 = Instant::now();
        input.begin_frame();
        input.apply(press(KeyCode::Char('a')), t0);
        input.begin_frame();
        input.expire(t0 + HOLD_TIMEOUT);
        assert_eq!(input.movement(), None);
    }

    #[test]
    fn release_events_count_only_when_reported() {
        let t0 = Instant::now();
        let release = KeyEvent::new_with_kind(KeyCode::Left, KeyModifiers::NONE, KeyEventKind::Release);

        let mut input = InputState::new(true);
        input.apply(press(KeyCode::Left), t0);
        input.apply(release, t0);
        assert_eq!(input.movement(), Some(MoveDir::Left)); // pressed this frame
        input.begin_frame();
        assert_eq!(input.movement(), None);

        let mut input = InputState::new(false);
        input.apply(press(KeyCode::Left), t0);
        input.apply(release, t0);
        input.begin_frame();
        assert_eq!(input.movement(), Some(MoveDir::Left)); // held until timeout
    }

    #[test]
    fn vertical_wins_over_horizontal() {
        let mut input = InputState::new(false);
        let t0 = Instant::now();
        input.begin_frame();
        input.apply(press(KeyCode::Left), t0);
        input.apply(press(KeyCode::Char('w')), t0);
        assert_eq!(input.movement(), Some(MoveDir::Up));
    }

    #[test]
    fn ctrl_c_and_escape_quit() {
        let mut input = InputState::new(false);
        let t0 = Instant::now();
        input.begin_frame();
        input.apply(KeyEvent::new(KeyCode::Char('c'), KeyModifiers::CONTROL), t0);
        assert!(input.quit_requested());
        assert_eq!(input.movement(), None);

        input.begin_frame();
        assert!(!input.quit_requested());
        input.apply(press(KeyCode::Esc), t0);
        assert!(input.quit_requested());
    }
}
