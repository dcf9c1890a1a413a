use std::collections::HashSet;

use winit::event::VirtualKeyCode;

/// What a keypress means to the demo.
#[derive(Debug, PartialEq, Eq, Clone, Copy)]
pub enum Action {
    /// Escape: shut down.
    Exit,
    /// Anything else: bark and toggle the spin.
    Poke,
}

/// Tracks held keys so OS auto-repeat only fires an action once per press.
/// winit 0.28 does not expose the repeat flag, hence the bookkeeping.
#[derive(Default)]
pub struct Keyboard {
    held: HashSet<VirtualKeyCode>,
}

impl Keyboard {
    pub fn press(&mut self, key: VirtualKeyCode) -> Option<Action> {
        if !self.held.insert(key) {
            // Still held from an earlier press, this is a repeat.
            return None;
        }
        match key {
            VirtualKeyCode::Escape => Some(Action::Exit),
            _ => Some(Action::Poke),
        }
    }

    pub fn release(&mut self, key: VirtualKeyCode) {
        self.held.remove(&key);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escape_exits_everything_else_pokes() {
        let mut keyboard = Keyboard::default();
        assert_eq!(keyboard.press(VirtualKeyCode::Escape), Some(Action::Exit));
        assert_eq!(keyboard.press(VirtualKeyCode::Space), Some(Action::Poke));
        assert_eq!(keyboard.press(VirtualKeyCode::B), Some(Action::Poke));
    }

    #[test]
    fn holding_a_key_fires_once() {
        let mut keyboard = Keyboard::default();
        assert_eq!(keyboard.press(VirtualKeyCode::Space), Some(Action::Poke));
        assert_eq!(keyboard.press(VirtualKeyCode::Space), None);
        assert_eq!(keyboard.press(VirtualKeyCode::Space), None);
    }

    #[test]
    fn releasing_rearms_the_key() {
        let mut keyboard = Keyboard::default();
        assert_eq!(keyboard.press(VirtualKeyCode::Space), Some(Action::Poke));
        keyboard.release(VirtualKeyCode::Space);
        assert_eq!(keyboard.press(VirtualKeyCode::Space), Some(Action::Poke));
    }

    #[test]
    fn keys_are_tracked_independently(){
        let mut keyboard = Keyboard::default();
        assert_eq!(keyboard.press(VirtualKeyCode::A), Some(Action::Poke));
        assert_eq!(keyboard.press(VirtualKeyCode::S), Some(Action::Poke));
        keyboard.release(VirtualKeyCode::A);
        assert_eq!(keyboard.press(VirtualKeyCode::S), None);
        assert_eq!(keyboard.press(VirtualKeyCode::A), Some(Action::Poke));
    }
}
