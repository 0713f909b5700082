/// Events emitted during a simulation step.
/// The front-end consumes these for messages and the log.

use crate::domain::entity::Facing;

#[derive(Clone, Debug, PartialEq)]
pub enum GameEvent {
    CandyCollected { col: i32, row: i32, kind: char, points: u32 },
    BeamFired { col: i32, row: i32, facing: Facing, disabled: u32 },
    VillainDisabled { id: usize, until_ms: u64 },
    VillainWaking { id: usize },
    PlayerKilled { lives_left: u32 },
    LevelCleared { level: usize },
    GameOver { score: u32 },
}
