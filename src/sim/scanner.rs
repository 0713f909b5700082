/// Candy scanner: picks up the candy under the player.

use log::debug;

use crate::domain::tile::Tile;
use super::event::GameEvent;
use super::world::WorldState;

/// Remove and score the candy on the player's tile, if any.
pub fn scan(world: &mut WorldState, events: &mut Vec<GameEvent>) {
    if world.player.is_dying() { return; }
    let pos = world.player.body.tile_position(world.tile_size());
    let kind = match world.grid.tile(pos) {
        Tile::Candy(c) => c,
        _ => return,
    };

    world.grid.set_tile(pos, Tile::Empty);
    let points = world.tuning.candy.score_for(kind);
    world.score += points;
    debug!("candy {kind:?} at {pos:?} +{points}, {} left", world.candies_left());
    events.push(GameEvent::CandyCollected { col: pos.col, row: pos.row, kind, points });
}
