/// Tile codes and their properties.
/// Properties are queried via methods, not stored as flags,
/// so tile semantics are centralized here.

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Tile {
    #[default]
    Empty,
    Floor,       // Walkable on top, blocks lateral entry at the same row
    LadderTop,   // Floor/ladder transition
    Ladder,      // Shaft: climbable, no lateral movement
    ExitUp,      // Ladder exit upward marker
    ExitDown,    // Ladder exit downward marker
    ExitBoth,    // Ladder special, exit both ways
    Barrier,     // One-way lateral barrier
    Candy(char), // Pickup target, removed by the scanner
    OutOfBounds, // Sentinel returned for lookups outside the grid
}

impl Tile {
    /// Decode a terrain character. Returns None for characters with no terrain
    /// meaning (candy, spawn markers, unknown glyphs).
    pub fn from_code(ch: char) -> Option<Self> {
        let tile = match ch {
            ' ' => Tile::Empty,
            'F' => Tile::Floor,
            'T' => Tile::LadderTop,
            'L' => Tile::Ladder,
            'U' => Tile::ExitUp,
            'D' => Tile::ExitDown,
            'E' => Tile::ExitBoth,
            'B' => Tile::Barrier,
            '~' => Tile::OutOfBounds,
            _ => return None,
        };
        Some(tile)
    }

    /// Decode a map character where `is_candy` names the collectible glyphs.
    /// Terrain codes win over candy.
    pub fn decode(ch: char, is_candy: impl Fn(char) -> bool) -> Option<Self> {
        Tile::from_code(ch).or_else(|| is_candy(ch).then_some(Tile::Candy(ch)))
    }

    /// Characters a level file already gives a meaning to.
    pub fn is_reserved_code(ch: char) -> bool {
        Tile::from_code(ch).is_some() || matches!(ch, 'P' | 'V')
    }

    pub fn code(self) -> char {
        match self {
            Tile::Empty => ' ',
            Tile::Floor => 'F',
            Tile::LadderTop => 'T',
            Tile::Ladder => 'L',
            Tile::ExitUp => 'U',
            Tile::ExitDown => 'D',
            Tile::ExitBoth => 'E',
            Tile::Barrier => 'B',
            Tile::Candy(c) => c,
            Tile::OutOfBounds => '~',
        }
    }

    pub fn is_floor(self) -> bool {
        matches!(self, Tile::Floor)
    }

    /// Any tile through which vertical climbing is possible.
    pub fn is_ladder_family(self) -> bool {
        matches!(
            self,
            Tile::Ladder | Tile::ExitUp | Tile::ExitDown | Tile::ExitBoth | Tile::LadderTop
        )
    }

    /// Ladder tiles proper, excluding the ladder top.
    pub fn is_ladder(self) -> bool {
        matches!(self, Tile::Ladder | Tile::ExitUp | Tile::ExitDown | Tile::ExitBoth)
    }

    /// Can an actor climb upward into this tile? Floor is explicitly excluded.
    pub fn accepts_climb_up(self) -> bool {
        self.is_ladder_family()
    }

    /// Does standing on this tile allow stepping downward regardless of what is below?
    pub fn allows_descent(self) -> bool {
        matches!(self, Tile::ExitDown | Tile::ExitBoth)
    }

    /// Does this tile, when directly below, let an actor step down onto it?
    pub fn supports_descent_into(self) -> bool {
        matches!(self, Tile::Ladder | Tile::ExitBoth | Tile::ExitUp | Tile::Floor)
    }

    /// Tiles where combat and contact checks do not apply.
    pub fn is_combat_ineligible(self) -> bool {
        self.is_ladder_family()
    }

    pub fn is_candy(self) -> bool {
        matches!(self, Tile::Candy(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ladder_family_membership() {
        for code in ['L', 'U', 'D', 'E', 'T'] {
            assert!(Tile::from_code(code).unwrap().is_ladder_family(), "{code}");
        }
        for code in [' ', 'F', 'B', '~'] {
            assert!(!Tile::from_code(code).unwrap().is_ladder_family(), "{code}");
        }
        assert!(!Tile::Candy('$').is_ladder_family());
    }

    #[test]
    fn floor_is_not_climbable_into() {
        assert!(!Tile::Floor.accepts_climb_up());
        assert!(Tile::LadderTop.accepts_climb_up());
    }

    #[test]
    fn spawn_markers_have_no_tile() {
        assert_eq!(Tile::from_code('P'), None);
        assert_eq!(Tile::from_code('V'), None);
        assert_eq!(Tile::from_code('$'), None);
    }

    #[test]
    fn candy_glyphs_come_from_the_caller() {
        let stars = |c: char| c == '*';
        assert_eq!(Tile::decode('*', stars), Some(Tile::Candy('*')));
        assert_eq!(Tile::decode('$', stars), None);
        // A terrain code never turns into candy
        assert_eq!(Tile::decode('F', |_| true), Some(Tile::Floor));
        assert!(Tile::is_reserved_code('P'));
        assert!(!Tile::is_reserved_code('*'));
    }
}
