/// Presentation layer: double-buffered, diff-based terminal renderer.
///
/// How it works:
///   1. Build the next frame into the `front` buffer (array of Cell)
///   2. Compare each cell with the `back` buffer (previous frame)
///   3. Only emit terminal commands for cells that changed
///   4. All commands are batched with `queue!`, flushed once at the end
///   5. Swap front/back
///
/// Each grid tile takes two terminal columns. Actors are drawn on the tile
/// their position rounds to, so the picture matches what the simulation
/// sees.

use std::io::{self, BufWriter, Write};

use crossterm::{
    cursor::{self, MoveTo},
    event::{KeyboardEnhancementFlags, PopKeyboardEnhancementFlags, PushKeyboardEnhancementFlags},
    execute, queue,
    style::{Color, Print, ResetColor, SetBackgroundColor, SetForegroundColor},
    terminal::{self, Clear, ClearType},
};

use crate::domain::combat::Combatant;
use crate::domain::entity::Facing;
use crate::domain::grid::TilePos;
use crate::domain::tile::Tile;
use crate::sim::world::{Phase, WorldState};

// ── Cell: the unit of the back-buffer ──

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
struct Cell {
    ch: char,
    fg: Color,
    bg: Color,
}

impl Cell {
    const BASE_BG: Color = Color::Rgb { r: 22, g: 22, b: 35 };

    const BLANK: Cell = Cell { ch: ' ', fg: Color::White, bg: Cell::BASE_BG };

    /// Differs from every real cell, so the next diff repaints everything.
    const INVALID: Cell = Cell { ch: '?', fg: Color::Magenta, bg: Color::Magenta };

    fn new(ch: char, fg: Color, bg: Color) -> Self {
        let bg = match bg {
            Color::Reset => Self::BASE_BG,
            other => other,
        };
        Cell { ch, fg, bg }
    }
}

// ── FrameBuffer: a 2D grid of Cells ──

struct FrameBuffer {
    width: usize,
    height: usize,
    cells: Vec<Cell>,
}

impl FrameBuffer {
    fn new(w: usize, h: usize) -> Self {
        FrameBuffer { width: w, height: h, cells: vec![Cell::BLANK; w * h] }
    }

    fn resize(&mut self, w: usize, h: usize) {
        if self.width != w || self.height != h {
            self.width = w;
            self.height = h;
            self.cells = vec![Cell::BLANK; w * h];
        }
    }

    fn clear(&mut self) {
        self.cells.fill(Cell::BLANK);
    }

    fn set(&mut self, x: usize, y: usize, cell: Cell) {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x] = cell;
        }
    }

    fn get(&self, x: usize, y: usize) -> Cell {
        if x < self.width && y < self.height {
            self.cells[y * self.width + x]
        } else {
            Cell::BLANK
        }
    }

    fn put_str(&mut self, x: usize, y: usize, s: &str, fg: Color, bg: Color) {
        for (i, ch) in s.chars().enumerate() {
            if x + i >= self.width { break; }
            self.set(x + i, y, Cell::new(ch, fg, bg));
        }
    }

    /// Two-column glyph for grid tile `pos`.
    fn put_tile(&mut self, pos: TilePos, glyph: [char; 2], fg: Color, bg: Color) {
        if pos.col < 0 || pos.row < 0 { return; }
        let col = pos.col as usize * CELL_W;
        let row = MAP_ROW + pos.row as usize;
        self.set(col, row, Cell::new(glyph[0], fg, bg));
        self.set(col + 1, row, Cell::new(glyph[1], fg, bg));
    }
}

// ── Renderer ──

const CELL_W: usize = 2;

const HUD_ROW: usize = 0;
const MAP_ROW: usize = 2;

const HUD_BG: Color = Color::Rgb { r: 60, g: 20, b: 60 };
const MSG_BG: Color = Color::Rgb { r: 230, g: 150, b: 200 };

pub struct Renderer {
    writer: BufWriter<io::Stdout>,
    front: FrameBuffer,
    back: FrameBuffer,
    term_w: usize,
    term_h: usize,
    last_phase: Option<Phase>,
    /// Terminal reports key releases (kitty keyboard protocol).
    key_release: bool,
}

impl Renderer {
    pub fn new() -> Self {
        Renderer {
            writer: BufWriter::with_capacity(16384, io::stdout()),
            front: FrameBuffer::new(0, 0),
            back: FrameBuffer::new(0, 0),
            term_w: 0,
            term_h: 0,
            last_phase: None,
            key_release: false,
        }
    }

    pub fn init(&mut self) -> io::Result<()> {
        terminal::enable_raw_mode()?;
        execute!(
            self.writer,
            terminal::EnterAlternateScreen,
            cursor::Hide,
            SetBackgroundColor(Cell::BASE_BG),
            Clear(ClearType::All)
        )?;
        if terminal::supports_keyboard_enhancement().unwrap_or(false) {
            execute!(
                self.writer,
                PushKeyboardEnhancementFlags(KeyboardEnhancementFlags::REPORT_EVENT_TYPES)
            )?;
            self.key_release = true;
        }
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        self.resize(tw as usize, th as usize);
        Ok(())
    }

    /// Whether key Release events can be trusted after `init`.
    pub fn reports_key_release(&self) -> bool {
        self.key_release
    }

    pub fn cleanup(&mut self) -> io::Result<()> {
        if self.key_release {
            execute!(self.writer, PopKeyboardEnhancementFlags)?;
            self.key_release = false;
        }
        execute!(self.writer, ResetColor, cursor::Show, terminal::LeaveAlternateScreen)?;
        terminal::disable_raw_mode()
    }

    fn resize(&mut self, w: usize, h: usize) {
        self.term_w = w;
        self.term_h = h;
        self.front.resize(w, h);
        self.back.resize(w, h);
        self.back.cells.fill(Cell::INVALID);
    }

    pub fn render(&mut self, world: &WorldState, now_ms: u64) -> io::Result<()> {
        let (tw, th) = terminal::size().unwrap_or((80, 24));
        let phase_changed = self.last_phase != Some(world.phase);
        if tw as usize != self.term_w || th as usize != self.term_h || phase_changed {
            self.resize(tw as usize, th as usize);
            self.last_phase = Some(world.phase);
            queue!(self.writer, SetBackgroundColor(Cell::BASE_BG), Clear(ClearType::All))?;
        }

        self.front.clear();
        compose(&mut self.front, world, now_ms);
        self.flush_diff()?;
        std::mem::swap(&mut self.front, &mut self.back);
        Ok(())
    }

    // ── Diff flush: only write changed cells ──

    fn flush_diff(&mut self) -> io::Result<()> {
        let mut last_fg = Color::White;
        let mut last_bg = Cell::BASE_BG;
        let mut cursor_at: Option<(usize, usize)> = None;

        queue!(self.writer, SetForegroundColor(last_fg), SetBackgroundColor(last_bg))?;

        for y in 0..self.front.height {
            for x in 0..self.front.width {
                let cell = self.front.get(x, y);
                if cell == self.back.get(x, y) { continue; }

                if cursor_at != Some((x, y)) {
                    queue!(self.writer, MoveTo(x as u16, y as u16))?;
                }
                if cell.fg != last_fg {
                    queue!(self.writer, SetForegroundColor(cell.fg))?;
                    last_fg = cell.fg;
                }
                if cell.bg != last_bg {
                    queue!(self.writer, SetBackgroundColor(cell.bg))?;
                    last_bg = cell.bg;
                }
                queue!(self.writer, Print(cell.ch))?;
                cursor_at = Some((x + 1, y));
            }
        }

        self.writer.flush()
    }
}

// ── Compose: build front buffer content ──

fn compose(buf: &mut FrameBuffer, w: &WorldState, now_ms: u64) {
    compose_hud(buf, w, now_ms);
    compose_map(buf, w);
    compose_beams(buf, w, now_ms);
    compose_villains(buf, w, now_ms);
    compose_player(buf, w);

    let below = MAP_ROW + w.grid.height() + 1;
    if !w.message.is_empty() {
        let msg = format!(" {} ", w.message);
        for x in 0..buf.width {
            buf.set(x, below, Cell::new(' ', Color::Black, MSG_BG));
        }
        buf.put_str(0, below, &msg, Color::Black, MSG_BG);
    }
    let help = match w.phase {
        Phase::Playing => " Arrows/WASD: Move   Space: Beam   Q/Esc: Quit",
        Phase::LevelComplete => " Enter: Next level   Q/Esc: Quit",
        Phase::GameOver => " Enter: New game   Q/Esc: Quit",
    };
    buf.put_str(0, below + 2, help, Color::DarkGrey, Color::Reset);
}

fn compose_hud(buf: &mut FrameBuffer, w: &WorldState, now_ms: u64) {
    let hud = format!(
        " Level {:<2} {:<18} Score:{:<7} Lives:{}  Candy:{:<3} Villains:{}/{}  Speed x{:.2} ",
        w.current_level + 1, w.level_name, w.score, w.lives, w.candies_left(),
        w.active_villains(now_ms), w.villains.len(), w.speed_multiplier(),
    );
    for x in 0..buf.width {
        buf.set(x, HUD_ROW, Cell::new(' ', Color::White, HUD_BG));
    }
    buf.put_str(0, HUD_ROW, &hud, Color::White, HUD_BG);
}

fn compose_map(buf: &mut FrameBuffer, w: &WorldState) {
    for row in 0..w.grid.height() as i32 {
        for col in 0..w.grid.width() as i32 {
            let pos = TilePos::new(col, row);
            let (glyph, fg, bg) = tile_glyph(w.grid.tile(pos));
            buf.put_tile(pos, glyph, fg, bg);
        }
    }
}

fn tile_glyph(tile: Tile) -> ([char; 2], Color, Color) {
    let ladder = Color::Rgb { r: 100, g: 200, b: 255 };
    match tile {
        Tile::Empty => ([' ', ' '], Color::Reset, Color::Reset),
        Tile::Floor => (['▀', '▀'], Color::Rgb { r: 200, g: 120, b: 180 }, Color::Rgb { r: 90, g: 40, b: 80 }),
        Tile::LadderTop => (['╤', '╤'], ladder, Color::Rgb { r: 90, g: 40, b: 80 }),
        Tile::Ladder => (['╠', '╣'], ladder, Color::Reset),
        Tile::ExitUp => (['╔', '╗'], ladder, Color::Reset),
        Tile::ExitDown => (['╚', '╝'], ladder, Color::Reset),
        Tile::ExitBoth => (['╬', '╬'], ladder, Color::Reset),
        Tile::Barrier => (['▐', '▌'], Color::Rgb { r: 255, g: 200, b: 60 }, Color::Reset),
        Tile::Candy(c) => ([c, ' '], candy_color(c), Color::Reset),
        Tile::OutOfBounds => ([' ', ' '], Color::Reset, Color::Reset),
    }
}

fn candy_color(c: char) -> Color {
    match c {
        '@' => Color::Rgb { r: 255, g: 120, b: 120 },
        '!' => Color::Rgb { r: 120, g: 255, b: 160 },
        '#' => Color::Rgb { r: 140, g: 160, b: 255 },
        _ => Color::Rgb { r: 255, g: 230, b: 90 },
    }
}

fn compose_beams(buf: &mut FrameBuffer, w: &WorldState, now_ms: u64) {
    let duration = w.tuning.combat.beam_duration_ms;
    for beam in &w.beams {
        let a = beam.alpha(now_ms, duration);
        if a == 0 { continue; }
        let fg = Color::Rgb { r: a, g: a, b: 255 };
        for &pos in &beam.tiles {
            if w.grid.in_bounds(pos.col, pos.row) {
                buf.put_tile(pos, ['═', '═'], fg, Color::Reset);
            }
        }
    }
}

fn compose_villains(buf: &mut FrameBuffer, w: &WorldState, now_ms: u64) {
    let t = w.tile_size();
    let warning = w.tuning.combat.wake_warning_ms;
    for v in &w.villains {
        let pos = v.body.tile_position(t);
        let glyph = match v.body.facing {
            Facing::Left => ['<', 'V'],
            Facing::Right => ['V', '>'],
        };
        let fg = match v.hits.disabled_until() {
            Some(until) if v.is_disabled(now_ms) => {
                let waking = until.saturating_sub(now_ms) <= warning;
                if waking && (now_ms / 125) % 2 == 0 {
                    Color::Rgb { r: 255, g: 80, b: 80 }
                } else {
                    Color::DarkGrey
                }
            }
            _ => Color::Rgb { r: 255, g: 80, b: 80 },
        };
        buf.put_tile(pos, glyph, fg, Color::Reset);
    }
}

fn compose_player(buf: &mut FrameBuffer, w: &WorldState) {
    let p = &w.player;
    let pos = p.body.tile_position(w.tile_size());
    let glyph = if p.is_dying() {
        const SPIN: [char; 4] = ['|', '/', '-', '\\'];
        let frame = (p.spin_angle / 45.0) as usize % SPIN.len();
        [SPIN[frame], ' ']
    } else {
        match p.body.facing {
            Facing::Left => ['<', 'P'],
            Facing::Right => ['P', '>'],
        }
    };
    buf.put_tile(pos, glyph, Color::Rgb { r: 120, g: 255, b: 255 }, Color::Reset);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Tuning;
    use crate::sim::level::{load_level, LevelDef};

    fn row_text(buf: &FrameBuffer, row: usize, cols: usize) -> String {
        (0..cols.min(buf.width)).map(|x| buf.get(x, row).ch).collect()
    }

    #[test]
    fn frame_shows_tiles_and_actors_on_rounded_tiles() {
        let mut world = WorldState::new(Tuning::default());
        let def = LevelDef::parse("# Test\nP $ V\nFFTFF", "t").unwrap();
        load_level(&mut world, &[def], 0).unwrap();
        world.player.body.x = 17.0; // rounds to column 1

        let mut buf = FrameBuffer::new(40, 10);
        compose(&mut buf, &world, 0);

        assert_eq!(row_text(&buf, MAP_ROW, 10), "  P>$   V>");
        assert_eq!(row_text(&buf, MAP_ROW + 1, 10), "▀▀▀▀╤╤▀▀▀▀");
        assert!(row_text(&buf, HUD_ROW, 40).contains("Score:0"));
    }

    #[test]
    fn disabled_villain_is_dimmed() {
        let mut world = WorldState::new(Tuning::default());
        let def = LevelDef::parse("P V $\nFFFFF", "t").unwrap();
        load_level(&mut world, &[def], 0).unwrap();
        for t in [0, 1, 2] {
            world.villains[0].register_hit(t, &world.tuning.combat);
        }
        let mut buf = FrameBuffer::new(20, 8);
        compose(&mut buf, &world, 100);
        assert_eq!(buf.get(2 * CELL_W, MAP_ROW).fg, Color::DarkGrey);
    }
}
