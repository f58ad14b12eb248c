use hare_formats::events::{
    EventLayout, FLAG_FROM_MAP, FLAG_MULTIPLAYER_ONLY, GENERATOR_FLAG_INITIALLY_CHARGED,
};

use super::generators::GeneratorRecord;
use super::kinds::{Difficulty, EventKind, InstantiationFlags, PlayerKind};
use super::spawn::LevelHost;
use super::{EventMap, EventMapError};

impl EventMap {
    /// Populates the map from a decoded layout. Generator cells are wired
    /// into the generator table and bypass difficulty filtering; every other
    /// cell is kept only if its flag byte is zero, or the selected difficulty
    /// bit is set and the multiplayer-only bit is clear.
    pub fn read_events(
        &mut self,
        layout: &EventLayout,
        difficulty: Difficulty,
        host: &mut dyn LevelHost,
    ) -> Result<(), EventMapError> {
        if layout.width != self.width || layout.height != self.height {
            return Err(EventMapError::LayoutMismatch {
                got_width: layout.width,
                got_height: layout.height,
                want_width: self.width,
                want_height: self.height,
            });
        }
        let expected = self.width as usize * self.height as usize;
        if layout.cells.len() != expected {
            return Err(EventMapError::CellCountMismatch {
                got: layout.cells.len(),
                want: expected,
            });
        }

        let difficulty_bit = difficulty.flag_bit();
        for y in 0..self.height {
            for x in 0..self.width {
                let cell = &layout.cells[(x + y * self.width) as usize];
                let kind = EventKind(cell.kind);
                let flags = InstantiationFlags(cell.flags & FLAG_FROM_MAP);

                if cell.is_generator() {
                    let generator_index = self.generators.len() as u16;
                    self.generators.push(GeneratorRecord::new(
                        (x + y * self.width) as usize,
                        kind,
                        cell.params,
                        cell.generator_delay,
                        cell.generator_flags & GENERATOR_FLAG_INITIALLY_CHARGED != 0,
                    ));
                    self.store_event(x, y, EventKind::GENERATOR, flags, &[generator_index]);
                    continue;
                }

                let kept = cell.flags == 0
                    || (cell.flags & (1 << difficulty_bit) != 0
                        && cell.flags & FLAG_MULTIPLAYER_ONLY == 0);
                if !kept {
                    continue;
                }

                match kind {
                    EventKind::EMPTY => {}
                    EventKind::LEVEL_START => {
                        for bit in 0..PlayerKind::COUNT {
                            if cell.params[0] & (1 << bit) != 0 {
                                self.add_spawn_position(PlayerKind(bit as u8), x, y);
                            }
                        }
                    }
                    EventKind::WARP_TARGET => self.add_warp_target(cell.params[0], x, y),
                    EventKind::LIGHT_RESET => {
                        let mut params = cell.params;
                        params[0] = host.ambient_light_default();
                        self.store_event(x, y, EventKind::LIGHT_SET, flags, &params);
                    }
                    kind if kind.is_tile_modifier() => {
                        self.store_event(x, y, kind, flags, &cell.params);
                        host.set_tile_event_flags(x, y, kind, &cell.params);
                    }
                    kind => self.store_event(x, y, kind, flags, &cell.params),
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use hare_formats::events::{
        EVENT_PARAM_COUNT, EventLayout, FLAG_GENERATOR, FLAG_MULTIPLAYER_ONLY, FLAG_NO_PARAMS,
        GENERATOR_FLAG_INITIALLY_CHARGED, RawEventCell,
    };
    use rand::SeedableRng;
    use rand_chacha::ChaCha8Rng;

    use super::super::{ABSENT_POSITION, EventMap, TICKS_PER_SECOND};
    use super::*;
    use crate::host::HeadlessHost;
    use crate::resources::ResourceNotifier;

    const ALL_DIFFICULTIES: u8 = 0x70;
    const HARD_ONLY: u8 = 0x40;

    fn plain_cell(kind: u16, flags: u8, first_param: u16) -> RawEventCell {
        let mut params = [0u16; EVENT_PARAM_COUNT];
        params[0] = first_param;
        RawEventCell {
            kind,
            flags,
            generator_flags: 0,
            generator_delay: 0,
            params,
        }
    }

    fn populated(layout: &EventLayout, difficulty: Difficulty) -> (EventMap, HeadlessHost) {
        let notifier = ResourceNotifier::new();
        let mut map =
            EventMap::new(&notifier, layout.width, layout.height).expect("sizing event map");
        let mut host = HeadlessHost::new().with_ambient_light(160);
        map.read_events(layout, difficulty, &mut host)
            .expect("populating event map");
        (map, host)
    }

    #[test]
    fn difficulty_filter_respects_flag_bits() {
        let mut layout = EventLayout::new(3, 1).unwrap();
        *layout.cell_mut(0, 0).unwrap() = plain_cell(100, HARD_ONLY, 0);

        let (easy, _) = populated(&layout, Difficulty::Easy);
        assert!(!easy.has_event(0, 0));
        let (normal, _) = populated(&layout, Difficulty::Normal);
        assert!(!normal.has_event(0, 0));
        let (hard, _) = populated(&layout, Difficulty::Hard);
        assert!(hard.has_event(0, 0));
    }

    #[test]
    fn zero_flag_cells_are_always_kept() {
        let mut layout = EventLayout::new(1, 1).unwrap();
        *layout.cell_mut(0, 0).unwrap() = plain_cell(100, 0, 0);

        for difficulty in [Difficulty::Easy, Difficulty::Normal, Difficulty::Hard] {
            let (map, _) = populated(&layout, difficulty);
            assert!(map.has_event(0, 0));
        }
    }

    #[test]
    fn multiplayer_only_cells_are_filtered() {
        let mut layout = EventLayout::new(1, 1).unwrap();
        *layout.cell_mut(0, 0).unwrap() =
            plain_cell(100, ALL_DIFFICULTIES | FLAG_MULTIPLAYER_ONLY, 0);

        let (map, _) = populated(&layout, Difficulty::Normal);
        assert!(!map.has_event(0, 0));
    }

    #[test]
    fn level_start_registers_player_spawn_positions() {
        let mut layout = EventLayout::new(4, 4).unwrap();
        *layout.cell_mut(2, 3).unwrap() =
            plain_cell(EventKind::LEVEL_START.0, ALL_DIFFICULTIES, 0b0101);

        let (map, _) = populated(&layout, Difficulty::Normal);
        // The start marker itself is not a stored cell.
        assert!(!map.has_event(2, 3));

        let mut rng = ChaCha8Rng::seed_from_u64(3);
        let expected = glam::Vec2::new(80.0, 104.0);
        assert_eq!(map.spawn_position(PlayerKind(0), &mut rng), expected);
        assert_eq!(map.spawn_position(PlayerKind(2), &mut rng), expected);
        assert_eq!(map.spawn_position(PlayerKind(1), &mut rng), ABSENT_POSITION);
        assert_eq!(map.spawn_position(PlayerKind(3), &mut rng), ABSENT_POSITION);
    }

    #[test]
    fn warp_targets_register_without_storing_a_cell() {
        let mut layout = EventLayout::new(4, 2).unwrap();
        *layout.cell_mut(1, 0).unwrap() =
            plain_cell(EventKind::WARP_TARGET.0, ALL_DIFFICULTIES, 7);

        let (map, _) = populated(&layout, Difficulty::Normal);
        assert!(!map.has_event(1, 0));

        let mut rng = ChaCha8Rng::seed_from_u64(11);
        assert_eq!(map.warp_target(7, &mut rng), glam::Vec2::new(48.0, 12.0));
    }

    #[test]
    fn light_reset_is_rewritten_with_the_ambient_default() {
        let mut layout = EventLayout::new(2, 1).unwrap();
        *layout.cell_mut(0, 0).unwrap() = plain_cell(EventKind::LIGHT_RESET.0, ALL_DIFFICULTIES, 0);

        let (map, _) = populated(&layout, Difficulty::Normal);
        let (kind, params) = map.event_at(0, 0);
        assert_eq!(kind, EventKind::LIGHT_SET);
        assert_eq!(params[0], 160);
    }

    #[test]
    fn tile_modifiers_are_stored_and_forwarded() {
        let mut layout = EventLayout::new(2, 2).unwrap();
        *layout.cell_mut(0, 1).unwrap() = plain_cell(EventKind::VINE.0, ALL_DIFFICULTIES, 0);
        *layout.cell_mut(1, 1).unwrap() = plain_cell(EventKind::HURT.0, ALL_DIFFICULTIES, 0);

        let (map, host) = populated(&layout, Difficulty::Normal);
        assert_eq!(map.event_at(0, 1).0, EventKind::VINE);
        assert_eq!(map.event_at(1, 1).0, EventKind::HURT);

        let forwarded: Vec<(i32, i32, u16)> = host
            .tile_flag_log
            .iter()
            .map(|record| (record.x, record.y, record.kind))
            .collect();
        assert_eq!(
            forwarded,
            vec![(0, 1, EventKind::VINE.0), (1, 1, EventKind::HURT.0)]
        );
    }

    #[test]
    fn generators_bypass_difficulty_filtering() {
        let mut layout = EventLayout::new(2, 1).unwrap();
        *layout.cell_mut(0, 0).unwrap() = RawEventCell {
            kind: 150,
            // No difficulty bits at all; still registered.
            flags: FLAG_GENERATOR | FLAG_NO_PARAMS,
            generator_flags: 0,
            generator_delay: 4,
            params: [0; EVENT_PARAM_COUNT],
        };

        let (map, _) = populated(&layout, Difficulty::Easy);
        assert_eq!(map.generator_count(), 1);
        assert_eq!(map.event_at(0, 0).0, EventKind::GENERATOR);
    }

    #[test]
    fn generator_cells_index_into_the_generator_table() {
        let mut layout = EventLayout::new(3, 1).unwrap();
        for x in 0..2 {
            *layout.cell_mut(x, 0).unwrap() = RawEventCell {
                kind: 150 + x as u16,
                flags: FLAG_GENERATOR | FLAG_NO_PARAMS,
                generator_flags: 0,
                generator_delay: 2,
                params: [0; EVENT_PARAM_COUNT],
            };
        }

        let (map, _) = populated(&layout, Difficulty::Normal);
        assert_eq!(map.generator_count(), 2);
        assert_eq!(map.event_at(0, 0).1[0], 0);
        assert_eq!(map.event_at(1, 0).1[0], 1);
    }

    #[test]
    fn initially_charged_generators_start_with_a_raw_delay() {
        let mut layout = EventLayout::new(2, 1).unwrap();
        *layout.cell_mut(0, 0).unwrap() = RawEventCell {
            kind: 150,
            flags: FLAG_GENERATOR | FLAG_NO_PARAMS,
            generator_flags: GENERATOR_FLAG_INITIALLY_CHARGED,
            generator_delay: 3,
            params: [0; EVENT_PARAM_COUNT],
        };
        *layout.cell_mut(1, 0).unwrap() = RawEventCell {
            kind: 151,
            flags: FLAG_GENERATOR | FLAG_NO_PARAMS,
            generator_flags: 0,
            generator_delay: 3,
            params: [0; EVENT_PARAM_COUNT],
        };

        let (map, _) = populated(&layout, Difficulty::Normal);
        let snapshot = map.generator_snapshot();
        assert_eq!(snapshot[0].time_left, 3.0);
        assert_eq!(snapshot[1].time_left, 0.0);
        // Rearm conversion happens at spawn time, not at decode time.
        assert!(snapshot[0].time_left < TICKS_PER_SECOND);
    }

    #[test]
    fn mismatched_layout_dimensions_fail_population() {
        let layout = EventLayout::new(4, 4).unwrap();
        let notifier = ResourceNotifier::new();
        let mut map = EventMap::new(&notifier, 4, 5).expect("sizing event map");
        let mut host = HeadlessHost::new();
        assert!(matches!(
            map.read_events(&layout, Difficulty::Normal, &mut host),
            Err(EventMapError::LayoutMismatch { .. })
        ));
    }
}
