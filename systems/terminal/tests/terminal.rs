use proptest::prelude::*;
use tile_merge_core::{positions, Command, Direction, Event, GameConfig, TileValue};
use tile_merge_system_terminal::{moves_available, Terminal};
use tile_merge_world::{self as world, query, World};

fn world_from_values(size: u32, values: &[u32]) -> World {
    let config = GameConfig {
        size,
        ..GameConfig::default()
    };
    let mut world = World::new(config, 0).expect("valid config");
    let mut events = Vec::new();
    for (position, value) in positions(size).zip(values) {
        if let Some(value) = TileValue::new(*value) {
            world::apply(&mut world, Command::SpawnTile { position, value }, &mut events);
        }
    }
    world
}

fn any_move_applies(world: &World) -> bool {
    let size = query::config(world).size;
    let values: Vec<u32> = query::grid(world)
        .to_rows()
        .into_iter()
        .flatten()
        .map(|cell| cell.map_or(0, |tile| tile.value().get()))
        .collect();
    Direction::ALL.into_iter().any(|direction| {
        let mut probe = world_from_values(size, &values);
        let mut events = Vec::new();
        world::apply(&mut probe, Command::Move { direction }, &mut events);
        events
            .iter()
            .any(|event| matches!(event, Event::MoveApplied { .. }))
    })
}

#[test]
fn stuck_board_is_declared_over() {
    let world = world_from_values(4, &[
        2, 4, 2, 4, //
        4, 2, 4, 2, //
        2, 4, 2, 4, //
        4, 2, 4, 2,
    ]);
    let events = vec![Event::TileSpawned {
        tile: query::grid(&world)
            .tiles()
            .next()
            .cloned()
            .expect("grid is full"),
    }];

    let mut commands = Vec::new();
    Terminal::new().handle(&events, query::grid_view(&world), &mut commands);
    assert_eq!(commands, vec![Command::DeclareGameOver]);
}

#[test]
fn full_board_with_adjacent_pair_is_not_over() {
    let world = world_from_values(4, &[
        2, 4, 2, 4, //
        4, 2, 4, 2, //
        2, 4, 2, 4, //
        4, 2, 4, 4,
    ]);
    assert!(query::grid(&world).is_full());
    assert!(moves_available(query::grid_view(&world)));
}

#[test]
fn unrelated_events_are_ignored() {
    let world = world_from_values(2, &[2, 4, 4, 2]);
    let mut commands = Vec::new();
    Terminal::new().handle(&[Event::UndoApplied], query::grid_view(&world), &mut commands);
    assert!(commands.is_empty());
}

proptest! {
    #[test]
    fn detection_agrees_with_trying_every_move(
        values in prop::collection::vec(prop_oneof![Just(0u32), Just(2), Just(4), Just(8)], 9)
    ) {
        prop_assume!(values.iter().any(|value| *value != 0));
        let world = world_from_values(3, &values);
        prop_assert_eq!(moves_available(query::grid_view(&world)), any_move_applies(&world));
    }
}
