//! End-to-end inventory flows: walls, cases, drawers, templates, events.

use partwall_grid::{LayoutTemplate, PlacementFailure, Region, RejectionCode, TemplateDrawer};
use partwall_inventory::{
    DrawerShape, Inventory, InventoryChange, InventoryConfig, InventoryError, NewCase, SessionId,
    Slot,
};

const ALICE: SessionId = SessionId(1);
const BOB: SessionId = SessionId(2);

fn inventory() -> Inventory {
    Inventory::new(InventoryConfig::default())
}

fn units(width: u16, height: u16) -> DrawerShape {
    DrawerShape::Units { width, height }
}

fn rejection_code(err: &InventoryError) -> Option<RejectionCode> {
    match err {
        InventoryError::Placement(err) => err.rejection().map(|r| r.code()),
        _ => None,
    }
}

#[test]
fn case_drawer_walkthrough_matches_engine_verdicts() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "garage", Some(8)).unwrap();
    let case = inv
        .place_case(ALICE, wall, NewCase::new("akro", 2, 2).with_grid(4, 6), Slot::FirstFit)
        .unwrap();
    assert_eq!(case.region, Region::new(1, 1, 2, 2));

    let first = inv
        .place_drawer(ALICE, case.id, units(2, 1), Slot::At { column: 1, row: 1 }, None)
        .unwrap();
    assert_eq!(first.region, Region::new(1, 1, 2, 1));

    let err = inv
        .place_drawer(ALICE, case.id, units(1, 1), Slot::At { column: 1, row: 1 }, None)
        .unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::Overlap));

    inv.place_drawer(ALICE, case.id, units(1, 1), Slot::At { column: 3, row: 1 }, None)
        .unwrap();
    inv.place_drawer(ALICE, case.id, units(2, 2), Slot::At { column: 3, row: 5 }, None)
        .unwrap();
    let err = inv
        .place_drawer(ALICE, case.id, units(2, 2), Slot::At { column: 3, row: 6 }, None)
        .unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::OutOfBounds));

    assert_eq!(inv.case(case.id).unwrap().drawer_count(), 3);
    assert_eq!(inv.drawers_in(case.id).count(), 3);
    assert!(!inv.case_snapshot(case.id).unwrap().invariant_report().has_errors());
}

#[test]
fn named_sizes_resolve_through_the_catalog() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "bench", None).unwrap();
    let case = inv
        .place_case(ALICE, wall, NewCase::new("raaco", 1, 1), Slot::FirstFit)
        .unwrap();

    let large = inv
        .place_drawer(
            ALICE,
            case.id,
            DrawerShape::Named("Large".to_string()),
            Slot::FirstFit,
            Some("M3 screws".to_string()),
        )
        .unwrap();
    assert_eq!(large.region, Region::new(1, 1, 2, 2));
    let drawer = inv.drawer(large.id).unwrap();
    assert_eq!(drawer.size(), Some("large"));
    assert_eq!(drawer.label(), Some("M3 screws"));

    let err = inv
        .place_drawer(
            ALICE,
            case.id,
            DrawerShape::Named("jumbo".to_string()),
            Slot::FirstFit,
            None,
        )
        .unwrap_err();
    assert!(matches!(err, InventoryError::UnknownDrawerSize { name } if name == "jumbo"));

    inv.resize_drawer(ALICE, large.id, 1, 2).unwrap();
    assert_eq!(inv.drawer(large.id).unwrap().size(), None);
}

#[test]
fn moving_a_drawer_onto_itself_succeeds() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "w", None).unwrap();
    let case = inv
        .place_case(ALICE, wall, NewCase::new("c", 1, 1), Slot::FirstFit)
        .unwrap();
    let drawer = inv
        .place_drawer(ALICE, case.id, units(2, 1), Slot::At { column: 2, row: 3 }, None)
        .unwrap();
    assert_eq!(
        inv.move_drawer(ALICE, drawer.id, 2, 3).unwrap(),
        Region::new(2, 3, 2, 1)
    );
    assert_eq!(
        inv.move_drawer(ALICE, drawer.id, 3, 3).unwrap(),
        Region::new(3, 3, 2, 1)
    );
}

#[test]
fn edge_drags_shift_the_top_left_corner() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "w", Some(4)).unwrap();
    let left = inv
        .place_case(ALICE, wall, NewCase::new("left", 2, 2), Slot::FirstFit)
        .unwrap();
    let right = inv
        .place_case(ALICE, wall, NewCase::new("right", 2, 2), Slot::FirstFit)
        .unwrap();
    let corner = inv
        .place_drawer(ALICE, left.id, units(1, 1), Slot::At { column: 1, row: 1 }, None)
        .unwrap();
    let drawer = inv
        .place_drawer(
            ALICE,
            left.id,
            DrawerShape::Named("medium".to_string()),
            Slot::At { column: 3, row: 3 },
            None,
        )
        .unwrap();
    let rx = inv.subscribe();

    // Left edge dragged one column out.
    let widened = Region::new(2, 3, 3, 1);
    assert_eq!(inv.reshape_drawer(ALICE, drawer.id, widened).unwrap(), widened);
    assert_eq!(inv.drawer_region(drawer.id), Some(widened));
    assert_eq!(inv.drawer(drawer.id).unwrap().size(), None);

    // Top edge dragged down on the wall.
    let lowered = Region::new(3, 2, 2, 1);
    assert_eq!(inv.reshape_case(ALICE, right.id, lowered).unwrap(), lowered);

    let before = inv.case_snapshot(left.id).unwrap();
    let err = inv
        .reshape_drawer(BOB, drawer.id, Region::new(1, 1, 4, 3))
        .unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::Overlap));
    assert_eq!(inv.case_snapshot(left.id).unwrap(), before);
    assert_eq!(inv.drawer_region(corner.id), Some(Region::cell(1, 1)));

    let err = inv
        .reshape_case(BOB, left.id, Region::new(1, 1, 3, 2))
        .unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::Overlap));
    assert_eq!(inv.case_region(left.id), Some(Region::new(1, 1, 2, 2)));

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 2);
    assert!(matches!(
        events[0].change,
        InventoryChange::DrawerResized { region, .. } if region == widened
    ));
    assert!(matches!(
        events[1].change,
        InventoryChange::CaseResized { region, .. } if region == lowered
    ));
}

#[test]
fn refused_mutations_leave_state_untouched() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "w", Some(4)).unwrap();
    let left = inv
        .place_case(ALICE, wall, NewCase::new("left", 2, 2), Slot::FirstFit)
        .unwrap();
    let right = inv
        .place_case(ALICE, wall, NewCase::new("right", 2, 2), Slot::FirstFit)
        .unwrap();
    assert_eq!(right.region, Region::new(3, 1, 2, 2));

    let before = inv.wall_snapshot(wall).unwrap();
    let sequence = inv.sequence();
    let err = inv.move_case(BOB, left.id, 2, 1).unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::Overlap));
    let err = inv.resize_case(BOB, right.id, 3, 1).unwrap_err();
    assert_eq!(rejection_code(&err), Some(RejectionCode::OutOfBounds));

    assert_eq!(inv.wall_snapshot(wall).unwrap(), before);
    assert_eq!(inv.sequence(), sequence);
}

#[test]
fn case_grid_resize_is_previewed_then_refused() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "w", None).unwrap();
    let case = inv
        .place_case(ALICE, wall, NewCase::new("c", 1, 1).with_grid(4, 4), Slot::FirstFit)
        .unwrap();
    let edge = inv
        .place_drawer(ALICE, case.id, units(1, 1), Slot::At { column: 4, row: 1 }, None)
        .unwrap();

    let impact = inv.preview_case_grid_resize(case.id, 3, 4).unwrap();
    assert_eq!(impact.count, 1);
    assert!(impact.affected_ids.contains(&edge.id.occupant()));
    assert!(inv.preview_case_grid_resize(case.id, 4, 4).unwrap().is_clear());

    let err = inv.resize_case_grid(ALICE, case.id, 3, 4).unwrap_err();
    let InventoryError::Placement(err) = &err else {
        panic!("expected a placement refusal, got {err}");
    };
    assert!(matches!(err.reason, PlacementFailure::GridShrinkBlocked(_)));
    assert_eq!(inv.case_snapshot(case.id).unwrap().columns, 4);

    inv.remove_drawer(ALICE, edge.id).unwrap();
    inv.resize_case_grid(ALICE, case.id, 3, 4).unwrap();
    assert_eq!(inv.case_snapshot(case.id).unwrap().columns, 3);
}

#[test]
fn walls_with_cases_cannot_be_removed() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "w", None).unwrap();
    let case = inv
        .place_case(ALICE, wall, NewCase::new("c", 1, 1), Slot::FirstFit)
        .unwrap();
    inv.place_drawer(ALICE, case.id, units(1, 1), Slot::FirstFit, None)
        .unwrap();
    inv.place_drawer(ALICE, case.id, units(1, 1), Slot::FirstFit, None)
        .unwrap();

    let err = inv.remove_wall(ALICE, wall).unwrap_err();
    assert!(matches!(err, InventoryError::WallNotEmpty { cases: 1, .. }));

    assert_eq!(inv.remove_case(ALICE, case.id).unwrap(), 2);
    assert_eq!(inv.drawers_in(case.id).count(), 0);
    inv.remove_wall(ALICE, wall).unwrap();
    assert!(inv.wall(wall).is_none());
    assert!(matches!(
        inv.wall_snapshot(wall),
        Err(InventoryError::UnknownWall(id)) if id == wall
    ));
}

#[test]
fn templates_populate_a_case_atomically() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "w", Some(4)).unwrap();
    let template = LayoutTemplate {
        name: "Mixed 4x2".to_string(),
        columns: 4,
        rows: 2,
        drawers: vec![
            TemplateDrawer {
                row: 1,
                col: 1,
                size: "medium".to_string(),
            },
            TemplateDrawer {
                row: 1,
                col: 3,
                size: "medium".to_string(),
            },
            TemplateDrawer {
                row: 2,
                col: 1,
                size: "wide".to_string(),
            },
        ],
    };

    let placed = inv
        .apply_template(ALICE, wall, &template, (2, 1), Slot::FirstFit)
        .unwrap();
    let case = inv.case(placed.id).unwrap();
    assert_eq!(case.name(), "Mixed 4x2");
    assert_eq!(case.drawer_count(), 3);
    assert_eq!(inv.case_snapshot(placed.id).unwrap().rows, Some(2));

    let mut broken = template.clone();
    broken.drawers[2].col = 2;
    let cases_before = inv.wall(wall).unwrap().case_count();
    let drawers_before = inv.drawers_in(placed.id).count();
    let err = inv
        .apply_template(ALICE, wall, &broken, (2, 1), Slot::FirstFit)
        .unwrap_err();
    assert!(matches!(err, InventoryError::Template(_)));

    let err = inv
        .apply_template(ALICE, wall, &template, (5, 1), Slot::FirstFit)
        .unwrap_err();
    assert!(matches!(
        &err,
        InventoryError::Placement(err) if matches!(err.reason, PlacementFailure::NoFreeSlot { .. })
    ));
    assert_eq!(inv.wall(wall).unwrap().case_count(), cases_before);
    assert_eq!(inv.drawers_in(placed.id).count(), drawers_before);
}

#[test]
fn subscribers_see_each_commit_once_with_origin() {
    let mut inv = inventory();
    let rx = inv.subscribe();
    let wall = inv.create_wall(ALICE, "w", None).unwrap();
    let case = inv
        .place_case(BOB, wall, NewCase::new("c", 1, 1), Slot::FirstFit)
        .unwrap();
    let _ = inv.move_case(BOB, case.id, 1, 1);
    let _ = inv.place_drawer(ALICE, case.id, units(9, 9), Slot::FirstFit, None);

    let events: Vec<_> = rx.try_iter().collect();
    assert_eq!(events.len(), 3);
    assert_eq!(
        events.iter().map(|e| e.sequence).collect::<Vec<_>>(),
        vec![1, 2, 3]
    );
    assert!(matches!(events[0].change, InventoryChange::WallCreated { .. }));
    assert_eq!(events[1].origin, BOB);
    assert!(matches!(
        events[2].change,
        InventoryChange::CaseMoved { region, .. } if region == Region::new(1, 1, 1, 1)
    ));
}

#[test]
fn speculative_copies_track_generation() {
    let mut inv = inventory();
    let wall = inv.create_wall(ALICE, "w", Some(2)).unwrap();
    let client = inv.wall_validator(wall).unwrap();
    inv.place_case(BOB, wall, NewCase::new("c", 2, 1), Slot::FirstFit)
        .unwrap();

    let server = inv.wall(wall).unwrap().grid();
    assert!(client.is_stale(server.generation()));
    assert_eq!(client.find_first_fit(2, 1), Some(Region::new(1, 1, 2, 1)));
    assert_eq!(
        inv.wall_validator(wall).unwrap().find_first_fit(2, 1),
        Some(Region::new(1, 2, 2, 1))
    );
}
