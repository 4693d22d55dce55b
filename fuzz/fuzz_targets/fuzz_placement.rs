#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use partwall_grid::{
    AuthoritativeValidator, Grid, OccupantId, PlacementOperation, Region, overlaps,
};

#[derive(Debug, Arbitrary)]
struct Input {
    columns: u8,
    rows: Option<u8>,
    ops: Vec<Op>,
}

#[derive(Debug, Arbitrary)]
enum Op {
    Place { id: u8, column: u8, row: u8, width: u8, height: u8 },
    PlaceFirstFit { id: u8, width: u8, height: u8 },
    Move { id: u8, column: u8, row: u8 },
    Resize { id: u8, width: u8, height: u8 },
    Remove { id: u8 },
    ResizeGrid { columns: u8, rows: Option<u8> },
}

fn id(raw: u8) -> OccupantId {
    // Small id space so operations hit existing occupants.
    OccupantId::new(u64::from(raw % 16) + 1).unwrap_or(OccupantId::MIN)
}

fn dim(raw: u8) -> u16 {
    u16::from(raw % 12)
}

impl Op {
    fn to_operation(&self) -> PlacementOperation {
        match *self {
            Self::Place { id: raw, column, row, width, height } => PlacementOperation::Place {
                occupant: id(raw),
                region: Region::new(dim(column), dim(row), dim(width), dim(height)),
            },
            Self::PlaceFirstFit { id: raw, width, height } => PlacementOperation::PlaceFirstFit {
                occupant: id(raw),
                width: dim(width),
                height: dim(height),
            },
            Self::Move { id: raw, column, row } => PlacementOperation::Move {
                occupant: id(raw),
                column: dim(column),
                row: dim(row),
            },
            Self::Resize { id: raw, width, height } => PlacementOperation::Resize {
                occupant: id(raw),
                width: dim(width),
                height: dim(height),
            },
            Self::Remove { id: raw } => PlacementOperation::Remove { occupant: id(raw) },
            Self::ResizeGrid { columns, rows } => PlacementOperation::ResizeGrid {
                columns: dim(columns),
                rows: rows.map(dim),
            },
        }
    }
}

fuzz_target!(|input: Input| {
    let Ok(grid) = Grid::with_rows(dim(input.columns), input.rows.map(dim)) else {
        return;
    };
    let mut validator = AuthoritativeValidator::new(grid);

    for (step, op) in input.ops.iter().take(256).enumerate() {
        let before = validator.snapshot();
        let generation = validator.generation();
        match validator.apply_operation(step as u64, op.to_operation()) {
            Ok(outcome) => {
                assert_eq!(outcome.generation, generation + 1);
                assert_eq!(outcome.after_hash, validator.state_hash());
            }
            Err(err) => {
                assert_eq!(validator.snapshot(), before, "refused {err} mutated state");
                assert_eq!(validator.generation(), generation);
            }
        }

        let grid = validator.grid();
        let occupants: Vec<_> = validator.index().iter().collect();
        for (i, a) in occupants.iter().enumerate() {
            assert!(grid.contains(&a.region), "{} out of bounds", a.region);
            for b in &occupants[i + 1..] {
                assert!(!overlaps(&a.region, &b.region), "{} overlaps {}", a.region, b.region);
            }
        }
        assert!(!validator.snapshot().invariant_report().has_errors());
    }
});
