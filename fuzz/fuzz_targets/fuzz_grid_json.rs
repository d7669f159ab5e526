#![no_main]

use libfuzzer_sys::fuzz_target;
use macroeco_sad::io::CountGrid;

fuzz_target!(|data: &[u8]| {
    if let Ok(grid) = serde_json::from_slice::<CountGrid>(data) {
        if let Ok(total) = grid.total() {
            if total <= 100_000 {
                let observations = grid.observations().unwrap();
                assert_eq!(observations.count() as u64, total);
            }
        }
    }
});
