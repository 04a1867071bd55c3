//! Randomized fuzz check of the DRAM allocator's disjointness invariant:
//! no two live allocations may ever overlap, regardless of the order
//! random alloc/free calls arrive in.

use rand::Rng;
use rand::seq::SliceRandom;

use tvacc_core::accelerator::Accelerator;

#[test]
fn random_alloc_free_sequences_never_overlap() {
    let accel = Accelerator::new();
    let mut rng = rand::thread_rng();
    let mut live: Vec<(u32, u32)> = Vec::new();

    for _ in 0..2000 {
        let do_alloc = live.is_empty() || rng.gen_bool(0.7);
        if do_alloc {
            let size = rng.gen_range(1..4096u32);
            if let Ok(offset) = accel.dram_alloc(size) {
                for &(o, s) in &live {
                    let disjoint = offset + size <= o || o + s <= offset;
                    assert!(
                        disjoint,
                        "new allocation [{offset}, {}) overlaps live allocation [{o}, {})",
                        offset + size,
                        o + s
                    );
                }
                live.push((offset, size));
            }
        } else {
            let idx = rng.gen_range(0..live.len());
            let (offset, _) = live.swap_remove(idx);
            accel.dram_free(offset).expect("freeing a live allocation must succeed");
        }
    }

    live.shuffle(&mut rng);
    for (offset, _) in live {
        accel.dram_free(offset).expect("freeing a live allocation must succeed");
    }
}
