//! End-to-end writer scenarios and workload properties.

use holdfast_arena::{ArenaConfig, BufferArena, BufferStatus, EntryRef};
use holdfast_core::{
    ArrayBufferType, BufferId, BufferType, BufferTypeId, Generation, GenerationTracker,
};
use holdfast_test_utils::fixtures::{arena_with, blobs, pairs, CountingType};
use holdfast_test_utils::workload::{generate, Mix, Op};
use holdfast_test_utils::ManualTracker;

fn boxed(ty: ArrayBufferType) -> Box<dyn BufferType<u64>> {
    Box::new(ty)
}

/// Live elements of a type: used minus dead minus held, over buffers not
/// held as a whole.
fn live_elems(arena: &BufferArena<u64>, type_id: BufferTypeId) -> u64 {
    (0..arena.num_buffers())
        .map(|i| arena.buffer_state(BufferId(i)))
        .filter(|s| s.type_id() == Some(type_id) && !s.is_buffer_held())
        .map(|s| u64::from(s.used_elems() - s.dead_elems() - s.hold_elems()))
        .sum()
}

#[test]
fn full_buffer_switches_on_next_alloc() {
    let cells = ArrayBufferType::fixed("cells", 1, 1024, 1024);
    let (mut arena, ids) = arena_with(4, vec![boxed(cells)]);
    let t = ids[0];
    for i in 0..1024 {
        let r = arena.alloc(t, &[i]).unwrap();
        assert_eq!(r.buffer_id(), BufferId(0));
    }
    assert_eq!(arena.active_buffer_id(t).unwrap(), BufferId(0));
    assert_eq!(arena.buffer_state(BufferId(0)).remaining(), 0);

    let r = arena.alloc(t, &[1024]).unwrap();
    assert_eq!(r, EntryRef::new(BufferId(1), 0));
    assert_eq!(arena.active_buffer_id(t).unwrap(), BufferId(1));
    assert_eq!(arena.buffer_state(BufferId(0)).status(), BufferStatus::Held);
    assert_eq!(arena.buffer_state(BufferId(1)).status(), BufferStatus::Active);
    assert_eq!(arena.buffer_state(BufferId(1)).alloc_elems(), 1024);

    // The retired buffer keeps its contents readable.
    assert_eq!(arena.get(EntryRef::new(BufferId(0), 1023), 1), &[1023]);
}

#[test]
fn held_entry_waits_for_watermark() {
    let (mut arena, ids) = arena_with(4, vec![boxed(blobs(64, 1024))]);
    let t = ids[0];
    let r = arena.alloc(t, &[7, 8, 9]).unwrap();
    arena.hold_elem(r, 3);
    assert!(arena.has_elem_hold_pending());

    arena.transfer_hold_lists(Generation(5));
    assert!(!arena.has_elem_hold_pending());

    arena.trim_hold_lists(Generation(4));
    let state = arena.buffer_state(r.buffer_id());
    assert_eq!(state.hold_elems(), 3);
    assert_eq!(state.dead_elems(), 0);
    assert_eq!(arena.elem_hold_list().stamped_len(), 1);

    arena.trim_hold_lists(Generation(6));
    let state = arena.buffer_state(r.buffer_id());
    assert_eq!(state.hold_elems(), 0);
    assert_eq!(state.dead_elems(), 3);
    assert!(arena.elem_hold_list().is_empty());
}

#[test]
fn freed_slot_is_reused_first() {
    let config = ArenaConfig::new(4).with_free_lists(true);
    let mut arena = BufferArena::<u64>::new(config).unwrap();
    let t = arena.add_type(boxed(pairs(16, 64))).unwrap();
    let a = arena.alloc(t, &[1, 1]).unwrap();
    let _b = arena.alloc(t, &[2, 2]).unwrap();

    arena.free_elem(a, 2);
    assert_eq!(arena.free_list_len(t), 1);
    let before = arena.buffer_state(a.buffer_id());
    let (used, dead, alloc) = (before.used_elems(), before.dead_elems(), before.alloc_elems());
    assert_eq!(dead, 2);

    let c = arena.alloc(t, &[3, 3]).unwrap();
    assert_eq!(c, a);
    assert_eq!(arena.get_entry(c), &[3, 3]);
    let after = arena.buffer_state(a.buffer_id());
    assert_eq!(after.used_elems(), used);
    assert_eq!(after.dead_elems(), dead - 2);
    assert_eq!(after.alloc_elems(), alloc);
    assert_eq!(arena.free_list_len(t), 0);

    // With the list empty again, allocation bumps.
    let d = arena.alloc(t, &[4, 4]).unwrap();
    assert_eq!(d.offset(), 4);
}

#[test]
fn released_hold_feeds_free_list() {
    let (mut arena, ids) = arena_with(4, vec![boxed(pairs(16, 64))]);
    let t = ids[0];
    arena.enable_free_lists();
    let a = arena.alloc(t, &[1, 1]).unwrap();
    arena.hold_elem(a, 2);
    assert_eq!(arena.free_list_len(t), 0);

    let mut tracker = ManualTracker::new();
    tracker.commit(&mut arena);
    assert_eq!(arena.free_list_len(t), 1);
    assert_eq!(arena.alloc(t, &[5, 5]).unwrap(), a);
}

#[test]
fn compaction_moves_live_entries_and_holds_sources() {
    let (mut arena, ids) = arena_with(8, vec![boxed(pairs(4, 64))]);
    let t = ids[0];
    let e0 = arena.alloc(t, &[10, 10]).unwrap();
    let e1 = arena.alloc(t, &[11, 11]).unwrap();
    let e2 = arena.alloc(t, &[12, 12]).unwrap();
    let e3 = arena.alloc(t, &[13, 13]).unwrap();
    assert_eq!(e1.buffer_id(), BufferId(0));
    assert_eq!(e2.buffer_id(), BufferId(1));
    arena.free_elem(e1, 2);

    let sources = arena.start_compact(t).unwrap();
    assert_eq!(sources.as_slice(), &[BufferId(0), BufferId(1)]);

    let mut moved = Vec::new();
    for r in [e0, e2, e3] {
        let values = arena.get_entry(r).to_vec();
        moved.push((arena.alloc(t, &values).unwrap(), values));
    }
    arena.finish_compact(&sources);

    for id in [BufferId(0), BufferId(1)] {
        let state = arena.buffer_state(id);
        assert_eq!(state.status(), BufferStatus::Held);
        assert_eq!(state.used_elems(), 0);
        assert!(state.is_buffer_held());
    }
    assert_eq!(arena.type_mem_stats(t).used_elems, 6);
    for (r, values) in &moved {
        assert_eq!(arena.get_entry(*r), values.as_slice());
    }

    let mut tracker = ManualTracker::new();
    tracker.commit(&mut arena);
    assert_eq!(arena.buffer_state(BufferId(0)).status(), BufferStatus::Free);
    assert_eq!(arena.buffer_state(BufferId(1)).status(), BufferStatus::Free);
}

#[test]
fn worst_buffer_compaction_reclaims_fully_dead_active_buffer() {
    let (mut arena, ids) = arena_with(4, vec![boxed(pairs(4, 4))]);
    let t = ids[0];
    let a = arena.alloc(t, &[1, 1]).unwrap();
    let b = arena.alloc(t, &[2, 2]).unwrap();
    arena.free_elem(a, 2);
    arena.free_elem(b, 2);

    let worst = arena.start_compact_worst_buffer(t).unwrap();
    assert_eq!(worst, Some(BufferId(0)));
    assert_eq!(arena.active_buffer_id(t).unwrap(), BufferId(1));
    arena.finish_compact(&[BufferId(0)]);
    assert!(arena.buffer_state(BufferId(0)).is_buffer_held());

    let mut tracker = ManualTracker::new();
    tracker.commit(&mut arena);
    assert_eq!(arena.buffer_state(BufferId(0)).status(), BufferStatus::Free);
    assert_eq!(arena.mem_stats().active_buffers, 1);
}

#[test]
fn worst_buffer_compaction_moves_survivors() {
    let (mut arena, ids) = arena_with(8, vec![boxed(pairs(4, 64))]);
    let t = ids[0];
    let e0 = arena.alloc(t, &[10, 10]).unwrap();
    let e1 = arena.alloc(t, &[11, 11]).unwrap();
    let e2 = arena.alloc(t, &[12, 12]).unwrap(); // buffer 1, capacity 8
    let e3 = arena.alloc(t, &[13, 13]).unwrap();
    arena.free_elem(e0, 2); // buffer 0: 2 of 4 dead
    arena.free_elem(e3, 2); // buffer 1: 2 of 4 dead, the tie goes to buffer 0

    let source = arena.start_compact_worst_buffer(t).unwrap().unwrap();
    assert_eq!(source, BufferId(0));
    assert_eq!(arena.active_buffer_id(t).unwrap(), BufferId(1));

    let values = arena.get_entry(e1).to_vec();
    let moved = arena.alloc(t, &values).unwrap();
    assert_eq!(moved.buffer_id(), BufferId(1));
    arena.finish_compact(&[source]);

    let mut tracker = ManualTracker::new();
    tracker.commit(&mut arena);
    assert_eq!(arena.buffer_state(source).status(), BufferStatus::Free);
    assert_eq!(arena.get_entry(moved), &[11, 11]);
    assert_eq!(arena.get_entry(e2), &[12, 12]);
    assert_eq!(live_elems(&arena, t), 4);

    // Buffer 1 is active and has dead elements of its own.
    assert_eq!(arena.start_compact_worst_buffer(t).unwrap(), Some(BufferId(1)));
    assert_ne!(arena.active_buffer_id(t).unwrap(), BufferId(1));
}

#[test]
fn freed_slots_are_reused_round_robin_across_types() {
    let left = ArrayBufferType::fixed("left", 2, 4, 4);
    let right = ArrayBufferType::fixed("right", 2, 4, 4);
    let (mut arena, ids) = arena_with(4, vec![boxed(left), boxed(right)]);
    let (l, r) = (ids[0], ids[1]);
    assert_eq!(arena.active_buffer_id(l).unwrap(), BufferId(0));
    assert_eq!(arena.active_buffer_id(r).unwrap(), BufferId(1));

    let l0 = arena.alloc(l, &[1, 1]).unwrap();
    let l1 = arena.alloc(l, &[2, 2]).unwrap();
    assert_eq!(arena.alloc(l, &[3, 3]).unwrap().buffer_id(), BufferId(2));
    arena.free_elem(l0, 2);
    arena.free_elem(l1, 2);
    let mut tracker = ManualTracker::new();
    tracker.commit(&mut arena);
    assert_eq!(arena.buffer_state(BufferId(0)).status(), BufferStatus::Free);

    // Slot 0 is free, but the search starts after the current active buffer.
    arena.alloc(r, &[4, 4]).unwrap();
    arena.alloc(r, &[5, 5]).unwrap();
    assert_eq!(arena.alloc(r, &[6, 6]).unwrap().buffer_id(), BufferId(3));
    arena.alloc(r, &[7, 7]).unwrap();
    let wrapped = arena.alloc(r, &[8, 8]).unwrap();
    assert_eq!(wrapped.buffer_id(), BufferId(0));
    assert_eq!(arena.type_id_of(BufferId(0)), Some(r));
    assert_eq!(arena.get_entry(wrapped), &[8, 8]);
    assert_eq!(arena.mem_stats().active_buffers, 2);
}

#[test]
fn holds_never_release_at_or_below_their_generation() {
    for stamp in [0u64, 1, 5, 40] {
        for used in 0..=stamp {
            let (mut arena, ids) = arena_with(4, vec![boxed(blobs(16, 64))]);
            let r = arena.alloc(ids[0], &[1, 2]).unwrap();
            arena.hold_elem(r, 2);
            arena.transfer_hold_lists(Generation(stamp));
            arena.trim_hold_lists(Generation(used));
            assert_eq!(
                arena.buffer_state(r.buffer_id()).hold_elems(),
                2,
                "stamp {stamp} released at watermark {used}"
            );
            arena.trim_hold_lists(Generation(stamp + 1));
            assert_eq!(arena.buffer_state(r.buffer_id()).hold_elems(), 0);
        }
    }
}

#[test]
fn pinned_reader_delays_release() {
    let (ty, counts) = CountingType::new(blobs(16, 64));
    let (mut arena, ids) = arena_with::<u64>(4, vec![Box::new(ty)]);
    let mut tracker = ManualTracker::new();
    tracker.advance();
    let pin = tracker.pin();

    let r = arena.alloc(ids[0], &[3, 4, 5]).unwrap();
    arena.hold_elem(r, 3);
    tracker.commit(&mut arena);
    tracker.commit(&mut arena);
    assert_eq!(tracker.oldest_used_generation(), Generation(1));
    assert_eq!(arena.buffer_state(r.buffer_id()).hold_elems(), 3);
    assert_eq!(counts.cleaned(), 0);
    assert_eq!(arena.get(r, 3), &[3, 4, 5]);

    tracker.unpin(pin);
    tracker.commit(&mut arena);
    assert_eq!(arena.buffer_state(r.buffer_id()).hold_elems(), 0);
    assert_eq!(counts.cleaned(), 3);
    assert_eq!(arena.get(r, 3), &[0, 0, 0]);
}

#[test]
fn drained_buffers_return_to_free() {
    let (mut arena, ids) = arena_with(4, vec![boxed(pairs(4, 4))]);
    let t = ids[0];
    let a = arena.alloc(t, &[1, 1]).unwrap();
    let b = arena.alloc(t, &[2, 2]).unwrap();
    arena.alloc(t, &[3, 3]).unwrap(); // retires buffer 0
    assert_eq!(arena.buffer_state(BufferId(0)).status(), BufferStatus::Held);

    let mut tracker = ManualTracker::new();
    arena.hold_elem(a, 2);
    arena.hold_elem(b, 2);
    tracker.commit(&mut arena); // element holds release, buffer hold staged
    assert!(arena.buffer_state(BufferId(0)).is_buffer_held());
    tracker.commit(&mut arena); // buffer hold releases
    assert_eq!(arena.buffer_state(BufferId(0)).status(), BufferStatus::Free);
    assert_eq!(arena.mem_stats().free_buffers, 3);
}

/// Replays a seeded workload against a shadow model, checking content and
/// accounting after every step.
fn run_workload(seed: u64, fixed: Option<u32>, compact_every: Option<usize>) {
    let ty = match fixed {
        Some(n) => ArrayBufferType::fixed("work", n, 8, 256),
        None => ArrayBufferType::variable("work", 8, 256),
    };
    let (mut arena, ids) = arena_with(64, vec![boxed(ty)]);
    let t = ids[0];
    if fixed.is_some() {
        arena.enable_free_lists();
    }
    let mut tracker = ManualTracker::new();
    let mut live: Vec<(EntryRef, Vec<u64>)> = Vec::new();
    let mut next = 1u64;
    let mut statuses = vec![BufferStatus::Free; arena.num_buffers() as usize];

    let ops = generate(seed, 2000, Mix::default(), 6, fixed);
    for (step, op) in ops.into_iter().enumerate() {
        match op {
            Op::Alloc(n) => {
                let values: Vec<u64> = (next..next + u64::from(n)).collect();
                next += u64::from(n);
                let r = arena.alloc(t, &values).unwrap();
                live.push((r, values));
            }
            Op::Hold(i) if !live.is_empty() => {
                let (r, values) = live.swap_remove(i % live.len());
                arena.hold_elem(r, values.len() as u32);
            }
            Op::Free(i) if !live.is_empty() => {
                let (r, values) = live.swap_remove(i % live.len());
                arena.free_elem(r, values.len() as u32);
            }
            Op::Hold(_) | Op::Free(_) => {}
            Op::Commit => tracker.commit(&mut arena),
        }

        if compact_every.is_some_and(|every| step % every == every - 1) {
            let before = live_elems(&arena, t);
            let sources = arena.start_compact(t).unwrap();
            for (r, values) in live.iter_mut() {
                if sources.contains(&r.buffer_id()) {
                    *r = arena.alloc(t, values.as_slice()).unwrap();
                }
            }
            arena.finish_compact(&sources);
            assert_eq!(arena.type_mem_stats(t).used_elems, before, "seed {seed} step {step}");
        }

        for (r, values) in &live {
            assert_eq!(
                arena.get(*r, values.len() as u32),
                values.as_slice(),
                "seed {seed} step {step}"
            );
        }
        let expected: u64 = live.iter().map(|(_, v)| v.len() as u64).sum();
        assert_eq!(live_elems(&arena, t), expected, "seed {seed} step {step}");

        for (i, prev) in statuses.iter_mut().enumerate() {
            let state = arena.buffer_state(BufferId(i as u32));
            assert!(
                state.dead_elems() + state.hold_elems() <= state.used_elems()
                    || state.is_buffer_held()
            );
            assert!(
                !(*prev == BufferStatus::Held && state.status() == BufferStatus::Active),
                "buffer {i} went Held -> Active at step {step}"
            );
            *prev = state.status();
        }
        assert_eq!(arena.mem_stats().active_buffers, 1);
    }

    arena.clear_hold_lists();
    assert!(arena.elem_hold_list().is_empty());
    assert!(arena.buffer_hold_list().is_empty());
}

#[test]
fn seeded_workload_variable_entries() {
    for seed in 0..8 {
        run_workload(seed, None, None);
    }
}

#[test]
fn seeded_workload_fixed_entries_with_free_lists() {
    for seed in 100..108 {
        run_workload(seed, Some(3), None);
    }
}

#[test]
fn seeded_workload_with_periodic_compaction() {
    for seed in 200..204 {
        run_workload(seed, None, Some(250));
        run_workload(seed, Some(2), Some(250));
    }
}

/// Replays one seeded workload spread over three types that share a pool,
/// checking that each type owns exactly one Active buffer at every step.
fn run_multi_type_workload(seed: u64) {
    let types = vec![
        boxed(pairs(8, 128)),
        boxed(blobs(8, 256)),
        boxed(ArrayBufferType::fixed("triples", 3, 12, 192)),
    ];
    let entry_len = [Some(2), None, Some(3)];
    let (mut arena, ids) = arena_with(128, types);
    arena.enable_free_lists();
    let mut tracker = ManualTracker::new();
    let mut live: Vec<Vec<(EntryRef, Vec<u64>)>> = vec![Vec::new(); ids.len()];
    let mut next = 1u64;
    let mut statuses = vec![BufferStatus::Free; arena.num_buffers() as usize];

    let ops = generate(seed, 1500, Mix::default(), 6, None);
    for (step, op) in ops.into_iter().enumerate() {
        let k = step % ids.len();
        let t = ids[k];
        match op {
            Op::Alloc(n) => {
                let n = entry_len[k].unwrap_or(n);
                let values: Vec<u64> = (next..next + u64::from(n)).collect();
                next += u64::from(n);
                let r = arena.alloc(t, &values).unwrap();
                live[k].push((r, values));
            }
            Op::Hold(i) if !live[k].is_empty() => {
                let len = live[k].len();
                let (r, values) = live[k].swap_remove(i % len);
                arena.hold_elem(r, values.len() as u32);
            }
            Op::Free(i) if !live[k].is_empty() => {
                let len = live[k].len();
                let (r, values) = live[k].swap_remove(i % len);
                arena.free_elem(r, values.len() as u32);
            }
            Op::Hold(_) | Op::Free(_) => {}
            Op::Commit => tracker.commit(&mut arena),
        }

        let mut actives = Vec::with_capacity(ids.len());
        for (k, &t) in ids.iter().enumerate() {
            let active = arena.active_buffer_id(t).unwrap();
            let owned: Vec<BufferId> = (0..arena.num_buffers())
                .map(BufferId)
                .filter(|&id| {
                    let state = arena.buffer_state(id);
                    state.status() == BufferStatus::Active && state.type_id() == Some(t)
                })
                .collect();
            assert_eq!(owned, vec![active], "seed {seed} step {step} type {t}");

            for (r, values) in &live[k] {
                assert_eq!(arena.type_id_of(r.buffer_id()), Some(t));
                assert_eq!(
                    arena.get(*r, values.len() as u32),
                    values.as_slice(),
                    "seed {seed} step {step} type {t}"
                );
            }
            let expected: u64 = live[k].iter().map(|(_, v)| v.len() as u64).sum();
            assert_eq!(live_elems(&arena, t), expected, "seed {seed} step {step} type {t}");
            actives.push(active);
        }
        actives.sort();
        actives.dedup();
        assert_eq!(actives.len(), ids.len(), "seed {seed} step {step}: shared active buffer");
        assert_eq!(arena.mem_stats().active_buffers, ids.len() as u32);

        for (i, prev) in statuses.iter_mut().enumerate() {
            let state = arena.buffer_state(BufferId(i as u32));
            assert!(
                !(*prev == BufferStatus::Held && state.status() == BufferStatus::Active),
                "buffer {i} went Held -> Active at step {step}"
            );
            *prev = state.status();
        }
    }

    arena.clear_hold_lists();
    assert!(arena.elem_hold_list().is_empty());
    assert!(arena.buffer_hold_list().is_empty());
}

#[test]
fn seeded_workload_across_types() {
    for seed in 300..306 {
        run_multi_type_workload(seed);
    }
}
