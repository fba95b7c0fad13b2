use criterion::{criterion_group, criterion_main, Criterion};
use std::hint::black_box;
use tandem_scheduler::{SchedulerAction, SchedulerStateMachine};

fn ready_machine() -> SchedulerStateMachine {
    let mut sm = SchedulerStateMachine::default();
    sm.set_visible(true);
    sm.set_can_begin_frame(true);
    sm.set_can_draw(true);
    sm
}

fn bench_state_machine(c: &mut Criterion) {
    let mut group = c.benchmark_group("Scheduler State Machine");

    group.bench_function("next_action (idle)", |b| {
        let sm = ready_machine();
        b.iter(|| black_box(sm.next_action()));
    });

    // One commit plus its first draw, the hot path of every animated frame.
    group.bench_function("commit and draw cycle", |b| {
        let mut sm = ready_machine();
        b.iter(|| {
            sm.set_needs_commit();
            sm.did_enter_vsync();
            sm.update_state(SchedulerAction::BeginFrame);
            sm.begin_frame_complete();
            sm.update_state(SchedulerAction::BeginUpdateMoreResources);
            sm.begin_update_more_resources_complete(false);
            sm.update_state(sm.next_action());
            let draw = sm.next_action();
            sm.update_state(draw);
            sm.did_draw_if_possible_completed(true);
            sm.did_leave_vsync();
            black_box(draw)
        });
    });

    group.finish();
}

criterion_group!(benches, bench_state_machine);
criterion_main!(benches);
