use trackside::engine::accident::Accident;
use trackside::engine::{CommandError, EngineParams, Simulation, ToggleError};
use trackside::geometry::Point;
use trackside::layout::signal::{BlockProgram, Indication, ManualProgram};
use trackside::layout::switch::{SwitchState, BEGIN, DIVERGING, STRAIGHT};
use trackside::layout::{Layout, SegmentId, STAGING_LENGTH};
use trackside::output::history::Event;
use trackside::position::Loc;
use trackside::train::controller::{Autopilot, Command, Manual};
use trackside::train::{Car, CarKind, Train, MAX_SPEED};
use trackside::units::{step_feet, Scale};

fn p(x: f64, y: f64) -> Point {
    Point::new(x, y)
}

fn sim(layout: Layout) -> Simulation {
    Simulation::new(layout, Scale::new(1.0), EngineParams::default())
}

fn cars(kinds: &[CarKind]) -> Vec<Car> {
    kinds.iter().map(|k| Car::new(*k)).collect()
}

/// a(0..100) - b(100..300) - c(300..400), both outer ends open.
fn line() -> (Layout, [SegmentId; 3]) {
    let mut l = Layout::new();
    let a = l.add_track(p(0.0, 0.0), p(100.0, 0.0));
    let b = l.add_track(p(100.0, 0.0), p(300.0, 0.0));
    let c = l.add_track(p(300.0, 0.0), p(400.0, 0.0));
    l.connect(a, 1, b, 0).unwrap();
    l.connect(b, 1, c, 0).unwrap();
    (l, [a, b, c])
}

/// a(0..100) into the base of a switch, b straight on, c diverging.
fn junction() -> (Layout, [SegmentId; 4]) {
    let mut l = Layout::new();
    let a = l.add_track(p(0.0, 0.0), p(100.0, 0.0));
    let sw = l.add_switch(p(100.0, 0.0));
    let b = l.add_track(p(100.0, 0.0), p(200.0, 0.0));
    let c = l.add_track(p(100.0, 0.0), p(200.0, 50.0));
    l.connect(a, 1, sw, BEGIN).unwrap();
    l.connect(sw, STRAIGHT, b, 0).unwrap();
    l.connect(sw, DIVERGING, c, 0).unwrap();
    (l, [a, sw, b, c])
}

#[test]
fn one_tick_moves_by_the_step_distance() {
    let mut l = Layout::new();
    let b = l.add_track(p(-200.0, 0.0), p(0.0, 0.0));
    let a = l.add_track(p(0.0, 0.0), p(100.0, 0.0));
    l.connect(b, 1, a, 0).unwrap();
    let mut s = sim(l);
    let two = vec![Car::new(CarKind::Engine).with_length(40.0),
                   Car::new(CarKind::Boxcar).with_length(30.0)];
    let id = s.add_train(two, Loc::new(a, Some(b), 0.0), Box::new(Manual));
    assert_eq!(s.train(id).unwrap().length(), 75.0);
    s.train_mut(id).unwrap().velocity = 20.0;

    let report = s.tick().unwrap();
    assert_eq!(report.tick, 1);
    assert!(report.events.is_empty());
    let t = s.train(id).unwrap();
    let expected = step_feet(20.0, 200.0) / 100.0;
    assert!((t.loc.fraction - expected).abs() < 1e-9);
    assert!(t.loc.fraction > 0.0 && t.loc.fraction < 1.0);
    // Throttle closed: friction only.
    assert!(t.velocity < 20.0 && t.velocity > 19.9);
}

#[test]
fn unpowered_train_stays_put() {
    let mut t = Train::new(1, cars(&[CarKind::Boxcar]), Loc::new(0, None, 0.0),
                           Box::new(Manual));
    assert_eq!(t.feet_to_slow(0.0), 0.0);
    t.tick(200.0);
    assert_eq!(t.velocity, 0.0);
    t.throttle = 5;
    t.tick(200.0);
    assert_eq!(t.throttle, 0);
    assert_eq!(t.velocity, 0.0);
}

#[test]
fn velocity_stays_in_range() {
    let mut t = Train::new(1, cars(&[CarKind::Engine, CarKind::Engine]),
                           Loc::new(0, None, 0.0), Box::new(Manual));
    t.throttle = 8;
    for _ in 0..2000 {
        t.tick(200.0);
        assert!(t.velocity >= 0.0 && t.velocity <= MAX_SPEED);
    }
    assert!(t.velocity > 60.0);
    t.throttle = 0;
    t.brake = true;
    for _ in 0..2000 {
        t.tick(200.0);
        assert!(t.velocity >= 0.0 && t.velocity <= MAX_SPEED);
    }
    assert_eq!(t.velocity, 0.0);
    assert_eq!(t.feet_to_slow(0.0), 0.0);
}

#[test]
fn fast_train_overruns_a_dead_end() {
    let (mut l, [a, b, _]) = line();
    // Drop c so b ends in the open.
    l.disconnect(b, 1).unwrap();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(b, Some(a), 0.9), Box::new(Manual));
    s.train_mut(id).unwrap().velocity = 30.0;

    let mut accidents = Vec::new();
    for _ in 0..10 {
        match s.tick() {
            Ok(_) => {}
            Err(e) => {
                accidents.push(e);
                break;
            }
        }
    }
    assert_eq!(accidents.len(), 1);
    match accidents[0] {
        Accident::Overrun(t, at) => {
            assert_eq!(t, id);
            assert!((at.x - 300.0).abs() < 1e-9);
        }
        ref other => panic!("unexpected {:?}", other),
    }
    let t = s.train(id).unwrap();
    assert_eq!(t.loc.segment, b);
    assert_eq!(t.loc.fraction, 1.0);
    assert_eq!(s.history.accidents().count(), 1);

    let removed = s.clear_accident(&accidents[0]);
    assert_eq!(removed.len(), 1);
    assert!(s.trains().is_empty());
    assert!(s.tick().is_ok());
}

#[test]
fn slow_train_stops_at_a_dead_end() {
    let (mut l, [a, b, _]) = line();
    l.disconnect(b, 1).unwrap();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(b, Some(a), 0.99), Box::new(Manual));
    s.train_mut(id).unwrap().velocity = 3.0;

    let mut stopped = false;
    for _ in 0..20 {
        let report = s.tick().unwrap();
        if report.events.contains(&Event::Stopped { train: id, segment: b }) {
            stopped = true;
            break;
        }
    }
    assert!(stopped);
    let t = s.train(id).unwrap();
    assert_eq!(t.velocity, 0.0);
    assert_eq!(t.throttle, 0);
    assert_eq!(t.loc.fraction, 1.0);
    assert!(s.tick().is_ok());
}

#[test]
fn fast_head_on_is_an_accident_and_leaves_the_list_alone() {
    let (l, [a, b, c]) = line();
    let mut s = sim(l);
    let one = s.add_train(cars(&[CarKind::Engine, CarKind::Boxcar]), Loc::new(b, Some(a), 0.45),
                          Box::new(Manual));
    let two = s.add_train(cars(&[CarKind::Caboose]), Loc::new(b, Some(c), 0.45),
                          Box::new(Manual));
    s.train_mut(one).unwrap().velocity = 30.0;
    s.train_mut(two).unwrap().velocity = 30.0;

    match s.tick() {
        Err(Accident::HeadOn(x, y, at)) => {
            assert_eq!((x, y), (one, two));
            assert!((at.x - 190.0).abs() < 1e-9);
        }
        other => panic!("unexpected {:?}", other),
    }
    let ids: Vec<_> = s.trains().iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![one, two]);
    assert_eq!(s.train(one).unwrap().loc, Loc::new(b, Some(a), 0.45));
    assert_eq!(s.train(two).unwrap().loc, Loc::new(b, Some(c), 0.45));
}

#[test]
fn gentle_head_on_couples() {
    let (l, [a, b, c]) = line();
    let mut s = sim(l);
    let one = s.add_train(cars(&[CarKind::Engine, CarKind::Boxcar]), Loc::new(b, Some(a), 0.45),
                          Box::new(Manual));
    let two = s.add_train(cars(&[CarKind::Caboose]), Loc::new(b, Some(c), 0.5),
                          Box::new(Manual));
    s.train_mut(one).unwrap().velocity = 2.0;
    s.train_mut(two).unwrap().velocity = 2.0;

    let report = s.tick().unwrap();
    assert!(report.events.contains(&Event::Joined { kept: one, absorbed: two }));
    assert_eq!(s.trains().len(), 1);
    let t = s.train(one).unwrap();
    let kinds: Vec<_> = t.cars.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![CarKind::Caboose, CarKind::Engine, CarKind::Boxcar]);
    // Momentum 2 * 1500 against 2 * 200.
    assert!((t.velocity - 2600.0 / 1700.0).abs() < 1e-9);
    // Front of the joined train is the caboose's old back end.
    assert_eq!(t.loc.segment, b);
    assert_eq!(t.loc.origin, Some(a));
    assert!((t.loc.fraction - 0.65).abs() < 1e-9);
}

#[test]
fn fast_rear_end_is_an_accident() {
    let (l, [a, b, _]) = line();
    let mut s = sim(l);
    let rear = s.add_train(cars(&[CarKind::Engine]), Loc::new(b, Some(a), 0.35),
                           Box::new(Manual));
    let front = s.add_train(cars(&[CarKind::Boxcar]), Loc::new(b, Some(a), 0.6),
                            Box::new(Manual));
    s.train_mut(rear).unwrap().velocity = 30.0;
    match s.tick() {
        Err(Accident::RearEnd(x, y, _)) => assert_eq!((x, y), (rear, front)),
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(s.trains().len(), 2);
}

#[test]
fn gentle_rear_end_couples_without_turning() {
    let (l, [a, b, _]) = line();
    let mut s = sim(l);
    let rear = s.add_train(cars(&[CarKind::Engine]), Loc::new(b, Some(a), 0.35),
                           Box::new(Manual));
    let front = s.add_train(cars(&[CarKind::Boxcar]), Loc::new(b, Some(a), 0.6),
                            Box::new(Manual));
    s.train_mut(rear).unwrap().velocity = 3.0;
    let report = s.tick().unwrap();
    assert!(report.events.contains(&Event::Joined { kept: rear, absorbed: front }));
    let t = s.train(rear).unwrap();
    assert_eq!(t.loc, Loc::new(b, Some(a), 0.6));
    let kinds: Vec<_> = t.cars.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![CarKind::Boxcar, CarKind::Engine]);
    assert!((t.velocity - 3.0 * 1200.0 / 1500.0).abs() < 1e-9);
}

#[test]
fn entering_an_occupied_switch_is_side_on() {
    let (l, [_, sw, b, c]) = junction();
    let mut s = sim(l);
    let moving = s.add_train(cars(&[CarKind::Engine]), Loc::new(c, None, 0.98),
                             Box::new(Manual));
    let standing = s.add_train(cars(&[CarKind::Engine]), Loc::new(b, Some(sw), 0.2),
                               Box::new(Manual));
    s.train_mut(moving).unwrap().velocity = 10.0;

    match s.toggle(sw) {
        Err(ToggleError::Occupied(x)) => assert_eq!(x, sw),
        other => panic!("unexpected {:?}", other),
    }
    match s.tick() {
        Err(Accident::SideOn(x, y, _)) => assert_eq!((x, y), (moving, standing)),
        other => panic!("unexpected {:?}", other),
    }
    // Held short of the switch, which was not thrown.
    let t = s.train(moving).unwrap();
    assert_eq!(t.loc.segment, c);
    let len = s.layout.length(c, &s.scale);
    assert!((t.loc.fraction - (1.0 - 1.0 / len)).abs() < 1e-9);
    assert!(!s.layout.switch(sw).unwrap().flipped());
}

#[test]
fn trailing_move_throws_the_switch() {
    let (l, [a, sw, _, c]) = junction();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(c, None, 0.98), Box::new(Manual));
    s.train_mut(id).unwrap().velocity = 10.0;

    let report = s.tick().unwrap();
    assert!(report.events.contains(&Event::SwitchThrown {
        switch: sw,
        state: SwitchState::Diverging,
        train: Some(id),
    }));
    assert!(s.layout.switch(sw).unwrap().flipped());
    s.tick().unwrap();
    let t = s.train(id).unwrap();
    assert_eq!(t.loc.segment, a);
    assert_eq!(t.loc.origin, Some(sw));
    assert!(s.layout.switch(sw).unwrap().flipped());
}

#[test]
fn facing_move_follows_the_switch() {
    let (l, [a, sw, b, _]) = junction();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(a, None, 0.98), Box::new(Manual));
    s.train_mut(id).unwrap().velocity = 10.0;
    for _ in 0..2 {
        let report = s.tick().unwrap();
        assert!(report.events.is_empty());
    }
    assert_eq!(s.train(id).unwrap().loc.segment, b);
    assert!(!s.layout.switch(sw).unwrap().flipped());
}

#[test]
fn operator_toggles() {
    let (l, [a, sw, _, _]) = junction();
    let mut s = sim(l);
    match s.toggle(sw) {
        Ok(Event::SwitchThrown { switch, state: SwitchState::Diverging, train: None }) => {
            assert_eq!(switch, sw)
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(s.layout.switch(sw).unwrap().flipped());
    match s.toggle(a) {
        Err(ToggleError::NotToggleable(x)) => assert_eq!(x, a),
        other => panic!("unexpected {:?}", other),
    }
    match s.toggle(99) {
        Err(ToggleError::UnknownSegment(99)) => {}
        other => panic!("unexpected {:?}", other),
    }
    assert_eq!(s.history.events.len(), 1);
}

/// A four-way at (100, 0): w-e is one route, n-s the other.
fn crossing() -> (Layout, [SegmentId; 5]) {
    let mut l = Layout::new();
    let fw = l.add_four_way(p(100.0, 0.0));
    let w = l.add_track(p(0.0, 0.0), p(100.0, 0.0));
    let e = l.add_track(p(100.0, 0.0), p(200.0, 0.0));
    let n = l.add_track(p(100.0, -100.0), p(100.0, 0.0));
    let so = l.add_track(p(100.0, 0.0), p(100.0, 100.0));
    l.connect(w, 1, fw, 0).unwrap();
    l.connect(fw, 1, e, 0).unwrap();
    l.connect(n, 1, fw, 2).unwrap();
    l.connect(fw, 3, so, 0).unwrap();
    l.check().unwrap();
    (l, [fw, w, e, n, so])
}

#[test]
fn four_way_passes_each_route_straight_through() {
    let (l, [fw, _, _, n, so]) = crossing();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(n, None, 0.98), Box::new(Manual));
    s.train_mut(id).unwrap().velocity = 10.0;
    for _ in 0..2 {
        assert!(s.tick().unwrap().events.is_empty());
    }
    let t = s.train(id).unwrap();
    assert_eq!(t.loc.segment, so);
    assert_eq!(t.loc.origin, Some(fw));
    match s.toggle(fw) {
        Err(ToggleError::NotToggleable(x)) => assert_eq!(x, fw),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn crossing_an_occupied_four_way_is_side_on() {
    let (l, [fw, w, e, n, _]) = crossing();
    let mut s = sim(l);
    let moving = s.add_train(cars(&[CarKind::Engine]), Loc::new(n, None, 0.98),
                             Box::new(Manual));
    // Straddles the crossing on the other route.
    let standing = s.add_train(cars(&[CarKind::Engine]), Loc::new(e, Some(fw), 0.2),
                               Box::new(Manual));
    s.train_mut(moving).unwrap().velocity = 10.0;
    assert!(s.occupancy().is_occupied(fw));

    match s.tick() {
        Err(Accident::SideOn(x, y, _)) => assert_eq!((x, y), (moving, standing)),
        other => panic!("unexpected {:?}", other),
    }
    let t = s.train(moving).unwrap();
    assert_eq!(t.loc.segment, n);
    let len = s.layout.length(n, &s.scale);
    assert!((t.loc.fraction - (1.0 - 1.0 / len)).abs() < 1e-9);
    let other = s.train(standing).unwrap();
    assert_eq!(other.loc, Loc::new(e, Some(fw), 0.2));
    assert!(s.layout.switch(fw).is_none());
    assert!(!s.history.events.iter().any(|&(_, ref ev)| match *ev {
        Event::SwitchThrown { .. } => true,
        _ => false,
    }));
    assert_eq!(s.layout.dest(fw, Some(w)), Some(e));
}

/// A portal at x=0..100 leading onto track t (100..300).
fn portal() -> (Layout, SegmentId, SegmentId) {
    let mut l = Layout::new();
    let portal = l.add_portal(p(100.0, 0.0), p(0.0, 0.0));
    let t = l.add_track(p(100.0, 0.0), p(300.0, 0.0));
    l.connect(portal, 0, t, 0).unwrap();
    (l, portal, t)
}

#[test]
fn spawned_train_rolls_onto_the_map() {
    let (l, portal, t) = portal();
    let mut s = sim(l);
    let id = s.spawn_at_portal(portal, cars(&[CarKind::Engine]), Box::new(Manual)).unwrap();
    let staged = s.train(id).unwrap().loc;
    assert_eq!(staged.segment, portal + 1);
    assert_eq!(staged.origin, None);
    assert!((staged.fraction - 60.0 / STAGING_LENGTH).abs() < 1e-12);
    assert!(s.history.events.contains(&(0, Event::Spawned { train: id, portal })));
    // Off the map nothing is drawn.
    assert!(s.car_lines(id).unwrap()[0].is_empty());

    match s.spawn_at_portal(portal, cars(&[CarKind::Engine]), Box::new(Manual)) {
        Err(CommandError::PortalBusy(x)) => assert_eq!(x, portal),
        other => panic!("unexpected {:?}", other),
    }
    match s.spawn_at_portal(t, cars(&[CarKind::Engine]), Box::new(Manual)) {
        Err(CommandError::NotAPortal(x)) => assert_eq!(x, t),
        other => panic!("unexpected {:?}", other),
    }

    s.train_mut(id).unwrap().velocity = 60.0;
    let mut arrived = false;
    for _ in 0..400 {
        s.tick().unwrap();
        if s.train(id).unwrap().loc.segment == t {
            arrived = true;
            break;
        }
    }
    assert!(arrived);
    assert!(!s.car_lines(id).unwrap()[0].is_empty());
}

#[test]
fn train_leaves_through_a_portal() {
    let (l, portal, t) = portal();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(portal, Some(t), 0.5),
                         Box::new(Manual));
    s.train_mut(id).unwrap().velocity = 60.0;
    for _ in 0..30 {
        s.tick().unwrap();
        if s.trains().is_empty() {
            break;
        }
    }
    assert!(s.trains().is_empty());
    assert!(s.history.events.iter().any(|(_, e)| *e == Event::Exited { train: id, portal }));
}

#[test]
fn split_and_reverse_on_command() {
    let (l, [a, b, c]) = line();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine, CarKind::Boxcar, CarKind::Tanker]),
                         Loc::new(b, Some(a), 0.9), Box::new(Manual));
    match s.command(id, Command::Split(0)) {
        Err(CommandError::BadSplit(_, 0)) => {}
        other => panic!("unexpected {:?}", other),
    }
    match s.command(id, Command::Split(3)) {
        Err(CommandError::BadSplit(_, 3)) => {}
        other => panic!("unexpected {:?}", other),
    }
    match s.command(42, Command::Reverse) {
        Err(CommandError::UnknownTrain(42)) => {}
        other => panic!("unexpected {:?}", other),
    }

    s.command(id, Command::Split(1)).unwrap();
    // Nothing happens until the next tick.
    assert_eq!(s.trains().len(), 1);
    let report = s.tick().unwrap();
    assert_eq!(report.events, vec![Event::Split { train: id, rear: 2 }]);
    assert_eq!(s.trains().len(), 2);
    let rear = s.train(2).unwrap();
    let kinds: Vec<_> = rear.cars.iter().map(|c| c.kind).collect();
    assert_eq!(kinds, vec![CarKind::Tanker, CarKind::Boxcar]);
    assert_eq!(rear.loc.origin, Some(c));
    // Back of the whole train was at 135; the rear part is pushed 20 ft on.
    assert!((rear.loc.point(&s.layout).x - 115.0).abs() < 1e-9);
    assert_eq!(s.train(id).unwrap().cars.len(), 1);

    s.command(id, Command::Reverse).unwrap();
    let report = s.tick().unwrap();
    assert_eq!(report.events, vec![Event::Reversed { train: id }]);
    let t = s.train(id).unwrap();
    assert_eq!(t.loc.origin, Some(c));
    assert!((t.loc.point(&s.layout).x - 220.0).abs() < 1e-9);
    assert!(!t.requests.structural());
}

#[test]
fn one_list_change_per_tick() {
    let (l, [a, b, c]) = line();
    let mut s = sim(l);
    let first = s.add_train(cars(&[CarKind::Engine]), Loc::new(b, Some(a), 0.5),
                            Box::new(Manual));
    let second = s.add_train(cars(&[CarKind::Engine]), Loc::new(c, Some(b), 0.8),
                             Box::new(Manual));
    s.train_mut(second).unwrap().velocity = 10.0;
    s.command(first, Command::Reverse).unwrap();
    s.command(second, Command::Reverse).unwrap();

    let report = s.tick().unwrap();
    assert_eq!(report.events, vec![Event::Reversed { train: first }]);
    // The second train waits untouched: no move, no physics, request kept.
    let t = s.train(second).unwrap();
    assert_eq!(t.loc, Loc::new(c, Some(b), 0.8));
    assert_eq!(t.velocity, 10.0);
    assert!(t.requests.reverse);

    let report = s.tick().unwrap();
    assert_eq!(report.events, vec![Event::Reversed { train: second }]);
    let t = s.train(second).unwrap();
    assert!(!t.requests.structural());
    assert_eq!(t.loc.segment, c);
    assert_eq!(t.loc.origin, None);
    assert_eq!(s.train(first).unwrap().loc.origin, Some(c));
}

#[test]
fn block_signal_follows_occupancy() {
    let mut l = Layout::new();
    let d = l.add_track(p(-100.0, 0.0), p(0.0, 0.0));
    let sig = l.add_signal(p(0.0, 0.0), Box::new(BlockProgram::default()));
    let a = l.add_track(p(0.0, 0.0), p(100.0, 0.0));
    let next = l.add_signal(p(100.0, 0.0), Box::new(ManualProgram::new(Indication::Stop)));
    let b = l.add_track(p(100.0, 0.0), p(200.0, 0.0));
    l.connect(d, 1, sig, 0).unwrap();
    l.connect(sig, 1, a, 0).unwrap();
    l.connect(a, 1, next, 0).unwrap();
    l.connect(next, 1, b, 0).unwrap();
    let mut s = sim(l);

    let report = s.tick().unwrap();
    assert_eq!(report.events,
               vec![Event::SignalChanged { signal: sig, indication: Indication::Caution }]);

    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(a, Some(sig), 0.5),
                         Box::new(Manual));
    s.tick().unwrap();
    assert_eq!(s.layout.indication(sig), Some(Indication::Stop));
    assert!(!s.layout.may_proceed(sig));

    s.remove_train(id);
    s.tick().unwrap();
    assert_eq!(s.layout.indication(sig), Some(Indication::Caution));
}

#[test]
fn autopilot_waits_at_a_stop_signal() {
    let mut l = Layout::new();
    let d = l.add_track(p(-1000.0, 0.0), p(0.0, 0.0));
    let sig = l.add_signal(p(0.0, 0.0), Box::new(ManualProgram::new(Indication::Stop)));
    let a = l.add_track(p(0.0, 0.0), p(2000.0, 0.0));
    l.connect(d, 1, sig, 0).unwrap();
    l.connect(sig, 1, a, 0).unwrap();
    let mut s = sim(l);
    let id = s.add_train(cars(&[CarKind::Engine]), Loc::new(d, None, 0.2),
                         Box::new(Autopilot::new(4)));
    let ahead = s.lookahead(id, 2000.0).unwrap();
    assert!((ahead - 800.0).abs() < 1e-9);

    for _ in 0..600 {
        s.tick().unwrap();
        assert_eq!(s.train(id).unwrap().loc.segment, d);
    }
    let t = s.train(id).unwrap();
    assert!(t.loc.offset(&s.layout, &s.scale) > 700.0);

    match s.toggle(sig) {
        Ok(Event::SignalChanged { indication: Indication::Clear, .. }) => {}
        other => panic!("unexpected {:?}", other),
    }
    for _ in 0..400 {
        s.tick().unwrap();
    }
    assert_eq!(s.train(id).unwrap().loc.segment, a);
    assert_eq!(s.history.accidents().count(), 0);
}

#[test]
fn standing_trains_load_and_unload() {
    let mut l = Layout::new();
    let a = l.add_track(p(0.0, 0.0), p(100.0, 0.0));
    let load = l.add_load(p(100.0, 0.0), p(300.0, 0.0), false);
    let b = l.add_track(p(300.0, 0.0), p(400.0, 0.0));
    let unload = l.add_load(p(400.0, 0.0), p(600.0, 0.0), true);
    l.connect(a, 1, load, 0).unwrap();
    l.connect(load, 1, b, 0).unwrap();
    l.connect(b, 1, unload, 0).unwrap();
    let mut s = sim(l);

    let empty = s.add_train(cars(&[CarKind::Engine, CarKind::Boxcar, CarKind::Tanker]),
                            Loc::new(load, Some(a), 0.9), Box::new(Manual));
    let mut full = cars(&[CarKind::Engine, CarKind::Boxcar]);
    full[1].loaded = true;
    let full = s.add_train(full, Loc::new(unload, Some(b), 0.9), Box::new(Manual));

    let report = s.tick().unwrap();
    assert!(report.events.contains(&Event::Loaded { train: empty, cars: 2, unload: false }));
    assert!(report.events.contains(&Event::Loaded { train: full, cars: 1, unload: true }));
    assert_eq!(s.train(empty).unwrap().weight(), 1200.0 + 900.0 + 950.0);
    assert_eq!(s.train(full).unwrap().weight(), 1200.0 + 300.0);

    let report = s.tick().unwrap();
    assert!(report.events.is_empty());
}
