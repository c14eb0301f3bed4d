//! Turning trains around, uncoupling and coupling them.

use std::mem;

use crate::layout::Layout;
use crate::position::Loc;
use crate::train::{Train, TrainId};
use crate::units::Scale;
use super::collision::Contact;
use super::occupancy::tail;

/// Turn `train` around in place: the old back becomes the front. The train
/// stops and gets a fresh controller of the same kind. Fails, leaving the
/// train untouched, when the back cannot be located.
pub fn reverse(layout: &Layout, scale: &Scale, train: &mut Train) -> bool {
    let head = match tail(layout, scale, &train.loc, train.length()) {
        Some(t) => t,
        None => return false,
    };
    train.cars.reverse();
    train.loc = head;
    train.velocity = 0.0;
    train.throttle = 0;
    train.controller = train.controller.fresh();
    train.requests.reverse = false;
    true
}

/// Uncouple `train` in front of car `at`. The front keeps id, controller
/// and motion; the rear becomes train `rear_id`, standing, facing away and
/// moved `gap` feet back. When there is no room behind, the front moves
/// ahead by `gap` instead, and when there is none there either the two
/// parts stay where they are.
pub fn split(layout: &Layout, scale: &Scale, train: &mut Train, at: usize, rear_id: TrainId,
             gap: f64) -> Option<Train> {
    train.requests.split = None;
    if at == 0 || at >= train.cars.len() {
        return None;
    }
    let back = tail(layout, scale, &train.loc, train.length())?;
    let (front_loc, rear_loc) = match back.advance(layout, scale, gap).end() {
        Some(shifted) => (train.loc, shifted),
        None => match train.loc.advance(layout, scale, gap).end() {
            Some(ahead) => (ahead, back),
            None => (train.loc, back),
        },
    };
    let mut rear_cars = train.cars.split_off(at);
    rear_cars.reverse();
    train.loc = front_loc;
    Some(Train::new(rear_id, rear_cars, rear_loc, train.controller.fresh()))
}

fn momentum(t: &Train) -> f64 {
    t.velocity * t.weight()
}

/// Where the front of the coupled train will be, if it can be placed.
pub fn join_head(layout: &Layout, scale: &Scale, a: &Train, b: &Train, contact: Contact)
    -> Option<Loc> {
    match contact {
        Contact::HeadToTail => Some(b.loc),
        Contact::HeadToHead => {
            let slower = if momentum(a) >= momentum(b) { b } else { a };
            tail(layout, scale, &slower.loc, slower.length())
        }
    }
}

/// Couple `a`, the train that ran into `b`, with `b`. The train with more
/// momentum keeps its id, controller and throttle; the cars face the way
/// that train was going. Velocity conserves momentum unless a brake is on;
/// then the leading train's speed carries over unchanged.
pub fn join(mut a: Train, mut b: Train, contact: Contact, head: Loc) -> Train {
    let brake = a.brake || b.brake;
    let total = (a.weight() + b.weight()).max(1.0);
    let (pa, pb) = (momentum(&a), momentum(&b));
    let a_dominant = pa >= pb;

    let velocity = match contact {
        Contact::HeadToHead if brake => if a_dominant { a.velocity } else { b.velocity },
        Contact::HeadToHead => (pa - pb).abs() / total,
        Contact::HeadToTail if brake => b.velocity,
        Contact::HeadToTail => (pa + pb) / total,
    };
    let cars = match contact {
        Contact::HeadToHead => {
            let (slow, fast) = if a_dominant { (&mut b, &mut a) } else { (&mut a, &mut b) };
            let mut cars = mem::replace(&mut slow.cars, Vec::new());
            cars.reverse();
            cars.append(&mut fast.cars);
            cars
        }
        Contact::HeadToTail => {
            let mut cars = mem::replace(&mut b.cars, Vec::new());
            cars.append(&mut a.cars);
            cars
        }
    };

    let dominant = if a_dominant { a } else { b };
    let mut t = Train::new(dominant.id, cars, head, dominant.controller);
    t.velocity = velocity;
    t.throttle = dominant.throttle;
    t.brake = brake;
    t
}
