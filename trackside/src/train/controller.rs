//! Who drives a train: the operator, or a simple autopilot.

use std::fmt::Debug;

use smallvec::SmallVec;

use super::MAX_THROTTLE;

#[derive(Copy, Clone, Debug, PartialEq)]
pub enum Command {
    Throttle(u8),
    Brake(bool),
    Reverse,
    /// Uncouple in front of this car index.
    Split(usize),
}

/// What a controller gets to see of its train after each tick.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct Outlook {
    pub velocity: f64,
    pub throttle: u8,
    pub brake: bool,
    /// `feet_to_slow(0)` at the current velocity.
    pub stopping_distance: f64,
    /// Feet to the next thing the train must not pass, if one is in range.
    pub obstacle: Option<f64>,
}

pub type Commands = SmallVec<[Command; 2]>;

pub trait Controller: Debug {
    fn name(&self) -> &'static str;
    /// Name plus settings, as written to snapshots.
    fn describe(&self) -> String {
        self.name().to_string()
    }
    /// A new controller of the same kind, with its settings but no state.
    fn fresh(&self) -> Box<dyn Controller>;
    fn drive(&mut self, outlook: &Outlook) -> Commands;
}

/// Does nothing by itself; all input comes from the operator.
#[derive(Debug, Copy, Clone, Default)]
pub struct Manual;

impl Controller for Manual {
    fn name(&self) -> &'static str {
        "manual"
    }

    fn fresh(&self) -> Box<dyn Controller> {
        Box::new(Manual)
    }

    fn drive(&mut self, _outlook: &Outlook) -> Commands {
        SmallVec::new()
    }
}

/// Margin kept in front of obstacles, feet.
pub const AUTOPILOT_MARGIN: f64 = 50.0;

/// Runs at a fixed throttle and brakes for obstacles in time.
#[derive(Debug, Copy, Clone)]
pub struct Autopilot {
    pub cruise: u8,
    holding: bool,
}

impl Autopilot {
    pub fn new(cruise: u8) -> Autopilot {
        Autopilot { cruise: cruise.min(MAX_THROTTLE), holding: false }
    }
}

impl Controller for Autopilot {
    fn name(&self) -> &'static str {
        "autopilot"
    }

    fn describe(&self) -> String {
        format!("autopilot {}", self.cruise)
    }

    fn fresh(&self) -> Box<dyn Controller> {
        Box::new(Autopilot::new(self.cruise))
    }

    fn drive(&mut self, o: &Outlook) -> Commands {
        let mut cmds = SmallVec::new();
        let must_stop = match o.obstacle {
            Some(d) => d <= o.stopping_distance + AUTOPILOT_MARGIN,
            None => false,
        };
        if must_stop {
            if !self.holding || o.throttle != 0 || !o.brake {
                cmds.push(Command::Throttle(0));
                cmds.push(Command::Brake(true));
            }
            self.holding = true;
        } else {
            if self.holding || o.brake {
                cmds.push(Command::Brake(false));
            }
            if o.throttle != self.cruise {
                cmds.push(Command::Throttle(self.cruise));
            }
            self.holding = false;
        }
        cmds
    }
}

/// Parse a controller description as produced by [`Controller::describe`].
pub fn controller_by_name(desc: &str) -> Option<Box<dyn Controller>> {
    let mut words = desc.split_whitespace();
    match words.next() {
        Some("manual") => Some(Box::new(Manual)),
        Some("autopilot") => {
            let cruise = match words.next() {
                Some(w) => w.parse().ok()?,
                None => MAX_THROTTLE / 2,
            };
            Some(Box::new(Autopilot::new(cruise)))
        }
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outlook(obstacle: Option<f64>) -> Outlook {
        Outlook {
            velocity: 20.0,
            throttle: 5,
            brake: false,
            stopping_distance: 300.0,
            obstacle,
        }
    }

    #[test]
    fn autopilot_brakes_for_obstacles() {
        let mut a = Autopilot::new(5);
        assert!(a.drive(&outlook(None)).is_empty());
        assert!(a.drive(&outlook(Some(1000.0))).is_empty());
        let cmds = a.drive(&outlook(Some(320.0)));
        assert_eq!(cmds.as_slice(), &[Command::Throttle(0), Command::Brake(true)]);
        let held = Outlook { throttle: 0, brake: true, ..outlook(Some(200.0)) };
        assert!(a.drive(&held).is_empty());
        let cleared = Outlook { throttle: 0, brake: true, ..outlook(None) };
        assert_eq!(a.drive(&cleared).as_slice(), &[Command::Brake(false), Command::Throttle(5)]);
    }

    #[test]
    fn manual_is_silent() {
        let mut m = Manual;
        assert!(m.drive(&outlook(Some(1.0))).is_empty());
        assert_eq!(m.fresh().name(), "manual");
    }

    #[test]
    fn names_round_trip() {
        let a = Autopilot::new(3);
        let b = controller_by_name(&a.describe()).unwrap();
        assert_eq!(b.describe(), "autopilot 3");
        assert_eq!(controller_by_name("manual").unwrap().name(), "manual");
        assert!(controller_by_name("ghost").is_none());
        assert!(controller_by_name("autopilot fast").is_none());
    }
}
