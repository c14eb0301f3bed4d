use smallvec::SmallVec;

use crate::geometry::Point;
use crate::train::TrainId;

/// The ways a tick can end badly. Returned from [`Simulation::tick`]; the
/// caller has to take the trains involved off the layout before ticking on.
///
/// [`Simulation::tick`]: super::Simulation::tick
#[derive(Debug, Clone, PartialEq, Fail)]
pub enum Accident {
    #[fail(display = "trains {} and {} collided head-on", _0, _1)]
    HeadOn(TrainId, TrainId, Point),
    #[fail(display = "train {} ran into the back of train {}", _0, _1)]
    RearEnd(TrainId, TrainId, Point),
    #[fail(display = "train {} hit train {} from the side", _0, _1)]
    SideOn(TrainId, TrainId, Point),
    #[fail(display = "train {} ran off the end of the track", _0)]
    Overrun(TrainId, Point),
}

impl Accident {
    pub fn trains(&self) -> SmallVec<[TrainId; 2]> {
        let mut v = SmallVec::new();
        match *self {
            Accident::HeadOn(a, b, _) | Accident::RearEnd(a, b, _) | Accident::SideOn(a, b, _) => {
                v.push(a);
                v.push(b);
            }
            Accident::Overrun(a, _) => v.push(a),
        }
        v
    }

    pub fn at(&self) -> Point {
        match *self {
            Accident::HeadOn(_, _, p) | Accident::RearEnd(_, _, p) |
            Accident::SideOn(_, _, p) | Accident::Overrun(_, p) => p,
        }
    }

    pub fn kind(&self) -> &'static str {
        match *self {
            Accident::HeadOn(..) => "head-on",
            Accident::RearEnd(..) => "rear-end",
            Accident::SideOn(..) => "side-on",
            Accident::Overrun(..) => "overrun",
        }
    }
}

#[test]
fn test_accident_parts() {
    let p = Point::new(1.0, 2.0);
    let a = Accident::RearEnd(3, 4, p);
    assert_eq!(a.trains().as_slice(), &[3, 4]);
    assert_eq!(a.at(), p);
    assert_eq!(a.kind(), "rear-end");
    assert_eq!(format!("{}", a), "train 3 ran into the back of train 4");
    assert_eq!(Accident::Overrun(9, p).trains().as_slice(), &[9]);
}
