//! Switch and four-way crossing state.

/// Link slot of the switch base.
pub const BEGIN: usize = 0;
/// Link slot of the straight leg.
pub const STRAIGHT: usize = 1;
/// Link slot of the diverging leg.
pub const DIVERGING: usize = 2;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum SwitchState {
    Straight,
    Diverging,
}

impl SwitchState {
    pub fn other(self) -> SwitchState {
        match self {
            SwitchState::Straight => SwitchState::Diverging,
            SwitchState::Diverging => SwitchState::Straight,
        }
    }
}

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Switch {
    pub state: SwitchState,
}

impl Default for Switch {
    fn default() -> Switch {
        Switch { state: SwitchState::Straight }
    }
}

impl Switch {
    pub fn flipped(&self) -> bool {
        self.state == SwitchState::Diverging
    }

    pub fn set_flipped(&mut self, flipped: bool) {
        self.state = if flipped { SwitchState::Diverging } else { SwitchState::Straight };
    }

    /// The leg a train coming from the base continues onto.
    pub fn leg(&self) -> usize {
        match self.state {
            SwitchState::Straight => STRAIGHT,
            SwitchState::Diverging => DIVERGING,
        }
    }

    /// Realign for a train arriving through `slot`. Trailing moves through
    /// the leg that is not set push the points over; facing moves never
    /// change anything. Returns whether the state changed.
    pub fn enter(&mut self, slot: usize) -> bool {
        let wanted = match slot {
            STRAIGHT => SwitchState::Straight,
            DIVERGING => SwitchState::Diverging,
            _ => return false,
        };
        if wanted == self.state {
            false
        } else {
            self.state = wanted;
            true
        }
    }

    pub fn toggle(&mut self) {
        self.state = self.state.other();
    }
}

/// Exit slot of a four-way crossing for a train entering through `slot`.
/// Slots 0/1 form one route, 2/3 the other.
pub fn four_way_exit(slot: usize) -> usize {
    slot ^ 1
}
