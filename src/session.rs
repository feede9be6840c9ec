use bevy::prelude::*;

#[derive(Clone, Copy, PartialEq, Eq, Debug, Default)]
pub enum Phase {
    #[default]
    Asking,
    Submitting, // Acceptance write in flight
    Completed,
}

/// Counts captured when "yes" is clicked.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct AcceptSnapshot {
    pub dodge_count: u32,
    pub points: u32,
}

/// Per page load. Nothing here is read back from the store.
#[derive(Resource, Debug, Default)]
pub struct ScoreSession {
    pub points: u32,
    pub dodge_count: u32,
    /// `None` until the first dodge moves the button out of the layout flow.
    pub position: Option<Vec2>,
    pub phase: Phase,
    pub dodge_in_flight: bool,
}

impl ScoreSession {
    pub fn is_submitting(&self) -> bool {
        self.phase == Phase::Submitting
    }

    pub fn is_completed(&self) -> bool {
        self.phase == Phase::Completed
    }

    /// Counts a dodge unless one is still being written. Returns the new count.
    ///
    /// Only while asking: once "yes" is clicked the counts are frozen at
    /// what the acceptance write carries.
    pub fn begin_dodge(&mut self) -> Option<u32> {
        if self.dodge_in_flight || self.phase != Phase::Asking {
            return None;
        }
        self.dodge_in_flight = true;
        self.dodge_count += 1;
        Some(self.dodge_count)
    }

    pub fn finish_dodge(&mut self) {
        self.dodge_in_flight = false;
    }

    pub fn award(&mut self, value: u32) -> Option<u32> {
        if self.phase != Phase::Asking {
            return None;
        }
        self.points = self.points.saturating_add(value);
        Some(self.points)
    }

    pub fn begin_accept(&mut self) -> Option<AcceptSnapshot> {
        if self.phase != Phase::Asking {
            return None;
        }
        self.phase = Phase::Submitting;
        Some(AcceptSnapshot {
            dodge_count: self.dodge_count,
            points: self.points,
        })
    }

    pub fn complete(&mut self) -> bool {
        if self.phase != Phase::Submitting {
            return false;
        }
        self.phase = Phase::Completed;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn dodge_is_ignored_while_previous_one_is_in_flight() {
        let mut session = ScoreSession::default();
        assert_eq!(session.begin_dodge(), Some(1));
        assert_eq!(session.begin_dodge(), None);
        assert_eq!(session.dodge_count, 1);

        session.finish_dodge();
        assert_eq!(session.begin_dodge(), Some(2));
    }

    #[test]
    fn accept_snapshots_and_moves_to_submitting_once() {
        let mut session = ScoreSession {
            points: 12,
            dodge_count: 5,
            ..default()
        };
        let snapshot = session.begin_accept().unwrap();
        assert_eq!(snapshot, AcceptSnapshot { dodge_count: 5, points: 12 });
        assert!(session.is_submitting());
        assert!(session.begin_accept().is_none());
    }

    #[test]
    fn completed_is_terminal() {
        let mut session = ScoreSession::default();
        assert!(!session.complete());
        session.begin_accept();
        assert!(session.complete());
        assert!(session.is_completed());

        assert!(!session.complete());
        assert!(session.begin_accept().is_none());
        assert!(session.begin_dodge().is_none());
        assert!(session.award(3).is_none());
        assert_eq!(session.phase, Phase::Completed);
    }

    #[test]
    fn counts_freeze_once_accepted() {
        let mut session = ScoreSession {
            points: 12,
            dodge_count: 5,
            ..default()
        };
        let snapshot = session.begin_accept().unwrap();

        assert_eq!(session.award(5), None);
        assert_eq!(session.begin_dodge(), None);
        assert!(session.complete());

        assert_eq!(session.points, snapshot.points);
        assert_eq!(session.dodge_count, snapshot.dodge_count);
    }
}
