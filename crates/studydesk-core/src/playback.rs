/// Identifies one playback attempt. Events carrying an older ticket are ignored.
pub type Ticket = u64;

/// A running clip. Dropping the handle without calling `stop` leaves the clip
/// to finish on its own.
pub trait PlaybackHandle: Send {
    fn stop(&mut self);
}

/// Starts clips. Implementations report the end of a clip by feeding a
/// [`PlaybackEvent`] with the same ticket back to the dialogue engine.
pub trait AudioPlayer: Send + Sync {
    fn play(&self, url: &str, ticket: Ticket) -> Result<Box<dyn PlaybackHandle>, String>;
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlaybackEvent {
    Ended(Ticket),
    Failed(Ticket, String),
}

impl PlaybackEvent {
    pub fn ticket(&self) -> Ticket {
        match self {
            PlaybackEvent::Ended(ticket) | PlaybackEvent::Failed(ticket, _) => *ticket,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlaybackState {
    /// Turn whose clip is loaded, paused or not.
    pub now_playing: Option<usize>,
    pub is_playing: bool,
}

struct ActiveClip {
    ticket: Ticket,
    handle: Box<dyn PlaybackHandle>,
}

/// Owns the single audio resource. There is never more than one live handle.
#[derive(Default)]
pub(crate) struct PlaybackSlot {
    active: Option<ActiveClip>,
    now_playing: Option<usize>,
    last_ticket: Ticket,
}

impl PlaybackSlot {
    pub fn state(&self) -> PlaybackState {
        PlaybackState {
            now_playing: self.now_playing,
            is_playing: self.active.is_some(),
        }
    }

    /// Stops whatever is playing and starts `url` for `turn`.
    pub fn acquire(
        &mut self,
        player: &dyn AudioPlayer,
        url: &str,
        turn: usize,
    ) -> Result<Ticket, String> {
        self.release();
        self.last_ticket += 1;
        let ticket = self.last_ticket;
        let handle = player.play(url, ticket)?;
        self.active = Some(ActiveClip { ticket, handle });
        self.now_playing = Some(turn);
        Ok(ticket)
    }

    /// Stops the live handle but remembers the turn.
    pub fn pause(&mut self) -> bool {
        match self.active.take() {
            Some(mut clip) => {
                clip.handle.stop();
                true
            }
            None => false,
        }
    }

    pub fn release(&mut self) {
        self.pause();
        self.now_playing = None;
    }

    /// Applies a player event. Returns false when the event belongs to a clip
    /// that has since been replaced or stopped.
    pub fn finish(&mut self, event: &PlaybackEvent) -> bool {
        let current = matches!(&self.active, Some(clip) if clip.ticket == event.ticket());
        if !current {
            return false;
        }
        self.active = None;
        if let PlaybackEvent::Failed(..) = event {
            self.now_playing = None;
        }
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakePlayer;

    #[test]
    fn acquiring_stops_the_previous_clip() {
        let player = FakePlayer::default();
        let mut slot = PlaybackSlot::default();

        slot.acquire(&player, "http://h/a.mp3", 0).unwrap();
        slot.acquire(&player, "http://h/b.mp3", 1).unwrap();

        let live = player.live();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].url, "http://h/b.mp3");
        assert_eq!(
            slot.state(),
            PlaybackState {
                now_playing: Some(1),
                is_playing: true
            }
        );
    }

    #[test]
    fn stale_end_event_is_ignored() {
        let player = FakePlayer::default();
        let mut slot = PlaybackSlot::default();

        let first = slot.acquire(&player, "http://h/a.mp3", 0).unwrap();
        let second = slot.acquire(&player, "http://h/b.mp3", 1).unwrap();

        assert!(!slot.finish(&PlaybackEvent::Ended(first)));
        assert!(slot.state().is_playing);

        assert!(slot.finish(&PlaybackEvent::Ended(second)));
        assert_eq!(
            slot.state(),
            PlaybackState {
                now_playing: Some(1),
                is_playing: false
            }
        );
    }

    #[test]
    fn failed_start_leaves_slot_empty() {
        let player = FakePlayer::default();
        let mut slot = PlaybackSlot::default();

        slot.acquire(&player, "http://h/a.mp3", 0).unwrap();
        let err = slot.acquire(&player, "http://h/broken.mp3", 1).unwrap_err();

        assert!(err.contains("broken"));
        assert!(player.live().is_empty());
        assert_eq!(slot.state(), PlaybackState::default());
    }

    #[test]
    fn pause_keeps_turn_and_release_forgets_it() {
        let player = FakePlayer::default();
        let mut slot = PlaybackSlot::default();
        slot.acquire(&player, "http://h/a.mp3", 2).unwrap();

        assert!(slot.pause());
        assert!(!slot.pause());
        assert_eq!(slot.state().now_playing, Some(2));
        assert!(player.live().is_empty());

        slot.release();
        assert_eq!(slot.state(), PlaybackState::default());
    }
}
