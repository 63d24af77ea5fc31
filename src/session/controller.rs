//! Session controller: the idle menu and the record and play sub-loops.

use super::{Command, ExitFlag, SessionEnd, SessionState};
use crate::playback::Playback;
use crate::recording::{
    meter_width, AudioSettings, Capture, CaptureEvent, CaptureEventReceiver, InputLevel, Take,
};
use crate::ui::keys::CTRL_C;
use crate::ui::{Console, KeyInput, RawModeGuard};
use anyhow::Result;
use crossterm::style::Color;
use std::io::{self, Write};
use std::path::PathBuf;
use std::thread;
use std::time::Duration;

/// Pause between meter redraws while recording.
const METER_TICK: Duration = Duration::from_millis(1);

const METER_GLYPH: &str = ".";

const MENU: &str = "[r] record   [p] play   [q] quit: ";

/// Drives one interactive session against a terminal and a pair of audio devices.
pub struct Session<K, W, C, P>
where
    K: KeyInput,
    W: Write,
    C: Capture,
    P: Playback,
{
    keys: K,
    console: Console<W>,
    capture: C,
    playback: P,
    destination: PathBuf,
    settings: AudioSettings,
    events: CaptureEventReceiver,
    exit: ExitFlag,
    state: SessionState,
    failed: bool,
}

impl<K, W, C, P> Session<K, W, C, P>
where
    K: KeyInput,
    W: Write,
    C: Capture,
    P: Playback,
{
    pub fn new(
        keys: K,
        console: Console<W>,
        capture: C,
        playback: P,
        destination: PathBuf,
        events: CaptureEventReceiver,
        exit: ExitFlag,
    ) -> Self {
        Self {
            keys,
            console,
            capture,
            playback,
            destination,
            settings: AudioSettings::VOICE,
            events,
            exit,
            state: SessionState::Idle,
            failed: false,
        }
    }

    /// Runs the menu loop until the user quits or the exit flag is set.
    ///
    /// Fatal problems (capture or playback failures, capture error events) are shown
    /// to the user and end the session with `SessionEnd::Failed`.
    ///
    /// # Errors
    /// - If the terminal cannot be read or written
    pub fn run(&mut self) -> Result<SessionEnd> {
        tracing::info!("Session started, recording file: {}", self.destination.display());

        while !self.exit.is_set() {
            self.drain_events()?;
            if self.exit.is_set() {
                break;
            }

            self.render_menu()?;
            let Some(key) = self.read_key()? else {
                break;
            };

            match Command::from_key(key) {
                Some(Command::Record) => self.record()?,
                Some(Command::Play) => self.play()?,
                Some(Command::Quit) => {
                    tracing::info!("Quit requested");
                    self.exit.set();
                }
                None => tracing::trace!("Ignoring key {:#04x}", key),
            }
        }

        self.drain_events()?;
        self.console.clear_line()?;

        let end = if self.failed {
            SessionEnd::Failed
        } else {
            SessionEnd::Quit
        };
        tracing::info!("Session ended: {:?}", end);
        Ok(end)
    }

    /// Blocking key read; `None` when the read was interrupted by an exit request.
    fn read_key(&mut self) -> Result<Option<u8>> {
        match self.keys.read_key() {
            Ok(key) => Ok(Some(key)),
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {
                tracing::info!("Key read interrupted: {}", e);
                self.exit.set();
                Ok(None)
            }
            Err(e) => Err(e.into()),
        }
    }

    fn enter(&mut self, state: SessionState) {
        tracing::debug!("{:?} -> {:?}", self.state, state);
        self.state = state;
    }

    fn render_menu(&mut self) -> io::Result<()> {
        self.console.clear_line()?;
        self.console.write(MENU, None, false)
    }

    fn record(&mut self) -> Result<()> {
        self.enter(SessionState::Recording);
        let result = self.record_take();
        self.enter(SessionState::Idle);
        result
    }

    fn record_take(&mut self) -> Result<()> {
        self.console.clear_line()?;
        self.console.write("Press any key to start recording", None, false)?;
        match self.read_key()? {
            None => return Ok(()),
            Some(CTRL_C) => {
                tracing::info!("Ctrl+C at the recording prompt: quitting");
                self.exit.set();
                return Ok(());
            }
            Some(_) => {}
        }

        self.console.clear_line()?;
        if let Err(e) = self.capture.start(&self.destination, &self.settings) {
            return self.fail(&format!("Error: could not start recording: {e:#}"));
        }
        self.console.line(&format!(
            "Recording to {}. Press any key to stop.",
            self.destination.display()
        ))?;

        let metered = self.meter_until_key();
        let stopped = self.capture.stop();
        self.console.clear_line()?;
        let stopped_by_key = metered?;

        match stopped {
            Ok(Take::Saved) if stopped_by_key => {
                self.console
                    .line(&format!("Saved recording to {}", self.destination.display()))?;
                Ok(())
            }
            Ok(Take::Empty) if stopped_by_key => {
                self.console.line("Nothing was recorded")?;
                Ok(())
            }
            Ok(_) => Ok(()),
            Err(e) => self.fail(&format!("Error: could not save recording: {e:#}")),
        }
    }

    /// Redraws the meter until a key is pressed (`true`) or exit is requested (`false`).
    ///
    /// Raw mode is held for the whole loop so each check is a non-blocking read.
    fn meter_until_key(&mut self) -> Result<bool> {
        let mode = self.keys.mode().clone();
        let _raw = RawModeGuard::acquire(&mode)?;
        let mut loudest = InputLevel::SILENT.peak_db;

        loop {
            self.drain_events()?;
            if self.exit.is_set() {
                return Ok(false);
            }

            self.console.clear_line()?;
            let level = self.capture.current_level();
            loudest = loudest.max(level.peak_db);
            let meter = METER_GLYPH.repeat(meter_width(level.average_db));
            self.console.write(&meter, Some(Color::Red), true)?;

            thread::sleep(METER_TICK);

            if let Some(key) = self.keys.poll_key()? {
                tracing::debug!(
                    "Key {:#04x} pressed: stopping recording (peak {:.1} dBFS)",
                    key,
                    loudest
                );
                return Ok(true);
            }
        }
    }

    fn play(&mut self) -> Result<()> {
        self.enter(SessionState::Playing);
        let result = self.play_take();
        self.playback.stop();
        self.enter(SessionState::Idle);
        result
    }

    fn play_take(&mut self) -> Result<()> {
        self.console.clear_line()?;

        let clip = match self.playback.open(&self.destination) {
            Ok(clip) => clip,
            Err(e) => {
                return self.fail(&format!(
                    "Error: cannot play {}: {e:#}",
                    self.destination.display()
                ))
            }
        };
        if let Err(e) = self.playback.play(&clip) {
            return self.fail(&format!("Error: playback failed: {e:#}"));
        }

        self.console.write(
            &format!("Playing {:.1}s recording...", clip.duration().as_secs_f64()),
            None,
            false,
        )?;
        thread::sleep(clip.blocking_duration());
        tracing::debug!("Playback finished");
        Ok(())
    }

    /// Shows capture notifications; any notification ends the session.
    fn drain_events(&mut self) -> io::Result<()> {
        while let Ok(event) = self.events.try_recv() {
            tracing::info!("Capture event: {:?}", event);
            self.console.clear_line()?;
            match event {
                CaptureEvent::Completed { success: true } => {
                    self.console.line("Recording complete")?;
                }
                CaptureEvent::Completed { success: false } => {
                    self.failed = true;
                    self.console.error("Recording ended unexpectedly")?;
                }
                CaptureEvent::Failed(message) => {
                    self.failed = true;
                    self.console.error(&format!("Recording error: {message}"))?;
                }
            }
            self.exit.set();
        }
        Ok(())
    }

    /// Reports a fatal error and requests exit.
    fn fail(&mut self, message: &str) -> Result<()> {
        tracing::error!("{}", message);
        self.failed = true;
        self.exit.set();
        self.console.clear_line()?;
        self.console.error(message)?;
        Ok(())
    }

    #[cfg(test)]
    fn output(&self) -> String
    where
        W: AsRef<[u8]>,
    {
        String::from_utf8_lossy(self.console.get_ref().as_ref()).to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::playback::Clip;
    use crate::recording::capture::CaptureEventSender;
    use crate::recording::event_channel;
    use crate::ui::keys::tests::ScriptedKeys;
    use anyhow::anyhow;
    use std::cell::Cell;
    use std::path::Path;

    #[derive(Default)]
    struct FakeCapture {
        started: Vec<PathBuf>,
        stops: u32,
        level_queries: Cell<u32>,
        fail_start: bool,
        fail_stop: bool,
        /// Stop reports that no audio was captured
        empty_take: bool,
        /// Event pushed onto the channel when capture starts
        event_on_start: Option<(CaptureEventSender, CaptureEvent)>,
    }

    impl Capture for FakeCapture {
        fn start(&mut self, destination: &Path, settings: &AudioSettings) -> Result<()> {
            assert_eq!(*settings, AudioSettings::VOICE);
            if self.fail_start {
                return Err(anyhow!("no microphone"));
            }
            self.started.push(destination.to_path_buf());
            if let Some((events, event)) = self.event_on_start.take() {
                events.send(event).unwrap();
            }
            Ok(())
        }

        fn current_level(&self) -> InputLevel {
            self.level_queries.set(self.level_queries.get() + 1);
            InputLevel {
                average_db: -10.0,
                peak_db: -3.0,
            }
        }

        fn stop(&mut self) -> Result<Take> {
            self.stops += 1;
            if self.fail_stop {
                return Err(anyhow!("encoder missing"));
            }
            if self.empty_take {
                return Ok(Take::Empty);
            }
            Ok(Take::Saved)
        }
    }

    #[derive(Default)]
    struct FakePlayback {
        missing: bool,
        opened: u32,
        played: u32,
        stopped: u32,
    }

    impl Playback for FakePlayback {
        fn open(&mut self, _path: &Path) -> Result<Clip> {
            self.opened += 1;
            if self.missing {
                return Err(anyhow!("No such file"));
            }
            Ok(Clip::new(Vec::new(), 44_100))
        }

        fn play(&mut self, _clip: &Clip) -> Result<()> {
            self.played += 1;
            Ok(())
        }

        fn stop(&mut self) {
            self.stopped += 1;
        }
    }

    type TestSession = Session<ScriptedKeys, Vec<u8>, FakeCapture, FakePlayback>;

    fn session(keys: ScriptedKeys, capture: FakeCapture, playback: FakePlayback) -> TestSession {
        let (_tx, rx) = event_channel();
        session_with_events(keys, capture, playback, rx)
    }

    fn session_with_events(
        keys: ScriptedKeys,
        capture: FakeCapture,
        playback: FakePlayback,
        events: CaptureEventReceiver,
    ) -> TestSession {
        Session::new(
            keys,
            Console::new(Vec::new()),
            capture,
            playback,
            PathBuf::from("/tmp/take.m4a"),
            events,
            ExitFlag::new(),
        )
    }

    fn assert_terminal_restored(session: &TestSession) {
        let mode = &session.keys.mode;
        assert!(!mode.raw.get(), "terminal left in raw mode");
        assert_eq!(mode.enabled.get(), mode.disabled.get());
    }

    #[test]
    fn test_quit() {
        let mut session = session(
            ScriptedKeys::keys(b"q"),
            FakeCapture::default(),
            FakePlayback::default(),
        );
        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert!(session.exit.is_set());
        assert!(session.capture.started.is_empty());
        assert_terminal_restored(&session);
    }

    #[test]
    fn test_unknown_keys_redraw_menu() {
        let mut session = session(
            ScriptedKeys::keys(b"x\rQq"),
            FakeCapture::default(),
            FakePlayback::default(),
        );
        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert_eq!(session.output().matches(MENU).count(), 4);
        assert!(session.capture.started.is_empty());
        assert_eq!(session.playback.opened, 0);
    }

    #[test]
    fn test_record_stops_on_first_polled_key() {
        let keys = ScriptedKeys::new(vec![
            Ok(Some(b'r')),
            Ok(Some(b' ')),
            Ok(None),
            Ok(None),
            Ok(Some(b'z')),
            Ok(Some(b'q')),
        ]);
        let mut session = session(keys, FakeCapture::default(), FakePlayback::default());

        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert_eq!(session.capture.started, vec![PathBuf::from("/tmp/take.m4a")]);
        assert_eq!(session.capture.stops, 1);
        assert_eq!(session.capture.level_queries.get(), 3);
        assert_eq!(session.state, SessionState::Idle);
        assert!(session.keys.always_raw, "keys must be read in raw mode");
        assert_terminal_restored(&session);

        let output = session.output();
        assert!(output.contains(&".".repeat(20)));
        assert!(!output.contains(&".".repeat(21)));
        assert!(output.contains("Saved recording to /tmp/take.m4a"));
    }

    #[test]
    fn test_empty_take_is_not_reported_as_saved() {
        let capture = FakeCapture {
            empty_take: true,
            ..Default::default()
        };
        let mut session = session(ScriptedKeys::keys(b"r  q"), capture, FakePlayback::default());

        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert_eq!(session.capture.stops, 1);
        let output = session.output();
        assert!(!output.contains("Saved recording"));
        assert!(output.contains("Nothing was recorded"));
    }

    #[test]
    fn test_ctrl_c_at_record_prompt_quits_without_recording() {
        let keys = ScriptedKeys::keys(&[b'r', CTRL_C, b'r']);
        let mut session = session(keys, FakeCapture::default(), FakePlayback::default());

        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert!(session.capture.started.is_empty());
        assert_eq!(session.capture.stops, 0);
        assert_eq!(session.state, SessionState::Idle);
        assert_eq!(session.keys.script.len(), 1);
        assert_terminal_restored(&session);
    }

    #[test]
    fn test_record_start_failure_is_fatal() {
        let capture = FakeCapture {
            fail_start: true,
            ..Default::default()
        };
        let keys = ScriptedKeys::keys(b"r ");
        let mut session = session(keys, capture, FakePlayback::default());

        assert_eq!(session.run().unwrap(), SessionEnd::Failed);
        assert_eq!(session.capture.stops, 0);
        assert!(session.output().contains("could not start recording: no microphone"));
        assert!(session.keys.script.is_empty());
        assert_terminal_restored(&session);
    }

    #[test]
    fn test_record_save_failure_is_fatal() {
        let capture = FakeCapture {
            fail_stop: true,
            ..Default::default()
        };
        let keys = ScriptedKeys::keys(b"r x");
        let mut session = session(keys, capture, FakePlayback::default());

        assert_eq!(session.run().unwrap(), SessionEnd::Failed);
        assert!(session.output().contains("could not save recording: encoder missing"));
    }

    #[test]
    fn test_capture_error_event_stops_recording() {
        let (tx, rx) = event_channel();
        let capture = FakeCapture {
            event_on_start: Some((tx, CaptureEvent::Failed("device unplugged".to_string()))),
            ..Default::default()
        };
        let keys = ScriptedKeys::keys(b"r ");
        let mut session = session_with_events(keys, capture, FakePlayback::default(), rx);

        assert_eq!(session.run().unwrap(), SessionEnd::Failed);
        assert_eq!(session.capture.stops, 1);
        assert_eq!(session.capture.level_queries.get(), 0);
        assert!(session.output().contains("Recording error: device unplugged"));
        assert_terminal_restored(&session);
    }

    #[test]
    fn test_completion_event_ends_session_cleanly() {
        let (tx, rx) = event_channel();
        tx.send(CaptureEvent::Completed { success: true }).unwrap();
        let mut session = session_with_events(
            ScriptedKeys::keys(b""),
            FakeCapture::default(),
            FakePlayback::default(),
            rx,
        );

        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert!(session.output().contains("Recording complete"));
    }

    #[test]
    fn test_play_then_quit() {
        let mut session = session(
            ScriptedKeys::keys(b"pq"),
            FakeCapture::default(),
            FakePlayback::default(),
        );
        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert_eq!(session.playback.opened, 1);
        assert_eq!(session.playback.played, 1);
        assert!(session.playback.stopped >= 1);
        assert_eq!(session.state, SessionState::Idle);
    }

    #[test]
    fn test_play_open_failure_is_fatal() {
        let playback = FakePlayback {
            missing: true,
            ..Default::default()
        };
        let mut session = session(ScriptedKeys::keys(b"pq"), FakeCapture::default(), playback);

        assert_eq!(session.run().unwrap(), SessionEnd::Failed);
        assert_eq!(session.playback.played, 0);
        assert!(session.output().contains("cannot play /tmp/take.m4a"));
        // The quit key is never read.
        assert_eq!(session.keys.script.len(), 1);
    }

    #[test]
    fn test_interrupted_read_ends_session() {
        let keys = ScriptedKeys::new(vec![Err(io::Error::new(
            io::ErrorKind::Interrupted,
            "SIGTERM",
        ))]);
        let mut session = session(keys, FakeCapture::default(), FakePlayback::default());

        assert_eq!(session.run().unwrap(), SessionEnd::Quit);
        assert!(session.exit.is_set());
        assert_terminal_restored(&session);
    }

    #[test]
    fn test_read_error_is_propagated_with_terminal_restored() {
        let keys = ScriptedKeys::new(vec![Err(io::Error::new(
            io::ErrorKind::BrokenPipe,
            "tty closed",
        ))]);
        let mut session = session(keys, FakeCapture::default(), FakePlayback::default());

        assert!(session.run().is_err());
        assert_terminal_restored(&session);
    }
}
