// src/audio/player.rs
//! Music playback engine using rodio, with a tap on the decoded samples.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

use anyhow::{Context, Result, anyhow, bail};
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink, Source};
use tracing::{info, warn};

use super::sample_capture::{CallbackSlot, SampleCapture};
use super::tap::{AudioTap, BufferCallback};

/// How often the audio thread checks whether the current track ran out.
const END_POLL: Duration = Duration::from_millis(100);

/// Commands sent to the audio playback thread.
enum PlayerCommand {
    Play(PathBuf),
    Pause,
    Resume,
    Stop,
}

/// State mirrored from the audio thread for quick UI access.
#[derive(Default)]
struct PlayerFlags {
    playing: AtomicBool,
    paused: AtomicBool,
    /// Set when a track played to its end; cleared by [`MusicPlayer::take_finished`].
    finished: AtomicBool,
}

/// Player that can `play()`, `pause()`, `resume()`, or `stop()` a file,
/// stopping any prior playback.
pub struct MusicPlayer {
    cmd_tx: Sender<PlayerCommand>,
    flags: Arc<PlayerFlags>,
    slot: CallbackSlot,
    has_output: bool,
}

impl MusicPlayer {
    /// Create an idle player; `tap_frames` is the size of the buffers handed to a tap.
    pub fn new(tap_frames: usize) -> Self {
        let (tx, rx) = mpsc::channel::<PlayerCommand>();
        let (ready_tx, ready_rx) = mpsc::channel::<bool>();
        let flags = Arc::new(PlayerFlags::default());
        let slot: CallbackSlot = Arc::new(Mutex::new(None));

        let thread_flags = flags.clone();
        let thread_slot = slot.clone();

        // The audio thread owns the OutputStream for its whole life
        thread::spawn(move || {
            let (stream, handle) = match OutputStream::try_default() {
                Ok(output) => output,
                Err(err) => {
                    warn!("no audio output device: {err}");
                    let _ = ready_tx.send(false);
                    // drain commands until the player is dropped
                    while rx.recv().is_ok() {}
                    return;
                }
            };
            let _ = ready_tx.send(true);
            command_loop(&rx, &handle, &thread_flags, &thread_slot, tap_frames);
            drop(stream);
        });

        let has_output = ready_rx.recv().unwrap_or(false);
        Self {
            cmd_tx: tx,
            flags,
            slot,
            has_output,
        }
    }

    /// True when an output device was opened.
    pub fn has_output(&self) -> bool {
        self.has_output
    }

    /// A tap delivering every buffer this player decodes.
    pub fn audio_tap(&self) -> PlayerTap {
        PlayerTap {
            slot: self.slot.clone(),
            has_output: self.has_output,
        }
    }

    /// Stop any existing playback and start playing `path`.
    pub fn play(&mut self, path: &Path) -> Result<()> {
        self.send(PlayerCommand::Play(path.to_path_buf()))
    }

    /// Pause playback if currently playing.
    pub fn pause(&mut self) {
        let _ = self.send(PlayerCommand::Pause);
    }

    /// Resume playback if currently paused.
    pub fn resume(&mut self) {
        let _ = self.send(PlayerCommand::Resume);
    }

    /// Immediately halt playback (if any).
    pub fn stop(&mut self) {
        let _ = self.send(PlayerCommand::Stop);
    }

    /// Returns true if there's an active sink (i.e. playing or paused).
    pub fn is_playing(&self) -> bool {
        self.flags.playing.load(Ordering::SeqCst)
    }

    /// Returns true if playback is currently paused.
    pub fn is_paused(&self) -> bool {
        self.flags.paused.load(Ordering::SeqCst)
    }

    /// True once after a track played to its end.
    pub fn take_finished(&self) -> bool {
        self.flags.finished.swap(false, Ordering::SeqCst)
    }

    fn send(&self, command: PlayerCommand) -> Result<()> {
        self.cmd_tx
            .send(command)
            .map_err(|_| anyhow!("playback thread has exited"))
    }
}

fn command_loop(
    rx: &Receiver<PlayerCommand>,
    handle: &OutputStreamHandle,
    flags: &PlayerFlags,
    slot: &CallbackSlot,
    tap_frames: usize,
) {
    let mut sink: Option<Sink> = None;
    loop {
        let cmd = match rx.recv_timeout(END_POLL) {
            Ok(cmd) => cmd,
            Err(RecvTimeoutError::Timeout) => {
                if sink.as_ref().is_some_and(Sink::empty) {
                    sink = None;
                    flags.playing.store(false, Ordering::SeqCst);
                    flags.finished.store(true, Ordering::SeqCst);
                }
                continue;
            }
            Err(RecvTimeoutError::Disconnected) => break,
        };
        match cmd {
            PlayerCommand::Play(path) => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                match start_sink(handle, &path, slot, tap_frames) {
                    Ok(new_sink) => {
                        info!(path = %path.display(), "playback started");
                        flags.playing.store(true, Ordering::SeqCst);
                        flags.paused.store(false, Ordering::SeqCst);
                        sink = Some(new_sink);
                    }
                    Err(err) => {
                        warn!("cannot play {}: {err:#}", path.display());
                        flags.playing.store(false, Ordering::SeqCst);
                    }
                }
            }
            PlayerCommand::Pause => {
                if let Some(s) = &sink {
                    s.pause();
                    flags.paused.store(true, Ordering::SeqCst);
                }
            }
            PlayerCommand::Resume => {
                if let Some(s) = &sink {
                    s.play();
                    flags.paused.store(false, Ordering::SeqCst);
                }
            }
            PlayerCommand::Stop => {
                if let Some(s) = sink.take() {
                    s.stop();
                }
                flags.playing.store(false, Ordering::SeqCst);
                flags.paused.store(false, Ordering::SeqCst);
            }
        }
    }
    // The command channel closed; make sure the sink stops with it
    if let Some(s) = sink.take() {
        s.stop();
    }
}

fn start_sink(
    handle: &OutputStreamHandle,
    path: &Path,
    slot: &CallbackSlot,
    tap_frames: usize,
) -> Result<Sink> {
    let sink = Sink::try_new(handle).context("creating sink")?;
    let file = File::open(path).context("opening file")?;
    let source = Decoder::new(BufReader::new(file)).context("decoding")?;
    let capturing = SampleCapture::new(source.convert_samples::<f32>(), slot.clone(), tap_frames);
    sink.append(capturing);
    sink.play();
    Ok(sink)
}

/// [`AudioTap`] over a [`MusicPlayer`]'s decoded stream.
#[derive(Clone)]
pub struct PlayerTap {
    slot: CallbackSlot,
    has_output: bool,
}

impl AudioTap for PlayerTap {
    fn attach(&mut self, callback: BufferCallback) -> Result<()> {
        if !self.has_output {
            bail!("player has no output device");
        }
        let mut slot = self
            .slot
            .lock()
            .map_err(|_| anyhow!("tap callback lock poisoned"))?;
        *slot = Some(callback);
        Ok(())
    }

    fn detach(&mut self) {
        if let Ok(mut slot) = self.slot.lock() {
            *slot = None;
        }
    }
}
