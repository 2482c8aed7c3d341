use std::error::Error;

use tokio::sync::mpsc;
use tokio::time::{self, MissedTickBehavior};

use crate::config::{settings::Settings, DeviceCatalog, DeviceProfile};
use crate::drivers::spacemouse::{driver::Driver, event::Event};

use super::{
    filter::FilterBank,
    normalize::Normalizer,
    sample::{ButtonState, MotionSample},
};

/// Size of the decoded event channel between the reader and the pipeline
const BUFFER_SIZE: usize = 2048;

/// Where published motion samples are delivered. The host 3D view registers
/// an implementation of this. Publishing must be fast and non-blocking; it
/// is the only point where the pipeline crosses into host-owned context.
pub trait MotionSink: Send {
    fn publish(&mut self, sample: &MotionSample);

    /// When true, ticks whose motion state is unchanged since the last
    /// publish are suppressed
    fn change_only(&self) -> bool {
        false
    }
}

/// Commands accepted by a running [Pipeline] over its command channel
#[derive(Debug, Clone)]
pub enum Command {
    /// Replace the user settings. Filter state is reset.
    UpdateSettings(Settings),
    Stop,
}

/// How one device session ended
enum SessionEnd {
    Stopped,
    Disconnected,
}

/// The input-processing pipeline: decoded driver events flow through the
/// normalizer into the per-axis Kalman filters, and a periodic tick
/// assembles the latest smoothed state into a [MotionSample] for the sink.
/// The pipeline exclusively owns all filter state; the blocking HID reader
/// communicates with it over a channel.
pub struct Pipeline<S: MotionSink> {
    settings: Settings,
    profile: Option<DeviceProfile>,
    normalizer: Option<Normalizer>,
    filters: FilterBank,
    buttons: ButtonState,
    last_published: Option<MotionSample>,
    /// Set between device disconnect and reconnect; no samples are
    /// published while suspended
    suspended: bool,
    sink: S,
}

impl<S: MotionSink> Pipeline<S> {
    pub fn new(settings: Settings, sink: S) -> Self {
        let filters = FilterBank::new(
            settings.kalman_q,
            settings.kalman_r,
            settings.initial_covariance,
        );
        Self {
            settings,
            profile: None,
            normalizer: None,
            filters,
            buttons: ButtonState::default(),
            last_published: None,
            suspended: true,
            sink,
        }
    }

    /// Begin a session for the given device: reset all filter state and
    /// resume publishing
    pub fn attach_profile(&mut self, profile: DeviceProfile) {
        self.normalizer = Some(Normalizer::new(profile.axis_scale, &self.settings));
        self.profile = Some(profile);
        self.filters.reset();
        self.buttons = ButtonState::default();
        self.last_published = None;
        self.suspended = false;
    }

    /// Feed one decoded driver event through the normalizer and filters
    pub fn handle_event(&mut self, event: Event) {
        match event {
            Event::Axis(input) => {
                let Some(normalizer) = self.normalizer.as_ref() else {
                    return;
                };
                let measurement = normalizer.normalize(input.axis, input.value);
                let smoothed = self.filters.update(input.axis, measurement);
                log::trace!(
                    "Axis {}: raw {} -> {measurement} -> {smoothed}",
                    input.axis,
                    input.value
                );
            }
            Event::Button(input) => {
                self.buttons.set(input.index, input.pressed);
            }
        }
    }

    /// Assemble the latest smoothed state into a [MotionSample] and deliver
    /// it to the sink. With no new input since the last tick the filters
    /// hold their last estimate, so the same state is re-published unless
    /// the sink asked for change-only delivery.
    pub fn tick(&mut self) {
        if self.suspended {
            return;
        }
        let sample = MotionSample::new(self.filters.estimates(), self.buttons);
        if self.sink.change_only() {
            if let Some(last) = self.last_published.as_ref() {
                if last.same_motion(&sample) {
                    return;
                }
            }
        }
        self.sink.publish(&sample);
        self.last_published = Some(sample);
    }

    /// Reset all filter state and suspend publishing until a device is
    /// attached again. No stale motion is ever published after disconnect.
    pub fn handle_disconnect(&mut self) {
        log::warn!("Device disconnected; suspending motion publishing");
        self.filters.reset();
        self.buttons = ButtonState::default();
        self.last_published = None;
        self.suspended = true;
    }

    /// Replace the user settings, rebuilding the normalizer and resetting
    /// filter state like the original filter bank did on retune
    pub fn apply_settings(&mut self, settings: Settings) {
        self.settings = settings;
        self.filters = FilterBank::new(
            self.settings.kalman_q,
            self.settings.kalman_r,
            self.settings.initial_covariance,
        );
        if let Some(profile) = self.profile.as_ref() {
            self.normalizer = Some(Normalizer::new(profile.axis_scale, &self.settings));
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Run the pipeline until a [Command::Stop] arrives: discover a
    /// cataloged device, run a session for it, and on disconnect retry on
    /// the configured delay. Returns only after the blocking reader task
    /// has fully stopped.
    pub async fn run(
        &mut self,
        catalog: DeviceCatalog,
        mut commands: mpsc::Receiver<Command>,
    ) -> Result<(), Box<dyn Error + Send + Sync>> {
        loop {
            let profile = match Driver::discover(&catalog) {
                Ok(Some(profile)) => profile,
                Ok(None) => {
                    log::debug!("No supported device connected; waiting");
                    if self.wait_for_retry(&mut commands).await {
                        return Ok(());
                    }
                    continue;
                }
                Err(e) => {
                    log::warn!("Device enumeration failed: {e}");
                    if self.wait_for_retry(&mut commands).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            let driver = match Driver::open(profile.clone()) {
                Ok(driver) => driver,
                Err(e) => {
                    log::warn!("Unable to open '{}': {e}", profile.name);
                    if self.wait_for_retry(&mut commands).await {
                        return Ok(());
                    }
                    continue;
                }
            };

            self.attach_profile(profile);
            match self.run_session(driver, &mut commands).await {
                SessionEnd::Stopped => return Ok(()),
                SessionEnd::Disconnected => {
                    self.handle_disconnect();
                    if self.wait_for_retry(&mut commands).await {
                        return Ok(());
                    }
                }
            }
        }
    }

    /// Process one device session until the device disconnects or a stop
    /// command arrives
    async fn run_session(
        &mut self,
        driver: Driver,
        commands: &mut mpsc::Receiver<Command>,
    ) -> SessionEnd {
        let (events_tx, mut events_rx) = mpsc::channel(BUFFER_SIZE);
        let reader = spawn_reader(driver, events_tx);

        let mut tick = time::interval(self.settings.update_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Skip);

        let end = loop {
            tokio::select! {
                event = events_rx.recv() => {
                    match event {
                        Some(event) => self.handle_event(event),
                        // The reader dropped its sender: the device is gone
                        None => break SessionEnd::Disconnected,
                    }
                }
                _ = tick.tick() => {
                    self.tick();
                }
                command = commands.recv() => {
                    match command {
                        Some(Command::UpdateSettings(settings)) => {
                            self.apply_settings(settings);
                            tick = time::interval(self.settings.update_interval());
                            tick.set_missed_tick_behavior(MissedTickBehavior::Skip);
                        }
                        Some(Command::Stop) | None => break SessionEnd::Stopped,
                    }
                }
            }
        };

        // Closing the receiver makes the reader exit within one HID read
        // timeout. Wait for it so the device handle is released before the
        // caller restores any external service.
        events_rx.close();
        drop(events_rx);
        if let Err(e) = reader.await {
            log::warn!("Reader task failed to join: {e}");
        }

        end
    }

    /// Sleep for the reconnect delay while staying responsive to commands.
    /// Returns true if the pipeline should stop.
    async fn wait_for_retry(&mut self, commands: &mut mpsc::Receiver<Command>) -> bool {
        let delay = self.settings.reconnect_delay();
        tokio::select! {
            _ = time::sleep(delay) => false,
            command = commands.recv() => {
                match command {
                    Some(Command::UpdateSettings(settings)) => {
                        self.apply_settings(settings);
                        false
                    }
                    Some(Command::Stop) | None => true,
                }
            }
        }
    }
}

/// Spawn the blocking HID reader. It polls the device with a short read
/// timeout and forwards decoded events to the pipeline, exiting when the
/// device read fails or the pipeline side of the channel closes.
fn spawn_reader(
    mut driver: Driver,
    events_tx: mpsc::Sender<Event>,
) -> tokio::task::JoinHandle<()> {
    tokio::task::spawn_blocking(move || {
        loop {
            if events_tx.is_closed() {
                break;
            }
            let events = match driver.poll() {
                Ok(events) => events,
                Err(e) => {
                    log::warn!("HID read failed: {e}");
                    break;
                }
            };
            for event in events {
                if events_tx.blocking_send(event).is_err() {
                    return;
                }
            }
        }
        if driver.dropped_reports() > 0 {
            log::debug!(
                "Dropped {} malformed reports this session",
                driver.dropped_reports()
            );
        }
    })
}
