//! wavesight-view - interactive waveform viewer
//!
//! Opens one audio file and shows it with the waveform widget. There is no
//! audio output; "play" advances the internal playback clock in real time.
//!
//! ## Usage
//!
//! ```text
//! wavesight-view <audio-file> [options.yaml]
//! ```

use std::cell::RefCell;
use std::path::PathBuf;
use std::time::Instant;

use iced::widget::{button, column, row, text};
use iced::{Element, Length, Size, Subscription, Task, Theme};

use wavesight_core::config::{default_config_path, load_options};
use wavesight_core::{AudioSource, DecoderState, Waveform, WaveformEvent};
use wavesight_widgets::{tick_subscription, waveform_view, WaveformFrame, WAVEFORM_HEIGHT};

#[derive(Debug, Clone)]
enum Message {
    Tick(Instant),
    Seek(f32),
    Drag(f32),
    Resized(Size),
    TogglePlay,
    Channel(usize),
}

struct Viewer {
    waveform: Waveform,
    frame: WaveformFrame,
    path: String,
    playing: bool,
    last_tick: Option<Instant>,
}

impl Viewer {
    fn new(mut waveform: Waveform, path: String) -> Self {
        waveform.on(|event| match event {
            WaveformEvent::LoadFailed { error } | WaveformEvent::DecodeFailed { error } => {
                log::error!("{}", error);
            }
            WaveformEvent::Decoded {
                channel_count,
                duration,
                ..
            } => {
                log::info!("Decoded {} channels, {:.2}s", channel_count, duration);
            }
            _ => {}
        });

        if let Err(e) = waveform.load(AudioSource::Url(path.clone()), Instant::now()) {
            log::error!("Cannot load {}: {}", path, e);
        }

        Self {
            waveform,
            frame: WaveformFrame::new(),
            path,
            playing: false,
            last_tick: None,
        }
    }

    fn update(&mut self, message: Message) -> Task<Message> {
        match message {
            Message::Tick(now) => {
                if self.playing {
                    if let Some(last) = self.last_tick {
                        let position = self.waveform.playback().current_time;
                        let next = self.waveform.seek(position + (now - last).as_secs_f64(), now);
                        if next >= self.waveform.duration() {
                            self.playing = false;
                        }
                    }
                }
                self.last_tick = Some(now);
                self.frame.tick(&mut self.waveform, now);
            }
            Message::Seek(x) => {
                self.waveform.click_at(x, Instant::now());
            }
            Message::Drag(dx) => {
                self.waveform.drag_by_pixels(dx, Instant::now());
            }
            Message::Resized(size) => {
                self.waveform.resize(size.width, size.height, Instant::now());
            }
            Message::TogglePlay => {
                self.playing = !self.playing;
            }
            Message::Channel(index) => {
                if let Err(e) = self.waveform.change_channel(index, Instant::now()) {
                    log::warn!("{}", e);
                }
            }
        }
        Task::none()
    }

    fn subscription(&self) -> Subscription<Message> {
        tick_subscription(self.waveform.options().refresh_delay).map(Message::Tick)
    }

    fn view(&self) -> Element<'_, Message> {
        let playback = self.waveform.playback();
        let status = match self.waveform.decoder_state() {
            DecoderState::Decoding => format!("{} - decoding", self.path),
            DecoderState::Error => format!("{} - could not be decoded", self.path),
            _ => format!(
                "{} - {:.2}s / {:.2}s",
                self.path, playback.current_time, playback.duration
            ),
        };

        let mut channels = row![].spacing(4);
        for index in 0..self.waveform.channel_count() {
            channels = channels.push(button(text(format!("Ch {}", index + 1))).on_press(Message::Channel(index)));
        }

        let controls = row![
            button(text(if self.playing { "Pause" } else { "Play" })).on_press(Message::TogglePlay),
            channels,
        ]
        .spacing(8);

        column![
            text(status),
            waveform_view(
                &self.waveform,
                &self.frame,
                WAVEFORM_HEIGHT,
                Message::Seek,
                Message::Drag,
                Message::Resized,
            ),
            controls,
        ]
        .spacing(8)
        .padding(12)
        .width(Length::Fill)
        .into()
    }
}

fn main() -> anyhow::Result<()> {
    // Initialize logger - set RUST_LOG=debug for verbose output
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut args = std::env::args().skip(1);
    let Some(path) = args.next() else {
        anyhow::bail!("usage: wavesight-view <audio-file> [options.yaml]");
    };
    let options_path = args.next().map(PathBuf::from).unwrap_or_else(default_config_path);
    let waveform = Waveform::with_defaults(load_options(&options_path))?;

    let viewer_cell = RefCell::new(Some(Viewer::new(waveform, path)));

    iced::application(
        move || {
            // Boot function: only called once
            let viewer = viewer_cell.borrow_mut().take().expect("viewer already taken");
            (viewer, Task::none())
        },
        Viewer::update,
        Viewer::view,
    )
    .subscription(Viewer::subscription)
    .theme(|_: &Viewer| Theme::Dark)
    .title("Wavesight")
    .window_size(Size::new(1000.0, 260.0))
    .run()?;

    Ok(())
}
